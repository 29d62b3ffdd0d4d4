//! Scoped `BEGIN` / `COMMIT` over a borrowed DuckDB connection.
//!
//! A [`TransactionScope`] rolls back when dropped unless [`commit`] was
//! called, so an early return or a panic inside a migration body never
//! leaves the connection inside an open transaction.
//!
//! [`commit`]: TransactionScope::commit

use crate::error::{MigrationError, MigrationResult};
use duckdb::Connection;

/// An open transaction on `conn`.
#[must_use = "dropping a TransactionScope rolls it back"]
pub struct TransactionScope<'c> {
    conn: &'c Connection,
    finished: bool,
}

impl<'c> TransactionScope<'c> {
    /// Issue `BEGIN TRANSACTION` on `conn`.
    pub fn begin(conn: &'c Connection) -> MigrationResult<Self> {
        conn.execute_batch("BEGIN TRANSACTION")
            .map_err(|e| MigrationError::Transaction(format!("BEGIN failed: {e}")))?;
        Ok(Self {
            conn,
            finished: false,
        })
    }

    /// The connection the transaction is open on.
    pub fn connection(&self) -> &'c Connection {
        self.conn
    }

    /// Commit the transaction.
    ///
    /// If `COMMIT` itself fails a `ROLLBACK` is attempted before the error
    /// is returned.
    pub fn commit(mut self) -> MigrationResult<()> {
        self.finished = true;
        if let Err(commit_err) = self.conn.execute_batch("COMMIT") {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                log::warn!("Rollback after failed commit also failed: {e}");
            }
            return Err(MigrationError::Transaction(format!(
                "COMMIT failed: {commit_err}"
            )));
        }
        Ok(())
    }

    /// Roll the transaction back explicitly.
    pub fn rollback(mut self) -> MigrationResult<()> {
        self.finished = true;
        self.conn
            .execute_batch("ROLLBACK")
            .map_err(|e| MigrationError::Transaction(format!("ROLLBACK failed: {e}")))
    }
}

impl Drop for TransactionScope<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.conn.execute_batch("ROLLBACK") {
            log::warn!("Rollback of abandoned transaction failed: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(conn: &Connection, sql: &str) -> i64 {
        conn.query_row(sql, [], |row| row.get::<_, i64>(0)).unwrap()
    }

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (n INTEGER)").unwrap();
        conn
    }

    #[test]
    fn commit_persists_changes() {
        let conn = setup();
        let tx = TransactionScope::begin(&conn).unwrap();
        tx.connection()
            .execute("INSERT INTO t VALUES (1)", [])
            .unwrap();
        tx.commit().unwrap();
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM t"), 1);
    }

    #[test]
    fn drop_without_commit_rolls_back() {
        let conn = setup();
        {
            let tx = TransactionScope::begin(&conn).unwrap();
            tx.connection()
                .execute("INSERT INTO t VALUES (1)", [])
                .unwrap();
        }
        assert_eq!(count(&conn, "SELECT COUNT(*) FROM t"), 0);
    }

    #[test]
    fn explicit_rollback_discards_ddl() {
        let conn = setup();
        let tx = TransactionScope::begin(&conn).unwrap();
        tx.connection()
            .execute_batch("CREATE TABLE scratch (id INTEGER)")
            .unwrap();
        tx.rollback().unwrap();
        assert_eq!(
            count(
                &conn,
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = 'scratch'"
            ),
            0
        );
    }

    #[test]
    fn commit_after_transaction_ended_elsewhere_is_transaction_error() {
        let conn = setup();
        let tx = TransactionScope::begin(&conn).unwrap();
        tx.connection().execute_batch("COMMIT").unwrap();

        // Both the COMMIT and the follow-up ROLLBACK fail here.
        let err = tx.commit().unwrap_err();
        assert!(matches!(err, MigrationError::Transaction(_)), "{err}");
        assert!(err.to_string().contains("COMMIT failed"), "{err}");

        let tx = TransactionScope::begin(&conn).unwrap();
        tx.commit().unwrap();
    }

    #[test]
    fn connection_usable_after_rollback() {
        let conn = setup();
        {
            let _tx = TransactionScope::begin(&conn).unwrap();
        }
        // A second BEGIN would fail if the first transaction were still open.
        let tx = TransactionScope::begin(&conn).unwrap();
        tx.commit().unwrap();
    }
}
