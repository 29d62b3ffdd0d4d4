//! Single-row bookkeeping of the highest fully-applied migration version.

use crate::error::{MigrationError, MigrationResult};
use crate::introspect::{has_table, split_qualified, validate_table_name, DEFAULT_SCHEMA};
use duckdb::Connection;

/// Default name of the version table.
pub const DEFAULT_VERSION_TABLE: &str = "schema_version";

/// Persists the current schema version in a one-row table.
#[derive(Debug, Clone)]
pub struct VersionStore {
    table: String,
}

impl Default for VersionStore {
    fn default() -> Self {
        Self {
            table: DEFAULT_VERSION_TABLE.to_string(),
        }
    }
}

impl VersionStore {
    /// Use `table` (optionally `schema.table`) as the version table.
    pub fn new(table: impl Into<String>) -> MigrationResult<Self> {
        let table = table.into();
        validate_table_name(&table)
            .map_err(|e| MigrationError::Configuration(format!("version table: {e}")))?;
        Ok(Self { table })
    }

    /// Name of the version table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the version table if needed and seed it with `0` when empty.
    ///
    /// Safe to call on every startup.
    pub fn ensure_initialized(&self, conn: &Connection) -> MigrationResult<()> {
        let (schema, _) = split_qualified(&self.table);
        if schema != DEFAULT_SCHEMA {
            conn.execute_batch(&format!("CREATE SCHEMA IF NOT EXISTS {schema}"))
                .map_err(|e| {
                    MigrationError::Ddl(format!("failed to create schema {schema}: {e}"))
                })?;
        }
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS {} (version INTEGER NOT NULL)",
            self.table
        ))
        .map_err(|e| {
            MigrationError::Ddl(format!("failed to create {} table: {e}", self.table))
        })?;

        let rows: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", self.table),
            [],
            |row| row.get(0),
        )?;
        if rows == 0 {
            conn.execute(&format!("INSERT INTO {} (version) VALUES (0)", self.table), [])?;
            log::debug!("Initialized {} at version 0", self.table);
        }
        Ok(())
    }

    /// Read the recorded version.
    ///
    /// Anything other than exactly one non-negative row is a
    /// [`MigrationError::SchemaInconsistency`].
    pub fn current_version(&self, conn: &Connection) -> MigrationResult<u32> {
        let mut stmt = conn.prepare(&format!("SELECT version FROM {}", self.table))?;
        let versions = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        match versions.as_slice() {
            [v] => u32::try_from(*v).map_err(|_| {
                MigrationError::SchemaInconsistency(format!(
                    "{} holds out-of-range version {v}",
                    self.table
                ))
            }),
            [] => Err(MigrationError::SchemaInconsistency(format!(
                "{} has no rows",
                self.table
            ))),
            many => Err(MigrationError::SchemaInconsistency(format!(
                "{} has {} rows, expected exactly one",
                self.table,
                many.len()
            ))),
        }
    }

    /// Read the recorded version without creating anything.
    ///
    /// A missing version table reads as version 0.
    pub fn peek_version(&self, conn: &Connection) -> MigrationResult<u32> {
        if !has_table(conn, &self.table)? {
            return Ok(0);
        }
        self.current_version(conn)
    }

    /// Record `version` as the current version.
    ///
    /// The version never moves backwards: a lower value is rejected with
    /// [`MigrationError::VersionRegression`].
    pub fn set_version(&self, conn: &Connection, version: u32) -> MigrationResult<()> {
        let current = self.current_version(conn)?;
        if version < current {
            log::error!(
                "Refusing to lower {} from {current} to {version}",
                self.table
            );
            return Err(MigrationError::VersionRegression {
                current,
                requested: version,
            });
        }

        let updated = conn.execute(
            &format!("UPDATE {} SET version = ?", self.table),
            duckdb::params![version],
        )?;
        if updated != 1 {
            return Err(MigrationError::SchemaInconsistency(format!(
                "updating {} touched {updated} rows, expected exactly one",
                self.table
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "version_store_test.rs"]
mod tests;
