//! Read-only structural queries against the live schema, plus the
//! check-then-act guards migration bodies use to stay re-runnable.
//!
//! Lookups go through `information_schema` and `duckdb_indexes()`. Names
//! may be schema-qualified (`schema.table`); unqualified names resolve to
//! the `main` schema. Identifier comparison is case-insensitive, matching
//! DuckDB's own resolution rules.

use crate::error::{MigrationError, MigrationResult};
use duckdb::Connection;

pub(crate) const DEFAULT_SCHEMA: &str = "main";

/// Split `schema.table` into its parts, defaulting the schema to `main`.
pub(crate) fn split_qualified(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(pos) => (&name[..pos], &name[pos + 1..]),
        None => (DEFAULT_SCHEMA, name),
    }
}

/// Reject anything but a plain SQL identifier (letters, digits, `_`, not
/// starting with a digit). Names are spliced into DDL text.
pub(crate) fn validate_identifier(kind: &str, name: &str) -> MigrationResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(MigrationError::Introspection(format!(
            "invalid {kind} name '{name}'"
        )))
    }
}

/// Validate a possibly schema-qualified table name.
pub(crate) fn validate_table_name(name: &str) -> MigrationResult<()> {
    match name.rfind('.') {
        Some(pos) => {
            validate_identifier("schema", &name[..pos])?;
            validate_identifier("table", &name[pos + 1..])
        }
        None => validate_identifier("table", name),
    }
}

fn validate_column_type(sql_type: &str) -> MigrationResult<()> {
    let valid = !sql_type.trim().is_empty()
        && sql_type
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ' ' | '(' | ')' | ','));
    if valid {
        Ok(())
    } else {
        Err(MigrationError::Introspection(format!(
            "invalid column type '{sql_type}'"
        )))
    }
}

fn count(conn: &Connection, what: &str, sql: &str, params: &[&str]) -> MigrationResult<i64> {
    conn.query_row(sql, duckdb::params_from_iter(params.iter()), |row| {
        row.get::<_, i64>(0)
    })
    .map_err(|e| MigrationError::Introspection(format!("failed to look up {what}: {e}")))
}

/// Whether a table (or view) named `name` exists.
pub fn has_table(conn: &Connection, name: &str) -> MigrationResult<bool> {
    validate_table_name(name)?;
    let (schema, table) = split_qualified(name);
    let n = count(
        conn,
        &format!("table '{name}'"),
        "SELECT COUNT(*) FROM information_schema.tables \
         WHERE lower(table_schema) = lower(?) AND lower(table_name) = lower(?)",
        &[schema, table],
    )?;
    Ok(n > 0)
}

/// Whether `table` has a column named `column`.
///
/// A missing table is an [`MigrationError::Introspection`] error, not
/// `false`: a migration asking about columns of a table that is not there
/// is looking at a schema it does not understand.
pub fn has_column(conn: &Connection, table: &str, column: &str) -> MigrationResult<bool> {
    validate_identifier("column", column)?;
    if !has_table(conn, table)? {
        return Err(MigrationError::Introspection(format!(
            "table '{table}' does not exist"
        )));
    }
    let (schema, table_name) = split_qualified(table);
    let n = count(
        conn,
        &format!("column '{table}.{column}'"),
        "SELECT COUNT(*) FROM information_schema.columns \
         WHERE lower(table_schema) = lower(?) AND lower(table_name) = lower(?) \
           AND lower(column_name) = lower(?)",
        &[schema, table_name, column],
    )?;
    Ok(n > 0)
}

/// Whether an index named `name` exists in any schema.
pub fn has_index(conn: &Connection, name: &str) -> MigrationResult<bool> {
    validate_identifier("index", name)?;
    let n = count(
        conn,
        &format!("index '{name}'"),
        "SELECT COUNT(*) FROM duckdb_indexes() WHERE lower(index_name) = lower(?)",
        &[name],
    )?;
    Ok(n > 0)
}

/// Column names of `table`, in declaration order.
pub fn list_columns(conn: &Connection, table: &str) -> MigrationResult<Vec<String>> {
    if !has_table(conn, table)? {
        return Err(MigrationError::Introspection(format!(
            "table '{table}' does not exist"
        )));
    }
    let (schema, table_name) = split_qualified(table);
    let lookup_err = |e: duckdb::Error| {
        MigrationError::Introspection(format!("failed to list columns of '{table}': {e}"))
    };

    let mut stmt = conn
        .prepare(
            "SELECT column_name FROM information_schema.columns \
             WHERE lower(table_schema) = lower(?) AND lower(table_name) = lower(?) \
             ORDER BY ordinal_position",
        )
        .map_err(lookup_err)?;
    let rows = stmt
        .query_map(duckdb::params![schema, table_name], |row| {
            row.get::<_, String>(0)
        })
        .map_err(lookup_err)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(lookup_err)
}

/// Add `column` to `table` unless it already exists.
///
/// Returns `true` when the column was added and `false` when it was
/// already present. Calling this any number of times leaves exactly one
/// such column. Lookup failures surface as
/// [`MigrationError::Introspection`]; a failing `ALTER TABLE` surfaces as
/// [`MigrationError::Ddl`].
pub fn ensure_column(
    conn: &Connection,
    table: &str,
    column: &str,
    sql_type: &str,
) -> MigrationResult<bool> {
    validate_column_type(sql_type)?;
    if has_column(conn, table, column)? {
        log::debug!("Column {table}.{column} already present");
        return Ok(false);
    }

    conn.execute_batch(&format!("ALTER TABLE {table} ADD COLUMN {column} {sql_type}"))
        .map_err(|e| MigrationError::Ddl(format!("failed to add column {table}.{column}: {e}")))?;
    log::debug!("Added column {table}.{column} {sql_type}");
    Ok(true)
}

#[cfg(test)]
#[path = "introspect_test.rs"]
mod tests;
