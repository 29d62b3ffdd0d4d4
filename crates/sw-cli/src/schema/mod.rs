//! Built-in migrations for the service-desk database.
//!
//! Plain DDL lives in numbered `.sql` files embedded with `include_str!`;
//! steps that need an existence check before acting are written in Rust
//! against [`sw_migrate::introspect`].

use duckdb::Connection;
use sw_migrate::introspect::{ensure_column, has_column};
use sw_migrate::{FnMigration, MigrationCatalog, MigrationResult, SqlMigration};

/// Columns every `interventions` row carries, in the order they were added.
const INTERVENTION_COLUMNS: &[(&str, &str)] = &[
    ("status", "TEXT"),
    ("fault", "TEXT"),
    ("entered_on", "TEXT"),
    ("released_on", "TEXT"),
    ("product_id", "INTEGER"),
    ("serial_number", "TEXT"),
    ("product_name", "TEXT"),
    ("serial", "TEXT"),
    ("tracking_no", "TEXT"),
    ("owner_type", "TEXT"),
    ("owner_company_id", "INTEGER"),
    ("reporter_company_id", "INTEGER"),
];

fn baseline(conn: &Connection) -> MigrationResult<()> {
    conn.execute_batch(include_str!("v001_baseline.sql"))?;
    for (column, sql_type) in INTERVENTION_COLUMNS {
        ensure_column(conn, "interventions", column, sql_type)?;
    }
    Ok(())
}

/// `code` is the last column of `products`, so it can be dropped with the
/// v3 indexes in place.
fn drop_product_code(conn: &Connection) -> MigrationResult<()> {
    if !has_column(conn, "products", "code")? {
        return Ok(());
    }
    conn.execute_batch("ALTER TABLE products DROP COLUMN code")?;
    Ok(())
}

/// The application's migration catalog.
pub(crate) fn builtin_catalog() -> MigrationResult<MigrationCatalog> {
    MigrationCatalog::new(vec![
        Box::new(FnMigration::new(
            1,
            "Baseline tables and canonical columns",
            baseline,
        )),
        Box::new(SqlMigration::embedded(
            2,
            "Backfill intervention product_id from serial number or product name",
            include_str!("v002_backfill_product_id.sql"),
        )),
        Box::new(SqlMigration::embedded(
            3,
            "Indexes and UI view",
            include_str!("v003_indexes_and_ui_view.sql"),
        )),
        Box::new(FnMigration::new(
            4,
            "Drop unused product code column",
            drop_product_code,
        )),
    ])
}

#[cfg(test)]
#[path = "schema_test.rs"]
mod tests;
