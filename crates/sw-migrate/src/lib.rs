//! Schema migration engine for Stepwise.
//!
//! Brings a DuckDB schema from whatever version it is at to the latest
//! version known to a [`MigrationCatalog`]. Each pending migration runs in
//! its own transaction together with the bump of the single-row version
//! table, strictly in ascending version order. Migration bodies use the
//! [`introspect`] helpers to make structural changes safe to re-run.

pub mod catalog;
pub mod error;
pub mod executor;
pub mod introspect;
pub mod migration;
pub mod sql_dir;
pub mod transaction;
pub mod version_store;

pub use catalog::MigrationCatalog;
pub use error::{MigrationError, MigrationResult};
pub use executor::{AppliedMigration, MigrateReport, MigrationStatus, Migrator, PendingMigration};
pub use migration::{FnMigration, Migration, SqlMigration};
pub use transaction::TransactionScope;
pub use version_store::VersionStore;
