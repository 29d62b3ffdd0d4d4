//! The apply loop.
//!
//! [`Migrator::migrate`] reads the recorded version, then applies every
//! catalog entry above it in ascending order. Each migration gets its own
//! transaction, and the version bump is written inside that same
//! transaction, so a migration is either fully applied and recorded or not
//! visible at all. The first failure stops the run; earlier migrations stay
//! committed and the next run resumes after them.

use crate::catalog::MigrationCatalog;
use crate::error::{MigrationError, MigrationResult};
use crate::migration::Migration;
use crate::transaction::TransactionScope;
use crate::version_store::VersionStore;
use duckdb::Connection;
use serde::Serialize;
use std::time::{Duration, Instant};

/// A migration applied during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppliedMigration {
    pub version: u32,
    pub description: String,
    pub elapsed: Duration,
}

/// Outcome of a successful [`Migrator::migrate`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrateReport {
    /// Version recorded before the run started.
    pub starting_version: u32,
    /// Version recorded when the run finished.
    pub final_version: u32,
    /// Migrations applied by this run, in order.
    pub applied: Vec<AppliedMigration>,
}

impl MigrateReport {
    /// Whether the run changed nothing.
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// A catalog entry not yet applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingMigration {
    pub version: u32,
    pub description: String,
}

/// Where the database stands relative to the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStatus {
    pub current_version: u32,
    pub latest_version: u32,
    pub pending: Vec<PendingMigration>,
}

impl MigrationStatus {
    pub fn is_up_to_date(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Applies a [`MigrationCatalog`] to a database.
#[derive(Debug)]
pub struct Migrator {
    catalog: MigrationCatalog,
    store: VersionStore,
}

impl Migrator {
    pub fn new(catalog: MigrationCatalog, store: VersionStore) -> Self {
        Self { catalog, store }
    }

    pub fn catalog(&self) -> &MigrationCatalog {
        &self.catalog
    }

    pub fn version_store(&self) -> &VersionStore {
        &self.store
    }

    /// Bring the schema on `conn` up to the catalog's latest version.
    ///
    /// Blocks until every pending migration is applied or one fails. On
    /// failure the failing migration is rolled back, later migrations are
    /// not attempted, and the error names the failing version and
    /// description.
    pub fn migrate(&self, conn: &Connection) -> MigrationResult<MigrateReport> {
        self.store.ensure_initialized(conn)?;
        let starting_version = self.store.current_version(conn)?;
        self.warn_if_ahead(starting_version);

        let mut report = MigrateReport {
            starting_version,
            final_version: starting_version,
            applied: Vec::new(),
        };

        for migration in self.catalog.pending(starting_version) {
            let started = Instant::now();
            if let Err(source) = self.apply(conn, migration) {
                log::error!(
                    "Migration v{:03} - {} failed: {source}",
                    migration.version(),
                    migration.description()
                );
                return Err(MigrationError::MigrationFailed {
                    version: migration.version(),
                    description: migration.description().to_string(),
                    source: Box::new(source),
                });
            }

            log::info!(
                "Migration v{:03} - {}",
                migration.version(),
                migration.description()
            );
            report.final_version = migration.version();
            report.applied.push(AppliedMigration {
                version: migration.version(),
                description: migration.description().to_string(),
                elapsed: started.elapsed(),
            });
        }

        if report.is_noop() {
            log::debug!("Schema already at version {starting_version}");
        }
        Ok(report)
    }

    /// Report the recorded version and the migrations still to apply.
    ///
    /// Read-only: a database without a version table reports version 0.
    pub fn status(&self, conn: &Connection) -> MigrationResult<MigrationStatus> {
        let current_version = self.store.peek_version(conn)?;
        self.warn_if_ahead(current_version);

        Ok(MigrationStatus {
            current_version,
            latest_version: self.catalog.latest_version(),
            pending: self
                .catalog
                .pending(current_version)
                .map(|m| PendingMigration {
                    version: m.version(),
                    description: m.description().to_string(),
                })
                .collect(),
        })
    }

    fn apply(&self, conn: &Connection, migration: &dyn Migration) -> MigrationResult<()> {
        log::debug!("Applying migration v{:03}", migration.version());
        let tx = TransactionScope::begin(conn)?;
        migration.up(tx.connection())?;
        self.store.set_version(tx.connection(), migration.version())?;
        tx.commit()
    }

    fn warn_if_ahead(&self, current: u32) {
        let latest = self.catalog.latest_version();
        if current > latest {
            log::warn!(
                "Database schema version {current} is newer than the latest known migration {latest}"
            );
        }
    }
}

#[cfg(test)]
#[path = "executor_test.rs"]
mod tests;
