//! The immutable, version-ordered list of migrations.

use crate::error::{MigrationError, MigrationResult};
use crate::migration::Migration;

/// Highest version the `INTEGER` version column can hold.
pub const MAX_VERSION: u32 = i32::MAX as u32;

/// Ordered migrations, validated once at construction.
///
/// Versions must be positive, at most [`MAX_VERSION`] and strictly
/// increasing in declaration order.
/// Gaps are allowed. Validation happens before any database is touched, so
/// a malformed catalog fails with [`MigrationError::Configuration`] rather
/// than half-way through a run.
#[derive(Debug)]
pub struct MigrationCatalog {
    migrations: Vec<Box<dyn Migration>>,
}

impl MigrationCatalog {
    pub fn new(migrations: Vec<Box<dyn Migration>>) -> MigrationResult<Self> {
        let mut previous: Option<&dyn Migration> = None;
        for migration in &migrations {
            let version = migration.version();
            if version == 0 {
                return Err(MigrationError::Configuration(format!(
                    "migration '{}' has version 0; versions must be positive",
                    migration.description()
                )));
            }
            if version > MAX_VERSION {
                return Err(MigrationError::Configuration(format!(
                    "migration '{}' has version {version}; versions must not exceed {MAX_VERSION}",
                    migration.description()
                )));
            }
            if let Some(prev) = previous {
                if version == prev.version() {
                    return Err(MigrationError::Configuration(format!(
                        "duplicate version {version}: '{}' and '{}'",
                        prev.description(),
                        migration.description()
                    )));
                }
                if version < prev.version() {
                    return Err(MigrationError::Configuration(format!(
                        "version {version} ('{}') is declared after version {} ('{}'); \
                         versions must be strictly increasing",
                        migration.description(),
                        prev.version(),
                        prev.description()
                    )));
                }
            }
            previous = Some(&**migration);
        }
        Ok(Self { migrations })
    }

    /// An empty catalog.
    pub fn empty() -> Self {
        Self {
            migrations: Vec::new(),
        }
    }

    /// All migrations, ascending by version.
    pub fn list(&self) -> &[Box<dyn Migration>] {
        &self.migrations
    }

    /// Migrations with a version above `current`, ascending.
    pub fn pending(&self, current: u32) -> impl Iterator<Item = &dyn Migration> {
        self.migrations
            .iter()
            .map(|m| &**m)
            .filter(move |m| m.version() > current)
    }

    /// Look up a migration by version.
    pub fn get(&self, version: u32) -> Option<&dyn Migration> {
        self.migrations
            .binary_search_by_key(&version, |m| m.version())
            .ok()
            .map(|idx| &*self.migrations[idx])
    }

    /// Highest version in the catalog, or 0 when empty.
    pub fn latest_version(&self) -> u32 {
        self.migrations.last().map_or(0, |m| m.version())
    }

    pub fn len(&self) -> usize {
        self.migrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
