//! Configuration types and parsing for stepwise.yml

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File names searched by [`Config::load_from_dir`], in order.
pub const CONFIG_FILE_NAMES: &[&str] = &["stepwise.yml", "stepwise.yaml"];

/// Special database path selecting an in-memory DuckDB instance.
pub const MEMORY_DB_PATH: &str = ":memory:";

const DEFAULT_DB_PATH: &str = "target/app.duckdb";
const DEFAULT_MIGRATIONS_DIR: &str = "migrations";
const DEFAULT_VERSION_TABLE: &str = "schema_version";

/// Main project configuration from stepwise.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Project name
    pub name: String,

    /// Database connection configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Where migrations come from and how progress is recorded
    #[serde(default)]
    pub migrations: MigrationsConfig,
}

/// Database connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// DuckDB file path, relative to the project root, or `:memory:`
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Backing store for the migration catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MigrationSource {
    /// Migrations compiled into the binary (default)
    #[default]
    Builtin,
    /// `V<version>__<description>.sql` files read from `migrations.directory`
    Directory,
}

impl std::fmt::Display for MigrationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationSource::Builtin => write!(f, "builtin"),
            MigrationSource::Directory => write!(f, "directory"),
        }
    }
}

/// Migration catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MigrationsConfig {
    /// Catalog backing store
    #[serde(default)]
    pub source: MigrationSource,

    /// Directory holding SQL migration files, relative to the project root
    #[serde(default = "default_migrations_dir")]
    pub directory: String,

    /// Name of the single-row table recording the applied version
    #[serde(default = "default_version_table")]
    pub version_table: String,
}

impl Default for MigrationsConfig {
    fn default() -> Self {
        Self {
            source: MigrationSource::default(),
            directory: default_migrations_dir(),
            version_table: default_version_table(),
        }
    }
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

fn default_migrations_dir() -> String {
    DEFAULT_MIGRATIONS_DIR.to_string()
}

fn default_version_table() -> String {
    DEFAULT_VERSION_TABLE.to_string()
}

impl Config {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Config = serde_yaml::from_str(&content)?;
        config.validate()?;
        log::debug!("Loaded config for project '{}'", config.name);
        Ok(config)
    }

    /// Load configuration from a project directory
    /// Looks for stepwise.yml or stepwise.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        for name in CONFIG_FILE_NAMES {
            let candidate = dir.join(name);
            if candidate.exists() {
                return Self::load(&candidate);
            }
        }
        Err(CoreError::ConfigNotFound {
            path: dir.join(CONFIG_FILE_NAMES[0]).display().to_string(),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "Project name cannot be empty".to_string(),
            });
        }

        if self.database.path.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "database.path cannot be empty".to_string(),
            });
        }

        if self.migrations.version_table.trim().is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "migrations.version_table cannot be empty".to_string(),
            });
        }

        if self.migrations.source == MigrationSource::Directory
            && self.migrations.directory.trim().is_empty()
        {
            return Err(CoreError::ConfigInvalid {
                message: "migrations.directory is required when migrations.source is 'directory'"
                    .to_string(),
            });
        }

        Ok(())
    }

    /// Returns `true` when the database lives in memory only.
    pub fn is_memory_db(&self) -> bool {
        self.database.path == MEMORY_DB_PATH
    }

    /// Get the absolute database path relative to a project root.
    ///
    /// Returns `None` for the in-memory database.
    pub fn database_path_absolute(&self, root: &Path) -> Option<PathBuf> {
        if self.is_memory_db() {
            None
        } else {
            Some(root.join(&self.database.path))
        }
    }

    /// Get the absolute migrations directory relative to a project root
    pub fn migrations_dir_absolute(&self, root: &Path) -> PathBuf {
        root.join(&self.migrations.directory)
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
