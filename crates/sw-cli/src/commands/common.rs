//! Shared helpers for CLI commands: project loading, database access and
//! table output.

use anyhow::{Context, Result};
use duckdb::Connection;
use std::path::PathBuf;
use sw_core::config::MEMORY_DB_PATH;
use sw_core::{Config, MigrationSource};
use sw_migrate::{MigrationCatalog, Migrator, VersionStore};

use crate::cli::GlobalArgs;
use crate::schema::builtin_catalog;

/// A loaded project: its root directory and parsed `stepwise.yml`.
#[derive(Debug)]
pub(crate) struct Project {
    pub root: PathBuf,
    pub config: Config,
}

/// Where the database for a command lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DatabaseLocation {
    Memory,
    File(PathBuf),
}

impl std::fmt::Display for DatabaseLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseLocation::Memory => write!(f, "{MEMORY_DB_PATH}"),
            DatabaseLocation::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Load the project from `--config` or the project directory.
pub(crate) fn load_project(global: &GlobalArgs) -> Result<Project> {
    let config = match &global.config {
        Some(path) => Config::load(path).context("Failed to load configuration file")?,
        None => Config::load_from_dir(&global.project_dir)
            .context("Failed to load project configuration")?,
    };
    Ok(Project {
        root: global.project_dir.clone(),
        config,
    })
}

/// Resolve the database location, honoring the `--database` override.
///
/// Relative paths resolve against the project root either way.
pub(crate) fn database_location(project: &Project, global: &GlobalArgs) -> DatabaseLocation {
    match global.database.as_deref() {
        Some(MEMORY_DB_PATH) => DatabaseLocation::Memory,
        Some(path) => DatabaseLocation::File(project.root.join(path)),
        None => match project.config.database_path_absolute(&project.root) {
            Some(path) => DatabaseLocation::File(path),
            None => DatabaseLocation::Memory,
        },
    }
}

/// Open (or create) the database, creating parent directories as needed.
pub(crate) fn open_database(location: &DatabaseLocation) -> Result<Connection> {
    log::debug!("Opening database {location}");
    match location {
        DatabaseLocation::Memory => {
            Connection::open_in_memory().context("Failed to open in-memory database")
        }
        DatabaseLocation::File(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory {}", parent.display())
                })?;
            }
            Connection::open(path)
                .with_context(|| format!("Failed to open database {}", path.display()))
        }
    }
}

/// Build the migration catalog the project is configured for.
pub(crate) fn load_catalog(project: &Project) -> Result<MigrationCatalog> {
    match project.config.migrations.source {
        MigrationSource::Builtin => {
            builtin_catalog().context("Built-in migration catalog is invalid")
        }
        MigrationSource::Directory => {
            let dir = project.config.migrations_dir_absolute(&project.root);
            sw_migrate::sql_dir::load_dir(&dir).with_context(|| {
                format!("Failed to load migrations from {}", dir.display())
            })
        }
    }
}

/// Build a [`Migrator`] for the project's catalog and version table.
pub(crate) fn build_migrator(project: &Project) -> Result<Migrator> {
    let catalog = load_catalog(project)?;
    let store = VersionStore::new(project.config.migrations.version_table.as_str())
        .context("Invalid migrations.version_table")?;
    Ok(Migrator::new(catalog, store))
}

/// Calculate column widths for a table from headers and rows.
pub(crate) fn calculate_column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(cell.len());
        }
    }
    widths
}

/// Print a left-aligned table with a dashed separator under the header.
pub(crate) fn print_table(headers: &[&str], rows: &[Vec<String>]) {
    let widths = calculate_column_widths(headers, rows);

    let header_parts: Vec<String> = headers
        .iter()
        .zip(&widths)
        .map(|(h, &w)| format!("{:<width$}", h, width = w))
        .collect();
    println!("{}", header_parts.join("  "));

    let sep_parts: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
    println!("{}", sep_parts.join("  "));

    for row in rows {
        let row_parts: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, &w)| format!("{:<width$}", cell, width = w))
            .collect();
        println!("{}", row_parts.join("  "));
    }
}

#[cfg(test)]
#[path = "common_test.rs"]
mod tests;
