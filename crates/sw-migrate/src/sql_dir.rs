//! Load a [`MigrationCatalog`] from `.sql` files on disk.
//!
//! Files are named `V<version>__<description>.sql`, e.g.
//! `V003__add_label_index.sql`. Underscores in the description become
//! spaces. Files without a `.sql` extension are ignored; a `.sql` file whose
//! name does not follow the pattern is a configuration error rather than
//! something to skip silently.

use crate::catalog::MigrationCatalog;
use crate::error::{MigrationError, MigrationResult};
use crate::migration::{Migration, SqlMigration};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

static FILE_NAME_RE: OnceLock<Regex> = OnceLock::new();

fn file_name_re() -> &'static Regex {
    FILE_NAME_RE.get_or_init(|| Regex::new(r"^V(\d+)__(.+)\.sql$").expect("valid regex"))
}

/// Parse `V<version>__<description>.sql` into its version and description.
pub fn parse_file_name(name: &str) -> MigrationResult<(u32, String)> {
    let caps = file_name_re().captures(name).ok_or_else(|| {
        MigrationError::Configuration(format!(
            "migration file '{name}' does not match V<version>__<description>.sql"
        ))
    })?;
    let version: u32 = caps[1].parse().map_err(|_| {
        MigrationError::Configuration(format!("migration file '{name}' has an invalid version"))
    })?;
    let description = caps[2].replace('_', " ").trim().to_string();
    if description.is_empty() {
        return Err(MigrationError::Configuration(format!(
            "migration file '{name}' has an empty description"
        )));
    }
    Ok((version, description))
}

/// Read every migration file in `dir` and build a validated catalog.
pub fn load_dir(dir: &Path) -> MigrationResult<MigrationCatalog> {
    let io_err = |e: std::io::Error| MigrationError::IoWithPath {
        path: dir.display().to_string(),
        source: e,
    };

    let mut migrations: Vec<SqlMigration> = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("sql") {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let (version, description) = parse_file_name(name)?;
        let sql = std::fs::read_to_string(&path).map_err(|e| MigrationError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        log::debug!("Found migration file {name}");
        migrations.push(SqlMigration::new(version, description, sql));
    }

    // Directory order is arbitrary; duplicates survive the sort and are
    // rejected by the catalog.
    migrations.sort_by_key(|m| m.version());
    MigrationCatalog::new(
        migrations
            .into_iter()
            .map(|m| Box::new(m) as Box<dyn Migration>)
            .collect(),
    )
}

#[cfg(test)]
#[path = "sql_dir_test.rs"]
mod tests;
