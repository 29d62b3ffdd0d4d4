//! List command implementation

use anyhow::{Context, Result};
use serde::Serialize;

use crate::cli::{GlobalArgs, ListArgs};
use crate::commands::common::{load_catalog, load_project, print_table};

#[derive(Serialize)]
struct CatalogEntry<'a> {
    version: u32,
    description: &'a str,
}

/// Execute the list command
///
/// Reads only the catalog; the database is never opened.
pub(crate) fn execute(args: &ListArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let catalog = load_catalog(&project)?;

    if args.json {
        let entries: Vec<CatalogEntry<'_>> = catalog
            .list()
            .iter()
            .map(|m| CatalogEntry {
                version: m.version(),
                description: m.description(),
            })
            .collect();
        let output =
            serde_json::to_string_pretty(&entries).context("Failed to serialize catalog")?;
        println!("{output}");
        return Ok(());
    }

    if catalog.is_empty() {
        println!("No migrations found ({} source).", project.config.migrations.source);
        return Ok(());
    }

    let rows: Vec<Vec<String>> = catalog
        .list()
        .iter()
        .map(|m| vec![m.version().to_string(), m.description().to_string()])
        .collect();
    print_table(&["VERSION", "DESCRIPTION"], &rows);
    println!("\n{} migrations", catalog.len());
    Ok(())
}
