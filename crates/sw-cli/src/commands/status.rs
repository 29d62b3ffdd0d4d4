//! Status command implementation

use anyhow::{Context, Result};

use crate::cli::{GlobalArgs, StatusArgs};
use crate::commands::common::{
    build_migrator, database_location, load_project, open_database, print_table,
};

/// Execute the status command
pub(crate) fn execute(args: &StatusArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let migrator = build_migrator(&project)?;
    let location = database_location(&project, global);
    let conn = open_database(&location)?;

    let status = migrator
        .status(&conn)
        .with_context(|| format!("Failed to read schema version from {location}"))?;

    if args.json {
        let output =
            serde_json::to_string_pretty(&status).context("Failed to serialize status")?;
        println!("{output}");
        return Ok(());
    }

    println!("Database:        {location}");
    println!("Current version: {}", status.current_version);
    println!("Latest version:  {}", status.latest_version);

    if status.is_up_to_date() {
        println!("\nUp to date.");
        return Ok(());
    }

    println!("\nPending migrations ({}):\n", status.pending.len());
    let rows: Vec<Vec<String>> = status
        .pending
        .iter()
        .map(|p| vec![p.version.to_string(), p.description.clone()])
        .collect();
    print_table(&["VERSION", "DESCRIPTION"], &rows);
    Ok(())
}
