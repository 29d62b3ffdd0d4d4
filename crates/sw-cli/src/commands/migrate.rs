//! Migrate command implementation

use anyhow::{Context, Result};

use crate::cli::{GlobalArgs, MigrateArgs};
use crate::commands::common::{build_migrator, database_location, load_project, open_database};

/// Execute the migrate command
pub(crate) fn execute(args: &MigrateArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let migrator = build_migrator(&project)?;
    let location = database_location(&project, global);
    let conn = open_database(&location)?;

    if args.dry_run {
        let status = migrator
            .status(&conn)
            .with_context(|| format!("Failed to read schema version from {location}"))?;
        if status.is_up_to_date() {
            println!(
                "Dry run - {location} is up to date at version {}",
                status.current_version
            );
            return Ok(());
        }
        println!("Dry run - would apply to {location}:");
        for pending in &status.pending {
            println!("  v{:03}  {}", pending.version, pending.description);
        }
        return Ok(());
    }

    let report = migrator
        .migrate(&conn)
        .with_context(|| format!("Migration of {location} failed"))?;

    if report.is_noop() {
        println!("{location} is up to date at version {}", report.final_version);
        return Ok(());
    }

    for applied in &report.applied {
        println!(
            "  Applied v{:03}  {} ({:.1?})",
            applied.version, applied.description, applied.elapsed
        );
    }
    println!(
        "Migrated {location} from version {} to {} ({} applied)",
        report.starting_version,
        report.final_version,
        report.applied.len()
    );
    Ok(())
}

#[cfg(test)]
#[path = "migrate_test.rs"]
mod tests;
