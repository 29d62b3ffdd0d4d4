//! End-to-end tests of the migration engine against real DuckDB databases.
//!
//! Each test builds a synthetic catalog, runs it through [`Migrator`] and
//! checks the resulting schema and recorded version.

use duckdb::Connection;
use std::cell::Cell;
use std::rc::Rc;
use sw_migrate::introspect::{ensure_column, has_column, has_index, has_table, list_columns};
use sw_migrate::{
    FnMigration, Migration, MigrationCatalog, MigrationError, Migrator, SqlMigration,
    VersionStore,
};

// ── Helpers ────────────────────────────────────────────────────────────

fn recorded_version(conn: &Connection) -> u32 {
    VersionStore::default().current_version(conn).unwrap()
}

/// The three-step `items` catalog: create table, add column, add index.
fn items_catalog() -> MigrationCatalog {
    MigrationCatalog::new(vec![
        Box::new(SqlMigration::new(
            1,
            "create items",
            "CREATE TABLE items (id INTEGER)",
        )),
        Box::new(FnMigration::new(2, "add items.label", |conn| {
            ensure_column(conn, "items", "label", "TEXT")?;
            Ok(())
        })),
        Box::new(FnMigration::new(3, "index items.label", |conn| {
            if !has_index(conn, "ix_items_label")? {
                conn.execute_batch("CREATE INDEX ix_items_label ON items(label)")?;
            }
            Ok(())
        })),
    ])
    .unwrap()
}

/// A migration that counts how often its body ran.
fn counting(version: u32, runs: &Rc<Cell<u32>>) -> Box<dyn Migration> {
    let runs = Rc::clone(runs);
    Box::new(FnMigration::new(version, format!("counted v{version}"), move |_| {
        runs.set(runs.get() + 1);
        Ok(())
    }))
}

// ── Concrete scenario ──────────────────────────────────────────────────

#[test]
fn items_scenario_reaches_version_three() {
    let conn = Connection::open_in_memory().unwrap();
    let migrator = Migrator::new(items_catalog(), VersionStore::default());

    let report = migrator.migrate(&conn).unwrap();
    assert_eq!(report.applied.len(), 3);
    assert_eq!(recorded_version(&conn), 3);
    assert!(has_table(&conn, "items").unwrap());
    assert_eq!(list_columns(&conn, "items").unwrap(), vec!["id", "label"]);
    assert!(has_index(&conn, "ix_items_label").unwrap());
}

#[test]
fn items_scenario_second_run_applies_nothing() {
    let conn = Connection::open_in_memory().unwrap();
    let migrator = Migrator::new(items_catalog(), VersionStore::default());
    migrator.migrate(&conn).unwrap();

    let report = migrator.migrate(&conn).unwrap();
    assert!(report.is_noop());
    assert_eq!(report.starting_version, 3);
    assert_eq!(recorded_version(&conn), 3);
    assert_eq!(list_columns(&conn, "items").unwrap(), vec!["id", "label"]);
    assert!(has_index(&conn, "ix_items_label").unwrap());
}

// ── Idempotence and convergence ────────────────────────────────────────

#[test]
fn second_run_does_not_execute_bodies_again() {
    let conn = Connection::open_in_memory().unwrap();
    let runs = Rc::new(Cell::new(0));
    let catalog =
        MigrationCatalog::new(vec![counting(1, &runs), counting(2, &runs)]).unwrap();
    let migrator = Migrator::new(catalog, VersionStore::default());

    migrator.migrate(&conn).unwrap();
    migrator.migrate(&conn).unwrap();
    assert_eq!(runs.get(), 2);
    assert_eq!(recorded_version(&conn), 2);
}

#[test]
fn sparse_versions_converge_to_the_highest() {
    let conn = Connection::open_in_memory().unwrap();
    let runs = Rc::new(Cell::new(0));
    let catalog = MigrationCatalog::new(vec![
        counting(2, &runs),
        counting(5, &runs),
        counting(11, &runs),
        counting(40, &runs),
    ])
    .unwrap();

    let report = Migrator::new(catalog, VersionStore::default())
        .migrate(&conn)
        .unwrap();
    assert_eq!(report.final_version, 40);
    assert_eq!(recorded_version(&conn), 40);
    assert_eq!(runs.get(), 4);
}

#[test]
fn migrations_run_in_ascending_order() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE trail (version INTEGER)")
        .unwrap();
    let step = |v: u32| -> Box<dyn Migration> {
        Box::new(SqlMigration::new(
            v,
            format!("step {v}"),
            format!("INSERT INTO trail VALUES ({v})"),
        ))
    };
    let catalog = MigrationCatalog::new(vec![step(1), step(2), step(7)]).unwrap();
    Migrator::new(catalog, VersionStore::default())
        .migrate(&conn)
        .unwrap();

    let mut stmt = conn
        .prepare("SELECT version FROM trail ORDER BY rowid")
        .unwrap();
    let order: Vec<i64> = stmt
        .query_map([], |row| row.get::<_, i64>(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(order, vec![1, 2, 7]);
}

// ── Partial failure and resume ─────────────────────────────────────────

/// v1 creates `a`, v2 fails while `broken` is set, v3 creates `c`.
fn flaky_catalog(broken: &Rc<Cell<bool>>, runs: &Rc<Cell<u32>>) -> MigrationCatalog {
    let v1_runs = Rc::clone(runs);
    let v2_broken = Rc::clone(broken);
    MigrationCatalog::new(vec![
        Box::new(FnMigration::new(1, "create a", move |conn| {
            v1_runs.set(v1_runs.get() + 1);
            conn.execute_batch("CREATE TABLE a (id INTEGER)")?;
            Ok(())
        })),
        Box::new(FnMigration::new(2, "create b", move |conn| {
            conn.execute_batch("CREATE TABLE b (id INTEGER)")?;
            if v2_broken.get() {
                conn.execute_batch("INSERT INTO no_such_table VALUES (1)")?;
            }
            Ok(())
        })),
        Box::new(SqlMigration::new(3, "create c", "CREATE TABLE c (id INTEGER)")),
    ])
    .unwrap()
}

#[test]
fn failure_keeps_earlier_migrations_and_stops() {
    let conn = Connection::open_in_memory().unwrap();
    let broken = Rc::new(Cell::new(true));
    let runs = Rc::new(Cell::new(0));
    let migrator = Migrator::new(flaky_catalog(&broken, &runs), VersionStore::default());

    let err = migrator.migrate(&conn).unwrap_err();
    assert_eq!(err.failed_version(), Some(2));
    assert!(err.to_string().contains("create b"), "{err}");

    assert_eq!(recorded_version(&conn), 1);
    assert!(has_table(&conn, "a").unwrap());
    assert!(!has_table(&conn, "b").unwrap(), "v2 must be rolled back");
    assert!(!has_table(&conn, "c").unwrap(), "v3 must not run");
}

#[test]
fn rerun_after_fix_resumes_from_last_committed_version() {
    let conn = Connection::open_in_memory().unwrap();
    let broken = Rc::new(Cell::new(true));
    let runs = Rc::new(Cell::new(0));
    let migrator = Migrator::new(flaky_catalog(&broken, &runs), VersionStore::default());

    assert!(migrator.migrate(&conn).is_err());
    broken.set(false);

    let report = migrator.migrate(&conn).unwrap();
    assert_eq!(report.starting_version, 1);
    assert_eq!(report.final_version, 3);
    assert_eq!(runs.get(), 1, "v1 body must not run twice");
    for table in ["a", "b", "c"] {
        assert!(has_table(&conn, table).unwrap(), "missing {table}");
    }
}

// ── Idempotent guards ──────────────────────────────────────────────────

#[test]
fn ensure_column_twice_leaves_one_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE t (id INTEGER)").unwrap();

    assert!(ensure_column(&conn, "t", "c", "TEXT").unwrap());
    assert!(!ensure_column(&conn, "t", "c", "TEXT").unwrap());
    assert!(has_column(&conn, "t", "c").unwrap());
    assert_eq!(list_columns(&conn, "t").unwrap(), vec!["id", "c"]);
}

#[test]
fn guarded_migration_tolerates_unrecorded_ddl() {
    // Simulate a crash after ALTER TABLE succeeded but before the version
    // bump was recorded: the column is there, the version says 1.
    let conn = Connection::open_in_memory().unwrap();
    let migrator = Migrator::new(items_catalog(), VersionStore::default());
    conn.execute_batch("CREATE TABLE items (id INTEGER, label TEXT)")
        .unwrap();
    let store = VersionStore::default();
    store.ensure_initialized(&conn).unwrap();
    store.set_version(&conn, 1).unwrap();

    let report = migrator.migrate(&conn).unwrap();
    assert_eq!(report.applied.len(), 2);
    assert_eq!(recorded_version(&conn), 3);
    assert_eq!(list_columns(&conn, "items").unwrap(), vec!["id", "label"]);
}

// ── Configuration rejection ────────────────────────────────────────────

#[test]
fn duplicate_versions_rejected_before_any_connection() {
    let runs = Rc::new(Cell::new(0));
    let err = MigrationCatalog::new(vec![
        counting(1, &runs),
        counting(2, &runs),
        counting(2, &runs),
    ])
    .unwrap_err();
    assert!(matches!(err, MigrationError::Configuration(_)), "{err}");
    assert_eq!(runs.get(), 0);
}

// ── Persistence ────────────────────────────────────────────────────────

#[test]
fn version_survives_reopening_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.duckdb");
    {
        let conn = Connection::open(&path).unwrap();
        Migrator::new(items_catalog(), VersionStore::default())
            .migrate(&conn)
            .unwrap();
    }

    let conn = Connection::open(&path).unwrap();
    assert_eq!(recorded_version(&conn), 3);
    let report = Migrator::new(items_catalog(), VersionStore::default())
        .migrate(&conn)
        .unwrap();
    assert!(report.is_noop());
}

#[test]
fn directory_catalog_runs_like_compiled_one() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("V1__create_items.sql"),
        "CREATE TABLE items (id INTEGER);",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("V2__add_label.sql"),
        "ALTER TABLE items ADD COLUMN label TEXT;",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("V3__index_label.sql"),
        "CREATE INDEX IF NOT EXISTS ix_items_label ON items(label);",
    )
    .unwrap();

    let conn = Connection::open_in_memory().unwrap();
    let catalog = sw_migrate::sql_dir::load_dir(dir.path()).unwrap();
    let report = Migrator::new(catalog, VersionStore::default())
        .migrate(&conn)
        .unwrap();

    assert_eq!(report.final_version, 3);
    assert_eq!(list_columns(&conn, "items").unwrap(), vec!["id", "label"]);
    assert!(has_index(&conn, "ix_items_label").unwrap());
}
