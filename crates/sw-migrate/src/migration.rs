//! The unit of schema change and its two stock implementations.

use crate::error::{MigrationError, MigrationResult};
use duckdb::Connection;
use std::borrow::Cow;
use std::fmt;

/// One versioned, self-contained schema change.
///
/// `up` runs inside a transaction opened by the executor and must not
/// commit or roll back on its own. Structural changes that are not
/// naturally idempotent should guard themselves with the helpers in
/// [`crate::introspect`].
pub trait Migration {
    /// Positive version, unique within a catalog.
    fn version(&self) -> u32;

    /// Human-readable summary, used in logs only.
    fn description(&self) -> &str;

    /// Apply the change.
    fn up(&self, conn: &Connection) -> MigrationResult<()>;
}

impl fmt::Debug for dyn Migration + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Migration")
            .field("version", &self.version())
            .field("description", &self.description())
            .finish()
    }
}

type MigrationFn = dyn Fn(&Connection) -> MigrationResult<()>;

/// A migration whose body is a Rust function or closure.
pub struct FnMigration {
    version: u32,
    description: Cow<'static, str>,
    body: Box<MigrationFn>,
}

impl FnMigration {
    pub fn new<F>(version: u32, description: impl Into<Cow<'static, str>>, body: F) -> Self
    where
        F: Fn(&Connection) -> MigrationResult<()> + 'static,
    {
        Self {
            version,
            description: description.into(),
            body: Box::new(body),
        }
    }
}

impl Migration for FnMigration {
    fn version(&self) -> u32 {
        self.version
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn up(&self, conn: &Connection) -> MigrationResult<()> {
        (self.body)(conn)
    }
}

/// A migration expressed as a batch of SQL statements.
#[derive(Debug, Clone)]
pub struct SqlMigration {
    version: u32,
    description: Cow<'static, str>,
    sql: Cow<'static, str>,
}

impl SqlMigration {
    pub fn new(
        version: u32,
        description: impl Into<Cow<'static, str>>,
        sql: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self {
            version,
            description: description.into(),
            sql: sql.into(),
        }
    }

    /// Build from compiled-in text, e.g. `include_str!("v001_baseline.sql")`.
    pub const fn embedded(version: u32, description: &'static str, sql: &'static str) -> Self {
        Self {
            version,
            description: Cow::Borrowed(description),
            sql: Cow::Borrowed(sql),
        }
    }

    /// The SQL batch this migration executes.
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl Migration for SqlMigration {
    fn version(&self) -> u32 {
        self.version
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn up(&self, conn: &Connection) -> MigrationResult<()> {
        conn.execute_batch(&self.sql)
            .map_err(|e| MigrationError::Ddl(e.to_string()))
    }
}
