//! Error types for the migration engine.

use thiserror::Error;

/// Migration engine errors.
///
/// Every variant is fatal to the caller's startup sequence; nothing in this
/// crate retries or recovers locally.
#[derive(Error, Debug)]
pub enum MigrationError {
    /// Duplicate, zero or out-of-order versions in a catalog (M001).
    #[error("[M001] Invalid migration catalog: {0}")]
    Configuration(String),

    /// A migration body, or the version bump that follows it, failed (M002).
    #[error("[M002] Migration v{version:03} ({description}) failed: {source}")]
    MigrationFailed {
        version: u32,
        description: String,
        source: Box<MigrationError>,
    },

    /// The version table or live schema is in a state the engine never produces (M003).
    #[error("[M003] Schema inconsistency: {0}")]
    SchemaInconsistency(String),

    /// Attempt to move the recorded version backwards (M004).
    #[error("[M004] Refusing to lower schema version from {current} to {requested}")]
    VersionRegression { current: u32, requested: u32 },

    /// A structural lookup against the live schema failed (M005).
    #[error("[M005] Schema introspection failed: {0}")]
    Introspection(String),

    /// A DDL statement issued by the engine failed (M006).
    #[error("[M006] DDL statement failed: {0}")]
    Ddl(String),

    /// BEGIN / COMMIT / ROLLBACK failed (M007).
    #[error("[M007] Transaction failed: {0}")]
    Transaction(String),

    /// Reading migration files from disk failed (M008).
    #[error("[M008] Failed to read '{path}': {source}")]
    IoWithPath {
        path: String,
        source: std::io::Error,
    },

    /// DuckDB driver error with preserved source chain (M009).
    #[error("[M009] DuckDB error: {0}")]
    DuckDb(#[source] duckdb::Error),
}

/// Result type alias for [`MigrationError`].
pub type MigrationResult<T> = Result<T, MigrationError>;

impl From<duckdb::Error> for MigrationError {
    fn from(err: duckdb::Error) -> Self {
        MigrationError::DuckDb(err)
    }
}

impl MigrationError {
    /// Version of the failing migration, if this error came from one.
    pub fn failed_version(&self) -> Option<u32> {
        match self {
            MigrationError::MigrationFailed { version, .. } => Some(*version),
            _ => None,
        }
    }
}
