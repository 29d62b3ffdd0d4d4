//! sw-core - Core library for Stepwise
//!
//! This crate provides configuration parsing for `stepwise.yml` and the
//! error type shared by the Stepwise binaries.

pub mod config;
pub mod error;

pub use config::{Config, DatabaseConfig, MigrationSource, MigrationsConfig};
pub use error::{CoreError, CoreResult};
