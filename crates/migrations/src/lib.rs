//! # cqlmig-migrations: keyspace migrations for Cassandra-compatible stores
//!
//! Versioned, reversible schema changes kept as XML files per keyspace,
//! applied in identity order and tracked in a ledger table inside the target
//! keyspace.
//!
//! - [`MigrationCatalog`] discovers migration files and generates new ones
//! - [`Ledger`] records which units have been applied
//! - [`MigrationRunner`] applies pending units; [`MigrationRollback`] reverses
//!   the most recent one
//! - [`Gateway`] is the only way statements reach the cluster

pub mod admin;
pub mod catalog;
pub mod definitions;
pub mod error;
pub mod gateway;
pub mod ledger;
pub mod rollback;
pub mod runner;
pub mod source;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use admin::{create_keyspace, ensure_local_target};
pub use catalog::{to_snake_case, validate_keyspace, MigrationCatalog};
pub use definitions::*;
pub use error::{MigrationError, MigrationResult};
pub use gateway::{Gateway, GatewayError, GatewayResult, Row, ScyllaGateway};
pub use ledger::Ledger;
pub use rollback::MigrationRollback;
pub use runner::MigrationRunner;
pub use source::{parse_script, read_script};
