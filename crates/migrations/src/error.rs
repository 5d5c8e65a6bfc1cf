//! Error types for the migration system
//!
//! Statement failures inside a migration are not errors at this level: the
//! engine absorbs them and lists them in its report. Everything here aborts
//! the operation that hit it.

use std::path::PathBuf;
use thiserror::Error;

use crate::gateway::GatewayError;

/// Migration result type alias
pub type MigrationResult<T> = Result<T, MigrationError>;

/// Fatal conditions of a migration operation
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Unable to connect to {address}: {reason}")]
    ConnectionFailure { address: String, reason: String },

    #[error("Keyspace '{keyspace}' does not exist")]
    KeyspaceNotFound { keyspace: String },

    #[error("Migrations directory '{}' for keyspace '{keyspace}' does not exist", .path.display())]
    CatalogUnavailable { keyspace: String, path: PathBuf },

    #[error("Failed to read migrations directory '{}': {source}", .path.display())]
    CatalogRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No migration file with id {identity} in keyspace '{keyspace}'")]
    UnitNotFound { keyspace: String, identity: String },

    #[error("Migration ids must be unique: {identity} is used by '{}' and '{}'", .first.display(), .second.display())]
    DuplicateIdentity {
        identity: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("Malformed migration file {identity} ('{}'): {reason}", .path.display())]
    MalformedDocument {
        identity: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Failed to create migration ledger {table}: {source}")]
    LedgerSetupFailed { table: String, source: GatewayError },

    #[error("Failed to read migration ledger {table}: {source}")]
    LedgerReadFailed { table: String, source: GatewayError },

    #[error("Failed to update migration ledger for {identity}: {source}")]
    LedgerWriteFailed {
        identity: String,
        source: GatewayError,
    },

    #[error("Migration ledger for keyspace '{keyspace}' is empty, nothing to roll back")]
    LedgerEmpty { keyspace: String },

    #[error("No migrations have been applied to keyspace '{keyspace}'")]
    NoMigrationsApplied { keyspace: String },

    #[error("Cannot create keyspace '{keyspace}' on remote server {host}")]
    RemoteCreateNotAllowed { keyspace: String, host: String },

    #[error("Invalid keyspace name '{keyspace}'")]
    InvalidKeyspaceName { keyspace: String },

    #[error("Failed to create keyspace '{keyspace}': {source}")]
    KeyspaceCreateFailed {
        keyspace: String,
        source: GatewayError,
    },

    #[error("Migration name must be provided")]
    MissingName,

    #[error("Failed to write migration file '{}': {source}", .path.display())]
    Generate {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl MigrationError {
    /// Create a malformed document error for a migration file
    pub fn malformed(
        identity: impl Into<String>,
        path: impl Into<PathBuf>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedDocument {
            identity: identity.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a unit-not-found error
    pub fn unit_not_found(keyspace: impl Into<String>, identity: impl Into<String>) -> Self {
        Self::UnitNotFound {
            keyspace: keyspace.into(),
            identity: identity.into(),
        }
    }

    /// Whether this error means "there is nothing applied yet"
    pub fn is_empty_ledger(&self) -> bool {
        matches!(
            self,
            MigrationError::LedgerEmpty { .. } | MigrationError::NoMigrationsApplied { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_names_keyspace_and_file() {
        let e = MigrationError::malformed(
            "20230101000000",
            "migrations/global/20230101000000_init.xml",
            "missing <down> section",
        );
        assert_eq!(
            e.to_string(),
            "Malformed migration file 20230101000000 ('migrations/global/20230101000000_init.xml'): missing <down> section"
        );

        let e = MigrationError::unit_not_found("global", "20230101000000");
        assert_eq!(
            e.to_string(),
            "No migration file with id 20230101000000 in keyspace 'global'"
        );

        let e = MigrationError::RemoteCreateNotAllowed {
            keyspace: "global".into(),
            host: "10.0.0.1".into(),
        };
        assert_eq!(e.to_string(), "Cannot create keyspace 'global' on remote server 10.0.0.1");
    }

    #[test]
    fn test_is_empty_ledger() {
        assert!(MigrationError::LedgerEmpty { keyspace: "k".into() }.is_empty_ledger());
        assert!(MigrationError::NoMigrationsApplied { keyspace: "k".into() }.is_empty_ledger());
        assert!(!MigrationError::MissingName.is_empty_ledger());
    }

    #[test]
    fn test_ledger_write_failure_keeps_source() {
        let e = MigrationError::LedgerWriteFailed {
            identity: "20230101000000".into(),
            source: GatewayError::Timeout("write timed out".into()),
        };
        assert!(std::error::Error::source(&e).is_some());
        assert!(e.to_string().contains("20230101000000"));
    }
}
