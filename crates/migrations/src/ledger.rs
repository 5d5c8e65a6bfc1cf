//! Applied-State Ledger
//!
//! One table per keyspace, `(version varchar PRIMARY KEY)`. A row means the
//! migration with that identity has been applied; no row means pending.

use cqlmig_core::{ConsistencyLevel, MigratorConfig};
use std::sync::Arc;

use crate::catalog::validate_keyspace;
use crate::error::{MigrationError, MigrationResult};
use crate::gateway::{Gateway, GatewayError};

/// Ledger of applied migrations in one keyspace
pub struct Ledger {
    gateway: Arc<dyn Gateway>,
    keyspace: String,
    table: String,
    consistency: ConsistencyLevel,
}

impl Ledger {
    /// Create a ledger for `keyspace` using the configured table and consistency
    pub fn new(
        gateway: Arc<dyn Gateway>,
        keyspace: &str,
        config: &MigratorConfig,
    ) -> MigrationResult<Self> {
        validate_keyspace(keyspace)?;
        Ok(Self {
            gateway,
            keyspace: keyspace.to_string(),
            table: config.ledger_table.clone(),
            consistency: config.ledger_consistency,
        })
    }

    /// Fully qualified table name
    pub fn qualified_table(&self) -> String {
        format!("{}.{}", self.keyspace, self.table)
    }

    /// Create the table if it is missing. Never fails when it already exists.
    pub async fn ensure_table_exists(&self) -> MigrationResult<()> {
        let table = self.qualified_table();
        let exists_check = format!("SELECT version FROM {} LIMIT 1", table);

        match self.gateway.execute(&exists_check, self.consistency, &[]).await {
            Ok(_) => return Ok(()),
            Err(GatewayError::InvalidRequest(reason)) => {
                tracing::debug!(
                    table = %table,
                    reason = %reason,
                    "Ledger table missing, creating it"
                );
            }
            Err(source) => return Err(MigrationError::LedgerReadFailed { table, source }),
        }

        let create = format!(
            "CREATE TABLE IF NOT EXISTS {} (version varchar PRIMARY KEY)",
            table
        );
        self.gateway
            .execute(&create, self.consistency, &[])
            .await
            .map_err(|source| MigrationError::LedgerSetupFailed {
                table: table.clone(),
                source,
            })?;

        tracing::info!(table = %table, "Created migration ledger");
        Ok(())
    }

    /// Whether a row exists for `identity`
    pub async fn is_applied(&self, identity: &str) -> MigrationResult<bool> {
        let sql = format!("SELECT version FROM {} WHERE version = ?", self.qualified_table());
        let rows = self
            .gateway
            .execute(&sql, self.consistency, &[identity.to_string()])
            .await
            .map_err(|source| MigrationError::LedgerReadFailed {
                table: self.qualified_table(),
                source,
            })?;
        Ok(!rows.is_empty())
    }

    /// Record `identity` as applied
    pub async fn record_applied(&self, identity: &str) -> MigrationResult<()> {
        let sql = format!("INSERT INTO {} (version) VALUES (?)", self.qualified_table());
        self.gateway
            .execute(&sql, self.consistency, &[identity.to_string()])
            .await
            .map_err(|source| MigrationError::LedgerWriteFailed {
                identity: identity.to_string(),
                source,
            })?;
        Ok(())
    }

    /// Remove the row for `identity`
    pub async fn delete_applied(&self, identity: &str) -> MigrationResult<()> {
        let sql = format!("DELETE FROM {} WHERE version = ?", self.qualified_table());
        self.gateway
            .execute(&sql, self.consistency, &[identity.to_string()])
            .await
            .map_err(|source| MigrationError::LedgerWriteFailed {
                identity: identity.to_string(),
                source,
            })?;
        Ok(())
    }

    /// Every applied identity, ascending
    pub async fn applied_identities(&self) -> MigrationResult<Vec<String>> {
        let sql = format!("SELECT version FROM {}", self.qualified_table());
        let rows = self
            .gateway
            .execute(&sql, self.consistency, &[])
            .await
            .map_err(|source| MigrationError::LedgerReadFailed {
                table: self.qualified_table(),
                source,
            })?;

        let mut identities: Vec<String> = rows
            .iter()
            .filter_map(|row| row.text(0).map(str::to_string))
            .collect();
        identities.sort();
        Ok(identities)
    }

    /// Greatest applied identity
    pub async fn most_recent_applied(&self) -> MigrationResult<String> {
        self.applied_identities()
            .await?
            .pop()
            .ok_or_else(|| MigrationError::LedgerEmpty {
                keyspace: self.keyspace.clone(),
            })
    }
}
