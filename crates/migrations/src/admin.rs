//! Keyspace administration

use cqlmig_core::{ConnectionConfig, ConsistencyLevel};

use crate::catalog::validate_keyspace;
use crate::error::{MigrationError, MigrationResult};
use crate::gateway::Gateway;

/// Refuse keyspace creation against anything but this machine
pub fn ensure_local_target(connection: &ConnectionConfig, keyspace: &str) -> MigrationResult<()> {
    if !connection.is_local() {
        return Err(MigrationError::RemoteCreateNotAllowed {
            keyspace: keyspace.to_string(),
            host: connection.host.clone(),
        });
    }
    validate_keyspace(keyspace)
}

/// Create `keyspace` with single-node replication
pub async fn create_keyspace(
    gateway: &dyn Gateway,
    connection: &ConnectionConfig,
    keyspace: &str,
) -> MigrationResult<()> {
    ensure_local_target(connection, keyspace)?;

    let statement = format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH REPLICATION = {{'class':'SimpleStrategy','replication_factor':1}}",
        keyspace
    );
    gateway
        .execute(&statement, ConsistencyLevel::STATEMENT, &[])
        .await
        .map_err(|source| MigrationError::KeyspaceCreateFailed {
            keyspace: keyspace.to_string(),
            source,
        })?;

    tracing::info!(keyspace = %keyspace, "Keyspace created");
    Ok(())
}
