use cqlmig_core::Settings;
use cqlmig_migrations::{ensure_local_target, ScyllaGateway};

pub async fn create_keyspace(settings: &Settings, keyspace: &str) -> anyhow::Result<()> {
    // Refuse before any connection is opened
    ensure_local_target(&settings.connection, keyspace)?;

    let gateway = ScyllaGateway::connect(&settings.connection, None).await?;
    cqlmig_migrations::create_keyspace(&gateway, &settings.connection, keyspace).await?;

    println!("Keyspace '{}' is ready", keyspace);
    Ok(())
}
