use anyhow::Context;
use cqlmig_core::Settings;
use cqlmig_migrations::{
    MigrationCatalog, MigrationError, MigrationRollback, MigrationRunner, ScyllaGateway, UnitState,
};
use std::sync::Arc;

async fn connect(settings: &Settings, keyspace: &str) -> anyhow::Result<MigrationRunner> {
    let gateway = ScyllaGateway::connect(&settings.connection, Some(keyspace)).await?;
    Ok(MigrationRunner::new(Arc::new(gateway), settings.migrator.clone()))
}

pub fn generate(settings: &Settings, keyspace: &str, name: Option<&str>) -> anyhow::Result<()> {
    let name = name.ok_or(MigrationError::MissingName)?;
    let catalog = MigrationCatalog::new(settings.migrator.migrations_dir.clone());
    let path = catalog.create_unit(keyspace, name)?;

    println!("Created migration: {}", path.display());
    Ok(())
}

pub async fn run(settings: &Settings, keyspace: &str) -> anyhow::Result<()> {
    let runner = connect(settings, keyspace).await?;
    let result = runner
        .run_migrations(keyspace)
        .await
        .with_context(|| format!("migrate failed for keyspace '{}'", keyspace))?;

    for outcome in &result.outcomes {
        match outcome.state {
            UnitState::Applied => {
                println!("Applied: {}_{}", outcome.identity, outcome.display_name)
            }
            UnitState::SkippedAlreadyApplied => println!(
                "Skipped: {}_{} (statements failed, probably applied already)",
                outcome.identity, outcome.display_name
            ),
            _ => {}
        }
    }

    println!(
        "{} applied, {} skipped, {} already recorded, {} failed statement(s) in {}ms",
        result.applied().len(),
        result.skipped_already_applied().len(),
        result.already_recorded().len(),
        result.failures.len(),
        result.execution_time_ms
    );
    Ok(())
}

pub async fn rollback(settings: &Settings, keyspace: &str) -> anyhow::Result<()> {
    let runner = connect(settings, keyspace).await?;
    let result = runner
        .rollback_last(keyspace)
        .await
        .with_context(|| format!("rollback failed for keyspace '{}'", keyspace))?;

    println!("Rolled back: {}", result.file_name);
    if !result.failures.is_empty() {
        println!(
            "{} of {} down statement(s) failed; the ledger entry was removed anyway",
            result.failures.len(),
            result.failures.len() + result.statements_executed
        );
    }
    Ok(())
}

pub async fn current(settings: &Settings, keyspace: &str) -> anyhow::Result<()> {
    let runner = connect(settings, keyspace).await?;
    let identity = runner.current(keyspace).await?;

    println!("{}", identity);
    Ok(())
}

pub async fn status(settings: &Settings, keyspace: &str) -> anyhow::Result<()> {
    let runner = connect(settings, keyspace).await?;
    let statuses = runner.status(keyspace).await?;

    println!("Migration Status ({}):", keyspace);
    println!("================");

    if statuses.is_empty() {
        println!("No migrations found");
        return Ok(());
    }

    for status in &statuses {
        let marker = if status.is_applied() { "applied" } else { "pending" };
        println!("  [{}] {}", marker, status.unit.file_name());
    }

    let pending = statuses.iter().filter(|s| !s.is_applied()).count();
    println!("\n{} migration(s), {} pending", statuses.len(), pending);
    Ok(())
}
