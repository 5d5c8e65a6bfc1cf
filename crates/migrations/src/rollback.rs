//! Migration Rollback - reverses the most recently applied migration
//!
//! One unit per invocation. Down statements run in order; failures are logged
//! and collected, and the ledger row is removed once every statement has been
//! attempted.

use std::time::Instant;

use crate::definitions::{MigrationDirection, RollbackResult};
use crate::error::MigrationResult;
use crate::runner::MigrationRunner;
use crate::source::read_script;

/// Extension trait for MigrationRunner to add rollback functionality
#[allow(async_fn_in_trait)]
pub trait MigrationRollback {
    /// Roll back the most recently applied migration of `keyspace`
    async fn rollback_last(&self, keyspace: &str) -> MigrationResult<RollbackResult>;
}

impl MigrationRollback for MigrationRunner {
    async fn rollback_last(&self, keyspace: &str) -> MigrationResult<RollbackResult> {
        let start_time = Instant::now();

        let ledger = self.ledger(keyspace)?;
        ledger.ensure_table_exists().await?;

        let identity = ledger.most_recent_applied().await?;
        let unit = self.catalog().resolve_by_identity(keyspace, &identity)?;
        let script = read_script(&unit)?;

        tracing::info!(
            identity = %unit.identity,
            name = %unit.display_name,
            "Rolling back migration"
        );

        let mut failures = Vec::new();
        let failed = self
            .execute_statements(&unit, MigrationDirection::Down, &script.down, &mut failures)
            .await;

        ledger.delete_applied(&identity).await?;

        Ok(RollbackResult {
            keyspace: keyspace.to_string(),
            file_name: unit.file_name(),
            identity,
            statements_executed: script.down.len() - failed,
            failures,
            execution_time_ms: start_time.elapsed().as_millis(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MigrationError;
    use crate::gateway::GatewayError;
    use crate::testing::MemoryGateway;
    use cqlmig_core::{ConsistencyLevel, MigratorConfig};
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    const LEDGER: &str = "global.schema_migrations";

    fn down_only(statements: &[&str]) -> String {
        let cql: String = statements
            .iter()
            .map(|s| format!("<cql>{}</cql>", s))
            .collect();
        format!("<migration><up/><down>{}</down></migration>", cql)
    }

    fn setup(files: &[(&str, &str)]) -> (TempDir, Arc<MemoryGateway>, MigrationRunner) {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("global");
        fs::create_dir_all(&dir).unwrap();
        for (name, content) in files {
            fs::write(dir.join(name), content).unwrap();
        }
        let gateway = Arc::new(MemoryGateway::new());
        let config = MigratorConfig::testing(temp_dir.path());
        let runner = MigrationRunner::new(gateway.clone(), config);
        (temp_dir, gateway, runner)
    }

    #[tokio::test]
    async fn test_rollback_removes_only_latest() {
        let first = down_only(&["DROP TABLE a;"]);
        let second = down_only(&["DROP TABLE b;"]);
        let (_tmp, gateway, runner) = setup(&[
            ("20230101000000_a.xml", first.as_str()),
            ("20230102000000_b.xml", second.as_str()),
        ]);
        gateway.seed_ledger(LEDGER, ["20230101000000", "20230102000000"]);

        let result = runner.rollback_last("global").await.unwrap();
        assert_eq!(result.identity, "20230102000000");
        assert_eq!(result.file_name, "20230102000000_b.xml");
        assert_eq!(result.statements_executed, 1);
        assert_eq!(gateway.executed_schema_statements(), vec!["DROP TABLE b;"]);
        assert_eq!(gateway.ledger_rows(LEDGER), vec!["20230101000000"]);
    }

    #[tokio::test]
    async fn test_rollback_deletes_record_despite_failures() {
        let doc = down_only(&["DROP INDEX a_idx;", "DROP TABLE a;"]);
        let (_tmp, gateway, runner) = setup(&[("20230101000000_a.xml", doc.as_str())]);
        gateway.seed_ledger(LEDGER, ["20230101000000"]);
        gateway.fail_statements_containing(
            "DROP INDEX",
            GatewayError::InvalidRequest("no such index".into()),
        );

        let result = runner.rollback_last("global").await.unwrap();
        assert_eq!(result.statements_executed, 1);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].direction, MigrationDirection::Down);
        assert_eq!(
            gateway.executed_schema_statements(),
            vec!["DROP INDEX a_idx;", "DROP TABLE a;"]
        );
        assert!(gateway.ledger_rows(LEDGER).is_empty());
    }

    #[tokio::test]
    async fn test_down_statements_use_statement_consistency() {
        let doc = down_only(&["DROP INDEX a_idx;", "DROP TABLE a;"]);
        let (_tmp, gateway, runner) = setup(&[("20230101000000_a.xml", doc.as_str())]);
        gateway.seed_ledger(LEDGER, ["20230101000000"]);

        runner.rollback_last("global").await.unwrap();

        let mut schema_statements = 0;
        for executed in gateway.executed() {
            if executed.statement.starts_with("DROP ") {
                schema_statements += 1;
                assert_eq!(executed.consistency, ConsistencyLevel::LocalOne);
            } else {
                assert_eq!(
                    executed.consistency,
                    ConsistencyLevel::LocalQuorum,
                    "{}",
                    executed.statement
                );
            }
        }
        assert_eq!(schema_statements, 2);
    }

    #[tokio::test]
    async fn test_rollback_empty_ledger() {
        let (_tmp, gateway, runner) = setup(&[]);
        let err = runner.rollback_last("global").await.unwrap_err();
        assert!(matches!(err, MigrationError::LedgerEmpty { .. }));
        assert!(gateway.executed_schema_statements().is_empty());
    }

    #[tokio::test]
    async fn test_rollback_unknown_identity() {
        let (_tmp, gateway, runner) = setup(&[(
            "20230101000000_a.xml",
            "<migration><up/><down/></migration>",
        )]);
        gateway.seed_ledger(LEDGER, ["20230101000000", "20230105000000"]);

        let err = runner.rollback_last("global").await.unwrap_err();
        assert!(matches!(
            err,
            MigrationError::UnitNotFound { ref identity, .. } if identity == "20230105000000"
        ));
        assert_eq!(gateway.ledger_rows(LEDGER).len(), 2);
    }
}
