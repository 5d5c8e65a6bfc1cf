//! Migration Runner - Executes migrations against a keyspace
//!
//! Units are visited strictly in identity order. Statements within a unit are
//! not atomic: a failed statement is logged, collected in the run report and
//! execution moves on to the next one.
//!
//! A unit with any failed up statement is treated as already applied by an
//! earlier partial run and is not written to the ledger. The store gives no
//! way to tell a duplicate-schema error from any other failure, so every
//! failure is reported and operators decide.

use std::sync::Arc;
use std::time::Instant;

use cqlmig_core::MigratorConfig;

use crate::catalog::MigrationCatalog;
use crate::definitions::{
    MigrationDirection, MigrationRunResult, MigrationStatus, MigrationUnit, StatementFailure,
    UnitOutcome, UnitState,
};
use crate::error::{MigrationError, MigrationResult};
use crate::gateway::Gateway;
use crate::ledger::Ledger;
use crate::source::read_script;

/// Migration runner bound to one gateway session
pub struct MigrationRunner {
    gateway: Arc<dyn Gateway>,
    catalog: MigrationCatalog,
    config: MigratorConfig,
}

impl MigrationRunner {
    /// Create a new migration runner
    pub fn new(gateway: Arc<dyn Gateway>, config: MigratorConfig) -> Self {
        let catalog = MigrationCatalog::new(config.migrations_dir.clone());
        Self {
            gateway,
            catalog,
            config,
        }
    }

    /// Get the migration catalog
    pub fn catalog(&self) -> &MigrationCatalog {
        &self.catalog
    }

    /// Get the runner configuration
    pub fn config(&self) -> &MigratorConfig {
        &self.config
    }

    pub(crate) fn ledger(&self, keyspace: &str) -> MigrationResult<Ledger> {
        Ledger::new(self.gateway.clone(), keyspace, &self.config)
    }

    /// Apply every pending unit of `keyspace`
    pub async fn run_migrations(&self, keyspace: &str) -> MigrationResult<MigrationRunResult> {
        let start_time = Instant::now();

        let ledger = self.ledger(keyspace)?;
        ledger.ensure_table_exists().await?;

        let units = self.catalog.list_units(keyspace)?;
        let mut result = MigrationRunResult {
            keyspace: keyspace.to_string(),
            ..Default::default()
        };

        for unit in &units {
            let state = self.apply_unit(&ledger, unit, &mut result.failures).await?;
            result.outcomes.push(UnitOutcome {
                identity: unit.identity.clone(),
                display_name: unit.display_name.clone(),
                state,
            });
        }

        result.execution_time_ms = start_time.elapsed().as_millis();
        tracing::info!(
            keyspace = %keyspace,
            applied = result.applied().len(),
            skipped = result.skipped_already_applied().len(),
            already_recorded = result.already_recorded().len(),
            elapsed_ms = result.execution_time_ms as u64,
            "Migration run finished"
        );
        Ok(result)
    }

    async fn apply_unit(
        &self,
        ledger: &Ledger,
        unit: &MigrationUnit,
        failures: &mut Vec<StatementFailure>,
    ) -> MigrationResult<UnitState> {
        if ledger.is_applied(&unit.identity).await? {
            tracing::debug!(identity = %unit.identity, "Already recorded, skipping");
            return Ok(UnitState::AlreadyRecorded);
        }

        let script = read_script(unit)?;
        tracing::info!(
            identity = %unit.identity,
            name = %unit.display_name,
            state = ?UnitState::Applying,
            "Applying migration"
        );

        let had_failure = self
            .execute_statements(unit, MigrationDirection::Up, &script.up, failures)
            .await
            > 0;

        if had_failure {
            tracing::warn!(
                identity = %unit.identity,
                file = %unit.file_name(),
                "Migration had failing statements; it was probably applied before and is not recorded"
            );
            return Ok(UnitState::SkippedAlreadyApplied);
        }

        ledger.record_applied(&unit.identity).await?;
        Ok(UnitState::Applied)
    }

    /// Execute statements in order; returns how many failed.
    ///
    /// The settle delay follows each successful up statement.
    pub(crate) async fn execute_statements(
        &self,
        unit: &MigrationUnit,
        direction: MigrationDirection,
        statements: &[String],
        failures: &mut Vec<StatementFailure>,
    ) -> usize {
        let mut failed = 0;

        for (index, statement) in statements.iter().enumerate() {
            match self
                .gateway
                .execute(statement, self.config.statement_consistency, &[])
                .await
            {
                Ok(_) => {
                    if direction == MigrationDirection::Up && !self.config.settle_delay.is_zero() {
                        tokio::time::sleep(self.config.settle_delay).await;
                    }
                }
                Err(error) => {
                    failed += 1;
                    tracing::warn!(
                        identity = %unit.identity,
                        file = %unit.file_name(),
                        direction = %direction,
                        statement = %statement,
                        error = %error,
                        "Statement failed"
                    );
                    failures.push(StatementFailure {
                        identity: unit.identity.clone(),
                        file_name: unit.file_name(),
                        direction,
                        index,
                        statement: statement.clone(),
                        error: error.to_string(),
                    });
                }
            }
        }

        failed
    }

    /// Most recently applied identity
    pub async fn current(&self, keyspace: &str) -> MigrationResult<String> {
        let ledger = self.ledger(keyspace)?;
        ledger.ensure_table_exists().await?;
        ledger.most_recent_applied().await.map_err(|e| {
            if e.is_empty_ledger() {
                MigrationError::NoMigrationsApplied {
                    keyspace: keyspace.to_string(),
                }
            } else {
                e
            }
        })
    }

    /// Applied / pending view of every catalog unit
    pub async fn status(&self, keyspace: &str) -> MigrationResult<Vec<MigrationStatus>> {
        let ledger = self.ledger(keyspace)?;
        ledger.ensure_table_exists().await?;

        let applied = ledger.applied_identities().await?;
        let units = self.catalog.list_units(keyspace)?;

        Ok(units
            .into_iter()
            .map(|unit| {
                let state = if applied.binary_search(&unit.identity).is_ok() {
                    UnitState::Applied
                } else {
                    UnitState::Pending
                };
                MigrationStatus { unit, state }
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayError;
    use crate::rollback::MigrationRollback;
    use crate::testing::MemoryGateway;
    use cqlmig_core::ConsistencyLevel;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    const LEDGER: &str = "global.schema_migrations";

    fn doc(up: &[&str], down: &[&str]) -> String {
        let cql = |stmts: &[&str]| {
            stmts
                .iter()
                .map(|s| format!("<cql><![CDATA[{}]]></cql>", s))
                .collect::<String>()
        };
        format!(
            "<migration><up>{}</up><down>{}</down></migration>",
            cql(up),
            cql(down)
        )
    }

    fn setup(files: &[(&str, String)]) -> (TempDir, Arc<MemoryGateway>, MigrationRunner) {
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
    async fn test_units_applied_in_identity_order() {
        let (_tmp, gateway, runner) = setup(&[
            ("20230103000000_c.xml", doc(&["CREATE TABLE c (id int PRIMARY KEY);"], &[])),
            ("20230101000000_a.xml", doc(&["CREATE TABLE a (id int PRIMARY KEY);"], &[])),
            ("20230102000000_b.xml", doc(&["CREATE TABLE b (id int PRIMARY KEY);"], &[])),
        ]);

        let result = runner.run_migrations("global").await.unwrap();
        assert_eq!(
            result.applied(),
            vec!["20230101000000", "20230102000000", "20230103000000"]
        );
        assert_eq!(
            gateway.executed_schema_statements(),
            vec![
                "CREATE TABLE a (id int PRIMARY KEY);",
                "CREATE TABLE b (id int PRIMARY KEY);",
                "CREATE TABLE c (id int PRIMARY KEY);",
            ]
        );
    }

    #[tokio::test]
    async fn test_partial_failure_is_contained() {
        let (_tmp, gateway, runner) = setup(&[
            (
                "20230101000000_a.xml",
                doc(
                    &[
                        "CREATE TABLE one (id int PRIMARY KEY);",
                        "CREATE TABLE two (id int PRIMARY KEY);",
                        "CREATE TABLE three (id int PRIMARY KEY);",
                    ],
                    &[],
                ),
            ),
            ("20230102000000_b.xml", doc(&["CREATE TABLE four (id int PRIMARY KEY);"], &[])),
        ]);
        gateway.fail_statements_containing(
            "CREATE TABLE two",
            GatewayError::InvalidRequest("Table two already exists".into()),
        );

        let result = runner.run_migrations("global").await.unwrap();

        assert!(gateway
            .executed_schema_statements()
            .contains(&"CREATE TABLE three (id int PRIMARY KEY);".to_string()));
        assert_eq!(result.skipped_already_applied(), vec!["20230101000000"]);
        assert_eq!(result.applied(), vec!["20230102000000"]);
        assert_eq!(gateway.ledger_rows(LEDGER), vec!["20230102000000"]);

        assert_eq!(result.failures.len(), 1);
        let failure = &result.failures[0];
        assert_eq!(failure.index, 1);
        assert_eq!(failure.direction, MigrationDirection::Up);
        assert_eq!(failure.file_name, "20230101000000_a.xml");
        assert!(failure.error.contains("already exists"));
    }

    #[tokio::test]
    async fn test_statement_timeout_takes_failure_path() {
        let (_tmp, gateway, runner) = setup(&[
            (
                "20230101000000_a.xml",
                doc(
                    &[
                        "CREATE TABLE a (id int PRIMARY KEY, v int);",
                        "CREATE INDEX a_v ON a (v);",
                    ],
                    &[],
                ),
            ),
            ("20230102000000_b.xml", doc(&["CREATE TABLE b (id int PRIMARY KEY);"], &[])),
        ]);
        gateway.fail_statements_containing(
            "CREATE INDEX",
            GatewayError::Timeout("write timeout".into()),
        );

        let result = runner.run_migrations("global").await.unwrap();

        assert_eq!(result.skipped_already_applied(), vec!["20230101000000"]);
        assert_eq!(result.applied(), vec!["20230102000000"]);
        assert_eq!(gateway.ledger_rows(LEDGER), vec!["20230102000000"]);
        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].index, 1);
        assert!(result.failures[0].error.contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_settle_delay_follows_successful_up_statements_only() {
        let (tmp, _, _) = setup(&[(
            "20230101000000_a.xml",
            doc(
                &[
                    "CREATE TABLE one (id int PRIMARY KEY);",
                    "CREATE TABLE two (id int PRIMARY KEY);",
                    "CREATE TABLE three (id int PRIMARY KEY);",
                ],
                &["DROP TABLE three;", "DROP TABLE one;"],
            ),
        )]);
        let gateway = Arc::new(MemoryGateway::new());
        let mut config = MigratorConfig::testing(tmp.path());
        config.settle_delay = Duration::from_millis(500);
        let runner = MigrationRunner::new(gateway.clone(), config);
        gateway.fail_statements_containing(
            "CREATE TABLE two",
            GatewayError::InvalidRequest("Table two already exists".into()),
        );

        let started = tokio::time::Instant::now();
        runner.run_migrations("global").await.unwrap();
        let elapsed = started.elapsed();
        assert!(
            elapsed >= Duration::from_millis(1000) && elapsed < Duration::from_millis(1500),
            "{:?}",
            elapsed
        );

        gateway.seed_ledger(LEDGER, ["20230101000000"]);
        let started = tokio::time::Instant::now();
        let rollback = runner.rollback_last("global").await.unwrap();
        assert_eq!(rollback.statements_executed, 2);
        assert!(started.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn test_invalid_keyspace_executes_nothing() {
        let (_tmp, gateway, runner) = setup(&[(
            "20230101000000_a.xml",
            doc(&["CREATE TABLE a (id int PRIMARY KEY);"], &[]),
        )]);

        for keyspace in ["ks.t LIMIT 1; DROP KEYSPACE prod --", "../global", ""] {
            let err = runner.run_migrations(keyspace).await.unwrap_err();
            assert!(matches!(err, MigrationError::InvalidKeyspaceName { .. }), "{}", keyspace);

            let err = runner.status(keyspace).await.unwrap_err();
            assert!(matches!(err, MigrationError::InvalidKeyspaceName { .. }));
            let err = runner.current(keyspace).await.unwrap_err();
            assert!(matches!(err, MigrationError::InvalidKeyspaceName { .. }));
            let err = runner.rollback_last(keyspace).await.unwrap_err();
            assert!(matches!(err, MigrationError::InvalidKeyspaceName { .. }));
        }
        assert!(gateway.executed().is_empty());
    }

    #[tokio::test]
    async fn test_recorded_units_execute_nothing() {
        let (_tmp, gateway, runner) = setup(&[(
            "20230101000000_a.xml",
            doc(&["CREATE TABLE a (id int PRIMARY KEY);"], &[]),
        )]);
        gateway.seed_ledger(LEDGER, ["20230101000000"]);

        let result = runner.run_migrations("global").await.unwrap();
        assert_eq!(result.already_recorded(), vec!["20230101000000"]);
        assert!(gateway.executed_schema_statements().is_empty());
    }

    #[tokio::test]
    async fn test_statements_use_statement_consistency() {
        let (_tmp, gateway, runner) = setup(&[(
            "20230101000000_a.xml",
            doc(&["CREATE TABLE a (id int PRIMARY KEY);"], &[]),
        )]);

        runner.run_migrations("global").await.unwrap();

        for executed in gateway.executed() {
            let expected = if executed.statement.starts_with("CREATE TABLE a") {
                ConsistencyLevel::LocalOne
            } else {
                ConsistencyLevel::LocalQuorum
            };
            assert_eq!(executed.consistency, expected, "{}", executed.statement);
        }
    }

    #[tokio::test]
    async fn test_malformed_document_aborts_run() {
        let (_tmp, gateway, runner) = setup(&[
            ("20230101000000_a.xml", "<migration><up/></migration>".to_string()),
            ("20230102000000_b.xml", doc(&["CREATE TABLE b (id int PRIMARY KEY);"], &[])),
        ]);

        let err = runner.run_migrations("global").await.unwrap_err();
        assert!(matches!(
            err,
            MigrationError::MalformedDocument { ref identity, .. } if identity == "20230101000000"
        ));
        assert!(gateway.executed_schema_statements().is_empty());
    }

    #[tokio::test]
    async fn test_ledger_read_failure_is_fatal() {
        let (_tmp, gateway, runner) = setup(&[(
            "20230101000000_a.xml",
            doc(&["CREATE TABLE a (id int PRIMARY KEY);"], &[]),
        )]);
        gateway.seed_ledger(LEDGER, Vec::<String>::new());
        gateway.fail_statements_containing(
            "WHERE version = ?",
            GatewayError::Timeout("read timeout".into()),
        );

        let err = runner.run_migrations("global").await.unwrap_err();
        assert!(matches!(err, MigrationError::LedgerReadFailed { .. }));
    }

    #[tokio::test]
    async fn test_current_and_status() {
        let (_tmp, gateway, runner) = setup(&[
            ("20230101000000_a.xml", doc(&[], &[])),
            ("20230102000000_b.xml", doc(&[], &[])),
        ]);

        let err = runner.current("global").await.unwrap_err();
        assert!(matches!(err, MigrationError::NoMigrationsApplied { .. }));

        gateway.seed_ledger(LEDGER, ["20230101000000"]);
        assert_eq!(runner.current("global").await.unwrap(), "20230101000000");

        let status = runner.status("global").await.unwrap();
        assert_eq!(status.len(), 2);
        assert_eq!(status[0].state, UnitState::Applied);
        assert_eq!(status[1].state, UnitState::Pending);
        assert!(status[0].is_applied());
        assert!(!status[1].is_applied());
    }

    #[tokio::test]
    async fn test_missing_catalog_is_reported() {
        let (_tmp, _gateway, runner) = setup(&[]);
        let err = runner.run_migrations("local").await.unwrap_err();
        assert!(matches!(err, MigrationError::CatalogUnavailable { .. }));
    }
}
