use crate::config::{
    ConfigError, ConfigSource, ConfigValidator, ConsistencyLevel, IdentifierValidator,
};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MIGRATIONS_DIR: &str = "migrations";
pub const DEFAULT_LEDGER_TABLE: &str = "schema_migrations";
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Configuration for the migration engine and its ledger
#[derive(Debug, Clone)]
pub struct MigratorConfig {
    /// Root directory; each keyspace has its own subdirectory
    pub migrations_dir: PathBuf,
    /// Table tracking applied migrations
    pub ledger_table: String,
    /// Level used for ledger reads and writes
    pub ledger_consistency: ConsistencyLevel,
    /// Level used for up/down statements
    pub statement_consistency: ConsistencyLevel,
    /// Pause after each successful up statement so schema changes can propagate
    pub settle_delay: Duration,
}

impl MigratorConfig {
    pub fn new() -> Self {
        Self {
            migrations_dir: PathBuf::from(DEFAULT_MIGRATIONS_DIR),
            ledger_table: DEFAULT_LEDGER_TABLE.to_string(),
            ledger_consistency: ConsistencyLevel::default(),
            statement_consistency: ConsistencyLevel::STATEMENT,
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }

    /// Configuration for tests: custom directory, no settle delay
    pub fn testing(migrations_dir: impl Into<PathBuf>) -> Self {
        Self {
            migrations_dir: migrations_dir.into(),
            settle_delay: Duration::ZERO,
            ..Self::new()
        }
    }

    /// Overlay values from environment variables
    pub fn apply_env(
        &mut self,
        sources: &mut HashMap<String, ConfigSource>,
    ) -> Result<(), ConfigError> {
        self.apply_env_with(|key| std::env::var(key).ok(), sources)
    }

    pub(crate) fn apply_env_with<F>(
        &mut self,
        lookup: F,
        sources: &mut HashMap<String, ConfigSource>,
    ) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("CQLMIG_MIGRATIONS_DIR") {
            self.migrations_dir = PathBuf::from(dir);
            sources.insert(
                "migrations_dir".to_string(),
                ConfigSource::Env("CQLMIG_MIGRATIONS_DIR"),
            );
        }

        if let Some(level) = lookup("CQLMIG_CONSISTENCY") {
            self.ledger_consistency = level.parse()?;
            sources.insert("consistency".to_string(), ConfigSource::Env("CQLMIG_CONSISTENCY"));
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        IdentifierValidator { field: "ledger_table" }.validate(&self.ledger_table)?;

        if self.migrations_dir.as_os_str().is_empty() {
            return Err(ConfigError::invalid_value(
                "migrations_dir",
                "",
                "path to the migrations root directory",
            ));
        }

        Ok(())
    }
}

impl Default for MigratorConfig {
    fn default() -> Self {
        Self::new()
    }
}
