//! Settings file loading and precedence.
//!
//! Values are layered as defaults < settings file < environment; the CLI
//! applies its own flags on top of the result.

use crate::config::{ConfigError, ConfigSource, ConnectionConfig, ConsistencyLevel, MigratorConfig};
use crate::logging::LoggingConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings file looked up in the working directory when none is given
pub const DEFAULT_SETTINGS_FILE: &str = "cqlmig.yaml";

/// On-disk settings, every field optional
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SettingsFile {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub consistency: Option<ConsistencyLevel>,
    pub timeout_secs: Option<u64>,
    pub migrations_dir: Option<PathBuf>,
    pub ledger_table: Option<String>,
    pub settle_delay_ms: Option<u64>,
    pub log_level: Option<String>,
}

impl SettingsFile {
    /// Parse a settings file
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::FileSystemError {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content, path)
    }

    fn from_yaml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|source| ConfigError::ParsingError {
            path: path.display().to_string(),
            source,
        })
    }
}

/// Fully layered configuration
#[derive(Debug, Clone, Default)]
pub struct Settings {
    pub connection: ConnectionConfig,
    pub migrator: MigratorConfig,
    pub logging: LoggingConfig,
    /// Where each non-default value came from
    pub sources: HashMap<String, ConfigSource>,
}

impl Settings {
    /// Load settings from `path`, or from `cqlmig.yaml` if it exists, then the environment.
    ///
    /// An explicitly named file that is missing is an error; a missing default file is not.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => Some((SettingsFile::from_path(path)?, path.to_path_buf())),
            None => {
                let default_path = PathBuf::from(DEFAULT_SETTINGS_FILE);
                if default_path.is_file() {
                    Some((SettingsFile::from_path(&default_path)?, default_path))
                } else {
                    None
                }
            }
        };

        let mut settings = Self::default();
        if let Some((file, path)) = file {
            settings.apply_file(file, &path);
        }

        settings.connection.apply_env(&mut settings.sources)?;
        settings.migrator.apply_env(&mut settings.sources)?;
        Ok(settings)
    }

    /// Overlay a parsed settings file
    pub fn apply_file(&mut self, file: SettingsFile, path: &Path) {
        let origin = ConfigSource::File(path.to_path_buf());
        let mut mark = |field: &str| {
            self.sources.insert(field.to_string(), origin.clone());
        };

        if let Some(host) = file.host {
            self.connection.host = host;
            mark("host");
        }
        if let Some(port) = file.port {
            self.connection.port = port;
            mark("port");
        }
        if let Some(username) = file.username {
            self.connection.username = Some(username);
            mark("username");
        }
        if let Some(password) = file.password {
            self.connection.password = Some(password);
            mark("password");
        }
        if let Some(secs) = file.timeout_secs {
            self.connection.timeout = Duration::from_secs(secs);
            mark("timeout");
        }
        if let Some(level) = file.consistency {
            self.migrator.ledger_consistency = level;
            mark("consistency");
        }
        if let Some(dir) = file.migrations_dir {
            self.migrator.migrations_dir = dir;
            mark("migrations_dir");
        }
        if let Some(table) = file.ledger_table {
            self.migrator.ledger_table = table;
            mark("ledger_table");
        }
        if let Some(ms) = file.settle_delay_ms {
            self.migrator.settle_delay = Duration::from_millis(ms);
            mark("settle_delay");
        }
        if let Some(level) = file.log_level {
            self.logging.level = level;
            mark("log_level");
        }
    }

    /// Validate every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.connection.validate()?;
        self.migrator.validate()?;
        self.logging.validate()
    }

    /// Source of a field, `Default` when nothing overrode it
    pub fn source_of(&self, field: &str) -> ConfigSource {
        self.sources
            .get(field)
            .cloned()
            .unwrap_or(ConfigSource::Default)
    }
}
