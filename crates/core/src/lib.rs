//! Shared configuration and logging for cqlmig.
//!
//! Every component receives its configuration explicitly; nothing here is
//! global apart from the tracing subscriber installed by [`init_logging`].

pub mod config;
pub mod logging;

pub use config::{
    ConfigError, ConfigSource, ConnectionConfig, ConsistencyLevel, MigratorConfig, Settings,
    SettingsFile,
};
pub use logging::{init_logging, LogFormat, LoggingConfig};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Tool name used in help output and log targets
pub const TOOL_NAME: &str = "cqlmig";
