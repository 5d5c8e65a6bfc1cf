pub mod admin;
pub mod help;
pub mod migrate;

use anyhow::Context;
use cqlmig_core::{init_logging, ConfigSource, Settings};
use std::time::Duration;

use crate::GlobalArgs;

/// Layer CLI flags over file and environment settings, then start logging
pub fn load_settings(args: &GlobalArgs) -> anyhow::Result<Settings> {
    let mut settings = Settings::load(args.config.as_deref()).context("failed to load settings")?;
    apply_overrides(&mut settings, args);
    settings.validate()?;
    init_logging(&settings.logging)?;

    tracing::debug!(
        host = %settings.connection.host,
        host_source = %settings.source_of("host"),
        migrations_dir = %settings.migrator.migrations_dir.display(),
        "Settings loaded"
    );
    Ok(settings)
}

fn apply_overrides(settings: &mut Settings, args: &GlobalArgs) {
    let mut mark = |field: &str| {
        settings
            .sources
            .insert(field.to_string(), ConfigSource::Flag);
    };

    if let Some(host) = &args.host {
        mark("host");
        settings.connection.host = host.clone();
    }
    if let Some(port) = args.port {
        mark("port");
        settings.connection.port = port;
    }
    if let Some(username) = &args.username {
        mark("username");
        settings.connection.username = Some(username.clone());
    }
    if let Some(password) = &args.password {
        mark("password");
        settings.connection.password = Some(password.clone());
    }
    if let Some(secs) = args.timeout {
        mark("timeout");
        settings.connection.timeout = Duration::from_secs(secs);
    }
    if let Some(level) = args.consistency {
        mark("consistency");
        settings.migrator.ledger_consistency = level;
    }
    if let Some(dir) = &args.migrations_dir {
        mark("migrations_dir");
        settings.migrator.migrations_dir = dir.clone();
    }
    if let Some(level) = &args.log_level {
        mark("log_level");
        settings.logging.level = level.clone();
    }
    if let Some(format) = args.log_format {
        mark("log_format");
        settings.logging.format = format;
    }
}
