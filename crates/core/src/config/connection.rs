use crate::config::{ConfigError, ConfigSource, ConfigValidator, PortValidator};
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 9042;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Where and how to reach the cluster.
#[derive(Clone)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Default request timeout applied to every statement
    pub timeout: Duration,
}

impl ConnectionConfig {
    /// Create a configuration pointing at a local node
    pub fn new() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            username: None,
            password: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create a configuration for the given host, keeping the other defaults
    pub fn with_host(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            ..Self::new()
        }
    }

    /// `host:port` string handed to the driver
    pub fn node_address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }

    /// Whether the target is this machine.
    ///
    /// Keyspace creation is only allowed against local targets.
    pub fn is_local(&self) -> bool {
        let host = self.host.trim().trim_start_matches('[').trim_end_matches(']');
        if host.eq_ignore_ascii_case("localhost") {
            return true;
        }
        host.parse::<IpAddr>()
            .map(|ip| ip.is_loopback())
            .unwrap_or(false)
    }

    /// Credentials, if both halves are configured
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
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
        if let Some(host) = lookup("CQLMIG_HOST") {
            self.host = host;
            sources.insert("host".to_string(), ConfigSource::Env("CQLMIG_HOST"));
        }

        if let Some(port_str) = lookup("CQLMIG_PORT") {
            self.port = port_str.parse().map_err(|_| {
                ConfigError::invalid_value("port", &port_str, "valid port number (1-65535)")
            })?;
            sources.insert("port".to_string(), ConfigSource::Env("CQLMIG_PORT"));
        }

        if let Some(username) = lookup("CQLMIG_USERNAME") {
            self.username = Some(username);
            sources.insert("username".to_string(), ConfigSource::Env("CQLMIG_USERNAME"));
        }

        if let Some(password) = lookup("CQLMIG_PASSWORD") {
            self.password = Some(password);
            sources.insert("password".to_string(), ConfigSource::Env("CQLMIG_PASSWORD"));
        }

        if let Some(timeout_str) = lookup("CQLMIG_TIMEOUT") {
            let secs: u64 = timeout_str.parse().map_err(|_| {
                ConfigError::invalid_value("timeout", &timeout_str, "whole number of seconds")
            })?;
            self.timeout = Duration::from_secs(secs);
            sources.insert("timeout".to_string(), ConfigSource::Env("CQLMIG_TIMEOUT"));
        }

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "host",
                &self.host,
                "non-empty host name or address",
            ));
        }

        PortValidator::default().validate(&self.port)?;

        if self.timeout.is_zero() {
            return Err(ConfigError::invalid_value(
                "timeout",
                "0",
                "timeout of at least one second",
            ));
        }

        match (&self.username, &self.password) {
            (Some(_), None) => Err(ConfigError::missing_required(
                "password",
                "A username was given without a password",
            )),
            (None, Some(_)) => Err(ConfigError::missing_required(
                "username",
                "A password was given without a username",
            )),
            _ => Ok(()),
        }
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new()
    }
}

// Hand-written so passwords never end up in logs.
impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_target_local_node() {
        let config = ConnectionConfig::default();
        assert_eq!(config.node_address(), "127.0.0.1:9042");
        assert!(config.is_local());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_is_local() {
        assert!(ConnectionConfig::with_host("localhost").is_local());
        assert!(ConnectionConfig::with_host("127.0.0.2").is_local());
        assert!(ConnectionConfig::with_host("::1").is_local());
        assert!(!ConnectionConfig::with_host("10.0.0.5").is_local());
        assert!(!ConnectionConfig::with_host("cassandra.prod.internal").is_local());
    }

    #[test]
    fn test_ipv6_node_address_is_bracketed() {
        let config = ConnectionConfig::with_host("::1");
        assert_eq!(config.node_address(), "[::1]:9042");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ConnectionConfig::new();
        let mut sources = HashMap::new();
        config
            .apply_env_with(
                env_from(&[
                    ("CQLMIG_HOST", "10.1.2.3"),
                    ("CQLMIG_PORT", "19042"),
                    ("CQLMIG_TIMEOUT", "5"),
                ]),
                &mut sources,
            )
            .unwrap();

        assert_eq!(config.host, "10.1.2.3");
        assert_eq!(config.port, 19042);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(sources["host"], ConfigSource::Env("CQLMIG_HOST"));
        assert!(!sources.contains_key("username"));
    }

    #[test]
    fn test_env_rejects_bad_port() {
        let mut config = ConnectionConfig::new();
        let env = env_from(&[("CQLMIG_PORT", "nine")]);
        let result = config.apply_env_with(env, &mut HashMap::new());
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_credentials_must_come_in_pairs() {
        let mut config = ConnectionConfig::new();
        config.username = Some("cassandra".to_string());
        assert!(config.validate().is_err());
        assert!(config.credentials().is_none());

        config.password = Some("secret".to_string());
        assert!(config.validate().is_ok());
        assert_eq!(config.credentials(), Some(("cassandra", "secret")));
    }

    #[test]
    fn test_debug_redacts_password() {
        let mut config = ConnectionConfig::new();
        config.username = Some("cassandra".to_string());
        config.password = Some("hunter2".to_string());
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("<redacted>"));
    }
}
