use thiserror::Error;

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required field: {field}. {hint}")]
    MissingRequired { field: String, hint: String },

    #[error("Invalid value for field '{field}': '{value}'. Expected: {expected}")]
    InvalidValue {
        field: String,
        value: String,
        expected: String,
    },

    #[error("Failed to read settings file '{path}': {source}")]
    FileSystemError {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse settings file '{path}': {source}")]
    ParsingError {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("Logging setup failed: {message}")]
    Logging { message: String },
}

impl ConfigError {
    /// Create a missing required field error
    pub fn missing_required(field: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::MissingRequired {
            field: field.into(),
            hint: hint.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }
}

/// Trait for validating configuration values
pub trait ConfigValidator<T> {
    /// Validate a configuration value
    fn validate(&self, value: &T) -> Result<(), ConfigError>;
}

/// Port number validator
pub struct PortValidator {
    pub min: u16,
    pub max: u16,
}

impl Default for PortValidator {
    fn default() -> Self {
        Self { min: 1, max: 65535 }
    }
}

impl ConfigValidator<u16> for PortValidator {
    fn validate(&self, value: &u16) -> Result<(), ConfigError> {
        if *value < self.min || *value > self.max {
            return Err(ConfigError::invalid_value(
                "port",
                value.to_string(),
                format!("port between {} and {}", self.min, self.max),
            ));
        }
        Ok(())
    }
}

/// CQL identifier validator, used for keyspace and table names that end up
/// interpolated into statements.
pub struct IdentifierValidator {
    pub field: &'static str,
}

impl ConfigValidator<String> for IdentifierValidator {
    fn validate(&self, value: &String) -> Result<(), ConfigError> {
        if is_cql_identifier(value) {
            Ok(())
        } else {
            Err(ConfigError::invalid_value(
                self.field,
                value.clone(),
                "an unquoted CQL identifier (letter first, then letters, digits or '_', at most 48 characters)",
            ))
        }
    }
}

/// Whether `value` is an unquoted CQL identifier usable as a keyspace or table name.
pub fn is_cql_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {}
        _ => return false,
    }
    value.len() <= 48 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
