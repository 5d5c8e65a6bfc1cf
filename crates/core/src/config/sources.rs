use std::fmt;
use std::path::PathBuf;

/// Layer a setting was taken from, lowest precedence first
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Built-in default
    Default,
    /// `cqlmig.yaml` or the file named with `--config`
    File(PathBuf),
    /// A `CQLMIG_*` environment variable
    Env(&'static str),
    /// A command-line flag
    Flag,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Default => f.write_str("default"),
            ConfigSource::File(path) => write!(f, "settings file {}", path.display()),
            ConfigSource::Env(var) => write!(f, "environment variable {}", var),
            ConfigSource::Flag => f.write_str("command line"),
        }
    }
}
