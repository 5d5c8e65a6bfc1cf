use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Durability / availability trade-off attached to a single statement execution.
///
/// Ledger reads and writes use the level the operator configured; schema
/// statements use [`ConsistencyLevel::STATEMENT`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(try_from = "String", into = "String")]
pub enum ConsistencyLevel {
    Any,
    One,
    LocalOne,
    Quorum,
    #[default]
    LocalQuorum,
    EachQuorum,
    All,
}

impl ConsistencyLevel {
    /// Fixed level for up/down statements and keyspace creation.
    pub const STATEMENT: ConsistencyLevel = ConsistencyLevel::LocalOne;

    /// Wire name, as understood by cqlsh and the drivers
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsistencyLevel::Any => "ANY",
            ConsistencyLevel::One => "ONE",
            ConsistencyLevel::LocalOne => "LOCAL_ONE",
            ConsistencyLevel::Quorum => "QUORUM",
            ConsistencyLevel::LocalQuorum => "LOCAL_QUORUM",
            ConsistencyLevel::EachQuorum => "EACH_QUORUM",
            ConsistencyLevel::All => "ALL",
        }
    }
}

impl FromStr for ConsistencyLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().replace('-', "_").as_str() {
            "ANY" => Ok(ConsistencyLevel::Any),
            "ONE" => Ok(ConsistencyLevel::One),
            "LOCAL_ONE" => Ok(ConsistencyLevel::LocalOne),
            "QUORUM" => Ok(ConsistencyLevel::Quorum),
            // LOCAL_QUARUM was the historical default spelling and is still accepted.
            "LOCAL_QUORUM" | "LOCAL_QUARUM" => Ok(ConsistencyLevel::LocalQuorum),
            "EACH_QUORUM" => Ok(ConsistencyLevel::EachQuorum),
            "ALL" => Ok(ConsistencyLevel::All),
            _ => Err(ConfigError::invalid_value(
                "consistency",
                s,
                "one of ANY, ONE, LOCAL_ONE, QUORUM, LOCAL_QUORUM, EACH_QUORUM, ALL",
            )),
        }
    }
}

impl TryFrom<String> for ConsistencyLevel {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ConsistencyLevel> for String {
    fn from(value: ConsistencyLevel) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
