//! Database gateway abstraction
//!
//! The engine and ledger only ever talk to the cluster through [`Gateway`]:
//! one statement at a time, each with an explicit consistency level.

use async_trait::async_trait;
use cqlmig_core::ConsistencyLevel;
use thiserror::Error;

pub mod cluster;

pub use self::cluster::ScyllaGateway;

/// Gateway result type alias
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Typed failure of a single statement execution
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// The session is gone or the node refused the request
    #[error("not connected: {0}")]
    NotConnected(String),

    /// The node rejected the statement (syntax, unknown table, already exists, ...)
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No response within the session's request timeout
    #[error("timed out: {0}")]
    Timeout(String),
}

/// One result row; text columns only, other types come back as `None`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Row {
    pub columns: Vec<Option<String>>,
}

impl Row {
    /// Build a row from text values
    pub fn from_text<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: values.into_iter().map(|v| Some(v.into())).collect(),
        }
    }

    /// Text value of a column, if present and textual
    pub fn text(&self, index: usize) -> Option<&str> {
        self.columns.get(index).and_then(|c| c.as_deref())
    }
}

/// Executes single statements against the cluster.
///
/// Implementations own connection setup, authentication and the per-request
/// timeout; a timeout must surface as [`GatewayError::Timeout`].
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Execute one statement with positional text parameters
    async fn execute(
        &self,
        statement: &str,
        consistency: ConsistencyLevel,
        params: &[String],
    ) -> GatewayResult<Vec<Row>>;
}
