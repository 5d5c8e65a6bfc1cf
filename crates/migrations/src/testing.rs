//! In-memory gateway for tests
//!
//! Understands the handful of statements the ledger issues and keeps ledger
//! rows per qualified table. Every other statement is recorded and succeeds
//! unless a failure rule matches it.

use async_trait::async_trait;
use cqlmig_core::ConsistencyLevel;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use crate::gateway::{Gateway, GatewayError, GatewayResult, Row};

static TABLE_CHECK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^SELECT version FROM (\S+) LIMIT 1$").expect("valid table check pattern")
});
static CREATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^CREATE TABLE IF NOT EXISTS (\S+) \(version varchar PRIMARY KEY\)$")
        .expect("valid create pattern")
});
static SELECT_ONE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^SELECT version FROM (\S+) WHERE version = \?$").expect("valid select pattern")
});
static SELECT_ALL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^SELECT version FROM (\S+)$").expect("valid select pattern"));
static INSERT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^INSERT INTO (\S+) \(version\) VALUES \(\?\)$").expect("valid insert pattern")
});
static DELETE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^DELETE FROM (\S+) WHERE version = \?$").expect("valid delete pattern")
});

/// A statement the gateway received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutedStatement {
    pub statement: String,
    pub consistency: ConsistencyLevel,
    pub params: Vec<String>,
}

#[derive(Default)]
struct State {
    tables: HashMap<String, BTreeSet<String>>,
    executed: Vec<ExecutedStatement>,
    failures: Vec<(String, GatewayError)>,
}

/// Gateway backed by process memory
#[derive(Default)]
pub struct MemoryGateway {
    state: Mutex<State>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fail every statement containing `fragment` with `error`
    pub fn fail_statements_containing(&self, fragment: impl Into<String>, error: GatewayError) {
        self.state().failures.push((fragment.into(), error));
    }

    /// Drop all failure rules
    pub fn clear_failures(&self) {
        self.state().failures.clear();
    }

    /// Pre-populate a ledger table with applied identities
    pub fn seed_ledger<I, S>(&self, table: &str, identities: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state()
            .tables
            .entry(table.to_string())
            .or_default()
            .extend(identities.into_iter().map(Into::into));
    }

    /// Whether the ledger table has been created
    pub fn has_table(&self, table: &str) -> bool {
        self.state().tables.contains_key(table)
    }

    /// Identities recorded in a ledger table, ascending
    pub fn ledger_rows(&self, table: &str) -> Vec<String> {
        self.state()
            .tables
            .get(table)
            .map(|rows| rows.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Every statement received, in order
    pub fn executed(&self) -> Vec<ExecutedStatement> {
        self.state().executed.clone()
    }

    /// Statements received that are not ledger bookkeeping
    pub fn executed_schema_statements(&self) -> Vec<String> {
        self.state()
            .executed
            .iter()
            .filter(|e| !is_ledger_statement(&e.statement))
            .map(|e| e.statement.clone())
            .collect()
    }
}

fn is_ledger_statement(statement: &str) -> bool {
    [&TABLE_CHECK, &CREATE, &SELECT_ONE, &SELECT_ALL, &INSERT, &DELETE]
        .iter()
        .any(|pattern| pattern.is_match(statement))
}

fn unconfigured(table: &str) -> GatewayError {
    GatewayError::InvalidRequest(format!("unconfigured table {}", table))
}

fn first_param(params: &[String]) -> GatewayResult<&str> {
    params
        .first()
        .map(String::as_str)
        .ok_or_else(|| GatewayError::InvalidRequest("missing bind value".to_string()))
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn execute(
        &self,
        statement: &str,
        consistency: ConsistencyLevel,
        params: &[String],
    ) -> GatewayResult<Vec<Row>> {
        let mut state = self.state();
        state.executed.push(ExecutedStatement {
            statement: statement.to_string(),
            consistency,
            params: params.to_vec(),
        });

        if let Some((_, error)) = state
            .failures
            .iter()
            .find(|(fragment, _)| statement.contains(fragment.as_str()))
        {
            return Err(error.clone());
        }

        if let Some(caps) = CREATE.captures(statement) {
            state.tables.entry(caps[1].to_string()).or_default();
            return Ok(Vec::new());
        }

        if let Some(caps) = TABLE_CHECK.captures(statement) {
            let rows = state.tables.get(&caps[1]).ok_or_else(|| unconfigured(&caps[1]))?;
            return Ok(rows.iter().take(1).map(|id| Row::from_text([id.as_str()])).collect());
        }

        if let Some(caps) = SELECT_ONE.captures(statement) {
            let identity = first_param(params)?;
            let rows = state.tables.get(&caps[1]).ok_or_else(|| unconfigured(&caps[1]))?;
            return Ok(rows
                .get(identity)
                .map(|id| vec![Row::from_text([id.as_str()])])
                .unwrap_or_default());
        }

        if let Some(caps) = SELECT_ALL.captures(statement) {
            let rows = state.tables.get(&caps[1]).ok_or_else(|| unconfigured(&caps[1]))?;
            return Ok(rows.iter().map(|id| Row::from_text([id.as_str()])).collect());
        }

        if let Some(caps) = INSERT.captures(statement) {
            let identity = first_param(params)?.to_string();
            let rows = state
                .tables
                .get_mut(&caps[1])
                .ok_or_else(|| unconfigured(&caps[1]))?;
            rows.insert(identity);
            return Ok(Vec::new());
        }

        if let Some(caps) = DELETE.captures(statement) {
            let identity = first_param(params)?.to_string();
            let rows = state
                .tables
                .get_mut(&caps[1])
                .ok_or_else(|| unconfigured(&caps[1]))?;
            rows.remove(&identity);
            return Ok(Vec::new());
        }

        Ok(Vec::new())
    }
}
