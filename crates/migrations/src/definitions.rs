//! Migration Definitions - Core types shared by the catalog, ledger and engine
//!
//! Units are read-only views over files on disk. They are rebuilt on every
//! invocation and never cached between runs.

use std::path::PathBuf;

/// One migration file of a keyspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationUnit {
    /// Timestamp prefix of the file name; sole key for ordering and the ledger
    pub identity: String,
    /// Human-readable part of the file name
    pub display_name: String,
    /// Location of the migration document
    pub path: PathBuf,
}

impl MigrationUnit {
    /// File name, for messages
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.identity.clone())
    }
}

/// Parsed statements of a migration document
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MigrationScript {
    /// Statements applied in order by `migrate`
    pub up: Vec<String>,
    /// Statements applied in order by `rollback`
    pub down: Vec<String>,
}

/// Migration direction for execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationDirection {
    /// Apply the migration (run UP statements)
    Up,
    /// Rollback the migration (run DOWN statements)
    Down,
}

impl std::fmt::Display for MigrationDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MigrationDirection::Up => f.write_str("up"),
            MigrationDirection::Down => f.write_str("down"),
        }
    }
}

/// Lifecycle of a unit within one keyspace.
///
/// A finished `migrate` report only holds the last three; `status` reports
/// units without a ledger row as `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    /// No ledger row yet
    Pending,
    /// Up statements are being executed
    Applying,
    /// Every up statement succeeded and the ledger row was written
    Applied,
    /// The ledger already listed the unit; nothing was executed
    AlreadyRecorded,
    /// At least one up statement failed; treated as applied by an earlier
    /// partial run and deliberately left out of the ledger
    SkippedAlreadyApplied,
}

/// A statement that failed and was absorbed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementFailure {
    pub identity: String,
    pub file_name: String,
    pub direction: MigrationDirection,
    /// Position within the unit's statement list, starting at 0
    pub index: usize,
    pub statement: String,
    pub error: String,
}

/// Final state of one unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitOutcome {
    pub identity: String,
    pub display_name: String,
    pub state: UnitState,
}

/// Result of running migrations
#[derive(Debug, Default)]
pub struct MigrationRunResult {
    pub keyspace: String,
    /// Every catalog unit in the order it was visited
    pub outcomes: Vec<UnitOutcome>,
    /// Every statement failure absorbed during the run
    pub failures: Vec<StatementFailure>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

impl MigrationRunResult {
    fn ids_in(&self, state: UnitState) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.state == state)
            .map(|o| o.identity.as_str())
            .collect()
    }

    /// Units executed and recorded by this run
    pub fn applied(&self) -> Vec<&str> {
        self.ids_in(UnitState::Applied)
    }

    /// Units skipped because the ledger already listed them
    pub fn already_recorded(&self) -> Vec<&str> {
        self.ids_in(UnitState::AlreadyRecorded)
    }

    /// Units with failed statements, not recorded
    pub fn skipped_already_applied(&self) -> Vec<&str> {
        self.ids_in(UnitState::SkippedAlreadyApplied)
    }
}

/// Result of rolling back the most recent migration
#[derive(Debug)]
pub struct RollbackResult {
    pub keyspace: String,
    pub identity: String,
    pub file_name: String,
    /// Down statements that succeeded
    pub statements_executed: usize,
    pub failures: Vec<StatementFailure>,
    /// Total execution time in milliseconds
    pub execution_time_ms: u128,
}

/// Applied / pending view of one unit, for `status`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    pub unit: MigrationUnit,
    /// `Applied` or `Pending`, taken from the ledger
    pub state: UnitState,
}

impl MigrationStatus {
    pub fn is_applied(&self) -> bool {
        self.state != UnitState::Pending
    }
}
