#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::{collections::HashMap, time::Duration};
use thiserror::Error;
use types::{Score, Value};

/// Ordinal of a field within an entity-class schema.
/// Examples:
/// - `let id_field: FieldId = 0; // maps to "id"`
/// - `let row_field: FieldId = 1; // maps to "row"`
pub type FieldId = u16;

/// Logical identifier for an entity class registered in the schema registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClassId(pub u32);

/// Logical identifier for a named value range.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RangeId(pub u32);

/// Stable handle to an entity instance: class plus slot in that class's
/// dense storage. Handles order canonically (class first, then slot),
/// which is what distinct-pair elimination keys on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityHandle {
    pub class: ClassId,
    pub slot: u32,
}

/// Positional entity tuple backed by `types::Value`.
/// Examples:
/// - `let rec = Record::new(vec![Value::Int(1)]);`
/// - `let rec = Record::new(vec![Value::Int(1), Value::Str("alice".into())]);`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub values: Vec<Value>,
}

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

impl From<Vec<Value>> for Record {
    fn from(values: Vec<Value>) -> Self {
        Record::new(values)
    }
}

/// Named view of an entity keyed by field name. This is the surface
/// representation used by `add_entities` and the result view; internally
/// entities are positional `Record`s.
pub type FieldMap = HashMap<String, Value>;

/// Canonical error type shared across solver subsystems.
#[derive(Error, Debug)]
pub enum SolverError {
    #[error("schema: {0}")]
    Schema(String),
    #[error("predicate: {0}")]
    Predicate(String),
    #[error("binding: {0}")]
    Binding(String),
    #[error("data: {0}")]
    Data(String),
    #[error("usage: {0}")]
    Usage(String),
}

/// Result alias that carries a `SolverError`.
pub type SolverResult<T> = Result<T, SolverError>;

/// Counters collected over one `solve` invocation.
///
/// # Examples
/// ```
/// use common::SolveStats;
/// use std::time::Duration;
///
/// let stats = SolveStats {
///     steps: 12,
///     moves_evaluated: 96,
///     duration: Duration::from_millis(1500),
/// };
/// assert_eq!(stats.duration_ms(), 1500);
/// ```
#[derive(Clone, Debug, Default)]
pub struct SolveStats {
    /// Accepted moves that changed the working solution.
    pub steps: u64,
    /// Candidate assignments evaluated, accepted or not.
    pub moves_evaluated: u64,
    /// Wall-clock time spent inside the solve loop.
    pub duration: Duration,
}

impl SolveStats {
    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }
}

/// Runtime configuration for one solve.
///
/// # Example
/// ```
/// use common::SolverConfig;
/// use std::time::Duration;
/// use types::Score;
///
/// let config = SolverConfig::builder()
///     .time_limit(Duration::from_secs(10))
///     .target_score(Score::ZERO)
///     .seed(7)
///     .build();
/// ```
#[derive(Clone, Debug, bon::Builder)]
pub struct SolverConfig {
    /// Wall-clock budget for the search loop.
    #[builder(default = Duration::from_secs(30))]
    pub time_limit: Duration,
    /// Stop after this many consecutive steps without a best-so-far
    /// improvement.
    pub unimproved_step_limit: Option<u64>,
    /// Stop as soon as the best-so-far reaches this score.
    pub target_score: Option<Score>,
    /// Seed for the deterministic restart perturbations.
    #[builder(default = 0)]
    pub seed: u64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            time_limit: Duration::from_secs(30),
            unimproved_step_limit: None,
            target_score: None,
            seed: 0,
        }
    }
}
