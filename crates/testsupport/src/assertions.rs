//! Custom assertion helpers for solver testing.

use common::{FieldMap, SolverResult};
use session::SolveOutcome;

use std::collections::HashSet;

/// Assert that an outcome reached feasibility (zero hard score).
pub fn assert_feasible(outcome: &SolveOutcome) {
    assert!(
        outcome.is_feasible(),
        "expected a feasible outcome, got hard {} / soft {}",
        outcome.hard_score(),
        outcome.soft_score()
    );
}

/// Assert that an operation returns an error containing a specific
/// substring.
///
/// # Example
///
/// ```
/// use common::{SolverError, SolverResult};
/// use testsupport::assertions::assert_error_contains;
///
/// let result: SolverResult<()> = Err(SolverError::Binding("unknown class 'Rook'".into()));
/// assert_error_contains(result, "unknown class");
/// ```
pub fn assert_error_contains<T>(result: SolverResult<T>, expected_msg: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}', but got Ok", expected_msg),
        Err(e) => {
            let error_string = e.to_string();
            assert!(
                error_string.contains(expected_msg),
                "Expected error to contain '{}', but got: {}",
                expected_msg,
                error_string
            );
        }
    }
}

/// Read an int field out of an entity snapshot, panicking with context on
/// absence or a type mismatch.
pub fn int_field(entity: &FieldMap, name: &str) -> i64 {
    entity
        .get(name)
        .unwrap_or_else(|| panic!("entity has no field '{name}': {entity:?}"))
        .as_int()
        .unwrap_or_else(|| panic!("field '{name}' is not an int: {entity:?}"))
}

/// Assert that the given int field is unique across all entities.
pub fn assert_field_all_distinct(entities: &[FieldMap], name: &str) {
    let mut seen = HashSet::new();
    for entity in entities {
        let value = int_field(entity, name);
        assert!(
            seen.insert(value),
            "field '{name}' value {value} appears more than once"
        );
    }
}

/// Collect one int field from every entity, in order.
pub fn int_column(entities: &[FieldMap], name: &str) -> Vec<i64> {
    entities.iter().map(|e| int_field(e, name)).collect()
}

/// Assert that a value appears in an iterator of entities at most once
/// per key produced by `key`.
pub fn assert_unique_by<F, K>(entities: &[FieldMap], mut key: F)
where
    F: FnMut(&FieldMap) -> Option<K>,
    K: std::hash::Hash + Eq + std::fmt::Debug,
{
    let mut seen = HashSet::new();
    for entity in entities {
        if let Some(k) = key(entity) {
            assert!(
                !seen.contains(&k),
                "duplicate key {k:?} detected in {entity:?}"
            );
            seen.insert(k);
        }
    }
}
