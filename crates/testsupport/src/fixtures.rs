//! Prebuilt sessions and record helpers.

use common::{FieldMap, SolverConfig};
use schema::Field;
use session::Session;
use types::{FieldType, Score, Value};

use std::time::Duration;

/// Build a `FieldMap` from integer fields.
///
/// # Example
///
/// ```
/// use testsupport::fixtures::int_record;
///
/// let shift = int_record(&[("id", 1), ("day", 0), ("slot", 1)]);
/// ```
pub fn int_record(fields: &[(&str, i64)]) -> FieldMap {
    fields
        .iter()
        .map(|(name, value)| (name.to_string(), Value::Int(*value)))
        .collect()
}

/// Build a `FieldMap` from explicit values.
pub fn record(fields: &[(&str, Value)]) -> FieldMap {
    fields
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

/// Solver configuration for tests: a wall-clock cap plus a zero target so
/// the search stops at the first optimal solution instead of burning the
/// whole limit.
pub fn fast_config(time_limit_seconds: u64) -> SolverConfig {
    SolverConfig::builder()
        .time_limit(Duration::from_secs(time_limit_seconds))
        .target_score(Score::ZERO)
        .build()
}

/// An N-Queens session with the three classic conflict constraints at
/// `1hard`, one queen per column.
pub fn queens_session(n: i64) -> Session {
    queens_session_weighted(n, "1hard", "1hard")
}

/// N-Queens with explicit weight labels for the row and diagonal
/// constraints.
pub fn queens_session_weighted(n: i64, row_level: &str, diagonal_level: &str) -> Session {
    let mut s = Session::new();
    s.entity_class(
        "Queen",
        vec![
            Field::new("column", FieldType::Int),
            Field::planning("row", FieldType::Int, "rows"),
        ],
    )
    .expect("register Queen");
    s.int_range("rows", 0, n).expect("register rows range");

    let queens: Vec<FieldMap> = (0..n).map(|i| int_record(&[("column", i)])).collect();
    s.add_entities("Queen", &queens).expect("add queens");

    let row_conflict = s
        .constraint("row_conflict", row_level)
        .expect("row level")
        .for_each("Queen")
        .join("Queen", &["A.row == B.row"])
        .distinct_pair()
        .penalize();
    s.add_constraint(row_conflict).expect("row constraint");

    let ascending = s
        .constraint("ascending_diagonal", diagonal_level)
        .expect("diagonal level")
        .for_each("Queen")
        .join("Queen", &["A.row - B.row == A.column - B.column"])
        .distinct_pair()
        .penalize();
    s.add_constraint(ascending).expect("ascending constraint");

    let descending = s
        .constraint("descending_diagonal", diagonal_level)
        .expect("diagonal level")
        .for_each("Queen")
        .join("Queen", &["A.row - B.row == B.column - A.column"])
        .distinct_pair()
        .penalize();
    s.add_constraint(descending).expect("descending constraint");

    s
}

/// The basic employee scheduling roster: five named employees and ten
/// shifts laid out two per day, with the no-overlap hard constraint.
pub fn shift_roster_session() -> Session {
    let mut s = Session::new();
    s.entity_class(
        "Employee",
        vec![
            Field::new("id", FieldType::Int),
            Field::new("name", FieldType::Str),
            Field::new("max_shifts", FieldType::Int),
        ],
    )
    .expect("register Employee");
    s.entity_class(
        "Shift",
        vec![
            Field::new("id", FieldType::Int),
            Field::new("day", FieldType::Int),
            Field::new("slot", FieldType::Int),
            Field::planning("employee_id", FieldType::Int, "employee_ids"),
        ],
    )
    .expect("register Shift");
    s.int_range("employee_ids", 1, 6).expect("register range");

    let employees = [
        (1, "Alice", 5),
        (2, "Bob", 4),
        (3, "Carol", 5),
        (4, "David", 3),
        (5, "Eve", 4),
    ];
    let employees: Vec<FieldMap> = employees
        .iter()
        .map(|(id, name, max_shifts)| {
            record(&[
                ("id", Value::Int(*id)),
                ("name", Value::Str((*name).into())),
                ("max_shifts", Value::Int(*max_shifts)),
            ])
        })
        .collect();
    s.add_entities("Employee", &employees).expect("add employees");

    let shifts: Vec<FieldMap> = (0..10)
        .map(|i| int_record(&[("id", i + 1), ("day", i / 2), ("slot", i % 2)]))
        .collect();
    s.add_entities("Shift", &shifts).expect("add shifts");

    let no_overlap = s
        .constraint("no_overlap", "1hard")
        .expect("level")
        .for_each("Shift")
        .join("Shift", &["A.day == B.day", "A.slot == B.slot"])
        .filter("A.employee_id == B.employee_id")
        .distinct_pair()
        .penalize();
    s.add_constraint(no_overlap).expect("no_overlap constraint");

    s
}
