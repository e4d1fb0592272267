//! End-to-end N-Queens scenarios.

use testsupport::prelude::*;

use common::SolverConfig;
use std::time::Duration;

/// No two rows repeat and no two queens share a diagonal.
fn assert_queens_placement(queens: &[common::FieldMap]) {
    assert_field_all_distinct(queens, "row");
    for (i, a) in queens.iter().enumerate() {
        for b in &queens[i + 1..] {
            let dr = (int_field(a, "row") - int_field(b, "row")).abs();
            let dc = (int_field(a, "column") - int_field(b, "column")).abs();
            assert_ne!(
                dr, dc,
                "queens at columns {} and {} share a diagonal",
                int_field(a, "column"),
                int_field(b, "column")
            );
        }
    }
}

#[test]
fn four_queens_reaches_a_conflict_free_board() {
    init_tracing();
    let mut s = queens_session(4);
    let result = s.solve_with(fast_config(5)).unwrap();

    assert_feasible(&result);
    assert_eq!(result.hard_score(), 0);

    let queens = result.get_entities("Queen").unwrap();
    assert_eq!(queens.len(), 4);
    assert_queens_placement(queens);
}

#[test]
fn eight_queens_within_ten_seconds() {
    init_tracing();
    let mut s = queens_session(8);
    let result = s.solve_with(fast_config(10)).unwrap();

    assert_feasible(&result);
    let queens = result.get_entities("Queen").unwrap();
    assert_eq!(queens.len(), 8);
    assert_queens_placement(queens);
    assert!(result.duration_ms() <= 11_000);
    assert!(result.moves_evaluated() > 0);
}

#[test]
fn heavier_diagonal_weights_scale_the_hard_score() {
    // With the search pinned to its deterministic starting board (all
    // queens on the main diagonal), only the ascending-diagonal pipeline
    // fires: six pairs. Doubling its weight doubles the hard score.
    let pinned = SolverConfig::builder()
        .time_limit(Duration::from_secs(5))
        .unimproved_step_limit(0)
        .build();

    let mut baseline = queens_session_weighted(4, "1hard", "1hard");
    let baseline = baseline.solve_with(pinned.clone()).unwrap();
    assert_eq!(baseline.hard_score(), -6);

    let mut doubled = queens_session_weighted(4, "1hard", "2hard");
    let doubled = doubled.solve_with(pinned).unwrap();
    assert_eq!(doubled.hard_score(), -12);
}

#[test]
fn heavier_weights_do_not_change_the_feasible_outcome() {
    let mut s = queens_session_weighted(4, "1hard", "2hard");
    let result = s.solve_with(fast_config(5)).unwrap();
    assert_feasible(&result);
    assert_queens_placement(result.get_entities("Queen").unwrap());
}

#[test]
fn solve_without_a_target_runs_to_the_deadline() {
    // Three queens on a 3x3 board cannot be conflict-free, so the plain
    // entry point keeps searching until the wall clock expires.
    let mut s = queens_session(3);
    let result = s.solve(1).unwrap();

    assert!(!result.is_feasible());
    assert!(result.hard_score() < 0);
    assert!(result.duration_ms() >= 900, "stopped early: {}ms", result.duration_ms());
    assert!(result.duration_ms() <= 2_000, "overshot: {}ms", result.duration_ms());
    assert!(result.moves_evaluated() > 0);
}
