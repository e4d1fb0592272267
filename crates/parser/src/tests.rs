use super::*;
use expr::{CmpOp, Term};
use pretty_assertions::assert_eq;

fn parse_one(input: &str) -> expr::Comparison {
    let pred = parse_predicate(input).expect("predicate parses");
    assert_eq!(pred.comparisons.len(), 1, "expected a single comparison");
    pred.comparisons.into_iter().next().unwrap()
}

#[test]
fn parses_field_equality() {
    let cmp = parse_one("A.row == B.row");
    assert_eq!(cmp.left, Term::field('A', "row"));
    assert_eq!(cmp.op, CmpOp::Eq);
    assert_eq!(cmp.right, Term::field('B', "row"));
}

#[test]
fn parses_diagonal_predicate() {
    let cmp = parse_one("A.row - B.row == A.column - B.column");
    assert_eq!(
        cmp.left,
        Term::Sub(
            Box::new(Term::field('A', "row")),
            Box::new(Term::field('B', "row")),
        )
    );
    assert_eq!(
        cmp.right,
        Term::Sub(
            Box::new(Term::field('A', "column")),
            Box::new(Term::field('B', "column")),
        )
    );
}

#[test]
fn parses_literal_comparison() {
    let cmp = parse_one("A.employee_id > 0");
    assert_eq!(cmp.left, Term::field('A', "employee_id"));
    assert_eq!(cmp.op, CmpOp::Gt);
    assert_eq!(cmp.right, Term::Int(0));
}

#[test]
fn parses_all_comparison_operators() {
    for (text, op) in [
        ("==", CmpOp::Eq),
        ("!=", CmpOp::Ne),
        ("<", CmpOp::Lt),
        ("<=", CmpOp::Le),
        (">", CmpOp::Gt),
        (">=", CmpOp::Ge),
    ] {
        let cmp = parse_one(&format!("A.x {text} 3"));
        assert_eq!(cmp.op, op, "operator {text}");
    }
}

#[test]
fn addition_and_subtraction_are_left_associative() {
    let cmp = parse_one("A.x - 1 + 2 == 0");
    assert_eq!(
        cmp.left,
        Term::Add(
            Box::new(Term::Sub(
                Box::new(Term::field('A', "x")),
                Box::new(Term::Int(1)),
            )),
            Box::new(Term::Int(2)),
        )
    );
}

#[test]
fn negative_literal_in_term_position() {
    let cmp = parse_one("A.delta == -4");
    assert_eq!(cmp.right, Term::Int(-4));
}

#[test]
fn and_folds_into_a_conjunction() {
    let pred = parse_predicate("A.day == B.day and A.slot == B.slot").unwrap();
    assert_eq!(pred.comparisons.len(), 2);
    assert_eq!(pred.comparisons[1].left, Term::field('A', "slot"));
}

#[test]
fn rejects_single_equals() {
    let err = parse_predicate("A.row = B.row").unwrap_err();
    assert!(err.to_string().contains("use '=='"), "{err}");
}

#[test]
fn rejects_multi_letter_parameter() {
    let err = parse_predicate("AB.row == 1").unwrap_err();
    assert!(
        err.to_string().contains("single capital letter"),
        "{err}"
    );
}

#[test]
fn rejects_lowercase_parameter() {
    let err = parse_predicate("a.row == 1").unwrap_err();
    assert!(
        err.to_string().contains("single capital letter"),
        "{err}"
    );
}

#[test]
fn rejects_missing_field_after_dot() {
    let err = parse_predicate("A. == 1").unwrap_err();
    assert!(err.to_string().contains("expected field name"), "{err}");
}

#[test]
fn rejects_missing_comparison() {
    let err = parse_predicate("A.row").unwrap_err();
    assert!(
        err.to_string().contains("expected comparison operator"),
        "{err}"
    );
}

#[test]
fn rejects_trailing_tokens() {
    let err = parse_predicate("A.row == 1 B.row").unwrap_err();
    assert!(err.to_string().contains("trailing input"), "{err}");
}

#[test]
fn rejects_unknown_characters() {
    let err = parse_predicate("A.row % 2 == 0").unwrap_err();
    assert!(err.to_string().contains("unexpected character"), "{err}");
}

#[test]
fn error_quotes_the_source_predicate() {
    let err = parse_predicate("A.row ==").unwrap_err();
    assert!(err.to_string().contains("\"A.row ==\""), "{err}");
}
