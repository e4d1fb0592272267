//! Score engine: executes compiled constraint pipelines over the entity
//! store and sums their weighted match counts into a `(hard, soft)` score.
//!
//! Evaluation is a full re-computation per call. Constraints run in
//! registration order and every pipeline visits its source entities in
//! insertion order, so a given working solution always produces the same
//! score regardless of how it was reached.


use common::{EntityHandle, Record};
use constraint::{CompiledConstraint, JoinStrategy, ResolvedComparison, ResolvedTerm};
use expr::CmpOp;
use store::EntityStore;
use types::{Score, Value};

/// Total score of the current working solution under all constraints.
pub fn evaluate(constraints: &[CompiledConstraint], store: &EntityStore) -> Score {
    let mut total = Score::ZERO;
    for constraint in constraints {
        let count = match_count(constraint, store);
        total = total.saturating_add(Score::contribution(
            constraint.weight.level,
            constraint.weight.magnitude,
            count as i64,
            constraint.sign.signum(),
        ));
    }
    total
}

/// Number of tuples surviving one pipeline. Exposed separately so tests
/// can observe a single constraint's contribution.
pub fn match_count(constraint: &CompiledConstraint, store: &EntityStore) -> u64 {
    let mut tuples: Vec<(EntityHandle, &Record)> = Vec::with_capacity(constraint.arity());
    let mut count = 0;
    for (handle, record) in store.iterate(constraint.source) {
        tuples.push((handle, record));
        count += descend(constraint, store, 0, &mut tuples);
        tuples.pop();
    }
    count
}

fn descend<'a>(
    constraint: &CompiledConstraint,
    store: &'a EntityStore,
    join_idx: usize,
    tuples: &mut Vec<(EntityHandle, &'a Record)>,
) -> u64 {
    let Some(stage) = constraint.joins.get(join_idx) else {
        // All parameters bound: distinct-pair elimination, then filters.
        if constraint.distinct_pair && tuples[0].0 >= tuples[1].0 {
            return 0;
        }
        if holds(&constraint.filters, tuples) {
            return 1;
        }
        return 0;
    };

    let mut count = 0;
    match &stage.strategy {
        JoinStrategy::Scan => {
            for (handle, record) in store.iterate(stage.class) {
                tuples.push((handle, record));
                if holds(&stage.predicates, tuples) {
                    count += descend(constraint, store, join_idx + 1, tuples);
                }
                tuples.pop();
            }
        }
        JoinStrategy::IdLookup { key } => {
            let id = Value::Int(eval_term(key, tuples));
            if let Some((handle, record)) = store.get(stage.class, &id) {
                tuples.push((handle, record));
                if holds(&stage.predicates, tuples) {
                    count += descend(constraint, store, join_idx + 1, tuples);
                }
                tuples.pop();
            }
        }
    }
    count
}

/// Conjunction with early exit on the first failing comparison.
fn holds(predicates: &[ResolvedComparison], tuples: &[(EntityHandle, &Record)]) -> bool {
    predicates.iter().all(|cmp| eval_comparison(cmp, tuples))
}

fn eval_comparison(comparison: &ResolvedComparison, tuples: &[(EntityHandle, &Record)]) -> bool {
    match comparison {
        ResolvedComparison::Int { left, op, right } => {
            let l = eval_term(left, tuples);
            let r = eval_term(right, tuples);
            match op {
                CmpOp::Eq => l == r,
                CmpOp::Ne => l != r,
                CmpOp::Lt => l < r,
                CmpOp::Le => l <= r,
                CmpOp::Gt => l > r,
                CmpOp::Ge => l >= r,
            }
        }
        ResolvedComparison::Str { left, op, right } => {
            let l = &tuples[left.tuple].1.values[left.field];
            let r = &tuples[right.tuple].1.values[right.field];
            let equal = l.eq_same_type(r).unwrap_or(false);
            match op {
                CmpOp::Eq => equal,
                _ => !equal,
            }
        }
    }
}

/// Integer term evaluation with pre-resolved offsets. The compiled form
/// guarantees every referenced field is int-typed.
fn eval_term(term: &ResolvedTerm, tuples: &[(EntityHandle, &Record)]) -> i64 {
    match term {
        ResolvedTerm::Const(n) => *n,
        ResolvedTerm::Field { tuple, field } => {
            let value = &tuples[*tuple].1.values[*field];
            debug_assert!(value.as_int().is_some(), "compiled int term over str field");
            value.as_int().unwrap_or_default()
        }
        ResolvedTerm::Add(l, r) => eval_term(l, tuples).saturating_add(eval_term(r, tuples)),
        ResolvedTerm::Sub(l, r) => eval_term(l, tuples).saturating_sub(eval_term(r, tuples)),
    }
}
