use super::*;
use pretty_assertions::assert_eq;
use types::Score;

#[test]
fn handles_order_by_class_then_slot() {
    let a = EntityHandle {
        class: ClassId(0),
        slot: 9,
    };
    let b = EntityHandle {
        class: ClassId(1),
        slot: 0,
    };
    let c = EntityHandle {
        class: ClassId(1),
        slot: 3,
    };
    assert!(a < b);
    assert!(b < c);
}

#[test]
fn errors_carry_their_kind_prefix() {
    assert_eq!(
        SolverError::Schema("duplicate class 'Queen'".into()).to_string(),
        "schema: duplicate class 'Queen'"
    );
    assert_eq!(
        SolverError::Predicate("unknown parameter 'C'".into()).to_string(),
        "predicate: unknown parameter 'C'"
    );
    assert_eq!(
        SolverError::Usage("session is frozen after solve".into()).to_string(),
        "usage: session is frozen after solve"
    );
}

#[test]
fn config_builder_fills_defaults() {
    let config = SolverConfig::builder().build();
    assert_eq!(config.time_limit, Duration::from_secs(30));
    assert_eq!(config.unimproved_step_limit, None);
    assert_eq!(config.target_score, None);
    assert_eq!(config.seed, 0);
}

#[test]
fn config_builder_overrides_stick() {
    let config = SolverConfig::builder()
        .time_limit(Duration::from_millis(250))
        .unimproved_step_limit(500)
        .target_score(Score::ZERO)
        .seed(42)
        .build();
    assert_eq!(config.time_limit, Duration::from_millis(250));
    assert_eq!(config.unimproved_step_limit, Some(500));
    assert_eq!(config.target_score, Some(Score::ZERO));
    assert_eq!(config.seed, 42);
}

#[test]
fn stats_report_millis() {
    let stats = SolveStats {
        steps: 3,
        moves_evaluated: 24,
        duration: Duration::from_micros(2_500),
    };
    assert_eq!(stats.duration_ms(), 2);
}

#[test]
fn record_serde_round_trip() {
    let rec = Record::new(vec![Value::Int(4), Value::Str("night".into())]);
    let json = serde_json::to_string(&rec).unwrap();
    let back: Record = serde_json::from_str(&json).unwrap();
    assert_eq!(rec, back);
}
