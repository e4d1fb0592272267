use super::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use schema::Field;
use types::FieldType;

fn shift_registry() -> SchemaRegistry {
    let mut registry = SchemaRegistry::new();
    registry
        .register_class(
            "Shift",
            vec![
                Field::new("id", FieldType::Int),
                Field::new("day", FieldType::Int),
                Field::planning("employee_id", FieldType::Int, "employee_ids"),
            ],
        )
        .unwrap();
    registry.register_range("employee_ids", 1, 6).unwrap();
    registry
}

fn shift(id: i64, day: i64) -> FieldMap {
    FieldMap::from([
        ("id".to_string(), Value::Int(id)),
        ("day".to_string(), Value::Int(day)),
    ])
}

#[test]
fn add_defaults_planning_to_range_low() {
    let registry = shift_registry();
    let class = registry.class("Shift").unwrap();
    let mut store = EntityStore::new();

    let handle = store.add(&registry, class, &shift(1, 0)).unwrap();
    assert_eq!(handle, EntityHandle { class: class.id, slot: 0 });

    let record = store.entity(handle).unwrap();
    assert_eq!(record.values[2], Value::Int(1));
    assert_eq!(store.planning_value(&registry, handle).unwrap(), 1);
}

#[test]
fn add_accepts_explicit_in_range_planning_value() {
    let registry = shift_registry();
    let class = registry.class("Shift").unwrap();
    let mut store = EntityStore::new();

    let mut record = shift(1, 0);
    record.insert("employee_id".into(), Value::Int(4));
    let handle = store.add(&registry, class, &record).unwrap();
    assert_eq!(store.planning_value(&registry, handle).unwrap(), 4);

    record.insert("id".into(), Value::Int(2));
    record.insert("employee_id".into(), Value::Int(9));
    let err = store.add(&registry, class, &record).unwrap_err();
    assert!(err.to_string().contains("outside [1, 6)"), "{err}");
}

#[test]
fn add_rejects_missing_field() {
    let registry = shift_registry();
    let class = registry.class("Shift").unwrap();
    let mut store = EntityStore::new();

    let record = FieldMap::from([("id".to_string(), Value::Int(1))]);
    let err = store.add(&registry, class, &record).unwrap_err();
    assert!(err.to_string().contains("missing field 'day'"), "{err}");
}

#[test]
fn add_rejects_unknown_field() {
    let registry = shift_registry();
    let class = registry.class("Shift").unwrap();
    let mut store = EntityStore::new();

    let mut record = shift(1, 0);
    record.insert("shift_name".into(), Value::Str("dawn".into()));
    let err = store.add(&registry, class, &record).unwrap_err();
    assert!(err.to_string().contains("unknown field 'shift_name'"), "{err}");
}

#[test]
fn add_rejects_type_mismatch() {
    let registry = shift_registry();
    let class = registry.class("Shift").unwrap();
    let mut store = EntityStore::new();

    let record = FieldMap::from([
        ("id".to_string(), Value::Int(1)),
        ("day".to_string(), Value::Str("monday".into())),
    ]);
    let err = store.add(&registry, class, &record).unwrap_err();
    assert!(err.to_string().contains("expects int, got str"), "{err}");
}

#[test]
fn add_rejects_duplicate_id() {
    let registry = shift_registry();
    let class = registry.class("Shift").unwrap();
    let mut store = EntityStore::new();

    store.add(&registry, class, &shift(1, 0)).unwrap();
    let err = store.add(&registry, class, &shift(1, 3)).unwrap_err();
    assert!(err.to_string().contains("duplicate id"), "{err}");
}

#[test]
fn get_by_id_is_positionally_stable() {
    let registry = shift_registry();
    let class = registry.class("Shift").unwrap();
    let mut store = EntityStore::new();

    for i in 0..5 {
        store.add(&registry, class, &shift(i + 10, i % 2)).unwrap();
    }

    let (handle, record) = store.get(class.id, &Value::Int(12)).unwrap();
    assert_eq!(handle.slot, 2);
    assert_eq!(record.values[1], Value::Int(0));
    assert!(store.get(class.id, &Value::Int(99)).is_none());
}

#[test]
fn iterate_preserves_insertion_order() {
    let registry = shift_registry();
    let class = registry.class("Shift").unwrap();
    let mut store = EntityStore::new();

    for i in [30, 10, 20] {
        store.add(&registry, class, &shift(i, 0)).unwrap();
    }

    let ids: Vec<i64> = store
        .iterate(class.id)
        .map(|(_, record)| record.values[0].as_int().unwrap())
        .collect();
    assert_eq!(ids, vec![30, 10, 20]);
}

#[test]
fn set_planning_validates_range() {
    let registry = shift_registry();
    let class = registry.class("Shift").unwrap();
    let mut store = EntityStore::new();
    let handle = store.add(&registry, class, &shift(1, 0)).unwrap();

    store.set_planning(&registry, handle, 5).unwrap();
    assert_eq!(store.planning_value(&registry, handle).unwrap(), 5);

    let err = store.set_planning(&registry, handle, 6).unwrap_err();
    assert!(err.to_string().contains("outside [1, 6)"), "{err}");
    let err = store.set_planning(&registry, handle, 0).unwrap_err();
    assert!(err.to_string().contains("outside [1, 6)"), "{err}");
    // Failed writes leave the previous value in place.
    assert_eq!(store.planning_value(&registry, handle).unwrap(), 5);
}

#[test]
fn set_planning_rejects_fact_classes() {
    let mut registry = shift_registry();
    registry
        .register_class("Employee", vec![Field::new("id", FieldType::Int)])
        .unwrap();
    let employee = registry.class("Employee").unwrap();
    let mut store = EntityStore::new();
    let handle = store
        .add(
            &registry,
            employee,
            &FieldMap::from([("id".to_string(), Value::Int(1))]),
        )
        .unwrap();

    let err = store.set_planning(&registry, handle, 1).unwrap_err();
    assert!(err.to_string().contains("no planning field"), "{err}");
}

#[test]
fn field_map_round_trip() {
    let registry = shift_registry();
    let class = registry.class("Shift").unwrap();
    let mut store = EntityStore::new();
    let handle = store.add(&registry, class, &shift(7, 3)).unwrap();

    let map = store.to_field_map(class, handle.slot).unwrap();
    assert_eq!(map.get("id"), Some(&Value::Int(7)));
    assert_eq!(map.get("day"), Some(&Value::Int(3)));
    assert_eq!(map.get("employee_id"), Some(&Value::Int(1)));
}

proptest! {
    // The identifier index is a bijection with the stored rows.
    #[test]
    fn id_index_is_bijective(ids in proptest::collection::hash_set(0i64..1000, 1..40)) {
        let registry = shift_registry();
        let class = registry.class("Shift").unwrap();
        let mut store = EntityStore::new();

        let ids: Vec<i64> = ids.into_iter().collect();
        for &id in &ids {
            store.add(&registry, class, &shift(id, 0)).unwrap();
        }

        prop_assert_eq!(store.len(class.id), ids.len());
        for &id in &ids {
            let (handle, record) = store.get(class.id, &Value::Int(id)).unwrap();
            prop_assert_eq!(record.values[0].as_int(), Some(id));
            let roundtrip = store.entity(handle).unwrap();
            prop_assert_eq!(roundtrip.values[0].as_int(), Some(id));
        }
    }

    // Every reachable planning write keeps the value inside the range.
    #[test]
    fn planning_writes_stay_in_range(value in -10i64..20) {
        let registry = shift_registry();
        let class = registry.class("Shift").unwrap();
        let mut store = EntityStore::new();
        let handle = store.add(&registry, class, &shift(1, 0)).unwrap();

        let result = store.set_planning(&registry, handle, value);
        let stored = store.planning_value(&registry, handle).unwrap();
        prop_assert!((1..6).contains(&stored));
        prop_assert_eq!(result.is_ok(), (1..6).contains(&value));
    }
}
