//! Entity store: dense per-class tuple storage with an O(1) identifier
//! index.
//!
//! Local search evaluates predicates in its innermost loop, so entity
//! access must stay O(1) regardless of fleet size. Each class keeps its
//! instances in a dense `Vec<Record>` in insertion order; a hash index
//! maps the value of the class's `id` field to the storage slot. Handles
//! are `(class, slot)` pairs and stay stable for the lifetime of the
//! store.

#[cfg(test)]
mod tests;

use ahash::RandomState;
use common::{ClassId, EntityHandle, FieldMap, Record, SolverError, SolverResult};
use hashbrown::HashMap;
use schema::{ClassMeta, SchemaRegistry};
use types::Value;

type Map<K, V> = HashMap<K, V, RandomState>;

/// All entity instances, grouped by class.
#[derive(Clone, Debug, Default)]
pub struct EntityStore {
    classes: Vec<ClassRows>,
}

#[derive(Clone, Debug, Default)]
struct ClassRows {
    rows: Vec<Record>,
    id_index: Map<Value, u32>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one entity, validating the record against the class schema.
    ///
    /// Non-planning fields must all be present with their declared types.
    /// The planning field may be omitted, in which case it starts at the
    /// low end of its declared range.
    pub fn add(
        &mut self,
        registry: &SchemaRegistry,
        class: &ClassMeta,
        record: &FieldMap,
    ) -> SolverResult<EntityHandle> {
        for key in record.keys() {
            if class.schema.field_index(key).is_none() {
                return Err(SolverError::Data(format!(
                    "unknown field '{key}' for class '{}'",
                    class.name
                )));
            }
        }

        let planning = registry.planning_binding(class)?;
        let mut values = Vec::with_capacity(class.schema.len());
        for (ordinal, field) in class.schema.fields().iter().enumerate() {
            let supplied = record.get(&field.name);
            let value = match (supplied, field.planning) {
                (Some(value), _) => {
                    if value.type_of() != field.ty {
                        return Err(SolverError::Data(format!(
                            "field '{}' on class '{}' expects {}, got {}",
                            field.name,
                            class.name,
                            field.ty,
                            value.type_of()
                        )));
                    }
                    value.clone()
                }
                (None, true) => {
                    let binding = planning.as_ref().ok_or_else(|| {
                        SolverError::Data(format!(
                            "planning field '{}' on class '{}' has no resolved range",
                            field.name, class.name
                        ))
                    })?;
                    Value::Int(binding.range.lo)
                }
                (None, false) => {
                    return Err(SolverError::Data(format!(
                        "missing field '{}' for class '{}'",
                        field.name, class.name
                    )));
                }
            };
            if field.planning {
                let binding = planning.as_ref().ok_or_else(|| {
                    SolverError::Data(format!(
                        "planning field '{}' on class '{}' has no resolved range",
                        field.name, class.name
                    ))
                })?;
                let n = value.as_int().unwrap_or(binding.range.lo);
                if !binding.range.contains(n) {
                    return Err(SolverError::Data(format!(
                        "planning value {n} for '{}' is outside [{}, {})",
                        field.name, binding.range.lo, binding.range.hi
                    )));
                }
            }
            debug_assert_eq!(ordinal, values.len());
            values.push(value);
        }

        let rows = self.class_rows_mut(class.id);
        let slot = rows.rows.len() as u32;
        if let Some(id_field) = class.identifier {
            let id_value = values[id_field as usize].clone();
            if rows.id_index.contains_key(&id_value) {
                return Err(SolverError::Data(format!(
                    "duplicate id {id_value:?} for class '{}'",
                    class.name
                )));
            }
            rows.id_index.insert(id_value, slot);
        }
        rows.rows.push(Record::new(values));

        Ok(EntityHandle {
            class: class.id,
            slot,
        })
    }

    /// O(1) fetch by identifier value.
    pub fn get(&self, class: ClassId, id: &Value) -> Option<(EntityHandle, &Record)> {
        let slot = self.lookup_slot(class, id)?;
        let record = self.record(class, slot)?;
        Some((EntityHandle { class, slot }, record))
    }

    /// O(1) slot lookup by identifier value.
    pub fn lookup_slot(&self, class: ClassId, id: &Value) -> Option<u32> {
        self.classes
            .get(class.0 as usize)
            .and_then(|rows| rows.id_index.get(id).copied())
    }

    /// In-insertion-order traversal of one class.
    pub fn iterate(&self, class: ClassId) -> impl Iterator<Item = (EntityHandle, &Record)> {
        self.classes
            .get(class.0 as usize)
            .map(|rows| rows.rows.as_slice())
            .unwrap_or(&[])
            .iter()
            .enumerate()
            .map(move |(slot, record)| {
                (
                    EntityHandle {
                        class,
                        slot: slot as u32,
                    },
                    record,
                )
            })
    }

    pub fn record(&self, class: ClassId, slot: u32) -> Option<&Record> {
        self.classes
            .get(class.0 as usize)
            .and_then(|rows| rows.rows.get(slot as usize))
    }

    pub fn entity(&self, handle: EntityHandle) -> Option<&Record> {
        self.record(handle.class, handle.slot)
    }

    pub fn len(&self, class: ClassId) -> usize {
        self.classes
            .get(class.0 as usize)
            .map(|rows| rows.rows.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, class: ClassId) -> bool {
        self.len(class) == 0
    }

    /// Mutate the planning field of one entity in place, validated against
    /// its declared range. Identifier fields are never planning fields, so
    /// the id index stays untouched.
    pub fn set_planning(
        &mut self,
        registry: &SchemaRegistry,
        handle: EntityHandle,
        value: i64,
    ) -> SolverResult<()> {
        let class = registry.class_by_id(handle.class)?;
        let binding = registry.planning_binding(class)?.ok_or_else(|| {
            SolverError::Data(format!(
                "class '{}' has no planning field",
                class.name
            ))
        })?;
        if !binding.range.contains(value) {
            return Err(SolverError::Data(format!(
                "planning value {value} for '{}' is outside [{}, {})",
                class.schema.field_name(binding.field),
                binding.range.lo,
                binding.range.hi
            )));
        }
        let record = self
            .classes
            .get_mut(handle.class.0 as usize)
            .and_then(|rows| rows.rows.get_mut(handle.slot as usize))
            .ok_or_else(|| {
                SolverError::Data(format!(
                    "no entity at slot {} of class '{}'",
                    handle.slot, class.name
                ))
            })?;
        record.values[binding.field as usize] = Value::Int(value);
        Ok(())
    }

    /// Current planning value of one entity.
    pub fn planning_value(
        &self,
        registry: &SchemaRegistry,
        handle: EntityHandle,
    ) -> SolverResult<i64> {
        let class = registry.class_by_id(handle.class)?;
        let binding = registry.planning_binding(class)?.ok_or_else(|| {
            SolverError::Data(format!(
                "class '{}' has no planning field",
                class.name
            ))
        })?;
        let record = self.entity(handle).ok_or_else(|| {
            SolverError::Data(format!(
                "no entity at slot {} of class '{}'",
                handle.slot, class.name
            ))
        })?;
        record.values[binding.field as usize]
            .as_int()
            .ok_or_else(|| {
                SolverError::Data(format!(
                    "planning field on class '{}' holds a non-int value",
                    class.name
                ))
            })
    }

    /// Field-name-keyed view of one entity, for the result surface.
    pub fn to_field_map(&self, class: &ClassMeta, slot: u32) -> Option<FieldMap> {
        let record = self.record(class.id, slot)?;
        let mut map = FieldMap::with_capacity(class.schema.len());
        for (ordinal, field) in class.schema.fields().iter().enumerate() {
            map.insert(field.name.clone(), record.values[ordinal].clone());
        }
        Some(map)
    }

    fn class_rows_mut(&mut self, class: ClassId) -> &mut ClassRows {
        let idx = class.0 as usize;
        if self.classes.len() <= idx {
            self.classes.resize_with(idx + 1, ClassRows::default);
        }
        &mut self.classes[idx]
    }
}
