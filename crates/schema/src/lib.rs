use ahash::RandomState;
use common::{ClassId, FieldId, RangeId, SolverError, SolverResult};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use types::FieldType;

type Map<K, V> = HashMap<K, V, RandomState>;

/// Registry of entity-class definitions and named value ranges.
///
/// Everything here is fixed once registered: classes and ranges are
/// appended before a solve and never mutated afterwards. Constraint
/// pipelines resolve names against this registry at build time and cache
/// numeric ids from then on.
#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    classes: Vec<ClassMeta>,
    ranges: Vec<RangeMeta>,
    class_name_index: Map<String, usize>,
    range_name_index: Map<String, usize>,
}

impl SchemaRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity class, returning its identifier.
    ///
    /// Rejects duplicate class names, duplicate field names, more than one
    /// planning field, and a planning field without a range name. The
    /// range itself may be registered later; it is resolved on first use.
    pub fn register_class(&mut self, name: &str, fields: Vec<Field>) -> SolverResult<ClassId> {
        if self.class_name_index.contains_key(name) {
            return Err(SolverError::Schema(format!(
                "class '{name}' already exists"
            )));
        }
        let schema = ClassSchema::try_new(name, fields)?;
        let id = ClassId(self.classes.len() as u32);
        let planning = schema.planning_field();
        let identifier = schema.field_index("id");
        self.classes.push(ClassMeta {
            id,
            name: name.to_string(),
            schema,
            planning,
            identifier,
        });
        self.class_name_index
            .insert(name.to_string(), self.classes.len() - 1);
        Ok(id)
    }

    /// Register a half-open integer range `[lo, hi)` under a name.
    pub fn register_range(&mut self, name: &str, lo: i64, hi: i64) -> SolverResult<RangeId> {
        if self.range_name_index.contains_key(name) {
            return Err(SolverError::Schema(format!(
                "range '{name}' already exists"
            )));
        }
        if lo >= hi {
            return Err(SolverError::Schema(format!(
                "range '{name}' is empty: lo {lo} must be below hi {hi}"
            )));
        }
        let id = RangeId(self.ranges.len() as u32);
        self.ranges.push(RangeMeta {
            id,
            name: name.to_string(),
            range: ValueRange { lo, hi },
        });
        self.range_name_index
            .insert(name.to_string(), self.ranges.len() - 1);
        Ok(id)
    }

    /// Lookup a class by name.
    pub fn class(&self, name: &str) -> Option<&ClassMeta> {
        self.class_name_index
            .get(name)
            .and_then(|idx| self.classes.get(*idx))
    }

    /// Lookup a class by name, failing with a schema error.
    pub fn require_class(&self, name: &str) -> SolverResult<&ClassMeta> {
        self.class(name)
            .ok_or_else(|| SolverError::Schema(format!("unknown class '{name}'")))
    }

    /// Lookup a class by identifier.
    pub fn class_by_id(&self, id: ClassId) -> SolverResult<&ClassMeta> {
        self.classes
            .get(id.0 as usize)
            .ok_or_else(|| SolverError::Schema(format!("unknown class id {}", id.0)))
    }

    /// Lookup a range by name.
    pub fn range(&self, name: &str) -> Option<&RangeMeta> {
        self.range_name_index
            .get(name)
            .and_then(|idx| self.ranges.get(*idx))
    }

    /// Resolve the planning variable of a class to its field ordinal and
    /// concrete range. Fails if the class declared a range name that was
    /// never registered.
    pub fn planning_binding(&self, class: &ClassMeta) -> SolverResult<Option<PlanningBinding>> {
        let Some(planning) = &class.planning else {
            return Ok(None);
        };
        let meta = self.range(&planning.range_name).ok_or_else(|| {
            SolverError::Schema(format!(
                "planning field '{}' on class '{}' references undeclared range '{}'",
                class.schema.field_name(planning.field),
                class.name,
                planning.range_name
            ))
        })?;
        Ok(Some(PlanningBinding {
            field: planning.field,
            range_id: meta.id,
            range: meta.range,
        }))
    }

    /// Immutable iterator over all classes in registration order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassMeta> {
        self.classes.iter()
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }
}

/// Metadata describing a registered entity class.
#[derive(Clone, Debug)]
pub struct ClassMeta {
    pub id: ClassId,
    pub name: String,
    pub schema: ClassSchema,
    /// Planning field, if the class declares one.
    pub planning: Option<PlanningField>,
    /// Ordinal of the first field named `id`, used by the O(1) entity
    /// lookup index.
    pub identifier: Option<FieldId>,
}

/// Planning field as declared: ordinal plus the range *name*. The range is
/// resolved against the registry on first use, not at registration, since
/// the front-end may declare classes before ranges.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanningField {
    pub field: FieldId,
    pub range_name: String,
}

/// Planning field resolved to a concrete range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlanningBinding {
    pub field: FieldId,
    pub range_id: RangeId,
    pub range: ValueRange,
}

/// Field layout for an entity class, along with the name lookup table.
#[derive(Clone, Debug)]
pub struct ClassSchema {
    fields: Vec<Field>,
    name_to_ordinal: Map<String, FieldId>,
}

impl ClassSchema {
    fn try_new(class_name: &str, fields: Vec<Field>) -> SolverResult<Self> {
        if fields.is_empty() {
            return Err(SolverError::Schema(format!(
                "class '{class_name}' must declare at least one field"
            )));
        }
        if fields.len() > FieldId::MAX as usize {
            return Err(SolverError::Schema(format!(
                "class '{class_name}' declares too many fields"
            )));
        }
        let mut name_to_ordinal = Map::default();
        let mut planning_seen = false;
        for (idx, field) in fields.iter().enumerate() {
            if name_to_ordinal
                .insert(field.name.clone(), idx as FieldId)
                .is_some()
            {
                return Err(SolverError::Schema(format!(
                    "duplicate field '{}' on class '{class_name}'",
                    field.name
                )));
            }
            if field.planning {
                if planning_seen {
                    return Err(SolverError::Schema(format!(
                        "class '{class_name}' declares more than one planning field"
                    )));
                }
                planning_seen = true;
                if field.value_range.is_none() {
                    return Err(SolverError::Schema(format!(
                        "planning field '{}' on class '{class_name}' has no value range",
                        field.name
                    )));
                }
                if field.ty != FieldType::Int {
                    return Err(SolverError::Schema(format!(
                        "planning field '{}' on class '{class_name}' must be int to draw from an integer range",
                        field.name
                    )));
                }
                // The identifier index is never rewritten during search.
                if field.name == "id" {
                    return Err(SolverError::Schema(format!(
                        "planning field on class '{class_name}' cannot be the identifier field 'id'"
                    )));
                }
            } else if field.value_range.is_some() {
                return Err(SolverError::Schema(format!(
                    "field '{}' on class '{class_name}' names a value range but is not a planning field",
                    field.name
                )));
            }
        }
        Ok(Self {
            fields,
            name_to_ordinal,
        })
    }

    /// Returns the ordinal for a field name.
    pub fn field_index(&self, name: &str) -> Option<FieldId> {
        self.name_to_ordinal.get(name).copied()
    }

    /// Returns the field metadata for an ordinal.
    pub fn field(&self, ordinal: FieldId) -> Option<&Field> {
        self.fields.get(ordinal as usize)
    }

    pub fn field_name(&self, ordinal: FieldId) -> &str {
        self.fields
            .get(ordinal as usize)
            .map(|f| f.name.as_str())
            .unwrap_or("?")
    }

    pub fn field_type(&self, ordinal: FieldId) -> Option<FieldType> {
        self.fields.get(ordinal as usize).map(|f| f.ty)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn planning_field(&self) -> Option<PlanningField> {
        self.fields.iter().enumerate().find_map(|(idx, field)| {
            if field.planning {
                Some(PlanningField {
                    field: idx as FieldId,
                    range_name: field.value_range.clone().unwrap_or_default(),
                })
            } else {
                None
            }
        })
    }
}

/// Describes one declared field of an entity class.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: FieldType,
    pub planning: bool,
    pub value_range: Option<String>,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            planning: false,
            value_range: None,
        }
    }

    /// A planning field drawing its values from the named range.
    pub fn planning(name: impl Into<String>, ty: FieldType, range: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty,
            planning: true,
            value_range: Some(range.into()),
        }
    }
}

/// Metadata describing a registered value range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RangeMeta {
    pub id: RangeId,
    pub name: String,
    pub range: ValueRange,
}

/// Half-open integer interval `[lo, hi)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange {
    pub lo: i64,
    pub hi: i64,
}

impl ValueRange {
    pub fn contains(&self, value: i64) -> bool {
        self.lo <= value && value < self.hi
    }

    pub fn len(&self) -> u64 {
        (self.hi - self.lo) as u64
    }

    pub fn is_empty(&self) -> bool {
        self.lo >= self.hi
    }

    /// Iterate the candidate values in ascending order.
    pub fn values(&self) -> impl Iterator<Item = i64> {
        self.lo..self.hi
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn queen_fields() -> Vec<Field> {
        vec![
            Field::new("column", FieldType::Int),
            Field::planning("row", FieldType::Int, "rows"),
        ]
    }

    #[test]
    fn register_and_lookup_class() {
        let mut registry = SchemaRegistry::new();
        let id = registry.register_class("Queen", queen_fields()).unwrap();

        assert_eq!(id, ClassId(0));
        let class = registry.class("Queen").unwrap();
        assert_eq!(class.schema.field_index("row"), Some(1));
        assert_eq!(class.schema.field_type(0), Some(FieldType::Int));
        assert_eq!(
            class.planning,
            Some(PlanningField {
                field: 1,
                range_name: "rows".into()
            })
        );

        let same = registry.class_by_id(id).unwrap();
        assert_eq!(same.name, "Queen");
    }

    #[test]
    fn rejects_duplicate_classes() {
        let mut registry = SchemaRegistry::new();
        registry.register_class("Queen", queen_fields()).unwrap();
        let err = registry
            .register_class("Queen", queen_fields())
            .unwrap_err();
        assert!(matches!(err, SolverError::Schema(_)));
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn rejects_duplicate_fields() {
        let mut registry = SchemaRegistry::new();
        let err = registry
            .register_class(
                "Bad",
                vec![
                    Field::new("id", FieldType::Int),
                    Field::new("id", FieldType::Int),
                ],
            )
            .unwrap_err();
        assert!(err.to_string().contains("duplicate field"));
    }

    #[test]
    fn rejects_second_planning_field() {
        let mut registry = SchemaRegistry::new();
        let err = registry
            .register_class(
                "Bad",
                vec![
                    Field::planning("a", FieldType::Int, "r"),
                    Field::planning("b", FieldType::Int, "r"),
                ],
            )
            .unwrap_err();
        assert!(err.to_string().contains("more than one planning field"));
    }

    #[test]
    fn rejects_planning_field_without_range() {
        let mut registry = SchemaRegistry::new();
        let mut field = Field::new("row", FieldType::Int);
        field.planning = true;
        let err = registry
            .register_class("Bad", vec![field])
            .unwrap_err();
        assert!(err.to_string().contains("no value range"));
    }

    #[test]
    fn rejects_non_int_planning_field() {
        let mut registry = SchemaRegistry::new();
        let err = registry
            .register_class(
                "Bad",
                vec![Field::planning("label", FieldType::Str, "labels")],
            )
            .unwrap_err();
        assert!(err.to_string().contains("must be int"));
    }

    #[test]
    fn rejects_planning_identifier_field() {
        let mut registry = SchemaRegistry::new();
        let err = registry
            .register_class("Bad", vec![Field::planning("id", FieldType::Int, "ids")])
            .unwrap_err();
        assert!(err.to_string().contains("identifier field"));
    }

    #[test]
    fn rejects_range_on_non_planning_field() {
        let mut registry = SchemaRegistry::new();
        let mut field = Field::new("row", FieldType::Int);
        field.value_range = Some("rows".into());
        let err = registry.register_class("Bad", vec![field]).unwrap_err();
        assert!(err.to_string().contains("not a planning field"));
    }

    #[test]
    fn rejects_empty_class() {
        let mut registry = SchemaRegistry::new();
        let err = registry.register_class("Empty", vec![]).unwrap_err();
        assert!(err.to_string().contains("at least one field"));
    }

    #[test]
    fn range_registration_validates_bounds() {
        let mut registry = SchemaRegistry::new();
        registry.register_range("rows", 0, 4).unwrap();

        let err = registry.register_range("rows", 0, 8).unwrap_err();
        assert!(err.to_string().contains("already exists"));

        let err = registry.register_range("empty", 5, 5).unwrap_err();
        assert!(err.to_string().contains("must be below"));

        let range = registry.range("rows").unwrap().range;
        assert!(range.contains(0));
        assert!(range.contains(3));
        assert!(!range.contains(4));
        assert_eq!(range.len(), 4);
        assert_eq!(range.values().collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn planning_binding_resolves_late_registered_range() {
        let mut registry = SchemaRegistry::new();
        // Classes may be declared before the range they reference.
        registry.register_class("Queen", queen_fields()).unwrap();
        registry.register_range("rows", 0, 4).unwrap();

        let class = registry.class("Queen").unwrap();
        let binding = registry.planning_binding(class).unwrap().unwrap();
        assert_eq!(binding.field, 1);
        assert_eq!(binding.range, ValueRange { lo: 0, hi: 4 });
    }

    #[test]
    fn planning_binding_reports_undeclared_range() {
        let mut registry = SchemaRegistry::new();
        registry.register_class("Queen", queen_fields()).unwrap();

        let class = registry.class("Queen").unwrap();
        let err = registry.planning_binding(class).unwrap_err();
        assert!(err.to_string().contains("undeclared range 'rows'"));
    }

    #[test]
    fn planning_binding_is_none_for_fact_classes() {
        let mut registry = SchemaRegistry::new();
        registry
            .register_class(
                "Employee",
                vec![
                    Field::new("id", FieldType::Int),
                    Field::new("name", FieldType::Str),
                ],
            )
            .unwrap();
        let class = registry.class("Employee").unwrap();
        assert_eq!(registry.planning_binding(class).unwrap(), None);
        assert_eq!(class.identifier, Some(0));
    }

    #[test]
    fn identifier_field_requires_the_id_name() {
        let mut registry = SchemaRegistry::new();
        registry
            .register_class(
                "Slot",
                vec![
                    Field::new("day", FieldType::Int),
                    Field::new("id", FieldType::Int),
                ],
            )
            .unwrap();
        // Identifier is positional wherever the `id` field lands.
        assert_eq!(registry.class("Slot").unwrap().identifier, Some(1));

        registry
            .register_class("NoId", vec![Field::new("day", FieldType::Int)])
            .unwrap();
        assert_eq!(registry.class("NoId").unwrap().identifier, None);
    }
}
