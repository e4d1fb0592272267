//! Solver session: the user-facing assembly surface.
//!
//! A session collects entity classes, value ranges, entity instances and
//! constraint pipelines, then hands the whole model to the local-search
//! solver. Nothing here is process-wide; sessions are self-contained and
//! any number may coexist.
//!
//! # Example
//!
//! ```no_run
//! use session::Session;
//! use schema::Field;
//! use types::{FieldType, Value};
//! use common::FieldMap;
//!
//! let mut s = Session::new();
//! s.entity_class(
//!     "Queen",
//!     vec![
//!         Field::new("column", FieldType::Int),
//!         Field::planning("row", FieldType::Int, "rows"),
//!     ],
//! ).unwrap();
//! s.int_range("rows", 0, 4).unwrap();
//! s.add_entities(
//!     "Queen",
//!     &(0..4)
//!         .map(|i| FieldMap::from([("column".to_string(), Value::Int(i))]))
//!         .collect::<Vec<_>>(),
//! ).unwrap();
//! let conflict = s
//!     .constraint("row_conflict", "1hard")
//!     .unwrap()
//!     .for_each("Queen")
//!     .join("Queen", &["A.row == B.row"])
//!     .distinct_pair()
//!     .penalize();
//! s.add_constraint(conflict).unwrap();
//! let result = s.solve(5).unwrap();
//! assert!(result.is_feasible());
//! ```


use common::{FieldMap, SolveStats, SolverConfig, SolverError, SolverResult};
use constraint::{compile, CompiledConstraint, ConstraintBuilder, Weight};
use schema::{Field, SchemaRegistry};
use solver::LocalSearch;
use store::EntityStore;
use tracing::info;
use types::Score;

use std::collections::HashMap;
use std::time::Duration;

/// One self-contained solve: registries, entities and constraints are
/// registered up front, `solve` runs the search, and afterwards the
/// session is frozen.
#[derive(Default)]
pub struct Session {
    registry: SchemaRegistry,
    store: EntityStore,
    constraints: Vec<CompiledConstraint>,
    solved: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity class.
    pub fn entity_class(&mut self, name: &str, fields: Vec<Field>) -> SolverResult<()> {
        self.ensure_open("entity_class")?;
        self.registry.register_class(name, fields)?;
        Ok(())
    }

    /// Register a half-open integer range `[lo, hi)` for planning
    /// variables to draw from.
    pub fn int_range(&mut self, name: &str, lo: i64, hi: i64) -> SolverResult<()> {
        self.ensure_open("int_range")?;
        self.registry.register_range(name, lo, hi)?;
        Ok(())
    }

    /// Insert entity instances. Records carry all non-planning fields;
    /// planning fields start at the low end of their range.
    pub fn add_entities(&mut self, class: &str, records: &[FieldMap]) -> SolverResult<()> {
        self.ensure_open("add_entities")?;
        let class = self.registry.require_class(class)?;
        for record in records {
            self.store.add(&self.registry, class, record)?;
        }
        Ok(())
    }

    /// Start a constraint pipeline. `level` is a weight label such as
    /// `"1hard"` or `"3soft"`.
    pub fn constraint(&self, name: &str, level: &str) -> SolverResult<ConstraintBuilder> {
        let weight = Weight::parse(level)?;
        Ok(ConstraintBuilder::new(name, weight))
    }

    /// Compile and register a finished pipeline. All binding and predicate
    /// errors surface here, before the search begins.
    pub fn add_constraint(&mut self, builder: ConstraintBuilder) -> SolverResult<()> {
        self.ensure_open("add_constraint")?;
        let compiled = compile(&builder, &self.registry)?;
        self.constraints.push(compiled);
        Ok(())
    }

    /// Run the solver under a wall-clock limit.
    pub fn solve(&mut self, time_limit_seconds: u64) -> SolverResult<SolveOutcome> {
        self.solve_with(
            SolverConfig::builder()
                .time_limit(Duration::from_secs(time_limit_seconds))
                .build(),
        )
    }

    /// Run the solver with explicit configuration.
    pub fn solve_with(&mut self, config: SolverConfig) -> SolverResult<SolveOutcome> {
        self.ensure_open("solve")?;
        self.solved = true;

        let store = std::mem::take(&mut self.store);
        let search = LocalSearch::new(&self.registry, &self.constraints, config);
        let solved = search.solve(store)?;
        self.store = solved.store;

        let mut entities = HashMap::new();
        for class in self.registry.classes() {
            let snapshots: Vec<FieldMap> = (0..self.store.len(class.id))
                .filter_map(|slot| self.store.to_field_map(class, slot as u32))
                .collect();
            entities.insert(class.name.clone(), snapshots);
        }

        info!(score = %solved.best_score, "session solved");

        Ok(SolveOutcome {
            best_score: solved.best_score,
            stats: solved.stats,
            entities,
        })
    }

    fn ensure_open(&self, operation: &str) -> SolverResult<()> {
        if self.solved {
            return Err(SolverError::Usage(format!(
                "{operation} is not allowed once the session has solved"
            )));
        }
        Ok(())
    }
}

/// Read-only snapshot of the best solution found, plus solve statistics.
#[derive(Clone, Debug)]
pub struct SolveOutcome {
    best_score: Score,
    stats: SolveStats,
    entities: HashMap<String, Vec<FieldMap>>,
}

impl SolveOutcome {
    /// Combined score: hard plus soft, saturating. The typed pair is
    /// available via [`SolveOutcome::best_score`].
    pub fn score(&self) -> i64 {
        self.best_score.hard.saturating_add(self.best_score.soft)
    }

    pub fn hard_score(&self) -> i64 {
        self.best_score.hard
    }

    pub fn soft_score(&self) -> i64 {
        self.best_score.soft
    }

    pub fn best_score(&self) -> Score {
        self.best_score
    }

    pub fn is_feasible(&self) -> bool {
        self.best_score.is_feasible()
    }

    pub fn duration_ms(&self) -> u64 {
        self.stats.duration_ms()
    }

    pub fn steps(&self) -> u64 {
        self.stats.steps
    }

    pub fn moves_evaluated(&self) -> u64 {
        self.stats.moves_evaluated
    }

    /// Entity snapshots of one class, in insertion order, reflecting the
    /// best-so-far solution.
    pub fn get_entities(&self, class: &str) -> SolverResult<&[FieldMap]> {
        self.entities
            .get(class)
            .map(Vec::as_slice)
            .ok_or_else(|| SolverError::Schema(format!("unknown class '{class}'")))
    }
}
