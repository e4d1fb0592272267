//! Constraint pipelines: fluent builder to compiled form.
//!
//! A constraint is declared as a chain of stages over entity classes:
//!
//! ```text
//! for_each(X) -> join(Y, preds...) -> filter(pred) -> distinct_pair() -> penalize()|reward()
//! ```
//!
//! The builder records stages as plain data; `compile` resolves it against
//! the schema registry in one pass:
//!
//! 1. **Binding** - class names become `ClassId`s; parameter letters are
//!    labels bound to tuple positions in order of first use across the
//!    pipeline's predicates (conventionally `A` for the source, `B` for
//!    the first join, ...), so a consistent renaming compiles identically
//! 2. **Predicate compilation** - predicate strings are parsed once and
//!    field names become `(tuple, field-ordinal)` offsets
//! 3. **Join strategy** - an equality against the joined class's
//!    identifier field is rewritten into an O(1) index probe
//!
//! All validation happens here, at `add_constraint` time. The search loop
//! only ever executes the compiled form.


use common::{ClassId, FieldId, SolverError, SolverResult};
use expr::{CmpOp, Comparison, Predicate, Term};
use regex::Regex;
use schema::{ClassMeta, SchemaRegistry};
use std::sync::OnceLock;
use types::{FieldType, ScoreLevel};

static LEVEL_RE: OnceLock<Regex> = OnceLock::new();

fn level_re() -> &'static Regex {
    LEVEL_RE.get_or_init(|| Regex::new(r"^(\d+)(hard|soft)$").expect("level pattern compiles"))
}

/// Constraint weight: a score level plus a non-negative magnitude.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Weight {
    pub magnitude: i64,
    pub level: ScoreLevel,
}

impl Weight {
    /// Parse a level label such as `"1hard"` or `"3soft"`.
    pub fn parse(label: &str) -> SolverResult<Weight> {
        let captures = level_re().captures(label).ok_or_else(|| {
            SolverError::Usage(format!(
                "invalid constraint level '{label}': expected '<magnitude>hard' or '<magnitude>soft'"
            ))
        })?;
        let magnitude = captures[1].parse::<i64>().map_err(|_| {
            SolverError::Usage(format!(
                "constraint level '{label}' has an out-of-range magnitude"
            ))
        })?;
        let level = match &captures[2] {
            "hard" => ScoreLevel::Hard,
            _ => ScoreLevel::Soft,
        };
        Ok(Weight { magnitude, level })
    }
}

/// Whether matches subtract from or add to the score.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sign {
    Penalize,
    Reward,
}

impl Sign {
    pub fn signum(self) -> i64 {
        match self {
            Sign::Penalize => -1,
            Sign::Reward => 1,
        }
    }
}

#[derive(Clone, Debug)]
enum Stage {
    ForEach { class: String },
    Join { class: String, predicates: Vec<String> },
    Filter { predicate: String },
    DistinctPair,
    Penalize,
    Reward,
}

/// Fluent recorder for a constraint pipeline. Methods never fail; all
/// validation happens when the builder is compiled at `add_constraint`.
#[derive(Clone, Debug)]
pub struct ConstraintBuilder {
    name: String,
    weight: Weight,
    stages: Vec<Stage>,
}

impl ConstraintBuilder {
    pub fn new(name: impl Into<String>, weight: Weight) -> Self {
        Self {
            name: name.into(),
            weight,
            stages: Vec::new(),
        }
    }

    /// Bind the pipeline's first parameter (conventionally `A`) to every
    /// instance of `class`.
    pub fn for_each(mut self, class: &str) -> Self {
        self.stages.push(Stage::ForEach {
            class: class.to_string(),
        });
        self
    }

    /// Bind the next parameter (conventionally `B`, `C`, ...) to every
    /// instance of `class` retained by the given predicates (an implicit
    /// conjunction).
    pub fn join(mut self, class: &str, predicates: &[&str]) -> Self {
        self.stages.push(Stage::Join {
            class: class.to_string(),
            predicates: predicates.iter().map(|p| p.to_string()).collect(),
        });
        self
    }

    /// Retain only tuples for which the predicate holds.
    pub fn filter(mut self, predicate: &str) -> Self {
        self.stages.push(Stage::Filter {
            predicate: predicate.to_string(),
        });
        self
    }

    /// Count each unordered pair of distinct entities once.
    pub fn distinct_pair(mut self) -> Self {
        self.stages.push(Stage::DistinctPair);
        self
    }

    /// Terminal: each surviving tuple subtracts the weight.
    pub fn penalize(mut self) -> Self {
        self.stages.push(Stage::Penalize);
        self
    }

    /// Terminal: each surviving tuple adds the weight.
    pub fn reward(mut self) -> Self {
        self.stages.push(Stage::Reward);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A term with field references resolved to `(tuple, ordinal)` offsets.
/// Arithmetic is integer-only and saturates during evaluation.
#[derive(Clone, Debug, PartialEq)]
pub enum ResolvedTerm {
    Const(i64),
    Field { tuple: usize, field: usize },
    Add(Box<ResolvedTerm>, Box<ResolvedTerm>),
    Sub(Box<ResolvedTerm>, Box<ResolvedTerm>),
}

/// Reference to a string-typed field of one bound tuple.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StrFieldRef {
    pub tuple: usize,
    pub field: usize,
}

/// One compiled comparison. Integer comparisons admit arithmetic and all
/// six operators; string comparisons are equality between two plain field
/// references.
#[derive(Clone, Debug, PartialEq)]
pub enum ResolvedComparison {
    Int {
        left: ResolvedTerm,
        op: CmpOp,
        right: ResolvedTerm,
    },
    Str {
        left: StrFieldRef,
        op: CmpOp,
        right: StrFieldRef,
    },
}

/// How a join stage enumerates candidates of the joined class.
#[derive(Clone, Debug, PartialEq)]
pub enum JoinStrategy {
    /// Nested loop over the class in insertion order.
    Scan,
    /// The join carries `<expr over earlier tuples> == <new>.id`; evaluate
    /// the key and probe the identifier index instead of scanning.
    IdLookup { key: ResolvedTerm },
}

/// One compiled join stage.
#[derive(Clone, Debug)]
pub struct JoinStage {
    pub class: ClassId,
    pub strategy: JoinStrategy,
    /// Predicates still checked per candidate (everything except a
    /// comparison absorbed into `IdLookup`).
    pub predicates: Vec<ResolvedComparison>,
}

/// A fully compiled constraint pipeline, ready for the score engine.
#[derive(Clone, Debug)]
pub struct CompiledConstraint {
    pub name: String,
    pub weight: Weight,
    pub sign: Sign,
    pub source: ClassId,
    pub joins: Vec<JoinStage>,
    pub filters: Vec<ResolvedComparison>,
    pub distinct_pair: bool,
}

impl CompiledConstraint {
    /// Number of bound parameters.
    pub fn arity(&self) -> usize {
        self.joins.len() + 1
    }
}

/// Compile a builder against the registry. Every failure mode of the
/// pipeline surface lands here: unknown classes, malformed or mistyped
/// predicates, misplaced stages.
pub fn compile(
    builder: &ConstraintBuilder,
    registry: &SchemaRegistry,
) -> SolverResult<CompiledConstraint> {
    let name = builder.name.clone();
    let mut stages = builder.stages.iter();

    let source = match stages.next() {
        Some(Stage::ForEach { class }) => bind_class(registry, class)?,
        _ => {
            return Err(SolverError::Binding(format!(
                "constraint '{name}' must start with for_each"
            )))
        }
    };

    let mut bound: Vec<ClassId> = vec![source];
    let mut letters: Vec<char> = Vec::new();
    let mut joins: Vec<JoinStage> = Vec::new();
    let mut filters: Vec<ResolvedComparison> = Vec::new();
    let mut distinct_pair = false;
    let mut sign: Option<Sign> = None;

    for stage in stages {
        if sign.is_some() {
            return Err(SolverError::Binding(format!(
                "constraint '{name}' has stages after its terminal"
            )));
        }
        match stage {
            Stage::ForEach { .. } => {
                return Err(SolverError::Binding(format!(
                    "constraint '{name}' declares for_each twice"
                )));
            }
            Stage::Join { class, predicates } => {
                let class_id = bind_class(registry, class)?;
                bound.push(class_id);
                let new_tuple = bound.len() - 1;
                let mut compiled = Vec::new();
                for predicate in predicates {
                    let parsed = parser::parse_predicate(predicate)?;
                    bind_letters(&parsed, &mut letters, bound.len())?;
                    for comparison in parsed.comparisons {
                        compiled.push(resolve_comparison(registry, &bound, &letters, &comparison)?);
                    }
                }
                let strategy = extract_id_lookup(registry, &bound, new_tuple, &mut compiled)?;
                joins.push(JoinStage {
                    class: class_id,
                    strategy,
                    predicates: compiled,
                });
            }
            Stage::Filter { predicate } => {
                let parsed = parser::parse_predicate(predicate)?;
                bind_letters(&parsed, &mut letters, bound.len())?;
                for comparison in parsed.comparisons {
                    filters.push(resolve_comparison(registry, &bound, &letters, &comparison)?);
                }
            }
            Stage::DistinctPair => {
                if bound.len() != 2 {
                    return Err(SolverError::Binding(format!(
                        "distinct_pair on constraint '{name}' requires exactly two bound parameters, found {}",
                        bound.len()
                    )));
                }
                if bound[0] != bound[1] {
                    return Err(SolverError::Binding(format!(
                        "distinct_pair on constraint '{name}' requires both parameters to bind the same class"
                    )));
                }
                distinct_pair = true;
            }
            Stage::Penalize => sign = Some(Sign::Penalize),
            Stage::Reward => sign = Some(Sign::Reward),
        }
    }

    let sign = sign.ok_or_else(|| {
        SolverError::Binding(format!(
            "constraint '{name}' is missing a penalize() or reward() terminal"
        ))
    })?;

    Ok(CompiledConstraint {
        name,
        weight: builder.weight,
        sign,
        source,
        joins,
        filters,
        distinct_pair,
    })
}

fn bind_class(registry: &SchemaRegistry, class: &str) -> SolverResult<ClassId> {
    registry
        .class(class)
        .map(|meta| meta.id)
        .ok_or_else(|| SolverError::Binding(format!("unknown class '{class}'")))
}

/// Bind a predicate's parameter letters to tuple positions. Letters are
/// labels, not offsets: the first distinct letter used anywhere in the
/// pipeline names the for_each source, the second names the first join,
/// and so on. A letter is unknown once the pipeline's predicates use more
/// distinct letters than it binds parameters.
fn bind_letters(predicate: &Predicate, letters: &mut Vec<char>, arity: usize) -> SolverResult<()> {
    for param in predicate.params() {
        if letters.contains(&param) {
            continue;
        }
        if letters.len() >= arity {
            return Err(SolverError::Predicate(format!(
                "unknown parameter '{param}': pipeline binds {arity} parameter(s)"
            )));
        }
        letters.push(param);
    }
    Ok(())
}

/// Tuple position of an already-bound parameter letter.
fn resolve_param(param: char, letters: &[char]) -> SolverResult<usize> {
    letters
        .iter()
        .position(|&letter| letter == param)
        .ok_or_else(|| SolverError::Predicate(format!("unknown parameter '{param}'")))
}

fn class_of<'a>(
    registry: &'a SchemaRegistry,
    bound: &[ClassId],
    tuple: usize,
) -> SolverResult<&'a ClassMeta> {
    registry.class_by_id(bound[tuple])
}

fn resolve_field(
    registry: &SchemaRegistry,
    bound: &[ClassId],
    letters: &[char],
    param: char,
    name: &str,
) -> SolverResult<(usize, FieldId, FieldType)> {
    let tuple = resolve_param(param, letters)?;
    let class = class_of(registry, bound, tuple)?;
    let ordinal = class.schema.field_index(name).ok_or_else(|| {
        SolverError::Predicate(format!(
            "unknown field '{name}' on class '{}' (parameter '{param}')",
            class.name
        ))
    })?;
    let ty = class
        .schema
        .field_type(ordinal)
        .unwrap_or(FieldType::Int);
    Ok((tuple, ordinal, ty))
}

enum TypedTerm {
    Int(ResolvedTerm),
    Str(StrFieldRef),
}

fn resolve_term(
    registry: &SchemaRegistry,
    bound: &[ClassId],
    letters: &[char],
    term: &Term,
) -> SolverResult<TypedTerm> {
    match term {
        Term::Int(n) => Ok(TypedTerm::Int(ResolvedTerm::Const(*n))),
        Term::Field { param, name } => {
            let (tuple, ordinal, ty) = resolve_field(registry, bound, letters, *param, name)?;
            match ty {
                FieldType::Int => Ok(TypedTerm::Int(ResolvedTerm::Field {
                    tuple,
                    field: ordinal as usize,
                })),
                FieldType::Str => Ok(TypedTerm::Str(StrFieldRef {
                    tuple,
                    field: ordinal as usize,
                })),
            }
        }
        Term::Add(left, right) | Term::Sub(left, right) => {
            let lhs = require_int(registry, bound, letters, left)?;
            let rhs = require_int(registry, bound, letters, right)?;
            let resolved = match term {
                Term::Add(_, _) => ResolvedTerm::Add(Box::new(lhs), Box::new(rhs)),
                _ => ResolvedTerm::Sub(Box::new(lhs), Box::new(rhs)),
            };
            Ok(TypedTerm::Int(resolved))
        }
    }
}

fn require_int(
    registry: &SchemaRegistry,
    bound: &[ClassId],
    letters: &[char],
    term: &Term,
) -> SolverResult<ResolvedTerm> {
    match resolve_term(registry, bound, letters, term)? {
        TypedTerm::Int(resolved) => Ok(resolved),
        TypedTerm::Str(_) => Err(SolverError::Predicate(
            "str field used in arithmetic; only int fields admit '+'/'-'".into(),
        )),
    }
}

fn resolve_comparison(
    registry: &SchemaRegistry,
    bound: &[ClassId],
    letters: &[char],
    comparison: &Comparison,
) -> SolverResult<ResolvedComparison> {
    let left = resolve_term(registry, bound, letters, &comparison.left)?;
    let right = resolve_term(registry, bound, letters, &comparison.right)?;
    match (left, right) {
        (TypedTerm::Int(left), TypedTerm::Int(right)) => Ok(ResolvedComparison::Int {
            left,
            op: comparison.op,
            right,
        }),
        (TypedTerm::Str(left), TypedTerm::Str(right)) => {
            if !matches!(comparison.op, CmpOp::Eq | CmpOp::Ne) {
                return Err(SolverError::Predicate(
                    "str fields admit only '==' and '!=' comparisons".into(),
                ));
            }
            Ok(ResolvedComparison::Str {
                left,
                op: comparison.op,
                right,
            })
        }
        _ => Err(SolverError::Predicate(
            "type mismatch: cannot compare a str field with an int expression".into(),
        )),
    }
}

/// Detect an equality of the joined class's identifier field against an
/// expression over earlier tuples and turn it into an index probe. The
/// absorbed comparison is removed from the stage's predicate list.
fn extract_id_lookup(
    registry: &SchemaRegistry,
    bound: &[ClassId],
    new_tuple: usize,
    predicates: &mut Vec<ResolvedComparison>,
) -> SolverResult<JoinStrategy> {
    let class = class_of(registry, bound, new_tuple)?;
    let Some(id_field) = class.identifier else {
        return Ok(JoinStrategy::Scan);
    };
    if class.schema.field_type(id_field) != Some(FieldType::Int) {
        return Ok(JoinStrategy::Scan);
    }
    let id_field = id_field as usize;

    for idx in 0..predicates.len() {
        let ResolvedComparison::Int { left, op, right } = &predicates[idx] else {
            continue;
        };
        if *op != CmpOp::Eq {
            continue;
        }
        let key = if is_id_ref(left, new_tuple, id_field) && max_tuple(right) < Some(new_tuple) {
            right.clone()
        } else if is_id_ref(right, new_tuple, id_field) && max_tuple(left) < Some(new_tuple) {
            left.clone()
        } else {
            continue;
        };
        predicates.remove(idx);
        return Ok(JoinStrategy::IdLookup { key });
    }
    Ok(JoinStrategy::Scan)
}

fn is_id_ref(term: &ResolvedTerm, tuple: usize, field: usize) -> bool {
    matches!(term, ResolvedTerm::Field { tuple: t, field: f } if *t == tuple && *f == field)
}

/// Highest tuple index referenced by the term; `Some(0)` for constants so
/// comparisons against literals stay eligible as probe keys.
fn max_tuple(term: &ResolvedTerm) -> Option<usize> {
    match term {
        ResolvedTerm::Const(_) => Some(0),
        ResolvedTerm::Field { tuple, .. } => Some(*tuple),
        ResolvedTerm::Add(l, r) | ResolvedTerm::Sub(l, r) => max_tuple(l).max(max_tuple(r)),
    }
}
