use std::cmp::Ordering;
use std::fmt;

/// Primitive type of an entity field.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FieldType {
    Int,
    Str,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Int => write!(f, "int"),
            FieldType::Str => write!(f, "str"),
        }
    }
}

/// A single field value stored in an entity tuple.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Value {
    Int(i64),
    Str(String),
}

impl Value {
    pub fn type_of(&self) -> FieldType {
        match self {
            Value::Int(_) => FieldType::Int,
            Value::Str(_) => FieldType::Str,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Str(_) => None,
        }
    }

    pub fn cmp_same_type(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub fn eq_same_type(&self, other: &Value) -> Option<bool> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.eq(b)),
            (Value::Str(a), Value::Str(b)) => Some(a.eq(b)),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

/// Which component of the score a constraint contributes to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ScoreLevel {
    Hard,
    Soft,
}

/// Two-level score ordered lexicographically with the hard component
/// dominant. Any non-zero hard component means the solution is infeasible.
///
/// Arithmetic saturates at the i64 bounds rather than wrapping.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Score {
    pub hard: i64,
    pub soft: i64,
}

impl Score {
    pub const ZERO: Score = Score { hard: 0, soft: 0 };

    pub fn new(hard: i64, soft: i64) -> Self {
        Self { hard, soft }
    }

    /// A score with only a hard component.
    pub fn hard(hard: i64) -> Self {
        Self { hard, soft: 0 }
    }

    /// A score with only a soft component.
    pub fn soft(soft: i64) -> Self {
        Self { hard: 0, soft }
    }

    pub fn is_feasible(&self) -> bool {
        self.hard == 0
    }

    pub fn saturating_add(self, other: Score) -> Score {
        Score {
            hard: self.hard.saturating_add(other.hard),
            soft: self.soft.saturating_add(other.soft),
        }
    }

    /// Weighted contribution of `count` matches at one level. `signum` is
    /// +1 for reward pipelines and -1 for penalize pipelines.
    pub fn contribution(level: ScoreLevel, weight: i64, count: i64, signum: i64) -> Score {
        let total = weight.saturating_mul(count).saturating_mul(signum);
        match level {
            ScoreLevel::Hard => Score::hard(total),
            ScoreLevel::Soft => Score::soft(total),
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}hard/{}soft", self.hard, self.soft)
    }
}
