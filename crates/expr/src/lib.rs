
/// Comparison operators permitted between two predicate terms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// One side of a comparison: an integer literal, a `PARAM.field`
/// reference, or a sum/difference of terms.
///
/// Examples:
/// - `Term::Int(3)`
/// - `Term::Field { param: 'A', name: "row".into() }`
/// - `A.row - B.row` as `Term::Sub(field, field)`
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Term {
    Int(i64),
    Field {
        /// Parameter letter bound by the enclosing pipeline (`A`, `B`, ...).
        param: char,
        /// Field name on the class that parameter is bound to.
        name: String,
    },
    Add(Box<Term>, Box<Term>),
    Sub(Box<Term>, Box<Term>),
}

impl Term {
    pub fn field(param: char, name: impl Into<String>) -> Self {
        Term::Field {
            param,
            name: name.into(),
        }
    }

    fn collect_params(&self, out: &mut Vec<char>) {
        match self {
            Term::Int(_) => {}
            Term::Field { param, .. } => {
                if !out.contains(param) {
                    out.push(*param);
                }
            }
            Term::Add(l, r) | Term::Sub(l, r) => {
                l.collect_params(out);
                r.collect_params(out);
            }
        }
    }
}

/// A single comparison between two terms.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Comparison {
    pub left: Term,
    pub op: CmpOp,
    pub right: Term,
}

/// A conjunction of comparisons. Several predicate strings supplied to one
/// join stage fold into one `Predicate` the same way an explicit `and`
/// does.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Predicate {
    pub comparisons: Vec<Comparison>,
}

impl Predicate {
    pub fn new(comparisons: Vec<Comparison>) -> Self {
        Self { comparisons }
    }

    /// Parameter letters referenced anywhere in the conjunction, in
    /// first-appearance order (left term before right term, comparisons
    /// in sequence). This order is what pipelines bind letters to tuple
    /// positions with.
    pub fn params(&self) -> Vec<char> {
        let mut out = Vec::new();
        for cmp in &self.comparisons {
            cmp.left.collect_params(&mut out);
            cmp.right.collect_params(&mut out);
        }
        out
    }
}
