//! Composable filter specifications.
//!
//! A specification is an inert value. Composition only rearranges the
//! predicate tree; SQL is produced when a repository executes it.

use super::predicate::{ComparisonOp, Predicate, SqlFilter};
use super::{Field, Value};

#[derive(Debug, Clone, PartialEq)]
pub struct Specification<F: Field> {
    predicate: Option<Predicate<F>>,
}

impl<F: Field> Default for Specification<F> {
    fn default() -> Self {
        Self::all()
    }
}

impl<F: Field> Specification<F> {
    /// Matches every row.
    pub fn all() -> Self {
        Self { predicate: None }
    }

    /// Matches no row.
    pub fn none() -> Self {
        Self::from_predicate(Predicate::Or(Vec::new()))
    }

    pub fn from_predicate(predicate: Predicate<F>) -> Self {
        Self {
            predicate: Some(predicate),
        }
    }

    pub fn compare(field: F, op: ComparisonOp, value: impl Into<Value>) -> Self {
        Self::from_predicate(Predicate::Compare {
            field,
            op,
            value: value.into(),
        })
    }

    pub fn equal(field: F, value: impl Into<Value>) -> Self {
        Self::compare(field, ComparisonOp::Eq, value)
    }

    pub fn not_equal(field: F, value: impl Into<Value>) -> Self {
        Self::compare(field, ComparisonOp::Ne, value)
    }

    pub fn greater_than(field: F, value: impl Into<Value>) -> Self {
        Self::compare(field, ComparisonOp::Gt, value)
    }

    pub fn greater_or_equal(field: F, value: impl Into<Value>) -> Self {
        Self::compare(field, ComparisonOp::Ge, value)
    }

    pub fn less_than(field: F, value: impl Into<Value>) -> Self {
        Self::compare(field, ComparisonOp::Lt, value)
    }

    pub fn less_or_equal(field: F, value: impl Into<Value>) -> Self {
        Self::compare(field, ComparisonOp::Le, value)
    }

    /// SQL `LIKE` with the caller's pattern, e.g. `"mem%"`.
    pub fn like(field: F, pattern: impl Into<String>) -> Self {
        Self::compare(field, ComparisonOp::Like, Value::Text(pattern.into()))
    }

    pub fn in_list<V: Into<Value>>(field: F, values: impl IntoIterator<Item = V>) -> Self {
        Self::from_predicate(Predicate::In {
            field,
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    pub fn is_null(field: F) -> Self {
        Self::from_predicate(Predicate::IsNull(field))
    }

    pub fn is_not_null(field: F) -> Self {
        Self::from_predicate(Predicate::IsNotNull(field))
    }

    /// Logical AND; `all()` is the identity element.
    pub fn and(self, other: Self) -> Self {
        match (self.predicate, other.predicate) {
            (None, rhs) => Self { predicate: rhs },
            (lhs, None) => Self { predicate: lhs },
            (Some(lhs), Some(rhs)) => Self::from_predicate(Predicate::And(
                flatten(lhs, rhs, |p| matches!(p, Predicate::And(_))),
            )),
        }
    }

    /// Logical OR; `all()` absorbs the other side.
    pub fn or(self, other: Self) -> Self {
        match (self.predicate, other.predicate) {
            (None, _) | (_, None) => Self::all(),
            (Some(lhs), Some(rhs)) => Self::from_predicate(Predicate::Or(flatten(
                lhs,
                rhs,
                |p| matches!(p, Predicate::Or(_)),
            ))),
        }
    }

    pub fn negate(self) -> Self {
        match self.predicate {
            None => Self::none(),
            Some(Predicate::Not(inner)) => Self::from_predicate(*inner),
            Some(predicate) => Self::from_predicate(Predicate::Not(Box::new(predicate))),
        }
    }

    pub fn predicate(&self) -> Option<&Predicate<F>> {
        self.predicate.as_ref()
    }

    pub fn matches_all(&self) -> bool {
        self.predicate.is_none()
    }

    pub(crate) fn compile(&self) -> SqlFilter {
        match &self.predicate {
            None => SqlFilter::match_all(),
            Some(predicate) => predicate.compile(),
        }
    }
}

fn flatten<F: Field>(
    lhs: Predicate<F>,
    rhs: Predicate<F>,
    same_kind: impl Fn(&Predicate<F>) -> bool,
) -> Vec<Predicate<F>> {
    let mut parts = Vec::new();
    for side in [lhs, rhs] {
        if same_kind(&side) {
            match side {
                Predicate::And(inner) | Predicate::Or(inner) => parts.extend(inner),
                other => parts.push(other),
            }
        } else {
            parts.push(side);
        }
    }
    parts
}
