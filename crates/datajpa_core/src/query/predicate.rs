//! Predicate trees and their SQL compilation.

use super::{Field, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
}

impl ComparisonOp {
    fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Like => "LIKE",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate<F: Field> {
    Compare {
        field: F,
        op: ComparisonOp,
        value: Value,
    },
    In {
        field: F,
        values: Vec<Value>,
    },
    IsNull(F),
    IsNotNull(F),
    And(Vec<Predicate<F>>),
    Or(Vec<Predicate<F>>),
    Not(Box<Predicate<F>>),
}

/// Compiled WHERE clause with its positional parameters and required joins.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SqlFilter {
    pub clause: String,
    pub params: Vec<Value>,
    pub joins: Vec<&'static str>,
}

impl SqlFilter {
    /// Filter that keeps every row.
    pub fn match_all() -> Self {
        Self {
            clause: "1 = 1".to_string(),
            ..Self::default()
        }
    }

    pub fn require_join(&mut self, join: Option<&'static str>) {
        if let Some(join) = join {
            if !self.joins.contains(&join) {
                self.joins.push(join);
            }
        }
    }
}

impl<F: Field> Predicate<F> {
    pub(crate) fn compile(&self) -> SqlFilter {
        let mut filter = SqlFilter::default();
        self.write_into(&mut filter);
        filter
    }

    fn write_into(&self, out: &mut SqlFilter) {
        match self {
            Self::Compare { field, op, value } => {
                out.require_join(field.join());
                out.clause
                    .push_str(&format!("{} {} ?", field.column(), op.sql()));
                out.params.push(value.clone());
            }
            Self::In { field, values } => {
                if values.is_empty() {
                    out.clause.push_str("1 = 0");
                    return;
                }
                out.require_join(field.join());
                let placeholders = vec!["?"; values.len()].join(", ");
                out.clause
                    .push_str(&format!("{} IN ({placeholders})", field.column()));
                out.params.extend(values.iter().cloned());
            }
            Self::IsNull(field) => {
                out.require_join(field.join());
                out.clause.push_str(&format!("{} IS NULL", field.column()));
            }
            Self::IsNotNull(field) => {
                out.require_join(field.join());
                out.clause
                    .push_str(&format!("{} IS NOT NULL", field.column()));
            }
            Self::And(parts) => write_group(out, parts, " AND ", "1 = 1"),
            Self::Or(parts) => write_group(out, parts, " OR ", "1 = 0"),
            Self::Not(inner) => {
                out.clause.push_str("NOT (");
                inner.write_into(out);
                out.clause.push(')');
            }
        }
    }
}

fn write_group<F: Field>(
    out: &mut SqlFilter,
    parts: &[Predicate<F>],
    separator: &str,
    empty: &str,
) {
    if parts.is_empty() {
        out.clause.push_str(empty);
        return;
    }
    out.clause.push('(');
    for (index, part) in parts.iter().enumerate() {
        if index > 0 {
            out.clause.push_str(separator);
        }
        part.write_into(out);
    }
    out.clause.push(')');
}

/// One assignment of a bulk update.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate<F: Field> {
    /// `column = value`
    Set(F, Value),
    /// `column = column + delta`
    Add(F, i64),
}

impl<F: Field> FieldUpdate<F> {
    pub fn field(&self) -> F {
        match self {
            Self::Set(field, _) | Self::Add(field, _) => *field,
        }
    }

    pub(crate) fn assignment(&self) -> (String, Value) {
        match self {
            Self::Set(field, value) => (format!("{} = ?", field.column_name()), value.clone()),
            Self::Add(field, delta) => (
                format!("{0} = {0} + ?", field.column_name()),
                Value::Integer(*delta),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ComparisonOp, Predicate};
    use crate::query::{Field, Value};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Probe {
        Name,
        Owner,
    }

    impl Field for Probe {
        fn column(self) -> &'static str {
            match self {
                Self::Name => "p.name",
                Self::Owner => "o.name",
            }
        }

        fn column_name(self) -> &'static str {
            "name"
        }

        fn name(self) -> &'static str {
            match self {
                Self::Name => "name",
                Self::Owner => "owner.name",
            }
        }

        fn all() -> &'static [Self] {
            &[Self::Name, Self::Owner]
        }

        fn join(self) -> Option<&'static str> {
            match self {
                Self::Name => None,
                Self::Owner => Some("LEFT JOIN owner o ON o.id = p.owner_id"),
            }
        }
    }

    #[test]
    fn nested_groups_keep_parameter_order() {
        let predicate = Predicate::Or(vec![
            Predicate::And(vec![
                Predicate::Compare {
                    field: Probe::Name,
                    op: ComparisonOp::Eq,
                    value: Value::Text("a".to_string()),
                },
                Predicate::Compare {
                    field: Probe::Owner,
                    op: ComparisonOp::Ne,
                    value: Value::Text("b".to_string()),
                },
            ]),
            Predicate::Not(Box::new(Predicate::IsNull(Probe::Owner))),
        ]);

        let filter = predicate.compile();
        assert_eq!(
            filter.clause,
            "((p.name = ? AND o.name <> ?) OR NOT (o.name IS NULL))"
        );
        assert_eq!(
            filter.params,
            vec![Value::Text("a".to_string()), Value::Text("b".to_string())]
        );
        assert_eq!(filter.joins.len(), 1);
    }

    #[test]
    fn empty_in_list_matches_nothing() {
        let filter = Predicate::In {
            field: Probe::Name,
            values: Vec::new(),
        }
        .compile();

        assert_eq!(filter.clause, "1 = 0");
        assert!(filter.params.is_empty());
    }

    #[test]
    fn from_name_resolves_relation_paths() {
        assert_eq!(Probe::from_name("owner.name"), Some(Probe::Owner));
        assert_eq!(Probe::from_name("missing"), None);
    }
}
