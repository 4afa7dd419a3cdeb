//! Named, parameterized query strings.
//!
//! Accepts a small JPQL-like subset and turns it into the same
//! [`Specification`] the builder API produces:
//!
//! ```text
//! select m from Member m where m.username = :username and m.age > :age
//! select m from Member m where m.username in :names
//! select m from Member m where m.team.name is not null
//! ```
//!
//! # Invariants
//! - Queries are parsed once, at registration, so malformed strings fail
//!   before any execution.
//! - Binding requires exactly the parameters the query declares.

use super::predicate::ComparisonOp;
use super::{Field, Specification, Value};
use crate::repo::{RepoError, RepoResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};

static STATEMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)^\s*select\s+(?P<projection>\w+)\s+from\s+(?P<entity>\w+)\s+(?:as\s+)?(?P<alias>\w+)(?:\s+where\s+(?P<where>.+?))?\s*$",
    )
    .expect("statement pattern is valid")
});
static AND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+and\s+").expect("conjunction pattern is valid"));
static OR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\s+or\s+").expect("disjunction pattern is valid"));
static CONDITION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^(?P<alias>\w+)\.(?P<path>\w+(?:\.\w+)*)\s*(?P<rest>.*)$")
        .expect("condition pattern is valid")
});
static COMPARE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?P<op><>|!=|>=|<=|=|>|<|like)\s*:(?P<param>\w+)$")
        .expect("comparison pattern is valid")
});
static IN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^in\s*\(?\s*:(?P<param>\w+)\s*\)?$").expect("in pattern is valid")
});
static NULL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^is\s+(?P<not>not\s+)?null$").expect("null pattern is valid"));

#[derive(Debug, Clone, PartialEq)]
enum Condition<F: Field> {
    Compare {
        field: F,
        op: ComparisonOp,
        param: String,
    },
    In {
        field: F,
        param: String,
    },
    IsNull(F),
    IsNotNull(F),
}

/// Parsed query string bound to one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedQuery<F: Field> {
    text: String,
    conditions: Vec<Condition<F>>,
}

impl<F: Field> NamedQuery<F> {
    /// Parses `text` as a query over `entity`.
    ///
    /// # Errors
    /// - `InvalidQuery` for syntax outside the supported subset, a different
    ///   entity, unknown field paths, or `or` conjunctions.
    pub fn parse(text: &str, entity: &str) -> RepoResult<Self> {
        let captures = STATEMENT_RE
            .captures(text)
            .ok_or_else(|| invalid(text, "expected `select <alias> from <Entity> <alias> [where ...]`"))?;

        if !captures["entity"].eq_ignore_ascii_case(entity) {
            return Err(invalid(
                text,
                &format!("query targets `{}`, expected `{entity}`", &captures["entity"]),
            ));
        }
        let alias = &captures["alias"];
        if &captures["projection"] != alias {
            return Err(invalid(text, "only whole-entity projections are supported"));
        }

        let mut conditions = Vec::new();
        if let Some(clause) = captures.name("where") {
            let clause = clause.as_str();
            if OR_RE.is_match(clause) {
                return Err(invalid(text, "only `and` conjunctions are supported"));
            }
            for part in AND_RE.split(clause) {
                conditions.push(parse_condition(text, alias, part.trim())?);
            }
        }

        Ok(Self {
            text: text.trim().to_string(),
            conditions,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Declared parameter names, sorted.
    pub fn parameters(&self) -> BTreeSet<&str> {
        self.conditions
            .iter()
            .filter_map(|condition| match condition {
                Condition::Compare { param, .. } | Condition::In { param, .. } => {
                    Some(param.as_str())
                }
                Condition::IsNull(_) | Condition::IsNotNull(_) => None,
            })
            .collect()
    }

    /// Binds parameters and returns the equivalent specification.
    ///
    /// # Errors
    /// - `InvalidQuery` when a declared parameter is missing, an extra one is
    ///   supplied, or a list is bound to a scalar comparison.
    pub fn bind(&self, params: &QueryParams) -> RepoResult<Specification<F>> {
        let declared = self.parameters();
        if let Some(extra) = params.names().find(|name| !declared.contains(name)) {
            return Err(invalid(&self.text, &format!("unknown parameter `{extra}`")));
        }

        let mut spec = Specification::all();
        for condition in &self.conditions {
            let part = match condition {
                Condition::Compare { field, op, param } => match params.get(&self.text, param)? {
                    ParamValue::Single(value) => Specification::compare(*field, *op, value.clone()),
                    ParamValue::List(_) => {
                        return Err(invalid(
                            &self.text,
                            &format!("parameter `{param}` must be a single value"),
                        ));
                    }
                },
                Condition::In { field, param } => match params.get(&self.text, param)? {
                    ParamValue::Single(value) => Specification::in_list(*field, [value.clone()]),
                    ParamValue::List(values) => Specification::in_list(*field, values.clone()),
                },
                Condition::IsNull(field) => Specification::is_null(*field),
                Condition::IsNotNull(field) => Specification::is_not_null(*field),
            };
            spec = spec.and(part);
        }
        Ok(spec)
    }
}

fn parse_condition<F: Field>(text: &str, alias: &str, part: &str) -> RepoResult<Condition<F>> {
    let captures = CONDITION_RE
        .captures(part)
        .ok_or_else(|| invalid(text, &format!("cannot parse condition `{part}`")))?;
    if &captures["alias"] != alias {
        return Err(invalid(
            text,
            &format!("unknown alias `{}` in `{part}`", &captures["alias"]),
        ));
    }
    let path = &captures["path"];
    let field = F::from_name(path)
        .ok_or_else(|| invalid(text, &format!("unknown field `{path}`")))?;
    let rest = captures["rest"].trim();

    if let Some(compare) = COMPARE_RE.captures(rest) {
        let op = match compare["op"].to_ascii_lowercase().as_str() {
            "=" => ComparisonOp::Eq,
            "<>" | "!=" => ComparisonOp::Ne,
            ">" => ComparisonOp::Gt,
            ">=" => ComparisonOp::Ge,
            "<" => ComparisonOp::Lt,
            "<=" => ComparisonOp::Le,
            _ => ComparisonOp::Like,
        };
        return Ok(Condition::Compare {
            field,
            op,
            param: compare["param"].to_string(),
        });
    }
    if let Some(list) = IN_RE.captures(rest) {
        return Ok(Condition::In {
            field,
            param: list["param"].to_string(),
        });
    }
    if let Some(null) = NULL_RE.captures(rest) {
        return Ok(if null.name("not").is_some() {
            Condition::IsNotNull(field)
        } else {
            Condition::IsNull(field)
        });
    }

    Err(invalid(text, &format!("unsupported operator in `{part}`")))
}

fn invalid(text: &str, reason: &str) -> RepoError {
    RepoError::InvalidQuery(format!("{reason} (query: `{}`)", text.trim()))
}

#[derive(Debug, Clone, PartialEq)]
enum ParamValue {
    Single(Value),
    List(Vec<Value>),
}

/// Named parameter values for [`NamedQuery::bind`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    values: BTreeMap<String, ParamValue>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values
            .insert(name.into(), ParamValue::Single(value.into()));
        self
    }

    pub fn set_list<V: Into<Value>>(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        self.values.insert(
            name.into(),
            ParamValue::List(values.into_iter().map(Into::into).collect()),
        );
        self
    }

    fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    fn get(&self, text: &str, name: &str) -> RepoResult<&ParamValue> {
        self.values
            .get(name)
            .ok_or_else(|| invalid(text, &format!("missing parameter `{name}`")))
    }
}

/// Queries registered by name for one entity.
#[derive(Debug, Clone)]
pub struct NamedQueryRegistry<F: Field> {
    entity: &'static str,
    queries: BTreeMap<String, NamedQuery<F>>,
}

impl<F: Field> NamedQueryRegistry<F> {
    pub fn new(entity: &'static str) -> Self {
        Self {
            entity,
            queries: BTreeMap::new(),
        }
    }

    /// Parses and stores `text` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, text: &str) -> RepoResult<()> {
        let query = NamedQuery::parse(text, self.entity)?;
        self.queries.insert(name.into(), query);
        Ok(())
    }

    pub fn get(&self, name: &str) -> RepoResult<&NamedQuery<F>> {
        self.queries
            .get(name)
            .ok_or_else(|| RepoError::InvalidQuery(format!("unknown named query `{name}`")))
    }

    /// Looks up `name` and binds `params` in one step.
    pub fn bind(&self, name: &str, params: &QueryParams) -> RepoResult<Specification<F>> {
        self.get(name)?.bind(params)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.queries.keys().map(String::as_str)
    }
}
