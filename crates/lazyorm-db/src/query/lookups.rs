//! Field lookups: `field__suffix` keys translated into SQL fragments.
//!
//! A condition key is split once on [`LOOKUP_SEP`] into a field name and a
//! suffix. The suffix picks the comparison; no suffix means equality.
//!
//! # Examples
//!
//! ```
//! use lazyorm_db::query::lookups::{translate, Condition};
//! use lazyorm_db::value::Value;
//!
//! let (sql, params) = translate(&Condition::new("age__gte", 5));
//! assert_eq!(sql, "age >= ?");
//! assert_eq!(params, vec![Value::Int(5)]);
//!
//! let (sql, params) = translate(&Condition::new("name__contains", "jo"));
//! assert_eq!(sql, "name LIKE ?");
//! assert_eq!(params, vec![Value::from("%jo%")]);
//! ```

use lazyorm_core::{OrmResult, ValidationError};

use crate::value::Value;

use super::compiler::Query;

/// Separates a field name from its lookup suffix.
pub const LOOKUP_SEP: &str = "__";

/// The comparison a lookup suffix selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    /// `field = ?` (no suffix, or `exact`).
    Exact,
    /// `field > ?`
    Gt,
    /// `field >= ?`
    Gte,
    /// `field < ?`
    Lt,
    /// `field <= ?`
    Lte,
    /// `field LIKE '%value%'`
    Contains,
    /// `field LIKE 'value%'`
    StartsWith,
    /// `field LIKE '%value'`
    EndsWith,
    /// `field IS NULL` / `field IS NOT NULL`, chosen by the value's truthiness.
    IsNull,
    /// `field BETWEEN ? AND ?`
    Range,
    /// `field IN (...)`, against a sequence or a one-column subquery.
    In,
}

impl Lookup {
    /// Resolves a suffix; `None` for suffixes outside the table.
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Some(match suffix {
            "" | "exact" => Self::Exact,
            "gt" => Self::Gt,
            "gte" => Self::Gte,
            "lt" => Self::Lt,
            "lte" => Self::Lte,
            "contains" => Self::Contains,
            "startswith" => Self::StartsWith,
            "endswith" => Self::EndsWith,
            "isnull" => Self::IsNull,
            "range" => Self::Range,
            "in" => Self::In,
            _ => return None,
        })
    }

    /// The canonical suffix for this lookup.
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::Contains => "contains",
            Self::StartsWith => "startswith",
            Self::EndsWith => "endswith",
            Self::IsNull => "isnull",
            Self::Range => "range",
            Self::In => "in",
        }
    }
}

/// A rendered single-column select, usable as the right side of `IN`.
#[derive(Debug, Clone, PartialEq)]
pub struct Subquery {
    sql: String,
    params: Vec<Value>,
}

impl Subquery {
    /// Snapshots a query's select SQL. The query must project one column.
    pub fn new(query: &Query) -> OrmResult<Self> {
        if query.select().len() != 1 {
            return Err(ValidationError::new(
                "Cannot use a multi-field QuerySet as a filter value.",
                "multi_field_subquery",
            )
            .into());
        }
        let (sql, params) = query.select_sql();
        Ok(Self { sql, params })
    }

    /// The nested select statement.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The nested statement's parameters.
    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

/// Anything that can stand in as an `IN` subquery.
pub trait AsSubquery {
    /// Renders `self` as a one-column subquery, failing for wider projections.
    fn subquery(&self) -> OrmResult<Subquery>;
}

impl AsSubquery for Query {
    fn subquery(&self) -> OrmResult<Subquery> {
        Subquery::new(self)
    }
}

/// The right-hand side of a condition.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    /// A bound value.
    Value(Value),
    /// A nested select.
    Subquery(Subquery),
}

/// A single `(lookup_key, operand)` leaf of a predicate tree.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    key: String,
    operand: Operand,
}

impl Condition {
    /// Creates a value condition.
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            operand: Operand::Value(value.into()),
        }
    }

    /// Creates a condition against a nested select.
    pub fn subquery(key: impl Into<String>, subquery: Subquery) -> Self {
        Self {
            key: key.into(),
            operand: Operand::Subquery(subquery),
        }
    }

    /// The full lookup key, e.g. `age__gte`.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The right-hand side.
    pub const fn operand(&self) -> &Operand {
        &self.operand
    }

    /// Splits the key once into `(field, suffix)`; the suffix may be empty.
    pub fn split_key(&self) -> (&str, &str) {
        self.key.split_once(LOOKUP_SEP).unwrap_or((&self.key, ""))
    }
}

/// Translates one condition into a SQL fragment and its parameters.
///
/// Unknown suffixes translate to an empty fragment, which callers skip.
pub fn translate(condition: &Condition) -> (String, Vec<Value>) {
    let (field, suffix) = condition.split_key();
    let Some(lookup) = Lookup::from_suffix(suffix) else {
        tracing::warn!(key = condition.key(), "ignoring unknown lookup suffix '{suffix}'");
        return (String::new(), Vec::new());
    };

    let value = match &condition.operand {
        Operand::Subquery(sub) => {
            // Only `in` accepts a subquery; anything else is dropped.
            if lookup == Lookup::In {
                return (format!("{field} IN ({})", sub.sql), sub.params.clone());
            }
            tracing::warn!(key = condition.key(), "subquery operand needs the 'in' lookup");
            return (String::new(), Vec::new());
        }
        Operand::Value(value) => value,
    };

    match lookup {
        Lookup::Exact => (format!("{field} = ?"), vec![value.clone()]),
        Lookup::Gt => (format!("{field} > ?"), vec![value.clone()]),
        Lookup::Gte => (format!("{field} >= ?"), vec![value.clone()]),
        Lookup::Lt => (format!("{field} < ?"), vec![value.clone()]),
        Lookup::Lte => (format!("{field} <= ?"), vec![value.clone()]),
        Lookup::Contains => (format!("{field} LIKE ?"), vec![Value::String(format!("%{value}%"))]),
        Lookup::StartsWith => (format!("{field} LIKE ?"), vec![Value::String(format!("{value}%"))]),
        Lookup::EndsWith => (format!("{field} LIKE ?"), vec![Value::String(format!("%{value}"))]),
        Lookup::IsNull => {
            let sql = if value.is_truthy() {
                format!("{field} IS NULL")
            } else {
                format!("{field} IS NOT NULL")
            };
            (sql, Vec::new())
        }
        Lookup::Range => {
            let params = value.as_list().map_or_else(|| vec![value.clone()], <[Value]>::to_vec);
            (format!("{field} BETWEEN ? AND ?"), params)
        }
        Lookup::In => {
            let bound = match value {
                Value::List(_) => value.clone(),
                scalar => Value::List(vec![scalar.clone()]),
            };
            (format!("{field} IN (?)"), vec![bound])
        }
    }
}
