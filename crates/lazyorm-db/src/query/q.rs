//! Composable predicate trees.
//!
//! A [`Q`] is an ordered list of children (condition leaves or nested
//! nodes) joined by one [`Connector`], optionally negated. Nodes combine
//! with [`Q::and_with`], [`Q::or_with`] and [`Q::negate`] (or `&`, `|`, `!`),
//! flattening where the result would not change meaning and nesting where
//! precedence must be kept.
//!
//! # Examples
//!
//! ```
//! use lazyorm_db::query::q::Q;
//! use lazyorm_db::value::Value;
//!
//! let q = (Q::filter("name", "Alice") & Q::filter("age__gt", 25)) | Q::filter("name", "Bob");
//! let (sql, params) = q.render();
//! assert_eq!(sql, "(name = ? AND age > ?) OR name = ?");
//! assert_eq!(params, vec![Value::from("Alice"), Value::Int(25), Value::from("Bob")]);
//!
//! let (sql, _) = (!Q::filter("active", false)).render();
//! assert_eq!(sql, "NOT (active = ?)");
//! ```

use std::fmt;
use std::ops;

use lazyorm_core::{OrmResult, ValidationError};

use crate::value::Value;

use super::lookups::{translate, AsSubquery, Condition, Lookup, Operand, LOOKUP_SEP};

/// How the children of a node are joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Connector {
    /// All children must hold.
    #[default]
    And,
    /// Any child may hold.
    Or,
}

impl Connector {
    /// The SQL keyword.
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }

    const fn separator(self) -> &'static str {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }
}

/// One entry of a predicate node.
#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    /// A single field condition.
    Leaf(Condition),
    /// A nested node with its own connector and negation.
    Node(Q),
}

/// A boolean predicate tree node.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Q {
    children: Vec<Child>,
    connector: Connector,
    negated: bool,
}

impl Q {
    /// An empty AND node; it renders to nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// A node holding one condition.
    pub fn filter(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::from_condition(Condition::new(key, value))
    }

    /// An AND node holding one condition per pair, in order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        Self {
            children: pairs
                .into_iter()
                .map(|(k, v)| Child::Leaf(Condition::new(k, v)))
                .collect(),
            ..Self::default()
        }
    }

    /// A node matching `key` against a one-column subquery.
    ///
    /// The key must use the `in` lookup, and the subquery must project
    /// exactly one column.
    pub fn in_subquery(key: impl Into<String>, source: &impl AsSubquery) -> OrmResult<Self> {
        let key = key.into();
        let suffix = key.split_once(LOOKUP_SEP).map_or("", |(_, suffix)| suffix);
        if Lookup::from_suffix(suffix) != Some(Lookup::In) {
            return Err(ValidationError::new(
                format!("Subquery operands need the 'in' lookup, got '{key}'."),
                "invalid_lookup",
            )
            .with_param("key", key)
            .into());
        }
        Ok(Self::from_condition(Condition::subquery(key, source.subquery()?)))
    }

    fn from_condition(condition: Condition) -> Self {
        Self {
            children: vec![Child::Leaf(condition)],
            ..Self::default()
        }
    }

    /// The node's children, in order.
    pub fn children(&self) -> &[Child] {
        &self.children
    }

    /// The connector joining the children.
    pub const fn connector(&self) -> Connector {
        self.connector
    }

    /// Whether the node is negated.
    pub const fn is_negated(&self) -> bool {
        self.negated
    }

    /// The number of direct children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns `true` if the node has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Whether the node contributes anything to a WHERE clause.
    /// Negation alone does not count.
    pub fn has_effect(&self) -> bool {
        !self.is_empty()
    }

    /// Merges `other` into `self` under `connector`.
    ///
    /// Under a matching connector, a non-negated `other` with one child or
    /// the same connector is spliced in; any other `other` is appended as a
    /// nested node. When the connector changes, self's current children are
    /// moved into a nested node that keeps self's connector and negation,
    /// and `other` becomes its sibling. Empty operands are ignored.
    pub fn add(&mut self, other: Self, connector: Connector) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            self.connector = connector;
        }
        if self.connector != connector {
            let inner = Self {
                children: std::mem::take(&mut self.children),
                connector: self.connector,
                negated: self.negated,
            };
            self.connector = connector;
            self.negated = false;
            self.children.push(Child::Node(inner));
        }
        if !other.negated && (other.connector == connector || other.len() == 1) {
            self.children.extend(other.children);
        } else {
            self.children.push(Child::Node(other));
        }
    }

    /// A fresh node joining `self` and `other` under `connector`.
    pub fn combine(self, other: Self, connector: Connector) -> Self {
        let mut node = Self {
            connector,
            ..Self::default()
        };
        node.add(self, connector);
        node.add(other, connector);
        node
    }

    /// `self AND other`.
    pub fn and_with(self, other: Self) -> Self {
        self.combine(other, Connector::And)
    }

    /// `self OR other`.
    pub fn or_with(self, other: Self) -> Self {
        self.combine(other, Connector::Or)
    }

    /// `NOT self`, as a fresh negated AND node around `self`.
    pub fn negate(self) -> Self {
        let mut node = Self::new();
        node.add(self, Connector::And);
        node.negated = true;
        node
    }

    /// Renders the node to a SQL condition and its parameters.
    ///
    /// A negated node is wrapped as `NOT (...)`. An empty node renders
    /// `("", [])`, which callers treat as "no condition".
    pub fn render(&self) -> (String, Vec<Value>) {
        let (sql, params) = self.render_children();
        if self.negated && !sql.is_empty() {
            (format!("NOT ({sql})"), params)
        } else {
            (sql, params)
        }
    }

    // A lone child needs no parentheses: nothing is joined beside it.
    fn render_children(&self) -> (String, Vec<Value>) {
        let mut parts = Vec::with_capacity(self.children.len());
        let mut params = Vec::new();
        for child in &self.children {
            let (sql, child_params) = match child {
                Child::Leaf(condition) => translate(condition),
                Child::Node(node) => {
                    let (sql, child_params) = node.render_children();
                    if sql.is_empty() {
                        (sql, child_params)
                    } else if node.negated {
                        (format!("NOT ({sql})"), child_params)
                    } else if node.connector != self.connector && self.children.len() > 1 {
                        (format!("({sql})"), child_params)
                    } else {
                        (sql, child_params)
                    }
                }
            };
            if sql.is_empty() {
                continue;
            }
            parts.push(sql);
            params.extend(child_params);
        }
        (parts.join(self.connector.separator()), params)
    }
}

impl ops::BitAnd for Q {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        self.and_with(rhs)
    }
}

impl ops::BitOr for Q {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        self.or_with(rhs)
    }
}

impl ops::Not for Q {
    type Output = Self;

    fn not(self) -> Self::Output {
        self.negate()
    }
}

impl fmt::Display for Q {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "(NOT ")?;
        }
        write!(f, "({}: ", self.connector.keyword())?;
        for (i, child) in self.children.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match child {
                Child::Leaf(condition) => match condition.operand() {
                    Operand::Value(v) => write!(f, "('{}', {v})", condition.key())?,
                    Operand::Subquery(s) => {
                        write!(f, "('{}', <{}>)", condition.key(), s.sql())?;
                    }
                },
                Child::Node(node) => write!(f, "{node}")?,
            }
        }
        write!(f, ")")?;
        if self.negated {
            write!(f, ")")?;
        }
        Ok(())
    }
}
