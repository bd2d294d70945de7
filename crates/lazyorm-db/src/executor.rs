//! The execution service seam and record persistence.
//!
//! [`Executor`] is the only thing the query layer needs from a database:
//! run one statement against a labelled connection and hand back a
//! [`Cursor`]. Backends live in `lazyorm-backends`; test doubles live in
//! `lazyorm-test`. Every call is synchronous and blocks until the backend
//! answers. There are no retries here and no timeouts.

use std::collections::VecDeque;

use lazyorm_core::logging::query_span;
use lazyorm_core::OrmResult;

use crate::model::Model;
use crate::query::compiler::insert_sql;
use crate::value::Value;

/// A blocking statement executor addressed by database label.
///
/// Implementations must return rows as value vectors aligned to the
/// statement's projected columns, and must propagate backend failures as
/// [`OrmError::DatabaseError`](lazyorm_core::OrmError::DatabaseError) or
/// [`OrmError::OperationalError`](lazyorm_core::OrmError::OperationalError).
pub trait Executor: Send + Sync {
    /// Runs one statement on the database registered under `label`.
    fn execute(&self, label: &str, sql: &str, params: &[Value]) -> OrmResult<Cursor>;
}

/// A fully buffered statement result.
///
/// # Examples
///
/// ```
/// use lazyorm_db::executor::Cursor;
/// use lazyorm_db::value::Value;
///
/// let mut cursor = Cursor::from_rows(vec![vec![Value::Int(1)], vec![Value::Int(2)]]);
/// assert_eq!(cursor.fetch_one(), Some(vec![Value::Int(1)]));
/// assert_eq!(cursor.fetch_all(), vec![vec![Value::Int(2)]]);
/// assert_eq!(cursor.fetch_one(), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Cursor {
    rows: VecDeque<Vec<Value>>,
    rows_affected: u64,
    last_insert_id: Option<Value>,
}

impl Cursor {
    /// A cursor over the given result rows.
    pub fn from_rows(rows: Vec<Vec<Value>>) -> Self {
        Self {
            rows: rows.into(),
            ..Self::default()
        }
    }

    /// A row-less cursor reporting how many rows a statement touched.
    pub fn affected(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            ..Self::default()
        }
    }

    /// Attaches the id the backend assigned to an inserted row.
    #[must_use]
    pub fn with_last_insert_id(mut self, id: Value) -> Self {
        self.last_insert_id = Some(id);
        self
    }

    /// Takes the next row, if any.
    pub fn fetch_one(&mut self) -> Option<Vec<Value>> {
        self.rows.pop_front()
    }

    /// Takes all remaining rows.
    pub fn fetch_all(&mut self) -> Vec<Vec<Value>> {
        self.rows.drain(..).collect()
    }

    /// The number of rows the statement inserted, updated or deleted.
    pub const fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    /// The id assigned to the last inserted row, if the backend reported one.
    pub const fn last_insert_id(&self) -> Option<&Value> {
        self.last_insert_id.as_ref()
    }
}

/// Runs a statement through `db`, logging it under a per-label span.
///
/// This is also the raw-SQL escape hatch: parameters are bound positionally
/// with the `?` placeholder.
pub fn execute_sql(db: &dyn Executor, label: &str, sql: &str, params: &[Value]) -> OrmResult<Cursor> {
    let span = query_span(label);
    let _guard = span.enter();
    tracing::debug!(sql, params = params.len(), "executing statement");
    db.execute(label, sql, params)
}

/// Inserts a record's assigned fields into its table.
///
/// When the schema declares a primary key and the backend reports the id it
/// assigned, the id is stored back on the record via [`Model::set_pk`].
pub fn save_model<M: Model>(model: &mut M, db: &dyn Executor) -> OrmResult<()> {
    let schema = M::schema();
    let fields = model.field_values();
    schema.check_keywords(fields.iter().map(|(name, _)| *name))?;

    let (sql, params) = insert_sql(schema.table, &fields);
    let cursor = execute_sql(db, schema.label, &sql, &params)?;

    if schema.pk.is_some() {
        if let Some(id) = cursor.last_insert_id() {
            model.set_pk(id.clone());
        }
    }
    Ok(())
}
