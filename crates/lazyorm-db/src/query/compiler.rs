//! The query accumulator and its SQL rendering.
//!
//! A [`Query`] collects a filter tree, an exclude tree, ordering, an
//! optional [`Window`] and the projected columns for one [`Schema`], and
//! renders them for the four statement kinds in [`SqlMethod`]. All
//! statements use `?` placeholders; parameters come out in the order
//! SET values, filter, exclude, LIMIT, OFFSET.
//!
//! Predicate trees are held behind [`Arc`]: cloning a query shares them,
//! and adding a condition to a clone copies the tree first.

use std::fmt;
use std::sync::Arc;

use lazyorm_core::{OrmResult, ValidationError};

use crate::model::Schema;
use crate::value::Value;

use super::q::{Connector, Q};

/// An offset/limit pair restricting the visible rows of a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Window {
    /// Rows skipped from the start of the unrestricted result.
    pub offset: usize,
    /// Maximum rows returned; `None` means "to the end".
    pub limit: Option<usize>,
}

impl Window {
    /// Narrows `current` by the half-open range `start..stop`, taken
    /// relative to the current window.
    ///
    /// The new window never reaches past the current one: a stop beyond
    /// the current end is truncated, and a start beyond it yields a limit
    /// of zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use lazyorm_db::query::compiler::Window;
    ///
    /// let outer = Window::narrow(None, 2, Some(7));
    /// let inner = Window::narrow(Some(outer), 1, Some(3));
    /// assert_eq!(inner, Window { offset: 3, limit: Some(2) });
    /// ```
    pub fn narrow(current: Option<Self>, start: usize, stop: Option<usize>) -> Self {
        let base = current.unwrap_or_default();
        let offset = base.offset.saturating_add(start);
        let limit = stop.map(|stop| stop.saturating_sub(start));

        let Some(prior) = base.limit else {
            return Self { offset, limit };
        };
        let end = base.offset.saturating_add(prior);
        if offset > end {
            return Self {
                offset: base.offset,
                limit: Some(0),
            };
        }
        let available = end - offset;
        Self {
            offset,
            limit: Some(limit.map_or(available, |l| l.min(available))),
        }
    }

    /// How many of `total` unrestricted rows fall inside the window.
    pub fn visible_count(self, total: usize) -> usize {
        if self.offset >= total {
            return 0;
        }
        let remaining = total - self.offset;
        self.limit.map_or(remaining, |limit| limit.min(remaining))
    }
}

/// The statement kind a [`Query`] renders.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlMethod {
    /// `SELECT <columns> FROM ...`
    Select,
    /// `SELECT COUNT(*) FROM ...`
    Count,
    /// `UPDATE ... SET ...` with the given assignments.
    Update(Vec<(String, Value)>),
    /// `DELETE FROM ...`
    Delete,
}

/// Accumulated query state for one table.
///
/// # Examples
///
/// ```
/// use lazyorm_db::model::Schema;
/// use lazyorm_db::query::compiler::{Query, SqlMethod};
/// use lazyorm_db::query::q::Q;
/// use lazyorm_db::value::Value;
///
/// static USERS: Schema = Schema::new("users", &["id", "name", "age"]);
///
/// let mut query = Query::new(&USERS);
/// query.add_filter(Q::filter("age__gte", 18));
/// query.add_exclude(Q::filter("name", "root"));
/// query.set_order_by(vec!["-age".to_string()]);
///
/// let (sql, params) = query.render(&SqlMethod::Count).unwrap();
/// assert_eq!(sql, "SELECT COUNT(*) FROM users WHERE (age >= ?) AND NOT (name = ?) ORDER BY age DESC");
/// assert_eq!(params, vec![Value::Int(18), Value::from("root")]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    schema: &'static Schema,
    filter: Arc<Q>,
    exclude: Arc<Q>,
    order_by: Vec<String>,
    window: Option<Window>,
    select: Vec<String>,
}

impl Query {
    /// A query over all rows and all fields of `schema`.
    pub fn new(schema: &'static Schema) -> Self {
        Self {
            schema,
            filter: Arc::new(Q::new()),
            exclude: Arc::new(Q::new()),
            order_by: Vec::new(),
            window: None,
            select: schema.field_names(),
        }
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    pub fn filter(&self) -> &Q {
        &self.filter
    }

    pub fn exclude(&self) -> &Q {
        &self.exclude
    }

    pub fn order_by(&self) -> &[String] {
        &self.order_by
    }

    pub fn window(&self) -> Option<Window> {
        self.window
    }

    pub fn select(&self) -> &[String] {
        &self.select
    }

    /// Returns `true` if this query shares its filter tree with `other`.
    pub fn shares_filter_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.filter, &other.filter)
    }

    /// AND-merges `q` into the filter tree. Empty nodes are ignored.
    pub fn add_filter(&mut self, q: Q) {
        if q.has_effect() {
            Arc::make_mut(&mut self.filter).add(q, Connector::And);
        }
    }

    /// AND-merges `q` into the exclude tree. Empty nodes are ignored.
    pub fn add_exclude(&mut self, q: Q) {
        if q.has_effect() {
            Arc::make_mut(&mut self.exclude).add(q, Connector::And);
        }
    }

    /// Replaces the ordering. A leading `-` sorts descending.
    pub fn set_order_by(&mut self, fields: Vec<String>) {
        self.order_by = fields;
    }

    pub fn set_window(&mut self, window: Option<Window>) {
        self.window = window;
    }

    /// Replaces the projected columns.
    pub fn set_select(&mut self, columns: Vec<String>) {
        self.select = columns;
    }

    /// Renders the `SELECT` statement; selects cannot fail.
    pub fn select_sql(&self) -> (String, Vec<Value>) {
        let mut sql = format!("SELECT {} FROM {}", self.select.join(", "), self.schema.table);
        let mut params = Vec::new();
        self.push_where(&mut sql, &mut params);
        self.push_order_by(&mut sql);
        self.push_window(&mut sql, &mut params);
        (sql, params)
    }

    /// Renders the statement for `method`.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an update or delete on a windowed
    /// query, and for an update none of whose keys is a schema field.
    pub fn render(&self, method: &SqlMethod) -> OrmResult<(String, Vec<Value>)> {
        match method {
            SqlMethod::Select => Ok(self.select_sql()),
            SqlMethod::Count => {
                let mut sql = format!("SELECT COUNT(*) FROM {}", self.schema.table);
                let mut params = Vec::new();
                self.push_where(&mut sql, &mut params);
                self.push_order_by(&mut sql);
                self.push_window(&mut sql, &mut params);
                Ok((sql, params))
            }
            SqlMethod::Update(fields) => {
                if self.window.is_some() {
                    return Err(ValidationError::new(
                        "Cannot update a query once a slice has been taken.",
                        "sliced_update",
                    )
                    .into());
                }
                let known: Vec<&(String, Value)> = fields
                    .iter()
                    .filter(|(name, _)| self.schema.has_field(name))
                    .collect();
                if known.is_empty() {
                    return Err(ValidationError::new(
                        format!("No known fields to update on {}.", self.schema.table),
                        "no_update_fields",
                    )
                    .into());
                }
                let assignments: Vec<String> = known.iter().map(|(name, _)| format!("{name} = ?")).collect();
                let mut params: Vec<Value> = known.iter().map(|(_, value)| value.clone()).collect();
                let mut sql = format!("UPDATE {} SET {}", self.schema.table, assignments.join(", "));
                self.push_where(&mut sql, &mut params);
                Ok((sql, params))
            }
            SqlMethod::Delete => {
                if self.window.is_some() {
                    return Err(ValidationError::new(
                        "Cannot use 'limit' or 'offset' with delete.",
                        "sliced_delete",
                    )
                    .into());
                }
                let mut sql = format!("DELETE FROM {}", self.schema.table);
                let mut params = Vec::new();
                self.push_where(&mut sql, &mut params);
                Ok((sql, params))
            }
        }
    }

    fn push_where(&self, sql: &mut String, params: &mut Vec<Value>) {
        let mut clauses = Vec::with_capacity(2);
        let (filter_sql, filter_params) = self.filter.render();
        if !filter_sql.is_empty() {
            clauses.push(format!("({filter_sql})"));
            params.extend(filter_params);
        }
        let (exclude_sql, exclude_params) = self.exclude.render();
        if !exclude_sql.is_empty() {
            clauses.push(format!("NOT ({exclude_sql})"));
            params.extend(exclude_params);
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
    }

    fn push_order_by(&self, sql: &mut String) {
        if self.order_by.is_empty() {
            return;
        }
        let terms: Vec<String> = self
            .order_by
            .iter()
            .map(|spec| match spec.strip_prefix('-') {
                Some(name) => format!("{name} DESC"),
                None => spec.clone(),
            })
            .collect();
        sql.push_str(" ORDER BY ");
        sql.push_str(&terms.join(", "));
    }

    fn push_window(&self, sql: &mut String, params: &mut Vec<Value>) {
        let Some(window) = self.window else {
            return;
        };
        match window.limit {
            Some(limit) => {
                sql.push_str(" LIMIT ?");
                params.push(Value::Int(to_i64(limit)));
            }
            // SQLite requires a LIMIT before OFFSET; -1 means unbounded.
            None => sql.push_str(" LIMIT -1"),
        }
        sql.push_str(" OFFSET ?");
        params.push(Value::Int(to_i64(window.offset)));
    }
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

impl fmt::Display for Query {
    /// The select statement with parameters inlined. For debugging only.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (sql, params) = self.select_sql();
        let mut params = params.iter();
        let mut pieces = sql.split('?');
        if let Some(head) = pieces.next() {
            f.write_str(head)?;
        }
        for piece in pieces {
            match params.next() {
                Some(value) => f.write_str(&value.to_sql_literal())?,
                None => f.write_str("?")?,
            }
            f.write_str(piece)?;
        }
        Ok(())
    }
}

/// Renders `INSERT INTO table (cols) VALUES (?, ...)` for the given fields.
///
/// With no fields the row is inserted with `DEFAULT VALUES`.
pub fn insert_sql(table: &str, fields: &[(&str, Value)]) -> (String, Vec<Value>) {
    if fields.is_empty() {
        return (format!("INSERT INTO {table} DEFAULT VALUES"), Vec::new());
    }
    let columns: Vec<&str> = fields.iter().map(|(name, _)| *name).collect();
    let placeholders = vec!["?"; fields.len()].join(", ");
    let params = fields.iter().map(|(_, value)| value.clone()).collect();
    (
        format!("INSERT INTO {table} ({}) VALUES ({placeholders})", columns.join(", ")),
        params,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    static USERS: Schema = Schema::new("users", &["id", "name", "age", "email"]);

    fn query() -> Query {
        Query::new(&USERS)
    }

    fn window(offset: usize, limit: Option<usize>) -> Option<Window> {
        Some(Window { offset, limit })
    }

    // ── Window arithmetic ───────────────────────────────────────────

    #[test]
    fn test_narrow_from_nothing() {
        assert_eq!(Window::narrow(None, 2, Some(7)), Window { offset: 2, limit: Some(5) });
        assert_eq!(Window::narrow(None, 4, None), Window { offset: 4, limit: None });
    }

    #[test]
    fn test_narrow_composes() {
        let w = Window::narrow(Window::narrow(None, 2, Some(7)).into(), 1, Some(3));
        assert_eq!(w, Window { offset: 3, limit: Some(2) });
    }

    #[test]
    fn test_narrow_truncates_stop_past_end() {
        // [10..15][2..100] is [12..15]
        assert_eq!(Window::narrow(window(10, Some(5)), 2, Some(100)), Window { offset: 12, limit: Some(3) });
    }

    #[test]
    fn test_narrow_open_stop_keeps_prior_end() {
        assert_eq!(Window::narrow(window(10, Some(5)), 2, None), Window { offset: 12, limit: Some(3) });
    }

    #[test]
    fn test_narrow_start_past_end_is_empty() {
        assert_eq!(Window::narrow(window(10, Some(5)), 9, Some(12)), Window { offset: 10, limit: Some(0) });
        assert_eq!(Window::narrow(window(10, Some(5)), 5, None), Window { offset: 15, limit: Some(0) });
    }

    #[test]
    fn test_narrow_saturates_at_usize_max() {
        assert_eq!(Window::narrow(None, 0, Some(usize::MAX)), Window { offset: 0, limit: Some(usize::MAX) });
        let far = Window::narrow(None, usize::MAX, None);
        assert_eq!(Window::narrow(Some(far), 1, None), Window { offset: usize::MAX, limit: None });
        assert_eq!(
            Window::narrow(window(usize::MAX - 1, Some(5)), 3, None),
            Window { offset: usize::MAX, limit: Some(0) }
        );
    }

    #[test]
    fn test_narrow_stop_before_start() {
        assert_eq!(Window::narrow(None, 5, Some(3)).limit, Some(0));
    }

    #[test]
    fn test_visible_count() {
        let w = Window { offset: 10, limit: Some(5) };
        assert_eq!(w.visible_count(12), 2);
        assert_eq!(w.visible_count(20), 5);
        assert_eq!(w.visible_count(8), 0);
        assert_eq!(w.visible_count(10), 0);
        assert_eq!(Window { offset: 3, limit: None }.visible_count(10), 7);
    }

    // ── Rendering ───────────────────────────────────────────────────

    #[test]
    fn test_plain_select() {
        let (sql, params) = query().select_sql();
        assert_eq!(sql, "SELECT id, name, age, email FROM users");
        assert!(params.is_empty());
    }

    #[test]
    fn test_select_with_filter_exclude_order() {
        let mut q = query();
        q.add_filter(Q::filter("age__gt", 21) | Q::filter("name", "root"));
        q.add_exclude(Q::filter("email__isnull", true));
        q.set_order_by(vec!["-age".into(), "name".into()]);
        let (sql, params) = q.select_sql();
        assert_eq!(
            sql,
            "SELECT id, name, age, email FROM users WHERE (age > ? OR name = ?) AND NOT (email IS NULL) ORDER BY age DESC, name"
        );
        assert_eq!(params, vec![Value::Int(21), Value::from("root")]);
    }

    #[test]
    fn test_exclude_only() {
        let mut q = query();
        q.add_exclude(Q::filter("age__lt", 18));
        assert_eq!(q.select_sql().0, "SELECT id, name, age, email FROM users WHERE NOT (age < ?)");
    }

    #[test]
    fn test_window_params_follow_where_params() {
        let mut q = query();
        q.add_filter(Q::filter("name", "a"));
        q.set_window(window(3, Some(2)));
        let (sql, params) = q.select_sql();
        assert!(sql.ends_with("WHERE (name = ?) LIMIT ? OFFSET ?"));
        assert_eq!(params, vec![Value::from("a"), Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn test_offset_without_limit() {
        let mut q = query();
        q.set_window(window(4, None));
        let (sql, params) = q.select_sql();
        assert!(sql.ends_with(" LIMIT -1 OFFSET ?"));
        assert_eq!(params, vec![Value::Int(4)]);
    }

    #[test]
    fn test_count() {
        let mut q = query();
        q.add_filter(Q::filter("age", 30));
        let (sql, _) = q.render(&SqlMethod::Count).unwrap();
        assert_eq!(sql, "SELECT COUNT(*) FROM users WHERE (age = ?)");
    }

    #[test]
    fn test_update_params_come_first_and_unknown_keys_drop() {
        let mut q = query();
        q.add_filter(Q::filter("id", 9));
        let fields = vec![
            ("name".to_string(), Value::from("z")),
            ("color".to_string(), Value::from("red")),
            ("age".to_string(), Value::Int(40)),
        ];
        let (sql, params) = q.render(&SqlMethod::Update(fields)).unwrap();
        assert_eq!(sql, "UPDATE users SET name = ?, age = ? WHERE (id = ?)");
        assert_eq!(params, vec![Value::from("z"), Value::Int(40), Value::Int(9)]);
    }

    #[test]
    fn test_update_rejects_window() {
        let mut q = query();
        q.set_window(window(0, Some(1)));
        let err = q.render(&SqlMethod::Update(vec![("name".into(), Value::from("x"))])).unwrap_err();
        assert_eq!(err.validation_code(), Some("sliced_update"));
    }

    #[test]
    fn test_update_rejects_only_unknown_keys() {
        let err = query()
            .render(&SqlMethod::Update(vec![("color".into(), Value::from("x"))]))
            .unwrap_err();
        assert_eq!(err.validation_code(), Some("no_update_fields"));
    }

    #[test]
    fn test_delete() {
        let mut q = query();
        q.add_filter(Q::filter("age__lt", 5));
        q.set_order_by(vec!["age".into()]);
        let (sql, params) = q.render(&SqlMethod::Delete).unwrap();
        assert_eq!(sql, "DELETE FROM users WHERE (age < ?)");
        assert_eq!(params, vec![Value::Int(5)]);

        q.set_window(window(1, None));
        let err = q.render(&SqlMethod::Delete).unwrap_err();
        assert_eq!(err.validation_code(), Some("sliced_delete"));
    }

    #[test]
    fn test_clone_shares_then_copies_predicates() {
        let mut a = query();
        a.add_filter(Q::filter("age", 1));
        let mut b = a.clone();
        assert!(a.shares_filter_with(&b));

        b.add_filter(Q::filter("name", "x"));
        assert!(!a.shares_filter_with(&b));
        assert_eq!(a.select_sql().0, "SELECT id, name, age, email FROM users WHERE (age = ?)");
        assert_eq!(b.select_sql().0, "SELECT id, name, age, email FROM users WHERE (age = ? AND name = ?)");
    }

    #[test]
    fn test_empty_filter_is_ignored() {
        let mut q = query();
        q.add_filter(Q::new());
        assert!(!q.filter().has_effect());
        assert_eq!(q.select_sql().0, "SELECT id, name, age, email FROM users");
    }

    #[test]
    fn test_display_inlines_params() {
        let mut q = query();
        q.set_select(vec!["name".into()]);
        q.add_filter(Q::filter("name", "O'Neil") & Q::filter("age__in", Value::list([1, 2])));
        assert_eq!(q.to_string(), "SELECT name FROM users WHERE (name = 'O''Neil' AND age IN ((1, 2)))");
    }

    #[test]
    fn test_insert_sql() {
        let (sql, params) = insert_sql("users", &[("name", Value::from("a")), ("age", Value::Int(2))]);
        assert_eq!(sql, "INSERT INTO users (name, age) VALUES (?, ?)");
        assert_eq!(params.len(), 2);
        assert_eq!(insert_sql("users", &[]).0, "INSERT INTO users DEFAULT VALUES");
    }
}
