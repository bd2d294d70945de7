//! SQLite execution service using `rusqlite`.
//!
//! [`SqliteExecutor`] keeps one connection per database label, opened from
//! [`Settings`] or registered by hand, and runs every statement on the
//! caller's thread.
//!
//! Features:
//! - In-memory databases via the `:memory:` name (great for testing)
//! - WAL mode for file-based databases
//! - Sequence parameters expanded client-side, so `id IN (?)` bound to a
//!   list becomes `id IN (?, ?, ?)`
//! - Simple `Mutex`-based concurrency control

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use lazyorm_core::{OrmError, OrmResult, Settings};
use lazyorm_db::executor::{Cursor, Executor};
use lazyorm_db::value::Value;

/// An [`Executor`] over named SQLite connections.
///
/// # Examples
///
/// ```
/// use lazyorm_backends::sqlite::SqliteExecutor;
/// use lazyorm_db::executor::Executor;
/// use lazyorm_db::value::Value;
///
/// let db = SqliteExecutor::memory("default").unwrap();
/// db.execute("default", "CREATE TABLE t (x INTEGER)", &[]).unwrap();
/// db.execute("default", "INSERT INTO t (x) VALUES (?), (?), (?)", &[1.into(), 2.into(), 3.into()]).unwrap();
///
/// let mut cursor = db
///     .execute("default", "SELECT x FROM t WHERE x IN (?) ORDER BY x", &[Value::list([1, 3])])
///     .unwrap();
/// assert_eq!(cursor.fetch_all(), vec![vec![Value::Int(1)], vec![Value::Int(3)]]);
/// ```
pub struct SqliteExecutor {
    connections: Mutex<HashMap<String, rusqlite::Connection>>,
}

impl Default for SqliteExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl SqliteExecutor {
    /// An executor with no databases registered.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// An executor with one in-memory database under `label`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn memory(label: &str) -> OrmResult<Self> {
        let executor = Self::new();
        executor.open(label, ":memory:")?;
        Ok(executor)
    }

    /// Opens every database configured in `settings`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a non-SQLite engine, or an
    /// operational error if a database cannot be opened.
    pub fn from_settings(settings: &Settings) -> OrmResult<Self> {
        let executor = Self::new();
        for (label, db) in &settings.databases {
            if db.engine != "sqlite" {
                return Err(OrmError::ConfigurationError(format!(
                    "Database '{label}' uses engine '{}'; only 'sqlite' is supported",
                    db.engine
                )));
            }
            executor.open(label, &db.name)?;
        }
        Ok(executor)
    }

    /// Opens (or replaces) the connection registered under `label`.
    ///
    /// A `path` of `:memory:` creates an in-memory database. WAL journal
    /// mode is enabled for file-based databases.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open(&self, label: &str, path: impl AsRef<Path>) -> OrmResult<()> {
        let path = path.as_ref();
        let in_memory = path.to_str() == Some(":memory:");
        let conn = if in_memory {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(path)
        }
        .map_err(|e| OrmError::OperationalError(format!("SQLite open failed: {e}")))?;

        let pragmas = if in_memory {
            "PRAGMA foreign_keys=ON;"
        } else {
            "PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;"
        };
        conn.execute_batch(pragmas)
            .map_err(|e| OrmError::OperationalError(format!("Failed to set pragmas: {e}")))?;

        tracing::debug!(db = label, path = %path.display(), "opened sqlite database");
        self.lock()?.insert(label.to_string(), conn);
        Ok(())
    }

    /// The registered labels, sorted.
    pub fn labels(&self) -> OrmResult<Vec<String>> {
        let mut labels: Vec<String> = self.lock()?.keys().cloned().collect();
        labels.sort();
        Ok(labels)
    }

    fn lock(&self) -> OrmResult<MutexGuard<'_, HashMap<String, rusqlite::Connection>>> {
        self.connections
            .lock()
            .map_err(|e| OrmError::OperationalError(format!("SQLite connection lock poisoned: {e}")))
    }

    /// Binds ORM `Value` types to a `rusqlite` statement.
    fn bind_params(stmt: &mut rusqlite::Statement<'_>, params: &[Value]) -> OrmResult<()> {
        for (i, param) in params.iter().enumerate() {
            let idx = i + 1;
            match param {
                Value::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null),
                Value::Bool(b) => stmt.raw_bind_parameter(idx, b),
                Value::Int(v) => stmt.raw_bind_parameter(idx, v),
                Value::Float(v) => stmt.raw_bind_parameter(idx, v),
                Value::String(s) => stmt.raw_bind_parameter(idx, s.as_str()),
                Value::Bytes(b) => stmt.raw_bind_parameter(idx, b.as_slice()),
                Value::Date(d) => stmt.raw_bind_parameter(idx, d.to_string()),
                Value::DateTime(dt) => stmt.raw_bind_parameter(idx, dt.to_string()),
                Value::DateTimeTz(dt) => stmt.raw_bind_parameter(idx, dt.to_rfc3339()),
                Value::Time(t) => stmt.raw_bind_parameter(idx, t.to_string()),
                Value::Uuid(u) => stmt.raw_bind_parameter(idx, u.to_string()),
                Value::Json(j) => stmt.raw_bind_parameter(idx, j.to_string()),
                Value::List(_) => {
                    return Err(OrmError::DatabaseError(format!(
                        "Bind error: nested sequence at parameter {idx}"
                    )));
                }
            }
            .map_err(|e| OrmError::DatabaseError(format!("Bind error: {e}")))?;
        }
        Ok(())
    }

    fn convert_value(value: rusqlite::types::ValueRef<'_>) -> Value {
        match value {
            rusqlite::types::ValueRef::Null => Value::Null,
            rusqlite::types::ValueRef::Integer(v) => Value::Int(v),
            rusqlite::types::ValueRef::Real(v) => Value::Float(v),
            rusqlite::types::ValueRef::Text(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
            rusqlite::types::ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
        }
    }
}

/// Expands each [`Value::List`] parameter into one placeholder per item.
///
/// Placeholders inside single-quoted literals are left alone. An empty list
/// becomes `NULL`, so `x IN (?)` with `[]` matches nothing.
pub fn expand_sequence_params(sql: &str, params: &[Value]) -> (String, Vec<Value>) {
    let mut out = String::with_capacity(sql.len());
    let mut flat = Vec::with_capacity(params.len());
    let mut params = params.iter();
    let mut in_literal = false;

    for ch in sql.chars() {
        match ch {
            '\'' => {
                in_literal = !in_literal;
                out.push(ch);
            }
            '?' if !in_literal => match params.next() {
                Some(Value::List(items)) if items.is_empty() => out.push_str("NULL"),
                Some(Value::List(items)) => {
                    out.push_str(&vec!["?"; items.len()].join(", "));
                    flat.extend(items.iter().cloned());
                }
                Some(value) => {
                    out.push('?');
                    flat.push(value.clone());
                }
                None => out.push('?'),
            },
            _ => out.push(ch),
        }
    }
    flat.extend(params.cloned());
    (out, flat)
}

impl Executor for SqliteExecutor {
    fn execute(&self, label: &str, sql: &str, params: &[Value]) -> OrmResult<Cursor> {
        let connections = self.lock()?;
        let conn = connections
            .get(label)
            .ok_or_else(|| OrmError::ConfigurationError(format!("Unknown database label '{label}'")))?;

        let (sql, params) = expand_sequence_params(sql, params);
        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| OrmError::DatabaseError(format!("{e}")))?;
        Self::bind_params(&mut stmt, &params)?;

        if stmt.column_count() > 0 {
            let width = stmt.column_count();
            let mut raw_rows = stmt.raw_query();
            let mut rows = Vec::new();
            while let Some(row) = raw_rows
                .next()
                .map_err(|e| OrmError::DatabaseError(format!("{e}")))?
            {
                let mut values = Vec::with_capacity(width);
                for i in 0..width {
                    let cell = row
                        .get_ref(i)
                        .map_err(|e| OrmError::DatabaseError(format!("{e}")))?;
                    values.push(Self::convert_value(cell));
                }
                rows.push(values);
            }
            return Ok(Cursor::from_rows(rows));
        }

        let count = stmt
            .raw_execute()
            .map_err(|e| OrmError::DatabaseError(format!("{e}")))?;
        let cursor = Cursor::affected(count as u64);
        if sql.trim_start().get(..6).is_some_and(|head| head.eq_ignore_ascii_case("insert")) {
            return Ok(cursor.with_last_insert_id(Value::Int(conn.last_insert_rowid())));
        }
        Ok(cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> SqliteExecutor {
        let db = SqliteExecutor::memory("default").unwrap();
        db.execute(
            "default",
            "CREATE TABLE items (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT, qty INTEGER, price REAL, data BLOB)",
            &[],
        )
        .unwrap();
        db
    }

    #[test]
    fn test_expand_sequence_params() {
        let (sql, params) = expand_sequence_params(
            "SELECT * FROM t WHERE a = ? AND b IN (?) AND c = '?'",
            &[Value::Int(1), Value::list([2, 3])],
        );
        assert_eq!(sql, "SELECT * FROM t WHERE a = ? AND b IN (?, ?) AND c = '?'");
        assert_eq!(params, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn test_expand_empty_sequence() {
        let (sql, params) = expand_sequence_params("x IN (?) AND y = ?", &[Value::List(vec![]), Value::Int(5)]);
        assert_eq!(sql, "x IN (NULL) AND y = ?");
        assert_eq!(params, vec![Value::Int(5)]);
    }

    #[test]
    fn test_insert_reports_rowid() {
        let db = db();
        let cursor = db
            .execute("default", "INSERT INTO items (name, qty) VALUES (?, ?)", &["a".into(), 1.into()])
            .unwrap();
        assert_eq!(cursor.rows_affected(), 1);
        assert_eq!(cursor.last_insert_id(), Some(&Value::Int(1)));
    }

    #[test]
    fn test_select_converts_storage_classes() {
        let db = db();
        db.execute(
            "default",
            "INSERT INTO items (name, qty, price, data) VALUES (?, ?, ?, ?)",
            &["a".into(), Value::Null, 2.5.into(), Value::Bytes(vec![1, 2])],
        )
        .unwrap();
        let mut cursor = db
            .execute("default", "SELECT name, qty, price, data FROM items", &[])
            .unwrap();
        assert_eq!(
            cursor.fetch_one().unwrap(),
            vec![Value::from("a"), Value::Null, Value::Float(2.5), Value::Bytes(vec![1, 2])]
        );
    }

    #[test]
    fn test_update_reports_rows_affected() {
        let db = db();
        for n in 0..3 {
            db.execute("default", "INSERT INTO items (qty) VALUES (?)", &[Value::Int(n)]).unwrap();
        }
        let cursor = db
            .execute("default", "UPDATE items SET name = ? WHERE qty >= ?", &["big".into(), 1.into()])
            .unwrap();
        assert_eq!(cursor.rows_affected(), 2);
        assert_eq!(cursor.last_insert_id(), None);
    }

    #[test]
    fn test_unknown_label() {
        let err = db().execute("replica", "SELECT 1", &[]).unwrap_err();
        assert!(matches!(err, OrmError::ConfigurationError(_)));
    }

    #[test]
    fn test_bad_sql_is_database_error() {
        let err = db().execute("default", "SELEC nothing", &[]).unwrap_err();
        assert!(matches!(err, OrmError::DatabaseError(_)));
    }

    #[test]
    fn test_from_settings() {
        let mut settings = Settings::default();
        settings.databases.insert(
            "analytics".to_string(),
            lazyorm_core::DatabaseSettings::default(),
        );
        let db = SqliteExecutor::from_settings(&settings).unwrap();
        assert_eq!(db.labels().unwrap(), vec!["analytics", "default"]);

        settings.databases.get_mut("analytics").unwrap().engine = "postgresql".to_string();
        assert!(matches!(
            SqliteExecutor::from_settings(&settings),
            Err(OrmError::ConfigurationError(_))
        ));
    }
}
