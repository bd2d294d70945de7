//! Test database utilities for lazyorm.
//!
//! Provides [`TestDatabase`], an in-memory SQLite database for use in
//! tests. It implements [`Executor`] so result sets can run against it, and
//! adds helpers for creating tables from a [`Schema`] and counting executed
//! statements.
//!
//! ## Example
//!
//! ```
//! use lazyorm_db::model::Schema;
//! use lazyorm_test::TestDatabase;
//!
//! static NOTES: Schema = Schema::new("notes", &["id", "body"]).primary_key("id");
//!
//! let db = TestDatabase::new();
//! db.setup_table(&NOTES).unwrap();
//! assert_eq!(db.query_count(), 1);
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lazyorm_backends::sqlite::SqliteExecutor;
use lazyorm_core::settings::DEFAULT_DB_LABEL;
use lazyorm_core::OrmResult;
use lazyorm_db::executor::{Cursor, Executor};
use lazyorm_db::model::Schema;
use lazyorm_db::value::Value;

/// An in-memory SQLite database for testing.
///
/// Wraps a [`SqliteExecutor`] with an `Arc` for sharing and adds a
/// statement counter for use with
/// [`assert_num_queries`](crate::assert_num_queries). Clones share the
/// database and the counter.
///
/// The database is created fresh in memory for each `TestDatabase::new()`
/// call, providing complete test isolation.
#[derive(Clone)]
pub struct TestDatabase {
    executor: Arc<SqliteExecutor>,
    query_count: Arc<AtomicUsize>,
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

impl TestDatabase {
    /// Creates a test database registered under the `default` label.
    ///
    /// # Panics
    ///
    /// Panics if the in-memory database cannot be created.
    pub fn new() -> Self {
        Self::with_labels(&[DEFAULT_DB_LABEL])
    }

    /// Creates a test database with one in-memory database per label.
    ///
    /// # Panics
    ///
    /// Panics if an in-memory database cannot be created.
    pub fn with_labels(labels: &[&str]) -> Self {
        let executor = SqliteExecutor::new();
        for label in labels {
            executor
                .open(label, ":memory:")
                .expect("Failed to create in-memory SQLite database");
        }
        Self {
            executor: Arc::new(executor),
            query_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A shareable executor handle for result sets and managers.
    pub fn handle(&self) -> Arc<dyn Executor> {
        Arc::new(self.clone())
    }

    /// Creates the table described by `schema` on the schema's database.
    ///
    /// The primary key becomes `INTEGER PRIMARY KEY AUTOINCREMENT`; other
    /// columns are declared without a type, which SQLite accepts.
    ///
    /// # Errors
    ///
    /// Returns an error if the SQL execution fails.
    pub fn setup_table(&self, schema: &Schema) -> OrmResult<()> {
        let sql = Self::create_table_sql(schema);
        self.execute(schema.label, &sql, &[])?;
        Ok(())
    }

    /// Drops every user table on the database registered under `label`.
    ///
    /// # Errors
    ///
    /// Returns an error if the SQL execution fails.
    pub fn teardown(&self, label: &str) -> OrmResult<()> {
        let mut cursor = self.executor.execute(
            label,
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
            &[],
        )?;
        for row in cursor.fetch_all() {
            if let Some(Value::String(table)) = row.into_iter().next() {
                self.executor
                    .execute(label, &format!("DROP TABLE IF EXISTS \"{table}\""), &[])?;
            }
        }
        Ok(())
    }

    /// Executes a raw statement with no parameters on `label`.
    ///
    /// Increments the query counter.
    ///
    /// # Errors
    ///
    /// Returns an error if the SQL execution fails.
    pub fn execute_raw(&self, label: &str, sql: &str) -> OrmResult<Cursor> {
        self.execute(label, sql, &[])
    }

    /// Returns the current query count.
    pub fn query_count(&self) -> usize {
        self.query_count.load(Ordering::Relaxed)
    }

    /// Resets the query counter to zero.
    pub fn reset_query_count(&self) {
        self.query_count.store(0, Ordering::Relaxed);
    }

    /// Returns the inner executor. Calls made through it are not counted.
    pub fn executor(&self) -> &SqliteExecutor {
        &self.executor
    }

    fn create_table_sql(schema: &Schema) -> String {
        let columns: Vec<String> = schema
            .fields
            .iter()
            .map(|field| {
                if schema.pk == Some(*field) {
                    format!("\"{field}\" INTEGER PRIMARY KEY AUTOINCREMENT")
                } else {
                    format!("\"{field}\"")
                }
            })
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" ({})",
            schema.table,
            columns.join(", ")
        )
    }
}

impl Executor for TestDatabase {
    fn execute(&self, label: &str, sql: &str, params: &[Value]) -> OrmResult<Cursor> {
        self.query_count.fetch_add(1, Ordering::Relaxed);
        self.executor.execute(label, sql, params)
    }
}
