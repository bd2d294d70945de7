//! # lazyorm
//!
//! A lazy, memoizing query builder over a SQL backend.
//!
//! This is the meta-crate that re-exports all sub-crates for convenient access.
//! You can depend on `lazyorm` to get everything, or depend on individual
//! crates for finer-grained control.
//!
//! ## Example
//!
//! ```
//! # #[cfg(feature = "sqlite")]
//! # fn main() -> lazyorm::core::OrmResult<()> {
//! use std::sync::Arc;
//! use lazyorm::prelude::*;
//!
//! static BOOKS: Schema = Schema::new("books", &["id", "title", "pages"]).primary_key("id");
//!
//! struct Book {
//!     id: Option<i64>,
//!     title: Option<String>,
//!     pages: Option<i64>,
//! }
//!
//! impl Model for Book {
//!     fn schema() -> &'static Schema {
//!         &BOOKS
//!     }
//!
//!     fn from_row(row: &Row) -> OrmResult<Self> {
//!         Ok(Self {
//!             id: row.get_optional("id")?,
//!             title: row.get_optional("title")?,
//!             pages: row.get_optional("pages")?,
//!         })
//!     }
//!
//!     fn field_values(&self) -> Vec<(&'static str, Value)> {
//!         let mut out = Vec::new();
//!         if let Some(title) = &self.title {
//!             out.push(("title", Value::from(title.as_str())));
//!         }
//!         if let Some(pages) = self.pages {
//!             out.push(("pages", Value::Int(pages)));
//!         }
//!         out
//!     }
//!
//!     fn set_pk(&mut self, value: Value) {
//!         self.id = value.as_int();
//!     }
//! }
//!
//! let db = SqliteExecutor::memory("default")?;
//! db.execute("default", "CREATE TABLE books (id INTEGER PRIMARY KEY, title TEXT, pages INTEGER)", &[])?;
//! let books = Manager::<Book>::new(Arc::new(db));
//! books.create([("title", Value::from("Dune")), ("pages", Value::Int(412))])?;
//! books.create([("title", Value::from("Ubik")), ("pages", Value::Int(202))])?;
//!
//! let long = books.filter(Q::filter("pages__gt", 300) | Q::filter("title__startswith", "X"));
//! assert_eq!(long.count()?, 1);
//! assert_eq!(long.first()?.and_then(|b| b.title), Some("Dune".to_string()));
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "sqlite"))]
//! # fn main() {}
//! ```

/// Errors, settings, and logging setup.
pub use lazyorm_core as core;

/// Values, models, Q predicates, lookups, and lazy result sets.
pub use lazyorm_db as db;

/// Executors for concrete databases.
pub use lazyorm_backends as backends;

/// Testing utilities: recording executor, test database, query counting.
#[cfg(feature = "testing")]
pub use lazyorm_test as test;

pub use chrono;
pub use serde_json;
pub use tracing;

/// The names most code needs, in one import.
pub mod prelude {
    pub use lazyorm_core::{OrmError, OrmResult, Settings, ValidationError};
    pub use lazyorm_db::executor::{execute_sql, Cursor, Executor};
    pub use lazyorm_db::model::{Model, Row, Schema};
    pub use lazyorm_db::query::{
        FlatValuesListQuerySet, LazySet, Manager, QuerySet, ValuesListQuerySet, ValuesQuerySet, Q,
    };
    pub use lazyorm_db::value::Value;

    #[cfg(feature = "sqlite")]
    pub use lazyorm_backends::SqliteExecutor;
}
