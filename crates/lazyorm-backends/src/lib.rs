//! # lazyorm-backends
//!
//! Execution services for lazyorm. Each backend implements
//! [`lazyorm_db::Executor`] and is enabled by a cargo feature.
//!
//! Supported backends:
//! - `SQLite` (feature `sqlite`, on by default)

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteExecutor;
