//! # lazyorm-test
//!
//! Testing utilities for lazyorm: a [`RecordingExecutor`] double that
//! replays scripted cursors and records every statement, an in-memory
//! SQLite [`TestDatabase`] with a query counter, and the
//! [`assert_num_queries`] / [`assert_max_queries`] assertions.

pub mod recording;

#[cfg(feature = "sqlite")]
pub mod assert_queries;
#[cfg(feature = "sqlite")]
pub mod test_database;

pub use recording::{RecordedCall, RecordingExecutor};

#[cfg(feature = "sqlite")]
pub use assert_queries::{assert_max_queries, assert_num_queries};
#[cfg(feature = "sqlite")]
pub use test_database::TestDatabase;
