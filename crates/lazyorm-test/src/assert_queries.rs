//! Query counting assertions for database tests.
//!
//! Provides [`assert_num_queries`] which counts the statements executed
//! during a closure and asserts that the count matches an expected value.
//! This is how memoization is checked: a materialized result set must not
//! reach the database again.
//!
//! ## Example
//!
//! ```
//! use lazyorm_db::executor::Executor;
//! use lazyorm_test::{assert_num_queries, TestDatabase};
//!
//! let db = TestDatabase::new();
//! db.execute_raw("default", "CREATE TABLE t (id INTEGER PRIMARY KEY, val TEXT)").unwrap();
//!
//! assert_num_queries(&db, 1, || {
//!     db.execute("default", "INSERT INTO t (val) VALUES (?)", &["x".into()]).unwrap();
//! });
//! ```

use crate::test_database::TestDatabase;

/// Asserts that exactly `expected_count` statements are executed during `f`.
///
/// Resets the query counter on the [`TestDatabase`] before running the
/// closure, then checks the counter after it returns.
///
/// # Panics
///
/// Panics if the number of queries does not match `expected_count`.
pub fn assert_num_queries<F>(db: &TestDatabase, expected_count: usize, f: F)
where
    F: FnOnce(),
{
    db.reset_query_count();
    f();
    let actual = db.query_count();
    assert_eq!(
        actual, expected_count,
        "Expected {expected_count} SQL queries, but {actual} were executed"
    );
}

/// Asserts that at most `max_count` statements are executed during `f`.
///
/// Useful when the exact count is not important but you want to prevent
/// query count regression.
///
/// # Panics
///
/// Panics if more than `max_count` queries are executed.
pub fn assert_max_queries<F>(db: &TestDatabase, max_count: usize, f: F)
where
    F: FnOnce(),
{
    db.reset_query_count();
    f();
    let actual = db.query_count();
    assert!(
        actual <= max_count,
        "Expected at most {max_count} SQL queries, but {actual} were executed"
    );
}
