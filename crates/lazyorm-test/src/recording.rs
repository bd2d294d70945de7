//! A call-recording executor double.
//!
//! [`RecordingExecutor`] answers each `execute` call with the next scripted
//! [`Cursor`] (an empty one once the script runs out) and records the
//! label, SQL and parameters of every call. It never touches a database, so
//! it is the tool for asserting exact statements and for counting how many
//! times a result set reached the backend.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use lazyorm_db::executor::{Cursor, Executor};
//! use lazyorm_db::value::Value;
//! use lazyorm_test::RecordingExecutor;
//!
//! let db = Arc::new(RecordingExecutor::new());
//! db.push_cursor(Cursor::from_rows(vec![vec![Value::Int(3)]]));
//!
//! let mut cursor = db.execute("default", "SELECT COUNT(*) FROM t", &[]).unwrap();
//! assert_eq!(cursor.fetch_one(), Some(vec![Value::Int(3)]));
//! assert_eq!(db.call_count(), 1);
//! assert_eq!(db.last_call().unwrap().sql, "SELECT COUNT(*) FROM t");
//! ```

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use lazyorm_core::OrmResult;
use lazyorm_db::executor::{Cursor, Executor};
use lazyorm_db::value::Value;

/// One recorded `execute` call.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    /// The database label.
    pub label: String,
    /// The statement text.
    pub sql: String,
    /// The bound parameters.
    pub params: Vec<Value>,
}

/// An [`Executor`] that replays scripted cursors and records every call.
#[derive(Debug, Default)]
pub struct RecordingExecutor {
    script: Mutex<VecDeque<Cursor>>,
    calls: Mutex<Vec<RecordedCall>>,
}

fn guard<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panicking test must not hide the calls recorded before it.
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl RecordingExecutor {
    /// An executor with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// An executor that answers with `cursors`, in order.
    pub fn with_script(cursors: impl IntoIterator<Item = Cursor>) -> Self {
        Self {
            script: Mutex::new(cursors.into_iter().collect()),
            calls: Mutex::default(),
        }
    }

    /// Appends a cursor to the script.
    pub fn push_cursor(&self, cursor: Cursor) {
        guard(&self.script).push_back(cursor);
    }

    /// Appends a cursor holding `rows`.
    pub fn push_rows(&self, rows: Vec<Vec<Value>>) {
        self.push_cursor(Cursor::from_rows(rows));
    }

    /// All calls so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        guard(&self.calls).clone()
    }

    /// The number of calls so far.
    pub fn call_count(&self) -> usize {
        guard(&self.calls).len()
    }

    /// The most recent call.
    pub fn last_call(&self) -> Option<RecordedCall> {
        guard(&self.calls).last().cloned()
    }

    /// Forgets recorded calls; the script is kept.
    pub fn reset(&self) {
        guard(&self.calls).clear();
    }
}

impl Executor for RecordingExecutor {
    fn execute(&self, label: &str, sql: &str, params: &[Value]) -> OrmResult<Cursor> {
        guard(&self.calls).push(RecordedCall {
            label: label.to_string(),
            sql: sql.to_string(),
            params: params.to_vec(),
        });
        Ok(guard(&self.script).pop_front().unwrap_or_default())
    }
}
