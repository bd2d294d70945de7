//! # lazyorm-db
//!
//! The query layer of lazyorm. Provides the [`Q`] predicate algebra, the
//! field-lookup translator, the [`Query`] accumulator and the lazy,
//! memoizing [`QuerySet`] family, plus the [`Model`] trait that binds a
//! record type to a static [`Schema`](model::Schema).
//!
//! ## Architecture
//!
//! A [`QuerySet`] builds a [`Query`] through method chaining without
//! touching the database. SQL is rendered and handed to an
//! [`Executor`] only when rows, a count or a write are requested. Rows are
//! then kept on that instance; refining the set produces a new,
//! unmaterialized one.
//!
//! ## Module Overview
//!
//! - [`value`] - the backend-agnostic [`Value`] enum
//! - [`model`] - [`Model`], [`Schema`](model::Schema) and [`Row`](model::Row)
//! - [`executor`] - the [`Executor`] seam, [`Cursor`](executor::Cursor) and inserts
//! - [`query`] - lookups, Q trees, Query rendering and result sets

// - doc_markdown: backtick requirements for SQL keywords in docs are too strict
// - missing_const_for_fn: accessors stay non-const to keep signatures stable
// - return_self_not_must_use: builder methods are self-documenting
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::cast_precision_loss)]

pub mod executor;
pub mod model;
pub mod query;
pub mod value;

pub use executor::{execute_sql, save_model, Cursor, Executor};
pub use model::{construct, FromValue, Model, Row, Schema};
pub use query::{
    FlatValuesListQuerySet, LazySet, Manager, Query, QuerySet, ValuesListQuerySet,
    ValuesQuerySet, Q,
};
pub use value::Value;
