//! Query building and lazy result sets.
//!
//! - [`lookups`] - `field__suffix` conditions and their SQL translation
//! - [`q`] - Q predicate trees
//! - [`compiler`] - the Query accumulator, windows and statement rendering
//! - [`queryset`] - lazy, memoizing result sets and the Manager

pub mod compiler;
pub mod lookups;
pub mod q;
pub mod queryset;

pub use compiler::{Query, SqlMethod, Window};
pub use lookups::{translate, AsSubquery, Condition, Lookup, Operand, Subquery, LOOKUP_SEP};
pub use q::{Child, Connector, Q};
pub use queryset::{
    FlatValuesListQuerySet, LazySet, Manager, QuerySet, RowShape, ValuesListQuerySet,
    ValuesQuerySet,
};
