//! Lazy, memoizing result sets and the per-model [`Manager`].
//!
//! A [`LazySet`] wraps a [`Query`] and an executor handle. Building methods
//! (`filter`, `order_by`, `slice`, ...) return a new set and leave `self`
//! untouched; nothing runs until rows are needed. The first materializing
//! call stores the rows in the set, and every later read of that instance
//! is served from them. Writes (`update`, `delete`) do not touch the stored
//! rows: re-query through a fresh set to observe them.
//!
//! The row shape is a type parameter, so one implementation serves all
//! four flavours:
//!
//! | alias | yields |
//! |---|---|
//! | [`QuerySet<M>`] | records `M` |
//! | [`ValuesQuerySet<M>`] | `HashMap<String, Value>` per row |
//! | [`ValuesListQuerySet<M>`] | `Vec<Value>` per row |
//! | [`FlatValuesListQuerySet<M>`] | one bare `Value` per row |
//!
//! An instance is not `Sync`; clone one per thread.

use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Bound, RangeBounds};
use std::sync::Arc;

use once_cell::unsync::OnceCell;

use lazyorm_core::{OrmError, OrmResult, ValidationError};

use crate::executor::{execute_sql, save_model, Executor};
use crate::model::{construct, Model, Row};
use crate::value::Value;

use super::compiler::{Query, SqlMethod, Window};
use super::lookups::{AsSubquery, Subquery};
use super::q::{Connector, Q};

/// Turns one raw result row into the item a result set yields.
pub trait RowShape: 'static {
    /// The yielded item.
    type Item;

    /// Shapes `values`, which are aligned to `columns`.
    fn shape(columns: &Arc<[String]>, values: Vec<Value>) -> OrmResult<Self::Item>;
}

/// Yields records built by [`Model::from_row`].
pub struct Records<M>(PhantomData<fn() -> M>);

/// Yields a field-name to value map per row.
pub struct Values;

/// Yields the row's values in projection order.
pub struct ValuesList;

/// Yields the single projected value of each row.
pub struct Flat;

impl<M: Model> RowShape for Records<M> {
    type Item = M;

    fn shape(columns: &Arc<[String]>, values: Vec<Value>) -> OrmResult<M> {
        let row = Row::try_new(Arc::clone(columns), values)?;
        M::from_row(&row)
    }
}

impl RowShape for Values {
    type Item = HashMap<String, Value>;

    fn shape(columns: &Arc<[String]>, values: Vec<Value>) -> OrmResult<Self::Item> {
        Ok(Row::try_new(Arc::clone(columns), values)?.into_map())
    }
}

impl RowShape for ValuesList {
    type Item = Vec<Value>;

    fn shape(columns: &Arc<[String]>, values: Vec<Value>) -> OrmResult<Self::Item> {
        Ok(Row::try_new(Arc::clone(columns), values)?.into_values())
    }
}

impl RowShape for Flat {
    type Item = Value;

    fn shape(_columns: &Arc<[String]>, values: Vec<Value>) -> OrmResult<Value> {
        values
            .into_iter()
            .next()
            .ok_or_else(|| OrmError::DatabaseError("Empty row in flat result".to_string()))
    }
}

/// A set yielding records.
pub type QuerySet<M> = LazySet<M, Records<M>>;
/// A set yielding field maps.
pub type ValuesQuerySet<M> = LazySet<M, Values>;
/// A set yielding value tuples.
pub type ValuesListQuerySet<M> = LazySet<M, ValuesList>;
/// A set yielding bare scalars.
pub type FlatValuesListQuerySet<M> = LazySet<M, Flat>;

/// A deferred, memoizing result set over the table of `M`.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use lazyorm_core::OrmResult;
/// use lazyorm_db::executor::{Cursor, Executor};
/// use lazyorm_db::model::{Model, Row, Schema};
/// use lazyorm_db::query::q::Q;
/// use lazyorm_db::query::queryset::QuerySet;
/// use lazyorm_db::value::Value;
///
/// struct Nowhere;
/// impl Executor for Nowhere {
///     fn execute(&self, _: &str, _: &str, _: &[Value]) -> OrmResult<Cursor> {
///         Ok(Cursor::default())
///     }
/// }
///
/// struct City;
/// static CITIES: Schema = Schema::new("cities", &["id", "name", "population"]);
/// impl Model for City {
///     fn schema() -> &'static Schema { &CITIES }
///     fn from_row(_: &Row) -> OrmResult<Self> { Ok(City) }
///     fn field_values(&self) -> Vec<(&'static str, Value)> { Vec::new() }
/// }
///
/// let cities = QuerySet::<City>::new(Arc::new(Nowhere))
///     .filter(Q::filter("population__gte", 1_000_000))
///     .order_by(["-population"])
///     .slice(..10);
/// let (sql, params) = cities.sql();
/// assert_eq!(
///     sql,
///     "SELECT id, name, population FROM cities WHERE (population >= ?) ORDER BY population DESC LIMIT ? OFFSET ?"
/// );
/// assert_eq!(params, vec![Value::Int(1_000_000), Value::Int(10), Value::Int(0)]);
/// ```
pub struct LazySet<M: Model, S: RowShape = Records<M>> {
    db: Arc<dyn Executor>,
    query: Query,
    cache: OnceCell<Vec<Vec<Value>>>,
    shape: PhantomData<fn() -> (M, S)>,
}

impl<M: Model, S: RowShape> Clone for LazySet<M, S> {
    /// Clones the query state. The clone starts unmaterialized.
    fn clone(&self) -> Self {
        self.rebuild(self.query.clone())
    }
}

impl<M: Model, S: RowShape> fmt::Debug for LazySet<M, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazySet")
            .field("table", &self.query.schema().table)
            .field("query", &self.query.to_string())
            .field("materialized", &self.is_materialized())
            .finish_non_exhaustive()
    }
}

impl<M: Model> QuerySet<M> {
    /// A set over every row of `M`'s table.
    pub fn new(db: Arc<dyn Executor>) -> Self {
        Self {
            db,
            query: Query::new(M::schema()),
            cache: OnceCell::new(),
            shape: PhantomData,
        }
    }
}

impl<M: Model, S: RowShape> LazySet<M, S> {
    fn rebuild<T: RowShape>(&self, query: Query) -> LazySet<M, T> {
        LazySet {
            db: Arc::clone(&self.db),
            query,
            cache: OnceCell::new(),
            shape: PhantomData,
        }
    }

    /// The accumulated query.
    pub const fn query(&self) -> &Query {
        &self.query
    }

    /// Whether this instance has fetched its rows.
    pub fn is_materialized(&self) -> bool {
        self.cache.get().is_some()
    }

    /// The select statement this set would run.
    pub fn sql(&self) -> (String, Vec<Value>) {
        self.query.select_sql()
    }

    /// An unmaterialized copy of this set.
    pub fn all(&self) -> Self {
        self.clone()
    }

    /// A copy restricted to rows matching `q`.
    pub fn filter(&self, q: Q) -> Self {
        self.filter_many([q])
    }

    /// A copy restricted to rows not matching `q`.
    pub fn exclude(&self, q: Q) -> Self {
        self.exclude_many([q])
    }

    /// A copy restricted to rows matching every node in `nodes`.
    pub fn filter_many(&self, nodes: impl IntoIterator<Item = Q>) -> Self {
        let mut set = self.clone();
        set.query.add_filter(and_all(nodes));
        set
    }

    /// A copy excluding rows that match every node in `nodes`.
    pub fn exclude_many(&self, nodes: impl IntoIterator<Item = Q>) -> Self {
        let mut set = self.clone();
        set.query.add_exclude(and_all(nodes));
        set
    }

    /// A copy ordered by `fields`, replacing any earlier ordering.
    /// A leading `-` sorts a field descending.
    pub fn order_by<I, F>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        let mut set = self.clone();
        set.query.set_order_by(fields.into_iter().map(Into::into).collect());
        set
    }

    /// A copy narrowed to `range`, taken relative to this set's window.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Self {
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s.saturating_add(1),
            Bound::Unbounded => 0,
        };
        let stop = match range.end_bound() {
            Bound::Included(&e) => Some(e.saturating_add(1)),
            Bound::Excluded(&e) => Some(e),
            Bound::Unbounded => None,
        };
        let mut set = self.clone();
        set.query
            .set_window(Some(Window::narrow(self.query.window(), start, stop)));
        set
    }

    /// The item at `index`.
    ///
    /// A materialized set answers from its rows; otherwise a one-row query
    /// is issued and this set stays unmaterialized.
    ///
    /// # Errors
    ///
    /// `UnsupportedOperation` for a negative index, `IndexOutOfRange` past
    /// the end.
    pub fn get(&self, index: isize) -> OrmResult<S::Item> {
        let index = usize::try_from(index).map_err(|_| {
            OrmError::UnsupportedOperation("Negative indexing is not supported.".to_string())
        })?;
        let row = if let Some(rows) = self.cache.get() {
            rows.get(index).cloned()
        } else {
            let mut rows = self.slice(index..=index).load()?;
            if rows.is_empty() {
                None
            } else {
                Some(rows.swap_remove(0))
            }
        };
        let row = row.ok_or(OrmError::IndexOutOfRange(index))?;
        S::shape(&self.columns(), row)
    }

    /// The first item, or `None` for an empty set.
    pub fn first(&self) -> OrmResult<Option<S::Item>> {
        match self.get(0) {
            Ok(item) => Ok(Some(item)),
            Err(OrmError::IndexOutOfRange(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// The number of rows in the set.
    ///
    /// Uses the stored rows when materialized. A windowed set counts the
    /// unwindowed rows and clips the total to its window.
    pub fn count(&self) -> OrmResult<usize> {
        if let Some(rows) = self.cache.get() {
            return Ok(rows.len());
        }
        if let Some(window) = self.query.window() {
            let mut unwindowed = self.clone();
            unwindowed.query.set_window(None);
            return Ok(window.visible_count(unwindowed.count()?));
        }

        let (sql, params) = self.query.render(&SqlMethod::Count)?;
        let mut cursor = execute_sql(&*self.db, self.label(), &sql, &params)?;
        let total = cursor
            .fetch_one()
            .and_then(|row| row.first().and_then(Value::as_int))
            .ok_or_else(|| OrmError::DatabaseError("COUNT query returned no value".to_string()))?;
        usize::try_from(total).map_err(|e| OrmError::DatabaseError(format!("Invalid row count {total}: {e}")))
    }

    /// Whether the set has any rows.
    pub fn exists(&self) -> OrmResult<bool> {
        Ok(self.count()? > 0)
    }

    /// Updates the matched rows, returning how many changed.
    ///
    /// No fields means no statement. Keys that are not schema fields are
    /// dropped. Stored rows of this instance are not refreshed.
    ///
    /// # Errors
    ///
    /// A validation error for a windowed set or when no key is a field.
    pub fn update<I, K, V>(&self, fields: I) -> OrmResult<u64>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let fields: Vec<(String, Value)> = fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        if fields.is_empty() {
            return Ok(0);
        }
        let (sql, params) = self.query.render(&SqlMethod::Update(fields))?;
        let cursor = execute_sql(&*self.db, self.label(), &sql, &params)?;
        Ok(cursor.rows_affected())
    }

    /// Deletes the matched rows, returning how many were removed.
    ///
    /// Stored rows of this instance are not refreshed.
    ///
    /// # Errors
    ///
    /// A validation error (`sliced_delete`) for a windowed set.
    pub fn delete(&self) -> OrmResult<u64> {
        let (sql, params) = self.query.render(&SqlMethod::Delete)?;
        let cursor = execute_sql(&*self.db, self.label(), &sql, &params)?;
        Ok(cursor.rows_affected())
    }

    /// Builds a record from `fields` and inserts it. Filters on this set
    /// play no part.
    pub fn create<I, K, V>(&self, fields: I) -> OrmResult<M>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let fields = fields.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        let mut record: M = construct(fields)?;
        save_model(&mut record, &*self.db)?;
        Ok(record)
    }

    /// Materializes the set and returns every item.
    pub fn fetch(&self) -> OrmResult<Vec<S::Item>> {
        self.iter()?.collect()
    }

    /// Materializes the set and iterates over its items.
    pub fn iter(&self) -> OrmResult<impl Iterator<Item = OrmResult<S::Item>> + '_> {
        let rows = self.rows()?;
        let columns = self.columns();
        Ok(rows.iter().map(move |row| S::shape(&columns, row.clone())))
    }

    /// A set yielding field maps for `fields` (all fields when empty).
    ///
    /// # Errors
    ///
    /// A validation error naming the first unknown field.
    pub fn values(&self, fields: &[&str]) -> OrmResult<ValuesQuerySet<M>> {
        Ok(self.rebuild(self.projected(fields)?))
    }

    /// A set yielding value tuples for `fields` (all fields when empty).
    pub fn values_list(&self, fields: &[&str]) -> OrmResult<ValuesListQuerySet<M>> {
        Ok(self.rebuild(self.projected(fields)?))
    }

    /// A set yielding the bare value of one field per row.
    ///
    /// # Errors
    ///
    /// A validation error unless exactly one known field is projected.
    pub fn values_list_flat(&self, fields: &[&str]) -> OrmResult<FlatValuesListQuerySet<M>> {
        let query = self.projected(fields)?;
        if query.select().len() != 1 {
            return Err(ValidationError::new(
                "flat is not valid when values_list is called with more than one field.",
                "flat_multiple_fields",
            )
            .into());
        }
        Ok(self.rebuild(query))
    }

    fn projected(&self, fields: &[&str]) -> OrmResult<Query> {
        let schema = M::schema();
        schema.check_fields(fields)?;
        let mut query = self.query.clone();
        if fields.is_empty() {
            query.set_select(schema.field_names());
        } else {
            query.set_select(fields.iter().map(|f| (*f).to_string()).collect());
        }
        Ok(query)
    }

    fn rows(&self) -> OrmResult<&[Vec<Value>]> {
        self.cache.get_or_try_init(|| self.load()).map(Vec::as_slice)
    }

    fn load(&self) -> OrmResult<Vec<Vec<Value>>> {
        let (sql, params) = self.query.select_sql();
        let mut cursor = execute_sql(&*self.db, self.label(), &sql, &params)?;
        Ok(cursor.fetch_all())
    }

    fn columns(&self) -> Arc<[String]> {
        Arc::from(self.query.select())
    }

    fn label(&self) -> &'static str {
        self.query.schema().label
    }
}

impl<M: Model, S: RowShape> AsSubquery for LazySet<M, S> {
    fn subquery(&self) -> OrmResult<Subquery> {
        Subquery::new(&self.query)
    }
}

fn and_all(nodes: impl IntoIterator<Item = Q>) -> Q {
    let mut node = Q::new();
    for q in nodes {
        node.add(q, Connector::And);
    }
    node
}

/// Hands out fresh [`QuerySet`]s for one model.
pub struct Manager<M: Model> {
    db: Arc<dyn Executor>,
    model: PhantomData<fn() -> M>,
}

impl<M: Model> Manager<M> {
    /// A manager issuing queries through `db`.
    pub fn new(db: Arc<dyn Executor>) -> Self {
        Self {
            db,
            model: PhantomData,
        }
    }

    /// A set over every row.
    pub fn all(&self) -> QuerySet<M> {
        QuerySet::new(Arc::clone(&self.db))
    }

    pub fn filter(&self, q: Q) -> QuerySet<M> {
        self.all().filter(q)
    }

    pub fn exclude(&self, q: Q) -> QuerySet<M> {
        self.all().exclude(q)
    }

    pub fn order_by<I, F>(&self, fields: I) -> QuerySet<M>
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        self.all().order_by(fields)
    }

    pub fn count(&self) -> OrmResult<usize> {
        self.all().count()
    }

    pub fn exists(&self) -> OrmResult<bool> {
        self.all().exists()
    }

    pub fn first(&self) -> OrmResult<Option<M>> {
        self.all().first()
    }

    /// Builds and inserts a record.
    pub fn create<I, K, V>(&self, fields: I) -> OrmResult<M>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        self.all().create(fields)
    }

    pub fn values(&self, fields: &[&str]) -> OrmResult<ValuesQuerySet<M>> {
        self.all().values(fields)
    }

    pub fn values_list(&self, fields: &[&str]) -> OrmResult<ValuesListQuerySet<M>> {
        self.all().values_list(fields)
    }

    pub fn values_list_flat(&self, fields: &[&str]) -> OrmResult<FlatValuesListQuerySet<M>> {
        self.all().values_list_flat(fields)
    }
}

impl<M: Model> fmt::Debug for Manager<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("table", &M::schema().table)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::Cursor;
    use crate::model::Schema;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted cursors and records every statement.
    #[derive(Default)]
    struct FakeDb {
        calls: Mutex<Vec<(String, Vec<Value>)>>,
        script: Mutex<VecDeque<Cursor>>,
    }

    impl FakeDb {
        fn with(script: Vec<Cursor>) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::default(),
                script: Mutex::new(script.into()),
            })
        }

        fn calls(&self) -> Vec<(String, Vec<Value>)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Executor for FakeDb {
        fn execute(&self, label: &str, sql: &str, params: &[Value]) -> OrmResult<Cursor> {
            assert_eq!(label, "people_db");
            self.calls.lock().unwrap().push((sql.to_string(), params.to_vec()));
            Ok(self.script.lock().unwrap().pop_front().unwrap_or_default())
        }
    }

    static PEOPLE: Schema = Schema::new("people", &["id", "name", "age"])
        .using("people_db")
        .primary_key("id");

    #[derive(Debug, PartialEq)]
    struct Person {
        id: Option<i64>,
        name: Option<String>,
        age: Option<i64>,
    }

    impl Model for Person {
        fn schema() -> &'static Schema {
            &PEOPLE
        }

        fn from_row(row: &Row) -> OrmResult<Self> {
            Ok(Self {
                id: row.get_optional("id")?,
                name: row.get_optional("name")?,
                age: row.get_optional("age")?,
            })
        }

        fn field_values(&self) -> Vec<(&'static str, Value)> {
            let mut out = Vec::new();
            if let Some(name) = &self.name {
                out.push(("name", Value::from(name.as_str())));
            }
            if let Some(age) = self.age {
                out.push(("age", Value::from(age)));
            }
            out
        }

        fn set_pk(&mut self, value: Value) {
            self.id = value.as_int();
        }
    }

    fn person_row(id: i64, name: &str, age: i64) -> Vec<Value> {
        vec![Value::Int(id), Value::from(name), Value::Int(age)]
    }

    fn people(db: &Arc<FakeDb>) -> QuerySet<Person> {
        let db: Arc<dyn Executor> = Arc::clone(db) as Arc<dyn Executor>;
        QuerySet::new(db)
    }

    #[test]
    fn test_building_is_lazy_and_pure() {
        let db = FakeDb::with(vec![]);
        let base = people(&db);
        let adults = base.filter(Q::filter("age__gte", 18));
        let _ = adults.exclude(Q::filter("name", "root")).order_by(["-age"]);
        assert!(db.calls().is_empty());
        assert_eq!(base.sql().0, "SELECT id, name, age FROM people");
        assert_eq!(adults.sql().0, "SELECT id, name, age FROM people WHERE (age >= ?)");
    }

    #[test]
    fn test_iteration_is_memoized() {
        let db = FakeDb::with(vec![Cursor::from_rows(vec![person_row(1, "ann", 30), person_row(2, "bo", 40)])]);
        let set = people(&db);
        assert!(!set.is_materialized());

        let first: Vec<Person> = set.fetch().unwrap();
        let second: Vec<Person> = set.iter().unwrap().collect::<OrmResult<_>>().unwrap();
        assert_eq!(first, second);
        assert_eq!(first[1].name.as_deref(), Some("bo"));
        assert!(set.is_materialized());
        assert_eq!(db.calls().len(), 1);

        // Served from the stored rows.
        assert_eq!(set.count().unwrap(), 2);
        assert_eq!(set.get(1).unwrap().id, Some(2));
        assert_eq!(db.calls().len(), 1);
    }

    #[test]
    fn test_clone_starts_unmaterialized() {
        let db = FakeDb::with(vec![Cursor::from_rows(vec![person_row(1, "ann", 30)])]);
        let set = people(&db);
        set.fetch().unwrap();
        assert!(!set.all().is_materialized());
    }

    #[test]
    fn test_filter_many_and_exclude_many() {
        let db = FakeDb::with(vec![]);
        let set = people(&db)
            .filter_many([Q::filter("age__gt", 1), Q::filter("name__startswith", "a") | Q::filter("name", "b")])
            .exclude_many([Q::filter("id", 4), Q::filter("id", 5)]);
        let (sql, params) = set.sql();
        assert_eq!(
            sql,
            "SELECT id, name, age FROM people WHERE (age > ? AND (name LIKE ? OR name = ?)) AND NOT (id = ? AND id = ?)"
        );
        assert_eq!(params.len(), 5);
        assert_eq!(params[1], Value::from("a%"));
    }

    #[test]
    fn test_empty_filter_is_noop() {
        let db = FakeDb::with(vec![]);
        let set = people(&db).filter(Q::new()).exclude_many([]);
        assert_eq!(set.sql().0, "SELECT id, name, age FROM people");
    }

    #[test]
    fn test_order_by_replaces() {
        let db = FakeDb::with(vec![]);
        let set = people(&db).order_by(["name"]).order_by(["-age", "id"]);
        assert_eq!(set.query().order_by(), ["-age", "id"]);
        assert!(set.sql().0.ends_with("ORDER BY age DESC, id"));
    }

    #[test]
    fn test_repeated_slicing() {
        let db = FakeDb::with(vec![]);
        let base = people(&db);
        let narrowed = base.slice(2..7).slice(1..3);
        assert_eq!(narrowed.query().window(), Some(Window { offset: 3, limit: Some(2) }));
        assert_eq!(base.query().window(), None);
        let (sql, params) = narrowed.sql();
        assert!(sql.ends_with("LIMIT ? OFFSET ?"));
        assert_eq!(params, vec![Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn test_get_negative_index() {
        let db = FakeDb::with(vec![]);
        let err = people(&db).get(-1).unwrap_err();
        assert!(matches!(err, OrmError::UnsupportedOperation(_)));
        assert!(db.calls().is_empty());
    }

    #[test]
    fn test_get_unmaterialized_issues_one_row_query() {
        let db = FakeDb::with(vec![Cursor::from_rows(vec![person_row(7, "cy", 22)])]);
        let set = people(&db).order_by(["id"]);
        let person = set.get(4).unwrap();
        assert_eq!(person.id, Some(7));
        assert!(!set.is_materialized());
        let calls = db.calls();
        assert_eq!(calls[0].0, "SELECT id, name, age FROM people ORDER BY id LIMIT ? OFFSET ?");
        assert_eq!(calls[0].1, vec![Value::Int(1), Value::Int(4)]);
    }

    #[test]
    fn test_get_out_of_range() {
        let db = FakeDb::with(vec![Cursor::default(), Cursor::from_rows(vec![person_row(1, "a", 1)])]);
        let set = people(&db);
        assert!(matches!(set.get(3), Err(OrmError::IndexOutOfRange(3))));

        set.fetch().unwrap();
        assert!(matches!(set.get(1), Err(OrmError::IndexOutOfRange(1))));
    }

    #[test]
    fn test_first() {
        let db = FakeDb::with(vec![Cursor::default()]);
        assert_eq!(people(&db).first().unwrap(), None);
    }

    #[test]
    fn test_count_direct() {
        let db = FakeDb::with(vec![Cursor::from_rows(vec![vec![Value::Int(12)]])]);
        let n = people(&db).filter(Q::filter("age__lt", 30)).count().unwrap();
        assert_eq!(n, 12);
        assert_eq!(db.calls()[0].0, "SELECT COUNT(*) FROM people WHERE (age < ?)");
    }

    #[test]
    fn test_count_windowed_clips_unwindowed_total() {
        for (total, expected) in [(12, 2), (20, 5), (8, 0)] {
            let db = FakeDb::with(vec![Cursor::from_rows(vec![vec![Value::Int(total)]])]);
            let set = people(&db).slice(10..15);
            assert_eq!(set.count().unwrap(), expected);
            let calls = db.calls();
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].0, "SELECT COUNT(*) FROM people");
            assert!(calls[0].1.is_empty());
        }
    }

    #[test]
    fn test_exists() {
        let db = FakeDb::with(vec![Cursor::from_rows(vec![vec![Value::Int(0)]])]);
        assert!(!people(&db).exists().unwrap());
    }

    #[test]
    fn test_update() {
        let db = FakeDb::with(vec![Cursor::affected(3)]);
        let set = people(&db).filter(Q::filter("age__lt", 18));
        let n = set.update([("name", Value::from("kid")), ("shoe", Value::from("x"))]).unwrap();
        assert_eq!(n, 3);
        let calls = db.calls();
        assert_eq!(calls[0].0, "UPDATE people SET name = ? WHERE (age < ?)");
        assert_eq!(calls[0].1, vec![Value::from("kid"), Value::Int(18)]);
    }

    #[test]
    fn test_update_without_fields_does_nothing() {
        let db = FakeDb::with(vec![]);
        let n = people(&db).update(Vec::<(String, Value)>::new()).unwrap();
        assert_eq!(n, 0);
        assert!(db.calls().is_empty());
    }

    #[test]
    fn test_update_sliced_set_fails() {
        let db = FakeDb::with(vec![]);
        let err = people(&db).slice(..3).update([("age", 1)]).unwrap_err();
        assert_eq!(err.validation_code(), Some("sliced_update"));
        assert!(db.calls().is_empty());
    }

    #[test]
    fn test_delete_sliced_set_fails() {
        let db = FakeDb::with(vec![]);
        let err = people(&db).slice(2..).delete().unwrap_err();
        assert_eq!(err.validation_code(), Some("sliced_delete"));
        assert!(db.calls().is_empty());
    }

    #[test]
    fn test_slice_extreme_bounds_saturate() {
        let db = FakeDb::with(vec![]);
        let whole = people(&db).slice(0..=usize::MAX);
        assert_eq!(whole.query().window(), Some(Window { offset: 0, limit: Some(usize::MAX) }));

        let beyond = people(&db).slice(usize::MAX..).slice(1..);
        assert_eq!(beyond.query().window(), Some(Window { offset: usize::MAX, limit: None }));
        let (sql, params) = beyond.sql();
        assert!(sql.ends_with("LIMIT -1 OFFSET ?"));
        assert_eq!(params, vec![Value::Int(i64::MAX)]);
        assert!(db.calls().is_empty());
    }

    #[test]
    fn test_update_keeps_stored_rows() {
        let db = FakeDb::with(vec![Cursor::from_rows(vec![person_row(1, "ann", 30)]), Cursor::affected(1)]);
        let set = people(&db);
        set.fetch().unwrap();
        set.update([("age", 31)]).unwrap();
        assert_eq!(set.get(0).unwrap().age, Some(30));
    }

    #[test]
    fn test_delete() {
        let db = FakeDb::with(vec![Cursor::affected(2)]);
        let n = people(&db).exclude(Q::filter("age__gte", 65)).delete().unwrap();
        assert_eq!(n, 2);
        assert_eq!(db.calls()[0].0, "DELETE FROM people WHERE NOT (age >= ?)");
    }

    #[test]
    fn test_create_ignores_filters_and_sets_pk() {
        let db = FakeDb::with(vec![Cursor::affected(1).with_last_insert_id(Value::Int(9))]);
        let person = people(&db)
            .filter(Q::filter("age", 1))
            .create([("name", Value::from("dee")), ("age", Value::Int(50))])
            .unwrap();
        assert_eq!(person.id, Some(9));
        let calls = db.calls();
        assert_eq!(calls[0].0, "INSERT INTO people (name, age) VALUES (?, ?)");
    }

    #[test]
    fn test_create_rejects_unknown_keyword() {
        let db = FakeDb::with(vec![]);
        let err = people(&db).create([("height", 180)]).unwrap_err();
        assert_eq!(err.validation_code(), Some("invalid_keyword"));
        assert!(db.calls().is_empty());
    }

    #[test]
    fn test_values() {
        let db = FakeDb::with(vec![Cursor::from_rows(vec![vec![Value::from("ann"), Value::Int(30)]])]);
        let set = people(&db).values(&["name", "age"]).unwrap();
        assert_eq!(set.sql().0, "SELECT name, age FROM people");
        let rows = set.fetch().unwrap();
        assert_eq!(rows[0].get("name"), Some(&Value::from("ann")));
        assert_eq!(rows[0].get("age"), Some(&Value::Int(30)));
    }

    #[test]
    fn test_values_unknown_field_fails_at_call() {
        let db = FakeDb::with(vec![]);
        let err = people(&db).values(&["name", "weight"]).unwrap_err();
        match err {
            OrmError::Validation(v) => assert_eq!(v.params.get("field").map(String::as_str), Some("weight")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_values_list_defaults_to_all_fields() {
        let db = FakeDb::with(vec![Cursor::from_rows(vec![person_row(1, "ann", 30)])]);
        let set = people(&db).filter(Q::filter("id", 1)).values_list(&[]).unwrap();
        assert_eq!(set.sql().0, "SELECT id, name, age FROM people WHERE (id = ?)");
        assert_eq!(set.fetch().unwrap(), vec![person_row(1, "ann", 30)]);
    }

    #[test]
    fn test_values_list_flat() {
        let db = FakeDb::with(vec![Cursor::from_rows(vec![vec![Value::Int(1)], vec![Value::Int(2)]])]);
        let ids = people(&db).values_list_flat(&["id"]).unwrap();
        assert_eq!(ids.fetch().unwrap(), vec![Value::Int(1), Value::Int(2)]);

        let err = people(&db).values_list_flat(&["id", "name"]).unwrap_err();
        assert_eq!(err.validation_code(), Some("flat_multiple_fields"));
    }

    #[test]
    fn test_in_subquery() {
        let db = FakeDb::with(vec![]);
        let old = people(&db).filter(Q::filter("age__gt", 80)).values_list(&["id"]).unwrap();
        let set = people(&db).filter(Q::in_subquery("id__in", &old).unwrap());
        let (sql, params) = set.sql();
        assert_eq!(
            sql,
            "SELECT id, name, age FROM people WHERE (id IN (SELECT id FROM people WHERE (age > ?)))"
        );
        assert_eq!(params, vec![Value::Int(80)]);
    }

    #[test]
    fn test_in_subquery_rejects_multi_column() {
        let db = FakeDb::with(vec![]);
        let wide = people(&db).values(&["id", "name"]).unwrap();
        assert!(Q::in_subquery("id__in", &wide).unwrap_err().is_validation());
        assert!(Q::in_subquery("id", &people(&db).values(&["id"]).unwrap()).is_err());
    }

    #[test]
    fn test_manager() {
        let db = FakeDb::with(vec![Cursor::from_rows(vec![vec![Value::Int(4)]])]);
        let manager: Manager<Person> = Manager::new(Arc::clone(&db) as Arc<dyn Executor>);
        assert_eq!(manager.count().unwrap(), 4);
        assert_eq!(manager.filter(Q::filter("id", 1)).sql().1, vec![Value::Int(1)]);
        assert!(format!("{manager:?}").contains("people"));
    }
}
