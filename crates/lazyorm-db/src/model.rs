//! Static schemas, rows, and the record factory.
//!
//! A [`Schema`] is the explicit, static description of a table: its name,
//! the database label it lives on, and the ordered list of field names.
//! Everything that accepts field names (projections, updates, constructor
//! keywords) is checked against it.
//!
//! The [`Model`] trait turns a named [`Row`] into a domain record and back
//! into field values for persistence.

use std::collections::HashMap;
use std::sync::Arc;

use lazyorm_core::settings::DEFAULT_DB_LABEL;
use lazyorm_core::{OrmError, OrmResult, ValidationError};

use crate::value::Value;

/// The static description of a table.
///
/// # Examples
///
/// ```
/// use lazyorm_db::model::Schema;
///
/// static PEOPLE: Schema = Schema::new("people", &["id", "name", "age"]).primary_key("id");
///
/// assert_eq!(PEOPLE.label, "default");
/// assert!(PEOPLE.has_field("age"));
/// assert!(PEOPLE.check_fields(&["name", "nick"]).is_err());
/// ```
#[derive(Debug, PartialEq, Eq)]
pub struct Schema {
    /// The database table name.
    pub table: &'static str,
    /// The label of the database this table lives on.
    pub label: &'static str,
    /// Field names, in column order.
    pub fields: &'static [&'static str],
    /// The primary key field, if the backend assigns one on insert.
    pub pk: Option<&'static str>,
}

impl Schema {
    /// Creates a schema on the default database with no primary key.
    pub const fn new(table: &'static str, fields: &'static [&'static str]) -> Self {
        Self {
            table,
            label: DEFAULT_DB_LABEL,
            fields,
            pk: None,
        }
    }

    /// Moves the table to another database label.
    #[must_use]
    pub const fn using(self, label: &'static str) -> Self {
        Self { label, ..self }
    }

    /// Declares the backend-assigned primary key field.
    #[must_use]
    pub const fn primary_key(self, field: &'static str) -> Self {
        Self {
            pk: Some(field),
            ..self
        }
    }

    /// Returns `true` if `name` is one of the schema's fields.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains(&name)
    }

    /// Returns all field names as owned strings, in column order.
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|f| (*f).to_string()).collect()
    }

    /// Checks projected field names, failing on the first unknown one.
    pub fn check_fields<S: AsRef<str>>(&self, names: &[S]) -> OrmResult<()> {
        match names.iter().find(|n| !self.has_field(n.as_ref())) {
            Some(unknown) => {
                let unknown = unknown.as_ref();
                Err(ValidationError::new(
                    format!("Cannot resolve keyword '{unknown}' into field."),
                    "unknown_field",
                )
                .with_param("field", unknown)
                .into())
            }
            None => Ok(()),
        }
    }

    /// Checks record constructor keywords, failing on the first unknown one.
    pub fn check_keywords<'a, I>(&self, names: I) -> OrmResult<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for name in names {
            if !self.has_field(name) {
                return Err(ValidationError::new(
                    format!("'{name}' is an invalid keyword argument for {}", self.table),
                    "invalid_keyword",
                )
                .with_param("field", name)
                .into());
            }
        }
        Ok(())
    }
}

/// A database record type backed by a [`Schema`].
///
/// Implementations are the record factory: `from_row` receives a row whose
/// columns are a subset of the schema's fields and builds the record.
///
/// # Examples
///
/// ```
/// use lazyorm_core::OrmResult;
/// use lazyorm_db::model::{Model, Row, Schema};
/// use lazyorm_db::value::Value;
///
/// struct Tag {
///     id: Option<i64>,
///     label: Option<String>,
/// }
///
/// static TAGS: Schema = Schema::new("tags", &["id", "label"]).primary_key("id");
///
/// impl Model for Tag {
///     fn schema() -> &'static Schema {
///         &TAGS
///     }
///
///     fn from_row(row: &Row) -> OrmResult<Self> {
///         Ok(Tag {
///             id: row.get_optional("id")?,
///             label: row.get_optional("label")?,
///         })
///     }
///
///     fn field_values(&self) -> Vec<(&'static str, Value)> {
///         let mut out = Vec::new();
///         if let Some(id) = self.id {
///             out.push(("id", Value::from(id)));
///         }
///         if let Some(label) = &self.label {
///             out.push(("label", Value::from(label.as_str())));
///         }
///         out
///     }
/// }
/// ```
pub trait Model: Sized + 'static {
    /// Returns the static schema for this record type.
    fn schema() -> &'static Schema;

    /// Builds a record from a row of named values.
    fn from_row(row: &Row) -> OrmResult<Self>;

    /// Returns the assigned fields, in the order they should be inserted.
    fn field_values(&self) -> Vec<(&'static str, Value)>;

    /// Stores the primary key the backend assigned on insert.
    fn set_pk(&mut self, _value: Value) {}
}

/// Builds a record from keyword/value pairs, validating the keywords first.
pub fn construct<M: Model>(fields: Vec<(String, Value)>) -> OrmResult<M> {
    M::schema().check_keywords(fields.iter().map(|(name, _)| name.as_str()))?;
    let (columns, values): (Vec<String>, Vec<Value>) = fields.into_iter().unzip();
    let row = Row::try_new(columns, values)?;
    M::from_row(&row)
}

/// A row of values with the names of the columns they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a row, failing if the value count does not match the columns.
    pub fn try_new(columns: impl Into<Arc<[String]>>, values: Vec<Value>) -> OrmResult<Self> {
        let columns = columns.into();
        if columns.len() != values.len() {
            return Err(OrmError::DatabaseError(format!(
                "Row has {} values for {} columns",
                values.len(),
                columns.len()
            )));
        }
        Ok(Self { columns, values })
    }

    /// Returns the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the values, in column order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns a reference to the raw value of the given column.
    pub fn get_value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }

    /// Gets a typed value by column name.
    pub fn get<T: FromValue>(&self, column: &str) -> OrmResult<T> {
        let value = self.get_value(column).ok_or_else(|| {
            OrmError::DatabaseError(format!("Column '{column}' not found in row"))
        })?;
        T::from_value(value)
    }

    /// Gets a typed value by column name; a missing column or NULL is `None`.
    pub fn get_optional<T: FromValue>(&self, column: &str) -> OrmResult<Option<T>> {
        match self.get_value(column) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => T::from_value(value).map(Some),
        }
    }

    /// Gets a typed value by column index.
    pub fn get_by_index<T: FromValue>(&self, idx: usize) -> OrmResult<T> {
        let value = self.values.get(idx).ok_or_else(|| {
            OrmError::DatabaseError(format!(
                "Column index {idx} out of bounds (row has {} columns)",
                self.values.len()
            ))
        })?;
        T::from_value(value)
    }

    /// Converts the row into a column-name to value map.
    pub fn into_map(self) -> HashMap<String, Value> {
        self.columns.iter().cloned().zip(self.values).collect()
    }

    /// Consumes the row, returning its values.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// Conversion from a [`Value`] cell to a concrete Rust type.
pub trait FromValue: Sized {
    /// Attempts to convert a value reference to this type.
    fn from_value(value: &Value) -> OrmResult<Self>;
}

fn mismatch(expected: &str, value: &Value) -> OrmError {
    OrmError::DatabaseError(format!("Expected {expected}, got {value:?}"))
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> OrmResult<Self> {
        value.as_int().ok_or_else(|| mismatch("Int", value))
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> OrmResult<Self> {
        let wide = i64::from_value(value)?;
        i32::try_from(wide)
            .map_err(|e| OrmError::DatabaseError(format!("Int value out of i32 range: {e}")))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> OrmResult<Self> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as f64),
            _ => Err(mismatch("Float", value)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> OrmResult<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            // SQLite has no boolean storage class.
            Value::Int(i) => Ok(*i != 0),
            _ => Err(mismatch("Bool", value)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> OrmResult<Self> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch("String", value))
    }
}

impl FromValue for uuid::Uuid {
    fn from_value(value: &Value) -> OrmResult<Self> {
        match value {
            Value::Uuid(u) => Ok(*u),
            Value::String(s) => uuid::Uuid::parse_str(s)
                .map_err(|e| OrmError::DatabaseError(format!("Invalid UUID '{s}': {e}"))),
            _ => Err(mismatch("Uuid", value)),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> OrmResult<Self> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> OrmResult<Self> {
        match value {
            Value::Null => Ok(None),
            _ => T::from_value(value).map(Some),
        }
    }
}
