//! Core error types for lazyorm.
//!
//! [`OrmError`] covers everything the query layer can report: validation
//! failures raised while a query is being built, unsupported operations,
//! out-of-range indexing, and errors bubbling up from the execution backend.
//! Backend errors are propagated as-is; there is no translation layer.

use std::collections::HashMap;
use std::fmt;

use thiserror::Error;

/// A validation failure raised synchronously at the offending call.
///
/// The `code` is a short machine-readable identifier (e.g. `"unknown_field"`)
/// and `params` carries the values needed to understand the failure, such as
/// the offending field name.
///
/// # Examples
///
/// ```
/// use lazyorm_core::error::ValidationError;
///
/// let err = ValidationError::new("Cannot resolve keyword 'nick' into field.", "unknown_field")
///     .with_param("field", "nick");
/// assert_eq!(err.params.get("field").map(String::as_str), Some("nick"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The human-readable error message.
    pub message: String,
    /// A short code identifying the type of validation failure.
    pub code: String,
    /// Additional parameters providing context for the error message.
    pub params: HashMap<String, String>,
}

impl ValidationError {
    /// Creates a new `ValidationError` with a message and code.
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            params: HashMap::new(),
        }
    }

    /// Adds a parameter to this validation error.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

/// The error type returned by every fallible lazyorm operation.
#[derive(Error, Debug)]
pub enum OrmError {
    // ── Query construction ───────────────────────────────────────────

    /// A query was built with invalid arguments.
    #[error("Validation error: {0}")]
    Validation(ValidationError),

    /// The requested operation is not supported by the query layer.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// An index was past the end of the result set.
    #[error("Index {0} is out of range")]
    IndexOutOfRange(usize),

    // ── Backend ──────────────────────────────────────────────────────

    /// A generic database error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// An operational database error (connection failure, etc.).
    #[error("Operational error: {0}")]
    OperationalError(String),

    // ── Configuration ────────────────────────────────────────────────

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OrmError {
    /// Shorthand for a [`OrmError::Validation`] with the given message and code.
    pub fn validation(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self::Validation(ValidationError::new(message, code))
    }

    /// Returns `true` if this is a validation error.
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns the validation error code, if this is a validation error.
    pub fn validation_code(&self) -> Option<&str> {
        match self {
            Self::Validation(err) => Some(err.code.as_str()),
            _ => None,
        }
    }
}

impl From<ValidationError> for OrmError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

/// A convenience type alias for `Result<T, OrmError>`.
pub type OrmResult<T> = Result<T, OrmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("flat is not valid here.", "flat_multiple_fields");
        assert_eq!(err.to_string(), "flat is not valid here.");
    }

    #[test]
    fn test_validation_error_with_param() {
        let err = ValidationError::new("Unknown field.", "unknown_field").with_param("field", "x");
        assert_eq!(err.params.get("field").unwrap(), "x");
    }

    #[test]
    fn test_orm_error_display() {
        let err = OrmError::UnsupportedOperation("Negative indexing is not supported.".into());
        assert_eq!(
            err.to_string(),
            "Unsupported operation: Negative indexing is not supported."
        );
        assert_eq!(OrmError::IndexOutOfRange(4).to_string(), "Index 4 is out of range");
    }

    #[test]
    fn test_validation_helpers() {
        let err = OrmError::validation("bad", "sliced_update");
        assert!(err.is_validation());
        assert_eq!(err.validation_code(), Some("sliced_update"));
        assert!(!OrmError::DatabaseError("x".into()).is_validation());
        assert_eq!(OrmError::DatabaseError("x".into()).validation_code(), None);
    }

    #[test]
    fn test_from_validation_error() {
        let err: OrmError = ValidationError::new("m", "c").into();
        assert!(matches!(err, OrmError::Validation(ref v) if v.code == "c"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err: OrmError = io_err.into();
        assert!(err.to_string().contains("file missing"));
    }
}
