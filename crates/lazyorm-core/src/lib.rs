//! # lazyorm-core
//!
//! Foundation types shared by every lazyorm crate. This crate knows nothing
//! about SQL; it provides the error vocabulary, the settings model and its
//! loaders, and the `tracing` setup used by the query layer.
//!
//! ## Modules
//!
//! - [`error`] - Error types and result aliases
//! - [`settings`] - Database and logging configuration
//! - [`settings_loader`] - Loading settings from TOML, JSON and the environment
//! - [`logging`] - Tracing-based logging integration

pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use error::{OrmError, OrmResult, ValidationError};
pub use settings::{DatabaseSettings, Settings};
