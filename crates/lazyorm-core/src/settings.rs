//! Settings for lazyorm.
//!
//! [`Settings`] holds the database connections (keyed by label) and the
//! logging configuration. Settings are plain values passed explicitly to the
//! code that needs them; there is no process-wide settings singleton.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The label of the database used when a schema does not name one.
pub const DEFAULT_DB_LABEL: &str = "default";

/// Database connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// The database engine (e.g. `"sqlite"`).
    pub engine: String,
    /// The database name (or file path / `:memory:` for SQLite).
    pub name: String,
    /// Additional engine-specific options.
    pub options: HashMap<String, String>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            engine: "sqlite".to_string(),
            name: ":memory:".to_string(),
            options: HashMap::new(),
        }
    }
}

/// The complete set of lazyorm settings.
///
/// # Examples
///
/// ```
/// use lazyorm_core::settings::Settings;
///
/// let settings = Settings::default();
/// assert!(settings.debug);
/// assert_eq!(settings.log_level, "info");
/// assert!(settings.databases.contains_key("default"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Whether debug mode is enabled (pretty logs instead of JSON).
    pub debug: bool,
    /// The log filter directive (e.g. "info", "lazyorm_db=debug").
    pub log_level: String,
    /// Database configurations, keyed by label (e.g. "default").
    pub databases: HashMap<String, DatabaseSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        let mut databases = HashMap::new();
        databases.insert(DEFAULT_DB_LABEL.to_string(), DatabaseSettings::default());

        Self {
            debug: true,
            log_level: "info".to_string(),
            databases,
        }
    }
}

impl Settings {
    /// Returns the configuration for the given database label.
    pub fn database(&self, label: &str) -> Option<&DatabaseSettings> {
        self.databases.get(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let s = Settings::default();
        assert!(s.debug);
        assert_eq!(s.log_level, "info");
        assert_eq!(s.databases.len(), 1);
    }

    #[test]
    fn test_default_database() {
        let s = Settings::default();
        let db = s.database("default").expect("default db should exist");
        assert_eq!(db.engine, "sqlite");
        assert_eq!(db.name, ":memory:");
        assert!(s.database("replica").is_none());
    }

    #[test]
    fn test_settings_serde_roundtrip_keeps_databases() {
        let s = Settings::default();
        let json = serde_json::to_string(&s).unwrap();
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.databases, s.databases);
    }
}
