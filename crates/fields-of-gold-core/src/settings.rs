//! Settings for fields-of-gold.
//!
//! This module provides the [`Settings`] struct, which holds all configuration
//! the field extensions consult at startup. Callers pass it explicitly to
//! the check runner, the backend connector and the logging setup.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Database connection configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// The database engine (e.g. `fields_of_gold.db.backends.sqlite3`).
    pub engine: String,
    /// The database name, or file path for `SQLite` (`:memory:` for in-memory).
    pub name: String,
    /// Additional engine-specific options.
    pub options: HashMap<String, String>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            engine: "fields_of_gold.db.backends.sqlite3".to_string(),
            name: "db.sqlite3".to_string(),
            options: HashMap::new(),
        }
    }
}

/// The complete set of settings.
///
/// # Examples
///
/// ```
/// use fields_of_gold_core::settings::Settings;
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
    /// The log filter directive (e.g. "info", "`fields_of_gold_db=debug`").
    pub log_level: String,
    /// Database configurations, keyed by alias (e.g. "default").
    pub databases: HashMap<String, DatabaseSettings>,
    /// Check message ids that the check runner drops (e.g. `fields_of_gold.W001`).
    pub silenced_system_checks: Vec<String>,
    /// Custom settings that don't fit into the above categories.
    pub extra: HashMap<String, serde_json::Value>,
}

impl Default for Settings {
    fn default() -> Self {
        let mut databases = HashMap::new();
        databases.insert("default".to_string(), DatabaseSettings::default());

        Self {
            debug: true,
            log_level: "info".to_string(),
            databases,
            silenced_system_checks: Vec::new(),
            extra: HashMap::new(),
        }
    }
}

impl Settings {
    /// Returns the database settings for `alias`, if configured.
    pub fn database(&self, alias: &str) -> Option<&DatabaseSettings> {
        self.databases.get(alias)
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
        assert!(s.silenced_system_checks.is_empty());
        assert!(s.extra.is_empty());
    }

    #[test]
    fn test_default_database() {
        let s = Settings::default();
        let db = s.database("default").expect("default db should exist");
        assert_eq!(db.engine, "fields_of_gold.db.backends.sqlite3");
        assert_eq!(db.name, "db.sqlite3");
        assert!(s.database("replica").is_none());
    }
}
