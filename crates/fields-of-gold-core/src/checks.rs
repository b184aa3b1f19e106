//! System check framework.
//!
//! Checks run once, at startup, before any model is used. Field declarations
//! register their self-checks here so that a misconfigured field is reported
//! during deployment gating instead of failing on first use.
//!
//! ## Overview
//!
//! - [`CheckMessage`]: A diagnostic message from a check (level, message, hint, object, id).
//! - [`CheckLevel`]: Severity level (Debug, Info, Warning, Error, Critical).
//! - [`CheckRegistry`]: Registry for check functions with tag-based filtering.
//! - Built-in checks: a `default` database is configured and `log_level` parses.
//!
//! ## Examples
//!
//! ```
//! use fields_of_gold_core::checks::{CheckMessage, CheckRegistry};
//!
//! let mut registry = CheckRegistry::new();
//! registry.register(
//!     |_settings| {
//!         vec![CheckMessage::warning(
//!             "Custom check warning",
//!             Some("Consider fixing this."),
//!             None,
//!             Some("myapp.W001"),
//!         )]
//!     },
//!     &["myapp"],
//! );
//!
//! let settings = fields_of_gold_core::settings::Settings::default();
//! let messages = registry.run_checks(None, &settings);
//! assert_eq!(messages.len(), 1);
//! ```

use crate::error::{FogError, FogResult};
use crate::logging::is_valid_filter;
use crate::settings::Settings;

/// Severity level for a check message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CheckLevel {
    /// Debugging information.
    Debug = 0,
    /// Informational message.
    Info = 1,
    /// A potential problem.
    Warning = 2,
    /// A definite problem that should be fixed.
    Error = 3,
    /// A critical error that prevents the application from running.
    Critical = 4,
}

impl std::fmt::Display for CheckLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Debug => write!(f, "DEBUG"),
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// A diagnostic message produced by a system check.
#[derive(Debug, Clone)]
pub struct CheckMessage {
    /// The severity level.
    pub level: CheckLevel,
    /// The human-readable message describing the issue.
    pub msg: String,
    /// An optional hint on how to fix the issue.
    pub hint: Option<String>,
    /// The object (field, setting, ...) that the issue relates to.
    pub obj: Option<String>,
    /// A unique identifier for this check message (e.g. `fields_of_gold.E001`).
    pub id: Option<String>,
}

impl CheckMessage {
    /// Creates a new `CheckMessage` with the given level and details.
    pub fn new(
        level: CheckLevel,
        msg: impl Into<String>,
        hint: Option<&str>,
        obj: Option<&str>,
        id: Option<&str>,
    ) -> Self {
        Self {
            level,
            msg: msg.into(),
            hint: hint.map(String::from),
            obj: obj.map(String::from),
            id: id.map(String::from),
        }
    }

    /// Creates an info-level message.
    pub fn info(msg: impl Into<String>, hint: Option<&str>, obj: Option<&str>, id: Option<&str>) -> Self {
        Self::new(CheckLevel::Info, msg, hint, obj, id)
    }

    /// Creates a warning-level message.
    pub fn warning(msg: impl Into<String>, hint: Option<&str>, obj: Option<&str>, id: Option<&str>) -> Self {
        Self::new(CheckLevel::Warning, msg, hint, obj, id)
    }

    /// Creates an error-level message.
    pub fn error(msg: impl Into<String>, hint: Option<&str>, obj: Option<&str>, id: Option<&str>) -> Self {
        Self::new(CheckLevel::Error, msg, hint, obj, id)
    }

    /// Creates a critical-level message.
    pub fn critical(msg: impl Into<String>, hint: Option<&str>, obj: Option<&str>, id: Option<&str>) -> Self {
        Self::new(CheckLevel::Critical, msg, hint, obj, id)
    }

    /// Returns `true` if this is a warning or higher severity.
    pub fn is_serious(&self) -> bool {
        self.level >= CheckLevel::Warning
    }

    /// Returns `true` if this message must stop startup.
    pub fn is_fatal(&self) -> bool {
        self.level >= CheckLevel::Error
    }
}

impl std::fmt::Display for CheckMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(ref id) = self.id {
            write!(f, "({id}) ")?;
        }
        write!(f, "{}: {}", self.level, self.msg)?;
        if let Some(ref hint) = self.hint {
            write!(f, "\n\tHINT: {hint}")?;
        }
        if let Some(ref obj) = self.obj {
            write!(f, "\n\tObject: {obj}")?;
        }
        Ok(())
    }
}

/// A check function that receives settings and returns diagnostic messages.
pub type CheckFn = fn(&Settings) -> Vec<CheckMessage>;

struct RegisteredCheck {
    func: CheckFn,
    tags: Vec<String>,
}

/// Registry for system check functions.
///
/// Check functions are registered with tags, and then run all at once or
/// filtered by tag.
pub struct CheckRegistry {
    checks: Vec<RegisteredCheck>,
}

impl CheckRegistry {
    /// Creates a new empty check registry.
    pub const fn new() -> Self {
        Self { checks: Vec::new() }
    }

    /// Creates a new check registry pre-loaded with built-in checks.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(check_default_database, &["database"]);
        registry.register(check_log_level, &["settings"]);
        registry
    }

    /// Registers a check function with the given tags.
    pub fn register(&mut self, func: CheckFn, tags: &[&str]) {
        self.checks.push(RegisteredCheck {
            func,
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
        });
    }

    /// Runs all registered checks (or only those matching the given tags)
    /// and collects the resulting messages.
    ///
    /// Messages whose id appears in `settings.silenced_system_checks` are
    /// dropped.
    pub fn run_checks(&self, tags: Option<&[&str]>, settings: &Settings) -> Vec<CheckMessage> {
        let mut messages = Vec::new();

        for check in &self.checks {
            let should_run = tags.map_or(true, |filter_tags| {
                filter_tags.iter().any(|t| check.tags.iter().any(|tag| tag == t))
            });

            if should_run {
                messages.extend((check.func)(settings));
            }
        }

        messages.retain(|m| {
            m.id
                .as_ref()
                .map_or(true, |id| !settings.silenced_system_checks.contains(id))
        });
        messages
    }

    /// Runs every check and fails startup if any Error or Critical message
    /// remains.
    ///
    /// On success the remaining (non-fatal) messages are returned so the
    /// caller can log them.
    pub fn check_startup(&self, settings: &Settings) -> FogResult<Vec<CheckMessage>> {
        let messages = self.run_checks(None, settings);
        let fatal: Vec<String> = messages
            .iter()
            .filter(|m| m.is_fatal())
            .map(ToString::to_string)
            .collect();

        if !fatal.is_empty() {
            tracing::error!(count = fatal.len(), "system checks failed");
            return Err(FogError::ConfigurationError(format!(
                "System check identified {} issue(s):\n{}",
                fatal.len(),
                fatal.join("\n")
            )));
        }

        for message in messages.iter().filter(|m| m.is_serious()) {
            tracing::warn!(id = message.id.as_deref().unwrap_or(""), "{}", message.msg);
        }
        Ok(messages)
    }

    /// Returns the number of registered checks.
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// Returns `true` if no checks are registered.
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }
}

impl Default for CheckRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================
// Built-in checks
// ============================================================

fn check_default_database(settings: &Settings) -> Vec<CheckMessage> {
    if settings.database("default").is_some() {
        return Vec::new();
    }
    vec![CheckMessage::error(
        "No 'default' database is configured.",
        Some("Add a [databases.default] table to your settings."),
        Some("settings.databases"),
        Some("fields_of_gold.E010"),
    )]
}

fn check_log_level(settings: &Settings) -> Vec<CheckMessage> {
    if is_valid_filter(&settings.log_level) {
        return Vec::new();
    }
    vec![CheckMessage::warning(
        format!("log_level '{}' is not a valid filter directive.", settings.log_level),
        Some("Falling back to 'info'."),
        Some("settings.log_level"),
        Some("fields_of_gold.W010"),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_level_ordering() {
        assert!(CheckLevel::Debug < CheckLevel::Info);
        assert!(CheckLevel::Info < CheckLevel::Warning);
        assert!(CheckLevel::Warning < CheckLevel::Error);
        assert!(CheckLevel::Error < CheckLevel::Critical);
    }

    #[test]
    fn test_check_message_levels() {
        assert!(!CheckMessage::info("", None, None, None).is_serious());
        assert!(CheckMessage::warning("", None, None, None).is_serious());
        assert!(!CheckMessage::warning("", None, None, None).is_fatal());
        assert!(CheckMessage::error("", None, None, None).is_fatal());
        assert!(CheckMessage::critical("", None, None, None).is_fatal());
    }

    #[test]
    fn test_check_message_display() {
        let m = CheckMessage::error(
            "Bad schema",
            Some("Register it"),
            Some("blog.Post.payload"),
            Some("fields_of_gold.E001"),
        );
        let s = m.to_string();
        assert!(s.contains("(fields_of_gold.E001)"));
        assert!(s.contains("ERROR: Bad schema"));
        assert!(s.contains("HINT: Register it"));
        assert!(s.contains("Object: blog.Post.payload"));
    }

    #[test]
    fn test_check_message_display_minimal() {
        let m = CheckMessage::info("Just info", None, None, None);
        assert_eq!(m.to_string(), "INFO: Just info");
    }

    #[test]
    fn test_registry_tag_filtering() {
        let mut registry = CheckRegistry::new();
        assert!(registry.is_empty());
        registry.register(
            |_| vec![CheckMessage::warning("field issue", None, None, None)],
            &["models"],
        );
        registry.register(
            |_| vec![CheckMessage::info("db info", None, None, None)],
            &["database"],
        );
        assert_eq!(registry.len(), 2);

        let settings = Settings::default();
        assert_eq!(registry.run_checks(None, &settings).len(), 2);

        let models_only = registry.run_checks(Some(&["models"]), &settings);
        assert_eq!(models_only.len(), 1);
        assert!(models_only[0].msg.contains("field"));

        assert!(registry.run_checks(Some(&["templates"]), &settings).is_empty());
    }

    #[test]
    fn test_registry_silenced_checks() {
        let mut registry = CheckRegistry::new();
        registry.register(
            |_| {
                vec![
                    CheckMessage::warning("w1", None, None, Some("fields_of_gold.W001")),
                    CheckMessage::warning("w2", None, None, Some("fields_of_gold.W002")),
                ]
            },
            &["models"],
        );

        let settings = Settings {
            silenced_system_checks: vec!["fields_of_gold.W001".to_string()],
            ..Settings::default()
        };
        let messages = registry.run_checks(None, &settings);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id.as_deref(), Some("fields_of_gold.W002"));
    }

    #[test]
    fn test_check_startup_fails_on_error() {
        let mut registry = CheckRegistry::new();
        registry.register(
            |_| vec![CheckMessage::error("broken", None, None, Some("fields_of_gold.E001"))],
            &["models"],
        );
        let result = registry.check_startup(&Settings::default());
        match result {
            Err(FogError::ConfigurationError(msg)) => {
                assert!(msg.contains("1 issue"));
                assert!(msg.contains("fields_of_gold.E001"));
            }
            other => panic!("expected ConfigurationError, got {other:?}"),
        }
    }

    #[test]
    fn test_check_startup_passes_warnings_through() {
        let mut registry = CheckRegistry::new();
        registry.register(
            |_| vec![CheckMessage::warning("meh", None, None, Some("fields_of_gold.W001"))],
            &["models"],
        );
        let messages = registry.check_startup(&Settings::default()).unwrap();
        assert_eq!(messages.len(), 1);
    }

    #[test]
    fn test_builtin_default_database() {
        let mut settings = Settings::default();
        assert!(check_default_database(&settings).is_empty());
        settings.databases.clear();
        let messages = check_default_database(&settings);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id.as_deref(), Some("fields_of_gold.E010"));
    }

    #[test]
    fn test_builtin_log_level() {
        let mut settings = Settings::default();
        assert!(check_log_level(&settings).is_empty());
        settings.log_level = "fields_of_gold_db=debug=trace".to_string();
        let messages = check_log_level(&settings);
        assert_eq!(messages[0].id.as_deref(), Some("fields_of_gold.W010"));
    }

    #[test]
    fn test_registry_with_builtins() {
        let registry = CheckRegistry::with_builtins();
        assert_eq!(registry.len(), 2);
        assert!(registry.check_startup(&Settings::default()).unwrap().is_empty());
    }
}
