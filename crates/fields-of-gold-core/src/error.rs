//! Core error types for fields-of-gold.
//!
//! [`FogError`] is the single error enum shared by every crate in the workspace.
//! Its variants line up with the four failure classes of a typed column:
//!
//! - [`FogError::ConfigurationError`] for a bad field declaration, raised by the
//!   startup check pass.
//! - [`FogError::ValidationError`] for recoverable application-level validation
//!   failures. The wrapped [`ValidationError`] keeps the dotted path of every
//!   offending sub-field.
//! - [`FogError::IntegrityError`] for writes rejected by a storage constraint.
//! - [`FogError::DataIntegrityError`] for stored data that no longer decodes into
//!   its declared schema.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Key under which errors that do not belong to a single field are collected.
pub const NON_FIELD_ERRORS: &str = "__all__";

/// A validation error with optional per-path errors.
///
/// Validation errors are either simple (a single message) or compound (a map
/// from dotted field path to the errors raised for that path). Paths name a
/// model field and, for structured columns, the sub-field inside it, e.g.
/// `typed_field.my_int` or `payload.items[2].name`.
///
/// # Examples
///
/// ```
/// use fields_of_gold_core::error::ValidationError;
///
/// let err = ValidationError::new("This field cannot be null.", "null")
///     .with_prefix("typed_field");
/// assert_eq!(err.to_string(), "typed_field: This field cannot be null.");
///
/// let nested = ValidationError::for_field("my_int", ValidationError::new("bad", "invalid"))
///     .with_prefix("typed_field");
/// assert!(nested.field_errors.contains_key("typed_field.my_int"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationError {
    /// The primary error message.
    pub message: String,
    /// A short code identifying the type of validation failure (e.g. "null", "invalid").
    pub code: String,
    /// Additional parameters providing context for the error message.
    pub params: BTreeMap<String, String>,
    /// Per-path validation errors, keyed by dotted field path.
    pub field_errors: BTreeMap<String, Vec<Self>>,
}

impl ValidationError {
    /// Creates a new `ValidationError` with a message and code.
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: code.into(),
            params: BTreeMap::new(),
            field_errors: BTreeMap::new(),
        }
    }

    /// Creates a `ValidationError` containing per-path errors.
    pub fn with_field_errors(field_errors: BTreeMap<String, Vec<Self>>) -> Self {
        Self {
            field_errors,
            ..Self::default()
        }
    }

    /// Creates a compound error holding a single error for `path`.
    pub fn for_field(path: impl Into<String>, error: Self) -> Self {
        let mut field_errors = BTreeMap::new();
        field_errors.insert(path.into(), vec![error]);
        Self::with_field_errors(field_errors)
    }

    /// Adds a parameter to this validation error.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Nests this error under `prefix`.
    ///
    /// A simple error becomes the error for `prefix` itself. A compound error
    /// has every path rewritten: the root path becomes `prefix`, an index path
    /// such as `[0].name` becomes `prefix[0].name`, anything else becomes
    /// `prefix.<path>`.
    #[must_use]
    pub fn with_prefix(self, prefix: &str) -> Self {
        if self.field_errors.is_empty() {
            return Self::for_field(prefix, self);
        }
        let field_errors = self
            .field_errors
            .into_iter()
            .map(|(path, errors)| {
                let nested = if path.is_empty() {
                    prefix.to_string()
                } else if path.starts_with('[') {
                    format!("{prefix}{path}")
                } else {
                    format!("{prefix}.{path}")
                };
                (nested, errors)
            })
            .collect();
        Self::with_field_errors(field_errors)
    }

    /// Folds `other` into this error.
    ///
    /// Per-path errors are appended to their paths; a simple error is filed
    /// under [`NON_FIELD_ERRORS`].
    pub fn merge(&mut self, other: Self) {
        if other.field_errors.is_empty() {
            if !other.message.is_empty() {
                self.field_errors
                    .entry(NON_FIELD_ERRORS.to_string())
                    .or_default()
                    .push(other);
            }
            return;
        }
        for (path, errors) in other.field_errors {
            self.field_errors.entry(path).or_default().extend(errors);
        }
    }

    /// Returns `true` if this error carries neither a message nor field errors.
    pub fn is_empty(&self) -> bool {
        self.message.is_empty() && self.field_errors.is_empty()
    }

    /// Returns `Ok(())` when empty and `Err(self)` otherwise.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Returns the errors for one path, if any.
    pub fn errors_for(&self, path: &str) -> Option<&[Self]> {
        self.field_errors.get(path).map(Vec::as_slice)
    }

    /// Flattens the error into `"path: message"` lines.
    pub fn messages(&self) -> Vec<String> {
        if self.field_errors.is_empty() {
            return if self.message.is_empty() {
                Vec::new()
            } else {
                vec![self.message.clone()]
            };
        }
        self.field_errors
            .iter()
            .flat_map(|(path, errors)| {
                errors
                    .iter()
                    .flat_map(Self::messages)
                    .map(move |msg| format!("{path}: {msg}"))
            })
            .collect()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.field_errors.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}", self.messages().join("; "))
        }
    }
}

impl std::error::Error for ValidationError {}

/// The primary error type for fields-of-gold.
#[derive(Error, Debug)]
pub enum FogError {
    // ── ORM errors ───────────────────────────────────────────────────

    /// A lookup expected exactly one row but found none.
    #[error("Object does not exist: {0}")]
    DoesNotExist(String),

    /// A lookup expected exactly one row but found several.
    #[error("Multiple objects returned when one expected: {0}")]
    MultipleObjectsReturned(String),

    /// A generic database error.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// A storage-level constraint rejected the write.
    #[error("Integrity error: {0}")]
    IntegrityError(String),

    /// An operational database error (connection failure, etc.).
    #[error("Operational error: {0}")]
    OperationalError(String),

    /// Previously persisted data no longer matches its declared schema.
    #[error("Data integrity error: {0}")]
    DataIntegrityError(String),

    // ── Validation ───────────────────────────────────────────────────

    /// One or more fields failed application-level validation.
    #[error("Validation error: {0}")]
    ValidationError(ValidationError),

    // ── Configuration ────────────────────────────────────────────────

    /// A field or setting is declared incorrectly.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The settings are missing something required at runtime.
    #[error("Improperly configured: {0}")]
    ImproperlyConfigured(String),

    // ── Serialization ────────────────────────────────────────────────

    /// A value could not be serialized for storage.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // ── IO ───────────────────────────────────────────────────────────

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl FogError {
    /// Returns `true` for errors the caller is expected to handle and report
    /// (validation failures and missing rows). Everything else is a hard
    /// failure of the operation that raised it.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::ValidationError(_) | Self::DoesNotExist(_))
    }
}

impl From<ValidationError> for FogError {
    fn from(err: ValidationError) -> Self {
        Self::ValidationError(err)
    }
}

/// A convenience type alias for `Result<T, FogError>`.
pub type FogResult<T> = Result<T, FogError>;
