//! Declared document schemas.
//!
//! A [`Schema`] is a serde type plus a little metadata: its registered name,
//! the top-level keys that must be present and non-null, and an optional
//! [`clean`](Schema::clean) hook for rules serde cannot express. Construction
//! from a plain JSON document tracks the path of every failure, so an error in
//! a nested value is reported as e.g. `items[2].name`.
//!
//! Schemas are registered once at startup with [`register_schema`]. The field
//! self-check (`fields_of_gold.E001`) refuses a column whose schema was never
//! registered, which surfaces a missing binding during the startup check pass
//! instead of at first use.

use std::collections::HashMap;
use std::fmt;
use std::sync::{LazyLock, PoisonError, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;

use fields_of_gold_core::{FogError, FogResult, ValidationError};

/// One structural failure found while building or validating a schema value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDetail {
    /// Path of the offending value, relative to the document root
    /// (`""` for the root itself).
    pub loc: String,
    /// Human-readable message.
    pub msg: String,
    /// Short machine-readable kind, e.g. `missing`, `type_error`, `value_error`.
    pub kind: String,
}

/// Structural validation failure for one schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaError {
    schema: String,
    errors: Vec<ErrorDetail>,
}

impl SchemaError {
    /// Creates an empty error for `schema`.
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            errors: Vec::new(),
        }
    }

    /// Creates an error with a single detail.
    pub fn single(
        schema: impl Into<String>,
        loc: impl Into<String>,
        msg: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        let mut err = Self::new(schema);
        err.push(loc, msg, kind);
        err
    }

    /// Records one more failure.
    pub fn push(&mut self, loc: impl Into<String>, msg: impl Into<String>, kind: impl Into<String>) {
        self.errors.push(ErrorDetail {
            loc: loc.into(),
            msg: msg.into(),
            kind: kind.into(),
        });
    }

    /// The schema the error belongs to.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Every recorded failure, in discovery order.
    pub fn errors(&self) -> &[ErrorDetail] {
        &self.errors
    }

    /// Returns `true` if no failure has been recorded.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns `Ok(())` when empty and `Err(self)` otherwise.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Converts into a field-scoped [`ValidationError`] whose paths are nested
    /// under `field_name` (`my_int` becomes `typed_field.my_int`).
    pub fn into_validation_error(self, field_name: &str) -> ValidationError {
        let mut nested = ValidationError::default();
        for detail in self.errors {
            let error = ValidationError::new(detail.msg, detail.kind)
                .with_param("schema", self.schema.clone());
            nested.merge(ValidationError::for_field(detail.loc, error));
        }
        nested.with_prefix(field_name)
    }

    fn from_path_error(schema: &str, err: &serde_path_to_error::Error<serde_json::Error>) -> Self {
        let mut loc = render_path(err.path());
        let inner = err.inner().to_string();
        // serde reports a missing field at the enclosing struct.
        let (msg, kind) = match missing_field_name(&inner) {
            Some(field) => {
                loc = join_path(&loc, field);
                ("Field required".to_string(), "missing")
            }
            None if inner.starts_with("invalid type") => (inner, "type_error"),
            None => (inner, "value_error"),
        };
        Self::single(schema, loc, msg, kind)
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.errors.len();
        let plural = if n == 1 { "" } else { "s" };
        write!(f, "{n} validation error{plural} for {}", self.schema)?;
        for detail in &self.errors {
            let loc = if detail.loc.is_empty() { "(root)" } else { detail.loc.as_str() };
            write!(f, "\n{loc}\n  {} [type={}]", detail.msg, detail.kind)?;
        }
        Ok(())
    }
}

impl std::error::Error for SchemaError {}

fn render_path(path: &serde_path_to_error::Path) -> String {
    use serde_path_to_error::Segment;

    let mut out = String::new();
    for segment in path {
        match segment {
            Segment::Seq { index } => out.push_str(&format!("[{index}]")),
            Segment::Map { key } => out = join_path(&out, key),
            Segment::Enum { variant } => out = join_path(&out, variant),
            Segment::Unknown => out = join_path(&out, "?"),
        }
    }
    out
}

fn join_path(base: &str, key: &str) -> String {
    if base.is_empty() {
        key.to_string()
    } else {
        format!("{base}.{key}")
    }
}

fn missing_field_name(msg: &str) -> Option<&str> {
    msg.strip_prefix("missing field `")?.split('`').next()
}

/// A structured document type that can be stored in a typed JSON column.
///
/// # Examples
///
/// ```
/// use fields_of_gold_db::typed::Schema;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// struct SimpleType {
///     my_int: i64,
///     my_str: String,
/// }
///
/// impl Schema for SimpleType {
///     fn schema_name() -> &'static str {
///         "SimpleType"
///     }
/// }
///
/// let value = SimpleType::construct(serde_json::json!({"my_int": 1, "my_str": "cake"})).unwrap();
/// assert_eq!(value.my_int, 1);
///
/// let err = SimpleType::construct(serde_json::json!({"my_int": "x", "my_str": "cake"})).unwrap_err();
/// assert_eq!(err.errors()[0].loc, "my_int");
/// ```
pub trait Schema: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static {
    /// The name the schema is registered under.
    fn schema_name() -> &'static str;

    /// Top-level keys that must be present and non-null.
    ///
    /// Declare a key here when its Rust type is an `Option` that must
    /// nevertheless be filled before the value is valid. These keys are also
    /// what a `force_valid` column enforces at the storage level.
    fn required_fields() -> &'static [&'static str] {
        &[]
    }

    /// Rules beyond the shape of the type. Runs after deserialization.
    fn clean(&self) -> Result<(), SchemaError> {
        Ok(())
    }

    /// Builds a value from a plain document.
    fn construct(doc: serde_json::Value) -> Result<Self, SchemaError> {
        check_required(Self::schema_name(), Self::required_fields(), &doc)?;
        let value: Self = serde_path_to_error::deserialize(doc)
            .map_err(|e| SchemaError::from_path_error(Self::schema_name(), &e))?;
        value.clean()?;
        Ok(value)
    }

    /// Re-checks a value that may have been mutated since it was built.
    ///
    /// The value is canonicalized and constructed again, so every rule
    /// [`construct`](Schema::construct) applies is applied here too.
    fn validate(&self) -> Result<(), SchemaError> {
        Self::construct(self.canonicalize()?).map(|_| ())
    }

    /// Converts the value to its plain document form.
    fn canonicalize(&self) -> Result<serde_json::Value, SchemaError> {
        serde_json::to_value(self)
            .map_err(|e| SchemaError::single(Self::schema_name(), "", e.to_string(), "serialization"))
    }
}

fn check_required(
    schema: &str,
    required: &[&str],
    doc: &serde_json::Value,
) -> Result<(), SchemaError> {
    let Some(map) = doc.as_object() else {
        return Ok(());
    };
    let mut err = SchemaError::new(schema);
    for key in required {
        if map.get(*key).map_or(true, serde_json::Value::is_null) {
            err.push(*key, "Field required", "missing");
        }
    }
    err.into_result()
}

// ============================================================
// Registry
// ============================================================

/// What the registry knows about a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaInfo {
    /// The registered name.
    pub name: &'static str,
    /// The Rust type bound to the name.
    pub type_name: &'static str,
    /// The schema's required top-level keys.
    pub required: &'static [&'static str],
}

impl SchemaInfo {
    /// Describes schema `T`.
    pub fn of<T: Schema>() -> Self {
        Self {
            name: T::schema_name(),
            type_name: std::any::type_name::<T>(),
            required: T::required_fields(),
        }
    }
}

/// Name-keyed registry of schemas.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: RwLock<HashMap<&'static str, SchemaInfo>>,
}

impl SchemaRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T`. Registering the same type twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if a different type already holds the name.
    pub fn register<T: Schema>(&self) -> FogResult<SchemaInfo> {
        let info = SchemaInfo::of::<T>();
        let mut schemas = self.schemas.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = schemas.get(info.name) {
            if existing.type_name != info.type_name {
                return Err(FogError::ConfigurationError(format!(
                    "Schema name '{}' is already bound to {}, cannot bind {}",
                    info.name, existing.type_name, info.type_name
                )));
            }
            return Ok(existing.clone());
        }
        tracing::debug!(schema = info.name, type_name = info.type_name, "schema registered");
        schemas.insert(info.name, info.clone());
        Ok(info)
    }

    /// Looks up a schema by name.
    pub fn get(&self, name: &str) -> Option<SchemaInfo> {
        self.schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// Returns `true` if `T` itself is registered under its name.
    pub fn is_bound<T: Schema>(&self) -> bool {
        self.get(T::schema_name())
            .is_some_and(|info| info.type_name == std::any::type_name::<T>())
    }

    /// Returns the registered names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self
            .schemas
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect();
        names.sort_unstable();
        names
    }
}

static SCHEMAS: LazyLock<SchemaRegistry> = LazyLock::new(SchemaRegistry::new);

/// Returns the process-wide schema registry.
pub fn schema_registry() -> &'static SchemaRegistry {
    &SCHEMAS
}

/// Registers `T` in the process-wide registry.
///
/// # Errors
///
/// Returns `ConfigurationError` if a different type already holds the name.
pub fn register_schema<T: Schema>() -> FogResult<SchemaInfo> {
    SCHEMAS.register::<T>()
}

/// Looks up a schema in the process-wide registry.
pub fn lookup_schema(name: &str) -> Option<SchemaInfo> {
    SCHEMAS.get(name)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        name: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Order {
        id: i64,
        note: Option<String>,
        #[serde(default)]
        items: Vec<Item>,
    }

    impl Schema for Order {
        fn schema_name() -> &'static str {
            "Order"
        }
        fn required_fields() -> &'static [&'static str] {
            &["note"]
        }
        fn clean(&self) -> Result<(), SchemaError> {
            if self.id < 0 {
                return Err(SchemaError::single("Order", "id", "must be positive", "value_error"));
            }
            Ok(())
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Impostor;

    impl Schema for Impostor {
        fn schema_name() -> &'static str {
            "Order"
        }
    }

    #[test]
    fn test_construct_ok() {
        let order = Order::construct(serde_json::json!({"id": 1, "note": "x"})).unwrap();
        assert_eq!(order.id, 1);
        assert!(order.items.is_empty());
    }

    #[test]
    fn test_construct_nested_path() {
        let err = Order::construct(serde_json::json!({
            "id": 1, "note": "x", "items": [{"name": "a"}, {"name": 7}]
        }))
        .unwrap_err();
        assert_eq!(err.errors().len(), 1);
        assert_eq!(err.errors()[0].loc, "items[1].name");
        assert_eq!(err.errors()[0].kind, "type_error");
    }

    #[test]
    fn test_construct_missing_field_points_at_field() {
        let err = Order::construct(serde_json::json!({"note": "x"})).unwrap_err();
        assert_eq!(err.errors()[0].loc, "id");
        assert_eq!(err.errors()[0].kind, "missing");
    }

    #[test]
    fn test_required_key_null() {
        let err = Order::construct(serde_json::json!({"id": 1, "note": null})).unwrap_err();
        assert_eq!(err.errors()[0].loc, "note");
        assert_eq!(err.errors()[0].msg, "Field required");
    }

    #[test]
    fn test_not_an_object() {
        let err = Order::construct(serde_json::json!("text")).unwrap_err();
        assert_eq!(err.errors()[0].loc, "");
    }

    #[test]
    fn test_clean_runs_on_construct_and_validate() {
        assert!(Order::construct(serde_json::json!({"id": -1, "note": "x"})).is_err());

        let mut order = Order::construct(serde_json::json!({"id": 1, "note": "x"})).unwrap();
        assert!(order.validate().is_ok());
        order.id = -5;
        assert_eq!(order.validate().unwrap_err().errors()[0].msg, "must be positive");
        order.id = 5;
        order.note = None;
        assert_eq!(order.validate().unwrap_err().errors()[0].loc, "note");
    }

    #[test]
    fn test_display() {
        let mut err = SchemaError::new("Order");
        err.push("id", "bad", "type_error");
        assert_eq!(err.to_string(), "1 validation error for Order\nid\n  bad [type=type_error]");
        err.push("", "worse", "value_error");
        assert!(err.to_string().starts_with("2 validation errors for Order"));
        assert!(err.to_string().contains("(root)"));
    }

    #[test]
    fn test_into_validation_error_nests_paths() {
        let mut err = SchemaError::new("Order");
        err.push("id", "bad", "type_error");
        err.push("items[0].name", "worse", "type_error");
        err.push("", "root", "value_error");
        let v = err.into_validation_error("typed_field");
        let paths: Vec<&str> = v.field_errors.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["typed_field", "typed_field.id", "typed_field.items[0].name"]);
        assert_eq!(
            v.errors_for("typed_field.id").unwrap()[0].params.get("schema").map(String::as_str),
            Some("Order")
        );
    }

    #[test]
    fn test_registry() {
        let registry = SchemaRegistry::new();
        assert!(!registry.is_bound::<Order>());
        let info = registry.register::<Order>().unwrap();
        assert_eq!(info.required, &["note"]);
        assert!(registry.register::<Order>().is_ok());
        assert!(registry.is_bound::<Order>());
        assert!(matches!(
            registry.register::<Impostor>(),
            Err(FogError::ConfigurationError(_))
        ));
        assert!(!registry.is_bound::<Impostor>());
        assert_eq!(registry.names(), vec!["Order"]);
        assert!(registry.get("Missing").is_none());
    }
}
