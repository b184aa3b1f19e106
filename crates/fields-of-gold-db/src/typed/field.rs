//! Typed JSON columns.
//!
//! [`TypedJsonField`] binds one [`Schema`] to a JSON column and mediates every
//! boundary crossing of the value:
//!
//! | Direction | Method | Failure |
//! |---|---|---|
//! | storage to memory | [`from_db_value`](TypedJsonField::from_db_value) | `DataIntegrityError` |
//! | assignment | [`assign`](TypedJsonField::assign) / [`coerce`](TypedJsonField::coerce) | `ValidationError` |
//! | application validation | [`validate`](TypedJsonField::validate) / [`clean`](TypedJsonField::clean) | `ValidationError` |
//! | memory to storage | [`get_prep_value`](TypedJsonField::get_prep_value) | `SerializationError` |
//! | write with `force_valid` | storage CHECK from [`field_def`](TypedJsonField::field_def) | `IntegrityError` |
//!
//! Application validation is advisory: nothing here stops an invalid value
//! from being written. A `force_valid` column adds a storage-level CHECK that
//! the engine evaluates on every write, so code that skips validation still
//! cannot persist a document missing a required key.
//!
//! A model instance (and its fields) is owned by one task at a time. All
//! methods here are synchronous and touch only the value passed in.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use fields_of_gold_core::checks::CheckMessage;
use fields_of_gold_core::{FogError, FogResult, ValidationError};

use super::codec::{decode_document, CanonicalJsonEncoder, DocumentEncoder};
use super::schema::{schema_registry, Schema};
use super::value::TypedValue;
use crate::fields::{Deconstructed, FieldDef, FieldType};
use crate::model::{ModelMeta, Row};
use crate::value::Value;

/// A JSON column whose documents must conform to schema `T`.
///
/// # Examples
///
/// ```
/// use fields_of_gold_db::typed::{Schema, TypedJsonField, TypedValue};
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
/// let field = TypedJsonField::<SimpleType>::new("typed_field");
/// let mut slot = TypedValue::Absent;
/// field
///     .assign(&mut slot, serde_json::json!({"my_int": 1, "my_str": "hello"}))
///     .unwrap();
/// assert_eq!(slot.as_typed().map(|v| v.my_int), Some(1));
///
/// let err = field
///     .assign(&mut slot, serde_json::json!({"my_int": "nope", "my_str": "hello"}))
///     .unwrap_err();
/// assert!(err.field_errors.contains_key("typed_field.my_int"));
/// ```
pub struct TypedJsonField<T: Schema> {
    name: &'static str,
    column: String,
    null: bool,
    blank: bool,
    default: Option<fn() -> T>,
    encoder: Arc<dyn DocumentEncoder>,
    force_valid: bool,
    _schema: PhantomData<fn() -> T>,
}

impl<T: Schema> TypedJsonField<T> {
    /// Declares a non-null column named `name` bound to `T`.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            column: name.to_string(),
            null: false,
            blank: false,
            default: None,
            encoder: Arc::new(CanonicalJsonEncoder),
            force_valid: false,
            _schema: PhantomData,
        }
    }

    /// Allows NULL in storage and `Absent` during validation.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.null = true;
        self
    }

    /// Allows empty documents during validation.
    #[must_use]
    pub const fn blank(mut self) -> Self {
        self.blank = true;
        self
    }

    /// Fills an `Absent` value with `default()` before it is written.
    #[must_use]
    pub fn default_with(mut self, default: fn() -> T) -> Self {
        self.default = Some(default);
        self
    }

    /// Replaces the document encoder.
    #[must_use]
    pub fn encoder(mut self, encoder: impl DocumentEncoder + 'static) -> Self {
        self.encoder = Arc::new(encoder);
        self
    }

    /// Adds a storage-level CHECK on the schema's required keys.
    #[must_use]
    pub const fn force_valid(mut self) -> Self {
        self.force_valid = true;
        self
    }

    /// Sets the database column name.
    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    /// The field's attribute name.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// The database column name.
    pub fn column_name(&self) -> &str {
        &self.column
    }

    /// The bound schema's name.
    pub fn schema_name(&self) -> &'static str {
        T::schema_name()
    }

    /// Whether the column accepts NULL.
    pub const fn is_nullable(&self) -> bool {
        self.null
    }

    /// Whether writes are guarded by a storage CHECK.
    pub const fn is_force_valid(&self) -> bool {
        self.force_valid
    }

    /// The field definition the schema editor and checks work from.
    pub fn field_def(&self) -> FieldDef {
        let mut def = FieldDef::new(
            self.name,
            FieldType::TypedJsonField {
                schema: T::schema_name().to_string(),
                required: T::required_fields().iter().map(ToString::to_string).collect(),
                force_valid: self.force_valid,
            },
        )
        .column(self.column.clone());
        def.null = self.null;
        def.blank = self.blank;
        def
    }

    /// Startup self-check against the model that declares the field.
    ///
    /// - `fields_of_gold.E001`: the schema is not registered.
    /// - `fields_of_gold.E002`: the model's field definition does not bind
    ///   this schema.
    /// - `fields_of_gold.W001`: `force_valid` is set but the schema has no
    ///   required keys, so the storage CHECK only verifies the document is an
    ///   object.
    pub fn check(&self, meta: &ModelMeta) -> Vec<CheckMessage> {
        let obj = format!("{}.{}", meta.label(), self.name);
        let schema = T::schema_name();
        let mut messages = Vec::new();

        if !schema_registry().is_bound::<T>() {
            messages.push(CheckMessage::error(
                format!(
                    "'{schema}' is not a registered schema type ({}).",
                    std::any::type_name::<T>()
                ),
                Some("Register it with register_schema() before running checks."),
                Some(&obj),
                Some("fields_of_gold.E001"),
            ));
        }

        match meta.get_field(self.name).map(|def| &def.field_type) {
            Some(FieldType::TypedJsonField { schema: declared, .. }) if declared == schema => {}
            Some(FieldType::TypedJsonField { schema: declared, .. }) => {
                messages.push(CheckMessage::error(
                    format!("Field declares schema '{declared}' but is bound to '{schema}'."),
                    Some("Build the model's FieldDef with TypedJsonField::field_def()."),
                    Some(&obj),
                    Some("fields_of_gold.E002"),
                ));
            }
            _ => {
                messages.push(CheckMessage::error(
                    "Field is not declared as a typed JSON column on its model.",
                    Some("Build the model's FieldDef with TypedJsonField::field_def()."),
                    Some(&obj),
                    Some("fields_of_gold.E002"),
                ));
            }
        }

        if self.force_valid && T::required_fields().is_empty() {
            messages.push(CheckMessage::warning(
                format!("force_valid is set but '{schema}' declares no required fields."),
                Some("The storage check only verifies that the column holds an object."),
                Some(&obj),
                Some("fields_of_gold.W001"),
            ));
        }
        messages
    }

    // ── storage to memory ──────────────────────────────────────────────

    /// Decodes a stored value.
    ///
    /// # Errors
    ///
    /// Returns `DataIntegrityError` when the stored text is malformed or no
    /// longer constructs `T` (written before the schema tightened, or edited
    /// out of band). The failure is never replaced by a default.
    pub fn from_db_value(&self, value: &Value) -> FogResult<TypedValue<T>> {
        if value.is_null() {
            return Ok(TypedValue::Absent);
        }
        let doc = decode_document(value).inspect_err(|e| {
            tracing::error!(field = self.name, error = %e, "stored document cannot be decoded");
        })?;
        if doc.is_null() {
            return Ok(TypedValue::Absent);
        }
        T::construct(doc).map(TypedValue::Typed).map_err(|e| {
            tracing::error!(
                field = self.name,
                schema = T::schema_name(),
                error = %e,
                "stored document no longer matches its schema"
            );
            FogError::DataIntegrityError(format!("{}: {e}", self.name))
        })
    }

    /// Reads and decodes the field's column from `row`.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the column is missing, otherwise as
    /// [`from_db_value`](Self::from_db_value).
    pub fn read(&self, row: &Row) -> FogResult<TypedValue<T>> {
        let value = row.get_value(&self.column).ok_or_else(|| {
            FogError::DatabaseError(format!("Column '{}' not found in row", self.column))
        })?;
        self.from_db_value(value)
    }

    // ── assignment ─────────────────────────────────────────────────────

    /// Converts a raw document to `T`. `Absent` and `Typed` pass through.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` whose paths are nested under the field
    /// name, e.g. `typed_field.my_int`.
    pub fn coerce(&self, value: TypedValue<T>) -> Result<TypedValue<T>, ValidationError> {
        match value {
            TypedValue::Raw(doc) => self.construct_raw(&doc),
            other => Ok(other),
        }
    }

    /// Stores `input` in `slot`, coercing raw documents first.
    ///
    /// On failure `slot` is left as it was.
    pub fn assign(
        &self,
        slot: &mut TypedValue<T>,
        input: impl Into<TypedValue<T>>,
    ) -> Result<(), ValidationError> {
        *slot = self.coerce(input.into())?;
        Ok(())
    }

    fn construct_raw(&self, doc: &serde_json::Value) -> Result<TypedValue<T>, ValidationError> {
        if doc.is_null() {
            return Ok(TypedValue::Absent);
        }
        T::construct(doc.clone())
            .map(TypedValue::Typed)
            .map_err(|e| e.into_validation_error(self.name))
    }

    // ── application validation ─────────────────────────────────────────

    /// Validates a value without changing it.
    ///
    /// - `Absent` fails with "This field cannot be null." unless the column
    ///   is nullable or has a default.
    /// - A `Typed` value is re-validated, since it may have been mutated
    ///   after construction.
    /// - A `Raw` document must not be empty (unless `blank`) and must
    ///   construct `T`.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` with paths nested under the field name.
    pub fn validate(&self, value: &TypedValue<T>) -> Result<(), ValidationError> {
        match value {
            TypedValue::Absent => self.check_null(),
            TypedValue::Typed(v) => v.validate().map_err(|e| e.into_validation_error(self.name)),
            TypedValue::Raw(doc) => {
                self.check_blank(doc)?;
                match self.construct_raw(doc)? {
                    TypedValue::Absent => self.check_null(),
                    _ => Ok(()),
                }
            }
        }
    }

    /// Coerces `slot` in place and validates it; used by
    /// [`Model::clean_fields`](crate::model::Model::clean_fields).
    ///
    /// # Errors
    ///
    /// As [`validate`](Self::validate). On failure `slot` is left as it was.
    pub fn clean(&self, slot: &mut TypedValue<T>) -> Result<(), ValidationError> {
        if let TypedValue::Raw(doc) = &*slot {
            self.check_blank(doc)?;
            let coerced = self.construct_raw(doc)?;
            if coerced.is_absent() {
                self.check_null()?;
            }
            *slot = coerced;
            return Ok(());
        }
        self.validate(slot)
    }

    fn check_null(&self) -> Result<(), ValidationError> {
        if self.null || self.default.is_some() {
            return Ok(());
        }
        Err(ValidationError::new("This field cannot be null.", "null").with_prefix(self.name))
    }

    fn check_blank(&self, doc: &serde_json::Value) -> Result<(), ValidationError> {
        let empty = match doc {
            serde_json::Value::Object(map) => map.is_empty(),
            serde_json::Value::Array(items) => items.is_empty(),
            serde_json::Value::String(s) => s.is_empty(),
            _ => false,
        };
        if empty && !self.blank {
            return Err(
                ValidationError::new("This field cannot be blank.", "blank").with_prefix(self.name)
            );
        }
        Ok(())
    }

    // ── memory to storage ──────────────────────────────────────────────

    /// Fills an `Absent` value from the default, if one is declared.
    pub fn pre_save(&self, slot: &mut TypedValue<T>) {
        if let (TypedValue::Absent, Some(default)) = (&*slot, self.default) {
            *slot = TypedValue::Typed(default());
        }
    }

    /// Encodes a value for storage.
    ///
    /// The result is an owned copy: mutating the value afterwards does not
    /// change what was prepared. `Raw` documents are encoded as they are,
    /// without validation.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` if the value cannot be canonicalized or
    /// encoded.
    pub fn get_prep_value(&self, value: &TypedValue<T>) -> FogResult<Value> {
        let doc = match value {
            TypedValue::Absent => return Ok(Value::Null),
            TypedValue::Raw(doc) if doc.is_null() => return Ok(Value::Null),
            TypedValue::Raw(doc) => self.encoder.encode(doc)?,
            TypedValue::Typed(v) => {
                let doc = v.canonicalize().map_err(|e| {
                    FogError::SerializationError(format!("{}: {e}", self.name))
                })?;
                self.encoder.encode(&doc)?
            }
        };
        Ok(Value::String(doc))
    }

    // ── schema tooling ─────────────────────────────────────────────────

    /// Returns the field configuration for schema tooling.
    ///
    /// Records the schema binding, `force_valid`, `null`, `blank`, the column
    /// and a non-default encoder.
    pub fn deconstruct(&self) -> Deconstructed {
        let mut d = self.field_def().deconstruct();
        if self.encoder.name() != CanonicalJsonEncoder::NAME {
            d.kwargs
                .insert("encoder".to_string(), serde_json::json!(self.encoder.name()));
        }
        d
    }

    /// Rebuilds a field from [`deconstruct`](Self::deconstruct) output with
    /// the default encoder.
    ///
    /// # Errors
    ///
    /// As [`from_deconstructed_with`](Self::from_deconstructed_with).
    pub fn from_deconstructed(name: &'static str, d: &Deconstructed) -> FogResult<Self> {
        Self::from_deconstructed_with(name, d, Arc::new(CanonicalJsonEncoder))
    }

    /// Rebuilds a field from [`deconstruct`](Self::deconstruct) output.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if `d` describes another kind of field,
    /// binds a different schema, or names an encoder other than `encoder`.
    pub fn from_deconstructed_with(
        name: &'static str,
        d: &Deconstructed,
        encoder: Arc<dyn DocumentEncoder>,
    ) -> FogResult<Self> {
        let expected_path = FieldType::TypedJsonField {
            schema: String::new(),
            required: Vec::new(),
            force_valid: false,
        }
        .path();
        if d.path != expected_path {
            return Err(FogError::ConfigurationError(format!(
                "'{}' is a {}, not a typed JSON field",
                d.name, d.path
            )));
        }
        if d.name != name {
            return Err(FogError::ConfigurationError(format!(
                "configuration for '{}' cannot build field '{name}'",
                d.name
            )));
        }
        match d.string("schema") {
            Some(schema) if schema == T::schema_name() => {}
            other => {
                return Err(FogError::ConfigurationError(format!(
                    "field '{name}' binds schema {}, not '{}'",
                    other.map_or_else(|| "(none)".to_string(), |s| format!("'{s}'")),
                    T::schema_name()
                )))
            }
        }
        let encoder_name = d.string("encoder").unwrap_or(CanonicalJsonEncoder::NAME);
        if encoder_name != encoder.name() {
            return Err(FogError::ConfigurationError(format!(
                "field '{name}' was encoded with '{encoder_name}', got '{}'",
                encoder.name()
            )));
        }

        let mut field = Self::new(name);
        field.encoder = encoder;
        field.null = d.flag("null");
        field.blank = d.flag("blank");
        field.force_valid = d.flag("force_valid");
        if let Some(column) = d.string("db_column") {
            field.column = column.to_string();
        }
        Ok(field)
    }
}

impl<T: Schema> Clone for TypedJsonField<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            column: self.column.clone(),
            null: self.null,
            blank: self.blank,
            default: self.default,
            encoder: Arc::clone(&self.encoder),
            force_valid: self.force_valid,
            _schema: PhantomData,
        }
    }
}

impl<T: Schema> fmt::Debug for TypedJsonField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedJsonField")
            .field("name", &self.name)
            .field("column", &self.column)
            .field("schema", &T::schema_name())
            .field("null", &self.null)
            .field("blank", &self.blank)
            .field("has_default", &self.default.is_some())
            .field("encoder", &self.encoder.name())
            .field("force_valid", &self.force_valid)
            .finish()
    }
}
