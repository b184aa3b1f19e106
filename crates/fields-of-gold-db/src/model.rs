//! Model trait and metadata for the ORM.
//!
//! The [`Model`] trait is implemented by every struct that maps to a table.
//! It provides access to metadata, field values, and construction from
//! database rows, plus the validation hooks run by [`Model::full_clean`].
//!
//! [`ModelMeta`] captures the table name, field definitions and table-level
//! constraints.

use fields_of_gold_core::checks::CheckMessage;
use fields_of_gold_core::{FogResult, ValidationError};

use crate::constraints::BoxedConstraint;
use crate::fields::FieldDef;
use crate::value::Value;

pub use crate::sql::Row;

/// The core trait for all ORM models.
///
/// # Examples
///
/// ```
/// use std::sync::LazyLock;
///
/// use fields_of_gold_core::FogResult;
/// use fields_of_gold_db::fields::{FieldDef, FieldType};
/// use fields_of_gold_db::model::{Model, ModelMeta, Row};
/// use fields_of_gold_db::value::Value;
///
/// struct Human {
///     id: Value,
///     name: String,
/// }
///
/// impl Model for Human {
///     fn meta() -> &'static ModelMeta {
///         static META: LazyLock<ModelMeta> = LazyLock::new(|| {
///             ModelMeta::new("dogs", "human").fields(vec![
///                 FieldDef::new("id", FieldType::BigAutoField).primary_key(),
///                 FieldDef::new("name", FieldType::TextField),
///             ])
///         });
///         &META
///     }
///
///     fn pk(&self) -> Option<&Value> {
///         (!self.id.is_null()).then_some(&self.id)
///     }
///     fn set_pk(&mut self, value: Value) {
///         self.id = value;
///     }
///     fn field_values(&self) -> FogResult<Vec<(&'static str, Value)>> {
///         Ok(vec![("id", self.id.clone()), ("name", Value::from(self.name.as_str()))])
///     }
///     fn from_row(row: &Row) -> FogResult<Self> {
///         Ok(Human {
///             id: row.get("id")?,
///             name: row.get("name")?,
///         })
///     }
/// }
///
/// assert_eq!(Human::table_name(), "dogs_human");
/// ```
pub trait Model: Send + Sync + 'static {
    /// Returns the static metadata for this model type.
    fn meta() -> &'static ModelMeta;

    /// Returns the database table name.
    fn table_name() -> &'static str {
        &Self::meta().db_table
    }

    /// Returns a reference to the primary key value, or `None` if unsaved.
    fn pk(&self) -> Option<&Value>;

    /// Sets the primary key value on this instance (used after INSERT).
    fn set_pk(&mut self, value: Value);

    /// Returns the name of the primary key column (e.g., "id").
    fn pk_field_name() -> &'static str {
        "id"
    }

    /// Returns all column name-value pairs for this instance, encoded for
    /// storage.
    ///
    /// Encoding can fail (for example a structured column whose document
    /// cannot be serialized), so the result is fallible.
    fn field_values(&self) -> FogResult<Vec<(&'static str, Value)>>;

    /// Returns column name-value pairs excluding the primary key.
    fn non_pk_field_values(&self) -> FogResult<Vec<(&'static str, Value)>> {
        let pk_name = Self::pk_field_name();
        Ok(self
            .field_values()?
            .into_iter()
            .filter(|(name, _)| *name != pk_name)
            .collect())
    }

    /// Constructs a model instance from a database row.
    fn from_row(row: &Row) -> FogResult<Self>
    where
        Self: Sized;

    /// Called before the instance is written. Fills defaults and similar
    /// per-field preparation.
    fn pre_save(&mut self) -> FogResult<()> {
        Ok(())
    }

    /// Cleans and validates each field, collecting the errors by field path.
    ///
    /// Fields may normalise their value in place (raw documents are coerced to
    /// their structured type here).
    fn clean_fields(&mut self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Model-wide validation hook, run after [`clean_fields`](Model::clean_fields).
    fn clean(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    /// Startup self-checks for the model's fields. Run by
    /// [`check_models`](crate::checks::check_models) once the model is
    /// registered.
    fn check() -> Vec<CheckMessage>
    where
        Self: Sized,
    {
        Vec::new()
    }

    /// Runs [`clean_fields`](Model::clean_fields) and [`clean`](Model::clean)
    /// and reports every error found.
    fn full_clean(&mut self) -> Result<(), ValidationError> {
        let mut errors = ValidationError::default();
        if let Err(e) = self.clean_fields() {
            errors.merge(e);
        }
        if let Err(e) = self.clean() {
            errors.merge(e);
        }
        errors.into_result()
    }
}

/// Metadata about a model.
pub struct ModelMeta {
    /// The application label (e.g., "dogs").
    pub app_label: &'static str,
    /// The model name in lowercase (e.g., "human").
    pub model_name: &'static str,
    /// The database table name.
    pub db_table: String,
    /// Human-readable singular name.
    pub verbose_name: String,
    /// Field definitions for this model.
    pub fields: Vec<FieldDef>,
    /// Table-level constraints (CHECK).
    pub constraints: Vec<BoxedConstraint>,
}

impl ModelMeta {
    /// Creates metadata with the conventional `<app_label>_<model_name>` table.
    pub fn new(app_label: &'static str, model_name: &'static str) -> Self {
        Self {
            app_label,
            model_name,
            db_table: format!("{app_label}_{model_name}"),
            verbose_name: model_name.replace('_', " "),
            fields: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Sets the field definitions.
    #[must_use]
    pub fn fields(mut self, fields: Vec<FieldDef>) -> Self {
        self.fields = fields;
        self
    }

    /// Adds a table-level constraint.
    #[must_use]
    pub fn constraint(mut self, constraint: BoxedConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Overrides the table name.
    #[must_use]
    pub fn db_table(mut self, db_table: impl Into<String>) -> Self {
        self.db_table = db_table.into();
        self
    }

    /// Returns the `app_label.ModelName` label used in check messages.
    pub fn label(&self) -> String {
        format!("{}.{}", self.app_label, self.model_name)
    }

    /// Looks up a field definition by attribute name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl std::fmt::Debug for ModelMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelMeta")
            .field("db_table", &self.db_table)
            .field("fields", &self.fields.iter().map(|fd| fd.name).collect::<Vec<_>>())
            .field("constraints", &self.constraints.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::LazyLock;

    use super::*;
    use crate::fields::FieldType;

    struct Note {
        id: Value,
        body: String,
    }

    impl Model for Note {
        fn meta() -> &'static ModelMeta {
            static META: LazyLock<ModelMeta> = LazyLock::new(|| {
                ModelMeta::new("notes", "note").fields(vec![
                    FieldDef::new("id", FieldType::BigAutoField).primary_key(),
                    FieldDef::new("body", FieldType::TextField),
                ])
            });
            &META
        }
        fn pk(&self) -> Option<&Value> {
            (!self.id.is_null()).then_some(&self.id)
        }
        fn set_pk(&mut self, value: Value) {
            self.id = value;
        }
        fn field_values(&self) -> FogResult<Vec<(&'static str, Value)>> {
            Ok(vec![("id", self.id.clone()), ("body", Value::from(self.body.as_str()))])
        }
        fn from_row(row: &Row) -> FogResult<Self> {
            Ok(Self {
                id: row.get("id")?,
                body: row.get("body")?,
            })
        }
        fn clean_fields(&mut self) -> Result<(), ValidationError> {
            if self.body.is_empty() {
                return Err(ValidationError::new("This field cannot be blank.", "blank")
                    .with_prefix("body"));
            }
            Ok(())
        }
        fn clean(&self) -> Result<(), ValidationError> {
            if self.body.len() > 10 {
                return Err(ValidationError::new("Too long.", "max_length"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_meta_defaults() {
        let meta = Note::meta();
        assert_eq!(Note::table_name(), "notes_note");
        assert_eq!(meta.label(), "notes.note");
        assert_eq!(meta.verbose_name, "note");
        assert!(meta.get_field("body").is_some());
        assert!(meta.get_field("nope").is_none());
    }

    #[test]
    fn test_non_pk_field_values() {
        let note = Note {
            id: Value::Int(1),
            body: "hi".into(),
        };
        let values = note.non_pk_field_values().unwrap();
        assert_eq!(values, vec![("body", Value::from("hi"))]);
    }

    #[test]
    fn test_full_clean_collects_field_and_model_errors() {
        let mut note = Note {
            id: Value::Null,
            body: String::new(),
        };
        let err = note.full_clean().unwrap_err();
        assert_eq!(err.messages(), vec!["body: This field cannot be blank.".to_string()]);

        note.body = "far too long a note".into();
        let err = note.full_clean().unwrap_err();
        assert!(err.errors_for(fields_of_gold_core::error::NON_FIELD_ERRORS).is_some());

        note.body = "ok".into();
        assert!(note.full_clean().is_ok());
    }
}
