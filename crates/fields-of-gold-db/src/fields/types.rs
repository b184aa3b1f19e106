//! Field type definitions for the ORM.
//!
//! Each [`FieldType`] variant corresponds to a column kind, and [`FieldDef`]
//! captures all metadata about a single model field. Structured JSON columns
//! and the one-to-one variants carry the extra metadata the schema editor
//! needs to emit their storage constraints.

use std::collections::BTreeMap;

use crate::value::Value;

/// The type of a model field, determining its SQL column type and behavior.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type")]
pub enum FieldType {
    /// Auto-incrementing 32-bit integer primary key.
    AutoField,
    /// Auto-incrementing 64-bit integer primary key.
    BigAutoField,
    /// Variable-length string with a max length.
    CharField,
    /// Unlimited-length text.
    TextField,
    /// 32-bit signed integer.
    IntegerField,
    /// 64-bit signed integer.
    BigIntegerField,
    /// 64-bit floating-point number.
    FloatField,
    /// Boolean (true/false).
    BooleanField,
    /// Date without time.
    DateField,
    /// Date and time.
    DateTimeField,
    /// Time without date.
    TimeField,
    /// UUID field.
    UuidField,
    /// Raw binary data.
    BinaryField,
    /// Untyped JSON document.
    JsonField,
    /// JSON document bound to a registered schema.
    TypedJsonField {
        /// The registered schema name.
        schema: String,
        /// Top-level keys the schema requires to be present and non-null.
        required: Vec<String>,
        /// Whether a storage-level CHECK constraint guards the column.
        force_valid: bool,
    },
    /// Many-to-one relationship.
    ForeignKey {
        /// The target model name (e.g. "dogs.Human").
        to: String,
        /// Behavior when the referenced object is deleted.
        on_delete: OnDelete,
        /// The name used for the reverse relation.
        related_name: Option<String>,
    },
    /// One-to-one relationship (unique foreign key).
    OneToOneField {
        /// The target model name.
        to: String,
        /// Behavior when the referenced object is deleted.
        on_delete: OnDelete,
        /// The name used for the reverse relation.
        related_name: Option<String>,
        /// How the accessors treat a missing related row.
        kind: OneToOneKind,
    },
}

/// Behavior when a referenced object is deleted (ON DELETE action).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum OnDelete {
    /// Delete all related objects (CASCADE).
    Cascade,
    /// Prevent deletion if related objects exist (PROTECT).
    Protect,
    /// Set the foreign key to NULL.
    SetNull,
    /// Set the foreign key to its default value.
    SetDefault,
    /// Take no action (may cause integrity errors).
    DoNothing,
}

impl OnDelete {
    /// Returns the SQL `ON DELETE` action.
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Cascade => "CASCADE",
            Self::Protect | Self::DoNothing => "NO ACTION",
            Self::SetNull => "SET NULL",
            Self::SetDefault => "SET DEFAULT",
        }
    }
}

/// How a one-to-one relation's accessors treat a missing related row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum OneToOneKind {
    /// Every access that misses performs a new lookup and fails.
    #[default]
    Standard,
    /// The reverse accessor remembers a miss and re-raises it without a lookup.
    Smart,
    /// The reverse accessor remembers a miss and returns `None`.
    OneOrNone,
    /// Nullable in both directions: the key column is nullable, unique and
    /// optional, and both accessors return `None` on a miss.
    Nullable,
}

impl OneToOneKind {
    /// Returns the class path used in deconstructed field configuration.
    pub const fn path(self) -> &'static str {
        match self {
            Self::Standard => "fields_of_gold.db.models.OneToOneField",
            Self::Smart => "fields_of_gold.fields.SmartOneToOneField",
            Self::OneOrNone => "fields_of_gold.fields.OneOrNoneToOneField",
            Self::Nullable => "fields_of_gold.fields.NullableOneToOneField",
        }
    }

    /// Returns `true` if the reverse accessor memoizes a miss.
    pub const fn caches_miss(self) -> bool {
        !matches!(self, Self::Standard)
    }

    /// Returns `true` if a miss surfaces as `None` rather than an error.
    pub const fn miss_is_none(self) -> bool {
        matches!(self, Self::OneOrNone | Self::Nullable)
    }
}

/// Complete definition of a model field, including metadata and constraints.
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// The attribute name of this field.
    pub name: &'static str,
    /// The database column name (may differ from `name`).
    pub column: String,
    /// The type of this field.
    pub field_type: FieldType,
    /// Whether this field is the primary key.
    pub primary_key: bool,
    /// Whether NULL is allowed in the database.
    pub null: bool,
    /// Whether the field may be left blank during validation.
    pub blank: bool,
    /// Default value for new instances.
    pub default: Option<Value>,
    /// Whether a UNIQUE constraint is applied.
    pub unique: bool,
    /// Whether a database index should be created.
    pub db_index: bool,
    /// Maximum character length (for `CharField`).
    pub max_length: Option<usize>,
    /// Human-readable name for the field.
    pub verbose_name: String,
    /// Whether the field is editable.
    pub editable: bool,
}

impl FieldDef {
    /// Creates a new `FieldDef` with sensible defaults.
    ///
    /// Only the field name and type are required. All other attributes take
    /// their default values (non-null, no index, editable, etc.).
    pub fn new(name: &'static str, field_type: FieldType) -> Self {
        Self {
            name,
            column: name.to_string(),
            field_type,
            primary_key: false,
            null: false,
            blank: false,
            default: None,
            unique: false,
            db_index: false,
            max_length: None,
            verbose_name: name.replace('_', " "),
            editable: true,
        }
    }

    /// Sets the database column name.
    #[must_use]
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    /// Marks this field as the primary key.
    #[must_use]
    pub const fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Allows NULL values in the database.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.null = true;
        self
    }

    /// Allows the field to be left blank.
    #[must_use]
    pub const fn blank(mut self) -> Self {
        self.blank = true;
        self
    }

    /// Sets the maximum character length.
    #[must_use]
    pub const fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    /// Marks this field as having a database index.
    #[must_use]
    pub const fn db_index(mut self) -> Self {
        self.db_index = true;
        self
    }

    /// Marks this field as having a UNIQUE constraint.
    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Sets the default value for this field.
    #[must_use]
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Sets the verbose (human-readable) name.
    #[must_use]
    pub fn verbose_name(mut self, name: impl Into<String>) -> Self {
        self.verbose_name = name.into();
        self
    }

    /// Returns `true` if this field represents a relational field.
    pub const fn is_relation(&self) -> bool {
        matches!(
            self.field_type,
            FieldType::ForeignKey { .. } | FieldType::OneToOneField { .. }
        )
    }

    /// Returns the field's configuration in the form used by schema tooling.
    ///
    /// Only options that differ from their defaults are recorded.
    pub fn deconstruct(&self) -> Deconstructed {
        let mut kwargs = BTreeMap::new();
        if self.primary_key {
            kwargs.insert("primary_key".to_string(), serde_json::Value::Bool(true));
        }
        if self.null {
            kwargs.insert("null".to_string(), serde_json::Value::Bool(true));
        }
        if self.blank {
            kwargs.insert("blank".to_string(), serde_json::Value::Bool(true));
        }
        if self.unique {
            kwargs.insert("unique".to_string(), serde_json::Value::Bool(true));
        }
        if self.db_index {
            kwargs.insert("db_index".to_string(), serde_json::Value::Bool(true));
        }
        if let Some(max_length) = self.max_length {
            kwargs.insert("max_length".to_string(), serde_json::json!(max_length));
        }
        if self.column != self.name {
            kwargs.insert("db_column".to_string(), serde_json::json!(self.column));
        }
        match &self.field_type {
            FieldType::TypedJsonField {
                schema,
                force_valid,
                ..
            } => {
                kwargs.insert("schema".to_string(), serde_json::json!(schema));
                if *force_valid {
                    kwargs.insert("force_valid".to_string(), serde_json::Value::Bool(true));
                }
            }
            FieldType::ForeignKey {
                to,
                on_delete,
                related_name,
            }
            | FieldType::OneToOneField {
                to,
                on_delete,
                related_name,
                ..
            } => {
                kwargs.insert("to".to_string(), serde_json::json!(to));
                kwargs.insert("on_delete".to_string(), serde_json::json!(on_delete));
                if let Some(related_name) = related_name {
                    kwargs.insert("related_name".to_string(), serde_json::json!(related_name));
                }
            }
            _ => {}
        }
        Deconstructed {
            name: self.name.to_string(),
            path: self.field_type.path().to_string(),
            args: Vec::new(),
            kwargs,
        }
    }
}

impl FieldType {
    /// Returns the class path recorded when the field is deconstructed.
    pub fn path(&self) -> String {
        let class = match self {
            Self::AutoField => "AutoField",
            Self::BigAutoField => "BigAutoField",
            Self::CharField => "CharField",
            Self::TextField => "TextField",
            Self::IntegerField => "IntegerField",
            Self::BigIntegerField => "BigIntegerField",
            Self::FloatField => "FloatField",
            Self::BooleanField => "BooleanField",
            Self::DateField => "DateField",
            Self::DateTimeField => "DateTimeField",
            Self::TimeField => "TimeField",
            Self::UuidField => "UUIDField",
            Self::BinaryField => "BinaryField",
            Self::JsonField => "JSONField",
            Self::TypedJsonField { .. } => return "fields_of_gold.fields.TypedJSONField".to_string(),
            Self::ForeignKey { .. } => "ForeignKey",
            Self::OneToOneField { kind, .. } => return kind.path().to_string(),
        };
        format!("fields_of_gold.db.models.{class}")
    }

    /// Returns the SQL column type on PostgreSQL.
    pub fn pg_column_type(&self) -> &'static str {
        match self {
            Self::AutoField => "SERIAL",
            Self::BigAutoField => "BIGSERIAL",
            Self::CharField => "VARCHAR",
            Self::TextField => "TEXT",
            Self::IntegerField => "INTEGER",
            Self::BigIntegerField | Self::ForeignKey { .. } | Self::OneToOneField { .. } => {
                "BIGINT"
            }
            Self::FloatField => "DOUBLE PRECISION",
            Self::BooleanField => "BOOLEAN",
            Self::DateField => "DATE",
            Self::DateTimeField => "TIMESTAMP",
            Self::TimeField => "TIME",
            Self::UuidField => "UUID",
            Self::BinaryField => "BYTEA",
            Self::JsonField | Self::TypedJsonField { .. } => "JSONB",
        }
    }

    /// Returns the SQL column type on `SQLite`.
    pub const fn sqlite_column_type(&self) -> &'static str {
        match self {
            Self::AutoField
            | Self::BigAutoField
            | Self::IntegerField
            | Self::BigIntegerField
            | Self::BooleanField
            | Self::ForeignKey { .. }
            | Self::OneToOneField { .. } => "INTEGER",
            Self::FloatField => "REAL",
            Self::BinaryField => "BLOB",
            _ => "TEXT",
        }
    }

    /// Returns `true` for auto-incrementing primary key types.
    pub const fn is_auto(&self) -> bool {
        matches!(self, Self::AutoField | Self::BigAutoField)
    }
}

/// A field's configuration, reduced to plain data for schema tooling.
///
/// Feeding a `Deconstructed` back into the field's constructor yields an
/// equivalent field.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Deconstructed {
    /// The field's attribute name.
    pub name: String,
    /// The dotted class path of the field type.
    pub path: String,
    /// Positional arguments.
    pub args: Vec<serde_json::Value>,
    /// Keyword arguments that differ from their defaults.
    pub kwargs: BTreeMap<String, serde_json::Value>,
}

impl Deconstructed {
    /// Returns a boolean keyword argument, `false` when absent.
    pub fn flag(&self, key: &str) -> bool {
        self.kwargs
            .get(key)
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
    }

    /// Returns a string keyword argument.
    pub fn string(&self, key: &str) -> Option<&str> {
        self.kwargs.get(key).and_then(serde_json::Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_def_new_defaults() {
        let f = FieldDef::new("first_name", FieldType::CharField);
        assert_eq!(f.name, "first_name");
        assert_eq!(f.column, "first_name");
        assert!(!f.primary_key);
        assert!(!f.null);
        assert!(!f.blank);
        assert!(f.default.is_none());
        assert!(!f.unique);
        assert!(f.editable);
        assert_eq!(f.verbose_name, "first name");
    }

    #[test]
    fn test_field_def_builder() {
        let f = FieldDef::new("name", FieldType::CharField)
            .column("full_name")
            .unique()
            .db_index()
            .blank()
            .max_length(254)
            .verbose_name("Name");
        assert_eq!(f.column, "full_name");
        assert!(f.unique);
        assert!(f.db_index);
        assert!(f.blank);
        assert_eq!(f.max_length, Some(254));
        assert_eq!(f.verbose_name, "Name");
    }

    #[test]
    fn test_field_def_default() {
        let f = FieldDef::new("active", FieldType::BooleanField).default(Value::Bool(true));
        assert_eq!(f.default, Some(Value::Bool(true)));
    }

    #[test]
    fn test_field_def_is_relation() {
        let o2o = FieldDef::new(
            "owner",
            FieldType::OneToOneField {
                to: "dogs.Human".into(),
                on_delete: OnDelete::Cascade,
                related_name: Some("dog".into()),
                kind: OneToOneKind::Smart,
            },
        );
        assert!(o2o.is_relation());
        assert!(!FieldDef::new("title", FieldType::CharField).is_relation());
    }

    #[test]
    fn test_one_to_one_kind_behaviour() {
        assert!(!OneToOneKind::Standard.caches_miss());
        assert!(OneToOneKind::Smart.caches_miss());
        assert!(!OneToOneKind::Smart.miss_is_none());
        assert!(OneToOneKind::OneOrNone.miss_is_none());
        assert!(OneToOneKind::Nullable.miss_is_none());
    }

    #[test]
    fn test_column_types() {
        assert_eq!(FieldType::BigAutoField.pg_column_type(), "BIGSERIAL");
        assert_eq!(FieldType::JsonField.pg_column_type(), "JSONB");
        let typed = FieldType::TypedJsonField {
            schema: "Payload".into(),
            required: vec![],
            force_valid: false,
        };
        assert_eq!(typed.pg_column_type(), "JSONB");
        assert_eq!(typed.sqlite_column_type(), "TEXT");
        assert_eq!(FieldType::BooleanField.sqlite_column_type(), "INTEGER");
        assert_eq!(FieldType::FloatField.sqlite_column_type(), "REAL");
        assert!(FieldType::AutoField.is_auto());
        assert!(!FieldType::IntegerField.is_auto());
    }

    #[test]
    fn test_on_delete_sql() {
        assert_eq!(OnDelete::Cascade.as_sql(), "CASCADE");
        assert_eq!(OnDelete::SetNull.as_sql(), "SET NULL");
    }

    #[test]
    fn test_deconstruct_only_non_defaults() {
        let d = FieldDef::new("title", FieldType::CharField)
            .max_length(200)
            .deconstruct();
        assert_eq!(d.name, "title");
        assert_eq!(d.path, "fields_of_gold.db.models.CharField");
        assert_eq!(d.kwargs.len(), 1);
        assert_eq!(d.kwargs["max_length"], serde_json::json!(200));
        assert!(!d.flag("null"));
    }

    #[test]
    fn test_deconstruct_relation() {
        let d = FieldDef::new(
            "owner",
            FieldType::OneToOneField {
                to: "dogs.Human".into(),
                on_delete: OnDelete::Cascade,
                related_name: None,
                kind: OneToOneKind::OneOrNone,
            },
        )
        .column("owner_id")
        .deconstruct();
        assert_eq!(d.path, "fields_of_gold.fields.OneOrNoneToOneField");
        assert_eq!(d.string("to"), Some("dogs.Human"));
        assert_eq!(d.string("db_column"), Some("owner_id"));
        assert!(!d.kwargs.contains_key("related_name"));
    }
}
