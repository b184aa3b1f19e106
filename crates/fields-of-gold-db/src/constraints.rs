//! Database constraints for model-level integrity rules.
//!
//! [`CheckConstraint`] wraps a raw SQL condition. [`JsonRequiredKeysConstraint`]
//! is the storage-level guard of a `force_valid` structured column: the
//! storage engine itself rejects any write whose document is not an object or
//! lacks one of the schema's required keys.
//!
//! # Examples
//!
//! ```
//! use fields_of_gold_db::constraints::{CheckConstraint, Constraint, JsonRequiredKeysConstraint};
//! use fields_of_gold_db::sql::DatabaseBackendType;
//!
//! let check = CheckConstraint::new("age_non_negative", "\"age\" >= 0");
//! assert!(check.to_sql(DatabaseBackendType::SQLite).contains("CHECK"));
//!
//! let keys = JsonRequiredKeysConstraint::new("payload", vec!["my_int".into()], true);
//! let sql = keys.to_sql(DatabaseBackendType::SQLite);
//! assert!(sql.contains("json_extract(\"payload\", '$.\"my_int\"') IS NOT NULL"));
//! ```

use crate::fields::{FieldDef, FieldType};
use crate::sql::DatabaseBackendType;

/// Trait for all database constraint types.
///
/// Constraints generate SQL that is used inside CREATE TABLE statements or
/// ALTER TABLE ADD CONSTRAINT commands.
pub trait Constraint: std::fmt::Debug + Send + Sync {
    /// Returns the constraint name.
    fn name(&self) -> &str;

    /// Generates the constraint clause (`CONSTRAINT "name" CHECK (...)`) for `backend`.
    fn to_sql(&self, backend: DatabaseBackendType) -> String;

    /// Generates the SQL DDL for adding this constraint to an existing table.
    fn create_sql(&self, table: &str, backend: DatabaseBackendType) -> String {
        format!("ALTER TABLE \"{}\" ADD {}", table, self.to_sql(backend))
    }

    /// Generates the SQL DDL for removing this constraint from a table.
    fn drop_sql(&self, table: &str) -> String {
        format!(
            "ALTER TABLE \"{}\" DROP CONSTRAINT \"{}\"",
            table,
            self.name()
        )
    }
}

/// A boxed constraint, as stored in [`ModelMeta`](crate::model::ModelMeta).
pub type BoxedConstraint = Box<dyn Constraint>;

/// A CHECK constraint with a raw SQL condition.
#[derive(Debug, Clone)]
pub struct CheckConstraint {
    name: String,
    condition: String,
}

impl CheckConstraint {
    /// Creates a new check constraint.
    pub fn new(name: impl Into<String>, condition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            condition: condition.into(),
        }
    }

    /// Returns the SQL condition.
    pub fn condition(&self) -> &str {
        &self.condition
    }
}

impl Constraint for CheckConstraint {
    fn name(&self) -> &str {
        &self.name
    }

    fn to_sql(&self, _backend: DatabaseBackendType) -> String {
        format!("CONSTRAINT \"{}\" CHECK ({})", self.name, self.condition)
    }
}

/// CHECK that a JSON column holds an object with every required key present
/// and non-null.
///
/// Only presence is enforced. Type and value rules of the schema remain an
/// application-level concern.
#[derive(Debug, Clone)]
pub struct JsonRequiredKeysConstraint {
    name: String,
    column: String,
    required: Vec<String>,
    nullable: bool,
}

impl JsonRequiredKeysConstraint {
    /// Creates the constraint for `column`. A nullable column accepts NULL.
    pub fn new(column: impl Into<String>, required: Vec<String>, nullable: bool) -> Self {
        let column = column.into();
        Self {
            name: format!("{column}_force_valid"),
            column,
            required,
            nullable,
        }
    }

    /// Builds the constraint for a `force_valid` structured field, or `None`
    /// for any other field.
    pub fn for_field(field: &FieldDef) -> Option<Self> {
        match &field.field_type {
            FieldType::TypedJsonField {
                required,
                force_valid: true,
                ..
            } => Some(Self::new(field.column.clone(), required.clone(), field.null)),
            _ => None,
        }
    }

    /// Returns the keys the constraint requires.
    pub fn required(&self) -> &[String] {
        &self.required
    }

    /// Returns the bare CHECK condition for `backend`.
    pub fn condition_sql(&self, backend: DatabaseBackendType) -> String {
        let col = format!("\"{}\"", self.column);
        let mut terms = vec![match backend {
            DatabaseBackendType::SQLite => format!("json_type({col}) = 'object'"),
            DatabaseBackendType::PostgreSQL => format!("jsonb_typeof({col}) = 'object'"),
        }];
        for key in &self.required {
            let key = key.replace('\'', "''");
            terms.push(match backend {
                DatabaseBackendType::SQLite => {
                    format!("json_extract({col}, '$.\"{key}\"') IS NOT NULL")
                }
                DatabaseBackendType::PostgreSQL => format!("{col}->>'{key}' IS NOT NULL"),
            });
        }
        let all = terms.join(" AND ");
        // json_type() raises on malformed text, so SQLite checks validity first.
        let all = match backend {
            DatabaseBackendType::SQLite => {
                format!("CASE WHEN json_valid({col}) THEN {all} ELSE 0 END")
            }
            DatabaseBackendType::PostgreSQL => all,
        };
        if self.nullable {
            format!("{col} IS NULL OR ({all})")
        } else {
            all
        }
    }
}

impl Constraint for JsonRequiredKeysConstraint {
    fn name(&self) -> &str {
        &self.name
    }

    fn to_sql(&self, backend: DatabaseBackendType) -> String {
        format!(
            "CONSTRAINT \"{}\" CHECK ({})",
            self.name,
            self.condition_sql(backend)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_constraint_sql() {
        let c = CheckConstraint::new("positive", "\"n\" > 0");
        assert_eq!(c.name(), "positive");
        assert_eq!(c.condition(), "\"n\" > 0");
        assert_eq!(
            c.to_sql(DatabaseBackendType::PostgreSQL),
            "CONSTRAINT \"positive\" CHECK (\"n\" > 0)"
        );
        assert_eq!(
            c.create_sql("t", DatabaseBackendType::PostgreSQL),
            "ALTER TABLE \"t\" ADD CONSTRAINT \"positive\" CHECK (\"n\" > 0)"
        );
        assert_eq!(c.drop_sql("t"), "ALTER TABLE \"t\" DROP CONSTRAINT \"positive\"");
    }

    #[test]
    fn test_required_keys_sqlite() {
        let c = JsonRequiredKeysConstraint::new("data", vec!["a".into(), "b".into()], false);
        assert_eq!(
            c.condition_sql(DatabaseBackendType::SQLite),
            "CASE WHEN json_valid(\"data\") THEN json_type(\"data\") = 'object' \
             AND json_extract(\"data\", '$.\"a\"') IS NOT NULL \
             AND json_extract(\"data\", '$.\"b\"') IS NOT NULL ELSE 0 END"
        );
        assert_eq!(c.name(), "data_force_valid");
    }

    #[test]
    fn test_required_keys_postgres_nullable() {
        let c = JsonRequiredKeysConstraint::new("data", vec!["my_int".into()], true);
        assert_eq!(
            c.condition_sql(DatabaseBackendType::PostgreSQL),
            "\"data\" IS NULL OR (jsonb_typeof(\"data\") = 'object' AND \"data\"->>'my_int' IS NOT NULL)"
        );
    }

    #[test]
    fn test_required_keys_escapes_quotes() {
        let c = JsonRequiredKeysConstraint::new("d", vec!["o'k".into()], false);
        assert!(c
            .condition_sql(DatabaseBackendType::PostgreSQL)
            .contains("'o''k'"));
    }

    #[test]
    fn test_for_field() {
        let guarded = FieldDef::new(
            "payload",
            FieldType::TypedJsonField {
                schema: "Payload".into(),
                required: vec!["my_int".into()],
                force_valid: true,
            },
        );
        let c = JsonRequiredKeysConstraint::for_field(&guarded).unwrap();
        assert_eq!(c.required(), ["my_int".to_string()]);

        let unguarded = FieldDef::new(
            "payload",
            FieldType::TypedJsonField {
                schema: "Payload".into(),
                required: vec!["my_int".into()],
                force_valid: false,
            },
        );
        assert!(JsonRequiredKeysConstraint::for_field(&unguarded).is_none());
        assert!(JsonRequiredKeysConstraint::for_field(&FieldDef::new("x", FieldType::JsonField)).is_none());
    }
}
