//! DDL generation for model tables.
//!
//! [`SchemaEditor`] turns a [`ModelMeta`] into `CREATE TABLE` / `DROP TABLE`
//! statements for one SQL dialect. CHECK constraints are emitted inline so
//! that engines without `ALTER TABLE ... ADD CONSTRAINT` (SQLite) enforce them
//! too. A `force_valid` structured column contributes a
//! [`JsonRequiredKeysConstraint`] automatically.

use crate::constraints::{Constraint, JsonRequiredKeysConstraint};
use crate::fields::{FieldDef, FieldType};
use crate::model::ModelMeta;
use crate::sql::DatabaseBackendType;
use crate::value::Value;

/// Generates DDL for one backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaEditor {
    backend: DatabaseBackendType,
}

impl SchemaEditor {
    /// Creates an editor for `backend`.
    pub const fn new(backend: DatabaseBackendType) -> Self {
        Self { backend }
    }

    /// Returns the target backend.
    pub const fn backend_type(&self) -> DatabaseBackendType {
        self.backend
    }

    /// Generates `CREATE TABLE` DDL for a model.
    pub fn create_model_sql(&self, meta: &ModelMeta) -> Vec<String> {
        let mut parts: Vec<String> = Vec::new();
        let mut constraints: Vec<String> = Vec::new();

        for field in &meta.fields {
            parts.push(format!("\"{}\" {}", field.column, self.column_sql(field)));

            if let FieldType::ForeignKey { to, on_delete, .. }
            | FieldType::OneToOneField { to, on_delete, .. } = &field.field_type
            {
                constraints.push(format!(
                    "FOREIGN KEY (\"{}\") REFERENCES \"{}\" (\"id\") ON DELETE {}",
                    field.column,
                    fk_target_table(to),
                    on_delete.as_sql()
                ));
            }
            if let Some(check) = JsonRequiredKeysConstraint::for_field(field) {
                constraints.push(check.to_sql(self.backend));
            }
        }
        constraints.extend(meta.constraints.iter().map(|c| c.to_sql(self.backend)));

        parts.extend(constraints);
        vec![format!(
            "CREATE TABLE \"{}\" ({})",
            meta.db_table,
            parts.join(", ")
        )]
    }

    /// Generates `DROP TABLE` DDL for a model.
    pub fn delete_model_sql(&self, meta: &ModelMeta) -> Vec<String> {
        vec![format!("DROP TABLE IF EXISTS \"{}\"", meta.db_table)]
    }

    /// Generates the column definition fragment (type and column constraints).
    pub fn column_sql(&self, field: &FieldDef) -> String {
        let auto_pk = field.primary_key && field.field_type.is_auto();
        let type_str = match self.backend {
            DatabaseBackendType::SQLite => field.field_type.sqlite_column_type().to_string(),
            DatabaseBackendType::PostgreSQL => match (&field.field_type, field.max_length) {
                (FieldType::CharField, Some(n)) => format!("VARCHAR({n})"),
                (ft, _) => ft.pg_column_type().to_string(),
            },
        };
        let null_str = if field.primary_key {
            " PRIMARY KEY"
        } else if field.null {
            " NULL"
        } else {
            " NOT NULL"
        };
        let auto_str = match self.backend {
            DatabaseBackendType::SQLite if auto_pk => " AUTOINCREMENT",
            _ => "",
        };
        let unique_str = if field.unique && !field.primary_key {
            " UNIQUE"
        } else {
            ""
        };
        format!("{type_str}{null_str}{auto_str}{unique_str}{}", default_sql(field))
    }
}

/// Generates the default value SQL fragment for a field.
fn default_sql(field: &FieldDef) -> String {
    match &field.default {
        Some(Value::Null) => " DEFAULT NULL".to_string(),
        Some(Value::Bool(b)) => format!(" DEFAULT {}", if *b { "TRUE" } else { "FALSE" }),
        Some(Value::Int(i)) => format!(" DEFAULT {i}"),
        Some(Value::Float(f)) => format!(" DEFAULT {f}"),
        Some(Value::String(s)) => format!(" DEFAULT '{}'", s.replace('\'', "''")),
        Some(_) | None => String::new(),
    }
}

/// `"app_label.model_name"` -> `"app_label_model_name"`
fn fk_target_table(to: &str) -> String {
    to.replace('.', "_")
}
