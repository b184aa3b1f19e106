//! Row access and SQL statement compilation.
//!
//! [`SqlCompiler`] produces the parameterized statements used by the model
//! CRUD functions. PostgreSQL uses `$1, $2, ...` placeholders; `SQLite` uses
//! `?`.

use fields_of_gold_core::{FogError, FogResult};

use crate::value::Value;

/// The type of database backend, used by the compiler to generate
/// backend-specific SQL syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackendType {
    /// PostgreSQL (uses `$1, $2, ...` placeholders).
    PostgreSQL,
    /// `SQLite` (uses `?` placeholders).
    SQLite,
}

/// A generic database row for passing data between backends and the ORM.
///
/// `Row` holds a list of column names and their corresponding values. It
/// provides typed access via the [`get`](Row::get) method.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Creates a new row from column names and values.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if the number of columns does not match the
    /// number of values.
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> FogResult<Self> {
        if columns.len() != values.len() {
            return Err(FogError::DatabaseError(format!(
                "Row has {} columns but {} values",
                columns.len(),
                values.len()
            )));
        }
        Ok(Self { columns, values })
    }

    /// Returns the column names.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Returns the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Returns `true` if the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Gets a typed value by column name.
    ///
    /// # Errors
    ///
    /// Returns an error if the column does not exist or the value cannot be
    /// converted to the requested type.
    pub fn get<T: FromValue>(&self, column: &str) -> FogResult<T> {
        let value = self.get_value(column).ok_or_else(|| {
            FogError::DatabaseError(format!("Column '{column}' not found in row"))
        })?;
        T::from_value(value)
    }

    /// Returns a reference to the raw Value at the given column name.
    pub fn get_value(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }
}

/// Trait for converting a [`Value`] to a concrete Rust type.
pub trait FromValue: Sized {
    /// Attempts to convert a value reference to this type.
    fn from_value(value: &Value) -> FogResult<Self>;
}

fn mismatch(expected: &str, value: &Value) -> FogError {
    FogError::DatabaseError(format!("Expected {expected}, got {}", value.kind()))
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> FogResult<Self> {
        match value {
            Value::Int(i) => Ok(*i),
            _ => Err(mismatch("Int", value)),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> FogResult<Self> {
        match value {
            Value::Int(i) => Self::try_from(*i).map_err(|e| {
                FogError::DatabaseError(format!("Int value out of i32 range: {e}"))
            }),
            _ => Err(mismatch("Int", value)),
        }
    }
}

impl FromValue for f64 {
    #[allow(clippy::cast_precision_loss)]
    fn from_value(value: &Value) -> FogResult<Self> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as Self),
            _ => Err(mismatch("Float", value)),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> FogResult<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            // SQLite stores booleans as 0/1.
            Value::Int(i) => Ok(*i != 0),
            _ => Err(mismatch("Bool", value)),
        }
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> FogResult<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            _ => Err(mismatch("String", value)),
        }
    }
}

impl FromValue for uuid::Uuid {
    fn from_value(value: &Value) -> FogResult<Self> {
        match value {
            Value::Uuid(u) => Ok(*u),
            Value::String(s) => Self::parse_str(s)
                .map_err(|e| FogError::DatabaseError(format!("Invalid UUID '{s}': {e}"))),
            _ => Err(mismatch("Uuid", value)),
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> FogResult<Self> {
        Ok(value.clone())
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> FogResult<Self> {
        match value {
            Value::Null => Ok(None),
            _ => T::from_value(value).map(Some),
        }
    }
}

/// Compiles single-table statements into parameterized SQL.
pub struct SqlCompiler {
    backend: DatabaseBackendType,
}

impl SqlCompiler {
    /// Creates a new compiler for the given backend type.
    pub const fn new(backend: DatabaseBackendType) -> Self {
        Self { backend }
    }

    /// Returns a parameter placeholder for the given 1-based index.
    fn placeholder(&self, index: usize) -> String {
        match self.backend {
            DatabaseBackendType::PostgreSQL => format!("${index}"),
            DatabaseBackendType::SQLite => "?".to_string(),
        }
    }

    /// Compiles an INSERT statement.
    ///
    /// With no fields, every column takes its default.
    pub fn compile_insert(&self, table: &str, fields: &[(&str, Value)]) -> (String, Vec<Value>) {
        if fields.is_empty() {
            return (format!("INSERT INTO \"{table}\" DEFAULT VALUES"), Vec::new());
        }
        let columns: Vec<String> = fields.iter().map(|(name, _)| format!("\"{name}\"")).collect();
        let placeholders: Vec<String> = (1..=fields.len()).map(|i| self.placeholder(i)).collect();
        let params = fields.iter().map(|(_, val)| val.clone()).collect();

        let sql = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders.join(", ")
        );
        (sql, params)
    }

    /// Compiles an UPDATE of `fields` on the row where `key_column = key`.
    pub fn compile_update(
        &self,
        table: &str,
        fields: &[(&str, Value)],
        key_column: &str,
        key: &Value,
    ) -> (String, Vec<Value>) {
        let mut params: Vec<Value> = Vec::with_capacity(fields.len() + 1);
        let set_parts: Vec<String> = fields
            .iter()
            .enumerate()
            .map(|(i, (name, val))| {
                params.push(val.clone());
                format!("\"{name}\" = {}", self.placeholder(i + 1))
            })
            .collect();
        params.push(key.clone());

        let sql = format!(
            "UPDATE \"{}\" SET {} WHERE \"{}\" = {}",
            table,
            set_parts.join(", "),
            key_column,
            self.placeholder(fields.len() + 1)
        );
        (sql, params)
    }

    /// Compiles a `SELECT *` of the rows where `column = value`.
    pub fn compile_select_by(
        &self,
        table: &str,
        column: &str,
        value: &Value,
        limit: Option<usize>,
    ) -> (String, Vec<Value>) {
        let mut sql = format!(
            "SELECT * FROM \"{table}\" WHERE \"{column}\" = {}",
            self.placeholder(1)
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        (sql, vec![value.clone()])
    }

    /// Compiles a DELETE of the rows where `column = value`.
    pub fn compile_delete(&self, table: &str, column: &str, value: &Value) -> (String, Vec<Value>) {
        (
            format!(
                "DELETE FROM \"{table}\" WHERE \"{column}\" = {}",
                self.placeholder(1)
            ),
            vec![value.clone()],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pg() -> SqlCompiler {
        SqlCompiler::new(DatabaseBackendType::PostgreSQL)
    }

    fn sqlite() -> SqlCompiler {
        SqlCompiler::new(DatabaseBackendType::SQLite)
    }

    #[test]
    fn test_insert_pg() {
        let (sql, params) = pg().compile_insert(
            "dogs_dog",
            &[("name", Value::from("Rex")), ("owner_id", Value::Null)],
        );
        assert_eq!(
            sql,
            "INSERT INTO \"dogs_dog\" (\"name\", \"owner_id\") VALUES ($1, $2)"
        );
        assert_eq!(params, vec![Value::from("Rex"), Value::Null]);
    }

    #[test]
    fn test_insert_sqlite() {
        let (sql, _) = sqlite().compile_insert("t", &[("a", Value::Int(1))]);
        assert_eq!(sql, "INSERT INTO \"t\" (\"a\") VALUES (?)");
    }

    #[test]
    fn test_insert_default_values() {
        let (sql, params) = sqlite().compile_insert("dogs_human", &[]);
        assert_eq!(sql, "INSERT INTO \"dogs_human\" DEFAULT VALUES");
        assert!(params.is_empty());
    }

    #[test]
    fn test_update() {
        let (sql, params) = pg().compile_update(
            "t",
            &[("a", Value::Int(1)), ("b", Value::from("x"))],
            "id",
            &Value::Int(7),
        );
        assert_eq!(sql, "UPDATE \"t\" SET \"a\" = $1, \"b\" = $2 WHERE \"id\" = $3");
        assert_eq!(params.len(), 3);
        assert_eq!(params[2], Value::Int(7));
    }

    #[test]
    fn test_select_by() {
        let (sql, params) = sqlite().compile_select_by("t", "owner_id", &Value::Int(3), Some(2));
        assert_eq!(sql, "SELECT * FROM \"t\" WHERE \"owner_id\" = ? LIMIT 2");
        assert_eq!(params, vec![Value::Int(3)]);
    }

    #[test]
    fn test_delete() {
        let (sql, _) = pg().compile_delete("t", "id", &Value::Int(1));
        assert_eq!(sql, "DELETE FROM \"t\" WHERE \"id\" = $1");
    }

    #[test]
    fn test_row_get() {
        let row = Row::new(
            vec!["id".into(), "name".into(), "flag".into(), "bio".into()],
            vec![Value::Int(1), Value::from("Rex"), Value::Int(1), Value::Null],
        )
        .unwrap();
        assert_eq!(row.len(), 4);
        assert!(!row.is_empty());
        assert_eq!(row.get::<i64>("id").unwrap(), 1);
        assert_eq!(row.get::<String>("name").unwrap(), "Rex");
        assert!(row.get::<bool>("flag").unwrap());
        assert_eq!(row.get::<Option<String>>("bio").unwrap(), None);
        assert!(row.get::<i64>("missing").is_err());
        assert!(row.get::<i64>("name").is_err());
    }

    #[test]
    fn test_row_count_mismatch_is_an_error() {
        let err = Row::new(vec!["a".into()], vec![]).unwrap_err();
        assert!(matches!(err, FogError::DatabaseError(ref m) if m.contains("1 columns but 0 values")));
    }

    #[test]
    fn test_uuid_from_text() {
        let u = uuid::Uuid::new_v4();
        let parsed = uuid::Uuid::from_value(&Value::String(u.to_string())).unwrap();
        assert_eq!(parsed, u);
    }
}
