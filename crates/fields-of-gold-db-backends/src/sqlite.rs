//! SQLite database backend using `rusqlite`.
//!
//! This module provides the [`SqliteBackend`] which implements the
//! [`DatabaseBackend`](crate::base::DatabaseBackend) trait using `rusqlite`
//! wrapped in `tokio::task::spawn_blocking` for async compatibility.
//!
//! Features:
//! - WAL mode and foreign keys enabled on open
//! - In-memory database support via `:memory:` path (great for testing)
//! - Simple `Mutex`-based concurrency control
//! - Constraint violations (CHECK, UNIQUE, FOREIGN KEY, NOT NULL) are reported
//!   as [`FogError::IntegrityError`]

use std::path::PathBuf;
use std::sync::Arc;

use fields_of_gold_core::{FogError, FogResult};
use fields_of_gold_db::sql::{DatabaseBackendType, Row};
use fields_of_gold_db::value::Value;
use rusqlite::ErrorCode;
use tokio::sync::Mutex;

use crate::base::{DatabaseBackend, DatabaseConfig};

/// A SQLite database backend.
///
/// Uses `rusqlite` for database access with a `Mutex`-based concurrency
/// model. All operations are run via `tokio::task::spawn_blocking` to
/// avoid blocking the async runtime.
pub struct SqliteBackend {
    /// The path to the database file (or ":memory:").
    path: PathBuf,
    /// The connection, guarded by an async mutex.
    conn: Arc<Mutex<rusqlite::Connection>>,
}

impl SqliteBackend {
    /// Opens a new SQLite database at the given path.
    ///
    /// If the path is `:memory:`, an in-memory database is created.
    ///
    /// # Errors
    ///
    /// Returns `OperationalError` if the database cannot be opened.
    pub fn open(path: impl Into<PathBuf>) -> FogResult<Self> {
        let path = path.into();
        let conn = if path.to_str() == Some(":memory:") {
            rusqlite::Connection::open_in_memory()
        } else {
            rusqlite::Connection::open(&path)
        }
        .map_err(|e| FogError::OperationalError(format!("SQLite open failed: {e}")))?;

        // journal_mode reports the resulting mode as a row.
        conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))
            .and_then(|()| conn.execute_batch("PRAGMA foreign_keys=ON;"))
            .map_err(|e| FogError::OperationalError(format!("Failed to set pragmas: {e}")))?;

        tracing::debug!(path = %path.display(), "sqlite database opened");
        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Opens an in-memory database (convenience constructor).
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn memory() -> FogResult<Self> {
        Self::open(":memory:")
    }

    /// Opens the database named by `config`.
    ///
    /// # Errors
    ///
    /// Returns `ImproperlyConfigured` if `config` is not a SQLite configuration.
    pub fn from_config(config: &DatabaseConfig) -> FogResult<Self> {
        if config.backend != DatabaseBackendType::SQLite {
            return Err(FogError::ImproperlyConfigured(format!(
                "SqliteBackend cannot open a {:?} database",
                config.backend
            )));
        }
        Self::open(config.name.as_str())
    }

    /// Returns the database file path.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Binds ORM `Value` types to a `rusqlite` statement.
    fn bind_params(stmt: &mut rusqlite::Statement<'_>, params: &[Value]) -> FogResult<()> {
        for (i, param) in params.iter().enumerate() {
            let idx = i + 1;
            match param {
                Value::Null => stmt.raw_bind_parameter(idx, rusqlite::types::Null),
                Value::Bool(b) => stmt.raw_bind_parameter(idx, b),
                Value::Int(v) => stmt.raw_bind_parameter(idx, v),
                Value::Float(v) => stmt.raw_bind_parameter(idx, v),
                Value::String(s) => stmt.raw_bind_parameter(idx, s.as_str()),
                Value::Bytes(b) => stmt.raw_bind_parameter(idx, b.as_slice()),
                Value::Date(d) => stmt.raw_bind_parameter(idx, d.to_string().as_str()),
                Value::DateTime(dt) => stmt.raw_bind_parameter(idx, dt.to_string().as_str()),
                Value::DateTimeTz(dt) => stmt.raw_bind_parameter(idx, dt.to_rfc3339().as_str()),
                Value::Time(t) => stmt.raw_bind_parameter(idx, t.to_string().as_str()),
                Value::Uuid(u) => stmt.raw_bind_parameter(idx, u.to_string().as_str()),
                Value::Json(j) => stmt.raw_bind_parameter(idx, j.to_string().as_str()),
            }
            .map_err(|e| FogError::DatabaseError(format!("Bind error: {e}")))?;
        }
        Ok(())
    }

    /// Converts a `rusqlite::Row` to our generic `Row`.
    fn convert_row(sqlite_row: &rusqlite::Row<'_>, column_names: &[String]) -> FogResult<Row> {
        let values: Vec<Value> = (0..column_names.len())
            .map(|i| {
                match sqlite_row.get_ref(i).unwrap_or(rusqlite::types::ValueRef::Null) {
                    rusqlite::types::ValueRef::Null => Value::Null,
                    rusqlite::types::ValueRef::Integer(v) => Value::Int(v),
                    rusqlite::types::ValueRef::Real(v) => Value::Float(v),
                    rusqlite::types::ValueRef::Text(b) => {
                        Value::String(String::from_utf8_lossy(b).to_string())
                    }
                    rusqlite::types::ValueRef::Blob(b) => Value::Bytes(b.to_vec()),
                }
            })
            .collect();

        Row::new(column_names.to_vec(), values)
    }

    fn run(conn: &rusqlite::Connection, sql: &str, params: &[Value]) -> FogResult<usize> {
        tracing::trace!(sql, params = params.len(), "execute");
        let mut stmt = conn.prepare(sql).map_err(map_error)?;
        Self::bind_params(&mut stmt, params)?;
        stmt.raw_execute().map_err(map_error)
    }
}

/// Maps a driver error onto the error taxonomy.
fn map_error(e: rusqlite::Error) -> FogError {
    match e {
        rusqlite::Error::SqliteFailure(ref err, _) if err.code == ErrorCode::ConstraintViolation => {
            FogError::IntegrityError(e.to_string())
        }
        rusqlite::Error::SqliteFailure(ref err, _)
            if matches!(err.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
        {
            FogError::OperationalError(e.to_string())
        }
        other => FogError::DatabaseError(other.to_string()),
    }
}

#[async_trait::async_trait]
impl DatabaseBackend for SqliteBackend {
    fn vendor(&self) -> &str {
        "sqlite"
    }

    fn backend_type(&self) -> DatabaseBackendType {
        DatabaseBackendType::SQLite
    }

    async fn execute(&self, sql: &str, params: &[Value]) -> FogResult<u64> {
        let conn = self.conn.clone();
        let sql = sql.to_string();
        let params = params.to_vec();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            let count = Self::run(&conn, &sql, &params)?;
            Ok(count as u64)
        })
        .await
        .map_err(|e| FogError::DatabaseError(format!("Task join error: {e}")))?
    }

    async fn query(&self, sql: &str, params: &[Value]) -> FogResult<Vec<Row>> {
        let conn = self.conn.clone();
        let sql = sql.to_string();
        let params = params.to_vec();

        tokio::task::spawn_blocking(move || {
            tracing::trace!(sql = %sql, params = params.len(), "query");
            let conn = conn.blocking_lock();
            let mut stmt = conn.prepare(&sql).map_err(map_error)?;

            let column_names: Vec<String> =
                stmt.column_names().into_iter().map(String::from).collect();

            Self::bind_params(&mut stmt, &params)?;

            let mut raw_rows = stmt.raw_query();
            let mut rows = Vec::new();
            while let Some(row) = raw_rows.next().map_err(map_error)? {
                rows.push(Self::convert_row(row, &column_names)?);
            }
            Ok(rows)
        })
        .await
        .map_err(|e| FogError::DatabaseError(format!("Task join error: {e}")))?
    }

    async fn query_one(&self, sql: &str, params: &[Value]) -> FogResult<Row> {
        let rows = DatabaseBackend::query(self, sql, params).await?;
        let count = rows.len();
        let mut rows = rows.into_iter();
        match (rows.next(), rows.next()) {
            (Some(row), None) => Ok(row),
            (None, _) => Err(FogError::DoesNotExist("No rows returned".to_string())),
            _ => Err(FogError::MultipleObjectsReturned(format!(
                "Expected 1 row, got {count}"
            ))),
        }
    }
}

#[async_trait::async_trait]
impl fields_of_gold_db::DbExecutor for SqliteBackend {
    fn backend_type(&self) -> DatabaseBackendType {
        DatabaseBackendType::SQLite
    }

    async fn execute_sql(&self, sql: &str, params: &[Value]) -> FogResult<u64> {
        self.execute(sql, params).await
    }

    async fn query(&self, sql: &str, params: &[Value]) -> FogResult<Vec<Row>> {
        DatabaseBackend::query(self, sql, params).await
    }

    async fn query_one(&self, sql: &str, params: &[Value]) -> FogResult<Row> {
        DatabaseBackend::query_one(self, sql, params).await
    }

    async fn insert_returning_id(&self, sql: &str, params: &[Value]) -> FogResult<Value> {
        let conn = self.conn.clone();
        let sql = sql.to_string();
        let params = params.to_vec();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            Self::run(&conn, &sql, &params)?;
            Ok(Value::Int(conn.last_insert_rowid()))
        })
        .await
        .map_err(|e| FogError::DatabaseError(format!("Task join error: {e}")))?
    }
}
