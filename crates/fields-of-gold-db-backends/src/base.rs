//! Base database backend trait and connection configuration.
//!
//! This module defines the [`DatabaseBackend`] trait that all backend
//! implementations must satisfy, and [`DatabaseConfig`], built from the
//! `databases` section of the settings.

use std::collections::HashMap;
use std::sync::Arc;

use fields_of_gold_core::settings::DatabaseSettings;
use fields_of_gold_core::{FogError, FogResult};
use fields_of_gold_db::sql::{DatabaseBackendType, Row, SqlCompiler};
use fields_of_gold_db::value::Value;
use fields_of_gold_db::DbExecutor;

/// The core trait for database backends.
///
/// All methods are async because database operations are I/O-bound. Backends
/// with synchronous drivers (like `rusqlite`) wrap operations in
/// `spawn_blocking` to keep the async interface.
///
/// A storage constraint violation (a failed `force_valid` CHECK, a duplicate
/// one-to-one key) must surface as [`FogError::IntegrityError`].
#[async_trait::async_trait]
pub trait DatabaseBackend: Send + Sync {
    /// Returns the vendor name (e.g., "sqlite").
    fn vendor(&self) -> &str;

    /// Returns the backend type enum for use with the SQL compiler.
    fn backend_type(&self) -> DatabaseBackendType;

    /// Executes a SQL statement that does not return rows.
    ///
    /// Returns the number of rows affected.
    async fn execute(&self, sql: &str, params: &[Value]) -> FogResult<u64>;

    /// Executes a SQL query and returns all result rows.
    async fn query(&self, sql: &str, params: &[Value]) -> FogResult<Vec<Row>>;

    /// Executes a SQL query and returns exactly one row.
    ///
    /// Returns [`FogError::DoesNotExist`] if no rows are returned, or
    /// [`FogError::MultipleObjectsReturned`] if more than one row is returned.
    async fn query_one(&self, sql: &str, params: &[Value]) -> FogResult<Row>;

    /// Begins a transaction.
    async fn begin_transaction(&self) -> FogResult<()> {
        self.execute("BEGIN", &[]).await.map(|_| ())
    }

    /// Commits the current transaction.
    async fn commit(&self) -> FogResult<()> {
        self.execute("COMMIT", &[]).await.map(|_| ())
    }

    /// Rolls back the current transaction.
    async fn rollback(&self) -> FogResult<()> {
        self.execute("ROLLBACK", &[]).await.map(|_| ())
    }

    /// Returns a SQL compiler configured for this backend's dialect.
    fn compiler(&self) -> SqlCompiler {
        SqlCompiler::new(self.backend_type())
    }
}

/// Configuration for connecting to a database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// The backend type.
    pub backend: DatabaseBackendType,
    /// The database name or file path.
    pub name: String,
    /// Additional connection options.
    pub options: HashMap<String, String>,
}

impl DatabaseConfig {
    /// Creates a configuration for an in-memory SQLite database.
    pub fn sqlite_memory() -> Self {
        Self::sqlite_file(":memory:")
    }

    /// Creates a configuration for a SQLite file database.
    pub fn sqlite_file(path: impl Into<String>) -> Self {
        Self {
            backend: DatabaseBackendType::SQLite,
            name: path.into(),
            options: HashMap::new(),
        }
    }

    /// Builds a configuration from a `databases` settings entry.
    ///
    /// The engine is matched on its last dotted segment, so both
    /// `fields_of_gold.db.backends.sqlite3` and a bare `sqlite3` work.
    ///
    /// # Errors
    ///
    /// Returns `ImproperlyConfigured` for an unknown engine.
    pub fn from_settings(settings: &DatabaseSettings) -> FogResult<Self> {
        let engine = settings.engine.rsplit('.').next().unwrap_or_default();
        let backend = match engine {
            "sqlite3" | "sqlite" => DatabaseBackendType::SQLite,
            "postgresql" | "postgres" => DatabaseBackendType::PostgreSQL,
            _ => {
                return Err(FogError::ImproperlyConfigured(format!(
                    "Unknown database engine '{}'",
                    settings.engine
                )))
            }
        };
        Ok(Self {
            backend,
            name: settings.name.clone(),
            options: settings.options.clone(),
        })
    }
}

/// Opens a connection for `config`.
///
/// # Errors
///
/// Returns `ImproperlyConfigured` when no driver for the backend is compiled
/// in, or the driver's error if the connection cannot be opened.
pub fn connect(config: &DatabaseConfig) -> FogResult<Arc<dyn DbExecutor>> {
    tracing::debug!(backend = ?config.backend, name = %config.name, "opening database");
    match config.backend {
        #[cfg(feature = "sqlite")]
        DatabaseBackendType::SQLite => Ok(Arc::new(crate::sqlite::SqliteBackend::from_config(config)?)),
        other => Err(FogError::ImproperlyConfigured(format!(
            "No driver available for {other:?}"
        ))),
    }
}
