//! Test database utilities.
//!
//! Provides [`TestDatabase`], an in-memory SQLite database wrapper for use in
//! tests. It implements [`DbExecutor`] so it can be used with all ORM
//! operations, and adds helper methods for creating tables from model
//! metadata and counting executed statements.
//!
//! ## Example
//!
//! ```rust,no_run
//! use fields_of_gold_test::test_database::TestDatabase;
//!
//! async fn example() {
//!     let db = TestDatabase::new();
//!     db.execute_raw("CREATE TABLE dogs (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")
//!         .await
//!         .unwrap();
//! }
//! ```

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use fields_of_gold_core::FogResult;
use fields_of_gold_db::model::ModelMeta;
use fields_of_gold_db::schema_editor::SchemaEditor;
use fields_of_gold_db::sql::{DatabaseBackendType, Row};
use fields_of_gold_db::value::Value;
use fields_of_gold_db::DbExecutor;
use fields_of_gold_db_backends::sqlite::SqliteBackend;

/// An in-memory SQLite database for testing.
///
/// Wraps a [`SqliteBackend`] with an `Arc` for sharing and adds a statement
/// counter for use with [`assert_num_queries`](crate::assert_num_queries).
///
/// Each `TestDatabase::new()` creates a fresh database, so tests are isolated
/// from one another.
#[derive(Clone)]
pub struct TestDatabase {
    backend: Arc<SqliteBackend>,
    query_count: Arc<AtomicUsize>,
}

impl TestDatabase {
    /// Creates a new in-memory SQLite test database.
    ///
    /// # Panics
    ///
    /// Panics if the in-memory database cannot be created.
    pub fn new() -> Self {
        let backend = SqliteBackend::memory().expect("Failed to create in-memory SQLite database");
        Self {
            backend: Arc::new(backend),
            query_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Creates the table for `meta`, CHECK constraints included.
    ///
    /// # Errors
    ///
    /// Returns an error if the SQL execution fails.
    pub async fn setup_table(&self, meta: &ModelMeta) -> FogResult<()> {
        for sql in SchemaEditor::new(DatabaseBackendType::SQLite).create_model_sql(meta) {
            self.execute_raw(&sql).await?;
        }
        tracing::debug!(table = %meta.db_table, "test table created");
        Ok(())
    }

    /// Drops all user-created tables in the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the SQL execution fails.
    pub async fn teardown(&self) -> FogResult<()> {
        let rows = self
            .backend
            .query(
                "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
                &[],
            )
            .await?;

        for row in &rows {
            let table_name: String = row.get("name")?;
            self.backend
                .execute_sql(&format!("DROP TABLE IF EXISTS \"{table_name}\""), &[])
                .await?;
        }
        Ok(())
    }

    /// Executes a raw SQL string with no parameters.
    ///
    /// Increments the query counter.
    ///
    /// # Errors
    ///
    /// Returns an error if the SQL execution fails.
    pub async fn execute_raw(&self, sql: &str) -> FogResult<u64> {
        self.query_count.fetch_add(1, Ordering::Relaxed);
        self.backend.execute_sql(sql, &[]).await
    }

    /// Returns the current query count.
    pub fn query_count(&self) -> usize {
        self.query_count.load(Ordering::Relaxed)
    }

    /// Resets the query counter to zero.
    pub fn reset_query_count(&self) {
        self.query_count.store(0, Ordering::Relaxed);
    }

    /// Returns a reference to the inner `SqliteBackend`.
    pub fn backend(&self) -> &SqliteBackend {
        &self.backend
    }
}

impl Default for TestDatabase {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl DbExecutor for TestDatabase {
    fn backend_type(&self) -> DatabaseBackendType {
        DatabaseBackendType::SQLite
    }

    async fn execute_sql(&self, sql: &str, params: &[Value]) -> FogResult<u64> {
        self.query_count.fetch_add(1, Ordering::Relaxed);
        self.backend.execute_sql(sql, params).await
    }

    async fn query(&self, sql: &str, params: &[Value]) -> FogResult<Vec<Row>> {
        self.query_count.fetch_add(1, Ordering::Relaxed);
        DbExecutor::query(self.backend.as_ref(), sql, params).await
    }

    async fn query_one(&self, sql: &str, params: &[Value]) -> FogResult<Row> {
        self.query_count.fetch_add(1, Ordering::Relaxed);
        DbExecutor::query_one(self.backend.as_ref(), sql, params).await
    }

    async fn insert_returning_id(&self, sql: &str, params: &[Value]) -> FogResult<Value> {
        self.query_count.fetch_add(1, Ordering::Relaxed);
        self.backend.insert_returning_id(sql, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fields_of_gold_db::fields::{FieldDef, FieldType};

    fn sample_model_meta() -> ModelMeta {
        ModelMeta::new("test", "article").fields(vec![
            FieldDef::new("id", FieldType::BigAutoField).primary_key(),
            FieldDef::new("title", FieldType::CharField).max_length(200),
            FieldDef::new("body", FieldType::TextField).nullable(),
        ])
    }

    #[tokio::test]
    async fn test_new_creates_database() {
        let db = TestDatabase::new();
        assert_eq!(db.backend_type(), DatabaseBackendType::SQLite);
        assert_eq!(db.query_count(), 0);
    }

    #[tokio::test]
    async fn test_setup_table_and_insert() {
        let db = TestDatabase::new();
        db.setup_table(&sample_model_meta()).await.unwrap();
        let id = db
            .insert_returning_id(
                "INSERT INTO \"test_article\" (\"title\", \"body\") VALUES (?, ?)",
                &[Value::from("Hello"), Value::Null],
            )
            .await
            .unwrap();
        assert_eq!(id, Value::Int(1));

        let row = db
            .query_one("SELECT title FROM test_article WHERE id = ?", &[id])
            .await
            .unwrap();
        assert_eq!(row.get::<String>("title").unwrap(), "Hello");
    }

    #[tokio::test]
    async fn test_query_count_and_reset() {
        let db = TestDatabase::new();
        db.execute_raw("CREATE TABLE qc (id INTEGER PRIMARY KEY)")
            .await
            .unwrap();
        db.query("SELECT id FROM qc", &[]).await.unwrap();
        assert_eq!(db.query_count(), 2);
        db.reset_query_count();
        assert_eq!(db.query_count(), 0);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let db = TestDatabase::new();
        let other = db.clone();
        other
            .execute_raw("CREATE TABLE shared (id INTEGER PRIMARY KEY)")
            .await
            .unwrap();
        assert_eq!(db.query_count(), 1);
        assert!(db.query("SELECT id FROM shared", &[]).await.is_ok());
    }

    #[tokio::test]
    async fn test_teardown_drops_tables() {
        let db = TestDatabase::new();
        db.setup_table(&sample_model_meta()).await.unwrap();
        db.teardown().await.unwrap();
        assert!(db.query("SELECT id FROM test_article", &[]).await.is_err());
    }
}
