//! Database executor trait and model CRUD operations.
//!
//! [`DbExecutor`] is the minimal async interface the model CRUD functions and
//! the relation accessors need. It is implemented by the backends in
//! `fields-of-gold-db-backends` and by the test database.
//!
//! Every function here runs inside a [`persist_span`] so a storage rejection
//! can be traced back to the table and operation that caused it.

use tracing::Instrument;

use fields_of_gold_core::logging::persist_span;
use fields_of_gold_core::{FogError, FogResult};

use crate::model::Model;
use crate::sql::{DatabaseBackendType, Row, SqlCompiler};
use crate::value::Value;

/// Minimal async database executor trait.
///
/// This trait lives in the ORM crate so that execution can be defined without
/// a dependency cycle between the ORM and the backends.
#[async_trait::async_trait]
pub trait DbExecutor: Send + Sync {
    /// Returns the backend type for SQL compilation.
    fn backend_type(&self) -> DatabaseBackendType;

    /// Runs a SQL statement that does not return rows.
    /// Returns the number of rows affected.
    async fn execute_sql(&self, sql: &str, params: &[Value]) -> FogResult<u64>;

    /// Runs a SQL query and returns all result rows.
    async fn query(&self, sql: &str, params: &[Value]) -> FogResult<Vec<Row>>;

    /// Runs a SQL query and returns exactly one row.
    /// Returns `DoesNotExist` if no rows, `MultipleObjectsReturned` if more than one.
    async fn query_one(&self, sql: &str, params: &[Value]) -> FogResult<Row>;

    /// Executes an INSERT and returns the last inserted row ID.
    async fn insert_returning_id(&self, sql: &str, params: &[Value]) -> FogResult<Value> {
        self.execute_sql(sql, params).await?;
        let row = self.query("SELECT last_insert_rowid() AS id", &[]).await?;
        match row.into_iter().next() {
            Some(r) => r.get::<Value>("id"),
            None => Err(FogError::DatabaseError(
                "Failed to retrieve last inserted ID".to_string(),
            )),
        }
    }
}

fn log_rejection(table: &str, err: &FogError) {
    if let FogError::IntegrityError(msg) = err {
        tracing::warn!(table, error = %msg, "storage constraint rejected write");
    }
}

// ── Model CRUD free functions ──────────────────────────────────────────

/// Saves a model instance to the database.
///
/// Runs [`Model::pre_save`] first. If the primary key is set, performs an
/// UPDATE of all other columns; otherwise performs an INSERT and sets the PK
/// from the returned value. No application-level validation is run here:
/// call [`Model::full_clean`] first, or rely on storage constraints.
///
/// # Errors
///
/// Returns `IntegrityError` if a storage constraint rejects the row, or any
/// error raised while encoding the field values.
pub async fn save_model<M: Model>(model: &mut M, db: &dyn DbExecutor) -> FogResult<()> {
    let table = M::table_name();
    let op = if model.pk().is_some() { "update" } else { "insert" };
    async {
        model.pre_save()?;
        let compiler = SqlCompiler::new(db.backend_type());
        let fields = model.non_pk_field_values()?;

        if let Some(pk_value) = model.pk().cloned() {
            if fields.is_empty() {
                return Ok(());
            }
            let (sql, params) =
                compiler.compile_update(table, &fields, M::pk_field_name(), &pk_value);
            db.execute_sql(&sql, &params)
                .await
                .inspect_err(|e| log_rejection(table, e))?;
            tracing::debug!(pk = %pk_value, "row updated");
        } else {
            let (sql, params) = compiler.compile_insert(table, &fields);
            let pk = db
                .insert_returning_id(&sql, &params)
                .await
                .inspect_err(|e| log_rejection(table, e))?;
            tracing::debug!(pk = %pk, "row inserted");
            model.set_pk(pk);
        }
        Ok::<(), FogError>(())
    }
    .instrument(persist_span(table, op))
    .await
}

/// Creates a new model instance in the database via INSERT.
///
/// Always performs an INSERT regardless of whether the PK is set.
///
/// # Errors
///
/// Returns an error if the INSERT fails.
pub async fn create_model<M: Model>(model: &mut M, db: &dyn DbExecutor) -> FogResult<()> {
    let table = M::table_name();
    async {
        model.pre_save()?;
        let compiler = SqlCompiler::new(db.backend_type());
        let fields = model.non_pk_field_values()?;
        let (sql, params) = compiler.compile_insert(table, &fields);
        let pk = db
            .insert_returning_id(&sql, &params)
            .await
            .inspect_err(|e| log_rejection(table, e))?;
        tracing::debug!(pk = %pk, "row inserted");
        model.set_pk(pk);
        Ok::<(), FogError>(())
    }
    .instrument(persist_span(table, "insert"))
    .await
}

/// Deletes a model instance from the database.
///
/// # Errors
///
/// Returns an error if the PK is not set or the DELETE fails.
pub async fn delete_model<M: Model>(model: &M, db: &dyn DbExecutor) -> FogResult<u64> {
    let pk_value = model.pk().ok_or_else(|| {
        FogError::DatabaseError("Cannot delete a model without a primary key".to_string())
    })?;
    let compiler = SqlCompiler::new(db.backend_type());
    let (sql, params) = compiler.compile_delete(M::table_name(), M::pk_field_name(), pk_value);
    db.execute_sql(&sql, &params)
        .instrument(persist_span(M::table_name(), "delete"))
        .await
}

/// Reloads a model instance from the database.
///
/// The instance is replaced by a freshly decoded one, so any per-instance
/// state (relation caches included) starts over.
///
/// # Errors
///
/// Returns an error if the PK is not set, the row does not exist, or a column
/// no longer decodes (`DataIntegrityError`).
pub async fn refresh_model<M: Model>(model: &mut M, db: &dyn DbExecutor) -> FogResult<()> {
    let pk_value = model
        .pk()
        .cloned()
        .ok_or_else(|| {
            FogError::DatabaseError("Cannot refresh a model without a primary key".to_string())
        })?;
    *model = get_model::<M>(db, pk_value).await?;
    tracing::debug!(table = M::table_name(), "instance refreshed");
    Ok(())
}

/// Fetches the instance with primary key `pk`.
///
/// # Errors
///
/// Returns `DoesNotExist` if there is no such row.
pub async fn get_model<M: Model>(db: &dyn DbExecutor, pk: impl Into<Value>) -> FogResult<M> {
    fetch_one_by::<M>(db, M::pk_field_name(), &pk.into()).await
}

/// Fetches the single instance whose `column` equals `value`.
///
/// # Errors
///
/// Returns `DoesNotExist` if no row matches and `MultipleObjectsReturned` if
/// more than one does.
pub async fn fetch_one_by<M: Model>(
    db: &dyn DbExecutor,
    column: &str,
    value: &Value,
) -> FogResult<M> {
    let compiler = SqlCompiler::new(db.backend_type());
    let (sql, params) = compiler.compile_select_by(M::table_name(), column, value, Some(2));
    let mut rows = db
        .query(&sql, &params)
        .instrument(persist_span(M::table_name(), "select"))
        .await?;
    match rows.len() {
        0 => Err(FogError::DoesNotExist(format!(
            "{} matching {column}={value} does not exist.",
            M::meta().model_name
        ))),
        1 => M::from_row(&rows.remove(0)),
        _ => Err(FogError::MultipleObjectsReturned(format!(
            "get() returned more than one {} for {column}={value}",
            M::meta().model_name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn _assert_object_safe(_: &dyn DbExecutor) {}

    #[test]
    fn test_log_rejection_ignores_other_errors() {
        log_rejection("t", &FogError::DatabaseError("x".into()));
        log_rejection("t", &FogError::IntegrityError("CHECK constraint failed".into()));
    }
}
