//! Query counting assertions for database tests.
//!
//! [`assert_num_queries`] counts the statements a [`TestDatabase`] runs
//! during an async closure. Relation accessor tests use it to prove that a
//! cached outcome (present or missing) is answered without a lookup.
//!
//! ## Example
//!
//! ```rust,no_run
//! use fields_of_gold_db::value::Value;
//! use fields_of_gold_db::DbExecutor;
//! use fields_of_gold_test::assert_queries::assert_num_queries;
//! use fields_of_gold_test::test_database::TestDatabase;
//!
//! async fn example() {
//!     let db = TestDatabase::new();
//!     db.execute_raw("CREATE TABLE t (id INTEGER PRIMARY KEY, val TEXT)")
//!         .await
//!         .unwrap();
//!
//!     assert_num_queries(&db, 1, || async {
//!         db.execute_sql("INSERT INTO t (val) VALUES (?)", &[Value::from("x")])
//!             .await
//!             .unwrap();
//!     })
//!     .await;
//! }
//! ```

use std::future::Future;

/// Inline form of [`assert_num_queries`] for bodies that borrow mutably.
///
/// Expands in place, so `$body` may contain `.await` and hold `&mut`
/// borrows of locals. Evaluates to the body's value.
///
/// ```rust,no_run
/// use fields_of_gold_db::DbExecutor;
/// use fields_of_gold_test::{assert_num_queries, TestDatabase};
///
/// async fn example() {
///     let db = TestDatabase::new();
///     let rows = assert_num_queries!(db, 1, db.query("SELECT 1", &[]).await);
///     assert!(rows.is_ok());
/// }
/// ```
#[macro_export]
macro_rules! assert_num_queries {
    ($db:expr, $expected:expr, $body:expr) => {{
        let counter: &$crate::TestDatabase = &$db;
        counter.reset_query_count();
        let output = $body;
        let actual = counter.query_count();
        let expected: usize = $expected;
        assert_eq!(
            actual, expected,
            "Expected {expected} SQL queries, but {actual} were executed"
        );
        output
    }};
}

use crate::test_database::TestDatabase;

/// Asserts that exactly `expected_count` SQL statements are executed during
/// the async closure, and returns the closure's output.
///
/// # Panics
///
/// Panics if the number of statements does not match `expected_count`.
pub async fn assert_num_queries<F, Fut, T>(db: &TestDatabase, expected_count: usize, f: F) -> T
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    db.reset_query_count();
    let output = f().await;
    let actual = db.query_count();
    assert_eq!(
        actual, expected_count,
        "Expected {expected_count} SQL queries, but {actual} were executed"
    );
    output
}

/// Asserts that at most `max_count` SQL statements are executed during the
/// async closure, and returns the closure's output.
///
/// # Panics
///
/// Panics if more than `max_count` statements are executed.
pub async fn assert_max_queries<F, Fut, T>(db: &TestDatabase, max_count: usize, f: F) -> T
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = T>,
{
    db.reset_query_count();
    let output = f().await;
    let actual = db.query_count();
    assert!(
        actual <= max_count,
        "Expected at most {max_count} SQL queries, but {actual} were executed"
    );
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use fields_of_gold_db::value::Value;
    use fields_of_gold_db::DbExecutor;

    async fn db_with_table(name: &str) -> TestDatabase {
        let db = TestDatabase::new();
        db.execute_raw(&format!("CREATE TABLE {name} (id INTEGER PRIMARY KEY, val TEXT)"))
            .await
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_assert_num_queries_passes() {
        let db = db_with_table("nq").await;
        assert_num_queries(&db, 2, || async {
            db.execute_sql("INSERT INTO nq (val) VALUES (?)", &[Value::from("a")])
                .await
                .unwrap();
            db.execute_sql("INSERT INTO nq (val) VALUES (?)", &[Value::from("b")])
                .await
                .unwrap();
        })
        .await;
    }

    #[tokio::test]
    async fn test_assert_num_queries_returns_output() {
        let db = db_with_table("nqo").await;
        let rows = assert_num_queries(&db, 1, || async {
            db.query("SELECT id FROM nqo", &[]).await.unwrap()
        })
        .await;
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_assert_num_queries_macro_allows_mut_borrows() {
        let db = db_with_table("nqm").await;
        let mut seen = Vec::new();
        let count = crate::assert_num_queries!(db, 1, {
            let rows = db.query("SELECT id FROM nqm", &[]).await.unwrap();
            seen.push(rows.len());
            seen.len()
        });
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_assert_num_queries_zero() {
        let db = TestDatabase::new();
        assert_num_queries(&db, 0, || async {}).await;
    }

    #[tokio::test]
    #[should_panic(expected = "Expected 1 SQL queries, but 2 were executed")]
    async fn test_assert_num_queries_fails_too_many() {
        let db = db_with_table("nqf").await;
        assert_num_queries(&db, 1, || async {
            db.execute_sql("INSERT INTO nqf (val) VALUES (?)", &[Value::from("a")])
                .await
                .unwrap();
            db.execute_sql("INSERT INTO nqf (val) VALUES (?)", &[Value::from("b")])
                .await
                .unwrap();
        })
        .await;
    }

    #[tokio::test]
    async fn test_assert_max_queries_passes() {
        let db = db_with_table("mq").await;
        assert_max_queries(&db, 3, || async {
            db.execute_sql("INSERT INTO mq (val) VALUES (?)", &[Value::from("a")])
                .await
                .unwrap();
        })
        .await;
    }

    #[tokio::test]
    #[should_panic(expected = "Expected at most 0 SQL queries, but 1 were executed")]
    async fn test_assert_max_queries_fails() {
        let db = db_with_table("mqf").await;
        assert_max_queries(&db, 0, || async {
            db.execute_sql("INSERT INTO mqf (val) VALUES (?)", &[Value::from("a")])
                .await
                .unwrap();
        })
        .await;
    }
}
