//! # fields-of-gold-test
//!
//! Testing utilities for fields-of-gold: an in-memory SQLite database that
//! counts the statements it runs, query-count assertions for checking that
//! relation accessors really do answer from their cache, and a helper that
//! installs a test log subscriber.

// - result_large_err: FogError is the crate error type and is used consistently
#![allow(clippy::result_large_err)]

pub mod assert_queries;
pub mod test_database;

pub use assert_queries::{assert_max_queries, assert_num_queries};
pub use test_database::TestDatabase;

/// Installs a `tracing` subscriber that writes through the test harness's
/// captured output. Safe to call from every test.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}
