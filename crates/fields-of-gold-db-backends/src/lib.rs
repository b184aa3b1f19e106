//! # fields-of-gold-db-backends
//!
//! Database backend implementations for fields-of-gold. Each backend
//! implements [`DatabaseBackend`] and the ORM's
//! [`DbExecutor`](fields_of_gold_db::DbExecutor), so model persistence,
//! typed JSON columns and relation accessors run against it unchanged.
//!
//! Supported backends:
//! - `SQLite` (feature `sqlite`, on by default)
//!
//! PostgreSQL is supported at the SQL dialect level only
//! (statement compilation, DDL and CHECK generation); no driver ships here.

// - result_large_err: FogError is the crate error type and is used consistently
// - doc_markdown: backtick requirements for documentation items are too strict
#![allow(clippy::result_large_err)]
#![allow(clippy::doc_markdown)]

pub mod base;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use base::{connect, DatabaseBackend, DatabaseConfig};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteBackend;
