//! # fields-of-gold-db
//!
//! ORM layer for fields-of-gold. Provides the [`Model`](model::Model) trait,
//! field and constraint definitions, DDL generation, async model persistence
//! through a [`DbExecutor`](executor::DbExecutor), and the two field
//! extensions this project exists for:
//!
//! - [`typed`] - JSON columns bound to a Rust schema type, validated on
//!   assignment, decoded into the type on read, and optionally guarded by a
//!   storage-level CHECK (`force_valid`).
//! - [`related`] - one-to-one relations whose accessors remember a missing
//!   related row per instance.
//!
//! ## Module Overview
//!
//! - [`model`] - The [`Model`](model::Model) trait and [`ModelMeta`](model::ModelMeta)
//! - [`fields`] - Field definitions ([`FieldDef`](fields::FieldDef)) and types
//! - [`value`] - The backend-agnostic [`Value`](value::Value) enum
//! - [`sql`] - Rows and the statement compiler
//! - [`executor`] - Async CRUD over a [`DbExecutor`](executor::DbExecutor)
//! - [`constraints`] - CHECK constraints
//! - [`schema_editor`] - `CREATE TABLE` generation
//! - [`checks`] - Model startup checks

// - struct_excessive_bools: FieldDef mirrors Django's field API which uses many booleans
// - result_large_err: FogError is the crate error type and is used consistently
// - doc_markdown: backtick requirements for documentation items are too strict
// - return_self_not_must_use: builder pattern methods are self-documenting
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::result_large_err)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::option_if_let_else)]
#![allow(clippy::match_same_arms)]
// significant_drop_tightening: false positives with registry lock guards
#![allow(clippy::significant_drop_tightening)]

pub mod checks;
pub mod constraints;
pub mod executor;
pub mod fields;
pub mod model;
pub mod related;
pub mod schema_editor;
pub mod sql;
pub mod typed;
pub mod value;

// Re-export the most commonly used types at the crate root.
pub use constraints::{CheckConstraint, Constraint, JsonRequiredKeysConstraint};
pub use executor::{
    create_model, delete_model, fetch_one_by, get_model, refresh_model, save_model, DbExecutor,
};
pub use fields::{Deconstructed, FieldDef, FieldType, OnDelete, OneToOneKind};
pub use model::{Model, ModelMeta};
pub use related::{CachesRelations, OneToOne, RelationCache};
pub use schema_editor::SchemaEditor;
pub use sql::{DatabaseBackendType, FromValue, Row, SqlCompiler};
pub use typed::{register_schema, Schema, SchemaError, TypedJsonField, TypedValue};
pub use value::Value;
