//! Structured JSON columns.
//!
//! A typed JSON column stores a document in a JSON column but exposes it to
//! application code as an instance of a Rust type implementing [`Schema`].
//!
//! - [`schema`]: the [`Schema`] trait, structured errors and the registry.
//! - [`codec`]: encoding documents for storage and decoding them back.
//! - [`value`]: [`TypedValue`], the in-memory state of a column.
//! - [`field`]: [`TypedJsonField`], the column declaration.

pub mod codec;
pub mod field;
pub mod schema;
pub mod value;

pub use codec::{decode_document, CanonicalJsonEncoder, DocumentEncoder, MAX_NESTING};
pub use field::TypedJsonField;
pub use schema::{
    lookup_schema, register_schema, schema_registry, ErrorDetail, Schema, SchemaError, SchemaInfo,
    SchemaRegistry,
};
pub use value::TypedValue;
