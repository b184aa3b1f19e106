//! Field definitions and types for the ORM.
//!
//! This module provides the [`FieldDef`] struct and [`FieldType`] enum that
//! describe model fields and their database column mappings, plus the
//! [`Deconstructed`] form handed to schema tooling.

pub mod types;

pub use types::{Deconstructed, FieldDef, FieldType, OnDelete, OneToOneKind};
