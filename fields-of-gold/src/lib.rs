//! # fields-of-gold
//!
//! Schema-validated JSON columns and smarter one-to-one relations.
//!
//! This is the meta-crate that re-exports the sub-crates. Depend on it to get
//! everything, or on individual crates for finer-grained control.
//!
//! ```
//! use fields_of_gold::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
//! struct Preferences {
//!     theme: String,
//! }
//!
//! impl Schema for Preferences {
//!     fn schema_name() -> &'static str {
//!         "Preferences"
//!     }
//! }
//!
//! let field = TypedJsonField::<Preferences>::new("preferences");
//! let mut slot = TypedValue::Absent;
//! field
//!     .assign(&mut slot, serde_json::json!({"theme": "dark"}))
//!     .unwrap();
//! assert_eq!(slot.as_typed().unwrap().theme, "dark");
//! ```

/// Error taxonomy, settings, system checks and logging.
pub use fields_of_gold_core as core;

/// Models, typed JSON columns, relation descriptors and CRUD.
pub use fields_of_gold_db as db;

/// Database backends.
pub use fields_of_gold_db_backends as db_backends;

/// Testing utilities.
#[cfg(feature = "testing")]
pub use fields_of_gold_test as test;

/// The common imports for declaring models with typed columns and
/// one-to-one relations.
pub mod prelude {
    pub use fields_of_gold_core::{FogError, FogResult, ValidationError};
    pub use fields_of_gold_db::executor::{
        create_model, delete_model, get_model, refresh_model, save_model, DbExecutor,
    };
    pub use fields_of_gold_db::fields::{FieldDef, FieldType, OneToOneKind};
    pub use fields_of_gold_db::model::{Model, ModelMeta, Row};
    pub use fields_of_gold_db::related::{CachesRelations, OneToOne, RelationCache};
    pub use fields_of_gold_db::typed::{register_schema, Schema, TypedJsonField, TypedValue};
    pub use fields_of_gold_db::value::Value;
}

/// Registers the model checks with `registry` and runs the startup checks.
///
/// # Errors
///
/// Returns `ConfigurationError` if any unsilenced check reports an error.
pub fn check_startup(
    registry: &mut fields_of_gold_core::CheckRegistry,
    settings: &fields_of_gold_core::Settings,
) -> fields_of_gold_core::FogResult<Vec<fields_of_gold_core::CheckMessage>> {
    fields_of_gold_db::checks::register_checks(registry);
    registry.check_startup(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fields_of_gold_core::{CheckRegistry, Settings};

    #[test]
    fn test_check_startup_with_defaults() {
        let mut registry = CheckRegistry::with_builtins();
        let messages = check_startup(&mut registry, &Settings::default()).unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn test_check_startup_rejects_missing_default_database() {
        let mut registry = CheckRegistry::with_builtins();
        let mut settings = Settings::default();
        settings.databases.clear();
        assert!(matches!(
            check_startup(&mut registry, &settings),
            Err(prelude::FogError::ConfigurationError(_))
        ));
    }
}
