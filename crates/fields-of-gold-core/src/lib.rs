//! # fields-of-gold-core
//!
//! Core types shared by every fields-of-gold crate. Nothing in here knows about
//! models or columns; it provides the foundation the ORM extensions build on.
//!
//! ## Modules
//!
//! - [`error`] - Error taxonomy and result aliases
//! - [`checks`] - Startup system-check framework
//! - [`settings`] - Configuration passed to startup checks and backends
//! - [`settings_loader`] - Loading settings from TOML/JSON and the environment
//! - [`logging`] - Tracing-based logging integration

pub mod checks;
pub mod error;
pub mod logging;
pub mod settings;
pub mod settings_loader;

// Re-export the most commonly used types at the crate root.
pub use checks::{CheckLevel, CheckMessage, CheckRegistry};
pub use error::{FogError, FogResult, ValidationError};
pub use settings::Settings;
