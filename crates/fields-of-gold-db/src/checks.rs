//! Model system checks.
//!
//! Models are registered with [`register_model`]; [`check_models`] runs each
//! registered model's [`Model::check`] and is hooked into a core
//! [`CheckRegistry`] under the `models` tag by [`register_checks`].

use std::sync::{LazyLock, PoisonError, RwLock};

use fields_of_gold_core::checks::{CheckMessage, CheckRegistry};
use fields_of_gold_core::Settings;

use crate::model::Model;

struct RegisteredModel {
    type_name: &'static str,
    check: fn() -> Vec<CheckMessage>,
}

static MODELS: LazyLock<RwLock<Vec<RegisteredModel>>> = LazyLock::new(|| RwLock::new(Vec::new()));

/// Adds `M` to the set of models checked at startup. Registering twice is a
/// no-op.
pub fn register_model<M: Model>() {
    let type_name = std::any::type_name::<M>();
    let mut models = MODELS.write().unwrap_or_else(PoisonError::into_inner);
    if models.iter().all(|m| m.type_name != type_name) {
        models.push(RegisteredModel {
            type_name,
            check: M::check,
        });
    }
}

/// Runs the checks of every registered model.
pub fn check_models(_settings: &Settings) -> Vec<CheckMessage> {
    let checks: Vec<fn() -> Vec<CheckMessage>> = MODELS
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .map(|m| m.check)
        .collect();
    checks.into_iter().flat_map(|check| check()).collect()
}

/// Registers [`check_models`] under the `models` tag.
pub fn register_checks(registry: &mut CheckRegistry) {
    registry.register(check_models, &["models"]);
}
