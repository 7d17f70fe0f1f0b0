//! Resource trait and request/response types
//!
//! Every managed resource supplies a schema plus the four lifecycle
//! operations. The host serializes operations per resource id; handlers
//! are free of shared mutable state beyond the provider data.

use crate::context::Context;
use crate::schema::Schema;
use crate::types::{AttributePath, Diagnostic, DynamicValue};
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

/// Base trait for managed resources.
#[async_trait]
pub trait Resource: Send + Sync {
    /// Constant type name, e.g. "taikun_project". MUST match the key the
    /// provider registers it under.
    fn type_name(&self) -> &str;

    async fn schema(&self, ctx: Context, request: ResourceSchemaRequest) -> ResourceSchemaResponse;

    /// Called during plan to validate configuration before any API call.
    async fn validate(
        &self,
        ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse;

    /// MUST populate all attributes of response.new_state, computed ones
    /// included.
    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse;

    /// MUST return the accurate current state, or None when the remote
    /// entity is gone (drift).
    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse;

    /// MUST apply every change between prior_state and planned_state.
    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse;

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse;
}

pub struct ResourceSchemaRequest;

pub struct ResourceSchemaResponse {
    pub schema: Schema,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ValidateResourceConfigRequest {
    pub type_name: String,
    pub config: DynamicValue,
}

pub struct ValidateResourceConfigResponse {
    pub diagnostics: Vec<Diagnostic>,
}

pub struct CreateResourceRequest {
    pub type_name: String,
    pub config: DynamicValue,
    pub planned_state: DynamicValue,
}

pub struct CreateResourceResponse {
    pub new_state: DynamicValue,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct ReadResourceRequest {
    pub type_name: String,
    pub current_state: DynamicValue,
}

pub struct ReadResourceResponse {
    /// None signals the remote entity no longer exists; the host drops it
    /// from state without error.
    pub new_state: Option<DynamicValue>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct UpdateResourceRequest {
    pub type_name: String,
    pub prior_state: DynamicValue,
    pub planned_state: DynamicValue,
    pub config: DynamicValue,
}

impl UpdateResourceRequest {
    /// Per-attribute change detection between the previously observed
    /// state and the planned state.
    pub fn has_change(&self, path: &AttributePath) -> bool {
        self.prior_state.get(path) != self.planned_state.get(path)
    }

    /// True if any of the given top-level attributes changed.
    pub fn has_change_in(&self, names: &[&str]) -> bool {
        names
            .iter()
            .any(|name| self.has_change(&AttributePath::new(name)))
    }
}

pub struct UpdateResourceResponse {
    pub new_state: DynamicValue,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct DeleteResourceRequest {
    pub type_name: String,
    pub prior_state: DynamicValue,
}

pub struct DeleteResourceResponse {
    pub diagnostics: Vec<Diagnostic>,
}

/// Resources implement configure to receive provider data (API clients,
/// credentials) right after the factory creates them.
#[async_trait]
pub trait ResourceWithConfigure: Resource {
    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse;
}

pub struct ConfigureResourceRequest {
    /// Downcast to the provider's concrete data type.
    pub provider_data: Option<Arc<dyn Any + Send + Sync>>,
}

pub struct ConfigureResourceResponse {
    pub diagnostics: Vec<Diagnostic>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AttributePath, DynamicValue};

    #[test]
    fn has_change_detects_attribute_difference() {
        let mut prior = DynamicValue::empty_map();
        prior
            .set_string(&AttributePath::new("name"), "old".to_string())
            .unwrap();
        prior
            .set_bool(&AttributePath::new("lock"), false)
            .unwrap();

        let mut planned = prior.clone();
        planned
            .set_string(&AttributePath::new("name"), "new".to_string())
            .unwrap();

        let request = UpdateResourceRequest {
            type_name: "taikun_project".to_string(),
            prior_state: prior,
            planned_state: planned,
            config: DynamicValue::empty_map(),
        };

        assert!(request.has_change(&AttributePath::new("name")));
        assert!(!request.has_change(&AttributePath::new("lock")));
        assert!(request.has_change_in(&["lock", "name"]));
        assert!(!request.has_change_in(&["lock"]));
    }

    #[test]
    fn has_change_treats_missing_as_null_difference() {
        let prior = DynamicValue::empty_map();
        let mut planned = DynamicValue::empty_map();
        planned
            .set_string(&AttributePath::new("alerting_profile_id"), "7".to_string())
            .unwrap();

        let request = UpdateResourceRequest {
            type_name: "taikun_project".to_string(),
            prior_state: prior,
            planned_state: planned,
            config: DynamicValue::empty_map(),
        };

        assert!(request.has_change(&AttributePath::new("alerting_profile_id")));
    }
}
