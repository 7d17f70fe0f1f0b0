//! Resource handlers, one module per resource type.

pub mod access_profile;
pub mod alerting_profile;
pub mod app_instance;
pub mod backup_credential;
pub mod billing_credential;
pub mod billing_rule;
pub mod catalog;
pub mod catalog_project_binding;
pub mod cloud_credentials;
pub mod kubeconfig;
pub mod kubernetes_profile;
pub mod organization;
pub mod policy_profile;
pub mod project;
pub mod repository;
pub mod showback_rule;
pub mod slack_config;
pub mod standalone_profile;
pub mod user;

use std::any::Any;
use std::sync::Arc;

use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use crate::api::ApiError;
use crate::provider_data::TaikunProviderData;
use crate::utils::atoi32;

/// Downcasts the provider data or produces the standard diagnostic.
pub(crate) fn provider_data_from(
    provider_data: &Option<Arc<dyn Any + Send + Sync>>,
) -> Result<TaikunProviderData, Diagnostic> {
    provider_data
        .as_ref()
        .and_then(|data| data.downcast_ref::<TaikunProviderData>())
        .cloned()
        .ok_or_else(|| {
            Diagnostic::error(
                "Provider not configured",
                "expected Taikun provider data, run terraform init/apply through the provider",
            )
        })
}

/// String attribute, `None` when null/unknown/empty.
pub(crate) fn opt_string(value: &DynamicValue, name: &str) -> Option<String> {
    match value.get(&AttributePath::new(name)) {
        Some(Dynamic::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

/// Required string attribute; unset is a validation error.
pub(crate) fn required_string(value: &DynamicValue, name: &str) -> Result<String, ApiError> {
    opt_string(value, name)
        .ok_or_else(|| ApiError::Validation(format!("attribute {:?} is required", name)))
}

/// String attribute with empty-string fallback for unset.
pub(crate) fn string_or_empty(value: &DynamicValue, name: &str) -> String {
    opt_string(value, name).unwrap_or_default()
}

/// Id attribute held as a decimal string, parsed to i32.
pub(crate) fn opt_id(value: &DynamicValue, name: &str) -> Result<Option<i32>, ApiError> {
    match opt_string(value, name) {
        Some(s) => Ok(Some(atoi32(&s)?)),
        None => Ok(None),
    }
}

/// Required id attribute.
pub(crate) fn required_id(value: &DynamicValue, name: &str) -> Result<i32, ApiError> {
    opt_id(value, name)?
        .ok_or_else(|| ApiError::Validation(format!("attribute {:?} is required", name)))
}

/// Number attribute, `None` when unset.
pub(crate) fn opt_number(value: &DynamicValue, name: &str) -> Option<f64> {
    match value.get(&AttributePath::new(name)) {
        Some(Dynamic::Number(n)) => Some(*n),
        _ => None,
    }
}

/// Bool attribute with a default for unset.
pub(crate) fn bool_or(value: &DynamicValue, name: &str, default: bool) -> bool {
    match value.get(&AttributePath::new(name)) {
        Some(Dynamic::Bool(b)) => *b,
        _ => default,
    }
}

/// List of object attribute as maps; empty when unset.
pub(crate) fn list_of_maps(
    value: &DynamicValue,
    name: &str,
) -> Vec<std::collections::HashMap<String, Dynamic>> {
    value
        .get_list_of_maps(&AttributePath::new(name))
        .unwrap_or_default()
}

/// List of string attribute; empty when unset.
pub(crate) fn string_list(value: &DynamicValue, name: &str) -> Vec<String> {
    match value.get(&AttributePath::new(name)) {
        Some(Dynamic::List(items)) => items
            .iter()
            .filter_map(|item| item.as_string().map(|s| s.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

pub(crate) fn api_error_diag(summary: &str, error: &ApiError) -> Diagnostic {
    Diagnostic::error(summary, &error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opt_string_treats_empty_as_unset() {
        let mut value = DynamicValue::empty_map();
        value
            .set_string(&AttributePath::new("name"), "".to_string())
            .unwrap();
        assert_eq!(opt_string(&value, "name"), None);

        value
            .set_string(&AttributePath::new("name"), "p1".to_string())
            .unwrap();
        assert_eq!(opt_string(&value, "name").as_deref(), Some("p1"));
    }

    #[test]
    fn required_id_parses_decimal_strings() {
        let mut value = DynamicValue::empty_map();
        value
            .set_string(&AttributePath::new("id"), "42".to_string())
            .unwrap();
        assert_eq!(required_id(&value, "id").unwrap(), 42);
        assert!(required_id(&value, "project_id").is_err());
    }
}
