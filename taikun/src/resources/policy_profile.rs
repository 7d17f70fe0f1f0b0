//! taikun_policy_profile (Gatekeeper/OPA)

use std::sync::Arc;

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::StringLengthValidator;

use crate::api::profiles::{CreatePolicyProfileCommand, EditPolicyProfileCommand, PolicyProfileRow};
use crate::api::{ApiError, LockMode};
use crate::provider_data::TaikunProviderData;
use crate::resources::{
    api_error_diag, bool_or, opt_id, provider_data_from, required_id, required_string,
    string_list,
};
use crate::utils::{
    i32toa, read_after_write, READ_AFTER_CREATE_TIMEOUT, READ_AFTER_UPDATE_TIMEOUT,
};

/// Docker image prefix, e.g. "docker.io/library/".
const IMAGE_PREFIX_PATTERN: &str = r"^[a-z0-9]+([._-][a-z0-9]+)*(/[a-z0-9]+([._-][a-z0-9]+)*)*/?$";
/// Docker tag.
const TAG_PATTERN: &str = r"^[a-zA-Z0-9_][a-zA-Z0-9._-]{0,127}$";

#[derive(Default)]
pub struct PolicyProfileResource {
    provider_data: Option<TaikunProviderData>,
}

impl PolicyProfileResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> Result<&TaikunProviderData, ApiError> {
        self.provider_data
            .as_ref()
            .ok_or_else(|| ApiError::Validation("provider not configured".to_string()))
    }

    async fn read_state(
        &self,
        id: i32,
        post_write: bool,
    ) -> Result<Option<DynamicValue>, ApiError> {
        let data = self.data()?;
        match data.client.policy_profiles().by_id(id).await? {
            Some(row) => Ok(Some(flatten(&row)?)),
            None if post_write => Err(ApiError::NotFoundAfterCreateOrUpdate),
            None => Ok(None),
        }
    }
}

fn flatten(row: &PolicyProfileRow) -> Result<DynamicValue, ApiError> {
    let mut state = DynamicValue::empty_map();
    state.set_string(&AttributePath::new("id"), i32toa(row.id))?;
    state.set_string(&AttributePath::new("name"), row.name.clone())?;
    state.set_bool(&AttributePath::new("forbid_node_port"), row.forbid_node_port)?;
    state.set_bool(
        &AttributePath::new("forbid_http_ingress"),
        row.forbid_http_ingress,
    )?;
    state.set_bool(&AttributePath::new("require_probe"), row.require_probe)?;
    state.set_bool(&AttributePath::new("unique_ingress"), row.unique_ingress)?;
    state.set_bool(
        &AttributePath::new("unique_service_selector"),
        row.unique_service_selector,
    )?;
    for (attr, values) in [
        ("allowed_repos", &row.allowed_repos),
        ("forbidden_tags", &row.forbidden_tags),
        ("ingress_whitelist", &row.ingress_whitelist),
    ] {
        state.set_list(
            &AttributePath::new(attr),
            values.iter().map(|v| Dynamic::String(v.clone())).collect(),
        )?;
    }
    state.set_string(
        &AttributePath::new("organization_id"),
        row.organization_id.map(i32toa).unwrap_or_default(),
    )?;
    state.set_bool(&AttributePath::new("lock"), row.is_locked)?;
    Ok(state)
}

pub fn policy_profile_schema() -> Schema {
    let string_list_type = AttributeType::List(Box::new(AttributeType::String));
    SchemaBuilder::new()
        .description("Taikun Policy Profile")
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .required()
                .force_new()
                .validator(Arc::new(StringLengthValidator {
                    min: Some(3),
                    max: Some(30),
                }))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("forbid_node_port", AttributeType::Bool)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("forbid_http_ingress", AttributeType::Bool)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("require_probe", AttributeType::Bool)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("unique_ingress", AttributeType::Bool)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("unique_service_selector", AttributeType::Bool)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("allowed_repos", string_list_type.clone())
                .description("Requires container images to begin with one of these prefixes.")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("forbidden_tags", string_list_type.clone())
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("ingress_whitelist", string_list_type)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("organization_id", AttributeType::String)
                .optional()
                .computed()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("lock", AttributeType::Bool)
                .optional()
                .build(),
        )
        .build()
}

#[async_trait]
impl Resource for PolicyProfileResource {
    fn type_name(&self) -> &str {
        "taikun_policy_profile"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: policy_profile_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];
        let repo_pattern = regex::Regex::new(IMAGE_PREFIX_PATTERN).unwrap();
        let tag_pattern = regex::Regex::new(TAG_PATTERN).unwrap();

        for repo in string_list(&request.config, "allowed_repos") {
            if !repo_pattern.is_match(&repo) {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid allowed repository",
                        format!("{:?} is not a Docker image prefix", repo),
                    )
                    .with_attribute(AttributePath::new("allowed_repos")),
                );
            }
        }
        for tag in string_list(&request.config, "forbidden_tags") {
            if !tag_pattern.is_match(&tag) {
                diagnostics.push(
                    Diagnostic::error(
                        "Invalid forbidden tag",
                        format!("{:?} is not a Docker tag", tag),
                    )
                    .with_attribute(AttributePath::new("forbidden_tags")),
                );
            }
        }
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let config = &request.config;

            let command = CreatePolicyProfileCommand {
                name: required_string(config, "name")?,
                forbid_node_port: bool_or(config, "forbid_node_port", false),
                forbid_http_ingress: bool_or(config, "forbid_http_ingress", false),
                require_probe: bool_or(config, "require_probe", false),
                unique_ingress: bool_or(config, "unique_ingress", false),
                unique_service_selector: bool_or(config, "unique_service_selector", false),
                allowed_repos: string_list(config, "allowed_repos"),
                forbidden_tags: string_list(config, "forbidden_tags"),
                ingress_whitelist: string_list(config, "ingress_whitelist"),
                organization_id: opt_id(config, "organization_id")?,
            };

            let created = data.client.policy_profiles().create(&command).await?;
            if bool_or(config, "lock", false) {
                data.client
                    .policy_profiles()
                    .lock(created.id, LockMode::Lock)
                    .await?;
            }

            read_after_write(&ctx, "policy profile", READ_AFTER_CREATE_TIMEOUT, || {
                self.read_state(created.id, true)
            })
            .await?
            .ok_or(ApiError::NotFoundAfterCreateOrUpdate)
        }
        .await;

        match result {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![api_error_diag("Failed to create policy profile", &e)],
            },
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result: Result<Option<DynamicValue>, ApiError> = async {
            let id = required_id(&request.current_state, "id")?;
            self.read_state(id, false).await
        }
        .await;

        match result {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![api_error_diag("Failed to read policy profile", &e)],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            let api = data.client.policy_profiles();
            let config = &request.planned_state;

            if bool_or(&request.prior_state, "lock", false) {
                api.lock(id, LockMode::Unlock).await?;
            }

            if request.has_change_in(&[
                "forbid_node_port",
                "forbid_http_ingress",
                "require_probe",
                "unique_ingress",
                "unique_service_selector",
                "allowed_repos",
                "forbidden_tags",
                "ingress_whitelist",
            ]) {
                api.edit(&EditPolicyProfileCommand {
                    id,
                    name: required_string(config, "name")?,
                    forbid_node_port: bool_or(config, "forbid_node_port", false),
                    forbid_http_ingress: bool_or(config, "forbid_http_ingress", false),
                    require_probe: bool_or(config, "require_probe", false),
                    unique_ingress: bool_or(config, "unique_ingress", false),
                    unique_service_selector: bool_or(config, "unique_service_selector", false),
                    allowed_repos: string_list(config, "allowed_repos"),
                    forbidden_tags: string_list(config, "forbidden_tags"),
                    ingress_whitelist: string_list(config, "ingress_whitelist"),
                })
                .await?;
            }

            if bool_or(config, "lock", false) {
                api.lock(id, LockMode::Lock).await?;
            }

            read_after_write(&ctx, "policy profile", READ_AFTER_UPDATE_TIMEOUT, || {
                self.read_state(id, true)
            })
            .await?
            .ok_or(ApiError::NotFoundAfterCreateOrUpdate)
        }
        .await;

        match result {
            Ok(new_state) => UpdateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => UpdateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![api_error_diag("Failed to update policy profile", &e)],
            },
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let result: Result<(), ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            if bool_or(&request.prior_state, "lock", false) {
                data.client
                    .policy_profiles()
                    .lock(id, LockMode::Unlock)
                    .await?;
            }
            data.client.policy_profiles().delete(id).await
        }
        .await;

        DeleteResourceResponse {
            diagnostics: match result {
                Ok(()) => vec![],
                Err(e) => vec![api_error_diag("Failed to delete policy profile", &e)],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for PolicyProfileResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        match provider_data_from(&request.provider_data) {
            Ok(data) => {
                self.provider_data = Some(data);
                ConfigureResourceResponse { diagnostics: vec![] }
            }
            Err(diag) => ConfigureResourceResponse {
                diagnostics: vec![diag],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn validate_checks_repo_and_tag_patterns() {
        let mut config = DynamicValue::empty_map();
        config
            .set_list(
                &AttributePath::new("allowed_repos"),
                vec![
                    Dynamic::String("docker.io/library/".to_string()),
                    Dynamic::String("NOT VALID".to_string()),
                ],
            )
            .unwrap();
        config
            .set_list(
                &AttributePath::new("forbidden_tags"),
                vec![Dynamic::String("latest".to_string())],
            )
            .unwrap();

        let resource = PolicyProfileResource::new();
        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "taikun_policy_profile".to_string(),
                    config,
                },
            )
            .await;
        assert_eq!(response.diagnostics.len(), 1);
    }
}
