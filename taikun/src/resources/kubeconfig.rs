//! taikun_kubeconfig
//!
//! Immutable after creation. The YAML content is fetched through the
//! download endpoint on every read so rotated certificates show up.

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
use tfplug::types::{AttributePath, DynamicValue};
use tfplug::validator::StringInSliceValidator;

use crate::api::kubeconfigs::{CreateKubeconfigCommand, KubeconfigRow};
use crate::api::ApiError;
use crate::provider_data::TaikunProviderData;
use crate::resources::{
    api_error_diag, opt_number, opt_string, provider_data_from, required_id, required_string,
};
use crate::utils::{i32toa, read_after_write, READ_AFTER_CREATE_TIMEOUT};

#[derive(Default)]
pub struct KubeconfigResource {
    provider_data: Option<TaikunProviderData>,
}

impl KubeconfigResource {
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
        match data.client.kubeconfigs().by_id(id).await? {
            Some(row) => {
                let content = data.client.kubeconfigs().download(id).await?;
                Ok(Some(flatten(&row, &content)?))
            }
            None if post_write => Err(ApiError::NotFoundAfterCreateOrUpdate),
            None => Ok(None),
        }
    }
}

fn flatten(row: &KubeconfigRow, content: &str) -> Result<DynamicValue, ApiError> {
    let mut state = DynamicValue::empty_map();
    state.set_string(&AttributePath::new("id"), i32toa(row.id))?;
    state.set_string(&AttributePath::new("name"), row.name.clone())?;
    state.set_string(&AttributePath::new("project_id"), i32toa(row.project_id))?;
    state.set_string(&AttributePath::new("project_name"), row.project_name.clone())?;
    state.set_string(&AttributePath::new("access_scope"), row.access_scope.clone())?;
    state.set_string(&AttributePath::new("role"), row.role.clone())?;
    state.set_string(
        &AttributePath::new("namespace"),
        row.namespace.clone().unwrap_or_default(),
    )?;
    state.set_string(
        &AttributePath::new("user_id"),
        row.user_id.clone().unwrap_or_default(),
    )?;
    state.set_string(&AttributePath::new("content"), content.to_string())?;
    Ok(state)
}

pub fn kubeconfig_schema() -> Schema {
    SchemaBuilder::new()
        .description("Taikun Kubeconfig")
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .required()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("project_id", AttributeType::String)
                .required()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("access_scope", AttributeType::String)
                .description("Who can use the kubeconfig: personal, managers or all.")
                .required()
                .force_new()
                .validator(Arc::new(StringInSliceValidator::new(&[
                    "personal", "managers", "all",
                ])))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("role", AttributeType::String)
                .optional()
                .force_new()
                .validator(Arc::new(StringInSliceValidator::new(&[
                    "cluster-admin",
                    "admin",
                    "edit",
                    "view",
                ])))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("namespace", AttributeType::String)
                .optional()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("validity_period", AttributeType::Number)
                .description("Lifetime in hours. Unset means no expiry.")
                .optional()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("user_id", AttributeType::String)
                .optional()
                .computed()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("project_name", AttributeType::String)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("content", AttributeType::String)
                .computed()
                .sensitive()
                .build(),
        )
        .build()
}

#[async_trait]
impl Resource for KubeconfigResource {
    fn type_name(&self) -> &str {
        "taikun_kubeconfig"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: kubeconfig_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse { diagnostics: vec![] }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let config = &request.config;

            let command = CreateKubeconfigCommand {
                name: required_string(config, "name")?,
                project_id: required_id(config, "project_id")?,
                access_scope: required_string(config, "access_scope")?,
                role: opt_string(config, "role").unwrap_or_else(|| "view".to_string()),
                namespace: opt_string(config, "namespace"),
                validity_period: opt_number(config, "validity_period").map(|v| v as i32),
                user_id: opt_string(config, "user_id"),
            };
            let created = data.client.kubeconfigs().create(&command).await?;

            let mut new_state =
                read_after_write(&ctx, "kubeconfig", READ_AFTER_CREATE_TIMEOUT, || {
                    self.read_state(created.id, true)
                })
                .await?
                .ok_or(ApiError::NotFoundAfterCreateOrUpdate)?;

            // validity_period is write-only, carry the declared value
            if let Some(period) = opt_number(config, "validity_period") {
                new_state.set_number(&AttributePath::new("validity_period"), period)?;
            }
            Ok(new_state)
        }
        .await;

        match result {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![api_error_diag("Failed to create kubeconfig", &e)],
            },
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result: Result<Option<DynamicValue>, ApiError> = async {
            let id = required_id(&request.current_state, "id")?;
            let state = self.read_state(id, false).await?;
            Ok(match state {
                Some(mut state) => {
                    if let Some(period) = opt_number(&request.current_state, "validity_period") {
                        state.set_number(&AttributePath::new("validity_period"), period)?;
                    }
                    Some(state)
                }
                None => None,
            })
        }
        .await;

        match result {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![api_error_diag("Failed to read kubeconfig", &e)],
            },
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        // every attribute forces recreation
        UpdateResourceResponse {
            new_state: request.planned_state,
            diagnostics: vec![],
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let result: Result<(), ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            data.client.kubeconfigs().delete(id).await
        }
        .await;

        DeleteResourceResponse {
            diagnostics: match result {
                Ok(()) => vec![],
                Err(e) => vec![api_error_diag("Failed to delete kubeconfig", &e)],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for KubeconfigResource {
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

    #[test]
    fn flatten_includes_downloaded_content() {
        let row = KubeconfigRow {
            id: 4,
            name: "ops".to_string(),
            project_id: 11,
            project_name: "prod".to_string(),
            access_scope: "managers".to_string(),
            role: "view".to_string(),
            namespace: None,
            user_id: None,
            user_name: None,
        };
        let state = flatten(&row, "apiVersion: v1\nkind: Config\n").unwrap();
        assert!(state
            .get_string(&AttributePath::new("content"))
            .unwrap()
            .starts_with("apiVersion"));
        assert_eq!(
            state.get_string(&AttributePath::new("project_id")).unwrap(),
            "11"
        );
    }
}
