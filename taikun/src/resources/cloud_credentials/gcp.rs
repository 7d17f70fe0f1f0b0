//! taikun_cloud_credential_gcp
//!
//! The service-account key is passed as the path to the JSON file; its
//! contents go to the API and never come back.

use std::path::Path;

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
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};

use crate::api::cloud_credentials::CreateGcpCommand;
use crate::api::{ApiError, LockMode};
use crate::provider_data::TaikunProviderData;
use crate::resources::cloud_credentials::{
    apply_rename_and_lock, delete_credential, extra_i32, extra_string, flatten_common,
    graft_secrets,
};
use crate::resources::{
    api_error_diag, bool_or, opt_id, opt_number, opt_string, provider_data_from, required_id,
    required_string,
};
use crate::utils::{
    read_after_write, READ_AFTER_CREATE_TIMEOUT, READ_AFTER_UPDATE_TIMEOUT,
};

const SECRETS: &[&str] = &["config_file"];

#[derive(Default)]
pub struct GcpCredentialResource {
    provider_data: Option<TaikunProviderData>,
}

impl GcpCredentialResource {
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
        declared: &DynamicValue,
        post_write: bool,
    ) -> Result<Option<DynamicValue>, ApiError> {
        let data = self.data()?;
        match data.client.cloud_credentials().by_id(id).await? {
            Some(row) => {
                let mut state = flatten_common(&row)?;
                state.set_string(
                    &AttributePath::new("region"),
                    extra_string(&row, "region"),
                )?;
                state.set_number(
                    &AttributePath::new("availability_zones"),
                    extra_i32(&row, "azCount").unwrap_or(1) as f64,
                )?;
                state.set_string(
                    &AttributePath::new("billing_account_id"),
                    extra_string(&row, "billingAccountId"),
                )?;
                state.set_string(
                    &AttributePath::new("folder_id"),
                    extra_string(&row, "folderId"),
                )?;
                state.set_bool(
                    &AttributePath::new("import_project"),
                    bool_or(declared, "import_project", false),
                )?;
                graft_secrets(&mut state, declared, SECRETS)?;
                Ok(Some(state))
            }
            None if post_write => Err(ApiError::NotFoundAfterCreateOrUpdate),
            None => Ok(None),
        }
    }
}

pub fn gcp_credential_schema() -> Schema {
    SchemaBuilder::new()
        .description("Taikun GCP Cloud Credential")
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("config_file", AttributeType::String)
                .description("Path to the service-account JSON key file.")
                .required()
                .force_new()
                .sensitive()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("region", AttributeType::String)
                .required()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("availability_zones", AttributeType::Number)
                .optional()
                .computed()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("import_project", AttributeType::Bool)
                .description("Reuse the project named in the key file instead of creating one.")
                .optional()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("billing_account_id", AttributeType::String)
                .optional()
                .computed()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("folder_id", AttributeType::String)
                .optional()
                .computed()
                .force_new()
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
        .attribute(
            AttributeBuilder::new("is_default", AttributeType::Bool)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("created_by", AttributeType::String)
                .computed()
                .build(),
        )
        .build()
}

#[async_trait]
impl Resource for GcpCredentialResource {
    fn type_name(&self) -> &str {
        "taikun_cloud_credential_gcp"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: gcp_credential_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];
        // import_project pulls billing from the imported project
        if bool_or(&request.config, "import_project", false)
            && (opt_string(&request.config, "billing_account_id").is_some()
                || opt_string(&request.config, "folder_id").is_some())
        {
            diagnostics.push(Diagnostic::error(
                "Conflicting project settings",
                "billing_account_id and folder_id cannot be set when import_project is enabled",
            ));
        }
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let config = &request.config;

            let key_path = required_string(config, "config_file")?;
            let key_contents = tokio::fs::read_to_string(Path::new(&key_path))
                .await
                .map_err(|e| {
                    ApiError::Validation(format!("cannot read config_file {:?}: {}", key_path, e))
                })?;

            let command = CreateGcpCommand {
                name: required_string(config, "name")?,
                config_file: key_contents,
                region: required_string(config, "region")?,
                az_count: opt_number(config, "availability_zones").unwrap_or(1.0) as i32,
                import_project: bool_or(config, "import_project", false),
                billing_account_id: opt_string(config, "billing_account_id"),
                folder_id: opt_string(config, "folder_id"),
                organization_id: opt_id(config, "organization_id")?,
            };
            let created = data.client.cloud_credentials().create_gcp(&command).await?;
            if bool_or(config, "lock", false) {
                data.client
                    .cloud_credentials()
                    .lock(created.id, LockMode::Lock)
                    .await?;
            }

            read_after_write(&ctx, "GCP credential", READ_AFTER_CREATE_TIMEOUT, || {
                self.read_state(created.id, config, true)
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
                diagnostics: vec![api_error_diag("Failed to create GCP credential", &e)],
            },
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result: Result<Option<DynamicValue>, ApiError> = async {
            let id = required_id(&request.current_state, "id")?;
            self.read_state(id, &request.current_state, false).await
        }
        .await;

        match result {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![api_error_diag("Failed to read GCP credential", &e)],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            apply_rename_and_lock(data, id, &request).await?;

            read_after_write(&ctx, "GCP credential", READ_AFTER_UPDATE_TIMEOUT, || {
                self.read_state(id, &request.planned_state, true)
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
                diagnostics: vec![api_error_diag("Failed to update GCP credential", &e)],
            },
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let result: Result<(), ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            delete_credential(data, id, bool_or(&request.prior_state, "lock", false)).await
        }
        .await;

        DeleteResourceResponse {
            diagnostics: match result {
                Ok(()) => vec![],
                Err(e) => vec![api_error_diag("Failed to delete GCP credential", &e)],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for GcpCredentialResource {
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
    async fn validate_rejects_billing_fields_with_import() {
        let mut config = DynamicValue::empty_map();
        config
            .set_bool(&AttributePath::new("import_project"), true)
            .unwrap();
        config
            .set_string(
                &AttributePath::new("billing_account_id"),
                "01AB-CD23".to_string(),
            )
            .unwrap();

        let resource = GcpCredentialResource::new();
        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "taikun_cloud_credential_gcp".to_string(),
                    config,
                },
            )
            .await;
        assert_eq!(response.diagnostics.len(), 1);
    }
}
