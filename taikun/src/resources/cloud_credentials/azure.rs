//! taikun_cloud_credential_azure

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

use crate::api::cloud_credentials::CreateAzureCommand;
use crate::api::{ApiError, LockMode};
use crate::provider_data::TaikunProviderData;
use crate::resources::cloud_credentials::{
    apply_rename_and_lock, delete_credential, extra_i32, extra_string, flatten_common,
    graft_secrets,
};
use crate::resources::{
    api_error_diag, bool_or, opt_id, opt_number, provider_data_from, required_id, required_string,
};
use crate::utils::{
    read_after_write, READ_AFTER_CREATE_TIMEOUT, READ_AFTER_UPDATE_TIMEOUT,
};

const SECRETS: &[&str] = &["client_id", "client_secret"];

#[derive(Default)]
pub struct AzureCredentialResource {
    provider_data: Option<TaikunProviderData>,
}

impl AzureCredentialResource {
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
                    &AttributePath::new("tenant_id"),
                    extra_string(&row, "azureTenantId"),
                )?;
                state.set_string(
                    &AttributePath::new("subscription_id"),
                    extra_string(&row, "azureSubscriptionId"),
                )?;
                state.set_string(
                    &AttributePath::new("location"),
                    extra_string(&row, "azureLocation"),
                )?;
                state.set_number(
                    &AttributePath::new("availability_zones"),
                    extra_i32(&row, "azCount").unwrap_or(1) as f64,
                )?;
                graft_secrets(&mut state, declared, SECRETS)?;
                Ok(Some(state))
            }
            None if post_write => Err(ApiError::NotFoundAfterCreateOrUpdate),
            None => Ok(None),
        }
    }
}

pub fn azure_credential_schema() -> Schema {
    SchemaBuilder::new()
        .description("Taikun Azure Cloud Credential")
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
            AttributeBuilder::new("tenant_id", AttributeType::String)
                .required()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("client_id", AttributeType::String)
                .required()
                .force_new()
                .sensitive()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("client_secret", AttributeType::String)
                .required()
                .force_new()
                .sensitive()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("subscription_id", AttributeType::String)
                .required()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("location", AttributeType::String)
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
impl Resource for AzureCredentialResource {
    fn type_name(&self) -> &str {
        "taikun_cloud_credential_azure"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: azure_credential_schema(),
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

            let command = CreateAzureCommand {
                name: required_string(config, "name")?,
                azure_tenant_id: required_string(config, "tenant_id")?,
                azure_client_id: required_string(config, "client_id")?,
                azure_client_secret: required_string(config, "client_secret")?,
                azure_subscription_id: required_string(config, "subscription_id")?,
                azure_location: required_string(config, "location")?,
                az_count: opt_number(config, "availability_zones").unwrap_or(1.0) as i32,
                organization_id: opt_id(config, "organization_id")?,
            };
            let created = data
                .client
                .cloud_credentials()
                .create_azure(&command)
                .await?;
            if bool_or(config, "lock", false) {
                data.client
                    .cloud_credentials()
                    .lock(created.id, LockMode::Lock)
                    .await?;
            }

            read_after_write(&ctx, "Azure credential", READ_AFTER_CREATE_TIMEOUT, || {
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
                diagnostics: vec![api_error_diag("Failed to create Azure credential", &e)],
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
                diagnostics: vec![api_error_diag("Failed to read Azure credential", &e)],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            apply_rename_and_lock(data, id, &request).await?;

            read_after_write(&ctx, "Azure credential", READ_AFTER_UPDATE_TIMEOUT, || {
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
                diagnostics: vec![api_error_diag("Failed to update Azure credential", &e)],
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
                Err(e) => vec![api_error_diag("Failed to delete Azure credential", &e)],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for AzureCredentialResource {
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
