//! taikun_cloud_credential_aws

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

use crate::api::cloud_credentials::CreateAwsCommand;
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

const SECRETS: &[&str] = &["access_key_id", "secret_access_key"];

#[derive(Default)]
pub struct AwsCredentialResource {
    provider_data: Option<TaikunProviderData>,
}

impl AwsCredentialResource {
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
                    extra_string(&row, "awsRegion"),
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

pub fn aws_credential_schema() -> Schema {
    SchemaBuilder::new()
        .description("Taikun AWS Cloud Credential")
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
            AttributeBuilder::new("access_key_id", AttributeType::String)
                .required()
                .force_new()
                .sensitive()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("secret_access_key", AttributeType::String)
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
                .description("Number of availability zones to span, 1 to 3.")
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
impl Resource for AwsCredentialResource {
    fn type_name(&self) -> &str {
        "taikun_cloud_credential_aws"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: aws_credential_schema(),
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

            let command = CreateAwsCommand {
                name: required_string(config, "name")?,
                aws_access_key_id: required_string(config, "access_key_id")?,
                aws_secret_access_key: required_string(config, "secret_access_key")?,
                aws_region: required_string(config, "region")?,
                az_count: opt_number(config, "availability_zones").unwrap_or(1.0) as i32,
                organization_id: opt_id(config, "organization_id")?,
            };
            let created = data.client.cloud_credentials().create_aws(&command).await?;
            if bool_or(config, "lock", false) {
                data.client
                    .cloud_credentials()
                    .lock(created.id, LockMode::Lock)
                    .await?;
            }

            read_after_write(&ctx, "AWS credential", READ_AFTER_CREATE_TIMEOUT, || {
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
                diagnostics: vec![api_error_diag("Failed to create AWS credential", &e)],
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
                diagnostics: vec![api_error_diag("Failed to read AWS credential", &e)],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            apply_rename_and_lock(data, id, &request).await?;

            read_after_write(&ctx, "AWS credential", READ_AFTER_UPDATE_TIMEOUT, || {
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
                diagnostics: vec![api_error_diag("Failed to update AWS credential", &e)],
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
                Err(e) => vec![api_error_diag("Failed to delete AWS credential", &e)],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for AwsCredentialResource {
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
