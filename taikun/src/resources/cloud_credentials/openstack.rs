//! taikun_cloud_credential_openstack

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

use crate::api::cloud_credentials::CreateOpenstackCommand;
use crate::api::{ApiError, LockMode};
use crate::provider_data::TaikunProviderData;
use crate::resources::cloud_credentials::{
    apply_rename_and_lock, delete_credential, extra_bool, extra_string, flatten_common,
    graft_secrets,
};
use crate::resources::{
    api_error_diag, bool_or, opt_id, opt_string, provider_data_from, required_id, required_string,
};
use crate::utils::{
    read_after_write, READ_AFTER_CREATE_TIMEOUT, READ_AFTER_UPDATE_TIMEOUT,
};

const SECRETS: &[&str] = &["user", "password"];

#[derive(Default)]
pub struct OpenstackCredentialResource {
    provider_data: Option<TaikunProviderData>,
}

impl OpenstackCredentialResource {
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
            Some(row) => Ok(Some(flatten(&row, declared)?)),
            None if post_write => Err(ApiError::NotFoundAfterCreateOrUpdate),
            None => Ok(None),
        }
    }
}

pub(crate) fn flatten(
    row: &crate::api::cloud_credentials::CloudCredentialRow,
    declared: &DynamicValue,
) -> Result<DynamicValue, ApiError> {
    let mut state = flatten_common(row)?;
    state.set_string(&AttributePath::new("url"), extra_string(row, "openstackUrl"))?;
    state.set_string(
        &AttributePath::new("project_name"),
        extra_string(row, "openstackProject"),
    )?;
    state.set_string(
        &AttributePath::new("project_id"),
        extra_string(row, "openstackProjectId"),
    )?;
    state.set_string(
        &AttributePath::new("domain"),
        extra_string(row, "openstackDomain"),
    )?;
    state.set_string(
        &AttributePath::new("public_network_name"),
        extra_string(row, "openstackPublicNetwork"),
    )?;
    state.set_string(
        &AttributePath::new("availability_zone"),
        extra_string(row, "openstackAvailabilityZone"),
    )?;
    state.set_string(
        &AttributePath::new("volume_type_name"),
        extra_string(row, "openstackVolumeType"),
    )?;
    state.set_string(
        &AttributePath::new("continent"),
        extra_string(row, "openstackContinent"),
    )?;
    state.set_string(
        &AttributePath::new("region"),
        extra_string(row, "openstackRegion"),
    )?;
    state.set_bool(
        &AttributePath::new("import_network"),
        extra_bool(row, "openstackImportNetwork"),
    )?;
    graft_secrets(&mut state, declared, SECRETS)?;
    Ok(state)
}

pub fn openstack_credential_schema() -> Schema {
    SchemaBuilder::new()
        .description("Taikun OpenStack Cloud Credential")
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
            AttributeBuilder::new("user", AttributeType::String)
                .required()
                .force_new()
                .sensitive()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("password", AttributeType::String)
                .required()
                .force_new()
                .sensitive()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("url", AttributeType::String)
                .description("Keystone auth URL.")
                .required()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("project_name", AttributeType::String)
                .required()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("project_id", AttributeType::String)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("domain", AttributeType::String)
                .required()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("public_network_name", AttributeType::String)
                .required()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("availability_zone", AttributeType::String)
                .optional()
                .computed()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("volume_type_name", AttributeType::String)
                .optional()
                .computed()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("continent", AttributeType::String)
                .optional()
                .computed()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("region", AttributeType::String)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("import_network", AttributeType::Bool)
                .description("Reuse the project's existing network instead of creating one.")
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
impl Resource for OpenstackCredentialResource {
    fn type_name(&self) -> &str {
        "taikun_cloud_credential_openstack"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: openstack_credential_schema(),
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

            let command = CreateOpenstackCommand {
                name: required_string(config, "name")?,
                openstack_user: required_string(config, "user")?,
                openstack_password: required_string(config, "password")?,
                openstack_url: required_string(config, "url")?,
                openstack_project: required_string(config, "project_name")?,
                openstack_domain: required_string(config, "domain")?,
                openstack_public_network: required_string(config, "public_network_name")?,
                openstack_availability_zone: opt_string(config, "availability_zone"),
                openstack_volume_type: opt_string(config, "volume_type_name"),
                openstack_continent: opt_string(config, "continent"),
                openstack_import_network: match config
                    .get(&AttributePath::new("import_network"))
                {
                    Some(tfplug::types::Dynamic::Bool(b)) => Some(*b),
                    _ => None,
                },
                organization_id: opt_id(config, "organization_id")?,
            };
            let created = data
                .client
                .cloud_credentials()
                .create_openstack(&command)
                .await?;
            if bool_or(config, "lock", false) {
                data.client
                    .cloud_credentials()
                    .lock(created.id, LockMode::Lock)
                    .await?;
            }

            read_after_write(&ctx, "OpenStack credential", READ_AFTER_CREATE_TIMEOUT, || {
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
                diagnostics: vec![api_error_diag("Failed to create OpenStack credential", &e)],
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
                diagnostics: vec![api_error_diag("Failed to read OpenStack credential", &e)],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            apply_rename_and_lock(data, id, &request).await?;

            read_after_write(&ctx, "OpenStack credential", READ_AFTER_UPDATE_TIMEOUT, || {
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
                diagnostics: vec![api_error_diag("Failed to update OpenStack credential", &e)],
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
                Err(e) => vec![api_error_diag("Failed to delete OpenStack credential", &e)],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for OpenstackCredentialResource {
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
