//! taikun_cloud_credential_vsphere

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
use tfplug::types::{AttributePath, Dynamic, DynamicValue};
use tfplug::validator::NumberRangeValidator;

use crate::api::cloud_credentials::CreateVsphereCommand;
use crate::api::{ApiError, LockMode};
use crate::provider_data::TaikunProviderData;
use crate::resources::cloud_credentials::{
    apply_rename_and_lock, delete_credential, extra_bool, extra_string, extra_string_list,
    flatten_common, graft_secrets,
};
use crate::resources::{
    api_error_diag, bool_or, opt_id, opt_number, provider_data_from, required_id, required_string,
    string_list, string_or_empty,
};
use crate::utils::{
    read_after_write, READ_AFTER_CREATE_TIMEOUT, READ_AFTER_UPDATE_TIMEOUT,
};

const SECRETS: &[&str] = &["username", "password"];

#[derive(Default)]
pub struct VsphereCredentialResource {
    provider_data: Option<TaikunProviderData>,
}

impl VsphereCredentialResource {
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
                    &AttributePath::new("api_url"),
                    extra_string(&row, "apiUrl"),
                )?;
                state.set_string(
                    &AttributePath::new("datacenter"),
                    extra_string(&row, "datacenterName"),
                )?;
                state.set_string(
                    &AttributePath::new("resource_pool"),
                    extra_string(&row, "resourcePoolName"),
                )?;
                state.set_string(
                    &AttributePath::new("data_store"),
                    extra_string(&row, "dataStoreName"),
                )?;
                state.set_bool(
                    &AttributePath::new("drs_enabled"),
                    extra_bool(&row, "drsEnabled"),
                )?;
                state.set_string(
                    &AttributePath::new("vm_template_name"),
                    extra_string(&row, "vmTemplateName"),
                )?;
                state.set_list(
                    &AttributePath::new("hypervisors"),
                    extra_string_list(&row, "hypervisors")
                        .into_iter()
                        .map(Dynamic::String)
                        .collect(),
                )?;
                // network blocks are write-only, carry the declared values
                for attr in [
                    "public_network_name",
                    "public_gateway",
                    "public_begin_allocation_range",
                    "public_end_allocation_range",
                    "private_network_name",
                    "private_gateway",
                    "private_begin_allocation_range",
                    "private_end_allocation_range",
                ] {
                    state.set_string(
                        &AttributePath::new(attr),
                        string_or_empty(declared, attr),
                    )?;
                }
                for attr in ["public_netmask", "private_netmask"] {
                    state.set_number(
                        &AttributePath::new(attr),
                        opt_number(declared, attr).unwrap_or_default(),
                    )?;
                }
                graft_secrets(&mut state, declared, SECRETS)?;
                Ok(Some(state))
            }
            None if post_write => Err(ApiError::NotFoundAfterCreateOrUpdate),
            None => Ok(None),
        }
    }
}

pub fn vsphere_credential_schema() -> Schema {
    let mut builder = SchemaBuilder::new()
        .description("Taikun vSphere Cloud Credential")
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
            AttributeBuilder::new("username", AttributeType::String)
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
            AttributeBuilder::new("api_url", AttributeType::String)
                .required()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("datacenter", AttributeType::String)
                .required()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("resource_pool", AttributeType::String)
                .required()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("data_store", AttributeType::String)
                .required()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("drs_enabled", AttributeType::Bool)
                .required()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("vm_template_name", AttributeType::String)
                .required()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "hypervisors",
                AttributeType::List(Box::new(AttributeType::String)),
            )
            .required()
            .force_new()
            .build(),
        );

    for prefix in ["public", "private"] {
        builder = builder
            .attribute(
                AttributeBuilder::new(&format!("{prefix}_network_name"), AttributeType::String)
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(&format!("{prefix}_netmask"), AttributeType::Number)
                    .required()
                    .force_new()
                    .validator(Arc::new(NumberRangeValidator {
                        min: Some(0.0),
                        max: Some(32.0),
                    }))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(&format!("{prefix}_gateway"), AttributeType::String)
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    &format!("{prefix}_begin_allocation_range"),
                    AttributeType::String,
                )
                .required()
                .force_new()
                .build(),
            )
            .attribute(
                AttributeBuilder::new(
                    &format!("{prefix}_end_allocation_range"),
                    AttributeType::String,
                )
                .required()
                .force_new()
                .build(),
            );
    }

    builder
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
impl Resource for VsphereCredentialResource {
    fn type_name(&self) -> &str {
        "taikun_cloud_credential_vsphere"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: vsphere_credential_schema(),
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

            let command = CreateVsphereCommand {
                name: required_string(config, "name")?,
                username: required_string(config, "username")?,
                password: required_string(config, "password")?,
                api_url: required_string(config, "api_url")?,
                datacenter: required_string(config, "datacenter")?,
                resource_pool: required_string(config, "resource_pool")?,
                data_store: required_string(config, "data_store")?,
                drs_enabled: bool_or(config, "drs_enabled", false),
                hypervisors: string_list(config, "hypervisors"),
                vm_template_name: required_string(config, "vm_template_name")?,
                public_network_name: required_string(config, "public_network_name")?,
                public_netmask: opt_number(config, "public_netmask").unwrap_or_default() as i32,
                public_gateway: required_string(config, "public_gateway")?,
                public_begin_allocation_range: required_string(
                    config,
                    "public_begin_allocation_range",
                )?,
                public_end_allocation_range: required_string(
                    config,
                    "public_end_allocation_range",
                )?,
                private_network_name: required_string(config, "private_network_name")?,
                private_netmask: opt_number(config, "private_netmask").unwrap_or_default() as i32,
                private_gateway: required_string(config, "private_gateway")?,
                private_begin_allocation_range: required_string(
                    config,
                    "private_begin_allocation_range",
                )?,
                private_end_allocation_range: required_string(
                    config,
                    "private_end_allocation_range",
                )?,
                organization_id: opt_id(config, "organization_id")?,
            };
            let created = data
                .client
                .cloud_credentials()
                .create_vsphere(&command)
                .await?;
            if bool_or(config, "lock", false) {
                data.client
                    .cloud_credentials()
                    .lock(created.id, LockMode::Lock)
                    .await?;
            }

            read_after_write(&ctx, "vSphere credential", READ_AFTER_CREATE_TIMEOUT, || {
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
                diagnostics: vec![api_error_diag("Failed to create vSphere credential", &e)],
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
                diagnostics: vec![api_error_diag("Failed to read vSphere credential", &e)],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            apply_rename_and_lock(data, id, &request).await?;

            read_after_write(&ctx, "vSphere credential", READ_AFTER_UPDATE_TIMEOUT, || {
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
                diagnostics: vec![api_error_diag("Failed to update vSphere credential", &e)],
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
                Err(e) => vec![api_error_diag("Failed to delete vSphere credential", &e)],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for VsphereCredentialResource {
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
