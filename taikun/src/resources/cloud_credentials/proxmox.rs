//! taikun_cloud_credential_proxmox

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

use crate::api::cloud_credentials::CreateProxmoxCommand;
use crate::api::{ApiError, LockMode};
use crate::provider_data::TaikunProviderData;
use crate::resources::cloud_credentials::{
    apply_rename_and_lock, delete_credential, extra_string, extra_string_list, flatten_common,
    graft_secrets,
};
use crate::resources::{
    api_error_diag, bool_or, opt_id, opt_number, provider_data_from, required_id, required_string,
    string_list,
};
use crate::utils::{
    read_after_write, READ_AFTER_CREATE_TIMEOUT, READ_AFTER_UPDATE_TIMEOUT,
};

const SECRETS: &[&str] = &["client_id", "client_secret"];

#[derive(Default)]
pub struct ProxmoxCredentialResource {
    provider_data: Option<TaikunProviderData>,
}

impl ProxmoxCredentialResource {
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
                    &AttributePath::new("api_host"),
                    extra_string(&row, "apiHost"),
                )?;
                state.set_string(
                    &AttributePath::new("storage"),
                    extra_string(&row, "storage"),
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
                    "public_network",
                    "public_gateway",
                    "public_begin_allocation_range",
                    "public_end_allocation_range",
                    "private_network",
                    "private_gateway",
                    "private_begin_allocation_range",
                    "private_end_allocation_range",
                ] {
                    state.set_string(
                        &AttributePath::new(attr),
                        crate::resources::string_or_empty(declared, attr),
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

pub fn proxmox_credential_schema() -> Schema {
    let mut builder = SchemaBuilder::new()
        .description("Taikun Proxmox Cloud Credential")
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
            AttributeBuilder::new("api_host", AttributeType::String)
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
            AttributeBuilder::new("storage", AttributeType::String)
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
                AttributeBuilder::new(&format!("{prefix}_network"), AttributeType::String)
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
impl Resource for ProxmoxCredentialResource {
    fn type_name(&self) -> &str {
        "taikun_cloud_credential_proxmox"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: proxmox_credential_schema(),
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

            let command = CreateProxmoxCommand {
                name: required_string(config, "name")?,
                api_host: required_string(config, "api_host")?,
                client_id: required_string(config, "client_id")?,
                client_secret: required_string(config, "client_secret")?,
                storage: required_string(config, "storage")?,
                vm_template_name: required_string(config, "vm_template_name")?,
                hypervisors: string_list(config, "hypervisors"),
                public_network: required_string(config, "public_network")?,
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
                private_network: required_string(config, "private_network")?,
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
                .create_proxmox(&command)
                .await?;
            if bool_or(config, "lock", false) {
                data.client
                    .cloud_credentials()
                    .lock(created.id, LockMode::Lock)
                    .await?;
            }

            read_after_write(&ctx, "Proxmox credential", READ_AFTER_CREATE_TIMEOUT, || {
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
                diagnostics: vec![api_error_diag("Failed to create Proxmox credential", &e)],
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
                diagnostics: vec![api_error_diag("Failed to read Proxmox credential", &e)],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            apply_rename_and_lock(data, id, &request).await?;

            read_after_write(&ctx, "Proxmox credential", READ_AFTER_UPDATE_TIMEOUT, || {
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
                diagnostics: vec![api_error_diag("Failed to update Proxmox credential", &e)],
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
                Err(e) => vec![api_error_diag("Failed to delete Proxmox credential", &e)],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for ProxmoxCredentialResource {
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
