//! taikun_kubernetes_profile
//!
//! Immutable apart from the lock flag: every functional field forces a
//! recreate, matching the API which has no edit endpoint.

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
use tfplug::validator::{StringInSliceValidator, StringLengthValidator};

use crate::api::profiles::{CreateKubernetesProfileCommand, KubernetesProfileRow};
use crate::api::{ApiError, LockMode};
use crate::provider_data::TaikunProviderData;
use crate::resources::{
    api_error_diag, bool_or, opt_id, opt_string, provider_data_from, required_id, required_string,
};
use crate::utils::{
    i32toa, read_after_write, READ_AFTER_CREATE_TIMEOUT, READ_AFTER_UPDATE_TIMEOUT,
};

#[derive(Default)]
pub struct KubernetesProfileResource {
    provider_data: Option<TaikunProviderData>,
}

impl KubernetesProfileResource {
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
        match data.client.kubernetes_profiles().by_id(id).await? {
            Some(row) => Ok(Some(flatten(&row)?)),
            None if post_write => Err(ApiError::NotFoundAfterCreateOrUpdate),
            None => Ok(None),
        }
    }
}

fn flatten(row: &KubernetesProfileRow) -> Result<DynamicValue, ApiError> {
    let mut state = DynamicValue::empty_map();
    state.set_string(&AttributePath::new("id"), i32toa(row.id))?;
    state.set_string(&AttributePath::new("name"), row.name.clone())?;
    state.set_string(&AttributePath::new("cni"), row.cni.clone())?;
    state.set_bool(&AttributePath::new("load_balancing_solution_octavia"), row.octavia_enabled)?;
    state.set_bool(
        &AttributePath::new("load_balancing_solution_taikun"),
        row.taikun_lb_enabled,
    )?;
    state.set_bool(
        &AttributePath::new("expose_node_port_on_bastion"),
        row.expose_node_port_on_bastion,
    )?;
    state.set_bool(&AttributePath::new("unique_cluster_name"), row.unique_cluster_name)?;
    state.set_bool(
        &AttributePath::new("nvidia_gpu_operator"),
        row.nvidia_gpu_operator_enabled,
    )?;
    state.set_string(
        &AttributePath::new("proxmox_storage"),
        row.proxmox_storage.clone().unwrap_or_default(),
    )?;
    state.set_string(
        &AttributePath::new("organization_id"),
        row.organization_id.map(i32toa).unwrap_or_default(),
    )?;
    state.set_bool(&AttributePath::new("lock"), row.is_locked)?;
    Ok(state)
}

pub fn kubernetes_profile_schema() -> Schema {
    SchemaBuilder::new()
        .description("Taikun Kubernetes Profile")
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
            AttributeBuilder::new("cni", AttributeType::String)
                .description("Container network interface plugin.")
                .optional()
                .force_new()
                .validator(Arc::new(StringInSliceValidator::new(&["calico", "cilium"])))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("load_balancing_solution_octavia", AttributeType::Bool)
                .optional()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("load_balancing_solution_taikun", AttributeType::Bool)
                .optional()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("expose_node_port_on_bastion", AttributeType::Bool)
                .optional()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("unique_cluster_name", AttributeType::Bool)
                .optional()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("nvidia_gpu_operator", AttributeType::Bool)
                .optional()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("proxmox_storage", AttributeType::String)
                .description("Storage class backing Proxmox workers: NFS or OpenEBS.")
                .optional()
                .force_new()
                .validator(Arc::new(StringInSliceValidator::new(&["NFS", "OpenEBS"])))
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
impl Resource for KubernetesProfileResource {
    fn type_name(&self) -> &str {
        "taikun_kubernetes_profile"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: kubernetes_profile_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];
        if bool_or(&request.config, "load_balancing_solution_octavia", false)
            && bool_or(&request.config, "load_balancing_solution_taikun", false)
        {
            diagnostics.push(tfplug::types::Diagnostic::error(
                "Conflicting load balancers",
                "octavia and the Taikun load balancer are mutually exclusive",
            ));
        }
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let config = &request.config;

            let command = CreateKubernetesProfileCommand {
                name: required_string(config, "name")?,
                cni: opt_string(config, "cni").unwrap_or_else(|| "calico".to_string()),
                octavia_enabled: bool_or(config, "load_balancing_solution_octavia", false),
                taikun_lb_enabled: bool_or(config, "load_balancing_solution_taikun", false),
                expose_node_port_on_bastion: bool_or(config, "expose_node_port_on_bastion", false),
                unique_cluster_name: bool_or(config, "unique_cluster_name", false),
                nvidia_gpu_operator_enabled: bool_or(config, "nvidia_gpu_operator", false),
                proxmox_storage: opt_string(config, "proxmox_storage"),
                organization_id: opt_id(config, "organization_id")?,
            };

            let created = data.client.kubernetes_profiles().create(&command).await?;
            if bool_or(config, "lock", false) {
                data.client
                    .kubernetes_profiles()
                    .lock(created.id, LockMode::Lock)
                    .await?;
            }

            read_after_write(&ctx, "kubernetes profile", READ_AFTER_CREATE_TIMEOUT, || {
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
                diagnostics: vec![api_error_diag("Failed to create kubernetes profile", &e)],
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
                diagnostics: vec![api_error_diag("Failed to read kubernetes profile", &e)],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        // only the lock flag is updatable in place
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            if request.has_change(&AttributePath::new("lock")) {
                let mode = LockMode::from_bool(bool_or(&request.planned_state, "lock", false));
                data.client.kubernetes_profiles().lock(id, mode).await?;
            }
            read_after_write(&ctx, "kubernetes profile", READ_AFTER_UPDATE_TIMEOUT, || {
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
                diagnostics: vec![api_error_diag("Failed to update kubernetes profile", &e)],
            },
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let result: Result<(), ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            if bool_or(&request.prior_state, "lock", false) {
                data.client
                    .kubernetes_profiles()
                    .lock(id, LockMode::Unlock)
                    .await?;
            }
            data.client.kubernetes_profiles().delete(id).await
        }
        .await;

        DeleteResourceResponse {
            diagnostics: match result {
                Ok(()) => vec![],
                Err(e) => vec![api_error_diag("Failed to delete kubernetes profile", &e)],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for KubernetesProfileResource {
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
    async fn validate_rejects_dual_load_balancers() {
        let mut config = DynamicValue::empty_map();
        config
            .set_bool(&AttributePath::new("load_balancing_solution_octavia"), true)
            .unwrap();
        config
            .set_bool(&AttributePath::new("load_balancing_solution_taikun"), true)
            .unwrap();

        let resource = KubernetesProfileResource::new();
        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "taikun_kubernetes_profile".to_string(),
                    config,
                },
            )
            .await;
        assert_eq!(response.diagnostics.len(), 1);
    }
}
