//! taikun_app_instance
//!
//! An application instance is a catalog package installed into a
//! project. Installs and edits are asynchronous on the platform side,
//! so both wait for the instance to reach Ready before returning.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
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

use crate::api::applications::{InstallInstanceCommand, InstanceDetails, INSTANCE_FAILURE, INSTANCE_READY};
use crate::api::ApiError;
use crate::provider_data::TaikunProviderData;
use crate::resources::{
    api_error_diag, bool_or, opt_string, provider_data_from, required_id, required_string,
};
use crate::utils::{
    i32toa, poll_until, read_after_write, INSTANCE_POLL_INTERVAL, INSTANCE_TIMEOUT,
    READ_AFTER_CREATE_TIMEOUT, READ_AFTER_UPDATE_TIMEOUT,
};

#[derive(Default)]
pub struct AppInstanceResource {
    provider_data: Option<TaikunProviderData>,
}

impl AppInstanceResource {
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
        match data.client.applications().details(id).await? {
            Some(details) => Ok(Some(flatten(&details, declared)?)),
            None if post_write => Err(ApiError::NotFoundAfterCreateOrUpdate),
            None => Ok(None),
        }
    }

    /// Blocks until the instance reports Ready. Failure is terminal here,
    /// the platform does not recover an instance on its own.
    async fn wait_ready(&self, ctx: &Context, id: i32) -> Result<(), ApiError> {
        let data = self.data()?;
        let client = &data.client;
        poll_until(
            ctx,
            &format!("application instance {}", id),
            INSTANCE_READY,
            INSTANCE_TIMEOUT,
            INSTANCE_POLL_INTERVAL,
            move || async move {
                match client.applications().details(id).await? {
                    Some(details) if details.status == INSTANCE_READY => Ok(true),
                    Some(details) if details.status == INSTANCE_FAILURE => {
                        Err(ApiError::Validation(format!(
                            "application instance {} entered {}",
                            id, INSTANCE_FAILURE
                        )))
                    }
                    _ => Ok(false),
                }
            },
        )
        .await
    }
}

/// YAML values travel base64-url-encoded; the attribute holds a file
/// path, the wire carries the encoded contents.
async fn encoded_values(config: &DynamicValue) -> Result<Option<String>, ApiError> {
    match opt_string(config, "parameters_yaml") {
        Some(path) => {
            let yaml = tokio::fs::read_to_string(Path::new(&path))
                .await
                .map_err(|e| {
                    ApiError::Validation(format!("cannot read parameters_yaml {:?}: {}", path, e))
                })?;
            Ok(Some(URL_SAFE.encode(yaml)))
        }
        None => Ok(None),
    }
}

fn flatten(details: &InstanceDetails, declared: &DynamicValue) -> Result<DynamicValue, ApiError> {
    let mut state = DynamicValue::empty_map();
    state.set_string(&AttributePath::new("id"), i32toa(details.id))?;
    state.set_string(&AttributePath::new("name"), details.name.clone())?;
    state.set_string(&AttributePath::new("project_id"), i32toa(details.project_id))?;
    state.set_string(
        &AttributePath::new("catalog_app_id"),
        i32toa(details.catalog_app_id),
    )?;
    state.set_bool(&AttributePath::new("autosync"), details.autosync)?;
    state.set_string(&AttributePath::new("status"), details.status.clone())?;
    // the state keeps the local file path, not the encoded payload
    if let Some(path) = opt_string(declared, "parameters_yaml") {
        state.set_string(&AttributePath::new("parameters_yaml"), path)?;
    }
    Ok(state)
}

pub fn app_instance_schema() -> Schema {
    SchemaBuilder::new()
        .description("Taikun Application Instance")
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
            AttributeBuilder::new("catalog_app_id", AttributeType::String)
                .required()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("autosync", AttributeType::Bool)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("parameters_yaml", AttributeType::String)
                .description("Path to a YAML file with chart value overrides.")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("status", AttributeType::String)
                .computed()
                .build(),
        )
        .build()
}

#[async_trait]
impl Resource for AppInstanceResource {
    fn type_name(&self) -> &str {
        "taikun_app_instance"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: app_instance_schema(),
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

            let command = InstallInstanceCommand {
                name: required_string(config, "name")?,
                project_id: required_id(config, "project_id")?,
                catalog_app_id: required_id(config, "catalog_app_id")?,
                autosync: bool_or(config, "autosync", false),
                extra_values: encoded_values(config).await?,
            };
            let created = data.client.applications().install(&command).await?;

            self.wait_ready(&ctx, created.id).await?;

            read_after_write(&ctx, "application instance", READ_AFTER_CREATE_TIMEOUT, || {
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
                diagnostics: vec![api_error_diag("Failed to install application instance", &e)],
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
                diagnostics: vec![api_error_diag("Failed to read application instance", &e)],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            let config = &request.planned_state;

            let autosync = request
                .has_change(&AttributePath::new("autosync"))
                .then(|| bool_or(config, "autosync", false));
            let values_changed = request.has_change(&AttributePath::new("parameters_yaml"));
            // a removed values file resets the chart to its defaults
            let extra_values = if values_changed {
                Some(encoded_values(config).await?.unwrap_or_default())
            } else {
                None
            };

            if autosync.is_some() || values_changed {
                data.client
                    .applications()
                    .edit(id, autosync, extra_values)
                    .await?;
                // flipping autosync is a metadata change; only new values
                // need a sync to take effect
                if values_changed {
                    data.client.applications().sync(id).await?;
                    self.wait_ready(&ctx, id).await?;
                }
            }

            read_after_write(&ctx, "application instance", READ_AFTER_UPDATE_TIMEOUT, || {
                self.read_state(id, config, true)
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
                diagnostics: vec![api_error_diag("Failed to update application instance", &e)],
            },
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let result: Result<(), ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            let client = &data.client;

            client.applications().uninstall(id).await?;

            // a failed uninstall leaves the instance in Failure; retry it
            // once before giving up
            let retried = AtomicBool::new(false);
            let retried_ref = &retried;
            poll_until(
                &ctx,
                &format!("application instance {}", id),
                "uninstalled",
                INSTANCE_TIMEOUT,
                INSTANCE_POLL_INTERVAL,
                move || async move {
                    match client.applications().details(id).await? {
                        None => Ok(true),
                        Some(details)
                            if details.status == INSTANCE_FAILURE
                                && !retried_ref.swap(true, Ordering::SeqCst) =>
                        {
                            client.applications().uninstall(id).await?;
                            Ok(false)
                        }
                        Some(_) => Ok(false),
                    }
                },
            )
            .await
        }
        .await;

        DeleteResourceResponse {
            diagnostics: match result {
                Ok(()) => vec![],
                Err(e) => vec![api_error_diag("Failed to uninstall application instance", &e)],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for AppInstanceResource {
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
    async fn encoded_values_round_trips_through_base64_url() {
        let dir = std::env::temp_dir().join("taikun-app-instance-test");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("values.yaml");
        tokio::fs::write(&path, "replicaCount: 3\n").await.unwrap();

        let mut config = DynamicValue::empty_map();
        config
            .set_string(
                &AttributePath::new("parameters_yaml"),
                path.to_string_lossy().to_string(),
            )
            .unwrap();

        let encoded = encoded_values(&config).await.unwrap().unwrap();
        let decoded = URL_SAFE.decode(encoded).unwrap();
        assert_eq!(decoded, b"replicaCount: 3\n");
    }

    #[tokio::test]
    async fn encoded_values_name_a_missing_file() {
        let mut config = DynamicValue::empty_map();
        config
            .set_string(
                &AttributePath::new("parameters_yaml"),
                "/nonexistent/values.yaml".to_string(),
            )
            .unwrap();
        assert!(matches!(
            encoded_values(&config).await,
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn flatten_keeps_the_local_values_path() {
        let mut declared = DynamicValue::empty_map();
        declared
            .set_string(
                &AttributePath::new("parameters_yaml"),
                "values.yaml".to_string(),
            )
            .unwrap();

        let details = InstanceDetails {
            id: 12,
            name: "wordpress".to_string(),
            project_id: 3,
            catalog_app_id: 7,
            status: INSTANCE_READY.to_string(),
            autosync: true,
            extra_values: Some("cmVwbGljYUNvdW50OiAz".to_string()),
        };
        let state = flatten(&details, &declared).unwrap();
        assert_eq!(
            state
                .get_string(&AttributePath::new("parameters_yaml"))
                .unwrap(),
            "values.yaml"
        );
        assert_eq!(
            state.get_string(&AttributePath::new("status")).unwrap(),
            INSTANCE_READY
        );
    }
}
