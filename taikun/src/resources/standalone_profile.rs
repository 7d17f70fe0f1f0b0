//! taikun_standalone_profile

use std::collections::HashMap;
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
use tfplug::schema::{AttributeBuilder, AttributeType, NestingMode, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Dynamic, DynamicValue};
use tfplug::validator::{StringInSliceValidator, StringLengthValidator};

use crate::api::profiles::{CreateStandaloneProfileCommand, SecurityGroupSpec, StandaloneProfileRow};
use crate::api::{ApiError, LockMode};
use crate::provider_data::TaikunProviderData;
use crate::resources::{
    api_error_diag, bool_or, list_of_maps, opt_id, provider_data_from, required_id,
    required_string,
};
use crate::utils::{
    i32toa, read_after_write, READ_AFTER_CREATE_TIMEOUT, READ_AFTER_UPDATE_TIMEOUT,
};

#[derive(Default)]
pub struct StandaloneProfileResource {
    provider_data: Option<TaikunProviderData>,
}

impl StandaloneProfileResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> Result<&TaikunProviderData, ApiError> {
        self.provider_data
            .as_ref()
            .ok_or_else(|| ApiError::Validation("provider not configured".to_string()))
    }

    fn config_security_groups(config: &DynamicValue) -> Vec<SecurityGroupSpec> {
        list_of_maps(config, "security_group")
            .iter()
            .map(|entry| SecurityGroupSpec {
                id: None,
                name: entry
                    .get("name")
                    .and_then(|v| v.as_string())
                    .unwrap_or_default()
                    .to_string(),
                protocol: entry
                    .get("protocol")
                    .and_then(|v| v.as_string())
                    .unwrap_or_default()
                    .to_string(),
                port_min_range: entry
                    .get("from_port")
                    .and_then(|v| v.as_number())
                    .map(|n| n as i32),
                port_max_range: entry
                    .get("to_port")
                    .and_then(|v| v.as_number())
                    .map(|n| n as i32),
                remote_ip_prefix: entry
                    .get("cidr")
                    .and_then(|v| v.as_string())
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect()
    }

    async fn read_state(
        &self,
        id: i32,
        post_write: bool,
    ) -> Result<Option<DynamicValue>, ApiError> {
        let data = self.data()?;
        match data.client.standalone_profiles().by_id(id).await? {
            Some(row) => Ok(Some(flatten(&row)?)),
            None if post_write => Err(ApiError::NotFoundAfterCreateOrUpdate),
            None => Ok(None),
        }
    }

    async fn replace_security_groups(
        &self,
        profile_id: i32,
        config: &DynamicValue,
    ) -> Result<(), ApiError> {
        let data = self.data()?;
        let api = data.client.standalone_profiles();
        if let Some(row) = api.by_id(profile_id).await? {
            for group in &row.security_groups {
                if let Some(id) = group.id {
                    api.delete_security_group(id).await?;
                }
            }
        }
        for group in Self::config_security_groups(config) {
            api.create_security_group(profile_id, &group).await?;
        }
        Ok(())
    }
}

fn flatten(row: &StandaloneProfileRow) -> Result<DynamicValue, ApiError> {
    let mut state = DynamicValue::empty_map();
    state.set_string(&AttributePath::new("id"), i32toa(row.id))?;
    state.set_string(&AttributePath::new("name"), row.name.clone())?;
    state.set_string(&AttributePath::new("public_key"), row.public_key.clone())?;
    state.set_string(
        &AttributePath::new("organization_id"),
        row.organization_id.map(i32toa).unwrap_or_default(),
    )?;
    state.set_bool(&AttributePath::new("lock"), row.is_locked)?;

    let groups = row
        .security_groups
        .iter()
        .map(|group| {
            let mut map = HashMap::new();
            map.insert(
                "id".to_string(),
                Dynamic::String(group.id.map(i32toa).unwrap_or_default()),
            );
            map.insert("name".to_string(), Dynamic::String(group.name.clone()));
            map.insert(
                "protocol".to_string(),
                Dynamic::String(group.protocol.clone()),
            );
            if let Some(port) = group.port_min_range {
                map.insert("from_port".to_string(), Dynamic::Number(port as f64));
            }
            if let Some(port) = group.port_max_range {
                map.insert("to_port".to_string(), Dynamic::Number(port as f64));
            }
            map.insert(
                "cidr".to_string(),
                Dynamic::String(group.remote_ip_prefix.clone()),
            );
            Dynamic::Map(map)
        })
        .collect();
    state.set_list(&AttributePath::new("security_group"), groups)?;
    Ok(state)
}

pub fn standalone_profile_schema() -> Schema {
    SchemaBuilder::new()
        .description("Taikun Standalone Profile")
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .required()
                .validator(Arc::new(StringLengthValidator {
                    min: Some(3),
                    max: Some(30),
                }))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("public_key", AttributeType::String)
                .description("SSH public key injected into standalone VMs.")
                .required()
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
            AttributeBuilder::new(
                "security_group",
                AttributeType::List(Box::new(AttributeType::Object(HashMap::new()))),
            )
            .optional()
            .nested(
                vec![
                    AttributeBuilder::new("id", AttributeType::String)
                        .computed()
                        .build(),
                    AttributeBuilder::new("name", AttributeType::String)
                        .required()
                        .build(),
                    AttributeBuilder::new("protocol", AttributeType::String)
                        .required()
                        .validator(Arc::new(StringInSliceValidator::new(&[
                            "ICMP", "TCP", "UDP",
                        ])))
                        .build(),
                    AttributeBuilder::new("from_port", AttributeType::Number)
                        .optional()
                        .build(),
                    AttributeBuilder::new("to_port", AttributeType::Number)
                        .optional()
                        .build(),
                    AttributeBuilder::new("cidr", AttributeType::String)
                        .required()
                        .build(),
                ],
                NestingMode::List,
            )
            .build(),
        )
        .build()
}

#[async_trait]
impl Resource for StandaloneProfileResource {
    fn type_name(&self) -> &str {
        "taikun_standalone_profile"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: standalone_profile_schema(),
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

            let command = CreateStandaloneProfileCommand {
                name: required_string(config, "name")?,
                public_key: required_string(config, "public_key")?,
                security_groups: Self::config_security_groups(config),
                organization_id: opt_id(config, "organization_id")?,
            };

            let created = data.client.standalone_profiles().create(&command).await?;
            if bool_or(config, "lock", false) {
                data.client
                    .standalone_profiles()
                    .lock(created.id, LockMode::Lock)
                    .await?;
            }

            read_after_write(&ctx, "standalone profile", READ_AFTER_CREATE_TIMEOUT, || {
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
                diagnostics: vec![api_error_diag("Failed to create standalone profile", &e)],
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
                diagnostics: vec![api_error_diag("Failed to read standalone profile", &e)],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            let api = data.client.standalone_profiles();
            let config = &request.planned_state;

            if bool_or(&request.prior_state, "lock", false) {
                api.lock(id, LockMode::Unlock).await?;
            }

            if request.has_change(&AttributePath::new("name")) {
                api.rename(id, &required_string(config, "name")?).await?;
            }

            if request.has_change(&AttributePath::new("security_group")) {
                self.replace_security_groups(id, config).await?;
            }

            if bool_or(config, "lock", false) {
                api.lock(id, LockMode::Lock).await?;
            }

            read_after_write(&ctx, "standalone profile", READ_AFTER_UPDATE_TIMEOUT, || {
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
                diagnostics: vec![api_error_diag("Failed to update standalone profile", &e)],
            },
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let result: Result<(), ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            if bool_or(&request.prior_state, "lock", false) {
                data.client
                    .standalone_profiles()
                    .lock(id, LockMode::Unlock)
                    .await?;
            }
            data.client.standalone_profiles().delete(id).await
        }
        .await;

        DeleteResourceResponse {
            diagnostics: match result {
                Ok(()) => vec![],
                Err(e) => vec![api_error_diag("Failed to delete standalone profile", &e)],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for StandaloneProfileResource {
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
    fn security_groups_parse_port_ranges() {
        let mut config = DynamicValue::empty_map();
        let mut group = HashMap::new();
        group.insert("name".to_string(), Dynamic::String("web".to_string()));
        group.insert("protocol".to_string(), Dynamic::String("TCP".to_string()));
        group.insert("from_port".to_string(), Dynamic::Number(80.0));
        group.insert("to_port".to_string(), Dynamic::Number(443.0));
        group.insert("cidr".to_string(), Dynamic::String("0.0.0.0/0".to_string()));
        config
            .set_list(
                &AttributePath::new("security_group"),
                vec![Dynamic::Map(group)],
            )
            .unwrap();

        let groups = StandaloneProfileResource::config_security_groups(&config);
        assert_eq!(groups[0].port_min_range, Some(80));
        assert_eq!(groups[0].port_max_range, Some(443));
    }
}
