//! taikun_access_profile
//!
//! Owns four sub-collections (allowed hosts, DNS servers, NTP servers,
//! SSH users). The API has no per-element diff, so any sub-collection
//! change deletes every old element and recreates the declared set.

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
use tfplug::validator::{NumberRangeValidator, StringLengthValidator, StringPatternValidator};

use crate::api::profiles::{AddressSpec, AllowedHostSpec, CreateAccessProfileCommand, SshUserSpec};
use crate::api::{ApiError, LockMode};
use crate::provider_data::TaikunProviderData;
use crate::resources::{
    api_error_diag, bool_or, list_of_maps, opt_string, provider_data_from, required_id,
    required_string,
};
use crate::utils::{
    i32toa, read_after_write, READ_AFTER_CREATE_TIMEOUT, READ_AFTER_UPDATE_TIMEOUT,
};

const LINUX_USER_PATTERN: &str = "^[a-z_][a-z0-9_-]*$";

#[derive(Default)]
pub struct AccessProfileResource {
    provider_data: Option<TaikunProviderData>,
}

impl AccessProfileResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> Result<&TaikunProviderData, ApiError> {
        self.provider_data
            .as_ref()
            .ok_or_else(|| ApiError::Validation("provider not configured".to_string()))
    }

    fn config_hosts(config: &DynamicValue) -> Vec<AllowedHostSpec> {
        list_of_maps(config, "allowed_host")
            .iter()
            .map(|entry| AllowedHostSpec {
                id: None,
                description: map_string(entry, "description"),
                address: map_string(entry, "address"),
                mask_bits: map_number(entry, "mask_bits") as i32,
            })
            .collect()
    }

    fn config_addresses(config: &DynamicValue, name: &str) -> Vec<AddressSpec> {
        list_of_maps(config, name)
            .iter()
            .map(|entry| AddressSpec {
                id: None,
                address: map_string(entry, "address"),
            })
            .collect()
    }

    fn config_ssh_users(config: &DynamicValue) -> Vec<SshUserSpec> {
        list_of_maps(config, "ssh_user")
            .iter()
            .map(|entry| SshUserSpec {
                id: None,
                name: map_string(entry, "name"),
                ssh_public_key: map_string(entry, "public_key"),
            })
            .collect()
    }

    async fn read_state(
        &self,
        id: i32,
        post_write: bool,
    ) -> Result<Option<DynamicValue>, ApiError> {
        let data = self.data()?;
        match data.client.access_profiles().by_id(id).await? {
            Some(row) => Ok(Some(flatten(&row)?)),
            None if post_write => Err(ApiError::NotFoundAfterCreateOrUpdate),
            None => Ok(None),
        }
    }

    /// Deletes every existing sub-collection element and recreates the
    /// declared sets.
    async fn replace_collections(
        &self,
        profile_id: i32,
        config: &DynamicValue,
    ) -> Result<(), ApiError> {
        let data = self.data()?;
        let api = data.client.access_profiles();

        if let Some(row) = api.by_id(profile_id).await? {
            for host in &row.allowed_hosts {
                if let Some(id) = host.id {
                    api.delete_allowed_host(id).await?;
                }
            }
            for server in &row.dns_servers {
                if let Some(id) = server.id {
                    api.delete_dns_server(id).await?;
                }
            }
            for server in &row.ntp_servers {
                if let Some(id) = server.id {
                    api.delete_ntp_server(id).await?;
                }
            }
            for user in &row.ssh_users {
                if let Some(id) = user.id {
                    api.delete_ssh_user(id).await?;
                }
            }
        }

        for host in Self::config_hosts(config) {
            api.create_allowed_host(profile_id, &host).await?;
        }
        for server in Self::config_addresses(config, "dns_server") {
            api.create_dns_server(profile_id, &server.address).await?;
        }
        for server in Self::config_addresses(config, "ntp_server") {
            api.create_ntp_server(profile_id, &server.address).await?;
        }
        for user in Self::config_ssh_users(config) {
            api.create_ssh_user(profile_id, &user).await?;
        }
        Ok(())
    }
}

fn map_string(entry: &HashMap<String, Dynamic>, key: &str) -> String {
    entry
        .get(key)
        .and_then(|v| v.as_string())
        .unwrap_or_default()
        .to_string()
}

fn map_number(entry: &HashMap<String, Dynamic>, key: &str) -> f64 {
    entry.get(key).and_then(|v| v.as_number()).unwrap_or(0.0)
}

pub(crate) fn flatten(row: &crate::api::profiles::AccessProfileRow) -> Result<DynamicValue, ApiError> {
    let mut state = DynamicValue::empty_map();
    state.set_string(&AttributePath::new("id"), i32toa(row.id))?;
    state.set_string(&AttributePath::new("name"), row.name.clone())?;
    state.set_string(
        &AttributePath::new("http_proxy"),
        row.http_proxy.clone().unwrap_or_default(),
    )?;
    state.set_string(
        &AttributePath::new("organization_id"),
        row.organization_id.map(i32toa).unwrap_or_default(),
    )?;
    state.set_string(
        &AttributePath::new("organization_name"),
        row.organization_name.clone().unwrap_or_default(),
    )?;
    state.set_bool(&AttributePath::new("lock"), row.is_locked)?;
    state.set_string(
        &AttributePath::new("created_by"),
        row.created_by.clone().unwrap_or_default(),
    )?;

    let hosts = row
        .allowed_hosts
        .iter()
        .map(|host| {
            let mut map = HashMap::new();
            map.insert(
                "id".to_string(),
                Dynamic::String(host.id.map(i32toa).unwrap_or_default()),
            );
            map.insert(
                "description".to_string(),
                Dynamic::String(host.description.clone()),
            );
            map.insert("address".to_string(), Dynamic::String(host.address.clone()));
            map.insert(
                "mask_bits".to_string(),
                Dynamic::Number(host.mask_bits as f64),
            );
            Dynamic::Map(map)
        })
        .collect();
    state.set_list(&AttributePath::new("allowed_host"), hosts)?;

    for (attr, servers) in [
        ("dns_server", &row.dns_servers),
        ("ntp_server", &row.ntp_servers),
    ] {
        let entries = servers
            .iter()
            .map(|server| {
                let mut map = HashMap::new();
                map.insert(
                    "id".to_string(),
                    Dynamic::String(server.id.map(i32toa).unwrap_or_default()),
                );
                map.insert(
                    "address".to_string(),
                    Dynamic::String(server.address.clone()),
                );
                Dynamic::Map(map)
            })
            .collect();
        state.set_list(&AttributePath::new(attr), entries)?;
    }

    let users = row
        .ssh_users
        .iter()
        .map(|user| {
            let mut map = HashMap::new();
            map.insert(
                "id".to_string(),
                Dynamic::String(user.id.map(i32toa).unwrap_or_default()),
            );
            map.insert("name".to_string(), Dynamic::String(user.name.clone()));
            map.insert(
                "public_key".to_string(),
                Dynamic::String(user.ssh_public_key.clone()),
            );
            Dynamic::Map(map)
        })
        .collect();
    state.set_list(&AttributePath::new("ssh_user"), users)?;

    Ok(state)
}

pub fn access_profile_schema() -> Schema {
    SchemaBuilder::new()
        .description("Taikun Access Profile")
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .description("The name of the access profile.")
                .required()
                .validator(Arc::new(StringLengthValidator {
                    min: Some(3),
                    max: Some(30),
                }))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("http_proxy", AttributeType::String)
                .description("HTTP proxy of the access profile.")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("organization_id", AttributeType::String)
                .description("The ID of the organization which owns the access profile.")
                .optional()
                .computed()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("organization_name", AttributeType::String)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("lock", AttributeType::Bool)
                .description("Indicates whether the access profile is locked.")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("created_by", AttributeType::String)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "allowed_host",
                AttributeType::List(Box::new(AttributeType::Object(HashMap::new()))),
            )
            .description("List of allowed hosts.")
            .optional()
            .nested(
                vec![
                    AttributeBuilder::new("id", AttributeType::String)
                        .computed()
                        .build(),
                    AttributeBuilder::new("description", AttributeType::String)
                        .required()
                        .build(),
                    AttributeBuilder::new("address", AttributeType::String)
                        .required()
                        .build(),
                    AttributeBuilder::new("mask_bits", AttributeType::Number)
                        .required()
                        .validator(Arc::new(NumberRangeValidator {
                            min: Some(0.0),
                            max: Some(32.0),
                        }))
                        .build(),
                ],
                NestingMode::List,
            )
            .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "dns_server",
                AttributeType::List(Box::new(AttributeType::Object(HashMap::new()))),
            )
            .description("List of DNS servers.")
            .optional()
            .nested(
                vec![
                    AttributeBuilder::new("id", AttributeType::String)
                        .computed()
                        .build(),
                    AttributeBuilder::new("address", AttributeType::String)
                        .required()
                        .build(),
                ],
                NestingMode::List,
            )
            .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "ntp_server",
                AttributeType::List(Box::new(AttributeType::Object(HashMap::new()))),
            )
            .description("List of NTP servers.")
            .optional()
            .nested(
                vec![
                    AttributeBuilder::new("id", AttributeType::String)
                        .computed()
                        .build(),
                    AttributeBuilder::new("address", AttributeType::String)
                        .required()
                        .build(),
                ],
                NestingMode::List,
            )
            .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "ssh_user",
                AttributeType::List(Box::new(AttributeType::Object(HashMap::new()))),
            )
            .description("List of SSH users.")
            .optional()
            .nested(
                vec![
                    AttributeBuilder::new("id", AttributeType::String)
                        .computed()
                        .build(),
                    AttributeBuilder::new("name", AttributeType::String)
                        .required()
                        .validator(Arc::new(StringPatternValidator::new(
                            LINUX_USER_PATTERN,
                            "a valid Linux user name",
                        )))
                        .build(),
                    AttributeBuilder::new("public_key", AttributeType::String)
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
impl Resource for AccessProfileResource {
    fn type_name(&self) -> &str {
        "taikun_access_profile"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: access_profile_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];
        for user in Self::config_ssh_users(&request.config) {
            if user.name == "ubuntu" {
                diagnostics.push(
                    tfplug::types::Diagnostic::error(
                        "Invalid SSH user name",
                        "\"ubuntu\" is a reserved user name",
                    )
                    .with_attribute(AttributePath::new("ssh_user")),
                );
            }
        }
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let config = &request.config;

            let command = CreateAccessProfileCommand {
                name: required_string(config, "name")?,
                http_proxy: opt_string(config, "http_proxy"),
                organization_id: crate::resources::opt_id(config, "organization_id")?,
                allowed_hosts: Self::config_hosts(config),
                dns_servers: Self::config_addresses(config, "dns_server"),
                ntp_servers: Self::config_addresses(config, "ntp_server"),
                ssh_users: Self::config_ssh_users(config),
            };

            let created = data.client.access_profiles().create(&command).await?;
            if bool_or(config, "lock", false) {
                data.client
                    .access_profiles()
                    .lock(created.id, LockMode::Lock)
                    .await?;
            }

            let state = read_after_write(&ctx, "access profile", READ_AFTER_CREATE_TIMEOUT, || {
                self.read_state(created.id, true)
            })
            .await?
            .ok_or(ApiError::NotFoundAfterCreateOrUpdate)?;
            Ok(state)
        }
        .await;

        match result {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![api_error_diag("Failed to create access profile", &e)],
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
                diagnostics: vec![api_error_diag("Failed to read access profile", &e)],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            let api = data.client.access_profiles();
            let config = &request.planned_state;

            if bool_or(&request.prior_state, "lock", false) {
                api.lock(id, LockMode::Unlock).await?;
            }

            if request.has_change_in(&["name", "http_proxy"]) {
                api.edit(
                    id,
                    &required_string(config, "name")?,
                    opt_string(config, "http_proxy").as_deref(),
                )
                .await?;
            }

            if request.has_change_in(&["allowed_host", "dns_server", "ntp_server", "ssh_user"]) {
                self.replace_collections(id, config).await?;
            }

            if bool_or(config, "lock", false) {
                api.lock(id, LockMode::Lock).await?;
            }

            let state = read_after_write(&ctx, "access profile", READ_AFTER_UPDATE_TIMEOUT, || {
                self.read_state(id, true)
            })
            .await?
            .ok_or(ApiError::NotFoundAfterCreateOrUpdate)?;
            Ok(state)
        }
        .await;

        match result {
            Ok(new_state) => UpdateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => UpdateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![api_error_diag("Failed to update access profile", &e)],
            },
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let result: Result<(), ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            if bool_or(&request.prior_state, "lock", false) {
                data.client
                    .access_profiles()
                    .lock(id, LockMode::Unlock)
                    .await?;
            }
            data.client.access_profiles().delete(id).await
        }
        .await;

        DeleteResourceResponse {
            diagnostics: match result {
                Ok(()) => vec![],
                Err(e) => vec![api_error_diag("Failed to delete access profile", &e)],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for AccessProfileResource {
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
    use crate::api::profiles::AccessProfileRow;

    #[test]
    fn flatten_surfaces_server_issued_ids() {
        let row = AccessProfileRow {
            id: 5,
            name: "p1".to_string(),
            http_proxy: Some("http://x".to_string()),
            organization_id: Some(3),
            organization_name: Some("org".to_string()),
            is_locked: false,
            created_by: Some("admin@corp".to_string()),
            allowed_hosts: vec![AllowedHostSpec {
                id: Some(77),
                description: "h".to_string(),
                address: "10.0.0.1".to_string(),
                mask_bits: 32,
            }],
            dns_servers: vec![],
            ntp_servers: vec![],
            ssh_users: vec![],
        };

        let state = flatten(&row).unwrap();
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "5");
        assert_eq!(
            state
                .get_string(&AttributePath::new("created_by"))
                .unwrap(),
            "admin@corp"
        );
        let hosts = state
            .get_list_of_maps(&AttributePath::new("allowed_host"))
            .unwrap();
        assert_eq!(hosts.len(), 1);
        assert_eq!(hosts[0]["id"].as_string(), Some("77"));
        assert_eq!(hosts[0]["mask_bits"].as_number(), Some(32.0));
    }

    #[tokio::test]
    async fn validate_rejects_reserved_ssh_user() {
        let mut config = DynamicValue::empty_map();
        let mut user = HashMap::new();
        user.insert("name".to_string(), Dynamic::String("ubuntu".to_string()));
        user.insert(
            "public_key".to_string(),
            Dynamic::String("ssh-ed25519 AAA".to_string()),
        );
        config
            .set_list(
                &AttributePath::new("ssh_user"),
                vec![Dynamic::Map(user)],
            )
            .unwrap();

        let resource = AccessProfileResource::new();
        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "taikun_access_profile".to_string(),
                    config,
                },
            )
            .await;
        assert_eq!(response.diagnostics.len(), 1);
    }
}
