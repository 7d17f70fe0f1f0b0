//! taikun_alerting_profile

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
use tfplug::validator::{StringLengthValidator, StringInSliceValidator};

use crate::api::common::KeyValuePair;
use crate::api::profiles::{
    AlertingProfileRow, CreateAlertingProfileCommand, IntegrationSpec, WebhookSpec,
};
use crate::api::{ApiError, LockMode};
use crate::provider_data::TaikunProviderData;
use crate::resources::{
    api_error_diag, bool_or, list_of_maps, opt_id, opt_string, provider_data_from, required_id,
    required_string, string_list,
};
use crate::utils::{
    i32toa, read_after_write, READ_AFTER_CREATE_TIMEOUT, READ_AFTER_UPDATE_TIMEOUT,
};

#[derive(Default)]
pub struct AlertingProfileResource {
    provider_data: Option<TaikunProviderData>,
}

impl AlertingProfileResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> Result<&TaikunProviderData, ApiError> {
        self.provider_data
            .as_ref()
            .ok_or_else(|| ApiError::Validation("provider not configured".to_string()))
    }

    fn config_webhooks(config: &DynamicValue) -> Vec<WebhookSpec> {
        list_of_maps(config, "webhook")
            .iter()
            .map(|entry| WebhookSpec {
                id: None,
                url: entry
                    .get("url")
                    .and_then(|v| v.as_string())
                    .unwrap_or_default()
                    .to_string(),
                headers: entry
                    .get("header")
                    .and_then(|v| v.as_list())
                    .map(|items| {
                        items
                            .iter()
                            .filter_map(|item| item.as_map())
                            .map(|map| KeyValuePair {
                                key: map
                                    .get("key")
                                    .and_then(|v| v.as_string())
                                    .unwrap_or_default()
                                    .to_string(),
                                value: map
                                    .get("value")
                                    .and_then(|v| v.as_string())
                                    .unwrap_or_default()
                                    .to_string(),
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            })
            .collect()
    }

    fn config_integrations(config: &DynamicValue) -> Vec<IntegrationSpec> {
        list_of_maps(config, "integration")
            .iter()
            .map(|entry| IntegrationSpec {
                id: None,
                integration_type: entry
                    .get("type")
                    .and_then(|v| v.as_string())
                    .unwrap_or_default()
                    .to_string(),
                url: entry
                    .get("url")
                    .and_then(|v| v.as_string())
                    .unwrap_or_default()
                    .to_string(),
                token: entry
                    .get("token")
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
        match data.client.alerting_profiles().by_id(id).await? {
            Some(row) => Ok(Some(flatten(&row)?)),
            None if post_write => Err(ApiError::NotFoundAfterCreateOrUpdate),
            None => Ok(None),
        }
    }

    async fn replace_collections(
        &self,
        profile_id: i32,
        config: &DynamicValue,
        replace_webhooks: bool,
        replace_integrations: bool,
    ) -> Result<(), ApiError> {
        let data = self.data()?;
        let api = data.client.alerting_profiles();

        if let Some(row) = api.by_id(profile_id).await? {
            if replace_webhooks {
                for webhook in &row.webhooks {
                    if let Some(id) = webhook.id {
                        api.delete_webhook(id).await?;
                    }
                }
            }
            if replace_integrations {
                for integration in &row.integrations {
                    if let Some(id) = integration.id {
                        api.delete_integration(id).await?;
                    }
                }
            }
        }

        if replace_webhooks {
            for webhook in Self::config_webhooks(config) {
                api.create_webhook(profile_id, &webhook).await?;
            }
        }
        if replace_integrations {
            for integration in Self::config_integrations(config) {
                api.create_integration(profile_id, &integration).await?;
            }
        }
        Ok(())
    }
}

fn flatten(row: &AlertingProfileRow) -> Result<DynamicValue, ApiError> {
    let mut state = DynamicValue::empty_map();
    state.set_string(&AttributePath::new("id"), i32toa(row.id))?;
    state.set_string(&AttributePath::new("name"), row.name.clone())?;
    state.set_string(&AttributePath::new("reminder"), row.reminder.clone())?;
    state.set_string(
        &AttributePath::new("slack_configuration_id"),
        row.slack_configuration_id.map(i32toa).unwrap_or_default(),
    )?;
    state.set_string(
        &AttributePath::new("organization_id"),
        row.organization_id.map(i32toa).unwrap_or_default(),
    )?;
    state.set_bool(&AttributePath::new("lock"), row.is_locked)?;
    state.set_string(
        &AttributePath::new("created_by"),
        row.created_by.clone().unwrap_or_default(),
    )?;
    state.set_list(
        &AttributePath::new("emails"),
        row.emails
            .iter()
            .map(|email| Dynamic::String(email.clone()))
            .collect(),
    )?;

    let webhooks = row
        .webhooks
        .iter()
        .map(|webhook| {
            let mut map = HashMap::new();
            map.insert(
                "id".to_string(),
                Dynamic::String(webhook.id.map(i32toa).unwrap_or_default()),
            );
            map.insert("url".to_string(), Dynamic::String(webhook.url.clone()));
            map.insert(
                "header".to_string(),
                Dynamic::List(
                    webhook
                        .headers
                        .iter()
                        .map(|header| {
                            let mut h = HashMap::new();
                            h.insert("key".to_string(), Dynamic::String(header.key.clone()));
                            h.insert("value".to_string(), Dynamic::String(header.value.clone()));
                            Dynamic::Map(h)
                        })
                        .collect(),
                ),
            );
            Dynamic::Map(map)
        })
        .collect();
    state.set_list(&AttributePath::new("webhook"), webhooks)?;

    let integrations = row
        .integrations
        .iter()
        .map(|integration| {
            let mut map = HashMap::new();
            map.insert(
                "id".to_string(),
                Dynamic::String(integration.id.map(i32toa).unwrap_or_default()),
            );
            map.insert(
                "type".to_string(),
                Dynamic::String(integration.integration_type.clone()),
            );
            map.insert("url".to_string(), Dynamic::String(integration.url.clone()));
            map.insert(
                "token".to_string(),
                Dynamic::String(integration.token.clone()),
            );
            Dynamic::Map(map)
        })
        .collect();
    state.set_list(&AttributePath::new("integration"), integrations)?;

    Ok(state)
}

pub fn alerting_profile_schema() -> Schema {
    SchemaBuilder::new()
        .description("Taikun Alerting Profile")
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
            AttributeBuilder::new("reminder", AttributeType::String)
                .description("The frequency of the alerts.")
                .optional()
                .validator(Arc::new(StringInSliceValidator::new(&[
                    "None", "HalfHour", "Hourly", "Daily",
                ])))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("slack_configuration_id", AttributeType::String)
                .optional()
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
            AttributeBuilder::new("created_by", AttributeType::String)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("emails", AttributeType::List(Box::new(AttributeType::String)))
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "webhook",
                AttributeType::List(Box::new(AttributeType::Object(HashMap::new()))),
            )
            .optional()
            .nested(
                vec![
                    AttributeBuilder::new("id", AttributeType::String)
                        .computed()
                        .build(),
                    AttributeBuilder::new("url", AttributeType::String)
                        .required()
                        .build(),
                    AttributeBuilder::new(
                        "header",
                        AttributeType::List(Box::new(AttributeType::Object(HashMap::new()))),
                    )
                    .optional()
                    .nested(
                        vec![
                            AttributeBuilder::new("key", AttributeType::String)
                                .required()
                                .build(),
                            AttributeBuilder::new("value", AttributeType::String)
                                .required()
                                .build(),
                        ],
                        NestingMode::List,
                    )
                    .build(),
                ],
                NestingMode::List,
            )
            .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "integration",
                AttributeType::List(Box::new(AttributeType::Object(HashMap::new()))),
            )
            .optional()
            .nested(
                vec![
                    AttributeBuilder::new("id", AttributeType::String)
                        .computed()
                        .build(),
                    AttributeBuilder::new("type", AttributeType::String)
                        .required()
                        .validator(Arc::new(StringInSliceValidator::new(&[
                            "Opsgenie",
                            "Pagerduty",
                            "Splunk",
                            "MicrosoftTeams",
                        ])))
                        .build(),
                    AttributeBuilder::new("url", AttributeType::String)
                        .required()
                        .build(),
                    AttributeBuilder::new("token", AttributeType::String)
                        .optional()
                        .sensitive()
                        .build(),
                ],
                NestingMode::List,
            )
            .build(),
        )
        .build()
}

#[async_trait]
impl Resource for AlertingProfileResource {
    fn type_name(&self) -> &str {
        "taikun_alerting_profile"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: alerting_profile_schema(),
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

            let command = CreateAlertingProfileCommand {
                name: required_string(config, "name")?,
                reminder: opt_string(config, "reminder").unwrap_or_else(|| "None".to_string()),
                slack_configuration_id: opt_id(config, "slack_configuration_id")?,
                organization_id: opt_id(config, "organization_id")?,
                emails: string_list(config, "emails"),
                webhooks: Self::config_webhooks(config),
                integrations: Self::config_integrations(config),
            };

            let created = data.client.alerting_profiles().create(&command).await?;
            if bool_or(config, "lock", false) {
                data.client
                    .alerting_profiles()
                    .lock(created.id, LockMode::Lock)
                    .await?;
            }

            read_after_write(&ctx, "alerting profile", READ_AFTER_CREATE_TIMEOUT, || {
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
                diagnostics: vec![api_error_diag("Failed to create alerting profile", &e)],
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
                diagnostics: vec![api_error_diag("Failed to read alerting profile", &e)],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            let api = data.client.alerting_profiles();
            let config = &request.planned_state;

            if bool_or(&request.prior_state, "lock", false) {
                api.lock(id, LockMode::Unlock).await?;
            }

            if request.has_change_in(&["name", "reminder", "slack_configuration_id"]) {
                api.edit(
                    id,
                    &required_string(config, "name")?,
                    &opt_string(config, "reminder").unwrap_or_else(|| "None".to_string()),
                    opt_id(config, "slack_configuration_id")?,
                )
                .await?;
            }

            if request.has_change(&AttributePath::new("emails")) {
                api.set_emails(id, &string_list(config, "emails")).await?;
            }

            let replace_webhooks = request.has_change(&AttributePath::new("webhook"));
            let replace_integrations = request.has_change(&AttributePath::new("integration"));
            if replace_webhooks || replace_integrations {
                self.replace_collections(id, config, replace_webhooks, replace_integrations)
                    .await?;
            }

            if bool_or(config, "lock", false) {
                api.lock(id, LockMode::Lock).await?;
            }

            read_after_write(&ctx, "alerting profile", READ_AFTER_UPDATE_TIMEOUT, || {
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
                diagnostics: vec![api_error_diag("Failed to update alerting profile", &e)],
            },
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let result: Result<(), ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            if bool_or(&request.prior_state, "lock", false) {
                data.client
                    .alerting_profiles()
                    .lock(id, LockMode::Unlock)
                    .await?;
            }
            data.client.alerting_profiles().delete(id).await
        }
        .await;

        DeleteResourceResponse {
            diagnostics: match result {
                Ok(()) => vec![],
                Err(e) => vec![api_error_diag("Failed to delete alerting profile", &e)],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for AlertingProfileResource {
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
    fn config_webhooks_parse_headers() {
        let mut config = DynamicValue::empty_map();
        let mut header = HashMap::new();
        header.insert("key".to_string(), Dynamic::String("X-Token".to_string()));
        header.insert("value".to_string(), Dynamic::String("abc".to_string()));
        let mut webhook = HashMap::new();
        webhook.insert(
            "url".to_string(),
            Dynamic::String("https://hooks.example".to_string()),
        );
        webhook.insert("header".to_string(), Dynamic::List(vec![Dynamic::Map(header)]));
        config
            .set_list(&AttributePath::new("webhook"), vec![Dynamic::Map(webhook)])
            .unwrap();

        let webhooks = AlertingProfileResource::config_webhooks(&config);
        assert_eq!(webhooks.len(), 1);
        assert_eq!(webhooks[0].headers[0].key, "X-Token");
    }

    #[test]
    fn flatten_keeps_email_order() {
        let row = AlertingProfileRow {
            id: 9,
            name: "alerts".to_string(),
            reminder: "Daily".to_string(),
            slack_configuration_id: None,
            organization_id: Some(2),
            is_locked: true,
            created_by: None,
            emails: vec!["a@x".to_string(), "b@x".to_string()],
            webhooks: vec![],
            integrations: vec![],
        };
        let state = flatten(&row).unwrap();
        let emails = state.get_list(&AttributePath::new("emails")).unwrap();
        assert_eq!(emails[0].as_string(), Some("a@x"));
        assert_eq!(emails[1].as_string(), Some("b@x"));
        assert!(state.get_bool(&AttributePath::new("lock")).unwrap());
    }
}
