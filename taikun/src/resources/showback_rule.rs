//! taikun_showback_rule
//!
//! Lives on the separate showback backend. External rules additionally
//! reference a showback credential.

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
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::{StringInSliceValidator, StringLengthValidator};

use crate::api::billing::{
    CreateShowbackRuleCommand, EditShowbackRuleCommand, RuleLabel, ShowbackRuleRow,
};
use crate::api::ApiError;
use crate::provider_data::TaikunProviderData;
use crate::resources::{
    api_error_diag, list_of_maps, opt_id, opt_number, opt_string, provider_data_from, required_id,
    required_string,
};
use crate::utils::{
    i32toa, read_after_write, READ_AFTER_CREATE_TIMEOUT, READ_AFTER_UPDATE_TIMEOUT,
};

#[derive(Default)]
pub struct ShowbackRuleResource {
    provider_data: Option<TaikunProviderData>,
}

impl ShowbackRuleResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> Result<&TaikunProviderData, ApiError> {
        self.provider_data
            .as_ref()
            .ok_or_else(|| ApiError::Validation("provider not configured".to_string()))
    }

    fn config_labels(config: &DynamicValue) -> Vec<RuleLabel> {
        list_of_maps(config, "label")
            .iter()
            .map(|entry| RuleLabel {
                id: None,
                label: entry
                    .get("key")
                    .and_then(|v| v.as_string())
                    .unwrap_or_default()
                    .to_string(),
                value: entry
                    .get("value")
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
        match data.client.billing().showback_rule_by_id(id).await? {
            Some(row) => Ok(Some(flatten(&row)?)),
            None if post_write => Err(ApiError::NotFoundAfterCreateOrUpdate),
            None => Ok(None),
        }
    }
}

fn flatten(row: &ShowbackRuleRow) -> Result<DynamicValue, ApiError> {
    let mut state = DynamicValue::empty_map();
    state.set_string(&AttributePath::new("id"), i32toa(row.id))?;
    state.set_string(&AttributePath::new("name"), row.name.clone())?;
    state.set_string(&AttributePath::new("metric_name"), row.metric_name.clone())?;
    state.set_number(&AttributePath::new("price"), row.price)?;
    state.set_string(&AttributePath::new("kind"), row.kind.clone())?;
    state.set_string(&AttributePath::new("type"), row.rule_type.clone())?;
    state.set_number(
        &AttributePath::new("global_alert_limit"),
        row.global_alert_limit as f64,
    )?;
    state.set_string(
        &AttributePath::new("project_alert_limit"),
        row.project_alert_limit.map(i32toa).unwrap_or_default(),
    )?;
    state.set_string(
        &AttributePath::new("showback_credential_id"),
        row.showback_credential_id.map(i32toa).unwrap_or_default(),
    )?;
    state.set_string(
        &AttributePath::new("organization_id"),
        row.organization_id.map(i32toa).unwrap_or_default(),
    )?;
    state.set_string(
        &AttributePath::new("created_by"),
        row.created_by.clone().unwrap_or_default(),
    )?;

    let labels = row
        .labels
        .iter()
        .map(|label| {
            let mut map = HashMap::new();
            map.insert(
                "id".to_string(),
                Dynamic::String(label.id.map(i32toa).unwrap_or_default()),
            );
            map.insert("key".to_string(), Dynamic::String(label.label.clone()));
            map.insert("value".to_string(), Dynamic::String(label.value.clone()));
            Dynamic::Map(map)
        })
        .collect();
    state.set_list(&AttributePath::new("label"), labels)?;

    Ok(state)
}

pub fn showback_rule_schema() -> Schema {
    SchemaBuilder::new()
        .description("Taikun Showback Rule")
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
            AttributeBuilder::new("metric_name", AttributeType::String)
                .required()
                .validator(Arc::new(StringLengthValidator {
                    min: Some(3),
                    max: Some(256),
                }))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("price", AttributeType::Number)
                .description("Price per unit, in CZK.")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("kind", AttributeType::String)
                .description("Count bills instances, Sum bills the metric value.")
                .required()
                .validator(Arc::new(StringInSliceValidator::new(&["Count", "Sum"])))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("type", AttributeType::String)
                .description("General rules use Taikun metrics, External rules pull from a showback credential.")
                .required()
                .validator(Arc::new(StringInSliceValidator::new(&["General", "External"])))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("global_alert_limit", AttributeType::Number)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("project_alert_limit", AttributeType::String)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("showback_credential_id", AttributeType::String)
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
            AttributeBuilder::new("created_by", AttributeType::String)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "label",
                AttributeType::List(Box::new(AttributeType::Object(HashMap::new()))),
            )
            .optional()
            .nested(
                vec![
                    AttributeBuilder::new("id", AttributeType::String)
                        .computed()
                        .build(),
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
        )
        .build()
}

#[async_trait]
impl Resource for ShowbackRuleResource {
    fn type_name(&self) -> &str {
        "taikun_showback_rule"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: showback_rule_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];
        let rule_type = opt_string(&request.config, "type").unwrap_or_default();
        let has_credential = opt_string(&request.config, "showback_credential_id").is_some();
        if rule_type == "External" && !has_credential {
            diagnostics.push(Diagnostic::error(
                "Missing showback credential",
                "external showback rules require showback_credential_id",
            ));
        }
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let config = &request.config;

            let command = CreateShowbackRuleCommand {
                name: required_string(config, "name")?,
                metric_name: required_string(config, "metric_name")?,
                price: opt_number(config, "price").unwrap_or_default(),
                kind: required_string(config, "kind")?,
                rule_type: required_string(config, "type")?,
                global_alert_limit: opt_number(config, "global_alert_limit").unwrap_or_default()
                    as i32,
                project_alert_limit: opt_id(config, "project_alert_limit")?,
                showback_credential_id: opt_id(config, "showback_credential_id")?,
                organization_id: opt_id(config, "organization_id")?,
                labels: Self::config_labels(config),
            };
            let created = data.client.billing().create_showback_rule(&command).await?;

            read_after_write(&ctx, "showback rule", READ_AFTER_CREATE_TIMEOUT, || {
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
                diagnostics: vec![api_error_diag("Failed to create showback rule", &e)],
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
                diagnostics: vec![api_error_diag("Failed to read showback rule", &e)],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            let config = &request.planned_state;

            let command = EditShowbackRuleCommand {
                id,
                name: required_string(config, "name")?,
                metric_name: required_string(config, "metric_name")?,
                price: opt_number(config, "price").unwrap_or_default(),
                kind: required_string(config, "kind")?,
                rule_type: required_string(config, "type")?,
                global_alert_limit: opt_number(config, "global_alert_limit").unwrap_or_default()
                    as i32,
                project_alert_limit: opt_id(config, "project_alert_limit")?,
                showback_credential_id: opt_id(config, "showback_credential_id")?,
                labels: Self::config_labels(config),
            };
            data.client.billing().edit_showback_rule(&command).await?;

            read_after_write(&ctx, "showback rule", READ_AFTER_UPDATE_TIMEOUT, || {
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
                diagnostics: vec![api_error_diag("Failed to update showback rule", &e)],
            },
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let result: Result<(), ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            data.client.billing().delete_showback_rule(id).await
        }
        .await;

        DeleteResourceResponse {
            diagnostics: match result {
                Ok(()) => vec![],
                Err(e) => vec![api_error_diag("Failed to delete showback rule", &e)],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for ShowbackRuleResource {
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
    async fn validate_requires_credential_for_external_rules() {
        let mut config = DynamicValue::empty_map();
        config
            .set_string(&AttributePath::new("type"), "External".to_string())
            .unwrap();

        let resource = ShowbackRuleResource::new();
        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "taikun_showback_rule".to_string(),
                    config,
                },
            )
            .await;
        assert_eq!(response.diagnostics.len(), 1);
    }
}
