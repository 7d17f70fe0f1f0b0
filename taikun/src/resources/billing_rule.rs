//! taikun_billing_rule

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
use tfplug::validator::StringInSliceValidator;

use crate::api::billing::{
    BillingRuleRow, CreateBillingRuleCommand, EditBillingRuleCommand, RuleLabel,
};
use crate::api::ApiError;
use crate::provider_data::TaikunProviderData;
use crate::resources::{
    api_error_diag, list_of_maps, opt_number, provider_data_from, required_id, required_string,
};
use crate::utils::{
    i32toa, read_after_write, READ_AFTER_CREATE_TIMEOUT, READ_AFTER_UPDATE_TIMEOUT,
};

#[derive(Default)]
pub struct BillingRuleResource {
    provider_data: Option<TaikunProviderData>,
}

impl BillingRuleResource {
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
        match data.client.billing().rule_by_id(id).await? {
            Some(row) => Ok(Some(flatten(&row)?)),
            None if post_write => Err(ApiError::NotFoundAfterCreateOrUpdate),
            None => Ok(None),
        }
    }
}

fn flatten(row: &BillingRuleRow) -> Result<DynamicValue, ApiError> {
    let mut state = DynamicValue::empty_map();
    state.set_string(&AttributePath::new("id"), i32toa(row.id))?;
    state.set_string(&AttributePath::new("name"), row.name.clone())?;
    state.set_string(&AttributePath::new("metric_name"), row.metric_name.clone())?;
    state.set_number(&AttributePath::new("price"), row.price)?;
    state.set_string(&AttributePath::new("type"), row.rule_type.clone())?;
    state.set_string(
        &AttributePath::new("billing_credential_id"),
        i32toa(row.operation_credential_id),
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

pub fn billing_rule_schema() -> Schema {
    SchemaBuilder::new()
        .description("Taikun Billing Rule")
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
            AttributeBuilder::new("metric_name", AttributeType::String)
                .description("Prometheus metric the rule bills on.")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("price", AttributeType::Number)
                .description("Price per unit, in CZK.")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("type", AttributeType::String)
                .required()
                .validator(Arc::new(StringInSliceValidator::new(&["Count", "Sum"])))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("billing_credential_id", AttributeType::String)
                .required()
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
impl Resource for BillingRuleResource {
    fn type_name(&self) -> &str {
        "taikun_billing_rule"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: billing_rule_schema(),
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

            let command = CreateBillingRuleCommand {
                name: required_string(config, "name")?,
                metric_name: required_string(config, "metric_name")?,
                price: opt_number(config, "price").unwrap_or_default(),
                rule_type: required_string(config, "type")?,
                operation_credential_id: required_id(config, "billing_credential_id")?,
                labels: Self::config_labels(config),
            };
            let created = data.client.billing().create_rule(&command).await?;

            read_after_write(&ctx, "billing rule", READ_AFTER_CREATE_TIMEOUT, || {
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
                diagnostics: vec![api_error_diag("Failed to create billing rule", &e)],
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
                diagnostics: vec![api_error_diag("Failed to read billing rule", &e)],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            let config = &request.planned_state;

            let command = EditBillingRuleCommand {
                id,
                name: required_string(config, "name")?,
                metric_name: required_string(config, "metric_name")?,
                price: opt_number(config, "price").unwrap_or_default(),
                rule_type: required_string(config, "type")?,
                operation_credential_id: required_id(config, "billing_credential_id")?,
                labels: Self::config_labels(config),
            };
            data.client.billing().edit_rule(&command).await?;

            read_after_write(&ctx, "billing rule", READ_AFTER_UPDATE_TIMEOUT, || {
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
                diagnostics: vec![api_error_diag("Failed to update billing rule", &e)],
            },
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let result: Result<(), ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            data.client.billing().delete_rule(id).await
        }
        .await;

        DeleteResourceResponse {
            diagnostics: match result {
                Ok(()) => vec![],
                Err(e) => vec![api_error_diag("Failed to delete billing rule", &e)],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for BillingRuleResource {
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
    fn config_labels_map_key_to_label() {
        let mut config = DynamicValue::empty_map();
        let mut label = HashMap::new();
        label.insert("key".to_string(), Dynamic::String("env".to_string()));
        label.insert("value".to_string(), Dynamic::String("prod".to_string()));
        config
            .set_list(&AttributePath::new("label"), vec![Dynamic::Map(label)])
            .unwrap();

        let labels = BillingRuleResource::config_labels(&config);
        assert_eq!(labels.len(), 1);
        assert_eq!(labels[0].label, "env");
        assert_eq!(labels[0].value, "prod");
    }
}
