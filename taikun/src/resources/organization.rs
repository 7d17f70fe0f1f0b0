//! taikun_organization

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
use tfplug::validator::{NumberRangeValidator, StringPatternValidator};

use crate::api::organizations::{CreateOrganizationCommand, EditOrganizationCommand, OrganizationRow};
use crate::api::ApiError;
use crate::provider_data::TaikunProviderData;
use crate::resources::{
    api_error_diag, bool_or, opt_number, opt_string, provider_data_from, required_id,
    required_string, string_or_empty,
};
use crate::utils::{
    i32toa, read_after_write, READ_AFTER_CREATE_TIMEOUT, READ_AFTER_UPDATE_TIMEOUT,
};

#[derive(Default)]
pub struct OrganizationResource {
    provider_data: Option<TaikunProviderData>,
}

impl OrganizationResource {
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
        match data.client.organizations().by_id(id).await? {
            Some(row) => Ok(Some(flatten(&row)?)),
            None if post_write => Err(ApiError::NotFoundAfterCreateOrUpdate),
            None => Ok(None),
        }
    }
}

pub(crate) fn flatten(row: &OrganizationRow) -> Result<DynamicValue, ApiError> {
    let mut state = DynamicValue::empty_map();
    state.set_string(&AttributePath::new("id"), i32toa(row.id))?;
    state.set_string(&AttributePath::new("name"), row.name.clone())?;
    state.set_string(&AttributePath::new("full_name"), row.full_name.clone())?;
    state.set_number(
        &AttributePath::new("discount_rate"),
        row.discount_rate.unwrap_or(100.0),
    )?;
    for (attr, value) in [
        ("vat_number", &row.vat_number),
        ("email", &row.email),
        ("billing_email", &row.billing_email),
        ("phone", &row.phone),
        ("address", &row.address),
        ("city", &row.city),
        ("country", &row.country),
    ] {
        state.set_string(
            &AttributePath::new(attr),
            value.clone().unwrap_or_default(),
        )?;
    }
    state.set_bool(
        &AttributePath::new("managers_can_change_subscription"),
        row.is_eligible_update_subscription,
    )?;
    state.set_bool(&AttributePath::new("lock"), row.is_locked)?;
    state.set_bool(&AttributePath::new("is_read_only"), row.is_read_only)?;
    state.set_string(
        &AttributePath::new("partner_id"),
        row.partner_id.map(i32toa).unwrap_or_default(),
    )?;
    Ok(state)
}

pub fn organization_schema() -> Schema {
    SchemaBuilder::new()
        .description("Taikun Organization")
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .required()
                .validator(Arc::new(StringPatternValidator::new(
                    "^[a-zA-Z0-9-_.]+$",
                    "alphanumerics, dashes, underscores and dots",
                )))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("full_name", AttributeType::String)
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("discount_rate", AttributeType::Number)
                .description("Discount rate in percent, between 0 and 100.")
                .optional()
                .computed()
                .validator(Arc::new(NumberRangeValidator {
                    min: Some(0.0),
                    max: Some(100.0),
                }))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("vat_number", AttributeType::String)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("email", AttributeType::String)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("billing_email", AttributeType::String)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("phone", AttributeType::String)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("address", AttributeType::String)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("city", AttributeType::String)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("country", AttributeType::String)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("managers_can_change_subscription", AttributeType::Bool)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("lock", AttributeType::Bool)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("is_read_only", AttributeType::Bool)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("partner_id", AttributeType::String)
                .computed()
                .build(),
        )
        .build()
}

#[async_trait]
impl Resource for OrganizationResource {
    fn type_name(&self) -> &str {
        "taikun_organization"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: organization_schema(),
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

            let command = CreateOrganizationCommand {
                name: required_string(config, "name")?,
                full_name: required_string(config, "full_name")?,
                discount_rate: opt_number(config, "discount_rate"),
                vat_number: opt_string(config, "vat_number"),
                email: opt_string(config, "email"),
                billing_email: opt_string(config, "billing_email"),
                phone: opt_string(config, "phone"),
                address: opt_string(config, "address"),
                city: opt_string(config, "city"),
                country: opt_string(config, "country"),
                is_eligible_update_subscription: bool_or(
                    config,
                    "managers_can_change_subscription",
                    false,
                ),
            };

            let created = data.client.organizations().create(&command).await?;

            read_after_write(&ctx, "organization", READ_AFTER_CREATE_TIMEOUT, || {
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
                diagnostics: vec![api_error_diag("Failed to create organization", &e)],
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
                diagnostics: vec![api_error_diag("Failed to read organization", &e)],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            let config = &request.planned_state;

            let command = EditOrganizationCommand {
                id,
                name: required_string(config, "name")?,
                full_name: string_or_empty(config, "full_name"),
                discount_rate: opt_number(config, "discount_rate"),
                vat_number: opt_string(config, "vat_number"),
                email: opt_string(config, "email"),
                billing_email: opt_string(config, "billing_email"),
                phone: opt_string(config, "phone"),
                address: opt_string(config, "address"),
                city: opt_string(config, "city"),
                country: opt_string(config, "country"),
                is_eligible_update_subscription: bool_or(
                    config,
                    "managers_can_change_subscription",
                    false,
                ),
            };
            data.client.organizations().edit(&command).await?;

            read_after_write(&ctx, "organization", READ_AFTER_UPDATE_TIMEOUT, || {
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
                diagnostics: vec![api_error_diag("Failed to update organization", &e)],
            },
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let result: Result<(), ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            data.client.organizations().delete(id).await
        }
        .await;

        DeleteResourceResponse {
            diagnostics: match result {
                Ok(()) => vec![],
                Err(e) => vec![api_error_diag("Failed to delete organization", &e)],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for OrganizationResource {
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
    fn flatten_defaults_discount_rate_to_full_price() {
        let row = OrganizationRow {
            id: 3,
            name: "org".to_string(),
            full_name: "Org Inc".to_string(),
            discount_rate: None,
            vat_number: None,
            email: None,
            billing_email: None,
            phone: None,
            address: None,
            city: None,
            country: None,
            is_eligible_update_subscription: true,
            is_locked: false,
            is_read_only: false,
            partner_id: Some(1),
            created_at: None,
        };
        let state = flatten(&row).unwrap();
        assert_eq!(
            state
                .get_number(&AttributePath::new("discount_rate"))
                .unwrap(),
            100.0
        );
        assert_eq!(
            state.get_string(&AttributePath::new("partner_id")).unwrap(),
            "1"
        );
    }
}
