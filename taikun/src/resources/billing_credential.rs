//! taikun_billing_credential
//!
//! The Prometheus password is never returned by the API, so reads graft the
//! declared value back into state. No edit endpoint exists; everything but
//! the lock flag forces a recreate.

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

use crate::api::billing::{BillingCredentialRow, CreateBillingCredentialCommand};
use crate::api::{ApiError, LockMode};
use crate::provider_data::TaikunProviderData;
use crate::resources::{
    api_error_diag, bool_or, opt_id, provider_data_from, required_id, required_string,
    string_or_empty,
};
use crate::utils::{
    i32toa, read_after_write, READ_AFTER_CREATE_TIMEOUT, READ_AFTER_UPDATE_TIMEOUT,
};

#[derive(Default)]
pub struct BillingCredentialResource {
    provider_data: Option<TaikunProviderData>,
}

impl BillingCredentialResource {
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
        password: &str,
        post_write: bool,
    ) -> Result<Option<DynamicValue>, ApiError> {
        let data = self.data()?;
        match data.client.billing().credential_by_id(id).await? {
            Some(row) => Ok(Some(flatten(&row, password)?)),
            None if post_write => Err(ApiError::NotFoundAfterCreateOrUpdate),
            None => Ok(None),
        }
    }
}

fn flatten(row: &BillingCredentialRow, password: &str) -> Result<DynamicValue, ApiError> {
    let mut state = DynamicValue::empty_map();
    state.set_string(&AttributePath::new("id"), i32toa(row.id))?;
    state.set_string(&AttributePath::new("name"), row.name.clone())?;
    state.set_string(
        &AttributePath::new("prometheus_username"),
        row.prometheus_username.clone(),
    )?;
    state.set_string(
        &AttributePath::new("prometheus_password"),
        password.to_string(),
    )?;
    state.set_string(
        &AttributePath::new("prometheus_url"),
        row.prometheus_url.clone(),
    )?;
    state.set_string(
        &AttributePath::new("organization_id"),
        row.organization_id.map(i32toa).unwrap_or_default(),
    )?;
    state.set_bool(&AttributePath::new("lock"), row.is_locked)?;
    state.set_bool(&AttributePath::new("is_default"), row.is_default)?;
    state.set_string(
        &AttributePath::new("created_by"),
        row.created_by.clone().unwrap_or_default(),
    )?;
    Ok(state)
}

pub fn billing_credential_schema() -> Schema {
    SchemaBuilder::new()
        .description("Taikun Billing Credential")
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
            AttributeBuilder::new("prometheus_username", AttributeType::String)
                .required()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("prometheus_password", AttributeType::String)
                .required()
                .force_new()
                .sensitive()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("prometheus_url", AttributeType::String)
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
impl Resource for BillingCredentialResource {
    fn type_name(&self) -> &str {
        "taikun_billing_credential"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: billing_credential_schema(),
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
            let password = required_string(config, "prometheus_password")?;

            let command = CreateBillingCredentialCommand {
                name: required_string(config, "name")?,
                prometheus_username: required_string(config, "prometheus_username")?,
                prometheus_password: password.clone(),
                prometheus_url: required_string(config, "prometheus_url")?,
                organization_id: opt_id(config, "organization_id")?,
            };
            let created = data.client.billing().create_credential(&command).await?;
            if bool_or(config, "lock", false) {
                data.client
                    .billing()
                    .lock_credential(created.id, LockMode::Lock)
                    .await?;
            }

            read_after_write(&ctx, "billing credential", READ_AFTER_CREATE_TIMEOUT, || {
                self.read_state(created.id, &password, true)
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
                diagnostics: vec![api_error_diag("Failed to create billing credential", &e)],
            },
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result: Result<Option<DynamicValue>, ApiError> = async {
            let id = required_id(&request.current_state, "id")?;
            let password = string_or_empty(&request.current_state, "prometheus_password");
            self.read_state(id, &password, false).await
        }
        .await;

        match result {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![api_error_diag("Failed to read billing credential", &e)],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            if request.has_change(&AttributePath::new("lock")) {
                let mode = LockMode::from_bool(bool_or(&request.planned_state, "lock", false));
                data.client.billing().lock_credential(id, mode).await?;
            }
            let password = string_or_empty(&request.planned_state, "prometheus_password");
            read_after_write(&ctx, "billing credential", READ_AFTER_UPDATE_TIMEOUT, || {
                self.read_state(id, &password, true)
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
                diagnostics: vec![api_error_diag("Failed to update billing credential", &e)],
            },
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let result: Result<(), ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            if bool_or(&request.prior_state, "lock", false) {
                data.client
                    .billing()
                    .lock_credential(id, LockMode::Unlock)
                    .await?;
            }
            data.client.billing().delete_credential(id).await
        }
        .await;

        DeleteResourceResponse {
            diagnostics: match result {
                Ok(()) => vec![],
                Err(e) => vec![api_error_diag("Failed to delete billing credential", &e)],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for BillingCredentialResource {
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
    fn flatten_grafts_declared_password_back() {
        let row = BillingCredentialRow {
            id: 8,
            name: "prom".to_string(),
            prometheus_username: "scraper".to_string(),
            prometheus_url: "https://prom.example.com".to_string(),
            organization_id: Some(2),
            is_locked: false,
            is_default: false,
            created_by: Some("admin".to_string()),
        };
        let state = flatten(&row, "hunter2").unwrap();
        assert_eq!(
            state
                .get_string(&AttributePath::new("prometheus_password"))
                .unwrap(),
            "hunter2"
        );
    }
}
