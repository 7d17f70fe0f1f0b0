//! taikun_user
//!
//! Unlike every other Taikun entity, users are keyed by an opaque string id.

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
use tfplug::validator::{StringInSliceValidator, StringPatternValidator};

use crate::api::users::{CreateUserCommand, EditUserCommand, UserRow};
use crate::api::ApiError;
use crate::provider_data::TaikunProviderData;
use crate::resources::{
    api_error_diag, bool_or, opt_id, opt_string, provider_data_from, required_string,
    string_or_empty,
};
use crate::utils::{
    i32toa, read_after_write, READ_AFTER_CREATE_TIMEOUT, READ_AFTER_UPDATE_TIMEOUT,
};

const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

#[derive(Default)]
pub struct UserResource {
    provider_data: Option<TaikunProviderData>,
}

impl UserResource {
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
        id: &str,
        post_write: bool,
    ) -> Result<Option<DynamicValue>, ApiError> {
        let data = self.data()?;
        match data.client.users().by_id(id).await? {
            Some(row) => Ok(Some(flatten(&row)?)),
            None if post_write => Err(ApiError::NotFoundAfterCreateOrUpdate),
            None => Ok(None),
        }
    }
}

fn flatten(row: &UserRow) -> Result<DynamicValue, ApiError> {
    let mut state = DynamicValue::empty_map();
    state.set_string(&AttributePath::new("id"), row.id.clone())?;
    state.set_string(&AttributePath::new("user_name"), row.username.clone())?;
    state.set_string(&AttributePath::new("email"), row.email.clone())?;
    state.set_string(&AttributePath::new("role"), row.role.clone())?;
    state.set_string(
        &AttributePath::new("display_name"),
        row.display_name.clone().unwrap_or_default(),
    )?;
    state.set_string(
        &AttributePath::new("organization_id"),
        row.organization_id.map(i32toa).unwrap_or_default(),
    )?;
    state.set_bool(&AttributePath::new("email_confirmed"), row.email_confirmed)?;
    state.set_bool(
        &AttributePath::new("email_notification_enabled"),
        row.email_notification_enabled,
    )?;
    state.set_bool(&AttributePath::new("is_csm"), row.is_csm)?;
    state.set_bool(&AttributePath::new("is_owner"), row.is_owner)?;
    state.set_bool(&AttributePath::new("is_disabled"), row.is_disabled)?;
    state.set_bool(&AttributePath::new("is_approved_by_partner"), row.is_approved_by_partner)?;
    Ok(state)
}

pub fn user_schema() -> Schema {
    SchemaBuilder::new()
        .description("Taikun User")
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("user_name", AttributeType::String)
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("email", AttributeType::String)
                .required()
                .validator(Arc::new(StringPatternValidator::new(
                    EMAIL_PATTERN,
                    "a valid email address",
                )))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("role", AttributeType::String)
                .required()
                .validator(Arc::new(StringInSliceValidator::new(&["User", "Manager"])))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("display_name", AttributeType::String)
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
            AttributeBuilder::new("email_confirmed", AttributeType::Bool)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("email_notification_enabled", AttributeType::Bool)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("is_csm", AttributeType::Bool)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("is_owner", AttributeType::Bool)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("is_disabled", AttributeType::Bool)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("is_approved_by_partner", AttributeType::Bool)
                .computed()
                .build(),
        )
        .build()
}

#[async_trait]
impl Resource for UserResource {
    fn type_name(&self) -> &str {
        "taikun_user"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: user_schema(),
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

            let command = CreateUserCommand {
                username: required_string(config, "user_name")?,
                email: required_string(config, "email")?,
                role: required_string(config, "role")?,
                display_name: opt_string(config, "display_name"),
                organization_id: opt_id(config, "organization_id")?,
            };
            let created = data.client.users().create(&command).await?;

            read_after_write(&ctx, "user", READ_AFTER_CREATE_TIMEOUT, || {
                self.read_state(&created.id, true)
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
                diagnostics: vec![api_error_diag("Failed to create user", &e)],
            },
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result: Result<Option<DynamicValue>, ApiError> = async {
            let id = string_or_empty(&request.current_state, "id");
            if id.is_empty() {
                return Err(ApiError::Validation("user id missing from state".to_string()));
            }
            self.read_state(&id, false).await
        }
        .await;

        match result {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![api_error_diag("Failed to read user", &e)],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let id = string_or_empty(&request.prior_state, "id");
            let config = &request.planned_state;

            let command = EditUserCommand {
                id: id.clone(),
                username: required_string(config, "user_name")?,
                email: required_string(config, "email")?,
                role: required_string(config, "role")?,
                display_name: opt_string(config, "display_name"),
                is_approved_by_partner: bool_or(&request.prior_state, "is_approved_by_partner", false),
            };
            data.client.users().edit(&command).await?;

            read_after_write(&ctx, "user", READ_AFTER_UPDATE_TIMEOUT, || {
                self.read_state(&id, true)
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
                diagnostics: vec![api_error_diag("Failed to update user", &e)],
            },
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let result: Result<(), ApiError> = async {
            let data = self.data()?;
            let id = string_or_empty(&request.prior_state, "id");
            data.client.users().delete(&id).await
        }
        .await;

        DeleteResourceResponse {
            diagnostics: match result {
                Ok(()) => vec![],
                Err(e) => vec![api_error_diag("Failed to delete user", &e)],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for UserResource {
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
    fn flatten_keeps_string_id() {
        let row = UserRow {
            id: "usr-91af".to_string(),
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            role: "Manager".to_string(),
            display_name: None,
            organization_id: Some(7),
            email_confirmed: true,
            email_notification_enabled: false,
            is_csm: false,
            is_owner: false,
            is_disabled: false,
            is_approved_by_partner: true,
        };
        let state = flatten(&row).unwrap();
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "usr-91af");
        assert_eq!(
            state
                .get_string(&AttributePath::new("organization_id"))
                .unwrap(),
            "7"
        );
    }
}
