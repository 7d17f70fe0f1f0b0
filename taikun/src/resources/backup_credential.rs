//! taikun_backup_credential
//!
//! S3 credentials used by project backups. The secret key is never
//! returned by the API, so reads graft the declared value back into state.

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

use crate::api::backup::{
    BackupCredentialRow, CreateBackupCredentialCommand, EditBackupCredentialCommand,
};
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
pub struct BackupCredentialResource {
    provider_data: Option<TaikunProviderData>,
}

impl BackupCredentialResource {
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
        secret_key: &str,
        post_write: bool,
    ) -> Result<Option<DynamicValue>, ApiError> {
        let data = self.data()?;
        match data.client.backup().credential_by_id(id).await? {
            Some(row) => Ok(Some(flatten(&row, secret_key)?)),
            None if post_write => Err(ApiError::NotFoundAfterCreateOrUpdate),
            None => Ok(None),
        }
    }
}

fn flatten(row: &BackupCredentialRow, secret_key: &str) -> Result<DynamicValue, ApiError> {
    let mut state = DynamicValue::empty_map();
    state.set_string(&AttributePath::new("id"), i32toa(row.id))?;
    state.set_string(&AttributePath::new("name"), row.s3_name.clone())?;
    state.set_string(
        &AttributePath::new("s3_access_key_id"),
        row.s3_access_key_id.clone(),
    )?;
    state.set_string(&AttributePath::new("s3_secret_key"), secret_key.to_string())?;
    state.set_string(&AttributePath::new("s3_endpoint"), row.s3_endpoint.clone())?;
    state.set_string(&AttributePath::new("s3_region"), row.s3_region.clone())?;
    state.set_string(
        &AttributePath::new("organization_id"),
        row.organization_id.map(i32toa).unwrap_or_default(),
    )?;
    state.set_string(
        &AttributePath::new("organization_name"),
        row.organization_name.clone().unwrap_or_default(),
    )?;
    state.set_bool(&AttributePath::new("lock"), row.is_locked)?;
    state.set_bool(&AttributePath::new("is_default"), row.is_default)?;
    state.set_string(
        &AttributePath::new("created_by"),
        row.created_by.clone().unwrap_or_default(),
    )?;
    Ok(state)
}

pub fn backup_credential_schema() -> Schema {
    SchemaBuilder::new()
        .description("Taikun Backup Credential")
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
            AttributeBuilder::new("s3_access_key_id", AttributeType::String)
                .required()
                .sensitive()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("s3_secret_key", AttributeType::String)
                .required()
                .sensitive()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("s3_endpoint", AttributeType::String)
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("s3_region", AttributeType::String)
                .required()
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
            AttributeBuilder::new("organization_name", AttributeType::String)
                .computed()
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
impl Resource for BackupCredentialResource {
    fn type_name(&self) -> &str {
        "taikun_backup_credential"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: backup_credential_schema(),
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
            let secret_key = required_string(config, "s3_secret_key")?;

            let command = CreateBackupCredentialCommand {
                s3_name: required_string(config, "name")?,
                s3_access_key_id: required_string(config, "s3_access_key_id")?,
                s3_secret_key: secret_key.clone(),
                s3_endpoint: required_string(config, "s3_endpoint")?,
                s3_region: required_string(config, "s3_region")?,
                organization_id: opt_id(config, "organization_id")?,
            };
            let created = data.client.backup().create_credential(&command).await?;
            if bool_or(config, "lock", false) {
                data.client
                    .backup()
                    .lock_credential(created.id, LockMode::Lock)
                    .await?;
            }

            read_after_write(&ctx, "backup credential", READ_AFTER_CREATE_TIMEOUT, || {
                self.read_state(created.id, &secret_key, true)
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
                diagnostics: vec![api_error_diag("Failed to create backup credential", &e)],
            },
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result: Result<Option<DynamicValue>, ApiError> = async {
            let id = required_id(&request.current_state, "id")?;
            let secret_key = string_or_empty(&request.current_state, "s3_secret_key");
            self.read_state(id, &secret_key, false).await
        }
        .await;

        match result {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![api_error_diag("Failed to read backup credential", &e)],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            let config = &request.planned_state;
            let secret_key = required_string(config, "s3_secret_key")?;

            if bool_or(&request.prior_state, "lock", false) {
                data.client
                    .backup()
                    .lock_credential(id, LockMode::Unlock)
                    .await?;
            }

            if request.has_change_in(&[
                "name",
                "s3_access_key_id",
                "s3_secret_key",
                "s3_endpoint",
                "s3_region",
            ]) {
                let command = EditBackupCredentialCommand {
                    id,
                    s3_name: required_string(config, "name")?,
                    s3_access_key_id: required_string(config, "s3_access_key_id")?,
                    s3_secret_key: secret_key.clone(),
                    s3_endpoint: required_string(config, "s3_endpoint")?,
                    s3_region: required_string(config, "s3_region")?,
                };
                data.client.backup().edit_credential(&command).await?;
            }

            if bool_or(config, "lock", false) {
                data.client
                    .backup()
                    .lock_credential(id, LockMode::Lock)
                    .await?;
            }

            read_after_write(&ctx, "backup credential", READ_AFTER_UPDATE_TIMEOUT, || {
                self.read_state(id, &secret_key, true)
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
                diagnostics: vec![api_error_diag("Failed to update backup credential", &e)],
            },
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let result: Result<(), ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            if bool_or(&request.prior_state, "lock", false) {
                data.client
                    .backup()
                    .lock_credential(id, LockMode::Unlock)
                    .await?;
            }
            data.client.backup().delete_credential(id).await
        }
        .await;

        DeleteResourceResponse {
            diagnostics: match result {
                Ok(()) => vec![],
                Err(e) => vec![api_error_diag("Failed to delete backup credential", &e)],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for BackupCredentialResource {
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
    fn flatten_grafts_declared_secret_back() {
        let row = BackupCredentialRow {
            id: 6,
            s3_name: "backups".to_string(),
            s3_access_key_id: "AKIA123".to_string(),
            s3_endpoint: "https://s3.example.com".to_string(),
            s3_region: "eu-west-1".to_string(),
            organization_id: None,
            organization_name: None,
            is_locked: true,
            is_default: false,
            created_by: None,
        };
        let state = flatten(&row, "sekret").unwrap();
        assert_eq!(
            state
                .get_string(&AttributePath::new("s3_secret_key"))
                .unwrap(),
            "sekret"
        );
        assert!(state.get_bool(&AttributePath::new("lock")).unwrap());
    }
}
