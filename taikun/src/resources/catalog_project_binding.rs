//! taikun_catalog_project_binding
//!
//! Binds one project to one catalog. The binding has no attributes of
//! its own, so every change forces recreation and update is a no-op.

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

use crate::api::ApiError;
use crate::provider_data::TaikunProviderData;
use crate::resources::{
    api_error_diag, provider_data_from, required_id, required_string, string_or_empty,
};
use crate::utils::{atoi32, i32toa, read_after_write, READ_AFTER_CREATE_TIMEOUT};

#[derive(Default)]
pub struct CatalogProjectBindingResource {
    provider_data: Option<TaikunProviderData>,
}

impl CatalogProjectBindingResource {
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
        catalog_id: i32,
        project_id: i32,
        post_write: bool,
    ) -> Result<Option<DynamicValue>, ApiError> {
        let data = self.data()?;
        let bound = match data.client.catalogs().by_id(catalog_id).await? {
            Some(row) if row.bound_projects.iter().any(|p| p.id == project_id) => {
                let mut state = DynamicValue::empty_map();
                state.set_string(
                    &AttributePath::new("id"),
                    binding_id(catalog_id, project_id),
                )?;
                state.set_string(&AttributePath::new("catalog_name"), row.name.clone())?;
                state.set_string(&AttributePath::new("project_id"), i32toa(project_id))?;
                state.set_bool(&AttributePath::new("is_bound"), true)?;
                Some(state)
            }
            _ => None,
        };
        match bound {
            Some(state) => Ok(Some(state)),
            None if post_write => Err(ApiError::NotFoundAfterCreateOrUpdate),
            None => Ok(None),
        }
    }
}

fn binding_id(catalog_id: i32, project_id: i32) -> String {
    format!("{catalog_id}/{project_id}")
}

fn parse_binding_id(id: &str) -> Result<(i32, i32), ApiError> {
    let (catalog, project) = id
        .split_once('/')
        .ok_or_else(|| ApiError::Validation(format!("malformed binding id {:?}", id)))?;
    Ok((atoi32(catalog)?, atoi32(project)?))
}

pub fn catalog_project_binding_schema() -> Schema {
    SchemaBuilder::new()
        .description("Taikun Catalog Project Binding")
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("catalog_name", AttributeType::String)
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
            AttributeBuilder::new("is_bound", AttributeType::Bool)
                .computed()
                .build(),
        )
        .build()
}

#[async_trait]
impl Resource for CatalogProjectBindingResource {
    fn type_name(&self) -> &str {
        "taikun_catalog_project_binding"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: catalog_project_binding_schema(),
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

            let catalog_name = required_string(config, "catalog_name")?;
            let project_id = required_id(config, "project_id")?;

            let catalog = data
                .client
                .catalogs()
                .by_name(&catalog_name, None)
                .await?
                .ok_or_else(|| {
                    ApiError::Validation(format!("catalog {:?} not found", catalog_name))
                })?;

            // binding a project that is still deploying is rejected server
            // side with an opaque error, check upfront
            let project = data
                .client
                .projects()
                .by_id(project_id)
                .await?
                .ok_or_else(|| {
                    ApiError::Validation(format!("project {} not found", project_id))
                })?;
            if project.status != crate::api::projects::PROJECT_READY {
                return Err(ApiError::Validation(format!(
                    "project {} is {}, it must be Ready before it can be bound to a catalog",
                    project_id, project.status
                )));
            }

            data.client
                .catalogs()
                .add_project(catalog.id, project_id)
                .await?;

            read_after_write(&ctx, "catalog project binding", READ_AFTER_CREATE_TIMEOUT, || {
                self.read_state(catalog.id, project_id, true)
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
                diagnostics: vec![api_error_diag("Failed to bind project to catalog", &e)],
            },
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result: Result<Option<DynamicValue>, ApiError> = async {
            let id = string_or_empty(&request.current_state, "id");
            let (catalog_id, project_id) = parse_binding_id(&id)?;
            self.read_state(catalog_id, project_id, false).await
        }
        .await;

        match result {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![api_error_diag("Failed to read catalog project binding", &e)],
            },
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        // both attributes force recreation
        UpdateResourceResponse {
            new_state: request.planned_state,
            diagnostics: vec![],
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let result: Result<(), ApiError> = async {
            let data = self.data()?;
            let id = string_or_empty(&request.prior_state, "id");
            let (catalog_id, project_id) = parse_binding_id(&id)?;
            data.client
                .catalogs()
                .delete_project(catalog_id, project_id)
                .await
        }
        .await;

        DeleteResourceResponse {
            diagnostics: match result {
                Ok(()) => vec![],
                Err(e) => vec![api_error_diag("Failed to unbind project from catalog", &e)],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for CatalogProjectBindingResource {
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
    fn binding_id_round_trips() {
        let id = binding_id(42, 7);
        assert_eq!(id, "42/7");
        assert_eq!(parse_binding_id(&id).unwrap(), (42, 7));
    }

    #[test]
    fn parse_binding_id_rejects_garbage() {
        assert!(parse_binding_id("42").is_err());
        assert!(parse_binding_id("a/b").is_err());
    }
}
