//! taikun_catalog
//!
//! A catalog holds application packages and is bound to projects. The
//! package set is reconciled with add/delete diffing rather than a
//! wholesale replace, since bound projects may be running instances of
//! packages that did not change.

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
use tfplug::validator::{StringLengthValidator, StringPatternValidator};

use crate::api::catalogs::{CatalogRow, CreateCatalogCommand, EditCatalogCommand};
use crate::api::{ApiError, LockMode};
use crate::provider_data::TaikunProviderData;
use crate::resources::{
    api_error_diag, bool_or, list_of_maps, opt_id, provider_data_from, required_id,
    required_string, string_or_empty,
};
use crate::utils::{
    i32toa, read_after_write, set_diff, READ_AFTER_CREATE_TIMEOUT, READ_AFTER_UPDATE_TIMEOUT,
};

/// Package reference as declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PackageRef {
    name: String,
    repository: String,
}

#[derive(Default)]
pub struct CatalogResource {
    provider_data: Option<TaikunProviderData>,
}

impl CatalogResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> Result<&TaikunProviderData, ApiError> {
        self.provider_data
            .as_ref()
            .ok_or_else(|| ApiError::Validation("provider not configured".to_string()))
    }

    fn config_packages(config: &DynamicValue) -> Vec<PackageRef> {
        list_of_maps(config, "application")
            .iter()
            .map(|entry| PackageRef {
                name: entry
                    .get("name")
                    .and_then(|v| v.as_string())
                    .unwrap_or_default()
                    .to_string(),
                repository: entry
                    .get("repository")
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
        match data.client.catalogs().by_id(id).await? {
            Some(row) => Ok(Some(flatten(&row)?)),
            None if post_write => Err(ApiError::NotFoundAfterCreateOrUpdate),
            None => Ok(None),
        }
    }

    /// Adds/removes packages so the catalog matches the declared set.
    async fn reconcile_packages(
        &self,
        catalog_id: i32,
        declared: &[PackageRef],
    ) -> Result<(), ApiError> {
        let data = self.data()?;
        let catalogs = data.client.catalogs();
        let applications = data.client.applications();

        let current = match catalogs.by_id(catalog_id).await? {
            Some(row) => row
                .bound_applications
                .iter()
                .map(|app| PackageRef {
                    name: app.name.clone(),
                    repository: app.repository.clone(),
                })
                .collect::<Vec<_>>(),
            None => Vec::new(),
        };

        let (added, removed) = set_diff(&current, declared);

        for package in removed {
            if let Some(row) = applications
                .find_package(&package.name, &package.repository)
                .await?
            {
                catalogs.delete_package(catalog_id, row.id).await?;
            }
        }
        for package in added {
            let row = applications
                .find_package(&package.name, &package.repository)
                .await?
                .ok_or_else(|| {
                    ApiError::Validation(format!(
                        "package {:?} not found in repository {:?}",
                        package.name, package.repository
                    ))
                })?;
            catalogs.add_package(catalog_id, row.id).await?;
        }
        Ok(())
    }
}

fn flatten(row: &CatalogRow) -> Result<DynamicValue, ApiError> {
    let mut state = DynamicValue::empty_map();
    state.set_string(&AttributePath::new("id"), i32toa(row.id))?;
    state.set_string(&AttributePath::new("name"), row.name.clone())?;
    state.set_string(&AttributePath::new("description"), row.description.clone())?;
    state.set_string(
        &AttributePath::new("organization_id"),
        row.organization_id.map(i32toa).unwrap_or_default(),
    )?;
    state.set_bool(&AttributePath::new("lock"), row.is_locked)?;
    state.set_bool(&AttributePath::new("is_default"), row.is_default)?;

    let applications = row
        .bound_applications
        .iter()
        .map(|app| {
            let mut map = HashMap::new();
            map.insert("id".to_string(), Dynamic::String(i32toa(app.id)));
            map.insert("name".to_string(), Dynamic::String(app.name.clone()));
            map.insert(
                "repository".to_string(),
                Dynamic::String(app.repository.clone()),
            );
            Dynamic::Map(map)
        })
        .collect();
    state.set_list(&AttributePath::new("application"), applications)?;

    state.set_list(
        &AttributePath::new("projects"),
        row.bound_projects
            .iter()
            .map(|project| Dynamic::String(project.name.clone()))
            .collect(),
    )?;
    Ok(state)
}

pub fn catalog_schema() -> Schema {
    SchemaBuilder::new()
        .description("Taikun Catalog")
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
                .validator(Arc::new(StringPatternValidator::new(
                    "^[a-z0-9-]+$",
                    "lowercase alphanumeric catalog name",
                )))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("description", AttributeType::String)
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
            AttributeBuilder::new(
                "application",
                AttributeType::List(Box::new(AttributeType::Object(HashMap::new()))),
            )
            .description("Application packages offered by the catalog.")
            .optional()
            .nested(
                vec![
                    AttributeBuilder::new("id", AttributeType::String)
                        .computed()
                        .build(),
                    AttributeBuilder::new("name", AttributeType::String)
                        .required()
                        .build(),
                    AttributeBuilder::new("repository", AttributeType::String)
                        .required()
                        .build(),
                ],
                NestingMode::List,
            )
            .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "projects",
                AttributeType::List(Box::new(AttributeType::String)),
            )
            .description("Names of projects bound to the catalog.")
            .computed()
            .build(),
        )
        .build()
}

#[async_trait]
impl Resource for CatalogResource {
    fn type_name(&self) -> &str {
        "taikun_catalog"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: catalog_schema(),
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

            let command = CreateCatalogCommand {
                name: required_string(config, "name")?,
                description: string_or_empty(config, "description"),
                organization_id: opt_id(config, "organization_id")?,
            };
            let created = data.client.catalogs().create(&command).await?;

            self.reconcile_packages(created.id, &Self::config_packages(config))
                .await?;

            if bool_or(config, "lock", false) {
                data.client.catalogs().lock(created.id, LockMode::Lock).await?;
            }

            read_after_write(&ctx, "catalog", READ_AFTER_CREATE_TIMEOUT, || {
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
                diagnostics: vec![api_error_diag("Failed to create catalog", &e)],
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
                diagnostics: vec![api_error_diag("Failed to read catalog", &e)],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            let config = &request.planned_state;

            if bool_or(&request.prior_state, "lock", false) {
                data.client.catalogs().lock(id, LockMode::Unlock).await?;
            }

            if request.has_change_in(&["name", "description"]) {
                data.client
                    .catalogs()
                    .edit(&EditCatalogCommand {
                        id,
                        name: required_string(config, "name")?,
                        description: string_or_empty(config, "description"),
                    })
                    .await?;
            }

            if request.has_change(&AttributePath::new("application")) {
                self.reconcile_packages(id, &Self::config_packages(config))
                    .await?;
            }

            if bool_or(config, "lock", false) {
                data.client.catalogs().lock(id, LockMode::Lock).await?;
            }

            read_after_write(&ctx, "catalog", READ_AFTER_UPDATE_TIMEOUT, || {
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
                diagnostics: vec![api_error_diag("Failed to update catalog", &e)],
            },
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let result: Result<(), ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.prior_state, "id")?;
            if bool_or(&request.prior_state, "lock", false) {
                data.client.catalogs().lock(id, LockMode::Unlock).await?;
            }
            data.client.catalogs().delete(id).await
        }
        .await;

        DeleteResourceResponse {
            diagnostics: match result {
                Ok(()) => vec![],
                Err(e) => vec![api_error_diag("Failed to delete catalog", &e)],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for CatalogResource {
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
    fn name_must_be_a_lowercase_slug() {
        let schema = catalog_schema();
        let attr = schema.attributes.iter().find(|a| a.name == "name").unwrap();
        let path = AttributePath::new("name");
        let run = |value: &str| {
            attr.validators
                .iter()
                .flat_map(|v| v.validate(&Dynamic::String(value.to_string()), &path))
                .count()
        };
        assert_eq!(run("default-apps"), 0);
        assert!(run("Default Apps") > 0);
    }

    #[test]
    fn config_packages_parse_name_and_repository() {
        let mut config = DynamicValue::empty_map();
        let mut app = HashMap::new();
        app.insert("name".to_string(), Dynamic::String("wordpress".to_string()));
        app.insert(
            "repository".to_string(),
            Dynamic::String("bitnami".to_string()),
        );
        config
            .set_list(&AttributePath::new("application"), vec![Dynamic::Map(app)])
            .unwrap();

        let packages = CatalogResource::config_packages(&config);
        assert_eq!(packages.len(), 1);
        assert_eq!(packages[0].name, "wordpress");
        assert_eq!(packages[0].repository, "bitnami");
    }

    #[test]
    fn flatten_lists_bound_projects_by_name() {
        use crate::api::catalogs::{BoundApplicationRow, BoundProjectRow};
        let row = CatalogRow {
            id: 5,
            name: "default-apps".to_string(),
            description: "shared catalog".to_string(),
            organization_id: Some(1),
            is_locked: false,
            is_default: true,
            bound_projects: vec![BoundProjectRow {
                id: 11,
                name: "prod".to_string(),
            }],
            bound_applications: vec![BoundApplicationRow {
                id: 7,
                name: "wordpress".to_string(),
                repository: "bitnami".to_string(),
            }],
        };
        let state = flatten(&row).unwrap();
        let projects = state.get_list(&AttributePath::new("projects")).unwrap();
        assert_eq!(projects[0].as_string(), Some("prod"));
        assert!(state.get_bool(&AttributePath::new("is_default")).unwrap());
    }
}
