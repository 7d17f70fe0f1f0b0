//! taikun_repository
//!
//! One resource covers both repository flavors. Public repositories
//! already exist on the platform and are merely bound or unbound;
//! private repositories are imported from a chart URL and deleted on
//! destroy. After a private import the platform indexes the charts
//! asynchronously, so create waits until at least one package shows up.

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
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::{StringLengthValidator, StringPatternValidator};

use crate::api::repositories::{ImportRepositoryCommand, RepositoryRow};
use crate::api::ApiError;
use crate::provider_data::TaikunProviderData;
use crate::resources::{
    api_error_diag, bool_or, opt_id, opt_string, provider_data_from, required_string,
    string_or_empty,
};
use crate::utils::{
    i32toa, poll_until, read_after_write, READ_AFTER_CREATE_TIMEOUT, RETRY_INTERVAL,
    TOGGLE_TIMEOUT,
};

#[derive(Default)]
pub struct RepositoryResource {
    provider_data: Option<TaikunProviderData>,
}

impl RepositoryResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> Result<&TaikunProviderData, ApiError> {
        self.provider_data
            .as_ref()
            .ok_or_else(|| ApiError::Validation("provider not configured".to_string()))
    }

    /// Repositories have no by-id endpoint; reads go through the
    /// (name, organization, private) lookup the list endpoint supports.
    async fn read_state(
        &self,
        name: &str,
        organization_id: Option<i32>,
        private: bool,
        declared: &DynamicValue,
        post_write: bool,
    ) -> Result<Option<DynamicValue>, ApiError> {
        let data = self.data()?;
        let row = data
            .client
            .repositories()
            .find(name, organization_id, private)
            .await?;
        match row {
            // an unbound public repository is absent from this resource's
            // point of view
            Some(row) if row.is_private || row.is_bound => {
                Ok(Some(flatten(&row, declared)?))
            }
            Some(_) | None if post_write => Err(ApiError::NotFoundAfterCreateOrUpdate),
            _ => Ok(None),
        }
    }
}

fn flatten(row: &RepositoryRow, declared: &DynamicValue) -> Result<DynamicValue, ApiError> {
    let mut state = DynamicValue::empty_map();
    state.set_string(&AttributePath::new("id"), i32toa(row.id))?;
    state.set_string(&AttributePath::new("name"), row.name.clone())?;
    state.set_string(&AttributePath::new("url"), row.url.clone())?;
    state.set_string(
        &AttributePath::new("organization_id"),
        row.organization_id.map(i32toa).unwrap_or_default(),
    )?;
    state.set_bool(&AttributePath::new("private"), row.is_private)?;
    state.set_bool(&AttributePath::new("is_bound"), row.is_bound)?;
    // chart credentials are write-only, carry the declared values
    for attr in ["username", "password"] {
        if let Some(value) = opt_string(declared, attr) {
            state.set_string(&AttributePath::new(attr), value)?;
        }
    }
    Ok(state)
}

pub fn repository_schema() -> Schema {
    SchemaBuilder::new()
        .description("Taikun Repository")
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .required()
                .force_new()
                .validator(Arc::new(StringLengthValidator {
                    min: Some(3),
                    max: Some(30),
                }))
                .validator(Arc::new(StringPatternValidator::new(
                    "^[a-z0-9-]+$",
                    "lowercase alphanumeric repository name",
                )))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("private", AttributeType::Bool)
                .description("Import a private repository instead of binding a public one.")
                .optional()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("url", AttributeType::String)
                .description("Chart URL. Required for private repositories.")
                .optional()
                .computed()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("username", AttributeType::String)
                .optional()
                .force_new()
                .sensitive()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("password", AttributeType::String)
                .optional()
                .force_new()
                .sensitive()
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
            AttributeBuilder::new("is_bound", AttributeType::Bool)
                .computed()
                .build(),
        )
        .build()
}

#[async_trait]
impl Resource for RepositoryResource {
    fn type_name(&self) -> &str {
        "taikun_repository"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: repository_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = vec![];
        let private = bool_or(&request.config, "private", false);
        let has_url = opt_string(&request.config, "url").is_some();
        let has_credentials = opt_string(&request.config, "username").is_some()
            || opt_string(&request.config, "password").is_some();
        if private && !has_url {
            diagnostics.push(Diagnostic::error(
                "Missing repository URL",
                "private repositories require url",
            ));
        }
        if !private && (has_url || has_credentials) {
            diagnostics.push(Diagnostic::error(
                "Unexpected repository attributes",
                "url, username and password only apply to private repositories",
            ));
        }
        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let config = &request.config;

            let name = required_string(config, "name")?;
            let private = bool_or(config, "private", false);
            let organization_id = opt_id(config, "organization_id")?;
            // private imports only work in the caller's default organization
            let organization_id = if private {
                let default_org = data.client.organizations().default_organization().await?.id;
                match organization_id {
                    Some(id) if id != default_org => {
                        return Err(ApiError::Validation(format!(
                            "private repositories can only be imported into the default organization (id {})",
                            default_org
                        )));
                    }
                    _ => Some(default_org),
                }
            } else {
                organization_id
            };

            if private {
                data.client
                    .repositories()
                    .import(&ImportRepositoryCommand {
                        name: name.clone(),
                        url: required_string(config, "url")?,
                        username: opt_string(config, "username"),
                        password: opt_string(config, "password"),
                        organization_id,
                    })
                    .await?;

                // indexing runs in the background; an empty package list
                // means the import has not finished yet
                let client = &data.client;
                let repository_name: &str = &name;
                poll_until(
                    &ctx,
                    &format!("repository {}", name),
                    "indexed",
                    TOGGLE_TIMEOUT,
                    RETRY_INTERVAL,
                    move || async move {
                        let packages = client
                            .applications()
                            .packages_in_repository(repository_name)
                            .await?;
                        Ok(!packages.data.is_empty())
                    },
                )
                .await?;
            } else {
                let row = data
                    .client
                    .repositories()
                    .find(&name, organization_id, false)
                    .await?
                    .ok_or_else(|| {
                        ApiError::Validation(format!("public repository {:?} not found", name))
                    })?;
                data.client.repositories().bind(row.id).await?;
            }

            read_after_write(&ctx, "repository", READ_AFTER_CREATE_TIMEOUT, || {
                self.read_state(&name, organization_id, private, config, true)
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
                diagnostics: vec![api_error_diag("Failed to create repository", &e)],
            },
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result: Result<Option<DynamicValue>, ApiError> = async {
            let state = &request.current_state;
            let name = required_string(state, "name")?;
            let organization_id = opt_id(state, "organization_id")?;
            let private = bool_or(state, "private", false);
            self.read_state(&name, organization_id, private, state, false)
                .await
        }
        .await;

        match result {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![api_error_diag("Failed to read repository", &e)],
            },
        }
    }

    async fn update(&self, _ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        // every attribute forces recreation
        UpdateResourceResponse {
            new_state: request.planned_state,
            diagnostics: vec![],
        }
    }

    async fn delete(&self, _ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let result: Result<(), ApiError> = async {
            let data = self.data()?;
            let state = &request.prior_state;
            let id = crate::utils::atoi32(&string_or_empty(state, "id"))?;
            if bool_or(state, "private", false) {
                data.client.repositories().delete(id).await
            } else {
                data.client.repositories().unbind(id).await
            }
        }
        .await;

        DeleteResourceResponse {
            diagnostics: match result {
                Ok(()) => vec![],
                Err(e) => vec![api_error_diag("Failed to delete repository", &e)],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for RepositoryResource {
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
    use tfplug::types::Dynamic;

    #[test]
    fn name_must_be_a_lowercase_slug() {
        let schema = repository_schema();
        let attr = schema.attributes.iter().find(|a| a.name == "name").unwrap();
        let path = AttributePath::new("name");
        let run = |value: &str| {
            attr.validators
                .iter()
                .flat_map(|v| v.validate(&Dynamic::String(value.to_string()), &path))
                .count()
        };
        assert_eq!(run("my-charts"), 0);
        assert!(run("My Charts") > 0);
        assert!(run("ab") > 0);
    }

    #[tokio::test]
    async fn validate_rejects_url_on_public_repositories() {
        let mut config = DynamicValue::empty_map();
        config
            .set_string(&AttributePath::new("name"), "bitnami".to_string())
            .unwrap();
        config
            .set_string(
                &AttributePath::new("url"),
                "https://charts.example.com".to_string(),
            )
            .unwrap();

        let resource = RepositoryResource::new();
        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "taikun_repository".to_string(),
                    config,
                },
            )
            .await;
        assert_eq!(response.diagnostics.len(), 1);
    }

    #[tokio::test]
    async fn validate_requires_url_on_private_repositories() {
        let mut config = DynamicValue::empty_map();
        config
            .set_string(&AttributePath::new("name"), "internal".to_string())
            .unwrap();
        config
            .set_bool(&AttributePath::new("private"), true)
            .unwrap();

        let resource = RepositoryResource::new();
        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "taikun_repository".to_string(),
                    config,
                },
            )
            .await;
        assert_eq!(response.diagnostics.len(), 1);
    }

    #[test]
    fn flatten_carries_declared_chart_credentials() {
        let mut declared = DynamicValue::empty_map();
        declared
            .set_string(&AttributePath::new("username"), "robot".to_string())
            .unwrap();
        declared
            .set_string(&AttributePath::new("password"), "hunter2".to_string())
            .unwrap();

        let row = RepositoryRow {
            id: 9,
            name: "internal".to_string(),
            url: "https://charts.example.com".to_string(),
            organization_id: Some(3),
            is_private: true,
            is_bound: true,
        };
        let state = flatten(&row, &declared).unwrap();
        assert_eq!(
            state
                .get_string(&AttributePath::new("password"))
                .unwrap(),
            "hunter2"
        );
        assert!(state.get_bool(&AttributePath::new("private")).unwrap());
    }
}
