//! Catalog API: named sets of application packages, bound to projects.

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::common::{ApiListResponse, IdResponse, LockManagerCommand, LockMode, QueryParams};
use super::error::ApiError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCatalogCommand {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditCatalogCommand {
    pub id: i32,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRow {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub organization_id: Option<i32>,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub bound_projects: Vec<BoundProjectRow>,
    #[serde(default)]
    pub bound_applications: Vec<BoundApplicationRow>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundProjectRow {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundApplicationRow {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub repository: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogProjectCommand {
    catalog_id: i32,
    project_id: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogIdCommand {
    id: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogPackageCommand {
    catalog_id: i32,
    package_id: i32,
}

pub struct CatalogsApi<'a> {
    client: &'a Client,
}

impl<'a> CatalogsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /api/v1/catalogs/create
    pub async fn create(&self, command: &CreateCatalogCommand) -> Result<IdResponse, ApiError> {
        self.client.post("/api/v1/catalogs/create", command).await
    }

    /// POST /api/v1/catalogs/edit
    pub async fn edit(&self, command: &EditCatalogCommand) -> Result<(), ApiError> {
        self.client.post("/api/v1/catalogs/edit", command).await
    }

    /// POST /api/v1/catalogs/delete
    pub async fn delete(&self, catalog_id: i32) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/catalogs/delete", &CatalogIdCommand { id: catalog_id })
            .await
    }

    /// GET /api/v1/catalogs/list
    pub async fn list(
        &self,
        params: &QueryParams,
    ) -> Result<ApiListResponse<CatalogRow>, ApiError> {
        let path = format!("/api/v1/catalogs/list{}", params.to_query_string());
        self.client.get(&path).await
    }

    pub async fn by_id(&self, catalog_id: i32) -> Result<Option<CatalogRow>, ApiError> {
        let params = QueryParams::new().add("catalogId", catalog_id);
        let response = self.list(&params).await?;
        Ok(response.data.into_iter().find(|row| row.id == catalog_id))
    }

    /// Catalog by exact name within an optional organization scope.
    pub async fn by_name(
        &self,
        name: &str,
        organization_id: Option<i32>,
    ) -> Result<Option<CatalogRow>, ApiError> {
        let params = QueryParams::new()
            .add("search", name)
            .add_optional("organizationId", organization_id);
        let response = self.list(&params).await?;
        Ok(response.data.into_iter().find(|row| row.name == name))
    }

    /// POST /api/v1/catalogs/projects/add
    pub async fn add_project(&self, catalog_id: i32, project_id: i32) -> Result<(), ApiError> {
        self.client
            .post(
                "/api/v1/catalogs/projects/add",
                &CatalogProjectCommand {
                    catalog_id,
                    project_id,
                },
            )
            .await
    }

    /// POST /api/v1/catalogs/projects/delete
    pub async fn delete_project(&self, catalog_id: i32, project_id: i32) -> Result<(), ApiError> {
        self.client
            .post(
                "/api/v1/catalogs/projects/delete",
                &CatalogProjectCommand {
                    catalog_id,
                    project_id,
                },
            )
            .await
    }

    /// POST /api/v1/catalogs/packages/add
    pub async fn add_package(&self, catalog_id: i32, package_id: i32) -> Result<(), ApiError> {
        self.client
            .post(
                "/api/v1/catalogs/packages/add",
                &CatalogPackageCommand {
                    catalog_id,
                    package_id,
                },
            )
            .await
    }

    /// POST /api/v1/catalogs/packages/delete
    pub async fn delete_package(&self, catalog_id: i32, package_id: i32) -> Result<(), ApiError> {
        self.client
            .post(
                "/api/v1/catalogs/packages/delete",
                &CatalogPackageCommand {
                    catalog_id,
                    package_id,
                },
            )
            .await
    }

    /// POST /api/v1/catalogs/lockmanager
    pub async fn lock(&self, catalog_id: i32, mode: LockMode) -> Result<(), ApiError> {
        self.client
            .post(
                "/api/v1/catalogs/lockmanager",
                &LockManagerCommand::new(catalog_id, mode),
            )
            .await
    }
}
