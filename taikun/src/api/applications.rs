//! Application packages and installed application instances.

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::common::{ApiListResponse, IdResponse, QueryParams};
use super::error::ApiError;

/// Terminal non-error instance state.
pub const INSTANCE_READY: &str = "Ready";
pub const INSTANCE_FAILURE: &str = "Failure";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageRow {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub repository: String,
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallInstanceCommand {
    pub name: String,
    pub project_id: i32,
    pub catalog_app_id: i32,
    pub autosync: bool,
    /// base64-url-encoded YAML values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_values: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceDetails {
    pub id: i32,
    pub name: String,
    pub project_id: i32,
    pub catalog_app_id: i32,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub autosync: bool,
    #[serde(default)]
    pub extra_values: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InstanceIdCommand {
    id: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EditInstanceCommand {
    id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    autosync: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    extra_values: Option<String>,
}

pub struct ApplicationsApi<'a> {
    client: &'a Client,
}

impl<'a> ApplicationsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/v1/packages/list
    pub async fn list_packages(
        &self,
        params: &QueryParams,
    ) -> Result<ApiListResponse<PackageRow>, ApiError> {
        let path = format!("/api/v1/packages/list{}", params.to_query_string());
        self.client.get(&path).await
    }

    /// Packages filtered by repository name; used both for lookup and for
    /// the indexing wait after a private-repo import.
    pub async fn packages_in_repository(
        &self,
        repository_name: &str,
    ) -> Result<ApiListResponse<PackageRow>, ApiError> {
        let params = QueryParams::new().add("repositoryName", repository_name);
        self.list_packages(&params).await
    }

    /// Package by (name, repository name).
    pub async fn find_package(
        &self,
        name: &str,
        repository_name: &str,
    ) -> Result<Option<PackageRow>, ApiError> {
        let response = self.packages_in_repository(repository_name).await?;
        Ok(response.data.into_iter().find(|row| row.name == name))
    }

    /// POST /api/v1/applications/install
    pub async fn install(&self, command: &InstallInstanceCommand) -> Result<IdResponse, ApiError> {
        self.client
            .post("/api/v1/applications/install", command)
            .await
    }

    /// GET /api/v1/applications/details/{id}; `None` once uninstalled.
    pub async fn details(&self, instance_id: i32) -> Result<Option<InstanceDetails>, ApiError> {
        let path = format!("/api/v1/applications/details/{}", instance_id);
        match self.client.get::<InstanceDetails>(&path).await {
            Ok(details) => Ok(Some(details)),
            Err(ApiError::Api { status: 404, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// POST /api/v1/applications/uninstall
    pub async fn uninstall(&self, instance_id: i32) -> Result<(), ApiError> {
        self.client
            .post(
                "/api/v1/applications/uninstall",
                &InstanceIdCommand { id: instance_id },
            )
            .await
    }

    /// POST /api/v1/applications/sync
    pub async fn sync(&self, instance_id: i32) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/applications/sync", &InstanceIdCommand { id: instance_id })
            .await
    }

    /// POST /api/v1/applications/edit
    pub async fn edit(
        &self,
        instance_id: i32,
        autosync: Option<bool>,
        extra_values: Option<String>,
    ) -> Result<(), ApiError> {
        self.client
            .post(
                "/api/v1/applications/edit",
                &EditInstanceCommand {
                    id: instance_id,
                    autosync,
                    extra_values,
                },
            )
            .await
    }
}
