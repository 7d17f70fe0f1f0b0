//! Kubeconfig API. Kubeconfigs are immutable once created; their content
//! is fetched lazily through a separate download endpoint.

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::common::{ApiListResponse, IdResponse, QueryParams};
use super::error::ApiError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKubeconfigCommand {
    pub name: String,
    pub project_id: i32,
    /// personal | managers | all
    pub access_scope: String,
    /// cluster-admin | admin | edit | view
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validity_period: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubeconfigRow {
    pub id: i32,
    pub name: String,
    pub project_id: i32,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub access_scope: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub user_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IdCommand {
    id: i32,
}

pub struct KubeconfigsApi<'a> {
    client: &'a Client,
}

impl<'a> KubeconfigsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /api/v1/kubeconfig/create
    pub async fn create(&self, command: &CreateKubeconfigCommand) -> Result<IdResponse, ApiError> {
        self.client.post("/api/v1/kubeconfig/create", command).await
    }

    /// GET /api/v1/kubeconfig/list
    pub async fn list(
        &self,
        params: &QueryParams,
    ) -> Result<ApiListResponse<KubeconfigRow>, ApiError> {
        let path = format!("/api/v1/kubeconfig/list{}", params.to_query_string());
        self.client.get(&path).await
    }

    pub async fn by_id(&self, id: i32) -> Result<Option<KubeconfigRow>, ApiError> {
        let params = QueryParams::new().add("id", id);
        let response = self.list(&params).await?;
        Ok(response.data.into_iter().find(|row| row.id == id))
    }

    /// POST /api/v1/kubeconfig/download — returns the raw YAML.
    pub async fn download(&self, id: i32) -> Result<String, ApiError> {
        self.client
            .post("/api/v1/kubeconfig/download", &IdCommand { id })
            .await
    }

    /// POST /api/v1/kubeconfig/delete
    pub async fn delete(&self, id: i32) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/kubeconfig/delete", &IdCommand { id })
            .await
    }
}
