//! Repository API. Public repositories are platform-owned and can only
//! be bound or unbound; private repositories are imported per
//! organization and can be deleted.

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::common::{ApiListResponse, IdResponse, QueryParams};
use super::error::ApiError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportRepositoryCommand {
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryRow {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub organization_id: Option<i32>,
    #[serde(default)]
    pub is_private: bool,
    #[serde(default)]
    pub is_bound: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryIdsCommand {
    ids: Vec<i32>,
}

pub struct RepositoriesApi<'a> {
    client: &'a Client,
}

impl<'a> RepositoriesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /api/v1/repositories/import — private repositories only.
    pub async fn import(&self, command: &ImportRepositoryCommand) -> Result<IdResponse, ApiError> {
        self.client
            .post("/api/v1/repositories/import", command)
            .await
    }

    /// POST /api/v1/repositories/delete — private repositories only.
    pub async fn delete(&self, repository_id: i32) -> Result<(), ApiError> {
        self.client
            .post(
                "/api/v1/repositories/delete",
                &RepositoryIdsCommand {
                    ids: vec![repository_id],
                },
            )
            .await
    }

    /// GET /api/v1/repositories/list
    pub async fn list(
        &self,
        params: &QueryParams,
    ) -> Result<ApiListResponse<RepositoryRow>, ApiError> {
        let path = format!("/api/v1/repositories/list{}", params.to_query_string());
        self.client.get(&path).await
    }

    /// Repository identified by (name, organization, private-flag).
    pub async fn find(
        &self,
        name: &str,
        organization_id: Option<i32>,
        private: bool,
    ) -> Result<Option<RepositoryRow>, ApiError> {
        let params = QueryParams::new()
            .add("search", name)
            .add("isPrivate", private)
            .add_optional("organizationId", organization_id);
        let response = self.list(&params).await?;
        Ok(response
            .data
            .into_iter()
            .find(|row| row.name == name && row.is_private == private))
    }

    /// POST /api/v1/repositories/bind — enables a public repository.
    pub async fn bind(&self, repository_id: i32) -> Result<(), ApiError> {
        self.client
            .post(
                "/api/v1/repositories/bind",
                &RepositoryIdsCommand {
                    ids: vec![repository_id],
                },
            )
            .await
    }

    /// POST /api/v1/repositories/unbind — disables a public repository.
    pub async fn unbind(&self, repository_id: i32) -> Result<(), ApiError> {
        self.client
            .post(
                "/api/v1/repositories/unbind",
                &RepositoryIdsCommand {
                    ids: vec![repository_id],
                },
            )
            .await
    }
}
