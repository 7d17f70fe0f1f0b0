//! Flavor and image catalogues of a cloud credential and their
//! per-project bindings. Both list endpoints are paged.

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::common::{ApiListResponse, QueryParams};
use super::error::ApiError;

const PAGE_SIZE: i32 = 50;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlavorRow {
    pub name: String,
    pub cpu: i32,
    /// bytes
    pub ram: i64,
}

/// One flavor↔project binding; unbind goes by binding id.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundFlavorRow {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BindFlavorsCommand {
    pub project_id: i32,
    pub flavors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnbindFlavorsCommand {
    pub ids: Vec<i32>,
}

pub struct FlavorsApi<'a> {
    client: &'a Client,
}

impl<'a> FlavorsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/v1/flavors/{cloudCredentialId} with CPU/RAM bounds, all
    /// pages drained.
    pub async fn list_for_credential(
        &self,
        cloud_credential_id: i32,
        min_cpu: Option<i32>,
        max_cpu: Option<i32>,
        min_ram_bytes: Option<f64>,
        max_ram_bytes: Option<f64>,
    ) -> Result<Vec<FlavorRow>, ApiError> {
        let mut rows = Vec::new();
        let mut offset = 0;
        loop {
            let params = QueryParams::new()
                .add("limit", PAGE_SIZE)
                .add("offset", offset)
                .add_optional("startCpu", min_cpu)
                .add_optional("endCpu", max_cpu)
                .add_optional("startRam", min_ram_bytes)
                .add_optional("endRam", max_ram_bytes);
            let path = format!(
                "/api/v1/flavors/{}{}",
                cloud_credential_id,
                params.to_query_string()
            );
            let page: ApiListResponse<FlavorRow> = self.client.get(&path).await?;
            let total = page.total_count;
            rows.extend(page.data);
            offset = rows.len() as i32;
            if offset >= total {
                return Ok(rows);
            }
        }
    }

    /// GET /api/v1/flavors/projects/{projectId}/list — all pages.
    pub async fn list_bound(&self, project_id: i32) -> Result<Vec<BoundFlavorRow>, ApiError> {
        let mut rows = Vec::new();
        let mut offset = 0;
        loop {
            let params = QueryParams::new().add("limit", PAGE_SIZE).add("offset", offset);
            let path = format!(
                "/api/v1/flavors/projects/{}/list{}",
                project_id,
                params.to_query_string()
            );
            let page: ApiListResponse<BoundFlavorRow> = self.client.get(&path).await?;
            let total = page.total_count;
            rows.extend(page.data);
            offset = rows.len() as i32;
            if offset >= total {
                return Ok(rows);
            }
        }
    }

    /// POST /api/v1/flavors/bind
    pub async fn bind(&self, command: &BindFlavorsCommand) -> Result<(), ApiError> {
        self.client.post("/api/v1/flavors/bind", command).await
    }

    /// POST /api/v1/flavors/unbind
    pub async fn unbind(&self, command: &UnbindFlavorsCommand) -> Result<(), ApiError> {
        self.client.post("/api/v1/flavors/unbind", command).await
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRow {
    pub id: String,
    pub name: String,
}

/// One image↔project binding.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundImageRow {
    /// binding id, used for unbind
    pub id: i32,
    pub image_id: String,
    pub image_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BindImagesCommand {
    pub project_id: i32,
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnbindImagesCommand {
    pub ids: Vec<i32>,
}

pub struct ImagesApi<'a> {
    client: &'a Client,
}

impl<'a> ImagesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/v1/images/{cloudCredentialId} — all pages.
    pub async fn list_for_credential(
        &self,
        cloud_credential_id: i32,
        personal: bool,
    ) -> Result<Vec<ImageRow>, ApiError> {
        let mut rows = Vec::new();
        let mut offset = 0;
        loop {
            let params = QueryParams::new()
                .add("limit", PAGE_SIZE)
                .add("offset", offset)
                .add("personal", personal);
            let path = format!(
                "/api/v1/images/{}{}",
                cloud_credential_id,
                params.to_query_string()
            );
            let page: ApiListResponse<ImageRow> = self.client.get(&path).await?;
            let total = page.total_count;
            rows.extend(page.data);
            offset = rows.len() as i32;
            if offset >= total {
                return Ok(rows);
            }
        }
    }

    /// GET /api/v1/images/projects/{projectId}/list — all pages.
    pub async fn list_bound(&self, project_id: i32) -> Result<Vec<BoundImageRow>, ApiError> {
        let mut rows = Vec::new();
        let mut offset = 0;
        loop {
            let params = QueryParams::new().add("limit", PAGE_SIZE).add("offset", offset);
            let path = format!(
                "/api/v1/images/projects/{}/list{}",
                project_id,
                params.to_query_string()
            );
            let page: ApiListResponse<BoundImageRow> = self.client.get(&path).await?;
            let total = page.total_count;
            rows.extend(page.data);
            offset = rows.len() as i32;
            if offset >= total {
                return Ok(rows);
            }
        }
    }

    /// POST /api/v1/images/bind
    pub async fn bind(&self, command: &BindImagesCommand) -> Result<(), ApiError> {
        self.client.post("/api/v1/images/bind", command).await
    }

    /// POST /api/v1/images/unbind
    pub async fn unbind(&self, command: &UnbindImagesCommand) -> Result<(), ApiError> {
        self.client.post("/api/v1/images/unbind", command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Credentials;

    fn test_client(server: &mockito::Server) -> Client {
        Client::with_preauthorized_token(
            &server.url(),
            &server.url(),
            Credentials::UserPassword {
                email: "dev@example.com".to_string(),
                password: "secret".to_string(),
            },
            "test-token",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn bound_flavor_listing_drains_pages() {
        let mut server = mockito::Server::new_async().await;
        let first_page: Vec<serde_json::Value> = (0..50)
            .map(|i| serde_json::json!({"id": i, "name": format!("f{}", i)}))
            .collect();
        let _page1 = server
            .mock("GET", "/api/v1/flavors/projects/9/list?limit=50&offset=0")
            .with_status(200)
            .with_body(
                serde_json::json!({"data": first_page, "totalCount": 51}).to_string(),
            )
            .create_async()
            .await;
        let _page2 = server
            .mock("GET", "/api/v1/flavors/projects/9/list?limit=50&offset=50")
            .with_status(200)
            .with_body(r#"{"data":[{"id":50,"name":"f50"}],"totalCount":51}"#)
            .create_async()
            .await;

        let client = test_client(&server);
        let rows = client.flavors().list_bound(9).await.unwrap();
        assert_eq!(rows.len(), 51);
        assert_eq!(rows[50].name, "f50");
    }
}
