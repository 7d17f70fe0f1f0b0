//! Slack configuration API.

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::common::{ApiListResponse, IdResponse, QueryParams};
use super::error::ApiError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSlackConfigCommand {
    pub name: String,
    pub url: String,
    pub channel: String,
    /// Alert | General
    pub slack_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditSlackConfigCommand {
    pub id: i32,
    pub name: String,
    pub url: String,
    pub channel: String,
    pub slack_type: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlackConfigRow {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub slack_type: String,
    #[serde(default)]
    pub organization_id: Option<i32>,
    #[serde(default)]
    pub organization_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IdsCommand {
    ids: Vec<i32>,
}

pub struct SlackApi<'a> {
    client: &'a Client,
}

impl<'a> SlackApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /api/v1/slack/create
    pub async fn create(&self, command: &CreateSlackConfigCommand) -> Result<IdResponse, ApiError> {
        self.client.post("/api/v1/slack/create", command).await
    }

    /// POST /api/v1/slack/edit
    pub async fn edit(&self, command: &EditSlackConfigCommand) -> Result<(), ApiError> {
        self.client.post("/api/v1/slack/edit", command).await
    }

    /// GET /api/v1/slack/list
    pub async fn list(
        &self,
        params: &QueryParams,
    ) -> Result<ApiListResponse<SlackConfigRow>, ApiError> {
        let path = format!("/api/v1/slack/list{}", params.to_query_string());
        self.client.get(&path).await
    }

    pub async fn by_id(&self, id: i32) -> Result<Option<SlackConfigRow>, ApiError> {
        let params = QueryParams::new().add("id", id);
        let response = self.list(&params).await?;
        Ok(response.data.into_iter().find(|row| row.id == id))
    }

    /// POST /api/v1/slack/delete
    pub async fn delete(&self, id: i32) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/slack/delete", &IdsCommand { ids: vec![id] })
            .await
    }
}
