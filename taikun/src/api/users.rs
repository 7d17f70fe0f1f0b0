//! User API.

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::common::{ApiListResponse, QueryParams};
use super::error::ApiError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserCommand {
    pub username: String,
    pub email: String,
    /// Manager | User
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditUserCommand {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: String,
    pub display_name: Option<String>,
    pub is_approved_by_partner: bool,
}

/// User ids are opaque strings, unlike every other entity.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRow {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub organization_id: Option<i32>,
    #[serde(default)]
    pub is_approved_by_partner: bool,
    #[serde(default)]
    pub is_csm: bool,
    #[serde(default)]
    pub is_disabled: bool,
    #[serde(default)]
    pub is_owner: bool,
    #[serde(default)]
    pub email_confirmed: bool,
    #[serde(default)]
    pub email_notification_enabled: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UserIdCommand {
    id: String,
}

pub struct UsersApi<'a> {
    client: &'a Client,
}

impl<'a> UsersApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /api/v1/users/create
    pub async fn create(&self, command: &CreateUserCommand) -> Result<UserRow, ApiError> {
        self.client.post("/api/v1/users/create", command).await
    }

    /// POST /api/v1/users/edit
    pub async fn edit(&self, command: &EditUserCommand) -> Result<(), ApiError> {
        self.client.post("/api/v1/users/edit", command).await
    }

    /// GET /api/v1/users/list
    pub async fn list(
        &self,
        params: &QueryParams,
    ) -> Result<ApiListResponse<UserRow>, ApiError> {
        let path = format!("/api/v1/users/list{}", params.to_query_string());
        self.client.get(&path).await
    }

    pub async fn by_id(&self, id: &str) -> Result<Option<UserRow>, ApiError> {
        let params = QueryParams::new().add("id", id);
        let response = self.list(&params).await?;
        Ok(response.data.into_iter().find(|row| row.id == id))
    }

    /// POST /api/v1/users/delete
    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/users/delete", &UserIdCommand { id: id.to_string() })
            .await
    }

    /// GET /api/v1/users/details — the logged-in user.
    pub async fn me(&self) -> Result<UserRow, ApiError> {
        self.client.get("/api/v1/users/details").await
    }
}
