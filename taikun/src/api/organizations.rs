//! Organization API.

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::common::{ApiListResponse, IdResponse, QueryParams};
use super::error::ApiError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganizationCommand {
    pub name: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vat_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    pub is_eligible_update_subscription: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditOrganizationCommand {
    pub id: i32,
    pub name: String,
    pub full_name: String,
    pub discount_rate: Option<f64>,
    pub vat_number: Option<String>,
    pub email: Option<String>,
    pub billing_email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub is_eligible_update_subscription: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationRow {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub discount_rate: Option<f64>,
    #[serde(default)]
    pub vat_number: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub billing_email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub is_eligible_update_subscription: bool,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub is_read_only: bool,
    #[serde(default)]
    pub partner_id: Option<i32>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OrganizationIdCommand {
    organization_id: i32,
}

pub struct OrganizationsApi<'a> {
    client: &'a Client,
}

impl<'a> OrganizationsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /api/v1/organizations/create
    pub async fn create(
        &self,
        command: &CreateOrganizationCommand,
    ) -> Result<IdResponse, ApiError> {
        self.client.post("/api/v1/organizations/create", command).await
    }

    /// POST /api/v1/organizations/edit
    pub async fn edit(&self, command: &EditOrganizationCommand) -> Result<(), ApiError> {
        self.client.post("/api/v1/organizations/edit", command).await
    }

    /// GET /api/v1/organizations/list
    pub async fn list(
        &self,
        params: &QueryParams,
    ) -> Result<ApiListResponse<OrganizationRow>, ApiError> {
        let path = format!("/api/v1/organizations/list{}", params.to_query_string());
        self.client.get(&path).await
    }

    pub async fn by_id(&self, id: i32) -> Result<Option<OrganizationRow>, ApiError> {
        let params = QueryParams::new().add("id", id);
        let response = self.list(&params).await?;
        Ok(response.data.into_iter().find(|row| row.id == id))
    }

    /// GET /api/v1/organizations/default — the logged-in user's own
    /// organization.
    pub async fn default_organization(&self) -> Result<OrganizationRow, ApiError> {
        self.client.get("/api/v1/organizations/default").await
    }

    /// POST /api/v1/organizations/delete
    pub async fn delete(&self, id: i32) -> Result<(), ApiError> {
        self.client
            .post(
                "/api/v1/organizations/delete",
                &OrganizationIdCommand { organization_id: id },
            )
            .await
    }
}
