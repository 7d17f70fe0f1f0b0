//! Backup (S3) credential API.

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::common::{ApiListResponse, IdResponse, LockManagerCommand, LockMode, QueryParams};
use super::error::ApiError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBackupCredentialCommand {
    pub s3_name: String,
    pub s3_access_key_id: String,
    pub s3_secret_key: String,
    pub s3_endpoint: String,
    pub s3_region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditBackupCredentialCommand {
    pub id: i32,
    pub s3_name: String,
    pub s3_access_key_id: String,
    pub s3_secret_key: String,
    pub s3_endpoint: String,
    pub s3_region: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupCredentialRow {
    pub id: i32,
    pub s3_name: String,
    #[serde(default)]
    pub s3_access_key_id: String,
    #[serde(default)]
    pub s3_endpoint: String,
    #[serde(default)]
    pub s3_region: String,
    #[serde(default)]
    pub organization_id: Option<i32>,
    #[serde(default)]
    pub organization_name: Option<String>,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub created_by: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IdCommand {
    id: i32,
}

pub struct BackupApi<'a> {
    client: &'a Client,
}

impl<'a> BackupApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /api/v1/s3credentials/create
    pub async fn create_credential(
        &self,
        command: &CreateBackupCredentialCommand,
    ) -> Result<IdResponse, ApiError> {
        self.client.post("/api/v1/s3credentials/create", command).await
    }

    /// POST /api/v1/s3credentials/edit
    pub async fn edit_credential(
        &self,
        command: &EditBackupCredentialCommand,
    ) -> Result<(), ApiError> {
        self.client.post("/api/v1/s3credentials/edit", command).await
    }

    /// GET /api/v1/s3credentials/list
    pub async fn list_credentials(
        &self,
        params: &QueryParams,
    ) -> Result<ApiListResponse<BackupCredentialRow>, ApiError> {
        let path = format!("/api/v1/s3credentials/list{}", params.to_query_string());
        self.client.get(&path).await
    }

    pub async fn credential_by_id(&self, id: i32) -> Result<Option<BackupCredentialRow>, ApiError> {
        let params = QueryParams::new().add("id", id);
        let response = self.list_credentials(&params).await?;
        Ok(response.data.into_iter().find(|row| row.id == id))
    }

    /// POST /api/v1/s3credentials/delete
    pub async fn delete_credential(&self, id: i32) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/s3credentials/delete", &IdCommand { id })
            .await
    }

    /// POST /api/v1/s3credentials/lockmanager
    pub async fn lock_credential(&self, id: i32, mode: LockMode) -> Result<(), ApiError> {
        self.client
            .post(
                "/api/v1/s3credentials/lockmanager",
                &LockManagerCommand::new(id, mode),
            )
            .await
    }
}
