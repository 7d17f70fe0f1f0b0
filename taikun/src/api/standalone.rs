//! Standalone VM API: VMs, their disks, public IPs and in-place flavor
//! updates.

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::common::{ApiListResponse, IdResponse, KeyValuePair, QueryParams};
use super::error::ApiError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVmCommand {
    pub project_id: i32,
    pub name: String,
    pub flavor: String,
    pub image_id: String,
    /// bytes
    pub volume_size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cloud_init: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub standalone_profile_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hypervisor: Option<String>,
    pub public_ip_enabled: bool,
    pub spot_vm_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spot_vm_max_price: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<KeyValuePair>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub disks: Vec<CreateVmDiskSpec>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVmDiskSpec {
    pub name: String,
    /// bytes
    pub size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteVmsCommand {
    pub project_id: i32,
    pub vm_ids: Vec<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmRow {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub flavor: String,
    #[serde(default)]
    pub image_id: String,
    #[serde(default)]
    pub image_name: Option<String>,
    #[serde(default)]
    pub volume_size: i64,
    #[serde(default)]
    pub volume_type: Option<String>,
    #[serde(default)]
    pub cloud_init: Option<String>,
    #[serde(default)]
    pub standalone_profile_id: Option<i32>,
    #[serde(default)]
    pub availability_zone: Option<String>,
    #[serde(default)]
    pub hypervisor: Option<String>,
    #[serde(default)]
    pub public_ip_enabled: bool,
    #[serde(default)]
    pub public_ip: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub spot_vm_enabled: bool,
    #[serde(default)]
    pub spot_vm_max_price: Option<f64>,
    #[serde(default)]
    pub tags: Vec<KeyValuePair>,
    #[serde(default)]
    pub disks: Vec<VmDiskRow>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmDiskRow {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub size: i64,
    #[serde(default)]
    pub volume_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDiskCommand {
    pub standalone_vm_id: i32,
    pub name: String,
    /// bytes
    pub size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteDisksCommand {
    pub standalone_vm_id: i32,
    pub disk_ids: Vec<i32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateDiskSizeCommand {
    pub disk_id: i32,
    /// bytes
    pub size: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectIdCommand {
    project_id: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VmIdCommand {
    id: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateFlavorCommand {
    id: i32,
    flavor: String,
}

pub struct StandaloneApi<'a> {
    client: &'a Client,
}

impl<'a> StandaloneApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /api/v1/standalone/create
    pub async fn create(&self, command: &CreateVmCommand) -> Result<IdResponse, ApiError> {
        self.client.post("/api/v1/standalone/create", command).await
    }

    /// POST /api/v1/standalone/delete — batch purge.
    pub async fn delete(&self, command: &DeleteVmsCommand) -> Result<(), ApiError> {
        self.client.post("/api/v1/standalone/delete", command).await
    }

    /// GET /api/v1/standalone/list?projectId=…
    pub async fn list_for_project(&self, project_id: i32) -> Result<Vec<VmRow>, ApiError> {
        let params = QueryParams::new().add("projectId", project_id);
        let path = format!("/api/v1/standalone/list{}", params.to_query_string());
        let response: ApiListResponse<VmRow> = self.client.get(&path).await?;
        Ok(response.data)
    }

    /// POST /api/v1/standalone/commit
    pub async fn commit(&self, project_id: i32) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/standalone/commit", &ProjectIdCommand { project_id })
            .await
    }

    /// POST /api/v1/standalone/repair — reconciles staged disk changes.
    pub async fn repair(&self, project_id: i32) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/standalone/repair", &ProjectIdCommand { project_id })
            .await
    }

    /// POST /api/v1/standalone/ip/{publish|unpublish} (OpenStack only).
    pub async fn set_public_ip(&self, vm_id: i32, enable: bool) -> Result<(), ApiError> {
        let path = if enable {
            "/api/v1/standalone/ip/publish"
        } else {
            "/api/v1/standalone/ip/unpublish"
        };
        self.client.post(path, &VmIdCommand { id: vm_id }).await
    }

    /// POST /api/v1/standalone/update/flavor — in-place resize.
    pub async fn update_flavor(&self, vm_id: i32, flavor: &str) -> Result<(), ApiError> {
        self.client
            .post(
                "/api/v1/standalone/update/flavor",
                &UpdateFlavorCommand {
                    id: vm_id,
                    flavor: flavor.to_string(),
                },
            )
            .await
    }

    /// POST /api/v1/standalone/disk/create
    pub async fn create_disk(&self, command: &CreateDiskCommand) -> Result<IdResponse, ApiError> {
        self.client
            .post("/api/v1/standalone/disk/create", command)
            .await
    }

    /// POST /api/v1/standalone/disk/delete
    pub async fn delete_disks(&self, command: &DeleteDisksCommand) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/standalone/disk/delete", command)
            .await
    }

    /// POST /api/v1/standalone/disk/update/size
    pub async fn update_disk_size(&self, command: &UpdateDiskSizeCommand) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/standalone/disk/update/size", command)
            .await
    }
}
