//! Cloud credential API. Each cloud has its own create endpoint and list
//! shape; deletion and locking are centralized on shared endpoints.

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::common::{ApiListResponse, IdResponse, LockManagerCommand, LockMode, QueryParams};
use super::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudType {
    Aws,
    Azure,
    Gcp,
    Openstack,
    Proxmox,
    Vsphere,
    Zadara,
}

impl CloudType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CloudType::Aws => "aws",
            CloudType::Azure => "azure",
            CloudType::Gcp => "google",
            CloudType::Openstack => "openstack",
            CloudType::Proxmox => "proxmox",
            CloudType::Vsphere => "vsphere",
            CloudType::Zadara => "zadara",
        }
    }
}

/// Common read shape across clouds. Secrets never come back from the
/// API; the resources preserve them from prior declared state.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudCredentialRow {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub cloud_type: String,
    #[serde(default)]
    pub organization_id: Option<i32>,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub created_by: Option<String>,
    /// Cloud-specific non-secret fields, kept loose: each resource picks
    /// the columns it declared.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAwsCommand {
    pub name: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub aws_region: String,
    pub az_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAzureCommand {
    pub name: String,
    pub azure_tenant_id: String,
    pub azure_client_id: String,
    pub azure_client_secret: String,
    pub azure_subscription_id: String,
    pub azure_location: String,
    pub az_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGcpCommand {
    pub name: String,
    /// contents of the service-account JSON key file
    pub config_file: String,
    pub region: String,
    pub az_count: i32,
    pub import_project: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_account_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOpenstackCommand {
    pub name: String,
    pub openstack_user: String,
    pub openstack_password: String,
    pub openstack_url: String,
    pub openstack_project: String,
    pub openstack_domain: String,
    pub openstack_public_network: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openstack_availability_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openstack_volume_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openstack_continent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openstack_import_network: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProxmoxCommand {
    pub name: String,
    pub api_host: String,
    pub client_id: String,
    pub client_secret: String,
    pub storage: String,
    pub vm_template_name: String,
    pub hypervisors: Vec<String>,
    pub public_network: String,
    pub public_netmask: i32,
    pub public_gateway: String,
    pub public_begin_allocation_range: String,
    pub public_end_allocation_range: String,
    pub private_network: String,
    pub private_netmask: i32,
    pub private_gateway: String,
    pub private_begin_allocation_range: String,
    pub private_end_allocation_range: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVsphereCommand {
    pub name: String,
    pub username: String,
    pub password: String,
    pub api_url: String,
    pub datacenter: String,
    pub resource_pool: String,
    pub data_store: String,
    pub drs_enabled: bool,
    pub hypervisors: Vec<String>,
    pub vm_template_name: String,
    pub public_network_name: String,
    pub public_netmask: i32,
    pub public_gateway: String,
    pub public_begin_allocation_range: String,
    pub public_end_allocation_range: String,
    pub private_network_name: String,
    pub private_netmask: i32,
    pub private_gateway: String,
    pub private_begin_allocation_range: String,
    pub private_end_allocation_range: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateZadaraCommand {
    pub name: String,
    pub zadara_access_key_id: String,
    pub zadara_secret_access_key: String,
    pub zadara_api_url: String,
    pub zadara_region: String,
    pub zadara_volume_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CloudIdCommand {
    cloud_id: i32,
}

pub struct CloudCredentialsApi<'a> {
    client: &'a Client,
}

impl<'a> CloudCredentialsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// GET /api/v1/cloudcredentials/list — all clouds, one shape.
    pub async fn list(
        &self,
        params: &QueryParams,
    ) -> Result<ApiListResponse<CloudCredentialRow>, ApiError> {
        let path = format!("/api/v1/cloudcredentials/list{}", params.to_query_string());
        self.client.get(&path).await
    }

    pub async fn by_id(&self, id: i32) -> Result<Option<CloudCredentialRow>, ApiError> {
        let params = QueryParams::new().add("id", id);
        let response = self.list(&params).await?;
        Ok(response.data.into_iter().find(|row| row.id == id))
    }

    /// POST /api/v1/cloudcredentials/delete — shared across clouds.
    pub async fn delete(&self, id: i32) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/cloudcredentials/delete", &CloudIdCommand { cloud_id: id })
            .await
    }

    /// POST /api/v1/cloudcredentials/lockmanager — shared across clouds.
    pub async fn lock(&self, id: i32, mode: LockMode) -> Result<(), ApiError> {
        self.client
            .post(
                "/api/v1/cloudcredentials/lockmanager",
                &LockManagerCommand::new(id, mode),
            )
            .await
    }

    /// POST /api/v1/aws/create
    pub async fn create_aws(&self, command: &CreateAwsCommand) -> Result<IdResponse, ApiError> {
        self.client.post("/api/v1/aws/create", command).await
    }

    /// POST /api/v1/azure/create
    pub async fn create_azure(&self, command: &CreateAzureCommand) -> Result<IdResponse, ApiError> {
        self.client.post("/api/v1/azure/create", command).await
    }

    /// POST /api/v1/google/create
    pub async fn create_gcp(&self, command: &CreateGcpCommand) -> Result<IdResponse, ApiError> {
        self.client.post("/api/v1/google/create", command).await
    }

    /// POST /api/v1/openstack/create
    pub async fn create_openstack(
        &self,
        command: &CreateOpenstackCommand,
    ) -> Result<IdResponse, ApiError> {
        self.client.post("/api/v1/openstack/create", command).await
    }

    /// POST /api/v1/proxmox/create
    pub async fn create_proxmox(
        &self,
        command: &CreateProxmoxCommand,
    ) -> Result<IdResponse, ApiError> {
        self.client.post("/api/v1/proxmox/create", command).await
    }

    /// POST /api/v1/vsphere/create
    pub async fn create_vsphere(
        &self,
        command: &CreateVsphereCommand,
    ) -> Result<IdResponse, ApiError> {
        self.client.post("/api/v1/vsphere/create", command).await
    }

    /// POST /api/v1/zadara/create
    pub async fn create_zadara(
        &self,
        command: &CreateZadaraCommand,
    ) -> Result<IdResponse, ApiError> {
        self.client.post("/api/v1/zadara/create", command).await
    }

    /// POST /api/v1/cloudcredentials/update — rename only; credential
    /// rotation goes through cloud-specific update endpoints.
    pub async fn rename(&self, id: i32, name: &str) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Command<'b> {
            id: i32,
            name: &'b str,
        }
        self.client
            .post("/api/v1/cloudcredentials/update", &Command { id, name })
            .await
    }
}
