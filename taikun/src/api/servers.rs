//! Kubernetes server API: bastion, masters and workers of a project.

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::common::{ApiListResponse, IdResponse, KeyValuePair, QueryParams};
use super::error::ApiError;

/// Label the server-side autoscaler stamps on the workers it manages.
pub const AUTOSCALING_GROUP_LABEL: &str = "taikun.cloud/autoscaling-group";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerRole {
    Bastion,
    Kubemaster,
    Kubeworker,
}

impl ServerRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServerRole::Bastion => "Bastion",
            ServerRole::Kubemaster => "Kubemaster",
            ServerRole::Kubeworker => "Kubeworker",
        }
    }

    pub fn parse(role: &str) -> Option<Self> {
        match role {
            "Bastion" => Some(ServerRole::Bastion),
            "Kubemaster" => Some(ServerRole::Kubemaster),
            "Kubeworker" => Some(ServerRole::Kubeworker),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServerCommand {
    pub project_id: i32,
    pub name: String,
    pub role: String,
    pub flavor: String,
    /// bytes
    pub disk_size: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub kubernetes_node_labels: Vec<KeyValuePair>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hypervisor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spot_instance: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spot_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxmox_extra_disk_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxmox_storage: Option<String>,
}

/// Batch purge of servers. `force_delete_v_clusters` and
/// `delete_autoscaling_servers` are only set on full project teardown.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteServersCommand {
    pub project_id: i32,
    pub server_ids: Vec<i32>,
    pub force_delete_v_clusters: bool,
    pub delete_autoscaling_servers: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerRow {
    pub id: i32,
    pub name: String,
    pub role: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub disk_size: i64,
    #[serde(default)]
    pub kubernetes_node_labels: Vec<KeyValuePair>,
    #[serde(default)]
    pub availability_zone: Option<String>,
    #[serde(default)]
    pub hypervisor: Option<String>,
    #[serde(default)]
    pub spot_instance: Option<bool>,
    #[serde(default)]
    pub spot_price: Option<f64>,
    #[serde(default)]
    pub aws_instance_type: Option<String>,
    #[serde(default)]
    pub azure_vm_size: Option<String>,
    #[serde(default)]
    pub openstack_flavor: Option<String>,
    #[serde(default)]
    pub google_machine_type: Option<String>,
    #[serde(default)]
    pub proxmox_flavor: Option<String>,
    #[serde(default)]
    pub vsphere_flavor: Option<String>,
}

impl ServerRow {
    /// The flavor lives in a cloud-type-specific column.
    pub fn flavor_for_cloud(&self, cloud_type: &str) -> Option<&str> {
        let value = match cloud_type.to_ascii_lowercase().as_str() {
            "aws" => &self.aws_instance_type,
            "azure" => &self.azure_vm_size,
            "openstack" => &self.openstack_flavor,
            "google" | "gcp" => &self.google_machine_type,
            "proxmox" => &self.proxmox_flavor,
            "vsphere" => &self.vsphere_flavor,
            _ => return None,
        };
        value.as_deref()
    }

    /// Workers created by the autoscaler carry a distinguishing label and
    /// must stay out of the declarative view.
    pub fn is_autoscaled(&self) -> bool {
        self.kubernetes_node_labels
            .iter()
            .any(|label| label.key == AUTOSCALING_GROUP_LABEL)
    }
}

pub struct ServersApi<'a> {
    client: &'a Client,
}

impl<'a> ServersApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /api/v1/servers/create
    pub async fn create(&self, command: &CreateServerCommand) -> Result<IdResponse, ApiError> {
        self.client.post("/api/v1/servers/create", command).await
    }

    /// POST /api/v1/servers/delete
    pub async fn delete(&self, command: &DeleteServersCommand) -> Result<(), ApiError> {
        self.client.post("/api/v1/servers/delete", command).await
    }

    /// GET /api/v1/servers/list?projectId=…
    pub async fn list_for_project(&self, project_id: i32) -> Result<Vec<ServerRow>, ApiError> {
        let params = QueryParams::new().add("projectId", project_id);
        let path = format!("/api/v1/servers/list{}", params.to_query_string());
        let response: ApiListResponse<ServerRow> = self.client.get(&path).await?;
        Ok(response.data)
    }

    /// Servers belonging to one autoscaling group, by group name.
    pub async fn list_autoscaling_group(
        &self,
        project_id: i32,
        group_name: &str,
    ) -> Result<Vec<ServerRow>, ApiError> {
        let params = QueryParams::new()
            .add("projectId", project_id)
            .add("autoscalingGroup", group_name);
        let path = format!("/api/v1/servers/list{}", params.to_query_string());
        let response: ApiListResponse<ServerRow> = self.client.get(&path).await?;
        Ok(response.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flavor_column_follows_cloud_type() {
        let row = ServerRow {
            id: 1,
            name: "w0".to_string(),
            role: "Kubeworker".to_string(),
            status: "Ready".to_string(),
            disk_size: 0,
            kubernetes_node_labels: vec![],
            availability_zone: None,
            hypervisor: None,
            spot_instance: None,
            spot_price: None,
            aws_instance_type: Some("t3.large".to_string()),
            azure_vm_size: None,
            openstack_flavor: Some("m1.medium".to_string()),
            google_machine_type: None,
            proxmox_flavor: None,
            vsphere_flavor: None,
        };
        assert_eq!(row.flavor_for_cloud("AWS"), Some("t3.large"));
        assert_eq!(row.flavor_for_cloud("openstack"), Some("m1.medium"));
        assert_eq!(row.flavor_for_cloud("azure"), None);
    }

    #[test]
    fn autoscaled_workers_are_detected_by_label() {
        let mut row = ServerRow {
            id: 2,
            name: "as-1".to_string(),
            role: "Kubeworker".to_string(),
            status: "Ready".to_string(),
            disk_size: 0,
            kubernetes_node_labels: vec![KeyValuePair {
                key: "team".to_string(),
                value: "infra".to_string(),
            }],
            availability_zone: None,
            hypervisor: None,
            spot_instance: None,
            spot_price: None,
            aws_instance_type: None,
            azure_vm_size: None,
            openstack_flavor: None,
            google_machine_type: None,
            proxmox_flavor: None,
            vsphere_flavor: None,
        };
        assert!(!row.is_autoscaled());

        row.kubernetes_node_labels.push(KeyValuePair {
            key: AUTOSCALING_GROUP_LABEL.to_string(),
            value: "asg-a".to_string(),
        });
        assert!(row.is_autoscaled());
    }
}
