//! Project API: lifecycle, quotas, service toggles, spot flags and the
//! autoscaling group.

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::common::{ApiListResponse, IdResponse, LockManagerCommand, LockMode, QueryParams};
use super::error::ApiError;

/// States the autoscaler waiters look for.
pub const PROJECT_READY: &str = "Ready";

#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectCommand {
    pub name: String,
    pub cloud_credential_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_profile_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerting_profile_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubernetes_profile_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opa_profile_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3_credential_id: Option<i32>,
    pub flavors: Vec<String>,
    /// `None` serializes as an explicit null: no expiration.
    pub expired_at: Option<String>,
    pub delete_on_expiration: bool,
    pub is_monitoring_enabled: bool,
    pub is_autoscaling_enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autoscaling_group_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autoscaling_flavor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autoscaling_disk_size: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autoscaling_min_size: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autoscaling_max_size: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub autoscaling_spot_enabled: Option<bool>,
    pub is_spot_full: bool,
    pub is_spot_worker: bool,
    pub is_spot_vms: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_spot_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub router_id_start_range: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub router_id_end_range: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taikun_lb_flavor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kubernetes_version: Option<String>,
}

/// Row from the project list endpoint. Carries the fields the detail
/// endpoint does not, notably `delete_on_expiration`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListRow {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub organization_id: Option<i32>,
    #[serde(default)]
    pub delete_on_expiration: bool,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetails {
    pub id: i32,
    pub name: String,
    pub cloud_credential_id: i32,
    #[serde(default)]
    pub cloud_type: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub is_monitoring_enabled: bool,
    #[serde(default)]
    pub is_backup_enabled: bool,
    #[serde(default)]
    pub is_opa_enabled: bool,
    #[serde(default)]
    pub is_autoscaling_enabled: bool,
    #[serde(default)]
    pub autoscaling_group_name: Option<String>,
    #[serde(default)]
    pub autoscaling_flavor: Option<String>,
    #[serde(default)]
    pub autoscaling_disk_size: Option<i64>,
    #[serde(default)]
    pub autoscaling_min_size: Option<i32>,
    #[serde(default)]
    pub autoscaling_max_size: Option<i32>,
    #[serde(default)]
    pub autoscaling_spot_enabled: Option<bool>,
    #[serde(default)]
    pub expired_at: Option<String>,
    #[serde(default)]
    pub organization_id: Option<i32>,
    #[serde(default)]
    pub access_profile_id: Option<i32>,
    #[serde(default)]
    pub alerting_profile_id: Option<i32>,
    #[serde(default)]
    pub kubernetes_profile_id: Option<i32>,
    #[serde(default)]
    pub opa_profile_id: Option<i32>,
    #[serde(default)]
    pub s3_credential_id: Option<i32>,
    #[serde(default)]
    pub quota_id: Option<i32>,
    #[serde(default)]
    pub is_spot_full: bool,
    #[serde(default)]
    pub is_spot_worker: bool,
    #[serde(default)]
    pub is_spot_vms: bool,
    #[serde(default)]
    pub max_spot_price: Option<f64>,
    #[serde(default)]
    pub router_id_start_range: Option<i32>,
    #[serde(default)]
    pub router_id_end_range: Option<i32>,
    #[serde(default)]
    pub taikun_lb_flavor: Option<String>,
    #[serde(default)]
    pub kubernetes_version: Option<String>,
}

/// Quota row. RAM and disk sizes travel as bytes; VM volume travels as
/// GiB (the server is inconsistent here and the surface hides it).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectQuota {
    pub id: i32,
    pub cpu: i64,
    pub ram_size: i64,
    pub disk_size: i64,
    pub vm_cpu: i64,
    pub vm_ram: i64,
    pub vm_volume_size: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateQuotaCommand {
    pub quota_id: i32,
    pub cpu: i64,
    pub ram_size: i64,
    pub disk_size: i64,
    pub vm_cpu: i64,
    pub vm_ram: i64,
    pub vm_volume_size: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendLifetimeCommand {
    pub project_id: i32,
    /// null means "no expiration".
    pub expire_at: Option<String>,
    pub delete_on_expiration: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnableAutoscalerCommand {
    pub project_id: i32,
    pub autoscaling_group_name: String,
    pub flavor: String,
    pub disk_size: i64,
    pub min_size: i32,
    pub max_size: i32,
    pub spot_enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditAutoscalerCommand {
    pub project_id: i32,
    pub min_size: i32,
    pub max_size: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectIdCommand {
    project_id: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnableBackupCommand {
    project_id: i32,
    s3_credential_id: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EnableOpaCommand {
    project_id: i32,
    opa_profile_id: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ToggleSpotCommand {
    project_id: i32,
    mode: &'static str,
    enabled: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AttachAlertingProfileCommand {
    project_id: i32,
    alerting_profile_id: i32,
}

pub struct ProjectsApi<'a> {
    client: &'a Client,
}

impl<'a> ProjectsApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /api/v1/projects/create
    pub async fn create(&self, command: &CreateProjectCommand) -> Result<IdResponse, ApiError> {
        self.client.post("/api/v1/projects/create", command).await
    }

    /// GET /api/v1/projects/list
    pub async fn list(
        &self,
        params: &QueryParams,
    ) -> Result<ApiListResponse<ProjectListRow>, ApiError> {
        let path = format!("/api/v1/projects/list{}", params.to_query_string());
        self.client.get(&path).await
    }

    /// List filtered to a single project id; `None` when the row is gone.
    pub async fn by_id(&self, project_id: i32) -> Result<Option<ProjectListRow>, ApiError> {
        let params = QueryParams::new().add("projectId", project_id);
        let response = self.list(&params).await?;
        Ok(response.data.into_iter().find(|row| row.id == project_id))
    }

    /// GET /api/v1/projects/details/{projectId}
    pub async fn details(&self, project_id: i32) -> Result<ProjectDetails, ApiError> {
        let path = format!("/api/v1/projects/details/{}", project_id);
        self.client.get(&path).await
    }

    /// POST /api/v1/projects/delete
    pub async fn delete(&self, project_id: i32) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/projects/delete", &ProjectIdCommand { project_id })
            .await
    }

    /// POST /api/v1/projects/commit — activates staged server changes.
    pub async fn commit(&self, project_id: i32) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/projects/commit", &ProjectIdCommand { project_id })
            .await
    }

    /// POST /api/v1/projects/lockmanager
    pub async fn lock(&self, project_id: i32, mode: LockMode) -> Result<(), ApiError> {
        self.client
            .post(
                "/api/v1/projects/lockmanager",
                &LockManagerCommand::new(project_id, mode),
            )
            .await
    }

    /// POST /api/v1/projects/extend/lifetime
    pub async fn extend_lifetime(&self, command: &ExtendLifetimeCommand) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/projects/extend/lifetime", command)
            .await
    }

    /// GET /api/v1/projects/quota/{projectId}
    pub async fn quota(&self, project_id: i32) -> Result<ProjectQuota, ApiError> {
        let path = format!("/api/v1/projects/quota/{}", project_id);
        self.client.get(&path).await
    }

    /// POST /api/v1/projects/quota/update
    pub async fn update_quota(&self, command: &UpdateQuotaCommand) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/projects/quota/update", command)
            .await
    }

    /// POST /api/v1/projects/monitoring/{enable|disable}
    pub async fn set_monitoring(&self, project_id: i32, enable: bool) -> Result<(), ApiError> {
        let path = if enable {
            "/api/v1/projects/monitoring/enable"
        } else {
            "/api/v1/projects/monitoring/disable"
        };
        self.client.post(path, &ProjectIdCommand { project_id }).await
    }

    /// POST /api/v1/backup/enable
    pub async fn enable_backup(
        &self,
        project_id: i32,
        s3_credential_id: i32,
    ) -> Result<(), ApiError> {
        self.client
            .post(
                "/api/v1/backup/enable",
                &EnableBackupCommand {
                    project_id,
                    s3_credential_id,
                },
            )
            .await
    }

    /// POST /api/v1/backup/disable
    pub async fn disable_backup(&self, project_id: i32) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/backup/disable", &ProjectIdCommand { project_id })
            .await
    }

    /// POST /api/v1/opa/enable
    pub async fn enable_opa(&self, project_id: i32, opa_profile_id: i32) -> Result<(), ApiError> {
        self.client
            .post(
                "/api/v1/opa/enable",
                &EnableOpaCommand {
                    project_id,
                    opa_profile_id,
                },
            )
            .await
    }

    /// POST /api/v1/opa/disable
    pub async fn disable_opa(&self, project_id: i32) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/opa/disable", &ProjectIdCommand { project_id })
            .await
    }

    /// POST /api/v1/projects/spot — one endpoint, three modes.
    pub async fn toggle_spot(
        &self,
        project_id: i32,
        mode: SpotMode,
        enabled: bool,
    ) -> Result<(), ApiError> {
        self.client
            .post(
                "/api/v1/projects/spot",
                &ToggleSpotCommand {
                    project_id,
                    mode: mode.as_str(),
                    enabled,
                },
            )
            .await
    }

    /// POST /api/v1/projects/detach/alertingprofile
    pub async fn detach_alerting_profile(&self, project_id: i32) -> Result<(), ApiError> {
        self.client
            .post(
                "/api/v1/projects/detach/alertingprofile",
                &ProjectIdCommand { project_id },
            )
            .await
    }

    /// POST /api/v1/projects/attach/alertingprofile
    pub async fn attach_alerting_profile(
        &self,
        project_id: i32,
        alerting_profile_id: i32,
    ) -> Result<(), ApiError> {
        self.client
            .post(
                "/api/v1/projects/attach/alertingprofile",
                &AttachAlertingProfileCommand {
                    project_id,
                    alerting_profile_id,
                },
            )
            .await
    }

    /// POST /api/v1/autoscaler/enable
    pub async fn enable_autoscaler(
        &self,
        command: &EnableAutoscalerCommand,
    ) -> Result<(), ApiError> {
        self.client.post("/api/v1/autoscaler/enable", command).await
    }

    /// POST /api/v1/autoscaler/disable
    pub async fn disable_autoscaler(&self, project_id: i32) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/autoscaler/disable", &ProjectIdCommand { project_id })
            .await
    }

    /// POST /api/v1/autoscaler/edit
    pub async fn edit_autoscaler(&self, command: &EditAutoscalerCommand) -> Result<(), ApiError> {
        self.client.post("/api/v1/autoscaler/edit", command).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotMode {
    Full,
    Worker,
    Vms,
}

impl SpotMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpotMode::Full => "full",
            SpotMode::Worker => "worker",
            SpotMode::Vms => "vms",
        }
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
    async fn by_id_returns_none_when_row_absent() {
        let mut server = mockito::Server::new_async().await;
        let _list = server
            .mock("GET", "/api/v1/projects/list?projectId=42")
            .with_status(200)
            .with_body(r#"{"data":[],"totalCount":0}"#)
            .create_async()
            .await;

        let client = test_client(&server);
        let row = client.projects().by_id(42).await.unwrap();
        assert!(row.is_none());
    }

    #[tokio::test]
    async fn by_id_picks_the_matching_row() {
        let mut server = mockito::Server::new_async().await;
        let _list = server
            .mock("GET", "/api/v1/projects/list?projectId=42")
            .with_status(200)
            .with_body(
                r#"{"data":[{"id":41,"name":"other"},{"id":42,"name":"p1","status":"Ready"}],"totalCount":2}"#,
            )
            .create_async()
            .await;

        let client = test_client(&server);
        let row = client.projects().by_id(42).await.unwrap().unwrap();
        assert_eq!(row.name, "p1");
        assert_eq!(row.status, "Ready");
    }

    #[tokio::test]
    async fn create_posts_explicit_null_expiration() {
        let mut server = mockito::Server::new_async().await;
        let _create = server
            .mock("POST", "/api/v1/projects/create")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "name": "p1",
                "cloudCredentialId": 7,
                "expiredAt": null
            })))
            .with_status(200)
            .with_body(r#"{"id":99}"#)
            .create_async()
            .await;

        let client = test_client(&server);
        let command = CreateProjectCommand {
            name: "p1".to_string(),
            cloud_credential_id: 7,
            ..Default::default()
        };
        let created = client.projects().create(&command).await.unwrap();
        assert_eq!(created.id, 99);
    }

    #[tokio::test]
    async fn quota_decodes_byte_fields() {
        let mut server = mockito::Server::new_async().await;
        let _quota = server
            .mock("GET", "/api/v1/projects/quota/3")
            .with_status(200)
            .with_body(
                r#"{"id":11,"cpu":300,"ramSize":536870912000,"diskSize":2199023255552,
                    "vmCpu":300,"vmRam":536870912000,"vmVolumeSize":2000}"#,
            )
            .create_async()
            .await;

        let client = test_client(&server);
        let quota = client.projects().quota(3).await.unwrap();
        assert_eq!(quota.disk_size, 2048 * (1 << 30));
        assert_eq!(quota.vm_volume_size, 2000);
    }
}
