//! Profile APIs: access, alerting, kubernetes, policy (OPA) and
//! standalone profiles. Access and alerting profiles own sub-collections
//! which are replaced wholesale on update because the API exposes no
//! per-element diff.

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::common::{ApiListResponse, IdResponse, LockManagerCommand, LockMode, QueryParams};
use super::error::ApiError;

// ---------------------------------------------------------------------------
// Access profiles

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccessProfileCommand {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_proxy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_hosts: Vec<AllowedHostSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dns_servers: Vec<AddressSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ntp_servers: Vec<AddressSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ssh_users: Vec<SshUserSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AllowedHostSpec {
    #[serde(default)]
    pub id: Option<i32>,
    pub description: String,
    pub address: String,
    pub mask_bits: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpec {
    #[serde(default)]
    pub id: Option<i32>,
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SshUserSpec {
    #[serde(default)]
    pub id: Option<i32>,
    pub name: String,
    pub ssh_public_key: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessProfileRow {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub http_proxy: Option<String>,
    #[serde(default)]
    pub organization_id: Option<i32>,
    #[serde(default)]
    pub organization_name: Option<String>,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub allowed_hosts: Vec<AllowedHostSpec>,
    #[serde(default)]
    pub dns_servers: Vec<AddressSpec>,
    #[serde(default)]
    pub ntp_servers: Vec<AddressSpec>,
    #[serde(default)]
    pub ssh_users: Vec<SshUserSpec>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EditProfileCommand {
    id: i32,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    http_proxy: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IdCommand {
    id: i32,
}

pub struct AccessProfilesApi<'a> {
    client: &'a Client,
}

impl<'a> AccessProfilesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /api/v1/accessprofiles/create
    pub async fn create(
        &self,
        command: &CreateAccessProfileCommand,
    ) -> Result<IdResponse, ApiError> {
        self.client
            .post("/api/v1/accessprofiles/create", command)
            .await
    }

    /// GET /api/v1/accessprofiles/list
    pub async fn list(
        &self,
        params: &QueryParams,
    ) -> Result<ApiListResponse<AccessProfileRow>, ApiError> {
        let path = format!("/api/v1/accessprofiles/list{}", params.to_query_string());
        self.client.get(&path).await
    }

    pub async fn by_id(&self, id: i32) -> Result<Option<AccessProfileRow>, ApiError> {
        let params = QueryParams::new().add("id", id);
        let response = self.list(&params).await?;
        Ok(response.data.into_iter().find(|row| row.id == id))
    }

    /// POST /api/v1/accessprofiles/edit — name and proxy only.
    pub async fn edit(
        &self,
        id: i32,
        name: &str,
        http_proxy: Option<&str>,
    ) -> Result<(), ApiError> {
        self.client
            .post(
                "/api/v1/accessprofiles/edit",
                &EditProfileCommand {
                    id,
                    name: name.to_string(),
                    http_proxy: http_proxy.map(|s| s.to_string()),
                },
            )
            .await
    }

    /// POST /api/v1/accessprofiles/delete
    pub async fn delete(&self, id: i32) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/accessprofiles/delete", &IdCommand { id })
            .await
    }

    /// POST /api/v1/accessprofiles/lockmanager
    pub async fn lock(&self, id: i32, mode: LockMode) -> Result<(), ApiError> {
        self.client
            .post(
                "/api/v1/accessprofiles/lockmanager",
                &LockManagerCommand::new(id, mode),
            )
            .await
    }

    // Sub-collection endpoints. Updates delete every old element then
    // recreate the declared set.

    pub async fn create_allowed_host(
        &self,
        profile_id: i32,
        host: &AllowedHostSpec,
    ) -> Result<IdResponse, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Command<'b> {
            access_profile_id: i32,
            description: &'b str,
            address: &'b str,
            mask_bits: i32,
        }
        self.client
            .post(
                "/api/v1/allowedhosts/create",
                &Command {
                    access_profile_id: profile_id,
                    description: &host.description,
                    address: &host.address,
                    mask_bits: host.mask_bits,
                },
            )
            .await
    }

    pub async fn delete_allowed_host(&self, host_id: i32) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/allowedhosts/delete", &IdCommand { id: host_id })
            .await
    }

    pub async fn create_dns_server(
        &self,
        profile_id: i32,
        address: &str,
    ) -> Result<IdResponse, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Command<'b> {
            access_profile_id: i32,
            address: &'b str,
        }
        self.client
            .post(
                "/api/v1/dnsservers/create",
                &Command {
                    access_profile_id: profile_id,
                    address,
                },
            )
            .await
    }

    pub async fn delete_dns_server(&self, server_id: i32) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/dnsservers/delete", &IdCommand { id: server_id })
            .await
    }

    pub async fn create_ntp_server(
        &self,
        profile_id: i32,
        address: &str,
    ) -> Result<IdResponse, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Command<'b> {
            access_profile_id: i32,
            address: &'b str,
        }
        self.client
            .post(
                "/api/v1/ntpservers/create",
                &Command {
                    access_profile_id: profile_id,
                    address,
                },
            )
            .await
    }

    pub async fn delete_ntp_server(&self, server_id: i32) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/ntpservers/delete", &IdCommand { id: server_id })
            .await
    }

    pub async fn create_ssh_user(
        &self,
        profile_id: i32,
        user: &SshUserSpec,
    ) -> Result<IdResponse, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Command<'b> {
            access_profile_id: i32,
            name: &'b str,
            ssh_public_key: &'b str,
        }
        self.client
            .post(
                "/api/v1/sshusers/create",
                &Command {
                    access_profile_id: profile_id,
                    name: &user.name,
                    ssh_public_key: &user.ssh_public_key,
                },
            )
            .await
    }

    pub async fn delete_ssh_user(&self, user_id: i32) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/sshusers/delete", &IdCommand { id: user_id })
            .await
    }
}

// ---------------------------------------------------------------------------
// Alerting profiles

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlertingProfileCommand {
    pub name: String,
    pub reminder: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slack_configuration_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub emails: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub webhooks: Vec<WebhookSpec>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub integrations: Vec<IntegrationSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookSpec {
    #[serde(default)]
    pub id: Option<i32>,
    pub url: String,
    #[serde(default)]
    pub headers: Vec<super::common::KeyValuePair>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationSpec {
    #[serde(default)]
    pub id: Option<i32>,
    /// Opsgenie | Pagerduty | Splunk | MicrosoftTeams
    pub integration_type: String,
    pub url: String,
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertingProfileRow {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub reminder: String,
    #[serde(default)]
    pub slack_configuration_id: Option<i32>,
    #[serde(default)]
    pub organization_id: Option<i32>,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub emails: Vec<String>,
    #[serde(default)]
    pub webhooks: Vec<WebhookSpec>,
    #[serde(default)]
    pub integrations: Vec<IntegrationSpec>,
}

pub struct AlertingProfilesApi<'a> {
    client: &'a Client,
}

impl<'a> AlertingProfilesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /api/v1/alertingprofiles/create
    pub async fn create(
        &self,
        command: &CreateAlertingProfileCommand,
    ) -> Result<IdResponse, ApiError> {
        self.client
            .post("/api/v1/alertingprofiles/create", command)
            .await
    }

    /// GET /api/v1/alertingprofiles/list
    pub async fn list(
        &self,
        params: &QueryParams,
    ) -> Result<ApiListResponse<AlertingProfileRow>, ApiError> {
        let path = format!("/api/v1/alertingprofiles/list{}", params.to_query_string());
        self.client.get(&path).await
    }

    pub async fn by_id(&self, id: i32) -> Result<Option<AlertingProfileRow>, ApiError> {
        let params = QueryParams::new().add("id", id);
        let response = self.list(&params).await?;
        Ok(response.data.into_iter().find(|row| row.id == id))
    }

    /// POST /api/v1/alertingprofiles/edit
    pub async fn edit(
        &self,
        id: i32,
        name: &str,
        reminder: &str,
        slack_configuration_id: Option<i32>,
    ) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Command<'b> {
            id: i32,
            name: &'b str,
            reminder: &'b str,
            slack_configuration_id: Option<i32>,
        }
        self.client
            .post(
                "/api/v1/alertingprofiles/edit",
                &Command {
                    id,
                    name,
                    reminder,
                    slack_configuration_id,
                },
            )
            .await
    }

    /// POST /api/v1/alertingprofiles/delete
    pub async fn delete(&self, id: i32) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/alertingprofiles/delete", &IdCommand { id })
            .await
    }

    /// POST /api/v1/alertingprofiles/lockmanager
    pub async fn lock(&self, id: i32, mode: LockMode) -> Result<(), ApiError> {
        self.client
            .post(
                "/api/v1/alertingprofiles/lockmanager",
                &LockManagerCommand::new(id, mode),
            )
            .await
    }

    /// PUT /api/v1/alertingprofiles/{id}/emails — full replacement.
    pub async fn set_emails(&self, id: i32, emails: &[String]) -> Result<(), ApiError> {
        let path = format!("/api/v1/alertingprofiles/{}/emails", id);
        self.client.put(&path, emails).await
    }

    pub async fn create_webhook(
        &self,
        profile_id: i32,
        webhook: &WebhookSpec,
    ) -> Result<IdResponse, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Command<'b> {
            alerting_profile_id: i32,
            url: &'b str,
            headers: &'b [super::common::KeyValuePair],
        }
        self.client
            .post(
                "/api/v1/alertingwebhooks/create",
                &Command {
                    alerting_profile_id: profile_id,
                    url: &webhook.url,
                    headers: &webhook.headers,
                },
            )
            .await
    }

    pub async fn delete_webhook(&self, webhook_id: i32) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/alertingwebhooks/delete", &IdCommand { id: webhook_id })
            .await
    }

    pub async fn create_integration(
        &self,
        profile_id: i32,
        integration: &IntegrationSpec,
    ) -> Result<IdResponse, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Command<'b> {
            alerting_profile_id: i32,
            integration_type: &'b str,
            url: &'b str,
            token: &'b str,
        }
        self.client
            .post(
                "/api/v1/alertingintegrations/create",
                &Command {
                    alerting_profile_id: profile_id,
                    integration_type: &integration.integration_type,
                    url: &integration.url,
                    token: &integration.token,
                },
            )
            .await
    }

    pub async fn delete_integration(&self, integration_id: i32) -> Result<(), ApiError> {
        self.client
            .post(
                "/api/v1/alertingintegrations/delete",
                &IdCommand { id: integration_id },
            )
            .await
    }
}

// ---------------------------------------------------------------------------
// Kubernetes profiles

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKubernetesProfileCommand {
    pub name: String,
    pub cni: String,
    pub octavia_enabled: bool,
    pub taikun_lb_enabled: bool,
    pub expose_node_port_on_bastion: bool,
    pub unique_cluster_name: bool,
    pub nvidia_gpu_operator_enabled: bool,
    pub proxmox_storage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesProfileRow {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub cni: String,
    #[serde(default)]
    pub octavia_enabled: bool,
    #[serde(default)]
    pub taikun_lb_enabled: bool,
    #[serde(default)]
    pub expose_node_port_on_bastion: bool,
    #[serde(default)]
    pub unique_cluster_name: bool,
    #[serde(default)]
    pub nvidia_gpu_operator_enabled: bool,
    #[serde(default)]
    pub proxmox_storage: Option<String>,
    #[serde(default)]
    pub organization_id: Option<i32>,
    #[serde(default)]
    pub is_locked: bool,
}

pub struct KubernetesProfilesApi<'a> {
    client: &'a Client,
}

impl<'a> KubernetesProfilesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /api/v1/kubernetesprofiles/create
    pub async fn create(
        &self,
        command: &CreateKubernetesProfileCommand,
    ) -> Result<IdResponse, ApiError> {
        self.client
            .post("/api/v1/kubernetesprofiles/create", command)
            .await
    }

    /// GET /api/v1/kubernetesprofiles/list
    pub async fn list(
        &self,
        params: &QueryParams,
    ) -> Result<ApiListResponse<KubernetesProfileRow>, ApiError> {
        let path = format!(
            "/api/v1/kubernetesprofiles/list{}",
            params.to_query_string()
        );
        self.client.get(&path).await
    }

    pub async fn by_id(&self, id: i32) -> Result<Option<KubernetesProfileRow>, ApiError> {
        let params = QueryParams::new().add("id", id);
        let response = self.list(&params).await?;
        Ok(response.data.into_iter().find(|row| row.id == id))
    }

    /// POST /api/v1/kubernetesprofiles/delete
    pub async fn delete(&self, id: i32) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/kubernetesprofiles/delete", &IdCommand { id })
            .await
    }

    /// POST /api/v1/kubernetesprofiles/lockmanager
    pub async fn lock(&self, id: i32, mode: LockMode) -> Result<(), ApiError> {
        self.client
            .post(
                "/api/v1/kubernetesprofiles/lockmanager",
                &LockManagerCommand::new(id, mode),
            )
            .await
    }
}

// ---------------------------------------------------------------------------
// Policy (OPA) profiles

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePolicyProfileCommand {
    pub name: String,
    pub forbid_node_port: bool,
    pub forbid_http_ingress: bool,
    pub require_probe: bool,
    pub unique_ingress: bool,
    pub unique_service_selector: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_repos: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub forbidden_tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ingress_whitelist: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditPolicyProfileCommand {
    pub id: i32,
    pub name: String,
    pub forbid_node_port: bool,
    pub forbid_http_ingress: bool,
    pub require_probe: bool,
    pub unique_ingress: bool,
    pub unique_service_selector: bool,
    pub allowed_repos: Vec<String>,
    pub forbidden_tags: Vec<String>,
    pub ingress_whitelist: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyProfileRow {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub forbid_node_port: bool,
    #[serde(default)]
    pub forbid_http_ingress: bool,
    #[serde(default)]
    pub require_probe: bool,
    #[serde(default)]
    pub unique_ingress: bool,
    #[serde(default)]
    pub unique_service_selector: bool,
    #[serde(default)]
    pub allowed_repos: Vec<String>,
    #[serde(default)]
    pub forbidden_tags: Vec<String>,
    #[serde(default)]
    pub ingress_whitelist: Vec<String>,
    #[serde(default)]
    pub organization_id: Option<i32>,
    #[serde(default)]
    pub is_locked: bool,
}

pub struct PolicyProfilesApi<'a> {
    client: &'a Client,
}

impl<'a> PolicyProfilesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /api/v1/opaprofiles/create
    pub async fn create(
        &self,
        command: &CreatePolicyProfileCommand,
    ) -> Result<IdResponse, ApiError> {
        self.client.post("/api/v1/opaprofiles/create", command).await
    }

    /// POST /api/v1/opaprofiles/edit
    pub async fn edit(&self, command: &EditPolicyProfileCommand) -> Result<(), ApiError> {
        self.client.post("/api/v1/opaprofiles/edit", command).await
    }

    /// GET /api/v1/opaprofiles/list
    pub async fn list(
        &self,
        params: &QueryParams,
    ) -> Result<ApiListResponse<PolicyProfileRow>, ApiError> {
        let path = format!("/api/v1/opaprofiles/list{}", params.to_query_string());
        self.client.get(&path).await
    }

    pub async fn by_id(&self, id: i32) -> Result<Option<PolicyProfileRow>, ApiError> {
        let params = QueryParams::new().add("id", id);
        let response = self.list(&params).await?;
        Ok(response.data.into_iter().find(|row| row.id == id))
    }

    /// POST /api/v1/opaprofiles/delete
    pub async fn delete(&self, id: i32) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/opaprofiles/delete", &IdCommand { id })
            .await
    }

    /// POST /api/v1/opaprofiles/lockmanager
    pub async fn lock(&self, id: i32, mode: LockMode) -> Result<(), ApiError> {
        self.client
            .post(
                "/api/v1/opaprofiles/lockmanager",
                &LockManagerCommand::new(id, mode),
            )
            .await
    }
}

// ---------------------------------------------------------------------------
// Standalone profiles

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStandaloneProfileCommand {
    pub name: String,
    pub public_key: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security_groups: Vec<SecurityGroupSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SecurityGroupSpec {
    #[serde(default)]
    pub id: Option<i32>,
    pub name: String,
    /// ICMP | TCP | UDP
    pub protocol: String,
    #[serde(default)]
    pub port_min_range: Option<i32>,
    #[serde(default)]
    pub port_max_range: Option<i32>,
    pub remote_ip_prefix: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandaloneProfileRow {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub public_key: String,
    #[serde(default)]
    pub security_groups: Vec<SecurityGroupSpec>,
    #[serde(default)]
    pub organization_id: Option<i32>,
    #[serde(default)]
    pub is_locked: bool,
}

pub struct StandaloneProfilesApi<'a> {
    client: &'a Client,
}

impl<'a> StandaloneProfilesApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// POST /api/v1/standaloneprofiles/create
    pub async fn create(
        &self,
        command: &CreateStandaloneProfileCommand,
    ) -> Result<IdResponse, ApiError> {
        self.client
            .post("/api/v1/standaloneprofiles/create", command)
            .await
    }

    /// GET /api/v1/standaloneprofiles/list
    pub async fn list(
        &self,
        params: &QueryParams,
    ) -> Result<ApiListResponse<StandaloneProfileRow>, ApiError> {
        let path = format!(
            "/api/v1/standaloneprofiles/list{}",
            params.to_query_string()
        );
        self.client.get(&path).await
    }

    pub async fn by_id(&self, id: i32) -> Result<Option<StandaloneProfileRow>, ApiError> {
        let params = QueryParams::new().add("id", id);
        let response = self.list(&params).await?;
        Ok(response.data.into_iter().find(|row| row.id == id))
    }

    /// POST /api/v1/standaloneprofiles/edit — rename only.
    pub async fn rename(&self, id: i32, name: &str) -> Result<(), ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Command<'b> {
            id: i32,
            name: &'b str,
        }
        self.client
            .post("/api/v1/standaloneprofiles/edit", &Command { id, name })
            .await
    }

    /// POST /api/v1/standaloneprofiles/delete
    pub async fn delete(&self, id: i32) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/standaloneprofiles/delete", &IdCommand { id })
            .await
    }

    /// POST /api/v1/standaloneprofiles/lockmanager
    pub async fn lock(&self, id: i32, mode: LockMode) -> Result<(), ApiError> {
        self.client
            .post(
                "/api/v1/standaloneprofiles/lockmanager",
                &LockManagerCommand::new(id, mode),
            )
            .await
    }

    pub async fn create_security_group(
        &self,
        profile_id: i32,
        group: &SecurityGroupSpec,
    ) -> Result<IdResponse, ApiError> {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct Command<'b> {
            standalone_profile_id: i32,
            name: &'b str,
            protocol: &'b str,
            port_min_range: Option<i32>,
            port_max_range: Option<i32>,
            remote_ip_prefix: &'b str,
        }
        self.client
            .post(
                "/api/v1/securitygroups/create",
                &Command {
                    standalone_profile_id: profile_id,
                    name: &group.name,
                    protocol: &group.protocol,
                    port_min_range: group.port_min_range,
                    port_max_range: group.port_max_range,
                    remote_ip_prefix: &group.remote_ip_prefix,
                },
            )
            .await
    }

    pub async fn delete_security_group(&self, group_id: i32) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/securitygroups/delete", &IdCommand { id: group_id })
            .await
    }
}
