//! Billing credentials, billing rules and showback rules. Showback rules
//! are structurally similar to billing rules but live on the separate
//! showback backend.

use serde::{Deserialize, Serialize};

use super::client::Client;
use super::common::{ApiListResponse, IdResponse, LockManagerCommand, LockMode, QueryParams};
use super::error::ApiError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillingCredentialCommand {
    pub name: String,
    pub prometheus_username: String,
    pub prometheus_password: String,
    pub prometheus_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingCredentialRow {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub prometheus_username: String,
    #[serde(default)]
    pub prometheus_url: String,
    #[serde(default)]
    pub organization_id: Option<i32>,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuleLabel {
    #[serde(default)]
    pub id: Option<i32>,
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBillingRuleCommand {
    pub name: String,
    pub metric_name: String,
    pub price: f64,
    /// Count | Sum
    pub rule_type: String,
    pub operation_credential_id: i32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<RuleLabel>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditBillingRuleCommand {
    pub id: i32,
    pub name: String,
    pub metric_name: String,
    pub price: f64,
    pub rule_type: String,
    pub operation_credential_id: i32,
    pub labels: Vec<RuleLabel>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillingRuleRow {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub metric_name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub rule_type: String,
    #[serde(default)]
    pub operation_credential_id: i32,
    #[serde(default)]
    pub labels: Vec<RuleLabel>,
    #[serde(default)]
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShowbackRuleCommand {
    pub name: String,
    pub metric_name: String,
    pub price: f64,
    /// Count | Sum
    pub kind: String,
    /// General | External
    pub rule_type: String,
    pub global_alert_limit: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_alert_limit: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub showback_credential_id: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub organization_id: Option<i32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<RuleLabel>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EditShowbackRuleCommand {
    pub id: i32,
    pub name: String,
    pub metric_name: String,
    pub price: f64,
    pub kind: String,
    pub rule_type: String,
    pub global_alert_limit: i32,
    pub project_alert_limit: Option<i32>,
    pub showback_credential_id: Option<i32>,
    pub labels: Vec<RuleLabel>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowbackRuleRow {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub metric_name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub rule_type: String,
    #[serde(default)]
    pub global_alert_limit: i32,
    #[serde(default)]
    pub project_alert_limit: Option<i32>,
    #[serde(default)]
    pub showback_credential_id: Option<i32>,
    #[serde(default)]
    pub organization_id: Option<i32>,
    #[serde(default)]
    pub labels: Vec<RuleLabel>,
    #[serde(default)]
    pub created_by: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IdCommand {
    id: i32,
}

pub struct BillingApi<'a> {
    client: &'a Client,
}

impl<'a> BillingApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    // Billing credentials (operation credentials)

    /// POST /api/v1/operationcredentials/create
    pub async fn create_credential(
        &self,
        command: &CreateBillingCredentialCommand,
    ) -> Result<IdResponse, ApiError> {
        self.client
            .post("/api/v1/operationcredentials/create", command)
            .await
    }

    /// GET /api/v1/operationcredentials/list
    pub async fn list_credentials(
        &self,
        params: &QueryParams,
    ) -> Result<ApiListResponse<BillingCredentialRow>, ApiError> {
        let path = format!(
            "/api/v1/operationcredentials/list{}",
            params.to_query_string()
        );
        self.client.get(&path).await
    }

    pub async fn credential_by_id(&self, id: i32) -> Result<Option<BillingCredentialRow>, ApiError> {
        let params = QueryParams::new().add("id", id);
        let response = self.list_credentials(&params).await?;
        Ok(response.data.into_iter().find(|row| row.id == id))
    }

    /// POST /api/v1/operationcredentials/delete
    pub async fn delete_credential(&self, id: i32) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/operationcredentials/delete", &IdCommand { id })
            .await
    }

    /// POST /api/v1/operationcredentials/lockmanager
    pub async fn lock_credential(&self, id: i32, mode: LockMode) -> Result<(), ApiError> {
        self.client
            .post(
                "/api/v1/operationcredentials/lockmanager",
                &LockManagerCommand::new(id, mode),
            )
            .await
    }

    // Billing rules

    /// POST /api/v1/prometheusrules/create
    pub async fn create_rule(
        &self,
        command: &CreateBillingRuleCommand,
    ) -> Result<IdResponse, ApiError> {
        self.client
            .post("/api/v1/prometheusrules/create", command)
            .await
    }

    /// POST /api/v1/prometheusrules/edit
    pub async fn edit_rule(&self, command: &EditBillingRuleCommand) -> Result<(), ApiError> {
        self.client.post("/api/v1/prometheusrules/edit", command).await
    }

    /// GET /api/v1/prometheusrules/list
    pub async fn list_rules(
        &self,
        params: &QueryParams,
    ) -> Result<ApiListResponse<BillingRuleRow>, ApiError> {
        let path = format!("/api/v1/prometheusrules/list{}", params.to_query_string());
        self.client.get(&path).await
    }

    pub async fn rule_by_id(&self, id: i32) -> Result<Option<BillingRuleRow>, ApiError> {
        let params = QueryParams::new().add("id", id);
        let response = self.list_rules(&params).await?;
        Ok(response.data.into_iter().find(|row| row.id == id))
    }

    /// POST /api/v1/prometheusrules/delete
    pub async fn delete_rule(&self, id: i32) -> Result<(), ApiError> {
        self.client
            .post("/api/v1/prometheusrules/delete", &IdCommand { id })
            .await
    }

    // Showback rules, on the showback backend

    /// POST {showback}/api/v1/showbackrules/create
    pub async fn create_showback_rule(
        &self,
        command: &CreateShowbackRuleCommand,
    ) -> Result<IdResponse, ApiError> {
        self.client
            .post_showback("/api/v1/showbackrules/create", command)
            .await
    }

    /// POST {showback}/api/v1/showbackrules/edit
    pub async fn edit_showback_rule(
        &self,
        command: &EditShowbackRuleCommand,
    ) -> Result<(), ApiError> {
        self.client
            .post_showback("/api/v1/showbackrules/edit", command)
            .await
    }

    /// GET {showback}/api/v1/showbackrules/list
    pub async fn list_showback_rules(
        &self,
        params: &QueryParams,
    ) -> Result<ApiListResponse<ShowbackRuleRow>, ApiError> {
        let path = format!("/api/v1/showbackrules/list{}", params.to_query_string());
        self.client.get_showback(&path).await
    }

    pub async fn showback_rule_by_id(&self, id: i32) -> Result<Option<ShowbackRuleRow>, ApiError> {
        let params = QueryParams::new().add("id", id);
        let response = self.list_showback_rules(&params).await?;
        Ok(response.data.into_iter().find(|row| row.id == id))
    }

    /// POST {showback}/api/v1/showbackrules/delete
    pub async fn delete_showback_rule(&self, id: i32) -> Result<(), ApiError> {
        self.client
            .post_showback("/api/v1/showbackrules/delete", &IdCommand { id })
            .await
    }
}
