//! Monitoring, backup and policy (OPA) service toggles. All three share
//! the same lifecycle: distinct enable/disable endpoints, and switching
//! providers requires disable, wait until the detail flag drops, then
//! enable.

use tfplug::context::Context;

use crate::api::ApiError;
use crate::provider_data::TaikunProviderData;
use crate::utils::{poll_until, RETRY_INTERVAL, TOGGLE_TIMEOUT};

use super::wait_ready;

async fn wait_flag_cleared(
    data: &TaikunProviderData,
    ctx: &Context,
    project_id: i32,
    service: &str,
    flag: fn(&crate::api::projects::ProjectDetails) -> bool,
) -> Result<(), ApiError> {
    let client = &data.client;
    poll_until(
        ctx,
        &format!("project {} {}", project_id, service),
        "disabled",
        TOGGLE_TIMEOUT,
        RETRY_INTERVAL,
        move || async move {
            let details = client.projects().details(project_id).await?;
            Ok(!flag(&details))
        },
    )
    .await
}

pub async fn reconcile_monitoring(
    data: &TaikunProviderData,
    ctx: &Context,
    project_id: i32,
    want: bool,
) -> Result<(), ApiError> {
    let details = data.client.projects().details(project_id).await?;
    if details.is_monitoring_enabled == want {
        return Ok(());
    }
    data.client.projects().set_monitoring(project_id, want).await?;
    wait_ready(data, ctx, project_id).await
}

pub async fn reconcile_backup(
    data: &TaikunProviderData,
    ctx: &Context,
    project_id: i32,
    want: Option<i32>,
) -> Result<(), ApiError> {
    let details = data.client.projects().details(project_id).await?;
    match (details.is_backup_enabled, want) {
        (false, None) => Ok(()),
        (false, Some(credential_id)) => {
            data.client.projects().enable_backup(project_id, credential_id).await?;
            wait_ready(data, ctx, project_id).await
        }
        (true, None) => {
            data.client.projects().disable_backup(project_id).await?;
            wait_ready(data, ctx, project_id).await
        }
        (true, Some(credential_id)) => {
            if details.s3_credential_id == Some(credential_id) {
                return Ok(());
            }
            data.client.projects().disable_backup(project_id).await?;
            wait_flag_cleared(data, ctx, project_id, "backup", |d| d.is_backup_enabled).await?;
            data.client.projects().enable_backup(project_id, credential_id).await?;
            wait_ready(data, ctx, project_id).await
        }
    }
}

pub async fn reconcile_opa(
    data: &TaikunProviderData,
    ctx: &Context,
    project_id: i32,
    want: Option<i32>,
) -> Result<(), ApiError> {
    let details = data.client.projects().details(project_id).await?;
    match (details.is_opa_enabled, want) {
        (false, None) => Ok(()),
        (false, Some(profile_id)) => {
            data.client.projects().enable_opa(project_id, profile_id).await?;
            wait_ready(data, ctx, project_id).await
        }
        (true, None) => {
            data.client.projects().disable_opa(project_id).await?;
            wait_ready(data, ctx, project_id).await
        }
        (true, Some(profile_id)) => {
            if details.opa_profile_id == Some(profile_id) {
                return Ok(());
            }
            data.client.projects().disable_opa(project_id).await?;
            wait_flag_cleared(data, ctx, project_id, "policy", |d| d.is_opa_enabled).await?;
            data.client.projects().enable_opa(project_id, profile_id).await?;
            wait_ready(data, ctx, project_id).await
        }
    }
}
