//! Kubernetes server reconciliation. Bastion and masters force project
//! recreation on change; only the worker set is diffed, and every
//! worker field is force-new, so the diff is delete-then-create by
//! identity.

use std::collections::HashSet;

use tfplug::context::Context;

use crate::api::servers::{CreateServerCommand, DeleteServersCommand, ServerRole, ServerRow};
use crate::api::ApiError;
use crate::provider_data::TaikunProviderData;
use crate::utils::{bytes_to_gib, gib_to_bytes};

use super::model::ServerSpec;
use super::{wait_ready, wait_ready_or_gone};

/// Storage type for a worker's extra Proxmox disk, derived from the
/// project's Kubernetes profile.
pub async fn proxmox_disk_storage(
    data: &TaikunProviderData,
    kubernetes_profile_id: Option<i32>,
) -> Result<String, ApiError> {
    let profile_id = kubernetes_profile_id.ok_or_else(|| {
        ApiError::Validation(
            "proxmox_extra_disk_size requires a kubernetes_profile_id".to_string(),
        )
    })?;
    let profile = data
        .client
        .kubernetes_profiles()
        .by_id(profile_id)
        .await?
        .ok_or_else(|| {
            ApiError::Validation(format!("kubernetes profile {} not found", profile_id))
        })?;
    match profile.proxmox_storage.as_deref() {
        Some("NFS") => Ok("NFS".to_string()),
        Some("OpenEBS") => Ok("STORAGE".to_string()),
        other => Err(ApiError::Validation(format!(
            "extra Proxmox disks need a kubernetes profile with NFS or OpenEBS storage, got {:?}",
            other.unwrap_or("")
        ))),
    }
}

fn command_for(
    project_id: i32,
    spec: &ServerSpec,
    role: ServerRole,
    proxmox_storage: Option<&str>,
) -> CreateServerCommand {
    CreateServerCommand {
        project_id,
        name: spec.name.clone(),
        role: role.as_str().to_string(),
        flavor: spec.flavor.clone(),
        disk_size: gib_to_bytes(spec.disk_size_gib),
        kubernetes_node_labels: spec.labels.clone(),
        availability_zone: spec.availability_zone.clone(),
        hypervisor: spec.hypervisor.clone(),
        spot_instance: spec.spot_instance,
        spot_price: spec.spot_price,
        proxmox_extra_disk_size: spec.proxmox_extra_disk_size_gib.map(gib_to_bytes),
        proxmox_storage: spec
            .proxmox_extra_disk_size_gib
            .and(proxmox_storage.map(str::to_string)),
    }
}

/// Creates every declared server, bastion first, then masters, then
/// workers, followed by one commit and a wait for Ready.
pub async fn create_all(
    data: &TaikunProviderData,
    ctx: &Context,
    project_id: i32,
    bastions: &[ServerSpec],
    masters: &[ServerSpec],
    workers: &[ServerSpec],
    proxmox_storage: Option<&str>,
) -> Result<(), ApiError> {
    for spec in bastions {
        data.client
            .servers()
            .create(&command_for(project_id, spec, ServerRole::Bastion, proxmox_storage))
            .await?;
    }
    for spec in masters {
        data.client
            .servers()
            .create(&command_for(project_id, spec, ServerRole::Kubemaster, proxmox_storage))
            .await?;
    }
    for spec in workers {
        data.client
            .servers()
            .create(&command_for(project_id, spec, ServerRole::Kubeworker, proxmox_storage))
            .await?;
    }
    data.client.projects().commit(project_id).await?;
    wait_ready(data, ctx, project_id).await
}

fn observed_identity(row: &ServerRow, cloud_type: &str) -> super::model::ServerIdentity {
    ServerSpec {
        id: Some(row.id),
        name: row.name.clone(),
        flavor: row
            .flavor_for_cloud(cloud_type)
            .unwrap_or_default()
            .to_string(),
        disk_size_gib: bytes_to_gib(row.disk_size),
        labels: row.kubernetes_node_labels.clone(),
        availability_zone: row.availability_zone.clone(),
        hypervisor: row.hypervisor.clone(),
        spot_instance: row.spot_instance,
        spot_price: row.spot_price,
        proxmox_extra_disk_size_gib: None,
    }
    .identity()
}

/// Worker set-diff: removed workers go in one delete call, added ones
/// are created individually, then commit and wait.
pub async fn reconcile_workers(
    data: &TaikunProviderData,
    ctx: &Context,
    project_id: i32,
    cloud_type: &str,
    declared: &[ServerSpec],
    proxmox_storage: Option<&str>,
) -> Result<(), ApiError> {
    let observed: Vec<ServerRow> = data
        .client
        .servers()
        .list_for_project(project_id)
        .await?
        .into_iter()
        .filter(|row| ServerRole::parse(&row.role) == Some(ServerRole::Kubeworker))
        .filter(|row| !row.is_autoscaled())
        .collect();

    let declared_identities: HashSet<_> = declared.iter().map(|s| s.identity()).collect();
    let observed_identities: HashSet<_> = observed
        .iter()
        .map(|row| observed_identity(row, cloud_type))
        .collect();

    let removed_ids: Vec<i32> = observed
        .iter()
        .filter(|row| !declared_identities.contains(&observed_identity(row, cloud_type)))
        .map(|row| row.id)
        .collect();
    let added: Vec<&ServerSpec> = declared
        .iter()
        .filter(|spec| !observed_identities.contains(&spec.identity()))
        .collect();

    if removed_ids.is_empty() && added.is_empty() {
        return Ok(());
    }

    if !removed_ids.is_empty() {
        data.client
            .servers()
            .delete(&DeleteServersCommand {
                project_id,
                server_ids: removed_ids,
                force_delete_v_clusters: false,
                delete_autoscaling_servers: false,
            })
            .await?;
    }
    for spec in added {
        data.client
            .servers()
            .create(&command_for(project_id, spec, ServerRole::Kubeworker, proxmox_storage))
            .await?;
    }
    data.client.projects().commit(project_id).await?;
    wait_ready(data, ctx, project_id).await
}

/// Full teardown of the Kubernetes plane, autoscaled workers included.
pub async fn purge_all(
    data: &TaikunProviderData,
    ctx: &Context,
    project_id: i32,
    autoscaling_group: Option<&str>,
) -> Result<(), ApiError> {
    let mut ids: Vec<i32> = data
        .client
        .servers()
        .list_for_project(project_id)
        .await?
        .into_iter()
        .map(|row| row.id)
        .collect();

    // the list endpoint hides autoscaled workers mid-scale; sweep the
    // group by name as well
    if let Some(group) = autoscaling_group {
        let group_ids = data
            .client
            .servers()
            .list_autoscaling_group(project_id, group)
            .await?
            .into_iter()
            .map(|row| row.id);
        for id in group_ids {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
    }

    if ids.is_empty() {
        return Ok(());
    }
    data.client
        .servers()
        .delete(&DeleteServersCommand {
            project_id,
            server_ids: ids,
            force_delete_v_clusters: true,
            delete_autoscaling_servers: true,
        })
        .await?;
    wait_ready_or_gone(data, ctx, project_id).await
}
