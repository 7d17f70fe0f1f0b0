//! Standalone VM reconciliation: three-way partition into delete,
//! recreate and keep, with in-place patches (public IP on OpenStack,
//! flavor, disk sizes) applied to the kept set.

use std::collections::HashMap;

use tfplug::context::Context;

use crate::api::standalone::{
    CreateDiskCommand, CreateVmCommand, CreateVmDiskSpec, DeleteDisksCommand, DeleteVmsCommand,
    UpdateDiskSizeCommand, VmRow,
};
use crate::api::ApiError;
use crate::provider_data::TaikunProviderData;
use crate::utils::{bytes_to_gib, gib_to_bytes};

use super::model::{DiskSpec, VmSpec};
use super::wait_ready;

fn observed_spec(row: &VmRow, prior_username: Option<&str>) -> VmSpec {
    VmSpec {
        id: Some(row.id),
        name: row.name.clone(),
        flavor: row.flavor.clone(),
        image_id: row.image_id.clone(),
        volume_size_gib: bytes_to_gib(row.volume_size),
        volume_type: row.volume_type.clone(),
        cloud_init: row.cloud_init.clone().filter(|s| !s.is_empty()),
        standalone_profile_id: row.standalone_profile_id,
        // write-only on the server, substitute the previously declared
        // value so a username change is still detected
        username: prior_username.map(str::to_string),
        availability_zone: row.availability_zone.clone(),
        hypervisor: row.hypervisor.clone(),
        public_ip: row.public_ip_enabled,
        spot_vm: row.spot_vm_enabled,
        spot_vm_max_price: row.spot_vm_max_price,
        tags: row.tags.clone(),
        disks: row
            .disks
            .iter()
            .map(|disk| DiskSpec {
                id: Some(disk.id),
                name: disk.name.clone(),
                size_gib: bytes_to_gib(disk.size),
                volume_type: disk.volume_type.clone(),
            })
            .collect(),
    }
}

fn command_for(project_id: i32, spec: &VmSpec) -> CreateVmCommand {
    CreateVmCommand {
        project_id,
        name: spec.name.clone(),
        flavor: spec.flavor.clone(),
        image_id: spec.image_id.clone(),
        volume_size: gib_to_bytes(spec.volume_size_gib),
        volume_type: spec.volume_type.clone(),
        cloud_init: spec.cloud_init.clone(),
        standalone_profile_id: spec.standalone_profile_id,
        username: spec.username.clone(),
        availability_zone: spec.availability_zone.clone(),
        hypervisor: spec.hypervisor.clone(),
        public_ip_enabled: spec.public_ip,
        spot_vm_enabled: spec.spot_vm,
        spot_vm_max_price: spec.spot_vm_max_price,
        tags: spec.tags.clone(),
        disks: spec
            .disks
            .iter()
            .map(|disk| CreateVmDiskSpec {
                name: disk.name.clone(),
                size: gib_to_bytes(disk.size_gib),
                volume_type: disk.volume_type.clone(),
            })
            .collect(),
    }
}

/// Creates every declared VM, commits the standalone plane and waits.
pub async fn create_all(
    data: &TaikunProviderData,
    ctx: &Context,
    project_id: i32,
    declared: &[VmSpec],
) -> Result<(), ApiError> {
    for spec in declared {
        data.client.standalone().create(&command_for(project_id, spec)).await?;
    }
    data.client.standalone().commit(project_id).await?;
    wait_ready(data, ctx, project_id).await
}

/// Disk diff inside one kept VM. Name and volume type are force-new,
/// size grows in place. Returns whether anything was staged.
async fn reconcile_disks(
    data: &TaikunProviderData,
    vm_id: i32,
    observed: &[DiskSpec],
    declared: &[DiskSpec],
) -> Result<bool, ApiError> {
    let observed_by_name: HashMap<&str, &DiskSpec> =
        observed.iter().map(|d| (d.name.as_str(), d)).collect();
    let declared_by_name: HashMap<&str, &DiskSpec> =
        declared.iter().map(|d| (d.name.as_str(), d)).collect();

    let mut delete_ids = Vec::new();
    let mut create = Vec::new();
    let mut resize = Vec::new();

    for old in observed {
        match declared_by_name.get(old.name.as_str()) {
            None => delete_ids.extend(old.id),
            Some(new) if new.volume_type != old.volume_type => {
                delete_ids.extend(old.id);
                create.push(*new);
            }
            Some(new) if new.size_gib != old.size_gib => resize.push((old.id, new.size_gib)),
            Some(_) => {}
        }
    }
    for new in declared {
        if !observed_by_name.contains_key(new.name.as_str()) {
            create.push(new);
        }
    }

    let changed = !delete_ids.is_empty() || !create.is_empty() || !resize.is_empty();

    if !delete_ids.is_empty() {
        data.client
            .standalone()
            .delete_disks(&DeleteDisksCommand {
                standalone_vm_id: vm_id,
                disk_ids: delete_ids,
            })
            .await?;
    }
    for disk in create {
        data.client
            .standalone()
            .create_disk(&CreateDiskCommand {
                standalone_vm_id: vm_id,
                name: disk.name.clone(),
                size: gib_to_bytes(disk.size_gib),
                volume_type: disk.volume_type.clone(),
            })
            .await?;
    }
    for (disk_id, size_gib) in resize {
        if let Some(disk_id) = disk_id {
            data.client
                .standalone()
                .update_disk_size(&UpdateDiskSizeCommand {
                    disk_id,
                    size: gib_to_bytes(size_gib),
                })
                .await?;
        }
    }
    Ok(changed)
}

pub async fn reconcile(
    data: &TaikunProviderData,
    ctx: &Context,
    project_id: i32,
    cloud_type: &str,
    prior: &[VmSpec],
    planned: &[VmSpec],
) -> Result<(), ApiError> {
    let openstack = cloud_type.eq_ignore_ascii_case("openstack");
    let observed = data.client.standalone().list_for_project(project_id).await?;

    let prior_by_id: HashMap<i32, &VmSpec> =
        prior.iter().filter_map(|s| s.id.map(|id| (id, s))).collect();
    let planned_by_id: HashMap<i32, &VmSpec> =
        planned.iter().filter_map(|s| s.id.map(|id| (id, s))).collect();

    let mut to_delete = Vec::new();
    let mut to_add: Vec<&VmSpec> = planned.iter().filter(|s| s.id.is_none()).collect();
    let mut to_keep: Vec<(&VmRow, &VmSpec)> = Vec::new();

    for row in &observed {
        let current = observed_spec(
            row,
            prior_by_id
                .get(&row.id)
                .and_then(|s| s.username.as_deref()),
        );
        match planned_by_id.get(&row.id) {
            None => to_delete.push(row.id),
            Some(spec) if spec.force_new_key(openstack) != current.force_new_key(openstack) => {
                to_delete.push(row.id);
                to_add.push(spec);
            }
            Some(spec) => to_keep.push((row, spec)),
        }
    }

    if !to_delete.is_empty() {
        data.client
            .standalone()
            .delete(&DeleteVmsCommand {
                project_id,
                vm_ids: to_delete,
            })
            .await?;
        wait_ready(data, ctx, project_id).await?;
    }

    if !to_add.is_empty() {
        for spec in &to_add {
            data.client.standalone().create(&command_for(project_id, spec)).await?;
        }
        data.client.standalone().commit(project_id).await?;
        wait_ready(data, ctx, project_id).await?;
    }

    // flavor and disk patches are staged server side and only take
    // effect after one repair pass
    let mut needs_repair = false;
    for (row, spec) in to_keep {
        if openstack && spec.public_ip != row.public_ip_enabled {
            data.client.standalone().set_public_ip(row.id, spec.public_ip).await?;
        }
        if spec.flavor != row.flavor {
            data.client.standalone().update_flavor(row.id, &spec.flavor).await?;
            needs_repair = true;
        }
        let current_disks: Vec<DiskSpec> = row
            .disks
            .iter()
            .map(|disk| DiskSpec {
                id: Some(disk.id),
                name: disk.name.clone(),
                size_gib: bytes_to_gib(disk.size),
                volume_type: disk.volume_type.clone(),
            })
            .collect();
        needs_repair |= reconcile_disks(data, row.id, &current_disks, &spec.disks).await?;
    }
    if needs_repair {
        data.client.standalone().repair(project_id).await?;
        wait_ready(data, ctx, project_id).await?;
    }
    Ok(())
}

/// Deletes every VM of the project, used on teardown.
pub async fn purge_all(
    data: &TaikunProviderData,
    ctx: &Context,
    project_id: i32,
) -> Result<(), ApiError> {
    let vm_ids: Vec<i32> = data
        .client
        .standalone()
        .list_for_project(project_id)
        .await?
        .into_iter()
        .map(|row| row.id)
        .collect();
    if vm_ids.is_empty() {
        return Ok(());
    }
    data.client
        .standalone()
        .delete(&DeleteVmsCommand { project_id, vm_ids })
        .await?;
    super::wait_ready_or_gone(data, ctx, project_id).await
}
