//! Composite project read: one state map assembled from the detail,
//! server, VM, binding and quota endpoints.

use std::collections::HashMap;

use tfplug::types::{AttributePath, Dynamic, DynamicValue};

use crate::api::common::KeyValuePair;
use crate::api::projects::ProjectDetails;
use crate::api::servers::{ServerRole, ServerRow};
use crate::api::standalone::VmRow;
use crate::api::ApiError;
use crate::provider_data::TaikunProviderData;
use crate::resources::list_of_maps;
use crate::utils::{bytes_to_gib, format_expiration_date, i32toa};

/// Declared VM usernames keyed by VM id. The server never returns the
/// username, so reads re-apply what was last declared.
fn declared_usernames(declared: &DynamicValue) -> HashMap<String, String> {
    list_of_maps(declared, "vm")
        .iter()
        .filter_map(|entry| {
            let id = entry.get("id").and_then(|v| v.as_string())?;
            let username = entry.get("username").and_then(|v| v.as_string())?;
            if id.is_empty() || username.is_empty() {
                return None;
            }
            Some((id.to_string(), username.to_string()))
        })
        .collect()
}

fn pair_list(pairs: &[KeyValuePair]) -> Dynamic {
    Dynamic::List(
        pairs
            .iter()
            .map(|pair| {
                let mut map = HashMap::new();
                map.insert("key".to_string(), Dynamic::String(pair.key.clone()));
                map.insert("value".to_string(), Dynamic::String(pair.value.clone()));
                Dynamic::Map(map)
            })
            .collect(),
    )
}

fn opt_string_dynamic(value: &Option<String>) -> Dynamic {
    Dynamic::String(value.clone().unwrap_or_default())
}

fn server_entry(row: &ServerRow, cloud_type: &str) -> Dynamic {
    let mut map = HashMap::new();
    map.insert("id".to_string(), Dynamic::String(i32toa(row.id)));
    map.insert("name".to_string(), Dynamic::String(row.name.clone()));
    map.insert(
        "flavor".to_string(),
        Dynamic::String(
            row.flavor_for_cloud(cloud_type)
                .unwrap_or_default()
                .to_string(),
        ),
    );
    map.insert(
        "disk_size".to_string(),
        Dynamic::Number(bytes_to_gib(row.disk_size) as f64),
    );
    map.insert(
        "kubernetes_node_label".to_string(),
        pair_list(&row.kubernetes_node_labels),
    );
    map.insert(
        "availability_zone".to_string(),
        opt_string_dynamic(&row.availability_zone),
    );
    map.insert("hypervisor".to_string(), opt_string_dynamic(&row.hypervisor));
    map.insert(
        "spot_instance".to_string(),
        Dynamic::Bool(row.spot_instance.unwrap_or(false)),
    );
    if let Some(price) = row.spot_price {
        map.insert("spot_price".to_string(), Dynamic::Number(price));
    }
    map.insert("status".to_string(), Dynamic::String(row.status.clone()));
    Dynamic::Map(map)
}

fn vm_entry(row: &VmRow, usernames: &HashMap<String, String>) -> Dynamic {
    let mut map = HashMap::new();
    let id = i32toa(row.id);
    if let Some(username) = usernames.get(&id) {
        map.insert("username".to_string(), Dynamic::String(username.clone()));
    }
    map.insert("id".to_string(), Dynamic::String(id));
    map.insert("name".to_string(), Dynamic::String(row.name.clone()));
    map.insert("flavor".to_string(), Dynamic::String(row.flavor.clone()));
    map.insert("image_id".to_string(), Dynamic::String(row.image_id.clone()));
    map.insert(
        "volume_size".to_string(),
        Dynamic::Number(bytes_to_gib(row.volume_size) as f64),
    );
    map.insert("volume_type".to_string(), opt_string_dynamic(&row.volume_type));
    map.insert("cloud_init".to_string(), opt_string_dynamic(&row.cloud_init));
    map.insert(
        "standalone_profile_id".to_string(),
        Dynamic::String(row.standalone_profile_id.map(i32toa).unwrap_or_default()),
    );
    map.insert(
        "availability_zone".to_string(),
        opt_string_dynamic(&row.availability_zone),
    );
    map.insert("hypervisor".to_string(), opt_string_dynamic(&row.hypervisor));
    map.insert("public_ip".to_string(), Dynamic::Bool(row.public_ip_enabled));
    map.insert(
        "public_ip_address".to_string(),
        opt_string_dynamic(&row.public_ip),
    );
    map.insert("ip_address".to_string(), opt_string_dynamic(&row.ip_address));
    map.insert("spot_vm".to_string(), Dynamic::Bool(row.spot_vm_enabled));
    if let Some(price) = row.spot_vm_max_price {
        map.insert("spot_vm_max_price".to_string(), Dynamic::Number(price));
    }
    map.insert("tag".to_string(), pair_list(&row.tags));
    map.insert(
        "disk".to_string(),
        Dynamic::List(
            row.disks
                .iter()
                .map(|disk| {
                    let mut disk_map = HashMap::new();
                    disk_map.insert("id".to_string(), Dynamic::String(i32toa(disk.id)));
                    disk_map.insert("name".to_string(), Dynamic::String(disk.name.clone()));
                    disk_map.insert(
                        "size".to_string(),
                        Dynamic::Number(bytes_to_gib(disk.size) as f64),
                    );
                    disk_map.insert(
                        "volume_type".to_string(),
                        opt_string_dynamic(&disk.volume_type),
                    );
                    Dynamic::Map(disk_map)
                })
                .collect(),
        ),
    );
    map.insert("status".to_string(), Dynamic::String(row.status.clone()));
    Dynamic::Map(map)
}

fn set_opt_id(
    state: &mut DynamicValue,
    attr: &str,
    value: Option<i32>,
) -> Result<(), ApiError> {
    state.set_string(
        &AttributePath::new(attr),
        value.map(i32toa).unwrap_or_default(),
    )?;
    Ok(())
}

/// Fetches every piece of a project and composes one state map.
/// `Ok(None)` when the project row is gone (expired or deleted).
pub async fn read_project(
    data: &TaikunProviderData,
    project_id: i32,
    declared: &DynamicValue,
) -> Result<Option<DynamicValue>, ApiError> {
    // delete_on_expiration only appears on the list row
    let Some(list_row) = data.client.projects().by_id(project_id).await? else {
        return Ok(None);
    };
    let details = data.client.projects().details(project_id).await?;
    let servers = data.client.servers().list_for_project(project_id).await?;
    let vms = data.client.standalone().list_for_project(project_id).await?;
    let bound_flavors = data.client.flavors().list_bound(project_id).await?;
    let bound_images = data.client.images().list_bound(project_id).await?;
    let quota = data.client.projects().quota(project_id).await?;

    let mut state = DynamicValue::empty_map();
    state.set_string(&AttributePath::new("id"), i32toa(details.id))?;
    state.set_string(&AttributePath::new("name"), details.name.clone())?;
    state.set_string(
        &AttributePath::new("cloud_credential_id"),
        i32toa(details.cloud_credential_id),
    )?;
    state.set_string(&AttributePath::new("cloud_type"), details.cloud_type.clone())?;
    state.set_string(&AttributePath::new("status"), details.status.clone())?;
    state.set_bool(&AttributePath::new("lock"), details.is_locked)?;
    state.set_bool(
        &AttributePath::new("monitoring"),
        details.is_monitoring_enabled,
    )?;
    set_opt_id(&mut state, "organization_id", details.organization_id)?;
    set_opt_id(&mut state, "access_profile_id", details.access_profile_id)?;
    set_opt_id(&mut state, "alerting_profile_id", details.alerting_profile_id)?;
    set_opt_id(
        &mut state,
        "kubernetes_profile_id",
        details.kubernetes_profile_id,
    )?;
    set_opt_id(&mut state, "policy_profile_id", details.opa_profile_id)?;
    set_opt_id(&mut state, "backup_credential_id", details.s3_credential_id)?;
    state.set_string(
        &AttributePath::new("expiration_date"),
        format_expiration_date(details.expired_at.as_deref()),
    )?;
    state.set_bool(
        &AttributePath::new("delete_on_expiration"),
        list_row.delete_on_expiration,
    )?;
    state.set_string(
        &AttributePath::new("kubernetes_version"),
        details.kubernetes_version.clone().unwrap_or_default(),
    )?;

    state.set_bool(&AttributePath::new("spot_full"), details.is_spot_full)?;
    state.set_bool(&AttributePath::new("spot_worker"), details.is_spot_worker)?;
    state.set_bool(&AttributePath::new("spot_vms"), details.is_spot_vms)?;
    if let Some(price) = details.max_spot_price {
        state.set_number(&AttributePath::new("max_spot_price"), price)?;
    }

    if let Some(start) = details.router_id_start_range {
        state.set_number(&AttributePath::new("router_id_start_range"), start as f64)?;
    }
    if let Some(end) = details.router_id_end_range {
        state.set_number(&AttributePath::new("router_id_end_range"), end as f64)?;
    }
    state.set_string(
        &AttributePath::new("taikun_lb_flavor"),
        details.taikun_lb_flavor.clone().unwrap_or_default(),
    )?;

    flatten_autoscaler(&mut state, &details)?;

    state.set_number(&AttributePath::new("quota_cpu"), quota.cpu as f64)?;
    state.set_number(
        &AttributePath::new("quota_ram"),
        bytes_to_gib(quota.ram_size) as f64,
    )?;
    state.set_number(
        &AttributePath::new("quota_disk"),
        bytes_to_gib(quota.disk_size) as f64,
    )?;
    state.set_number(&AttributePath::new("quota_vm_cpu"), quota.vm_cpu as f64)?;
    state.set_number(
        &AttributePath::new("quota_vm_ram"),
        bytes_to_gib(quota.vm_ram) as f64,
    )?;
    state.set_number(
        &AttributePath::new("quota_vm_volume"),
        quota.vm_volume_size as f64,
    )?;

    state.set_list(
        &AttributePath::new("flavors"),
        bound_flavors
            .into_iter()
            .map(|row| Dynamic::String(row.name))
            .collect(),
    )?;
    // the image binding API diverges per cloud: GCP binds by name,
    // everything else by id
    let gcp = matches!(
        details.cloud_type.to_ascii_lowercase().as_str(),
        "gcp" | "google"
    );
    state.set_list(
        &AttributePath::new("images"),
        bound_images
            .into_iter()
            .map(|row| Dynamic::String(if gcp { row.image_name } else { row.image_id }))
            .collect(),
    )?;

    let mut bastions = Vec::new();
    let mut masters = Vec::new();
    let mut workers = Vec::new();
    for row in &servers {
        match ServerRole::parse(&row.role) {
            Some(ServerRole::Bastion) => bastions.push(server_entry(row, &details.cloud_type)),
            Some(ServerRole::Kubemaster) => masters.push(server_entry(row, &details.cloud_type)),
            // autoscaled workers are owned by the autoscaler, not the
            // declared configuration
            Some(ServerRole::Kubeworker) if !row.is_autoscaled() => {
                workers.push(server_entry(row, &details.cloud_type))
            }
            _ => {}
        }
    }
    state.set_list(&AttributePath::new("server_bastion"), bastions)?;
    state.set_list(&AttributePath::new("server_kubemaster"), masters)?;
    state.set_list(&AttributePath::new("server_kubeworker"), workers)?;

    let usernames = declared_usernames(declared);
    state.set_list(
        &AttributePath::new("vm"),
        vms.iter().map(|row| vm_entry(row, &usernames)).collect(),
    )?;

    Ok(Some(state))
}

fn flatten_autoscaler(
    state: &mut DynamicValue,
    details: &ProjectDetails,
) -> Result<(), ApiError> {
    if !details.is_autoscaling_enabled {
        return Ok(());
    }
    state.set_string(
        &AttributePath::new("autoscaler_name"),
        details.autoscaling_group_name.clone().unwrap_or_default(),
    )?;
    state.set_string(
        &AttributePath::new("autoscaler_flavor"),
        details.autoscaling_flavor.clone().unwrap_or_default(),
    )?;
    state.set_number(
        &AttributePath::new("autoscaler_disk_size"),
        details
            .autoscaling_disk_size
            .map(bytes_to_gib)
            .unwrap_or_default() as f64,
    )?;
    state.set_number(
        &AttributePath::new("autoscaler_min_size"),
        details.autoscaling_min_size.unwrap_or_default() as f64,
    )?;
    state.set_number(
        &AttributePath::new("autoscaler_max_size"),
        details.autoscaling_max_size.unwrap_or_default() as f64,
    )?;
    state.set_bool(
        &AttributePath::new("autoscaler_spot_enabled"),
        details.autoscaling_spot_enabled.unwrap_or(false),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_usernames_are_keyed_by_vm_id() {
        let mut declared = DynamicValue::empty_map();
        let mut vm = HashMap::new();
        vm.insert("id".to_string(), Dynamic::String("12".to_string()));
        vm.insert("username".to_string(), Dynamic::String("admin".to_string()));
        let mut unnamed = HashMap::new();
        unnamed.insert("id".to_string(), Dynamic::String("13".to_string()));
        declared
            .set_list(
                &AttributePath::new("vm"),
                vec![Dynamic::Map(vm), Dynamic::Map(unnamed)],
            )
            .unwrap();

        let usernames = declared_usernames(&declared);
        assert_eq!(usernames.get("12").map(String::as_str), Some("admin"));
        assert!(!usernames.contains_key("13"));
    }
}
