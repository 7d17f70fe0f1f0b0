//! Cloud credential resources, one per supported cloud.
//!
//! All clouds share the list, rename, lock and delete endpoints; only
//! creation is cloud-specific. Secrets are write-only on the Taikun side,
//! so each resource grafts the declared secret values back into state on
//! read instead of diffing against the API.

pub mod aws;
pub mod azure;
pub mod gcp;
pub mod openstack;
pub mod proxmox;
pub mod vsphere;
pub mod zadara;

use tfplug::resource::UpdateResourceRequest;
use tfplug::types::{AttributePath, DynamicValue};

use crate::api::cloud_credentials::CloudCredentialRow;
use crate::api::{ApiError, LockMode};
use crate::provider_data::TaikunProviderData;
use crate::resources::{bool_or, required_string, string_or_empty};
use crate::utils::i32toa;

/// Cloud-specific non-secret column out of the loose `extra` map.
pub(crate) fn extra_string(row: &CloudCredentialRow, key: &str) -> String {
    row.extra
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

pub(crate) fn extra_i32(row: &CloudCredentialRow, key: &str) -> Option<i32> {
    row.extra.get(key).and_then(|v| v.as_i64()).map(|v| v as i32)
}

pub(crate) fn extra_bool(row: &CloudCredentialRow, key: &str) -> bool {
    row.extra.get(key).and_then(|v| v.as_bool()).unwrap_or_default()
}

pub(crate) fn extra_string_list(row: &CloudCredentialRow, key: &str) -> Vec<String> {
    row.extra
        .get(key)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

/// Columns common to every cloud credential row.
pub(crate) fn flatten_common(row: &CloudCredentialRow) -> Result<DynamicValue, ApiError> {
    let mut state = DynamicValue::empty_map();
    state.set_string(&AttributePath::new("id"), i32toa(row.id))?;
    state.set_string(&AttributePath::new("name"), row.name.clone())?;
    state.set_string(
        &AttributePath::new("organization_id"),
        row.organization_id.map(i32toa).unwrap_or_default(),
    )?;
    state.set_bool(&AttributePath::new("lock"), row.is_locked)?;
    state.set_bool(&AttributePath::new("is_default"), row.is_default)?;
    state.set_string(
        &AttributePath::new("created_by"),
        row.created_by.clone().unwrap_or_default(),
    )?;
    Ok(state)
}

/// Grafts declared write-only secret attributes into the freshly read state.
pub(crate) fn graft_secrets(
    state: &mut DynamicValue,
    declared: &DynamicValue,
    secrets: &[&str],
) -> Result<(), ApiError> {
    for secret in secrets {
        state.set_string(
            &AttributePath::new(*secret),
            string_or_empty(declared, secret),
        )?;
    }
    Ok(())
}

/// Shared in-place update surface: rename plus the lock flag.
pub(crate) async fn apply_rename_and_lock(
    data: &TaikunProviderData,
    id: i32,
    request: &UpdateResourceRequest,
) -> Result<(), ApiError> {
    let api = data.client.cloud_credentials();
    if request.has_change(&AttributePath::new("name")) {
        api.rename(id, &required_string(&request.planned_state, "name")?)
            .await?;
    }
    if request.has_change(&AttributePath::new("lock")) {
        let mode = LockMode::from_bool(bool_or(&request.planned_state, "lock", false));
        api.lock(id, mode).await?;
    }
    Ok(())
}

/// Shared delete: unlock first when the prior state holds the lock.
pub(crate) async fn delete_credential(
    data: &TaikunProviderData,
    id: i32,
    was_locked: bool,
) -> Result<(), ApiError> {
    let api = data.client.cloud_credentials();
    if was_locked {
        api.lock(id, LockMode::Unlock).await?;
    }
    api.delete(id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row_with_extra(extra: serde_json::Map<String, serde_json::Value>) -> CloudCredentialRow {
        CloudCredentialRow {
            id: 1,
            name: "cc".to_string(),
            cloud_type: "aws".to_string(),
            organization_id: None,
            is_locked: false,
            is_default: false,
            created_by: None,
            extra,
        }
    }

    #[test]
    fn extra_accessors_tolerate_missing_columns() {
        let mut extra = serde_json::Map::new();
        extra.insert("awsRegion".to_string(), json!("eu-west-1"));
        extra.insert("azCount".to_string(), json!(3));
        extra.insert("hypervisors".to_string(), json!(["hv1", "hv2"]));
        let row = row_with_extra(extra);

        assert_eq!(extra_string(&row, "awsRegion"), "eu-west-1");
        assert_eq!(extra_string(&row, "missing"), "");
        assert_eq!(extra_i32(&row, "azCount"), Some(3));
        assert_eq!(extra_i32(&row, "missing"), None);
        assert_eq!(extra_string_list(&row, "hypervisors"), vec!["hv1", "hv2"]);
    }

    #[test]
    fn graft_secrets_copies_declared_values() {
        let row = row_with_extra(serde_json::Map::new());
        let mut state = flatten_common(&row).unwrap();
        let mut declared = DynamicValue::empty_map();
        declared
            .set_string(
                &AttributePath::new("secret_access_key"),
                "shh".to_string(),
            )
            .unwrap();

        graft_secrets(&mut state, &declared, &["secret_access_key"]).unwrap();
        assert_eq!(
            state
                .get_string(&AttributePath::new("secret_access_key"))
                .unwrap(),
            "shh"
        );
    }
}
