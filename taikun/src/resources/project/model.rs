//! Typed view of the declared project configuration. Parsing happens
//! once up front so the reconcilers compare structs instead of poking
//! at dynamic values.

use std::collections::HashMap;

use tfplug::types::{Dynamic, DynamicValue};

use crate::api::common::KeyValuePair;
use crate::api::ApiError;
use crate::resources::{bool_or, list_of_maps, opt_number, opt_string};
use crate::utils::{atoi32, gib_to_bytes};

/// One declared Kubernetes server (bastion, master or worker).
#[derive(Debug, Clone, PartialEq)]
pub struct ServerSpec {
    pub id: Option<i32>,
    pub name: String,
    pub flavor: String,
    pub disk_size_gib: i64,
    pub labels: Vec<KeyValuePair>,
    pub availability_zone: Option<String>,
    pub hypervisor: Option<String>,
    pub spot_instance: Option<bool>,
    pub spot_price: Option<f64>,
    pub proxmox_extra_disk_size_gib: Option<i64>,
}

impl ServerSpec {
    /// Identity used for worker set-diffing; every field is force-new on
    /// servers, so any difference means delete-and-recreate.
    pub fn identity(&self) -> ServerIdentity {
        ServerIdentity {
            name: self.name.clone(),
            flavor: self.flavor.clone(),
            disk_size_gib: self.disk_size_gib,
            labels: {
                let mut labels: Vec<(String, String)> = self
                    .labels
                    .iter()
                    .map(|l| (l.key.clone(), l.value.clone()))
                    .collect();
                labels.sort();
                labels
            },
            availability_zone: self.availability_zone.clone(),
            hypervisor: self.hypervisor.clone(),
            spot_instance: self.spot_instance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ServerIdentity {
    pub name: String,
    pub flavor: String,
    pub disk_size_gib: i64,
    pub labels: Vec<(String, String)>,
    pub availability_zone: Option<String>,
    pub hypervisor: Option<String>,
    pub spot_instance: Option<bool>,
}

/// One declared standalone VM.
#[derive(Debug, Clone, PartialEq)]
pub struct VmSpec {
    pub id: Option<i32>,
    pub name: String,
    pub flavor: String,
    pub image_id: String,
    pub volume_size_gib: i64,
    pub volume_type: Option<String>,
    pub cloud_init: Option<String>,
    pub standalone_profile_id: Option<i32>,
    pub username: Option<String>,
    pub availability_zone: Option<String>,
    pub hypervisor: Option<String>,
    pub public_ip: bool,
    pub spot_vm: bool,
    pub spot_vm_max_price: Option<f64>,
    pub tags: Vec<KeyValuePair>,
    pub disks: Vec<DiskSpec>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DiskSpec {
    pub id: Option<i32>,
    pub name: String,
    pub size_gib: i64,
    pub volume_type: Option<String>,
}

impl VmSpec {
    /// Fields whose change means delete-and-recreate. The flavor and,
    /// on OpenStack, the public-ip flag are patched in place and stay
    /// out of this key; so do disks, which have their own partition.
    pub fn force_new_key(&self, openstack: bool) -> VmForceNewKey {
        VmForceNewKey {
            name: self.name.clone(),
            image_id: self.image_id.clone(),
            volume_size_gib: self.volume_size_gib,
            volume_type: self.volume_type.clone(),
            cloud_init: self.cloud_init.clone(),
            standalone_profile_id: self.standalone_profile_id,
            username: self.username.clone(),
            availability_zone: self.availability_zone.clone(),
            hypervisor: self.hypervisor.clone(),
            spot_vm: self.spot_vm,
            tags: {
                let mut tags: Vec<(String, String)> = self
                    .tags
                    .iter()
                    .map(|t| (t.key.clone(), t.value.clone()))
                    .collect();
                tags.sort();
                tags
            },
            public_ip: (!openstack).then_some(self.public_ip),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VmForceNewKey {
    pub name: String,
    pub image_id: String,
    pub volume_size_gib: i64,
    pub volume_type: Option<String>,
    pub cloud_init: Option<String>,
    pub standalone_profile_id: Option<i32>,
    pub username: Option<String>,
    pub availability_zone: Option<String>,
    pub hypervisor: Option<String>,
    pub spot_vm: bool,
    pub tags: Vec<(String, String)>,
    pub public_ip: Option<bool>,
}

/// Complete autoscaler parameter set. `parse` enforces the
/// all-or-nothing rule on the three identity fields.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoscalerSpec {
    pub name: String,
    pub flavor: String,
    pub disk_size_gib: i64,
    pub min_size: i32,
    pub max_size: i32,
    pub spot_enabled: bool,
}

impl AutoscalerSpec {
    /// `None` when all of name/flavor/disk are unset. A partially filled
    /// triple is rejected rather than guessed at.
    pub fn parse(value: &DynamicValue) -> Result<Option<Self>, ApiError> {
        let name = opt_string(value, "autoscaler_name");
        let flavor = opt_string(value, "autoscaler_flavor");
        let disk = opt_number(value, "autoscaler_disk_size")
            .map(|v| v as i64)
            .filter(|v| *v > 0);

        match (name, flavor, disk) {
            (None, None, None) => Ok(None),
            (Some(name), Some(flavor), Some(disk_size_gib)) => Ok(Some(Self {
                name,
                flavor,
                disk_size_gib,
                min_size: opt_number(value, "autoscaler_min_size").unwrap_or_default() as i32,
                max_size: opt_number(value, "autoscaler_max_size").unwrap_or_default() as i32,
                spot_enabled: bool_or(value, "autoscaler_spot_enabled", false),
            })),
            _ => Err(ApiError::Validation(
                "autoscaler_name, autoscaler_flavor and autoscaler_disk_size must be set together or not at all"
                    .to_string(),
            )),
        }
    }

    /// A change to any of these forces a disable/enable cycle; min/max
    /// alone can be edited in place.
    pub fn identity_changed(&self, other: &Self) -> bool {
        self.name != other.name
            || self.flavor != other.flavor
            || self.disk_size_gib != other.disk_size_gib
            || self.spot_enabled != other.spot_enabled
    }
}

fn entry_string(entry: &HashMap<String, Dynamic>, key: &str) -> Option<String> {
    entry
        .get(key)
        .and_then(|v| v.as_string())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn entry_number(entry: &HashMap<String, Dynamic>, key: &str) -> Option<f64> {
    match entry.get(key) {
        Some(Dynamic::Number(n)) => Some(*n),
        _ => None,
    }
}

fn entry_bool(entry: &HashMap<String, Dynamic>, key: &str) -> Option<bool> {
    match entry.get(key) {
        Some(Dynamic::Bool(b)) => Some(*b),
        _ => None,
    }
}

fn entry_id(entry: &HashMap<String, Dynamic>, key: &str) -> Result<Option<i32>, ApiError> {
    match entry_string(entry, key) {
        Some(s) => Ok(Some(atoi32(&s)?)),
        None => Ok(None),
    }
}

fn entry_pairs(entry: &HashMap<String, Dynamic>, key: &str) -> Vec<KeyValuePair> {
    match entry.get(key) {
        Some(Dynamic::List(items)) => items
            .iter()
            .filter_map(|item| match item {
                Dynamic::Map(map) => Some(KeyValuePair {
                    key: entry_string(map, "key").unwrap_or_default(),
                    value: entry_string(map, "value").unwrap_or_default(),
                }),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn parse_server(entry: &HashMap<String, Dynamic>) -> Result<ServerSpec, ApiError> {
    Ok(ServerSpec {
        id: entry_id(entry, "id")?,
        name: entry_string(entry, "name").ok_or_else(|| {
            ApiError::Validation("every server needs a name".to_string())
        })?,
        flavor: entry_string(entry, "flavor").ok_or_else(|| {
            ApiError::Validation("every server needs a flavor".to_string())
        })?,
        disk_size_gib: entry_number(entry, "disk_size").unwrap_or(30.0) as i64,
        labels: entry_pairs(entry, "kubernetes_node_label"),
        availability_zone: entry_string(entry, "availability_zone"),
        hypervisor: entry_string(entry, "hypervisor"),
        spot_instance: entry_bool(entry, "spot_instance"),
        spot_price: entry_number(entry, "spot_price"),
        proxmox_extra_disk_size_gib: entry_number(entry, "proxmox_extra_disk_size")
            .map(|v| v as i64),
    })
}

pub fn parse_servers(value: &DynamicValue, attr: &str) -> Result<Vec<ServerSpec>, ApiError> {
    list_of_maps(value, attr).iter().map(parse_server).collect()
}

fn parse_disk(entry: &HashMap<String, Dynamic>) -> Result<DiskSpec, ApiError> {
    Ok(DiskSpec {
        id: entry_id(entry, "id")?,
        name: entry_string(entry, "name")
            .ok_or_else(|| ApiError::Validation("every disk needs a name".to_string()))?,
        size_gib: entry_number(entry, "size").unwrap_or_default() as i64,
        volume_type: entry_string(entry, "volume_type"),
    })
}

pub fn parse_vms(value: &DynamicValue) -> Result<Vec<VmSpec>, ApiError> {
    list_of_maps(value, "vm")
        .iter()
        .map(|entry| {
            Ok(VmSpec {
                id: entry_id(entry, "id")?,
                name: entry_string(entry, "name").ok_or_else(|| {
                    ApiError::Validation("every vm needs a name".to_string())
                })?,
                flavor: entry_string(entry, "flavor").ok_or_else(|| {
                    ApiError::Validation("every vm needs a flavor".to_string())
                })?,
                image_id: entry_string(entry, "image_id").ok_or_else(|| {
                    ApiError::Validation("every vm needs an image_id".to_string())
                })?,
                volume_size_gib: entry_number(entry, "volume_size").unwrap_or_default() as i64,
                volume_type: entry_string(entry, "volume_type"),
                cloud_init: entry_string(entry, "cloud_init"),
                standalone_profile_id: entry_id(entry, "standalone_profile_id")?,
                username: entry_string(entry, "username"),
                availability_zone: entry_string(entry, "availability_zone"),
                hypervisor: entry_string(entry, "hypervisor"),
                public_ip: entry_bool(entry, "public_ip").unwrap_or(false),
                spot_vm: entry_bool(entry, "spot_vm").unwrap_or(false),
                spot_vm_max_price: entry_number(entry, "spot_vm_max_price"),
                tags: entry_pairs(entry, "tag"),
                disks: match entry.get("disk") {
                    Some(Dynamic::List(items)) => items
                        .iter()
                        .filter_map(|item| match item {
                            Dynamic::Map(map) => Some(parse_disk(map)),
                            _ => None,
                        })
                        .collect::<Result<Vec<_>, _>>()?,
                    _ => Vec::new(),
                },
            })
        })
        .collect()
}

/// Declared quotas in bytes (or raw units), `None` when the attribute
/// is unset. The VM volume quota stays in GiB on the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuotaSpec {
    pub cpu: Option<i64>,
    pub ram_bytes: Option<i64>,
    pub disk_bytes: Option<i64>,
    pub vm_cpu: Option<i64>,
    pub vm_ram_bytes: Option<i64>,
    pub vm_volume_gib: Option<i64>,
}

impl QuotaSpec {
    pub fn parse(value: &DynamicValue) -> Self {
        Self {
            cpu: opt_number(value, "quota_cpu").map(|v| v as i64),
            ram_bytes: opt_number(value, "quota_ram").map(|v| gib_to_bytes(v as i64)),
            disk_bytes: opt_number(value, "quota_disk").map(|v| gib_to_bytes(v as i64)),
            vm_cpu: opt_number(value, "quota_vm_cpu").map(|v| v as i64),
            vm_ram_bytes: opt_number(value, "quota_vm_ram").map(|v| gib_to_bytes(v as i64)),
            vm_volume_gib: opt_number(value, "quota_vm_volume").map(|v| v as i64),
        }
    }

    pub fn any_set(&self) -> bool {
        self.cpu.is_some()
            || self.ram_bytes.is_some()
            || self.disk_bytes.is_some()
            || self.vm_cpu.is_some()
            || self.vm_ram_bytes.is_some()
            || self.vm_volume_gib.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tfplug::types::AttributePath;

    #[test]
    fn autoscaler_parse_rejects_partial_triples() {
        let mut value = DynamicValue::empty_map();
        value
            .set_string(&AttributePath::new("autoscaler_name"), "asg".to_string())
            .unwrap();
        assert!(matches!(
            AutoscalerSpec::parse(&value),
            Err(ApiError::Validation(_))
        ));

        value
            .set_string(&AttributePath::new("autoscaler_flavor"), "m1.small".to_string())
            .unwrap();
        value
            .set_number(&AttributePath::new("autoscaler_disk_size"), 30.0)
            .unwrap();
        let spec = AutoscalerSpec::parse(&value).unwrap().unwrap();
        assert_eq!(spec.name, "asg");
        assert_eq!(spec.disk_size_gib, 30);
    }

    #[test]
    fn autoscaler_parse_treats_empty_as_disabled() {
        let value = DynamicValue::empty_map();
        assert!(AutoscalerSpec::parse(&value).unwrap().is_none());
    }

    #[test]
    fn vm_force_new_key_ignores_public_ip_on_openstack() {
        let vm = VmSpec {
            id: Some(1),
            name: "vm0".to_string(),
            flavor: "m1.small".to_string(),
            image_id: "img-1".to_string(),
            volume_size_gib: 30,
            volume_type: None,
            cloud_init: None,
            standalone_profile_id: None,
            username: None,
            availability_zone: None,
            hypervisor: None,
            public_ip: false,
            spot_vm: false,
            spot_vm_max_price: None,
            tags: vec![],
            disks: vec![],
        };
        let mut flipped = vm.clone();
        flipped.public_ip = true;
        assert_eq!(vm.force_new_key(true), flipped.force_new_key(true));
        assert_ne!(vm.force_new_key(false), flipped.force_new_key(false));
    }

    #[test]
    fn server_identity_orders_labels() {
        let mut a = ServerSpec {
            id: None,
            name: "w0".to_string(),
            flavor: "m1.small".to_string(),
            disk_size_gib: 30,
            labels: vec![
                KeyValuePair {
                    key: "b".to_string(),
                    value: "2".to_string(),
                },
                KeyValuePair {
                    key: "a".to_string(),
                    value: "1".to_string(),
                },
            ],
            availability_zone: None,
            hypervisor: None,
            spot_instance: None,
            spot_price: None,
            proxmox_extra_disk_size_gib: None,
        };
        let b = ServerSpec {
            labels: vec![
                KeyValuePair {
                    key: "a".to_string(),
                    value: "1".to_string(),
                },
                KeyValuePair {
                    key: "b".to_string(),
                    value: "2".to_string(),
                },
            ],
            ..a.clone()
        };
        assert_eq!(a.identity(), b.identity());
        a.disk_size_gib = 60;
        assert_ne!(a.identity(), b.identity());
    }
}
