//! taikun_project
//!
//! The composite root. A project owns its servers, VMs, quota, binding
//! records and autoscaler group; flavors and images are referenced from
//! the cloud credential. Create and update run as ordered pipelines
//! with wait-for-Ready barriers between the phases, under the extended
//! 80-minute deadline.

mod autoscaler;
pub(crate) mod flatten;
mod model;
mod servers;
mod toggles;
mod vms;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::plan_modifier::{IgnoreChangeFromEmpty, StaticDefault, UseStateForUnknown};
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceSchemaRequest, ResourceSchemaResponse,
    ResourceWithConfigure, UpdateResourceRequest, UpdateResourceResponse,
    ValidateResourceConfigRequest, ValidateResourceConfigResponse,
};
use tfplug::schema::{
    Attribute, AttributeBuilder, AttributeType, NestingMode, Schema, SchemaBuilder,
};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::{NumberRangeValidator, StringLengthValidator, StringPatternValidator};

use crate::api::flavors::{BindFlavorsCommand, BindImagesCommand, UnbindFlavorsCommand, UnbindImagesCommand};
use crate::api::projects::{
    CreateProjectCommand, ExtendLifetimeCommand, SpotMode, UpdateQuotaCommand, PROJECT_READY,
};
use crate::api::{ApiError, LockMode};
use crate::provider_data::TaikunProviderData;
use crate::resources::{
    api_error_diag, bool_or, opt_id, opt_number, opt_string, provider_data_from, required_id,
    required_string, string_list, string_or_empty,
};
use crate::utils::{
    parse_expiration_date, poll_until, read_after_write, PROJECT_TIMEOUT, RETRY_INTERVAL,
};

use model::{parse_servers, parse_vms, AutoscalerSpec, QuotaSpec, ServerSpec};

const QUOTA_ATTRS: &[&str] = &[
    "quota_cpu",
    "quota_ram",
    "quota_disk",
    "quota_vm_cpu",
    "quota_vm_ram",
    "quota_vm_volume",
];

/// Waits for the project status to come back to Ready through whatever
/// intermediate state the last operation put it in.
pub(crate) async fn wait_ready(
    data: &TaikunProviderData,
    ctx: &Context,
    project_id: i32,
) -> Result<(), ApiError> {
    let client = &data.client;
    poll_until(
        ctx,
        &format!("project {}", project_id),
        PROJECT_READY,
        PROJECT_TIMEOUT,
        RETRY_INTERVAL,
        move || async move {
            let details = client.projects().details(project_id).await?;
            Ok(details.status == PROJECT_READY)
        },
    )
    .await
}

/// Same, but a vanished project row counts as done. Used by the purge
/// waits on teardown.
pub(crate) async fn wait_ready_or_gone(
    data: &TaikunProviderData,
    ctx: &Context,
    project_id: i32,
) -> Result<(), ApiError> {
    let client = &data.client;
    poll_until(
        ctx,
        &format!("project {}", project_id),
        PROJECT_READY,
        PROJECT_TIMEOUT,
        RETRY_INTERVAL,
        move || async move {
            match client.projects().by_id(project_id).await? {
                None => Ok(true),
                Some(row) => Ok(row.status == PROJECT_READY),
            }
        },
    )
    .await
}

#[derive(Default)]
pub struct ProjectResource {
    provider_data: Option<TaikunProviderData>,
}

impl ProjectResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> Result<&TaikunProviderData, ApiError> {
        self.provider_data
            .as_ref()
            .ok_or_else(|| ApiError::Validation("provider not configured".to_string()))
    }

    async fn read_state(
        &self,
        id: i32,
        declared: &DynamicValue,
        post_write: bool,
    ) -> Result<Option<DynamicValue>, ApiError> {
        let data = self.data()?;
        match flatten::read_project(data, id, declared).await? {
            Some(state) => Ok(Some(state)),
            None if post_write => Err(ApiError::NotFoundAfterCreateOrUpdate),
            None => Ok(None),
        }
    }

    async fn apply_quota(&self, project_id: i32, spec: &QuotaSpec) -> Result<(), ApiError> {
        if !spec.any_set() {
            return Ok(());
        }
        let data = self.data()?;
        let current = data.client.projects().quota(project_id).await?;
        data.client
            .projects()
            .update_quota(&UpdateQuotaCommand {
                quota_id: current.id,
                cpu: spec.cpu.unwrap_or(current.cpu),
                ram_size: spec.ram_bytes.unwrap_or(current.ram_size),
                disk_size: spec.disk_bytes.unwrap_or(current.disk_size),
                vm_cpu: spec.vm_cpu.unwrap_or(current.vm_cpu),
                vm_ram: spec.vm_ram_bytes.unwrap_or(current.vm_ram),
                vm_volume_size: spec.vm_volume_gib.unwrap_or(current.vm_volume_size),
            })
            .await
    }

    async fn rebind_flavors(&self, project_id: i32, declared: &[String]) -> Result<(), ApiError> {
        let data = self.data()?;
        let bound = data.client.flavors().list_bound(project_id).await?;
        let declared_set: HashSet<&str> = declared.iter().map(String::as_str).collect();

        let unbind_ids: Vec<i32> = bound
            .iter()
            .filter(|row| !declared_set.contains(row.name.as_str()))
            .map(|row| row.id)
            .collect();
        let bound_names: HashSet<&str> = bound.iter().map(|row| row.name.as_str()).collect();
        let bind: Vec<String> = declared
            .iter()
            .filter(|name| !bound_names.contains(name.as_str()))
            .cloned()
            .collect();

        if !unbind_ids.is_empty() {
            data.client
                .flavors()
                .unbind(&UnbindFlavorsCommand { ids: unbind_ids })
                .await?;
        }
        if !bind.is_empty() {
            data.client
                .flavors()
                .bind(&BindFlavorsCommand {
                    project_id,
                    flavors: bind,
                })
                .await?;
        }
        Ok(())
    }

    /// Declared entries match a binding on either the image id or the
    /// image name, since GCP binds by name.
    async fn rebind_images(&self, project_id: i32, declared: &[String]) -> Result<(), ApiError> {
        let data = self.data()?;
        let bound = data.client.images().list_bound(project_id).await?;
        let declared_set: HashSet<&str> = declared.iter().map(String::as_str).collect();

        let unbind_ids: Vec<i32> = bound
            .iter()
            .filter(|row| {
                !declared_set.contains(row.image_id.as_str())
                    && !declared_set.contains(row.image_name.as_str())
            })
            .map(|row| row.id)
            .collect();
        let bound_refs: HashSet<&str> = bound
            .iter()
            .flat_map(|row| [row.image_id.as_str(), row.image_name.as_str()])
            .collect();
        let bind: Vec<String> = declared
            .iter()
            .filter(|image| !bound_refs.contains(image.as_str()))
            .cloned()
            .collect();

        if !unbind_ids.is_empty() {
            data.client
                .images()
                .unbind(&UnbindImagesCommand { ids: unbind_ids })
                .await?;
        }
        if !bind.is_empty() {
            data.client
                .images()
                .bind(&BindImagesCommand {
                    project_id,
                    images: bind,
                })
                .await?;
        }
        Ok(())
    }

    /// Taikun load-balancer consistency: the LB fields are required and
    /// the cloud must be OpenStack exactly when the Kubernetes profile
    /// enables the Taikun LB.
    async fn check_taikun_lb(&self, config: &DynamicValue) -> Result<(), ApiError> {
        let data = self.data()?;
        let lb_flavor = opt_string(config, "taikun_lb_flavor");
        let start = opt_number(config, "router_id_start_range");
        let end = opt_number(config, "router_id_end_range");
        let fields_set = [lb_flavor.is_some(), start.is_some(), end.is_some()];

        let lb_enabled = match opt_id(config, "kubernetes_profile_id")? {
            Some(profile_id) => data
                .client
                .kubernetes_profiles()
                .by_id(profile_id)
                .await?
                .map(|profile| profile.taikun_lb_enabled)
                .unwrap_or(false),
            None => false,
        };

        if lb_enabled {
            if fields_set.contains(&false) {
                return Err(ApiError::Validation(
                    "the kubernetes profile enables the Taikun load balancer, set taikun_lb_flavor, router_id_start_range and router_id_end_range".to_string(),
                ));
            }
            let credential_id = required_id(config, "cloud_credential_id")?;
            let credential = data
                .client
                .cloud_credentials()
                .by_id(credential_id)
                .await?
                .ok_or_else(|| {
                    ApiError::Validation(format!("cloud credential {} not found", credential_id))
                })?;
            if !credential.cloud_type.eq_ignore_ascii_case("openstack") {
                return Err(ApiError::Validation(
                    "the Taikun load balancer is only available on OpenStack".to_string(),
                ));
            }
        } else if fields_set.contains(&true) {
            return Err(ApiError::Validation(
                "taikun_lb_flavor and the router id range only apply when the kubernetes profile enables the Taikun load balancer".to_string(),
            ));
        }
        Ok(())
    }

    /// Extra Proxmox disk storage type, resolved once and only when a
    /// worker actually declares one.
    async fn proxmox_storage_for(
        &self,
        config: &DynamicValue,
        workers: &[ServerSpec],
    ) -> Result<Option<String>, ApiError> {
        if workers
            .iter()
            .all(|w| w.proxmox_extra_disk_size_gib.is_none())
        {
            return Ok(None);
        }
        let data = self.data()?;
        servers::proxmox_disk_storage(data, opt_id(config, "kubernetes_profile_id")?)
            .await
            .map(Some)
    }
}

fn validate_config(config: &DynamicValue) -> Vec<Diagnostic> {
    let mut diagnostics = vec![];

    let bastions = parse_servers(config, "server_bastion");
    let masters = parse_servers(config, "server_kubemaster");
    let workers = parse_servers(config, "server_kubeworker");
    match (&bastions, &masters, &workers) {
        (Ok(bastions), Ok(masters), Ok(workers)) => {
            let all_empty = bastions.is_empty() && masters.is_empty() && workers.is_empty();
            let all_present = !bastions.is_empty() && !masters.is_empty() && !workers.is_empty();
            if !all_empty && !all_present {
                diagnostics.push(Diagnostic::error(
                    "Incomplete server groups",
                    "declare a bastion, masters and workers together, or none of them",
                ));
            }
            if all_present {
                if bastions.len() > 1 {
                    diagnostics.push(Diagnostic::error(
                        "Too many bastions",
                        "a project has at most one bastion",
                    ));
                }
                if masters.len() % 2 == 0 {
                    diagnostics.push(Diagnostic::error(
                        "Even master count",
                        "the number of kubemasters must be odd",
                    ));
                }
            }
            let mut names = HashSet::new();
            for server in bastions.iter().chain(masters).chain(workers) {
                if !names.insert(server.name.as_str()) {
                    diagnostics.push(Diagnostic::error(
                        "Duplicate server name",
                        &format!("server name {:?} is used more than once", server.name),
                    ));
                }
            }
        }
        _ => {
            for result in [&bastions, &masters, &workers] {
                if let Err(e) = result {
                    diagnostics.push(api_error_diag("Invalid server block", e));
                }
            }
        }
    }

    if bool_or(config, "spot_full", false) && bool_or(config, "spot_worker", false) {
        diagnostics.push(Diagnostic::error(
            "Conflicting spot toggles",
            "spot_full and spot_worker are mutually exclusive",
        ));
    }
    if opt_number(config, "max_spot_price").is_some()
        && !bool_or(config, "spot_full", false)
        && !bool_or(config, "spot_worker", false)
        && !bool_or(config, "spot_vms", false)
    {
        diagnostics.push(Diagnostic::error(
            "Spot price without spot instances",
            "max_spot_price requires one of spot_full, spot_worker or spot_vms",
        ));
    }

    match AutoscalerSpec::parse(config) {
        Err(e) => diagnostics.push(api_error_diag("Invalid autoscaler block", &e)),
        Ok(Some(spec)) => {
            // an unbound autoscaler flavor would be bound implicitly by
            // the server, invisibly to the declared flavor set
            if !string_list(config, "flavors").contains(&spec.flavor) {
                diagnostics.push(Diagnostic::error(
                    "Autoscaler flavor not bound",
                    &format!("autoscaler_flavor {:?} must be listed in flavors", spec.flavor),
                ));
            }
        }
        Ok(None) => {}
    }

    let lb_fields = [
        opt_string(config, "taikun_lb_flavor").is_some(),
        opt_number(config, "router_id_start_range").is_some(),
        opt_number(config, "router_id_end_range").is_some(),
    ];
    if lb_fields.contains(&true) && lb_fields.contains(&false) {
        diagnostics.push(Diagnostic::error(
            "Incomplete load balancer block",
            "taikun_lb_flavor, router_id_start_range and router_id_end_range must be set together",
        ));
    }

    if let Some(date) = opt_string(config, "expiration_date") {
        if let Err(e) = parse_expiration_date(&date) {
            diagnostics.push(api_error_diag("Invalid expiration date", &e));
        }
    }

    diagnostics
}

fn key_value_attributes() -> Vec<Attribute> {
    vec![
        AttributeBuilder::new("key", AttributeType::String)
            .required()
            .build(),
        AttributeBuilder::new("value", AttributeType::String)
            .required()
            .build(),
    ]
}

fn server_attributes(worker: bool) -> Vec<Attribute> {
    let mut attributes = vec![
        AttributeBuilder::new("id", AttributeType::String)
            .computed()
            .build(),
        AttributeBuilder::new("name", AttributeType::String)
            .required()
            .validator(Arc::new(StringLengthValidator {
                min: Some(1),
                max: Some(30),
            }))
            .validator(Arc::new(StringPatternValidator::new(
                "^[a-zA-Z0-9-]+$",
                "alphanumeric server name",
            )))
            .build(),
        AttributeBuilder::new("flavor", AttributeType::String)
            .required()
            .build(),
        AttributeBuilder::new("disk_size", AttributeType::Number)
            .description("Disk size in GiB.")
            .optional()
            .computed()
            .build(),
        AttributeBuilder::new(
            "kubernetes_node_label",
            AttributeType::List(Box::new(AttributeType::Object(HashMap::new()))),
        )
        .optional()
        .nested(key_value_attributes(), NestingMode::List)
        .build(),
        AttributeBuilder::new("availability_zone", AttributeType::String)
            .optional()
            .computed()
            .build(),
        AttributeBuilder::new("hypervisor", AttributeType::String)
            .optional()
            .computed()
            .build(),
        AttributeBuilder::new("status", AttributeType::String)
            .computed()
            .build(),
    ];
    if worker {
        attributes.extend([
            AttributeBuilder::new("spot_instance", AttributeType::Bool)
                .optional()
                .build(),
            AttributeBuilder::new("spot_price", AttributeType::Number)
                .optional()
                .build(),
            AttributeBuilder::new("proxmox_extra_disk_size", AttributeType::Number)
                .description("Extra Proxmox disk size in GiB.")
                .optional()
                .build(),
        ]);
    }
    attributes
}

fn vm_attributes() -> Vec<Attribute> {
    vec![
        AttributeBuilder::new("id", AttributeType::String)
            .computed()
            .build(),
        AttributeBuilder::new("name", AttributeType::String)
            .required()
            .validator(Arc::new(StringLengthValidator {
                min: Some(1),
                max: Some(52),
            }))
            .build(),
        AttributeBuilder::new("flavor", AttributeType::String)
            .required()
            .build(),
        AttributeBuilder::new("image_id", AttributeType::String)
            .required()
            .build(),
        AttributeBuilder::new("volume_size", AttributeType::Number)
            .description("Boot volume size in GiB.")
            .required()
            .build(),
        AttributeBuilder::new("volume_type", AttributeType::String)
            .optional()
            .computed()
            .build(),
        AttributeBuilder::new("cloud_init", AttributeType::String)
            .optional()
            .build(),
        AttributeBuilder::new("standalone_profile_id", AttributeType::String)
            .optional()
            .computed()
            .build(),
        AttributeBuilder::new("username", AttributeType::String)
            .optional()
            .sensitive()
            .build(),
        AttributeBuilder::new("availability_zone", AttributeType::String)
            .optional()
            .computed()
            .build(),
        AttributeBuilder::new("hypervisor", AttributeType::String)
            .optional()
            .computed()
            .build(),
        AttributeBuilder::new("public_ip", AttributeType::Bool)
            .optional()
            .build(),
        AttributeBuilder::new("public_ip_address", AttributeType::String)
            .computed()
            .build(),
        AttributeBuilder::new("ip_address", AttributeType::String)
            .computed()
            .build(),
        AttributeBuilder::new("spot_vm", AttributeType::Bool)
            .optional()
            .build(),
        AttributeBuilder::new("spot_vm_max_price", AttributeType::Number)
            .optional()
            .build(),
        AttributeBuilder::new(
            "tag",
            AttributeType::List(Box::new(AttributeType::Object(HashMap::new()))),
        )
        .optional()
        .nested(key_value_attributes(), NestingMode::List)
        .build(),
        AttributeBuilder::new(
            "disk",
            AttributeType::List(Box::new(AttributeType::Object(HashMap::new()))),
        )
        .optional()
        .nested(
            vec![
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
                AttributeBuilder::new("name", AttributeType::String)
                    .required()
                    .build(),
                AttributeBuilder::new("size", AttributeType::Number)
                    .description("Disk size in GiB.")
                    .required()
                    .build(),
                AttributeBuilder::new("volume_type", AttributeType::String)
                    .optional()
                    .computed()
                    .build(),
            ],
            NestingMode::List,
        )
        .build(),
        AttributeBuilder::new("status", AttributeType::String)
            .computed()
            .build(),
    ]
}

pub fn project_schema() -> Schema {
    SchemaBuilder::new()
        .description("Taikun Project")
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .computed()
                .plan_modifier(Arc::new(UseStateForUnknown))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .required()
                .force_new()
                .validator(Arc::new(StringLengthValidator {
                    min: Some(3),
                    max: Some(30),
                }))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("cloud_credential_id", AttributeType::String)
                .required()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("cloud_type", AttributeType::String)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("organization_id", AttributeType::String)
                .optional()
                .computed()
                .force_new()
                .plan_modifier(Arc::new(IgnoreChangeFromEmpty))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("access_profile_id", AttributeType::String)
                .optional()
                .computed()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("alerting_profile_id", AttributeType::String)
                .optional()
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("kubernetes_profile_id", AttributeType::String)
                .optional()
                .computed()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("policy_profile_id", AttributeType::String)
                .optional()
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("backup_credential_id", AttributeType::String)
                .optional()
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("monitoring", AttributeType::Bool)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "flavors",
                AttributeType::List(Box::new(AttributeType::String)),
            )
            .optional()
            .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "images",
                AttributeType::List(Box::new(AttributeType::String)),
            )
            .optional()
            .build(),
        )
        .attribute(
            AttributeBuilder::new("quota_cpu", AttributeType::Number)
                .description("CPU quota in units; defaults to 300.")
                .optional()
                .computed()
                .plan_modifier(Arc::new(StaticDefault(Dynamic::Number(300.0))))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("quota_ram", AttributeType::Number)
                .description("RAM quota in GiB; defaults to 500.")
                .optional()
                .computed()
                .plan_modifier(Arc::new(StaticDefault(Dynamic::Number(500.0))))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("quota_disk", AttributeType::Number)
                .description("Disk quota in GiB; defaults to 2048.")
                .optional()
                .computed()
                .plan_modifier(Arc::new(StaticDefault(Dynamic::Number(2048.0))))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("quota_vm_cpu", AttributeType::Number)
                .description("VM CPU quota in units; defaults to 300.")
                .optional()
                .computed()
                .plan_modifier(Arc::new(StaticDefault(Dynamic::Number(300.0))))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("quota_vm_ram", AttributeType::Number)
                .description("VM RAM quota in GiB; defaults to 500.")
                .optional()
                .computed()
                .plan_modifier(Arc::new(StaticDefault(Dynamic::Number(500.0))))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("quota_vm_volume", AttributeType::Number)
                .description("VM volume quota in GiB; defaults to 2000.")
                .optional()
                .computed()
                .plan_modifier(Arc::new(StaticDefault(Dynamic::Number(2000.0))))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("expiration_date", AttributeType::String)
                .description("dd/mm/yyyy; empty means no expiration.")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("delete_on_expiration", AttributeType::Bool)
                .optional()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("kubernetes_version", AttributeType::String)
                .optional()
                .computed()
                .force_new()
                .plan_modifier(Arc::new(IgnoreChangeFromEmpty))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("spot_full", AttributeType::Bool)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("spot_worker", AttributeType::Bool)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("spot_vms", AttributeType::Bool)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("max_spot_price", AttributeType::Number)
                .optional()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("router_id_start_range", AttributeType::Number)
                .optional()
                .force_new()
                .validator(Arc::new(NumberRangeValidator {
                    min: Some(0.0),
                    max: Some(255.0),
                }))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("router_id_end_range", AttributeType::Number)
                .optional()
                .force_new()
                .validator(Arc::new(NumberRangeValidator {
                    min: Some(0.0),
                    max: Some(255.0),
                }))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("taikun_lb_flavor", AttributeType::String)
                .optional()
                .force_new()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("autoscaler_name", AttributeType::String)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("autoscaler_flavor", AttributeType::String)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("autoscaler_disk_size", AttributeType::Number)
                .description("Autoscaled worker disk size in GiB.")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("autoscaler_min_size", AttributeType::Number)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("autoscaler_max_size", AttributeType::Number)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("autoscaler_spot_enabled", AttributeType::Bool)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "server_bastion",
                AttributeType::List(Box::new(AttributeType::Object(HashMap::new()))),
            )
            .optional()
            .force_new()
            .nested(server_attributes(false), NestingMode::List)
            .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "server_kubemaster",
                AttributeType::List(Box::new(AttributeType::Object(HashMap::new()))),
            )
            .optional()
            .force_new()
            .nested(server_attributes(false), NestingMode::List)
            .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "server_kubeworker",
                AttributeType::List(Box::new(AttributeType::Object(HashMap::new()))),
            )
            .optional()
            .nested(server_attributes(true), NestingMode::List)
            .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "vm",
                AttributeType::List(Box::new(AttributeType::Object(HashMap::new()))),
            )
            .optional()
            .nested(vm_attributes(), NestingMode::List)
            .build(),
        )
        .attribute(
            AttributeBuilder::new("lock", AttributeType::Bool)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("status", AttributeType::String)
                .computed()
                .build(),
        )
        .build()
}

#[async_trait]
impl Resource for ProjectResource {
    fn type_name(&self) -> &str {
        "taikun_project"
    }

    async fn schema(&self, _ctx: Context, _request: ResourceSchemaRequest) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: project_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        ValidateResourceConfigResponse {
            diagnostics: validate_config(&request.config),
        }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let config = &request.config;

            self.check_taikun_lb(config).await?;
            let autoscaler = AutoscalerSpec::parse(config)?;
            let bastions = parse_servers(config, "server_bastion")?;
            let masters = parse_servers(config, "server_kubemaster")?;
            let workers = parse_servers(config, "server_kubeworker")?;
            let declared_vms = parse_vms(config)?;
            let flavors = string_list(config, "flavors");
            let images = string_list(config, "images");
            let spot_full = bool_or(config, "spot_full", false);
            let spot_worker = bool_or(config, "spot_worker", false);
            let spot_vms = bool_or(config, "spot_vms", false);
            let any_spot = spot_full || spot_worker || spot_vms;

            let command = CreateProjectCommand {
                name: required_string(config, "name")?,
                cloud_credential_id: required_id(config, "cloud_credential_id")?,
                organization_id: opt_id(config, "organization_id")?,
                access_profile_id: opt_id(config, "access_profile_id")?,
                alerting_profile_id: opt_id(config, "alerting_profile_id")?,
                kubernetes_profile_id: opt_id(config, "kubernetes_profile_id")?,
                opa_profile_id: opt_id(config, "policy_profile_id")?,
                s3_credential_id: opt_id(config, "backup_credential_id")?,
                flavors: flavors.clone(),
                expired_at: parse_expiration_date(&string_or_empty(config, "expiration_date"))?,
                delete_on_expiration: bool_or(config, "delete_on_expiration", false),
                is_monitoring_enabled: bool_or(config, "monitoring", false),
                is_autoscaling_enabled: autoscaler.is_some(),
                autoscaling_group_name: autoscaler.as_ref().map(|a| a.name.clone()),
                autoscaling_flavor: autoscaler.as_ref().map(|a| a.flavor.clone()),
                autoscaling_disk_size: autoscaler
                    .as_ref()
                    .map(|a| crate::utils::gib_to_bytes(a.disk_size_gib)),
                autoscaling_min_size: autoscaler.as_ref().map(|a| a.min_size),
                autoscaling_max_size: autoscaler.as_ref().map(|a| a.max_size),
                autoscaling_spot_enabled: autoscaler.as_ref().map(|a| a.spot_enabled),
                is_spot_full: spot_full,
                is_spot_worker: spot_worker,
                is_spot_vms: spot_vms,
                max_spot_price: any_spot
                    .then(|| opt_number(config, "max_spot_price"))
                    .flatten(),
                router_id_start_range: opt_number(config, "router_id_start_range")
                    .map(|v| v as i32),
                router_id_end_range: opt_number(config, "router_id_end_range").map(|v| v as i32),
                taikun_lb_flavor: opt_string(config, "taikun_lb_flavor"),
                kubernetes_version: opt_string(config, "kubernetes_version"),
            };
            let created = data.client.projects().create(&command).await?;
            let project_id = created.id;

            self.apply_quota(project_id, &QuotaSpec::parse(config)).await?;
            if !images.is_empty() {
                self.rebind_images(project_id, &images).await?;
            }
            if !bastions.is_empty() {
                let storage = self.proxmox_storage_for(config, &workers).await?;
                servers::create_all(
                    data,
                    &ctx,
                    project_id,
                    &bastions,
                    &masters,
                    &workers,
                    storage.as_deref(),
                )
                .await?;
            }
            if !declared_vms.is_empty() {
                vms::create_all(data, &ctx, project_id, &declared_vms).await?;
            }
            if bool_or(config, "lock", false) {
                data.client.projects().lock(project_id, LockMode::Lock).await?;
            }

            read_after_write(&ctx, "project", PROJECT_TIMEOUT, || {
                self.read_state(project_id, config, true)
            })
            .await?
            .ok_or(ApiError::NotFoundAfterCreateOrUpdate)
        }
        .await;

        match result {
            Ok(new_state) => CreateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![api_error_diag("Failed to create project", &e)],
            },
        }
    }

    async fn read(&self, _ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let result: Result<Option<DynamicValue>, ApiError> = async {
            let id = required_id(&request.current_state, "id")?;
            self.read_state(id, &request.current_state, false).await
        }
        .await;

        match result {
            Ok(new_state) => ReadResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics: vec![api_error_diag("Failed to read project", &e)],
            },
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let project_id = required_id(&request.prior_state, "id")?;
            let config = &request.planned_state;

            // changing both exclusive spot modes at once is ambiguous:
            // the order of the two toggles decides which wins
            if request.has_change(&AttributePath::new("spot_full"))
                && request.has_change(&AttributePath::new("spot_worker"))
            {
                return Err(ApiError::Validation(
                    "spot_full and spot_worker cannot change in the same apply".to_string(),
                ));
            }

            let prior_bastions = parse_servers(&request.prior_state, "server_bastion")?;
            let planned_bastions = parse_servers(config, "server_bastion")?;
            let planned_workers = parse_servers(config, "server_kubeworker")?;
            let prior_vms = parse_vms(&request.prior_state)?;
            let planned_vms = parse_vms(config)?;

            if bool_or(&request.prior_state, "lock", false) {
                data.client.projects().lock(project_id, LockMode::Unlock).await?;
            }

            if request.has_change(&AttributePath::new("alerting_profile_id")) {
                data.client.projects().detach_alerting_profile(project_id).await?;
                if let Some(profile_id) = opt_id(config, "alerting_profile_id")? {
                    data.client
                        .projects()
                        .attach_alerting_profile(project_id, profile_id)
                        .await?;
                }
            }

            if request.has_change_in(&["expiration_date", "delete_on_expiration"]) {
                data.client
                    .projects()
                    .extend_lifetime(&ExtendLifetimeCommand {
                        project_id,
                        expire_at: parse_expiration_date(&string_or_empty(
                            config,
                            "expiration_date",
                        ))?,
                        delete_on_expiration: bool_or(config, "delete_on_expiration", false),
                    })
                    .await?;
            }

            if request.has_change(&AttributePath::new("images")) {
                self.rebind_images(project_id, &string_list(config, "images")).await?;
            }

            if request.has_change_in(QUOTA_ATTRS) {
                self.apply_quota(project_id, &QuotaSpec::parse(config)).await?;
            }

            let details = data.client.projects().details(project_id).await?;
            let apply_toggles = |details_id: i32| {
                let ctx = ctx.clone();
                async move {
                    toggles::reconcile_monitoring(
                        data,
                        &ctx,
                        details_id,
                        bool_or(config, "monitoring", false),
                    )
                    .await?;
                    toggles::reconcile_backup(
                        data,
                        &ctx,
                        details_id,
                        opt_id(config, "backup_credential_id")?,
                    )
                    .await?;
                    toggles::reconcile_opa(
                        data,
                        &ctx,
                        details_id,
                        opt_id(config, "policy_profile_id")?,
                    )
                    .await
                }
            };

            match (prior_bastions.is_empty(), planned_bastions.is_empty()) {
                // empty project gains its Kubernetes plane
                (true, false) => {
                    apply_toggles(project_id).await?;
                    let masters = parse_servers(config, "server_kubemaster")?;
                    let storage = self.proxmox_storage_for(config, &planned_workers).await?;
                    servers::create_all(
                        data,
                        &ctx,
                        project_id,
                        &planned_bastions,
                        &masters,
                        &planned_workers,
                        storage.as_deref(),
                    )
                    .await?;
                }
                // plane is torn down, project stays
                (false, true) => {
                    servers::purge_all(
                        data,
                        &ctx,
                        project_id,
                        details.autoscaling_group_name.as_deref(),
                    )
                    .await?;
                    apply_toggles(project_id).await?;
                }
                (false, false) => {
                    apply_toggles(project_id).await?;
                    if request.has_change(&AttributePath::new("server_kubeworker")) {
                        let storage =
                            self.proxmox_storage_for(config, &planned_workers).await?;
                        servers::reconcile_workers(
                            data,
                            &ctx,
                            project_id,
                            &details.cloud_type,
                            &planned_workers,
                            storage.as_deref(),
                        )
                        .await?;
                    }
                }
                (true, true) => {}
            }

            if request.has_change(&AttributePath::new("vm")) {
                vms::reconcile(
                    data,
                    &ctx,
                    project_id,
                    &details.cloud_type,
                    &prior_vms,
                    &planned_vms,
                )
                .await?;
            }

            for (attr, mode) in [
                ("spot_full", SpotMode::Full),
                ("spot_worker", SpotMode::Worker),
                ("spot_vms", SpotMode::Vms),
            ] {
                if request.has_change(&AttributePath::new(attr)) {
                    data.client
                        .projects()
                        .toggle_spot(project_id, mode, bool_or(config, attr, false))
                        .await?;
                }
            }

            let prior_autoscaler = AutoscalerSpec::parse(&request.prior_state)?;
            let planned_autoscaler = AutoscalerSpec::parse(config)?;
            autoscaler::reconcile(
                data,
                &ctx,
                project_id,
                prior_autoscaler.as_ref(),
                planned_autoscaler.as_ref(),
            )
            .await?;

            if request.has_change(&AttributePath::new("flavors")) {
                self.rebind_flavors(project_id, &string_list(config, "flavors")).await?;
            }

            if bool_or(config, "lock", false) {
                data.client.projects().lock(project_id, LockMode::Lock).await?;
            }

            read_after_write(&ctx, "project", PROJECT_TIMEOUT, || {
                self.read_state(project_id, config, true)
            })
            .await?
            .ok_or(ApiError::NotFoundAfterCreateOrUpdate)
        }
        .await;

        match result {
            Ok(new_state) => UpdateResourceResponse {
                new_state,
                diagnostics: vec![],
            },
            Err(e) => UpdateResourceResponse {
                new_state: request.planned_state,
                diagnostics: vec![api_error_diag("Failed to update project", &e)],
            },
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let result: Result<(), ApiError> = async {
            let data = self.data()?;
            let project_id = required_id(&request.prior_state, "id")?;

            // already gone, e.g. expired with delete_on_expiration
            if data.client.projects().by_id(project_id).await?.is_none() {
                return Ok(());
            }

            if bool_or(&request.prior_state, "lock", false) {
                data.client.projects().lock(project_id, LockMode::Unlock).await?;
            }

            let details = data.client.projects().details(project_id).await?;
            servers::purge_all(
                data,
                &ctx,
                project_id,
                details.autoscaling_group_name.as_deref(),
            )
            .await?;
            vms::purge_all(data, &ctx, project_id).await?;
            data.client.projects().delete(project_id).await
        }
        .await;

        DeleteResourceResponse {
            diagnostics: match result {
                Ok(()) => vec![],
                Err(e) => vec![api_error_diag("Failed to delete project", &e)],
            },
        }
    }
}

#[async_trait]
impl ResourceWithConfigure for ProjectResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        match provider_data_from(&request.provider_data) {
            Ok(data) => {
                self.provider_data = Some(data);
                ConfigureResourceResponse { diagnostics: vec![] }
            }
            Err(diag) => ConfigureResourceResponse {
                diagnostics: vec![diag],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(name: &str) -> Dynamic {
        let mut map = HashMap::new();
        map.insert("name".to_string(), Dynamic::String(name.to_string()));
        map.insert("flavor".to_string(), Dynamic::String("m1.small".to_string()));
        Dynamic::Map(map)
    }

    fn populated_config(master_count: usize) -> DynamicValue {
        let mut config = DynamicValue::empty_map();
        config
            .set_list(&AttributePath::new("server_bastion"), vec![server("b0")])
            .unwrap();
        config
            .set_list(
                &AttributePath::new("server_kubemaster"),
                (0..master_count).map(|i| server(&format!("m{}", i))).collect(),
            )
            .unwrap();
        config
            .set_list(&AttributePath::new("server_kubeworker"), vec![server("w0")])
            .unwrap();
        config
    }

    #[test]
    fn validate_accepts_empty_and_odd_master_projects() {
        assert!(validate_config(&DynamicValue::empty_map()).is_empty());
        assert!(validate_config(&populated_config(3)).is_empty());
    }

    #[test]
    fn validate_rejects_even_master_counts() {
        let diagnostics = validate_config(&populated_config(2));
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn validate_rejects_partial_server_groups() {
        let mut config = DynamicValue::empty_map();
        config
            .set_list(&AttributePath::new("server_bastion"), vec![server("b0")])
            .unwrap();
        assert!(!validate_config(&config).is_empty());
    }

    #[test]
    fn validate_rejects_duplicate_server_names() {
        let mut config = populated_config(1);
        config
            .set_list(&AttributePath::new("server_kubeworker"), vec![server("m0")])
            .unwrap();
        assert!(!validate_config(&config).is_empty());
    }

    #[test]
    fn validate_rejects_both_spot_modes() {
        let mut config = DynamicValue::empty_map();
        config.set_bool(&AttributePath::new("spot_full"), true).unwrap();
        config.set_bool(&AttributePath::new("spot_worker"), true).unwrap();
        assert_eq!(validate_config(&config).len(), 1);
    }

    #[test]
    fn validate_rejects_spot_price_without_spot() {
        let mut config = DynamicValue::empty_map();
        config
            .set_number(&AttributePath::new("max_spot_price"), 0.5)
            .unwrap();
        assert_eq!(validate_config(&config).len(), 1);

        config.set_bool(&AttributePath::new("spot_vms"), true).unwrap();
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn validate_requires_autoscaler_flavor_in_flavors() {
        let mut config = DynamicValue::empty_map();
        config
            .set_string(&AttributePath::new("autoscaler_name"), "asg".to_string())
            .unwrap();
        config
            .set_string(&AttributePath::new("autoscaler_flavor"), "m1.large".to_string())
            .unwrap();
        config
            .set_number(&AttributePath::new("autoscaler_disk_size"), 30.0)
            .unwrap();
        assert_eq!(validate_config(&config).len(), 1);

        config
            .set_list(
                &AttributePath::new("flavors"),
                vec![Dynamic::String("m1.large".to_string())],
            )
            .unwrap();
        assert!(validate_config(&config).is_empty());
    }

    fn name_diagnostics(attributes: &[Attribute], value: &str) -> usize {
        let attr = attributes.iter().find(|a| a.name == "name").unwrap();
        let path = AttributePath::new("name");
        attr.validators
            .iter()
            .flat_map(|v| v.validate(&Dynamic::String(value.to_string()), &path))
            .count()
    }

    #[test]
    fn quota_attributes_carry_plan_defaults() {
        use tfplug::plan_modifier::PlanModifyRequest;

        let schema = project_schema();
        for (name, expected) in [
            ("quota_cpu", 300.0),
            ("quota_ram", 500.0),
            ("quota_disk", 2048.0),
            ("quota_vm_cpu", 300.0),
            ("quota_vm_ram", 500.0),
            ("quota_vm_volume", 2000.0),
        ] {
            let attr = schema.attributes.iter().find(|a| a.name == name).unwrap();
            let response = attr.plan_modifiers[0].modify(PlanModifyRequest {
                state: Dynamic::Null,
                plan: Dynamic::Null,
                config: Dynamic::Null,
                path: AttributePath::new(name),
            });
            assert_eq!(response.plan_value, Dynamic::Number(expected), "{}", name);
        }
    }

    #[test]
    fn server_names_are_short_alphanumerics() {
        let attrs = server_attributes(true);
        assert_eq!(name_diagnostics(&attrs, "worker-1"), 0);
        assert!(name_diagnostics(&attrs, "worker_1") > 0);
        assert!(name_diagnostics(&attrs, &"w".repeat(31)) > 0);
    }

    #[test]
    fn vm_names_allow_up_to_fifty_two_characters() {
        let attrs = vm_attributes();
        assert_eq!(name_diagnostics(&attrs, &"v".repeat(52)), 0);
        assert!(name_diagnostics(&attrs, &"v".repeat(53)) > 0);
    }

    #[test]
    fn validate_rejects_partial_lb_block() {
        let mut config = DynamicValue::empty_map();
        config
            .set_string(&AttributePath::new("taikun_lb_flavor"), "lb.small".to_string())
            .unwrap();
        assert_eq!(validate_config(&config).len(), 1);

        config
            .set_number(&AttributePath::new("router_id_start_range"), 10.0)
            .unwrap();
        config
            .set_number(&AttributePath::new("router_id_end_range"), 20.0)
            .unwrap();
        assert!(validate_config(&config).is_empty());
    }
}
