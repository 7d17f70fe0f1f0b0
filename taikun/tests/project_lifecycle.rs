//! Project pipeline against a scripted API: create without servers,
//! growing and shrinking the Kubernetes plane, in-place VM patches and
//! the autoscaler edit/disable paths.

mod common;

use std::collections::HashMap;

use mockito::Matcher;
use tfplug::context::Context;
use tfplug::resource::{
    ConfigureResourceRequest, CreateResourceRequest, Resource, ResourceWithConfigure,
    UpdateResourceRequest,
};
use tfplug::types::{AttributePath, Dynamic, DynamicValue};

use taikun::resources::project::ProjectResource;

async fn configured(server: &mockito::Server) -> ProjectResource {
    let mut resource = ProjectResource::new();
    let response = resource
        .configure(
            Context::new(),
            ConfigureResourceRequest {
                provider_data: Some(common::provider_data(server)),
            },
        )
        .await;
    assert!(response.diagnostics.is_empty());
    resource
}

fn details_body(overrides: serde_json::Value) -> serde_json::Value {
    let mut base = serde_json::json!({
        "id": 42,
        "name": "p1",
        "cloudCredentialId": 7,
        "cloudType": "openstack",
        "status": "Ready"
    });
    if let (Some(map), Some(extra)) = (base.as_object_mut(), overrides.as_object()) {
        for (key, value) in extra {
            map.insert(key.clone(), value.clone());
        }
    }
    base
}

fn empty_list() -> serde_json::Value {
    serde_json::json!({"data": [], "totalCount": 0})
}

fn server_row(id: i32, name: &str, role: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "name": name,
        "role": role,
        "status": "Ready",
        "diskSize": 32212254720i64,
        "kubernetesNodeLabels": [],
        "openstackFlavor": "m1.small"
    })
}

/// The seven read endpoints behind one project refresh. The returned
/// mocks serve any number of requests, so the same details mock also
/// covers the toggle checks and wait-for-Ready loops.
async fn mount_read_mocks(
    server: &mut mockito::Server,
    details: serde_json::Value,
    servers: serde_json::Value,
    vms: serde_json::Value,
    flavors: serde_json::Value,
) -> Vec<mockito::Mock> {
    let list_row = serde_json::json!({
        "data": [{
            "id": 42,
            "name": "p1",
            "deleteOnExpiration": false,
            "isLocked": false,
            "status": "Ready"
        }],
        "totalCount": 1
    });
    let quota = serde_json::json!({
        "id": 11,
        "cpu": 80,
        "ramSize": 137438953472i64,
        "diskSize": 1099511627776i64,
        "vmCpu": 40,
        "vmRam": 68719476736i64,
        "vmVolumeSize": 500
    });
    vec![
        server
            .mock("GET", "/api/v1/projects/list?projectId=42")
            .with_status(200)
            .with_body(list_row.to_string())
            .create_async()
            .await,
        server
            .mock("GET", "/api/v1/projects/details/42")
            .with_status(200)
            .with_body(details.to_string())
            .create_async()
            .await,
        server
            .mock("GET", "/api/v1/servers/list?projectId=42")
            .with_status(200)
            .with_body(servers.to_string())
            .create_async()
            .await,
        server
            .mock("GET", "/api/v1/standalone/list?projectId=42")
            .with_status(200)
            .with_body(vms.to_string())
            .create_async()
            .await,
        server
            .mock("GET", "/api/v1/flavors/projects/42/list?limit=50&offset=0")
            .with_status(200)
            .with_body(flavors.to_string())
            .create_async()
            .await,
        server
            .mock("GET", "/api/v1/images/projects/42/list?limit=50&offset=0")
            .with_status(200)
            .with_body(empty_list().to_string())
            .create_async()
            .await,
        server
            .mock("GET", "/api/v1/projects/quota/42")
            .with_status(200)
            .with_body(quota.to_string())
            .create_async()
            .await,
    ]
}

fn server_entry(name: &str) -> Dynamic {
    let mut map = HashMap::new();
    map.insert("name".to_string(), Dynamic::String(name.to_string()));
    map.insert("flavor".to_string(), Dynamic::String("m1.small".to_string()));
    Dynamic::Map(map)
}

fn base_state() -> DynamicValue {
    let mut state = DynamicValue::empty_map();
    state
        .set_string(&AttributePath::new("id"), "42".to_string())
        .unwrap();
    state
        .set_string(&AttributePath::new("name"), "p1".to_string())
        .unwrap();
    state
        .set_string(&AttributePath::new("cloud_credential_id"), "7".to_string())
        .unwrap();
    state
}

#[tokio::test]
async fn create_without_servers_never_commits() {
    let mut server = mockito::Server::new_async().await;

    let _reads = mount_read_mocks(
        &mut server,
        details_body(serde_json::json!({})),
        empty_list(),
        empty_list(),
        empty_list(),
    )
    .await;
    let create = server
        .mock("POST", "/api/v1/projects/create")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "name": "p1",
            "cloudCredentialId": 7
        })))
        .with_status(200)
        .with_body(r#"{"id":42}"#)
        .expect(1)
        .create_async()
        .await;
    let commit = server
        .mock("POST", "/api/v1/projects/commit")
        .expect(0)
        .create_async()
        .await;

    let mut config = DynamicValue::empty_map();
    config
        .set_string(&AttributePath::new("name"), "p1".to_string())
        .unwrap();
    config
        .set_string(&AttributePath::new("cloud_credential_id"), "7".to_string())
        .unwrap();

    let resource = configured(&server).await;
    let response = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "taikun_project".to_string(),
                config: config.clone(),
                planned_state: config,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    create.assert_async().await;
    commit.assert_async().await;

    let state = response.new_state;
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "42");
    assert_eq!(
        state.get_string(&AttributePath::new("cloud_type")).unwrap(),
        "openstack"
    );
    assert_eq!(
        state.get_string(&AttributePath::new("status")).unwrap(),
        "Ready"
    );
    assert_eq!(
        state.get_number(&AttributePath::new("quota_ram")).unwrap(),
        128.0
    );
    assert!(state
        .get_list(&AttributePath::new("server_bastion"))
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn adding_the_kubernetes_plane_creates_each_server_and_commits_once() {
    let mut server = mockito::Server::new_async().await;

    let servers_after = serde_json::json!({
        "data": [
            server_row(1, "b0", "Bastion"),
            server_row(2, "m0", "Kubemaster"),
            server_row(3, "m1", "Kubemaster"),
            server_row(4, "m2", "Kubemaster"),
            server_row(5, "w0", "Kubeworker"),
            server_row(6, "w1", "Kubeworker"),
        ],
        "totalCount": 6
    });
    let _reads = mount_read_mocks(
        &mut server,
        details_body(serde_json::json!({})),
        servers_after,
        empty_list(),
        empty_list(),
    )
    .await;
    let create = server
        .mock("POST", "/api/v1/servers/create")
        .match_body(Matcher::PartialJson(serde_json::json!({"projectId": 42})))
        .with_status(200)
        .with_body(r#"{"id":1}"#)
        .expect(6)
        .create_async()
        .await;
    let commit = server
        .mock("POST", "/api/v1/projects/commit")
        .match_body(Matcher::PartialJson(serde_json::json!({"projectId": 42})))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let mut prior = base_state();
    for group in ["server_bastion", "server_kubemaster", "server_kubeworker"] {
        prior.set_list(&AttributePath::new(group), vec![]).unwrap();
    }
    let mut planned = base_state();
    planned
        .set_list(&AttributePath::new("server_bastion"), vec![server_entry("b0")])
        .unwrap();
    planned
        .set_list(
            &AttributePath::new("server_kubemaster"),
            vec![server_entry("m0"), server_entry("m1"), server_entry("m2")],
        )
        .unwrap();
    planned
        .set_list(
            &AttributePath::new("server_kubeworker"),
            vec![server_entry("w0"), server_entry("w1")],
        )
        .unwrap();

    let resource = configured(&server).await;
    let response = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: "taikun_project".to_string(),
                prior_state: prior,
                planned_state: planned.clone(),
                config: planned,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    create.assert_async().await;
    commit.assert_async().await;

    let state = response.new_state;
    for (group, expected) in [
        ("server_bastion", 1),
        ("server_kubemaster", 3),
        ("server_kubeworker", 2),
    ] {
        assert_eq!(
            state
                .get_list_of_maps(&AttributePath::new(group))
                .unwrap()
                .len(),
            expected,
            "{}",
            group
        );
    }
}

#[tokio::test]
async fn removing_a_worker_deletes_it_without_touching_the_rest() {
    let mut server = mockito::Server::new_async().await;

    let servers_now = serde_json::json!({
        "data": [
            server_row(1, "b0", "Bastion"),
            server_row(2, "m0", "Kubemaster"),
            server_row(3, "m1", "Kubemaster"),
            server_row(4, "m2", "Kubemaster"),
            server_row(5, "w0", "Kubeworker"),
            server_row(6, "w1", "Kubeworker"),
        ],
        "totalCount": 6
    });
    let _reads = mount_read_mocks(
        &mut server,
        details_body(serde_json::json!({})),
        servers_now,
        empty_list(),
        empty_list(),
    )
    .await;
    let delete = server
        .mock("POST", "/api/v1/servers/delete")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "projectId": 42,
            "serverIds": [6]
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let create = server
        .mock("POST", "/api/v1/servers/create")
        .expect(0)
        .create_async()
        .await;
    let commit = server
        .mock("POST", "/api/v1/projects/commit")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let mut prior = base_state();
    prior
        .set_list(&AttributePath::new("server_bastion"), vec![server_entry("b0")])
        .unwrap();
    prior
        .set_list(
            &AttributePath::new("server_kubemaster"),
            vec![server_entry("m0"), server_entry("m1"), server_entry("m2")],
        )
        .unwrap();
    prior
        .set_list(
            &AttributePath::new("server_kubeworker"),
            vec![server_entry("w0"), server_entry("w1")],
        )
        .unwrap();
    let mut planned = prior.clone();
    planned
        .set_list(&AttributePath::new("server_kubeworker"), vec![server_entry("w0")])
        .unwrap();

    let resource = configured(&server).await;
    let response = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: "taikun_project".to_string(),
                prior_state: prior,
                planned_state: planned.clone(),
                config: planned,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    delete.assert_async().await;
    create.assert_async().await;
    commit.assert_async().await;
}

#[tokio::test]
async fn vm_flavor_change_is_patched_in_place_with_one_repair() {
    let mut server = mockito::Server::new_async().await;

    let vms_now = serde_json::json!({
        "data": [{
            "id": 31,
            "name": "vm0",
            "status": "Ready",
            "flavor": "m1.small",
            "imageId": "img-1",
            "volumeSize": 32212254720i64,
            "publicIpEnabled": false,
            "spotVmEnabled": false,
            "tags": [],
            "disks": []
        }],
        "totalCount": 1
    });
    let _reads = mount_read_mocks(
        &mut server,
        details_body(serde_json::json!({})),
        empty_list(),
        vms_now,
        empty_list(),
    )
    .await;
    let update_flavor = server
        .mock("POST", "/api/v1/standalone/update/flavor")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "id": 31,
            "flavor": "m1.large"
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let repair = server
        .mock("POST", "/api/v1/standalone/repair")
        .match_body(Matcher::PartialJson(serde_json::json!({"projectId": 42})))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let vm_delete = server
        .mock("POST", "/api/v1/standalone/delete")
        .expect(0)
        .create_async()
        .await;
    let vm_create = server
        .mock("POST", "/api/v1/standalone/create")
        .expect(0)
        .create_async()
        .await;

    let vm_entry = |flavor: &str| {
        let mut map = HashMap::new();
        map.insert("id".to_string(), Dynamic::String("31".to_string()));
        map.insert("name".to_string(), Dynamic::String("vm0".to_string()));
        map.insert("flavor".to_string(), Dynamic::String(flavor.to_string()));
        map.insert("image_id".to_string(), Dynamic::String("img-1".to_string()));
        map.insert("volume_size".to_string(), Dynamic::Number(30.0));
        Dynamic::Map(map)
    };
    let mut prior = base_state();
    prior
        .set_list(&AttributePath::new("vm"), vec![vm_entry("m1.small")])
        .unwrap();
    let mut planned = base_state();
    planned
        .set_list(&AttributePath::new("vm"), vec![vm_entry("m1.large")])
        .unwrap();

    let resource = configured(&server).await;
    let response = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: "taikun_project".to_string(),
                prior_state: prior,
                planned_state: planned.clone(),
                config: planned,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    update_flavor.assert_async().await;
    repair.assert_async().await;
    vm_delete.assert_async().await;
    vm_create.assert_async().await;
}

fn autoscaled_state(max_size: f64) -> DynamicValue {
    let mut state = base_state();
    state
        .set_list(
            &AttributePath::new("flavors"),
            vec![Dynamic::String("m1.large".to_string())],
        )
        .unwrap();
    state
        .set_string(&AttributePath::new("autoscaler_name"), "asg".to_string())
        .unwrap();
    state
        .set_string(&AttributePath::new("autoscaler_flavor"), "m1.large".to_string())
        .unwrap();
    state
        .set_number(&AttributePath::new("autoscaler_disk_size"), 30.0)
        .unwrap();
    state
        .set_number(&AttributePath::new("autoscaler_min_size"), 1.0)
        .unwrap();
    state
        .set_number(&AttributePath::new("autoscaler_max_size"), max_size)
        .unwrap();
    state
}

#[tokio::test]
async fn autoscaler_bounds_are_edited_in_place() {
    let mut server = mockito::Server::new_async().await;

    let details = details_body(serde_json::json!({
        "isAutoscalingEnabled": true,
        "autoscalingGroupName": "asg",
        "autoscalingFlavor": "m1.large",
        "autoscalingDiskSize": 32212254720i64,
        "autoscalingMinSize": 1,
        "autoscalingMaxSize": 5,
        "autoscalingSpotEnabled": false
    }));
    let flavors = serde_json::json!({
        "data": [{"id": 12, "name": "m1.large"}],
        "totalCount": 1
    });
    let _reads =
        mount_read_mocks(&mut server, details, empty_list(), empty_list(), flavors).await;
    let edit = server
        .mock("POST", "/api/v1/autoscaler/edit")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "projectId": 42,
            "minSize": 1,
            "maxSize": 5
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let enable = server
        .mock("POST", "/api/v1/autoscaler/enable")
        .expect(0)
        .create_async()
        .await;
    let disable = server
        .mock("POST", "/api/v1/autoscaler/disable")
        .expect(0)
        .create_async()
        .await;

    let prior = autoscaled_state(3.0);
    let planned = autoscaled_state(5.0);

    let resource = configured(&server).await;
    let response = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: "taikun_project".to_string(),
                prior_state: prior,
                planned_state: planned.clone(),
                config: planned,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    edit.assert_async().await;
    enable.assert_async().await;
    disable.assert_async().await;
    assert_eq!(
        response
            .new_state
            .get_number(&AttributePath::new("autoscaler_max_size"))
            .unwrap(),
        5.0
    );
}

#[tokio::test]
async fn dropping_the_autoscaler_block_disables_the_group() {
    let mut server = mockito::Server::new_async().await;

    let flavors = serde_json::json!({
        "data": [{"id": 12, "name": "m1.large"}],
        "totalCount": 1
    });
    let _reads = mount_read_mocks(
        &mut server,
        details_body(serde_json::json!({})),
        empty_list(),
        empty_list(),
        flavors,
    )
    .await;
    let disable = server
        .mock("POST", "/api/v1/autoscaler/disable")
        .match_body(Matcher::PartialJson(serde_json::json!({"projectId": 42})))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let edit = server
        .mock("POST", "/api/v1/autoscaler/edit")
        .expect(0)
        .create_async()
        .await;

    let prior = autoscaled_state(3.0);
    let mut planned = base_state();
    planned
        .set_list(
            &AttributePath::new("flavors"),
            vec![Dynamic::String("m1.large".to_string())],
        )
        .unwrap();

    let resource = configured(&server).await;
    let response = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: "taikun_project".to_string(),
                prior_state: prior,
                planned_state: planned.clone(),
                config: planned,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    disable.assert_async().await;
    edit.assert_async().await;
    // autoscaling is off in the refreshed details, so the block is gone
    assert!(response
        .new_state
        .get(&AttributePath::new("autoscaler_name"))
        .is_none());
}
