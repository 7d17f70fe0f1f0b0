//! Application instance updates: an autosync flip is a plain edit, a
//! values change is the only thing that triggers a sync pass, and a
//! removed values file resets the chart to its defaults.

mod common;

use mockito::Matcher;
use tfplug::context::Context;
use tfplug::resource::{
    ConfigureResourceRequest, Resource, ResourceWithConfigure, UpdateResourceRequest,
};
use tfplug::types::{AttributePath, DynamicValue};

use taikun::resources::app_instance::AppInstanceResource;

async fn configured(server: &mockito::Server) -> AppInstanceResource {
    let mut resource = AppInstanceResource::new();
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

fn instance_state(autosync: bool) -> DynamicValue {
    let mut state = DynamicValue::empty_map();
    state
        .set_string(&AttributePath::new("id"), "12".to_string())
        .unwrap();
    state
        .set_string(&AttributePath::new("name"), "wordpress".to_string())
        .unwrap();
    state
        .set_string(&AttributePath::new("project_id"), "3".to_string())
        .unwrap();
    state
        .set_string(&AttributePath::new("catalog_app_id"), "7".to_string())
        .unwrap();
    state
        .set_bool(&AttributePath::new("autosync"), autosync)
        .unwrap();
    state
}

fn details_mock(server: &mut mockito::Server, autosync: bool) -> mockito::Mock {
    server
        .mock("GET", "/api/v1/applications/details/12")
        .with_status(200)
        .with_body(
            serde_json::json!({
                "id": 12,
                "name": "wordpress",
                "projectId": 3,
                "catalogAppId": 7,
                "status": "Ready",
                "autosync": autosync
            })
            .to_string(),
        )
}

#[tokio::test]
async fn autosync_flip_edits_without_resyncing() {
    let mut server = mockito::Server::new_async().await;

    let edit = server
        .mock("POST", "/api/v1/applications/edit")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "id": 12,
            "autosync": true
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let sync = server
        .mock("POST", "/api/v1/applications/sync")
        .expect(0)
        .create_async()
        .await;
    let _details = details_mock(&mut server, true).create_async().await;

    let resource = configured(&server).await;
    let planned = instance_state(true);
    let response = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: "taikun_app_instance".to_string(),
                prior_state: instance_state(false),
                planned_state: planned.clone(),
                config: planned,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    edit.assert_async().await;
    sync.assert_async().await;
    assert!(response
        .new_state
        .get_bool(&AttributePath::new("autosync"))
        .unwrap());
}

#[tokio::test]
async fn dropping_the_values_file_resets_the_chart() {
    let mut server = mockito::Server::new_async().await;

    let edit = server
        .mock("POST", "/api/v1/applications/edit")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "id": 12,
            "extraValues": ""
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let sync = server
        .mock("POST", "/api/v1/applications/sync")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let _details = details_mock(&mut server, false).create_async().await;

    let mut prior = instance_state(false);
    prior
        .set_string(
            &AttributePath::new("parameters_yaml"),
            "values.yaml".to_string(),
        )
        .unwrap();
    let planned = instance_state(false);

    let resource = configured(&server).await;
    let response = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: "taikun_app_instance".to_string(),
                prior_state: prior,
                planned_state: planned.clone(),
                config: planned,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    edit.assert_async().await;
    sync.assert_async().await;
}
