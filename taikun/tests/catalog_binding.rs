//! Catalog project binding: create resolves the catalog by name and
//! refuses projects that are not Ready; update never calls the API.

mod common;

use mockito::Matcher;
use tfplug::context::Context;
use tfplug::resource::{
    ConfigureResourceRequest, CreateResourceRequest, Resource, ResourceWithConfigure,
    UpdateResourceRequest,
};
use tfplug::types::{AttributePath, DynamicValue};

use taikun::resources::catalog_project_binding::CatalogProjectBindingResource;

async fn configured(server: &mockito::Server) -> CatalogProjectBindingResource {
    let mut resource = CatalogProjectBindingResource::new();
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

fn binding_config() -> DynamicValue {
    let mut config = DynamicValue::empty_map();
    config
        .set_string(&AttributePath::new("catalog_name"), "apps".to_string())
        .unwrap();
    config
        .set_string(&AttributePath::new("project_id"), "42".to_string())
        .unwrap();
    config
}

fn project_row_body(status: &str) -> String {
    serde_json::json!({
        "data": [{"id": 42, "name": "p1", "status": status}],
        "totalCount": 1
    })
    .to_string()
}

#[tokio::test]
async fn create_binds_a_ready_project_by_catalog_name() {
    let mut server = mockito::Server::new_async().await;

    let _by_name = server
        .mock("GET", "/api/v1/catalogs/list?search=apps")
        .with_status(200)
        .with_body(r#"{"data":[{"id":8,"name":"apps"}],"totalCount":1}"#)
        .create_async()
        .await;
    let _project = server
        .mock("GET", "/api/v1/projects/list?projectId=42")
        .with_status(200)
        .with_body(project_row_body("Ready"))
        .create_async()
        .await;
    let add = server
        .mock("POST", "/api/v1/catalogs/projects/add")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "catalogId": 8,
            "projectId": 42
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let _by_id = server
        .mock("GET", "/api/v1/catalogs/list?catalogId=8")
        .with_status(200)
        .with_body(
            r#"{"data":[{"id":8,"name":"apps","boundProjects":[{"id":42,"name":"p1"}]}],"totalCount":1}"#,
        )
        .create_async()
        .await;

    let resource = configured(&server).await;
    let config = binding_config();
    let response = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "taikun_catalog_project_binding".to_string(),
                config: config.clone(),
                planned_state: config,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    add.assert_async().await;
    assert_eq!(
        response.new_state.get_string(&AttributePath::new("id")).unwrap(),
        "8/42"
    );
    assert_eq!(
        response
            .new_state
            .get_string(&AttributePath::new("catalog_name"))
            .unwrap(),
        "apps"
    );
    assert!(response
        .new_state
        .get_bool(&AttributePath::new("is_bound"))
        .unwrap());
}

#[tokio::test]
async fn create_refuses_a_project_that_is_still_deploying() {
    let mut server = mockito::Server::new_async().await;

    let _by_name = server
        .mock("GET", "/api/v1/catalogs/list?search=apps")
        .with_status(200)
        .with_body(r#"{"data":[{"id":8,"name":"apps"}],"totalCount":1}"#)
        .create_async()
        .await;
    let _project = server
        .mock("GET", "/api/v1/projects/list?projectId=42")
        .with_status(200)
        .with_body(project_row_body("Updating"))
        .create_async()
        .await;
    let add = server
        .mock("POST", "/api/v1/catalogs/projects/add")
        .expect(0)
        .create_async()
        .await;

    let resource = configured(&server).await;
    let config = binding_config();
    let response = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "taikun_catalog_project_binding".to_string(),
                config: config.clone(),
                planned_state: config,
            },
        )
        .await;

    assert_eq!(response.diagnostics.len(), 1);
    assert!(response.diagnostics[0].detail.contains("must be Ready"));
    add.assert_async().await;
}

#[tokio::test]
async fn update_with_an_unchanged_plan_issues_no_calls() {
    // both attributes are force-new, the update handler is pure
    let resource = CatalogProjectBindingResource::new();
    let mut state = binding_config();
    state
        .set_string(&AttributePath::new("id"), "8/42".to_string())
        .unwrap();

    let response = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: "taikun_catalog_project_binding".to_string(),
                prior_state: state.clone(),
                planned_state: state.clone(),
                config: state.clone(),
            },
        )
        .await;

    assert!(response.diagnostics.is_empty());
    assert_eq!(
        response.new_state.get_string(&AttributePath::new("id")).unwrap(),
        "8/42"
    );
}
