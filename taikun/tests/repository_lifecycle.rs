//! Repository lifecycle: private imports wait for chart indexing,
//! public repositories are bound rather than imported, and delete picks
//! the matching teardown call.

mod common;

use mockito::Matcher;
use tfplug::context::Context;
use tfplug::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest, Resource,
    ResourceWithConfigure,
};
use tfplug::types::{AttributePath, DynamicValue};

use taikun::resources::repository::RepositoryResource;

async fn configured(server: &mockito::Server) -> RepositoryResource {
    let mut resource = RepositoryResource::new();
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

fn private_config() -> DynamicValue {
    let mut config = DynamicValue::empty_map();
    config
        .set_string(&AttributePath::new("name"), "internal".to_string())
        .unwrap();
    config.set_bool(&AttributePath::new("private"), true).unwrap();
    config
        .set_string(
            &AttributePath::new("url"),
            "https://charts.corp.example/internal".to_string(),
        )
        .unwrap();
    config
        .set_string(&AttributePath::new("username"), "robot".to_string())
        .unwrap();
    config
        .set_string(&AttributePath::new("password"), "hunter2".to_string())
        .unwrap();
    config
}

fn default_org_mock(server: &mut mockito::Server) -> mockito::Mock {
    server
        .mock("GET", "/api/v1/organizations/default")
        .with_status(200)
        .with_body(r#"{"id":3,"name":"corp"}"#)
}

#[tokio::test]
async fn private_import_waits_for_chart_indexing() {
    let mut server = mockito::Server::new_async().await;

    let _org = default_org_mock(&mut server).create_async().await;
    let import = server
        .mock("POST", "/api/v1/repositories/import")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "name": "internal",
            "url": "https://charts.corp.example/internal",
            "username": "robot",
            "password": "hunter2",
            "organizationId": 3
        })))
        .with_status(200)
        .with_body(r#"{"id":9}"#)
        .expect(1)
        .create_async()
        .await;
    let packages = server
        .mock("GET", "/api/v1/packages/list?repositoryName=internal")
        .with_status(200)
        .with_body(
            r#"{"data":[{"id":1,"name":"nginx","repository":"internal","version":"1.0.0"}],"totalCount":1}"#,
        )
        .expect(1)
        .create_async()
        .await;
    let _list = server
        .mock(
            "GET",
            "/api/v1/repositories/list?search=internal&isPrivate=true&organizationId=3",
        )
        .with_status(200)
        .with_body(
            r#"{"data":[{"id":9,"name":"internal","url":"https://charts.corp.example/internal","organizationId":3,"isPrivate":true,"isBound":true}],"totalCount":1}"#,
        )
        .create_async()
        .await;

    let resource = configured(&server).await;
    let config = private_config();
    let response = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "taikun_repository".to_string(),
                config: config.clone(),
                planned_state: config,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    import.assert_async().await;
    packages.assert_async().await;

    let state = response.new_state;
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "9");
    assert!(state.get_bool(&AttributePath::new("is_bound")).unwrap());
    // chart credentials never come back from the API, the declared
    // values must be carried into state
    assert_eq!(
        state.get_string(&AttributePath::new("password")).unwrap(),
        "hunter2"
    );
}

#[tokio::test]
async fn failed_indexing_lookup_surfaces_instead_of_waiting() {
    let mut server = mockito::Server::new_async().await;

    let _org = default_org_mock(&mut server).create_async().await;
    let import = server
        .mock("POST", "/api/v1/repositories/import")
        .with_status(200)
        .with_body(r#"{"id":9}"#)
        .expect(1)
        .create_async()
        .await;
    let _packages = server
        .mock("GET", "/api/v1/packages/list?repositoryName=internal")
        .with_status(500)
        .with_body(r#"{"message":"chart indexer unavailable"}"#)
        .create_async()
        .await;

    let resource = configured(&server).await;
    let config = private_config();
    let response = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "taikun_repository".to_string(),
                config: config.clone(),
                planned_state: config,
            },
        )
        .await;

    import.assert_async().await;
    assert_eq!(response.diagnostics.len(), 1);
    assert_eq!(response.diagnostics[0].summary, "Failed to create repository");
    assert!(response.diagnostics[0]
        .detail
        .contains("chart indexer unavailable"));
}

#[tokio::test]
async fn public_repository_is_bound_not_imported() {
    let mut server = mockito::Server::new_async().await;

    let _list = server
        .mock("GET", "/api/v1/repositories/list?search=bitnami&isPrivate=false")
        .with_status(200)
        .with_body(
            r#"{"data":[{"id":4,"name":"bitnami","url":"https://charts.bitnami.com/bitnami","isPrivate":false,"isBound":true}],"totalCount":1}"#,
        )
        .create_async()
        .await;
    let bind = server
        .mock("POST", "/api/v1/repositories/bind")
        .match_body(Matcher::PartialJson(serde_json::json!({"ids": [4]})))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let import = server
        .mock("POST", "/api/v1/repositories/import")
        .expect(0)
        .create_async()
        .await;

    let mut config = DynamicValue::empty_map();
    config
        .set_string(&AttributePath::new("name"), "bitnami".to_string())
        .unwrap();

    let resource = configured(&server).await;
    let response = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "taikun_repository".to_string(),
                config: config.clone(),
                planned_state: config,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    bind.assert_async().await;
    import.assert_async().await;
    let state = response.new_state;
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "4");
    assert!(state.get_bool(&AttributePath::new("is_bound")).unwrap());
}

#[tokio::test]
async fn delete_removes_a_private_repository() {
    let mut server = mockito::Server::new_async().await;

    let delete = server
        .mock("POST", "/api/v1/repositories/delete")
        .match_body(Matcher::PartialJson(serde_json::json!({"ids": [9]})))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let unbind = server
        .mock("POST", "/api/v1/repositories/unbind")
        .expect(0)
        .create_async()
        .await;

    let mut prior = DynamicValue::empty_map();
    prior
        .set_string(&AttributePath::new("id"), "9".to_string())
        .unwrap();
    prior.set_bool(&AttributePath::new("private"), true).unwrap();

    let resource = configured(&server).await;
    let response = resource
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: "taikun_repository".to_string(),
                prior_state: prior,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    delete.assert_async().await;
    unbind.assert_async().await;
}

#[tokio::test]
async fn delete_only_unbinds_a_public_repository() {
    let mut server = mockito::Server::new_async().await;

    let unbind = server
        .mock("POST", "/api/v1/repositories/unbind")
        .match_body(Matcher::PartialJson(serde_json::json!({"ids": [4]})))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let delete = server
        .mock("POST", "/api/v1/repositories/delete")
        .expect(0)
        .create_async()
        .await;

    let mut prior = DynamicValue::empty_map();
    prior
        .set_string(&AttributePath::new("id"), "4".to_string())
        .unwrap();

    let resource = configured(&server).await;
    let response = resource
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: "taikun_repository".to_string(),
                prior_state: prior,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    unbind.assert_async().await;
    delete.assert_async().await;
}
