//! Access profile lifecycle against a scripted API: create reads back
//! the server-issued sub-collection ids, update touches only the
//! endpoints whose attributes changed, delete unlocks first.

mod common;

use std::collections::HashMap;

use mockito::Matcher;
use tfplug::context::Context;
use tfplug::resource::{
    ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest, Resource,
    ResourceWithConfigure, UpdateResourceRequest,
};
use tfplug::types::{AttributePath, Dynamic, DynamicValue};

use taikun::resources::access_profile::AccessProfileResource;

async fn configured(server: &mockito::Server) -> AccessProfileResource {
    let mut resource = AccessProfileResource::new();
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

fn profile_row_body() -> String {
    serde_json::json!({
        "data": [{
            "id": 5,
            "name": "dev-profile",
            "httpProxy": "http://proxy.corp:3128",
            "organizationId": 3,
            "organizationName": "corp",
            "isLocked": false,
            "createdBy": "admin@corp",
            "allowedHosts": [
                {"id": 71, "description": "office", "address": "10.0.0.0", "maskBits": 24}
            ],
            "dnsServers": [{"id": 72, "address": "1.1.1.1"}],
            "ntpServers": [],
            "sshUsers": [{"id": 73, "name": "deployer", "sshPublicKey": "ssh-ed25519 AAA"}]
        }],
        "totalCount": 1
    })
    .to_string()
}

fn declared_config() -> DynamicValue {
    let mut config = DynamicValue::empty_map();
    config
        .set_string(&AttributePath::new("name"), "dev-profile".to_string())
        .unwrap();
    config
        .set_string(
            &AttributePath::new("http_proxy"),
            "http://proxy.corp:3128".to_string(),
        )
        .unwrap();

    let mut host = HashMap::new();
    host.insert(
        "description".to_string(),
        Dynamic::String("office".to_string()),
    );
    host.insert(
        "address".to_string(),
        Dynamic::String("10.0.0.0".to_string()),
    );
    host.insert("mask_bits".to_string(), Dynamic::Number(24.0));
    config
        .set_list(&AttributePath::new("allowed_host"), vec![Dynamic::Map(host)])
        .unwrap();

    let mut dns = HashMap::new();
    dns.insert(
        "address".to_string(),
        Dynamic::String("1.1.1.1".to_string()),
    );
    config
        .set_list(&AttributePath::new("dns_server"), vec![Dynamic::Map(dns)])
        .unwrap();

    let mut user = HashMap::new();
    user.insert(
        "name".to_string(),
        Dynamic::String("deployer".to_string()),
    );
    user.insert(
        "public_key".to_string(),
        Dynamic::String("ssh-ed25519 AAA".to_string()),
    );
    config
        .set_list(&AttributePath::new("ssh_user"), vec![Dynamic::Map(user)])
        .unwrap();
    config
}

#[tokio::test]
async fn create_surfaces_server_issued_sub_ids() {
    let mut server = mockito::Server::new_async().await;

    let create = server
        .mock("POST", "/api/v1/accessprofiles/create")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "name": "dev-profile",
            "httpProxy": "http://proxy.corp:3128",
            "allowedHosts": [
                {"description": "office", "address": "10.0.0.0", "maskBits": 24}
            ],
            "sshUsers": [{"name": "deployer", "sshPublicKey": "ssh-ed25519 AAA"}]
        })))
        .with_status(200)
        .with_body(r#"{"id":5}"#)
        .expect(1)
        .create_async()
        .await;
    let _list = server
        .mock("GET", "/api/v1/accessprofiles/list?id=5")
        .with_status(200)
        .with_body(profile_row_body())
        .create_async()
        .await;

    let resource = configured(&server).await;
    let config = declared_config();
    let response = resource
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "taikun_access_profile".to_string(),
                config: config.clone(),
                planned_state: config,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    create.assert_async().await;

    let state = response.new_state;
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "5");
    assert_eq!(
        state.get_string(&AttributePath::new("created_by")).unwrap(),
        "admin@corp"
    );
    let hosts = state
        .get_list_of_maps(&AttributePath::new("allowed_host"))
        .unwrap();
    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts[0]["id"].as_string(), Some("71"));
    let users = state
        .get_list_of_maps(&AttributePath::new("ssh_user"))
        .unwrap();
    assert_eq!(users[0]["id"].as_string(), Some("73"));
}

#[tokio::test]
async fn update_of_the_proxy_touches_only_the_edit_endpoint() {
    let mut server = mockito::Server::new_async().await;

    let edit = server
        .mock("POST", "/api/v1/accessprofiles/edit")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "id": 5,
            "name": "dev-profile",
            "httpProxy": "http://proxy.corp:8080"
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let _list = server
        .mock("GET", "/api/v1/accessprofiles/list?id=5")
        .with_status(200)
        .with_body(profile_row_body())
        .create_async()
        .await;

    let mut prior = declared_config();
    prior
        .set_string(&AttributePath::new("id"), "5".to_string())
        .unwrap();
    let mut planned = prior.clone();
    planned
        .set_string(
            &AttributePath::new("http_proxy"),
            "http://proxy.corp:8080".to_string(),
        )
        .unwrap();

    let resource = configured(&server).await;
    let response = resource
        .update(
            Context::new(),
            UpdateResourceRequest {
                type_name: "taikun_access_profile".to_string(),
                prior_state: prior,
                planned_state: planned.clone(),
                config: planned,
            },
        )
        .await;

    // an unchanged sub-collection must not trigger the wholesale
    // delete-and-recreate pass; those endpoints are not mocked, so any
    // call would surface as a diagnostic
    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    edit.assert_async().await;
}

#[tokio::test]
async fn delete_unlocks_a_locked_profile_first() {
    let mut server = mockito::Server::new_async().await;

    let unlock = server
        .mock("POST", "/api/v1/accessprofiles/lockmanager")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "id": 5,
            "mode": "unlock"
        })))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;
    let delete = server
        .mock("POST", "/api/v1/accessprofiles/delete")
        .match_body(Matcher::PartialJson(serde_json::json!({"id": 5})))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let mut prior = DynamicValue::empty_map();
    prior
        .set_string(&AttributePath::new("id"), "5".to_string())
        .unwrap();
    prior.set_bool(&AttributePath::new("lock"), true).unwrap();

    let resource = configured(&server).await;
    let response = resource
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: "taikun_access_profile".to_string(),
                prior_state: prior,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    unlock.assert_async().await;
    delete.assert_async().await;
}
