//! Data source reads against a scripted API.

mod common;

use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, DataSource, DataSourceWithConfigure, ReadDataSourceRequest,
};
use tfplug::types::{AttributePath, DynamicValue};

use taikun::data_sources::access_profile::AccessProfileDataSource;
use taikun::data_sources::flavors::FlavorsDataSource;
use taikun::data_sources::organization::OrganizationDataSource;

async fn configure<D: DataSourceWithConfigure>(data_source: &mut D, server: &mockito::Server) {
    let response = data_source
        .configure(
            Context::new(),
            ConfigureDataSourceRequest {
                provider_data: Some(common::provider_data(server)),
            },
        )
        .await;
    assert!(response.diagnostics.is_empty());
}

#[tokio::test]
async fn flavors_forward_cpu_bounds_and_report_ram_in_gib() {
    let mut server = mockito::Server::new_async().await;

    let _list = server
        .mock("GET", "/api/v1/flavors/7?limit=50&offset=0&startCpu=2&endCpu=8")
        .with_status(200)
        .with_body(
            r#"{"data":[{"name":"m1.small","cpu":2,"ram":4294967296}],"totalCount":1}"#,
        )
        .create_async()
        .await;

    let mut data_source = FlavorsDataSource::new();
    configure(&mut data_source, &server).await;

    let mut config = DynamicValue::empty_map();
    config
        .set_string(&AttributePath::new("cloud_credential_id"), "7".to_string())
        .unwrap();
    config
        .set_number(&AttributePath::new("min_cpu"), 2.0)
        .unwrap();
    config
        .set_number(&AttributePath::new("max_cpu"), 8.0)
        .unwrap();

    let response = data_source
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "taikun_flavors".to_string(),
                config,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    let state = response.state;
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "7");
    let flavors = state
        .get_list_of_maps(&AttributePath::new("flavors"))
        .unwrap();
    assert_eq!(flavors.len(), 1);
    assert_eq!(flavors[0]["name"].as_string(), Some("m1.small"));
    assert_eq!(flavors[0]["ram"].as_number(), Some(4.0));
}

#[tokio::test]
async fn organization_without_id_resolves_the_callers_org() {
    let mut server = mockito::Server::new_async().await;

    let _default = server
        .mock("GET", "/api/v1/organizations/default")
        .with_status(200)
        .with_body(r#"{"id":3,"name":"corp","fullName":"Corp Inc"}"#)
        .create_async()
        .await;

    let mut data_source = OrganizationDataSource::new();
    configure(&mut data_source, &server).await;

    let response = data_source
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "taikun_organization".to_string(),
                config: DynamicValue::empty_map(),
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    let state = response.state;
    assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "3");
    assert_eq!(state.get_string(&AttributePath::new("name")).unwrap(), "corp");
    // no discount on the row means full price
    assert_eq!(
        state
            .get_number(&AttributePath::new("discount_rate"))
            .unwrap(),
        100.0
    );
}

#[tokio::test]
async fn access_profile_is_looked_up_by_id() {
    let mut server = mockito::Server::new_async().await;

    let _list = server
        .mock("GET", "/api/v1/accessprofiles/list?id=5")
        .with_status(200)
        .with_body(
            serde_json::json!({
                "data": [{
                    "id": 5,
                    "name": "dev-profile",
                    "httpProxy": "http://proxy.corp:3128",
                    "isLocked": false,
                    "allowedHosts": [
                        {"id": 71, "description": "office", "address": "10.0.0.0", "maskBits": 24}
                    ],
                    "dnsServers": [],
                    "ntpServers": [],
                    "sshUsers": []
                }],
                "totalCount": 1
            })
            .to_string(),
        )
        .create_async()
        .await;

    let mut data_source = AccessProfileDataSource::new();
    configure(&mut data_source, &server).await;

    let mut config = DynamicValue::empty_map();
    config
        .set_string(&AttributePath::new("id"), "5".to_string())
        .unwrap();

    let response = data_source
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "taikun_access_profile".to_string(),
                config,
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    let state = response.state;
    assert_eq!(
        state.get_string(&AttributePath::new("name")).unwrap(),
        "dev-profile"
    );
    let hosts = state
        .get_list_of_maps(&AttributePath::new("allowed_host"))
        .unwrap();
    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts[0]["address"].as_string(), Some("10.0.0.0"));
}
