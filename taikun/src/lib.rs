//! Terraform provider for the Taikun cloud-management platform.
//!
//! The host engine owns the wire protocol, state store and diff engine;
//! this crate supplies the provider root, the resource and data-source
//! handlers and the Taikun API client they share.

pub mod api;
pub mod data_sources;
pub mod provider_data;
pub mod resources;
pub mod utils;

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::DataSourceWithConfigure;
use tfplug::provider::{ConfigureProviderRequest, ConfigureProviderResponse, Provider};
use tfplug::resource::ResourceWithConfigure;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{Diagnostic, DynamicValue};
use tfplug::TfplugError;

use crate::api::client::{Client, Credentials, DEFAULT_API_HOST};
use crate::provider_data::TaikunProviderData;
use crate::resources::opt_string;
use crate::utils::{
    datasource_schema_from_resource_schema, mark_optional, mark_required,
};

#[derive(Default)]
pub struct TaikunProvider;

impl TaikunProvider {
    pub fn new() -> Self {
        Self
    }
}

fn provider_schema() -> Schema {
    SchemaBuilder::new()
        .description("Taikun provider configuration")
        .attribute(
            AttributeBuilder::new("api_host", AttributeType::String)
                .description("Taikun API host, hostname or full URL.")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("email", AttributeType::String)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("password", AttributeType::String)
                .optional()
                .sensitive()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("keycloak_email", AttributeType::String)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("keycloak_password", AttributeType::String)
                .optional()
                .sensitive()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("access_key", AttributeType::String)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("secret_key", AttributeType::String)
                .optional()
                .sensitive()
                .build(),
        )
        .build()
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Resolves the API host and exactly one credential mode from the
/// provider block, falling back to TAIKUN_* environment variables
/// attribute by attribute. Declaring two modes is an error.
fn resolve_credentials(config: &DynamicValue) -> Result<(String, Credentials), Diagnostic> {
    let pick = |attr: &str, var: &str| opt_string(config, attr).or_else(|| env_var(var));

    let api_host = pick("api_host", "TAIKUN_API_HOST").unwrap_or_else(|| DEFAULT_API_HOST.to_string());

    let pair = |a: Option<String>, b: Option<String>, a_name: &str, b_name: &str| match (a, b) {
        (Some(a), Some(b)) => Ok(Some((a, b))),
        (None, None) => Ok(None),
        (Some(_), None) => Err(format!("{} is set but {} is missing", a_name, b_name)),
        (None, Some(_)) => Err(format!("{} is set but {} is missing", b_name, a_name)),
    };

    let partial = |detail: String| Diagnostic::error("Incomplete credentials", &detail);

    let user_password = pair(
        pick("email", "TAIKUN_EMAIL"),
        pick("password", "TAIKUN_PASSWORD"),
        "email",
        "password",
    )
    .map_err(partial)?;
    let keycloak = pair(
        pick("keycloak_email", "TAIKUN_KEYCLOAK_EMAIL"),
        pick("keycloak_password", "TAIKUN_KEYCLOAK_PASSWORD"),
        "keycloak_email",
        "keycloak_password",
    )
    .map_err(partial)?;
    let access_key = pair(
        pick("access_key", "TAIKUN_ACCESS_KEY"),
        pick("secret_key", "TAIKUN_SECRET_KEY"),
        "access_key",
        "secret_key",
    )
    .map_err(partial)?;

    let declared =
        [user_password.is_some(), keycloak.is_some(), access_key.is_some()]
            .iter()
            .filter(|set| **set)
            .count();
    if declared > 1 {
        return Err(Diagnostic::error(
            "Conflicting credentials",
            "declare exactly one of email/password, keycloak_email/keycloak_password or access_key/secret_key",
        ));
    }

    let credentials = if let Some((email, password)) = keycloak {
        Credentials::Keycloak { email, password }
    } else if let Some((email, password)) = user_password {
        Credentials::UserPassword { email, password }
    } else if let Some((access_key, secret_key)) = access_key {
        Credentials::AccessKey {
            access_key,
            secret_key,
        }
    } else {
        return Err(Diagnostic::error(
            "Missing credentials",
            "set one credential pair in the provider block or the TAIKUN_* environment variables",
        ));
    };

    Ok((api_host, credentials))
}

#[async_trait]
impl Provider for TaikunProvider {
    async fn schema(&self, _ctx: Context) -> Schema {
        provider_schema()
    }

    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        let (api_host, credentials) = match resolve_credentials(&request.config) {
            Ok(resolved) => resolved,
            Err(diag) => {
                return ConfigureProviderResponse {
                    provider_data: None,
                    diagnostics: vec![diag],
                }
            }
        };

        tracing::debug!("configuring Taikun provider against {}", api_host);
        match Client::new(&api_host, credentials) {
            Ok(client) => ConfigureProviderResponse {
                provider_data: Some(Arc::new(TaikunProviderData::new(client))),
                diagnostics: vec![],
            },
            Err(e) => ConfigureProviderResponse {
                provider_data: None,
                diagnostics: vec![Diagnostic::error(
                    "Failed to build API client",
                    &e.to_string(),
                )],
            },
        }
    }

    async fn create_resource(&self, name: &str) -> tfplug::Result<Box<dyn ResourceWithConfigure>> {
        use resources::*;

        Ok(match name {
            "taikun_access_profile" => Box::new(access_profile::AccessProfileResource::new()),
            "taikun_alerting_profile" => Box::new(alerting_profile::AlertingProfileResource::new()),
            "taikun_app_instance" => Box::new(app_instance::AppInstanceResource::new()),
            "taikun_backup_credential" => {
                Box::new(backup_credential::BackupCredentialResource::new())
            }
            "taikun_billing_credential" => {
                Box::new(billing_credential::BillingCredentialResource::new())
            }
            "taikun_billing_rule" => Box::new(billing_rule::BillingRuleResource::new()),
            "taikun_catalog" => Box::new(catalog::CatalogResource::new()),
            "taikun_catalog_project_binding" => {
                Box::new(catalog_project_binding::CatalogProjectBindingResource::new())
            }
            "taikun_cloud_credential_aws" => {
                Box::new(cloud_credentials::aws::AwsCredentialResource::new())
            }
            "taikun_cloud_credential_azure" => {
                Box::new(cloud_credentials::azure::AzureCredentialResource::new())
            }
            "taikun_cloud_credential_gcp" => {
                Box::new(cloud_credentials::gcp::GcpCredentialResource::new())
            }
            "taikun_cloud_credential_openstack" => {
                Box::new(cloud_credentials::openstack::OpenstackCredentialResource::new())
            }
            "taikun_cloud_credential_proxmox" => {
                Box::new(cloud_credentials::proxmox::ProxmoxCredentialResource::new())
            }
            "taikun_cloud_credential_vsphere" => {
                Box::new(cloud_credentials::vsphere::VsphereCredentialResource::new())
            }
            "taikun_cloud_credential_zadara" => {
                Box::new(cloud_credentials::zadara::ZadaraCredentialResource::new())
            }
            "taikun_kubeconfig" => Box::new(kubeconfig::KubeconfigResource::new()),
            "taikun_kubernetes_profile" => {
                Box::new(kubernetes_profile::KubernetesProfileResource::new())
            }
            "taikun_organization" => Box::new(organization::OrganizationResource::new()),
            "taikun_policy_profile" => Box::new(policy_profile::PolicyProfileResource::new()),
            "taikun_project" => Box::new(project::ProjectResource::new()),
            "taikun_repository" => Box::new(repository::RepositoryResource::new()),
            "taikun_showback_rule" => Box::new(showback_rule::ShowbackRuleResource::new()),
            "taikun_slack_configuration" => Box::new(slack_config::SlackConfigResource::new()),
            "taikun_standalone_profile" => {
                Box::new(standalone_profile::StandaloneProfileResource::new())
            }
            "taikun_user" => Box::new(user::UserResource::new()),
            _ => return Err(TfplugError::ResourceNotFound(name.to_string())),
        })
    }

    async fn create_data_source(
        &self,
        name: &str,
    ) -> tfplug::Result<Box<dyn DataSourceWithConfigure>> {
        use data_sources::*;

        Ok(match name {
            "taikun_access_profile" => Box::new(access_profile::AccessProfileDataSource::new()),
            "taikun_cloud_credential_openstack" => {
                Box::new(cloud_credential_openstack::OpenstackCredentialDataSource::new())
            }
            "taikun_flavors" => Box::new(flavors::FlavorsDataSource::new()),
            "taikun_images" => Box::new(images::ImagesDataSource::new()),
            "taikun_organization" => Box::new(organization::OrganizationDataSource::new()),
            "taikun_project" => Box::new(project::ProjectDataSource::new()),
            _ => return Err(TfplugError::DataSourceNotFound(name.to_string())),
        })
    }

    async fn resource_schemas(&self) -> HashMap<String, Schema> {
        static SCHEMAS: OnceLock<HashMap<String, Schema>> = OnceLock::new();

        SCHEMAS
            .get_or_init(|| {
                use resources::*;

                HashMap::from([
                    (
                        "taikun_access_profile".to_string(),
                        access_profile::access_profile_schema(),
                    ),
                    (
                        "taikun_alerting_profile".to_string(),
                        alerting_profile::alerting_profile_schema(),
                    ),
                    (
                        "taikun_app_instance".to_string(),
                        app_instance::app_instance_schema(),
                    ),
                    (
                        "taikun_backup_credential".to_string(),
                        backup_credential::backup_credential_schema(),
                    ),
                    (
                        "taikun_billing_credential".to_string(),
                        billing_credential::billing_credential_schema(),
                    ),
                    (
                        "taikun_billing_rule".to_string(),
                        billing_rule::billing_rule_schema(),
                    ),
                    ("taikun_catalog".to_string(), catalog::catalog_schema()),
                    (
                        "taikun_catalog_project_binding".to_string(),
                        catalog_project_binding::catalog_project_binding_schema(),
                    ),
                    (
                        "taikun_cloud_credential_aws".to_string(),
                        cloud_credentials::aws::aws_credential_schema(),
                    ),
                    (
                        "taikun_cloud_credential_azure".to_string(),
                        cloud_credentials::azure::azure_credential_schema(),
                    ),
                    (
                        "taikun_cloud_credential_gcp".to_string(),
                        cloud_credentials::gcp::gcp_credential_schema(),
                    ),
                    (
                        "taikun_cloud_credential_openstack".to_string(),
                        cloud_credentials::openstack::openstack_credential_schema(),
                    ),
                    (
                        "taikun_cloud_credential_proxmox".to_string(),
                        cloud_credentials::proxmox::proxmox_credential_schema(),
                    ),
                    (
                        "taikun_cloud_credential_vsphere".to_string(),
                        cloud_credentials::vsphere::vsphere_credential_schema(),
                    ),
                    (
                        "taikun_cloud_credential_zadara".to_string(),
                        cloud_credentials::zadara::zadara_credential_schema(),
                    ),
                    (
                        "taikun_kubeconfig".to_string(),
                        kubeconfig::kubeconfig_schema(),
                    ),
                    (
                        "taikun_kubernetes_profile".to_string(),
                        kubernetes_profile::kubernetes_profile_schema(),
                    ),
                    (
                        "taikun_organization".to_string(),
                        organization::organization_schema(),
                    ),
                    (
                        "taikun_policy_profile".to_string(),
                        policy_profile::policy_profile_schema(),
                    ),
                    ("taikun_project".to_string(), project::project_schema()),
                    (
                        "taikun_repository".to_string(),
                        repository::repository_schema(),
                    ),
                    (
                        "taikun_showback_rule".to_string(),
                        showback_rule::showback_rule_schema(),
                    ),
                    (
                        "taikun_slack_configuration".to_string(),
                        slack_config::slack_config_schema(),
                    ),
                    (
                        "taikun_standalone_profile".to_string(),
                        standalone_profile::standalone_profile_schema(),
                    ),
                    ("taikun_user".to_string(), user::user_schema()),
                ])
            })
            .clone()
    }

    async fn data_source_schemas(&self) -> HashMap<String, Schema> {
        static SCHEMAS: OnceLock<HashMap<String, Schema>> = OnceLock::new();

        SCHEMAS
            .get_or_init(|| {
                HashMap::from([
                    (
                        "taikun_access_profile".to_string(),
                        mark_required(
                            datasource_schema_from_resource_schema(
                                &resources::access_profile::access_profile_schema(),
                            ),
                            "id",
                        ),
                    ),
                    (
                        "taikun_cloud_credential_openstack".to_string(),
                        mark_required(
                            datasource_schema_from_resource_schema(
                                &resources::cloud_credentials::openstack::openstack_credential_schema(),
                            ),
                            "id",
                        ),
                    ),
                    (
                        "taikun_flavors".to_string(),
                        data_sources::flavors::flavors_schema(),
                    ),
                    (
                        "taikun_images".to_string(),
                        data_sources::images::images_schema(),
                    ),
                    (
                        "taikun_organization".to_string(),
                        mark_optional(
                            datasource_schema_from_resource_schema(
                                &resources::organization::organization_schema(),
                            ),
                            "id",
                        ),
                    ),
                    (
                        "taikun_project".to_string(),
                        mark_required(
                            datasource_schema_from_resource_schema(
                                &resources::project::project_schema(),
                            ),
                            "id",
                        ),
                    ),
                ])
            })
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tfplug::types::AttributePath;

    const TAIKUN_VARS: &[&str] = &[
        "TAIKUN_API_HOST",
        "TAIKUN_EMAIL",
        "TAIKUN_PASSWORD",
        "TAIKUN_KEYCLOAK_EMAIL",
        "TAIKUN_KEYCLOAK_PASSWORD",
        "TAIKUN_ACCESS_KEY",
        "TAIKUN_SECRET_KEY",
    ];

    fn clear_env() {
        for var in TAIKUN_VARS {
            std::env::remove_var(var);
        }
    }

    fn config_with(pairs: &[(&str, &str)]) -> DynamicValue {
        let mut config = DynamicValue::empty_map();
        for (attr, value) in pairs {
            config
                .set_string(&AttributePath::new(attr), value.to_string())
                .unwrap();
        }
        config
    }

    #[test]
    #[serial]
    fn resolve_defaults_the_api_host() {
        clear_env();
        let config = config_with(&[("email", "dev@example.com"), ("password", "pw")]);
        let (host, credentials) = resolve_credentials(&config).unwrap();
        assert_eq!(host, DEFAULT_API_HOST);
        assert!(matches!(credentials, Credentials::UserPassword { .. }));
    }

    #[test]
    #[serial]
    fn resolve_rejects_two_credential_modes() {
        clear_env();
        let config = config_with(&[
            ("email", "dev@example.com"),
            ("password", "pw"),
            ("access_key", "ak"),
            ("secret_key", "sk"),
        ]);
        let diag = resolve_credentials(&config).unwrap_err();
        assert_eq!(diag.summary, "Conflicting credentials");
    }

    #[test]
    #[serial]
    fn resolve_rejects_a_partial_pair() {
        clear_env();
        let config = config_with(&[("keycloak_email", "dev@example.com")]);
        let diag = resolve_credentials(&config).unwrap_err();
        assert_eq!(diag.summary, "Incomplete credentials");
    }

    #[test]
    #[serial]
    fn resolve_requires_some_credentials() {
        clear_env();
        let diag = resolve_credentials(&DynamicValue::empty_map()).unwrap_err();
        assert_eq!(diag.summary, "Missing credentials");
    }

    #[test]
    #[serial]
    fn resolve_falls_back_to_environment_variables() {
        clear_env();
        std::env::set_var("TAIKUN_API_HOST", "api.taikun.dev");
        std::env::set_var("TAIKUN_ACCESS_KEY", "ak");
        std::env::set_var("TAIKUN_SECRET_KEY", "sk");

        let (host, credentials) = resolve_credentials(&DynamicValue::empty_map()).unwrap();
        assert_eq!(host, "api.taikun.dev");
        assert!(matches!(credentials, Credentials::AccessKey { .. }));

        clear_env();
    }

    #[tokio::test]
    async fn factories_cover_every_registered_type() {
        let provider = TaikunProvider::new();
        for name in provider.resource_schemas().await.keys() {
            assert!(provider.create_resource(name).await.is_ok(), "{}", name);
        }
        for name in provider.data_source_schemas().await.keys() {
            assert!(provider.create_data_source(name).await.is_ok(), "{}", name);
        }
        assert!(provider.create_resource("taikun_bogus").await.is_err());
    }
}
