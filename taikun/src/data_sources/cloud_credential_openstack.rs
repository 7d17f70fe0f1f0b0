//! taikun_cloud_credential_openstack data source

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse, ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::types::DynamicValue;

use crate::api::ApiError;
use crate::provider_data::TaikunProviderData;
use crate::resources::cloud_credentials::openstack::{flatten, openstack_credential_schema};
use crate::resources::{api_error_diag, provider_data_from, required_id};
use crate::utils::{datasource_schema_from_resource_schema, mark_required};

#[derive(Default)]
pub struct OpenstackCredentialDataSource {
    provider_data: Option<TaikunProviderData>,
}

impl OpenstackCredentialDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> Result<&TaikunProviderData, ApiError> {
        self.provider_data
            .as_ref()
            .ok_or_else(|| ApiError::Validation("provider not configured".to_string()))
    }
}

#[async_trait]
impl DataSource for OpenstackCredentialDataSource {
    fn type_name(&self) -> &str {
        "taikun_cloud_credential_openstack"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: mark_required(
                datasource_schema_from_resource_schema(&openstack_credential_schema()),
                "id",
            ),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        _request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse { diagnostics: vec![] }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let id = required_id(&request.config, "id")?;
            let row = data
                .client
                .cloud_credentials()
                .by_id(id)
                .await?
                .ok_or_else(|| {
                    ApiError::Validation(format!("cloud credential {} not found", id))
                })?;
            if !row.cloud_type.eq_ignore_ascii_case("openstack") {
                return Err(ApiError::Validation(format!(
                    "cloud credential {} is {}, not openstack",
                    id, row.cloud_type
                )));
            }
            flatten(&row, &request.config)
        }
        .await;

        match result {
            Ok(state) => ReadDataSourceResponse {
                state,
                diagnostics: vec![],
            },
            Err(e) => ReadDataSourceResponse {
                state: request.config,
                diagnostics: vec![api_error_diag("Failed to read cloud credential", &e)],
            },
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for OpenstackCredentialDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        match provider_data_from(&request.provider_data) {
            Ok(data) => {
                self.provider_data = Some(data);
                ConfigureDataSourceResponse { diagnostics: vec![] }
            }
            Err(diag) => ConfigureDataSourceResponse {
                diagnostics: vec![diag],
            },
        }
    }
}
