//! taikun_access_profile data source

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
use crate::resources::access_profile::{access_profile_schema, flatten};
use crate::resources::{api_error_diag, provider_data_from, required_id};
use crate::utils::{datasource_schema_from_resource_schema, mark_required};

#[derive(Default)]
pub struct AccessProfileDataSource {
    provider_data: Option<TaikunProviderData>,
}

impl AccessProfileDataSource {
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
impl DataSource for AccessProfileDataSource {
    fn type_name(&self) -> &str {
        "taikun_access_profile"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: mark_required(
                datasource_schema_from_resource_schema(&access_profile_schema()),
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
                .access_profiles()
                .by_id(id)
                .await?
                .ok_or_else(|| ApiError::Validation(format!("access profile {} not found", id)))?;
            flatten(&row)
        }
        .await;

        match result {
            Ok(state) => ReadDataSourceResponse {
                state,
                diagnostics: vec![],
            },
            Err(e) => ReadDataSourceResponse {
                state: request.config,
                diagnostics: vec![api_error_diag("Failed to read access profile", &e)],
            },
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for AccessProfileDataSource {
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
