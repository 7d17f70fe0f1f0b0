//! taikun_organization data source
//!
//! Without an id it resolves the caller's own organization.

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
use crate::resources::organization::{flatten, organization_schema};
use crate::resources::{api_error_diag, opt_id, provider_data_from};
use crate::utils::{datasource_schema_from_resource_schema, mark_optional};

#[derive(Default)]
pub struct OrganizationDataSource {
    provider_data: Option<TaikunProviderData>,
}

impl OrganizationDataSource {
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
impl DataSource for OrganizationDataSource {
    fn type_name(&self) -> &str {
        "taikun_organization"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: mark_optional(
                datasource_schema_from_resource_schema(&organization_schema()),
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
            let row = match opt_id(&request.config, "id")? {
                Some(id) => data
                    .client
                    .organizations()
                    .by_id(id)
                    .await?
                    .ok_or_else(|| {
                        ApiError::Validation(format!("organization {} not found", id))
                    })?,
                None => data.client.organizations().default_organization().await?,
            };
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
                diagnostics: vec![api_error_diag("Failed to read organization", &e)],
            },
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for OrganizationDataSource {
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
