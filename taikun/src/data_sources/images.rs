//! taikun_images data source

use std::collections::HashMap;

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse, ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, NestingMode, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Dynamic, DynamicValue};

use crate::api::ApiError;
use crate::provider_data::TaikunProviderData;
use crate::resources::{api_error_diag, bool_or, provider_data_from, required_id};
use crate::utils::i32toa;

#[derive(Default)]
pub struct ImagesDataSource {
    provider_data: Option<TaikunProviderData>,
}

impl ImagesDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> Result<&TaikunProviderData, ApiError> {
        self.provider_data
            .as_ref()
            .ok_or_else(|| ApiError::Validation("provider not configured".to_string()))
    }
}

pub fn images_schema() -> Schema {
    SchemaBuilder::new()
        .description("Images offered by a cloud credential")
        .attribute(
            AttributeBuilder::new("id", AttributeType::String)
                .computed()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("cloud_credential_id", AttributeType::String)
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("personal", AttributeType::Bool)
                .description("List personal images instead of the public catalogue.")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "images",
                AttributeType::List(Box::new(AttributeType::Object(HashMap::new()))),
            )
            .computed()
            .nested(
                vec![
                    AttributeBuilder::new("id", AttributeType::String)
                        .computed()
                        .build(),
                    AttributeBuilder::new("name", AttributeType::String)
                        .computed()
                        .build(),
                ],
                NestingMode::List,
            )
            .build(),
        )
        .build()
}

#[async_trait]
impl DataSource for ImagesDataSource {
    fn type_name(&self) -> &str {
        "taikun_images"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: images_schema(),
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
            let config = &request.config;
            let credential_id = required_id(config, "cloud_credential_id")?;
            let rows = data
                .client
                .images()
                .list_for_credential(credential_id, bool_or(config, "personal", false))
                .await?;

            let mut state = config.clone();
            state.set_string(&AttributePath::new("id"), i32toa(credential_id))?;
            state.set_list(
                &AttributePath::new("images"),
                rows.into_iter()
                    .map(|row| {
                        let mut map = HashMap::new();
                        map.insert("id".to_string(), Dynamic::String(row.id));
                        map.insert("name".to_string(), Dynamic::String(row.name));
                        Dynamic::Map(map)
                    })
                    .collect(),
            )?;
            Ok(state)
        }
        .await;

        match result {
            Ok(state) => ReadDataSourceResponse {
                state,
                diagnostics: vec![],
            },
            Err(e) => ReadDataSourceResponse {
                state: request.config,
                diagnostics: vec![api_error_diag("Failed to list images", &e)],
            },
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for ImagesDataSource {
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
