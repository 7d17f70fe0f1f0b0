//! taikun_flavors data source
//!
//! Lists the flavors a cloud credential offers, filtered by CPU and RAM
//! bounds. RAM bounds are declared in GiB and sent as bytes with a
//! small tolerance so exact GiB values survive the server's rounding.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse, ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, NestingMode, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::NumberRangeValidator;

use crate::api::ApiError;
use crate::provider_data::TaikunProviderData;
use crate::resources::{api_error_diag, opt_number, provider_data_from, required_id};
use crate::utils::{bytes_to_gib, i32toa, tolerance_bounds, GIB};

#[derive(Default)]
pub struct FlavorsDataSource {
    provider_data: Option<TaikunProviderData>,
}

impl FlavorsDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn data(&self) -> Result<&TaikunProviderData, ApiError> {
        self.provider_data
            .as_ref()
            .ok_or_else(|| ApiError::Validation("provider not configured".to_string()))
    }
}

fn ram_bounds_bytes(config: &DynamicValue) -> (Option<f64>, Option<f64>) {
    tolerance_bounds(
        opt_number(config, "min_ram").map(|gib| gib * GIB as f64),
        opt_number(config, "max_ram").map(|gib| gib * GIB as f64),
    )
}

pub fn flavors_schema() -> Schema {
    SchemaBuilder::new()
        .description("Flavors offered by a cloud credential")
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
            AttributeBuilder::new("min_cpu", AttributeType::Number)
                .optional()
                .validator(Arc::new(NumberRangeValidator {
                    min: Some(2.0),
                    max: Some(36.0),
                }))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("max_cpu", AttributeType::Number)
                .optional()
                .validator(Arc::new(NumberRangeValidator {
                    min: Some(2.0),
                    max: Some(36.0),
                }))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("min_ram", AttributeType::Number)
                .description("Lower RAM bound in GiB.")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("max_ram", AttributeType::Number)
                .description("Upper RAM bound in GiB.")
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new(
                "flavors",
                AttributeType::List(Box::new(AttributeType::Object(HashMap::new()))),
            )
            .computed()
            .nested(
                vec![
                    AttributeBuilder::new("name", AttributeType::String)
                        .computed()
                        .build(),
                    AttributeBuilder::new("cpu", AttributeType::Number)
                        .computed()
                        .build(),
                    AttributeBuilder::new("ram", AttributeType::Number)
                        .description("RAM in GiB.")
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
impl DataSource for FlavorsDataSource {
    fn type_name(&self) -> &str {
        "taikun_flavors"
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: flavors_schema(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        let mut diagnostics = vec![];
        if let (Some(min), Some(max)) = (
            opt_number(&request.config, "min_cpu"),
            opt_number(&request.config, "max_cpu"),
        ) {
            if min > max {
                diagnostics.push(Diagnostic::error(
                    "Inverted CPU bounds",
                    "min_cpu must not exceed max_cpu",
                ));
            }
        }
        if let (Some(min), Some(max)) = (
            opt_number(&request.config, "min_ram"),
            opt_number(&request.config, "max_ram"),
        ) {
            if min > max {
                diagnostics.push(Diagnostic::error(
                    "Inverted RAM bounds",
                    "min_ram must not exceed max_ram",
                ));
            }
        }
        ValidateDataSourceConfigResponse { diagnostics }
    }

    async fn read(&self, _ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let result: Result<DynamicValue, ApiError> = async {
            let data = self.data()?;
            let config = &request.config;
            let credential_id = required_id(config, "cloud_credential_id")?;
            let (min_ram, max_ram) = ram_bounds_bytes(config);
            let rows = data
                .client
                .flavors()
                .list_for_credential(
                    credential_id,
                    opt_number(config, "min_cpu").map(|v| v as i32),
                    opt_number(config, "max_cpu").map(|v| v as i32),
                    min_ram,
                    max_ram,
                )
                .await?;

            let mut state = config.clone();
            state.set_string(&AttributePath::new("id"), i32toa(credential_id))?;
            state.set_list(
                &AttributePath::new("flavors"),
                rows.into_iter()
                    .map(|row| {
                        let mut map = HashMap::new();
                        map.insert("name".to_string(), Dynamic::String(row.name));
                        map.insert("cpu".to_string(), Dynamic::Number(row.cpu as f64));
                        map.insert(
                            "ram".to_string(),
                            Dynamic::Number(bytes_to_gib(row.ram) as f64),
                        );
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
                diagnostics: vec![api_error_diag("Failed to list flavors", &e)],
            },
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for FlavorsDataSource {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ram_bounds_convert_gib_and_widen() {
        let mut config = DynamicValue::empty_map();
        config
            .set_number(&AttributePath::new("min_ram"), 4.0)
            .unwrap();
        config
            .set_number(&AttributePath::new("max_ram"), 8.0)
            .unwrap();

        let (min, max) = ram_bounds_bytes(&config);
        let four_gib = 4.0 * GIB as f64;
        let eight_gib = 8.0 * GIB as f64;
        assert!(min.unwrap() < four_gib);
        assert!(max.unwrap() > eight_gib);
        assert!((min.unwrap() - four_gib).abs() / four_gib < 1e-3);
    }

    #[test]
    fn ram_bounds_pass_through_unset() {
        let (min, max) = ram_bounds_bytes(&DynamicValue::empty_map());
        assert_eq!(min, None);
        assert_eq!(max, None);
    }
}
