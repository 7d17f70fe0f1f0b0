//! Provider trait: configuration plus resource/data-source factories

use crate::context::Context;
use crate::data_source::DataSourceWithConfigure;
use crate::resource::ResourceWithConfigure;
use crate::schema::Schema;
use crate::types::{Diagnostic, DynamicValue};
use crate::Result;
use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait Provider: Send + Sync {
    /// Schema of the provider configuration block.
    async fn schema(&self, ctx: Context) -> Schema;

    /// Parse credentials, build clients, return the shared provider data
    /// handed to every resource and data source.
    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse;

    /// Instantiate a resource by type name.
    async fn create_resource(&self, name: &str) -> Result<Box<dyn ResourceWithConfigure>>;

    /// Instantiate a data source by type name.
    async fn create_data_source(&self, name: &str) -> Result<Box<dyn DataSourceWithConfigure>>;

    /// Registry of resource schemas, keyed by type name.
    async fn resource_schemas(&self) -> HashMap<String, Schema>;

    /// Registry of data source schemas, keyed by type name.
    async fn data_source_schemas(&self) -> HashMap<String, Schema>;
}

pub struct ConfigureProviderRequest {
    pub config: DynamicValue,
}

pub struct ConfigureProviderResponse {
    pub provider_data: Option<Arc<dyn Any + Send + Sync>>,
    pub diagnostics: Vec<Diagnostic>,
}
