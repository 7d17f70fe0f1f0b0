//! tfplug - host-engine interface types for Terraform providers in Rust
//!
//! The wire protocol, state store and diff engine live in the host; this
//! crate carries the types a provider programs against: the dynamic value
//! tree, schemas, validators, plan modifiers and the resource/data-source
//! traits.

pub mod context;
pub mod data_source;
pub mod error;
pub mod plan_modifier;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod types;
pub mod validator;

pub use context::Context;
pub use data_source::{DataSource, DataSourceWithConfigure};
pub use error::{Result, TfplugError};
pub use provider::Provider;
pub use resource::{Resource, ResourceWithConfigure};
pub use schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
pub use types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
