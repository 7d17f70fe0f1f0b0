//! Taikun API façade: one authenticated [`client::Client`] plus typed
//! sub-clients per resource family. All wire structs live next to the
//! sub-client that sends them.

pub mod applications;
pub mod backup;
pub mod billing;
pub mod catalogs;
pub mod client;
pub mod cloud_credentials;
pub mod common;
pub mod error;
pub mod flavors;
pub mod kubeconfigs;
pub mod organizations;
pub mod profiles;
pub mod projects;
pub mod repositories;
pub mod servers;
pub mod slack;
pub mod standalone;
pub mod users;

pub use client::{Client, Credentials, DEFAULT_API_HOST};
pub use common::{ApiListResponse, IdResponse, KeyValuePair, LockManagerCommand, LockMode, QueryParams};
pub use error::ApiError;
