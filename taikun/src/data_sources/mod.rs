//! Read-only data sources, most of them derived from the matching
//! resource schema with the lookup key re-marked.

pub mod access_profile;
pub mod cloud_credential_openstack;
pub mod flavors;
pub mod images;
pub mod organization;
pub mod project;
