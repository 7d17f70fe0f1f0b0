//! Provider data handed to every resource and data source

use crate::api::Client;
use std::sync::Arc;

#[derive(Clone)]
pub struct TaikunProviderData {
    pub client: Arc<Client>,
}

impl TaikunProviderData {
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}
