//! Shared harness for the HTTP acceptance tests: a client pointed at a
//! mockito server, wrapped in provider data the way the provider's
//! configure step would hand it out.

use std::sync::{Arc, Once};

use taikun::api::{Client, Credentials};
use taikun::provider_data::TaikunProviderData;

static TRACING: Once = Once::new();

pub fn provider_data(server: &mockito::Server) -> Arc<TaikunProviderData> {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
    let client = Client::with_preauthorized_token(
        &server.url(),
        &server.url(),
        Credentials::UserPassword {
            email: "dev@example.com".to_string(),
            password: "secret".to_string(),
        },
        "test-token",
    )
    .unwrap();
    Arc::new(TaikunProviderData::new(client))
}
