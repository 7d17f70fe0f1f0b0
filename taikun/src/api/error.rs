use thiserror::Error;

/// Error taxonomy for the Taikun API façade.
///
/// Only `NotFoundAfterCreateOrUpdate` is ever retried; everything else
/// surfaces to the user as-is.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network failure reaching the API, returned verbatim
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Non-2xx response with the decoded server error body
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Authentication failed")]
    Auth,

    /// Malformed attribute or conflicting configuration, raised pre-call
    #[error("validation error: {0}")]
    Validation(String),

    /// A list call for a just-written id returned zero rows; retried by
    /// the read-after-write loop and never shown to the user unless the
    /// deadline exhausts
    #[error("resource not yet visible after create or update")]
    NotFoundAfterCreateOrUpdate,

    /// A poll loop's deadline exhausted before the entity reached the
    /// expected state
    #[error("timed out waiting for {entity} to reach {target}")]
    Timeout { entity: String, target: String },

    #[error("failed to parse response: {0}")]
    Parse(String),

    /// Terraform state assembly failure (wrong type at a path, bad encoding)
    #[error("state error: {0}")]
    State(#[from] tfplug::error::TfplugError),
}

impl ApiError {
    pub fn timeout(entity: impl Into<String>, target: impl Into<String>) -> Self {
        ApiError::Timeout {
            entity: entity.into(),
            target: target.into(),
        }
    }

    pub fn is_retryable_read(&self) -> bool {
        matches!(self, ApiError::NotFoundAfterCreateOrUpdate)
    }
}
