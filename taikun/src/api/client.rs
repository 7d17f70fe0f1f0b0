use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::error::ApiError;

pub const DEFAULT_API_HOST: &str = "api.taikun.cloud";

/// Exclusive credential modes accepted by the provider (spec: supplying
/// two modes at once is a user-config error, enforced at the provider
/// root before a Client is ever built).
#[derive(Debug, Clone)]
pub enum Credentials {
    UserPassword { email: String, password: String },
    Keycloak { email: String, password: String },
    AccessKey { access_key: String, secret_key: String },
}

impl Credentials {
    /// Auth mode string sent with the login command.
    pub fn mode(&self) -> &'static str {
        match self {
            Credentials::UserPassword { .. } => "",
            Credentials::Keycloak { .. } => "keycloak",
            Credentials::AccessKey { .. } => "token",
        }
    }

    fn login_command(&self) -> LoginCommand {
        match self {
            Credentials::UserPassword { email, password }
            | Credentials::Keycloak { email, password } => LoginCommand {
                email: Some(email.clone()),
                password: Some(password.clone()),
                access_key: None,
                secret_key: None,
                mode: self.mode().to_string(),
            },
            Credentials::AccessKey {
                access_key,
                secret_key,
            } => LoginCommand {
                email: None,
                password: None,
                access_key: Some(access_key.clone()),
                secret_key: Some(secret_key.clone()),
                mode: self.mode().to_string(),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginCommand {
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    access_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret_key: Option<String>,
    mode: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    token: String,
}

/// Error body shape returned by the Taikun API.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    detail: Option<String>,
}

/// Taikun API client: holds credentials, a bearer token refreshed on
/// demand, and the base URLs for the main and showback APIs.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: reqwest::Client,
    base_url: String,
    showback_url: String,
    credentials: Credentials,
    token: RwLock<Option<String>>,
}

impl Client {
    /// Build a client against `api_host` (bare hostname or full URL).
    pub fn new(api_host: &str, credentials: Credentials) -> Result<Self, ApiError> {
        let base_url = if api_host.starts_with("http://") || api_host.starts_with("https://") {
            api_host.trim_end_matches('/').to_string()
        } else {
            format!("https://{}", api_host.trim_end_matches('/'))
        };
        let showback_url = format!("{}/showback", base_url);
        Self::with_urls(&base_url, &showback_url, credentials)
    }

    /// Build a client with explicit main and showback base URLs.
    pub fn with_urls(
        base_url: &str,
        showback_url: &str,
        credentials: Credentials,
    ) -> Result<Self, ApiError> {
        Self::build(base_url, showback_url, credentials, None)
    }

    /// Inject a pre-issued bearer token, skipping the login round trip.
    pub fn with_preauthorized_token(
        base_url: &str,
        showback_url: &str,
        credentials: Credentials,
        token: &str,
    ) -> Result<Self, ApiError> {
        Self::build(base_url, showback_url, credentials, Some(token.to_string()))
    }

    fn build(
        base_url: &str,
        showback_url: &str,
        credentials: Credentials,
        token: Option<String>,
    ) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        Ok(Self {
            inner: Arc::new(ClientInner {
                http,
                base_url: base_url.trim_end_matches('/').to_string(),
                showback_url: showback_url.trim_end_matches('/').to_string(),
                credentials,
                token: RwLock::new(token),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// POST /api/v1/auth/login
    async fn login(&self) -> Result<String, ApiError> {
        let url = format!("{}/api/v1/auth/login", self.inner.base_url);
        tracing::debug!("authenticating against {}", url);

        let response = self
            .inner
            .http
            .post(&url)
            .json(&self.inner.credentials.login_command())
            .send()
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(ApiError::Auth);
        }
        if !response.status().is_success() {
            return Err(decode_error(response).await);
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(format!("login response: {}", e)))?;

        *self.inner.token.write().await = Some(login.token.clone());
        Ok(login.token)
    }

    async fn token(&self) -> Result<String, ApiError> {
        if let Some(token) = self.inner.token.read().await.clone() {
            return Ok(token);
        }
        self.login().await
    }

    /// Execute one request against the main API, re-authenticating once
    /// if the bearer token has expired.
    async fn execute<T, B>(
        &self,
        method: Method,
        base: &str,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError>
    where
        T: for<'de> Deserialize<'de>,
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", base, path);
        let mut reauthenticated = false;

        loop {
            let token = self.token().await?;
            tracing::debug!("{} {}", method, url);

            let mut request = self
                .inner
                .http
                .request(method.clone(), &url)
                .bearer_auth(&token);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED && !reauthenticated {
                // token expired mid-session
                tracing::debug!("token rejected, re-authenticating");
                *self.inner.token.write().await = None;
                reauthenticated = true;
                continue;
            }

            if status == StatusCode::UNAUTHORIZED {
                return Err(ApiError::Auth);
            }
            if !status.is_success() {
                return Err(decode_error(response).await);
            }

            let text = response.text().await?;
            if text.is_empty() {
                // command endpoints respond with an empty body
                return serde_json::from_str("null")
                    .map_err(|e| ApiError::Parse(format!("empty response: {}", e)));
            }
            return serde_json::from_str(&text).map_err(|e| {
                tracing::debug!("undecodable response body: {}", text);
                ApiError::Parse(e.to_string())
            });
        }
    }

    pub async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(Method::GET, &self.inner.base_url, path, None::<&()>)
            .await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: for<'de> Deserialize<'de>,
        B: Serialize + ?Sized,
    {
        self.execute(Method::POST, &self.inner.base_url, path, Some(body))
            .await
    }

    pub async fn put<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: for<'de> Deserialize<'de>,
        B: Serialize + ?Sized,
    {
        self.execute(Method::PUT, &self.inner.base_url, path, Some(body))
            .await
    }

    pub async fn delete<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, ApiError> {
        self.execute(Method::DELETE, &self.inner.base_url, path, None::<&()>)
            .await
    }

    pub async fn delete_with_body<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: for<'de> Deserialize<'de>,
        B: Serialize + ?Sized,
    {
        self.execute(Method::DELETE, &self.inner.base_url, path, Some(body))
            .await
    }

    /// GET against the secondary showback API.
    pub async fn get_showback<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
    ) -> Result<T, ApiError> {
        self.execute(Method::GET, &self.inner.showback_url, path, None::<&()>)
            .await
    }

    /// POST against the secondary showback API.
    pub async fn post_showback<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: for<'de> Deserialize<'de>,
        B: Serialize + ?Sized,
    {
        self.execute(Method::POST, &self.inner.showback_url, path, Some(body))
            .await
    }

    pub async fn delete_showback<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
    ) -> Result<T, ApiError> {
        self.execute(Method::DELETE, &self.inner.showback_url, path, None::<&()>)
            .await
    }

    // Typed sub-clients, one per resource family.

    pub fn projects(&self) -> super::projects::ProjectsApi<'_> {
        super::projects::ProjectsApi::new(self)
    }

    pub fn servers(&self) -> super::servers::ServersApi<'_> {
        super::servers::ServersApi::new(self)
    }

    pub fn standalone(&self) -> super::standalone::StandaloneApi<'_> {
        super::standalone::StandaloneApi::new(self)
    }

    pub fn flavors(&self) -> super::flavors::FlavorsApi<'_> {
        super::flavors::FlavorsApi::new(self)
    }

    pub fn images(&self) -> super::flavors::ImagesApi<'_> {
        super::flavors::ImagesApi::new(self)
    }

    pub fn catalogs(&self) -> super::catalogs::CatalogsApi<'_> {
        super::catalogs::CatalogsApi::new(self)
    }

    pub fn repositories(&self) -> super::repositories::RepositoriesApi<'_> {
        super::repositories::RepositoriesApi::new(self)
    }

    pub fn applications(&self) -> super::applications::ApplicationsApi<'_> {
        super::applications::ApplicationsApi::new(self)
    }

    pub fn access_profiles(&self) -> super::profiles::AccessProfilesApi<'_> {
        super::profiles::AccessProfilesApi::new(self)
    }

    pub fn alerting_profiles(&self) -> super::profiles::AlertingProfilesApi<'_> {
        super::profiles::AlertingProfilesApi::new(self)
    }

    pub fn kubernetes_profiles(&self) -> super::profiles::KubernetesProfilesApi<'_> {
        super::profiles::KubernetesProfilesApi::new(self)
    }

    pub fn policy_profiles(&self) -> super::profiles::PolicyProfilesApi<'_> {
        super::profiles::PolicyProfilesApi::new(self)
    }

    pub fn standalone_profiles(&self) -> super::profiles::StandaloneProfilesApi<'_> {
        super::profiles::StandaloneProfilesApi::new(self)
    }

    pub fn cloud_credentials(&self) -> super::cloud_credentials::CloudCredentialsApi<'_> {
        super::cloud_credentials::CloudCredentialsApi::new(self)
    }

    pub fn organizations(&self) -> super::organizations::OrganizationsApi<'_> {
        super::organizations::OrganizationsApi::new(self)
    }

    pub fn users(&self) -> super::users::UsersApi<'_> {
        super::users::UsersApi::new(self)
    }

    pub fn slack(&self) -> super::slack::SlackApi<'_> {
        super::slack::SlackApi::new(self)
    }

    pub fn billing(&self) -> super::billing::BillingApi<'_> {
        super::billing::BillingApi::new(self)
    }

    pub fn kubeconfigs(&self) -> super::kubeconfigs::KubeconfigsApi<'_> {
        super::kubeconfigs::KubeconfigsApi::new(self)
    }

    pub fn backup(&self) -> super::backup::BackupApi<'_> {
        super::backup::BackupApi::new(self)
    }
}

/// Normalize a non-2xx response into a single error carrying the HTTP
/// status and the decoded server message.
async fn decode_error(response: reqwest::Response) -> ApiError {
    let status = response.status().as_u16();
    let text = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());

    let message = match serde_json::from_str::<ApiErrorBody>(&text) {
        Ok(body) => body.message.or(body.detail).unwrap_or(text),
        Err(_) => text,
    };

    ApiError::Api { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_credentials() -> Credentials {
        Credentials::UserPassword {
            email: "dev@example.com".to_string(),
            password: "secret".to_string(),
        }
    }

    #[test]
    fn bare_host_gets_https_scheme() {
        let client = Client::new(DEFAULT_API_HOST, test_credentials()).unwrap();
        assert_eq!(client.base_url(), "https://api.taikun.cloud");
    }

    #[test]
    fn full_url_kept_as_is() {
        let client = Client::new("http://localhost:8080/", test_credentials()).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
    }

    #[test]
    fn credential_modes() {
        assert_eq!(test_credentials().mode(), "");
        assert_eq!(
            Credentials::Keycloak {
                email: String::new(),
                password: String::new()
            }
            .mode(),
            "keycloak"
        );
        assert_eq!(
            Credentials::AccessKey {
                access_key: String::new(),
                secret_key: String::new()
            }
            .mode(),
            "token"
        );
    }

    #[tokio::test]
    async fn login_then_request_carries_bearer_token() {
        let mut server = mockito::Server::new_async().await;
        let _login = server
            .mock("POST", "/api/v1/auth/login")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"token":"tok-1","refreshToken":"r"}"#)
            .create_async()
            .await;
        let _get = server
            .mock("GET", "/api/v1/ping")
            .match_header("authorization", "Bearer tok-1")
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let client =
            Client::with_urls(&server.url(), &server.url(), test_credentials()).unwrap();
        let value: serde_json::Value = client.get("/api/v1/ping").await.unwrap();
        assert_eq!(value["ok"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn error_body_message_is_decoded() {
        let mut server = mockito::Server::new_async().await;
        let _login = server
            .mock("POST", "/api/v1/auth/login")
            .with_status(200)
            .with_body(r#"{"token":"tok-1"}"#)
            .create_async()
            .await;
        let _get = server
            .mock("GET", "/api/v1/projects/list")
            .with_status(400)
            .with_body(r#"{"message":"project name already exists"}"#)
            .create_async()
            .await;

        let client =
            Client::with_urls(&server.url(), &server.url(), test_credentials()).unwrap();
        let err = client
            .get::<serde_json::Value>("/api/v1/projects/list")
            .await
            .unwrap_err();

        match err {
            ApiError::Api { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "project name already exists");
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn expired_token_triggers_single_reauth() {
        let mut server = mockito::Server::new_async().await;
        let _login = server
            .mock("POST", "/api/v1/auth/login")
            .with_status(200)
            .with_body(r#"{"token":"tok-fresh"}"#)
            .expect(2)
            .create_async()
            .await;
        let _stale = server
            .mock("GET", "/api/v1/ping")
            .match_header("authorization", "Bearer tok-stale")
            .with_status(401)
            .create_async()
            .await;
        let _fresh = server
            .mock("GET", "/api/v1/ping")
            .match_header("authorization", "Bearer tok-fresh")
            .with_status(200)
            .with_body(r#"{"ok":true}"#)
            .create_async()
            .await;

        let client =
            Client::with_urls(&server.url(), &server.url(), test_credentials()).unwrap();
        *client.inner.token.write().await = Some("tok-stale".to_string());

        let value: serde_json::Value = client.get("/api/v1/ping").await.unwrap();
        assert_eq!(value["ok"], serde_json::json!(true));
    }
}
