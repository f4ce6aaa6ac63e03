//! Main client implementation.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use url::Url;
use whoop_oauth::SharedTokenProvider;

use crate::api::{ActivityApi, CyclesApi, RecoveryApi, SleepApi, UserApi, WorkoutsApi};
use crate::error::{Error, Result};

/// Production API base URL.
pub const BASE_URL: &str = "https://api.prod.whoop.com/developer";

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// WHOOP API client.
///
/// Cheap to clone; clones share one connection pool and token source.
///
/// # Example
///
/// ```no_run
/// use whoop_client::WhoopClient;
///
/// # async fn example() -> whoop_client::Result<()> {
/// let client = WhoopClient::builder()
///     .access_token("token")
///     .build()?;
///
/// let profile = client.user().profile().await?;
/// println!("{} {}", profile.first_name, profile.last_name);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct WhoopClient {
    inner: Arc<ClientInner>,
}

/// Inner client state (shared across clones).
pub(crate) struct ClientInner {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: Url,
    pub(crate) timeout: Duration,
    /// Caller-managed token; always wins over `token_provider`.
    pub(crate) access_token: Option<String>,
    pub(crate) token_provider: Option<SharedTokenProvider>,
}

impl std::fmt::Debug for WhoopClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhoopClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("timeout", &self.inner.timeout)
            .field("has_access_token", &self.inner.access_token.is_some())
            .field("token_provider", &self.inner.token_provider)
            .finish()
    }
}

impl WhoopClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Whether any credential source is configured.
    pub fn has_token(&self) -> bool {
        self.inner.access_token.is_some() || self.inner.token_provider.is_some()
    }

    /// Whether a caller-managed token was supplied at construction.
    pub fn has_static_token(&self) -> bool {
        self.inner.access_token.is_some()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Access the user profile and body measurement API.
    pub fn user(&self) -> UserApi {
        UserApi::new(self.clone())
    }

    /// Access the cycles API.
    pub fn cycles(&self) -> CyclesApi {
        CyclesApi::new(self.clone())
    }

    /// Access the sleep API.
    pub fn sleep(&self) -> SleepApi {
        SleepApi::new(self.clone())
    }

    /// Access the recovery API.
    pub fn recovery(&self) -> RecoveryApi {
        RecoveryApi::new(self.clone())
    }

    /// Access the workouts API.
    pub fn workouts(&self) -> WorkoutsApi {
        WorkoutsApi::new(self.clone())
    }

    /// Access the activity id mapping API.
    pub fn activity(&self) -> ActivityApi {
        ActivityApi::new(self.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal HTTP methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a URL for an API path.
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        let path = path.trim_start_matches('/');
        self.inner.base_url.join(path).map_err(Error::from)
    }

    /// Resolve the bearer token for the next request. `None` means send
    /// the request without an `Authorization` header.
    async fn bearer_token(&self) -> Result<Option<String>> {
        if let Some(token) = &self.inner.access_token {
            return Ok(Some(token.clone()));
        }
        match &self.inner.token_provider {
            Some(provider) => {
                let token = provider.ensure_valid_token().await?;
                Ok((!token.is_empty()).then_some(token))
            }
            None => Ok(None),
        }
    }

    /// Make a GET request.
    pub(crate) async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let request = self.inner.http.get(self.url(path)?);
        self.execute(request).await
    }

    /// Make a GET request with query parameters.
    pub(crate) async fn get_with_query<T, Q>(&self, path: &str, query: &Q) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        let request = self.inner.http.get(self.url(path)?).query(query);
        self.execute(request).await
    }

    /// Attach the timeout and credentials, send, and decode.
    async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T> {
        let mut request = request.timeout(self.inner.timeout);

        match self.bearer_token().await? {
            Some(token) => request = request.bearer_auth(token),
            None => tracing::debug!("No access token available, sending unauthenticated request"),
        }

        let response = request.send().await?;
        self.handle_response(response).await
    }

    /// Handle a response, extracting the body or error.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), "WHOOP API returned an error");
            return Err(Error::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

/// Builder for creating a WhoopClient.
#[derive(Debug)]
pub struct ClientBuilder {
    base_url: String,
    access_token: Option<String>,
    token_provider: Option<SharedTokenProvider>,
    timeout: Duration,
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            access_token: None,
            token_provider: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
        }
    }

    /// Override the API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Use a caller-managed access token. It is sent as-is on every request
    /// and takes precedence over any token provider; its expiry is never
    /// checked. An empty string is ignored.
    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.access_token = (!token.is_empty()).then_some(token);
        self
    }

    /// Obtain tokens from `provider` before each request.
    pub fn token_provider(mut self, provider: SharedTokenProvider) -> Self {
        self.token_provider = Some(provider);
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<WhoopClient> {
        // Parse and normalize base URL
        let mut base_url = Url::parse(&self.base_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("whoop-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(WhoopClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                timeout: self.timeout,
                access_token: self.access_token,
                token_provider: self.token_provider,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_to_production() {
        let client = ClientBuilder::new().build().unwrap();
        assert_eq!(
            client.base_url().as_str(),
            "https://api.prod.whoop.com/developer/"
        );
        assert!(!client.has_token());
    }

    #[test]
    fn test_builder_rejects_bad_url() {
        let result = ClientBuilder::new().base_url("not a url").build();
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_url_building() {
        let client = ClientBuilder::new().build().unwrap();

        let url = client.url("v2/cycle").unwrap();
        assert_eq!(url.as_str(), "https://api.prod.whoop.com/developer/v2/cycle");

        let url = client.url("/v1/activity-mapping/7").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.prod.whoop.com/developer/v1/activity-mapping/7"
        );
    }

    #[test]
    fn test_empty_access_token_ignored() {
        let client = ClientBuilder::new().access_token("").build().unwrap();
        assert!(!client.has_static_token());
    }
}
