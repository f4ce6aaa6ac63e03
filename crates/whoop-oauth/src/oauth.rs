//! OAuth 2.0 authorization-code flow for the WHOOP API.

use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use rand::TryRngCore;
use rand::rngs::OsRng;

use crate::error::{OAuthError, Result};
use crate::token::{Token, TokenResponse};

pub const AUTHORIZE_URL: &str = "https://api.prod.whoop.com/oauth/oauth2/auth";
pub const TOKEN_URL: &str = "https://api.prod.whoop.com/oauth/oauth2/token";
pub const REDIRECT_URI: &str = "http://localhost:8080/callback";

/// Local port the callback listener binds. Must agree with [`REDIRECT_URI`].
pub const CALLBACK_PORT: u16 = 8080;
pub const CALLBACK_PATH: &str = "/callback";

/// Scopes requested when none are configured. `offline` makes the provider
/// issue a refresh token.
pub const DEFAULT_SCOPES: &str =
    "read:profile read:body_measurement read:cycles read:recovery read:sleep read:workout offline";

/// Timeout for every call to the token endpoint.
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const STATE_BYTES: usize = 32;

/// Client credentials and endpoints for one application registration.
#[derive(Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    /// Space-separated scope list; `None` uses [`DEFAULT_SCOPES`].
    pub scopes: Option<String>,
    pub authorize_url: String,
    pub token_url: String,
    pub redirect_uri: String,
}

impl OAuthConfig {
    /// Config for the production WHOOP endpoints.
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scopes: None,
            authorize_url: AUTHORIZE_URL.to_string(),
            token_url: TOKEN_URL.to_string(),
            redirect_uri: REDIRECT_URI.to_string(),
        }
    }

    pub fn with_scopes(mut self, scopes: impl Into<String>) -> Self {
        self.scopes = Some(scopes.into());
        self
    }

    pub fn with_authorize_url(mut self, url: impl Into<String>) -> Self {
        self.authorize_url = url.into();
        self
    }

    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = uri.into();
        self
    }

    /// Effective scope string.
    pub fn scope(&self) -> &str {
        match self.scopes.as_deref() {
            Some(s) if !s.trim().is_empty() => s,
            _ => DEFAULT_SCOPES,
        }
    }
}

impl std::fmt::Debug for OAuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("scopes", &self.scope())
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

/// Generate a random state string for CSRF protection.
pub fn generate_state() -> Result<String> {
    let mut state_bytes = [0u8; STATE_BYTES];
    OsRng
        .try_fill_bytes(&mut state_bytes)
        .map_err(|e| OAuthError::Entropy(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(state_bytes))
}

/// Build the authorization URL for the OAuth flow.
pub fn build_authorization_url(config: &OAuthConfig, state: &str) -> String {
    let params = [
        ("client_id", config.client_id.as_str()),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("response_type", "code"),
        ("scope", config.scope()),
        ("state", state),
    ];

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    format!("{}?{}", config.authorize_url, query)
}

/// HTTP client for token endpoint calls.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|e| OAuthError::Config(format!("Failed to build HTTP client: {}", e)))
}

/// Which grant a token endpoint call performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Grant {
    AuthorizationCode,
    RefreshToken,
}

impl Grant {
    fn as_str(self) -> &'static str {
        match self {
            Grant::AuthorizationCode => "authorization_code",
            Grant::RefreshToken => "refresh_token",
        }
    }

    fn failed(self, status: u16, body: String) -> OAuthError {
        match self {
            Grant::AuthorizationCode => OAuthError::ExchangeFailed { status, body },
            Grant::RefreshToken => OAuthError::RefreshFailed { status, body },
        }
    }
}

/// POST a form-encoded grant to the token endpoint and decode the response.
pub(crate) async fn request_token(
    http: &reqwest::Client,
    config: &OAuthConfig,
    grant: Grant,
    params: &[(&str, &str)],
) -> Result<Token> {
    let mut form: Vec<(&str, &str)> = vec![
        ("grant_type", grant.as_str()),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
    ];
    form.extend_from_slice(params);

    let response = http
        .post(&config.token_url)
        .header("Accept", "application/json")
        .form(&form)
        .send()
        .await
        .map_err(|e| OAuthError::Network(format!("Token request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        tracing::warn!(grant = grant.as_str(), status = status.as_u16(), "Token endpoint rejected request");
        return Err(grant.failed(status.as_u16(), body));
    }

    let body: TokenResponse = response
        .json()
        .await
        .map_err(|e| OAuthError::Serialization(format!("Failed to parse token response: {}", e)))?;

    Ok(body.into_token(Utc::now()))
}

/// Exchange an authorization code for tokens.
pub async fn exchange_code(
    http: &reqwest::Client,
    config: &OAuthConfig,
    code: &str,
) -> Result<Token> {
    request_token(
        http,
        config,
        Grant::AuthorizationCode,
        &[("code", code), ("redirect_uri", config.redirect_uri.as_str())],
    )
    .await
}
