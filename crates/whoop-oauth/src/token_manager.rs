//! Token validity gate.
//!
//! Decides whether the stored token can be used as-is, must be refreshed
//! first, or is unusable. API clients depend only on [`TokenProvider`], so
//! a static token and the refresh-capable manager are interchangeable.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::error::{OAuthError, Result};
use crate::refresh::TokenRefresher;
use crate::store::TokenStore;

// ============================================================================
// TokenProvider Trait
// ============================================================================

/// Source of bearer tokens for outbound API calls.
#[async_trait]
pub trait TokenProvider: Send + Sync + std::fmt::Debug {
    /// Return a usable access token, refreshing first if needed.
    ///
    /// An empty string means "no credentials"; the caller decides whether
    /// to proceed unauthenticated.
    async fn ensure_valid_token(&self) -> Result<String>;
}

/// Shared token provider for use across async contexts.
pub type SharedTokenProvider = Arc<dyn TokenProvider>;

// ============================================================================
// StaticToken
// ============================================================================

/// A caller-managed token returned verbatim, with no expiry checks.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn ensure_valid_token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

// ============================================================================
// TokenManager
// ============================================================================

/// File-backed gate that refreshes expired tokens on demand.
#[derive(Debug, Clone)]
pub struct TokenManager {
    store: TokenStore,
    refresher: Option<TokenRefresher>,
}

impl TokenManager {
    /// Manager able to refresh expired tokens.
    pub fn new(refresher: TokenRefresher) -> Self {
        Self {
            store: refresher.store().clone(),
            refresher: Some(refresher),
        }
    }

    /// Manager without client credentials. Valid tokens are served, but an
    /// expired one cannot be renewed.
    pub fn read_only(store: TokenStore) -> Self {
        Self {
            store,
            refresher: None,
        }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn can_refresh(&self) -> bool {
        self.refresher.is_some()
    }

    /// Expiry information about the stored token, for status displays.
    pub fn token_info(&self) -> Result<Option<TokenInfo>> {
        let token = self.store.load()?;
        Ok(token.map(|t| {
            let now = Utc::now();
            TokenInfo {
                expires_at: t.expiry,
                expires_in: t.expires_in_at(now),
                is_expired: t.is_expired_at(now),
                has_refresh_token: t.has_refresh_token(),
                can_refresh: self.can_refresh(),
                token_path: self.store.path().to_path_buf(),
            }
        }))
    }
}

#[async_trait]
impl TokenProvider for TokenManager {
    async fn ensure_valid_token(&self) -> Result<String> {
        let Some(token) = self.store.load()? else {
            return Ok(String::new());
        };

        if !token.is_expired() {
            return Ok(token.access_token);
        }

        let Some(refresh_token) = token.refresh_token.as_deref() else {
            tracing::warn!("Token expired and no refresh token is stored");
            return Err(OAuthError::TokenExpired);
        };

        let refresher = self.refresher.as_ref().ok_or_else(|| {
            OAuthError::Config(
                "Token expired and WHOOP_CLIENT_ID/WHOOP_CLIENT_SECRET are not set, cannot refresh"
                    .to_string(),
            )
        })?;

        tracing::info!("Token expired, refreshing...");
        let refreshed = refresher.refresh(refresh_token).await?;
        Ok(refreshed.access_token)
    }
}

// ============================================================================
// TokenInfo
// ============================================================================

/// Information about the stored token for display.
#[derive(Debug, Clone, Serialize)]
pub struct TokenInfo {
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub expires_in: TimeDelta,
    pub is_expired: bool,
    pub has_refresh_token: bool,
    /// Whether the manager holds client credentials to refresh with.
    pub can_refresh: bool,
    pub token_path: PathBuf,
}

impl TokenInfo {
    pub fn expires_in_display(&self) -> String {
        match self.expires_at {
            None => "No expiry recorded".to_string(),
            Some(_) if self.expires_in <= TimeDelta::zero() => {
                if self.has_refresh_token && self.can_refresh {
                    "Expired (will refresh on next use)".to_string()
                } else {
                    "Expired (cannot be refreshed, run `whoop auth login`)".to_string()
                }
            }
            Some(_) => format_duration(self.expires_in),
        }
    }
}

/// Human-readable duration: seconds, minutes, fractional hours or days.
pub fn format_duration(d: TimeDelta) -> String {
    let secs = d.num_seconds();
    if secs < 60 {
        format!("{} seconds", secs)
    } else if secs < 3600 {
        format!("{} minutes", d.num_minutes())
    } else if secs < 86_400 {
        format!("{:.1} hours", secs as f64 / 3600.0)
    } else {
        format!("{:.1} days", secs as f64 / 86_400.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::{OAuthConfig, http_client};
    use crate::token::Token;
    use tempfile::tempdir;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token(expiry_delta: TimeDelta, refresh: Option<&str>) -> Token {
        Token {
            access_token: "stored".to_string(),
            refresh_token: refresh.map(str::to_string),
            token_type: "Bearer".to_string(),
            expiry: Some(Utc::now() + expiry_delta),
        }
    }

    async fn manager_with_mock(store: TokenStore) -> (TokenManager, MockServer) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "refreshed",
                "refresh_token": "next-refresh",
                "token_type": "bearer",
                "expires_in": 3600
            })))
            .mount(&server)
            .await;

        let config =
            OAuthConfig::new("abc", "secret").with_token_url(format!("{}/token", server.uri()));
        let refresher = TokenRefresher::new(config, http_client().unwrap(), store);
        (TokenManager::new(refresher), server)
    }

    #[tokio::test]
    async fn test_static_token_returned_verbatim() {
        let provider = StaticToken::new("env-token");
        assert_eq!(provider.ensure_valid_token().await.unwrap(), "env-token");
    }

    #[tokio::test]
    async fn test_no_token_is_empty_string() {
        let temp = tempdir().unwrap();
        let (manager, server) = manager_with_mock(TokenStore::in_dir(temp.path())).await;

        assert_eq!(manager.ensure_valid_token().await.unwrap(), "");
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_valid_token_makes_no_network_call() {
        let temp = tempdir().unwrap();
        let store = TokenStore::in_dir(temp.path());
        store.save(&token(TimeDelta::hours(1), Some("r"))).unwrap();
        let (manager, server) = manager_with_mock(store).await;

        assert_eq!(manager.ensure_valid_token().await.unwrap(), "stored");
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expired_token_refreshes_once() {
        let temp = tempdir().unwrap();
        let store = TokenStore::in_dir(temp.path());
        store.save(&token(TimeDelta::minutes(2), Some("r"))).unwrap();
        let (manager, server) = manager_with_mock(store.clone()).await;

        assert_eq!(manager.ensure_valid_token().await.unwrap(), "refreshed");
        assert_eq!(server.received_requests().await.unwrap().len(), 1);

        let stored = store.load().unwrap().unwrap();
        assert_eq!(stored.access_token, "refreshed");
        assert_eq!(stored.refresh_token.as_deref(), Some("next-refresh"));

        // Now valid, so no second refresh.
        assert_eq!(manager.ensure_valid_token().await.unwrap(), "refreshed");
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_expired_without_refresh_token() {
        let temp = tempdir().unwrap();
        let store = TokenStore::in_dir(temp.path());
        store.save(&token(TimeDelta::minutes(-10), None)).unwrap();
        let (manager, server) = manager_with_mock(store).await;

        let err = manager.ensure_valid_token().await.unwrap_err();
        assert!(matches!(err, OAuthError::TokenExpired));
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_only_manager_cannot_refresh() {
        let temp = tempdir().unwrap();
        let store = TokenStore::in_dir(temp.path());
        store.save(&token(TimeDelta::minutes(-10), Some("r"))).unwrap();
        let manager = TokenManager::read_only(store);

        assert!(!manager.can_refresh());
        let err = manager.ensure_valid_token().await.unwrap_err();
        assert!(matches!(err, OAuthError::Config(_)));
    }

    #[test]
    fn test_token_info() {
        let temp = tempdir().unwrap();
        let store = TokenStore::in_dir(temp.path());
        let manager = TokenManager::read_only(store.clone());
        assert!(manager.token_info().unwrap().is_none());

        store.save(&token(TimeDelta::hours(2), None)).unwrap();
        let info = manager.token_info().unwrap().unwrap();
        assert!(!info.is_expired);
        assert!(!info.has_refresh_token);
        assert_eq!(info.token_path, store.path());
        assert!(info.expires_in_display().ends_with("hours"));
    }

    #[tokio::test]
    async fn test_expired_display_matches_refresh_ability() {
        let temp = tempdir().unwrap();
        let store = TokenStore::in_dir(temp.path());
        store.save(&token(TimeDelta::minutes(-10), Some("r"))).unwrap();

        let read_only = TokenManager::read_only(store.clone());
        let info = read_only.token_info().unwrap().unwrap();
        assert!(info.has_refresh_token);
        assert!(!info.can_refresh);
        assert!(info.expires_in_display().contains("cannot be refreshed"));

        let (refreshing, _server) = manager_with_mock(store.clone()).await;
        let info = refreshing.token_info().unwrap().unwrap();
        assert!(info.can_refresh);
        assert_eq!(
            info.expires_in_display(),
            "Expired (will refresh on next use)"
        );

        store.save(&token(TimeDelta::minutes(-10), None)).unwrap();
        let info = refreshing.token_info().unwrap().unwrap();
        assert!(!info.has_refresh_token);
        assert!(info.expires_in_display().contains("cannot be refreshed"));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(TimeDelta::seconds(42)), "42 seconds");
        assert_eq!(format_duration(TimeDelta::minutes(15)), "15 minutes");
        assert_eq!(format_duration(TimeDelta::minutes(90)), "1.5 hours");
        assert_eq!(format_duration(TimeDelta::hours(36)), "1.5 days");
    }
}
