//! Refresh-token grant.

use crate::error::Result;
use crate::oauth::{Grant, OAuthConfig, request_token};
use crate::store::TokenStore;
use crate::token::Token;

/// Exchanges refresh tokens for new access tokens and persists the result.
#[derive(Debug, Clone)]
pub struct TokenRefresher {
    config: OAuthConfig,
    http: reqwest::Client,
    store: TokenStore,
}

impl TokenRefresher {
    pub fn new(config: OAuthConfig, http: reqwest::Client, store: TokenStore) -> Self {
        Self {
            config,
            http,
            store,
        }
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Refresh using `refresh_token` and save the new token before returning it.
    ///
    /// If the provider does not rotate the refresh token, the one passed in
    /// is kept on the new token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<Token> {
        tracing::info!("Refreshing access token");

        let mut token = request_token(
            &self.http,
            &self.config,
            Grant::RefreshToken,
            &[("refresh_token", refresh_token)],
        )
        .await?;

        if token.refresh_token.is_none() && !refresh_token.is_empty() {
            token.refresh_token = Some(refresh_token.to_string());
        }

        self.store.save(&token)?;
        tracing::info!(expiry = ?token.expiry, "Token refreshed successfully");
        Ok(token)
    }
}
