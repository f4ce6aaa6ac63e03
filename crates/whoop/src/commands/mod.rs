//! CLI command handlers.

pub mod auth;
pub mod serve;
pub mod verify;

use std::sync::Arc;

use anyhow::{Context as _, Result};
use whoop_client::WhoopClient;
use whoop_config::Settings;
use whoop_oauth::{OAuthConfig, TokenManager, TokenRefresher, TokenStore};

/// User agent sent to the WHOOP API.
pub const USER_AGENT: &str = concat!("whoop-mcp/", env!("CARGO_PKG_VERSION"));

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Configuration resolved from the environment.
    pub settings: Settings,
}

impl Context {
    /// OAuth config, when both client credentials are set.
    pub fn oauth_config(&self) -> Option<OAuthConfig> {
        self.settings
            .credentials
            .as_ref()
            .map(|c| OAuthConfig::new(c.client_id.clone(), c.client_secret.clone()))
    }

    /// OAuth config, or an error naming the missing variables.
    pub fn require_oauth_config(&self) -> Result<OAuthConfig> {
        let creds = self.settings.require_credentials()?;
        Ok(OAuthConfig::new(
            creds.client_id.clone(),
            creds.client_secret.clone(),
        ))
    }

    pub fn token_store(&self) -> TokenStore {
        TokenStore::in_dir(&self.settings.config_dir)
    }

    /// Token manager over the configured token file. Without credentials
    /// it can serve tokens but not refresh them.
    pub fn token_manager(&self) -> Result<TokenManager> {
        let store = self.token_store();
        match self.oauth_config() {
            Some(config) => {
                let http = whoop_oauth::oauth::http_client()
                    .context("Failed to create HTTP client")?;
                Ok(TokenManager::new(TokenRefresher::new(config, http, store)))
            }
            None => Ok(TokenManager::read_only(store)),
        }
    }

    /// API client. A `WHOOP_ACCESS_TOKEN` takes precedence over the token file.
    pub fn client(&self, manager: &TokenManager) -> Result<WhoopClient> {
        let mut builder = WhoopClient::builder()
            .user_agent(USER_AGENT)
            .token_provider(Arc::new(manager.clone()));
        if let Some(token) = &self.settings.access_token {
            builder = builder.access_token(token.clone());
        }
        builder.build().context("Failed to create WHOOP client")
    }
}
