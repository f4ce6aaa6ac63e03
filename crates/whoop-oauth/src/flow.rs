//! Interactive authorization: browser consent, callback, code exchange.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::browser::{BrowserLauncher, SystemBrowser};
use crate::callback::{CallbackError, CallbackListener, CallbackOutcome};
use crate::error::{OAuthError, Result};
use crate::oauth::{
    CALLBACK_PORT, OAuthConfig, build_authorization_url, exchange_code, generate_state,
    http_client,
};
use crate::store::TokenStore;

/// How long to wait for the user to finish consent in the browser.
pub const AUTH_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// User-facing result of an authorization attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResult {
    pub success: bool,
    pub message: String,
}

impl AuthResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

enum Wait {
    Outcome(CallbackOutcome),
    TimedOut,
    Cancelled,
}

/// One authorization attempt. Build a new one per attempt.
#[derive(Debug)]
pub struct AuthFlow {
    config: OAuthConfig,
    store: TokenStore,
    http: reqwest::Client,
    bind_addr: SocketAddr,
    timeout: Duration,
    launcher: Arc<dyn BrowserLauncher>,
}

impl AuthFlow {
    pub fn new(config: OAuthConfig, store: TokenStore) -> Result<Self> {
        Ok(Self {
            config,
            store,
            http: http_client()?,
            bind_addr: Self::default_bind_addr(),
            timeout: AUTH_TIMEOUT,
            launcher: Arc::new(SystemBrowser),
        })
    }

    /// Loopback address on the fixed callback port.
    pub fn default_bind_addr() -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, CALLBACK_PORT))
    }

    pub fn with_http(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn BrowserLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    /// Run the flow to completion.
    ///
    /// Returns `Err` only for infrastructure failures and cancellation.
    /// Denied consent, a forged callback, a missing code, a browser that
    /// would not open and a timeout all come back as a non-success
    /// [`AuthResult`]. The callback listener is always shut down before
    /// this returns.
    pub async fn run(self, cancel: CancellationToken) -> Result<AuthResult> {
        let state = generate_state()?;
        let mut listener = CallbackListener::bind(self.bind_addr, state.clone()).await?;

        let url = build_authorization_url(&self.config, &state);

        if let Err(e) = self.launcher.open(&url) {
            tracing::warn!(error = %e, "Failed to open browser");
            listener.shutdown().await;
            return Ok(AuthResult::failure(format!(
                "Failed to open browser. Please visit this URL manually:\n{}",
                url
            )));
        }

        tracing::info!(timeout_secs = self.timeout.as_secs(), "Waiting for authorization callback");
        let wait = tokio::select! {
            outcome = listener.recv() => Wait::Outcome(outcome),
            _ = tokio::time::sleep(self.timeout) => Wait::TimedOut,
            _ = cancel.cancelled() => Wait::Cancelled,
        };
        listener.shutdown().await;

        match wait {
            Wait::Cancelled => {
                tracing::info!("Authorization cancelled");
                Err(OAuthError::Cancelled)
            }
            Wait::TimedOut => {
                tracing::warn!("Authorization timed out");
                Ok(AuthResult::failure("Authorization timed out. Please try again."))
            }
            Wait::Outcome(CallbackOutcome::Error(CallbackError::Server(message))) => {
                Err(OAuthError::Callback(message))
            }
            Wait::Outcome(CallbackOutcome::Error(e)) => {
                tracing::warn!(error = %e, "Authorization was not completed");
                Ok(AuthResult::failure(format!("Authorization failed: {}", e)))
            }
            Wait::Outcome(CallbackOutcome::Code(code)) => {
                let token = exchange_code(&self.http, &self.config, &code).await?;
                self.store.save(&token)?;
                tracing::info!(path = %self.store.path().display(), "Authorization successful");
                Ok(AuthResult::success("Authorization successful! Token saved."))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bind_addr() {
        let addr = AuthFlow::default_bind_addr();
        assert_eq!(addr.port(), 8080);
        assert!(addr.ip().is_loopback());
    }

    #[test]
    fn test_auth_result_json() {
        let json = serde_json::to_value(AuthResult::failure("nope")).unwrap();
        assert_eq!(json, serde_json::json!({"success": false, "message": "nope"}));
    }
}
