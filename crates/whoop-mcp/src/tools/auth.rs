//! Authentication tools: status reporting and the interactive OAuth flow.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use whoop_oauth::{AuthFlow, BrowserLauncher, OAuthConfig, TokenManager, format_duration};

use crate::error::Result;
use crate::protocol::CallToolResult;
use crate::tool::{Tool, ToolArgs, ToolContext, ToolRegistry};

const MISSING_CREDENTIALS: &str =
    "WHOOP_CLIENT_ID and WHOOP_CLIENT_SECRET environment variables are required";

/// State shared by the authentication tools.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// A static token is configured and overrides the token file.
    env_token: bool,
    /// Client credentials; `None` disables authorization and refresh.
    oauth: Option<OAuthConfig>,
    manager: TokenManager,
    launcher: Option<Arc<dyn BrowserLauncher>>,
    bind_addr: Option<SocketAddr>,
}

impl AuthContext {
    pub fn new(manager: TokenManager, oauth: Option<OAuthConfig>, env_token: bool) -> Self {
        Self {
            env_token,
            oauth,
            manager,
            launcher: None,
            bind_addr: None,
        }
    }

    /// Replace the system browser used by `whoop_authorize`.
    pub fn with_launcher(mut self, launcher: Arc<dyn BrowserLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Replace the callback listener address used by `whoop_authorize`.
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = Some(addr);
        self
    }
}

/// Register `whoop_auth_status` and `whoop_authorize`.
pub fn register_auth_tools(registry: &mut ToolRegistry, context: AuthContext) {
    let context = Arc::new(context);
    registry.register(AuthStatusTool {
        context: context.clone(),
    });
    registry.register(AuthorizeTool { context });
}

fn no_params() -> Value {
    json!({ "type": "object", "properties": {} })
}

// ─────────────────────────────────────────────────────────────────────────────
// whoop_auth_status
// ─────────────────────────────────────────────────────────────────────────────

/// Report returned by `whoop_auth_status`.
#[derive(Debug, Default, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    /// `environment_variable` or `token_file`.
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expired: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_refresh_token: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuthContext {
    /// Current authentication status.
    pub fn status(&self) -> AuthStatus {
        self.status_at(Utc::now())
    }

    fn status_at(&self, now: DateTime<Utc>) -> AuthStatus {
        if self.env_token {
            return AuthStatus {
                authenticated: true,
                method: "environment_variable",
                note: Some("Using WHOOP_ACCESS_TOKEN environment variable".to_string()),
                ..Default::default()
            };
        }

        let mut status = AuthStatus {
            method: "token_file",
            token_path: Some(self.manager.store().path().display().to_string()),
            ..Default::default()
        };
        if self.oauth.is_none() {
            status.warning = Some(format!(
                "{}; expired tokens cannot be refreshed",
                MISSING_CREDENTIALS
            ));
        }

        let token = match self.manager.store().load() {
            Ok(Some(token)) => token,
            Ok(None) => {
                status.message =
                    Some("No token found. Use whoop_authorize to authenticate.".to_string());
                return status;
            }
            Err(e) => {
                status.error = Some(format!("Error loading token: {}", e));
                return status;
            }
        };

        status.authenticated = true;
        status.has_refresh_token = Some(token.has_refresh_token());

        if let Some(expiry) = token.expiry {
            status.expires_at = Some(expiry.to_rfc3339_opts(SecondsFormat::Secs, true));
            let remaining = token.expires_in_at(now);
            if remaining > TimeDelta::zero() {
                status.expires_in = Some(format_duration(remaining));
            } else {
                status.expired = Some(true);
                status.message = Some(if token.has_refresh_token() && self.oauth.is_some() {
                    "Token expired. Will attempt auto-refresh on next API call.".to_string()
                } else {
                    "Token expired and cannot be refreshed. Use whoop_authorize to re-authenticate."
                        .to_string()
                });
            }
        }

        status
    }
}

/// Tool reporting how requests are authenticated.
pub struct AuthStatusTool {
    context: Arc<AuthContext>,
}

#[async_trait]
impl Tool for AuthStatusTool {
    fn name(&self) -> &str {
        "whoop_auth_status"
    }

    fn description(&self) -> &str {
        "Check the current WHOOP authentication status: whether you're authenticated, \
         token expiry time and token file location."
    }

    fn parameters(&self) -> Value {
        no_params()
    }

    async fn execute(&self, _args: ToolArgs, _ctx: &ToolContext) -> Result<CallToolResult> {
        Ok(CallToolResult::json(&self.context.status()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// whoop_authorize
// ─────────────────────────────────────────────────────────────────────────────

/// Tool running the browser authorization flow.
pub struct AuthorizeTool {
    context: Arc<AuthContext>,
}

impl AuthorizeTool {
    /// Run one authorization attempt; `cancel` aborts the wait and frees the port.
    async fn authorize(&self, cancel: CancellationToken) -> Value {
        let ctx = &self.context;
        let Some(config) = ctx.oauth.clone() else {
            return json!({ "success": false, "error": MISSING_CREDENTIALS });
        };

        let mut flow = match AuthFlow::new(config, ctx.manager.store().clone()) {
            Ok(flow) => flow,
            Err(e) => return json!({ "success": false, "error": e.to_string() }),
        };
        if let Some(launcher) = &ctx.launcher {
            flow = flow.with_launcher(launcher.clone());
        }
        if let Some(addr) = ctx.bind_addr {
            flow = flow.with_bind_addr(addr);
        }

        match flow.run(cancel).await {
            Ok(result) => {
                tracing::info!(success = result.success, "Authorization finished");
                serde_json::to_value(&result)
                    .unwrap_or_else(|e| json!({ "success": false, "error": e.to_string() }))
            }
            Err(e) => {
                tracing::error!(error = %e, "Authorization failed");
                json!({ "success": false, "error": e.to_string() })
            }
        }
    }
}

#[async_trait]
impl Tool for AuthorizeTool {
    fn name(&self) -> &str {
        "whoop_authorize"
    }

    fn description(&self) -> &str {
        "Start the WHOOP OAuth authorization flow. Opens a browser for authentication and \
         saves the token for future use. Requires WHOOP_CLIENT_ID and WHOOP_CLIENT_SECRET \
         environment variables."
    }

    fn parameters(&self) -> Value {
        no_params()
    }

    async fn execute(&self, _args: ToolArgs, ctx: &ToolContext) -> Result<CallToolResult> {
        Ok(CallToolResult::json(
            &self.authorize(ctx.cancellation.child_token()).await,
        ))
    }
}
