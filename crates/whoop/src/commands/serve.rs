//! Serve command - runs the MCP server on stdio.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Args;
use tokio_util::sync::CancellationToken;
use whoop_mcp::tools::{AuthContext, register_api_tools, register_auth_tools};
use whoop_mcp::{McpServer, OAuthConfigResource, ResourceRegistry, ToolRegistry};

use super::Context;

const SERVER_NAME: &str = "whoop-mcp";

const INSTRUCTIONS: &str = "Tools for reading WHOOP fitness data: profile, body measurements, \
     cycles (strain), sleep, recovery and workouts. If a call fails with an authentication \
     error, check whoop_auth_status and run whoop_authorize.";

/// Arguments for the serve command.
#[derive(Args, Debug, Default)]
pub struct ServeArgs {}

/// Run the serve command.
pub async fn run(_args: ServeArgs, ctx: &Context) -> Result<()> {
    let shutdown = CancellationToken::new();
    let server = build_server(ctx)?;

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, shutting down");
            signal_token.cancel();
        }
    });

    Arc::new(server)
        .serve_stdio(shutdown)
        .await
        .context("MCP server failed")
}

/// Wire settings, token handling, tools and resources into a server.
///
/// Tools run under per-request cancellation derived from the serve loop's
/// shutdown token.
pub fn build_server(ctx: &Context) -> Result<McpServer> {
    let manager = ctx.token_manager()?;
    let client = ctx.client(&manager)?;

    if ctx.settings.access_token.is_some() {
        tracing::info!("Using WHOOP_ACCESS_TOKEN; the token file is ignored");
    } else if !manager.store().exists() {
        tracing::warn!(
            path = %manager.store().path().display(),
            "No token found. Set WHOOP_ACCESS_TOKEN or run `whoop auth login` (or the whoop_authorize tool)"
        );
    }
    if ctx.settings.credentials.is_none() {
        tracing::warn!(
            "WHOOP_CLIENT_ID/WHOOP_CLIENT_SECRET not set; authorization and token refresh are disabled"
        );
    }

    let mut tools = ToolRegistry::new();
    register_api_tools(&mut tools, &client);
    register_auth_tools(
        &mut tools,
        AuthContext::new(
            manager,
            ctx.oauth_config(),
            ctx.settings.access_token.is_some(),
        ),
    );

    let mut resources = ResourceRegistry::new();
    resources.register(OAuthConfigResource);

    tracing::debug!(tools = tools.len(), "Registered tools");

    Ok(McpServer::new(SERVER_NAME, env!("CARGO_PKG_VERSION"))
        .with_instructions(INSTRUCTIONS)
        .with_tools(tools)
        .with_resources(resources))
}
