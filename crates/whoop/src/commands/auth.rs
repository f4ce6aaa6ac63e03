//! Auth command - authentication management.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use clap::{Args, Subcommand};
use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;
use whoop_mcp::tools::AuthContext;
use whoop_oauth::{AuthFlow, BrowserLauncher, OAuthError, SystemBrowser};

use super::Context;

/// Arguments for the auth command.
#[derive(Args, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommand {
    /// Authorize with WHOOP in the browser and store the token
    Login {
        /// Re-authorize even if a valid token is stored
        #[arg(long)]
        force: bool,

        /// Print the authorization URL instead of opening a browser
        #[arg(long)]
        no_browser: bool,
    },

    /// Show authentication status
    Status,

    /// Delete the stored token
    Logout,
}

/// Run the auth command.
pub async fn run(args: AuthArgs, ctx: &Context) -> Result<()> {
    match args.command {
        AuthCommand::Login { force, no_browser } => cmd_login(ctx, force, no_browser).await,
        AuthCommand::Status => cmd_status(ctx),
        AuthCommand::Logout => cmd_logout(ctx),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Login
// ─────────────────────────────────────────────────────────────────────────────

/// Shows the URL above the spinner, then tries the system browser.
struct TerminalBrowser {
    progress: ProgressBar,
    open: bool,
}

impl std::fmt::Debug for TerminalBrowser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalBrowser")
            .field("open", &self.open)
            .finish()
    }
}

impl BrowserLauncher for TerminalBrowser {
    fn open(&self, url: &str) -> std::io::Result<()> {
        let dim = Style::new().dim();
        self.progress.suspend(|| {
            eprintln!("Open this URL in your browser:");
            eprintln!();
            eprintln!("  {}", url);
            eprintln!();
        });
        if self.open
            && let Err(e) = SystemBrowser.open(url)
        {
            tracing::debug!(error = %e, "Could not launch browser");
            self.progress.suspend(|| {
                eprintln!("{}", dim.apply_to("(Could not open browser automatically)"));
            });
        }
        // The URL is on screen either way.
        Ok(())
    }
}

async fn cmd_login(ctx: &Context, force: bool, no_browser: bool) -> Result<()> {
    let config = ctx.require_oauth_config()?;
    let manager = ctx.token_manager()?;

    if !force
        && let Ok(Some(info)) = manager.token_info()
        && !info.is_expired
    {
        if ctx.json_output {
            println!(
                "{}",
                serde_json::json!({
                    "success": true,
                    "message": "Already authenticated",
                    "expires_in": info.expires_in_display(),
                })
            );
        } else {
            println!(
                "Already authenticated (expires in {})",
                info.expires_in_display()
            );
            println!("Run 'whoop auth login --force' to re-authorize.");
        }
        return Ok(());
    }

    let progress = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
        progress.set_style(style);
    }
    progress.set_message("Waiting for authorization in the browser (Ctrl-C to cancel)...");
    progress.enable_steady_tick(Duration::from_millis(120));

    let launcher = TerminalBrowser {
        progress: progress.clone(),
        open: !no_browser,
    };
    let flow = AuthFlow::new(config, manager.store().clone())
        .context("Failed to prepare authorization")?
        .with_launcher(Arc::new(launcher));

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_token.cancel();
        }
    });

    let outcome = flow.run(cancel).await;
    ctrl_c.abort();
    progress.finish_and_clear();

    let result = match outcome {
        Ok(result) => result,
        Err(OAuthError::Cancelled) => anyhow::bail!("Authorization cancelled"),
        Err(e) => return Err(e).context("Authorization failed"),
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else if result.success {
        let green = Style::new().green();
        println!("{} {}", green.apply_to("✓"), result.message);
        println!("  Token: {}", manager.store().path().display());
    }

    if !result.success {
        anyhow::bail!(result.message);
    }
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Status / Logout
// ─────────────────────────────────────────────────────────────────────────────

fn cmd_status(ctx: &Context) -> Result<()> {
    let manager = ctx.token_manager()?;
    let status = AuthContext::new(
        manager,
        ctx.oauth_config(),
        ctx.settings.access_token.is_some(),
    )
    .status();

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let green = Style::new().green();
    let yellow = Style::new().yellow();
    let red = Style::new().red();

    println!("Authentication Status");
    println!("---------------------");

    if status.method == "environment_variable" {
        println!("Token: {}", green.apply_to("WHOOP_ACCESS_TOKEN"));
        println!("  {}", dim.apply_to("Static token, sent as-is without expiry checks"));
    } else if let Some(error) = &status.error {
        println!("Token: {}", red.apply_to(error));
    } else if !status.authenticated {
        println!("Token: {}", yellow.apply_to("not authenticated"));
        println!("  Run 'whoop auth login' to authorize");
    } else {
        let state = if status.expired == Some(true) {
            red.apply_to("expired")
        } else {
            green.apply_to("valid")
        };
        println!("Token: {}", state);
        if let Some(expires_at) = &status.expires_at {
            println!("  Expires at:    {}", expires_at);
        }
        if let Some(expires_in) = &status.expires_in {
            println!("  Expires in:    {}", expires_in);
        }
        if let Some(has_refresh) = status.has_refresh_token {
            println!("  Refresh token: {}", if has_refresh { "yes" } else { "no" });
        }
        if let Some(message) = &status.message {
            println!("  {}", dim.apply_to(message));
        }
    }

    if let Some(path) = &status.token_path {
        println!("  {} {}", dim.apply_to("Path:"), path);
    }
    println!();

    match &ctx.settings.credentials {
        Some(creds) => println!("Client: {}", creds.client_id),
        None => println!(
            "Client: {}",
            yellow.apply_to("not set (WHOOP_CLIENT_ID / WHOOP_CLIENT_SECRET)")
        ),
    }

    Ok(())
}

fn cmd_logout(ctx: &Context) -> Result<()> {
    let store = ctx.token_store();
    let existed = store.exists();
    store.delete().context("Failed to delete token")?;

    if ctx.json_output {
        println!("{}", serde_json::json!({ "removed": existed }));
    } else if existed {
        println!("Token removed: {}", store.path().display());
    } else {
        println!("No token found.");
    }
    Ok(())
}
