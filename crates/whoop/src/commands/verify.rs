//! Verify command - calls every endpoint once and reports the outcome.

use std::future::Future;

use anyhow::Result;
use clap::Args;
use console::Style;
use serde::Serialize;
use whoop_client::{CollectionQuery, WhoopClient};
use whoop_mcp::tools::format_error;

use super::Context;

/// Arguments for the verify command.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Records to request from each collection endpoint
    #[arg(long, default_value_t = 1)]
    pub limit: i64,
}

/// Outcome of one endpoint check.
#[derive(Debug, Serialize)]
struct Check {
    endpoint: &'static str,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

async fn check<T, F>(endpoint: &'static str, call: F, detail: impl FnOnce(&T) -> String) -> Check
where
    F: Future<Output = whoop_client::Result<T>>,
{
    match call.await {
        Ok(value) => Check {
            endpoint,
            ok: true,
            detail: Some(detail(&value)),
            error: None,
        },
        Err(e) => {
            tracing::debug!(endpoint, error = %e, "Check failed");
            Check {
                endpoint,
                ok: false,
                detail: None,
                error: Some(format_error(&e)),
            }
        }
    }
}

async fn run_checks(client: &WhoopClient, limit: i64) -> Vec<Check> {
    let query = CollectionQuery::new().limit(limit);
    let records = |n: usize| format!("{} record(s)", n);

    vec![
        check("user profile", client.user().profile(), |p| {
            format!("{} {}", p.first_name, p.last_name)
        })
        .await,
        check("body measurements", client.user().body_measurements(), |b| {
            format!("max heart rate {}", b.max_heart_rate)
        })
        .await,
        check("cycles", client.cycles().list(&query), |p| {
            records(p.records.len())
        })
        .await,
        check("sleep", client.sleep().list(&query), |p| {
            records(p.records.len())
        })
        .await,
        check("recovery", client.recovery().list(&query), |p| {
            records(p.records.len())
        })
        .await,
        check("workouts", client.workouts().list(&query), |p| {
            records(p.records.len())
        })
        .await,
    ]
}

/// Run the verify command.
pub async fn run(args: VerifyArgs, ctx: &Context) -> Result<()> {
    let manager = ctx.token_manager()?;
    let client = ctx.client(&manager)?;

    let checks = run_checks(&client, args.limit).await;
    let failed = checks.iter().filter(|c| !c.ok).count();

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&checks)?);
    } else {
        let green = Style::new().green();
        let red = Style::new().red();
        let dim = Style::new().dim();

        for c in &checks {
            if c.ok {
                print!("{} {}", green.apply_to("✓"), c.endpoint);
                match (&c.detail, ctx.verbose) {
                    (Some(detail), true) => println!("  {}", dim.apply_to(detail)),
                    _ => println!(),
                }
            } else {
                println!("{} {}", red.apply_to("✗"), c.endpoint);
                if let Some(error) = &c.error {
                    println!("  {}", dim.apply_to(error));
                }
            }
        }
        println!();
        println!("{}/{} checks passed", checks.len() - failed, checks.len());
    }

    if failed > 0 {
        anyhow::bail!("{} of {} checks failed", failed, checks.len());
    }
    Ok(())
}
