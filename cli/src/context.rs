//! Context construction and task settling for one CLI invocation.

use std::time::Duration;

use anyhow::{Context as _, Result};
use takedown_business::{Action, BusinessConfig, TakedownCtx, build_http_state_ctx};
use tracing::instrument;

use crate::cli::Cli;
use crate::output::Output;

/// Longest gap without progress or a response before a command gives up.
const IDLE_TIMEOUT: Duration = Duration::from_secs(120);

/// Environment config with command-line overrides applied.
pub fn resolve_config(cli: &Cli) -> Result<BusinessConfig> {
    let mut config = BusinessConfig::from_env().context("Failed to read TAKEDOWN_* settings")?;
    if let Some(url) = &cli.api_url {
        config.api_base_url.clone_from(url);
    }
    if let Some(token) = &cli.token {
        config.token = Some(token.clone());
    }
    Ok(config)
}

pub fn build_ctx(config: &BusinessConfig) -> TakedownCtx {
    log::debug!("Using API at {}", config.api_url());
    build_http_state_ctx(config).with_idle_timeout(IDLE_TIMEOUT)
}

/// Routes events until every pipeline task has finished.
#[instrument(skip_all, name = "flush")]
pub async fn flush_and_await(ctx: &mut TakedownCtx) -> Result<()> {
    ctx.run_until_idle()
        .await
        .context("Pending requests did not finish")
}

/// Dispatches `actions`, printing events while the pipelines work, and settles.
/// The context is shut down afterwards; its final state stays readable.
#[instrument(skip_all, name = "drive", fields(action_count = actions.len()))]
pub async fn drive(ctx: &mut TakedownCtx, out: &Output, actions: Vec<Action>) -> Result<()> {
    let printer = tokio::spawn(out.clone().follow(ctx.subscribe()));
    for action in actions {
        ctx.dispatch(action);
    }
    let settled = flush_and_await(ctx).await;
    ctx.shutdown().await;
    printer.await.context("Output task failed")?;
    settled
}
