mod cli;
mod commands;
mod context;
mod output;
mod timing;
mod utils;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use crate::cli::{Cli, Commands};
use crate::commands::{generate_completions, run_delete, run_fetch, run_upload};
use crate::context::{build_ctx, resolve_config};
use crate::output::Output;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    timing::init_tracing(cli.verbose, cli.timing);

    let out = Output::new();
    match run(cli, &out).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            out.error(format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, out: &Output) -> Result<()> {
    if let Commands::Completions { shell } = cli.command {
        return generate_completions(shell);
    }

    let config = resolve_config(&cli)?;
    if config.token.is_none() {
        tracing::warn!("No token configured; requests go out with an empty bearer");
    }
    let ctx = build_ctx(&config);

    match cli.command {
        Commands::Upload { files } => run_upload(ctx, out, &files, cli.json).await,
        Commands::Delete { ids } => run_delete(ctx, out, &ids).await,
        Commands::Fetch { ids } => run_fetch(ctx, out, ids, cli.json).await,
        Commands::Completions { .. } => Ok(()),
    }
}
