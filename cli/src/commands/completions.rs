use std::io::Write;

use anyhow::{Context as _, Result};
use clap::CommandFactory as _;
use clap_complete::Shell;

use crate::cli::Cli;

/// Writes completions for `shell` to stdout.
pub fn generate_completions(shell: Shell) -> Result<()> {
    write_completions(shell, &mut std::io::stdout().lock())
}

fn write_completions(shell: Shell, buf: &mut impl Write) -> Result<()> {
    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_owned();
    clap_complete::generate(shell, &mut cmd, bin_name, buf);
    buf.flush().context("Failed to write completions")
}
