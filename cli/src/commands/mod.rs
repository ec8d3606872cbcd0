//! Subcommand implementations for the takedown CLI.
//!
//! Each subcommand is implemented in its own module.

pub mod completions;
pub mod delete;
pub mod fetch;
pub mod upload;

pub use completions::generate_completions;
pub use delete::run_delete;
pub use fetch::run_fetch;
pub use upload::run_upload;

use anyhow::{Context as _, Result};
use takedown_business::{FileEntity, TakedownNotice};

use crate::output::Output;

/// Prints the outcome of a command as a table, or as JSON with `--json`.
pub fn print_result(
    out: &Output,
    json: bool,
    notice: Option<&TakedownNotice>,
    files: &[FileEntity],
) -> Result<()> {
    if json {
        let document = serde_json::json!({
            "notice": notice,
            "files": files,
        });
        let rendered =
            serde_json::to_string_pretty(&document).context("Failed to render JSON output")?;
        out.print(rendered);
    } else {
        out.files(files);
    }
    Ok(())
}
