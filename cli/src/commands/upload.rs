//! Attach local files to a fresh draft notice and upload them.

use std::path::PathBuf;

use anyhow::{Result, bail};
use takedown_business::{Action, FileEntity, TakedownCtx};
use tracing::instrument;

use crate::commands::print_result;
use crate::context::drive;
use crate::output::Output;
use crate::utils::read_attachment;

#[instrument(skip_all, name = "upload", fields(file_count = files.len()))]
pub async fn run_upload(
    mut ctx: TakedownCtx,
    out: &Output,
    files: &[PathBuf],
    json: bool,
) -> Result<()> {
    let attachments = files
        .iter()
        .map(|path| read_attachment(path))
        .collect::<Result<Vec<_>>>()?;
    out.info(format!("Uploading {} file(s)", attachments.len()));

    drive(&mut ctx, out, vec![Action::AddFiles(attachments)]).await?;

    let state = ctx.snapshot();
    let files: Vec<FileEntity> = state.draft_files().cloned().collect();
    print_result(out, json, Some(&state.draft), &files)?;

    let failed = files.iter().filter(|file| file.error().is_some()).count();
    if failed > 0 {
        bail!("{failed} of {} upload(s) failed", files.len());
    }
    Ok(())
}
