use anyhow::{Result, bail};
use takedown_business::{Action, Dmca, FileEntity, FileId, FileIds, TakedownCtx, TakedownNotice};
use tracing::instrument;

use crate::commands::print_result;
use crate::context::drive;
use crate::output::Output;

/// Loads metadata by opening a notice that references `ids`, the same way a
/// notice arriving from the server would.
#[instrument(skip_all, name = "fetch", fields(id_count = ids.len()))]
pub async fn run_fetch(mut ctx: TakedownCtx, out: &Output, ids: Vec<u64>, json: bool) -> Result<()> {
    let file_ids: FileIds = ids.into_iter().map(FileId::Server).collect();
    let notice = TakedownNotice::default().with_dmca(Dmca {
        file_ids: file_ids.clone(),
        ..Dmca::default()
    });

    drive(&mut ctx, out, vec![Action::NoticeAdded(notice)]).await?;

    let state = ctx.snapshot();
    let files: Vec<FileEntity> = file_ids
        .iter()
        .filter_map(|id| state.file(id).cloned())
        .collect();
    print_result(out, json, None, &files)?;

    let failed = files.iter().filter(|file| file.error().is_some()).count();
    if failed > 0 {
        bail!("{failed} of {} lookup(s) failed", files.len());
    }
    Ok(())
}
