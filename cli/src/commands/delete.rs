use anyhow::{Result, bail};
use takedown_business::{Action, FileEntity, FileId, FileRecord, TakedownCtx};
use tracing::instrument;

use crate::context::drive;
use crate::output::Output;

/// A stored file known only by id.
fn stored(id: u64) -> FileEntity {
    FileEntity::from_record(FileRecord {
        id,
        name: format!("#{id}"),
        content_type: None,
        size: None,
    })
}

#[instrument(skip_all, name = "delete", fields(id_count = ids.len()))]
pub async fn run_delete(mut ctx: TakedownCtx, out: &Output, ids: &[u64]) -> Result<()> {
    let actions = ids
        .iter()
        .flat_map(|&id| {
            let file = stored(id);
            [Action::FileAdded(file.clone()), Action::DeleteFile(file)]
        })
        .collect();

    drive(&mut ctx, out, actions).await?;

    let state = ctx.snapshot();
    let remaining: Vec<_> = ids
        .iter()
        .filter(|&&id| state.file(&FileId::Server(id)).is_some())
        .collect();
    if !remaining.is_empty() {
        bail!("{} of {} delete(s) failed", remaining.len(), ids.len());
    }
    Ok(())
}
