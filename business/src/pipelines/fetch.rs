use std::collections::BTreeSet;
use std::sync::Arc;

use takedown_states::{Pipeline, PipelineCtx};

use crate::action::Action;
use crate::file::{FileEntity, FileId};
use crate::notice::TakedownNotice;
use crate::store::{TakedownReducer, TakedownState};
use crate::transport::{Transport, metadata_path};

/// Loads metadata for every file referenced by newly added notices.
///
/// Ids are deduplicated across one incoming batch only, so an id referenced by
/// two notices of the same batch is fetched once. Failures turn into error
/// placeholders so every reference still resolves to an entity.
#[derive(Debug)]
pub struct FetchPipeline {
    transport: Arc<dyn Transport>,
}

impl FetchPipeline {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    fn fetch_referenced(
        &self,
        notices: &[TakedownNotice],
        ctx: &mut PipelineCtx<'_, TakedownReducer>,
    ) {
        let mut seen = BTreeSet::new();
        let ids = notices
            .iter()
            .flat_map(TakedownNotice::file_ids)
            .filter_map(|id| match id.server() {
                Ok(id) => Some(id),
                Err(_) => {
                    log::debug!("fetch {id}: temporary id, skipped");
                    None
                }
            })
            .filter(|id| seen.insert(*id))
            .collect::<Vec<_>>();

        for id in ids {
            self.fetch(id, ctx);
        }
    }

    fn fetch(&self, id: u64, ctx: &mut PipelineCtx<'_, TakedownReducer>) {
        let transport = Arc::clone(&self.transport);
        let reader = ctx.reader();
        let emitter = ctx.emitter();

        ctx.spawn(async move {
            let token = reader.read(TakedownState::bearer_token);
            let file = match transport.fetch(&metadata_path(id), &token).await {
                Ok(record) => FileEntity::from_record(record),
                Err(err) => {
                    log::warn!("fetch {id}: {err}");
                    FileEntity::failed_placeholder(FileId::Server(id), err.status())
                }
            };
            emitter.emit(Action::FileAdded(file));
        });
    }
}

impl Pipeline<TakedownReducer> for FetchPipeline {
    fn name(&self) -> &'static str {
        "fetch"
    }

    fn on_event(&mut self, action: &Action, ctx: &mut PipelineCtx<'_, TakedownReducer>) {
        match action {
            Action::NoticeAdded(notice) => self.fetch_referenced(std::slice::from_ref(notice), ctx),
            Action::NoticesAdded(notices) => self.fetch_referenced(notices, ctx),
            Action::AddFile(_)
            | Action::AddFiles(_)
            | Action::DeleteFile(_)
            | Action::FileUpdated(_)
            | Action::FileSwapped { .. }
            | Action::FileAdded(_)
            | Action::DeleteComplete(_)
            | Action::DeleteError { .. }
            | Action::DocumentUpdated(_)
            | Action::TokenSet(_) => {}
        }
    }
}

