use std::sync::Arc;

use takedown_states::{Pipeline, PipelineCtx};

use crate::action::Action;
use crate::file::FileEntity;
use crate::store::{TakedownReducer, TakedownState};
use crate::transport::{Transport, file_path};

/// Deletes server-persisted files. Temporary files never reach the network;
/// the upload pipeline cancels them and the reducer drops them.
#[derive(Debug)]
pub struct DeletePipeline {
    transport: Arc<dyn Transport>,
}

impl DeletePipeline {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    fn delete(&self, file: &FileEntity, id: u64, ctx: &mut PipelineCtx<'_, TakedownReducer>) {
        let transport = Arc::clone(&self.transport);
        let reader = ctx.reader();
        let emitter = ctx.emitter();
        let file = file.clone();

        ctx.spawn(async move {
            let token = reader.read(TakedownState::bearer_token);
            match transport.delete(&file_path(id), &token).await {
                Ok(()) => {
                    log::info!("delete {id}: done");
                    emitter.emit(Action::DeleteComplete(file));
                }
                Err(error) => {
                    log::warn!("delete {id}: {error}");
                    emitter.emit(Action::DeleteError { file, error });
                }
            }
        });
    }
}

impl Pipeline<TakedownReducer> for DeletePipeline {
    fn name(&self) -> &'static str {
        "delete"
    }

    fn on_event(&mut self, action: &Action, ctx: &mut PipelineCtx<'_, TakedownReducer>) {
        match action {
            Action::DeleteFile(file) => match file.id.server() {
                Ok(id) => self.delete(file, id, ctx),
                Err(err) => log::debug!("delete {}: local only ({err})", file.id),
            },
            Action::AddFile(_)
            | Action::AddFiles(_)
            | Action::NoticeAdded(_)
            | Action::NoticesAdded(_)
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
