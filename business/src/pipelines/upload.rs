//! Upload pipeline.
//!
//! Picks up every `local` file from `AddFile` / `AddFiles`, marks it uploading,
//! streams it to `/file/<name>` and, once the server answers, swaps the
//! temporary entity for the server one and splices the new id into the draft.
//! A `DeleteFile` for the same id cancels the upload; nothing about that id
//! leaves the task afterwards.

use std::sync::Arc;

use takedown_states::{Emitter, Pipeline, PipelineCtx, SnapshotReader, TaskRegistry};
use tokio_util::sync::CancellationToken;

use crate::action::Action;
use crate::file::{FileEntity, FileId, FileStatus, Payload, percent};
use crate::notice::{Correlation, correlate};
use crate::store::{TakedownReducer, TakedownState};
use crate::transport::{Progress, Transport, UploadRequest, upload_path};

#[derive(Debug)]
pub struct UploadPipeline {
    transport: Arc<dyn Transport>,
    uploads: TaskRegistry<FileId>,
}

impl UploadPipeline {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            uploads: TaskRegistry::new(),
        }
    }

    fn start(&mut self, file: &FileEntity, ctx: &mut PipelineCtx<'_, TakedownReducer>) {
        if file.status != FileStatus::Local {
            return;
        }
        let Some(payload) = file.payload.clone() else {
            log::warn!("upload {}: nothing to send for {}", file.id, file.name);
            ctx.emit(Action::FileUpdated(file.fail(0)));
            return;
        };

        let handle = self.uploads.begin(&file.id);
        let emitter = ctx.emitter_bound_to(handle.cancellation_token());
        let uploading = file.begin_upload();
        emitter.emit(Action::FileUpdated(uploading.clone()));
        log::debug!("upload {}: started for {}", file.id, file.name);

        let abort = ctx.spawn(run_upload(
            Arc::clone(&self.transport),
            ctx.reader(),
            emitter,
            handle.cancellation_token(),
            uploading,
            payload,
        ));
        self.uploads.attach(&file.id, abort);
    }
}

impl Pipeline<TakedownReducer> for UploadPipeline {
    fn name(&self) -> &'static str {
        "upload"
    }

    fn on_event(&mut self, action: &Action, ctx: &mut PipelineCtx<'_, TakedownReducer>) {
        match action {
            Action::AddFile(file) => self.start(file, ctx),
            Action::AddFiles(files) => {
                for file in files {
                    self.start(file, ctx);
                }
            }
            Action::DeleteFile(file) => {
                if self.uploads.cancel(&file.id) {
                    log::info!("upload {}: cancelled", file.id);
                }
            }
            Action::NoticeAdded(_)
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

    fn shutdown(&mut self) {
        self.uploads.cancel_all();
    }
}

async fn run_upload(
    transport: Arc<dyn Transport>,
    reader: SnapshotReader<TakedownState>,
    emitter: Emitter<TakedownReducer>,
    cancel: CancellationToken,
    file: FileEntity,
    payload: Payload,
) {
    let request = UploadRequest {
        path: upload_path(&file.name),
        payload: payload.bytes,
        content_type: payload.content_type,
        token: reader.read(TakedownState::bearer_token),
    };
    let (progress_tx, progress_rx) = flume::unbounded();
    let mut upload = transport.upload(request, progress_tx);

    let mut current = file;
    let mut progress_open = true;
    let result = loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                log::debug!("upload {}: dropping request", current.id);
                return;
            }
            report = progress_rx.recv_async(), if progress_open => match report {
                Ok(report) => current = advance(&emitter, current, report),
                Err(_) => progress_open = false,
            },
            result = &mut upload => break result,
        }
    };
    // reports sent right before the response
    for report in progress_rx.try_iter() {
        current = advance(&emitter, current, report);
    }

    match result {
        Ok(record) => {
            let uploaded = current.swap_with(record);
            let server_id = uploaded.id;
            log::info!("upload {}: stored as {}", current.id, server_id);
            if !emitter.emit(Action::FileSwapped {
                previous: current.clone(),
                next: uploaded,
            }) {
                return;
            }

            // correlate against the draft as it is now, not as it was at start
            let draft = reader.read(|state| state.draft.clone());
            match correlate(&draft, &current.id, server_id) {
                Correlation::Replaced(notice) => {
                    emitter.emit(Action::DocumentUpdated(notice));
                }
                Correlation::Miss => {
                    log::debug!("upload {}: no longer referenced by the draft", current.id);
                }
            }
        }
        Err(err) => {
            log::warn!("upload {}: {err}", current.id);
            emitter.emit(Action::FileUpdated(current.fail(err.status())));
        }
    }
}

/// Emits an update for every report with a known total.
fn advance(emitter: &Emitter<TakedownReducer>, file: FileEntity, report: Progress) -> FileEntity {
    let Some(next) =
        percent(report.loaded, report.total).and_then(|pct| file.with_progress(pct))
    else {
        return file;
    };
    emitter.emit(Action::FileUpdated(next.clone()));
    next
}
