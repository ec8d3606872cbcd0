//! Takedown notice file attachments.
//!
//! Files attached to a draft notice are uploaded, deleted and looked up by three
//! [pipelines](crate::pipelines) reacting to a shared stream of [`Action`]s. The
//! [`TakedownReducer`] keeps [`TakedownState`] in step with that stream.

mod action;
mod config;
mod file;
mod http;
#[cfg(any(test, feature = "test-utils"))]
mod mock;
mod notice;
pub mod pipelines;
mod store;
mod transport;

use std::sync::Arc;

use takedown_states::StateCtx;

pub use action::Action;
pub use config::BusinessConfig;
pub use file::{FileEntity, FileId, FileStatus, IdError, Payload, percent};
pub use http::{HttpTransport, Method, Response};
#[cfg(any(test, feature = "test-utils"))]
pub use mock::{Call, MockTransport, ScriptedUpload};
pub use notice::{Correlation, Dmca, FileIds, Post, TakedownNotice, correlate};
pub use pipelines::{DeletePipeline, FetchPipeline, UploadPipeline};
pub use store::{DeleteFailure, TakedownReducer, TakedownState};
pub use transport::{
    FileRecord, Progress, Transport, TransportError, UploadRequest, bearer, file_path,
    metadata_path, upload_path,
};

pub type TakedownCtx = StateCtx<TakedownReducer>;

/// A context with the upload, delete and fetch pipelines registered, seeded with
/// the configured session token.
pub fn build_state_ctx(transport: Arc<dyn Transport>, config: &BusinessConfig) -> TakedownCtx {
    let mut ctx = StateCtx::new(
        TakedownReducer,
        TakedownState::with_token(config.token.clone()),
    );
    ctx.register(UploadPipeline::new(Arc::clone(&transport)));
    ctx.register(DeletePipeline::new(Arc::clone(&transport)));
    ctx.register(FetchPipeline::new(transport));
    ctx
}

/// [`build_state_ctx`] over HTTP.
pub fn build_http_state_ctx(config: &BusinessConfig) -> TakedownCtx {
    build_state_ctx(Arc::new(HttpTransport::new(config)), config)
}
