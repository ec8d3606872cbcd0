use std::future::Future;
use std::sync::Arc;

use tokio::task::{AbortHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::{Emitter, Reducer, SnapshotReader, Store};

/// A reaction to the event stream.
///
/// `on_event` runs synchronously for every event, after the reducer has applied
/// it. Side effects that need to wait go into tasks spawned through the context;
/// their results come back as new events through an [`Emitter`].
pub trait Pipeline<R: Reducer> {
    fn name(&self) -> &'static str;

    fn on_event(&mut self, event: &R::Event, ctx: &mut PipelineCtx<'_, R>);

    /// Called once when the owning context shuts down.
    fn shutdown(&mut self) {}
}

/// What a pipeline can reach while handling one event.
pub struct PipelineCtx<'a, R: Reducer> {
    pub(crate) store: &'a Store<R>,
    pub(crate) emitter: &'a Emitter<R>,
    pub(crate) tasks: &'a mut JoinSet<()>,
}

impl<R: Reducer> PipelineCtx<'_, R> {
    pub fn snapshot(&self) -> Arc<R::State> {
        self.store.snapshot()
    }

    pub fn reader(&self) -> SnapshotReader<R::State> {
        self.store.reader()
    }

    pub fn emitter(&self) -> Emitter<R> {
        self.emitter.clone()
    }

    /// Emitter that falls silent once `token` is cancelled.
    pub fn emitter_bound_to(&self, token: CancellationToken) -> Emitter<R> {
        self.emitter.bound_to(token)
    }

    pub fn emit(&self, event: R::Event) -> bool {
        self.emitter.emit(event)
    }

    pub fn spawn<F>(&mut self, task: F) -> AbortHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.tasks.spawn(task)
    }
}
