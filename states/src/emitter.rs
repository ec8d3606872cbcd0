use flume::Sender;
use tokio_util::sync::CancellationToken;

use crate::{Reducer, Store};

/// Write side of the event stream handed to pipelines and their tasks.
///
/// `emit` reduces the event into the store right away and queues it for the
/// pipelines, so a task reading a snapshot after emitting always sees its own
/// writes. An emitter bound to a cancellation token goes silent for good once
/// the token fires.
pub struct Emitter<R: Reducer> {
    store: Store<R>,
    send: Sender<R::Event>,
    cancel: Option<CancellationToken>,
}

impl<R: Reducer> Clone for Emitter<R> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            send: self.send.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<R: Reducer> Emitter<R> {
    pub(crate) fn new(store: Store<R>, send: Sender<R::Event>) -> Self {
        Self {
            store,
            send,
            cancel: None,
        }
    }

    /// Same stream, but every emission is dropped after `token` is cancelled.
    pub fn bound_to(&self, token: CancellationToken) -> Self {
        Self {
            store: self.store.clone(),
            send: self.send.clone(),
            cancel: Some(token),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    /// Returns `false` if the event was suppressed by cancellation or the
    /// stream is gone.
    pub fn emit(&self, event: R::Event) -> bool {
        if self.is_cancelled() {
            return false;
        }
        self.store.apply(&event);
        self.send.send(event).is_ok()
    }
}
