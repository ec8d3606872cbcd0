use std::sync::Arc;

use tokio::sync::watch;

/// Pure state transition applied to every event before pipelines see it.
///
/// Returning `None` means the event leaves the state untouched, so readers keep
/// the same `Arc` and no change notification is published.
pub trait Reducer: Send + Sync + 'static {
    type State: Send + Sync + 'static;
    type Event: Clone + Send + 'static;

    fn reduce(&self, state: &Self::State, event: &Self::Event) -> Option<Self::State>;
}

/// Copy-on-write store.
///
/// The current state lives behind an `Arc` inside a `watch` channel. Applying an
/// event builds a whole new value and swaps it in; readers holding an older
/// snapshot keep it untouched.
pub struct Store<R: Reducer> {
    inner: Arc<StoreInner<R>>,
}

struct StoreInner<R: Reducer> {
    reducer: R,
    publish: watch::Sender<Arc<R::State>>,
}

impl<R: Reducer> Clone for Store<R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<R: Reducer> Store<R> {
    pub fn new(reducer: R, initial: R::State) -> Self {
        let (publish, _) = watch::channel(Arc::new(initial));
        Self {
            inner: Arc::new(StoreInner { reducer, publish }),
        }
    }

    /// Reduces `event` against the current state. Returns whether a new
    /// snapshot was published.
    pub fn apply(&self, event: &R::Event) -> bool {
        let reducer = &self.inner.reducer;
        self.inner
            .publish
            .send_if_modified(|current| match reducer.reduce(current, event) {
                Some(next) => {
                    *current = Arc::new(next);
                    true
                }
                None => false,
            })
    }

    pub fn snapshot(&self) -> Arc<R::State> {
        Arc::clone(&self.inner.publish.borrow())
    }

    pub fn reader(&self) -> SnapshotReader<R::State> {
        SnapshotReader {
            recv: self.inner.publish.subscribe(),
        }
    }
}

/// Read-only query handle onto a [`Store`].
///
/// Async continuations hold one of these and ask for the snapshot at the moment
/// their result arrives, rather than capturing state when they were spawned.
pub struct SnapshotReader<S> {
    recv: watch::Receiver<Arc<S>>,
}

impl<S> Clone for SnapshotReader<S> {
    fn clone(&self) -> Self {
        Self {
            recv: self.recv.clone(),
        }
    }
}

impl<S> SnapshotReader<S> {
    pub fn snapshot(&self) -> Arc<S> {
        Arc::clone(&self.recv.borrow())
    }

    /// Runs `f` against the current snapshot without cloning the `Arc`.
    pub fn read<T>(&self, f: impl FnOnce(&S) -> T) -> T {
        f(&self.recv.borrow())
    }
}
