//! Task management types for per-key cooperative cancellation.
//!
//! - `TaskId`: identifies one spawned task by its key and a generation counter
//! - `TaskHandle`: a task's `CancellationToken` plus the `AbortHandle` of the spawned future
//! - `TaskRegistry`: live handles indexed by key, so an event naming a key can
//!   cancel whatever is running for it
//!
//! Tasks race their suspension points against `token.cancelled()` and route every
//! emission through an [`Emitter`](crate::Emitter) bound to the same token, so once
//! the token fires nothing more leaves the task.

use std::collections::BTreeMap;
use std::fmt::Display;

use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use ustr::Ustr;

/// Unique identifier for a spawned task.
///
/// The key names what the task works on (for uploads, the file id). The generation
/// tells apart successive tasks spawned for the same key, so a finished task never
/// unregisters its replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId {
    key: Ustr,
    generation: u64,
}

impl TaskId {
    pub fn new(key: impl Display, generation: u64) -> Self {
        Self {
            key: Ustr::from(&key.to_string()),
            generation,
        }
    }

    pub fn key(&self) -> Ustr {
        self.key
    }

    /// Higher generation values indicate more recently spawned tasks.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Handle to a spawned async task with cooperative cancellation support.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: TaskId,
    cancel_token: CancellationToken,
    abort: Option<AbortHandle>,
}

impl TaskHandle {
    pub fn new(id: TaskId, cancel_token: CancellationToken) -> Self {
        Self {
            id,
            cancel_token,
            abort: None,
        }
    }

    /// Attaches the join-set handle so the registry can tell when the task is done.
    pub fn with_abort(mut self, abort: AbortHandle) -> Self {
        self.abort = Some(abort);
        self
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Requests cooperative cancellation.
    ///
    /// The future is not aborted here; it observes the token at its next
    /// suspension point and returns.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// `true` once the spawned future has completed. Handles that were never
    /// attached to a spawned task report `false`.
    pub fn is_finished(&self) -> bool {
        self.abort.as_ref().is_some_and(AbortHandle::is_finished)
    }
}

/// Live task handles indexed by key.
#[derive(Debug)]
pub struct TaskRegistry<K: Ord> {
    handles: BTreeMap<K, TaskHandle>,
    next_generation: u64,
}

impl<K: Ord> Default for TaskRegistry<K> {
    fn default() -> Self {
        Self {
            handles: BTreeMap::new(),
            next_generation: 0,
        }
    }
}

impl<K> TaskRegistry<K>
where
    K: Ord + Clone + Display,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fresh handle for `key`. Any task still registered under the
    /// same key is cancelled and replaced.
    pub fn begin(&mut self, key: &K) -> TaskHandle {
        self.prune();
        self.next_generation += 1;
        let handle = TaskHandle::new(
            TaskId::new(key, self.next_generation),
            CancellationToken::new(),
        );
        if let Some(previous) = self.handles.insert(key.clone(), handle.clone()) {
            log::debug!("Replacing task {:?} for key {}", previous.id(), key);
            previous.cancel();
        }
        handle
    }

    /// Stores the handle returned by [`begin`](Self::begin) once its future has
    /// been spawned. Ignored if a newer task took the key in the meantime.
    pub fn attach(&mut self, key: &K, abort: AbortHandle) {
        if let Some(handle) = self.handles.get_mut(key) {
            *handle = handle.clone().with_abort(abort);
        }
    }

    /// Cancels the task registered under `key`. Returns `false` when nothing
    /// was running for it.
    pub fn cancel(&mut self, key: &K) -> bool {
        match self.handles.remove(key) {
            Some(handle) if !handle.is_finished() => {
                handle.cancel();
                true
            }
            _ => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in std::mem::take(&mut self.handles) {
            handle.cancel();
        }
    }

    pub fn contains(&self, key: &K) -> bool {
        self.handles
            .get(key)
            .is_some_and(|handle| !handle.is_finished())
    }

    pub fn len(&self) -> usize {
        self.handles
            .values()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn prune(&mut self) {
        self.handles.retain(|_, handle| !handle.is_finished());
    }
}
