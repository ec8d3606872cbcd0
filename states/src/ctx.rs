use std::sync::Arc;
use std::time::Duration;

use flume::{Receiver, Sender};
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;

use crate::{Emitter, Error, Pipeline, PipelineCtx, Reducer, SnapshotReader, Store};

const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Owns the store, the event stream and every registered pipeline.
///
/// Events enter either through [`dispatch`](Self::dispatch) (callers outside
/// the runtime, routed immediately) or through an [`Emitter`] held by a
/// spawned task (queued, routed on the next [`sync_events`](Self::sync_events)).
/// In both cases the reducer has already run when pipelines see the event.
pub struct StateCtx<R: Reducer> {
    store: Store<R>,
    emitter: Emitter<R>,
    recv: Receiver<R::Event>,
    pipelines: Vec<Box<dyn Pipeline<R>>>,
    subscribers: Vec<Sender<R::Event>>,
    tasks: JoinSet<()>,
    idle_timeout: Duration,
}

enum Step<E> {
    Event(Option<E>),
    Joined(Option<Result<(), JoinError>>),
    TimedOut,
}

impl<R: Reducer> StateCtx<R> {
    pub fn new(reducer: R, initial: R::State) -> Self {
        let store = Store::new(reducer, initial);
        let (send, recv) = flume::unbounded();
        Self {
            emitter: Emitter::new(store.clone(), send),
            store,
            recv,
            pipelines: Vec::new(),
            subscribers: Vec::new(),
            tasks: JoinSet::new(),
            idle_timeout: DEFAULT_IDLE_TIMEOUT,
        }
    }

    /// How long [`run_until_idle`](Self::run_until_idle) waits without any
    /// event or finished task before giving up.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn register(&mut self, pipeline: impl Pipeline<R> + 'static) {
        log::debug!("Registered pipeline {}", pipeline.name());
        self.pipelines.push(Box::new(pipeline));
    }

    pub fn store(&self) -> &Store<R> {
        &self.store
    }

    pub fn reader(&self) -> SnapshotReader<R::State> {
        self.store.reader()
    }

    pub fn snapshot(&self) -> Arc<R::State> {
        self.store.snapshot()
    }

    pub fn emitter(&self) -> Emitter<R> {
        self.emitter.clone()
    }

    /// Receives a copy of every event in the order pipelines see them.
    pub fn subscribe(&mut self) -> Receiver<R::Event> {
        let (send, recv) = flume::unbounded();
        self.subscribers.push(send);
        recv
    }

    /// Reduces and routes `event` right away. Anything tasks queued before it is
    /// routed first so pipelines and subscribers see events in emission order.
    pub fn dispatch(&mut self, event: R::Event) {
        self.sync_events();
        self.store.apply(&event);
        self.route(&event);
    }

    /// Routes every queued event to the pipelines. Returns how many were routed.
    pub fn sync_events(&mut self) -> usize {
        let mut routed = 0;
        while let Ok(event) = self.recv.try_recv() {
            self.route(&event);
            routed += 1;
        }
        routed
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Keeps routing events until no task is running and nothing is queued.
    ///
    /// Fails with [`Error::Timeout`] once a full idle timeout passes with no
    /// event routed and no task finished.
    pub async fn run_until_idle(&mut self) -> Result<(), Error> {
        let started = Instant::now();
        let mut deadline = started + self.idle_timeout;

        loop {
            self.sync_events();
            if self.tasks.is_empty() {
                if self.recv.is_empty() {
                    return Ok(());
                }
                continue;
            }

            let step = tokio::select! {
                biased;
                event = self.recv.recv_async() => Step::Event(event.ok()),
                joined = self.tasks.join_next() => Step::Joined(joined),
                () = tokio::time::sleep_until(deadline) => Step::TimedOut,
            };

            if !matches!(step, Step::TimedOut) {
                deadline = Instant::now() + self.idle_timeout;
            }
            match step {
                Step::Event(Some(event)) => self.route(&event),
                Step::Joined(Some(Err(err))) if err.is_panic() => {
                    log::error!("Pipeline task panicked: {err}");
                    return Err(Error::task_panicked(err.to_string()));
                }
                Step::Event(None) | Step::Joined(_) => {}
                Step::TimedOut => {
                    return Err(Error::timeout(started.elapsed(), self.tasks.len()));
                }
            }
        }
    }

    /// Cancels pipeline work, aborts every task and drops subscribers.
    pub async fn shutdown(&mut self) {
        for pipeline in &mut self.pipelines {
            pipeline.shutdown();
        }
        self.tasks.shutdown().await;
        self.subscribers.clear();
    }

    fn route(&mut self, event: &R::Event) {
        let mut ctx = PipelineCtx {
            store: &self.store,
            emitter: &self.emitter,
            tasks: &mut self.tasks,
        };
        for pipeline in &mut self.pipelines {
            pipeline.on_event(event, &mut ctx);
        }
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}
