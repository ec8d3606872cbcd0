//! Event-driven state plumbing shared by the takedown client crates.
//!
//! A [`StateCtx`] owns a copy-on-write [`Store`], a stream of events and a set of
//! [`Pipeline`]s. Every event is reduced first, then handed to each pipeline,
//! which may spawn async work that emits further events through an [`Emitter`].

mod ctx;
mod emitter;
mod error;
mod pipeline;
mod state;
mod task;

pub use ctx::StateCtx;
pub use emitter::Emitter;
pub use error::Error;
pub use pipeline::{Pipeline, PipelineCtx};
pub use state::{Reducer, SnapshotReader, Store};
pub use task::{TaskHandle, TaskId, TaskRegistry};
