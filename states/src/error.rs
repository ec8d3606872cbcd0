use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Timed out after {waited:?} with {pending} task(s) still running")]
    Timeout { waited: Duration, pending: usize },
    #[error("Task {context} panicked")]
    TaskPanicked { context: String },
}

impl Error {
    pub fn timeout(waited: Duration, pending: usize) -> Self {
        Self::Timeout { waited, pending }
    }

    pub fn task_panicked(context: impl Into<String>) -> Self {
        Self::TaskPanicked {
            context: context.into(),
        }
    }
}
