//! Scripted in-memory [`Transport`] for pipeline tests.
//!
//! Every call is recorded. Uploads follow a per-name script: the listed progress
//! reports are sent, then the upload optionally parks on a [`Notify`] gate before
//! resolving, which lets tests interleave deletes with in-flight uploads.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use flume::Sender;
use tokio::sync::Notify;

use crate::transport::{
    FileRecord, Progress, Transport, TransportError, UploadRequest, file_path, metadata_path,
    upload_path,
};

/// A recorded transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Upload {
        path: String,
        token: String,
        content_type: String,
        len: usize,
    },
    Delete {
        path: String,
        token: String,
    },
    Fetch {
        path: String,
        token: String,
    },
}

impl Call {
    pub fn path(&self) -> &str {
        match self {
            Self::Upload { path, .. } | Self::Delete { path, .. } | Self::Fetch { path, .. } => {
                path
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScriptedUpload {
    progress: Vec<Progress>,
    gate: Option<Arc<Notify>>,
    result: Result<FileRecord, TransportError>,
}

impl ScriptedUpload {
    /// Resolves with a server record carrying `id`.
    pub fn succeeds(id: u64) -> Self {
        Self {
            progress: Vec::new(),
            gate: None,
            result: Ok(FileRecord {
                id,
                name: String::new(),
                content_type: None,
                size: None,
            }),
        }
    }

    /// Resolves with a non-2xx status.
    pub fn fails(status: u16) -> Self {
        Self {
            progress: Vec::new(),
            gate: None,
            result: Err(TransportError::Status {
                status,
                message: String::new(),
            }),
        }
    }

    pub fn with_progress(mut self, reports: &[(u64, u64)]) -> Self {
        self.progress = reports
            .iter()
            .map(|&(loaded, total)| Progress { loaded, total })
            .collect();
        self
    }

    /// Holds the response back until `gate` is notified.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[derive(Debug, Default)]
struct Scripts {
    uploads: BTreeMap<String, ScriptedUpload>,
    fetches: BTreeMap<String, Result<FileRecord, TransportError>>,
    deletes: BTreeMap<String, Result<(), TransportError>>,
    calls: Vec<Call>,
}

/// Unscripted uploads and fetches answer 404; unscripted deletes succeed.
#[derive(Debug, Default)]
pub struct MockTransport {
    scripts: Mutex<Scripts>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_upload(self, name: &str, script: ScriptedUpload) -> Self {
        self.lock().uploads.insert(upload_path(name), script);
        self
    }

    pub fn with_fetch(self, id: u64, result: Result<FileRecord, TransportError>) -> Self {
        self.lock().fetches.insert(metadata_path(id), result);
        self
    }

    pub fn with_delete(self, id: u64, result: Result<(), TransportError>) -> Self {
        self.lock().deletes.insert(file_path(id), result);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// How many calls of any kind hit `path`.
    pub fn call_count(&self, path: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.path() == path)
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, Scripts> {
        self.scripts.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found(path: &str) -> TransportError {
    TransportError::Status {
        status: 404,
        message: format!("no script for {path}"),
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn upload(
        &self,
        request: UploadRequest,
        progress: Sender<Progress>,
    ) -> Result<FileRecord, TransportError> {
        let script = {
            let mut scripts = self.lock();
            scripts.calls.push(Call::Upload {
                path: request.path.clone(),
                token: request.token.clone(),
                content_type: request.content_type.to_string(),
                len: request.payload.len(),
            });
            scripts.uploads.get(&request.path).cloned()
        };
        let Some(script) = script else {
            return Err(not_found(&request.path));
        };

        for report in script.progress {
            let _ = progress.send(report);
            tokio::task::yield_now().await;
        }
        if let Some(gate) = script.gate {
            gate.notified().await;
        }
        script.result
    }

    async fn delete(&self, path: &str, token: &str) -> Result<(), TransportError> {
        let mut scripts = self.lock();
        scripts.calls.push(Call::Delete {
            path: path.to_owned(),
            token: token.to_owned(),
        });
        scripts.deletes.get(path).cloned().unwrap_or(Ok(()))
    }

    async fn fetch(&self, path: &str, token: &str) -> Result<FileRecord, TransportError> {
        let mut scripts = self.lock();
        scripts.calls.push(Call::Fetch {
            path: path.to_owned(),
            token: token.to_owned(),
        });
        scripts
            .fetches
            .get(path)
            .cloned()
            .unwrap_or_else(|| Err(not_found(path)))
    }
}
