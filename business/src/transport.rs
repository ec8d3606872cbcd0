//! The network surface the pipelines depend on.
//!
//! Pipelines only ever talk to a [`Transport`]; [`HttpTransport`](crate::HttpTransport)
//! is the production implementation and `MockTransport`
//! the scripted one used in tests.

use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;
use flume::Sender;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ustr::Ustr;

/// Server description of a stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Bytes handed to the network so far for one upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub loaded: u64,
    pub total: u64,
}

#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub path: String,
    pub payload: Bytes,
    pub content_type: Ustr,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request failed with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("unreadable response (status {status}): {message}")]
    Decode { status: u16, message: String },
}

impl TransportError {
    /// Status code recorded on errored file entities. `0` means no response.
    pub fn status(&self) -> u16 {
        match self {
            Self::Status { status, .. } | Self::Decode { status, .. } => *status,
            Self::Network(_) => 0,
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Sends `request.payload` to `request.path`.
    ///
    /// Progress reports go to `progress` while the body is being sent; the
    /// sender is dropped when the call returns. Dropping the returned future
    /// aborts the request.
    async fn upload(
        &self,
        request: UploadRequest,
        progress: Sender<Progress>,
    ) -> Result<FileRecord, TransportError>;

    async fn delete(&self, path: &str, token: &str) -> Result<(), TransportError>;

    async fn fetch(&self, path: &str, token: &str) -> Result<FileRecord, TransportError>;
}

pub fn upload_path(name: &str) -> String {
    format!("/file/{}", urlencoding::encode(name))
}

pub fn file_path(id: u64) -> String {
    format!("/file/{id}")
}

/// Path for a metadata-only read, without the file body.
pub fn metadata_path(id: u64) -> String {
    format!("/file/{id}?metadata")
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}
