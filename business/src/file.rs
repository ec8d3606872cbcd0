//! File entities and their upload lifecycle.
//!
//! A [`FileEntity`] moves `Local -> Uploading -> {Uploaded | Error}`. Every
//! transition returns a new value; entities already held by the store or by an
//! earlier snapshot are never touched.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ustr::Ustr;
use uuid::Uuid;

use crate::transport::FileRecord;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("{0:?} is not a server-issued file identifier")]
    InvalidIdentifier(String),
}

/// Identity of an attached file.
///
/// Temporary ids are generated client-side when a file is attached and only live
/// until the upload completes. Server ids are numeric and shared across notices.
/// In JSON a server id is a number and a temporary id a UUID string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FileId {
    Server(u64),
    Temporary(Uuid),
}

impl FileId {
    pub fn temporary() -> Self {
        Self::Temporary(Uuid::new_v4())
    }

    pub fn is_server(&self) -> bool {
        matches!(self, Self::Server(_))
    }

    /// The numeric server id, or `InvalidIdentifier` for an id the server has
    /// never seen.
    pub fn server(&self) -> Result<u64, IdError> {
        match self {
            Self::Server(id) => Ok(*id),
            Self::Temporary(uuid) => Err(IdError::InvalidIdentifier(uuid.to_string())),
        }
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Server(id) => write!(f, "{id}"),
            Self::Temporary(uuid) => write!(f, "{uuid}"),
        }
    }
}

impl FromStr for FileId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            return s
                .parse()
                .map(Self::Server)
                .map_err(|_| IdError::InvalidIdentifier(s.to_owned()));
        }
        Uuid::parse_str(s)
            .map(Self::Temporary)
            .map_err(|_| IdError::InvalidIdentifier(s.to_owned()))
    }
}

/// Raw bytes of a local file plus the content type declared when it was attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub bytes: Bytes,
    pub content_type: Ustr,
}

impl Payload {
    pub fn new(bytes: impl Into<Bytes>, content_type: &str) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: Ustr::from(content_type),
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Upload lifecycle. Progress only exists while uploading and an error code only
/// in the error state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FileStatus {
    #[default]
    Local,
    Uploading {
        progress: u8,
    },
    Uploaded,
    Error {
        /// Transport status code, `0` when no response was received.
        error: u16,
    },
}

impl FileStatus {
    pub fn progress(&self) -> Option<u8> {
        match self {
            Self::Uploading { progress } => Some(*progress),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<u16> {
        match self {
            Self::Error { error } => Some(*error),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Uploaded | Self::Error { .. })
    }
}

/// Converts a `(loaded, total)` progress report into a truncated percentage.
/// Reports with a zero total carry no information and yield `None`.
pub fn percent(loaded: u64, total: u64) -> Option<u8> {
    if total == 0 {
        return None;
    }
    let loaded = u128::from(loaded.min(total));
    let pct = loaded * 100 / u128::from(total);
    u8::try_from(pct).ok()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntity {
    pub id: FileId,
    pub name: Ustr,
    #[serde(skip)]
    pub payload: Option<Payload>,
    #[serde(flatten)]
    pub status: FileStatus,
    /// Content type reported by the server, once known.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<Ustr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl FileEntity {
    /// A freshly attached file with a new temporary id.
    pub fn local(name: &str, payload: Payload) -> Self {
        Self {
            id: FileId::temporary(),
            name: Ustr::from(name),
            size: Some(payload.len() as u64),
            payload: Some(payload),
            status: FileStatus::Local,
            content_type: None,
        }
    }

    /// An entity for a file the server already holds.
    pub fn from_record(record: FileRecord) -> Self {
        Self {
            id: FileId::Server(record.id),
            name: Ustr::from(&record.name),
            payload: None,
            status: FileStatus::Uploaded,
            content_type: record.content_type.as_deref().map(Ustr::from),
            size: record.size,
        }
    }

    /// Stand-in for a referenced file whose metadata could not be fetched.
    pub fn failed_placeholder(id: FileId, error: u16) -> Self {
        Self {
            id,
            name: Ustr::from(""),
            payload: None,
            status: FileStatus::Error { error },
            content_type: None,
            size: None,
        }
    }

    pub fn progress(&self) -> Option<u8> {
        self.status.progress()
    }

    pub fn error(&self) -> Option<u16> {
        self.status.error()
    }

    pub fn begin_upload(&self) -> Self {
        Self {
            status: FileStatus::Uploading { progress: 0 },
            ..self.clone()
        }
    }

    /// Applies a progress report of `pct` (clamped to 100). Progress never
    /// goes backwards: a lower report keeps the current value.
    ///
    /// Returns `None` when the entity is not uploading.
    pub fn with_progress(&self, pct: u8) -> Option<Self> {
        let current = self.progress()?;
        Some(Self {
            status: FileStatus::Uploading {
                progress: current.max(pct.min(100)),
            },
            ..self.clone()
        })
    }

    pub fn fail(&self, error: u16) -> Self {
        Self {
            status: FileStatus::Error { error },
            ..self.clone()
        }
    }

    /// The server-identified entity that replaces this one after a successful
    /// upload. The local payload is dropped.
    pub fn swap_with(&self, record: FileRecord) -> Self {
        let mut uploaded = Self::from_record(record);
        if uploaded.name.is_empty() {
            uploaded.name = self.name;
        }
        if uploaded.content_type.is_none() {
            uploaded.content_type = self.payload.as_ref().map(|p| p.content_type);
        }
        if uploaded.size.is_none() {
            uploaded.size = self.size;
        }
        uploaded
    }
}
