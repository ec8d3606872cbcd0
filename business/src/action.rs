use crate::file::FileEntity;
use crate::notice::TakedownNotice;
use crate::transport::TransportError;

/// Every event that flows through the takedown event stream.
///
/// The first group comes from the UI, the second is produced by the pipelines.
/// Pipelines and the reducer match on this exhaustively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// A single file was attached.
    AddFile(FileEntity),
    /// Several files were attached at once.
    AddFiles(Vec<FileEntity>),
    /// The user removed a file. Also cancels an in-flight upload of it.
    DeleteFile(FileEntity),
    NoticeAdded(TakedownNotice),
    NoticesAdded(Vec<TakedownNotice>),

    /// New state of a file that keeps its id (upload started, progress, error).
    FileUpdated(FileEntity),
    /// An uploaded file took over from its temporary entity.
    FileSwapped {
        previous: FileEntity,
        next: FileEntity,
    },
    /// Metadata for an already stored file, or an error placeholder for it.
    FileAdded(FileEntity),
    DeleteComplete(FileEntity),
    DeleteError {
        file: FileEntity,
        error: TransportError,
    },
    /// Replacement for the draft notice.
    DocumentUpdated(TakedownNotice),

    /// Session bearer token changed.
    TokenSet(Option<String>),
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddFile(_) => "add-file",
            Self::AddFiles(_) => "add-files",
            Self::DeleteFile(_) => "delete-file",
            Self::NoticeAdded(_) => "notice-added",
            Self::NoticesAdded(_) => "notices-added",
            Self::FileUpdated(_) => "file-updated",
            Self::FileSwapped { .. } => "file-swapped",
            Self::FileAdded(_) => "file-added",
            Self::DeleteComplete(_) => "delete-complete",
            Self::DeleteError { .. } => "delete-error",
            Self::DocumentUpdated(_) => "document-updated",
            Self::TokenSet(_) => "token-set",
        }
    }
}
