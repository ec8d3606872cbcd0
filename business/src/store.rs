//! Session state and the reducer that keeps it consistent with the event stream.

use std::collections::BTreeMap;

use takedown_states::Reducer;

use crate::action::Action;
use crate::file::{FileEntity, FileId, FileStatus};
use crate::notice::TakedownNotice;
use crate::transport::TransportError;

/// Last failed server-side delete, kept until the next one replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteFailure {
    pub file_id: FileId,
    pub error: TransportError,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TakedownState {
    pub token: Option<String>,
    /// The notice being composed; attachments land here.
    pub draft: TakedownNotice,
    /// Notices loaded from the server.
    pub notices: Vec<TakedownNotice>,
    pub files: BTreeMap<FileId, FileEntity>,
    pub last_delete_error: Option<DeleteFailure>,
}

impl TakedownState {
    pub fn with_token(token: Option<String>) -> Self {
        Self {
            token,
            ..Self::default()
        }
    }

    pub fn file(&self, id: &FileId) -> Option<&FileEntity> {
        self.files.get(id)
    }

    /// Bearer token for outgoing calls. Missing tokens go out empty and the
    /// server decides.
    pub fn bearer_token(&self) -> String {
        self.token.clone().unwrap_or_default()
    }

    /// Draft attachments in document order.
    pub fn draft_files(&self) -> impl Iterator<Item = &FileEntity> {
        self.draft
            .file_ids()
            .iter()
            .filter_map(|id| self.files.get(id))
    }

    fn with_files_added<'a>(&self, added: impl IntoIterator<Item = &'a FileEntity>) -> Self {
        let mut next = self.clone();
        for file in added {
            if file.status == FileStatus::Local {
                next.draft = next.draft.with_file_attached(file.id);
            }
            next.files.insert(file.id, file.clone());
        }
        next
    }

    fn with_file_removed(&self, id: &FileId) -> Self {
        let mut next = self.clone();
        next.files.remove(id);
        if let Some(draft) = next.draft.with_file_detached(id) {
            next.draft = draft;
        }
        next
    }
}

/// Applies [`Action`]s to [`TakedownState`].
#[derive(Debug, Default, Clone, Copy)]
pub struct TakedownReducer;

impl Reducer for TakedownReducer {
    type State = TakedownState;
    type Event = Action;

    fn reduce(&self, state: &TakedownState, action: &Action) -> Option<TakedownState> {
        match action {
            Action::AddFile(file) => Some(state.with_files_added([file])),
            Action::AddFiles(files) => Some(state.with_files_added(files)),
            Action::FileAdded(file) => {
                let mut next = state.clone();
                next.files.insert(file.id, file.clone());
                Some(next)
            }
            Action::FileUpdated(file) => {
                if !state.files.contains_key(&file.id) {
                    log::debug!("Dropping update for removed file {}", file.id);
                    return None;
                }
                let mut next = state.clone();
                next.files.insert(file.id, file.clone());
                Some(next)
            }
            Action::FileSwapped { previous, next: uploaded } => {
                if !state.files.contains_key(&previous.id) {
                    log::debug!("Dropping swap for removed file {}", previous.id);
                    return None;
                }
                let mut next = state.clone();
                next.files.remove(&previous.id);
                next.files.insert(uploaded.id, uploaded.clone());
                Some(next)
            }
            Action::DeleteFile(file) => {
                // server files stay until the delete call confirms
                if file.id.is_server() {
                    return None;
                }
                Some(state.with_file_removed(&file.id))
            }
            Action::DeleteComplete(file) => Some(state.with_file_removed(&file.id)),
            Action::DeleteError { file, error } => Some(TakedownState {
                last_delete_error: Some(DeleteFailure {
                    file_id: file.id,
                    error: error.clone(),
                }),
                ..state.clone()
            }),
            Action::NoticeAdded(notice) => {
                let mut next = state.clone();
                next.notices.push(notice.clone());
                Some(next)
            }
            Action::NoticesAdded(notices) => {
                let mut next = state.clone();
                next.notices.extend(notices.iter().cloned());
                Some(next)
            }
            Action::DocumentUpdated(draft) => Some(TakedownState {
                draft: draft.clone(),
                ..state.clone()
            }),
            Action::TokenSet(token) => Some(TakedownState {
                token: token.clone(),
                ..state.clone()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::Payload;
    use crate::transport::FileRecord;

    fn local(name: &str) -> FileEntity {
        FileEntity::local(name, Payload::new(b"bytes".to_vec(), "text/plain"))
    }

    fn reduce(state: &TakedownState, action: Action) -> TakedownState {
        TakedownReducer
            .reduce(state, &action)
            .unwrap_or_else(|| state.clone())
    }

    #[test]
    fn added_local_files_are_attached_in_order() {
        let (a, b) = (local("a.txt"), local("b.txt"));
        let state = reduce(
            &TakedownState::default(),
            Action::AddFiles(vec![a.clone(), b.clone()]),
        );

        assert_eq!(state.draft.file_ids(), &[a.id, b.id]);
        assert_eq!(state.files.len(), 2);
        let names: Vec<_> = state.draft_files().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["a.txt", "b.txt"]);
    }

    #[test]
    fn fetched_files_are_not_attached_to_the_draft() {
        let fetched = FileEntity::failed_placeholder(FileId::Server(7), 500);
        let state = reduce(&TakedownState::default(), Action::FileAdded(fetched));

        assert!(state.draft.file_ids().is_empty());
        assert!(state.file(&FileId::Server(7)).is_some());
    }

    #[test]
    fn update_for_removed_file_is_ignored() {
        let a = local("a.txt");
        let state = reduce(&TakedownState::default(), Action::AddFile(a.clone()));
        let state = reduce(&state, Action::DeleteFile(a.clone()));

        assert!(TakedownReducer
            .reduce(&state, &Action::FileUpdated(a.begin_upload()))
            .is_none());
        assert!(state.files.is_empty());
        assert!(state.draft.file_ids().is_empty());
    }

    #[test]
    fn swap_replaces_entity() {
        let a = local("a.txt").begin_upload();
        let state = reduce(&TakedownState::default(), Action::AddFile(a.clone()));
        let uploaded = a.swap_with(FileRecord {
            id: 42,
            name: "a.txt".to_owned(),
            content_type: None,
            size: None,
        });

        let state = reduce(
            &state,
            Action::FileSwapped {
                previous: a.clone(),
                next: uploaded.clone(),
            },
        );

        assert!(state.file(&a.id).is_none());
        assert_eq!(state.file(&FileId::Server(42)), Some(&uploaded));
    }

    #[test]
    fn server_file_stays_until_delete_completes() {
        let stored = FileEntity::failed_placeholder(FileId::Server(9), 0);
        let state = reduce(&TakedownState::default(), Action::FileAdded(stored.clone()));

        assert!(TakedownReducer
            .reduce(&state, &Action::DeleteFile(stored.clone()))
            .is_none());

        let failed = reduce(
            &state,
            Action::DeleteError {
                file: stored.clone(),
                error: TransportError::Network("offline".to_owned()),
            },
        );
        assert!(failed.file(&stored.id).is_some());
        assert_eq!(
            failed.last_delete_error.as_ref().map(|f| f.file_id),
            Some(stored.id)
        );

        let removed = reduce(&failed, Action::DeleteComplete(stored.clone()));
        assert!(removed.file(&stored.id).is_none());
    }

    #[test]
    fn token_and_notices() {
        let state = reduce(
            &TakedownState::default(),
            Action::TokenSet(Some("abc".to_owned())),
        );
        assert_eq!(state.bearer_token(), "abc");

        let state = reduce(
            &state,
            Action::NoticesAdded(vec![TakedownNotice::default(), TakedownNotice::default()]),
        );
        assert_eq!(state.notices.len(), 2);
    }
}
