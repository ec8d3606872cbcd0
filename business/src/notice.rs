//! Takedown notice documents.
//!
//! Notices are plain values: every edit goes through a `with_*` method that
//! returns a new notice, so a snapshot handed to a pipeline never changes under it.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::file::FileId;

/// Ordered, duplicate-free list of file references. Order is attachment order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FileIds(Vec<FileId>);

impl FileIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FileId> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[FileId] {
        &self.0
    }

    pub fn contains(&self, id: &FileId) -> bool {
        self.0.contains(id)
    }

    pub fn position(&self, id: &FileId) -> Option<usize> {
        self.0.iter().position(|candidate| candidate == id)
    }

    /// Appends `id` unless it is already present.
    pub fn with_pushed(&self, id: FileId) -> Self {
        if self.contains(&id) {
            return self.clone();
        }
        let mut ids = self.0.clone();
        ids.push(id);
        Self(ids)
    }

    pub fn without(&self, id: &FileId) -> Self {
        Self(self.0.iter().filter(|c| *c != id).copied().collect())
    }

    /// Puts `new` where `old` was. `None` when `old` is not present.
    ///
    /// If `new` is already referenced elsewhere the earlier occurrence wins and
    /// the list shrinks by one instead of holding a duplicate.
    pub fn with_replaced(&self, old: &FileId, new: FileId) -> Option<Self> {
        let at = self.position(old)?;
        let mut ids = self.0.clone();
        ids[at] = new;
        Some(ids.into_iter().collect())
    }
}

impl FromIterator<FileId> for FileIds {
    fn from_iter<I: IntoIterator<Item = FileId>>(iter: I) -> Self {
        let mut seen = BTreeSet::new();
        Self(iter.into_iter().filter(|id| seen.insert(*id)).collect())
    }
}

impl<'a> IntoIterator for &'a FileIds {
    type Item = &'a FileId;
    type IntoIter = std::slice::Iter<'a, FileId>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<'de> Deserialize<'de> for FileIds {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<FileId>::deserialize(deserializer).map(FromIterator::from_iter)
    }
}

/// A wiki post announcing the takedown.
///
/// Only `title` and `text` are read here; any other key the server sends is
/// kept in `extra` and written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The DMCA section of a takedown notice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Dmca {
    pub lumen_send: Option<bool>,
    pub lumen_title: Option<String>,
    pub sender_name: Option<String>,
    pub sender_person: Option<String>,
    pub sender_firm: Option<String>,
    pub sender_address: Vec<String>,
    pub sender_city: Option<String>,
    pub sender_state: Option<String>,
    pub sender_zip: Option<String>,
    pub sender_country_code: Option<String>,
    pub sent: Option<String>,
    pub action_taken_id: Option<u64>,
    pub page_ids: BTreeSet<u64>,
    pub original_urls: Vec<String>,
    pub method: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub file_ids: FileIds,
    pub wmf_send: Option<bool>,
    pub wmf_title: Option<String>,
    pub commons_send: Option<bool>,
    pub commons_post: Post,
    pub commons_village_pump_send: Option<bool>,
    pub commons_village_pump_post: Post,
    pub user_notice_ids: BTreeSet<u64>,
}

impl Dmca {
    pub fn with_file_ids(&self, file_ids: FileIds) -> Self {
        Self {
            file_ids,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TakedownNotice {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dmca: Option<Dmca>,
}

impl TakedownNotice {
    pub fn with_dmca(&self, dmca: Dmca) -> Self {
        Self {
            dmca: Some(dmca),
            ..self.clone()
        }
    }

    /// File references of the DMCA section; empty when there is none.
    pub fn file_ids(&self) -> &[FileId] {
        self.dmca
            .as_ref()
            .map(|dmca| dmca.file_ids.as_slice())
            .unwrap_or_default()
    }

    pub fn references(&self, id: &FileId) -> bool {
        self.file_ids().contains(id)
    }

    /// Appends a file reference, creating the DMCA section if needed.
    pub fn with_file_attached(&self, id: FileId) -> Self {
        let dmca = self.dmca.clone().unwrap_or_default();
        let file_ids = dmca.file_ids.with_pushed(id);
        self.with_dmca(dmca.with_file_ids(file_ids))
    }

    /// `None` when the notice does not reference `id`.
    pub fn with_file_detached(&self, id: &FileId) -> Option<Self> {
        let dmca = self.dmca.as_ref().filter(|dmca| dmca.file_ids.contains(id))?;
        Some(self.with_dmca(dmca.with_file_ids(dmca.file_ids.without(id))))
    }
}

/// Outcome of splicing a server id into a notice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Correlation {
    /// The temporary id was found and replaced in place.
    Replaced(TakedownNotice),
    /// The temporary id is no longer referenced; the notice stays as it is.
    Miss,
}

/// Replaces `temporary` with `server` at the same position in the notice's file
/// references.
pub fn correlate(notice: &TakedownNotice, temporary: &FileId, server: FileId) -> Correlation {
    let Some(dmca) = notice.dmca.as_ref() else {
        return Correlation::Miss;
    };
    match dmca.file_ids.with_replaced(temporary, server) {
        Some(file_ids) => Correlation::Replaced(notice.with_dmca(dmca.with_file_ids(file_ids))),
        None => Correlation::Miss,
    }
}
