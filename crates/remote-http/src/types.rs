//! Wire types for the document API.

use nocturne_core::sync::{Document, RemoteChange, RemoteChangeKind};
use serde::Deserialize;

/// Error envelope returned by the API on failure.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub code: String,
    pub message: String,
}

/// One listed document.
#[derive(Debug, Deserialize)]
pub struct DocumentEntry {
    pub id: String,
    pub doc: Document,
}

/// `GET /v1/collections/{c}/documents` response.
#[derive(Debug, Deserialize)]
pub struct CollectionResponse {
    pub documents: Vec<DocumentEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeEventKind {
    Added,
    Modified,
    Removed,
}

impl From<ChangeEventKind> for RemoteChangeKind {
    fn from(kind: ChangeEventKind) -> Self {
        match kind {
            ChangeEventKind::Added => Self::Added,
            ChangeEventKind::Modified => Self::Modified,
            ChangeEventKind::Removed => Self::Removed,
        }
    }
}

/// One event from the change feed.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    pub id: String,
    pub kind: ChangeEventKind,
    #[serde(default)]
    pub doc: Option<Document>,
}

impl From<ChangeEvent> for RemoteChange {
    fn from(event: ChangeEvent) -> Self {
        RemoteChange {
            id: event.id,
            kind: event.kind.into(),
            doc: event.doc,
        }
    }
}

/// `GET /v1/collections/{c}/changes` response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeFeedResponse {
    pub events: Vec<ChangeEvent>,
    #[serde(default)]
    pub next_cursor: Option<String>,
    #[serde(default)]
    pub has_more: bool,
}
