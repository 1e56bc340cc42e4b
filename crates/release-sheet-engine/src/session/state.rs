use chrono::{DateTime, NaiveDate, Utc};

use crate::editing::{CaretPosition, RenderedDocument, ScrollOffsets};
use crate::model::{DocumentId, ReleaseStatus};

/// Lifecycle of an editor session. While open, editing and syncing can
/// overlap: the user may keep typing while a save is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Loading,
    Open {
        /// Local edits not yet written
        editing: bool,
        /// A write is in flight
        syncing: bool,
    },
    Closed,
}

impl SessionState {
    pub fn is_open(&self) -> bool {
        matches!(self, SessionState::Open { .. })
    }

    pub fn is_ready(&self) -> bool {
        matches!(
            self,
            SessionState::Open {
                editing: false,
                syncing: false
            }
        )
    }

    pub fn is_editing(&self) -> bool {
        matches!(self, SessionState::Open { editing: true, .. })
    }

    pub fn is_syncing(&self) -> bool {
        matches!(self, SessionState::Open { syncing: true, .. })
    }
}

/// Save indicator shown next to the editor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    Saved,
    Unsaved,
    Saving,
    /// Last save failed; edits are kept and retried on the next save
    Failed(String),
}

/// What the UI needs to draw the editor, published after every event
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub document_id: DocumentId,
    pub state: SessionState,
    pub save_status: SaveStatus,
    pub title: String,
    pub status: ReleaseStatus,
    pub tags: Vec<String>,
    pub due_date: Option<NaiveDate>,
    pub rendered: RenderedDocument,
    pub focused: bool,
    pub caret: Option<CaretPosition>,
    pub scroll: ScrollOffsets,
    /// Receiving remote changes
    pub live: bool,
    pub last_saved_at: Option<DateTime<Utc>>,
    /// User-facing notice, e.g. a failed restore
    pub message: Option<String>,
    /// Local edit counter
    pub version: u64,
}

impl SessionView {
    pub fn loading(document_id: DocumentId) -> Self {
        Self {
            document_id,
            state: SessionState::Loading,
            save_status: SaveStatus::Saved,
            title: String::new(),
            status: ReleaseStatus::default(),
            tags: Vec::new(),
            due_date: None,
            rendered: RenderedDocument::default(),
            focused: false,
            caret: None,
            scroll: ScrollOffsets::default(),
            live: false,
            last_saved_at: None,
            message: None,
            version: 0,
        }
    }
}
