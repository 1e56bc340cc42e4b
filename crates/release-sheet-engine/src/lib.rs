//! Collaborative editing core for release sheets.
//!
//! A release sheet is a rich-text document made of ordered blocks. This
//! crate holds one editing session per open sheet: it parses persisted
//! HTML blocks into an editable tree, applies local edits, autosaves after
//! a quiet period, applies changes written by other clients without
//! reapplying its own echoes, and keeps a bounded version history with
//! restore.

pub mod editing;
pub mod model;
pub mod parsing;
pub mod session;
pub mod sync;

// Re-export key types for easier usage
pub use editing::{Cmd, EditSession, Patch, RenderedDocument, ScrollOffsets};
pub use model::*;
pub use session::{
    Collaborators, EditorHandle, SaveStatus, SessionError, SessionOptions, SessionState,
    SessionView, open,
};
pub use sync::{
    DocumentStore, HistoryError, HistoryStore, MemoryHistory, MemoryStore, NoopNotifier,
    NotificationEvent, Notifier, StoreError, Subscription,
};
