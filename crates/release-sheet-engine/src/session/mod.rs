//! Editor session: the event loop tying edits, autosave, remote changes
//! and restores together, and the handle the UI drives it through.

pub mod controller;
pub mod handle;
pub mod state;

pub use controller::{
    Collaborators, DEFAULT_TEMPLATE_ARTIST_ID, LIVE_UPDATES_UNAVAILABLE, SessionOptions,
};
pub use handle::{EditorHandle, SessionError, open};
pub use state::{SaveStatus, SessionState, SessionView};
