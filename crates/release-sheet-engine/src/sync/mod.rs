//! Persistence and realtime plumbing: store traits, the in-memory backend,
//! the debounce/write queue, the persister, the remote listener and the
//! notifier seam.

pub mod debounce;
pub mod listener;
pub mod memory;
pub mod notifier;
pub mod persister;
pub mod store;

pub use debounce::{ChangeBuffer, DEFAULT_QUIET_PERIOD, NextWrite, WriteKind};
pub use listener::{RemoteListener, RemoteOrigin, classify};
pub use memory::{DEFAULT_HISTORY_LIMIT, MemoryHistory, MemoryStore};
pub use notifier::{NoopNotifier, NotificationEvent, Notifier, SharedNotifier, notify_detached};
pub use persister::{Persister, RestoreRequest, WriteOutcome, persist};
pub use store::{
    DocumentStore, HistoryError, HistoryStore, SharedHistory, SharedStore, StoreError, Subscription,
};
