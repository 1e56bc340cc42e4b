use chrono::{DateTime, Utc};

use crate::model::{Document, DocumentId};
use crate::sync::store::{SharedStore, Subscription};

/// How a received snapshot relates to this session's writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOrigin {
    /// The notification for this session's own most recent write
    Echo,
    /// Written by another client (or an older write of ours)
    External,
}

/// Classify a snapshot by comparing its `updated_at` with the stamp of
/// this session's most recent successful write. Only an exact match is an
/// echo.
pub fn classify(last_own_write_at: Option<DateTime<Utc>>, snapshot: &Document) -> RemoteOrigin {
    if last_own_write_at == Some(snapshot.updated_at) {
        RemoteOrigin::Echo
    } else {
        RemoteOrigin::External
    }
}

/// A session's live feed of remote writes.
///
/// Template documents are never subscribed. A feed that fails to open or
/// drops later is retried up to `resubscribe_attempts` times, after which
/// the listener stays down and the session carries on without live
/// updates.
#[derive(Debug)]
pub struct RemoteListener {
    document_id: DocumentId,
    subscription: Option<Subscription>,
    resubscribe_attempts: u32,
    live: bool,
    /// False for documents that are never subscribed
    wanted: bool,
}

impl RemoteListener {
    /// A listener that never receives anything
    pub fn disabled(document_id: DocumentId) -> Self {
        Self {
            document_id,
            subscription: None,
            resubscribe_attempts: 0,
            live: false,
            wanted: false,
        }
    }

    pub async fn subscribe(
        store: &SharedStore,
        document_id: DocumentId,
        resubscribe_attempts: u32,
    ) -> Self {
        let mut listener = Self {
            document_id,
            subscription: None,
            resubscribe_attempts,
            live: false,
            wanted: true,
        };
        listener.connect(store, resubscribe_attempts + 1).await;
        listener
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    /// Should be receiving remote changes but is not
    pub fn is_unavailable(&self) -> bool {
        self.wanted && !self.live
    }

    /// Next remote snapshot. Pends forever while not subscribed. Returns
    /// `None` when the feed drops; call `recover` then.
    pub async fn next(&mut self) -> Option<Document> {
        match self.subscription.as_mut() {
            Some(subscription) => subscription.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Re-open a dropped feed
    pub async fn recover(&mut self, store: &SharedStore) -> bool {
        log::warn!("Live updates for {} dropped", self.document_id);
        self.subscription = None;
        self.live = false;
        self.connect(store, self.resubscribe_attempts).await
    }

    /// Release the feed. Safe to call more than once.
    pub fn unsubscribe(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
            log::debug!("Unsubscribed from {}", self.document_id);
        }
        self.live = false;
    }

    async fn connect(&mut self, store: &SharedStore, attempts: u32) -> bool {
        for attempt in 1..=attempts {
            match store.subscribe_to_updates(&self.document_id).await {
                Ok(subscription) => {
                    log::debug!("Subscribed to {}", self.document_id);
                    self.subscription = Some(subscription);
                    self.live = true;
                    return true;
                }
                Err(e) => log::warn!(
                    "Subscribing to {} failed (attempt {attempt}/{attempts}): {e}",
                    self.document_id
                ),
            }
        }
        false
    }
}
