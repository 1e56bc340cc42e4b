use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::model::{Document, DocumentId, DocumentPatch, VersionId, VersionSnapshot};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("Document not found: {0}")]
    NotFound(DocumentId),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    #[error("Write rejected: {0}")]
    Rejected(String),
    #[error("Subscription closed")]
    SubscriptionClosed,
}

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("Version {version_id} of document {document_id} not found")]
    NotFound {
        document_id: DocumentId,
        version_id: VersionId,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Persistent storage for documents plus change notifications.
///
/// `update` must assign a strictly increasing `updated_at` on every write
/// and deliver the written row to every subscriber of that document,
/// including the writer's own subscription.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, id: &DocumentId) -> Result<Document, StoreError>;

    async fn update(&self, id: &DocumentId, patch: DocumentPatch) -> Result<Document, StoreError>;

    async fn subscribe_to_updates(&self, id: &DocumentId) -> Result<Subscription, StoreError>;
}

pub type SharedStore = Arc<dyn DocumentStore>;

/// Bounded version history per document.
///
/// Implementations keep at most a fixed number of snapshots, evicting the
/// oldest first, and number versions monotonically per document.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Store a snapshot, returning it with its assigned version number
    async fn append(
        &self,
        id: &DocumentId,
        snapshot: VersionSnapshot,
    ) -> Result<VersionSnapshot, HistoryError>;

    /// Retained snapshots, newest first
    async fn list(&self, id: &DocumentId) -> Result<Vec<VersionSnapshot>, HistoryError>;

    /// Copy a version's content back into the document. Restores of the
    /// same document never interleave. The restore itself is recorded as a
    /// new version credited to `author`.
    async fn restore(
        &self,
        id: &DocumentId,
        version_id: &VersionId,
        author: Option<String>,
    ) -> Result<Document, HistoryError>;
}

pub type SharedHistory = Arc<dyn HistoryStore>;

/// Live feed of a document's writes.
///
/// Dropping the subscription releases it with the store, so every path
/// that ends a session (close, error, task teardown) unsubscribes.
pub struct Subscription {
    document_id: DocumentId,
    updates: mpsc::UnboundedReceiver<Document>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(
        document_id: DocumentId,
        updates: mpsc::UnboundedReceiver<Document>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            document_id,
            updates,
            release: Some(Box::new(release)),
        }
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    /// Next written row. `None` once the store drops the feed.
    pub async fn recv(&mut self) -> Option<Document> {
        self.updates.recv().await
    }

    /// Release now rather than at end of scope
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            log::debug!("Releasing subscription for {}", self.document_id);
            release();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("document_id", &self.document_id)
            .finish_non_exhaustive()
    }
}
