use std::sync::Arc;

use async_trait::async_trait;

use crate::model::{DocumentId, VersionId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationEvent {
    DocumentSaved {
        document_id: DocumentId,
        title: String,
        /// Present when the save produced a history version
        version_number: Option<u64>,
    },
    VersionRestored {
        document_id: DocumentId,
        version_id: VersionId,
    },
}

/// Side channel for save and restore events (activity feeds, mail).
/// Sessions never wait on it and ignore its failures.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: NotificationEvent);
}

pub type SharedNotifier = Arc<dyn Notifier>;

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _event: NotificationEvent) {}
}

/// Fire an event without waiting for it
pub fn notify_detached(notifier: &SharedNotifier, event: NotificationEvent) {
    let notifier = notifier.clone();
    tokio::spawn(async move {
        notifier.notify(event).await;
    });
}
