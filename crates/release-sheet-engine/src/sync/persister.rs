use tokio::sync::{mpsc, oneshot};

use crate::editing::DirtyFields;
use crate::model::{ChangeType, Document, DocumentId, DocumentPatch, VersionId, VersionSnapshot};
use crate::sync::notifier::{NotificationEvent, SharedNotifier, notify_detached};
use crate::sync::store::{HistoryError, SharedHistory, SharedStore, StoreError};

/// A restore asked for by the user, waiting for its turn to write
#[derive(Debug)]
pub struct RestoreRequest {
    pub version_id: VersionId,
    pub reply: oneshot::Sender<Result<Document, HistoryError>>,
}

/// Completion of a write started by the persister
#[derive(Debug)]
pub enum WriteOutcome {
    Persisted {
        change: ChangeType,
        /// Fields the write carried, to mark dirty again on failure
        sent: DirtyFields,
        result: Result<Document, StoreError>,
    },
    Restored {
        request: RestoreRequest,
        result: Result<Document, HistoryError>,
    },
}

/// Runs a session's writes off the event loop and reports each completion
/// on the outcome channel. Outcomes arriving after the session has gone
/// are dropped.
#[derive(Clone)]
pub struct Persister {
    document_id: DocumentId,
    store: SharedStore,
    history: SharedHistory,
    notifier: SharedNotifier,
    author: Option<String>,
    outcomes: mpsc::UnboundedSender<WriteOutcome>,
}

impl Persister {
    pub fn new(
        document_id: DocumentId,
        store: SharedStore,
        history: SharedHistory,
        notifier: SharedNotifier,
        author: Option<String>,
        outcomes: mpsc::UnboundedSender<WriteOutcome>,
    ) -> Self {
        Self {
            document_id,
            store,
            history,
            notifier,
            author,
            outcomes,
        }
    }

    pub fn persist(&self, patch: DocumentPatch, sent: DirtyFields, change: ChangeType) {
        log::debug!("Persisting {} ({:?}): {:?}", self.document_id, change, sent);
        let this = self.clone();
        tokio::spawn(async move {
            let result = persist(
                &this.store,
                &this.history,
                &this.notifier,
                &this.document_id,
                patch,
                change,
                this.author.clone(),
            )
            .await;
            let _ = this.outcomes.send(WriteOutcome::Persisted {
                change,
                sent,
                result,
            });
        });
    }

    pub fn restore(&self, request: RestoreRequest) {
        log::info!("Restoring {} to version {}", self.document_id, request.version_id);
        let this = self.clone();
        tokio::spawn(async move {
            let result = this
                .history
                .restore(&this.document_id, &request.version_id, this.author.clone())
                .await;
            if result.is_ok() {
                notify_detached(
                    &this.notifier,
                    NotificationEvent::VersionRestored {
                        document_id: this.document_id.clone(),
                        version_id: request.version_id.clone(),
                    },
                );
            }
            let _ = this.outcomes.send(WriteOutcome::Restored { request, result });
        });
    }
}

/// One save: write the patch, record a version when title or content
/// changed, then notify without waiting.
///
/// A failed version append is logged and does not fail the save; the
/// document itself is already written.
pub async fn persist(
    store: &SharedStore,
    history: &SharedHistory,
    notifier: &SharedNotifier,
    id: &DocumentId,
    patch: DocumentPatch,
    change: ChangeType,
    author: Option<String>,
) -> Result<Document, StoreError> {
    let versioned = patch.touches_versioned_fields();
    let doc = store.update(id, patch).await?;

    let mut version_number = None;
    if versioned {
        match history
            .append(id, VersionSnapshot::capture(&doc, change, author))
            .await
        {
            Ok(version) => {
                log::debug!("Recorded version {} of {}", version.version_number, id);
                version_number = Some(version.version_number);
            }
            Err(e) => log::warn!("Failed to record version of {id}: {e}"),
        }
    }

    notify_detached(
        notifier,
        NotificationEvent::DocumentSaved {
            document_id: id.clone(),
            title: doc.title.clone(),
            version_number,
        },
    );
    Ok(doc)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::{Block, BlockId, BlockKind, ReleaseStatus};
    use crate::sync::memory::{DEFAULT_HISTORY_LIMIT, MemoryHistory, MemoryStore};
    use crate::sync::notifier::NoopNotifier;
    use crate::sync::store::DocumentStore;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn setup() -> (Arc<MemoryStore>, SharedHistory, SharedNotifier, DocumentId) {
        let store = Arc::new(MemoryStore::new());
        store.insert(Document {
            id: DocumentId::from("doc-1"),
            title: "Single".to_string(),
            content: Default::default(),
            status: ReleaseStatus::Draft,
            tags: Vec::new(),
            due_date: None,
            artist_id: None,
            updated_at: Utc::now(),
        });
        let history: SharedHistory = Arc::new(MemoryHistory::new(store.clone(), DEFAULT_HISTORY_LIMIT));
        (store, history, Arc::new(NoopNotifier), DocumentId::from("doc-1"))
    }

    #[tokio::test]
    async fn test_persist_content_appends_version() {
        let (store, history, notifier, id) = setup();
        let shared: SharedStore = store.clone();
        let patch = DocumentPatch {
            content: Some(
                vec![Block {
                    id: BlockId::from("b1"),
                    kind: BlockKind::Paragraph,
                    content: "<p>Hi</p>".into(),
                }]
                .into(),
            ),
            ..Default::default()
        };

        let doc = persist(&shared, &history, &notifier, &id, patch, ChangeType::Manual, Some("ana".into()))
            .await
            .unwrap();

        let versions = history.list(&id).await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].content, doc.content);
        assert_eq!(versions[0].change_type, ChangeType::Manual);
        assert_eq!(versions[0].author.as_deref(), Some("ana"));
        assert_eq!(versions[0].saved_at, doc.updated_at);
    }

    #[tokio::test]
    async fn test_persist_metadata_only_skips_history() {
        let (store, history, notifier, id) = setup();
        let shared: SharedStore = store.clone();
        let patch = DocumentPatch {
            tags: Some(vec!["single".into()]),
            ..Default::default()
        };

        persist(&shared, &history, &notifier, &id, patch, ChangeType::Autosave, None)
            .await
            .unwrap();

        assert!(history.list(&id).await.unwrap().is_empty());
        assert_eq!(store.get(&id).await.unwrap().tags, vec!["single".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_write_records_nothing() {
        let (store, history, notifier, id) = setup();
        store.fail_writes(true);
        let shared: SharedStore = store.clone();
        let patch = DocumentPatch {
            title: Some("New".into()),
            ..Default::default()
        };

        let err = persist(&shared, &history, &notifier, &id, patch, ChangeType::Manual, None)
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::Unavailable(_)));
        assert!(history.list(&id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persister_reports_outcome() {
        let (store, history, notifier, id) = setup();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let persister = Persister::new(id.clone(), store.clone(), history, notifier, None, tx);
        let sent = DirtyFields {
            title: true,
            ..Default::default()
        };

        persister.persist(
            DocumentPatch {
                title: Some("New".into()),
                ..Default::default()
            },
            sent,
            ChangeType::Autosave,
        );

        match rx.recv().await.unwrap() {
            WriteOutcome::Persisted {
                change,
                sent: carried,
                result,
            } => {
                assert_eq!(change, ChangeType::Autosave);
                assert_eq!(carried, sent);
                assert_eq!(result.unwrap().title, "New");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
