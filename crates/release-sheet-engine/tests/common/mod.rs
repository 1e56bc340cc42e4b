#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use release_sheet_engine::sync::{NotificationEvent, Notifier};
use release_sheet_engine::{
    Block, BlockId, BlockKind, Collaborators, Document, DocumentId, DocumentPatch, EditorHandle,
    MemoryHistory, MemoryStore, ReleaseStatus, SaveStatus, SessionOptions, SessionView,
};

pub const QUIET_PERIOD: Duration = Duration::from_millis(500);

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Notifier that remembers every event
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<NotificationEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: NotificationEvent) {
        self.events.lock().unwrap().push(event);
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub history: Arc<MemoryHistory>,
    pub notifier: Arc<RecordingNotifier>,
    pub id: DocumentId,
}

impl Harness {
    pub fn new(doc: Document) -> Self {
        Self::with_history_limit(doc, 10)
    }

    pub fn with_history_limit(doc: Document, limit: usize) -> Self {
        init_logging();
        let id = doc.id.clone();
        let store = Arc::new(MemoryStore::new());
        store.insert(doc);
        let history = Arc::new(MemoryHistory::new(store.clone(), limit));
        Self {
            store,
            history,
            notifier: Arc::new(RecordingNotifier::default()),
            id,
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators::new(self.store.clone(), self.history.clone())
            .with_notifier(self.notifier.clone())
    }

    pub fn options(&self) -> SessionOptions {
        SessionOptions {
            quiet_period: QUIET_PERIOD,
            author: Some("tester".to_string()),
            ..SessionOptions::default()
        }
    }

    pub async fn open(&self) -> EditorHandle {
        let mut handle = release_sheet_engine::open(self.id.clone(), self.collaborators(), self.options())
            .await
            .unwrap();
        handle.wait_for(|v| v.state.is_open()).await.unwrap();
        handle
    }

    /// Write from another client
    pub async fn remote_write(&self, patch: DocumentPatch) -> Document {
        use release_sheet_engine::DocumentStore;
        self.store.update(&self.id, patch).await.unwrap()
    }

    pub fn stored(&self) -> Document {
        self.store.document(&self.id).unwrap()
    }
}

pub fn sheet(id: &str, paragraphs: &[&str]) -> Document {
    Document {
        id: DocumentId::from(id),
        title: "Summer Single".to_string(),
        content: blocks(paragraphs).into(),
        status: ReleaseStatus::Draft,
        tags: vec!["single".to_string()],
        due_date: None,
        artist_id: Some("artist-7".to_string()),
        updated_at: Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap(),
    }
}

pub fn blocks(paragraphs: &[&str]) -> Vec<Block> {
    paragraphs
        .iter()
        .enumerate()
        .map(|(i, html)| Block {
            id: BlockId::from(format!("block-{i}").as_str()),
            kind: BlockKind::Paragraph,
            content: html.to_string(),
        })
        .collect()
}

pub fn content_patch(paragraphs: &[&str]) -> DocumentPatch {
    DocumentPatch {
        content: Some(blocks(paragraphs).into()),
        ..Default::default()
    }
}

/// Wait until everything local has been written
pub async fn wait_saved(handle: &mut EditorHandle) -> SessionView {
    handle
        .wait_for(|v| {
            v.state.is_ready() && v.save_status == SaveStatus::Saved
        })
        .await
        .unwrap()
}

/// Let spawned tasks and timers run
pub async fn settle() {
    for _ in 0..20 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
