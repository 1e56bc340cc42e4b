//! In-memory store and history backends.
//!
//! Used by tests and by embedders that have no remote backend. Both honour
//! the full trait contracts: strictly increasing `updated_at`, delivery to
//! every subscriber including the writer, bounded FIFO history with
//! monotonic version numbers and serialized restores.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::mpsc;

use crate::model::{ChangeType, Document, DocumentId, DocumentPatch, VersionId, VersionSnapshot};
use crate::sync::store::{
    DocumentStore, HistoryError, HistoryStore, SharedStore, StoreError, Subscription,
};

/// Versions kept per document unless configured otherwise
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

struct Subscriber {
    id: u64,
    sender: mpsc::UnboundedSender<Document>,
}

#[derive(Default)]
struct StoreState {
    documents: HashMap<DocumentId, Document>,
    subscribers: HashMap<DocumentId, Vec<Subscriber>>,
    next_subscriber: u64,
    last_stamp: Option<DateTime<Utc>>,
    writes: Vec<(DocumentId, DocumentPatch)>,
}

impl StoreState {
    fn next_stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }

    fn publish(&mut self, doc: &Document) {
        if let Some(subscribers) = self.subscribers.get_mut(&doc.id) {
            subscribers.retain(|s| s.sender.send(doc.clone()).is_ok());
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
pub struct MemoryStore {
    state: Arc<Mutex<StoreState>>,
    fail_writes: AtomicBool,
    fail_subscriptions: AtomicBool,
    write_delay_ms: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, doc: Document) {
        let mut state = lock(&self.state);
        if state.last_stamp.is_none_or(|last| last < doc.updated_at) {
            state.last_stamp = Some(doc.updated_at);
        }
        state.documents.insert(doc.id.clone(), doc);
    }

    pub fn document(&self, id: &DocumentId) -> Option<Document> {
        lock(&self.state).documents.get(id).cloned()
    }

    /// Every successful write, in order
    pub fn writes(&self) -> Vec<(DocumentId, DocumentPatch)> {
        lock(&self.state).writes.clone()
    }

    pub fn subscriber_count(&self, id: &DocumentId) -> usize {
        lock(&self.state)
            .subscribers
            .get(id)
            .map_or(0, |subs| subs.iter().filter(|s| !s.sender.is_closed()).count())
    }

    /// Deliver a row to subscribers without storing it
    pub fn broadcast(&self, doc: &Document) {
        lock(&self.state).publish(doc);
    }

    /// Drop every live feed for a document, as a lost connection would
    pub fn drop_subscriptions(&self, id: &DocumentId) {
        lock(&self.state).subscribers.remove(id);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_subscriptions(&self, fail: bool) {
        self.fail_subscriptions.store(fail, Ordering::SeqCst);
    }

    /// Delay every write, to hold writes in flight in tests
    pub fn set_write_delay(&self, delay: Duration) {
        self.write_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, id: &DocumentId) -> Result<Document, StoreError> {
        lock(&self.state)
            .documents
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.clone()))
    }

    async fn update(&self, id: &DocumentId, patch: DocumentPatch) -> Result<Document, StoreError> {
        let delay = self.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("write failed".to_string()));
        }

        let mut state = lock(&self.state);
        let stamp = state.next_stamp();
        let doc = state
            .documents
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.clone()))?;
        patch.apply_to(doc);
        doc.updated_at = stamp;
        let doc = doc.clone();

        state.writes.push((id.clone(), patch));
        state.publish(&doc);
        Ok(doc)
    }

    async fn subscribe_to_updates(&self, id: &DocumentId) -> Result<Subscription, StoreError> {
        if self.fail_subscriptions.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("realtime channel down".to_string()));
        }

        let mut state = lock(&self.state);
        if !state.documents.contains_key(id) {
            return Err(StoreError::NotFound(id.clone()));
        }

        let subscriber_id = state.next_subscriber;
        state.next_subscriber += 1;
        let (sender, updates) = mpsc::unbounded_channel();
        state.subscribers.entry(id.clone()).or_default().push(Subscriber {
            id: subscriber_id,
            sender,
        });

        let weak = Arc::downgrade(&self.state);
        let key = id.clone();
        Ok(Subscription::new(id.clone(), updates, move || {
            if let Some(state) = weak.upgrade()
                && let Some(subs) = lock(&state).subscribers.get_mut(&key)
            {
                subs.retain(|s| s.id != subscriber_id);
            }
        }))
    }
}

#[derive(Default)]
struct VersionLog {
    entries: VecDeque<VersionSnapshot>,
    last_number: u64,
}

impl VersionLog {
    fn push(&mut self, mut snapshot: VersionSnapshot, capacity: usize) -> VersionSnapshot {
        self.last_number += 1;
        snapshot.version_number = self.last_number;
        self.entries.push_back(snapshot.clone());
        while self.entries.len() > capacity {
            self.entries.pop_front();
        }
        snapshot
    }
}

/// Bounded history over a shared document store. Restores write through
/// the store, so subscribers see them like any other write.
pub struct MemoryHistory {
    store: SharedStore,
    capacity: usize,
    logs: Mutex<HashMap<DocumentId, Arc<tokio::sync::Mutex<VersionLog>>>>,
}

impl MemoryHistory {
    pub fn new(store: SharedStore, capacity: usize) -> Self {
        Self {
            store,
            capacity: capacity.max(1),
            logs: Mutex::new(HashMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn log(&self, id: &DocumentId) -> Arc<tokio::sync::Mutex<VersionLog>> {
        lock(&self.logs).entry(id.clone()).or_default().clone()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistory {
    async fn append(
        &self,
        id: &DocumentId,
        snapshot: VersionSnapshot,
    ) -> Result<VersionSnapshot, HistoryError> {
        let log = self.log(id);
        let mut log = log.lock().await;
        Ok(log.push(snapshot, self.capacity))
    }

    async fn list(&self, id: &DocumentId) -> Result<Vec<VersionSnapshot>, HistoryError> {
        let log = self.log(id);
        let log = log.lock().await;
        Ok(log.entries.iter().rev().cloned().collect())
    }

    async fn restore(
        &self,
        id: &DocumentId,
        version_id: &VersionId,
        author: Option<String>,
    ) -> Result<Document, HistoryError> {
        let log = self.log(id);
        let mut log = log.lock().await;

        let source = log
            .entries
            .iter()
            .find(|v| &v.version_id == version_id)
            .cloned()
            .ok_or_else(|| HistoryError::NotFound {
                document_id: id.clone(),
                version_id: version_id.clone(),
            })?;

        let patch = DocumentPatch {
            content: Some(source.content),
            ..Default::default()
        };
        let doc = self.store.update(id, patch).await?;

        let recorded = log.push(
            VersionSnapshot::capture(&doc, ChangeType::Restore, author),
            self.capacity,
        );
        log::info!(
            "Restored {} to version {} as version {}",
            id,
            source.version_number,
            recorded.version_number
        );
        Ok(doc)
    }
}
