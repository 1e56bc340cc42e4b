use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{Document, DocumentId, PersistedContent};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(pub Uuid);

impl VersionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What produced a version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// Debounced save after a quiet period
    Autosave,
    /// Blur, explicit save or session close
    Manual,
    Restore,
}

/// Immutable point-in-time copy of a document's title and content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionSnapshot {
    pub version_id: VersionId,
    pub document_id: DocumentId,
    pub version_number: u64,
    pub title: String,
    pub content: PersistedContent,
    pub content_size: usize,
    pub saved_at: DateTime<Utc>,
    pub change_type: ChangeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl VersionSnapshot {
    /// Capture `doc` as it was persisted. `version_number` is assigned by
    /// the history store on append.
    pub fn capture(doc: &Document, change_type: ChangeType, author: Option<String>) -> Self {
        Self {
            version_id: VersionId::generate(),
            document_id: doc.id.clone(),
            version_number: 0,
            title: doc.title.clone(),
            content: doc.content.clone(),
            content_size: doc.content.size(),
            saved_at: doc.updated_at,
            change_type,
            author,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Block, BlockId, BlockKind};

    #[test]
    fn test_capture_copies_document_state() {
        let doc = Document {
            id: DocumentId::from("doc-1"),
            title: "Single".to_string(),
            content: vec![Block {
                id: BlockId::from("b1"),
                kind: BlockKind::Paragraph,
                content: "<p>abc</p>".to_string(),
            }]
            .into(),
            status: Default::default(),
            tags: vec![],
            due_date: None,
            artist_id: None,
            updated_at: Utc::now(),
        };

        let snapshot = VersionSnapshot::capture(&doc, ChangeType::Autosave, Some("sam".into()));

        assert_eq!(snapshot.document_id, doc.id);
        assert_eq!(snapshot.title, "Single");
        assert_eq!(snapshot.content, doc.content);
        assert_eq!(snapshot.content_size, "<p>abc</p>".len());
        assert_eq!(snapshot.saved_at, doc.updated_at);
        assert_eq!(snapshot.author.as_deref(), Some("sam"));
    }

    #[test]
    fn test_change_type_wire_names() {
        assert_eq!(
            serde_json::to_value(ChangeType::Autosave).unwrap(),
            serde_json::json!("autosave")
        );
        assert_eq!(
            serde_json::to_value(ChangeType::Restore).unwrap(),
            serde_json::json!("restore")
        );
    }
}
