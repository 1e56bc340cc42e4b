use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Block, join_blocks};

/// Opaque stable identifier of a document row
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Workflow status of a release sheet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseStatus {
    #[default]
    Draft,
    InProgress,
    Review,
    Approved,
    Released,
}

/// The `content` column as stored.
///
/// Current rows hold `{ "blocks": [...] }`. Older rows hold one HTML
/// string. Anything else is kept as-is and reads as an empty document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PersistedContent {
    Blocks { blocks: Vec<Block> },
    Html(String),
    Malformed(serde_json::Value),
}

impl PersistedContent {
    pub fn blocks(&self) -> Option<&[Block]> {
        match self {
            PersistedContent::Blocks { blocks } => Some(blocks),
            _ => None,
        }
    }

    /// The document's flat HTML form
    pub fn html(&self) -> String {
        match self {
            PersistedContent::Blocks { blocks } => join_blocks(blocks),
            PersistedContent::Html(html) => html.clone(),
            PersistedContent::Malformed(_) => String::new(),
        }
    }

    /// Size in bytes of the flat HTML form
    pub fn size(&self) -> usize {
        match self {
            PersistedContent::Blocks { blocks } => blocks.iter().map(|b| b.content.len()).sum(),
            PersistedContent::Html(html) => html.len(),
            PersistedContent::Malformed(_) => 0,
        }
    }
}

impl Default for PersistedContent {
    fn default() -> Self {
        PersistedContent::Blocks { blocks: Vec::new() }
    }
}

impl From<Vec<Block>> for PersistedContent {
    fn from(blocks: Vec<Block>) -> Self {
        PersistedContent::Blocks { blocks }
    }
}

/// A release sheet as persisted by the store.
///
/// `updated_at` is assigned by the store on every successful write and
/// strictly increases; sessions use it to recognise their own writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub title: String,
    #[serde(default)]
    pub content: PersistedContent,
    #[serde(default)]
    pub status: ReleaseStatus,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Owning artist; the reserved template artist marks template sheets
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist_id: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn is_template(&self, template_artist_id: &str) -> bool {
        self.artist_id.as_deref() == Some(template_artist_id)
    }
}

/// Partial update carrying only the fields that changed
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DocumentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<PersistedContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ReleaseStatus>,
    /// `Some(None)` clears the due date
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl DocumentPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.content.is_none()
            && self.status.is_none()
            && self.due_date.is_none()
            && self.tags.is_none()
    }

    /// Whether this patch would produce a new history version
    pub fn touches_versioned_fields(&self) -> bool {
        self.title.is_some() || self.content.is_some()
    }

    /// Write the patched fields into `doc`. `updated_at` is left to the store.
    pub fn apply_to(&self, doc: &mut Document) {
        if let Some(title) = &self.title {
            doc.title = title.clone();
        }
        if let Some(content) = &self.content {
            doc.content = content.clone();
        }
        if let Some(status) = self.status {
            doc.status = status;
        }
        if let Some(due_date) = self.due_date {
            doc.due_date = due_date;
        }
        if let Some(tags) = &self.tags {
            doc.tags = tags.clone();
        }
    }
}
