use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};

use crate::editing::Patch;
use crate::editing::caret::{self, CaretPosition};
use crate::editing::commands::{self, Cmd};
use crate::editing::render::{RenderedDocument, render};
use crate::model::{
    BlockId, DocTree, Document, DocumentId, DocumentPatch, PersistedContent, ReleaseStatus,
};
use crate::parsing::{from_persisted, to_persisted};
use crate::sync::listener::{RemoteOrigin, classify};

/// Document fields with local changes not yet persisted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DirtyFields {
    pub title: bool,
    pub content: bool,
    pub status: bool,
    pub due_date: bool,
    pub tags: bool,
}

impl DirtyFields {
    pub fn is_empty(&self) -> bool {
        !(self.title || self.content || self.status || self.due_date || self.tags)
    }

    pub fn merge(&mut self, other: DirtyFields) {
        self.title |= other.title;
        self.content |= other.content;
        self.status |= other.status;
        self.due_date |= other.due_date;
        self.tags |= other.tags;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollOffsets {
    pub top: f64,
    pub left: f64,
}

/// Transient UI state owned by the session. Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewState {
    pub focused: bool,
    pub caret: Option<CaretPosition>,
    pub scroll: ScrollOffsets,
    /// Embeds show their preview unless toggled off
    hidden_embeds: HashSet<BlockId>,
}

impl ViewState {
    pub fn embed_visible(&self, id: &BlockId) -> bool {
        !self.hidden_embeds.contains(id)
    }

    /// Flip an embed between preview and link. Returns the new visibility.
    pub fn toggle_embed(&mut self, id: &BlockId) -> bool {
        if self.hidden_embeds.remove(id) {
            true
        } else {
            self.hidden_embeds.insert(id.clone());
            false
        }
    }

    fn retain_embeds(&mut self, tree: &DocTree) {
        self.hidden_embeds.retain(|id| tree.position(id).is_some());
    }
}

/// In-memory editing state for one open document.
///
/// `base` is the last state known to be in the store, either written by
/// this session or received from a remote writer. The live title, metadata
/// and tree diverge from it as the user edits; `dirty` records which fields
/// have diverged since the last write was dispatched.
#[derive(Debug, Clone)]
pub struct EditSession {
    base: Document,
    title: String,
    status: ReleaseStatus,
    tags: Vec<String>,
    due_date: Option<NaiveDate>,
    tree: DocTree,
    rendered: RenderedDocument,
    view: ViewState,
    dirty: DirtyFields,
    last_own_write_at: Option<DateTime<Utc>>,
    last_saved_at: Option<DateTime<Utc>>,
    version: u64,
}

impl EditSession {
    pub fn open(doc: Document) -> Self {
        let tree = from_persisted(&doc.content, doc.id.as_str());
        let view = ViewState::default();
        let rendered = render(&tree, &view);

        Self {
            title: doc.title.clone(),
            status: doc.status,
            tags: doc.tags.clone(),
            due_date: doc.due_date,
            tree,
            rendered,
            view,
            dirty: DirtyFields::default(),
            last_own_write_at: None,
            last_saved_at: Some(doc.updated_at),
            version: 0,
            base: doc,
        }
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.base.id
    }

    /// Last state known to be persisted
    pub fn base(&self) -> &Document {
        &self.base
    }

    /// The live state as a document, content serialized from the tree
    pub fn document(&self) -> Document {
        Document {
            title: self.title.clone(),
            content: to_persisted(&self.tree).into(),
            status: self.status,
            tags: self.tags.clone(),
            due_date: self.due_date,
            ..self.base.clone()
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn status(&self) -> ReleaseStatus {
        self.status
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.due_date
    }

    pub fn tree(&self) -> &DocTree {
        &self.tree
    }

    pub fn rendered(&self) -> &RenderedDocument {
        &self.rendered
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn dirty(&self) -> DirtyFields {
        self.dirty
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn last_own_write_at(&self) -> Option<DateTime<Utc>> {
        self.last_own_write_at
    }

    pub fn last_saved_at(&self) -> Option<DateTime<Utc>> {
        self.last_saved_at
    }

    /// Local edit counter, bumped whenever the live state changes
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Apply a local edit. Commands that change nothing return a no-op
    /// patch and leave the session clean.
    pub fn apply_local(&mut self, cmd: Cmd) -> Patch {
        let mut fields = DirtyFields::default();
        let mut edit = None;

        match cmd {
            Cmd::SetTitle(title) => {
                if title != self.title {
                    self.title = title;
                    fields.title = true;
                }
            }
            Cmd::SetStatus(status) => {
                if status != self.status {
                    self.status = status;
                    fields.status = true;
                }
            }
            Cmd::SetDueDate(due_date) => {
                if due_date != self.due_date {
                    self.due_date = due_date;
                    fields.due_date = true;
                }
            }
            Cmd::SetTags(tags) => {
                if tags != self.tags {
                    self.tags = tags;
                    fields.tags = true;
                }
            }
            cmd => {
                edit = commands::apply_to_tree(&mut self.tree, &cmd);
                fields.content = edit.is_some();
            }
        }

        if fields.is_empty() {
            return Patch {
                version: self.version,
                ..Default::default()
            };
        }

        self.version += 1;
        self.dirty.merge(fields);

        let mut patch = Patch {
            fields,
            version: self.version,
            ..Default::default()
        };

        if let Some(edit) = edit {
            self.view.retain_embeds(&self.tree);
            self.rendered = render(&self.tree, &self.view);
            match edit.caret {
                Some(offset) => self.set_caret(Some(offset)),
                None => self.relocate_caret(),
            }
            patch.new_caret = self.view.caret.as_ref().map(|c| c.offset);
            patch.changed = edit.changed;
            patch.removed = edit.removed;
        }

        patch
    }

    pub fn set_focus(&mut self, focused: bool) {
        self.view.focused = focused;
    }

    pub fn set_caret(&mut self, offset: Option<usize>) {
        self.view.caret = offset.and_then(|o| caret::locate(&self.tree, o));
    }

    pub fn set_scroll(&mut self, scroll: ScrollOffsets) {
        self.view.scroll = scroll;
    }

    /// Flip an embed's preview. Unknown blocks are ignored.
    pub fn toggle_embed(&mut self, id: &BlockId) -> Option<bool> {
        self.tree.position(id)?;
        let visible = self.view.toggle_embed(id);
        self.rendered = render(&self.tree, &self.view);
        Some(visible)
    }

    /// Build the write for the current dirty fields and mark them clean.
    ///
    /// Fields whose live value matches `base` are dropped from the patch.
    /// Returns `None` when nothing actually differs. The returned flags are
    /// what the patch carries, to hand back to `restore_dirty` if the write
    /// fails.
    pub fn take_patch(&mut self) -> Option<(DocumentPatch, DirtyFields)> {
        let dirty = std::mem::take(&mut self.dirty);
        let mut patch = DocumentPatch::default();
        let mut sent = DirtyFields::default();

        if dirty.title && self.title != self.base.title {
            patch.title = Some(self.title.clone());
            sent.title = true;
        }
        if dirty.content {
            let content = PersistedContent::from(to_persisted(&self.tree));
            if content != self.base.content {
                patch.content = Some(content);
                sent.content = true;
            }
        }
        if dirty.status && self.status != self.base.status {
            patch.status = Some(self.status);
            sent.status = true;
        }
        if dirty.due_date && self.due_date != self.base.due_date {
            patch.due_date = Some(self.due_date);
            sent.due_date = true;
        }
        if dirty.tags && self.tags != self.base.tags {
            patch.tags = Some(self.tags.clone());
            sent.tags = true;
        }

        if patch.is_empty() {
            None
        } else {
            Some((patch, sent))
        }
    }

    /// Mark fields dirty again after a failed write
    pub fn restore_dirty(&mut self, fields: DirtyFields) {
        self.dirty.merge(fields);
    }

    /// Record a successful write by this session
    pub fn record_own_write(&mut self, doc: &Document) {
        self.last_own_write_at = Some(doc.updated_at);
        self.last_saved_at = Some(doc.updated_at);
        self.adopt_metadata(doc);
        self.base = doc.clone();
    }

    /// Whether a remote snapshot is this session's own most recent write
    pub fn is_echo(&self, doc: &Document) -> bool {
        classify(self.last_own_write_at, doc) == RemoteOrigin::Echo
    }

    /// Apply a snapshot written elsewhere.
    ///
    /// Content is replaced wholesale and local content edits are dropped.
    /// Metadata fields with pending local edits keep their local values.
    /// Scroll is kept; the caret is restored by character offset when the
    /// editor has focus and cleared otherwise. Applying the same snapshot
    /// twice leaves the same state.
    pub fn apply_remote(&mut self, doc: &Document) {
        let scroll = self.view.scroll;
        // without focus there is no caret to carry over
        let caret = self
            .view
            .caret
            .as_ref()
            .filter(|_| self.view.focused)
            .map(|c| c.offset);

        let tree = from_persisted(&doc.content, doc.id.as_str());
        if tree != self.tree {
            self.version += 1;
        }
        self.tree = tree;
        self.dirty.content = false;

        self.view.retain_embeds(&self.tree);
        self.rendered = render(&self.tree, &self.view);

        self.view.scroll = scroll;
        self.view.caret = caret.and_then(|offset| {
            let restored = caret::locate(&self.tree, offset);
            if restored.is_none() {
                log::debug!("Could not restore caret at offset {offset}, leaving it unset");
            }
            restored
        });

        self.adopt_metadata(doc);
        self.base = doc.clone();
        self.last_saved_at = Some(doc.updated_at);
    }

    /// Apply the document produced by this session's own restore
    pub fn apply_restored(&mut self, doc: &Document) {
        self.last_own_write_at = Some(doc.updated_at);
        self.apply_remote(doc);
    }

    fn adopt_metadata(&mut self, doc: &Document) {
        if !self.dirty.title {
            self.title = doc.title.clone();
        }
        if !self.dirty.status {
            self.status = doc.status;
        }
        if !self.dirty.due_date {
            self.due_date = doc.due_date;
        }
        if !self.dirty.tags {
            self.tags = doc.tags.clone();
        }
    }

    fn relocate_caret(&mut self) {
        let offset = self.view.caret.as_ref().map(|c| c.offset);
        self.set_caret(offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Block, BlockKind};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_750_000_000 + secs, 0).unwrap()
    }

    fn doc(title: &str, html: &[&str], updated: i64) -> Document {
        Document {
            id: DocumentId::from("doc-1"),
            title: title.to_string(),
            content: html
                .iter()
                .enumerate()
                .map(|(i, h)| Block {
                    id: BlockId::from(format!("b{i}").as_str()),
                    kind: BlockKind::Paragraph,
                    content: h.to_string(),
                })
                .collect::<Vec<_>>()
                .into(),
            status: ReleaseStatus::Draft,
            tags: Vec::new(),
            due_date: None,
            artist_id: Some("artist-1".to_string()),
            updated_at: at(updated),
        }
    }

    // ============ local edits ============

    #[test]
    fn test_open_renders_document() {
        let session = EditSession::open(doc("Single", &["<p>Hi</p>"], 0));
        assert_eq!(session.rendered().text, "Hi");
        assert!(!session.is_dirty());
        assert_eq!(session.last_saved_at(), Some(at(0)));
    }

    #[test]
    fn test_apply_local_marks_dirty_and_bumps_version() {
        let mut session = EditSession::open(doc("Single", &["<p>Hi</p>"], 0));

        let patch = session.apply_local(Cmd::InsertText {
            at: 2,
            text: "!".into(),
        });

        assert_eq!(patch.version, 1);
        assert_eq!(patch.new_caret, Some(3));
        assert_eq!(patch.changed, vec![BlockId::from("b0")]);
        assert!(session.dirty().content);
        assert_eq!(session.rendered().text, "Hi!");
    }

    #[test]
    fn test_unchanged_metadata_is_noop() {
        let mut session = EditSession::open(doc("Single", &["<p>Hi</p>"], 0));

        let patch = session.apply_local(Cmd::SetTitle("Single".into()));

        assert!(patch.is_noop());
        assert_eq!(patch.version, 0);
        assert!(!session.is_dirty());
    }

    #[test]
    fn test_take_patch_carries_only_changed_fields() {
        let mut session = EditSession::open(doc("Single", &["<p>Hi</p>"], 0));
        session.apply_local(Cmd::SetTitle("Single (Remix)".into()));
        session.apply_local(Cmd::SetStatus(ReleaseStatus::Review));

        let (patch, sent) = session.take_patch().unwrap();

        assert_eq!(patch.title.as_deref(), Some("Single (Remix)"));
        assert_eq!(patch.status, Some(ReleaseStatus::Review));
        assert_eq!(patch.content, None);
        assert!(sent.title && sent.status && !sent.content);
        assert!(!session.is_dirty());
    }

    #[test]
    fn test_take_patch_skips_edits_that_cancel_out() {
        let mut session = EditSession::open(doc("Single", &["<p>Hi</p>"], 0));
        session.apply_local(Cmd::InsertText {
            at: 2,
            text: "!".into(),
        });
        session.apply_local(Cmd::DeleteText { range: 2..3 });

        assert!(session.is_dirty());
        assert_eq!(session.take_patch(), None);
        assert!(!session.is_dirty());
    }

    #[test]
    fn test_restore_dirty_after_failed_write() {
        let mut session = EditSession::open(doc("Single", &["<p>Hi</p>"], 0));
        session.apply_local(Cmd::SetTags(vec!["remix".into()]));

        let (_, sent) = session.take_patch().unwrap();
        session.restore_dirty(sent);

        assert!(session.dirty().tags);
        assert!(session.take_patch().is_some());
    }

    #[test]
    fn test_toggle_embed_rerenders() {
        let mut session = EditSession::open(doc(
            "Single",
            &[r#"<div data-embed="youtube" data-url="https://youtu.be/abcdef12"></div>"#],
            0,
        ));
        let id = session.tree().blocks[0].id.clone();

        assert_eq!(session.toggle_embed(&id), Some(false));
        assert!(session.rendered().blocks[0].html.starts_with("<a class=\"embed-link"));
        assert_eq!(session.toggle_embed(&BlockId::from("missing")), None);
    }

    // ============ own writes and echoes ============

    #[test]
    fn test_record_own_write_marks_echo() {
        let mut session = EditSession::open(doc("Single", &["<p>Hi</p>"], 0));
        session.apply_local(Cmd::SetTitle("New".into()));
        session.take_patch().unwrap();

        let written = Document {
            title: "New".into(),
            ..doc("New", &["<p>Hi</p>"], 5)
        };
        session.record_own_write(&written);

        assert!(session.is_echo(&written));
        assert!(!session.is_echo(&doc("New", &["<p>Hi</p>"], 6)));
        assert_eq!(session.last_saved_at(), Some(at(5)));
        assert_eq!(session.base().title, "New");
    }

    // ============ remote apply ============

    #[test]
    fn test_apply_remote_replaces_content_and_keeps_view() {
        let mut session = EditSession::open(doc("Single", &["<p>Hello world</p>"], 0));
        session.set_focus(true);
        session.set_scroll(ScrollOffsets {
            top: 120.0,
            left: 0.0,
        });
        session.set_caret(Some(5));

        session.apply_remote(&doc("Single", &["<p>Hello brave world</p>"], 10));

        assert_eq!(session.rendered().text, "Hello brave world");
        assert_eq!(session.view().scroll.top, 120.0);
        assert_eq!(session.view().caret.as_ref().map(|c| c.offset), Some(5));
        assert_eq!(session.last_saved_at(), Some(at(10)));
    }

    #[test]
    fn test_apply_remote_clamps_caret() {
        let mut session = EditSession::open(doc("Single", &["<p>A long paragraph</p>"], 0));
        session.set_focus(true);
        session.set_caret(Some(14));

        session.apply_remote(&doc("Single", &["<p>Short</p>"], 1));

        assert_eq!(session.view().caret.as_ref().map(|c| c.offset), Some(5));
    }

    #[test]
    fn test_apply_remote_without_focus_drops_caret() {
        let mut session = EditSession::open(doc("Single", &["<p>Hello world</p>"], 0));
        session.set_caret(Some(5));
        session.set_scroll(ScrollOffsets {
            top: 40.0,
            left: 0.0,
        });

        session.apply_remote(&doc("Single", &["<p>Hello brave world</p>"], 10));

        assert_eq!(session.view().caret, None);
        assert_eq!(session.view().scroll.top, 40.0);
    }

    #[test]
    fn test_apply_remote_is_idempotent() {
        let mut session = EditSession::open(doc("Single", &["<p>one</p>"], 0));
        session.set_focus(true);
        session.set_caret(Some(2));
        let remote = doc("Renamed", &["<p>one</p>", "<p>two</p>"], 3);

        session.apply_remote(&remote);
        let once = (
            session.tree().clone(),
            session.rendered().clone(),
            session.view().clone(),
            session.title().to_string(),
            session.version(),
        );
        session.apply_remote(&remote);
        let twice = (
            session.tree().clone(),
            session.rendered().clone(),
            session.view().clone(),
            session.title().to_string(),
            session.version(),
        );

        assert_eq!(once, twice);
    }

    #[test]
    fn test_apply_remote_drops_local_content_keeps_dirty_title() {
        let mut session = EditSession::open(doc("Single", &["<p>one</p>"], 0));
        session.apply_local(Cmd::SetTitle("Local title".into()));
        session.apply_local(Cmd::InsertText {
            at: 3,
            text: " local".into(),
        });

        session.apply_remote(&doc("Remote title", &["<p>remote</p>"], 4));

        assert_eq!(session.title(), "Local title");
        assert_eq!(session.rendered().text, "remote");
        assert!(session.dirty().title);
        assert!(!session.dirty().content);

        let (patch, _) = session.take_patch().unwrap();
        assert_eq!(patch.title.as_deref(), Some("Local title"));
        assert_eq!(patch.content, None);
    }

    #[test]
    fn test_apply_restored_counts_as_own_write() {
        let mut session = EditSession::open(doc("Single", &["<p>new</p>"], 0));
        let restored = doc("Single", &["<p>old</p>"], 9);

        session.apply_restored(&restored);

        assert!(session.is_echo(&restored));
        assert_eq!(session.rendered().text, "old");
    }
}
