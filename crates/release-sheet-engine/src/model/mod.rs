pub mod block;
pub mod document;
pub mod embed;
pub mod tree;
pub mod version;

pub use block::{Block, BlockId, BlockKind, join_blocks};
pub use document::{Document, DocumentId, DocumentPatch, PersistedContent, ReleaseStatus};
pub use embed::{Platform, SocialEmbed};
pub use tree::{DocTree, Inline, Mark, Node, TextRun, TreeBlock, normalize_inlines};
pub use version::{ChangeType, VersionId, VersionSnapshot};
