use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of a block across edits.
///
/// Opaque on the wire: ids written by other clients are kept verbatim,
/// new blocks get a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub String);

impl BlockId {
    /// Fresh random id for a block created by a local edit
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Deterministic id for the `index`th block produced from `seed`.
    ///
    /// Used when persisted content carries no ids (legacy HTML) or when one
    /// stored block parses into several, so re-parsing the same input
    /// always yields the same ids.
    pub fn derived(seed: &str, index: usize) -> Self {
        let name = format!("{seed}#{index}");
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// What a block holds. Fixed for the lifetime of a block id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BlockKind {
    Paragraph,
    Heading,
    Image,
    Embed,
    /// Unrecognized legacy markup kept verbatim
    Raw,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Paragraph => "paragraph",
            BlockKind::Heading => "heading",
            BlockKind::Image => "image",
            BlockKind::Embed => "embed",
            BlockKind::Raw => "raw",
        }
    }
}

impl From<String> for BlockKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "paragraph" => BlockKind::Paragraph,
            "heading" => BlockKind::Heading,
            "image" => BlockKind::Image,
            "embed" => BlockKind::Embed,
            _ => BlockKind::Raw,
        }
    }
}

impl From<BlockKind> for String {
    fn from(value: BlockKind) -> Self {
        value.as_str().to_string()
    }
}

/// One persisted content unit: `{ id, type, content }` where `content`
/// is the block's HTML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    #[serde(rename = "type")]
    pub kind: BlockKind,
    pub content: String,
}

/// Join blocks into the document's flat HTML form
pub fn join_blocks(blocks: &[Block]) -> String {
    blocks.iter().map(|b| b.content.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_derived_ids_are_deterministic() {
        assert_eq!(BlockId::derived("doc-1", 0), BlockId::derived("doc-1", 0));
        assert_ne!(BlockId::derived("doc-1", 0), BlockId::derived("doc-1", 1));
        assert_ne!(BlockId::derived("doc-1", 0), BlockId::derived("doc-2", 0));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(BlockId::generate(), BlockId::generate());
    }

    #[test]
    fn test_block_wire_shape() {
        let block = Block {
            id: BlockId::from("b1"),
            kind: BlockKind::Heading,
            content: "<h1>Tour</h1>".to_string(),
        };

        let json = serde_json::to_value(&block).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "id": "b1", "type": "heading", "content": "<h1>Tour</h1>" })
        );

        let back: Block = serde_json::from_value(json).unwrap();
        assert_eq!(back, block);
    }

    #[test]
    fn test_unknown_block_type_reads_as_raw() {
        let block: Block = serde_json::from_value(serde_json::json!({
            "id": "b2",
            "type": "table",
            "content": "<table></table>"
        }))
        .unwrap();

        assert_eq!(block.kind, BlockKind::Raw);
    }

    #[test]
    fn test_join_blocks_preserves_order() {
        let blocks = vec![
            Block {
                id: BlockId::from("a"),
                kind: BlockKind::Paragraph,
                content: "<p>one</p>".to_string(),
            },
            Block {
                id: BlockId::from("b"),
                kind: BlockKind::Paragraph,
                content: "<p>two</p>".to_string(),
            },
        ];

        assert_eq!(join_blocks(&blocks), "<p>one</p><p>two</p>");
    }
}
