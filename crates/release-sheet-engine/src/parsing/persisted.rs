use std::collections::HashSet;

use super::builder::html_to_nodes;
use super::serialize::node_to_html;
use crate::model::{Block, BlockId, DocTree, PersistedContent, TreeBlock};

/// Flatten the tree into ordered blocks carrying per-block HTML
pub fn to_persisted(tree: &DocTree) -> Vec<Block> {
    tree.blocks
        .iter()
        .map(|b| Block {
            id: b.id.clone(),
            kind: b.node.kind(),
            content: node_to_html(&b.node),
        })
        .collect()
}

/// Rebuild the editable tree from stored content.
///
/// Never fails: empty or unreadable content yields a single empty
/// paragraph. A stored id is kept only for the first node its HTML parses
/// into, and only while the kind still matches; other nodes get ids derived
/// from it, so the same input always produces the same tree.
pub fn from_persisted(content: &PersistedContent, seed: &str) -> DocTree {
    let tree = match content {
        PersistedContent::Blocks { blocks } => tree_from_blocks(blocks),
        PersistedContent::Html(html) => DocTree::from_nodes(html_to_nodes(html), seed),
        PersistedContent::Malformed(value) => {
            log::debug!("Unreadable persisted content, starting empty: {value}");
            DocTree { blocks: Vec::new() }
        }
    };

    if tree.is_empty() {
        DocTree::empty(seed)
    } else {
        tree
    }
}

fn tree_from_blocks(blocks: &[Block]) -> DocTree {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(blocks.len());

    for block in blocks {
        for (j, node) in html_to_nodes(&block.content).into_iter().enumerate() {
            let mut id = if j == 0 && node.kind() == block.kind {
                block.id.clone()
            } else {
                BlockId::derived(block.id.as_str(), j)
            };
            if !seen.insert(id.clone()) {
                // duplicate ids in stored content
                id = BlockId::derived(block.id.as_str(), out.len() + blocks.len());
                seen.insert(id.clone());
            }
            out.push(TreeBlock { id, node });
        }
    }

    DocTree { blocks: out }
}
