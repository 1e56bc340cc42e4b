//! Caret positions as character offsets from the start of the document's
//! text content, independent of any platform selection API.

use crate::model::{BlockId, DocTree, tree::block_char_len};

/// A caret offset resolved against a tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaretPosition {
    /// Global character offset from document start
    pub offset: usize,
    pub block_id: BlockId,
    pub block_index: usize,
    /// Character offset inside the block's text
    pub offset_in_block: usize,
}

/// Resolve a global character offset to a text-bearing block.
///
/// Offsets past the end clamp to the end. At a boundary between two blocks
/// the earlier block wins, as a DOM text walk would place it. Returns `None`
/// when the offset falls inside a block that cannot hold a caret (raw
/// markup) or the tree has no paragraph or heading at all.
pub fn locate(tree: &DocTree, offset: usize) -> Option<CaretPosition> {
    let offset = offset.min(tree.char_len());
    let mut acc = 0;

    for (index, block) in tree.blocks.iter().enumerate() {
        let len = block_char_len(&block.node);
        let editable = block.node.inlines().is_some();

        if editable && offset <= acc + len {
            return Some(CaretPosition {
                offset,
                block_id: block.id.clone(),
                block_index: index,
                offset_in_block: offset - acc,
            });
        }
        if !editable && offset < acc + len {
            return None;
        }
        acc += len;
    }

    None
}

/// Global offset of the start of each block, in tree order
pub fn block_starts(tree: &DocTree) -> Vec<usize> {
    let mut acc = 0;
    tree.blocks
        .iter()
        .map(|b| {
            let start = acc;
            acc += block_char_len(&b.node);
            start
        })
        .collect()
}
