use std::collections::BTreeSet;
use std::ops::Range;

use chrono::NaiveDate;

use crate::editing::caret;
use crate::model::{
    BlockId, DocTree, Inline, Mark, Node, ReleaseStatus, TextRun, TreeBlock, normalize_inlines,
};
use crate::parsing::html_to_nodes;

/// Edit commands accepted by an edit session.
///
/// Metadata commands touch a single document field. Content commands
/// operate on the block tree; offsets are global character offsets over the
/// document's text content.
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    SetTitle(String),
    SetStatus(ReleaseStatus),
    SetDueDate(Option<NaiveDate>),
    SetTags(Vec<String>),
    /// Replace the whole editor content, as an editor surface reporting its
    /// inner HTML would
    ReplaceContent { html: String },
    /// Replace one block. A kind change gets a fresh id.
    ReplaceBlock { id: BlockId, html: String },
    /// Insert blocks after `after`, or at the start when `None`
    InsertBlock { after: Option<BlockId>, html: String },
    RemoveBlock { id: BlockId },
    InsertText { at: usize, text: String },
    DeleteText { range: Range<usize> },
}

impl Cmd {
    pub fn is_content(&self) -> bool {
        !matches!(
            self,
            Cmd::SetTitle(_) | Cmd::SetStatus(_) | Cmd::SetDueDate(_) | Cmd::SetTags(_)
        )
    }
}

/// Outcome of a content command on the tree
#[derive(Debug, Default, PartialEq)]
pub(crate) struct TreeEdit {
    pub changed: Vec<BlockId>,
    pub removed: Vec<BlockId>,
    pub caret: Option<usize>,
}

/// Apply a content command. Returns `None` when the tree is unchanged,
/// including commands that reference unknown blocks.
pub(crate) fn apply_to_tree(tree: &mut DocTree, cmd: &Cmd) -> Option<TreeEdit> {
    match cmd {
        Cmd::ReplaceContent { html } => replace_content(tree, html),
        Cmd::ReplaceBlock { id, html } => replace_block(tree, id, html),
        Cmd::InsertBlock { after, html } => insert_block(tree, after.as_ref(), html),
        Cmd::RemoveBlock { id } => remove_block(tree, id),
        Cmd::InsertText { at, text } => insert_text(tree, *at, text),
        Cmd::DeleteText { range } => delete_text(tree, range.clone()),
        Cmd::SetTitle(_) | Cmd::SetStatus(_) | Cmd::SetDueDate(_) | Cmd::SetTags(_) => None,
    }
}

fn replace_content(tree: &mut DocTree, html: &str) -> Option<TreeEdit> {
    let mut nodes = html_to_nodes(html);
    if nodes.is_empty() {
        nodes.push(Node::empty_paragraph());
    }

    let ids = match_ids(&tree.blocks, &nodes);
    let blocks: Vec<TreeBlock> = ids
        .into_iter()
        .zip(nodes)
        .map(|(id, node)| TreeBlock { id, node })
        .collect();

    if blocks == tree.blocks {
        return None;
    }

    let changed = blocks
        .iter()
        .filter(|b| tree.block(&b.id).is_none_or(|old| old.node != b.node))
        .map(|b| b.id.clone())
        .collect();
    let removed = tree
        .blocks
        .iter()
        .filter(|old| !blocks.iter().any(|b| b.id == old.id))
        .map(|old| old.id.clone())
        .collect();

    tree.blocks = blocks;
    Some(TreeEdit {
        changed,
        removed,
        caret: None,
    })
}

/// Carry block ids over to re-parsed nodes: identical nodes keep their id
/// first (in order), then remaining nodes take the id of the old block at
/// the same position if it has the same kind.
fn match_ids(old: &[TreeBlock], nodes: &[Node]) -> Vec<BlockId> {
    let mut used = vec![false; old.len()];
    let mut ids: Vec<Option<BlockId>> = vec![None; nodes.len()];

    let mut floor = 0;
    for (i, node) in nodes.iter().enumerate() {
        if let Some(j) = (floor..old.len()).find(|&j| !used[j] && &old[j].node == node) {
            used[j] = true;
            ids[i] = Some(old[j].id.clone());
            floor = j + 1;
        }
    }

    for (i, node) in nodes.iter().enumerate() {
        if ids[i].is_some() {
            continue;
        }
        if let Some(block) = old.get(i)
            && !used[i]
            && block.node.kind() == node.kind()
        {
            used[i] = true;
            ids[i] = Some(block.id.clone());
        }
    }

    ids.into_iter()
        .map(|id| id.unwrap_or_else(BlockId::generate))
        .collect()
}

fn replace_block(tree: &mut DocTree, id: &BlockId, html: &str) -> Option<TreeEdit> {
    let index = tree.position(id)?;
    let old_kind = tree.blocks[index].node.kind();

    let blocks: Vec<TreeBlock> = html_to_nodes(html)
        .into_iter()
        .enumerate()
        .map(|(j, node)| {
            let id = if j == 0 && node.kind() == old_kind {
                id.clone()
            } else {
                BlockId::generate()
            };
            TreeBlock { id, node }
        })
        .collect();

    if blocks.len() == 1 && blocks[0] == tree.blocks[index] {
        return None;
    }

    let mut edit = TreeEdit {
        changed: blocks.iter().map(|b| b.id.clone()).collect(),
        ..Default::default()
    };
    if !blocks.iter().any(|b| &b.id == id) {
        edit.removed.push(id.clone());
    }

    tree.blocks.splice(index..=index, blocks);
    ensure_not_empty(tree, &mut edit);
    Some(edit)
}

fn insert_block(tree: &mut DocTree, after: Option<&BlockId>, html: &str) -> Option<TreeEdit> {
    let index = match after {
        Some(id) => tree.position(id)? + 1,
        None => 0,
    };

    let blocks: Vec<TreeBlock> = html_to_nodes(html)
        .into_iter()
        .map(|node| TreeBlock {
            id: BlockId::generate(),
            node,
        })
        .collect();
    if blocks.is_empty() {
        return None;
    }

    let changed = blocks.iter().map(|b| b.id.clone()).collect();
    tree.blocks.splice(index..index, blocks);
    Some(TreeEdit {
        changed,
        ..Default::default()
    })
}

fn remove_block(tree: &mut DocTree, id: &BlockId) -> Option<TreeEdit> {
    let index = tree.position(id)?;
    let removed = tree.blocks.remove(index);

    let mut edit = TreeEdit {
        removed: vec![removed.id],
        ..Default::default()
    };
    ensure_not_empty(tree, &mut edit);
    Some(edit)
}

/// The editor always holds at least one paragraph
fn ensure_not_empty(tree: &mut DocTree, edit: &mut TreeEdit) {
    if tree.blocks.is_empty() {
        let id = BlockId::generate();
        edit.changed.push(id.clone());
        tree.blocks.push(TreeBlock {
            id,
            node: Node::empty_paragraph(),
        });
    }
}

fn insert_text(tree: &mut DocTree, at: usize, text: &str) -> Option<TreeEdit> {
    if text.is_empty() {
        return None;
    }

    let pos = caret::locate(tree, at)?;
    let block = &mut tree.blocks[pos.block_index];
    let inlines = block.node.inlines_mut()?;
    insert_into_inlines(inlines, pos.offset_in_block, text);

    let inserted = text.chars().filter(|c| *c != '\n').count();
    Some(TreeEdit {
        changed: vec![block.id.clone()],
        removed: Vec::new(),
        caret: Some(pos.offset + inserted),
    })
}

/// Insert at a block-local character offset. Text typed at the end of a run
/// continues that run's formatting.
fn insert_into_inlines(inlines: &mut Vec<Inline>, offset: usize, text: &str) {
    let mut out = Vec::with_capacity(inlines.len() + 2);
    let mut acc = 0;
    let mut done = false;

    for inline in inlines.drain(..) {
        match inline {
            Inline::Text(run) if !done => {
                let len = run.text.chars().count();
                if offset <= acc + len {
                    let split = byte_index(&run.text, offset - acc);
                    let head = run.text[..split].to_string();
                    let tail = run.text[split..].to_string();
                    out.push(Inline::Text(TextRun {
                        text: head,
                        marks: run.marks.clone(),
                    }));
                    out.extend(text_inlines(text, &run.marks));
                    out.push(Inline::Text(TextRun {
                        text: tail,
                        marks: run.marks,
                    }));
                    done = true;
                } else {
                    acc += len;
                    out.push(Inline::Text(run));
                }
            }
            other => out.push(other),
        }
    }

    if !done {
        out.extend(text_inlines(text, &BTreeSet::new()));
    }
    *inlines = normalize_inlines(out);
}

/// Newlines in typed text become line breaks
fn text_inlines(text: &str, marks: &BTreeSet<Mark>) -> Vec<Inline> {
    let mut out = Vec::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            out.push(Inline::LineBreak);
        }
        out.push(Inline::Text(TextRun {
            text: line.to_string(),
            marks: marks.clone(),
        }));
    }
    out
}

fn delete_text(tree: &mut DocTree, range: Range<usize>) -> Option<TreeEdit> {
    let total = tree.char_len();
    let start = range.start.min(total);
    let end = range.end.min(total);
    if start >= end {
        return None;
    }

    let starts = caret::block_starts(tree);
    let mut changed = Vec::new();

    for (block, block_start) in tree.blocks.iter_mut().zip(starts) {
        // Raw blocks are never partially edited
        let Some(inlines) = block.node.inlines_mut() else {
            continue;
        };
        let len: usize = inlines.iter().map(Inline::char_len).sum();
        let lo = start.max(block_start);
        let hi = end.min(block_start + len);
        if lo >= hi {
            continue;
        }
        delete_from_inlines(inlines, lo - block_start, hi - block_start);
        changed.push(block.id.clone());
    }

    if changed.is_empty() {
        return None;
    }
    Some(TreeEdit {
        changed,
        removed: Vec::new(),
        caret: Some(start),
    })
}

fn delete_from_inlines(inlines: &mut Vec<Inline>, lo: usize, hi: usize) {
    let mut acc = 0;
    for inline in inlines.iter_mut() {
        if let Inline::Text(run) = inline {
            let len = run.text.chars().count();
            let a = lo.clamp(acc, acc + len) - acc;
            let b = hi.clamp(acc, acc + len) - acc;
            if a < b {
                let range = byte_index(&run.text, a)..byte_index(&run.text, b);
                run.text.replace_range(range, "");
            }
            acc += len;
        }
    }
    *inlines = normalize_inlines(std::mem::take(inlines));
}

fn byte_index(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(i, _)| i)
}
