use std::collections::BTreeSet;

use crate::model::{BlockId, BlockKind, SocialEmbed};

/// Inline formatting. Declaration order is the canonical nesting order
/// used when serializing (outermost first).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Mark {
    Bold,
    Italic,
    Underline,
}

/// A run of text sharing one set of marks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextRun {
    pub text: String,
    pub marks: BTreeSet<Mark>,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: BTreeSet::new(),
        }
    }

    pub fn marked(text: impl Into<String>, marks: impl IntoIterator<Item = Mark>) -> Self {
        Self {
            text: text.into(),
            marks: marks.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(TextRun),
    LineBreak,
}

impl Inline {
    /// Characters this inline contributes to the document's text content
    pub fn char_len(&self) -> usize {
        match self {
            Inline::Text(run) => run.text.chars().count(),
            Inline::LineBreak => 0,
        }
    }
}

/// Block-level node of the editable tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Paragraph(Vec<Inline>),
    Heading { level: u8, children: Vec<Inline> },
    Image { src: String, alt: String },
    Embed(SocialEmbed),
    Raw(String),
}

impl Node {
    pub fn empty_paragraph() -> Self {
        Node::Paragraph(Vec::new())
    }

    pub fn kind(&self) -> BlockKind {
        match self {
            Node::Paragraph(_) => BlockKind::Paragraph,
            Node::Heading { .. } => BlockKind::Heading,
            Node::Image { .. } => BlockKind::Image,
            Node::Embed(_) => BlockKind::Embed,
            Node::Raw(_) => BlockKind::Raw,
        }
    }

    /// Inline children of text-bearing blocks
    pub fn inlines(&self) -> Option<&[Inline]> {
        match self {
            Node::Paragraph(children) | Node::Heading { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn inlines_mut(&mut self) -> Option<&mut Vec<Inline>> {
        match self {
            Node::Paragraph(children) | Node::Heading { children, .. } => Some(children),
            _ => None,
        }
    }
}

/// Merge adjacent runs with identical marks and drop empty runs
pub fn normalize_inlines(inlines: Vec<Inline>) -> Vec<Inline> {
    let mut out: Vec<Inline> = Vec::with_capacity(inlines.len());
    for inline in inlines {
        match inline {
            Inline::Text(run) if run.text.is_empty() => {}
            Inline::Text(run) => {
                if let Some(Inline::Text(prev)) = out.last_mut()
                    && prev.marks == run.marks
                {
                    prev.text.push_str(&run.text);
                    continue;
                }
                out.push(Inline::Text(run));
            }
            Inline::LineBreak => out.push(Inline::LineBreak),
        }
    }
    out
}

/// A node with its stable id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeBlock {
    pub id: BlockId,
    pub node: Node,
}

/// The editable document tree held by an edit session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocTree {
    pub blocks: Vec<TreeBlock>,
}

impl DocTree {
    /// A document with a single empty paragraph
    pub fn empty(seed: &str) -> Self {
        Self {
            blocks: vec![TreeBlock {
                id: BlockId::derived(seed, 0),
                node: Node::empty_paragraph(),
            }],
        }
    }

    /// Assign derived ids to freshly parsed nodes
    pub fn from_nodes(nodes: Vec<Node>, seed: &str) -> Self {
        let blocks = nodes
            .into_iter()
            .enumerate()
            .map(|(i, node)| TreeBlock {
                id: BlockId::derived(seed, i),
                node,
            })
            .collect();
        Self { blocks }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn position(&self, id: &BlockId) -> Option<usize> {
        self.blocks.iter().position(|b| &b.id == id)
    }

    pub fn block(&self, id: &BlockId) -> Option<&TreeBlock> {
        self.blocks.iter().find(|b| &b.id == id)
    }

    /// Concatenated text content, as a DOM text walk would see it
    pub fn text(&self) -> String {
        self.blocks.iter().map(|b| block_text(&b.node)).collect()
    }

    pub fn char_len(&self) -> usize {
        self.blocks.iter().map(|b| block_char_len(&b.node)).sum()
    }
}

/// Text content of one block
pub fn block_text(node: &Node) -> String {
    match node {
        Node::Paragraph(children) | Node::Heading { children, .. } => children
            .iter()
            .filter_map(|i| match i {
                Inline::Text(run) => Some(run.text.as_str()),
                Inline::LineBreak => None,
            })
            .collect(),
        Node::Raw(html) => crate::parsing::text_content(html),
        Node::Image { .. } | Node::Embed(_) => String::new(),
    }
}

pub fn block_char_len(node: &Node) -> usize {
    match node {
        Node::Paragraph(children) | Node::Heading { children, .. } => {
            children.iter().map(Inline::char_len).sum()
        }
        Node::Raw(_) => block_text(node).chars().count(),
        Node::Image { .. } | Node::Embed(_) => 0,
    }
}
