use std::collections::BTreeSet;

use super::kinds::{self, EmbedTag, TagClass};
use super::tokenizer::{Attr, Token, attr, tokenize};
use crate::model::{Inline, Mark, Node, Platform, SocialEmbed, TextRun, normalize_inlines};

/// Text-bearing block currently being filled
struct OpenBlock {
    heading: Option<u8>,
    /// Tag that closes it; `None` for paragraphs opened by stray text
    tag: Option<String>,
    inlines: Vec<Inline>,
    /// An image was hoisted out of this block
    split: bool,
}

impl OpenBlock {
    fn has_content(&self) -> bool {
        self.inlines.iter().any(|i| match i {
            Inline::Text(run) => !run.text.is_empty(),
            Inline::LineBreak => true,
        })
    }

    fn into_node(self) -> Node {
        let children = normalize_inlines(self.inlines);
        match self.heading {
            Some(level) => Node::Heading { level, children },
            None => Node::Paragraph(children),
        }
    }
}

/// Why a block is being closed
#[derive(Clone, Copy, PartialEq, Eq)]
enum Close {
    /// Its own end tag: an explicit empty block is kept
    EndTag,
    /// Interrupted by another block or end of input: dropped if empty
    Boundary,
}

/// Builds block nodes from a token stream.
///
/// Tolerant by construction: unmatched end tags are ignored, unclosed
/// elements close at end of input, and unknown block-level elements are
/// kept verbatim as [`Node::Raw`].
struct TreeBuilder<'a> {
    src: &'a str,
    out: Vec<Node>,
    open: Option<OpenBlock>,
    /// Inline wrappers currently open inside `open`, with their mark if any
    inline_stack: Vec<(String, Option<Mark>)>,
}

impl<'a> TreeBuilder<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            out: Vec::new(),
            open: None,
            inline_stack: Vec::new(),
        }
    }

    fn active_marks(&self) -> BTreeSet<Mark> {
        self.inline_stack.iter().filter_map(|(_, m)| *m).collect()
    }

    fn open_block(&mut self, heading: Option<u8>, tag: Option<String>) {
        self.open = Some(OpenBlock {
            heading,
            tag,
            inlines: Vec::new(),
            split: false,
        });
    }

    fn ensure_open(&mut self) -> &mut OpenBlock {
        self.open.get_or_insert_with(|| OpenBlock {
            heading: None,
            tag: None,
            inlines: Vec::new(),
            split: false,
        })
    }

    fn close_block(&mut self, reason: Close) {
        if let Some(block) = self.open.take() {
            let keep_empty = reason == Close::EndTag && block.tag.is_some() && !block.split;
            if block.has_content() || keep_empty {
                self.out.push(block.into_node());
            }
        }
        self.inline_stack.clear();
    }

    fn push_text(&mut self, raw: &str) {
        if self.open.is_none() && raw.trim().is_empty() {
            return;
        }
        let text = html_escape::decode_html_entities(raw).into_owned();
        let marks = self.active_marks();
        self.ensure_open()
            .inlines
            .push(Inline::Text(TextRun { text, marks }));
    }

    /// Emit an image, splitting the open block around it
    fn push_image(&mut self, attrs: &[Attr]) {
        let Some(src) = attr(attrs, "src").filter(|s| !s.trim().is_empty()) else {
            return;
        };
        let image = Node::Image {
            src: src.to_string(),
            alt: attr(attrs, "alt").unwrap_or_default().to_string(),
        };
        if let Some(block) = self.open.as_mut() {
            if block.has_content() {
                let finished = OpenBlock {
                    heading: block.heading,
                    tag: block.tag.clone(),
                    inlines: std::mem::take(&mut block.inlines),
                    split: false,
                };
                self.out.push(finished.into_node());
            }
            block.split = true;
            if block.tag.is_none() {
                // stray-text paragraphs do not continue past the image
                self.open = None;
                self.inline_stack.clear();
            }
        }
        self.out.push(image);
    }

    /// Index of the token closing the element opened at `tokens[start]`
    fn matching_end(tokens: &[Token<'_>], start: usize, name: &str) -> Option<usize> {
        let mut depth = 0usize;
        for (i, token) in tokens.iter().enumerate().skip(start) {
            match token {
                Token::Start {
                    name: n,
                    self_closing: false,
                    ..
                } if n == name => depth += 1,
                Token::End { name: n, .. } if n == name => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Keep the element starting at `tokens[i]` verbatim; returns the index
    /// of the last token consumed. Unclosed elements run to end of input.
    fn capture_raw(&mut self, tokens: &[Token<'_>], i: usize, name: &str, void: bool) -> usize {
        let start = tokens[i].span().start;
        let (last, end) = if void {
            (i, tokens[i].span().end)
        } else {
            match Self::matching_end(tokens, i, name) {
                Some(j) => (j, tokens[j].span().end),
                None => (tokens.len() - 1, self.src.len()),
            }
        };
        self.out.push(Node::Raw(self.src[start..end].to_string()));
        last
    }

    fn embed_from_attrs(attrs: &[Attr]) -> Option<SocialEmbed> {
        let url = attr(attrs, EmbedTag::URL_ATTR)?.trim();
        if url.is_empty() {
            return None;
        }
        let platform = Platform::from_name(attr(attrs, EmbedTag::PLATFORM_ATTR)?)
            .or_else(|| Platform::detect(url))?;
        Some(SocialEmbed {
            platform,
            url: url.to_string(),
        })
    }

    fn build(mut self, tokens: &[Token<'_>]) -> Vec<Node> {
        let mut i = 0;
        while i < tokens.len() {
            match &tokens[i] {
                Token::Text { raw, .. } => self.push_text(raw),
                Token::Start {
                    name,
                    attrs,
                    self_closing,
                    ..
                } => {
                    i = self.start_tag(tokens, i, name, attrs, *self_closing);
                }
                Token::End { name, .. } => self.end_tag(name),
            }
            i += 1;
        }
        self.close_block(Close::Boundary);
        self.out
    }

    /// Handle a start tag; returns the index of the last token consumed
    fn start_tag(
        &mut self,
        tokens: &[Token<'_>],
        i: usize,
        name: &str,
        attrs: &[Attr],
        self_closing: bool,
    ) -> usize {
        if name == EmbedTag::ELEMENT && attr(attrs, EmbedTag::PLATFORM_ATTR).is_some() {
            self.close_block(Close::Boundary);
            return match Self::embed_from_attrs(attrs) {
                Some(embed) => {
                    self.out.push(Node::Embed(embed));
                    if self_closing {
                        i
                    } else {
                        Self::matching_end(tokens, i, name).unwrap_or(tokens.len() - 1)
                    }
                }
                None => self.capture_raw(tokens, i, name, self_closing),
            };
        }

        match kinds::classify(name) {
            TagClass::Paragraph => {
                self.close_block(Close::Boundary);
                if !self_closing {
                    self.open_block(None, Some(name.to_string()));
                }
            }
            TagClass::Heading(level) => {
                self.close_block(Close::Boundary);
                if !self_closing {
                    self.open_block(Some(level), Some(name.to_string()));
                }
            }
            TagClass::Mark(mark) => {
                if !self_closing {
                    self.ensure_open();
                    self.inline_stack.push((name.to_string(), Some(mark)));
                }
            }
            TagClass::Transparent => {
                if !self_closing {
                    self.ensure_open();
                    self.inline_stack.push((name.to_string(), None));
                }
            }
            TagClass::LineBreak => self.ensure_open().inlines.push(Inline::LineBreak),
            TagClass::Image => self.push_image(attrs),
            TagClass::Container => self.close_block(Close::Boundary),
            TagClass::Unknown => {
                let in_explicit_block = self.open.as_ref().is_some_and(|b| b.tag.is_some());
                if in_explicit_block {
                    // read through unknown wrappers inside a paragraph or heading
                    if !self_closing && !kinds::is_void(name) {
                        self.inline_stack.push((name.to_string(), None));
                    }
                } else {
                    self.close_block(Close::Boundary);
                    return self.capture_raw(tokens, i, name, self_closing || kinds::is_void(name));
                }
            }
        }
        i
    }

    fn end_tag(&mut self, name: &str) {
        let closes_open = self
            .open
            .as_ref()
            .and_then(|b| b.tag.as_deref())
            .is_some_and(|tag| tag == name);
        if closes_open {
            self.close_block(Close::EndTag);
            return;
        }
        if let Some(pos) = self.inline_stack.iter().rposition(|(n, _)| n == name) {
            self.inline_stack.truncate(pos);
        }
    }
}

/// Parse an HTML fragment into block nodes
pub fn html_to_nodes(html: &str) -> Vec<Node> {
    let tokens = tokenize(html);
    TreeBuilder::new(html).build(&tokens)
}

/// Decoded text content of an HTML fragment, tags stripped
pub fn text_content(html: &str) -> String {
    tokenize(html)
        .iter()
        .filter_map(|t| match t {
            Token::Text { raw, .. } => Some(html_escape::decode_html_entities(raw).into_owned()),
            _ => None,
        })
        .collect()
}
