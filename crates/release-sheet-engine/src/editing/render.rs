//! Render projection.
//!
//! `render` turns the editable tree plus session-local view state into the
//! markup the UI shows. It is a pure function, so re-running it after every
//! local or remote change is always safe. Two enrichment passes run on top
//! of the canonical serialization:
//!
//! - social embeds render as a preview frame when visible, as a plain link
//!   otherwise
//! - platform URLs inside text runs get a cross-reference icon

use std::fmt::Write;
use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use crate::editing::ViewState;
use crate::model::tree::{block_char_len, block_text};
use crate::model::{
    BlockId, BlockKind, DocTree, Inline, Node, Platform, SocialEmbed, normalize_inlines,
};
use crate::parsing::kinds::{MAX_HEADING_LEVEL, MarkTag};
use crate::parsing::node_to_html;

/// One rendered block
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedBlock {
    pub id: BlockId,
    pub kind: BlockKind,
    pub html: String,
    /// Character range of this block within the document text
    pub text_range: Range<usize>,
}

/// Immutable projection handed to the UI
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedDocument {
    pub html: String,
    pub text: String,
    pub blocks: Vec<RenderedBlock>,
}

/// Inline text split around platform URLs
#[derive(Debug, Clone, PartialEq)]
pub enum TextSegment {
    Text(String),
    PlatformLink { platform: Platform, href: String },
}

pub fn render(tree: &DocTree, view: &ViewState) -> RenderedDocument {
    let mut doc = RenderedDocument::default();
    let mut offset = 0;

    for block in &tree.blocks {
        let len = block_char_len(&block.node);
        let html = render_node(&block.node, view.embed_visible(&block.id));

        let _ = write!(
            doc.html,
            "<div class=\"block block-{}\" data-block-id=\"{}\">{}</div>",
            block.node.kind().as_str(),
            html_escape::encode_double_quoted_attribute(block.id.as_str()),
            html
        );
        doc.text.push_str(&block_text(&block.node));
        doc.blocks.push(RenderedBlock {
            id: block.id.clone(),
            kind: block.node.kind(),
            html,
            text_range: offset..offset + len,
        });
        offset += len;
    }

    doc
}

fn render_node(node: &Node, embed_visible: bool) -> String {
    match node {
        Node::Paragraph(children) => {
            let mut out = String::from("<p>");
            write_enriched_inlines(&mut out, children);
            out.push_str("</p>");
            out
        }
        Node::Heading { level, children } => {
            let level = (*level).clamp(1, MAX_HEADING_LEVEL);
            let mut out = format!("<h{level}>");
            write_enriched_inlines(&mut out, children);
            let _ = write!(out, "</h{level}>");
            out
        }
        Node::Embed(embed) if embed_visible => render_embed_preview(embed),
        Node::Embed(embed) => render_embed_link(embed),
        Node::Image { .. } | Node::Raw(_) => node_to_html(node),
    }
}

fn write_enriched_inlines(out: &mut String, inlines: &[Inline]) {
    for inline in normalize_inlines(inlines.to_vec()) {
        match inline {
            Inline::Text(run) => {
                for mark in &run.marks {
                    let _ = write!(out, "<{}>", MarkTag::canonical(*mark));
                }
                for segment in parse_text_segments(&run.text) {
                    match segment {
                        TextSegment::Text(text) => out.push_str(&html_escape::encode_text(&text)),
                        TextSegment::PlatformLink { platform, href } => {
                            write_cross_reference(out, platform, &href)
                        }
                    }
                }
                for mark in run.marks.iter().rev() {
                    let _ = write!(out, "</{}>", MarkTag::canonical(*mark));
                }
            }
            Inline::LineBreak => out.push_str("<br>"),
        }
    }
}

fn write_cross_reference(out: &mut String, platform: Platform, href: &str) {
    let _ = write!(
        out,
        "<a class=\"xref xref-{p}\" href=\"{href}\"><span class=\"xref-icon icon-{p}\"></span>{text}</a>",
        p = platform.as_str(),
        href = html_escape::encode_double_quoted_attribute(href),
        text = html_escape::encode_text(href),
    );
}

fn render_embed_preview(embed: &SocialEmbed) -> String {
    format!(
        "<div class=\"embed embed-{p}\"><iframe src=\"{src}\" loading=\"lazy\" allowfullscreen></iframe></div>",
        p = embed.platform.as_str(),
        src = html_escape::encode_double_quoted_attribute(&preview_src(embed)),
    )
}

fn render_embed_link(embed: &SocialEmbed) -> String {
    format!(
        "<a class=\"embed-link embed-{p}\" href=\"{href}\">{text}</a>",
        p = embed.platform.as_str(),
        href = html_escape::encode_double_quoted_attribute(&embed.url),
        text = html_escape::encode_text(&embed.url),
    )
}

/// Address of the platform's embeddable player for a post URL. Falls back
/// to the post URL when no id can be found.
pub fn preview_src(embed: &SocialEmbed) -> String {
    static YOUTUBE: OnceLock<Regex> = OnceLock::new();
    static TIKTOK: OnceLock<Regex> = OnceLock::new();
    static INSTAGRAM: OnceLock<Regex> = OnceLock::new();

    let (re, template) = match embed.platform {
        Platform::Youtube => (
            YOUTUBE.get_or_init(|| {
                Regex::new(r"(?:youtu\.be/|[?&]v=|/shorts/|/embed/)([A-Za-z0-9_-]{6,})")
                    .expect("Invalid youtube regex")
            }),
            "https://www.youtube.com/embed/",
        ),
        Platform::Tiktok => (
            TIKTOK.get_or_init(|| Regex::new(r"/video/(\d+)").expect("Invalid tiktok regex")),
            "https://www.tiktok.com/embed/v2/",
        ),
        Platform::Instagram => (
            INSTAGRAM.get_or_init(|| {
                Regex::new(r"/(?:p|reel|tv)/([A-Za-z0-9_-]+)").expect("Invalid instagram regex")
            }),
            "https://www.instagram.com/p/",
        ),
    };

    match re.captures(&embed.url).and_then(|c| c.get(1)) {
        Some(id) if embed.platform == Platform::Instagram => {
            format!("{template}{}/embed", id.as_str())
        }
        Some(id) => format!("{template}{}", id.as_str()),
        None => embed.url.clone(),
    }
}

/// Split text around URLs that point at a known platform. Other URLs stay
/// plain text.
pub fn parse_text_segments(text: &str) -> Vec<TextSegment> {
    static URL_REGEX: OnceLock<Regex> = OnceLock::new();
    let url_regex =
        URL_REGEX.get_or_init(|| Regex::new(r"https?://[^\s<>\[\]]+").expect("Invalid URL regex"));

    let mut segments = Vec::new();
    let mut current_pos = 0;

    for url_match in url_regex.find_iter(text) {
        let start = url_match.start();
        let mut end = url_match.end();

        // Trailing punctuation is usually sentence punctuation
        while let Some(last_char) = text[start..end].chars().last() {
            if matches!(last_char, '.' | ',' | ':' | ';' | '!' | '?' | ')' | ']' | '}') {
                end -= last_char.len_utf8();
            } else {
                break;
            }
        }

        let href = &text[start..end];
        let Some(platform) = Platform::detect(href) else {
            continue;
        };

        if current_pos < start {
            segments.push(TextSegment::Text(text[current_pos..start].to_string()));
        }
        segments.push(TextSegment::PlatformLink {
            platform,
            href: href.to_string(),
        });
        current_pos = end;
    }

    if current_pos < text.len() {
        segments.push(TextSegment::Text(text[current_pos..].to_string()));
    }

    segments
}
