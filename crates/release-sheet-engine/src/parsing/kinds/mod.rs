//! # Tag Kinds
//!
//! Element-specific types that own their tag names and attribute names.
//!
//! ## Types
//!
//! - **`MarkTag`**: tags that toggle bold/italic/underline and the
//!   canonical tag written for each mark
//! - **`EmbedTag`**: the `div[data-embed]` element that carries a social embed
//!
//! The builder and serializer ask these types; they never hardcode `<strong>`
//! or `data-url`.

pub mod embed;
pub mod mark;

pub use embed::EmbedTag;
pub use mark::MarkTag;

use crate::model::Mark;

/// How the tree builder treats an element
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagClass {
    /// Opens a paragraph block (`p`, plain `div`)
    Paragraph,
    /// Opens a heading block; levels above 3 are clamped to 3
    Heading(u8),
    Mark(Mark),
    LineBreak,
    Image,
    /// Presentational inline wrapper whose text is kept and tag dropped
    Transparent,
    /// Document wrapper whose children are read as top-level content
    Container,
    /// Anything else; kept verbatim at block level
    Unknown,
}

pub const MAX_HEADING_LEVEL: u8 = 3;

const TRANSPARENT: &[&str] = &[
    "span", "a", "font", "code", "small", "big", "mark", "sub", "sup", "s", "strike", "del",
    "ins", "abbr", "cite", "q", "kbd", "samp", "var", "time", "label", "tt",
];

const CONTAINERS: &[&str] = &[
    "html", "body", "main", "article", "section", "header", "footer",
];

const VOID: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

/// Classify a lowercase tag name
pub fn classify(name: &str) -> TagClass {
    if let Some(mark) = MarkTag::classify(name) {
        return TagClass::Mark(mark);
    }
    match name {
        "p" | "div" => TagClass::Paragraph,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = name[1..].parse::<u8>().unwrap_or(MAX_HEADING_LEVEL);
            TagClass::Heading(level.clamp(1, MAX_HEADING_LEVEL))
        }
        "br" => TagClass::LineBreak,
        "img" => TagClass::Image,
        _ if TRANSPARENT.contains(&name) => TagClass::Transparent,
        _ if CONTAINERS.contains(&name) => TagClass::Container,
        _ => TagClass::Unknown,
    }
}

/// Elements that never have content or a closing tag
pub fn is_void(name: &str) -> bool {
    VOID.contains(&name)
}
