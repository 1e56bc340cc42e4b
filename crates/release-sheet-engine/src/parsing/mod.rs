//! # HTML Codec
//!
//! Converts between the editable [`DocTree`] and the persisted
//! HTML-in-JSON block form. Pure functions, no I/O.
//!
//! ## Modules
//!
//! - **`cursor`**: byte `Cursor` with position tracking
//! - **`tokenizer`**: tolerant tokenizer producing spanned `Token`s
//! - **`kinds`**: tag classification; owns every tag and attribute name
//! - **`builder`**: tokens to block `Node`s (images hoisted, unknown
//!   elements kept raw)
//! - **`serialize`**: nodes to canonical HTML
//! - **`persisted`**: `to_persisted` / `from_persisted` over stored blocks
//!
//! ## Normalization
//!
//! Output is canonical rather than byte-identical to the input: `<b>`
//! becomes `<strong>`, marks nest in a fixed order, adjacent runs merge.
//! One pass reaches a fixed point, so
//! `tree_to_html(html_to_tree(h))` is stable under repetition.

pub mod builder;
pub mod cursor;
pub mod kinds;
pub mod persisted;
pub mod serialize;
pub mod tokenizer;

pub use builder::{html_to_nodes, text_content};
pub use persisted::{from_persisted, to_persisted};
pub use serialize::{node_to_html, nodes_to_html, tree_to_html};

use crate::model::DocTree;

/// Parse HTML into a tree with ids derived from `seed`
pub fn html_to_tree(html: &str, seed: &str) -> DocTree {
    DocTree::from_nodes(html_to_nodes(html), seed)
}

/// Parse then serialize: the canonical form of `html`
pub fn normalize_html(html: &str) -> String {
    nodes_to_html(&html_to_nodes(html))
}

#[cfg(test)]
mod tests;
