use super::kinds::{EmbedTag, MAX_HEADING_LEVEL, MarkTag};
use crate::model::{DocTree, Inline, Node, normalize_inlines};

/// Serialize one block node to canonical HTML
pub fn node_to_html(node: &Node) -> String {
    let mut out = String::new();
    write_node(&mut out, node);
    out
}

/// Serialize block nodes in order
pub fn nodes_to_html<'a>(nodes: impl IntoIterator<Item = &'a Node>) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node);
    }
    out
}

pub fn tree_to_html(tree: &DocTree) -> String {
    nodes_to_html(tree.blocks.iter().map(|b| &b.node))
}

fn write_node(out: &mut String, node: &Node) {
    match node {
        Node::Paragraph(children) => {
            out.push_str("<p>");
            write_inlines(out, children);
            out.push_str("</p>");
        }
        Node::Heading { level, children } => {
            let level = (*level).clamp(1, MAX_HEADING_LEVEL);
            out.push_str(&format!("<h{level}>"));
            write_inlines(out, children);
            out.push_str(&format!("</h{level}>"));
        }
        Node::Image { src, alt } => {
            out.push_str("<img src=\"");
            out.push_str(&html_escape::encode_double_quoted_attribute(src));
            out.push_str("\" alt=\"");
            out.push_str(&html_escape::encode_double_quoted_attribute(alt));
            out.push_str("\">");
        }
        Node::Embed(embed) => {
            out.push_str(&format!(
                "<{el} {platform_attr}=\"{platform}\" {url_attr}=\"{url}\"></{el}>",
                el = EmbedTag::ELEMENT,
                platform_attr = EmbedTag::PLATFORM_ATTR,
                platform = embed.platform.as_str(),
                url_attr = EmbedTag::URL_ATTR,
                url = html_escape::encode_double_quoted_attribute(&embed.url),
            ));
        }
        Node::Raw(html) => out.push_str(html),
    }
}

/// Write inline content. Each run opens its marks outermost-first in
/// canonical order, so equal trees always serialize identically.
pub(crate) fn write_inlines(out: &mut String, inlines: &[Inline]) {
    for inline in normalize_inlines(inlines.to_vec()) {
        match inline {
            Inline::Text(run) => {
                for mark in &run.marks {
                    out.push('<');
                    out.push_str(MarkTag::canonical(*mark));
                    out.push('>');
                }
                out.push_str(&html_escape::encode_text(&run.text));
                for mark in run.marks.iter().rev() {
                    out.push_str("</");
                    out.push_str(MarkTag::canonical(*mark));
                    out.push('>');
                }
            }
            Inline::LineBreak => out.push_str("<br>"),
        }
    }
}
