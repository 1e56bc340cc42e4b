use insta::assert_snapshot;
use pretty_assertions::assert_eq;
use rstest::rstest;

use super::*;
use crate::model::{
    Block, BlockId, BlockKind, DocTree, Inline, Mark, Node, PersistedContent, Platform,
    SocialEmbed, TextRun, TreeBlock,
};

// ============ Serialization ============

#[test]
fn test_bold_paragraph_serializes() {
    let tree = DocTree {
        blocks: vec![TreeBlock {
            id: BlockId::from("b1"),
            node: Node::Paragraph(vec![Inline::Text(TextRun::marked("Hello", [Mark::Bold]))]),
        }],
    };

    let html = tree_to_html(&tree);
    assert_eq!(html, "<p><strong>Hello</strong></p>");
    assert_eq!(tree_to_html(&html_to_tree(&html, "doc")), html);
}

#[test]
fn test_marks_nest_in_canonical_order() {
    let node = Node::Paragraph(vec![Inline::Text(TextRun::marked(
        "x",
        [Mark::Underline, Mark::Bold, Mark::Italic],
    ))]);

    assert_snapshot!(node_to_html(&node), @"<p><strong><em><u>x</u></em></strong></p>");
}

#[test]
fn test_text_and_attributes_are_escaped() {
    let nodes = vec![
        Node::Paragraph(vec![Inline::Text(TextRun::plain("a < b & c"))]),
        Node::Image {
            src: "cover.png?a=1&b=\"2\"".to_string(),
            alt: "Cover".to_string(),
        },
    ];

    assert_snapshot!(
        nodes_to_html(&nodes),
        @r#"<p>a &lt; b &amp; c</p><img src="cover.png?a=1&amp;b=&quot;2&quot;" alt="Cover">"#
    );
}

#[test]
fn test_embed_serializes_to_data_attributes() {
    let node = Node::Embed(SocialEmbed {
        platform: Platform::Tiktok,
        url: "https://www.tiktok.com/@a/video/1".to_string(),
    });

    assert_snapshot!(
        node_to_html(&node),
        @r#"<div data-embed="tiktok" data-url="https://www.tiktok.com/@a/video/1"></div>"#
    );
}

// ============ Parsing ============

#[test]
fn test_parse_heading_marks_and_image() {
    let nodes = html_to_nodes(
        "<h2>Tour <i>dates</i></h2><p><b>Bold</b> and <u>under</u><br>line</p><img src=\"a.png\" alt=\"A\">",
    );

    assert_eq!(
        nodes,
        vec![
            Node::Heading {
                level: 2,
                children: vec![
                    Inline::Text(TextRun::plain("Tour ")),
                    Inline::Text(TextRun::marked("dates", [Mark::Italic])),
                ],
            },
            Node::Paragraph(vec![
                Inline::Text(TextRun::marked("Bold", [Mark::Bold])),
                Inline::Text(TextRun::plain(" and ")),
                Inline::Text(TextRun::marked("under", [Mark::Underline])),
                Inline::LineBreak,
                Inline::Text(TextRun::plain("line")),
            ]),
            Node::Image {
                src: "a.png".to_string(),
                alt: "A".to_string(),
            },
        ]
    );
}

#[test]
fn test_image_inside_paragraph_is_hoisted() {
    assert_eq!(
        normalize_html("<p>before<img src=\"x.png\">after</p>"),
        "<p>before</p><img src=\"x.png\" alt=\"\"><p>after</p>"
    );
}

#[test]
fn test_stray_text_becomes_paragraph() {
    assert_eq!(
        normalize_html("Hello <b>world</b><p>next</p>"),
        "<p>Hello <strong>world</strong></p><p>next</p>"
    );
}

#[test]
fn test_unknown_block_is_kept_raw() {
    let html = "<p>a</p><ul><li>one</li><li><ul><li>two</li></ul></li></ul><p>b</p>";
    let nodes = html_to_nodes(html);

    assert_eq!(nodes.len(), 3);
    assert_eq!(
        nodes[1],
        Node::Raw("<ul><li>one</li><li><ul><li>two</li></ul></li></ul>".to_string())
    );
    assert_eq!(normalize_html(html), html);
}

#[test]
fn test_unclosed_unknown_block_runs_to_end() {
    let nodes = html_to_nodes("<p>a</p><table><tr><td>x");
    assert_eq!(nodes[1], Node::Raw("<table><tr><td>x".to_string()));
}

#[test]
fn test_nested_wrappers_do_not_create_empty_paragraphs() {
    assert_eq!(
        normalize_html("<div><p>a</p><p>b</p></div>"),
        "<p>a</p><p>b</p>"
    );
}

#[test]
fn test_explicit_empty_paragraph_is_kept() {
    assert_eq!(normalize_html("<p></p>"), "<p></p>");
    assert_eq!(html_to_nodes(""), vec![]);
    assert_eq!(html_to_nodes("  \n "), vec![]);
}

#[test]
fn test_embed_div_parses() {
    let nodes =
        html_to_nodes(r#"<div data-embed="instagram" data-url="https://instagram.com/p/1"></div>"#);
    assert_eq!(
        nodes,
        vec![Node::Embed(SocialEmbed {
            platform: Platform::Instagram,
            url: "https://instagram.com/p/1".to_string(),
        })]
    );
}

#[test]
fn test_embed_without_url_is_kept_raw() {
    let html = r#"<div data-embed="instagram">preview</div>"#;
    assert_eq!(html_to_nodes(html), vec![Node::Raw(html.to_string())]);
}

#[rstest]
#[case("<h4>deep</h4>", "<h3>deep</h3>")]
#[case("<B>x</B>", "<strong>x</strong>")]
#[case("<p><span style=\"color:red\">red</span></p>", "<p>red</p>")]
#[case("<p>a</p><!-- c --><p>b</p>", "<p>a</p><p>b</p>")]
#[case("<p>x&nbsp;y&amp;z</p>", "<p>x\u{a0}y&amp;z</p>")]
#[case("<p>open <em>never closed", "<p>open <em>never closed</em></p>")]
#[case("<p>a</div>b</p>", "<p>ab</p>")]
#[case("<br>", "<p><br></p>")]
#[case("<hr>", "<hr>")]
#[case("<body><p>x</p></body>", "<p>x</p>")]
fn test_normalization_cases(#[case] input: &str, #[case] expected: &str) {
    let normalized = normalize_html(input);
    assert!(
        normalized.contains(expected),
        "normalize({input:?}) = {normalized:?}, expected to contain {expected:?}"
    );
}

// ============ Round-trip idempotence ============

#[rstest]
#[case("<h1>Release <b>plan</b></h1><p><i>Italic</i> text</p><img src=\"cover.jpg\" alt=\"Cover\">")]
#[case("<p>a<img src=\"1.png\"><b>b<img src=\"2.png\">c</b></p>")]
#[case("<div>loose <span>wrapped</span> text<p>inner</p>tail</div>")]
#[case("<p><b><i>both</i></b><i><b>again</b></i></p>")]
#[case("<ul><li>a</li></ul>text<ol><li>b")]
#[case("<div data-embed=\"youtube\" data-url=\"https://youtu.be/x\"></div><p>after</p>")]
#[case("plain text only")]
#[case("<p>&lt;script&gt; &amp;amp;</p>")]
#[case("")]
fn test_round_trip_reaches_fixed_point(#[case] input: &str) {
    let once = normalize_html(input);
    let twice = normalize_html(&once);
    assert_eq!(twice, once);
}

#[test]
fn test_text_content_strips_tags() {
    assert_eq!(text_content("<ul><li>one &amp;</li><li>two</li></ul>"), "one &two");
}

// ============ Persisted form ============

#[test]
fn test_to_persisted_keeps_ids_and_kinds() {
    let tree = html_to_tree("<h1>Title</h1><p>Body</p>", "doc");
    let blocks = to_persisted(&tree);

    assert_eq!(blocks.len(), 2);
    assert_eq!(blocks[0].id, tree.blocks[0].id);
    assert_eq!(blocks[0].kind, BlockKind::Heading);
    assert_eq!(blocks[0].content, "<h1>Title</h1>");
    assert_eq!(blocks[1].kind, BlockKind::Paragraph);
    assert_eq!(blocks[1].content, "<p>Body</p>");
}

#[test]
fn test_from_persisted_round_trips_tree() {
    let tree = html_to_tree("<h1>Title</h1><p><b>Body</b></p><img src=\"a.png\" alt=\"\">", "doc");
    let content = PersistedContent::from(to_persisted(&tree));

    assert_eq!(from_persisted(&content, "doc"), tree);
}

#[test]
fn test_from_persisted_empty_or_malformed_gives_empty_paragraph() {
    for content in [
        PersistedContent::Blocks { blocks: vec![] },
        PersistedContent::Html(String::new()),
        PersistedContent::Malformed(serde_json::json!({ "nope": true })),
        PersistedContent::Blocks {
            blocks: vec![Block {
                id: BlockId::from("b1"),
                kind: BlockKind::Paragraph,
                content: "   ".to_string(),
            }],
        },
    ] {
        assert_eq!(from_persisted(&content, "doc"), DocTree::empty("doc"));
    }
}

#[test]
fn test_from_persisted_legacy_html() {
    let tree = from_persisted(&PersistedContent::Html("<p>a</p><p>b</p>".to_string()), "doc");
    assert_eq!(tree.blocks.len(), 2);
    assert_eq!(tree.blocks[0].id, BlockId::derived("doc", 0));
    assert_eq!(tree.blocks[1].id, BlockId::derived("doc", 1));
}

#[test]
fn test_from_persisted_block_kind_mismatch_gets_new_id() {
    let content = PersistedContent::from(vec![Block {
        id: BlockId::from("b1"),
        kind: BlockKind::Paragraph,
        content: "<h1>now a heading</h1>".to_string(),
    }]);

    let tree = from_persisted(&content, "doc");
    assert_eq!(tree.blocks.len(), 1);
    assert_ne!(tree.blocks[0].id, BlockId::from("b1"));
    assert_eq!(tree.blocks[0].id, BlockId::derived("b1", 0));
}

#[test]
fn test_from_persisted_splits_multi_node_block_deterministically() {
    let content = PersistedContent::from(vec![Block {
        id: BlockId::from("b1"),
        kind: BlockKind::Paragraph,
        content: "<p>a</p><p>b</p>".to_string(),
    }]);

    let first = from_persisted(&content, "doc");
    let second = from_persisted(&content, "doc");
    assert_eq!(first, second);
    assert_eq!(first.blocks[0].id, BlockId::from("b1"));
    assert_eq!(first.blocks[1].id, BlockId::derived("b1", 1));
}

#[test]
fn test_from_persisted_duplicate_ids_are_made_unique() {
    let block = Block {
        id: BlockId::from("dup"),
        kind: BlockKind::Paragraph,
        content: "<p>x</p>".to_string(),
    };
    let content = PersistedContent::from(vec![block.clone(), block]);

    let tree = from_persisted(&content, "doc");
    assert_eq!(tree.blocks.len(), 2);
    assert_ne!(tree.blocks[0].id, tree.blocks[1].id);
}
