// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
use chrono::{TimeZone, Utc};
use release_sheet_engine::{Block, BlockId, BlockKind, Document, DocumentId, ReleaseStatus};

#[allow(dead_code)]
pub fn generate_sheet_html(sections: usize) -> String {
    let base = "<h2>Release plan</h2><p>Single out <strong>Friday</strong>, video https://youtu.be/abcdef12 the week after.</p><ul><li>Artwork <em>final</em></li><li>Mastering</li></ul><p><img src=\"https://cdn.example.com/cover.jpg\" alt=\"cover\"></p><div class=\"embed\" data-url=\"https://www.tiktok.com/@artist/video/123\"></div>";
    base.repeat(sections)
}

#[allow(dead_code)]
pub fn generate_blocks(count: usize) -> Vec<Block> {
    (0..count)
        .map(|i| Block {
            id: BlockId::from(format!("block-{i}").as_str()),
            kind: BlockKind::Paragraph,
            content: format!("<p>Line {i} with <em>some</em> notes for the release</p>"),
        })
        .collect()
}

#[allow(dead_code)]
pub fn generate_document(blocks: usize) -> Document {
    Document {
        id: DocumentId::from("bench-doc"),
        title: "Benchmark Single".to_string(),
        content: generate_blocks(blocks).into(),
        status: ReleaseStatus::Draft,
        tags: vec!["single".to_string()],
        due_date: None,
        artist_id: Some("artist-1".to_string()),
        updated_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
    }
}
