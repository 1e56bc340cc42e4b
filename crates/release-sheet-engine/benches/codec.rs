use criterion::{Criterion, criterion_group, criterion_main};
use release_sheet_engine::parsing::{from_persisted, html_to_tree, to_persisted, tree_to_html};
use release_sheet_engine::PersistedContent;
mod common;

fn bench_html_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    group.sample_size(10);

    let html = common::generate_sheet_html(50);
    group.bench_function("html_to_tree", |b| {
        b.iter(|| {
            let tree = html_to_tree(std::hint::black_box(&html), "bench");
            std::hint::black_box(tree);
        });
    });

    let tree = html_to_tree(&html, "bench");
    group.bench_function("tree_to_html", |b| {
        b.iter(|| {
            std::hint::black_box(tree_to_html(std::hint::black_box(&tree)));
        });
    });

    let content = PersistedContent::from(common::generate_blocks(200));
    group.bench_function("persisted_round_trip", |b| {
        b.iter(|| {
            let tree = from_persisted(std::hint::black_box(&content), "bench");
            std::hint::black_box(to_persisted(&tree));
        });
    });

    group.finish();
}

criterion_group!(benches, bench_html_codec);
criterion_main!(benches);
