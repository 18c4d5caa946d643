// benches/state_bench.rs
//! Benchmarks for progress persistence and block classification.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use notion_puller::{Block, EventSink, MemorySink, NodeId, NodeRef, ProgressStore};
use serde_json::json;
use std::sync::Arc;

fn sink() -> Arc<dyn EventSink> {
    Arc::new(MemorySink::new())
}

/// A store file already holding `completed` ids and a few failures.
fn seeded_store(dir: &std::path::Path, completed: usize) -> std::path::PathBuf {
    let path = dir.join(format!("pull_state_{}.json", completed));
    let store = ProgressStore::load(&path, sink());
    for i in 0..completed {
        store
            .mark_completed(&NodeId::new(format!("block-{:06}", i)))
            .unwrap();
    }
    for i in 0..10 {
        store
            .mark_failed(
                &NodeRef::block(NodeId::new(format!("failed-{:02}", i))),
                "NotionService: object_not_found",
                "block_root",
            )
            .unwrap();
    }
    path
}

fn bench_state_persistence(c: &mut Criterion) {
    let dir = tempfile::tempdir().unwrap();
    let mut group = c.benchmark_group("state_persistence");

    for completed in [100usize, 1_000, 5_000] {
        let path = seeded_store(dir.path(), completed);

        group.bench_with_input(BenchmarkId::new("load", completed), &path, |b, path| {
            b.iter(|| black_box(ProgressStore::load(path, sink())))
        });

        let store = ProgressStore::load(&path, sink());
        let mut next = 0u64;
        group.bench_with_input(
            BenchmarkId::new("mark_completed", completed),
            &completed,
            |b, _| {
                b.iter(|| {
                    next += 1;
                    store
                        .mark_completed(&NodeId::new(format!("extra-{}", next)))
                        .unwrap();
                })
            },
        );
    }

    group.finish();
}

fn bench_block_classification(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_classification");

    for text_length in [10usize, 1_000, 10_000] {
        let raw = json!({
            "object": "block",
            "id": "12345678-1234-1234-1234-123456789abc",
            "has_children": false,
            "archived": false,
            "type": "paragraph",
            "paragraph": {
                "rich_text": [{
                    "type": "text",
                    "text": { "content": "a".repeat(text_length), "link": null },
                    "plain_text": "a".repeat(text_length),
                    "href": null
                }],
                "color": "default"
            }
        });

        group.bench_with_input(
            BenchmarkId::new("paragraph", text_length),
            &raw,
            |b, raw| b.iter(|| black_box(Block::from_value(raw).unwrap())),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_state_persistence, bench_block_classification);
criterion_main!(benches);
