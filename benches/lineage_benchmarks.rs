//! Lineage engine benchmarks
//!
//! - Singleton relationship extraction over growing edge lists
//! - Catalog inclusion checks
//! - Saving and reloading batches through the in-memory store
//!
//! Toyota Way: Measure before optimizing (Genchi Genbutsu)

use std::sync::Arc;

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::Rng;
use trueno_lineage::catalog::{DataCatalog, Dtype, Feature, ANY_AXIS};
use trueno_lineage::datasets::{DatasetBatch, DatasetFormula, FileBatch, StreamingFormula};
use trueno_lineage::graph::{
    extract_singleton_parent, ArtefactId, MemoryGraphStore, RelationshipId, RelationshipRecord,
};
use trueno_lineage::{LineageStore, NoopNotifier, Version};

/// Edge list where only the last edge points into the queried child
fn create_edges(count: u64) -> Vec<RelationshipRecord> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| RelationshipRecord {
            id: RelationshipId(i),
            relationship_type: if i + 1 == count { "batch_formula" } else { "other" }.to_string(),
            parent: ArtefactId(rng.gen_range(1..1_000)),
            child: ArtefactId(if i + 1 == count { 0 } else { i + 1 }),
            creation_time: Utc::now(),
        })
        .collect()
}

#[allow(clippy::cast_possible_wrap)]
fn create_catalog(features: usize) -> DataCatalog {
    DataCatalog::new(
        (0..features)
            .map(|i| {
                Feature::new(format!("feature_{i}"), Dtype::Float32, vec![ANY_AXIS, (i % 16) as i64])
                    .unwrap()
            })
            .collect::<Vec<_>>(),
    )
    .unwrap()
}

fn bench_singleton_extraction(c: &mut Criterion) {
    let mut group = c.benchmark_group("singleton_extraction");

    for size in [10, 1_000, 100_000].iter() {
        let edges = create_edges(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let parent = extract_singleton_parent(black_box(&edges), ArtefactId(0), "batch_formula");
                black_box(parent.unwrap());
            });
        });
    }

    group.finish();
}

fn bench_catalog_inclusion(c: &mut Criterion) {
    let mut group = c.benchmark_group("catalog_inclusion");

    for size in [10, 100, 1_000].iter() {
        let wide = create_catalog(*size);
        let narrow = create_catalog(size / 2);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(wide.includes(black_box(&narrow))));
        });
    }

    group.finish();
}

fn bench_latest_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("latest_batch");

    for size in [10, 100, 1_000].iter() {
        let store = LineageStore::builder(Arc::new(MemoryGraphStore::new()))
            .notifier(Arc::new(NoopNotifier))
            .build();
        let mut formula = DatasetFormula::new(
            "bench",
            Version::new(1, 0, 0),
            create_catalog(4),
            StreamingFormula::new("/tmp/bench"),
        );
        store.save(&mut formula).unwrap();
        for epoch in 0..*size {
            let mut batch = DatasetBatch::new(&formula, FileBatch::default()).with_epoch(epoch);
            store.save(&mut batch).unwrap();
        }

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(store.get_latest_batch(&formula).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_singleton_extraction,
    bench_catalog_inclusion,
    bench_latest_batch
);
criterion_main!(benches);
