//! Paging throughput for the in-memory and sled stores

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use feed_core::{ItemId, Revision, Store};
use journal::{Journal, MemoryStore, RetentionPolicy};

fn drain(store: &dyn Store, batch_size: usize) -> usize {
    let mut at = Revision::MIN;
    let mut total = 0;
    loop {
        let cs = store.changes(at, batch_size).unwrap();
        if cs.is_empty() {
            return total;
        }
        at = cs.to_revision();
        total += cs.len();
    }
}

fn bench_memory_paging(c: &mut Criterion) {
    let store = MemoryStore::new();
    for i in 0..10_000u32 {
        store.put(format!("doc-{}", i % 2_000), i.to_string());
    }

    let mut group = c.benchmark_group("memory_changes");
    for batch_size in [16usize, 256, 4096] {
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_size),
            &batch_size,
            |b, &batch_size| b.iter(|| black_box(drain(store.as_ref(), batch_size))),
        );
    }
    group.finish();
}

fn bench_journal_paging(c: &mut Criterion) {
    let dir = tempfile::TempDir::new().unwrap();
    let journal = Journal::open(dir.path(), RetentionPolicy::default()).unwrap();
    for i in 0..2_000u32 {
        journal
            .put(&ItemId::new(format!("doc-{}", i % 500)), i.to_string())
            .unwrap();
    }

    c.bench_function("journal_changes_256", |b| {
        b.iter(|| black_box(drain(journal.as_ref(), 256)))
    });
}

criterion_group!(benches, bench_memory_paging, bench_journal_paging);
criterion_main!(benches);
