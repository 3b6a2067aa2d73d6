//! Source benchmark suite
//!
//! Batching throughput of the reader and memory sources.
//!
//! Run with: `cargo bench -p sluice-sources --bench reader`

use std::io::Cursor;

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use crossbeam::channel;
use sluice_pipeline::Source;
use sluice_sources::{MemorySource, ReaderSource};

const INPUT_LINES: usize = 100_000;

fn create_input() -> Vec<u8> {
    let mut data = String::with_capacity(INPUT_LINES * 40);
    for i in 0..INPUT_LINES {
        data.push_str(&format!("user{},GET,/api/v1/items/{},200\n", i % 97, i));
    }
    data.into_bytes()
}

/// Read, cut and release batches, reusing pooled buffers
fn bench_reader(c: &mut Criterion) {
    let input = create_input();
    let mut group = c.benchmark_group("reader");
    group.throughput(Throughput::Bytes(input.len() as u64));

    for batch_bytes in [16 * 1024, 256 * 1024] {
        group.bench_with_input(
            BenchmarkId::from_parameter(batch_bytes),
            &batch_bytes,
            |b, &batch_bytes| {
                b.iter(|| {
                    let source = ReaderSource::reader(Cursor::new(input.clone()), batch_bytes, 4);
                    let (tx, rx) = channel::bounded(4);
                    let reader = &source;
                    std::thread::scope(|s| {
                        s.spawn(move || reader.run(tx).unwrap());
                        for batch in rx {
                            black_box(batch.len());
                            source.release_batch(batch);
                        }
                    });
                    black_box(source.buffer_pool().metrics().hit_rate())
                });
            },
        );
    }

    group.finish();
}

/// Zero-copy slicing of an in-memory buffer
fn bench_memory(c: &mut Criterion) {
    let input = create_input();
    let mut group = c.benchmark_group("memory");
    group.throughput(Throughput::Bytes(input.len() as u64));

    group.bench_function("64k_batches", |b| {
        let source = MemorySource::new(input.clone());
        b.iter(|| {
            let (tx, rx) = channel::unbounded();
            source.run(tx).unwrap();
            black_box(rx.try_iter().count())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_reader, bench_memory);
criterion_main!(benches);
