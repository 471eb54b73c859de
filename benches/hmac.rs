//! Performance benchmarks for key-set signing.
//!
//! Run with: `cargo bench --bench hmac`
//!
//! ## Performance Targets
//!
//! | Operation | Target | Notes |
//! |-----------|--------|-------|
//! | Sign 14 keys | <50μs | One upload's worth of daily keys |
//! | Sign 1000 keys | <5ms | Worst case after long offline periods |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use exposure_sync::{calculate_hmac, canonical_key_set, ExposureKey, HmacSecret};

const BENCH_SECRET: &[u8] = b"bench_hmac_secret_16";

/// Create `count` distinct keys.
fn make_keys(count: usize) -> Vec<ExposureKey> {
    (0..count)
        .map(|i| {
            ExposureKey::new(
                format!("{:022}==", i),
                2_650_000 + (i as u32) * 144,
                144,
                (i % 8) as u8,
            )
        })
        .collect()
}

fn bench_calculate_hmac(c: &mut Criterion) {
    let secret = HmacSecret::from_bytes(BENCH_SECRET);
    let mut group = c.benchmark_group("calculate_hmac");

    for count in [1usize, 14, 100, 1000] {
        let keys = make_keys(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &keys, |b, keys| {
            b.iter(|| calculate_hmac(black_box(&secret), black_box(keys)))
        });
    }

    group.finish();
}

fn bench_canonicalization(c: &mut Criterion) {
    let mut keys = make_keys(1000);
    keys.reverse();

    c.bench_function("canonical_key_set_1000_reversed", |b| {
        b.iter(|| canonical_key_set(black_box(&keys)))
    });
}

criterion_group!(benches, bench_calculate_hmac, bench_canonicalization);
criterion_main!(benches);
