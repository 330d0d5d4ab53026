//! Benchmark for testing VM performance with ten thousand hash operations.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use cvm_common::utils::strings::decode_hex;
use cvm_vm::ext::runtime::{execute, RuntimeConfig};

/// Hashes the first memory word into itself ten thousand times and returns it.
const TEN_THOUSAND_HASHES: &str = "0x6127105b80156018576020600020600052600190036003565b60206000f3";

fn test_ten_thousand_hashes(c: &mut Criterion) {
    let mut group = c.benchmark_group("cvm_vm");

    let code = decode_hex(TEN_THOUSAND_HASHES).expect("invalid bytecode");

    group.sample_size(100);
    group.bench_function(BenchmarkId::from_parameter("ten_thousand_hashes"), |b| {
        b.iter(|| {
            let outcome = execute(&code, &[], &mut RuntimeConfig::default());
            assert!(outcome.is_success());
        });
    });

    group.finish();
}

criterion_group!(benches, test_ten_thousand_hashes);
criterion_main!(benches);
