//! Benchmark for testing VM performance with Fibonacci sequence calculations.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use cvm_common::utils::strings::decode_hex;
use cvm_vm::ext::runtime::{execute, RuntimeConfig};

/// Iterative fib(n) of the first calldata word, returned as a single word.
const FIB: &str =
    "0x600035600060015b8215601c57818101915090916001900391600756\
     5b5060005260206000f3";

fn test_fib(c: &mut Criterion) {
    let mut group = c.benchmark_group("cvm_vm");

    let code = decode_hex(FIB).expect("invalid bytecode");
    let input = decode_hex("0x0000000000000000000000000000000000000000000000000000000000000064")
        .expect("invalid calldata");

    group.sample_size(500);
    group.bench_function(BenchmarkId::from_parameter("fib"), |b| {
        b.iter(|| {
            let outcome = execute(&code, &input, &mut RuntimeConfig::default());

            assert_eq!(
                &outcome.output[..],
                &[
                    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 19, 51,
                    219, 118, 167, 197, 148, 191, 195
                ]
            );
        });
    });

    group.finish();
}

criterion_group!(benches, test_fib);
criterion_main!(benches);
