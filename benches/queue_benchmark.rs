// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Benchmarks for the persistent queue.
//!
//! Measures:
//! - Enqueue/dequeue round-trip latency at different payload sizes
//! - Sustained throughput cycling through the ring

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use filequeue::{Queue, QueueBuilder};
use tempfile::TempDir;

/// Payload sizes to benchmark (bytes)
const PAYLOAD_SIZES: &[usize] = &[64, 256, 1024, 4096, 16384];

/// Messages cycled per throughput iteration
const CYCLE_COUNT: usize = 1_000;

/// Create a queue in a temporary directory with a 4 MiB block geometry
fn create_queue(temp_dir: &TempDir) -> Queue {
    QueueBuilder::new("bench_queue")
        .storage_dir(temp_dir.path().join("storage"))
        .log_dir(temp_dir.path().join("logs"))
        .block_size(4 * 1024 * 1024)
        .max_size(64 * 1024 * 1024)
        .open()
        .expect("Failed to create queue")
}

/// Generate a payload of the given size
fn generate_payload(size: usize) -> Vec<u8> { vec![0xABu8; size] }

/// Benchmark a single enqueue + dequeue pair (includes both header flushes)
fn bench_roundtrip_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("roundtrip_latency");

    for &size in PAYLOAD_SIZES {
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let temp_dir = TempDir::new().unwrap();
            let queue = create_queue(&temp_dir);
            let payload = generate_payload(size);

            b.iter(|| {
                assert!(queue.enqueue(black_box(&payload)).unwrap());
                black_box(queue.dequeue().unwrap().unwrap());
            });

            queue.close().unwrap();
        });
    }

    group.finish();
}

/// Benchmark sustained cycling through the ring: enqueue a batch, drain it
fn bench_sustained_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("sustained_throughput");
    group.sample_size(10);

    for &size in &[256usize, 4096] {
        group.throughput(Throughput::Bytes((size * CYCLE_COUNT) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let temp_dir = TempDir::new().unwrap();
            let queue = create_queue(&temp_dir);
            let payload = generate_payload(size);

            b.iter(|| {
                for _ in 0..CYCLE_COUNT {
                    assert!(queue.enqueue(black_box(&payload)).unwrap());
                }
                for _ in 0..CYCLE_COUNT {
                    black_box(queue.dequeue().unwrap().unwrap());
                }
            });

            queue.close().unwrap();
        });
    }

    group.finish();
}

criterion_group!(benches, bench_roundtrip_latency, bench_sustained_throughput);
criterion_main!(benches);
