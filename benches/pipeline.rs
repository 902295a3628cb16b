//! Per-invocation cost of the source-counting pipeline.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use hostcount::handler::Handler;
use hostcount::{ControlPlane, ControlPlaneConfig};
use hostcount_common::{CountingTable, InsertPolicy};
use std::net::Ipv4Addr;

fn frame_from(src: Ipv4Addr) -> [u8; 64] {
    let mut frame = [0u8; 64];
    frame[26..30].copy_from_slice(&src.octets());
    frame
}

fn bench_source_counter(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/source_counter");

    let known = Ipv4Addr::new(10, 0, 0, 1);
    let config = ControlPlaneConfig {
        known_hosts: vec![known],
        ..Default::default()
    };
    let plane = ControlPlane::from_config(&config).expect("failed to build control plane");
    let counter = plane.source_counter().expect("failed to deploy source counter");

    let hit = frame_from(known);
    let miss = frame_from(Ipv4Addr::new(203, 0, 113, 1));
    let runt = [0u8; 20];

    group.bench_function("hit", |b| b.iter(|| counter.invoke(black_box(&hit))));
    group.bench_function("miss", |b| b.iter(|| counter.invoke(black_box(&miss))));
    group.bench_function("short_frame", |b| {
        b.iter(|| counter.invoke(black_box(&runt)))
    });

    group.finish();
}

/// Increment cost as the table fills up.
fn bench_table_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline/table_load");

    for fill in [16u32, 256, 1000] {
        let table: CountingTable = CountingTable::with_policy(InsertPolicy::LookupOnly);
        for key in 0..fill {
            table.seed(key).expect("table full");
        }

        group.throughput(Throughput::Elements(fill as u64));
        group.bench_with_input(BenchmarkId::from_parameter(fill), &fill, |b, &fill| {
            b.iter(|| {
                for key in 0..fill {
                    black_box(table.increment(black_box(key)));
                }
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_source_counter, bench_table_load);
criterion_main!(benches);
