//! Round-trip context-switch latency, ported from the reference
//! implementation's `context_switch_timing.c`. Manual `harness = false`
//! Criterion setup, matching this kernel's own benchmark convention.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use symcoro::Coroutine;

fn round_trip(n: u64) {
    let mut child = Coroutine::spawn(move |channel: &symcoro::Channel<u64>| {
        for i in 0..n {
            channel.yield_to(i);
        }
    });
    while let Some(i) = child.from() {
        black_box(i);
    }
}

fn bench_switch_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("switch_latency");
    for &count in &[1_000u64, 100_000] {
        group.bench_function(format!("{count}_round_trips"), |b| {
            b.iter(|| round_trip(black_box(count)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_switch_latency);
criterion_main!(benches);
