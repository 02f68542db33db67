use std::hint::black_box;

use bd_analysis::dedup::{DedupParams, cluster_devices};
use bd_analysis::pipeline::{PipelineContext, run_cycle};
use bd_core::Sample;
use chrono::{NaiveDate, TimeDelta};
use criterion::{Criterion, criterion_group, criterion_main};

/// Deux minutes de trafic dense : ~40 paquets/s.
fn busy_cycle(n: usize) -> Vec<Sample> {
    let t0 = NaiveDate::from_ymd_opt(2024, 5, 1)
        .and_then(|d| d.and_hms_opt(8, 0, 0))
        .unwrap_or_default();
    (0..n)
        .map(|i| {
            let offset = TimeDelta::milliseconds((i * 25) as i64);
            Sample::new(t0 + offset, -45 - (i * 13 % 40) as i32)
        })
        .collect()
}

fn bench_dedup(c: &mut Criterion) {
    let params = DedupParams::default();
    let small = busy_cycle(500);
    let large = busy_cycle(5_000);

    c.bench_function("dedup_500", |b| {
        b.iter(|| cluster_devices(black_box(&small), &params));
    });
    c.bench_function("dedup_5000", |b| {
        b.iter(|| cluster_devices(black_box(&large), &params));
    });
}

fn bench_cycle(c: &mut Criterion) {
    let ctx = PipelineContext::default();
    let samples = busy_cycle(5_000);
    c.bench_function("run_cycle_5000", |b| {
        b.iter(|| run_cycle(1, black_box(&samples), &ctx));
    });
}

criterion_group!(benches, bench_dedup, bench_cycle);
criterion_main!(benches);
