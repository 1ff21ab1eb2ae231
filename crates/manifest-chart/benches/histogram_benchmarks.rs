//! Benchmark for rendering the passenger-age histogram.
//!
//! Measures the full visualization path cost (binning, rasterising and PNG
//! encoding) for a manifest-sized column of ages.

use std::time::Duration;

use criterion::{criterion_group, criterion_main, Criterion};
use manifest_chart::{bin_counts, render_histogram, HistogramSpec};

/// Deterministic spread of ages resembling a passenger manifest (714 known ages).
fn manifest_ages() -> Vec<f64> {
    (0..714)
        .map(|i| {
            let base = ((i * 37) % 80) as f64;
            base + ((i % 4) as f64) * 0.25
        })
        .collect()
}

fn bench_bin_counts(c: &mut Criterion) {
    let ages = manifest_ages();
    c.bench_function("bin_counts_714_ages_20_bins", |b| {
        b.iter(|| bin_counts(&ages, 20).unwrap())
    });
}

fn bench_render_histogram(c: &mut Criterion) {
    let ages = manifest_ages();
    let spec = HistogramSpec::passenger_ages();
    c.bench_function("render_histogram_800x500", |b| {
        b.iter(|| render_histogram(&ages, &spec).unwrap())
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().measurement_time(Duration::from_secs(5));
    targets = bench_bin_counts, bench_render_histogram
}
criterion_main!(benches);
