use std::hint::black_box;
use criterion::{criterion_group, criterion_main, Criterion};
use ndarray::Array4;
use neuro_ts::{AxisRole, Selector, TimeSeries, TimeSeriesOptions, TimeseriesService};

const N_T: usize = 4096;
const N_S: usize = 64;

fn recording() -> TimeSeries {
    let labels: Vec<String> = (0..N_S).map(|s| format!("ch{s}")).collect();
    let data = Array4::from_shape_fn((N_T, 1, N_S, 1), |(t, _, s, _)| {
        ((t as f64) * 0.01 * (s + 1) as f64).sin()
    });
    let opts = TimeSeriesOptions::default().with_labels(AxisRole::Space, &labels);
    TimeSeries::new(data, opts).unwrap()
}

fn bench_subspace_by_label(c: &mut Criterion) {
    let ts = recording();
    let wanted = ["ch3", "ch17", "ch42", "ch63"];
    c.bench_function("get_subspace_by_label 4 of 64", |b| {
        b.iter(|| {
            let sub = ts.get_subspace_by_label(black_box(&wanted)).unwrap();
            black_box(sub.number_of_labels())
        })
    });
}

fn bench_label_span_index(c: &mut Criterion) {
    let ts = recording();
    let sel = [
        Selector::span(100usize, 2100usize),
        Selector::All,
        Selector::span("ch8", "ch24"),
    ];
    c.bench_function("index time span × label span", |b| {
        b.iter(|| {
            let out = ts.index(black_box(&sel)).unwrap();
            black_box(out.len())
        })
    });
}

fn bench_zscore(c: &mut Criterion) {
    let ts = recording();
    let svc = TimeseriesService::new();
    c.bench_function("normalize zscore [4096×64]", |b| {
        b.iter(|| {
            let out = svc.normalize(black_box(&ts), "zscore", Some(0), None).unwrap();
            black_box(out.data()[[0, 0, 0, 0]])
        })
    });
}

fn bench_hilbert_envelope(c: &mut Criterion) {
    let ts = recording();
    let svc = TimeseriesService::new();
    c.bench_function("hilbert_envelope [4096×64]", |b| {
        b.iter(|| {
            let out = svc.hilbert_envelope(black_box(&ts)).unwrap();
            black_box(out.data()[[0, 0, 0, 0]])
        })
    });
}

criterion_group!(
    benches,
    bench_subspace_by_label,
    bench_label_span_index,
    bench_zscore,
    bench_hilbert_envelope
);
criterion_main!(benches);
