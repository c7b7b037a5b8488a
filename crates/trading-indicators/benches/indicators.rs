//! Benchmarks for indicator implementations.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use trading_core::simd::{BatchOps, ScalarBatch, WideBatch};
use trading_core::traits::Indicator;
use trading_core::Tick;
use trading_data::TickStore;
use trading_indicators::{Ema, IndicatorConfig, IndicatorEngine, Rsi};

fn generate_test_data(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 100.0 + (i as f64 * 0.1).sin() * 10.0)
        .collect()
}

fn generate_store(size: usize) -> TickStore {
    let ticks: Vec<Tick> = generate_test_data(size)
        .into_iter()
        .enumerate()
        .map(|(i, price)| Tick::new(i as i64, price, 1.0 + (i % 7) as f64))
        .collect();
    TickStore::from_ticks("BENCH", &ticks)
}

fn benchmark_ema(c: &mut Criterion) {
    let mut group = c.benchmark_group("EMA");

    for size in [1000, 10000, 100000].iter() {
        let data = generate_test_data(*size);

        group.bench_with_input(BenchmarkId::new("standard", size), &data, |b, data| {
            let ema = Ema::new(20);
            b.iter(|| ema.calculate(black_box(data)))
        });
    }

    group.finish();
}

fn benchmark_rsi(c: &mut Criterion) {
    let mut group = c.benchmark_group("RSI");

    for size in [1000, 10000, 100000].iter() {
        let data = generate_test_data(*size);

        group.bench_with_input(BenchmarkId::new("standard", size), &data, |b, data| {
            let rsi = Rsi::new(14);
            b.iter(|| rsi.calculate(black_box(data)))
        });
    }

    group.finish();
}

fn benchmark_split_changes(c: &mut Criterion) {
    let mut group = c.benchmark_group("SplitChanges");

    for size in [10000, 100000].iter() {
        let data = generate_test_data(*size);
        let mut gains = vec![0.0; size - 1];
        let mut losses = vec![0.0; size - 1];

        group.bench_with_input(BenchmarkId::new("scalar", size), &data, |b, data| {
            b.iter(|| ScalarBatch.split_changes(black_box(data), &mut gains, &mut losses))
        });

        let mut gains = vec![0.0; size - 1];
        let mut losses = vec![0.0; size - 1];
        group.bench_with_input(BenchmarkId::new("simd", size), &data, |b, data| {
            b.iter(|| WideBatch.split_changes(black_box(data), &mut gains, &mut losses))
        });
    }

    group.finish();
}

fn benchmark_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("Engine");
    group.sample_size(20);

    for size in [100000, 1000000].iter() {
        let store = generate_store(*size);

        for threads in [1, 4] {
            let mut engine = IndicatorEngine::new(&IndicatorConfig {
                pool_threads: threads,
                ..IndicatorConfig::default()
            })
            .expect("engine");

            group.bench_with_input(
                BenchmarkId::new(format!("all_{threads}_threads"), size),
                &store,
                |b, store| b.iter(|| engine.calculate_all(black_box(store)).map(|s| s.len())),
            );
        }
    }

    group.finish();
}

fn benchmark_vwap(c: &mut Criterion) {
    let mut group = c.benchmark_group("VWAP");

    for size in [10000, 100000].iter() {
        let store = generate_store(*size);

        group.bench_with_input(BenchmarkId::new("scalar", size), &store, |b, store| {
            b.iter(|| store.vwap_with(&ScalarBatch, black_box(*size)))
        });

        group.bench_with_input(BenchmarkId::new("simd", size), &store, |b, store| {
            b.iter(|| store.vwap_with(&WideBatch, black_box(*size)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_ema,
    benchmark_rsi,
    benchmark_split_changes,
    benchmark_engine,
    benchmark_vwap
);
criterion_main!(benches);
