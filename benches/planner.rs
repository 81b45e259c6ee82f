//! Planner and voting benchmarks.

use ballast::{
    MarketObservation, Observations, PortfolioSnapshot, Signal, Signals, StrategySet, Symbol,
    TargetAllocation, combine, drift, plan_trades,
};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use rustc_hash::FxHashMap;

fn sym(i: usize) -> Symbol {
    Symbol::new(&format!("T{i:03}"))
}

/// Deterministic xorshift32 stream in [0, 1).
struct Rng(u32);

impl Rng {
    fn next(&mut self) -> f64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        (self.0 % 10_000) as f64 / 10_000.0
    }
}

/// Random portfolio of `n` assets with an equal-weight target.
fn setup(n: usize) -> (PortfolioSnapshot, TargetAllocation) {
    let mut rng = Rng(42);
    let balances: Vec<(Symbol, f64)> = (0..n).map(|i| (sym(i), 1.0 + rng.next() * 100.0)).collect();
    let prices: FxHashMap<Symbol, f64> = (0..n).map(|i| (sym(i), 1.0 + rng.next() * 5_000.0)).collect();
    let target = TargetAllocation::new((0..n).map(|i| (sym(i), 1.0 / n as f64)).collect())
        .unwrap();
    (PortfolioSnapshot::new(&balances, &prices), target)
}

fn bench_plan_trades(c: &mut Criterion) {
    let mut group = c.benchmark_group("planner/plan_trades");

    for n in [4, 32, 256] {
        let (snapshot, target) = setup(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, _| {
            b.iter(|| black_box(plan_trades(&target, &snapshot, 0.02)));
        });
    }

    group.finish();
}

fn bench_drift(c: &mut Criterion) {
    let (snapshot, target) = setup(64);
    c.bench_function("planner/drift_64", |b| {
        b.iter(|| black_box(drift(&target, &snapshot)));
    });
}

fn bench_combine(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate/combine");
    let choices = [Signal::Buy, Signal::Sell, Signal::Hold];

    for n in [4, 64, 512] {
        let mut rng = Rng(7);
        let per_strategy: Vec<Signals> = (0..3)
            .map(|_| {
                (0..n)
                    .map(|i| (sym(i), choices[(rng.next() * 3.0) as usize]))
                    .collect()
            })
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(n), &per_strategy, |b, per| {
            b.iter(|| black_box(combine(per.iter())));
        });
    }

    group.finish();
}

fn bench_combined_signals(c: &mut Criterion) {
    let mut rng = Rng(99);
    let observations: Observations = (0..64)
        .map(|i| {
            let obs = MarketObservation::at_price(100.0).with_changes(
                rng.next() * 10.0 - 5.0,
                rng.next() * 30.0 - 15.0,
                rng.next() * 60.0 - 30.0,
            );
            (sym(i), obs)
        })
        .collect();
    let strategies = StrategySet::standard(sym(0));

    c.bench_function("aggregate/combined_signals_64", |b| {
        b.iter(|| black_box(strategies.combined_signals(&observations)));
    });
}

criterion_group!(
    benches,
    bench_plan_trades,
    bench_drift,
    bench_combine,
    bench_combined_signals,
);
criterion_main!(benches);
