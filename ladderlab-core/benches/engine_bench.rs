//! Criterion benchmarks for LadderLab hot paths.
//!
//! Benchmarks:
//! 1. Step loop (full 1 000-bar run)
//! 2. Order distribution at several depths
//! 3. Ladder seeding

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ladderlab_core::price_ladder::seed_ladder;
use ladderlab_core::{
    Bar, LadderConfig, OrderDistributor, RebalanceEngine, RemainderPolicy, SequenceKind,
    SequenceOrder, Side,
};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap();
    let cents = |x: f64| (x * 100.0).round() / 100.0;
    let mut prev = 36.5;
    (0..n)
        .map(|i| {
            let close = cents(36.5 + (i as f64 * 0.1).sin() * 2.5);
            let open = cents(prev);
            prev = close;
            Bar::new(
                base + chrono::Duration::minutes(i as i64),
                open,
                cents(open.max(close) + 0.3),
                cents(open.min(close) - 0.3),
                close,
            )
        })
        .collect()
}

fn config() -> LadderConfig {
    LadderConfig::new(36.50, 1.97, 10.0, 1_000_000.0, 100)
}

// ── 1. Step loop ─────────────────────────────────────────────────────

fn bench_step_loop(c: &mut Criterion) {
    let bars = make_bars(1_000);
    let engine = RebalanceEngine::new(config()).unwrap();

    c.bench_function("step_loop_1000_bars", |b| {
        b.iter(|| {
            let mut state = engine.initial_state().unwrap();
            for (i, bar) in bars.iter().enumerate() {
                let next_open = bars.get(i + 1).map(|n| n.open);
                state = engine.step(&state, bar, next_open).unwrap().state;
            }
            black_box(state.ledger.equity)
        })
    });
}

// ── 2. Distribution ──────────────────────────────────────────────────

fn bench_distribute(c: &mut Criterion) {
    let d = OrderDistributor::new(100, RemainderPolicy::SideDefault).unwrap();
    let mut group = c.benchmark_group("distribute");
    for depth in [5usize, 10, 32, 64] {
        let weights = SequenceKind::Fibonacci.generate(depth).unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(depth), &weights, |b, w| {
            b.iter(|| {
                d.distribute(black_box(1_370_000), w, Side::Buy, SequenceOrder::Forward)
                    .unwrap()
            })
        });
    }
    group.finish();
}

// ── 3. Seeding ───────────────────────────────────────────────────────

fn bench_seed(c: &mut Criterion) {
    let cfg = config();
    c.bench_function("seed_ladder", |b| b.iter(|| seed_ladder(black_box(&cfg)).unwrap()));
}

criterion_group!(benches, bench_step_loop, bench_distribute, bench_seed);
criterion_main!(benches);
