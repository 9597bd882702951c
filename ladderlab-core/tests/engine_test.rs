//! Integration tests for the rebalance engine.
//!
//! Tests:
//! 1. Ladder construction and distribution reference cases
//! 2. Opening rule at the pivot, data gaps
//! 3. Gap resolutions above and below the ideal open range, including after
//!    a bar that fills both sides
//! 4. Multi-bar invariants: conservation, cash identity, no crossed levels
//! 5. Determinism

use chrono::{NaiveDate, NaiveDateTime};
use ladderlab_core::engine::ResolutionScenario;
use ladderlab_core::{
    generate_levels, Bar, FillScenario, LadderConfig, LadderError, LadderState, OrderDistributor,
    RebalanceEngine, RemainderPolicy, SequenceKind, SequenceOrder, Side, StepSnapshot,
};

fn ts(minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 12, 2)
        .unwrap()
        .and_hms_opt(9, 30, 0)
        .unwrap()
        + chrono::Duration::minutes(minute as i64)
}

fn bar(minute: u32, open: f64, high: f64, low: f64, close: f64) -> Bar {
    Bar::new(ts(minute), open, high, low, close)
}

/// Levels 10.30 .. 9.70 at 1 %; sells [300, 200, 100], buys [100, 100, 200, 200].
fn small_engine() -> RebalanceEngine {
    RebalanceEngine::new(LadderConfig::new(10.0, 1.0, 3.5, 12_000.0, 100)).unwrap()
}

/// Opening bar at the pivot, then a bar that lifts the 10.10 and 10.20 sells.
fn after_sell_fills(engine: &RebalanceEngine, next_open: f64) -> (LadderState, StepSnapshot) {
    let s0 = engine.initial_state().unwrap();
    let s1 = engine
        .step(&s0, &bar(0, 10.0, 10.05, 9.98, 10.0), Some(10.05))
        .unwrap()
        .state;
    let out = engine
        .step(&s1, &bar(1, 10.05, 10.25, 10.02, 10.2), Some(next_open))
        .unwrap();
    (out.state, out.snapshot)
}

fn sells(state: &LadderState) -> Vec<u64> {
    state.ladder.levels.iter().map(|l| l.sell_qty).collect()
}

fn buys(state: &LadderState) -> Vec<u64> {
    state.ladder.levels.iter().map(|l| l.buy_qty).collect()
}

/// Smooth oscillation around `center`, cent-rounded, open = previous close.
fn wave_bars(n: usize, center: f64, amplitude: f64) -> Vec<Bar> {
    let cents = |x: f64| (x * 100.0).round() / 100.0;
    let mut prev = center;
    (0..n)
        .map(|i| {
            let close = cents(center + amplitude * (i as f64 * 0.37).sin());
            let open = cents(prev);
            let high = cents(open.max(close) + amplitude * 0.15);
            let low = cents(open.min(close) - amplitude * 0.15);
            prev = close;
            bar(i as u32, open, high, low, close)
        })
        .collect()
}

fn run_all(engine: &RebalanceEngine, bars: &[Bar]) -> Vec<(LadderState, StepSnapshot)> {
    let mut state = engine.initial_state().unwrap();
    let mut out = Vec::new();
    for (i, b) in bars.iter().enumerate() {
        let next_open = bars.get(i + 1).map(|n| n.open);
        let step = engine.step(&state, b, next_open).unwrap();
        state = step.state.clone();
        out.push((step.state, step.snapshot));
    }
    out
}

// ── Reference cases ──────────────────────────────────────────────────

#[test]
fn pivot_appears_once_within_level_bound() {
    let levels = generate_levels(36.50, 1.97, 10.0, 0.01).unwrap();
    assert_eq!(levels.iter().filter(|&&p| p == 36.50).count(), 1);
    assert!(levels.len() <= 2 * (10.0_f64 / 1.97).floor() as usize + 1);
}

#[test]
fn fibonacci_depth_five() {
    assert_eq!(
        SequenceKind::Fibonacci.generate(5).unwrap(),
        vec![1.0, 2.0, 3.0, 5.0, 8.0]
    );
}

#[test]
fn seven_hundred_over_fib5_sell() {
    let d = OrderDistributor::new(100, RemainderPolicy::SideDefault).unwrap();
    let out = d
        .distribute(700, &[1.0, 2.0, 3.0, 5.0, 8.0], Side::Sell, SequenceOrder::Forward)
        .unwrap();
    assert_eq!(out.len(), 5);
    assert!(out.iter().all(|q| q % 100 == 0));
    assert_eq!(out.iter().sum::<u64>(), 700);
}

#[test]
fn opening_bar_at_pivot_marks_nothing_filled() {
    let engine = small_engine();
    let state = engine.initial_state().unwrap();
    let out = engine
        .step(&state, &bar(0, 10.0, 10.25, 9.75, 10.0), Some(10.0))
        .unwrap();
    assert_eq!(out.snapshot.fill_scenario, FillScenario::OpeningAboveMid);
    assert!(out.snapshot.fills.is_empty());
    assert!(out.state.traded_range.is_empty());
    assert_eq!(out.state.ladder, state.ladder);
}

#[test]
fn missing_low_is_a_data_gap_and_state_carries_forward() {
    let engine = small_engine();
    let (state, _) = after_sell_fills(&engine, 10.22);
    let before = state.clone();
    let err = engine
        .step(&state, &bar(2, 10.2, 10.3, f64::NAN, 10.25), None)
        .unwrap_err();
    assert!(err.is_recoverable());
    match err {
        LadderError::DataGap { field, timestamp, .. } => {
            assert_eq!(field, "low");
            assert_eq!(timestamp, ts(2));
        }
        other => panic!("expected DataGap, got {other:?}"),
    }
    assert_eq!(state.ladder, before.ladder);
    assert_eq!(state.ledger, before.ledger);

    // The next valid bar steps from the carried state as usual.
    let out = engine
        .step(&state, &bar(3, 10.2, 10.21, 10.15, 10.2), None)
        .unwrap();
    assert_eq!(out.state.steps, before.steps + 1);
}

// ── Gap resolutions ──────────────────────────────────────────────────

#[test]
fn gap_above_widens_window_to_anchor() {
    let engine = small_engine();
    let (state, snap) = after_sell_fills(&engine, 10.40);
    let res = &snap.resolution;
    assert_eq!(res.scenario, ResolutionScenario::NextOpenAboveIdealRange);
    assert_eq!(res.window, Some((0, 2)));
    assert_eq!(res.sell_total, 300);
    assert_eq!(res.buy_total, 300);
    // Nothing in the window sits above 10.40: the sells land on the top rung.
    assert_eq!(res.sell_targets, vec![0]);
    assert_eq!(res.buy_targets, vec![1, 2]);

    assert_eq!(sells(&state), vec![300, 0, 0, 0, 0, 0, 0]);
    assert_eq!(buys(&state), vec![0, 100, 200, 100, 100, 200, 200]);
    // The traded range keeps the whole window.
    assert_eq!(state.traded_range.indices(), vec![0, 1, 2]);
}

#[test]
fn gap_below_pushes_buys_under_anchor() {
    let engine = small_engine();
    let (state, snap) = after_sell_fills(&engine, 9.97);
    let res = &snap.resolution;
    assert_eq!(res.scenario, ResolutionScenario::NextOpenBelowIdealRange);
    assert_eq!(res.window, Some((1, 3)));
    assert_eq!(res.buy_total, 400);
    assert_eq!(res.sell_total, 0);
    assert_eq!(res.buy_targets, vec![4]);

    assert_eq!(buys(&state), vec![0, 0, 0, 0, 500, 200, 200]);
    assert_eq!(state.ladder.total(Side::Buy), 900);
    assert_eq!(state.traded_range.indices(), vec![1, 2, 3]);
}

#[test]
fn converted_quantities_are_mirrored() {
    let engine = small_engine();
    let (_, snap) = after_sell_fills(&engine, 10.22);
    let filled: Vec<(usize, u64)> = snap.fills.iter().map(|f| (f.index, f.qty)).collect();
    let converted: Vec<(usize, u64, Side)> = snap
        .converted
        .iter()
        .map(|f| (f.index, f.qty, f.side))
        .collect();
    assert_eq!(filled, vec![(1, 200), (2, 100)]);
    assert_eq!(converted, vec![(1, 100, Side::Buy), (2, 200, Side::Buy)]);
}

#[test]
fn last_bar_resolves_against_its_close() {
    let engine = small_engine();
    let s0 = engine.initial_state().unwrap();
    let out = engine
        .step(&s0, &bar(0, 10.0, 10.05, 9.98, 10.03), None)
        .unwrap();
    assert_eq!(out.snapshot.resolution.anchor, 10.03);
}

// ── Two-sided sweeps ─────────────────────────────────────────────────

/// Opening bar at the pivot, then a bar that fills every level on both sides.
fn after_full_sweep(engine: &RebalanceEngine, next_open: f64) -> (LadderState, StepSnapshot) {
    let s0 = engine.initial_state().unwrap();
    let s1 = engine
        .step(&s0, &bar(0, 10.0, 10.05, 9.98, 10.0), Some(10.0))
        .unwrap()
        .state;
    let out = engine
        .step(&s1, &bar(1, 10.0, 10.40, 9.60, 10.0), Some(next_open))
        .unwrap();
    (out.state, out.snapshot)
}

#[test]
fn sweep_then_gap_below_bottom_keeps_sides_apart() {
    let engine = small_engine();
    let (state, snap) = after_full_sweep(&engine, 9.50);

    assert_eq!(snap.fills.len(), 7);
    assert_eq!(
        snap.resolution.scenario,
        ResolutionScenario::NextOpenBelowIdealRange
    );
    assert_eq!(snap.resolution.window, Some((0, 6)));
    assert_eq!(snap.resolution.sell_targets, vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(snap.resolution.buy_targets, vec![6]);
    assert!(state.ladder.crossed_levels().is_empty());
    assert_eq!(buys(&state), vec![0, 0, 0, 0, 0, 0, 600]);
    assert_eq!(state.ladder.total(Side::Sell), 600);
    assert_eq!(state.ladder.levels[6].sell_qty, 0);
}

#[test]
fn sweep_then_gap_above_top_keeps_sides_apart() {
    let engine = small_engine();
    let (state, snap) = after_full_sweep(&engine, 10.50);

    assert_eq!(
        snap.resolution.scenario,
        ResolutionScenario::NextOpenAboveIdealRange
    );
    assert_eq!(snap.resolution.window, Some((0, 6)));
    assert_eq!(snap.resolution.sell_targets, vec![0]);
    assert_eq!(snap.resolution.buy_targets, vec![1, 2, 3, 4, 5, 6]);
    assert!(state.ladder.crossed_levels().is_empty());
    assert_eq!(sells(&state), vec![600, 0, 0, 0, 0, 0, 0]);
    assert_eq!(state.ladder.total(Side::Buy), 600);
    assert_eq!(state.ladder.levels[0].buy_qty, 0);
}

// ── Multi-bar invariants ─────────────────────────────────────────────

#[test]
fn quantity_is_conserved_across_a_run() {
    let engine = small_engine();
    let initial = engine.initial_state().unwrap().total_quantity();
    for (state, _) in run_all(&engine, &wave_bars(200, 10.0, 0.35)) {
        assert_eq!(state.total_quantity(), initial);
    }
}

#[test]
fn cash_moves_only_by_fill_flow() {
    let engine = small_engine();
    let mut prior_cash = engine.initial_state().unwrap().ledger.cash;
    for (state, snap) in run_all(&engine, &wave_bars(200, 10.0, 0.35)) {
        let flow: f64 = snap.fills.iter().map(|f| f.cash_flow()).sum();
        assert!((state.ledger.cash - (prior_cash + flow)).abs() < 1e-6);
        assert!((state.ledger.equity - (state.ledger.cash + state.ledger.market_value)).abs() < 1e-6);
        assert!((state.ledger.surplus - (state.ledger.cash - state.ledger.pending_capital)).abs() < 1e-6);
        prior_cash = state.ledger.cash;
    }
}

#[test]
fn no_level_is_left_crossed_and_lots_hold() {
    let engine = RebalanceEngine::new(LadderConfig::new(36.50, 1.97, 10.0, 1_000_000.0, 100)).unwrap();
    for (state, snap) in run_all(&engine, &wave_bars(300, 36.5, 2.5)) {
        assert!(
            state.ladder.crossed_levels().is_empty(),
            "crossed at step {}",
            snap.step
        );
        assert!(state
            .ladder
            .levels
            .iter()
            .all(|l| l.buy_qty % 100 == 0 && l.sell_qty % 100 == 0));
    }
}

#[test]
fn same_inputs_same_outputs() {
    let bars = wave_bars(150, 10.0, 0.4);
    let a = run_all(&small_engine(), &bars);
    let b = run_all(&small_engine(), &bars);
    assert_eq!(a.len(), b.len());
    for ((sa, pa), (sb, pb)) in a.iter().zip(&b) {
        assert_eq!(sa, sb);
        assert_eq!(pa, pb);
    }
}

#[test]
fn opening_below_pivot_fills_buys_once() {
    let engine = small_engine();
    let s0 = engine.initial_state().unwrap();
    let out = engine
        .step(&s0, &bar(0, 9.85, 9.9, 9.8, 9.88), Some(9.88))
        .unwrap();
    assert_eq!(out.snapshot.fill_scenario, FillScenario::OpeningBelowMid);
    let idx: Vec<usize> = out.snapshot.fills.iter().map(|f| f.index).collect();
    assert_eq!(idx, vec![3, 4]);
    assert!(out.state.ledger.realized_flow < 0.0);

    // Later bars use the intraday rule even if they open below the pivot.
    let next = engine
        .step(&out.state, &bar(1, 9.88, 9.89, 9.87, 9.88), None)
        .unwrap();
    assert_eq!(next.snapshot.fill_scenario, FillScenario::Intraday);
}
