//! Rebalance engine: one bar in, one new state out.
//!
//! Each step runs, in order:
//! 1. Bar validation (non-finite OHLC is a data gap; nothing changes)
//! 2. Fill detection (opening rule on the first valid bar, intraday after)
//! 3. Conversion of filled quantity to the opposite side
//! 4. Resolution against the ideal open range
//! 5. Ledger update
//!
//! The input state is never mutated; the caller threads the returned state
//! into the next call.

use crate::config::LadderConfig;
use crate::distribute::{verify_conservation, OrderDistributor, SequenceOrder};
use crate::domain::{Bar, Fill, Ladder, Side};
use crate::engine::accounting::Ledger;
use crate::engine::observer::{NoopObserver, StepObserver};
use crate::engine::remap::remap;
use crate::engine::scenario::{IdealOpenRange, ResolutionScenario};
use crate::engine::snapshot::{LevelSnapshot, Resolution, StepOutput, StepSnapshot};
use crate::engine::state::{EngineStatus, LadderState};
use crate::error::LadderError;
use crate::execution::{FillEngine, FillSet};
use crate::price_ladder::seed_ladder;
use crate::sequence::SequenceKind;

pub struct RebalanceEngine {
    config: LadderConfig,
    fill_engine: FillEngine,
    distributor: OrderDistributor,
    observer: Box<dyn StepObserver>,
}

impl RebalanceEngine {
    pub fn new(config: LadderConfig) -> Result<Self, LadderError> {
        config.validate()?;
        let distributor = OrderDistributor::new(config.lot_size, config.remainder_policy)?;
        Ok(Self {
            fill_engine: FillEngine::new(config.tick_size),
            distributor,
            observer: Box::new(NoopObserver),
            config,
        })
    }

    pub fn with_observer(mut self, observer: Box<dyn StepObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn config(&self) -> &LadderConfig {
        &self.config
    }

    /// Seeded ladder and opening ledger.
    pub fn initial_state(&self) -> Result<LadderState, LadderError> {
        let ladder = seed_ladder(&self.config)?;
        let ledger = Ledger::initial(self.config.total_funds, &ladder);
        Ok(LadderState::new(ladder, ledger))
    }

    /// Advance the state by one bar.
    ///
    /// `next_open` is the following bar's open; pass `None` on the last bar
    /// and the close is used instead.
    pub fn step(
        &self,
        state: &LadderState,
        bar: &Bar,
        next_open: Option<f64>,
    ) -> Result<StepOutput, LadderError> {
        if state.is_finished() {
            return Err(LadderError::invalid(
                "state",
                "run is finished; no further steps are accepted",
            ));
        }
        if let Some((field, value)) = bar.first_gap() {
            let err = LadderError::DataGap {
                timestamp: bar.timestamp,
                field,
                value,
            };
            self.observer.on_data_gap(state.steps, &err);
            return Err(err);
        }

        let mut next = state.clone();
        let fills = self
            .fill_engine
            .detect_fills(&state.ladder, bar, !state.opened);
        self.observer.on_fills(state.steps, bar, &fills);

        next.traded_range.extend(fills.indices());
        let converted = convert_fills(&mut next.ladder, &fills);
        let sell_total = next.ladder.total(Side::Sell);
        let buy_total = next.ladder.total(Side::Buy);

        let ideal_range = IdealOpenRange::from_ladder(&next.ladder);
        let anchor = next_open.filter(|p| p.is_finite()).unwrap_or(bar.close);
        let resolution = match ideal_range.classify(anchor) {
            ResolutionScenario::NextOpenInsideIdealRange => {
                self.resolve_inside(&mut next, ideal_range, anchor)?
            }
            ResolutionScenario::NextOpenAboveIdealRange => {
                self.resolve_above(&mut next, ideal_range, anchor)?
            }
            ResolutionScenario::NextOpenBelowIdealRange => {
                self.resolve_below(&mut next, ideal_range, anchor)?
            }
        };
        ensure_side_total(&next.ladder, Side::Sell, sell_total)?;
        ensure_side_total(&next.ladder, Side::Buy, buy_total)?;

        next.ledger = Ledger::update(
            state.ledger.cash,
            fills.realized_flow(),
            &next.ladder,
            bar.close,
        );
        next.opened = true;
        next.steps += 1;
        next.status = EngineStatus::Stepping;

        let levels = state
            .ladder
            .levels
            .iter()
            .zip(&next.ladder.levels)
            .enumerate()
            .map(|(i, (pre, post))| LevelSnapshot::pair(i, pre, post))
            .collect();
        let snapshot = StepSnapshot {
            step: state.steps,
            timestamp: bar.timestamp,
            fill_scenario: fills.scenario,
            fills: fills.sells.iter().chain(&fills.buys).copied().collect(),
            converted,
            resolution,
            levels,
            traded_range: next.traded_range.indices(),
            ledger: next.ledger,
        };
        self.observer.on_resolution(state.steps, &snapshot.resolution);
        self.observer.on_step(&snapshot);

        Ok(StepOutput {
            state: next,
            snapshot,
        })
    }

    /// Terminal transition. The returned state rejects further steps.
    pub fn finish(&self, state: &LadderState) -> LadderState {
        let mut done = state.clone();
        done.status = EngineStatus::Finished;
        done
    }

    /// Next open inside the range: settle the traded span and start over.
    fn resolve_inside(
        &self,
        state: &mut LadderState,
        ideal_range: IdealOpenRange,
        anchor: f64,
    ) -> Result<Resolution, LadderError> {
        let scenario = ResolutionScenario::NextOpenInsideIdealRange;
        let Some(window) = state.traded_range.span() else {
            return Ok(Resolution::idle(scenario, anchor, ideal_range));
        };
        let resolution =
            self.redistribute(&mut state.ladder, window, scenario, anchor, ideal_range)?;
        state.traded_range.reset();
        Ok(resolution)
    }

    fn resolve_above(
        &self,
        state: &mut LadderState,
        ideal_range: IdealOpenRange,
        anchor: f64,
    ) -> Result<Resolution, LadderError> {
        self.resolve_gap(
            state,
            ideal_range,
            ResolutionScenario::NextOpenAboveIdealRange,
            anchor,
        )
    }

    fn resolve_below(
        &self,
        state: &mut LadderState,
        ideal_range: IdealOpenRange,
        anchor: f64,
    ) -> Result<Resolution, LadderError> {
        self.resolve_gap(
            state,
            ideal_range,
            ResolutionScenario::NextOpenBelowIdealRange,
            anchor,
        )
    }

    /// Gap through one end of the range: widen the window to reach the anchor
    /// and keep it as the traded range.
    fn resolve_gap(
        &self,
        state: &mut LadderState,
        ideal_range: IdealOpenRange,
        scenario: ResolutionScenario,
        anchor: f64,
    ) -> Result<Resolution, LadderError> {
        let span = state.traded_range.span();
        let window = span
            .into_iter()
            .flat_map(|(lo, hi)| [lo, hi])
            .chain(state.ladder.nearest_index(anchor))
            .chain(ideal_range.boundary_index(scenario))
            .fold(None, |acc: Option<(usize, usize)>, i| match acc {
                None => Some((i, i)),
                Some((lo, hi)) => Some((lo.min(i), hi.max(i))),
            });
        let Some((lo, hi)) = window else {
            return Ok(Resolution::idle(scenario, anchor, ideal_range));
        };
        let resolution =
            self.redistribute(&mut state.ladder, (lo, hi), scenario, anchor, ideal_range)?;
        state.traded_range.extend(lo..=hi);
        Ok(resolution)
    }

    /// Zero `window` and spread its per-side totals around the anchor: sells
    /// on levels above it, buys on levels at or below it, largest quantities
    /// farthest from the anchor.
    fn redistribute(
        &self,
        ladder: &mut Ladder,
        (lo, hi): (usize, usize),
        scenario: ResolutionScenario,
        anchor: f64,
        ideal_range: IdealOpenRange,
    ) -> Result<Resolution, LadderError> {
        let sell_total = ladder.total_in(Side::Sell, lo, hi);
        let buy_total = ladder.total_in(Side::Buy, lo, hi);
        for level in &mut ladder.levels[lo..=hi] {
            level.clear();
        }
        let depth = self.config.sequence_depth;

        let mut sell_targets = Vec::new();
        if sell_total > 0 {
            let above: Vec<usize> = (lo..=hi)
                .filter(|&i| ladder.levels[i].price > anchor)
                .collect();
            sell_targets = above[above.len().saturating_sub(depth)..].to_vec();
            if sell_targets.is_empty() {
                let level = fallback_level(ladder, (lo, hi), anchor, Side::Sell, &[])
                    .ok_or_else(|| no_free_level(Side::Sell))?;
                sell_targets.push(level);
            }
        }

        let mut buy_targets = Vec::new();
        if buy_total > 0 {
            buy_targets = (lo..=hi)
                .filter(|&i| ladder.levels[i].price <= anchor && !sell_targets.contains(&i))
                .take(depth)
                .collect();
            if buy_targets.is_empty() {
                let level =
                    match fallback_level(ladder, (lo, hi), anchor, Side::Buy, &sell_targets) {
                        Some(i) => i,
                        None => release_sell_target(ladder, &mut sell_targets, anchor)?,
                    };
                buy_targets.push(level);
            }
        }

        self.place(
            ladder,
            &sell_targets,
            sell_total,
            Side::Sell,
            self.config.sell_sequence,
            SequenceOrder::Reversed,
        )?;
        self.place(
            ladder,
            &buy_targets,
            buy_total,
            Side::Buy,
            self.config.buy_sequence,
            SequenceOrder::Forward,
        )?;

        Ok(Resolution {
            scenario,
            anchor,
            ideal_range,
            window: Some((lo, hi)),
            sell_total,
            buy_total,
            sell_targets,
            buy_targets,
        })
    }

    fn place(
        &self,
        ladder: &mut Ladder,
        targets: &[usize],
        total: u64,
        side: Side,
        kind: SequenceKind,
        order: SequenceOrder,
    ) -> Result<(), LadderError> {
        if total == 0 || targets.is_empty() {
            return Ok(());
        }
        let weights = kind.generate(targets.len())?;
        let alloc = self.distributor.distribute(total, &weights, side, order)?;
        verify_conservation(total, &alloc)?;
        for (&i, qty) in targets.iter().zip(alloc) {
            let level = &mut ladder.levels[i];
            level.set_qty(side, level.qty(side) + qty);
        }
        Ok(())
    }
}

/// Zero every filled level and rest the mirrored quantity on the opposite side.
fn convert_fills(ladder: &mut Ladder, fills: &FillSet) -> Vec<Fill> {
    let mut converted = Vec::with_capacity(fills.len());
    for side_fills in [&fills.sells, &fills.buys] {
        for fill in side_fills.iter() {
            ladder.levels[fill.index].set_qty(fill.side, 0);
        }
        for fill in remap(side_fills) {
            let level = &mut ladder.levels[fill.index];
            level.set_qty(fill.side, level.qty(fill.side) + fill.qty);
            converted.push(fill);
        }
    }
    converted
}

/// A level for `side` when the window has none on its side of the anchor.
///
/// Tries, in order: the nearest free level beyond the window on that side of
/// the anchor, the ladder edge, then any free level inside the window. A level
/// is free when it carries nothing on the opposite side and is not in `taken`.
fn fallback_level(
    ladder: &Ladder,
    (lo, hi): (usize, usize),
    anchor: f64,
    side: Side,
    taken: &[usize],
) -> Option<usize> {
    let usable = |i: usize| ladder.levels[i].qty(side.opposite()) == 0 && !taken.contains(&i);
    let (beyond, edge, inside) = match side {
        Side::Sell => (
            (0..lo)
                .rev()
                .find(|&i| ladder.levels[i].price > anchor && usable(i)),
            0,
            (lo..=hi).find(|&i| usable(i)),
        ),
        Side::Buy => (
            (hi + 1..ladder.len()).find(|&i| ladder.levels[i].price <= anchor && usable(i)),
            ladder.len() - 1,
            (lo..=hi).rev().find(|&i| usable(i)),
        ),
    };
    beyond
        .or_else(|| Some(edge).filter(|&i| usable(i)))
        .or(inside)
}

/// Every free level is already a sell target: the target nearest the anchor
/// goes to the buys. A sole sell target first moves to the nearest level
/// without buys.
fn release_sell_target(
    ladder: &Ladder,
    sell_targets: &mut Vec<usize>,
    anchor: f64,
) -> Result<usize, LadderError> {
    let released = sell_targets.pop().ok_or_else(|| no_free_level(Side::Buy))?;
    if sell_targets.is_empty() {
        let moved = nearest_free(ladder, released, Side::Sell, &[released])
            .ok_or_else(|| no_free_level(Side::Sell))?;
        sell_targets.push(moved);
    }
    tracing::warn!(
        target: "ladderlab::engine",
        anchor,
        level = released,
        "no free level for buys; released the nearest sell target"
    );
    Ok(released)
}

/// Closest level to `origin` by index that is usable for `side`.
fn nearest_free(ladder: &Ladder, origin: usize, side: Side, taken: &[usize]) -> Option<usize> {
    (0..ladder.len())
        .filter(|&i| ladder.levels[i].qty(side.opposite()) == 0 && !taken.contains(&i))
        .min_by_key(|&i| i.abs_diff(origin))
}

fn no_free_level(side: Side) -> LadderError {
    LadderError::invalid(
        "ladder",
        format!("no level can take the {} side without crossing", side.name()),
    )
}

fn ensure_side_total(ladder: &Ladder, side: Side, expected: u64) -> Result<(), LadderError> {
    let actual = ladder.total(side);
    if actual == expected {
        Ok(())
    } else {
        Err(LadderError::ConservationViolation { expected, actual })
    }
}
