//! Step observers.
//!
//! The engine reports what it does through this trait instead of logging
//! directly; hosts pick the sink.

use crate::domain::Bar;
use crate::engine::snapshot::{Resolution, StepSnapshot};
use crate::error::LadderError;
use crate::execution::FillSet;

/// Receives engine events. Every method defaults to a no-op.
pub trait StepObserver: Send + Sync {
    fn on_fills(&self, _step: usize, _bar: &Bar, _fills: &FillSet) {}

    fn on_resolution(&self, _step: usize, _resolution: &Resolution) {}

    fn on_data_gap(&self, _step: usize, _error: &LadderError) {}

    fn on_step(&self, _snapshot: &StepSnapshot) {}
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl StepObserver for NoopObserver {}

/// Emits engine events as `tracing` events under the `ladderlab::engine` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl StepObserver for TracingObserver {
    fn on_fills(&self, step: usize, bar: &Bar, fills: &FillSet) {
        if fills.is_empty() {
            return;
        }
        tracing::debug!(
            target: "ladderlab::engine",
            step,
            timestamp = %bar.timestamp,
            scenario = ?fills.scenario,
            sells = fills.sells.len(),
            buys = fills.buys.len(),
            flow = fills.realized_flow(),
            "fills"
        );
    }

    fn on_resolution(&self, step: usize, resolution: &Resolution) {
        let Some((lo, hi)) = resolution.window else {
            return;
        };
        tracing::info!(
            target: "ladderlab::engine",
            step,
            scenario = resolution.scenario.name(),
            gap = resolution.scenario.is_gap(),
            anchor = resolution.anchor,
            lo,
            hi,
            sell_total = resolution.sell_total,
            buy_total = resolution.buy_total,
            "redistributed window"
        );
    }

    fn on_data_gap(&self, step: usize, error: &LadderError) {
        tracing::warn!(target: "ladderlab::engine", step, %error, "skipping bar");
    }

    fn on_step(&self, snapshot: &StepSnapshot) {
        tracing::debug!(
            target: "ladderlab::engine",
            step = snapshot.step,
            filled = snapshot.filled_qty(),
            changed_levels = snapshot.levels.iter().filter(|l| l.changed()).count(),
            cash = snapshot.ledger.cash,
            equity = snapshot.ledger.equity,
            surplus = snapshot.ledger.surplus,
            "step complete"
        );
    }
}
