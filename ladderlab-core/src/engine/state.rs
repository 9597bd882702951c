//! Engine state threaded from one step to the next.

use crate::domain::{Ladder, TradedRange};
use crate::engine::accounting::Ledger;
use serde::{Deserialize, Serialize};

/// Lifecycle of a run: `Initialized → Stepping* → Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineStatus {
    Initialized,
    Stepping,
    Finished,
}

/// Everything a step needs from the past.
///
/// A step takes a `&LadderState` and returns a new one; nothing else carries
/// state between bars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderState {
    pub ladder: Ladder,
    pub ledger: Ledger,
    pub traded_range: TradedRange,
    /// Completed steps. Data-gap bars are not counted.
    pub steps: usize,
    pub status: EngineStatus,
    /// Set once the opening rule has been applied to the first valid bar.
    pub opened: bool,
}

impl LadderState {
    pub fn new(ladder: Ladder, ledger: Ledger) -> Self {
        Self {
            ladder,
            ledger,
            traded_range: TradedRange::new(),
            steps: 0,
            status: EngineStatus::Initialized,
            opened: false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status == EngineStatus::Finished
    }

    /// Resting sell plus resting buy quantity.
    pub fn total_quantity(&self) -> u64 {
        self.ladder
            .levels
            .iter()
            .map(|l| l.buy_qty + l.sell_qty)
            .sum()
    }
}
