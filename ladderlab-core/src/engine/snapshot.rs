//! Per-step records handed to observers and collected by the runner.

use crate::domain::{Fill, PriceLevel};
use crate::engine::accounting::Ledger;
use crate::engine::scenario::{IdealOpenRange, ResolutionScenario};
use crate::engine::state::LadderState;
use crate::execution::FillScenario;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One level before and after a step.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelSnapshot {
    pub index: usize,
    pub price: f64,
    pub pre_buy: u64,
    pub pre_sell: u64,
    pub post_buy: u64,
    pub post_sell: u64,
}

impl LevelSnapshot {
    pub fn pair(index: usize, pre: &PriceLevel, post: &PriceLevel) -> Self {
        Self {
            index,
            price: post.price,
            pre_buy: pre.buy_qty,
            pre_sell: pre.sell_qty,
            post_buy: post.buy_qty,
            post_sell: post.sell_qty,
        }
    }

    pub fn changed(&self) -> bool {
        self.pre_buy != self.post_buy || self.pre_sell != self.post_sell
    }
}

/// How the traded window was redistributed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub scenario: ResolutionScenario,
    /// Next open, or the bar close on the last bar.
    pub anchor: f64,
    pub ideal_range: IdealOpenRange,
    /// Inclusive index window that was zeroed and refilled. `None` when
    /// nothing needed resolving.
    pub window: Option<(usize, usize)>,
    pub sell_total: u64,
    pub buy_total: u64,
    pub sell_targets: Vec<usize>,
    pub buy_targets: Vec<usize>,
}

impl Resolution {
    pub fn idle(scenario: ResolutionScenario, anchor: f64, ideal_range: IdealOpenRange) -> Self {
        Self {
            scenario,
            anchor,
            ideal_range,
            window: None,
            sell_total: 0,
            buy_total: 0,
            sell_targets: Vec::new(),
            buy_targets: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSnapshot {
    /// Zero-based count of completed steps before this one.
    pub step: usize,
    pub timestamp: NaiveDateTime,
    pub fill_scenario: FillScenario,
    /// Sells first, then buys; each ascending by index.
    pub fills: Vec<Fill>,
    /// Filled quantity as placed on the opposite side, before redistribution.
    pub converted: Vec<Fill>,
    pub resolution: Resolution,
    pub levels: Vec<LevelSnapshot>,
    /// Traded range after the step.
    pub traded_range: Vec<usize>,
    pub ledger: Ledger,
}

impl StepSnapshot {
    pub fn filled_qty(&self) -> u64 {
        self.fills.iter().map(|f| f.qty).sum()
    }
}

/// Result of a successful step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutput {
    pub state: LadderState,
    pub snapshot: StepSnapshot,
}
