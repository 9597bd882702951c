//! Fill engine: decide which resting ladder orders a bar crosses.
//!
//! Two rules:
//! 1. Opening step (first valid bar): the gap between the planned pivot and the
//!    realised open fills every order in between, on one side only.
//! 2. Intraday (every later bar): sells at or below `high - tick` and buys at or
//!    above `low + tick` fill.
//!
//! Detection is pure; the ladder is not touched.

use crate::domain::{Bar, Fill, Ladder, Side};
use serde::{Deserialize, Serialize};

/// Which detection rule produced a fill set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillScenario {
    /// First bar opened at or above the pivot: sells in `[pivot, open]` fill.
    OpeningAboveMid,
    /// First bar opened below the pivot: buys in `[open, pivot]` fill.
    OpeningBelowMid,
    /// Any later bar: high/low sweep.
    Intraday,
}

/// Fills detected on one bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FillSet {
    pub scenario: FillScenario,
    /// Sell fills, ascending by level index.
    pub sells: Vec<Fill>,
    /// Buy fills, ascending by level index.
    pub buys: Vec<Fill>,
}

impl FillSet {
    pub fn empty(scenario: FillScenario) -> Self {
        Self {
            scenario,
            sells: Vec::new(),
            buys: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sells.is_empty() && self.buys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sells.len() + self.buys.len()
    }

    pub fn side(&self, side: Side) -> &[Fill] {
        match side {
            Side::Buy => &self.buys,
            Side::Sell => &self.sells,
        }
    }

    pub fn qty(&self, side: Side) -> u64 {
        self.side(side).iter().map(|f| f.qty).sum()
    }

    /// Gross traded value, both sides.
    pub fn notional(&self) -> f64 {
        self.sells
            .iter()
            .chain(self.buys.iter())
            .map(Fill::notional)
            .sum()
    }

    /// Net cash effect: sell proceeds minus buy cost.
    pub fn realized_flow(&self) -> f64 {
        self.sells
            .iter()
            .chain(self.buys.iter())
            .map(Fill::cash_flow)
            .sum()
    }

    /// Filled level indices, both sides.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.sells.iter().chain(self.buys.iter()).map(|f| f.index)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FillEngine {
    tick_size: f64,
    epsilon: f64,
}

impl FillEngine {
    pub fn new(tick_size: f64) -> Self {
        Self {
            tick_size,
            // Level prices are tick-rounded; this absorbs float noise in `high - tick`.
            epsilon: tick_size * 1e-6,
        }
    }

    pub fn detect_fills(&self, ladder: &Ladder, bar: &Bar, is_opening_step: bool) -> FillSet {
        if !is_opening_step {
            return self.intraday(ladder, bar);
        }
        if bar.open >= ladder.pivot_price {
            self.opening_above_mid(ladder, bar.open)
        } else {
            self.opening_below_mid(ladder, bar.open)
        }
    }

    fn opening_above_mid(&self, ladder: &Ladder, open: f64) -> FillSet {
        let pivot = ladder.pivot_price;
        let sells = self.collect(ladder, Side::Sell, |p| {
            p >= pivot - self.epsilon && p <= open + self.epsilon
        });
        FillSet {
            scenario: FillScenario::OpeningAboveMid,
            sells,
            buys: Vec::new(),
        }
    }

    fn opening_below_mid(&self, ladder: &Ladder, open: f64) -> FillSet {
        let pivot = ladder.pivot_price;
        let buys = self.collect(ladder, Side::Buy, |p| {
            p >= open - self.epsilon && p <= pivot + self.epsilon
        });
        FillSet {
            scenario: FillScenario::OpeningBelowMid,
            sells: Vec::new(),
            buys,
        }
    }

    fn intraday(&self, ladder: &Ladder, bar: &Bar) -> FillSet {
        let sell_ceiling = bar.high - self.tick_size + self.epsilon;
        let buy_floor = bar.low + self.tick_size - self.epsilon;
        FillSet {
            scenario: FillScenario::Intraday,
            sells: self.collect(ladder, Side::Sell, |p| p <= sell_ceiling),
            buys: self.collect(ladder, Side::Buy, |p| p >= buy_floor),
        }
    }

    fn collect(&self, ladder: &Ladder, side: Side, crosses: impl Fn(f64) -> bool) -> Vec<Fill> {
        ladder
            .levels
            .iter()
            .enumerate()
            .filter(|(_, level)| level.qty(side) > 0 && crosses(level.price))
            .map(|(index, level)| Fill {
                index,
                price: level.price,
                qty: level.qty(side),
                side,
            })
            .collect()
    }
}
