//! Ladder: price levels with resting buy/sell quantities, sorted high to low.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Side::Buy => "buy",
            Side::Sell => "sell",
        }
    }
}

/// One rung of the ladder. Quantities are multiples of the ladder's lot size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: f64,
    pub buy_qty: u64,
    pub sell_qty: u64,
}

impl PriceLevel {
    pub fn new(price: f64) -> Self {
        Self {
            price,
            buy_qty: 0,
            sell_qty: 0,
        }
    }

    pub fn qty(&self, side: Side) -> u64 {
        match side {
            Side::Buy => self.buy_qty,
            Side::Sell => self.sell_qty,
        }
    }

    pub fn set_qty(&mut self, side: Side, qty: u64) {
        match side {
            Side::Buy => self.buy_qty = qty,
            Side::Sell => self.sell_qty = qty,
        }
    }

    pub fn clear(&mut self) {
        self.buy_qty = 0;
        self.sell_qty = 0;
    }

    /// Both sides resting at once. Never true after a completed step.
    pub fn is_crossed(&self) -> bool {
        self.buy_qty > 0 && self.sell_qty > 0
    }
}

/// The grid of levels around a pivot.
///
/// `levels` is sorted descending by price: index 0 is the highest rung.
/// Sells rest on the upper part, buys on the lower part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ladder {
    pub levels: Vec<PriceLevel>,
    pub pivot_price: f64,
    pub lot_size: u64,
    pub step_pct: f64,
    pub max_deviation_pct: f64,
    pub tick_size: f64,
}

impl Ladder {
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn prices(&self) -> Vec<f64> {
        self.levels.iter().map(|l| l.price).collect()
    }

    pub fn total(&self, side: Side) -> u64 {
        self.levels.iter().map(|l| l.qty(side)).sum()
    }

    /// Sum of resting quantity on one side over an inclusive index span.
    pub fn total_in(&self, side: Side, lo: usize, hi: usize) -> u64 {
        self.levels[lo..=hi].iter().map(|l| l.qty(side)).sum()
    }

    /// Capital reserved by resting buys: Σ buy_qty × price.
    pub fn pending_capital(&self) -> f64 {
        self.levels
            .iter()
            .map(|l| l.buy_qty as f64 * l.price)
            .sum()
    }

    /// Index of the lowest-priced level with a resting sell.
    pub fn lowest_sell_index(&self) -> Option<usize> {
        self.levels.iter().rposition(|l| l.sell_qty > 0)
    }

    /// Index of the highest-priced level with a resting buy.
    pub fn highest_buy_index(&self) -> Option<usize> {
        self.levels.iter().position(|l| l.buy_qty > 0)
    }

    /// Level whose price is closest to `price`. Ties go to the higher rung.
    pub fn nearest_index(&self, price: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, level) in self.levels.iter().enumerate() {
            let dist = (level.price - price).abs();
            match best {
                Some((_, d)) if d <= dist => {}
                _ => best = Some((i, dist)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// Indices of levels carrying both sides.
    pub fn crossed_levels(&self) -> Vec<usize> {
        self.levels
            .iter()
            .enumerate()
            .filter(|(_, l)| l.is_crossed())
            .map(|(i, _)| i)
            .collect()
    }
}

/// Level indices filled since the last full resolution.
///
/// Only grows until `reset`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradedRange {
    indices: BTreeSet<usize>,
}

impl TradedRange {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, indices: impl IntoIterator<Item = usize>) {
        self.indices.extend(indices);
    }

    pub fn reset(&mut self) {
        self.indices.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Lowest and highest index, if any.
    pub fn span(&self) -> Option<(usize, usize)> {
        let lo = *self.indices.first()?;
        let hi = *self.indices.last()?;
        Some((lo, hi))
    }

    pub fn indices(&self) -> Vec<usize> {
        self.indices.iter().copied().collect()
    }
}
