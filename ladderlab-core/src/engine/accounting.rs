use crate::domain::{Ladder, Side};
use serde::{Deserialize, Serialize};

/// Cash and inventory bookkeeping after a step.
///
/// Inventory is the resting sell quantity: every share on the ladder's sell
/// side is held stock waiting to be sold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ledger {
    pub cash: f64,
    /// Held inventory valued at `last_close`.
    pub market_value: f64,
    pub equity: f64,
    /// Cash committed to resting buys.
    pub pending_capital: f64,
    /// Cash left after every resting buy fills. Negative means over-committed.
    pub surplus: f64,
    /// Net fill cash flow of the step that produced this ledger.
    pub realized_flow: f64,
    pub last_close: f64,
}

impl Ledger {
    /// Opening ledger: the initial inventory is bought at the pivot.
    pub fn initial(total_funds: f64, ladder: &Ladder) -> Self {
        let inventory_cost = ladder.total(Side::Sell) as f64 * ladder.pivot_price;
        Self::update(total_funds - inventory_cost, 0.0, ladder, ladder.pivot_price)
    }

    /// Ledger after a step: cash moves only by `realized_flow`.
    pub fn update(prior_cash: f64, realized_flow: f64, ladder: &Ladder, last_close: f64) -> Self {
        let cash = prior_cash + realized_flow;
        let market_value = ladder.total(Side::Sell) as f64 * last_close;
        let pending_capital = ladder.pending_capital();
        Self {
            cash,
            market_value,
            equity: cash + market_value,
            pending_capital,
            surplus: cash - pending_capital,
            realized_flow,
            last_close,
        }
    }

    pub fn inventory_qty(&self) -> f64 {
        if self.last_close > 0.0 {
            self.market_value / self.last_close
        } else {
            0.0
        }
    }
}
