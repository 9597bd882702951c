use super::ladder::Side;
use serde::{Deserialize, Serialize};

/// A resting ladder order crossed by a bar, executed at its level price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub index: usize,
    pub price: f64,
    pub qty: u64,
    pub side: Side,
}

impl Fill {
    pub fn notional(&self) -> f64 {
        self.price * self.qty as f64
    }

    /// Cash effect: sells bring cash in, buys pay it out.
    pub fn cash_flow(&self) -> f64 {
        match self.side {
            Side::Sell => self.notional(),
            Side::Buy => -self.notional(),
        }
    }
}
