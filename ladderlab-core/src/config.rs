//! Ladder configuration: the initial parameters of a run.

use crate::distribute::RemainderPolicy;
use crate::error::{require_positive, LadderError};
use crate::sequence::{SequenceKind, MAX_SEQUENCE_DEPTH};
use serde::{Deserialize, Serialize};

/// Initial configuration for a ladder run.
///
/// Percent fields are in percent units: `step_pct = 1.97` means 1.97 %.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderConfig {
    pub pivot_price: f64,
    pub step_pct: f64,
    pub max_deviation_pct: f64,
    pub total_funds: f64,
    pub lot_size: u64,
    #[serde(default = "default_tick_size")]
    pub tick_size: f64,
    #[serde(default = "default_sequence")]
    pub buy_sequence: SequenceKind,
    #[serde(default = "default_sequence")]
    pub sell_sequence: SequenceKind,
    /// Maximum number of levels any one side is spread across.
    #[serde(default = "default_sequence_depth")]
    pub sequence_depth: usize,
    #[serde(default)]
    pub remainder_policy: RemainderPolicy,
}

fn default_tick_size() -> f64 {
    0.01
}

fn default_sequence() -> SequenceKind {
    SequenceKind::Fibonacci
}

fn default_sequence_depth() -> usize {
    10
}

impl LadderConfig {
    /// Config with default tick, Fibonacci on both sides, depth 10.
    pub fn new(
        pivot_price: f64,
        step_pct: f64,
        max_deviation_pct: f64,
        total_funds: f64,
        lot_size: u64,
    ) -> Self {
        Self {
            pivot_price,
            step_pct,
            max_deviation_pct,
            total_funds,
            lot_size,
            tick_size: default_tick_size(),
            buy_sequence: default_sequence(),
            sell_sequence: default_sequence(),
            sequence_depth: default_sequence_depth(),
            remainder_policy: RemainderPolicy::default(),
        }
    }

    pub fn with_sequences(mut self, buy: SequenceKind, sell: SequenceKind) -> Self {
        self.buy_sequence = buy;
        self.sell_sequence = sell;
        self
    }

    pub fn with_sequence_depth(mut self, depth: usize) -> Self {
        self.sequence_depth = depth;
        self
    }

    pub fn with_remainder_policy(mut self, policy: RemainderPolicy) -> Self {
        self.remainder_policy = policy;
        self
    }

    /// Eager validation; every engine entry point calls this first.
    pub fn validate(&self) -> Result<(), LadderError> {
        require_positive("pivot_price", self.pivot_price)?;
        require_positive("step_pct", self.step_pct)?;
        require_positive("max_deviation_pct", self.max_deviation_pct)?;
        require_positive("total_funds", self.total_funds)?;
        require_positive("tick_size", self.tick_size)?;
        if self.lot_size == 0 {
            return Err(LadderError::invalid("lot_size", "must be at least 1"));
        }
        if self.step_pct >= 100.0 {
            return Err(LadderError::invalid("step_pct", "must be below 100"));
        }
        if self.max_deviation_pct >= 100.0 {
            return Err(LadderError::invalid("max_deviation_pct", "must be below 100"));
        }
        if self.sequence_depth == 0 || self.sequence_depth > MAX_SEQUENCE_DEPTH {
            return Err(LadderError::invalid(
                "sequence_depth",
                format!("must be in 1..={MAX_SEQUENCE_DEPTH}, got {}", self.sequence_depth),
            ));
        }
        if self.pivot_price < self.tick_size {
            return Err(LadderError::invalid(
                "pivot_price",
                format!("{} is below one tick ({})", self.pivot_price, self.tick_size),
            ));
        }
        Ok(())
    }
}
