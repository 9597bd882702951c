//! Parameter sweep over the ladder step.
//!
//! Every step percentage is run against the same bars in parallel; results
//! come back sorted by step.

use ladderlab_core::{Bar, LadderConfig, NoopObserver};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::runner::{run_ladder, RunError};

/// Outcome of one sweep configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub step_pct: f64,
    pub level_count: usize,
    pub steps: usize,
    pub fills: usize,
    pub final_cash: f64,
    pub final_equity: f64,
    pub final_surplus: f64,
    pub data_gaps: usize,
}

/// Run `base` once per step percentage.
///
/// Fails on the first configuration the engine rejects.
pub fn sweep(
    base: &LadderConfig,
    step_pcts: &[f64],
    bars: &[Bar],
) -> Result<Vec<SweepPoint>, RunError> {
    let mut points = step_pcts
        .par_iter()
        .map(|&step_pct| -> Result<SweepPoint, RunError> {
            let config = LadderConfig {
                step_pct,
                ..base.clone()
            };
            let result = run_ladder(&config, bars, Box::new(NoopObserver))?;
            Ok(SweepPoint {
                step_pct,
                level_count: result.final_ladder.len(),
                steps: result.steps,
                fills: result.summary.sell_fills + result.summary.buy_fills,
                final_cash: result.final_ledger.cash,
                final_equity: result.final_ledger.equity,
                final_surplus: result.final_ledger.surplus,
                data_gaps: result.data_gaps.len(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    points.sort_by(|a, b| a.step_pct.total_cmp(&b.step_pct));
    tracing::info!(points = points.len(), bars = bars.len(), "sweep finished");
    Ok(points)
}
