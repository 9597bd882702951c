//! Run orchestration: fold the engine over a bar sequence.
//!
//! Data gaps are recovered here: the bar is skipped, the previous state is
//! carried forward and the gap is recorded in the result. Every other engine
//! error aborts the run.

use chrono::NaiveDateTime;
use ladderlab_core::{
    Bar, Ladder, LadderConfig, LadderError, Ledger, RebalanceEngine, ResolutionScenario, Side,
    StepObserver, StepSnapshot,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{ConfigError, RunConfig};
use crate::data_loader::{dataset_hash, generate_synthetic_bars, load_bars_csv, LoadError};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] LadderError),
    #[error("failed to fingerprint run: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// A bar the engine skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataGapRecord {
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    pub field: String,
    /// Offending value as text (`NaN`, `inf`); JSON has no NaN.
    pub value: String,
}

/// Aggregates over the whole run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub sell_fills: usize,
    pub buy_fills: usize,
    pub sold_qty: u64,
    pub bought_qty: u64,
    pub traded_notional: f64,
    pub inside_resolutions: usize,
    pub gap_above_resolutions: usize,
    pub gap_below_resolutions: usize,
    pub equity_change: f64,
}

impl RunSummary {
    fn from_snapshots(snapshots: &[StepSnapshot], initial: &Ledger, last: &Ledger) -> Self {
        let mut summary = Self {
            equity_change: last.equity - initial.equity,
            ..Self::default()
        };
        for snap in snapshots {
            for fill in &snap.fills {
                summary.traded_notional += fill.notional();
                match fill.side {
                    Side::Sell => {
                        summary.sell_fills += 1;
                        summary.sold_qty += fill.qty;
                    }
                    Side::Buy => {
                        summary.buy_fills += 1;
                        summary.bought_qty += fill.qty;
                    }
                }
            }
            if snap.resolution.window.is_none() {
                continue;
            }
            match snap.resolution.scenario {
                ResolutionScenario::NextOpenInsideIdealRange => summary.inside_resolutions += 1,
                ResolutionScenario::NextOpenAboveIdealRange => summary.gap_above_resolutions += 1,
                ResolutionScenario::NextOpenBelowIdealRange => summary.gap_below_resolutions += 1,
            }
        }
        summary
    }
}

/// Complete result of a single run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    /// BLAKE3 over the ladder config and the dataset hash.
    pub run_id: String,
    pub config: LadderConfig,
    pub dataset_hash: String,
    pub bar_count: usize,
    pub steps: usize,
    pub initial_ladder: Ladder,
    pub initial_ledger: Ledger,
    pub final_ladder: Ladder,
    pub final_ledger: Ledger,
    pub snapshots: Vec<StepSnapshot>,
    pub data_gaps: Vec<DataGapRecord>,
    pub summary: RunSummary,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Run the engine over pre-loaded bars. No I/O.
pub fn run_ladder(
    config: &LadderConfig,
    bars: &[Bar],
    observer: Box<dyn StepObserver>,
) -> Result<RunResult, RunError> {
    let engine = RebalanceEngine::new(config.clone())?.with_observer(observer);
    let initial = engine.initial_state()?;
    let hash = dataset_hash(bars);

    let mut state = initial.clone();
    let mut snapshots = Vec::with_capacity(bars.len());
    let mut data_gaps = Vec::new();
    for (i, bar) in bars.iter().enumerate() {
        // Skipped bars never open; look ahead to the next one the engine accepts.
        let next_open = bars[i + 1..]
            .iter()
            .find(|next| next.first_gap().is_none())
            .map(|next| next.open);
        match engine.step(&state, bar, next_open) {
            Ok(out) => {
                snapshots.push(out.snapshot);
                state = out.state;
            }
            Err(LadderError::DataGap {
                timestamp,
                field,
                value,
            }) => data_gaps.push(DataGapRecord {
                bar_index: i,
                timestamp,
                field: field.to_string(),
                value: value.to_string(),
            }),
            Err(e) => return Err(e.into()),
        }
    }
    let state = engine.finish(&state);

    tracing::info!(
        bars = bars.len(),
        steps = state.steps,
        gaps = data_gaps.len(),
        equity = state.ledger.equity,
        "run finished"
    );

    let summary = RunSummary::from_snapshots(&snapshots, &initial.ledger, &state.ledger);
    Ok(RunResult {
        schema_version: SCHEMA_VERSION,
        run_id: run_fingerprint(config, &hash)?,
        config: config.clone(),
        dataset_hash: hash,
        bar_count: bars.len(),
        steps: state.steps,
        initial_ladder: initial.ladder,
        initial_ledger: initial.ledger,
        final_ladder: state.ladder,
        final_ledger: state.ledger,
        snapshots,
        data_gaps,
        summary,
    })
}

/// Resolve the configured bar source, then run.
pub fn run_from_config(
    config: &RunConfig,
    observer: Box<dyn StepObserver>,
) -> Result<RunResult, RunError> {
    config.validate()?;
    let bars = load_configured_bars(config)?;
    run_ladder(&config.ladder, &bars, observer)
}

/// Bars named by the `[data]` section; default synthetic bars when empty.
pub fn load_configured_bars(config: &RunConfig) -> Result<Vec<Bar>, LoadError> {
    if let Some(path) = &config.data.bars_csv {
        return load_bars_csv(path);
    }
    let synthetic = config.data.synthetic.clone().unwrap_or_default();
    let start = synthetic.start_price.unwrap_or(config.ladder.pivot_price);
    generate_synthetic_bars(start, synthetic.bars, synthetic.seed)
}

fn run_fingerprint(config: &LadderConfig, dataset_hash: &str) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(config)?;
    let mut hasher = blake3::Hasher::new();
    hasher.update(json.as_bytes());
    hasher.update(dataset_hash.as_bytes());
    Ok(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ladderlab_core::NoopObserver;

    fn config() -> LadderConfig {
        LadderConfig::new(36.50, 1.97, 10.0, 1_000_000.0, 100)
    }

    #[test]
    fn synthetic_run_completes() {
        let bars = generate_synthetic_bars(36.5, 240, 3).unwrap();
        let result = run_ladder(&config(), &bars, Box::new(NoopObserver)).unwrap();
        assert_eq!(result.schema_version, SCHEMA_VERSION);
        assert_eq!(result.steps, 240);
        assert_eq!(result.snapshots.len(), 240);
        assert!(result.data_gaps.is_empty());
        assert_eq!(result.run_id.len(), 64);
    }

    #[test]
    fn gaps_are_recorded_and_skipped() {
        let mut bars = generate_synthetic_bars(36.5, 20, 3).unwrap();
        bars[5].low = f64::NAN;
        bars[9].close = f64::INFINITY;
        let result = run_ladder(&config(), &bars, Box::new(NoopObserver)).unwrap();
        assert_eq!(result.steps, 18);
        assert_eq!(result.data_gaps.len(), 2);
        assert_eq!(result.data_gaps[0].bar_index, 5);
        assert_eq!(result.data_gaps[0].field, "low");
        assert_eq!(result.data_gaps[0].value, "NaN");
        assert_eq!(result.data_gaps[1].field, "close");
    }

    #[test]
    fn quantity_is_conserved_end_to_end() {
        let bars = generate_synthetic_bars(36.5, 300, 11).unwrap();
        let result = run_ladder(&config(), &bars, Box::new(NoopObserver)).unwrap();
        let total = |l: &Ladder| l.total(Side::Buy) + l.total(Side::Sell);
        assert_eq!(total(&result.initial_ladder), total(&result.final_ladder));
        assert_eq!(
            result.summary.sold_qty as i64 - result.summary.bought_qty as i64,
            result.initial_ladder.total(Side::Sell) as i64
                - result.final_ladder.total(Side::Sell) as i64
        );
    }

    #[test]
    fn invalid_config_is_an_engine_error() {
        let mut bad = config();
        bad.lot_size = 0;
        let bars = generate_synthetic_bars(36.5, 5, 1).unwrap();
        assert!(matches!(
            run_ladder(&bad, &bars, Box::new(NoopObserver)),
            Err(RunError::Engine(LadderError::InvalidParameter { .. }))
        ));
    }
}
