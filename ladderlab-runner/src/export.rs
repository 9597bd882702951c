//! Artifact export: JSON and CSV.
//!
//! - **JSON**: the full `RunResult`, versioned; unknown versions are rejected
//!   on load
//! - **CSV**: final ladder, per-step ledger and per-step level changes, for
//!   external analysis tools

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use ladderlab_core::{Ladder, StepSnapshot};

use crate::runner::{RunResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `RunResult` to pretty JSON.
pub fn export_json(result: &RunResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize RunResult to JSON")
}

/// Deserialize a `RunResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<RunResult> {
    let result: RunResult =
        serde_json::from_str(json).context("failed to deserialize RunResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// One row per level.
///
/// Columns: index, price, buy_qty, sell_qty
pub fn export_levels_csv(ladder: &Ladder) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["index", "price", "buy_qty", "sell_qty"])?;
    for (i, level) in ladder.levels.iter().enumerate() {
        wtr.write_record([
            &i.to_string(),
            &format!("{:.4}", level.price),
            &level.buy_qty.to_string(),
            &level.sell_qty.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Ledger after every step.
///
/// Columns: step, timestamp, close, cash, market_value, equity,
/// pending_capital, surplus, realized_flow
pub fn export_ledger_csv(snapshots: &[StepSnapshot]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "step",
        "timestamp",
        "close",
        "cash",
        "market_value",
        "equity",
        "pending_capital",
        "surplus",
        "realized_flow",
    ])?;
    for snap in snapshots {
        let l = &snap.ledger;
        wtr.write_record([
            &snap.step.to_string(),
            &snap.timestamp.to_string(),
            &format!("{:.4}", l.last_close),
            &format!("{:.2}", l.cash),
            &format!("{:.2}", l.market_value),
            &format!("{:.2}", l.equity),
            &format!("{:.2}", l.pending_capital),
            &format!("{:.2}", l.surplus),
            &format!("{:.2}", l.realized_flow),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Per-step, per-level quantities before and after the step.
///
/// Columns: step, timestamp, fill_scenario, resolution, index, price,
/// pre_buy, pre_sell, post_buy, post_sell
pub fn export_steps_csv(snapshots: &[StepSnapshot]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "step",
        "timestamp",
        "fill_scenario",
        "resolution",
        "index",
        "price",
        "pre_buy",
        "pre_sell",
        "post_buy",
        "post_sell",
    ])?;
    for snap in snapshots {
        let step = snap.step.to_string();
        let timestamp = snap.timestamp.to_string();
        let fill_scenario = format!("{:?}", snap.fill_scenario);
        for level in &snap.levels {
            wtr.write_record([
                &step,
                &timestamp,
                &fill_scenario,
                snap.resolution.scenario.name(),
                &level.index.to_string(),
                &format!("{:.4}", level.price),
                &level.pre_buy.to_string(),
                &level.pre_sell.to_string(),
                &level.post_buy.to_string(),
                &level.post_sell.to_string(),
            ])?;
        }
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a single run.
///
/// Creates `run_{first 12 chars of run_id}/` under `output_dir` containing:
/// - `result.json`: the full `RunResult`
/// - `levels.csv`: final ladder
/// - `ledger.csv`: ledger after every step
/// - `steps.csv`: per-level quantities before and after each step
///
/// Returns the path to the created directory.
pub fn save_artifacts(result: &RunResult, output_dir: &Path) -> Result<PathBuf> {
    let short_id: String = result.run_id.chars().take(12).collect();
    let run_dir = output_dir.join(format!("run_{short_id}"));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    let json = export_json(result)?;
    std::fs::write(run_dir.join("result.json"), &json)?;

    let levels_csv = export_levels_csv(&result.final_ladder)?;
    std::fs::write(run_dir.join("levels.csv"), &levels_csv)?;

    let ledger_csv = export_ledger_csv(&result.snapshots)?;
    std::fs::write(run_dir.join("ledger.csv"), &ledger_csv)?;

    let steps_csv = export_steps_csv(&result.snapshots)?;
    std::fs::write(run_dir.join("steps.csv"), &steps_csv)?;

    tracing::info!(dir = %run_dir.display(), "saved artifacts");
    Ok(run_dir)
}

/// Load a `RunResult` from an artifact directory's result.json.
pub fn load_artifacts(dir: &Path) -> Result<RunResult> {
    let path = dir.join("result.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_json(&json)
}
