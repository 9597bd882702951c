//! LadderLab CLI: inspect a ladder, run it over bars, sweep the step size.
//!
//! Commands:
//! - `levels`: print the seeded ladder for a config
//! - `run`: execute a run from a TOML config and save artifacts
//! - `sweep`: run one config at several step percentages
//!
//! Log verbosity follows `RUST_LOG` (default `info`); logs go to stderr.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use ladderlab_core::{seed_ladder, Ladder, Side, TracingObserver};
use ladderlab_runner::{
    load_bars_csv, load_configured_bars, run_from_config, run_ladder, save_artifacts, sweep,
    RunConfig, RunResult, SweepPoint,
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "ladderlab",
    about = "LadderLab CLI: ladder order redistribution and accounting"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the seeded ladder for a config.
    Levels {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Print as JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run the engine over the configured bars.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Bars CSV; overrides the config's data section.
        #[arg(long)]
        bars: Option<PathBuf>,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Run one config at several step percentages.
    Sweep {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Step percentages to try (e.g., 0.5 1.0 1.97).
        #[arg(long = "step-pct", required = true, num_args = 1..)]
        step_pcts: Vec<f64>,
    },
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Levels { config, json } => run_levels(config, json),
        Commands::Run {
            config,
            bars,
            output_dir,
        } => run_cmd(config, bars, output_dir),
        Commands::Sweep { config, step_pcts } => run_sweep(config, step_pcts),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

fn run_levels(config_path: PathBuf, json: bool) -> Result<()> {
    let config = RunConfig::from_file(&config_path)?;
    let ladder = seed_ladder(&config.ladder)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&ladder)?);
    } else {
        print_ladder(&ladder);
    }
    Ok(())
}

fn run_cmd(config_path: PathBuf, bars: Option<PathBuf>, output_dir: PathBuf) -> Result<()> {
    let config = RunConfig::from_file(&config_path)?;
    let result = match bars {
        Some(path) => {
            config.validate()?;
            let bars = load_bars_csv(&path)?;
            run_ladder(&config.ladder, &bars, Box::new(TracingObserver))?
        }
        None => run_from_config(&config, Box::new(TracingObserver))?,
    };

    print_summary(&result);

    let run_dir = save_artifacts(&result, &output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn run_sweep(config_path: PathBuf, step_pcts: Vec<f64>) -> Result<()> {
    if step_pcts.iter().any(|s| !s.is_finite()) {
        bail!("--step-pct values must be finite");
    }
    let config = RunConfig::from_file(&config_path)?;
    let bars = load_configured_bars(&config)?;
    let points = sweep(&config.ladder, &step_pcts, &bars)?;
    print_sweep(&points);
    Ok(())
}

fn print_ladder(ladder: &Ladder) {
    println!(
        "{:>5}  {:>10}  {:>10}  {:>10}",
        "index", "price", "buy", "sell"
    );
    for (i, level) in ladder.levels.iter().enumerate() {
        let marker = if level.price == ladder.pivot_price {
            " <- pivot"
        } else {
            ""
        };
        println!(
            "{:>5}  {:>10.2}  {:>10}  {:>10}{marker}",
            i, level.price, level.buy_qty, level.sell_qty
        );
    }
    println!();
    println!(
        "Levels: {}  Buy total: {}  Sell total: {}  Pending capital: {:.2}",
        ladder.len(),
        ladder.total(Side::Buy),
        ladder.total(Side::Sell),
        ladder.pending_capital()
    );
}

fn print_summary(result: &RunResult) {
    let s = &result.summary;
    let l = &result.final_ledger;
    println!();
    println!("=== Ladder Run ===");
    println!("Run id:         {}", result.run_id);
    println!("Dataset hash:   {}", result.dataset_hash);
    println!(
        "Bars:           {} ({} steps, {} gaps)",
        result.bar_count,
        result.steps,
        result.data_gaps.len()
    );
    println!();
    println!("--- Activity ---");
    println!("Sell fills:     {} ({} shares)", s.sell_fills, s.sold_qty);
    println!("Buy fills:      {} ({} shares)", s.buy_fills, s.bought_qty);
    println!("Notional:       {:.2}", s.traded_notional);
    println!(
        "Resolutions:    {} inside, {} above, {} below",
        s.inside_resolutions, s.gap_above_resolutions, s.gap_below_resolutions
    );
    println!();
    println!("--- Ledger ---");
    println!("Cash:           {:.2}", l.cash);
    println!("Market value:   {:.2}", l.market_value);
    println!("Equity:         {:.2}", l.equity);
    println!("Pending:        {:.2}", l.pending_capital);
    println!("Surplus:        {:.2}", l.surplus);
    println!("Equity change:  {:.2}", s.equity_change);
    for gap in &result.data_gaps {
        println!(
            "WARNING: bar {} at {} skipped ({} = {})",
            gap.bar_index, gap.timestamp, gap.field, gap.value
        );
    }
}

fn print_sweep(points: &[SweepPoint]) {
    println!(
        "{:>8}  {:>6}  {:>6}  {:>6}  {:>14}  {:>14}  {:>12}",
        "step_pct", "levels", "steps", "fills", "cash", "equity", "surplus"
    );
    for p in points {
        println!(
            "{:>8.2}  {:>6}  {:>6}  {:>6}  {:>14.2}  {:>14.2}  {:>12.2}",
            p.step_pct, p.level_count, p.steps, p.fills, p.final_cash, p.final_equity, p.final_surplus
        );
    }
}
