//! LadderLab Runner: run orchestration around `ladderlab-core`.
//!
//! This crate builds on the engine to provide:
//! - TOML run configuration with content-hashed run ids
//! - Bar loading from CSV, or seeded synthetic bars
//! - A single-run driver that records data gaps and per-step snapshots
//! - JSON/CSV artifact export
//! - Parallel step-size sweeps

pub mod config;
pub mod data_loader;
pub mod export;
pub mod runner;
pub mod sweep;

pub use config::{ConfigError, DataConfig, RunConfig, RunId, SyntheticConfig};
pub use data_loader::{
    dataset_hash, generate_synthetic_bars, load_bars_csv, load_bars_reader, LoadError,
};
pub use export::{
    export_json, export_ledger_csv, export_levels_csv, export_steps_csv, import_json,
    load_artifacts, save_artifacts,
};
pub use runner::{
    load_configured_bars, run_from_config, run_ladder, DataGapRecord, RunError, RunResult,
    RunSummary, SCHEMA_VERSION,
};
pub use sweep::{sweep, SweepPoint};
