//! LadderLab Core: ladder order-redistribution and accounting engine.
//!
//! This crate contains the engine itself:
//! - Domain types (bars, price levels, ladders, fills, traded ranges)
//! - Weighting sequences and the lot-rounded order distributor
//! - Price ladder generation and initial seeding
//! - Fill detection (opening and intraday rules)
//! - The rebalance state machine and its ledger

pub mod config;
pub mod distribute;
pub mod domain;
pub mod engine;
pub mod error;
pub mod execution;
pub mod price_ladder;
pub mod sequence;

pub use config::LadderConfig;
pub use distribute::{verify_conservation, OrderDistributor, RemainderPolicy, SequenceOrder};
pub use domain::{Bar, Fill, Ladder, PriceLevel, Side, TradedRange};
pub use engine::{
    EngineStatus, LadderState, Ledger, NoopObserver, RebalanceEngine, ResolutionScenario,
    StepObserver, StepOutput, StepSnapshot, TracingObserver,
};
pub use error::LadderError;
pub use execution::{FillEngine, FillScenario, FillSet};
pub use price_ladder::{generate_levels, seed_ladder};
pub use sequence::{SequenceKind, MAX_SEQUENCE_DEPTH};
