//! Execution: which resting ladder orders a bar fills.

pub mod fill_engine;

pub use fill_engine::{FillEngine, FillScenario, FillSet};
