//! Rebalancing engine: a bar-by-bar fold over an explicit [`LadderState`].
//!
//! Per bar:
//!
//! 1. Fill detection (see [`crate::execution`])
//! 2. Conversion of filled quantity to the opposite side ([`remap`])
//! 3. Ideal-open-range resolution and redistribution
//! 4. Ledger update ([`Ledger`])

pub mod accounting;
pub mod observer;
pub mod rebalance;
pub mod remap;
pub mod scenario;
pub mod snapshot;
pub mod state;

pub use accounting::Ledger;
pub use observer::{NoopObserver, StepObserver, TracingObserver};
pub use rebalance::RebalanceEngine;
pub use remap::remap;
pub use scenario::{IdealOpenRange, ResolutionScenario};
pub use snapshot::{LevelSnapshot, Resolution, StepOutput, StepSnapshot};
pub use state::{EngineStatus, LadderState};
