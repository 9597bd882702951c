//! Domain types for LadderLab

pub mod bar;
pub mod fill;
pub mod ladder;

pub use bar::Bar;
pub use fill::Fill;
pub use ladder::{Ladder, PriceLevel, Side, TradedRange};
