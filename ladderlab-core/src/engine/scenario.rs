//! Ideal open range and the resolution branch it selects.

use crate::domain::Ladder;
use serde::{Deserialize, Serialize};

/// How the next open sits against the resting book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionScenario {
    NextOpenInsideIdealRange,
    NextOpenAboveIdealRange,
    NextOpenBelowIdealRange,
}

impl ResolutionScenario {
    pub fn is_gap(self) -> bool {
        !matches!(self, ResolutionScenario::NextOpenInsideIdealRange)
    }

    pub fn name(self) -> &'static str {
        match self {
            ResolutionScenario::NextOpenInsideIdealRange => "inside",
            ResolutionScenario::NextOpenAboveIdealRange => "above",
            ResolutionScenario::NextOpenBelowIdealRange => "below",
        }
    }
}

/// Price band between the best resting buy and the best resting sell.
///
/// A side with no resting orders leaves its bound open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IdealOpenRange {
    pub lower: Option<f64>,
    pub upper: Option<f64>,
    /// Ladder index of the level that sets `lower`.
    pub lower_index: Option<usize>,
    /// Ladder index of the level that sets `upper`.
    pub upper_index: Option<usize>,
}

impl IdealOpenRange {
    pub fn from_ladder(ladder: &Ladder) -> Self {
        let buy = ladder
            .highest_buy_index()
            .map(|i| (i, ladder.levels[i].price));
        let sell = ladder
            .lowest_sell_index()
            .map(|i| (i, ladder.levels[i].price));

        // A crossed book (best buy above best sell) is read as min/max.
        let (low, high) = match (buy, sell) {
            (Some(b), Some(s)) if b.1 > s.1 => (Some(s), Some(b)),
            other => other,
        };
        Self {
            lower: low.map(|(_, p)| p),
            upper: high.map(|(_, p)| p),
            lower_index: low.map(|(i, _)| i),
            upper_index: high.map(|(i, _)| i),
        }
    }

    /// Bounds are inclusive: an anchor on either edge is inside.
    pub fn classify(&self, anchor: f64) -> ResolutionScenario {
        if self.upper.is_some_and(|u| anchor > u) {
            ResolutionScenario::NextOpenAboveIdealRange
        } else if self.lower.is_some_and(|l| anchor < l) {
            ResolutionScenario::NextOpenBelowIdealRange
        } else {
            ResolutionScenario::NextOpenInsideIdealRange
        }
    }

    /// Boundary level on the side the anchor gapped through.
    pub fn boundary_index(&self, scenario: ResolutionScenario) -> Option<usize> {
        match scenario {
            ResolutionScenario::NextOpenAboveIdealRange => self.upper_index,
            ResolutionScenario::NextOpenBelowIdealRange => self.lower_index,
            ResolutionScenario::NextOpenInsideIdealRange => None,
        }
    }
}
