//! Engine error kinds.

use chrono::NaiveDateTime;
use thiserror::Error;

/// Errors raised by the ladder engine.
///
/// `DataGap` is the only recoverable kind: the caller skips the bar and keeps
/// the previous state. The other two abort the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LadderError {
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("bar at {timestamp} has a non-finite {field} ({value})")]
    DataGap {
        timestamp: NaiveDateTime,
        field: &'static str,
        value: f64,
    },

    #[error("conservation violated: requested {expected}, allocated {actual}")]
    ConservationViolation { expected: u64, actual: u64 },
}

impl LadderError {
    pub fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// True for errors the runner may skip past.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::DataGap { .. })
    }
}

/// Reject NaN, infinities, zero and negatives.
pub(crate) fn require_positive(name: &'static str, value: f64) -> Result<f64, LadderError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(LadderError::invalid(
            name,
            format!("must be positive and finite, got {value}"),
        ))
    }
}
