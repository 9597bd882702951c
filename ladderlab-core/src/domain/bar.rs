//! Bar: one OHLC print handed to the engine by the data collaborator.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// OHLC bar. Missing values are carried as NaN and rejected at step time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    pub fn new(timestamp: NaiveDateTime, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
        }
    }

    /// First OHLC field that is NaN or infinite, in open/high/low/close order.
    pub fn first_gap(&self) -> Option<(&'static str, f64)> {
        [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
        ]
        .into_iter()
        .find(|(_, v)| !v.is_finite())
    }

    /// Returns true if any OHLC field is missing.
    pub fn is_void(&self) -> bool {
        self.first_gap().is_some()
    }

    /// Basic OHLC sanity check: high >= low, high >= open/close, low <= open/close.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.low > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_bar() -> Bar {
        Bar::new(
            NaiveDate::from_ymd_opt(2024, 12, 2)
                .unwrap()
                .and_hms_opt(9, 45, 0)
                .unwrap(),
            36.50,
            36.92,
            36.31,
            36.77,
        )
    }

    #[test]
    fn bar_is_sane() {
        assert!(sample_bar().is_sane());
        assert!(sample_bar().first_gap().is_none());
    }

    #[test]
    fn bar_reports_first_missing_field() {
        let mut bar = sample_bar();
        bar.low = f64::NAN;
        bar.close = f64::INFINITY;
        let (field, value) = bar.first_gap().unwrap();
        assert_eq!(field, "low");
        assert!(value.is_nan());
        assert!(bar.is_void());
        assert!(!bar.is_sane());
    }

    #[test]
    fn bar_detects_insane_high_low() {
        let mut bar = sample_bar();
        bar.high = 36.0;
        assert!(!bar.is_sane());
    }
}
