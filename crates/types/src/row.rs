//! Single OHLCV bar in row form.

use serde::{Deserialize, Serialize};

/// One OHLCV bar. Timestamps are Unix epoch nanoseconds.
///
/// The columnar [`SeriesFrame`](crate::SeriesFrame) is the primary shape for
/// computation; this row view exists for per-row consumers such as plugin
/// calculators.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcvRow {
    /// Unix epoch nanoseconds (UTC).
    pub timestamp_ns: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl OhlcvRow {
    #[must_use]
    pub fn new(timestamp_ns: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp_ns,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// True if every price and the volume is a finite number.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_roundtrip() {
        let row = OhlcvRow::new(1_700_000_000_000_000_000, 10.0, 11.5, 9.8, 11.0, 12345.0);
        let json = serde_json::to_string(&row).unwrap();
        let back: OhlcvRow = serde_json::from_str(&json).unwrap();
        assert_eq!(row, back);
    }

    #[test]
    fn test_is_finite() {
        let mut row = OhlcvRow::new(0, 1.0, 2.0, 0.5, 1.5, 100.0);
        assert!(row.is_finite());
        row.close = f64::NAN;
        assert!(!row.is_finite());
    }
}
