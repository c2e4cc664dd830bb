//! Built-in indicator calculators.
//!
//! Every calculator is a pure function `(frame, params) -> new columns`. The
//! caller folds the returned columns into the frame, which makes failure
//! atomic for free. Calculators never mutate their input.

use kline_types::{SeriesFrame, CORE_COLUMNS};

use crate::error::IndicatorError;
use crate::params::Params;

pub mod oscillator;
pub mod sentiment;
pub mod trend;
pub mod volume;

/// Named output columns of one calculator run.
pub type ColumnSet = Vec<(String, Vec<f64>)>;

/// Calculator signature shared by built-ins and custom registrations.
pub type CalcResult = Result<ColumnSet, IndicatorError>;

/// Borrows the named columns or fails with every missing name at once.
pub(crate) fn require<'a>(
    frame: &'a SeriesFrame,
    names: &[&str],
) -> Result<Vec<&'a [f64]>, IndicatorError> {
    let missing: Vec<String> = names
        .iter()
        .filter(|name| !frame.has_column(name))
        .map(|name| (*name).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(IndicatorError::MissingColumn { columns: missing });
    }
    Ok(names
        .iter()
        .filter_map(|name| frame.column(name))
        .collect())
}

/// Validates a window list: present, non-empty, every entry positive.
pub(crate) fn checked_windows(params: &Params, default: &[i64]) -> Result<Vec<i64>, IndicatorError> {
    let windows = params.windows_or(default);
    if windows.is_empty() {
        return Err(IndicatorError::invalid_params("empty window list"));
    }
    if let Some(bad) = windows.iter().find(|w| **w <= 0) {
        return Err(IndicatorError::invalid_params(format!(
            "window must be positive, got {bad}"
        )));
    }
    Ok(windows)
}

/// Validates a positive scalar period parameter.
pub(crate) fn positive(params: &Params, key: &str, default: i64) -> Result<usize, IndicatorError> {
    let v = params.int_or(key, default);
    if v <= 0 {
        return Err(IndicatorError::invalid_params(format!(
            "{key} must be positive, got {v}"
        )));
    }
    Ok(v as usize)
}

/// Verifies the core OHLCV columns exist and replaces non-finite values in
/// them with 0.0, matching the cleaning the charting layer expects before any
/// indicator runs.
pub fn preprocess(frame: &mut SeriesFrame) -> Result<(), IndicatorError> {
    let missing: Vec<String> = CORE_COLUMNS
        .iter()
        .filter(|name| !frame.has_column(name))
        .map(|name| (*name).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(IndicatorError::MissingColumn { columns: missing });
    }
    for name in CORE_COLUMNS {
        if let Some(values) = frame.column(name) {
            if values.iter().all(|v| v.is_finite()) {
                continue;
            }
            let cleaned: Vec<f64> = values
                .iter()
                .map(|v| if v.is_finite() { *v } else { 0.0 })
                .collect();
            frame.insert_column(name, cleaned)?;
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod testutil {
    use kline_types::{OhlcvRow, SeriesFrame};

    /// Frame with the given closes; open/high/low bracket the close and
    /// volume is constant.
    pub fn frame_from_closes(closes: &[f64]) -> SeriesFrame {
        let rows: Vec<OhlcvRow> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                OhlcvRow::new(i as i64 * 86_400_000_000_000, c - 0.5, c + 1.0, c - 1.0, c, 1000.0)
            })
            .collect();
        SeriesFrame::from_ohlcv(&rows).unwrap()
    }

    pub fn frame_from_rows(rows: &[(f64, f64, f64, f64, f64)]) -> SeriesFrame {
        let rows: Vec<OhlcvRow> = rows
            .iter()
            .enumerate()
            .map(|(i, &(o, h, l, c, v))| OhlcvRow::new(i as i64 * 86_400_000_000_000, o, h, l, c, v))
            .collect();
        SeriesFrame::from_ohlcv(&rows).unwrap()
    }
}
