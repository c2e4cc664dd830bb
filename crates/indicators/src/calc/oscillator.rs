//! Oscillator calculators: RSI, KDJ, WR, CCI, ROC, MTM.

use kline_types::SeriesFrame;

use crate::kernels::{diff, ema_alpha, rolling_max, rolling_mean, rolling_min, shift};
use crate::params::Params;

use super::{checked_windows, require, CalcResult};

/// Relative strength index via rolling-mean gains and losses. When the
/// average loss in a window is zero the index is pinned at 100. Row 0 has no
/// delta and counts as zero gain and zero loss, so it starts pinned too.
pub fn rsi(frame: &SeriesFrame, params: &Params) -> CalcResult {
    let close = require(frame, &["close"])?[0];
    let windows = checked_windows(params, &[14])?;

    let delta = diff(close);
    let gains: Vec<f64> = delta.iter().map(|d| d.max(0.0)).collect();
    let losses: Vec<f64> = delta.iter().map(|d| (-d).max(0.0)).collect();

    Ok(windows
        .iter()
        .map(|&w| {
            let avg_gain = rolling_mean(&gains, w as usize);
            let avg_loss = rolling_mean(&losses, w as usize);
            let values: Vec<f64> = avg_gain
                .iter()
                .zip(&avg_loss)
                .map(|(g, l)| {
                    if *l == 0.0 {
                        100.0
                    } else {
                        100.0 - 100.0 / (1.0 + g / l)
                    }
                })
                .collect();
            (format!("rsi{w}"), values)
        })
        .collect())
}

/// Stochastic KDJ. RSV is forced to 0 when the window is flat; K and D are
/// EMAs of RSV and K with `alpha = 1/3`; J = 3K - 2D. The conventional
/// 14-period run also emits `k`/`d`/`j` aliases.
pub fn kdj(frame: &SeriesFrame, params: &Params) -> CalcResult {
    let cols = require(frame, &["high", "low", "close"])?;
    let (high, low, close) = (cols[0], cols[1], cols[2]);
    let windows = checked_windows(params, &[14])?;

    let mut out = Vec::with_capacity(windows.len() * 3 + 3);
    for &w in &windows {
        let low_n = rolling_min(low, w as usize);
        let high_n = rolling_max(high, w as usize);
        let rsv: Vec<f64> = (0..frame.len())
            .map(|i| {
                let span = high_n[i] - low_n[i];
                if span == 0.0 {
                    0.0
                } else {
                    (close[i] - low_n[i]) / span * 100.0
                }
            })
            .collect();
        let k = ema_alpha(&rsv, 1.0 / 3.0);
        let d = ema_alpha(&k, 1.0 / 3.0);
        let j: Vec<f64> = k.iter().zip(&d).map(|(k, d)| 3.0 * k - 2.0 * d).collect();

        if w == 14 {
            out.push(("k".to_string(), k.clone()));
            out.push(("d".to_string(), d.clone()));
            out.push(("j".to_string(), j.clone()));
        }
        out.push((format!("k{w}"), k));
        out.push((format!("d{w}"), d));
        out.push((format!("j{w}"), j));
    }
    Ok(out)
}

/// Williams %R for each window. The first window also emits `wr`/`wr1`, the
/// second `wr2`.
pub fn wr(frame: &SeriesFrame, params: &Params) -> CalcResult {
    let cols = require(frame, &["high", "low", "close"])?;
    let (high, low, close) = (cols[0], cols[1], cols[2]);
    let windows = checked_windows(params, &[10, 6])?;

    let mut out = Vec::with_capacity(windows.len() + 3);
    for (idx, &w) in windows.iter().enumerate() {
        let low_n = rolling_min(low, w as usize);
        let high_n = rolling_max(high, w as usize);
        let values: Vec<f64> = (0..frame.len())
            .map(|i| {
                let span = high_n[i] - low_n[i];
                if span == 0.0 {
                    0.0
                } else {
                    (high_n[i] - close[i]) / span * 100.0
                }
            })
            .collect();
        if idx == 0 {
            out.push(("wr".to_string(), values.clone()));
            out.push(("wr1".to_string(), values.clone()));
        } else if idx == 1 {
            out.push(("wr2".to_string(), values.clone()));
        }
        out.push((format!("wr{w}"), values));
    }
    Ok(out)
}

/// Commodity channel index: typical price against its rolling mean, scaled
/// by 0.015 times the window's mean absolute deviation.
pub fn cci(frame: &SeriesFrame, params: &Params) -> CalcResult {
    let cols = require(frame, &["high", "low", "close"])?;
    let (high, low, close) = (cols[0], cols[1], cols[2]);
    let windows = checked_windows(params, &[14])?;

    let tp: Vec<f64> = (0..frame.len())
        .map(|i| (high[i] + low[i] + close[i]) / 3.0)
        .collect();

    let mut out = Vec::with_capacity(windows.len() + 1);
    for (idx, &w) in windows.iter().enumerate() {
        let w_usize = w as usize;
        let tp_mean = rolling_mean(&tp, w_usize);
        let values: Vec<f64> = (0..tp.len())
            .map(|i| {
                let start = (i + 1).saturating_sub(w_usize);
                let window = &tp[start..=i];
                let mad =
                    window.iter().map(|v| (v - tp_mean[i]).abs()).sum::<f64>() / window.len() as f64;
                if mad == 0.0 {
                    0.0
                } else {
                    (tp[i] - tp_mean[i]) / (0.015 * mad)
                }
            })
            .collect();
        if idx == 0 {
            out.push(("cci".to_string(), values.clone()));
        }
        out.push((format!("cci{w}"), values));
    }
    Ok(out)
}

/// Rate of change, percent versus the close `w` rows back. NaN until a prior
/// close exists; zero when the prior close is zero.
pub fn roc(frame: &SeriesFrame, params: &Params) -> CalcResult {
    let close = require(frame, &["close"])?[0];
    let windows = checked_windows(params, &[12])?;

    let mut out = Vec::with_capacity(windows.len() + 1);
    for (idx, &w) in windows.iter().enumerate() {
        let back = shift(close, w as usize);
        let values: Vec<f64> = close
            .iter()
            .zip(&back)
            .map(|(c, b)| {
                if !b.is_finite() {
                    f64::NAN
                } else if *b == 0.0 {
                    0.0
                } else {
                    (c - b) / b * 100.0
                }
            })
            .collect();
        if idx == 0 {
            out.push(("roc".to_string(), values.clone()));
        }
        out.push((format!("roc{w}"), values));
    }
    Ok(out)
}

/// Momentum: close minus the close `w` rows back.
pub fn mtm(frame: &SeriesFrame, params: &Params) -> CalcResult {
    let close = require(frame, &["close"])?[0];
    let windows = checked_windows(params, &[12])?;

    let mut out = Vec::with_capacity(windows.len() + 1);
    for (idx, &w) in windows.iter().enumerate() {
        let back = shift(close, w as usize);
        let values: Vec<f64> = close.iter().zip(&back).map(|(c, b)| c - b).collect();
        if idx == 0 {
            out.push(("mtm".to_string(), values.clone()));
        }
        out.push((format!("mtm{w}"), values));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::testutil::{frame_from_closes, frame_from_rows};

    #[test]
    fn test_rsi_pinned_at_100_on_monotonic_rise() {
        let closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        let frame = frame_from_closes(&closes);
        let out = rsi(&frame, &Params::new()).unwrap();
        // row 0's missing delta counts as no loss, so the whole series pins
        for &v in &out[0].1 {
            assert_eq!(v, 100.0);
        }
    }

    #[test]
    fn test_kdj_flat_window_rsv_zero() {
        // all rows identical, so every window is flat and RSV stays 0
        let frame = frame_from_rows(&[(10.0, 10.0, 10.0, 10.0, 100.0); 10]);
        let out = kdj(&frame, &Params::new()).unwrap();
        let k = out.iter().find(|(n, _)| n == "k14").map(|(_, v)| v).unwrap();
        for &v in k {
            assert_eq!(v, 0.0);
        }
    }

    #[test]
    fn test_kdj_aliases_only_for_default_window() {
        let frame = frame_from_closes(&[10.0, 11.0, 12.0]);
        let out = kdj(&frame, &Params::new().with("windows", vec![9])).unwrap();
        let names: Vec<&str> = out.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["k9", "d9", "j9"]);
    }

    #[test]
    fn test_wr_bounds() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 + (i % 4) as f64).collect();
        let frame = frame_from_closes(&closes);
        let out = wr(&frame, &Params::new()).unwrap();
        for (_, values) in &out {
            for &v in values {
                assert!((0.0..=100.0).contains(&v));
            }
        }
    }

    #[test]
    fn test_roc_and_mtm_leading_nan() {
        let frame = frame_from_closes(&[100.0, 110.0, 121.0]);
        let params = Params::new().with("windows", vec![1]);
        let roc_out = roc(&frame, &params).unwrap();
        assert!(roc_out[0].1[0].is_nan());
        assert!((roc_out[0].1[1] - 10.0).abs() < 1e-9);

        let mtm_out = mtm(&frame, &params).unwrap();
        assert!(mtm_out[0].1[0].is_nan());
        assert!((mtm_out[0].1[2] - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_cci_flat_is_zero() {
        let frame = frame_from_rows(&[(10.0, 10.0, 10.0, 10.0, 100.0); 8]);
        let out = cci(&frame, &Params::new()).unwrap();
        for &v in &out[0].1 {
            assert_eq!(v, 0.0);
        }
    }
}
