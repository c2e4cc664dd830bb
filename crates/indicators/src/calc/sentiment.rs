//! Sentiment and swing calculators: BRAR, ASI, EMV.

use kline_types::SeriesFrame;

use crate::kernels::{rolling_mean, rolling_sum};
use crate::params::Params;

use super::{checked_windows, positive, require, CalcResult};

/// BRAR popularity/willingness: `ar{w}` from open-relative strength, `br{w}`
/// from prior-close-relative strength. Denominators carry a small epsilon so
/// one-sided windows stay finite.
pub fn brar(frame: &SeriesFrame, params: &Params) -> CalcResult {
    let cols = require(frame, &["open", "high", "low", "close"])?;
    let (open, high, low, close) = (cols[0], cols[1], cols[2], cols[3]);
    let windows = checked_windows(params, &[26])?;
    let n = frame.len();

    let ho: Vec<f64> = (0..n).map(|i| high[i] - open[i]).collect();
    let ol: Vec<f64> = (0..n).map(|i| open[i] - low[i]).collect();
    // row 0 has no prior close and contributes zero to both sums
    let hc: Vec<f64> = (0..n)
        .map(|i| {
            if i == 0 {
                0.0
            } else {
                (high[i] - close[i - 1]).max(0.0)
            }
        })
        .collect();
    let cl: Vec<f64> = (0..n)
        .map(|i| {
            if i == 0 {
                0.0
            } else {
                (close[i - 1] - low[i]).max(0.0)
            }
        })
        .collect();

    let mut out = Vec::with_capacity(windows.len() * 2 + 2);
    for (idx, &w) in windows.iter().enumerate() {
        let w_usize = w as usize;
        let ar: Vec<f64> = rolling_sum(&ho, w_usize)
            .iter()
            .zip(&rolling_sum(&ol, w_usize))
            .map(|(num, den)| num / (den + 0.0001) * 100.0)
            .collect();
        let br: Vec<f64> = rolling_sum(&hc, w_usize)
            .iter()
            .zip(&rolling_sum(&cl, w_usize))
            .map(|(num, den)| num / (den + 0.0001) * 100.0)
            .collect();
        if idx == 0 {
            out.push(("ar".to_string(), ar.clone()));
            out.push(("br".to_string(), br.clone()));
        }
        out.push((format!("ar{w}"), ar));
        out.push((format!("br{w}"), br));
    }
    Ok(out)
}

/// Swing index: per-row price swing scaled by the bar's true range, zero
/// when the range is zero or no prior bar exists, with a moving-average
/// signal line.
pub fn asi(frame: &SeriesFrame, params: &Params) -> CalcResult {
    let cols = require(frame, &["open", "high", "low", "close"])?;
    let (open, high, low, close) = (cols[0], cols[1], cols[2], cols[3]);
    let signal = positive(params, "signal_period", 20)?;
    let n = frame.len();

    let mut values = Vec::with_capacity(n);
    for i in 0..n {
        if i == 0 {
            values.push(0.0);
            continue;
        }
        let tr = (high[i - 1] - close[i])
            .abs()
            .max((low[i - 1] - close[i]).abs())
            .max((high[i - 1] - low[i - 1]).abs());
        if tr == 0.0 {
            values.push(0.0);
            continue;
        }
        let swing = (open[i] - close[i - 1])
            + 0.5 * (open[i] - close[i])
            + 0.25 * (close[i - 1] - open[i - 1]);
        values.push(swing / tr * 16.0);
    }

    let sig = rolling_mean(&values, signal);
    Ok(vec![("asi".to_string(), values), ("asi_sig".to_string(), sig)])
}

/// Ease of movement: midpoint move divided by the volume-scaled box ratio,
/// smoothed over each window. A zero-height bar contributes 0, as does row 0
/// which has no prior midpoint.
pub fn emv(frame: &SeriesFrame, params: &Params) -> CalcResult {
    let cols = require(frame, &["high", "low", "volume"])?;
    let (high, low, volume) = (cols[0], cols[1], cols[2]);
    let windows = checked_windows(params, &[14])?;
    let constant = params.float_or("constant", 1e8);
    let n = frame.len();

    let raw: Vec<f64> = (0..n)
        .map(|i| {
            if i == 0 {
                return 0.0;
            }
            let height = high[i] - low[i];
            if height == 0.0 {
                return 0.0;
            }
            let mid_move = (high[i] + low[i]) / 2.0 - (high[i - 1] + low[i - 1]) / 2.0;
            let box_ratio = (volume[i] / constant) / height;
            if box_ratio == 0.0 {
                0.0
            } else {
                mid_move / box_ratio
            }
        })
        .collect();

    let mut out = Vec::with_capacity(windows.len() + 1);
    for (idx, &w) in windows.iter().enumerate() {
        let values = rolling_mean(&raw, w as usize);
        if idx == 0 {
            out.push(("emv".to_string(), values.clone()));
        }
        out.push((format!("emv{w}"), values));
    }
    Ok(out)
}
