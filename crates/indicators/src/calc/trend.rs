//! Trend-following calculators: MA, MACD, BOLL, DMI, TRIX.

use kline_types::SeriesFrame;

use crate::kernels::{ema, rolling_mean, rolling_std, rolling_sum, shift};
use crate::params::Params;

use super::{checked_windows, positive, require, CalcResult};

/// Simple moving averages of `close`, one `ma{w}` column per window.
pub fn ma(frame: &SeriesFrame, params: &Params) -> CalcResult {
    let close = require(frame, &["close"])?[0];
    let windows = checked_windows(params, &[5, 10, 20, 60])?;
    Ok(windows
        .iter()
        .map(|&w| (format!("ma{w}"), rolling_mean(close, w as usize)))
        .collect())
}

/// MACD with unadjusted EMAs: `macd`, `macd_signal`, `macd_hist`.
pub fn macd(frame: &SeriesFrame, params: &Params) -> CalcResult {
    let close = require(frame, &["close"])?[0];
    let fast = positive(params, "fast", 12)?;
    let slow = positive(params, "slow", 26)?;
    let signal = positive(params, "signal", 9)?;

    let fast_ema = ema(close, fast);
    let slow_ema = ema(close, slow);
    let line: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema(&line, signal);
    let hist: Vec<f64> = line
        .iter()
        .zip(&signal_line)
        .map(|(m, s)| m - s)
        .collect();

    Ok(vec![
        ("macd".to_string(), line),
        ("macd_signal".to_string(), signal_line),
        ("macd_hist".to_string(), hist),
    ])
}

/// Bollinger bands: `mb{w}`, `up{w}`, `dn{w}` plus `mb`/`up`/`dn` aliases for
/// the first window. Band width uses sample standard deviation.
pub fn boll(frame: &SeriesFrame, params: &Params) -> CalcResult {
    let close = require(frame, &["close"])?[0];
    let windows = checked_windows(params, &[20])?;
    let k = params.float_or("std_dev", 2.0);

    let mut out = Vec::with_capacity(windows.len() * 3 + 3);
    for (i, &w) in windows.iter().enumerate() {
        let mb = rolling_mean(close, w as usize);
        let sd = rolling_std(close, w as usize);
        let up: Vec<f64> = mb.iter().zip(&sd).map(|(m, s)| m + k * s).collect();
        let dn: Vec<f64> = mb.iter().zip(&sd).map(|(m, s)| m - k * s).collect();
        if i == 0 {
            out.push(("mb".to_string(), mb.clone()));
            out.push(("up".to_string(), up.clone()));
            out.push(("dn".to_string(), dn.clone()));
        }
        out.push((format!("mb{w}"), mb));
        out.push((format!("up{w}"), up));
        out.push((format!("dn{w}"), dn));
    }
    Ok(out)
}

/// Directional movement: `pdi_{w}`, `ndi_{w}`, `adx_{w}`, `adxr_{w}` plus
/// unnumbered aliases for the first window.
pub fn dmi(frame: &SeriesFrame, params: &Params) -> CalcResult {
    let cols = require(frame, &["high", "low", "close"])?;
    let (high, low, close) = (cols[0], cols[1], cols[2]);
    let windows = checked_windows(params, &[14])?;
    let n = frame.len();

    let mut tr = Vec::with_capacity(n);
    let mut pdm = Vec::with_capacity(n);
    let mut ndm = Vec::with_capacity(n);
    for i in 0..n {
        if i == 0 {
            tr.push(high[0] - low[0]);
            pdm.push(0.0);
            ndm.push(0.0);
            continue;
        }
        let range = (high[i] - low[i])
            .max((high[i] - close[i - 1]).abs())
            .max((low[i] - close[i - 1]).abs());
        tr.push(range);
        let up = high[i] - high[i - 1];
        let down = low[i - 1] - low[i];
        pdm.push(if up > down && up > 0.0 { up } else { 0.0 });
        ndm.push(if down > up && down > 0.0 { down } else { 0.0 });
    }

    let mut out = Vec::with_capacity(windows.len() * 4 + 4);
    for (idx, &w) in windows.iter().enumerate() {
        let w_usize = w as usize;
        let tr_n = rolling_sum(&tr, w_usize);
        let pdm_n = rolling_sum(&pdm, w_usize);
        let ndm_n = rolling_sum(&ndm, w_usize);

        let pdi: Vec<f64> = pdm_n
            .iter()
            .zip(&tr_n)
            .map(|(p, t)| if *t == 0.0 { 0.0 } else { p / t * 100.0 })
            .collect();
        let ndi: Vec<f64> = ndm_n
            .iter()
            .zip(&tr_n)
            .map(|(d, t)| if *t == 0.0 { 0.0 } else { d / t * 100.0 })
            .collect();
        let dx: Vec<f64> = pdi
            .iter()
            .zip(&ndi)
            .map(|(p, d)| {
                let sum = p + d;
                if sum == 0.0 {
                    0.0
                } else {
                    (p - d).abs() / sum * 100.0
                }
            })
            .collect();
        let adx = rolling_mean(&dx, w_usize);
        let adx_back = shift(&adx, w_usize);
        let adxr: Vec<f64> = adx
            .iter()
            .zip(&adx_back)
            .map(|(a, b)| (a + b) / 2.0)
            .collect();

        if idx == 0 {
            out.push(("pdi".to_string(), pdi.clone()));
            out.push(("ndi".to_string(), ndi.clone()));
            out.push(("adx".to_string(), adx.clone()));
            out.push(("adxr".to_string(), adxr.clone()));
        }
        out.push((format!("pdi_{w}"), pdi));
        out.push((format!("ndi_{w}"), ndi));
        out.push((format!("adx_{w}"), adx));
        out.push((format!("adxr_{w}"), adxr));
    }
    Ok(out)
}

/// Triple-EMA rate of change: `trix{w}` with an EMA signal line `trma{w}`,
/// plus aliases for the first window.
pub fn trix(frame: &SeriesFrame, params: &Params) -> CalcResult {
    let close = require(frame, &["close"])?[0];
    let windows = checked_windows(params, &[12])?;
    let signal = positive(params, "signal_period", 9)?;

    let mut out = Vec::with_capacity(windows.len() * 2 + 2);
    for (i, &w) in windows.iter().enumerate() {
        let triple = ema(&ema(&ema(close, w as usize), w as usize), w as usize);
        let mut line = Vec::with_capacity(triple.len());
        line.push(f64::NAN);
        for pair in triple.windows(2) {
            if pair[0] == 0.0 || !pair[0].is_finite() {
                line.push(0.0);
            } else {
                line.push((pair[1] - pair[0]) / pair[0] * 100.0);
            }
        }
        let trma = ema(&line, signal);
        if i == 0 {
            out.push(("trix".to_string(), line.clone()));
            out.push(("trma".to_string(), trma.clone()));
        }
        out.push((format!("trix{w}"), line));
        out.push((format!("trma{w}"), trma));
    }
    Ok(out)
}
