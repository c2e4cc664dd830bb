//! Volume-driven calculators: VOL_MA, OBV, VR, PSY, MCST.

use kline_types::SeriesFrame;

use crate::kernels::{rolling_mean, rolling_sum};
use crate::params::Params;

use super::{checked_windows, require, CalcResult};

/// Moving averages of `volume`, one `vol_ma{w}` column per window.
pub fn vol_ma(frame: &SeriesFrame, params: &Params) -> CalcResult {
    let volume = require(frame, &["volume"])?[0];
    let windows = checked_windows(params, &[5, 10])?;
    Ok(windows
        .iter()
        .map(|&w| (format!("vol_ma{w}"), rolling_mean(volume, w as usize)))
        .collect())
}

/// On-balance volume. Starts at 0; volume is added on up-closes and
/// subtracted on down-closes.
pub fn obv(frame: &SeriesFrame, _params: &Params) -> CalcResult {
    let cols = require(frame, &["close", "volume"])?;
    let (close, volume) = (cols[0], cols[1]);

    let mut values = Vec::with_capacity(frame.len());
    let mut acc = 0.0;
    for i in 0..frame.len() {
        if i > 0 {
            if close[i] > close[i - 1] {
                acc += volume[i];
            } else if close[i] < close[i - 1] {
                acc -= volume[i];
            }
        }
        values.push(acc);
    }
    Ok(vec![("obv".to_string(), values)])
}

/// Volume ratio: up-day volume (plus half of flat-day volume) over down-day
/// volume (plus half of flat-day volume), over a rolling window. Row 0 has no
/// prior close and contributes to neither side.
pub fn vr(frame: &SeriesFrame, params: &Params) -> CalcResult {
    let cols = require(frame, &["close", "volume"])?;
    let (close, volume) = (cols[0], cols[1]);
    let windows = checked_windows(params, &[26])?;
    let n = frame.len();

    let mut up_vol = vec![0.0; n];
    let mut down_vol = vec![0.0; n];
    let mut flat_vol = vec![0.0; n];
    for i in 1..n {
        if close[i] > close[i - 1] {
            up_vol[i] = volume[i];
        } else if close[i] < close[i - 1] {
            down_vol[i] = volume[i];
        } else {
            flat_vol[i] = volume[i];
        }
    }

    let mut out = Vec::with_capacity(windows.len() + 1);
    for (idx, &w) in windows.iter().enumerate() {
        let av = rolling_sum(&up_vol, w as usize);
        let bv = rolling_sum(&down_vol, w as usize);
        let cv = rolling_sum(&flat_vol, w as usize);
        let values: Vec<f64> = (0..n)
            .map(|i| (av[i] + cv[i] / 2.0) / (bv[i] + cv[i] / 2.0 + 0.0001) * 100.0)
            .collect();
        if idx == 0 {
            out.push(("vr".to_string(), values.clone()));
        }
        out.push((format!("vr{w}"), values));
    }
    Ok(out)
}

/// Psychological line: percentage of up-closes in the window. Row 0 counts
/// as a non-up day.
pub fn psy(frame: &SeriesFrame, params: &Params) -> CalcResult {
    let close = require(frame, &["close"])?[0];
    let windows = checked_windows(params, &[12])?;
    let n = frame.len();

    let mut ups = vec![0.0; n];
    for i in 1..n {
        if close[i] > close[i - 1] {
            ups[i] = 1.0;
        }
    }

    let mut out = Vec::with_capacity(windows.len() + 1);
    for (idx, &w) in windows.iter().enumerate() {
        let counts = rolling_sum(&ups, w as usize);
        let values: Vec<f64> = counts.iter().map(|c| c / w as f64 * 100.0).collect();
        if idx == 0 {
            out.push(("psy".to_string(), values.clone()));
        }
        out.push((format!("psy{w}"), values));
    }
    Ok(out)
}

/// Market cost: cumulative volume-weighted close over cumulative volume,
/// zero until any volume has traded, plus a moving average per window.
pub fn mcst(frame: &SeriesFrame, params: &Params) -> CalcResult {
    let cols = require(frame, &["close", "volume"])?;
    let (close, volume) = (cols[0], cols[1]);
    let windows = checked_windows(params, &[12])?;

    let mut cum_turnover = 0.0;
    let mut cum_vol = 0.0;
    let base: Vec<f64> = (0..frame.len())
        .map(|i| {
            cum_turnover += close[i] * volume[i];
            cum_vol += volume[i];
            if cum_vol == 0.0 {
                0.0
            } else {
                cum_turnover / cum_vol
            }
        })
        .collect();

    let mut out = Vec::with_capacity(windows.len() + 1);
    for &w in &windows {
        out.push((format!("mcst_ma{w}"), rolling_mean(&base, w as usize)));
    }
    out.push(("mcst".to_string(), base));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calc::testutil::{frame_from_closes, frame_from_rows};

    #[test]
    fn test_obv_signs() {
        let frame = frame_from_rows(&[
            (10.0, 11.0, 9.0, 10.0, 100.0),
            (10.0, 11.0, 9.0, 11.0, 200.0),
            (10.0, 11.0, 9.0, 11.0, 300.0),
            (10.0, 11.0, 9.0, 10.0, 400.0),
        ]);
        let out = obv(&frame, &Params::new()).unwrap();
        assert_eq!(out[0].1, vec![0.0, 200.0, 200.0, -200.0]);
    }

    #[test]
    fn test_vr_all_up_days_is_large() {
        let closes: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
        let frame = frame_from_closes(&closes);
        let out = vr(&frame, &Params::new().with("windows", vec![5])).unwrap();
        // denominator is only the epsilon, so the ratio is huge
        assert!(out[0].1[9] > 1_000_000.0);
    }

    #[test]
    fn test_psy_all_up() {
        let closes: Vec<f64> = (0..15).map(|i| 100.0 + i as f64).collect();
        let frame = frame_from_closes(&closes);
        let out = psy(&frame, &Params::new().with("windows", vec![5])).unwrap();
        // from row 5 on, every row in the window is an up day
        assert_eq!(out[0].1[14], 100.0);
        // row 0 is not an up day
        assert_eq!(out[0].1[0], 0.0);
    }

    #[test]
    fn test_mcst_constant_price() {
        let frame = frame_from_closes(&[50.0; 6]);
        let out = mcst(&frame, &Params::new()).unwrap();
        let base = out.iter().find(|(n, _)| n == "mcst").map(|(_, v)| v).unwrap();
        for &v in base {
            assert!((v - 50.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_vol_ma_names() {
        let frame = frame_from_closes(&[1.0, 2.0, 3.0]);
        let out = vol_ma(&frame, &Params::new()).unwrap();
        let names: Vec<&str> = out.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["vol_ma5", "vol_ma10"]);
    }
}
