//! Rolling-window and recursive kernels shared by the calculators.
//!
//! All kernels treat non-finite inputs as missing: a NaN inside a window is
//! skipped rather than poisoning the aggregate, and a window with no finite
//! sample yields NaN. Rolling kernels use `min_periods = 1`, so output starts
//! as soon as one finite value is in view.

/// Mean over a trailing window of `window` samples, NaN-skipping.
#[must_use]
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    rolling_agg(values, window, |finite| {
        finite.iter().sum::<f64>() / finite.len() as f64
    })
}

/// Sum over a trailing window, NaN-skipping.
#[must_use]
pub fn rolling_sum(values: &[f64], window: usize) -> Vec<f64> {
    rolling_agg(values, window, |finite| finite.iter().sum())
}

/// Max over a trailing window, NaN-skipping.
#[must_use]
pub fn rolling_max(values: &[f64], window: usize) -> Vec<f64> {
    rolling_agg(values, window, |finite| {
        finite.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    })
}

/// Min over a trailing window, NaN-skipping.
#[must_use]
pub fn rolling_min(values: &[f64], window: usize) -> Vec<f64> {
    rolling_agg(values, window, |finite| {
        finite.iter().copied().fold(f64::INFINITY, f64::min)
    })
}

/// Sample standard deviation (ddof = 1) over a trailing window. NaN until two
/// finite samples are in view.
#[must_use]
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    rolling_agg(values, window, |finite| {
        if finite.len() < 2 {
            return f64::NAN;
        }
        let n = finite.len() as f64;
        let mean = finite.iter().sum::<f64>() / n;
        let var = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        var.sqrt()
    })
}

fn rolling_agg<F: Fn(&[f64]) -> f64>(values: &[f64], window: usize, agg: F) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut finite = Vec::with_capacity(window);
    for i in 0..values.len() {
        let start = (i + 1).saturating_sub(window);
        finite.clear();
        finite.extend(values[start..=i].iter().copied().filter(|v| v.is_finite()));
        if finite.is_empty() {
            out.push(f64::NAN);
        } else {
            out.push(agg(&finite));
        }
    }
    out
}

/// Exponential moving average with `alpha = 2 / (span + 1)`, unadjusted.
///
/// Seeds at the first finite value; later non-finite inputs carry the previous
/// smoothed value forward unchanged.
#[must_use]
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    ema_alpha(values, 2.0 / (span as f64 + 1.0))
}

/// Unadjusted EMA with an explicit smoothing factor.
#[must_use]
pub fn ema_alpha(values: &[f64], alpha: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut prev = f64::NAN;
    for &x in values {
        if x.is_finite() {
            prev = if prev.is_finite() {
                alpha * x + (1.0 - alpha) * prev
            } else {
                x
            };
        }
        out.push(prev);
    }
    out
}

/// First difference. Row 0 is NaN.
#[must_use]
pub fn diff(values: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    out.push(f64::NAN);
    for w in values.windows(2) {
        out.push(w[1] - w[0]);
    }
    out
}

/// Shift forward by `n` rows, leading NaNs.
#[must_use]
pub fn shift(values: &[f64], n: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len().min(n)];
    if values.len() > n {
        out.extend_from_slice(&values[..values.len() - n]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_rolling_mean_min_periods() {
        let out = rolling_mean(&[1.0, 2.0, 3.0], 5);
        assert!(close(out[0], 1.0));
        assert!(close(out[1], 1.5));
        assert!(close(out[2], 2.0));
    }

    #[test]
    fn test_rolling_mean_skips_nan() {
        let out = rolling_mean(&[f64::NAN, 2.0, 4.0], 2);
        assert!(out[0].is_nan());
        assert!(close(out[1], 2.0));
        assert!(close(out[2], 3.0));
    }

    #[test]
    fn test_rolling_extrema() {
        let v = [3.0, 1.0, 4.0, 1.0, 5.0];
        assert!(close(rolling_max(&v, 3)[4], 5.0));
        assert!(close(rolling_min(&v, 3)[4], 1.0));
    }

    #[test]
    fn test_rolling_std_needs_two_samples() {
        let out = rolling_std(&[2.0, 4.0, 6.0], 3);
        assert!(out[0].is_nan());
        assert!(close(out[1], std::f64::consts::SQRT_2));
        assert!(close(out[2], 2.0));
    }

    #[test]
    fn test_ema_seeds_at_first_finite() {
        let out = ema(&[f64::NAN, 10.0, 20.0], 3);
        assert!(out[0].is_nan());
        assert!(close(out[1], 10.0));
        assert!(close(out[2], 15.0)); // alpha = 0.5
    }

    #[test]
    fn test_diff_and_shift() {
        let d = diff(&[1.0, 4.0, 9.0]);
        assert!(d[0].is_nan());
        assert!(close(d[1], 3.0));
        assert!(close(d[2], 5.0));

        let s = shift(&[1.0, 2.0, 3.0], 1);
        assert!(s[0].is_nan());
        assert!(close(s[1], 1.0));
        assert!(close(s[2], 2.0));
    }

    proptest! {
        #[test]
        fn prop_rolling_mean_within_bounds(
            values in prop::collection::vec(-1e6f64..1e6, 1..64),
            window in 1usize..16,
        ) {
            let out = rolling_mean(&values, window);
            for (i, &m) in out.iter().enumerate() {
                let start = (i + 1).saturating_sub(window);
                let slice = &values[start..=i];
                let lo = slice.iter().copied().fold(f64::INFINITY, f64::min);
                let hi = slice.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                prop_assert!(m >= lo - 1e-6 && m <= hi + 1e-6);
            }
        }

        #[test]
        fn prop_ema_constant_series_is_identity(
            x in -1e6f64..1e6,
            len in 1usize..64,
            span in 1usize..30,
        ) {
            let values = vec![x; len];
            for &y in &ema(&values, span) {
                prop_assert!((y - x).abs() < 1e-6);
            }
        }
    }
}
