//! Column naming conventions.
//!
//! Drawing code consumes these names as a public contract, and
//! [`StatefulAnalyzer::reset`](crate::StatefulAnalyzer::reset) uses this
//! module as the exact inverse of what the calculators emit, so a reset never
//! leaves orphaned columns behind.

/// Columns a windowed indicator emits for one window.
#[must_use]
pub fn windowed_columns(indicator: &str, window: i64) -> Vec<String> {
    match indicator {
        "kdj" => vec![format!("k{window}"), format!("d{window}"), format!("j{window}")],
        "boll" => vec![format!("mb{window}"), format!("up{window}"), format!("dn{window}")],
        "dmi" => vec![
            format!("pdi_{window}"),
            format!("ndi_{window}"),
            format!("adx_{window}"),
            format!("adxr_{window}"),
        ],
        "trix" => vec![format!("trix{window}"), format!("trma{window}")],
        "brar" => vec![format!("ar{window}"), format!("br{window}")],
        "mcst" => vec![format!("mcst_ma{window}")],
        // ma, vol_ma, rsi, wr, cci, roc, mtm, vr, psy, emv and any custom
        // windowed indicator use the plain `{name}{window}` shape.
        _ => vec![format!("{indicator}{window}")],
    }
}

/// Unnumbered alias columns an indicator also emits (for its first or
/// conventional window). Dropped whenever any of the indicator's windows is
/// reset, since the alias may mirror the window being dropped.
#[must_use]
pub fn alias_columns(indicator: &str) -> Vec<String> {
    let names: &[&str] = match indicator {
        "kdj" => &["k", "d", "j"],
        "wr" => &["wr", "wr1", "wr2"],
        "boll" => &["mb", "up", "dn"],
        "dmi" => &["pdi", "ndi", "adx", "adxr"],
        "trix" => &["trix", "trma"],
        "brar" => &["ar", "br"],
        "mcst" => &["mcst"],
        "cci" | "roc" | "mtm" | "vr" | "psy" | "emv" => return vec![indicator.to_string()],
        _ => &[],
    };
    names.iter().map(|s| (*s).to_string()).collect()
}

/// Alias columns that mirror one specific window: the conventional window of
/// each indicator (14 for kdj, the first default window otherwise; wr splits
/// its aliases across its two defaults). Resetting any other window must not
/// touch the aliases.
#[must_use]
pub fn alias_columns_for_window(indicator: &str, window: i64) -> Vec<String> {
    let bearing: i64 = match indicator {
        "kdj" | "dmi" | "cci" | "emv" => 14,
        "boll" => 20,
        "roc" | "mtm" | "psy" | "trix" | "mcst" => 12,
        "vr" | "brar" => 26,
        "wr" => {
            return match window {
                10 => vec!["wr".to_string(), "wr1".to_string()],
                6 => vec!["wr2".to_string()],
                _ => Vec::new(),
            }
        }
        _ => return Vec::new(),
    };
    if window == bearing {
        alias_columns(indicator)
    } else {
        Vec::new()
    }
}

/// Columns emitted by indicators that take no window list (single flag in the
/// analyzer's state rather than a per-window set).
#[must_use]
pub fn flag_columns(indicator: &str) -> Vec<String> {
    let names: &[&str] = match indicator {
        "macd" => &["macd", "macd_signal", "macd_hist"],
        "obv" => &["obv"],
        "asi" => &["asi", "asi_sig"],
        _ => &[],
    };
    names.iter().map(|s| (*s).to_string()).collect()
}
