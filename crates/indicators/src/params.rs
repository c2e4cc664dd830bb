//! Indicator parameters.
//!
//! Parameters are an ordered string-keyed map of JSON-like scalars. Keys are
//! kept sorted (`BTreeMap`) so the canonical serialization is stable, which is
//! what the cache fingerprints.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One parameter value.
///
/// Untagged so `{"window": 14}` and `{"windows": [5, 10]}` both deserialize
/// naturally. `Int` precedes `Float` so whole numbers stay integral.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    IntList(Vec<i64>),
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Vec<i64>> for ParamValue {
    fn from(v: Vec<i64>) -> Self {
        Self::IntList(v)
    }
}

/// Sorted parameter map passed to calculators and fingerprinted by the cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with<V: Into<ParamValue>>(mut self, key: &str, value: V) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    pub fn set<V: Into<ParamValue>>(&mut self, key: &str, value: V) {
        self.0.insert(key.to_string(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Integer lookup with a fallback. `Float` values truncate.
    #[must_use]
    pub fn int_or(&self, key: &str, default: i64) -> i64 {
        match self.0.get(key) {
            Some(ParamValue::Int(v)) => *v,
            Some(ParamValue::Float(v)) => *v as i64,
            _ => default,
        }
    }

    /// Float lookup with a fallback. `Int` values widen.
    #[must_use]
    pub fn float_or(&self, key: &str, default: f64) -> f64 {
        match self.0.get(key) {
            Some(ParamValue::Float(v)) => *v,
            Some(ParamValue::Int(v)) => *v as f64,
            _ => default,
        }
    }

    #[must_use]
    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        match self.0.get(key) {
            Some(ParamValue::Bool(v)) => *v,
            _ => default,
        }
    }

    /// The `"windows"` key as a list. A single `Int` becomes a one-element
    /// list; absent or wrongly typed means `None`.
    #[must_use]
    pub fn windows(&self) -> Option<Vec<i64>> {
        match self.0.get("windows") {
            Some(ParamValue::IntList(v)) => Some(v.clone()),
            Some(ParamValue::Int(v)) => Some(vec![*v]),
            _ => None,
        }
    }

    /// `"windows"` with a fallback list for calculators that always window.
    #[must_use]
    pub fn windows_or(&self, default: &[i64]) -> Vec<i64> {
        self.windows().unwrap_or_else(|| default.to_vec())
    }

    /// Defaults overlaid with caller overrides; overrides win per key.
    #[must_use]
    pub fn merged(defaults: &Params, overrides: &Params) -> Params {
        let mut out = defaults.clone();
        for (k, v) in &overrides.0 {
            out.0.insert(k.clone(), v.clone());
        }
        out
    }

    /// Canonical JSON of the sorted map. Equal maps always serialize equal,
    /// so this string is what the cache hashes.
    #[must_use]
    pub fn canonical(&self) -> String {
        serde_json::to_string(&self.0).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_is_key_sorted() {
        let a = Params::new().with("window", 14).with("alpha", 0.5);
        let b = Params::new().with("alpha", 0.5).with("window", 14);
        assert_eq!(a.canonical(), b.canonical());
        assert_eq!(a.canonical(), r#"{"alpha":0.5,"window":14}"#);
    }

    #[test]
    fn test_windows_scalar_promotes() {
        let p = Params::new().with("windows", 5);
        assert_eq!(p.windows(), Some(vec![5]));
        let p = Params::new().with("windows", vec![5, 10, 20]);
        assert_eq!(p.windows(), Some(vec![5, 10, 20]));
        assert_eq!(Params::new().windows(), None);
    }

    #[test]
    fn test_merged_overrides_win() {
        let defaults = Params::new().with("window", 14).with("signal", 9);
        let overrides = Params::new().with("window", 21);
        let merged = Params::merged(&defaults, &overrides);
        assert_eq!(merged.int_or("window", 0), 21);
        assert_eq!(merged.int_or("signal", 0), 9);
    }

    #[test]
    fn test_untagged_deserialize() {
        let p: Params = serde_json::from_str(r#"{"window":14,"smooth":0.25,"windows":[5,10]}"#).unwrap();
        assert_eq!(p.int_or("window", 0), 14);
        assert!((p.float_or("smooth", 0.0) - 0.25).abs() < f64::EPSILON);
        assert_eq!(p.windows(), Some(vec![5, 10]));
    }
}
