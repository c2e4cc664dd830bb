//! Fingerprint-keyed result cache with TTL expiry and LRU eviction.
//!
//! Keys combine the indicator name, a bounded-prefix fingerprint of the
//! frame's core columns, and a fingerprint of the canonical parameter
//! string. The data fingerprint deliberately hashes only the first
//! [`FINGERPRINT_ROWS`] rows: two frames that agree on that prefix but
//! diverge later will collide and serve each other's cached columns. The TTL
//! is the mitigation for that, not a stronger hash.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use kline_types::{SeriesFrame, CORE_COLUMNS};
use tracing::{debug, warn};

use crate::calc::ColumnSet;
use crate::error::IndicatorError;
use crate::params::Params;

/// How many leading rows of each core column the data fingerprint covers.
pub const FINGERPRINT_ROWS: usize = 100;

/// Hashes the bounded prefix of whichever core columns the frame carries.
///
/// # Errors
///
/// [`IndicatorError::Fingerprint`] when none of the core columns is present.
pub fn data_fingerprint(frame: &SeriesFrame) -> Result<u64, IndicatorError> {
    let mut hasher = DefaultHasher::new();
    let mut any = false;
    for name in CORE_COLUMNS {
        if let Some(values) = frame.column(name) {
            any = true;
            name.hash(&mut hasher);
            for v in values.iter().take(FINGERPRINT_ROWS) {
                v.to_bits().hash(&mut hasher);
            }
        }
    }
    if !any {
        return Err(IndicatorError::Fingerprint(
            "no core OHLCV columns present".to_string(),
        ));
    }
    Ok(hasher.finish())
}

fn param_fingerprint(params: &Params) -> u64 {
    let mut hasher = DefaultHasher::new();
    params.canonical().hash(&mut hasher);
    hasher.finish()
}

/// Full cache key for one computed result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub indicator: String,
    pub data_fingerprint: u64,
    pub param_fingerprint: u64,
}

impl CacheKey {
    /// Builds a key from a frame and effective parameters.
    ///
    /// # Errors
    ///
    /// Propagates [`data_fingerprint`] failures.
    pub fn for_frame(
        indicator: &str,
        frame: &SeriesFrame,
        params: &Params,
    ) -> Result<Self, IndicatorError> {
        Ok(Self {
            indicator: indicator.to_string(),
            data_fingerprint: data_fingerprint(frame)?,
            param_fingerprint: param_fingerprint(params),
        })
    }
}

/// Per-entry time-to-live policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// Use the cache's configured default.
    Default,
    /// Never expire.
    Never,
    /// Expire after the given duration.
    After(Duration),
}

/// Cache tuning knobs.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum entry count before LRU eviction kicks in.
    pub max_size: usize,
    /// Default TTL applied by [`Ttl::Default`]; `None` means never expire.
    pub default_ttl: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_size: 1000,
            default_ttl: Some(Duration::from_secs(3600)),
        }
    }
}

struct CacheEntry {
    value: ColumnSet,
    expires_at: Option<Instant>,
    /// Monotonic access counter; the smallest value is the LRU victim.
    last_seq: u64,
    hits: u64,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<CacheKey, CacheEntry>,
    hits: u64,
    misses: u64,
    evictions: u64,
    access_seq: u64,
}

/// Snapshot of cache counters.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub total_requests: u64,
    pub hit_rate: f64,
}

/// Thread-safe indicator result cache. All methods take `&self`.
pub struct IndicatorCache {
    config: CacheConfig,
    inner: Mutex<Inner>,
}

impl Default for IndicatorCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl IndicatorCache {
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Looks up a result for `(indicator, frame, params)`. A fingerprint
    /// failure degrades to a miss.
    #[must_use]
    pub fn get(&self, indicator: &str, frame: &SeriesFrame, params: &Params) -> Option<ColumnSet> {
        match CacheKey::for_frame(indicator, frame, params) {
            Ok(key) => self.get_with(&key),
            Err(err) => {
                warn!(indicator, %err, "fingerprint failed, treating as cache miss");
                self.count_miss();
                None
            }
        }
    }

    /// Stores a result for `(indicator, frame, params)` under the default
    /// TTL. A fingerprint failure skips caching silently.
    pub fn put(&self, indicator: &str, frame: &SeriesFrame, params: &Params, value: ColumnSet) {
        match CacheKey::for_frame(indicator, frame, params) {
            Ok(key) => self.put_with(key, value, Ttl::Default),
            Err(err) => {
                warn!(indicator, %err, "fingerprint failed, result not cached");
            }
        }
    }

    /// Key-level lookup. Expired entries are removed and count as both a
    /// miss and an eviction.
    #[must_use]
    pub fn get_with(&self, key: &CacheKey) -> Option<ColumnSet> {
        let mut inner = self.lock();
        inner.access_seq += 1;
        let seq = inner.access_seq;
        let expired = match inner.entries.get(key) {
            Some(entry) => entry.expires_at.is_some_and(|at| Instant::now() >= at),
            None => {
                inner.misses += 1;
                return None;
            }
        };
        if expired {
            inner.entries.remove(key);
            inner.evictions += 1;
            inner.misses += 1;
            debug!(indicator = %key.indicator, "cache entry expired");
            return None;
        }
        inner.hits += 1;
        let entry = inner.entries.get_mut(key)?;
        entry.last_seq = seq;
        entry.hits += 1;
        Some(entry.value.clone())
    }

    /// Key-level insert. Over-capacity inserts evict the least recently
    /// accessed entry first.
    pub fn put_with(&self, key: CacheKey, value: ColumnSet, ttl: Ttl) {
        let expires_at = match ttl {
            Ttl::Default => self.config.default_ttl.map(|d| Instant::now() + d),
            Ttl::Never => None,
            Ttl::After(d) => Some(Instant::now() + d),
        };
        let mut inner = self.lock();
        inner.access_seq += 1;
        let seq = inner.access_seq;
        if !inner.entries.contains_key(&key) && inner.entries.len() >= self.config.max_size {
            if let Some(victim) = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_seq)
                .map(|(k, _)| k.clone())
            {
                inner.entries.remove(&victim);
                inner.evictions += 1;
                debug!(indicator = %victim.indicator, "evicted least recently used entry");
            }
        }
        inner.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at,
                last_seq: seq,
                hits: 0,
            },
        );
    }

    /// Removes entries matching the given filters; `None` matches all.
    /// Returns how many were removed.
    pub fn invalidate(&self, indicator: Option<&str>, data_fingerprint: Option<u64>) -> usize {
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|key, _| {
            let indicator_match = indicator.is_none_or(|name| key.indicator == name);
            let data_match = data_fingerprint.is_none_or(|fp| key.data_fingerprint == fp);
            !(indicator_match && data_match)
        });
        before - inner.entries.len()
    }

    /// Drops every entry and resets no counters.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        let total = inner.hits + inner.misses;
        CacheStats {
            size: inner.entries.len(),
            max_size: self.config.max_size,
            hits: inner.hits,
            misses: inner.misses,
            evictions: inner.evictions,
            total_requests: total,
            hit_rate: if total == 0 {
                0.0
            } else {
                inner.hits as f64 / total as f64
            },
        }
    }

    fn count_miss(&self) {
        self.lock().misses += 1;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kline_types::OhlcvRow;

    fn frame(seed: f64) -> SeriesFrame {
        let rows: Vec<OhlcvRow> = (0..5)
            .map(|i| {
                let base = seed + i as f64;
                OhlcvRow::new(i as i64 + 1, base, base + 1.0, base - 1.0, base, 100.0)
            })
            .collect();
        SeriesFrame::from_ohlcv(&rows).unwrap()
    }

    fn columns(tag: f64) -> ColumnSet {
        vec![("out".to_string(), vec![tag; 5])]
    }

    #[test]
    fn test_hit_and_miss_counting() {
        let cache = IndicatorCache::default();
        let frame = frame(10.0);
        let params = Params::new().with("windows", vec![5]);

        assert!(cache.get("ma", &frame, &params).is_none());
        cache.put("ma", &frame, &params, columns(1.0));
        assert_eq!(cache.get("ma", &frame, &params).unwrap(), columns(1.0));

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert!((stats.hit_rate - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_params_change_misses() {
        let cache = IndicatorCache::default();
        let frame = frame(10.0);
        cache.put("ma", &frame, &Params::new().with("windows", vec![5]), columns(1.0));
        assert!(cache
            .get("ma", &frame, &Params::new().with("windows", vec![10]))
            .is_none());
    }

    #[test]
    fn test_data_change_misses() {
        let cache = IndicatorCache::default();
        let params = Params::new();
        cache.put("ma", &frame(10.0), &params, columns(1.0));
        assert!(cache.get("ma", &frame(99.0), &params).is_none());
    }

    #[test]
    fn test_lru_evicts_oldest_access() {
        let cache = IndicatorCache::new(CacheConfig {
            max_size: 2,
            default_ttl: None,
        });
        let frame = frame(10.0);
        let p = |w: i64| Params::new().with("windows", vec![w]);

        cache.put("ma", &frame, &p(5), columns(5.0));
        cache.put("ma", &frame, &p(10), columns(10.0));
        // touch the w=5 entry so w=10 is the LRU victim
        assert!(cache.get("ma", &frame, &p(5)).is_some());
        cache.put("ma", &frame, &p(20), columns(20.0));

        assert!(cache.get("ma", &frame, &p(5)).is_some());
        assert!(cache.get("ma", &frame, &p(10)).is_none());
        assert!(cache.get("ma", &frame, &p(20)).is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = IndicatorCache::new(CacheConfig {
            max_size: 10,
            default_ttl: Some(Duration::from_nanos(1)),
        });
        let frame = frame(10.0);
        let params = Params::new();
        cache.put("ma", &frame, &params, columns(1.0));
        std::thread::sleep(Duration::from_millis(2));
        assert!(cache.get("ma", &frame, &params).is_none());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_never_ttl_survives_default_expiry() {
        let cache = IndicatorCache::new(CacheConfig {
            max_size: 10,
            default_ttl: Some(Duration::from_nanos(1)),
        });
        let frame = frame(10.0);
        let key = CacheKey::for_frame("ma", &frame, &Params::new()).unwrap();
        cache.put_with(key.clone(), columns(1.0), Ttl::Never);
        std::thread::sleep(Duration::from_millis(2));
        assert!(cache.get_with(&key).is_some());
    }

    #[test]
    fn test_invalidate_by_indicator() {
        let cache = IndicatorCache::default();
        let frame = frame(10.0);
        let params = Params::new();
        cache.put("ma", &frame, &params, columns(1.0));
        cache.put("rsi", &frame, &params, columns(2.0));

        assert_eq!(cache.invalidate(Some("ma"), None), 1);
        assert!(cache.get("ma", &frame, &params).is_none());
        assert!(cache.get("rsi", &frame, &params).is_some());
    }

    #[test]
    fn test_fingerprint_requires_core_columns() {
        let bare = SeriesFrame::from_columns(vec![1, 2], vec![("x".to_string(), vec![1.0, 2.0])])
            .unwrap();
        assert!(data_fingerprint(&bare).is_err());
    }

    #[test]
    fn test_prefix_collision_documented_behavior() {
        // frames identical in the first FINGERPRINT_ROWS rows share a key
        let rows: Vec<OhlcvRow> = (0..(FINGERPRINT_ROWS as i64 + 10))
            .map(|i| OhlcvRow::new(i + 1, 1.0, 2.0, 0.5, 1.5, 100.0))
            .collect();
        let a = SeriesFrame::from_ohlcv(&rows).unwrap();
        let mut tail_changed = rows.clone();
        if let Some(last) = tail_changed.last_mut() {
            last.close = 9.0;
        }
        let b = SeriesFrame::from_ohlcv(&tail_changed).unwrap();
        assert_eq!(data_fingerprint(&a).unwrap(), data_fingerprint(&b).unwrap());
    }
}
