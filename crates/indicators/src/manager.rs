//! Indicator manager: orchestrates registry ordering, cache lookups, and
//! calculator runs.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use kline_types::SeriesFrame;
use tracing::{debug, instrument};

use crate::cache::{CacheConfig, CacheKey, CacheStats, IndicatorCache, Ttl};
use crate::calc::{self, ColumnSet};
use crate::error::IndicatorError;
use crate::params::Params;
use crate::registry::{IndicatorRegistry, IndicatorSpec};

/// Facade over the registry and cache. All methods take `&self`; the
/// registry sits behind a `RwLock` so custom registration can happen while
/// readers calculate.
pub struct IndicatorManager {
    registry: RwLock<IndicatorRegistry>,
    cache: Arc<IndicatorCache>,
    cache_enabled: bool,
}

impl Default for IndicatorManager {
    fn default() -> Self {
        Self::new()
    }
}

impl IndicatorManager {
    /// Manager with all built-ins and a default-configured cache.
    #[must_use]
    pub fn new() -> Self {
        Self::with_cache(Arc::new(IndicatorCache::new(CacheConfig::default())))
    }

    /// Manager with an injected cache, shared with other managers if desired.
    #[must_use]
    pub fn with_cache(cache: Arc<IndicatorCache>) -> Self {
        Self {
            registry: RwLock::new(IndicatorRegistry::with_builtins()),
            cache,
            cache_enabled: true,
        }
    }

    /// Manager that always recomputes.
    #[must_use]
    pub fn without_cache() -> Self {
        let mut manager = Self::new();
        manager.cache_enabled = false;
        manager
    }

    /// Computes one indicator (and its dependencies) on a copy of the frame.
    ///
    /// # Errors
    ///
    /// See [`IndicatorManager::calculate_many`].
    pub fn calculate(
        &self,
        frame: &SeriesFrame,
        indicator: &str,
        params: &Params,
    ) -> Result<SeriesFrame, IndicatorError> {
        self.calculate_many(frame, &[indicator.to_string()], params)
    }

    /// Computes the requested indicators in dependency order and returns the
    /// frame with every new column folded in. Nothing is cached and nothing
    /// is returned if any calculator in the chain fails.
    ///
    /// The same caller `params` overlay the registered defaults of each
    /// indicator in the chain.
    ///
    /// # Errors
    ///
    /// Propagates ordering errors ([`IndicatorError::UnsupportedIndicator`],
    /// [`IndicatorError::CyclicDependency`]), missing-column and
    /// invalid-parameter failures from calculators, and frame errors while
    /// folding columns in.
    #[instrument(skip(self, frame, params), fields(n_rows = frame.len()))]
    pub fn calculate_many(
        &self,
        frame: &SeriesFrame,
        indicators: &[String],
        params: &Params,
    ) -> Result<SeriesFrame, IndicatorError> {
        let mut result = frame.clone();
        calc::preprocess(&mut result)?;

        let registry = self.read_registry();
        let order = registry.resolve_order(indicators)?;
        debug!(?order, "resolved calculation order");

        // Cache writes are buffered until the whole chain succeeds so a
        // mid-chain failure leaves the cache untouched.
        let mut pending: Vec<(CacheKey, ColumnSet)> = Vec::new();
        for name in &order {
            let spec = registry
                .get(name)
                .ok_or_else(|| IndicatorError::UnsupportedIndicator(name.clone()))?;
            let effective = Params::merged(&spec.default_params, params);

            let cached = if self.cache_enabled {
                self.cache.get(name, &result, &effective)
            } else {
                None
            };
            let columns = match cached {
                Some(columns) => {
                    debug!(indicator = %name, "served from cache");
                    columns
                }
                None => {
                    let columns = (spec.calc)(&result, &effective)?;
                    if self.cache_enabled {
                        if let Ok(key) = CacheKey::for_frame(name, &result, &effective) {
                            pending.push((key, columns.clone()));
                        }
                    }
                    columns
                }
            };
            result.append_columns(columns)?;
        }
        drop(registry);

        for (key, columns) in pending {
            self.cache.put_with(key, columns, Ttl::Default);
        }
        Ok(result)
    }

    /// Computes every registered indicator, sorted by name.
    ///
    /// # Errors
    ///
    /// Same as [`IndicatorManager::calculate_many`].
    pub fn calculate_all(
        &self,
        frame: &SeriesFrame,
        params: &Params,
    ) -> Result<SeriesFrame, IndicatorError> {
        let names = self.read_registry().names();
        self.calculate_many(frame, &names, params)
    }

    /// Registers a custom indicator, replacing any existing one of the same
    /// name.
    pub fn register_custom(&self, spec: IndicatorSpec) {
        self.write_registry().register(spec);
    }

    /// Removes an indicator registration; returns whether it existed.
    pub fn unregister(&self, name: &str) -> bool {
        self.write_registry().unregister(name)
    }

    #[must_use]
    pub fn is_supported(&self, name: &str) -> bool {
        self.read_registry().contains(name)
    }

    #[must_use]
    pub fn supported_indicators(&self) -> Vec<String> {
        self.read_registry().names()
    }

    #[must_use]
    pub fn indicators_by_category(&self, category: &str) -> Vec<String> {
        self.read_registry().by_category(category)
    }

    /// Registered default parameters for an indicator, if known.
    #[must_use]
    pub fn default_params(&self, name: &str) -> Option<Params> {
        self.read_registry().get(name).map(|spec| spec.default_params.clone())
    }

    /// The evaluation order that would be used for the given request.
    ///
    /// # Errors
    ///
    /// Same ordering errors as [`IndicatorManager::calculate_many`].
    pub fn calculation_order(&self, indicators: &[String]) -> Result<Vec<String>, IndicatorError> {
        self.read_registry().resolve_order(indicators)
    }

    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    fn read_registry(&self) -> RwLockReadGuard<'_, IndicatorRegistry> {
        self.registry.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_registry(&self) -> RwLockWriteGuard<'_, IndicatorRegistry> {
        self.registry.write().unwrap_or_else(PoisonError::into_inner)
    }
}
