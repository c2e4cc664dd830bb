//! Indicator registry with dependency-ordered resolution.
//!
//! Holds one [`IndicatorSpec`] per indicator name and turns a requested set
//! of indicators into a valid evaluation order, transitively pulling in
//! declared dependencies. Resolved orders are cached per requested set and
//! the cache is dropped on any registration change.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use kline_types::SeriesFrame;
use tracing::{debug, warn};

use crate::calc::{self, ColumnSet};
use crate::error::IndicatorError;
use crate::params::Params;

/// Boxed calculator shared between the registry and the cache layer.
pub type CalcFn =
    Arc<dyn Fn(&SeriesFrame, &Params) -> Result<ColumnSet, IndicatorError> + Send + Sync>;

/// Everything the engine knows about one indicator.
#[derive(Clone)]
pub struct IndicatorSpec {
    pub name: String,
    pub calc: CalcFn,
    /// Names of indicators whose columns must exist before this one runs.
    pub dependencies: Vec<String>,
    pub default_params: Params,
    pub description: String,
    pub category: String,
}

impl fmt::Debug for IndicatorSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndicatorSpec")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

/// Registry of indicator specs plus a memo of resolved evaluation orders.
pub struct IndicatorRegistry {
    indicators: HashMap<String, IndicatorSpec>,
    order_cache: Mutex<HashMap<BTreeSet<String>, Vec<String>>>,
}

impl Default for IndicatorRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl IndicatorRegistry {
    /// Empty registry, no built-ins.
    #[must_use]
    pub fn new() -> Self {
        Self {
            indicators: HashMap::new(),
            order_cache: Mutex::new(HashMap::new()),
        }
    }

    /// Registry preloaded with every built-in calculator.
    #[must_use]
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register_builtins();
        registry
    }

    fn register_builtins(&mut self) {
        let builtins: [(&str, CalcFn, Params, &str, &str); 19] = [
            (
                "ma",
                Arc::new(calc::trend::ma),
                Params::new().with("windows", vec![5, 10, 20, 60]),
                "simple moving averages of close",
                "trend",
            ),
            (
                "vol_ma",
                Arc::new(calc::volume::vol_ma),
                Params::new().with("windows", vec![5, 10]),
                "moving averages of volume",
                "volume",
            ),
            (
                "macd",
                Arc::new(calc::trend::macd),
                Params::new().with("fast", 12).with("slow", 26).with("signal", 9),
                "moving average convergence divergence",
                "trend",
            ),
            (
                "rsi",
                Arc::new(calc::oscillator::rsi),
                Params::new().with("windows", vec![14]),
                "relative strength index",
                "oscillator",
            ),
            (
                "kdj",
                Arc::new(calc::oscillator::kdj),
                Params::new().with("windows", vec![14]),
                "stochastic KDJ",
                "oscillator",
            ),
            (
                "wr",
                Arc::new(calc::oscillator::wr),
                Params::new().with("windows", vec![10, 6]),
                "Williams %R",
                "oscillator",
            ),
            (
                "boll",
                Arc::new(calc::trend::boll),
                Params::new().with("windows", vec![20]).with("std_dev", 2.0),
                "Bollinger bands",
                "trend",
            ),
            (
                "dmi",
                Arc::new(calc::trend::dmi),
                Params::new().with("windows", vec![14]),
                "directional movement index",
                "trend",
            ),
            (
                "cci",
                Arc::new(calc::oscillator::cci),
                Params::new().with("windows", vec![14]),
                "commodity channel index",
                "oscillator",
            ),
            (
                "roc",
                Arc::new(calc::oscillator::roc),
                Params::new().with("windows", vec![12]),
                "rate of change",
                "oscillator",
            ),
            (
                "mtm",
                Arc::new(calc::oscillator::mtm),
                Params::new().with("windows", vec![12]),
                "momentum",
                "oscillator",
            ),
            (
                "obv",
                Arc::new(calc::volume::obv),
                Params::new(),
                "on-balance volume",
                "volume",
            ),
            (
                "vr",
                Arc::new(calc::volume::vr),
                Params::new().with("windows", vec![26]),
                "volume ratio",
                "volume",
            ),
            (
                "psy",
                Arc::new(calc::volume::psy),
                Params::new().with("windows", vec![12]),
                "psychological line",
                "sentiment",
            ),
            (
                "trix",
                Arc::new(calc::trend::trix),
                Params::new().with("windows", vec![12]).with("signal_period", 9),
                "triple EMA rate of change",
                "trend",
            ),
            (
                "brar",
                Arc::new(calc::sentiment::brar),
                Params::new().with("windows", vec![26]),
                "popularity and willingness",
                "sentiment",
            ),
            (
                "asi",
                Arc::new(calc::sentiment::asi),
                Params::new().with("signal_period", 20),
                "accumulation swing index",
                "oscillator",
            ),
            (
                "emv",
                Arc::new(calc::sentiment::emv),
                Params::new().with("windows", vec![14]).with("constant", 1e8),
                "ease of movement",
                "trend",
            ),
            (
                "mcst",
                Arc::new(calc::volume::mcst),
                Params::new().with("windows", vec![12]),
                "market cost",
                "cost",
            ),
        ];
        for (name, calc, default_params, description, category) in builtins {
            self.register(IndicatorSpec {
                name: name.to_string(),
                calc,
                dependencies: Vec::new(),
                default_params,
                description: description.to_string(),
                category: category.to_string(),
            });
        }
    }

    /// Registers or replaces a spec. Replacing an existing name is allowed
    /// but logged, since it usually means a plugin is shadowing a built-in.
    pub fn register(&mut self, spec: IndicatorSpec) {
        if self.indicators.contains_key(&spec.name) {
            warn!(indicator = %spec.name, "overwriting existing indicator registration");
        }
        debug!(indicator = %spec.name, category = %spec.category, "registered indicator");
        self.indicators.insert(spec.name.clone(), spec);
        self.clear_order_cache();
    }

    /// Removes a spec; returns whether it existed.
    pub fn unregister(&mut self, name: &str) -> bool {
        let removed = self.indicators.remove(name).is_some();
        if removed {
            self.clear_order_cache();
        }
        removed
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&IndicatorSpec> {
        self.indicators.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.indicators.contains_key(name)
    }

    /// All registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indicators.keys().cloned().collect();
        names.sort();
        names
    }

    /// Sorted names in the given category.
    #[must_use]
    pub fn by_category(&self, category: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .indicators
            .values()
            .filter(|spec| spec.category == category)
            .map(|spec| spec.name.clone())
            .collect();
        names.sort();
        names
    }

    /// Resolves an evaluation order for the requested indicators, pulling in
    /// transitive dependencies. Ties are broken by first-seen order during
    /// closure collection, so the result is deterministic.
    ///
    /// # Errors
    ///
    /// [`IndicatorError::UnsupportedIndicator`] if a requested name or a
    /// dependency is unregistered; [`IndicatorError::CyclicDependency`] if
    /// the dependency graph has a cycle.
    pub fn resolve_order(&self, requested: &[String]) -> Result<Vec<String>, IndicatorError> {
        let key: BTreeSet<String> = requested.iter().cloned().collect();
        {
            let cache = self
                .order_cache
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(order) = cache.get(&key) {
                return Ok(order.clone());
            }
        }

        // Transitive closure in first-seen order.
        let mut seen: Vec<String> = Vec::new();
        let mut seen_set: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = requested.iter().cloned().collect();
        while let Some(name) = queue.pop_front() {
            if seen_set.contains(&name) {
                continue;
            }
            let spec = self
                .indicators
                .get(&name)
                .ok_or_else(|| IndicatorError::UnsupportedIndicator(name.clone()))?;
            seen_set.insert(name.clone());
            seen.push(name);
            for dep in &spec.dependencies {
                if !seen_set.contains(dep) {
                    queue.push_back(dep.clone());
                }
            }
        }

        // Kahn's algorithm; among ready nodes the earliest-seen runs first.
        let mut indegree: HashMap<&str, usize> = HashMap::new();
        let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
        for name in &seen {
            let spec = &self.indicators[name];
            indegree.insert(name.as_str(), spec.dependencies.len());
            for dep in &spec.dependencies {
                dependents.entry(dep.as_str()).or_default().push(name.as_str());
            }
        }

        let mut order: Vec<String> = Vec::with_capacity(seen.len());
        let mut placed: HashSet<&str> = HashSet::new();
        while order.len() < seen.len() {
            let next = seen
                .iter()
                .map(String::as_str)
                .find(|name| !placed.contains(name) && indegree[name] == 0);
            let Some(next) = next else {
                let mut remaining: Vec<String> = seen
                    .iter()
                    .filter(|name| !placed.contains(name.as_str()))
                    .cloned()
                    .collect();
                remaining.sort();
                return Err(IndicatorError::CyclicDependency { remaining });
            };
            placed.insert(next);
            order.push(next.to_string());
            if let Some(children) = dependents.get(next) {
                for child in children {
                    if let Some(deg) = indegree.get_mut(child) {
                        *deg -= 1;
                    }
                }
            }
        }

        let mut cache = self
            .order_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        cache.insert(key, order.clone());
        Ok(order)
    }

    fn clear_order_cache(&self) {
        self.order_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl fmt::Debug for IndicatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndicatorRegistry")
            .field("indicators", &self.names())
            .finish_non_exhaustive()
    }
}
