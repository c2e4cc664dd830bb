//! Kline Indicators
//!
//! Technical indicator engine for the kline charting stack: a registry of
//! calculators with dependency-ordered execution, a fingerprint-keyed result
//! cache with TTL and LRU eviction, a manager that ties the two together, and
//! a stateful per-frame analyzer for interactive use.
//!
//! Typical flow:
//!
//! ```ignore
//! let manager = Arc::new(IndicatorManager::new());
//! let mut analyzer = StatefulAnalyzer::new(frame, manager)?;
//! analyzer.compute("macd", &Params::new())?;
//! analyzer.compute("ma", &Params::new().with("windows", vec![5, 10]))?;
//! ```

#![deny(clippy::all)]

pub mod analyzer;
pub mod cache;
pub mod calc;
pub mod error;
pub mod kernels;
pub mod manager;
pub mod naming;
pub mod params;
pub mod plugin;
pub mod registry;

pub use analyzer::StatefulAnalyzer;
pub use cache::{CacheConfig, CacheKey, CacheStats, IndicatorCache, Ttl};
pub use calc::ColumnSet;
pub use error::IndicatorError;
pub use manager::IndicatorManager;
pub use params::{ParamValue, Params};
pub use plugin::{IndicatorPlugin, PluginHost, StaticPluginHost};
pub use registry::{CalcFn, IndicatorRegistry, IndicatorSpec};
