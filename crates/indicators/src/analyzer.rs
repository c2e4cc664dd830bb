//! Stateful per-frame analyzer.
//!
//! Wraps one frame and tracks which indicator/window combinations are
//! already materialized as columns, so interactive callers (chart redraws,
//! crosshair moves) can request the same indicator repeatedly without even
//! touching the manager or cache. Selective reset drops columns and state
//! together using the naming module as the inverse of the calculators.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use kline_types::{OhlcvRow, SeriesFrame, CORE_COLUMNS};

use tracing::{debug, warn};

use crate::calc;
use crate::error::IndicatorError;
use crate::manager::IndicatorManager;
use crate::naming;
use crate::params::Params;
use crate::plugin::{IndicatorPlugin, PluginHost};

/// Which indicator/window combinations are materialized on the bound frame.
#[derive(Debug, Default, Clone)]
struct ComputationState {
    /// Windowed indicators: computed window sets per indicator.
    windows: HashMap<String, BTreeSet<i64>>,
    /// Parameterless indicators (built-in or plugin): computed yes/no.
    flags: HashSet<String>,
}

/// Analyzer bound to one frame instance.
pub struct StatefulAnalyzer {
    frame: SeriesFrame,
    manager: Arc<IndicatorManager>,
    plugins: Option<Arc<dyn PluginHost>>,
    state: ComputationState,
    /// Lazily built row view, fed to plugin row fallbacks. Dropped whenever
    /// columns change.
    rows_cache: Option<Vec<OhlcvRow>>,
}

impl StatefulAnalyzer {
    /// Binds a frame, preprocessing it once up front.
    ///
    /// # Errors
    ///
    /// [`IndicatorError::MissingColumn`] if the frame lacks core columns.
    pub fn new(mut frame: SeriesFrame, manager: Arc<IndicatorManager>) -> Result<Self, IndicatorError> {
        calc::preprocess(&mut frame)?;
        Ok(Self {
            frame,
            manager,
            plugins: None,
            state: ComputationState::default(),
            rows_cache: None,
        })
    }

    /// Binds a frame with a plugin host for non-built-in indicators.
    ///
    /// # Errors
    ///
    /// Same as [`StatefulAnalyzer::new`].
    pub fn with_plugins(
        frame: SeriesFrame,
        manager: Arc<IndicatorManager>,
        plugins: Arc<dyn PluginHost>,
    ) -> Result<Self, IndicatorError> {
        let mut analyzer = Self::new(frame, manager)?;
        analyzer.plugins = Some(plugins);
        Ok(analyzer)
    }

    /// The bound frame with all columns computed so far.
    #[must_use]
    pub fn frame(&self) -> &SeriesFrame {
        &self.frame
    }

    /// Whether the indicator (optionally a specific window of it) is
    /// already materialized.
    #[must_use]
    pub fn is_computed(&self, indicator: &str, window: Option<i64>) -> bool {
        match window {
            Some(w) => self
                .state
                .windows
                .get(indicator)
                .is_some_and(|set| set.contains(&w)),
            None => {
                self.state.flags.contains(indicator)
                    || self
                        .state
                        .windows
                        .get(indicator)
                        .is_some_and(|set| !set.is_empty())
            }
        }
    }

    /// Computes an indicator onto the bound frame, skipping any windows (or
    /// the whole indicator, for parameterless ones) already materialized.
    /// When nothing is left to do this returns without touching the manager
    /// or its cache.
    ///
    /// # Errors
    ///
    /// [`IndicatorError::UnsupportedIndicator`] when neither the manager nor
    /// the plugin host knows the name; otherwise whatever the manager or
    /// plugin run fails with.
    pub fn compute(&mut self, indicator: &str, params: &Params) -> Result<(), IndicatorError> {
        if !self.manager.is_supported(indicator) {
            if self.plugin_for(indicator).is_some() {
                return self.compute_plugin(indicator, params);
            }
            return Err(IndicatorError::UnsupportedIndicator(indicator.to_string()));
        }

        let defaults = self.manager.default_params(indicator).unwrap_or_default();
        let effective = Params::merged(&defaults, params);

        match effective.windows() {
            Some(windows) => {
                let done = self.state.windows.entry(indicator.to_string()).or_default();
                let todo: Vec<i64> = windows.iter().copied().filter(|w| !done.contains(w)).collect();
                if todo.is_empty() {
                    debug!(indicator, "all requested windows already computed");
                    return Ok(());
                }
                let mut run_params = effective.clone();
                run_params.set("windows", todo.clone());
                let updated = self.manager.calculate(&self.frame, indicator, &run_params)?;
                self.frame = updated;
                self.state
                    .windows
                    .entry(indicator.to_string())
                    .or_default()
                    .extend(todo);
                self.rows_cache = None;
                Ok(())
            }
            None => {
                if self.state.flags.contains(indicator) {
                    debug!(indicator, "already computed");
                    return Ok(());
                }
                let updated = self.manager.calculate(&self.frame, indicator, &effective)?;
                self.frame = updated;
                self.state.flags.insert(indicator.to_string());
                self.rows_cache = None;
                Ok(())
            }
        }
    }

    /// Computes a plugin-provided indicator via its declared fast path, or
    /// the row fallback when the plugin cannot take columnar input. Only
    /// columns not already on the frame are folded in.
    ///
    /// # Errors
    ///
    /// [`IndicatorError::UnsupportedIndicator`] when no plugin carries the
    /// name, [`IndicatorError::Plugin`] when the plugin run fails.
    pub fn compute_plugin(&mut self, indicator: &str, params: &Params) -> Result<(), IndicatorError> {
        if self.state.flags.contains(indicator) {
            return Ok(());
        }
        let host = self
            .plugins
            .clone()
            .ok_or_else(|| IndicatorError::UnsupportedIndicator(indicator.to_string()))?;
        let plugin = host
            .indicator_plugin(indicator)
            .ok_or_else(|| IndicatorError::UnsupportedIndicator(indicator.to_string()))?;
        let effective = Params::merged(&plugin.default_params(), params);

        let columns = if plugin.supports_bulk_columnar() {
            plugin
                .calculate_columnar(&self.frame, &effective)
                .map_err(|err| IndicatorError::plugin(indicator, err.to_string()))?
        } else {
            if self.rows_cache.is_none() {
                self.rows_cache = Some(self.frame.rows()?);
            }
            let rows = self.rows_cache.as_deref().unwrap_or(&[]);
            plugin
                .calculate_rows(rows, &effective)
                .map_err(|err| IndicatorError::plugin(indicator, err.to_string()))?
        };

        let new_columns: Vec<(String, Vec<f64>)> = columns
            .into_iter()
            .filter(|(name, _)| !self.frame.has_column(name))
            .collect();
        self.frame.append_columns(new_columns)?;
        self.state.flags.insert(indicator.to_string());
        self.rows_cache = None;
        Ok(())
    }

    /// Computes every built-in indicator in registry order with default
    /// parameters, then every plugin indicator. Built-in failures propagate;
    /// individual plugin failures are logged and skipped.
    ///
    /// # Errors
    ///
    /// Same as [`StatefulAnalyzer::compute`] for built-ins.
    pub fn compute_all(&mut self) -> Result<(), IndicatorError> {
        let names = self.manager.supported_indicators();
        let order = self.manager.calculation_order(&names)?;
        for name in order {
            self.compute(&name, &Params::new())?;
        }

        if let Some(host) = self.plugins.clone() {
            for plugin in host.indicator_plugins() {
                let name = plugin.name().to_string();
                if self.state.flags.contains(&name) {
                    continue;
                }
                if let Err(err) = self.compute_plugin(&name, &Params::new()) {
                    warn!(indicator = %name, %err, "plugin indicator failed, skipping");
                }
            }
        }
        Ok(())
    }

    /// Drops computed columns and forgets the matching state.
    ///
    /// - `reset(None, _)`: full reset, every non-core column goes.
    /// - `reset(Some(ind), None)`: all of that indicator's windows, aliases,
    ///   and flags.
    /// - `reset(Some(ind), Some(w))`: that window's columns, plus the
    ///   unnumbered aliases only when `w` is the window they mirror.
    pub fn reset(&mut self, indicator: Option<&str>, window: Option<i64>) {
        match (indicator, window) {
            (None, _) => {
                self.frame.retain_columns(|name| CORE_COLUMNS.contains(&name));
                self.state = ComputationState::default();
            }
            (Some(indicator), Some(w)) => {
                let mut drop = naming::windowed_columns(indicator, w);
                drop.extend(naming::alias_columns_for_window(indicator, w));
                self.frame.drop_columns(&drop);
                if let Some(set) = self.state.windows.get_mut(indicator) {
                    set.remove(&w);
                    if set.is_empty() {
                        self.state.windows.remove(indicator);
                    }
                }
            }
            (Some(indicator), None) => {
                let mut drop: Vec<String> = self
                    .state
                    .windows
                    .get(indicator)
                    .map(|set| {
                        set.iter()
                            .flat_map(|&w| naming::windowed_columns(indicator, w))
                            .collect()
                    })
                    .unwrap_or_default();
                drop.extend(naming::alias_columns(indicator));
                drop.extend(naming::flag_columns(indicator));
                self.frame.drop_columns(&drop);
                self.state.windows.remove(indicator);
                self.state.flags.remove(indicator);
            }
        }
        self.rows_cache = None;
    }

    fn plugin_for(&self, name: &str) -> Option<&dyn IndicatorPlugin> {
        self.plugins
            .as_deref()
            .and_then(|host| host.indicator_plugin(name))
    }
}
