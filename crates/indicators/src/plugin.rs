//! Plugin boundary for externally provided indicators.
//!
//! Plugins hand the engine new columns for indicators it does not register
//! as built-in. A plugin declares whether it can consume the columnar frame
//! directly; otherwise the analyzer materializes a row view and calls the
//! fallback path. Both paths are explicit and individually testable.

use kline_types::{OhlcvRow, SeriesFrame};

use crate::calc::ColumnSet;
use crate::error::IndicatorError;
use crate::params::Params;

/// One externally provided indicator.
pub trait IndicatorPlugin: Send + Sync {
    /// Indicator name, also the key the analyzer dispatches on.
    fn name(&self) -> &str;

    /// Parameters applied when the caller passes none.
    fn default_params(&self) -> Params {
        Params::new()
    }

    /// True if [`IndicatorPlugin::calculate_columnar`] is implemented and
    /// preferred. The row fallback is used otherwise.
    fn supports_bulk_columnar(&self) -> bool {
        false
    }

    /// Columnar fast path.
    ///
    /// # Errors
    ///
    /// Any failure; the analyzer wraps it as [`IndicatorError::Plugin`].
    fn calculate_columnar(
        &self,
        frame: &SeriesFrame,
        params: &Params,
    ) -> Result<ColumnSet, IndicatorError> {
        let _ = (frame, params);
        Err(IndicatorError::plugin(
            self.name(),
            "columnar path not implemented",
        ))
    }

    /// Row-oriented fallback path.
    ///
    /// # Errors
    ///
    /// Any failure; the analyzer wraps it as [`IndicatorError::Plugin`].
    fn calculate_rows(
        &self,
        rows: &[OhlcvRow],
        params: &Params,
    ) -> Result<ColumnSet, IndicatorError>;
}

/// Source of plugins available to a [`StatefulAnalyzer`](crate::StatefulAnalyzer).
pub trait PluginHost: Send + Sync {
    /// Looks up a plugin by indicator name.
    fn indicator_plugin(&self, name: &str) -> Option<&dyn IndicatorPlugin>;

    /// Every available plugin, in a stable order.
    fn indicator_plugins(&self) -> Vec<&dyn IndicatorPlugin>;
}

/// Minimal host over an owned plugin list.
#[derive(Default)]
pub struct StaticPluginHost {
    plugins: Vec<Box<dyn IndicatorPlugin>>,
}

impl StaticPluginHost {
    #[must_use]
    pub fn new(plugins: Vec<Box<dyn IndicatorPlugin>>) -> Self {
        Self { plugins }
    }
}

impl PluginHost for StaticPluginHost {
    fn indicator_plugin(&self, name: &str) -> Option<&dyn IndicatorPlugin> {
        self.plugins
            .iter()
            .map(AsRef::as_ref)
            .find(|plugin| plugin.name() == name)
    }

    fn indicator_plugins(&self) -> Vec<&dyn IndicatorPlugin> {
        self.plugins.iter().map(AsRef::as_ref).collect()
    }
}
