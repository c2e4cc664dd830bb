//! Indicator engine error types.

use kline_types::FrameError;
use thiserror::Error;

/// Errors from indicator registration, ordering, calculation, and caching.
#[derive(Debug, Error)]
pub enum IndicatorError {
    /// A calculator needs columns the frame does not carry
    #[error("missing required columns: {}", columns.join(", "))]
    MissingColumn {
        /// The absent column names.
        columns: Vec<String>,
    },

    /// Dependency resolution found a cycle
    #[error("cyclic indicator dependency among: {}", remaining.join(", "))]
    CyclicDependency {
        /// Indicators left unordered when resolution stalled.
        remaining: Vec<String>,
    },

    /// The named indicator is not registered anywhere
    #[error("unsupported indicator '{0}'")]
    UnsupportedIndicator(String),

    /// Cache fingerprinting could not run on the frame
    #[error("fingerprint failed: {0}")]
    Fingerprint(String),

    /// A plugin calculator failed
    #[error("plugin '{name}' failed: {message}")]
    Plugin {
        /// Plugin indicator name.
        name: String,
        /// Underlying failure description.
        message: String,
    },

    /// Parameters were rejected by a calculator
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// Frame-level failure while reading or writing columns
    #[error(transparent)]
    Frame(#[from] FrameError),
}

impl IndicatorError {
    #[must_use]
    pub fn missing<S: Into<String>>(columns: Vec<S>) -> Self {
        Self::MissingColumn {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn invalid_params<S: Into<String>>(message: S) -> Self {
        Self::InvalidParams(message.into())
    }

    #[must_use]
    pub fn plugin<N: Into<String>, M: Into<String>>(name: N, message: M) -> Self {
        Self::Plugin {
            name: name.into(),
            message: message.into(),
        }
    }
}
