//! Kline Types
//!
//! Core data structures for the kline technical-analysis engine.
//! This crate provides the columnar OHLCV series container consumed and
//! extended by the indicator subsystem, plus the row-oriented view used
//! at the plugin boundary.

#![deny(clippy::all)]

pub mod error;
pub mod frame;
pub mod row;

// Re-export main types for convenience
pub use error::FrameError;
pub use frame::{SeriesFrame, CORE_COLUMNS};
pub use row::OhlcvRow;
