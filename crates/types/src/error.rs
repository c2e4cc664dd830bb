//! Frame error types.

use thiserror::Error;

/// Errors raised while constructing or mutating a [`SeriesFrame`](crate::SeriesFrame).
#[derive(Debug, Error)]
pub enum FrameError {
    /// A column's length does not match the frame's row count
    #[error("column '{name}' has {actual} values, frame has {expected} rows")]
    LengthMismatch {
        /// Offending column name.
        name: String,
        /// Row count of the frame.
        expected: usize,
        /// Length of the rejected column.
        actual: usize,
    },

    /// Timestamps are not strictly increasing (unsorted or duplicated)
    #[error("timestamps not strictly increasing at row {row}")]
    UnorderedTimestamps {
        /// Index of the first out-of-order row.
        row: usize,
    },

    /// A required column is absent from the frame
    #[error("missing column '{name}'")]
    MissingColumn {
        /// Name of the absent column.
        name: String,
    },
}
