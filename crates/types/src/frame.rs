//! Columnar OHLCV frame.
//!
//! A [`SeriesFrame`] holds one time axis plus named `f64` columns of equal
//! length. Column order is insertion order, which keeps output stable across
//! repeated indicator runs.

use indexmap::IndexMap;

use crate::error::FrameError;
use crate::row::OhlcvRow;

/// The five columns every frame must carry before indicators run.
pub const CORE_COLUMNS: [&str; 5] = ["open", "high", "low", "close", "volume"];

/// Columnar OHLCV series with arbitrary named `f64` columns attached.
///
/// Invariants held by construction and every mutator:
/// - all columns have exactly `timestamps.len()` values;
/// - timestamps are strictly increasing.
#[derive(Debug, Clone, Default)]
pub struct SeriesFrame {
    timestamps: Vec<i64>,
    columns: IndexMap<String, Vec<f64>>,
}

impl SeriesFrame {
    /// Builds a frame from row-shaped bars.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnorderedTimestamps`] if timestamps are not
    /// strictly increasing.
    pub fn from_ohlcv(rows: &[OhlcvRow]) -> Result<Self, FrameError> {
        let mut timestamps = Vec::with_capacity(rows.len());
        let mut open = Vec::with_capacity(rows.len());
        let mut high = Vec::with_capacity(rows.len());
        let mut low = Vec::with_capacity(rows.len());
        let mut close = Vec::with_capacity(rows.len());
        let mut volume = Vec::with_capacity(rows.len());

        for (i, row) in rows.iter().enumerate() {
            if let Some(&prev) = timestamps.last() {
                if row.timestamp_ns <= prev {
                    return Err(FrameError::UnorderedTimestamps { row: i });
                }
            }
            timestamps.push(row.timestamp_ns);
            open.push(row.open);
            high.push(row.high);
            low.push(row.low);
            close.push(row.close);
            volume.push(row.volume);
        }

        let mut columns = IndexMap::with_capacity(CORE_COLUMNS.len());
        columns.insert("open".to_string(), open);
        columns.insert("high".to_string(), high);
        columns.insert("low".to_string(), low);
        columns.insert("close".to_string(), close);
        columns.insert("volume".to_string(), volume);

        Ok(Self { timestamps, columns })
    }

    /// Builds a frame from a time axis and named columns.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::LengthMismatch`] if any column's length differs
    /// from the time axis, or [`FrameError::UnorderedTimestamps`] if the axis
    /// is not strictly increasing.
    pub fn from_columns(
        timestamps: Vec<i64>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, FrameError> {
        for (i, win) in timestamps.windows(2).enumerate() {
            if win[1] <= win[0] {
                return Err(FrameError::UnorderedTimestamps { row: i + 1 });
            }
        }
        let mut map = IndexMap::with_capacity(columns.len());
        for (name, values) in columns {
            if values.len() != timestamps.len() {
                return Err(FrameError::LengthMismatch {
                    name,
                    expected: timestamps.len(),
                    actual: values.len(),
                });
            }
            map.insert(name, values);
        }
        Ok(Self {
            timestamps,
            columns: map,
        })
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// The time axis, Unix epoch nanoseconds.
    #[must_use]
    pub fn timestamps(&self) -> &[i64] {
        &self.timestamps
    }

    /// Borrows a column by name, `None` if absent.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Column names in insertion order.
    #[must_use]
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.keys().map(String::as_str).collect()
    }

    /// Inserts or overwrites one column.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::LengthMismatch`] if `values.len() != self.len()`.
    pub fn insert_column(&mut self, name: &str, values: Vec<f64>) -> Result<(), FrameError> {
        if values.len() != self.len() {
            return Err(FrameError::LengthMismatch {
                name: name.to_string(),
                expected: self.len(),
                actual: values.len(),
            });
        }
        self.columns.insert(name.to_string(), values);
        Ok(())
    }

    /// Inserts a batch of columns atomically: either all land or none do.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::LengthMismatch`] for the first bad column; the
    /// frame is untouched in that case.
    pub fn append_columns(&mut self, columns: Vec<(String, Vec<f64>)>) -> Result<(), FrameError> {
        for (name, values) in &columns {
            if values.len() != self.len() {
                return Err(FrameError::LengthMismatch {
                    name: name.clone(),
                    expected: self.len(),
                    actual: values.len(),
                });
            }
        }
        for (name, values) in columns {
            self.columns.insert(name, values);
        }
        Ok(())
    }

    /// Removes the named columns; absent names are ignored. Returns how many
    /// were actually removed.
    pub fn drop_columns(&mut self, names: &[String]) -> usize {
        let mut removed = 0;
        for name in names {
            if self.columns.shift_remove(name).is_some() {
                removed += 1;
            }
        }
        removed
    }

    /// Keeps only the columns whose names the predicate accepts.
    pub fn retain_columns<F: FnMut(&str) -> bool>(&mut self, mut keep: F) {
        self.columns.retain(|name, _| keep(name));
    }

    /// Materializes the core columns as rows.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::MissingColumn`] if any core column is absent.
    pub fn rows(&self) -> Result<Vec<OhlcvRow>, FrameError> {
        let core: Vec<&[f64]> = CORE_COLUMNS
            .iter()
            .map(|name| {
                self.column(name).ok_or_else(|| FrameError::MissingColumn {
                    name: (*name).to_string(),
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(self
            .timestamps
            .iter()
            .enumerate()
            .map(|(i, &ts)| OhlcvRow {
                timestamp_ns: ts,
                open: core[0][i],
                high: core[1][i],
                low: core[2][i],
                close: core[3][i],
                volume: core[4][i],
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_rows(n: usize) -> Vec<OhlcvRow> {
        (0..n)
            .map(|i| {
                let base = 100.0 + i as f64;
                OhlcvRow::new(i as i64 * 60_000_000_000, base, base + 1.0, base - 1.0, base + 0.5, 1000.0)
            })
            .collect()
    }

    #[test]
    fn test_from_ohlcv_core_columns() {
        let frame = SeriesFrame::from_ohlcv(&make_rows(5)).unwrap();
        assert_eq!(frame.len(), 5);
        for name in CORE_COLUMNS {
            assert!(frame.has_column(name), "missing {name}");
        }
        assert_eq!(frame.column("close").unwrap()[0], 100.5);
    }

    #[test]
    fn test_from_ohlcv_rejects_unordered() {
        let mut rows = make_rows(3);
        rows[2].timestamp_ns = rows[1].timestamp_ns;
        let err = SeriesFrame::from_ohlcv(&rows).unwrap_err();
        assert!(matches!(err, FrameError::UnorderedTimestamps { row: 2 }));
    }

    #[test]
    fn test_from_columns_length_check() {
        let err = SeriesFrame::from_columns(
            vec![1, 2, 3],
            vec![("close".to_string(), vec![1.0, 2.0])],
        )
        .unwrap_err();
        assert!(matches!(err, FrameError::LengthMismatch { expected: 3, actual: 2, .. }));
    }

    #[test]
    fn test_insert_and_drop_roundtrip() {
        let mut frame = SeriesFrame::from_ohlcv(&make_rows(4)).unwrap();
        frame.insert_column("ma5", vec![1.0; 4]).unwrap();
        assert!(frame.has_column("ma5"));
        let removed = frame.drop_columns(&["ma5".to_string(), "nope".to_string()]);
        assert_eq!(removed, 1);
        assert!(!frame.has_column("ma5"));
    }

    #[test]
    fn test_append_columns_is_atomic() {
        let mut frame = SeriesFrame::from_ohlcv(&make_rows(4)).unwrap();
        let err = frame.append_columns(vec![
            ("a".to_string(), vec![1.0; 4]),
            ("b".to_string(), vec![1.0; 3]),
        ]);
        assert!(err.is_err());
        assert!(!frame.has_column("a"));
        assert!(!frame.has_column("b"));
    }

    #[test]
    fn test_retain_columns() {
        let mut frame = SeriesFrame::from_ohlcv(&make_rows(2)).unwrap();
        frame.insert_column("rsi14", vec![50.0; 2]).unwrap();
        frame.retain_columns(|name| CORE_COLUMNS.contains(&name));
        assert!(!frame.has_column("rsi14"));
        assert_eq!(frame.column_names().len(), CORE_COLUMNS.len());
    }

    #[test]
    fn test_rows_roundtrip() {
        let rows = make_rows(3);
        let frame = SeriesFrame::from_ohlcv(&rows).unwrap();
        assert_eq!(frame.rows().unwrap(), rows);
    }
}
