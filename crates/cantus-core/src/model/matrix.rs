use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A dense row-major matrix of `f64` features.
///
/// Rows are dataset items, columns are pixel intensities (or any fixed-length
/// feature). Every row has the same length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawMatrix")]
pub struct FeatureMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

#[derive(Deserialize)]
struct RawMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl TryFrom<RawMatrix> for FeatureMatrix {
    type Error = Error;

    fn try_from(raw: RawMatrix) -> Result<Self> {
        Self::from_row_major(raw.rows, raw.cols, raw.data)
    }
}

impl FeatureMatrix {
    /// Wrap a row-major buffer of `rows * cols` values.
    pub fn from_row_major(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self> {
        if rows.checked_mul(cols) != Some(data.len()) {
            return Err(Error::InvalidData(format!(
                "matrix of {rows}x{cols} cannot hold {} values",
                data.len()
            )));
        }
        Ok(Self { rows, cols, data })
    }

    /// Stack equal-length rows into a matrix.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let n_rows = rows.len();
        let mut data = Vec::with_capacity(n_rows * cols);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != cols {
                return Err(Error::InvalidData(format!(
                    "row {i} has {} columns, expected {cols}",
                    row.len()
                )));
            }
            data.extend(row);
        }
        Ok(Self {
            rows: n_rows,
            cols,
            data,
        })
    }

    #[must_use]
    pub const fn n_rows(&self) -> usize {
        self.rows
    }

    #[must_use]
    pub const fn n_cols(&self) -> usize {
        self.cols
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Borrow row `i`.
    ///
    /// # Panics
    /// Panics if `i >= n_rows()`.
    #[must_use]
    pub fn row(&self, i: usize) -> &[f64] {
        let start = i * self.cols;
        &self.data[start..start + self.cols]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.rows).map(move |i| self.row(i))
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }
}
