//! Column-major matrix type for spatial designs and per-unit coefficient tables.
//!
//! [`SdMatrix`] provides safe, dimension-tracked access to the flat
//! column-major layout used throughout this crate. Rows index spatial units,
//! columns index covariates (for design matrices) or coefficients (for GWR
//! output tables). It eliminates manual `data[i + j * n]` index arithmetic and
//! carries dimensions alongside the data.

use nalgebra::DMatrix;

/// Column-major matrix over spatial units.
///
/// Stores data in a flat `Vec<f64>` with column-major (Fortran) layout:
/// element `(row, col)` is at index `row + col * nrows`.
///
/// # Examples
///
/// ```
/// use sdars_core::matrix::SdMatrix;
///
/// // 3 units, 2 covariates
/// let x = SdMatrix::from_column_major(
///     vec![
///         1.0, 2.0, 3.0, // covariate 0 across all units
///         4.0, 5.0, 6.0, // covariate 1
///     ],
///     3,
///     2,
/// )
/// .unwrap();
///
/// assert_eq!(x[(0, 0)], 1.0);
/// assert_eq!(x[(2, 1)], 6.0);
/// assert_eq!(x.column(1), &[4.0, 5.0, 6.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SdMatrix {
    data: Vec<f64>,
    nrows: usize,
    ncols: usize,
}

impl SdMatrix {
    /// Create from flat column-major data with dimension validation.
    ///
    /// Returns `None` if `data.len() != nrows * ncols`.
    pub fn from_column_major(data: Vec<f64>, nrows: usize, ncols: usize) -> Option<Self> {
        if data.len() != nrows * ncols {
            return None;
        }
        Some(Self { data, nrows, ncols })
    }

    /// Create from a list of columns, each of equal length.
    ///
    /// Returns `None` if the columns have unequal lengths or there are none.
    pub fn from_columns(columns: &[Vec<f64>]) -> Option<Self> {
        let ncols = columns.len();
        if ncols == 0 {
            return None;
        }
        let nrows = columns[0].len();
        if columns.iter().any(|c| c.len() != nrows) {
            return None;
        }
        let mut data = Vec::with_capacity(nrows * ncols);
        for col in columns {
            data.extend_from_slice(col);
        }
        Some(Self { data, nrows, ncols })
    }

    /// Create a zero-filled matrix.
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            data: vec![0.0; nrows * ncols],
            nrows,
            ncols,
        }
    }

    /// Number of rows (spatial units).
    #[inline]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    /// Dimensions as `(nrows, ncols)`.
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }

    /// Whether the matrix holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get a contiguous column slice (zero-copy).
    ///
    /// # Panics
    /// Panics if `col >= ncols`.
    #[inline]
    pub fn column(&self, col: usize) -> &[f64] {
        let start = col * self.nrows;
        &self.data[start..start + self.nrows]
    }

    /// Extract a single row as a new `Vec<f64>`.
    ///
    /// O(ncols) because rows are not contiguous in column-major layout.
    pub fn row(&self, row: usize) -> Vec<f64> {
        (0..self.ncols)
            .map(|j| self.data[row + j * self.nrows])
            .collect()
    }

    /// Return a copy with `column` appended on the right.
    ///
    /// Returns `None` if the column length does not match `nrows`.
    /// Used to augment a design matrix with spatially lagged covariates.
    pub fn with_column(&self, column: &[f64]) -> Option<Self> {
        if column.len() != self.nrows {
            return None;
        }
        let mut data = Vec::with_capacity(self.data.len() + self.nrows);
        data.extend_from_slice(&self.data);
        data.extend_from_slice(column);
        Some(Self {
            data,
            nrows: self.nrows,
            ncols: self.ncols + 1,
        })
    }

    /// Flat slice of the underlying column-major data (zero-copy).
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Convert to a nalgebra `DMatrix<f64>`.
    ///
    /// Both use column-major layout, so this is a straight copy.
    pub fn to_dmatrix(&self) -> DMatrix<f64> {
        DMatrix::from_column_slice(self.nrows, self.ncols, &self.data)
    }

    /// Create from a nalgebra `DMatrix<f64>`.
    pub fn from_dmatrix(mat: &DMatrix<f64>) -> Self {
        let (nrows, ncols) = mat.shape();
        Self {
            data: mat.as_slice().to_vec(),
            nrows,
            ncols,
        }
    }

    /// Get element at (row, col) with bounds checking.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        if row < self.nrows && col < self.ncols {
            Some(self.data[row + col * self.nrows])
        } else {
            None
        }
    }
}

impl std::ops::Index<(usize, usize)> for SdMatrix {
    type Output = f64;

    #[inline]
    fn index(&self, (row, col): (usize, usize)) -> &f64 {
        debug_assert!(
            row < self.nrows && col < self.ncols,
            "SdMatrix index ({}, {}) out of bounds for {}x{} matrix",
            row,
            col,
            self.nrows,
            self.ncols
        );
        &self.data[row + col * self.nrows]
    }
}

impl std::ops::IndexMut<(usize, usize)> for SdMatrix {
    #[inline]
    fn index_mut(&mut self, (row, col): (usize, usize)) -> &mut f64 {
        debug_assert!(
            row < self.nrows && col < self.ncols,
            "SdMatrix index ({}, {}) out of bounds for {}x{} matrix",
            row,
            col,
            self.nrows,
            self.ncols
        );
        &mut self.data[row + col * self.nrows]
    }
}

impl std::fmt::Display for SdMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SdMatrix({}x{})", self.nrows, self.ncols)
    }
}
