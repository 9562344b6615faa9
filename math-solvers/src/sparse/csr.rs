//! Compressed Sparse Row (CSR) matrix format
//!
//! CSR format stores:
//! - `values`: Non-zero entries in row-major order
//! - `col_indices`: Column index for each value
//! - `row_ptrs`: Index into values/col_indices where each row starts
//!
//! Global stiffness matrices are built from per-element triplets, so
//! [`CsrMatrix::from_triplets`] sums duplicate entries.

use crate::traits::{ComplexField, LinearOperator};
use ndarray::{Array1, Array2};
use std::ops::Range;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Rows needed before the parallel matvec pays for itself
#[cfg(feature = "rayon")]
const PARALLEL_ROW_THRESHOLD: usize = 512;

/// Compressed Sparse Row (CSR) matrix format
#[derive(Debug, Clone)]
pub struct CsrMatrix<T: ComplexField> {
    /// Number of rows
    pub num_rows: usize,
    /// Number of columns
    pub num_cols: usize,
    /// Non-zero values in row-major order
    pub values: Vec<T>,
    /// Column indices for each value
    pub col_indices: Vec<usize>,
    /// row_ptrs[i] is the start index in values/col_indices for row i,
    /// row_ptrs[num_rows] = nnz
    pub row_ptrs: Vec<usize>,
}

impl<T: ComplexField> CsrMatrix<T> {
    /// Create a new empty CSR matrix
    pub fn new(num_rows: usize, num_cols: usize) -> Self {
        Self {
            num_rows,
            num_cols,
            values: Vec::new(),
            col_indices: Vec::new(),
            row_ptrs: vec![0; num_rows + 1],
        }
    }

    /// Create a CSR matrix from COO (Coordinate) format triplets
    ///
    /// Triplets are (row, col, value). Duplicate entries are summed.
    pub fn from_triplets(
        num_rows: usize,
        num_cols: usize,
        mut triplets: Vec<(usize, usize, T)>,
    ) -> Self {
        if triplets.is_empty() {
            return Self::new(num_rows, num_cols);
        }

        triplets.sort_unstable_by_key(|&(r, c, _)| (r, c));

        let mut values: Vec<T> = Vec::with_capacity(triplets.len());
        let mut col_indices = Vec::with_capacity(triplets.len());
        let mut row_counts = vec![0usize; num_rows];
        let mut last: Option<(usize, usize)> = None;

        for (row, col, val) in triplets {
            if last == Some((row, col)) {
                if let Some(v) = values.last_mut() {
                    *v += val;
                }
                continue;
            }
            values.push(val);
            col_indices.push(col);
            row_counts[row] += 1;
            last = Some((row, col));
        }

        let mut row_ptrs = Vec::with_capacity(num_rows + 1);
        row_ptrs.push(0);
        let mut acc = 0;
        for count in row_counts {
            acc += count;
            row_ptrs.push(acc);
        }

        Self {
            num_rows,
            num_cols,
            values,
            col_indices,
            row_ptrs,
        }
    }

    /// Create identity matrix in CSR format
    pub fn identity(n: usize) -> Self {
        Self {
            num_rows: n,
            num_cols: n,
            values: vec![T::one(); n],
            col_indices: (0..n).collect(),
            row_ptrs: (0..=n).collect(),
        }
    }

    /// Number of non-zero entries
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Get the range of indices in values/col_indices for a given row
    pub fn row_range(&self, row: usize) -> Range<usize> {
        self.row_ptrs[row]..self.row_ptrs[row + 1]
    }

    /// Get the (col, value) pairs for a row
    pub fn row_entries(&self, row: usize) -> impl Iterator<Item = (usize, T)> + '_ {
        let range = self.row_range(row);
        self.col_indices[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    /// Get element at (i, j), returns 0 if not stored
    pub fn get(&self, i: usize, j: usize) -> T {
        self.row_entries(i)
            .find(|&(c, _)| c == j)
            .map_or(T::zero(), |(_, v)| v)
    }

    /// Extract diagonal elements
    pub fn diagonal(&self) -> Array1<T> {
        let n = self.num_rows.min(self.num_cols);
        Array1::from_iter((0..n).map(|i| self.get(i, i)))
    }

    /// Replace row and column `dof` by the identity row/column.
    ///
    /// Used to ground one node of a Neumann problem. The diagonal entry
    /// must already be stored, which holds for any node that belongs to an
    /// element.
    pub fn pin_dof(&mut self, dof: usize) {
        for row in 0..self.num_rows {
            for idx in self.row_range(row) {
                let col = self.col_indices[idx];
                if row == dof || col == dof {
                    self.values[idx] = if row == col { T::one() } else { T::zero() };
                }
            }
        }
    }

    /// Matrix-vector product: y = A * x
    pub fn matvec(&self, x: &Array1<T>) -> Array1<T> {
        assert_eq!(x.len(), self.num_cols, "Input vector size mismatch");

        #[cfg(feature = "rayon")]
        {
            if self.num_rows >= PARALLEL_ROW_THRESHOLD {
                let rows: Vec<T> = (0..self.num_rows)
                    .into_par_iter()
                    .map(|i| self.row_dot(i, x))
                    .collect();
                return Array1::from_vec(rows);
            }
        }

        Array1::from_iter((0..self.num_rows).map(|i| self.row_dot(i, x)))
    }

    #[inline]
    fn row_dot(&self, row: usize, x: &Array1<T>) -> T {
        self.row_entries(row)
            .fold(T::zero(), |acc, (j, v)| acc + v * x[j])
    }

    /// Transpose matrix-vector product: y = A^T * x
    pub fn matvec_transpose(&self, x: &Array1<T>) -> Array1<T> {
        assert_eq!(x.len(), self.num_rows, "Input vector size mismatch");

        let mut y = Array1::from_elem(self.num_cols, T::zero());
        for i in 0..self.num_rows {
            for (j, v) in self.row_entries(i) {
                y[j] += v * x[i];
            }
        }
        y
    }

    /// Convert to dense matrix
    pub fn to_dense(&self) -> Array2<T> {
        let mut dense = Array2::from_elem((self.num_rows, self.num_cols), T::zero());
        for i in 0..self.num_rows {
            for (j, v) in self.row_entries(i) {
                dense[[i, j]] = v;
            }
        }
        dense
    }
}

impl<T: ComplexField> LinearOperator<T> for CsrMatrix<T> {
    fn num_rows(&self) -> usize {
        self.num_rows
    }

    fn num_cols(&self) -> usize {
        self.num_cols
    }

    fn apply(&self, x: &Array1<T>) -> Array1<T> {
        self.matvec(x)
    }

    fn apply_transpose(&self, x: &Array1<T>) -> Array1<T> {
        self.matvec_transpose(x)
    }
}
