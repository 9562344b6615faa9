//! LU decomposition solver
//!
//! LU factorization with partial pivoting for dense systems. The stiffness
//! matrix is factored once per permittivity and reused for every stimulation
//! line and every electrode unit vector, so the factor object is the main API.

use crate::traits::ComplexField;
use ndarray::{Array1, Array2, ArrayView1};
use thiserror::Error;

/// Pivots smaller than this fraction of the largest entry are treated as zero
const RELATIVE_PIVOT_TOLERANCE: f64 = 1e-13;

/// Errors that can occur during LU factorization
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LuError {
    #[error("Matrix is singular or nearly singular (pivot {pivot:.3e} at column {column})")]
    SingularMatrix { column: usize, pivot: f64 },
    #[error("Matrix dimensions mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// LU factorization result
///
/// Stores L and U factors along with pivot information
#[derive(Debug, Clone)]
pub struct LuFactorization<T: ComplexField> {
    /// Combined L and U matrices (L is unit lower triangular, stored below diagonal)
    pub lu: Array2<T>,
    /// Row permutation applied during factorization
    pub pivots: Vec<usize>,
    /// Matrix dimension
    pub n: usize,
}

impl<T: ComplexField> LuFactorization<T> {
    /// Solve Ax = b using the pre-computed LU factorization
    pub fn solve(&self, b: &Array1<T>) -> Result<Array1<T>, LuError> {
        self.solve_view(b.view())
    }

    fn solve_view(&self, b: ArrayView1<'_, T>) -> Result<Array1<T>, LuError> {
        if b.len() != self.n {
            return Err(LuError::DimensionMismatch {
                expected: self.n,
                got: b.len(),
            });
        }

        let mut x: Array1<T> = self.pivots.iter().map(|&p| b[p]).collect();

        // Ly = Pb
        for i in 0..self.n {
            let mut acc = x[i];
            for j in 0..i {
                acc -= self.lu[[i, j]] * x[j];
            }
            x[i] = acc;
        }

        // Ux = y
        for i in (0..self.n).rev() {
            let mut acc = x[i];
            for j in (i + 1)..self.n {
                acc -= self.lu[[i, j]] * x[j];
            }
            x[i] = acc * self.lu[[i, i]].inv();
        }

        Ok(x)
    }

    /// Solve AX = B column by column
    pub fn solve_matrix(&self, b: &Array2<T>) -> Result<Array2<T>, LuError> {
        if b.nrows() != self.n {
            return Err(LuError::DimensionMismatch {
                expected: self.n,
                got: b.nrows(),
            });
        }
        let mut x = Array2::from_elem(b.raw_dim(), T::zero());
        for (j, col) in b.columns().into_iter().enumerate() {
            let xj = self.solve_view(col)?;
            x.column_mut(j).assign(&xj);
        }
        Ok(x)
    }

    /// Explicit inverse A⁻¹
    pub fn inverse(&self) -> Array2<T> {
        let mut inv = Array2::from_elem((self.n, self.n), T::zero());
        let mut e = Array1::from_elem(self.n, T::zero());
        for j in 0..self.n {
            e[j] = T::one();
            // dimensions match by construction
            if let Ok(col) = self.solve(&e) {
                inv.column_mut(j).assign(&col);
            }
            e[j] = T::zero();
        }
        inv
    }
}

/// Compute LU factorization with partial pivoting
pub fn lu_factorize<T: ComplexField>(a: &Array2<T>) -> Result<LuFactorization<T>, LuError> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(LuError::DimensionMismatch {
            expected: n,
            got: a.ncols(),
        });
    }

    let scale = a.iter().fold(0.0_f64, |m, v| m.max(v.norm()));
    let threshold = if scale > 0.0 {
        scale * RELATIVE_PIVOT_TOLERANCE
    } else {
        f64::MIN_POSITIVE
    };

    let mut lu = a.clone();
    let mut pivots: Vec<usize> = (0..n).collect();

    for k in 0..n {
        let mut max_val = lu[[k, k]].norm();
        let mut max_row = k;
        for i in (k + 1)..n {
            let val = lu[[i, k]].norm();
            if val > max_val {
                max_val = val;
                max_row = i;
            }
        }

        if max_val.is_nan() || max_val <= threshold {
            return Err(LuError::SingularMatrix {
                column: k,
                pivot: max_val,
            });
        }

        if max_row != k {
            for j in 0..n {
                lu.swap([k, j], [max_row, j]);
            }
            pivots.swap(k, max_row);
        }

        let pivot_inv = lu[[k, k]].inv();
        for i in (k + 1)..n {
            let mult = lu[[i, k]] * pivot_inv;
            lu[[i, k]] = mult;
            if mult.norm_sqr() == 0.0 {
                continue;
            }
            for j in (k + 1)..n {
                let update = mult * lu[[k, j]];
                lu[[i, j]] -= update;
            }
        }
    }

    Ok(LuFactorization { lu, pivots, n })
}

/// Solve Ax = b using LU decomposition
pub fn lu_solve<T: ComplexField>(a: &Array2<T>, b: &Array1<T>) -> Result<Array1<T>, LuError> {
    lu_factorize(a)?.solve(b)
}

/// Invert a dense square matrix
pub fn lu_inverse<T: ComplexField>(a: &Array2<T>) -> Result<Array2<T>, LuError> {
    Ok(lu_factorize(a)?.inverse())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;
    use num_complex::Complex64;

    #[test]
    fn test_lu_solve_real() {
        let a = array![[4.0_f64, 1.0], [1.0, 3.0]];
        let b = array![1.0_f64, 2.0];

        let x = lu_solve(&a, &b).expect("LU solve should succeed");

        let ax = a.dot(&x);
        for i in 0..2 {
            assert_relative_eq!(ax[i], b[i], epsilon = 1e-10);
        }
    }

    #[test]
    fn test_lu_solve_complex() {
        let a = array![
            [Complex64::new(4.0, 1.0), Complex64::new(1.0, 0.0)],
            [Complex64::new(1.0, 0.0), Complex64::new(3.0, -1.0)],
        ];
        let b = array![Complex64::new(1.0, 1.0), Complex64::new(2.0, -1.0)];

        let x = lu_solve(&a, &b).expect("LU solve should succeed");

        let ax = a.dot(&x);
        for i in 0..2 {
            assert_relative_eq!((ax[i] - b[i]).norm(), 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn test_lu_requires_pivoting() {
        let a = array![[0.0_f64, 2.0, 1.0], [1.0, 1.0, 0.0], [3.0, 0.0, 1.0]];
        let b = array![3.0_f64, 2.0, 4.0];

        let x = lu_solve(&a, &b).expect("LU solve should succeed");
        let ax = a.dot(&x);
        for i in 0..3 {
            assert_relative_eq!(ax[i], b[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_lu_singular() {
        let a = array![[1.0_f64, 2.0], [2.0, 4.0]];
        let b = array![1.0_f64, 2.0];

        let result = lu_solve(&a, &b);
        assert!(matches!(result, Err(LuError::SingularMatrix { column: 1, .. })));
    }

    #[test]
    fn test_lu_zero_row_is_singular() {
        let a = array![[2.0_f64, 0.0, 0.0], [0.0, 0.0, 0.0], [0.0, 0.0, 1.0]];
        assert!(lu_factorize(&a).is_err());
    }

    #[test]
    fn test_lu_not_square() {
        let a = Array2::<f64>::zeros((2, 3));
        assert_eq!(
            lu_factorize(&a).unwrap_err(),
            LuError::DimensionMismatch {
                expected: 2,
                got: 3
            }
        );
    }

    #[test]
    fn test_inverse_and_multiple_rhs() {
        let a = array![[4.0_f64, 1.0, 0.0], [1.0, 3.0, 1.0], [0.0, 1.0, 2.0]];
        let factorization = lu_factorize(&a).expect("Factorization should succeed");

        let inv = factorization.inverse();
        let eye = a.dot(&inv);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_relative_eq!(eye[[i, j]], expected, epsilon = 1e-12);
            }
        }

        let rhs = array![[1.0_f64, 4.0], [2.0, 5.0], [3.0, 6.0]];
        let x = factorization.solve_matrix(&rhs).expect("Solve should succeed");
        let ax = a.dot(&x);
        for i in 0..3 {
            for j in 0..2 {
                assert_relative_eq!(ax[[i, j]], rhs[[i, j]], epsilon = 1e-10);
            }
        }
    }
}
