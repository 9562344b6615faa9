//! Core traits for the linear algebra used by the forward and inverse solvers
//!
//! - [`ComplexField`]: scalar types (real conductivity or complex admittivity)
//! - [`LinearOperator`]: matrix-like objects that can perform matrix-vector products

use ndarray::Array1;
use num_complex::Complex64;
use num_traits::{NumAssign, One, Zero};
use std::fmt::Debug;
use std::ops::Neg;

/// Scalar types usable in the stiffness system.
///
/// Provided for:
/// - `f64` (conductivity reconstruction, the common case)
/// - `Complex64` (complex admittivity, e.g. multi-frequency data)
///
/// Magnitudes are always reported as `f64`.
pub trait ComplexField:
    NumAssign + Clone + Copy + Send + Sync + Debug + Zero + One + Neg<Output = Self> + 'static
{
    /// Complex conjugate
    fn conj(&self) -> Self;

    /// Squared magnitude |z|²
    fn norm_sqr(&self) -> f64;

    /// Magnitude |z|
    fn norm(&self) -> f64 {
        self.norm_sqr().sqrt()
    }

    /// Create from a real value
    fn from_real(r: f64) -> Self;

    /// Real part
    fn re(&self) -> f64;

    /// Imaginary part
    fn im(&self) -> f64;

    /// Multiplicative inverse (1/z)
    fn inv(&self) -> Self;

    /// True when both parts are finite
    fn is_finite(&self) -> bool {
        self.re().is_finite() && self.im().is_finite()
    }
}

impl ComplexField for f64 {
    #[inline]
    fn conj(&self) -> Self {
        *self
    }

    #[inline]
    fn norm_sqr(&self) -> f64 {
        self * self
    }

    #[inline]
    fn norm(&self) -> f64 {
        self.abs()
    }

    #[inline]
    fn from_real(r: f64) -> Self {
        r
    }

    #[inline]
    fn re(&self) -> f64 {
        *self
    }

    #[inline]
    fn im(&self) -> f64 {
        0.0
    }

    #[inline]
    fn inv(&self) -> Self {
        1.0 / self
    }
}

impl ComplexField for Complex64 {
    #[inline]
    fn conj(&self) -> Self {
        Complex64::conj(self)
    }

    #[inline]
    fn norm_sqr(&self) -> f64 {
        self.re * self.re + self.im * self.im
    }

    #[inline]
    fn from_real(r: f64) -> Self {
        Complex64::new(r, 0.0)
    }

    #[inline]
    fn re(&self) -> f64 {
        self.re
    }

    #[inline]
    fn im(&self) -> f64 {
        self.im
    }

    #[inline]
    fn inv(&self) -> Self {
        let denom = self.norm_sqr();
        Complex64::new(self.re / denom, -self.im / denom)
    }
}

/// Anything that can apply itself to a vector.
pub trait LinearOperator<T: ComplexField>: Send + Sync {
    /// Number of rows in the operator
    fn num_rows(&self) -> usize;

    /// Number of columns in the operator
    fn num_cols(&self) -> usize;

    /// Apply the operator: y = A * x
    fn apply(&self, x: &Array1<T>) -> Array1<T>;

    /// Apply the transpose: y = A^T * x
    fn apply_transpose(&self, x: &Array1<T>) -> Array1<T>;

    /// Check if the operator is square
    fn is_square(&self) -> bool {
        self.num_rows() == self.num_cols()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_field() {
        let x = -4.0_f64;
        assert_eq!(x.norm(), 4.0);
        assert_eq!(x.conj(), x);
        assert_eq!(ComplexField::im(&x), 0.0);
        assert!((x.inv() + 0.25).abs() < 1e-15);
    }

    #[test]
    fn test_complex_field() {
        let z = Complex64::new(3.0, 4.0);
        assert!((ComplexField::norm(&z) - 5.0).abs() < 1e-12);
        let one = z * ComplexField::inv(&z);
        assert!((one.re - 1.0).abs() < 1e-12);
        assert!(one.im.abs() < 1e-12);
        assert!(ComplexField::is_finite(&z));
        assert!(!ComplexField::is_finite(&Complex64::new(f64::NAN, 0.0)));
    }
}
