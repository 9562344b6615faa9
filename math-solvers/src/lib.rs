//! Dense and sparse linear solvers for the EIT forward and inverse problems
//!
//! # Features
//!
//! - **Direct Solvers**: LU decomposition with partial pivoting, multi-RHS solve, inverse
//! - **Iterative Solvers**: Conjugate Gradient (plain or Jacobi)
//! - **Sparse Matrices**: CSR format assembled from triplets
//! - **Generic Scalar Types**: `f64` and `Complex64`
//!
//! # Example
//!
//! ```ignore
//! use math_eit_solvers::{CsrMatrix, lu_factorize};
//!
//! let k = CsrMatrix::from_triplets(n, n, triplets);
//! let lu = lu_factorize(&k.to_dense())?;
//! let phi = lu.solve(&rhs)?;
//! ```

pub mod direct;
pub mod iterative;
pub mod sparse;
pub mod traits;

pub use direct::{LuError, LuFactorization, lu_factorize, lu_inverse, lu_solve};
pub use iterative::{CgConfig, CgSolution, cg};
pub use sparse::CsrMatrix;
pub use traits::{ComplexField, LinearOperator};
