//! Direct solvers for dense linear systems
//!
//! - [`lu_factorize`]: LU decomposition with partial pivoting
//! - [`lu_solve`] / [`lu_inverse`]: one-shot helpers on top of it

mod lu;

pub use lu::{LuError, LuFactorization, lu_factorize, lu_inverse, lu_solve};
