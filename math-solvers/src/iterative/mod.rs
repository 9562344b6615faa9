//! Iterative solvers for linear systems
//!
//! - [`cg`]: Conjugate Gradient with optional Jacobi scaling, for symmetric
//!   positive definite systems such as a grounded real stiffness matrix

mod cg;

pub use cg::{CgConfig, CgSolution, cg};
