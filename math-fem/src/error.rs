//! Error types for the forward model

use math_eit_solvers::LuError;
use thiserror::Error;

/// Errors raised while setting up or solving the forward problem
#[derive(Debug, Error)]
pub enum FemError {
    /// The stiffness matrix could not be factored (degenerate mesh or
    /// non-positive permittivity)
    #[error("Stiffness matrix is singular: {0}")]
    SingularStiffness(#[from] LuError),

    /// Iterative solve did not reach its tolerance
    #[error("Conjugate gradient stalled after {iterations} iterations (residual {residual:.3e})")]
    ConvergenceFailure { iterations: usize, residual: f64 },

    /// The solve produced NaN or infinite potentials
    #[error("Forward solve produced non-finite potentials")]
    NonFinite,

    /// Input sizes do not agree
    #[error("{what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Invalid stimulation pattern, measurement protocol or solver choice
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Reading a stimulation file failed for a reason other than absence
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FemError {
    /// Errors caused by the inputs rather than by the numerics
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            FemError::Configuration(_) | FemError::DimensionMismatch { .. } | FemError::Io(_)
        )
    }

    /// Errors raised by the linear solver
    pub fn is_solver_error(&self) -> bool {
        matches!(
            self,
            FemError::SingularStiffness(_) | FemError::ConvergenceFailure { .. } | FemError::NonFinite
        )
    }
}

pub type Result<T> = std::result::Result<T, FemError>;
