//! Error taxonomy for reconstruction
//!
//! Configuration and solver errors are fatal for a configuration and keep
//! the orchestrator out of the running state. Data and runtime errors are
//! per frame: the frame is skipped and the loop continues.

use math_eit_fem::FemError;
use math_eit_mesh::MeshError;
use math_eit_solvers::LuError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EitError {
    /// Invalid electrode count, stimulation file, algorithm name or
    /// reference source
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Singular or degenerate system while building operators
    #[error("Solver error: {0}")]
    Solver(String),

    /// Frame length does not match the active configuration
    #[error("Frame has {actual} measurements, expected {expected}")]
    Data { expected: usize, actual: usize },

    #[error("Frame is empty")]
    EmptyFrame,

    /// Transient failure inside one reconstruction
    #[error("Reconstruction failed: {0}")]
    Runtime(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EitError {
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, EitError::Configuration(_))
    }

    /// True when the current configuration cannot be used at all
    pub fn is_fatal(&self) -> bool {
        matches!(self, EitError::Configuration(_) | EitError::Solver(_))
    }
}

impl From<FemError> for EitError {
    fn from(err: FemError) -> Self {
        if err.is_config_error() {
            EitError::Configuration(err.to_string())
        } else {
            EitError::Solver(err.to_string())
        }
    }
}

impl From<LuError> for EitError {
    fn from(err: LuError) -> Self {
        EitError::Solver(err.to_string())
    }
}

impl From<MeshError> for EitError {
    fn from(err: MeshError) -> Self {
        match err {
            // the parameters were accepted but produced a degenerate mesh
            MeshError::Triangulation(_) | MeshError::OrphanedFixedPoint { .. } => {
                EitError::Solver(err.to_string())
            }
            _ => EitError::Configuration(err.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, EitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fem_errors_are_classified() {
        let err: EitError = FemError::Configuration("line count".into()).into();
        assert!(err.is_configuration_error());

        let err: EitError = FemError::NonFinite.into();
        assert!(matches!(err, EitError::Solver(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_mesh_errors_are_classified() {
        let err: EitError = MeshError::InvalidElectrodeCount { count: 2, min: 4 }.into();
        assert!(err.is_configuration_error());

        let err: EitError = MeshError::Triangulation("folded element".into()).into();
        assert!(matches!(err, EitError::Solver(_)));
        assert!(err.is_fatal());

        let err: EitError = MeshError::OrphanedFixedPoint { index: 3 }.into();
        assert!(matches!(err, EitError::Solver(_)));
    }

    #[test]
    fn test_data_errors_are_not_fatal() {
        let err = EitError::Data {
            expected: 208,
            actual: 192,
        };
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "Frame has 192 measurements, expected 208");
        assert!(!EitError::Runtime("nan".into()).is_fatal());
    }
}
