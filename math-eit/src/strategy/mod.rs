//! Inversion strategies
//!
//! Every algorithm is set up once from an [`EitModel`] and then maps a
//! (current, reference) frame pair to an [`Image`]. The orchestrator only
//! sees the [`Reconstructor`] trait; [`Algorithm::build`] is the one place
//! that picks a concrete type.

pub mod bp;
pub mod greit;
pub mod jac;

use crate::config::ReconstructionConfig;
use crate::error::{EitError, Result};
use crate::image::{Image, ImageKind};
use crate::model::EitModel;
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use bp::BackProjection;
pub use greit::Greit;
pub use jac::JacobianSolver;

/// A configured inversion operator
pub trait Reconstructor: Send {
    /// Shape of the images this strategy returns
    fn kind(&self) -> ImageKind;

    /// Number of measurements a frame must carry
    fn num_measurements(&self) -> usize;

    /// Conductivity change between `reference` and `current`
    fn reconstruct(&self, current: &[f64], reference: &[f64]) -> Result<Image>;
}

/// Selectable reconstruction algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Algorithm {
    #[serde(alias = "bp")]
    BackProjection,
    #[default]
    #[serde(alias = "jac")]
    Jacobian,
    Greit,
}

impl Algorithm {
    /// Build the operator for `model` with the parameters in `config`
    pub fn build(
        self,
        model: &EitModel,
        config: &ReconstructionConfig,
    ) -> Result<Box<dyn Reconstructor>> {
        let strategy: Box<dyn Reconstructor> = match self {
            Algorithm::BackProjection => Box::new(BackProjection::new(model, &config.bp)?),
            Algorithm::Jacobian => Box::new(JacobianSolver::new(model, &config.jac)?),
            Algorithm::Greit => Box::new(Greit::new(model, &config.greit)?),
        };
        Ok(strategy)
    }

    pub fn image_kind(self) -> ImageKind {
        match self {
            Algorithm::BackProjection => ImageKind::Elements,
            Algorithm::Jacobian => ImageKind::Nodes,
            Algorithm::Greit => ImageKind::Grid,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::BackProjection => "back_projection",
            Algorithm::Jacobian => "jacobian",
            Algorithm::Greit => "greit",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = EitError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "back_projection" | "bp" => Ok(Algorithm::BackProjection),
            "jacobian" | "jac" => Ok(Algorithm::Jacobian),
            "greit" => Ok(Algorithm::Greit),
            other => Err(EitError::Configuration(format!(
                "unsupported algorithm '{other}'"
            ))),
        }
    }
}

/// Check both frames against the operator size
pub(crate) fn check_frames(expected: usize, current: &[f64], reference: &[f64]) -> Result<()> {
    if current.is_empty() {
        return Err(EitError::EmptyFrame);
    }
    for actual in [current.len(), reference.len()] {
        if actual != expected {
            return Err(EitError::Data { expected, actual });
        }
    }
    Ok(())
}

/// `current - reference`, divided by `|reference|` when `normalize` is set
pub(crate) fn frame_difference(current: &[f64], reference: &[f64], normalize: bool) -> Array1<f64> {
    current
        .iter()
        .zip(reference)
        .map(|(&v1, &v0)| if normalize { (v1 - v0) / v0.abs() } else { v1 - v0 })
        .collect()
}

/// Gram-Schmidt difference `current - a·reference` with
/// `a = ⟨current, reference⟩ / ⟨reference, reference⟩`
pub(crate) fn projected_difference(current: &[f64], reference: &[f64]) -> Array1<f64> {
    let num: f64 = current.iter().zip(reference).map(|(a, b)| a * b).sum();
    let den: f64 = reference.iter().map(|b| b * b).sum();
    let a = if den > 0.0 { num / den } else { 0.0 };
    current
        .iter()
        .zip(reference)
        .map(|(&v1, &v0)| v1 - a * v0)
        .collect()
}

pub(crate) fn ensure_finite(values: &Array1<f64>) -> Result<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(EitError::Runtime("reconstruction produced non-finite values".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_algorithm_names() {
        assert_eq!("bp".parse::<Algorithm>().expect("bp"), Algorithm::BackProjection);
        assert_eq!("JAC".parse::<Algorithm>().expect("jac"), Algorithm::Jacobian);
        assert_eq!("greit".parse::<Algorithm>().expect("greit"), Algorithm::Greit);
        assert!("radon".parse::<Algorithm>().unwrap_err().is_configuration_error());
        assert_eq!(Algorithm::Greit.to_string(), "greit");

        let alg: Algorithm = serde_json::from_str("\"bp\"").expect("alias");
        assert_eq!(alg, Algorithm::BackProjection);
    }

    #[test]
    fn test_check_frames() {
        assert!(check_frames(3, &[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]).is_ok());
        assert!(matches!(check_frames(3, &[], &[]), Err(EitError::EmptyFrame)));
        assert!(matches!(
            check_frames(3, &[1.0, 2.0, 3.0], &[1.0]),
            Err(EitError::Data {
                expected: 3,
                actual: 1
            })
        ));
    }

    #[test]
    fn test_differences() {
        let dv = frame_difference(&[2.0, 1.0], &[1.0, -2.0], true);
        assert_eq!(dv.to_vec(), vec![1.0, 1.5]);
        let gs = projected_difference(&[2.0, 4.0], &[1.0, 2.0]);
        assert!(gs.iter().all(|v| v.abs() < 1e-12));
    }
}
