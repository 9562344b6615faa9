//! Back-projection along equipotential lines
//!
//! Each normalized voltage change is smeared back onto the nodes lying
//! between the two measuring electrodes' potentials, then averaged onto
//! elements. Cheap to set up and robust to model mismatch, but blurry.

use super::{Reconstructor, check_frames, ensure_finite, frame_difference, projected_difference};
use crate::error::{EitError, Result};
use crate::image::{Image, ImageKind};
use crate::interp::pts2sim;
use crate::model::EitModel;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Column weighting of the smear matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weight {
    #[default]
    None,
    /// Down-weight nodes by distance from the center:
    /// `w = (1.01·r - d) / (1.01·r)`
    Simple,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BpParams {
    pub weight: Weight,
    /// Divide the difference by the sign of the simulated voltages
    pub normalize: bool,
}

impl Default for BpParams {
    fn default() -> Self {
        Self {
            weight: Weight::None,
            normalize: true,
        }
    }
}

impl BpParams {
    pub fn validate(&self) -> Result<()> {
        Ok(())
    }
}

pub struct BackProjection {
    /// Weighted smear matrix, measurements × nodes
    h: Array2<f64>,
    /// Sign of the simulated voltages, 0 mapped to 1
    v0_sign: Array1<f64>,
    elements: Vec<[usize; 3]>,
    normalize: bool,
}

impl BackProjection {
    pub fn new(model: &EitModel, params: &BpParams) -> Result<Self> {
        let mut h = model.solution.b_matrix.clone();
        if params.weight == Weight::Simple {
            let w = simple_weight(&model.mesh.nodes);
            for mut row in h.rows_mut() {
                row *= &w;
            }
        }
        if h.sum() == 0.0 {
            return Err(EitError::Solver("smear matrix is empty".into()));
        }
        let v0_sign = model
            .solution
            .v
            .mapv(|v| if v < 0.0 { -1.0 } else { 1.0 });
        log::info!(
            "back-projection ready: {} measurements, {:?} weighting",
            h.nrows(),
            params.weight
        );
        Ok(Self {
            h,
            v0_sign,
            elements: model.mesh.elements.clone(),
            normalize: params.normalize,
        })
    }

    fn project(&self, dv: Array1<f64>) -> Result<Image> {
        let vn = if self.normalize {
            -(dv / &self.v0_sign)
        } else {
            dv
        };
        let nodes = self.h.t().dot(&vn).to_vec();
        let ds = pts2sim(&self.elements, &nodes);
        ensure_finite(&ds)?;
        Ok(Image::Elements(ds))
    }

    /// Back-projection of the Gram-Schmidt difference, insensitive to a
    /// global gain change between the frames
    pub fn solve_gs(&self, current: &[f64], reference: &[f64]) -> Result<Image> {
        check_frames(self.h.nrows(), current, reference)?;
        self.project(projected_difference(current, reference))
    }
}

impl Reconstructor for BackProjection {
    fn kind(&self) -> ImageKind {
        ImageKind::Elements
    }

    fn num_measurements(&self) -> usize {
        self.h.nrows()
    }

    fn reconstruct(&self, current: &[f64], reference: &[f64]) -> Result<Image> {
        check_frames(self.h.nrows(), current, reference)?;
        self.project(frame_difference(current, reference, false))
    }
}

fn simple_weight(nodes: &[math_eit_mesh::Point]) -> Array1<f64> {
    let d: Array1<f64> = nodes.iter().map(|p| p.norm()).collect();
    let r = d.iter().fold(0.0_f64, |m, &v| m.max(v));
    d.mapv(|di| (1.01 * r - di) / (1.01 * r))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{MeshConfig, ReconstructionConfig};

    fn model() -> EitModel {
        let config = ReconstructionConfig {
            n_el: 8,
            mesh: MeshConfig::LayerCircle {
                n_fan: 8,
                n_layer: 3,
            },
            ..Default::default()
        };
        EitModel::build(&config).expect("model")
    }

    #[test]
    fn test_identical_frames_give_zero_image() {
        let model = model();
        let bp = BackProjection::new(&model, &BpParams::default()).expect("bp");
        let v0 = model.simulated_reference();
        let image = bp.reconstruct(&v0, &v0).expect("image");
        assert_eq!(image.kind(), ImageKind::Elements);
        assert_eq!(image.len(), model.mesh.num_elements());
        assert_eq!(image.max_abs(), 0.0);
    }

    #[test]
    fn test_gs_ignores_gain() {
        let model = model();
        let bp = BackProjection::new(&model, &BpParams::default()).expect("bp");
        let v0 = model.simulated_reference();
        let scaled: Vec<f64> = v0.iter().map(|v| 1.7 * v).collect();
        let image = bp.solve_gs(&scaled, &v0).expect("image");
        assert!(image.max_abs() < 1e-9);
        assert!(bp.reconstruct(&scaled, &v0).expect("image").max_abs() > 1e-3);
    }

    #[test]
    fn test_simple_weight_profile() {
        let model = model();
        let w = simple_weight(&model.mesh.nodes);
        assert!((w[0] - 1.0).abs() < 1e-12);
        assert!(w.iter().all(|&x| x > 0.0 && x <= 1.0));
        let params = BpParams {
            weight: Weight::Simple,
            ..Default::default()
        };
        assert!(BackProjection::new(&model, &params).is_ok());
    }

    #[test]
    fn test_wrong_frame_length() {
        let model = model();
        let bp = BackProjection::new(&model, &BpParams::default()).expect("bp");
        let err = bp.reconstruct(&[1.0; 5], &[1.0; 5]).unwrap_err();
        assert!(matches!(err, EitError::Data { .. }));
    }
}
