//! GREIT: regularized reconstruction straight onto a pixel grid
//!
//! Element sensitivities are blurred onto an `n × n` grid with a radial
//! weight matrix `W`, and the operator is
//! `H = WᵀJᵀ(JJᵀ + λ·diag(JJᵀ)^p)⁻¹`. Grid cells outside the convex hull
//! of the mesh are reported as NaN.

use super::{Reconstructor, check_frames, ensure_finite, frame_difference};
use crate::error::{EitError, Result};
use crate::image::{GridImage, Image, ImageKind};
use crate::interp::{Grid, weight_idw, weight_sigmoid};
use crate::model::EitModel;
use math_eit_solvers::lu_factorize;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Element-to-grid weighting
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Weighting {
    /// Sigmoid of the scaled distance, see [`weight_sigmoid`]
    #[default]
    Sigmoid,
    /// `1/d^p` over the `k` nearest element centroids
    InverseDistance {
        #[serde(default = "default_idw_k")]
        k: usize,
        #[serde(default = "default_idw_p")]
        p: f64,
    },
}

fn default_idw_k() -> usize {
    6
}

fn default_idw_p() -> f64 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GreitParams {
    /// Grid size per axis; the electrode count when absent
    pub n: Option<usize>,
    /// Sigmoid slope
    pub s: f64,
    /// Desired blur radius as a fraction of the largest distance
    pub ratio: f64,
    pub p: f64,
    pub lamb: f64,
    pub weighting: Weighting,
    pub normalize: bool,
}

impl Default for GreitParams {
    fn default() -> Self {
        Self {
            n: None,
            s: 20.0,
            ratio: 0.1,
            p: 0.5,
            lamb: 0.05,
            weighting: Weighting::Sigmoid,
            normalize: false,
        }
    }
}

impl GreitParams {
    pub fn validate(&self) -> Result<()> {
        if let Some(n) = self.n.filter(|&n| n < 2) {
            return Err(EitError::Configuration(format!("grid size {n} is too small")));
        }
        if !self.lamb.is_finite() || self.lamb < 0.0 || !self.p.is_finite() {
            return Err(EitError::Configuration(format!(
                "greit parameters p={} lamb={} are invalid",
                self.p, self.lamb
            )));
        }
        if matches!(self.weighting, Weighting::InverseDistance { k: 0, .. }) {
            return Err(EitError::Configuration(
                "inverse-distance weighting needs at least one neighbour".into(),
            ));
        }
        Ok(())
    }
}

pub struct Greit {
    /// Grid cells × measurements
    h: Array2<f64>,
    grid: Grid,
    normalize: bool,
}

impl Greit {
    pub fn new(model: &EitModel, params: &GreitParams) -> Result<Self> {
        params.validate()?;
        let n = params.n.unwrap_or(model.electrodes.len());
        let grid = Grid::new(&model.mesh.nodes, n)?;

        let xy = model.mesh.element_centroids();
        let xyi = grid.points();
        let w = match params.weighting {
            Weighting::Sigmoid => weight_sigmoid(&xy, &xyi, params.ratio, params.s),
            Weighting::InverseDistance { k, p } => weight_idw(&xy, &xyi, k, p),
        };

        let jac = &model.solution.jac;
        let mut m = jac.dot(&jac.t());
        for i in 0..m.nrows() {
            let d = m[[i, i]];
            m[[i, i]] += params.lamb * d.powf(params.p);
        }
        // M is symmetric, so H = (M⁻¹·J·W)ᵀ
        let jw = jac.dot(&w);
        let h = lu_factorize(&m)?.solve_matrix(&jw)?.reversed_axes();

        log::info!(
            "greit operator ready: {n}x{n} grid, {} measurements, p={} lamb={}",
            h.ncols(),
            params.p,
            params.lamb
        );
        Ok(Self {
            h,
            grid,
            normalize: params.normalize,
        })
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn operator(&self) -> &Array2<f64> {
        &self.h
    }
}

impl Reconstructor for Greit {
    fn kind(&self) -> ImageKind {
        ImageKind::Grid
    }

    fn num_measurements(&self) -> usize {
        self.h.ncols()
    }

    fn reconstruct(&self, current: &[f64], reference: &[f64]) -> Result<Image> {
        check_frames(self.h.ncols(), current, reference)?;
        let dv = frame_difference(current, reference, self.normalize);
        let ds: Array1<f64> = -self.h.dot(&dv);
        ensure_finite(&ds)?;

        let n = self.grid.size();
        let mut values = ds
            .into_shape_with_order((n, n))
            .map_err(|e| EitError::Runtime(e.to_string()))?;
        values.zip_mut_with(&self.grid.mask, |v, &outside| {
            if outside {
                *v = f64::NAN;
            }
        });
        Ok(Image::Grid(GridImage {
            xg: self.grid.xg.clone(),
            yg: self.grid.yg.clone(),
            mask: self.grid.mask.clone(),
            values,
        }))
    }
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
    fn test_operator_shape() {
        let model = model();
        let greit = Greit::new(&model, &GreitParams::default()).expect("greit");
        assert_eq!(greit.grid().size(), 8);
        assert_eq!(greit.operator().dim(), (64, model.num_measurements()));
        assert_eq!(greit.num_measurements(), model.num_measurements());
    }

    #[test]
    fn test_masked_cells_are_nan() {
        let model = model();
        let params = GreitParams {
            n: Some(12),
            ..Default::default()
        };
        let greit = Greit::new(&model, &params).expect("greit");
        let v0 = model.simulated_reference();
        let v1: Vec<f64> = v0.iter().map(|v| v * 1.05).collect();
        let Image::Grid(image) = greit.reconstruct(&v1, &v0).expect("image") else {
            panic!("greit must return a grid");
        };
        for (v, &outside) in image.values.iter().zip(image.mask.iter()) {
            assert_eq!(v.is_nan(), outside);
        }
        assert!(image.mask.iter().any(|&m| m));
        assert!(image.mask.iter().any(|&m| !m));
    }

    #[test]
    fn test_inverse_distance_weighting() {
        let model = model();
        let params = GreitParams {
            weighting: Weighting::InverseDistance { k: 4, p: 2.0 },
            ..Default::default()
        };
        let greit = Greit::new(&model, &params).expect("greit");
        let v0 = model.simulated_reference();
        let image = greit.reconstruct(&v0, &v0).expect("image");
        assert_eq!(image.max_abs(), 0.0);

        let bad = GreitParams {
            weighting: Weighting::InverseDistance { k: 0, p: 1.0 },
            ..Default::default()
        };
        assert!(bad.validate().is_err());
    }
}
