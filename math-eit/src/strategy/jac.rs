//! Regularized Jacobian inversion and Gauss-Newton refinement
//!
//! The one-step operator is `H = (JᵀJ + λR)⁻¹Jᵀ` and an image is
//! `ds = -H·dv`. The sign follows the forward model, whose Jacobian is
//! `-dv/dσ`.

use super::{Reconstructor, check_frames, ensure_finite, frame_difference, projected_difference};
use crate::error::{EitError, Result};
use crate::image::{Image, ImageKind};
use crate::interp::sim2pts;
use crate::model::EitModel;
use math_eit_fem::{Forward, Protocol};
use math_eit_mesh::Mesh;
use math_eit_solvers::lu_factorize;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Choice of the regularization matrix `R`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    /// `diag(JᵀJ)^p`
    #[default]
    Kotre,
    /// Marquardt-Levenberg, `diag(JᵀJ)`
    Lm,
    /// Damped Gauss-Newton, identity
    Dgn,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JacParams {
    pub p: f64,
    pub lamb: f64,
    pub method: Method,
    /// Divide the frame difference by `|reference|`
    pub normalize: bool,
    /// Divide each Jacobian row by the simulated voltage magnitude
    pub jac_normalized: bool,
}

impl Default for JacParams {
    fn default() -> Self {
        Self {
            p: 0.5,
            lamb: 0.4,
            method: Method::Kotre,
            normalize: false,
            jac_normalized: false,
        }
    }
}

impl JacParams {
    pub fn validate(&self) -> Result<()> {
        if !self.p.is_finite() || !self.lamb.is_finite() || self.lamb < 0.0 {
            return Err(EitError::Configuration(format!(
                "jacobian parameters p={} lamb={} are invalid",
                self.p, self.lamb
            )));
        }
        Ok(())
    }
}

/// Options for [`JacobianSolver::gn`]
#[derive(Debug, Clone)]
pub struct GnOptions {
    pub maxiter: usize,
    /// Stop when `|dx| / |x0|` falls below this
    pub gtol: f64,
    pub p: f64,
    pub lamb: f64,
    /// `lamb` is multiplied by this after every iteration
    pub lamb_decay: f64,
    pub lamb_min: f64,
    pub method: Method,
}

impl From<&JacParams> for GnOptions {
    fn from(params: &JacParams) -> Self {
        Self {
            maxiter: 1,
            gtol: 1e-4,
            p: params.p,
            lamb: params.lamb,
            lamb_decay: 1.0,
            lamb_min: 0.0,
            method: params.method,
        }
    }
}

/// `(JᵀJ + λR)⁻¹Jᵀ`
pub fn h_matrix(jac: &Array2<f64>, p: f64, lamb: f64, method: Method) -> Result<Array2<f64>> {
    let mut a = jac.t().dot(jac);
    let n = a.nrows();
    for i in 0..n {
        let d = a[[i, i]];
        let r = match method {
            Method::Kotre => d.powf(p),
            Method::Lm => d,
            Method::Dgn => 1.0,
        };
        a[[i, i]] += lamb * r;
    }
    let lu = lu_factorize(&a)?;
    Ok(lu.solve_matrix(&jac.t().to_owned())?)
}

/// Spatial difference (Laplacian-like) matrix over element neighbourhoods.
///
/// Row `i` has `-1` for every element sharing a node with element `i` and
/// the neighbour count on the diagonal.
pub fn sar(elements: &[[usize; 3]]) -> Array2<f64> {
    let n_nodes = elements
        .iter()
        .flat_map(|t| t.iter().copied())
        .max()
        .map_or(0, |m| m + 1);
    let mut node_elements = vec![Vec::new(); n_nodes];
    for (e, tri) in elements.iter().enumerate() {
        for &n in tri {
            node_elements[n].push(e);
        }
    }

    let ne = elements.len();
    let mut d = Array2::zeros((ne, ne));
    for (i, tri) in elements.iter().enumerate() {
        let neighbours: BTreeSet<usize> = tri
            .iter()
            .flat_map(|&n| node_elements[n].iter().copied())
            .collect();
        for &j in &neighbours {
            d[[i, j]] = -1.0;
        }
        d[[i, i]] = (neighbours.len() - 1) as f64;
    }
    d
}

fn norm(x: &Array1<f64>) -> f64 {
    x.dot(x).sqrt()
}

pub struct JacobianSolver {
    h: Array2<f64>,
    jac: Array2<f64>,
    mesh: Mesh,
    forward: Forward,
    protocol: Protocol,
    params: JacParams,
}

impl JacobianSolver {
    pub fn new(model: &EitModel, params: &JacParams) -> Result<Self> {
        params.validate()?;
        let mut jac = model.solution.jac.clone();
        if params.jac_normalized {
            for (mut row, &v0) in jac.rows_mut().into_iter().zip(model.solution.v.iter()) {
                if v0.abs() < f64::MIN_POSITIVE {
                    return Err(EitError::Configuration(
                        "cannot normalize the Jacobian by a zero simulated voltage".into(),
                    ));
                }
                row /= v0.abs();
            }
        }
        let h = h_matrix(&jac, params.p, params.lamb, params.method)?;
        log::info!(
            "jacobian operator ready: {}x{}, {:?} p={} lamb={}",
            h.nrows(),
            h.ncols(),
            params.method,
            params.p,
            params.lamb
        );
        Ok(Self {
            h,
            jac,
            mesh: model.mesh.clone(),
            forward: model.forward.clone(),
            protocol: model.protocol.clone(),
            params: params.clone(),
        })
    }

    /// Reconstruction operator `H`, elements × measurements
    pub fn operator(&self) -> &Array2<f64> {
        &self.h
    }

    pub fn jacobian(&self) -> &Array2<f64> {
        &self.jac
    }

    /// Per-element conductivity change `-H·dv`
    pub fn solve(&self, current: &[f64], reference: &[f64]) -> Result<Array1<f64>> {
        check_frames(self.h.ncols(), current, reference)?;
        let dv = frame_difference(current, reference, self.params.normalize);
        let ds = -self.h.dot(&dv);
        ensure_finite(&ds)?;
        Ok(ds)
    }

    /// Like [`solve`](Self::solve) on the Gram-Schmidt difference
    pub fn solve_gs(&self, current: &[f64], reference: &[f64]) -> Result<Array1<f64>> {
        check_frames(self.h.ncols(), current, reference)?;
        let ds = -self.h.dot(&projected_difference(current, reference));
        ensure_finite(&ds)?;
        Ok(ds)
    }

    /// Plain Jacobian back-projection `-Jᵀ·dv`
    pub fn bp_solve(&self, current: &[f64], reference: &[f64]) -> Result<Array1<f64>> {
        check_frames(self.jac.nrows(), current, reference)?;
        let dv = frame_difference(current, reference, self.params.normalize);
        let ds = -self.jac.t().dot(&dv);
        ensure_finite(&ds)?;
        Ok(ds)
    }

    /// Smooth an element image with the neighbourhood difference matrix
    pub fn project(&self, ds: &Array1<f64>) -> Array1<f64> {
        sar(&self.mesh.elements).dot(ds)
    }

    /// Gauss-Newton iterations for absolute conductivity.
    ///
    /// Starts from `x0` (the model conductivity when `None`), re-linearizes
    /// around each estimate and stops after `maxiter` steps or when the
    /// relative update falls below `gtol`.
    pub fn gn(&self, v: &[f64], x0: Option<&[f64]>, options: &GnOptions) -> Result<Array1<f64>> {
        if v.len() != self.jac.nrows() {
            return Err(EitError::Data {
                expected: self.jac.nrows(),
                actual: v.len(),
            });
        }
        let v = Array1::from(v.to_vec());
        let mut x = Array1::from(x0.map_or_else(|| self.mesh.perm.clone(), <[f64]>::to_vec));
        if x.len() != self.mesh.num_elements() {
            return Err(EitError::Configuration(format!(
                "initial conductivity has {} values for {} elements",
                x.len(),
                self.mesh.num_elements()
            )));
        }
        let x0_norm = match norm(&x) {
            n if n > 0.0 => n,
            _ => 1.0,
        };

        let mut lamb = options.lamb;
        for i in 0..options.maxiter {
            let fs = self.forward.solve_eit(&self.protocol, &x.to_vec())?;
            let r0 = &v - &fs.v;
            let h = h_matrix(&fs.jac, options.p, lamb, options.method)?;
            let d_k = h.dot(&r0);
            x -= &d_k;

            let c = norm(&d_k) / x0_norm;
            log::debug!("gn iteration {i}: lamb = {lamb:.3e}, relative update = {c:.3e}");
            if c < options.gtol {
                break;
            }
            lamb = (lamb * options.lamb_decay).max(options.lamb_min);
        }
        ensure_finite(&x)?;
        Ok(x)
    }
}

impl Reconstructor for JacobianSolver {
    fn kind(&self) -> ImageKind {
        ImageKind::Nodes
    }

    fn num_measurements(&self) -> usize {
        self.h.ncols()
    }

    fn reconstruct(&self, current: &[f64], reference: &[f64]) -> Result<Image> {
        let ds = self.solve(current, reference)?;
        let ds = ds.to_vec();
        Ok(Image::Nodes(sim2pts(&self.mesh, &ds)))
    }
}
