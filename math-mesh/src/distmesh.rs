//! Force-based mesh relaxation (Persson & Strang distmesh)
//!
//! Nodes are treated as the joints of a truss whose bars are the edges of a
//! Delaunay triangulation. Bars shorter than their desired length push their
//! end nodes apart; nodes that leave the domain are projected back onto the
//! boundary. The loop stops when interior nodes no longer move.

use crate::delaunay::delaunay;
use crate::quality::check_order;
use crate::shape::edge_project;
use crate::types::{Mesh, Point};
use crate::{EPSILON, MeshError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Parameters of the relaxation loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DistMeshConfig {
    /// Initial edge length
    pub h0: f64,
    /// Convergence tolerance on interior node movement (relative to h0)
    pub dptol: f64,
    /// Retriangulation tolerance (relative to h0)
    pub ttol: f64,
    /// Bar length inflation factor
    pub fscale: f64,
    /// Pseudo time step
    pub deltat: f64,
    /// Hard iteration cap
    pub maxiter: usize,
    /// Density control period in iterations
    pub densityctrlfreq: usize,
    /// Bounding box `[min, max]` of the initial lattice
    pub bbox: [Point; 2],
    /// Seed for the rejection sampler, `None` draws from the OS
    pub seed: Option<u64>,
}

impl Default for DistMeshConfig {
    fn default() -> Self {
        Self {
            h0: 0.1,
            dptol: 0.01,
            ttol: 0.1,
            fscale: 1.275,
            deltat: 0.2,
            maxiter: 500,
            densityctrlfreq: 32,
            bbox: [Point::new(-1.0, -1.0), Point::new(1.0, 1.0)],
            seed: None,
        }
    }
}

impl DistMeshConfig {
    fn validate(&self) -> Result<()> {
        if !(self.h0 > 0.0 && self.h0.is_finite()) {
            return Err(MeshError::invalid("h0", format!("{} is not positive", self.h0)));
        }
        let [lo, hi] = self.bbox;
        if !(hi.x - lo.x > self.h0 && hi.y - lo.y > self.h0) {
            return Err(MeshError::invalid(
                "bbox",
                "must be wider and taller than h0",
            ));
        }
        if self.deltat.is_nan() || self.deltat <= 0.0 || self.fscale.is_nan() || self.fscale <= 0.0 {
            return Err(MeshError::invalid("deltat", "step and fscale must be positive"));
        }
        if self.maxiter == 0 || self.densityctrlfreq == 0 {
            return Err(MeshError::invalid(
                "maxiter",
                "iteration counts must be non-zero",
            ));
        }
        Ok(())
    }
}

/// Relaxation state for one domain
pub struct DistMesh<'a> {
    fd: &'a dyn Fn(Point) -> f64,
    fh: &'a dyn Fn(Point) -> f64,
    config: DistMeshConfig,
    geps: f64,
    /// Leading `nfix` nodes are fixed
    nfix: usize,
    p: Vec<Point>,
    pold: Option<Vec<Point>>,
    t: Vec<[usize; 3]>,
    bars: Vec<[usize; 2]>,
}

impl<'a> DistMesh<'a> {
    /// Seed the lattice and apply the size-function rejection.
    ///
    /// `pfix` points never move and become nodes `0..pfix.len()`.
    pub fn new(
        fd: &'a dyn Fn(Point) -> f64,
        fh: &'a dyn Fn(Point) -> f64,
        pfix: &[Point],
        config: DistMeshConfig,
    ) -> Result<Self> {
        config.validate()?;
        let h0 = config.h0;
        let geps = 0.001 * h0;

        // hexagonal lattice, odd rows shifted by half a spacing
        let [lo, hi] = config.bbox;
        let dy = h0 * 3.0_f64.sqrt() / 2.0;
        let nx = ((hi.x - lo.x) / h0).floor() as usize + 1;
        let ny = ((hi.y - lo.y) / dy).floor() as usize + 1;
        let mut lattice = Vec::with_capacity(nx * ny);
        for j in 0..ny {
            let shift = if j % 2 == 1 { h0 / 2.0 } else { 0.0 };
            for i in 0..nx {
                lattice.push(Point::new(lo.x + i as f64 * h0 + shift, lo.y + j as f64 * dy));
            }
        }
        lattice.retain(|&p| fd(p) < geps);
        if lattice.is_empty() {
            return Err(MeshError::EmptyDomain);
        }

        let mut r0 = Vec::with_capacity(lattice.len());
        for &p in &lattice {
            let h = fh(p);
            if !(h > 0.0 && h.is_finite()) {
                return Err(MeshError::InvalidSizeFunction {
                    x: p.x,
                    y: p.y,
                    value: h,
                });
            }
            r0.push(1.0 / (h * h));
        }
        let r0_max = r0.iter().copied().fold(0.0_f64, f64::max);

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let kept: Vec<Point> = lattice
            .into_iter()
            .zip(r0)
            .filter(|(_, r)| rng.random::<f64>() < r / r0_max)
            .map(|(p, _)| p)
            .filter(|p| pfix.iter().all(|f| f.distance(p) > geps))
            .collect();

        let mut p = pfix.to_vec();
        p.extend(kept);
        if p.len() < 3 {
            return Err(MeshError::EmptyDomain);
        }

        Ok(Self {
            fd,
            fh,
            config,
            geps,
            nfix: pfix.len(),
            p,
            pold: None,
            t: Vec::new(),
            bars: Vec::new(),
        })
    }

    pub fn num_points(&self) -> usize {
        self.p.len()
    }

    fn needs_retriangulation(&self) -> bool {
        match &self.pold {
            None => true,
            Some(pold) => {
                let moved = self
                    .p
                    .iter()
                    .zip(pold)
                    .map(|(a, b)| a.distance(b))
                    .fold(0.0_f64, f64::max);
                moved > self.config.ttol * self.config.h0
            }
        }
    }

    /// Delaunay triangulation restricted to triangles with interior centroids
    fn triangulate(&mut self) -> Result<()> {
        self.pold = Some(self.p.clone());
        let fd = self.fd;
        let geps = self.geps;
        let p = &self.p;
        self.t = delaunay(p)?
            .into_iter()
            .filter(|&[a, b, c]| {
                let centroid = Point::new(
                    (p[a].x + p[b].x + p[c].x) / 3.0,
                    (p[a].y + p[b].y + p[c].y) / 3.0,
                );
                fd(centroid) < -geps
            })
            .collect();

        let mut edges = BTreeSet::new();
        for &[a, b, c] in &self.t {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                edges.insert([u.min(v), u.max(v)]);
            }
        }
        self.bars = edges.into_iter().collect();
        Ok(())
    }

    /// Actual and desired bar lengths
    fn bar_lengths(&self) -> (Vec<f64>, Vec<f64>) {
        let fh = self.fh;
        let lengths: Vec<f64> = self
            .bars
            .iter()
            .map(|&[a, b]| self.p[a].distance(&self.p[b]).max(EPSILON))
            .collect();
        let hbars: Vec<f64> = self
            .bars
            .iter()
            .map(|&[a, b]| fh(self.p[a].midpoint(&self.p[b])))
            .collect();
        let sum_l2: f64 = lengths.iter().map(|l| l * l).sum();
        let sum_h2: f64 = hbars.iter().map(|h| h * h).sum();
        let scale = self.config.fscale * (sum_l2 / sum_h2).sqrt();
        let desired = hbars.into_iter().map(|h| h * scale).collect();
        (lengths, desired)
    }

    /// Remove non-fixed nodes attached to bars far shorter than desired.
    ///
    /// Returns true when nodes were removed.
    fn density_control(&mut self, lengths: &[f64], desired: &[f64]) -> bool {
        let doomed: BTreeSet<usize> = self
            .bars
            .iter()
            .zip(lengths.iter().zip(desired))
            .filter(|(_, (l, l0))| **l0 > 2.0 * **l)
            .flat_map(|(bar, _)| bar.iter().copied())
            .filter(|&n| n >= self.nfix)
            .collect();
        if doomed.is_empty() {
            return false;
        }
        let mut idx = 0;
        self.p.retain(|_| {
            let keep = !doomed.contains(&idx);
            idx += 1;
            keep
        });
        self.pold = None;
        log::debug!("distmesh density control removed {} nodes", doomed.len());
        true
    }

    /// Run the relaxation and return the final mesh
    pub fn run(mut self) -> Result<Mesh> {
        let h0 = self.config.h0;
        let mut converged = false;
        let mut iterations = 0;

        for it in 0..self.config.maxiter {
            iterations = it + 1;
            if self.needs_retriangulation() {
                self.triangulate()?;
            }
            if self.bars.is_empty() {
                return Err(MeshError::Triangulation(
                    "no triangle has its centroid inside the domain".into(),
                ));
            }

            let (lengths, desired) = self.bar_lengths();

            if it % self.config.densityctrlfreq == 0 && self.density_control(&lengths, &desired)
            {
                continue;
            }

            let mut forces = vec![Point::default(); self.p.len()];
            for (k, &[a, b]) in self.bars.iter().enumerate() {
                let f = (desired[k] - lengths[k]).max(0.0);
                let fvec = (self.p[a] - self.p[b]) * (f / lengths[k]);
                forces[a] = forces[a] + fvec;
                forces[b] = forces[b] - fvec;
            }
            for f in forces.iter_mut().take(self.nfix) {
                *f = Point::default();
            }

            let fd = self.fd;
            let deltat = self.config.deltat;
            let mut score = 0.0_f64;
            for (p, f) in self.p.iter_mut().zip(&forces).skip(self.nfix) {
                *p = *p + *f * deltat;
                let d = fd(*p);
                if d > 0.0 {
                    *p = edge_project(*p, fd, h0);
                } else if d < -self.geps {
                    score = score.max(f.norm() * deltat / h0);
                }
            }

            if score < self.config.dptol {
                converged = true;
                break;
            }
        }

        if converged {
            log::info!(
                "distmesh converged after {} iterations ({} nodes)",
                iterations,
                self.p.len()
            );
        } else {
            log::warn!(
                "distmesh stopped at the iteration cap ({}) before converging",
                self.config.maxiter
            );
        }

        if self.needs_retriangulation() {
            self.triangulate()?;
        }
        self.into_mesh()
    }

    /// Orient elements and drop nodes that no element uses
    fn into_mesh(self) -> Result<Mesh> {
        let mut used = vec![false; self.p.len()];
        for tri in &self.t {
            for &n in tri {
                used[n] = true;
            }
        }
        if let Some(index) = used[..self.nfix].iter().position(|u| !u) {
            return Err(MeshError::OrphanedFixedPoint { index });
        }

        let mut remap = vec![usize::MAX; self.p.len()];
        let mut nodes = Vec::with_capacity(self.p.len());
        for (i, p) in self.p.iter().enumerate() {
            if used[i] {
                remap[i] = nodes.len();
                nodes.push(*p);
            }
        }
        let elements = self
            .t
            .iter()
            .map(|&[a, b, c]| [remap[a], remap[b], remap[c]])
            .collect();

        let mut mesh = Mesh::new(nodes, elements);
        check_order(&mut mesh);
        Ok(mesh)
    }
}
