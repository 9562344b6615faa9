//! Interpolation between elements, nodes and regular grids

use crate::error::{EitError, Result};
use math_eit_mesh::{Mesh, Point, convex_hull, polygon_contains};
use ndarray::{Array1, Array2};

/// Area-weighted average of element values onto nodes.
///
/// `f_n = Σ_e a_e·v_e / Σ_e a_e` over the elements sharing node `n`.
pub fn sim2pts(mesh: &Mesh, values: &[f64]) -> Array1<f64> {
    let mut acc = Array1::<f64>::zeros(mesh.num_nodes());
    let mut weight = Array1::<f64>::zeros(mesh.num_nodes());
    for (e, (tri, &v)) in mesh.elements.iter().zip(values).enumerate() {
        let area = mesh.element_area(e);
        for &n in tri {
            acc[n] += area * v;
            weight[n] += area;
        }
    }
    acc.iter()
        .zip(weight.iter())
        .map(|(&a, &w)| if w > 0.0 { a / w } else { 0.0 })
        .collect()
}

/// Mean of the three node values of every element
pub fn pts2sim(elements: &[[usize; 3]], node_values: &[f64]) -> Array1<f64> {
    elements
        .iter()
        .map(|tri| tri.iter().map(|&n| node_values[n]).sum::<f64>() / 3.0)
        .collect()
}

/// `n × n` sampling grid over the bounding box of the mesh nodes.
///
/// Coordinates follow `linspace(min, max, n, endpoint = false)`; rows run
/// along y and columns along x.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    pub xg: Array2<f64>,
    pub yg: Array2<f64>,
    /// `true` outside the convex hull of the nodes
    pub mask: Array2<bool>,
}

impl Grid {
    pub fn new(nodes: &[Point], n: usize) -> Result<Self> {
        if n < 2 {
            return Err(EitError::Configuration(format!(
                "grid size {n} is too small"
            )));
        }
        let hull = convex_hull(nodes);
        if hull.len() < 3 {
            return Err(EitError::Configuration(
                "mesh nodes do not span an area".into(),
            ));
        }
        let (x_min, x_max) = extent(nodes.iter().map(|p| p.x));
        let (y_min, y_max) = extent(nodes.iter().map(|p| p.y));
        let xv = linspace_open(x_min, x_max, n);
        let yv = linspace_open(y_min, y_max, n);

        let xg = Array2::from_shape_fn((n, n), |(_, j)| xv[j]);
        let yg = Array2::from_shape_fn((n, n), |(i, _)| yv[i]);
        let mask = Array2::from_shape_fn((n, n), |(i, j)| {
            !polygon_contains(&hull, Point::new(xv[j], yv[i]))
        });
        Ok(Self { xg, yg, mask })
    }

    pub fn size(&self) -> usize {
        self.xg.nrows()
    }

    /// Grid points in row-major order
    pub fn points(&self) -> Vec<Point> {
        self.xg
            .iter()
            .zip(self.yg.iter())
            .map(|(&x, &y)| Point::new(x, y))
            .collect()
    }
}

fn extent(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

fn linspace_open(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    let step = (hi - lo) / n as f64;
    (0..n).map(|k| lo + k as f64 * step).collect()
}

/// Pairwise distances, `xy.len() × xyi.len()`
pub fn distance_matrix(xy: &[Point], xyi: &[Point]) -> Array2<f64> {
    Array2::from_shape_fn((xy.len(), xyi.len()), |(i, j)| xy[i].distance(&xyi[j]))
}

/// Sigmoid radial weights from `xy` to `xyi`.
///
/// Distances are scaled to `[0, 5]`, the sigmoid is centered on
/// `r0 = 5·ratio` with slope `s`, and every column is normalized to sum 1.
pub fn weight_sigmoid(xy: &[Point], xyi: &[Point], ratio: f64, s: f64) -> Array2<f64> {
    let mut d = distance_matrix(xy, xyi);
    let d_max = d.iter().fold(0.0_f64, |m, &v| m.max(v));
    if d_max > 0.0 {
        d.mapv_inplace(|v| 5.0 * v / d_max);
    }
    let r0 = 5.0 * ratio;
    let mut w = d.mapv(|v| 1.0 / (1.0 + (s * (v - r0)).exp()));
    normalize_columns(&mut w);
    w
}

/// Inverse-distance weights `1/d^p`, keeping the `k` nearest sources of
/// every target
pub fn weight_idw(xy: &[Point], xyi: &[Point], k: usize, p: f64) -> Array2<f64> {
    let d = distance_matrix(xy, xyi);
    let mut w = d.mapv(|v| 1.0 / v.max(f64::EPSILON).powf(p));
    for mut col in w.columns_mut() {
        if k < col.len() {
            let mut order: Vec<usize> = (0..col.len()).collect();
            order.sort_by(|&a, &b| col[b].total_cmp(&col[a]));
            for &i in &order[k..] {
                col[i] = 0.0;
            }
        }
    }
    normalize_columns(&mut w);
    w
}

fn normalize_columns(w: &mut Array2<f64>) {
    for mut col in w.columns_mut() {
        let sum = col.sum();
        if sum > 0.0 {
            col.mapv_inplace(|v| v / sum);
        }
    }
}
