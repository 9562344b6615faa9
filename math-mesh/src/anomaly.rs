//! Circular inclusions painted into the element permittivity

use crate::types::{Mesh, Point};
use serde::{Deserialize, Serialize};

/// Disk-shaped region with its own permittivity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub center: Point,
    pub radius: f64,
    pub perm: f64,
}

/// Assign `background` everywhere, then each anomaly to the elements whose
/// centroid falls inside it. Later anomalies win where they overlap.
///
/// Returns the per-element permittivity without touching `mesh.perm`.
pub fn set_perm(mesh: &Mesh, anomalies: &[Anomaly], background: f64) -> Vec<f64> {
    let mut perm = vec![background; mesh.num_elements()];
    for (e, c) in mesh.element_centroids().into_iter().enumerate() {
        for a in anomalies {
            if c.distance(&a.center) < a.radius {
                perm[e] = a.perm;
            }
        }
    }
    perm
}
