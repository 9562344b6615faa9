//! Deterministic layered fan mesh of the unit disk
//!
//! Layer `i` (1-based) carries `n_fan·i` equally spaced nodes on the circle
//! of radius `i/n_layer`; node 0 is the center. Consecutive layers are
//! stitched fan by fan, so the mesh has `n_fan·n_layer²` elements and needs
//! no relaxation.

use crate::types::{ElectrodeSet, Mesh, Point};
use crate::{MeshError, Result};
use std::f64::consts::PI;

/// Build the layered mesh and pick `n_el` electrodes on the outer layer.
///
/// Electrode 0 sits at angle 0 and numbering runs clockwise.
pub fn layer_circle(n_el: usize, n_fan: usize, n_layer: usize) -> Result<(Mesh, ElectrodeSet)> {
    if n_fan < 3 {
        return Err(MeshError::invalid("n_fan", format!("{n_fan} < 3")));
    }
    if n_layer == 0 {
        return Err(MeshError::invalid("n_layer", "must be at least 1"));
    }
    let outer = n_fan * n_layer;
    if n_el > outer {
        return Err(MeshError::invalid(
            "n_el",
            format!("{n_el} electrodes do not fit on {outer} boundary nodes"),
        ));
    }

    // first node index of each layer, layer 0 being the center
    let mut layer_start = Vec::with_capacity(n_layer + 1);
    let mut next = 0;
    for i in 0..=n_layer {
        layer_start.push(next);
        next += points_in_layer(n_fan, i);
    }

    let mut nodes = Vec::with_capacity(next);
    nodes.push(Point::new(0.0, 0.0));
    for i in 1..=n_layer {
        let n = points_in_layer(n_fan, i);
        let r = i as f64 / n_layer as f64;
        nodes.extend((0..n).map(|k| {
            let a = 2.0 * PI * k as f64 / n as f64;
            Point::new(r * a.cos(), r * a.sin())
        }));
    }

    let mut elements = Vec::with_capacity(n_fan * n_layer * n_layer);
    for i in 0..n_layer {
        connect_layer(&mut elements, n_fan, i, layer_start[i], layer_start[i + 1]);
    }

    let mesh = Mesh::new(nodes, elements);

    let start = layer_start[n_layer];
    let mut picks: Vec<usize> = (0..n_el).map(|k| start + k * outer / n_el).collect();
    picks.reverse();
    picks.rotate_right(1);

    let electrodes = ElectrodeSet::new(picks, &mesh)?;
    Ok((mesh, electrodes))
}

fn points_in_layer(n_fan: usize, i: usize) -> usize {
    if i == 0 { 1 } else { n_fan * i }
}

/// Stitch layer `i` (inner) to layer `i + 1` (outer), counter-clockwise
fn connect_layer(
    elements: &mut Vec<[usize; 3]>,
    n_fan: usize,
    i: usize,
    inner_start: usize,
    outer_start: usize,
) {
    let ppl_inner = points_in_layer(n_fan, i);
    let ppl_outer = points_in_layer(n_fan, i + 1);
    let period = i + 1;
    let mut k = 0;
    for j in 0..ppl_outer {
        let outer_now = outer_start + j;
        let outer_next = outer_start + (j + 1) % ppl_outer;
        let inner_now = inner_start + k;
        let inner_next = inner_start + (k + 1) % ppl_inner;
        if j % period == 0 {
            elements.push([outer_now, outer_next, inner_now]);
        } else {
            elements.push([inner_now, outer_now, inner_next]);
            elements.push([outer_now, outer_next, inner_next]);
            k += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts() {
        let (mesh, el) = layer_circle(16, 8, 6).expect("mesh");
        assert_eq!(mesh.num_nodes(), 1 + 8 * (6 * 7) / 2);
        assert_eq!(mesh.num_elements(), 8 * 36);
        assert_eq!(el.len(), 16);
        assert!(mesh.validate().is_ok());
    }

    #[test]
    fn test_total_area_matches_polygon() {
        let (mesh, _) = layer_circle(8, 6, 4).expect("mesh");
        let area: f64 = (0..mesh.num_elements()).map(|e| mesh.element_area(e)).sum();
        let n = 24.0;
        let polygon = 0.5 * n * (2.0 * PI / n).sin();
        assert!((area - polygon).abs() < 1e-12);
    }

    #[test]
    fn test_electrode_order() {
        let (mesh, el) = layer_circle(4, 4, 2).expect("mesh");
        // outer layer nodes 5..13, picks 5, 7, 9, 11 -> reversed and rolled
        assert_eq!(el.as_slice(), &[5, 11, 9, 7]);
        for e in el.iter() {
            assert!((mesh.nodes[e].norm() - 1.0).abs() < 1e-12);
        }
        assert!((mesh.nodes[el.node(0)].x - 1.0).abs() < 1e-12);
        assert!(mesh.nodes[el.node(1)].y < 0.0);
    }

    #[test]
    fn test_too_many_electrodes() {
        assert!(layer_circle(32, 4, 2).is_err());
        assert!(layer_circle(8, 2, 2).is_err());
    }
}
