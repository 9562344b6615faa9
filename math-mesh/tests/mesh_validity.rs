//! Validity checks over generated meshes
//!
//! Every generated mesh must be conforming (no element overlaps another,
//! each edge is shared by at most two elements), have counter-clockwise
//! elements with strictly positive area, the topology of its domain, and an
//! electrode set of the requested size whose indices are valid nodes.

use math_eit_mesh::shape::{circle, dist_diff, ellipse};
use math_eit_mesh::{
    DistMeshConfig, ElectrodeSet, Mesh, MeshQuality, Point, build, create, layer_circle,
};
use std::collections::HashMap;
use std::f64::consts::PI;

fn total_area(mesh: &Mesh) -> f64 {
    (0..mesh.num_elements()).map(|e| mesh.element_area(e)).sum()
}

/// `holes` is the number of holes in the domain
fn assert_valid(mesh: &Mesh, electrodes: &ElectrodeSet, n_el: usize, holes: i64) {
    assert_eq!(electrodes.len(), n_el);
    for e in electrodes.iter() {
        assert!(e < mesh.num_nodes());
    }
    for e in 0..mesh.num_elements() {
        assert!(
            mesh.element_area(e) > 0.0,
            "element {e} has area {}",
            mesh.element_area(e)
        );
    }

    let mut edge_use: HashMap<(usize, usize), usize> = HashMap::new();
    for &[a, b, c] in &mesh.elements {
        for (u, v) in [(a, b), (b, c), (c, a)] {
            *edge_use.entry((u.min(v), u.max(v))).or_insert(0) += 1;
        }
    }
    let crowded = edge_use.values().filter(|&&n| n > 2).count();
    assert_eq!(crowded, 0, "{crowded} edges are shared by more than two elements");
    assert_eq!(
        mesh.euler_characteristic(),
        1 - holes,
        "V - E + F does not match a domain with {holes} holes"
    );

    mesh.validate().expect("mesh invariants");
}

#[test]
fn test_distmesh_circle_for_common_electrode_counts() {
    for (n_el, h0) in [(8, 0.2), (16, 0.12), (16, 0.1), (32, 0.1)] {
        let config = DistMeshConfig {
            h0,
            seed: Some(n_el as u64),
            ..Default::default()
        };
        let (mesh, electrodes) = create(n_el, &config).expect("mesh");
        assert_valid(&mesh, &electrodes, n_el, 0);

        // inscribed polygon of the boundary nodes, so slightly below pi
        let area = total_area(&mesh);
        assert!(area < PI && area > PI - 0.1, "covered area {area}");
        for e in electrodes.iter() {
            assert!((mesh.nodes[e].norm() - 1.0).abs() < 1e-3);
        }

        let quality = MeshQuality::of(&mesh);
        assert!(quality.min_area > 0.0);
        assert!(quality.mean_ratio > 0.7, "mean quality {}", quality.mean_ratio);
    }
}

#[test]
fn test_default_distmesh_is_a_disk_for_any_seed() {
    for seed in 0..4 {
        let config = DistMeshConfig {
            seed: Some(seed),
            ..Default::default()
        };
        let (mesh, electrodes) = create(16, &config).expect("mesh");
        assert_valid(&mesh, &electrodes, 16, 0);
        let area = total_area(&mesh);
        assert!((area - PI).abs() < 0.05, "seed {seed}: covered area {area}");
    }
}

#[test]
fn test_distmesh_ellipse_with_hole() {
    let outer = ellipse(Point::new(0.0, 0.0), 1.0, 0.7);
    let fd = dist_diff(outer, circle(Point::new(0.0, 0.0), 0.25));
    let fh = |_p: Point| 1.0;
    let config = DistMeshConfig {
        h0: 0.1,
        seed: Some(11),
        ..Default::default()
    };
    let (mesh, electrodes) = build(16, &fd, &fh, None, &config).expect("mesh");
    assert_valid(&mesh, &electrodes, 16, 1);

    for p in &mesh.nodes {
        assert!(p.norm() > 0.2, "node inside the hole: {p:?}");
    }
    let expected = PI * 0.7 - PI * 0.25 * 0.25;
    assert!((total_area(&mesh) - expected).abs() < 0.1);
}

#[test]
fn test_layered_circle_for_common_electrode_counts() {
    for n_el in [8, 16, 32] {
        let (mesh, electrodes) = layer_circle(n_el, 8, 8).expect("mesh");
        assert_valid(&mesh, &electrodes, n_el, 0);
        for e in electrodes.iter() {
            assert!((mesh.nodes[e].norm() - 1.0).abs() < 1e-12);
        }
    }
}
