//! Mesh + electrode construction entry points

use crate::distmesh::{DistMesh, DistMeshConfig};
use crate::shape::{area_uniform, fix_points_fd, unit_circle};
use crate::types::{ElectrodeSet, Mesh, Point};
use crate::{MIN_ELECTRODES, MeshError, Result};

/// Mesh the domain `fd` with size function `fh` and `n_el` electrodes.
///
/// Electrodes are the first `n_el` fixed points. When `pfix` is `None` they
/// are spread over the boundary at equal angles around the origin.
pub fn build(
    n_el: usize,
    fd: &dyn Fn(Point) -> f64,
    fh: &dyn Fn(Point) -> f64,
    pfix: Option<&[Point]>,
    config: &DistMeshConfig,
) -> Result<(Mesh, ElectrodeSet)> {
    if n_el < MIN_ELECTRODES {
        return Err(MeshError::InvalidElectrodeCount {
            count: n_el,
            min: MIN_ELECTRODES,
        });
    }
    let pfix = match pfix {
        Some(p) if p.len() < n_el => {
            return Err(MeshError::invalid(
                "pfix",
                format!("{} fixed points for {n_el} electrodes", p.len()),
            ));
        }
        Some(p) => p.to_vec(),
        None => fix_points_fd(fd, n_el, Point::new(0.0, 0.0)),
    };

    let mesh = DistMesh::new(fd, fh, &pfix, config.clone())?.run()?;
    mesh.validate()?;
    let electrodes = ElectrodeSet::new((0..n_el).collect(), &mesh)?;
    log::info!(
        "mesh built: {} nodes, {} elements, {} electrodes",
        mesh.num_nodes(),
        mesh.num_elements(),
        n_el
    );
    Ok((mesh, electrodes))
}

/// Uniform unit-circle mesh with `n_el` electrodes
pub fn create(n_el: usize, config: &DistMeshConfig) -> Result<(Mesh, ElectrodeSet)> {
    build(n_el, &unit_circle, &area_uniform, None, config)
}
