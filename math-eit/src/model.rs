//! Mesh, protocol and forward solution for one configuration

use crate::config::{MeshConfig, ReconstructionConfig};
use crate::error::Result;
use math_eit_fem::{Forward, ForwardSolution, Protocol, StimulationPattern, load_stimulation_file};
use math_eit_mesh::{ElectrodeSet, Mesh, create, layer_circle};
use std::time::Instant;

/// Everything the inversion strategies are built from.
///
/// Immutable once built; a new configuration builds a new model.
#[derive(Debug, Clone)]
pub struct EitModel {
    pub mesh: Mesh,
    pub electrodes: ElectrodeSet,
    pub protocol: Protocol,
    pub forward: Forward,
    /// Forward solution for the mesh's background conductivity
    pub solution: ForwardSolution<f64>,
}

impl EitModel {
    pub fn build(config: &ReconstructionConfig) -> Result<Self> {
        config.validate()?;
        let start = Instant::now();
        let n_el = config.n_el;

        let (mesh, electrodes) = match &config.mesh {
            MeshConfig::DistMesh(dm) => create(n_el, dm)?,
            MeshConfig::LayerCircle { n_fan, n_layer } => layer_circle(n_el, *n_fan, *n_layer)?,
        };

        let dist = config.protocol.dist_for(n_el);
        let pattern = match config.protocol.stimulation_path(n_el) {
            Some(path) => load_stimulation_file(&path, n_el, dist)?,
            None => StimulationPattern::scan(n_el, dist)?,
        };
        let protocol = Protocol::new(pattern, n_el, config.protocol.step, config.protocol.parser)?;

        let forward = Forward::new(&mesh, &electrodes)?;
        let solution = forward.solve_eit(&protocol, &mesh.perm)?;

        log::info!(
            "model ready: {} electrodes, {} nodes, {} elements, {} measurements in {:.2?}",
            n_el,
            mesh.num_nodes(),
            mesh.num_elements(),
            solution.v.len(),
            start.elapsed()
        );
        Ok(Self {
            mesh,
            electrodes,
            protocol,
            forward,
            solution,
        })
    }

    pub fn num_measurements(&self) -> usize {
        self.solution.v.len()
    }

    /// Simulated boundary voltages for the background conductivity
    pub fn simulated_reference(&self) -> Vec<f64> {
        self.solution.v.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EitError;

    #[test]
    fn test_build_layer_circle_model() {
        let config = ReconstructionConfig {
            n_el: 8,
            mesh: MeshConfig::LayerCircle {
                n_fan: 8,
                n_layer: 3,
            },
            ..Default::default()
        };
        let model = EitModel::build(&config).expect("model");
        // opposition drive, adjacent measurement: 4 pairs touch a driver
        assert_eq!(model.num_measurements(), 8 * 4);
        assert_eq!(model.solution.jac.ncols(), model.mesh.num_elements());
    }

    #[test]
    fn test_bad_stimulation_file_blocks_configuration() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stim.txt");
        std::fs::write(&path, "0,4 1,5").expect("write");
        let mut config = ReconstructionConfig {
            n_el: 8,
            mesh: MeshConfig::LayerCircle {
                n_fan: 8,
                n_layer: 2,
            },
            ..Default::default()
        };
        config.protocol.stimulation_file = Some(path);
        let err = EitModel::build(&config).unwrap_err();
        assert!(matches!(err, EitError::Configuration(_)));
    }
}
