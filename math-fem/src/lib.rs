//! Finite element forward model for electrical impedance tomography
//!
//! Linear triangular elements on a 2D mesh, point electrodes on the
//! boundary, one grounded reference node.
//!
//! # Features
//!
//! - **Stiffness**: per-element `K_e` cached once per mesh, global assembly
//!   for real conductivity or complex admittivity
//! - **Protocols**: adjacent, opposition or file-defined stimulation, `std`
//!   and `fmmu` measurement ordering
//! - **Outputs**: boundary voltages, Jacobian and smear matrix
//! - **Solvers**: dense LU or Jacobi-preconditioned CG
//!
//! # Example
//!
//! ```ignore
//! use math_eit_fem::{Forward, MeasurementParser, Protocol, StimulationPattern};
//! use math_eit_mesh::layer_circle;
//!
//! let (mesh, electrodes) = layer_circle(16, 8, 8)?;
//! let protocol = Protocol::new(
//!     StimulationPattern::adjacent(16)?,
//!     16,
//!     1,
//!     MeasurementParser::Std,
//! )?;
//! let fwd = Forward::new(&mesh, &electrodes)?;
//! let solution = fwd.solve_eit(&protocol, &mesh.perm)?;
//! ```

pub mod error;
pub mod forward;
pub mod protocol;
pub mod stiffness;

pub use error::{FemError, Result};
pub use forward::{Forward, ForwardSolution, SolverKind};
pub use protocol::{
    MeasurementParser, Protocol, StimulationPattern, load_stimulation_file, scan_lines,
    voltage_meter,
};
pub use stiffness::{ElementStiffness, assemble, compute_ke, element_stiffness};

/// Library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
