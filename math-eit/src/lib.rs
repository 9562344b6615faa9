//! Electrical impedance tomography reconstruction
//!
//! Builds a mesh and forward model for a ring of electrodes, sets up one of
//! three inversion strategies and turns a stream of measurement frames into
//! conductivity-change images.
//!
//! # Algorithms
//!
//! | algorithm         | image                      |
//! |-------------------|----------------------------|
//! | `back_projection` | per element                |
//! | `jacobian`        | per node                   |
//! | `greit`           | `n × n` grid, NaN outside  |
//!
//! # Example
//!
//! ```ignore
//! use math_eit::{Algorithm, FrameOutcome, Orchestrator, ReconstructionConfig};
//!
//! let mut orch = Orchestrator::new(ReconstructionConfig::default());
//! orch.reset(Algorithm::Jacobian, 16)?;
//! orch.start()?;
//! orch.process_frame(reference); // first frame becomes the baseline
//! if let FrameOutcome::Image(image) = orch.process_frame(frame) {
//!     // ...
//! }
//! ```

pub mod config;
pub mod error;
pub mod image;
pub mod interp;
pub mod model;
pub mod orchestrator;
pub mod reference;
pub mod strategy;
pub mod worker;

pub use config::{MeshConfig, ProtocolConfig, ReconstructionConfig, ReferenceSource};
pub use error::{EitError, Result};
pub use image::{GridImage, Image, ImageKind};
pub use model::EitModel;
pub use orchestrator::{Frame, FrameOutcome, Orchestrator, State};
pub use reference::{Record, load_reference, parse_record, parse_records};
pub use strategy::{Algorithm, BackProjection, Greit, JacobianSolver, Reconstructor};
pub use worker::{Command, Event, ReconstructionWorker};

/// Library version
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
