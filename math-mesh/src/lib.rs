//! 2D mesh generation for electrical impedance tomography
//!
//! Builds triangulated domains with a fixed number of boundary electrodes
//! placed on mesh nodes.
//!
//! # Features
//!
//! - **Distmesh**: force-based node relaxation on any signed distance function
//! - **Layered circle**: deterministic fan mesh of the unit disk
//! - **Shapes**: circle, ellipse, rectangle and their boolean combinations
//! - **Post-processing**: orientation repair, quality statistics, convex hull
//! - **Anomalies**: paint circular inclusions into the element permittivity
//!
//! # Example
//!
//! ```ignore
//! use math_eit_mesh::{DistMeshConfig, create};
//!
//! let (mesh, electrodes) = create(16, &DistMeshConfig::default())?;
//! assert_eq!(electrodes.len(), 16);
//! ```

mod anomaly;
mod builder;
mod circle;
mod delaunay;
mod distmesh;
mod hull;
mod quality;
pub mod shape;
mod types;

pub use anomaly::{Anomaly, set_perm};
pub use builder::{build, create};
pub use circle::layer_circle;
pub use delaunay::delaunay;
pub use distmesh::{DistMesh, DistMeshConfig};
pub use hull::{convex_hull, polygon_contains};
pub use quality::{MeshQuality, check_order, signed_area};
pub use types::{ElectrodeSet, Mesh, Point};

/// Error types for mesh generation
#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("Invalid electrode count {count}: at least {min} electrodes are required")]
    InvalidElectrodeCount { count: usize, min: usize },

    #[error("Size function returned {value} at ({x:.4}, {y:.4}); it must be finite and positive")]
    InvalidSizeFunction { x: f64, y: f64, value: f64 },

    #[error("No lattice point lies inside the domain")]
    EmptyDomain,

    #[error("Invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("Fixed point {index} is not attached to any element")]
    OrphanedFixedPoint { index: usize },

    #[error("Triangulation failed: {0}")]
    Triangulation(String),
}

impl MeshError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MeshError>;

/// Numerical tolerance for degenerate geometry
pub(crate) const EPSILON: f64 = 1e-12;

/// Smallest electrode count for which adjacent measurements exist
pub const MIN_ELECTRODES: usize = 4;
