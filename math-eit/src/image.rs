//! Reconstruction images
//!
//! The shape of an image is fixed by the active algorithm and reported as
//! an [`ImageKind`] when the algorithm is configured, so consumers can set
//! up their plotting once.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

/// Shape of the images an algorithm produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageKind {
    /// One value per mesh element
    Elements,
    /// One value per mesh node
    Nodes,
    /// Rectangular grid, NaN outside the domain
    Grid,
}

/// Regular grid over the mesh with its exterior mask
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridImage {
    pub xg: Array2<f64>,
    pub yg: Array2<f64>,
    /// `true` for cells outside the convex hull of the mesh
    pub mask: Array2<bool>,
    pub values: Array2<f64>,
}

/// Conductivity change produced from one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Image {
    Elements(Array1<f64>),
    Nodes(Array1<f64>),
    Grid(GridImage),
}

impl Image {
    pub fn kind(&self) -> ImageKind {
        match self {
            Image::Elements(_) => ImageKind::Elements,
            Image::Nodes(_) => ImageKind::Nodes,
            Image::Grid(_) => ImageKind::Grid,
        }
    }

    /// Number of pixels, masked grid cells included
    pub fn len(&self) -> usize {
        match self {
            Image::Elements(v) | Image::Nodes(v) => v.len(),
            Image::Grid(g) => g.values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All values in storage order (row-major for grids)
    pub fn values(&self) -> Vec<f64> {
        match self {
            Image::Elements(v) | Image::Nodes(v) => v.to_vec(),
            Image::Grid(g) => g.values.iter().copied().collect(),
        }
    }

    /// Largest finite magnitude, 0 for an image without finite values
    pub fn max_abs(&self) -> f64 {
        self.values()
            .into_iter()
            .filter(|v| v.is_finite())
            .fold(0.0, |acc, v| acc.max(v.abs()))
    }

    /// Index of the largest finite magnitude
    pub fn argmax_abs(&self) -> Option<usize> {
        self.values()
            .into_iter()
            .enumerate()
            .filter(|(_, v)| v.is_finite())
            .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
            .map(|(i, _)| i)
    }
}
