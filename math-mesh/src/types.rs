//! Mesh types for 2D triangular EIT domains

use crate::{MeshError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::{Add, Mul, Sub};

/// A point in the plane
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean norm (distance to origin)
    pub fn norm(&self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Euclidean distance to another point
    pub fn distance(&self, other: &Point) -> f64 {
        (*self - *other).norm()
    }

    /// Midpoint between two points
    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new(0.5 * (self.x + other.x), 0.5 * (self.y + other.y))
    }

    /// z-component of the cross product
    pub fn cross(&self, other: &Point) -> f64 {
        self.x * other.y - self.y * other.x
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;
    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl From<(f64, f64)> for Point {
    fn from(p: (f64, f64)) -> Self {
        Point::new(p.0, p.1)
    }
}

impl From<[f64; 2]> for Point {
    fn from(p: [f64; 2]) -> Self {
        Point::new(p[0], p[1])
    }
}

/// Triangular mesh with a per-element permittivity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    /// Node coordinates
    pub nodes: Vec<Point>,
    /// Counter-clockwise node triples
    pub elements: Vec<[usize; 3]>,
    /// Element permittivity (conductivity), initially uniform
    pub perm: Vec<f64>,
}

impl Mesh {
    /// Create a mesh with uniform unit permittivity
    pub fn new(nodes: Vec<Point>, elements: Vec<[usize; 3]>) -> Self {
        let perm = vec![1.0; elements.len()];
        Self {
            nodes,
            elements,
            perm,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_elements(&self) -> usize {
        self.elements.len()
    }

    /// Vertex coordinates of an element
    pub fn element_points(&self, elem: usize) -> [Point; 3] {
        let [a, b, c] = self.elements[elem];
        [self.nodes[a], self.nodes[b], self.nodes[c]]
    }

    /// Centroid of an element
    pub fn element_centroid(&self, elem: usize) -> Point {
        let [a, b, c] = self.element_points(elem);
        Point::new((a.x + b.x + c.x) / 3.0, (a.y + b.y + c.y) / 3.0)
    }

    /// Centroids of every element
    pub fn element_centroids(&self) -> Vec<Point> {
        (0..self.num_elements())
            .map(|e| self.element_centroid(e))
            .collect()
    }

    /// Signed area of an element (positive for CCW)
    pub fn element_area(&self, elem: usize) -> f64 {
        let [a, b, c] = self.element_points(elem);
        crate::quality::signed_area(&a, &b, &c)
    }

    /// Axis-aligned bounding box `(min, max)`
    pub fn bounding_box(&self) -> (Point, Point) {
        self.nodes.iter().fold(
            (
                Point::new(f64::INFINITY, f64::INFINITY),
                Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
            ),
            |(lo, hi), p| {
                (
                    Point::new(lo.x.min(p.x), lo.y.min(p.y)),
                    Point::new(hi.x.max(p.x), hi.y.max(p.y)),
                )
            },
        )
    }

    /// Reset every element to the same permittivity
    pub fn set_uniform_perm(&mut self, value: f64) {
        self.perm = vec![value; self.elements.len()];
    }

    /// Number of distinct (undirected) edges
    pub fn num_edges(&self) -> usize {
        let mut edges = HashSet::new();
        for &[a, b, c] in &self.elements {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                edges.insert((u.min(v), u.max(v)));
            }
        }
        edges.len()
    }

    /// `V - E + F`: 1 for a disk-like domain, one less per hole
    pub fn euler_characteristic(&self) -> i64 {
        self.num_nodes() as i64 - self.num_edges() as i64 + self.num_elements() as i64
    }

    /// Check index bounds, orientation, conformity and node usage.
    ///
    /// In a conforming counter-clockwise mesh every directed edge belongs
    /// to exactly one element, so an edge is shared by at most two.
    pub fn validate(&self) -> Result<()> {
        if self.perm.len() != self.elements.len() {
            return Err(MeshError::invalid(
                "perm",
                format!(
                    "{} values for {} elements",
                    self.perm.len(),
                    self.elements.len()
                ),
            ));
        }
        let mut used = vec![false; self.nodes.len()];
        for (e, tri) in self.elements.iter().enumerate() {
            for &n in tri {
                if n >= self.nodes.len() {
                    return Err(MeshError::Triangulation(format!(
                        "element {e} references node {n} of {}",
                        self.nodes.len()
                    )));
                }
                used[n] = true;
            }
            let area = self.element_area(e);
            if area <= 0.0 {
                return Err(MeshError::Triangulation(format!(
                    "element {e} has non-positive area {area:.3e}"
                )));
            }
        }
        if let Some(n) = used.iter().position(|u| !u) {
            return Err(MeshError::Triangulation(format!(
                "node {n} is not part of any element"
            )));
        }
        let mut directed = HashSet::with_capacity(3 * self.elements.len());
        for (e, &[a, b, c]) in self.elements.iter().enumerate() {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                if !directed.insert((u, v)) {
                    return Err(MeshError::Triangulation(format!(
                        "element {e} overlaps a neighbour along edge ({u}, {v})"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Ordered node indices of the boundary electrodes.
///
/// Position in the set is the local electrode number used by stimulation
/// patterns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectrodeSet(Vec<usize>);

impl ElectrodeSet {
    /// Validate electrode node indices against a mesh
    pub fn new(nodes: Vec<usize>, mesh: &Mesh) -> Result<Self> {
        if nodes.len() < crate::MIN_ELECTRODES {
            return Err(MeshError::InvalidElectrodeCount {
                count: nodes.len(),
                min: crate::MIN_ELECTRODES,
            });
        }
        for (i, &n) in nodes.iter().enumerate() {
            if n >= mesh.num_nodes() {
                return Err(MeshError::invalid(
                    "electrodes",
                    format!("electrode {i} refers to node {n} of {}", mesh.num_nodes()),
                ));
            }
            if nodes[..i].contains(&n) {
                return Err(MeshError::invalid(
                    "electrodes",
                    format!("node {n} used by two electrodes"),
                ));
            }
        }
        Ok(Self(nodes))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[usize] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter().copied()
    }

    /// Node index of local electrode `i`
    pub fn node(&self, i: usize) -> usize {
        self.0[i]
    }

    pub fn contains(&self, node: usize) -> bool {
        self.0.contains(&node)
    }
}
