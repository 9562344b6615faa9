//! Element orientation and shape quality

use crate::types::{Mesh, Point};
use serde::{Deserialize, Serialize};

/// Signed area of triangle (a, b, c), positive when counter-clockwise
#[inline]
pub fn signed_area(a: &Point, b: &Point, c: &Point) -> f64 {
    0.5 * (*b - *a).cross(&(*c - *a))
}

/// Swap the last two vertices of every clockwise element.
///
/// Returns the number of elements that were flipped.
pub fn check_order(mesh: &mut Mesh) -> usize {
    let mut flipped = 0;
    for e in 0..mesh.elements.len() {
        if mesh.element_area(e) < 0.0 {
            mesh.elements[e].swap(1, 2);
            flipped += 1;
        }
    }
    flipped
}

/// Summary of element sizes and shapes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeshQuality {
    pub min_area: f64,
    pub max_area: f64,
    /// Smallest radius ratio `2·r_in/r_circ` (1 for equilateral)
    pub min_ratio: f64,
    pub mean_ratio: f64,
}

impl MeshQuality {
    pub fn of(mesh: &Mesh) -> Self {
        let mut q = MeshQuality {
            min_area: f64::INFINITY,
            max_area: 0.0,
            min_ratio: f64::INFINITY,
            mean_ratio: 0.0,
        };
        if mesh.elements.is_empty() {
            q.min_area = 0.0;
            q.min_ratio = 0.0;
            return q;
        }
        for e in 0..mesh.num_elements() {
            let area = mesh.element_area(e).abs();
            q.min_area = q.min_area.min(area);
            q.max_area = q.max_area.max(area);
            let ratio = radius_ratio(mesh.element_points(e));
            q.min_ratio = q.min_ratio.min(ratio);
            q.mean_ratio += ratio;
        }
        q.mean_ratio /= mesh.num_elements() as f64;
        q
    }
}

fn radius_ratio([p0, p1, p2]: [Point; 3]) -> f64 {
    let a = p1.distance(&p2);
    let b = p2.distance(&p0);
    let c = p0.distance(&p1);
    let denom = a * b * c;
    if denom <= crate::EPSILON {
        return 0.0;
    }
    ((b + c - a) * (c + a - b) * (a + b - c) / denom).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_area() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(1.0, 0.0);
        let c = Point::new(0.0, 1.0);
        assert!((signed_area(&a, &b, &c) - 0.5).abs() < 1e-15);
        assert!((signed_area(&a, &c, &b) + 0.5).abs() < 1e-15);
    }

    #[test]
    fn test_check_order_repairs_orientation() {
        let mut mesh = Mesh::new(
            vec![
                Point::new(0.0, 0.0),
                Point::new(1.0, 0.0),
                Point::new(0.0, 1.0),
                Point::new(1.0, 1.0),
            ],
            vec![[0, 2, 1], [1, 3, 2]],
        );
        assert_eq!(check_order(&mut mesh), 1);
        assert_eq!(mesh.elements[0], [0, 1, 2]);
        assert!(mesh.element_area(0) > 0.0);
        assert_eq!(check_order(&mut mesh), 0);
    }

    #[test]
    fn test_equilateral_quality() {
        let h = 3.0_f64.sqrt() / 2.0;
        let mesh = Mesh::new(
            vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(0.5, h)],
            vec![[0, 1, 2]],
        );
        let q = MeshQuality::of(&mesh);
        assert!((q.min_ratio - 1.0).abs() < 1e-12);
        assert!((q.min_area - h / 2.0).abs() < 1e-12);
    }
}
