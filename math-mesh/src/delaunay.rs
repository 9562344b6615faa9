//! Bowyer-Watson Delaunay triangulation
//!
//! Each inserted point carves a cavity out of the current triangulation,
//! grown across triangle adjacency from the triangle that contains it. The
//! cavity is retriangulated as a fan around the new point. A neighbour is
//! also pulled into the cavity whenever the shared edge is not strictly
//! visible from the new point, so the cavity stays star-shaped even when
//! points are cocircular (every electrode ring is) and the fan never folds.

use crate::quality::signed_area;
use crate::types::Point;
use crate::{EPSILON, MeshError, Result};
use std::collections::HashMap;

/// Scale of the enclosing super-triangle relative to the point cloud
const SUPER_SCALE: f64 = 20.0;

/// Positive when `d` lies strictly inside the circumcircle of the
/// counter-clockwise triangle (a, b, c)
fn incircle(a: Point, b: Point, c: Point, d: Point) -> f64 {
    let (ad, bd, cd) = (a - d, b - d, c - d);
    let (la, lb, lc) = (
        ad.x * ad.x + ad.y * ad.y,
        bd.x * bd.x + bd.y * bd.y,
        cd.x * cd.x + cd.y * cd.y,
    );
    la * bd.cross(&cd) - lb * ad.cross(&cd) + lc * ad.cross(&bd)
}

/// Triangle store with directed-edge adjacency
struct Triangulation {
    pts: Vec<Point>,
    /// Counter-clockwise triangles, `None` once removed
    tris: Vec<Option<[usize; 3]>>,
    /// Directed edge `(a, b)` to the triangle that has it counter-clockwise
    owner: HashMap<(usize, usize), usize>,
    /// Area below which an edge does not count as visible
    area_tol: f64,
}

impl Triangulation {
    fn add(&mut self, a: usize, b: usize, c: usize) {
        let id = self.tris.len();
        self.tris.push(Some([a, b, c]));
        for (u, v) in [(a, b), (b, c), (c, a)] {
            self.owner.insert((u, v), id);
        }
    }

    fn remove(&mut self, id: usize) {
        if let Some([a, b, c]) = self.tris[id].take() {
            for (u, v) in [(a, b), (b, c), (c, a)] {
                if self.owner.get(&(u, v)) == Some(&id) {
                    self.owner.remove(&(u, v));
                }
            }
        }
    }

    /// Triangle containing `p`, or the one it is least outside of
    fn locate(&self, p: Point) -> Option<usize> {
        let pts = &self.pts;
        self.tris
            .iter()
            .enumerate()
            .filter_map(|(id, t)| t.map(|t| (id, t)))
            .map(|(id, [a, b, c])| {
                let margin = signed_area(&pts[a], &pts[b], &p)
                    .min(signed_area(&pts[b], &pts[c], &p))
                    .min(signed_area(&pts[c], &pts[a], &p));
                (id, margin)
            })
            .max_by(|x, y| x.1.total_cmp(&y.1))
            .map(|(id, _)| id)
    }

    fn insert(&mut self, i: usize) -> Result<()> {
        let p = self.pts[i];
        let start = self
            .locate(p)
            .ok_or_else(|| MeshError::Triangulation("empty triangulation".into()))?;

        let mut in_cavity = vec![false; self.tris.len()];
        in_cavity[start] = true;
        let mut cavity = vec![start];
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let Some([a, b, c]) = self.tris[id] else {
                continue;
            };
            for (u, v) in [(a, b), (b, c), (c, a)] {
                let Some(&nb) = self.owner.get(&(v, u)) else {
                    continue;
                };
                if in_cavity[nb] {
                    continue;
                }
                let Some([x, y, z]) = self.tris[nb] else {
                    continue;
                };
                let hidden = signed_area(&self.pts[u], &self.pts[v], &p) <= self.area_tol;
                let encroached = incircle(self.pts[x], self.pts[y], self.pts[z], p) > 0.0;
                if hidden || encroached {
                    in_cavity[nb] = true;
                    cavity.push(nb);
                    stack.push(nb);
                }
            }
        }

        let mut boundary = Vec::new();
        for &id in &cavity {
            let Some([a, b, c]) = self.tris[id] else {
                continue;
            };
            for (u, v) in [(a, b), (b, c), (c, a)] {
                let outside = self
                    .owner
                    .get(&(v, u))
                    .is_none_or(|&nb| !in_cavity[nb]);
                if outside {
                    boundary.push((u, v));
                }
            }
        }
        for &id in &cavity {
            self.remove(id);
        }
        for (u, v) in boundary {
            self.add(u, v, i);
        }
        Ok(())
    }
}

/// Delaunay triangulation of a point set.
///
/// Returns counter-clockwise index triples into `points`; degenerate
/// (zero-area) triangles are dropped.
pub fn delaunay(points: &[Point]) -> Result<Vec<[usize; 3]>> {
    let n = points.len();
    if n < 3 {
        return Err(MeshError::Triangulation(format!(
            "need at least 3 points, got {n}"
        )));
    }
    if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(MeshError::Triangulation("non-finite point".into()));
    }

    let (lo, hi) = points.iter().fold(
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
    );
    let extent = (hi.x - lo.x).max(hi.y - lo.y);
    if extent <= EPSILON {
        return Err(MeshError::Triangulation("all points coincide".into()));
    }
    let mid = lo.midpoint(&hi);
    let d = extent * SUPER_SCALE;

    let mut pts = points.to_vec();
    pts.push(Point::new(mid.x - d, mid.y - d));
    pts.push(Point::new(mid.x + d, mid.y - d));
    pts.push(Point::new(mid.x, mid.y + d));

    let area_tol = EPSILON * extent * extent;
    let mut tri = Triangulation {
        pts,
        tris: Vec::with_capacity(6 * n),
        owner: HashMap::with_capacity(9 * n),
        area_tol,
    };
    tri.add(n, n + 1, n + 2);
    for i in 0..n {
        tri.insert(i)?;
    }

    Ok(tri
        .tris
        .into_iter()
        .flatten()
        .filter(|v| v.iter().all(|&k| k < n))
        .filter(|v| signed_area(&points[v[0]], &points[v[1]], &points[v[2]]) > area_tol)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn total_area(points: &[Point], tris: &[[usize; 3]]) -> f64 {
        tris.iter()
            .map(|t| signed_area(&points[t[0]], &points[t[1]], &points[t[2]]))
            .sum()
    }

    #[test]
    fn test_square() {
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
            Point::new(0.4, 0.6),
        ];
        let tris = delaunay(&pts).expect("triangulation");
        assert_eq!(tris.len(), 4);
        assert!((total_area(&pts, &tris) - 1.0).abs() < 1e-12);
        for t in &tris {
            assert!(signed_area(&pts[t[0]], &pts[t[1]], &pts[t[2]]) > 0.0);
        }
    }

    #[test]
    fn test_empty_circumcircles() {
        let mut pts = Vec::new();
        for i in 0..7 {
            for j in 0..6 {
                let jitter = 0.013 * ((i * 7 + j * 3) % 5) as f64;
                pts.push(Point::new(i as f64 * 0.3 + jitter, j as f64 * 0.25 - jitter));
            }
        }
        let tris = delaunay(&pts).expect("triangulation");

        // convex hull of a grid-like cloud: every point is used
        let used: HashSet<usize> = tris.iter().flatten().copied().collect();
        assert_eq!(used.len(), pts.len());

        for t in &tris {
            for (k, p) in pts.iter().enumerate() {
                if t.contains(&k) {
                    continue;
                }
                assert!(incircle(pts[t[0]], pts[t[1]], pts[t[2]], *p) <= 1e-12);
            }
        }
    }

    #[test]
    fn test_cocircular_ring_with_center() {
        let n = 32;
        let mut pts: Vec<Point> = (0..n)
            .map(|k| {
                let theta = 2.0 * std::f64::consts::PI * k as f64 / n as f64;
                Point::new(theta.cos(), theta.sin())
            })
            .collect();
        pts.push(Point::new(0.0, 0.0));
        let tris = delaunay(&pts).expect("triangulation");

        let polygon = 0.5 * n as f64 * (2.0 * std::f64::consts::PI / n as f64).sin();
        assert!(
            (total_area(&pts, &tris) - polygon).abs() < 1e-9,
            "area {} vs polygon {polygon}",
            total_area(&pts, &tris)
        );
        // the only Delaunay triangulation is the fan around the center
        assert_eq!(tris.len(), n);
        assert!(tris.iter().all(|t| t.contains(&n)));

        let mut directed = HashSet::new();
        for &[a, b, c] in &tris {
            for edge in [(a, b), (b, c), (c, a)] {
                assert!(directed.insert(edge), "edge {edge:?} used twice");
            }
        }
    }

    #[test]
    fn test_cocircular_rings_do_not_overlap() {
        // two concentric rings, inner one rotated: many exact ties
        let mut pts = Vec::new();
        for (r, offset, n) in [(1.0, 0.0, 16), (0.5, 0.5, 8)] {
            for k in 0..n {
                let theta = 2.0 * std::f64::consts::PI * (k as f64 + offset) / n as f64;
                pts.push(Point::new(r * theta.cos(), r * theta.sin()));
            }
        }
        let tris = delaunay(&pts).expect("triangulation");
        let polygon = 0.5 * 16.0 * (2.0 * std::f64::consts::PI / 16.0).sin();
        assert!((total_area(&pts, &tris) - polygon).abs() < 1e-9);
        let used: HashSet<usize> = tris.iter().flatten().copied().collect();
        assert_eq!(used.len(), pts.len());
    }

    #[test]
    fn test_too_few_points() {
        assert!(delaunay(&[Point::new(0.0, 0.0), Point::new(1.0, 0.0)]).is_err());
        let same = vec![Point::new(1.0, 1.0); 4];
        assert!(delaunay(&same).is_err());
    }
}
