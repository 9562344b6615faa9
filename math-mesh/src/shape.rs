//! Signed distance and size functions
//!
//! A domain is described by a signed distance function `fd(p)`, negative
//! inside, zero on the boundary and positive outside. A size function
//! `fh(p)` gives the relative desired edge length at `p`.

use crate::types::Point;
use std::f64::consts::PI;

/// Circle of radius `r` centered at `pc`
pub fn circle(pc: Point, r: f64) -> impl Fn(Point) -> f64 + Clone + Send + Sync {
    move |p: Point| (p - pc).norm() - r
}

/// Unit circle at the origin
pub fn unit_circle(p: Point) -> f64 {
    p.norm() - 1.0
}

/// Ellipse centered at `pc` with semi-axes `a` (x) and `b` (y).
///
/// This is the scaled-circle approximation, exact only on the boundary.
pub fn ellipse(pc: Point, a: f64, b: f64) -> impl Fn(Point) -> f64 + Clone + Send + Sync {
    move |p: Point| {
        let q = p - pc;
        Point::new(q.x / a, q.y / b).norm() - 1.0
    }
}

/// Axis-aligned rectangle with bottom-left `p1` and top-right `p2`
pub fn rectangle(p1: Point, p2: Point) -> impl Fn(Point) -> f64 + Clone + Send + Sync {
    move |p: Point| {
        let left = -(p.x - p1.x).min(p.y - p1.y);
        let right = (p.x - p2.x).max(p.y - p2.y);
        left.max(right)
    }
}

/// Union of two domains
pub fn dist_union<A, B>(d1: A, d2: B) -> impl Fn(Point) -> f64 + Clone
where
    A: Fn(Point) -> f64 + Clone,
    B: Fn(Point) -> f64 + Clone,
{
    move |p| d1(p).min(d2(p))
}

/// Intersection of two domains
pub fn dist_intersect<A, B>(d1: A, d2: B) -> impl Fn(Point) -> f64 + Clone
where
    A: Fn(Point) -> f64 + Clone,
    B: Fn(Point) -> f64 + Clone,
{
    move |p| d1(p).max(d2(p))
}

/// `d1` with `d2` carved out
pub fn dist_diff<A, B>(d1: A, d2: B) -> impl Fn(Point) -> f64 + Clone
where
    A: Fn(Point) -> f64 + Clone,
    B: Fn(Point) -> f64 + Clone,
{
    move |p| d1(p).max(-d2(p))
}

/// Uniform size function
pub fn area_uniform(_p: Point) -> f64 {
    1.0
}

/// Move `p` onto the zero level set of `fd` along the numerical gradient
pub fn edge_project<F>(p: Point, fd: &F, h0: f64) -> Point
where
    F: Fn(Point) -> f64 + ?Sized,
{
    let d_eps = f64::EPSILON.sqrt() * h0;
    let d = fd(p);
    let gx = (fd(Point::new(p.x + d_eps, p.y)) - d) / d_eps;
    let gy = (fd(Point::new(p.x, p.y + d_eps)) - d) / d_eps;
    let g_norm = gx.hypot(gy) + d_eps;
    Point::new(p.x - d * gx / g_norm, p.y - d * gy / g_norm)
}

/// `n_el` points on the boundary of `fd` at equally spaced angles around `pc`.
///
/// Point `i` lies on the ray `(-cos θ, sin θ)` with `θ = 2πi/n_el`, so
/// numbering starts on the negative x axis and runs clockwise.
pub fn fix_points_fd<F>(fd: &F, n_el: usize, pc: Point) -> Vec<Point>
where
    F: Fn(Point) -> f64 + ?Sized,
{
    const MAX_ITER: usize = 50;
    const TOL: f64 = 1e-10;

    let directions: Vec<Point> = (0..n_el)
        .map(|i| {
            let theta = 2.0 * PI * i as f64 / n_el as f64;
            Point::new(-theta.cos(), theta.sin())
        })
        .collect();

    let mut pts: Vec<Point> = directions.iter().map(|&u| pc + u * 10.0).collect();
    for _ in 0..=MAX_ITER {
        let next: Vec<Point> = pts
            .iter()
            .zip(&directions)
            .map(|(&p, &u)| {
                let r = (edge_project(p, fd, 1.0) - pc).norm();
                pc + u * r
            })
            .collect();
        let moved: f64 = next.iter().zip(&pts).map(|(a, b)| a.distance(b)).sum();
        pts = next;
        if moved < TOL {
            break;
        }
    }
    pts
}

/// `ppl` points on a circle, numbered like [`fix_points_fd`]
pub fn fix_points_circle(pc: Point, offset: f64, r: f64, ppl: usize) -> Vec<Point> {
    let delta = 2.0 * PI / ppl as f64;
    (0..ppl)
        .map(|i| {
            let theta = (i as f64 + offset) * delta;
            Point::new(pc.x - r * theta.cos(), pc.y + r * theta.sin())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_sign() {
        let fd = circle(Point::new(0.5, 0.5), 0.5);
        assert!(fd(Point::new(0.5, 0.5)) < 0.0);
        assert!(fd(Point::new(2.0, 0.5)) > 0.0);
        assert!(fd(Point::new(1.0, 0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_rectangle() {
        let fd = rectangle(Point::new(0.0, 0.0), Point::new(2.0, 1.0));
        assert!((fd(Point::new(1.0, 0.5)) + 0.5).abs() < 1e-12);
        assert!((fd(Point::new(3.0, 0.5)) - 1.0).abs() < 1e-12);
        assert!(fd(Point::new(0.0, 0.3)).abs() < 1e-12);
    }

    #[test]
    fn test_boolean_ops() {
        let outer = circle(Point::new(0.0, 0.0), 1.0);
        let hole = circle(Point::new(0.0, 0.0), 0.3);
        let ring = dist_diff(outer.clone(), hole.clone());
        assert!(ring(Point::new(0.0, 0.0)) > 0.0);
        assert!(ring(Point::new(0.6, 0.0)) < 0.0);

        let both = dist_union(outer.clone(), circle(Point::new(2.0, 0.0), 0.5));
        assert!(both(Point::new(2.0, 0.0)) < 0.0);

        let lens = dist_intersect(outer, circle(Point::new(1.0, 0.0), 1.0));
        assert!(lens(Point::new(0.5, 0.0)) < 0.0);
        assert!(lens(Point::new(-0.5, 0.0)) > 0.0);
    }

    #[test]
    fn test_ellipse_boundary() {
        let fd = ellipse(Point::new(0.0, 0.0), 2.0, 1.0);
        assert!(fd(Point::new(2.0, 0.0)).abs() < 1e-12);
        assert!(fd(Point::new(0.0, 1.0)).abs() < 1e-12);
        assert!(fd(Point::new(1.0, 0.0)) < 0.0);
    }

    #[test]
    fn test_edge_project_circle() {
        let p = edge_project(Point::new(1.5, 0.0), &unit_circle, 1.0);
        assert!((p.norm() - 1.0).abs() < 1e-6);
        let q = edge_project(Point::new(0.0, 0.5), &unit_circle, 1.0);
        assert!((q.norm() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_fix_points_on_boundary() {
        let pts = fix_points_fd(&unit_circle, 16, Point::new(0.0, 0.0));
        assert_eq!(pts.len(), 16);
        for p in &pts {
            assert!(unit_circle(*p).abs() < 1e-6);
        }
        assert!((pts[0].x + 1.0).abs() < 1e-6);
        assert!(pts[0].y.abs() < 1e-6);
        // clockwise numbering: electrode 4 of 16 sits on top
        assert!((pts[4].y - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_fix_points_circle() {
        let pts = fix_points_circle(Point::new(1.0, 1.0), 0.0, 2.0, 8);
        assert_eq!(pts.len(), 8);
        for p in pts {
            assert!(((p - Point::new(1.0, 1.0)).norm() - 2.0).abs() < 1e-12);
        }
    }
}
