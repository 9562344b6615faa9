//! 2D convex hull and point-in-polygon tests

use crate::EPSILON;
use crate::types::Point;

/// Convex hull of a point set (Andrew's monotone chain).
///
/// Vertices are returned counter-clockwise without repeating the first one.
/// Collinear boundary points are dropped.
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup();
    if pts.len() < 3 {
        return pts;
    }

    let turn = |o: &Point, a: &Point, b: &Point| (*a - *o).cross(&(*b - *o));

    let mut lower: Vec<Point> = Vec::with_capacity(pts.len());
    for p in &pts {
        while lower.len() >= 2
            && turn(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= EPSILON
        {
            lower.pop();
        }
        lower.push(*p);
    }

    let mut upper: Vec<Point> = Vec::with_capacity(pts.len());
    for p in pts.iter().rev() {
        while upper.len() >= 2
            && turn(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= EPSILON
        {
            upper.pop();
        }
        upper.push(*p);
    }

    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Even-odd point-in-polygon test.
///
/// Points exactly on an edge may be classified either way.
pub fn polygon_contains(polygon: &[Point], p: Point) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quality::signed_area;

    #[test]
    fn test_square_hull() {
        let pts = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(0.5, 0.5),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
            Point::new(0.5, 0.0),
        ];
        let hull = convex_hull(&pts);
        assert_eq!(hull.len(), 4);
        let area: f64 = (1..hull.len() - 1)
            .map(|i| signed_area(&hull[0], &hull[i], &hull[i + 1]))
            .sum();
        assert!((area - 1.0).abs() < 1e-12, "hull must be counter-clockwise");
    }

    #[test]
    fn test_polygon_contains() {
        let square = [
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ];
        assert!(polygon_contains(&square, Point::new(1.0, 1.0)));
        assert!(polygon_contains(&square, Point::new(0.1, 1.9)));
        assert!(!polygon_contains(&square, Point::new(-0.1, 1.0)));
        assert!(!polygon_contains(&square, Point::new(1.0, 2.5)));
        assert!(!polygon_contains(&square[..2], Point::new(1.0, 0.0)));
    }
}
