//! 2D point math for wall outlines
//!
//! Points are plain `f64` pairs. The only non-trivial operation is
//! `inset_shape`, which offsets a closed polygon along each vertex bisector.

use std::ops::{Add, Sub};
use thiserror::Error;

/// Below this, a vertex bisector is considered parallel to its edges
const DEGENERATE_EPSILON: f64 = 1e-9;

/// Errors from polygon operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    /// Vertex whose neighbours coincide with it or fold back onto the same line
    #[error("degenerate polygon at vertex {index}")]
    DegeneratePolygon { index: usize },
}

/// 2D point / vector
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Build a point from polar coordinates
    pub fn polar(r: f64, theta: f64) -> Self {
        Self {
            x: r * theta.cos(),
            y: r * theta.sin(),
        }
    }

    pub fn length(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Unit vector in the same direction, or None for the zero vector
    pub fn normalize(self) -> Option<Point> {
        let l = self.length();
        if l == 0.0 {
            return None;
        }
        Some(Point {
            x: self.x / l,
            y: self.y / l,
        })
    }

    /// Angle from the +X axis, in radians (-PI..=PI)
    pub fn angle(self) -> f64 {
        self.y.atan2(self.x)
    }

    /// `self - other`
    pub fn diff(self, other: Point) -> Point {
        self - other
    }
}

impl Add for Point {
    type Output = Point;
    fn add(self, other: Point) -> Point {
        Point {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }
}

impl Sub for Point {
    type Output = Point;
    fn sub(self, other: Point) -> Point {
        Point {
            x: self.x - other.x,
            y: self.y - other.y,
        }
    }
}

/// Integer grid corner (cell corners in room space)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridPoint {
    pub x: i32,
    pub y: i32,
}

impl GridPoint {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl From<GridPoint> for Point {
    fn from(p: GridPoint) -> Self {
        Point::new(p.x as f64, p.y as f64)
    }
}

/// Offset a closed polygon by `delta` along each vertex's bisector.
///
/// Edges wrap around (last point connects to the first). For each vertex the
/// offset distance is `delta / sin(span)`, where `span` is half the signed
/// angle between the directions toward the previous and next vertex.
/// Straight-through collinear vertices are fine (span is a right angle);
/// a vertex that folds back on itself, or coincides with a neighbour, fails.
pub fn inset_shape(points: &[Point], delta: f64) -> Result<Vec<Point>, GeometryError> {
    let n = points.len();
    let get = |i: usize| points[i % n];

    points
        .iter()
        .enumerate()
        .map(|(i, &curr)| {
            let prev = get(i + n - 1);
            let next = get(i + 1);

            let degenerate = GeometryError::DegeneratePolygon { index: i };
            let a = prev.diff(curr).normalize().ok_or(degenerate.clone())?;
            let b = next.diff(curr).normalize().ok_or(degenerate.clone())?;

            let a_angle = a.angle();
            let b_angle = b.angle();
            let span_angle = (a_angle - b_angle) / 2.0;
            let c_angle = (a_angle + b_angle) / 2.0;

            // sin(span) = delta / h
            let sin_span = span_angle.sin();
            if sin_span.abs() < DEGENERATE_EPSILON {
                return Err(degenerate);
            }
            let h = delta / sin_span;

            Ok(curr + Point::polar(h, c_angle))
        })
        .collect()
}

/// Inset an integer grid cycle (wall outline) into floating point space
pub fn inset_cycle(cycle: &[GridPoint], delta: f64) -> Result<Vec<Point>, GeometryError> {
    let points: Vec<Point> = cycle.iter().copied().map(Point::from).collect();
    inset_shape(&points, delta)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Point, b: Point) -> bool {
        (a.x - b.x).abs() < 1e-9 && (a.y - b.y).abs() < 1e-9
    }

    fn unit_square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(0.0, 1.0),
        ]
    }

    #[test]
    fn test_point_ops() {
        let a = Point::new(3.0, 4.0);
        assert_eq!(a.length(), 5.0);
        assert_eq!(a + Point::new(1.0, 1.0), Point::new(4.0, 5.0));
        assert_eq!(a.diff(Point::new(1.0, 1.0)), Point::new(2.0, 3.0));
        assert!(approx(a.normalize().unwrap(), Point::new(0.6, 0.8)));
        assert!(Point::default().normalize().is_none());
    }

    #[test]
    fn test_polar_and_angle() {
        let p = Point::polar(2.0, std::f64::consts::FRAC_PI_2);
        assert!(approx(p, Point::new(0.0, 2.0)));
        assert!((p.angle() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_inset_unit_square() {
        let inset = inset_shape(&unit_square(), 0.1).unwrap();
        assert_eq!(inset.len(), 4);

        // Every corner moves diagonally by delta * sqrt(2)
        for (orig, moved) in unit_square().iter().zip(&inset) {
            let d = moved.diff(*orig).length();
            assert!((d - 0.1 * std::f64::consts::SQRT_2).abs() < 1e-9);
        }

        // Counter-clockwise winding in y-up space: positive delta moves inward
        assert!(approx(inset[0], Point::new(0.1, 0.1)));
        assert!(approx(inset[2], Point::new(0.9, 0.9)));
    }

    #[test]
    fn test_inset_straight_collinear_vertex() {
        // (1,0) sits on a straight edge, which is not degenerate
        let shape = vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(2.0, 1.0),
            Point::new(0.0, 1.0),
        ];
        let inset = inset_shape(&shape, 0.25).unwrap();
        assert!(approx(inset[1], Point::new(1.0, 0.25)));
        assert!(inset.iter().all(|p| p.x.is_finite() && p.y.is_finite()));
    }

    #[test]
    fn test_inset_spike_is_degenerate() {
        // (2,0) -> (1,0) doubles back along the same line
        let shape = vec![
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(1.0, 1.0),
        ];
        assert_eq!(
            inset_shape(&shape, 0.1),
            Err(GeometryError::DegeneratePolygon { index: 1 })
        );
    }

    #[test]
    fn test_inset_duplicate_point_is_degenerate() {
        let shape = vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(1.0, 1.0),
        ];
        assert!(matches!(
            inset_shape(&shape, 0.1),
            Err(GeometryError::DegeneratePolygon { .. })
        ));
    }

    #[test]
    fn test_inset_cycle_from_grid() {
        let cycle = vec![
            GridPoint::new(0, 0),
            GridPoint::new(1, 0),
            GridPoint::new(1, 1),
            GridPoint::new(0, 1),
        ];
        let inset = inset_cycle(&cycle, 0.1).unwrap();
        assert!(approx(inset[1], Point::new(0.9, 0.1)));
    }
}
