//! Planar primitives used by crossing evaluation.

use nalgebra::{Point2, Vector2};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A point in frame pixel coordinates.
pub type Point = Point2<f32>;

/// Slack applied to both intersection parameters, so a trajectory that ends
/// just short of a line endpoint still counts.
pub const INTERSECTION_TOLERANCE: f32 = 0.1;

const PARALLEL_EPSILON: f32 = 1e-6;
const COLLINEAR_DISTANCE: f32 = 1e-3;

/// The counted segment `(x1, y1) - (x2, y2)` in frame coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossingLine {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl CrossingLine {
    /// Build a line, rejecting non-finite coordinates and zero-length segments.
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Result<Self, Error> {
        let line = Self { x1, y1, x2, y2 };
        line.validate()?;
        Ok(line)
    }

    pub fn validate(&self) -> Result<(), Error> {
        let coords = [self.x1, self.y1, self.x2, self.y2];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(Error::InvalidLine(format!("non-finite coordinate in {coords:?}")));
        }
        if self.length() <= 0.0 {
            return Err(Error::InvalidLine(format!(
                "zero-length segment at ({}, {})",
                self.x1, self.y1
            )));
        }
        Ok(())
    }

    #[inline]
    pub fn start(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    #[inline]
    pub fn end(&self) -> Point {
        Point::new(self.x2, self.y2)
    }

    #[inline]
    pub fn length(&self) -> f32 {
        nalgebra::distance(&self.start(), &self.end())
    }

    /// Whether the movement `from -> to` traverses this line.
    pub fn is_crossed_by(&self, from: &Point, to: &Point) -> bool {
        segments_intersect(from, to, &self.start(), &self.end(), INTERSECTION_TOLERANCE)
    }
}

impl Default for CrossingLine {
    /// Vertical line through the middle of a 640x480 frame.
    fn default() -> Self {
        Self {
            x1: 320.0,
            y1: 0.0,
            x2: 320.0,
            y2: 480.0,
        }
    }
}

#[inline]
fn cross(a: &Vector2<f32>, b: &Vector2<f32>) -> f32 {
    a.x * b.y - a.y * b.x
}

#[inline]
fn within(t: f32, tolerance: f32) -> bool {
    (-tolerance..=1.0 + tolerance).contains(&t)
}

/// Parametric segment intersection test between `p1-p2` and `q1-q2`.
///
/// Both parameters are accepted in `[-tolerance, 1 + tolerance]`. Collinear
/// segments intersect when their projections onto `q1-q2` overlap within the
/// same relaxed range. A zero-length `p1-p2` never intersects.
pub fn segments_intersect(
    p1: &Point,
    p2: &Point,
    q1: &Point,
    q2: &Point,
    tolerance: f32,
) -> bool {
    let r = p2 - p1;
    let s = q2 - q1;
    let s_len_sq = s.norm_squared();
    if r.norm_squared() == 0.0 || s_len_sq == 0.0 {
        return false;
    }

    let qp = q1 - p1;
    let denom = cross(&r, &s);

    if denom.abs() <= PARALLEL_EPSILON * r.norm() * s.norm() {
        // Parallel: only collinear segments can meet.
        let offset = cross(&(p1 - q1), &s).abs() / s_len_sq.sqrt();
        if offset > COLLINEAR_DISTANCE {
            return false;
        }
        let t1 = (p1 - q1).dot(&s) / s_len_sq;
        let t2 = (p2 - q1).dot(&s) / s_len_sq;
        let (lo, hi) = if t1 <= t2 { (t1, t2) } else { (t2, t1) };
        return hi >= -tolerance && lo <= 1.0 + tolerance;
    }

    let t = cross(&qp, &s) / denom;
    let u = cross(&qp, &r) / denom;
    within(t, tolerance) && within(u, tolerance)
}
