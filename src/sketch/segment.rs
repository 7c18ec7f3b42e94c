//! Line segments and the robust predicates everything else in `sketch` is built on.

use crate::float_types::Real;
use crate::traits::PlanarOps;
use geo::Coord;
use geo::kernels::{Kernel, Orientation, RobustKernel};
use nalgebra::{Matrix3, Point2, Vector2};
use serde::{Deserialize, Serialize};

/// A directed segment from `a` to `b` in the sheet plane.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment2 {
    pub a: Point2<Real>,
    pub b: Point2<Real>,
}

#[inline]
fn coord(p: &Point2<Real>) -> Coord<Real> {
    Coord { x: p.x, y: p.y }
}

/// Exact orientation of `r` relative to the directed line `p -> q`.
#[inline]
pub fn orient(p: &Point2<Real>, q: &Point2<Real>, r: &Point2<Real>) -> Orientation {
    RobustKernel::orient2d(coord(p), coord(q), coord(r))
}

/// `r` lies within the bounding box of `p`,`q` (only meaningful for collinear points).
#[inline]
fn on_segment_box(p: &Point2<Real>, q: &Point2<Real>, r: &Point2<Real>) -> bool {
    r.x >= p.x.min(q.x) && r.x <= p.x.max(q.x) && r.y >= p.y.min(q.y) && r.y <= p.y.max(q.y)
}

/// Point-to-segment minimum distance and the closest point on the segment.
pub fn point_segment_distance(
    p: &Point2<Real>,
    a: &Point2<Real>,
    b: &Point2<Real>,
) -> (Real, Point2<Real>) {
    let ab = b - a;
    let ap = p - a;
    let ab_len2 = ab.norm_squared();

    if ab_len2 == 0.0 {
        // Degenerate segment
        return ((p - a).norm(), *a);
    }

    let t = (ap.dot(&ab) / ab_len2).clamp(0.0, 1.0);
    let closest = a + ab * t;
    ((p - closest).norm(), closest)
}

impl Segment2 {
    #[inline]
    pub const fn new(a: Point2<Real>, b: Point2<Real>) -> Self {
        Self { a, b }
    }

    #[inline]
    pub fn length(&self) -> Real {
        (self.b - self.a).norm()
    }

    #[inline]
    pub fn midpoint(&self) -> Point2<Real> {
        nalgebra::center(&self.a, &self.b)
    }

    /// Unit direction `a -> b`, `None` for a zero-length segment.
    pub fn direction(&self) -> Option<Vector2<Real>> {
        let d = self.b - self.a;
        let len = d.norm();
        if len == 0.0 { None } else { Some(d / len) }
    }

    /// Unit left-hand normal (direction rotated by +90°).
    pub fn normal(&self) -> Option<Vector2<Real>> {
        self.direction().map(|d| Vector2::new(-d.y, d.x))
    }

    /// Signed perpendicular distance of `p` from the supporting line,
    /// positive on the left of `a -> b`.
    pub fn signed_distance(&self, p: &Point2<Real>) -> Real {
        let d = self.b - self.a;
        let len = d.norm();
        if len == 0.0 {
            return (p - self.a).norm();
        }
        d.perp(&(p - self.a)) / len
    }

    /// Position of the projection of `p` along the segment, in length units from `a`
    /// (unclamped: negative before `a`, greater than `length()` past `b`).
    pub fn along(&self, p: &Point2<Real>) -> Real {
        match self.direction() {
            Some(d) => d.dot(&(p - self.a)),
            None => 0.0,
        }
    }

    pub fn distance_to_point(&self, p: &Point2<Real>) -> Real {
        point_segment_distance(p, &self.a, &self.b).0
    }

    /// Exact intersection test (shared endpoints and collinear overlap count).
    pub fn intersects(&self, other: &Segment2) -> bool {
        let (p1, q1, p2, q2) = (&self.a, &self.b, &other.a, &other.b);
        let o1 = orient(p1, q1, p2);
        let o2 = orient(p1, q1, q2);
        let o3 = orient(p2, q2, p1);
        let o4 = orient(p2, q2, q1);

        if o1 != o2 && o3 != o4 && o1 != Orientation::Collinear && o2 != Orientation::Collinear
            && o3 != Orientation::Collinear && o4 != Orientation::Collinear
        {
            return true;
        }

        (o1 == Orientation::Collinear && on_segment_box(p1, q1, p2))
            || (o2 == Orientation::Collinear && on_segment_box(p1, q1, q2))
            || (o3 == Orientation::Collinear && on_segment_box(p2, q2, p1))
            || (o4 == Orientation::Collinear && on_segment_box(p2, q2, q1))
    }

    /// A representative intersection point, if the segments intersect.
    /// For collinear overlaps one of the overlapping endpoints is returned.
    pub fn intersection_point(&self, other: &Segment2) -> Option<Point2<Real>> {
        if !self.intersects(other) {
            return None;
        }
        let r = self.b - self.a;
        let s = other.b - other.a;
        let denom = r.perp(&s);
        if denom != 0.0 {
            let t = (other.a - self.a).perp(&s) / denom;
            return Some(self.a + r * t.clamp(0.0, 1.0));
        }
        // collinear: first endpoint that lies on the other segment
        [other.a, other.b, self.a, self.b]
            .into_iter()
            .find(|p| self.distance_to_point(p) == 0.0 && other.distance_to_point(p) == 0.0)
            .or(Some(self.a))
    }

    /// Minimum distance between two segments (0 when they intersect).
    pub fn distance_to_segment(&self, other: &Segment2) -> Real {
        if self.intersects(other) {
            return 0.0;
        }
        self.distance_to_point(&other.a)
            .min(self.distance_to_point(&other.b))
            .min(other.distance_to_point(&self.a))
            .min(other.distance_to_point(&self.b))
    }

    /// Point halfway between the closest points of two disjoint segments.
    pub fn closest_midpoint(&self, other: &Segment2) -> Point2<Real> {
        if let Some(p) = self.intersection_point(other) {
            return p;
        }
        let candidates = [
            (point_segment_distance(&other.a, &self.a, &self.b), other.a),
            (point_segment_distance(&other.b, &self.a, &self.b), other.b),
            (point_segment_distance(&self.a, &other.a, &other.b), self.a),
            (point_segment_distance(&self.b, &other.a, &other.b), self.b),
        ];
        let mut best = candidates[0];
        for c in &candidates[1..] {
            if c.0.0 < best.0.0 {
                best = *c;
            }
        }
        nalgebra::center(&best.0.1, &best.1)
    }
}

impl PlanarOps for Segment2 {
    fn transform(&self, matrix: &Matrix3<Real>) -> Self {
        Segment2::new(matrix.transform_point(&self.a), matrix.transform_point(&self.b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(ax: Real, ay: Real, bx: Real, by: Real) -> Segment2 {
        Segment2::new(Point2::new(ax, ay), Point2::new(bx, by))
    }

    #[test]
    fn test_point_segment_distance() {
        let (d, _) = point_segment_distance(&Point2::new(0.0, 1.0), &Point2::origin(), &Point2::new(2.0, 0.0));
        assert!((d - 1.0).abs() < 1e-12);
        let (d, c) = point_segment_distance(&Point2::new(3.0, 0.0), &Point2::origin(), &Point2::new(2.0, 0.0));
        assert!((d - 1.0).abs() < 1e-12);
        assert_eq!(c, Point2::new(2.0, 0.0));
    }

    #[test]
    fn test_crossing_and_touching() {
        assert!(seg(0.0, 0.0, 2.0, 2.0).intersects(&seg(0.0, 2.0, 2.0, 0.0)));
        // shared endpoint
        assert!(seg(0.0, 0.0, 1.0, 0.0).intersects(&seg(1.0, 0.0, 1.0, 1.0)));
        // collinear overlap
        assert!(seg(0.0, 0.0, 2.0, 0.0).intersects(&seg(1.0, 0.0, 3.0, 0.0)));
        // collinear disjoint
        assert!(!seg(0.0, 0.0, 1.0, 0.0).intersects(&seg(2.0, 0.0, 3.0, 0.0)));
        // parallel
        assert!(!seg(0.0, 0.0, 1.0, 0.0).intersects(&seg(0.0, 1.0, 1.0, 1.0)));
    }

    #[test]
    fn test_signed_distance_sides() {
        let s = seg(0.0, 0.0, 10.0, 0.0);
        assert!((s.signed_distance(&Point2::new(5.0, 2.0)) - 2.0).abs() < 1e-12);
        assert!((s.signed_distance(&Point2::new(5.0, -3.0)) + 3.0).abs() < 1e-12);
        assert!((s.along(&Point2::new(-1.0, 4.0)) + 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_segment_distance() {
        let d = seg(0.0, 0.0, 1.0, 0.0).distance_to_segment(&seg(0.0, 2.0, 1.0, 3.0));
        assert!((d - 2.0).abs() < 1e-12);
    }
}
