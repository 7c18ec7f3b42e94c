//! Closed rings of vertices: the boundary type of every planar region.

use crate::aabb::Aabb2;
use crate::errors::{EngineError, EngineResult};
use crate::float_types::Real;
use crate::sketch::segment::{Segment2, orient, point_segment_distance};
use crate::traits::PlanarOps;
use geo::kernels::Orientation;
use geo::{ConvexHull, Coord, LineString, MultiPoint};
use nalgebra::{Matrix3, Point2};
use serde::{Deserialize, Serialize};

/// Result of a point-in-polygon query with an epsilon boundary band.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Containment {
    Inside,
    Outside,
    OnBoundary,
}

/// A self-intersection between two edges of the same ring.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelfIntersection {
    pub edge_a: usize,
    pub edge_b: usize,
    pub point: Point2<Real>,
}

/// An ordered, implicitly closed list of vertices.
///
/// The closing vertex is never stored: edge `i` runs from vertex `i` to
/// vertex `(i + 1) % len`. Construction rejects fewer than three vertices,
/// non-finite coordinates and zero-length edges.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Point2<Real>>", into = "Vec<Point2<Real>>")]
pub struct Ring {
    points: Vec<Point2<Real>>,
}

impl TryFrom<Vec<Point2<Real>>> for Ring {
    type Error = EngineError;

    fn try_from(points: Vec<Point2<Real>>) -> EngineResult<Self> {
        Ring::new(points)
    }
}

impl From<Ring> for Vec<Point2<Real>> {
    fn from(ring: Ring) -> Self {
        ring.points
    }
}

impl Ring {
    pub fn new(mut points: Vec<Point2<Real>>) -> EngineResult<Self> {
        // accept an explicitly repeated closing vertex and drop it
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        if let Some(p) = points.iter().find(|p| !(p.x.is_finite() && p.y.is_finite())) {
            return Err(EngineError::degenerate_at("non-finite coordinate", *p));
        }
        if points.len() < 3 {
            return Err(EngineError::degenerate(format!(
                "ring needs at least 3 vertices, got {}",
                points.len()
            )));
        }
        let n = points.len();
        for i in 0..n {
            if points[i] == points[(i + 1) % n] {
                return Err(EngineError::degenerate_at("zero-length edge", points[i]));
            }
        }
        Ok(Self { points })
    }

    /// Convenience constructor from `[x, y]` pairs.
    pub fn from_xy(coords: &[[Real; 2]]) -> EngineResult<Self> {
        Self::new(coords.iter().map(|c| Point2::new(c[0], c[1])).collect())
    }

    /// Axis-aligned rectangle with its lower-left corner at `(x, y)`, counter-clockwise.
    pub fn rectangle(x: Real, y: Real, width: Real, height: Real) -> EngineResult<Self> {
        Self::from_xy(&[[x, y], [x + width, y], [x + width, y + height], [x, y + height]])
    }

    /// Regular polygon approximating a circle, counter-clockwise.
    pub fn circle(center: Point2<Real>, radius: Real, segments: usize) -> EngineResult<Self> {
        let segments = segments.max(3);
        Self::new(
            (0..segments)
                .map(|i| {
                    let a = crate::float_types::TAU * i as Real / segments as Real;
                    Point2::new(center.x + radius * a.cos(), center.y + radius * a.sin())
                })
                .collect(),
        )
    }

    #[inline]
    pub fn points(&self) -> &[Point2<Real>] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Edge `i`, from vertex `i` to vertex `i + 1` (wrapping).
    #[inline]
    pub fn edge(&self, i: usize) -> Segment2 {
        let n = self.points.len();
        Segment2::new(self.points[i % n], self.points[(i + 1) % n])
    }

    pub fn edges(&self) -> impl Iterator<Item = Segment2> + '_ {
        (0..self.points.len()).map(move |i| self.edge(i))
    }

    /// Shoelace area, positive for counter-clockwise winding.
    pub fn signed_area(&self) -> Real {
        0.5 * self
            .edges()
            .map(|e| e.a.x * e.b.y - e.b.x * e.a.y)
            .sum::<Real>()
    }

    #[inline]
    pub fn area(&self) -> Real {
        self.signed_area().abs()
    }

    #[inline]
    pub fn is_ccw(&self) -> bool {
        self.signed_area() > 0.0
    }

    /// Same ring with the requested winding.
    pub fn oriented(&self, ccw: bool) -> Ring {
        if self.is_ccw() == ccw {
            self.clone()
        } else {
            let mut points = self.points.clone();
            points.reverse();
            Ring { points }
        }
    }

    /// Area centroid; the vertex mean for (near) zero-area rings.
    pub fn centroid(&self) -> Point2<Real> {
        let a = self.signed_area();
        if a.abs() <= Real::EPSILON {
            let n = self.points.len() as Real;
            let sum = self
                .points
                .iter()
                .fold(nalgebra::Vector2::zeros(), |acc, p| acc + p.coords);
            return Point2::from(sum / n);
        }
        let (mut cx, mut cy) = (0.0, 0.0);
        for e in self.edges() {
            let cross = e.a.x * e.b.y - e.b.x * e.a.y;
            cx += (e.a.x + e.b.x) * cross;
            cy += (e.a.y + e.b.y) * cross;
        }
        Point2::new(cx / (6.0 * a), cy / (6.0 * a))
    }

    pub fn bounding_box(&self) -> Aabb2 {
        // non-empty by construction
        Aabb2::from_points(&self.points).unwrap_or(Aabb2::new(Point2::origin(), Point2::origin()))
    }

    /// Minimum distance from `p` to the ring boundary.
    pub fn distance_to_point(&self, p: &Point2<Real>) -> Real {
        self.edges()
            .map(|e| point_segment_distance(p, &e.a, &e.b).0)
            .fold(Real::INFINITY, Real::min)
    }

    /// Index of the boundary edge closest to `p`.
    pub fn closest_edge(&self, p: &Point2<Real>) -> usize {
        let mut best = (Real::INFINITY, 0);
        for (i, e) in self.edges().enumerate() {
            let d = e.distance_to_point(p);
            if d < best.0 {
                best = (d, i);
            }
        }
        best.1
    }

    /// Minimum distance from `segment` to the ring boundary (0 if they cross).
    pub fn distance_to_segment(&self, segment: &Segment2) -> Real {
        self.edges()
            .map(|e| e.distance_to_segment(segment))
            .fold(Real::INFINITY, Real::min)
    }

    /// Boundary distance to `other` plus the midpoint of the closest pair and
    /// the index of this ring's edge involved.
    pub fn closest_approach(&self, other: &Ring) -> (Real, Point2<Real>, usize) {
        let mut best = (Real::INFINITY, self.points[0], 0);
        for (i, e) in self.edges().enumerate() {
            for f in other.edges() {
                let d = e.distance_to_segment(&f);
                if d < best.0 {
                    best = (d, e.closest_midpoint(&f), i);
                }
            }
        }
        best
    }

    /// Point-in-polygon by ray casting; points within `eps` of an edge are
    /// `OnBoundary`.
    pub fn contains(&self, p: &Point2<Real>, eps: Real) -> Containment {
        if self.distance_to_point(p) <= eps {
            return Containment::OnBoundary;
        }
        let mut inside = false;
        for e in self.edges() {
            let (a, b) = (e.a, e.b);
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
        }
        if inside {
            Containment::Inside
        } else {
            Containment::Outside
        }
    }

    /// Every pair of edges that intersect other than at their shared vertex.
    pub fn self_intersections(&self) -> Vec<SelfIntersection> {
        let n = self.points.len();
        let boxes: Vec<Aabb2> = self
            .edges()
            .map(|e| Aabb2::new(
                Point2::new(e.a.x.min(e.b.x), e.a.y.min(e.b.y)),
                Point2::new(e.a.x.max(e.b.x), e.a.y.max(e.b.y)),
            ))
            .collect();
        let mut found = Vec::new();

        for i in 0..n {
            let ei = self.edge(i);
            for j in (i + 1)..n {
                let adjacent = j == i + 1 || (i == 0 && j == n - 1);
                if adjacent {
                    // adjacent edges only conflict when one folds back over the other
                    let (shared, far_i, far_j) = if j == i + 1 {
                        (ei.b, ei.a, self.edge(j).b)
                    } else {
                        (ei.a, ei.b, self.edge(j).a)
                    };
                    if orient(&far_i, &shared, &far_j) == Orientation::Collinear
                        && (far_i - shared).dot(&(far_j - shared)) > 0.0
                    {
                        found.push(SelfIntersection { edge_a: i, edge_b: j, point: shared });
                    }
                    continue;
                }
                if !boxes[i].intersects(&boxes[j]) {
                    continue;
                }
                let ej = self.edge(j);
                if let Some(point) = ei.intersection_point(&ej) {
                    found.push(SelfIntersection { edge_a: i, edge_b: j, point });
                }
            }
        }
        found
    }

    /// Convex hull vertices (counter-clockwise, closing vertex not repeated).
    pub fn convex_hull(&self) -> Vec<Point2<Real>> {
        convex_hull_of(&self.points)
    }

    /// Minimum width: the smallest distance between two parallel supporting
    /// lines, found with rotating calipers over the convex hull.
    pub fn min_width(&self) -> Real {
        min_width_of(&self.points)
    }

    /// Closed `geo` line string.
    pub fn to_line_string(&self) -> LineString<Real> {
        let mut coords: Vec<Coord<Real>> =
            self.points.iter().map(|p| Coord { x: p.x, y: p.y }).collect();
        coords.push(coords[0]);
        LineString::new(coords)
    }

    /// Ring from a `geo` line string, dropping the closing vertex and any
    /// vertex within `eps` of its predecessor. `None` if fewer than three
    /// distinct vertices survive.
    pub fn from_line_string(ls: &LineString<Real>, eps: Real) -> Option<Ring> {
        let mut points: Vec<Point2<Real>> = Vec::with_capacity(ls.0.len());
        for c in &ls.0 {
            let p = Point2::new(c.x, c.y);
            if !(p.x.is_finite() && p.y.is_finite()) {
                return None;
            }
            if points.last().is_some_and(|q| (p - q).norm() <= eps) {
                continue;
            }
            points.push(p);
        }
        while points.len() > 1 && (points[0] - points[points.len() - 1]).norm() <= eps {
            points.pop();
        }
        Ring::new(points).ok()
    }

    /// Tolerance-aware validity check: no edge shorter than `eps` and a
    /// non-vanishing area.
    ///
    /// The lobes of a self-intersecting ring can cancel in the signed area,
    /// so such a ring only has to span more than `eps` across its hull; the
    /// crossing itself is left for the caller to report.
    pub fn validate(&self, eps: Real) -> EngineResult<()> {
        for e in self.edges() {
            if e.length() <= eps {
                return Err(EngineError::degenerate_at("edge shorter than epsilon", e.a));
            }
        }
        let flat = if self.self_intersections().is_empty() {
            self.area() <= eps * eps
        } else {
            self.min_width() <= eps
        };
        if flat {
            return Err(EngineError::degenerate_at("ring has zero area", self.points[0]));
        }
        Ok(())
    }
}

impl PlanarOps for Ring {
    fn transform(&self, matrix: &Matrix3<Real>) -> Self {
        Ring {
            points: self.points.iter().map(|p| matrix.transform_point(p)).collect(),
        }
    }
}

/// Convex hull of a point set (counter-clockwise).
pub fn convex_hull_of(points: &[Point2<Real>]) -> Vec<Point2<Real>> {
    let mp: MultiPoint<Real> = points.iter().map(|p| geo::Point::new(p.x, p.y)).collect();
    let hull = mp.convex_hull();
    let mut out: Vec<Point2<Real>> = hull.exterior().0.iter().map(|c| Point2::new(c.x, c.y)).collect();
    if out.len() > 1 && out.first() == out.last() {
        out.pop();
    }
    out
}

/// Rotating-calipers minimum width of a point set; 0 for collinear input.
pub fn min_width_of(points: &[Point2<Real>]) -> Real {
    let hull = convex_hull_of(points);
    let n = hull.len();
    if n < 3 {
        return 0.0;
    }
    let mut best = Real::INFINITY;
    for i in 0..n {
        let edge = Segment2::new(hull[i], hull[(i + 1) % n]);
        if edge.length() == 0.0 {
            continue;
        }
        let far = hull
            .iter()
            .map(|p| edge.signed_distance(p).abs())
            .fold(0.0, Real::max);
        best = best.min(far);
    }
    if best.is_finite() { best } else { 0.0 }
}
