//! Planar regions with holes, and the boolean/overlap queries built on `geo`.

use crate::aabb::Aabb2;
use crate::errors::{EngineError, EngineResult};
use crate::float_types::Real;
use crate::sketch::ring::{Containment, Ring};
use crate::traits::PlanarOps;
use geo::{BooleanOps, Intersects, MultiPolygon, Polygon as GeoPolygon};
use nalgebra::{Matrix3, Point2};
use serde::{Deserialize, Serialize};

/// An outer ring with zero or more hole rings.
///
/// The outer ring is kept counter-clockwise and holes clockwise, which is the
/// layout `geo` expects for its boolean operations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawPolygon2")]
pub struct Polygon2 {
    outer: Ring,
    holes: Vec<Ring>,
}

#[derive(Deserialize)]
struct RawPolygon2 {
    outer: Ring,
    #[serde(default)]
    holes: Vec<Ring>,
}

impl From<RawPolygon2> for Polygon2 {
    fn from(raw: RawPolygon2) -> Self {
        Polygon2::new(raw.outer, raw.holes)
    }
}

impl Polygon2 {
    pub fn new(outer: Ring, holes: Vec<Ring>) -> Self {
        Self {
            outer: outer.oriented(true),
            holes: holes.into_iter().map(|h| h.oriented(false)).collect(),
        }
    }

    #[inline]
    pub fn outer(&self) -> &Ring {
        &self.outer
    }

    #[inline]
    pub fn holes(&self) -> &[Ring] {
        &self.holes
    }

    /// Outer ring followed by every hole ring.
    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        std::iter::once(&self.outer).chain(self.holes.iter())
    }

    pub fn area(&self) -> Real {
        self.outer.area() - self.holes.iter().map(Ring::area).sum::<Real>()
    }

    /// Area centroid, holes subtracted.
    pub fn centroid(&self) -> Point2<Real> {
        let outer_area = self.outer.area();
        let mut weighted = self.outer.centroid().coords * outer_area;
        let mut total = outer_area;
        for h in &self.holes {
            let a = h.area();
            weighted -= h.centroid().coords * a;
            total -= a;
        }
        if total.abs() <= Real::EPSILON {
            self.outer.centroid()
        } else {
            Point2::from(weighted / total)
        }
    }

    pub fn bounding_box(&self) -> Aabb2 {
        self.outer.bounding_box()
    }

    /// Point-in-region with holes respected; within `eps` of any ring is `OnBoundary`.
    pub fn contains(&self, p: &Point2<Real>, eps: Real) -> Containment {
        match self.outer.contains(p, eps) {
            Containment::Inside => {
                for h in &self.holes {
                    match h.contains(p, eps) {
                        Containment::Inside => return Containment::Outside,
                        Containment::OnBoundary => return Containment::OnBoundary,
                        Containment::Outside => {},
                    }
                }
                Containment::Inside
            },
            other => other,
        }
    }

    pub fn to_geo(&self) -> GeoPolygon<Real> {
        GeoPolygon::new(
            self.outer.to_line_string(),
            self.holes.iter().map(Ring::to_line_string).collect(),
        )
    }

    /// Region from a `geo` polygon; `None` if the exterior collapses below `eps`.
    /// Collapsed interiors are dropped.
    pub fn from_geo(poly: &GeoPolygon<Real>, eps: Real) -> Option<Polygon2> {
        let outer = Ring::from_line_string(poly.exterior(), eps)?;
        let holes = poly
            .interiors()
            .iter()
            .filter_map(|ls| Ring::from_line_string(ls, eps))
            .collect();
        Some(Polygon2::new(outer, holes))
    }

    /// Every non-degenerate component of a multipolygon.
    pub fn from_multi(mp: &MultiPolygon<Real>, eps: Real) -> Vec<Polygon2> {
        mp.0.iter().filter_map(|p| Polygon2::from_geo(p, eps)).collect()
    }

    /// Exact intersection predicate (touching boundaries count).
    pub fn intersects(&self, other: &Polygon2) -> bool {
        self.bounding_box().intersects(&other.bounding_box()) && self.to_geo().intersects(&other.to_geo())
    }

    pub fn intersection(&self, other: &Polygon2, eps: Real) -> Vec<Polygon2> {
        Polygon2::from_multi(&self.to_geo().intersection(&other.to_geo()), eps)
    }

    pub fn difference(&self, other: &Polygon2, eps: Real) -> Vec<Polygon2> {
        Polygon2::from_multi(&self.to_geo().difference(&other.to_geo()), eps)
    }

    /// Subtract a set of regions at once.
    pub fn difference_all(&self, cutters: &[Polygon2], eps: Real) -> Vec<Polygon2> {
        if cutters.is_empty() {
            return vec![self.clone()];
        }
        let cut: MultiPolygon<Real> = MultiPolygon::new(cutters.iter().map(Polygon2::to_geo).collect());
        Polygon2::from_multi(&MultiPolygon::new(vec![self.to_geo()]).difference(&cut), eps)
    }

    /// Penetration depth of two overlapping regions: the largest minimum width
    /// over the components of their intersection. 0 when the interiors are disjoint.
    pub fn penetration_depth(&self, other: &Polygon2, eps: Real) -> Real {
        if !self.intersects(other) {
            return 0.0;
        }
        self.intersection(other, eps)
            .iter()
            .filter(|c| c.area() > eps * eps)
            .map(|c| c.outer.min_width())
            .fold(0.0, Real::max)
    }

    /// Minimum distance between the boundaries of two regions.
    pub fn boundary_distance(&self, other: &Polygon2) -> Real {
        self.closest_approach(other).0
    }

    /// Boundary distance plus the midpoint of the closest boundary pair.
    pub fn closest_approach(&self, other: &Polygon2) -> (Real, Point2<Real>) {
        let mut best = (Real::INFINITY, self.outer.points()[0]);
        for a in self.rings() {
            for b in other.rings() {
                let (d, p, _) = a.closest_approach(b);
                if d < best.0 {
                    best = (d, p);
                }
            }
        }
        best
    }

    /// Validate every ring against `eps` and reject holes that escape the outer ring.
    pub fn validate(&self, eps: Real) -> EngineResult<()> {
        for ring in self.rings() {
            ring.validate(eps)?;
        }
        for hole in &self.holes {
            if let Some(p) = hole
                .points()
                .iter()
                .find(|p| self.outer.contains(p, eps) == Containment::Outside)
            {
                return Err(EngineError::degenerate_at("hole vertex lies outside the outer boundary", *p));
            }
        }
        Ok(())
    }
}

impl PlanarOps for Polygon2 {
    fn transform(&self, matrix: &Matrix3<Real>) -> Self {
        Polygon2 {
            outer: self.outer.transform(matrix),
            holes: self.holes.iter().map(|h| h.transform(matrix)).collect(),
        }
    }
}

impl From<Ring> for Polygon2 {
    fn from(outer: Ring) -> Self {
        Polygon2::new(outer, Vec::new())
    }
}
