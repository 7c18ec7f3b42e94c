//! Convex pieces: the unit of exact signed-distance queries.

use crate::float_types::{
    Real,
    parry3d::{bounding_volume::Aabb, shape::{ConvexPolyhedron, Shape}},
};
use crate::mesh::Mesh;
use crate::sketch::Polygon2;
use nalgebra::{Isometry3, Point3, Vector3};

/// A convex polyhedron in its owner's local frame, with its local bounding box.
#[derive(Clone, Debug)]
pub struct ConvexPiece {
    pub shape: ConvexPolyhedron,
    pub local_aabb: Aabb,
}

impl ConvexPiece {
    /// Convex hull of a point cloud; `None` for flat or degenerate clouds.
    pub fn from_points(points: &[Point3<Real>]) -> Option<ConvexPiece> {
        if points.len() < 4 || points.iter().any(|p| !p.coords.iter().all(|c| c.is_finite())) {
            return None;
        }
        if !spans_volume(points) {
            return None;
        }
        let shape = ConvexPolyhedron::from_convex_hull(points)?;
        let local_aabb = shape.compute_local_aabb();
        Some(ConvexPiece { shape, local_aabb })
    }

    /// Box with corners `mins`, `maxs`.
    pub fn cuboid(mins: Point3<Real>, maxs: Point3<Real>) -> Option<ConvexPiece> {
        let corners: Vec<Point3<Real>> = (0..8)
            .map(|i| {
                Point3::new(
                    if i & 1 == 0 { mins.x } else { maxs.x },
                    if i & 2 == 0 { mins.y } else { maxs.y },
                    if i & 4 == 0 { mins.z } else { maxs.z },
                )
            })
            .collect();
        Self::from_points(&corners)
    }

    #[inline]
    pub fn world_aabb(&self, pose: &Isometry3<Real>) -> Aabb {
        self.local_aabb.transform_by(pose)
    }

    pub fn vertices(&self) -> &[Point3<Real>] {
        self.shape.points()
    }
}

/// Whether a point cloud spans a non-zero volume (is not collinear or coplanar).
fn spans_volume(points: &[Point3<Real>]) -> bool {
    let p0 = points[0];
    let Some(p1) = points.iter().copied().max_by(|a, b| (a - p0).norm_squared().total_cmp(&(b - p0).norm_squared())) else {
        return false;
    };
    let axis = p1 - p0;
    if axis.norm_squared() == 0.0 {
        return false;
    }
    let Some(p2) = points
        .iter()
        .copied()
        .max_by(|a, b| axis.cross(&(a - p0)).norm_squared().total_cmp(&axis.cross(&(b - p0)).norm_squared()))
    else {
        return false;
    };
    let normal = axis.cross(&(p2 - p0));
    let scale = normal.norm();
    if scale == 0.0 {
        return false;
    }
    let extent = axis.norm().max((p2 - p0).norm());
    points
        .iter()
        .any(|p| (normal.dot(&(p - p0)) / scale).abs() > extent * 1e-12)
}

/// Decompose a plate (region extruded from z = 0 to `thickness`) into
/// triangular prisms, one per ear-cut triangle. Sliver triangles with an
/// area below `eps²` are skipped.
pub fn plate_pieces(region: &Polygon2, thickness: Real, eps: Real) -> Vec<ConvexPiece> {
    let lift = Vector3::new(0.0, 0.0, thickness);
    Mesh::triangulate_region(region)
        .into_iter()
        .filter(|[a, b, c]| (b - a).cross(&(c - a)).norm() * 0.5 > eps * eps)
        .filter_map(|[a, b, c]| ConvexPiece::from_points(&[a, b, c, a + lift, b + lift, c + lift]))
        .collect()
}
