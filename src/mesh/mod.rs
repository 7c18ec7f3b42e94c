//! 3D plate geometry: triangle meshes of extruded sub-face regions, convex
//! pieces for exact distance queries and a bounding-volume hierarchy over them.

use crate::float_types::{
    Real,
    parry3d::bounding_volume::Aabb,
};
use crate::sketch::Polygon2;
use geo::{Coord, LineString, Polygon as GeoPolygon};
use nalgebra::{Isometry3, Point3, Vector3, partial_max, partial_min};
use std::sync::OnceLock;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub mod bvh;
pub mod convex;

pub use bvh::{Bvh, Proximity};
pub use convex::ConvexPiece;

/// A triangle soup with a lazily computed bounding box.
#[derive(Clone, Debug, Default)]
pub struct Mesh {
    /// Counter-clockwise (outward facing) triangles
    pub triangles: Vec<[Point3<Real>; 3]>,

    /// Lazily calculated AABB that spans `triangles`.
    pub bounding_box: OnceLock<Aabb>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_triangles(triangles: Vec<[Point3<Real>; 3]>) -> Self {
        Mesh {
            triangles,
            bounding_box: OnceLock::new(),
        }
    }

    /// Triangulate a 2D region (outer ring plus holes) in the XY plane.
    ///
    /// Uses `geo`'s ear-cut triangulation; triangles are returned at z = 0.
    pub fn triangulate_2d(outer: &[[Real; 2]], holes: &[&[[Real; 2]]]) -> Vec<[Point3<Real>; 3]> {
        // Convert the outer ring into a `LineString`
        let outer_coords: Vec<Coord<Real>> = outer.iter().map(|&[x, y]| Coord { x, y }).collect();

        // Convert each hole into its own `LineString`
        let holes_coords: Vec<LineString<Real>> = holes
            .iter()
            .map(|hole| {
                let coords: Vec<Coord<Real>> = hole.iter().map(|&[x, y]| Coord { x, y }).collect();
                LineString::new(coords)
            })
            .collect();

        // Ear-cut triangulation on the polygon (outer + holes)
        let polygon = GeoPolygon::new(LineString::new(outer_coords), holes_coords);

        use geo::TriangulateEarcut;
        let triangulation = polygon.earcut_triangles_raw();
        let triangle_indices = triangulation.triangle_indices;
        let vertices = triangulation.vertices;

        // Convert the 2D result (x,y) into 3D triangles with z=0
        let mut result = Vec::with_capacity(triangle_indices.len() / 3);
        for tri in triangle_indices.chunks_exact(3) {
            let mut pts = [
                Point3::new(vertices[2 * tri[0]], vertices[2 * tri[0] + 1], 0.0),
                Point3::new(vertices[2 * tri[1]], vertices[2 * tri[1] + 1], 0.0),
                Point3::new(vertices[2 * tri[2]], vertices[2 * tri[2] + 1], 0.0),
            ];
            // earcut does not promise a winding
            if (pts[1] - pts[0]).cross(&(pts[2] - pts[0])).z < 0.0 {
                pts.swap(1, 2);
            }
            result.push(pts);
        }
        result
    }

    /// Triangles of a [`Polygon2`] region at z = 0, counter-clockwise seen from +Z.
    pub fn triangulate_region(region: &Polygon2) -> Vec<[Point3<Real>; 3]> {
        let outer: Vec<[Real; 2]> = region.outer().points().iter().map(|p| [p.x, p.y]).collect();
        let holes: Vec<Vec<[Real; 2]>> = region
            .holes()
            .iter()
            .map(|h| h.points().iter().map(|p| [p.x, p.y]).collect())
            .collect();
        let hole_refs: Vec<&[[Real; 2]]> = holes.iter().map(|h| h.as_slice()).collect();
        Self::triangulate_2d(&outer, &hole_refs)
    }

    /// Closed plate: the region extruded from z = 0 to z = `thickness`.
    ///
    /// Bottom triangles face -Z, top triangles +Z, and one quad (two
    /// triangles) per boundary edge closes the sides. The outer ring is
    /// counter-clockwise and holes clockwise, so side faces always point
    /// away from the material.
    pub fn extrude_plate(region: &Polygon2, thickness: Real) -> Mesh {
        let lift = Vector3::new(0.0, 0.0, thickness);
        let caps = Self::triangulate_region(region);
        let mut triangles = Vec::with_capacity(caps.len() * 2 + region.rings().map(|r| r.len() * 2).sum::<usize>());

        for [a, b, c] in &caps {
            triangles.push([*a, *c, *b]);
            triangles.push([a + lift, b + lift, c + lift]);
        }
        for ring in region.rings() {
            for edge in ring.edges() {
                let a0 = Point3::new(edge.a.x, edge.a.y, 0.0);
                let b0 = Point3::new(edge.b.x, edge.b.y, 0.0);
                triangles.push([a0, b0, b0 + lift]);
                triangles.push([a0, b0 + lift, a0 + lift]);
            }
        }
        Mesh::from_triangles(triangles)
    }

    /// Every triangle moved by a rigid transform.
    #[cfg(not(feature = "parallel"))]
    pub fn transform(&self, iso: &Isometry3<Real>) -> Mesh {
        Mesh::from_triangles(
            self.triangles
                .iter()
                .map(|t| [iso * t[0], iso * t[1], iso * t[2]])
                .collect(),
        )
    }

    /// Every triangle moved by a rigid transform.
    #[cfg(feature = "parallel")]
    pub fn transform(&self, iso: &Isometry3<Real>) -> Mesh {
        Mesh::from_triangles(
            self.triangles
                .par_iter()
                .map(|t| [iso * t[0], iso * t[1], iso * t[2]])
                .collect(),
        )
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Point3<Real>> {
        self.triangles.iter().flat_map(|t| t.iter())
    }

    /// Enclosed volume by the divergence theorem; only meaningful for closed meshes.
    pub fn volume(&self) -> Real {
        self.triangles
            .iter()
            .map(|[a, b, c]| a.coords.dot(&b.coords.cross(&c.coords)) / 6.0)
            .sum()
    }

    pub fn bounding_box(&self) -> Aabb {
        *self.bounding_box.get_or_init(|| {
            let mut min_x = Real::MAX;
            let mut min_y = Real::MAX;
            let mut min_z = Real::MAX;
            let mut max_x = -Real::MAX;
            let mut max_y = -Real::MAX;
            let mut max_z = -Real::MAX;

            for v in self.vertices() {
                min_x = *partial_min(&min_x, &v.x).unwrap_or(&min_x);
                min_y = *partial_min(&min_y, &v.y).unwrap_or(&min_y);
                min_z = *partial_min(&min_z, &v.z).unwrap_or(&min_z);

                max_x = *partial_max(&max_x, &v.x).unwrap_or(&max_x);
                max_y = *partial_max(&max_y, &v.y).unwrap_or(&max_y);
                max_z = *partial_max(&max_z, &v.z).unwrap_or(&max_z);
            }

            // If still uninitialized (no triangles), return a trivial AABB at origin
            if min_x > max_x {
                return Aabb::new(Point3::origin(), Point3::origin());
            }

            Aabb::new(Point3::new(min_x, min_y, min_z), Point3::new(max_x, max_y, max_z))
        })
    }

    /// Invalidates the cached bounding box.
    pub fn invalidate_bounding_box(&mut self) {
        self.bounding_box = OnceLock::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sketch::Ring;

    #[test]
    fn test_plate_volume_and_bounds() {
        let hole = Ring::rectangle(4.0, 1.0, 2.0, 2.0).unwrap();
        let region = Polygon2::new(Ring::rectangle(0.0, 0.0, 10.0, 4.0).unwrap(), vec![hole]);
        let plate = Mesh::extrude_plate(&region, 1.5);
        assert!((plate.volume() - 36.0 * 1.5).abs() < 1e-9);

        let bb = plate.bounding_box();
        assert_eq!(bb.mins, Point3::new(0.0, 0.0, 0.0));
        assert_eq!(bb.maxs, Point3::new(10.0, 4.0, 1.5));
    }

    #[test]
    fn test_transform_moves_bounds() {
        let region = Polygon2::from(Ring::rectangle(0.0, 0.0, 1.0, 1.0).unwrap());
        let plate = Mesh::extrude_plate(&region, 1.0);
        let moved = plate.transform(&Isometry3::translation(5.0, 0.0, -1.0));
        assert_eq!(moved.bounding_box().mins, Point3::new(5.0, 0.0, -1.0));
        assert!((moved.volume() - 1.0).abs() < 1e-9);
    }
}
