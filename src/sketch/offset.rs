//! **Mathematical Foundations for Region Offsetting**
//!
//! For a region P and a disk D of radius r the offset is the Minkowski sum
//! ```text
//! P ⊕ D = {p + d | p ∈ P, d ∈ D}
//! ```
//! - **Outward offset (r > 0)**: grow the region by r
//! - **Inward offset (r < 0)**: erode the region by |r|
//!
//! An inward offset can split a region at a narrow neck or erase it entirely.
//! Both outcomes matter to the DFM checks (kerf necks, relief probes), so the
//! offset always returns *every* resulting polygon and reports a fully
//! collapsed result as `DegenerateGeometry` instead of returning an invalid
//! polygon.
//!
//! The buffering itself is done by `geo-buf` (straight skeleton based).
use crate::errors::{EngineError, EngineResult};
use crate::float_types::Real;
use crate::sketch::polygon::Polygon2;
use crate::sketch::ring::Ring;
use geo::MultiPolygon;
use geo_buf::{buffer_polygon, buffer_polygon_rounded};

/// Corner treatment of an offset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Corner {
    /// Offset edges are extended until they meet (C⁰ joints).
    Sharp,
    /// Convex vertices are replaced by circular arcs of radius |distance|.
    Rounded,
}

impl Polygon2 {
    /// Offset by `distance` (positive grows) with sharp corners.
    ///
    /// Returns every resulting component; fails with `DegenerateGeometry`
    /// when the region collapses entirely.
    pub fn offset(&self, distance: Real, eps: Real) -> EngineResult<Vec<Polygon2>> {
        self.offset_with(distance, Corner::Sharp, eps)
    }

    /// Offset by `distance` with rounded convex corners.
    pub fn offset_rounded(&self, distance: Real, eps: Real) -> EngineResult<Vec<Polygon2>> {
        self.offset_with(distance, Corner::Rounded, eps)
    }

    pub fn offset_with(&self, distance: Real, corner: Corner, eps: Real) -> EngineResult<Vec<Polygon2>> {
        if !distance.is_finite() {
            return Err(EngineError::degenerate("non-finite offset distance"));
        }
        if distance == 0.0 {
            return Ok(vec![self.clone()]);
        }
        let poly = self.to_geo();
        let buffered: MultiPolygon<Real> = match corner {
            Corner::Sharp => buffer_polygon(&poly, distance),
            Corner::Rounded => buffer_polygon_rounded(&poly, distance),
        };
        let parts: Vec<Polygon2> = Polygon2::from_multi(&buffered, eps)
            .into_iter()
            .filter(|p| p.area() > eps * eps)
            .collect();
        if parts.is_empty() {
            return Err(EngineError::degenerate_at(
                format!("offset by {distance} collapses the region"),
                self.outer().points()[0],
            ));
        }
        Ok(parts)
    }
}

impl Ring {
    /// Offset of the region this ring bounds (holes ignored).
    pub fn offset(&self, distance: Real, eps: Real) -> EngineResult<Vec<Polygon2>> {
        Polygon2::from(self.clone()).offset(distance, eps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grow_and_shrink_rectangle() {
        let r = Ring::rectangle(0.0, 0.0, 10.0, 10.0).unwrap();
        let grown = r.offset(1.0, 1e-9).unwrap();
        assert_eq!(grown.len(), 1);
        assert!((grown[0].area() - 144.0).abs() < 1e-6);

        let shrunk = r.offset(-1.0, 1e-9).unwrap();
        assert!((shrunk[0].area() - 64.0).abs() < 1e-6);
    }

    #[test]
    fn test_collapse_is_an_error() {
        let r = Ring::rectangle(0.0, 0.0, 2.0, 2.0).unwrap();
        assert!(matches!(
            r.offset(-1.5, 1e-9),
            Err(EngineError::DegenerateGeometry { .. })
        ));
    }

    #[test]
    fn test_neck_splits_into_two() {
        // two 10x10 squares joined by a 1 mm wide neck
        let r = Ring::from_xy(&[
            [0.0, 0.0],
            [10.0, 0.0],
            [10.0, 4.5],
            [15.0, 4.5],
            [15.0, 0.0],
            [25.0, 0.0],
            [25.0, 10.0],
            [15.0, 10.0],
            [15.0, 5.5],
            [10.0, 5.5],
            [10.0, 10.0],
            [0.0, 10.0],
        ])
        .unwrap();
        let parts = r.offset(-0.6, 1e-9).unwrap();
        assert_eq!(parts.len(), 2);
    }
}
