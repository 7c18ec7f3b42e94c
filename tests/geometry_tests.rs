use approx::assert_relative_eq;
use nalgebra::Point2;
use proptest::prelude::*;
use sheetdfm::{
    PlanarOps, Polygon2, Ring,
    float_types::{DEFAULT_EPSILON, Real},
    sketch::Containment,
};

mod support;

use crate::support::approx_eq;

#[test]
fn rectangle_measures() {
    let ring = Ring::rectangle(1.0, 2.0, 10.0, 4.0).unwrap();
    assert!(ring.is_ccw());
    assert_relative_eq!(ring.area(), 40.0);
    assert_relative_eq!(ring.min_width(), 4.0, epsilon = 1e-9);
    let c = ring.centroid();
    assert_relative_eq!(c.x, 6.0, epsilon = 1e-12);
    assert_relative_eq!(c.y, 4.0, epsilon = 1e-12);
}

#[test]
fn containment_is_three_way() {
    let ring = Ring::rectangle(0.0, 0.0, 10.0, 10.0).unwrap();
    let eps = DEFAULT_EPSILON;
    assert_eq!(ring.contains(&Point2::new(5.0, 5.0), eps), Containment::Inside);
    assert_eq!(ring.contains(&Point2::new(10.0, 5.0), eps), Containment::OnBoundary);
    assert_eq!(ring.contains(&Point2::new(11.0, 5.0), eps), Containment::Outside);
}

#[test]
fn region_area_excludes_holes() {
    let region = Polygon2::new(
        Ring::rectangle(0.0, 0.0, 20.0, 10.0).unwrap(),
        vec![Ring::rectangle(5.0, 2.0, 4.0, 4.0).unwrap()],
    );
    assert_relative_eq!(region.area(), 200.0 - 16.0, epsilon = 1e-9);
    assert!(region.validate(DEFAULT_EPSILON).is_ok());
}

#[test]
fn escaping_hole_is_degenerate() {
    let region = Polygon2::new(
        Ring::rectangle(0.0, 0.0, 20.0, 10.0).unwrap(),
        vec![Ring::rectangle(15.0, 2.0, 10.0, 4.0).unwrap()],
    );
    assert!(region.validate(DEFAULT_EPSILON).is_err());
}

#[test]
fn degenerate_rings_are_rejected() {
    assert!(Ring::from_xy(&[[0.0, 0.0], [1.0, 0.0]]).is_err());
    assert!(Ring::from_xy(&[[0.0, 0.0], [1.0, 0.0], [1.0, 0.0], [0.0, 1.0]]).is_err());
    assert!(Ring::from_xy(&[[0.0, 0.0], [Real::NAN, 0.0], [0.0, 1.0]]).is_err());
}

#[test]
fn bowtie_self_intersects_once() {
    let bowtie = Ring::from_xy(&[[0.0, 0.0], [10.0, 10.0], [10.0, 0.0], [0.0, 10.0]]).unwrap();
    let hits = bowtie.self_intersections();
    assert_eq!(hits.len(), 1);
    assert!(approx_eq(hits[0].point.x, 5.0, 1e-9));
    assert!(approx_eq(hits[0].point.y, 5.0, 1e-9));
    assert!(Ring::rectangle(0.0, 0.0, 3.0, 3.0).unwrap().self_intersections().is_empty());
}

#[test]
fn inward_offset_shrinks_then_collapses() {
    let ring = Ring::rectangle(0.0, 0.0, 10.0, 4.0).unwrap();
    let shrunk = ring.offset(-1.0, DEFAULT_EPSILON).unwrap();
    assert_eq!(shrunk.len(), 1);
    assert_relative_eq!(shrunk[0].area(), 8.0 * 2.0, epsilon = 1e-6);
    assert!(ring.offset(-3.0, DEFAULT_EPSILON).is_err());
}

#[test]
fn overlap_depth_and_gap() {
    let a = Polygon2::from(Ring::rectangle(0.0, 0.0, 10.0, 10.0).unwrap());
    let b = Polygon2::from(Ring::rectangle(9.5, 0.0, 10.0, 10.0).unwrap());
    assert_relative_eq!(a.penetration_depth(&b, DEFAULT_EPSILON), 0.5, epsilon = 1e-9);

    let c = a.translate(12.0, 0.0);
    assert_relative_eq!(a.penetration_depth(&c, DEFAULT_EPSILON), 0.0);
    assert_relative_eq!(a.boundary_distance(&c), 2.0, epsilon = 1e-9);
}

proptest! {
    #[test]
    fn placement_is_rigid(x in -100.0..100.0f64, y in -100.0..100.0f64, rot in -360.0..360.0f64) {
        let region = Polygon2::new(
            Ring::rectangle(0.0, 0.0, 30.0, 12.0).unwrap(),
            vec![Ring::circle(Point2::new(10.0, 6.0), 3.0, 24).unwrap()],
        );
        let placed = region.place(x, y, rot);
        prop_assert!(approx_eq(placed.area(), region.area(), 1e-6));
        prop_assert!(approx_eq(placed.outer().min_width(), 12.0, 1e-6));
        // the part origin lands on the placement point
        let origin = placed.outer().points()[0];
        prop_assert!(approx_eq(origin.x, x, 1e-9) && approx_eq(origin.y, y, 1e-9));
    }
}
