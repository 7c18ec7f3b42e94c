//! Test support library
//! Provides fixtures & helper functions shared by the integration tests.
#![allow(dead_code)]

use nalgebra::{Point2, Point3, Vector3};
use sheetdfm::{
    BendLine, FlatPattern, MaterialCatalog, MaterialParams, NestPlacement, Ring, SheetNest, ToolKind,
    ToolMotion, ToolProfile,
    bend::allowance::bend_allowance,
    float_types::Real,
};
use std::sync::Arc;

/// Quick helper to compare floating-point results with an acceptable tolerance.
pub fn approx_eq(a: Real, b: Real, eps: Real) -> bool {
    (a - b).abs() < eps
}

/// Builtin catalog parameters, shared the way the engine expects them.
pub fn params(material: &str, thickness: Real, process: &str) -> Arc<MaterialParams> {
    Arc::new(
        MaterialCatalog::builtin()
            .lookup(material, thickness, process)
            .expect("builtin catalog entry"),
    )
}

/// Parameters matching a pattern's own material, thickness and process.
pub fn params_for(pattern: &FlatPattern) -> Arc<MaterialParams> {
    params(&pattern.material, pattern.thickness, &pattern.process)
}

/// Plain rectangular blank with its corner at the origin.
pub fn plate(id: &str, width: Real, height: Real, material: &str, thickness: Real, process: &str) -> FlatPattern {
    FlatPattern::new(
        id,
        Ring::rectangle(0.0, 0.0, width, height).expect("valid rectangle"),
        material,
        thickness,
        process,
    )
}

/// 40 x 60 mild-steel blank, 2 mm thick, bent 90 degrees with R = 2 along
/// y = 40: a 20 mm flange rises from the top edge.
pub fn flange_part() -> FlatPattern {
    flanged_plate(40.0, FLANGE_LEN)
}

/// 40 mm wide mild-steel blank, 2 mm thick: a `base` deep fixed side and a
/// `flange` long flange bent 90 degrees with R = 2 along y = `base`.
pub fn flanged_plate(base: Real, flange: Real) -> FlatPattern {
    plate("flange", 40.0, base + flange, "mild-steel", FLANGE_T, "laser").with_bend(
        BendLine::new("b1", Point2::new(0.0, base), Point2::new(40.0, base), 90.0).with_radius(FLANGE_R),
    )
}

pub const FLANGE_T: Real = 2.0;
pub const FLANGE_R: Real = 2.0;
pub const FLANGE_LEN: Real = 20.0;

/// Height of the formed flange's top edge in the bend frame.
pub fn flange_top(params: &MaterialParams) -> Real {
    flange_top_of(params, FLANGE_LEN)
}

pub fn flange_top_of(params: &MaterialParams, flange: Real) -> Real {
    let ba = bend_allowance(90.0, FLANGE_R, params.k_factor, FLANGE_T);
    FLANGE_T + FLANGE_R + flange - ba / 2.0
}

/// A punch-like block hovering `gap` above the formed flange, stroking
/// straight down by 5 mm over the step.
pub fn block_above_flange(params: &MaterialParams, gap: Real) -> Arc<ToolProfile> {
    block_above(params, FLANGE_LEN, gap)
}

pub fn block_above(params: &MaterialParams, flange: Real, gap: Real) -> Arc<ToolProfile> {
    let bottom = flange_top_of(params, flange) + gap;
    Arc::new(ToolProfile::block(
        "upper",
        ToolKind::Punch,
        Point3::new(-30.0, -10.0, bottom),
        Point3::new(30.0, 10.0, bottom + 10.0),
        ToolMotion::Stroke {
            direction: -Vector3::z(),
            travel: 5.0,
        },
    ))
}

/// 100 x 40 base with a 50 x 20 tab on top, the tab bent up along the
/// joint so the bend ends in the base's inside corners.
pub fn tab_on_base() -> FlatPattern {
    let outer = Ring::from_xy(&[
        [0.0, 0.0],
        [100.0, 0.0],
        [100.0, 40.0],
        [75.0, 40.0],
        [75.0, 60.0],
        [25.0, 60.0],
        [25.0, 40.0],
        [0.0, 40.0],
    ])
    .expect("valid outline");
    FlatPattern::new("tab", outer, "mild-steel", FLANGE_T, "laser").with_bend(
        BendLine::new("b1", Point2::new(25.0, 40.0), Point2::new(75.0, 40.0), 90.0).with_radius(FLANGE_R),
    )
}

/// Two `size` squares side by side, the second overlapping the first by `overlap`.
pub fn square_pair_nest(size: Real, overlap: Real) -> SheetNest {
    let square = plate("sq", size, size, "mild-steel", 1.5, "laser");
    SheetNest::new(4.0 * size, 2.0 * size)
        .with_placement(NestPlacement::new("a", square.clone(), 10.0, 10.0, 0.0))
        .with_placement(NestPlacement::new("b", square, 10.0 + size - overlap, 10.0, 0.0))
}
