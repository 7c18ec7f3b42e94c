//! Spacing rules for holes and slots.

use super::{RuleContext, RuleKind, mm};
use crate::errors::EngineResult;
use crate::float_types::Real;
use crate::pattern::Hole;
use crate::report::{GeometryRef, RuleResult};
use nalgebra::Point2;

fn finding(kind: RuleKind, hole: &Hole, message: String) -> RuleResult {
    RuleResult::new(kind, kind.default_severity(), message).with_reference(GeometryRef::hole(&hole.id))
}

pub(super) fn hole_to_bend(ctx: &RuleContext<'_>) -> EngineResult<Vec<RuleResult>> {
    let kind = RuleKind::HoleToBendClearance;
    let required = 2.0 * ctx.thickness();
    let mut out = Vec::new();
    for hole in &ctx.pattern.holes {
        for bend in &ctx.pattern.bend_lines {
            let seg = bend.segment();
            let Some((distance, at)) = hole
                .ring
                .edges()
                .map(|edge| (edge.distance_to_segment(&seg), edge.closest_midpoint(&seg)))
                .min_by(|a, b| a.0.total_cmp(&b.0))
            else {
                continue;
            };
            if distance < required - ctx.eps() {
                out.push(
                    finding(
                        kind,
                        hole,
                        format!(
                            "hole '{}' is {} from bend '{}', closer than {} (2t); it will distort when the bend is formed",
                            hole.id,
                            mm(distance),
                            bend.id,
                            mm(required)
                        ),
                    )
                    .with_reference(GeometryRef::bend(&bend.id))
                    .with_reference(GeometryRef::point(&at))
                    .with_suggestion(format!(
                        "Move the hole at least {} (2t) away from the bend line.",
                        mm(required)
                    )),
                );
            }
        }
    }
    Ok(out)
}

pub(super) fn hole_to_edge(ctx: &RuleContext<'_>) -> EngineResult<Vec<RuleResult>> {
    let kind = RuleKind::HoleToEdgeClearance;
    let required = ctx.thickness();
    let mut out = Vec::new();
    for hole in &ctx.pattern.holes {
        let (distance, at, edge) = ctx.pattern.outer.closest_approach(&hole.ring);
        if distance < required - ctx.eps() {
            out.push(
                finding(
                    kind,
                    hole,
                    format!(
                        "hole '{}' is {} from the outer edge, closer than {} (1t)",
                        hole.id,
                        mm(distance),
                        mm(required)
                    ),
                )
                .with_reference(GeometryRef::outer_edge(edge))
                .with_reference(GeometryRef::point(&at))
                .with_suggestion(format!(
                    "Increase hole-to-edge distance to at least {} (1t).",
                    mm(required)
                )),
            );
        }
    }
    Ok(out)
}

pub(super) fn hole_to_hole(ctx: &RuleContext<'_>) -> EngineResult<Vec<RuleResult>> {
    let kind = RuleKind::HoleToHoleSpacing;
    let required = 2.0 * ctx.thickness();
    let holes = &ctx.pattern.holes;
    let mut out = Vec::new();
    for (i, a) in holes.iter().enumerate() {
        for b in &holes[i + 1..] {
            let (distance, at, _) = a.ring.closest_approach(&b.ring);
            if distance < required - ctx.eps() {
                out.push(
                    finding(
                        kind,
                        a,
                        format!(
                            "holes '{}' and '{}' are {} apart, closer than {} (2t)",
                            a.id,
                            b.id,
                            mm(distance),
                            mm(required)
                        ),
                    )
                    .with_reference(GeometryRef::hole(&b.id))
                    .with_reference(GeometryRef::point(&at))
                    .with_suggestion(format!("Space the holes at least {} (2t) apart.", mm(required))),
                );
            }
        }
    }
    Ok(out)
}

pub(super) fn min_hole_diameter(ctx: &RuleContext<'_>) -> EngineResult<Vec<RuleResult>> {
    let kind = RuleKind::MinHoleDiameter;
    let required = ctx.thickness();
    let mut out = Vec::new();
    for hole in &ctx.pattern.holes {
        let width: Real = hole.ring.min_width();
        if width < required - ctx.eps() {
            let centre: Point2<Real> = hole.ring.centroid();
            out.push(
                finding(
                    kind,
                    hole,
                    format!(
                        "hole '{}' is {} across, smaller than the sheet thickness {}",
                        hole.id,
                        mm(width),
                        mm(required)
                    ),
                )
                .with_reference(GeometryRef::point(&centre))
                .with_suggestion(format!("Enlarge the hole to at least {} (1t).", mm(required))),
            );
        }
    }
    Ok(out)
}
