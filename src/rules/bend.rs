//! Rules about the bend lines themselves.

use super::{RuleContext, RuleKind, mm};
use crate::errors::{EngineError, EngineResult};
use crate::float_types::Real;
use crate::pattern::partition::{cut_half_width, strip_around};
use crate::pattern::{BendLine, Partition};
use crate::report::{GeometryRef, RuleResult};
use crate::sketch::{Containment, Segment2};
use std::borrow::Cow;

fn finding(kind: RuleKind, bend: &BendLine, message: String) -> RuleResult {
    RuleResult::new(kind, kind.default_severity(), message)
        .with_reference(GeometryRef::bend(&bend.id))
}

pub(super) fn min_bend_radius(ctx: &RuleContext<'_>) -> EngineResult<Vec<RuleResult>> {
    let kind = RuleKind::MinBendRadius;
    let min = ctx.params.min_bend_radius;
    let multiplier = ctx.params.min_bend_radius_multiplier;
    let mut out = Vec::new();
    for bend in &ctx.pattern.bend_lines {
        // an unassigned radius is formed at the material minimum
        let Some(radius) = bend.radius else {
            continue;
        };
        if radius < min - ctx.eps() {
            out.push(
                finding(
                    kind,
                    bend,
                    format!(
                        "bend '{}' has inside radius {} below the {} minimum of {} ({multiplier}t)",
                        bend.id,
                        mm(radius),
                        ctx.params.material,
                        mm(min)
                    ),
                )
                .with_reference(GeometryRef::point(&bend.segment().midpoint()))
                .with_suggestion(format!("Increase bend radius to >= {multiplier}t ({}).", mm(min))),
            );
        }
    }
    Ok(out)
}

/// Partition along every bend line of the pattern, reusing the simulator's
/// when it was built from the same lines.
fn full_partition<'c>(ctx: &'c RuleContext<'_>) -> EngineResult<Cow<'c, Partition>> {
    if let Some(sim) = ctx.simulation {
        let partition = sim.model.partition();
        let covers_all = partition.links().len() == ctx.pattern.bend_lines.len()
            && ctx.pattern.bend_lines.iter().all(|b| partition.link(&b.id).is_some());
        if covers_all {
            return Ok(Cow::Borrowed(partition));
        }
    }
    let bends: Vec<&BendLine> = ctx.pattern.bend_lines.iter().collect();
    Ok(Cow::Owned(Partition::build(ctx.pattern, &bends, ctx.eps())?))
}

pub(super) fn min_flange_height(ctx: &RuleContext<'_>) -> EngineResult<Vec<RuleResult>> {
    let kind = RuleKind::MinFlangeHeight;
    if ctx.pattern.bend_lines.is_empty() {
        return Ok(Vec::new());
    }
    let partition = full_partition(ctx)?;
    let eps = ctx.eps();
    let t = ctx.thickness();
    let mut out = Vec::new();

    for bend in &ctx.pattern.bend_lines {
        if bend.angle_deg == 0.0 {
            continue;
        }
        let Some(link) = partition.link(&bend.id) else {
            continue;
        };
        let (negative, positive) = match link.sides() {
            Ok(sides) => sides,
            Err(err) => {
                out.push(RuleResult::skipped(kind, err).with_reference(GeometryRef::bend(&bend.id)));
                continue;
            },
        };
        let radius = ctx.params.effective_radius(bend.radius);
        let required = ctx.params.min_flange_height(radius);
        let seg = bend.segment();

        for (face, side) in [(negative, -1.0), (positive, 1.0)] {
            let sub_face = &partition.faces()[face];
            // faces stop at the cut strip, so add its half-width back
            let extent = sub_face
                .region
                .rings()
                .flat_map(|r| r.points().iter())
                .map(|p| side * seg.signed_distance(p))
                .fold(0.0, Real::max)
                + cut_half_width(eps);
            if extent < required - eps {
                out.push(
                    finding(
                        kind,
                        bend,
                        format!(
                            "flange on sub-face {face} of bend '{}' is {} high, below the minimum {} (2t + R with t = {t}, R = {radius})",
                            bend.id,
                            mm(extent),
                            mm(required)
                        ),
                    )
                    .with_reference(GeometryRef::SubFace { index: face })
                    .with_reference(GeometryRef::point(&sub_face.centroid))
                    .with_suggestion(format!(
                        "Lengthen the flange to at least {} or reduce the bend radius.",
                        mm(required)
                    )),
                );
            }
        }
    }
    Ok(out)
}

/// A bend that ends at (or past) the part boundary with material continuing
/// beyond it must have a relief of width `t` reaching `R + t` past the end.
pub(super) fn bend_relief(ctx: &RuleContext<'_>) -> EngineResult<Vec<RuleResult>> {
    let kind = RuleKind::BendRelief;
    let eps = ctx.eps();
    let t = ctx.thickness();
    let region = ctx.pattern.region();
    let mut out = Vec::new();

    for bend in &ctx.pattern.bend_lines {
        if bend.angle_deg == 0.0 {
            continue;
        }
        let dir = bend
            .segment()
            .direction()
            .ok_or_else(|| EngineError::degenerate_at(format!("bend line '{}' has zero length", bend.id), bend.start))?;
        let radius = ctx.params.effective_radius(bend.radius);
        let depth = radius + t;

        for (end, outward) in [(bend.start, -dir), (bend.end, dir)] {
            if region.contains(&end, eps) == Containment::Inside {
                continue;
            }
            let probe = strip_around(&Segment2::new(end, end + outward * depth), t / 2.0, 0.0)?;
            let material: Real = region.intersection(&probe, eps).iter().map(|p| p.area()).sum();
            if material > 10.0 * eps * depth {
                out.push(
                    finding(
                        kind,
                        bend,
                        format!(
                            "bend '{}' ends at ({:.3}, {:.3}) with material continuing past it and no relief {} wide by {} deep",
                            bend.id,
                            end.x,
                            end.y,
                            mm(t),
                            mm(depth)
                        ),
                    )
                    .with_reference(GeometryRef::point(&end))
                    .with_suggestion(format!(
                        "Add a bend relief at least {} wide extending {} past the end of the bend.",
                        mm(t),
                        mm(depth)
                    )),
                );
            }
        }
    }
    Ok(out)
}

pub(super) fn grain_direction(ctx: &RuleContext<'_>) -> EngineResult<Vec<RuleResult>> {
    let kind = RuleKind::GrainDirection;
    if !ctx.params.grain_sensitive || ctx.pattern.bend_lines.is_empty() {
        return Ok(Vec::new());
    }
    let Some(grain) = ctx.pattern.grain_direction_deg else {
        return Err(EngineError::degenerate(format!(
            "{} is grain-sensitive but the pattern declares no grain direction",
            ctx.params.material
        )));
    };
    let tolerance = ctx.config.grain_tolerance_deg;
    let mut out = Vec::new();
    for bend in &ctx.pattern.bend_lines {
        let diff = (bend.direction_deg() - grain).rem_euclid(180.0);
        let angle = diff.min(180.0 - diff);
        if angle < tolerance {
            out.push(
                finding(
                    kind,
                    bend,
                    format!(
                        "bend '{}' runs {angle:.1} deg from the grain direction ({grain:.1} deg); {} cracks when bent along the grain",
                        bend.id, ctx.params.material
                    ),
                )
                .with_reference(GeometryRef::point(&bend.segment().midpoint()))
                .with_suggestion(format!(
                    "Rotate the part on the sheet so the bend is at least {tolerance} deg off the grain, ideally across it."
                )),
            );
        }
    }
    Ok(out)
}
