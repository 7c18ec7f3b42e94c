//! Rules about the cut boundary: simplicity and kerf-limited feature size.

use super::{RuleContext, RuleKind, mm};
use crate::errors::{EngineError, EngineResult};
use crate::float_types::Real;
use crate::report::{GeometryRef, RuleResult};
use crate::sketch::{Polygon2, Ring};
use nalgebra::Point2;

pub(super) fn self_intersection(ctx: &RuleContext<'_>) -> EngineResult<Vec<RuleResult>> {
    let kind = RuleKind::SelfIntersection;
    let rings = std::iter::once(("outer", &ctx.pattern.outer))
        .chain(ctx.pattern.holes.iter().map(|h| (h.id.as_str(), &h.ring)));

    let mut out = Vec::new();
    for (name, ring) in rings {
        for hit in ring.self_intersections() {
            let label = if name == "outer" {
                "outer boundary".to_string()
            } else {
                format!("hole '{name}'")
            };
            out.push(
                RuleResult::new(
                    kind,
                    kind.default_severity(),
                    format!(
                        "{label} crosses itself at ({:.3}, {:.3}) between edges {} and {}",
                        hit.point.x, hit.point.y, hit.edge_a, hit.edge_b
                    ),
                )
                .with_reference(GeometryRef::point(&hit.point))
                .with_reference(GeometryRef::Edge {
                    ring: name.to_string(),
                    index: hit.edge_a,
                })
                .with_reference(GeometryRef::Edge {
                    ring: name.to_string(),
                    index: hit.edge_b,
                })
                .with_suggestion("Repair the contour so it is a simple closed loop before cutting."),
            );
        }
    }
    Ok(out)
}

pub(super) fn kerf_min_feature(ctx: &RuleContext<'_>) -> EngineResult<Vec<RuleResult>> {
    let kind = RuleKind::KerfMinFeature;
    let kerf = ctx.params.kerf_width;
    if !kerf.is_finite() || kerf <= 0.0 {
        return Err(EngineError::degenerate(format!(
            "process '{}' reports no kerf width",
            ctx.params.process
        )));
    }
    let eps = ctx.eps();
    let required = 2.0 * kerf;
    let mut out = Vec::new();

    for hole in &ctx.pattern.holes {
        let width = hole.ring.min_width();
        if width < required - eps {
            out.push(
                RuleResult::new(
                    kind,
                    kind.default_severity(),
                    format!(
                        "hole '{}' is {} across, under twice the {} kerf ({})",
                        hole.id,
                        mm(width),
                        ctx.params.process,
                        mm(kerf)
                    ),
                )
                .with_reference(GeometryRef::hole(&hole.id))
                .with_reference(GeometryRef::point(&hole.ring.centroid()))
                .with_suggestion(format!(
                    "Enlarge the feature to at least {} or use a process with a narrower kerf.",
                    mm(required)
                )),
            );
        }
    }

    let outer = &ctx.pattern.outer;
    let parts = match outer.offset(-kerf, eps) {
        Ok(parts) => parts,
        Err(EngineError::DegenerateGeometry { .. }) => {
            let at = outer.centroid();
            out.push(thin_outer(ctx, outer, outer.min_width(), at));
            return Ok(out);
        },
        Err(err) => return Err(err),
    };

    // necks and spikes: material that shrinking by the kerf removes and
    // growing back does not restore
    let mut lost = vec![Polygon2::from(outer.clone())];
    for part in &parts {
        for restored in part.offset(kerf, eps)? {
            lost = lost.iter().flat_map(|piece| piece.difference(&restored, eps)).collect();
        }
    }
    for piece in lost {
        let width = piece.outer().min_width();
        if width <= eps {
            continue;
        }
        let at = piece.centroid();
        out.push(thin_outer(ctx, outer, width, at));
    }
    Ok(out)
}

fn thin_outer(ctx: &RuleContext<'_>, outer: &Ring, width: Real, at: Point2<Real>) -> RuleResult {
    let kind = RuleKind::KerfMinFeature;
    let required = 2.0 * ctx.params.kerf_width;
    RuleResult::new(
        kind,
        kind.default_severity(),
        format!(
            "outer boundary narrows to about {} near ({:.3}, {:.3}), under twice the {} kerf",
            mm(width),
            at.x,
            at.y,
            ctx.params.process
        ),
    )
    .with_reference(GeometryRef::point(&at))
    .with_reference(GeometryRef::outer_edge(outer.closest_edge(&at)))
    .with_suggestion(format!(
        "Widen the feature to at least {} or use a process with a narrower kerf.",
        mm(required)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::material::MaterialCatalog;
    use crate::pattern::{FlatPattern, Hole};
    use crate::report::Severity;

    fn run(kind: RuleKind, pattern: &FlatPattern) -> Vec<RuleResult> {
        let params = MaterialCatalog::builtin()
            .lookup(&pattern.material, pattern.thickness, &pattern.process)
            .unwrap();
        let config = EngineConfig::default();
        kind.evaluate(&RuleContext::new(pattern, &params, &config, None))
    }

    #[test]
    fn test_bowtie_is_flagged() {
        let bowtie = Ring::from_xy(&[[0.0, 0.0], [10.0, 10.0], [10.0, 0.0], [0.0, 10.0]]).unwrap();
        let pattern = FlatPattern::new("p", bowtie, "mild-steel", 1.5, "laser");
        let results = run(RuleKind::SelfIntersection, &pattern);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].severity, Severity::Error);
        assert!(results[0].references.iter().any(|r| matches!(
            r,
            GeometryRef::Point { x, y } if (x - 5.0).abs() < 1e-9 && (y - 5.0).abs() < 1e-9
        )));

        // boolean-based rules refuse to run on it
        assert!(run(RuleKind::KerfMinFeature, &pattern)[0].is_skipped());
    }

    #[test]
    fn test_plasma_kerf_limits() {
        // plasma kerf is 1.5 mm: a 2 mm slot and a 2 mm neck are both too small
        let outer = Ring::from_xy(&[
            [0.0, 0.0],
            [40.0, 0.0],
            [40.0, 20.0],
            [21.0, 20.0],
            [21.0, 40.0],
            [40.0, 40.0],
            [40.0, 60.0],
            [0.0, 60.0],
            [0.0, 40.0],
            [19.0, 40.0],
            [19.0, 20.0],
            [0.0, 20.0],
        ])
        .unwrap();
        let pattern = FlatPattern::new("p", outer, "mild-steel", 3.0, "plasma")
            .with_hole(Hole::new("slot", Ring::rectangle(5.0, 5.0, 10.0, 2.0).unwrap()));
        let results = run(RuleKind::KerfMinFeature, &pattern);
        assert_eq!(results.len(), 2);
        assert!(results[0].references.contains(&GeometryRef::hole("slot")));
        assert!(results[1].message.contains("outer boundary narrows to about 2.000 mm"));
    }

    #[test]
    fn test_laser_kerf_passes() {
        let pattern = FlatPattern::new("p", Ring::rectangle(0.0, 0.0, 50.0, 50.0).unwrap(), "mild-steel", 1.5, "laser")
            .with_hole(Hole::new("h", Ring::circle(Point2::new(25.0, 25.0), 2.0, 24).unwrap()));
        assert_eq!(run(RuleKind::KerfMinFeature, &pattern)[0].message, "passed");
    }

    #[test]
    fn test_thin_spike_is_flagged() {
        // 40 x 40 plate with a 0.3 mm wide, 10 mm long spike; laser needs 0.4 mm
        let outer = Ring::from_xy(&[
            [0.0, 0.0],
            [40.0, 0.0],
            [40.0, 40.0],
            [20.15, 40.0],
            [20.15, 50.0],
            [19.85, 50.0],
            [19.85, 40.0],
            [0.0, 40.0],
        ])
        .unwrap();
        let pattern = FlatPattern::new("p", outer, "mild-steel", 1.5, "laser");
        let results = run(RuleKind::KerfMinFeature, &pattern);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].severity, Severity::Error);
        assert!(results[0].message.contains("narrows to about 0.300 mm"), "{}", results[0].message);
        assert!(results[0].references.iter().any(|r| matches!(
            r,
            GeometryRef::Point { x, y } if (x - 20.0).abs() < 1e-3 && *y > 40.0 && *y < 50.0
        )));

        // a 1 mm wide tab survives the same kerf
        let outer = Ring::from_xy(&[
            [0.0, 0.0],
            [40.0, 0.0],
            [40.0, 40.0],
            [20.5, 40.0],
            [20.5, 50.0],
            [19.5, 50.0],
            [19.5, 40.0],
            [0.0, 40.0],
        ])
        .unwrap();
        let pattern = FlatPattern::new("p", outer, "mild-steel", 1.5, "laser");
        assert_eq!(run(RuleKind::KerfMinFeature, &pattern)[0].message, "passed");
    }
}
