//! Declared tolerances against what the cutting process can hold.

use super::{RuleContext, RuleKind};
use crate::errors::EngineResult;
use crate::report::{GeometryRef, RuleResult};

pub(super) fn tolerance_vs_process(ctx: &RuleContext<'_>) -> EngineResult<Vec<RuleResult>> {
    let kind = RuleKind::ToleranceVsProcess;
    let mut out = Vec::new();
    for spec in &ctx.pattern.tolerances {
        let unit = spec.kind.unit();
        let Some(capability) = ctx.params.capability(spec.kind) else {
            out.push(
                RuleResult::skipped(
                    kind,
                    format!(
                        "process '{}' has no capability data for {:?} (tolerance '{}')",
                        ctx.params.process, spec.kind, spec.id
                    ),
                )
                .with_reference(spec.feature.clone()),
            );
            continue;
        };
        if spec.tolerance < capability {
            let mut finding = RuleResult::new(
                kind,
                kind.default_severity(),
                format!(
                    "tolerance '{}' of ±{} {unit} is tighter than {} can hold (±{capability} {unit})",
                    spec.id, spec.tolerance, ctx.params.process
                ),
            )
            .with_reference(spec.feature.clone())
            .with_suggestion(format!(
                "Relax the tolerance to ±{capability} {unit} or choose a process that holds ±{} {unit}.",
                spec.tolerance
            ));
            // a part- or tool-level feature still needs a spot on the pattern
            if !spec.feature.is_locatable() {
                finding = finding.with_reference(GeometryRef::point(&ctx.pattern.outer.centroid()));
            }
            out.push(finding);
        }
    }
    Ok(out)
}
