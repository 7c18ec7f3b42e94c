//! DFM rule engine.
//!
//! The rule set is the closed enumeration [`RuleKind`]. Each rule is a pure
//! function of a [`RuleContext`] and never looks at another rule's output, so
//! running any subset yields exactly the results those rules give in a full
//! run. Rules are evaluated in parallel and reported in registration order
//! ([`RuleKind::ALL`]).
//!
//! A rule that finds nothing reports a single `info` "passed" result; a rule
//! that cannot evaluate reports an `info` result whose message starts with
//! "skipped - insufficient data".

use crate::bend::{SimulatedState, SimulationOutcome};
use crate::config::EngineConfig;
use crate::engine::CancellationToken;
use crate::errors::{EngineError, EngineResult};
use crate::float_types::Real;
use crate::material::MaterialParams;
use crate::pattern::FlatPattern;
use crate::report::{RuleResult, Severity};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

mod bend;
mod boundary;
mod holes;
mod process;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKind {
    SelfIntersection,
    MinBendRadius,
    MinFlangeHeight,
    HoleToBendClearance,
    HoleToEdgeClearance,
    BendRelief,
    GrainDirection,
    ToleranceVsProcess,
    KerfMinFeature,
    HoleToHoleSpacing,
    MinHoleDiameter,
}

impl RuleKind {
    /// Every rule, in registration order.
    pub const ALL: [RuleKind; 11] = [
        RuleKind::SelfIntersection,
        RuleKind::MinBendRadius,
        RuleKind::MinFlangeHeight,
        RuleKind::HoleToBendClearance,
        RuleKind::HoleToEdgeClearance,
        RuleKind::BendRelief,
        RuleKind::GrainDirection,
        RuleKind::ToleranceVsProcess,
        RuleKind::KerfMinFeature,
        RuleKind::HoleToHoleSpacing,
        RuleKind::MinHoleDiameter,
    ];

    pub const fn id(self) -> &'static str {
        match self {
            RuleKind::SelfIntersection => "self-intersection",
            RuleKind::MinBendRadius => "min-bend-radius",
            RuleKind::MinFlangeHeight => "min-flange-height",
            RuleKind::HoleToBendClearance => "hole-to-bend-clearance",
            RuleKind::HoleToEdgeClearance => "hole-to-edge-clearance",
            RuleKind::BendRelief => "bend-relief",
            RuleKind::GrainDirection => "grain-direction",
            RuleKind::ToleranceVsProcess => "tolerance-vs-process",
            RuleKind::KerfMinFeature => "kerf-min-feature",
            RuleKind::HoleToHoleSpacing => "hole-to-hole-spacing",
            RuleKind::MinHoleDiameter => "min-hole-diameter",
        }
    }

    /// Optional rules only run when enabled in the config.
    pub const fn is_default(self) -> bool {
        !matches!(self, RuleKind::HoleToHoleSpacing | RuleKind::MinHoleDiameter)
    }

    /// Severity of a finding of this rule.
    pub const fn default_severity(self) -> Severity {
        match self {
            RuleKind::SelfIntersection
            | RuleKind::MinBendRadius
            | RuleKind::MinFlangeHeight
            | RuleKind::BendRelief
            | RuleKind::KerfMinFeature => Severity::Error,
            RuleKind::HoleToBendClearance
            | RuleKind::HoleToEdgeClearance
            | RuleKind::GrainDirection
            | RuleKind::ToleranceVsProcess
            | RuleKind::HoleToHoleSpacing
            | RuleKind::MinHoleDiameter => Severity::Warning,
        }
    }

    /// Rules that rely on region booleans or offsets, which are meaningless
    /// on a self-intersecting boundary.
    const fn requires_simple_rings(self) -> bool {
        matches!(
            self,
            RuleKind::MinFlangeHeight | RuleKind::BendRelief | RuleKind::KerfMinFeature
        )
    }

    /// Evaluate this rule. Never empty.
    pub fn evaluate(self, ctx: &RuleContext<'_>) -> Vec<RuleResult> {
        let outcome = if self.requires_simple_rings() && !ctx.simple_rings {
            Err(EngineError::degenerate("the pattern boundary self-intersects"))
        } else {
            match self {
                RuleKind::SelfIntersection => boundary::self_intersection(ctx),
                RuleKind::MinBendRadius => bend::min_bend_radius(ctx),
                RuleKind::MinFlangeHeight => bend::min_flange_height(ctx),
                RuleKind::HoleToBendClearance => holes::hole_to_bend(ctx),
                RuleKind::HoleToEdgeClearance => holes::hole_to_edge(ctx),
                RuleKind::BendRelief => bend::bend_relief(ctx),
                RuleKind::GrainDirection => bend::grain_direction(ctx),
                RuleKind::ToleranceVsProcess => process::tolerance_vs_process(ctx),
                RuleKind::KerfMinFeature => boundary::kerf_min_feature(ctx),
                RuleKind::HoleToHoleSpacing => holes::hole_to_hole(ctx),
                RuleKind::MinHoleDiameter => holes::min_hole_diameter(ctx),
            }
        };
        let results = match outcome {
            Ok(results) if results.is_empty() => vec![RuleResult::passed(self)],
            Ok(results) => results,
            Err(EngineError::DegenerateGeometry { reason, .. }) => vec![RuleResult::skipped(self, reason)],
            Err(err) => vec![RuleResult::skipped(self, err)],
        };
        debug!(rule = self.id(), results = results.len(), "rule evaluated");
        results
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Read-only inputs shared by every rule of one run.
pub struct RuleContext<'a> {
    pub pattern: &'a FlatPattern,
    pub params: &'a MaterialParams,
    pub config: &'a EngineConfig,
    /// The run's simulation, if it got that far.
    pub simulation: Option<&'a SimulationOutcome>,
    simple_rings: bool,
}

impl<'a> RuleContext<'a> {
    pub fn new(
        pattern: &'a FlatPattern,
        params: &'a MaterialParams,
        config: &'a EngineConfig,
        simulation: Option<&'a SimulationOutcome>,
    ) -> Self {
        Self {
            pattern,
            params,
            config,
            simulation,
            simple_rings: pattern.has_simple_rings(),
        }
    }

    #[inline]
    pub fn eps(&self) -> Real {
        self.config.epsilon
    }

    #[inline]
    pub fn thickness(&self) -> Real {
        self.params.thickness
    }

    /// Simulated states of the run, empty if nothing was simulated.
    pub fn states(&self) -> &[SimulatedState] {
        self.simulation.map(|s| s.states.as_slice()).unwrap_or(&[])
    }

    /// Whether no boundary ring of the pattern self-intersects.
    pub fn has_simple_rings(&self) -> bool {
        self.simple_rings
    }
}

/// Evaluate `rules` against `ctx`, in parallel, in the order given.
///
/// Cancellation is checked after each rule.
#[cfg(feature = "parallel")]
pub fn evaluate_rules(
    ctx: &RuleContext<'_>,
    rules: &[RuleKind],
    cancel: &CancellationToken,
) -> EngineResult<Vec<RuleResult>> {
    let per_rule = rules
        .par_iter()
        .map(|rule| {
            cancel.check()?;
            let results = rule.evaluate(ctx);
            cancel.check()?;
            Ok(results)
        })
        .collect::<EngineResult<Vec<_>>>()?;
    Ok(per_rule.into_iter().flatten().collect())
}

/// Evaluate `rules` against `ctx`, in the order given.
///
/// Cancellation is checked after each rule.
#[cfg(not(feature = "parallel"))]
pub fn evaluate_rules(
    ctx: &RuleContext<'_>,
    rules: &[RuleKind],
    cancel: &CancellationToken,
) -> EngineResult<Vec<RuleResult>> {
    let mut out = Vec::new();
    for rule in rules {
        cancel.check()?;
        out.extend(rule.evaluate(ctx));
    }
    cancel.check()?;
    Ok(out)
}

/// Human-readable millimetres.
pub(crate) fn mm(value: Real) -> String {
    format!("{value:.3} mm")
}
