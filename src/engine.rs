//! Validation runs: input checks, simulation, rules and collision checks,
//! folded into one [`ValidationReport`].

use crate::bend::{BendSimulator, SimulationOutcome};
use crate::collision::{PreparedTool, SheetNest, ToolProfile, check_nest, sweep_tooling};
use crate::config::EngineConfig;
use crate::errors::{EngineError, EngineResult};
use crate::float_types::Real;
use crate::material::MaterialParams;
use crate::pattern::{BendSequence, FlatPattern};
use crate::report::{CollisionResult, RuleResult, ValidationReport, content_hash};
use crate::rules::{RuleContext, RuleKind, evaluate_rules};
use hashbrown::HashSet;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info_span};

/// Cooperative cancellation shared between a caller and a running validation.
///
/// Clones share one flag. Once cancelled, the run stops at its next check
/// and returns [`EngineError::Cancelled`].
#[derive(Clone, Debug, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn check(&self) -> EngineResult<()> {
        if self.is_cancelled() {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Everything a report depends on, in hashing order.
#[derive(Serialize)]
struct RunInputs<'a> {
    pattern: &'a FlatPattern,
    params: &'a MaterialParams,
    sequence: &'a BendSequence,
    tools: Vec<&'a ToolProfile>,
    nest: Option<&'a SheetNest>,
    config: &'a EngineConfig,
}

/// A configured validation engine. Holds no per-run state and may be shared
/// between threads.
#[derive(Clone, Debug, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn validate(
        &self,
        pattern: &FlatPattern,
        material: &Arc<MaterialParams>,
        sequence: &BendSequence,
        tools: &[Arc<ToolProfile>],
        nest: Option<&SheetNest>,
    ) -> EngineResult<ValidationReport> {
        self.validate_cancellable(pattern, material, sequence, tools, nest, &CancellationToken::new())
    }

    /// Validate one design.
    ///
    /// Input problems (malformed geometry, mismatched material parameters,
    /// unknown bend ids, a bend that cannot be folded) are returned as
    /// errors; design problems end up in the report.
    pub fn validate_cancellable(
        &self,
        pattern: &FlatPattern,
        material: &Arc<MaterialParams>,
        sequence: &BendSequence,
        tools: &[Arc<ToolProfile>],
        nest: Option<&SheetNest>,
        cancel: &CancellationToken,
    ) -> EngineResult<ValidationReport> {
        let span = info_span!("validate", pattern = %pattern.id, steps = sequence.len(), tools = tools.len());
        let _enter = span.enter();

        let config = &self.config;
        let eps = config.epsilon;
        cancel.check()?;
        pattern.validate(eps)?;
        check_material(pattern, material, eps)?;
        sequence.resolve(pattern)?;
        let prepared = prepare_tools(tools)?;
        if let Some(nest) = nest {
            nest.validate(eps)?;
        }

        let input_hash = content_hash(&RunInputs {
            pattern,
            params: material,
            sequence,
            tools: tools.iter().map(Arc::as_ref).collect(),
            nest,
            config,
        })?;
        debug!(%input_hash, "inputs accepted");

        let simulation = if pattern.has_simple_rings() {
            let mut outcome = BendSimulator::new(pattern, material, config).simulate(sequence, cancel)?;
            if let Some(err) = outcome.aborted.take() {
                return Err(err);
            }
            Some(outcome)
        } else {
            debug!("self-intersecting boundary, skipping bend simulation");
            None
        };
        cancel.check()?;

        let ctx = RuleContext::new(pattern, material, config, simulation.as_ref());
        let rules = config.active_rules();
        let (rule_results, collision_results) = run_checks(
            &ctx,
            &rules,
            simulation.as_ref(),
            &prepared,
            material.kerf_width,
            nest,
            config,
            cancel,
        );
        let rule_results = rule_results?;
        let collision_results = collision_results?;
        cancel.check()?;

        let simulated_steps = simulation.as_ref().map_or(0, |s| s.states.len());
        let report = ValidationReport::new(input_hash, rule_results, collision_results, simulated_steps);
        debug!(verdict = ?report.verdict(), rules = report.rule_results().len(), collisions = report.collision_results().len(), "validation finished");
        Ok(report)
    }
}

/// Validate with [`EngineConfig::default`].
pub fn validate(
    pattern: &FlatPattern,
    material: &Arc<MaterialParams>,
    sequence: &BendSequence,
    tools: &[Arc<ToolProfile>],
    nest: Option<&SheetNest>,
) -> EngineResult<ValidationReport> {
    Engine::default().validate(pattern, material, sequence, tools, nest)
}

fn same_name(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

fn check_material(pattern: &FlatPattern, params: &MaterialParams, eps: Real) -> EngineResult<()> {
    if !same_name(&pattern.material, &params.material) {
        return Err(EngineError::MaterialMismatch(format!(
            "pattern is '{}' but parameters describe '{}'",
            pattern.material, params.material
        )));
    }
    if !same_name(&pattern.process, &params.process) {
        return Err(EngineError::MaterialMismatch(format!(
            "pattern is cut by '{}' but parameters describe '{}'",
            pattern.process, params.process
        )));
    }
    if (pattern.thickness - params.thickness).abs() > eps {
        return Err(EngineError::MaterialMismatch(format!(
            "pattern is {} mm thick but parameters describe {} mm",
            pattern.thickness, params.thickness
        )));
    }
    Ok(())
}

fn prepare_tools(tools: &[Arc<ToolProfile>]) -> EngineResult<Vec<PreparedTool>> {
    let mut ids = HashSet::new();
    tools
        .iter()
        .map(|tool| {
            if !ids.insert(tool.id.as_str()) {
                return Err(EngineError::degenerate(format!("duplicate tool id '{}'", tool.id)));
            }
            PreparedTool::new(Arc::clone(tool))
        })
        .collect()
}

/// Tooling sweep results (if simulated) followed by nest results.
fn collisions(
    simulation: Option<&SimulationOutcome>,
    tools: &[PreparedTool],
    kerf: Real,
    nest: Option<&SheetNest>,
    config: &EngineConfig,
    cancel: &CancellationToken,
) -> EngineResult<Vec<CollisionResult>> {
    let mut out = match simulation {
        Some(outcome) if !tools.is_empty() => sweep_tooling(outcome, tools, kerf, config, cancel)?,
        _ => Vec::new(),
    };
    if let Some(nest) = nest {
        out.extend(check_nest(nest, config, cancel)?);
    }
    Ok(out)
}

type CheckResults = (EngineResult<Vec<RuleResult>>, EngineResult<Vec<CollisionResult>>);

#[cfg(feature = "parallel")]
#[allow(clippy::too_many_arguments)]
fn run_checks(
    ctx: &RuleContext<'_>,
    rules: &[RuleKind],
    simulation: Option<&SimulationOutcome>,
    tools: &[PreparedTool],
    kerf: Real,
    nest: Option<&SheetNest>,
    config: &EngineConfig,
    cancel: &CancellationToken,
) -> CheckResults {
    rayon::join(
        || evaluate_rules(ctx, rules, cancel),
        || collisions(simulation, tools, kerf, nest, config, cancel),
    )
}

#[cfg(not(feature = "parallel"))]
#[allow(clippy::too_many_arguments)]
fn run_checks(
    ctx: &RuleContext<'_>,
    rules: &[RuleKind],
    simulation: Option<&SimulationOutcome>,
    tools: &[PreparedTool],
    kerf: Real,
    nest: Option<&SheetNest>,
    config: &EngineConfig,
    cancel: &CancellationToken,
) -> CheckResults {
    (
        evaluate_rules(ctx, rules, cancel),
        collisions(simulation, tools, kerf, nest, config, cancel),
    )
}
