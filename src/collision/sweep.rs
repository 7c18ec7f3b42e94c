//! Swept tooling collision: every (step, tool) pair over the whole bend motion.
//!
//! A step is sampled at progress `s = i / N`, `i = 0..=N`. `N` is chosen so
//! that between two samples no point of a moving plate (and no tool) moves
//! further than one kerf width:
//! ```text
//! N = ceil(max((r_max + R + K t) |θ|, stroke travel) / kerf)
//! ```
//! where `r_max` is the largest distance of a moving plate vertex from the
//! bend axis, clamped to `[min_sweep_samples, max_sweep_samples]`. A zero
//! or degenerate motion falls back to the minimum.
//!
//! When `max_sweep_samples` caps `N`, points move further than a kerf width
//! between samples. The sweep then widens the near-miss margin by that
//! spacing, so a clearance it cannot vouch for is at least a warning.

use crate::bend::{PartModel, SimulatedState, SimulationOutcome};
use crate::collision::ToolProfile;
use crate::config::EngineConfig;
use crate::engine::CancellationToken;
use crate::errors::EngineResult;
use crate::float_types::Real;
use crate::mesh::{Bvh, Proximity};
use crate::report::{CollisionResult, CollisionSubject, GeometryRef};
use nalgebra::{Isometry3, Translation3};
use std::sync::Arc;
use tracing::{debug, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// How finely one (step, tool) pair is swept.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweepSampling {
    pub samples: usize,
    /// Largest distance any point moves between two consecutive samples.
    pub spacing: Real,
    /// `max_sweep_samples` held `samples` below what the kerf asks for.
    pub capped: bool,
}

/// Sampling for sweeping `state` with a tool travelling `travel`.
pub fn sweep_sampling(
    model: &PartModel,
    state: &SimulatedState,
    before: &[Isometry3<Real>],
    travel: Real,
    kerf: Real,
    config: &EngineConfig,
) -> SweepSampling {
    let motion = &state.motion;
    let theta = motion.angle_deg.to_radians().abs();
    let to_frame = motion.frame.inverse();
    let centre = motion.arc_centre;

    let r_max = motion
        .moving_faces
        .iter()
        .flat_map(|&face| {
            let pose = to_frame * before[face];
            model.plate_vertices(face).map(move |v| pose * v)
        })
        .map(|p| ((p.y - centre.y).powi(2) + (p.z - centre.z).powi(2)).sqrt())
        .fold(0.0, Real::max);

    let step = if kerf > 0.0 { kerf } else { config.sweep_fallback_step };
    let path = ((r_max + motion.neutral_radius) * theta).max(travel);
    let raw = (path / step).ceil();
    if !raw.is_finite() || raw <= 0.0 || (theta == 0.0 && travel == 0.0) {
        let samples = config.min_sweep_samples;
        return SweepSampling {
            samples,
            spacing: if path.is_finite() { path / samples as Real } else { 0.0 },
            capped: false,
        };
    }
    let samples = (raw as usize).clamp(config.min_sweep_samples, config.max_sweep_samples);
    SweepSampling {
        samples,
        spacing: path / samples as Real,
        capped: samples < raw as usize,
    }
}

/// A tool ready for sweeping: its profile and hierarchy.
pub struct PreparedTool {
    pub profile: Arc<ToolProfile>,
    pub bvh: Bvh,
}

impl PreparedTool {
    pub fn new(profile: Arc<ToolProfile>) -> EngineResult<Self> {
        let bvh = profile.bvh()?;
        Ok(Self { profile, bvh })
    }
}

/// Closest approach found over a sweep.
#[derive(Clone, Copy, Debug)]
struct SweepHit {
    proximity: Proximity,
    progress: Real,
    face: usize,
}

/// Sweep one (step, tool) pair.
pub fn sweep_step(
    outcome: &SimulationOutcome,
    step: usize,
    tool: &PreparedTool,
    kerf: Real,
    config: &EngineConfig,
) -> EngineResult<CollisionResult> {
    let state = &outcome.states[step];
    let model = &outcome.model;
    let before = outcome.poses_before(step);
    let profile = &tool.profile;
    let sampling = sweep_sampling(model, state, &before, profile.motion.travel(), kerf, config);
    let samples = sampling.samples;
    if sampling.capped {
        warn!(
            step,
            tool = %profile.id,
            samples,
            spacing = sampling.spacing,
            "sweep sampling capped, widening the near-miss margin"
        );
    }

    let mut best: Option<SweepHit> = None;
    for i in 0..=samples {
        let s = i as Real / samples as Real;
        let tool_pose = state.motion.frame * Translation3::from(profile.motion.offset(s));
        for &face in &state.motion.moving_faces {
            let Some(plate) = model.plate_bvh(face) else {
                continue;
            };
            let pose = state.pose_at(&before, face, s);
            if let Some(found) = plate.min_signed_distance(&pose, &tool.bvh, &tool_pose)? {
                if best.is_none_or(|b| found.distance < b.proximity.distance) {
                    best = Some(SweepHit {
                        proximity: found,
                        progress: s,
                        face,
                    });
                }
            }
        }
    }
    debug!(step, tool = %profile.id, samples, clearance = ?best.map(|b| b.proximity.distance), "swept tool");

    let clearance = best.map(|b| b.proximity.distance);
    let margin = if sampling.capped {
        config.safety_margin + sampling.spacing
    } else {
        config.safety_margin
    };
    let (collided, severity) = CollisionResult::classify(clearance, margin);
    let mut references = vec![
        GeometryRef::Step { index: step },
        GeometryRef::bend(&state.bend_id),
        GeometryRef::Tool { id: profile.id.clone() },
    ];
    let mut message = match best {
        Some(hit) => {
            references.push(GeometryRef::SubFace { index: hit.face });
            references.push(GeometryRef::point3(&hit.proximity.point));
            let d = hit.proximity.distance;
            let at = hit.progress * 100.0;
            if collided {
                format!(
                    "tool '{}' penetrates sub-face {} by {:.3} mm at {at:.0}% of step {step} (bend '{}')",
                    profile.id,
                    hit.face,
                    -d,
                    state.bend_id
                )
            } else {
                format!(
                    "tool '{}' clears sub-face {} by {d:.3} mm (closest at {at:.0}% of step {step}, bend '{}')",
                    profile.id, hit.face, state.bend_id
                )
            }
        },
        None => format!(
            "no moving plate geometry to test against tool '{}' in step {step} (bend '{}')",
            profile.id, state.bend_id
        ),
    };
    if sampling.capped {
        message.push_str(&format!(
            "; sampling capped at {samples} samples, up to {:.3} mm of motion between samples",
            sampling.spacing
        ));
    }

    Ok(CollisionResult {
        subject: CollisionSubject::Tooling {
            step,
            bend_id: state.bend_id.clone(),
            tool_id: profile.id.clone(),
        },
        collided,
        min_clearance: clearance,
        severity,
        message,
        references,
    })
}

/// Every (step, tool) pair, ordered by step then tool id.
fn tasks(outcome: &SimulationOutcome, tools: &[PreparedTool]) -> Vec<(usize, usize)> {
    let mut by_id: Vec<usize> = (0..tools.len()).collect();
    by_id.sort_by(|a, b| tools[*a].profile.id.cmp(&tools[*b].profile.id));
    (0..outcome.states.len())
        .flat_map(|step| by_id.iter().map(move |&t| (step, t)))
        .collect()
}

/// Sweep every simulated step against every tool.
///
/// Cancellation is checked before each (step, tool) task.
#[cfg(feature = "parallel")]
pub fn sweep_tooling(
    outcome: &SimulationOutcome,
    tools: &[PreparedTool],
    kerf: Real,
    config: &EngineConfig,
    cancel: &CancellationToken,
) -> EngineResult<Vec<CollisionResult>> {
    tasks(outcome, tools)
        .into_par_iter()
        .map(|(step, t)| {
            cancel.check()?;
            sweep_step(outcome, step, &tools[t], kerf, config)
        })
        .collect()
}

/// Sweep every simulated step against every tool.
///
/// Cancellation is checked before each (step, tool) task.
#[cfg(not(feature = "parallel"))]
pub fn sweep_tooling(
    outcome: &SimulationOutcome,
    tools: &[PreparedTool],
    kerf: Real,
    config: &EngineConfig,
    cancel: &CancellationToken,
) -> EngineResult<Vec<CollisionResult>> {
    tasks(outcome, tools)
        .into_iter()
        .map(|(step, t)| {
            cancel.check()?;
            sweep_step(outcome, step, &tools[t], kerf, config)
        })
        .collect()
}
