//! Bend-sequence simulator.
//!
//! The flat pattern is partitioned once into sub-faces along the sequenced
//! bend lines ([`Partition`]). Topology (regions, plates, convex pieces) is
//! kept in a shared [`PartModel`]; every step only produces new poses. Each
//! step rotates the faces on the moving side of its bend about the bend's arc
//! centre, composed with the current pose of the fixed-side face so that
//! multi-bend parts form correctly.

use crate::config::EngineConfig;
use crate::engine::CancellationToken;
use crate::errors::{EngineError, EngineResult};
use crate::float_types::Real;
use crate::material::MaterialParams;
use crate::mesh::{Bvh, Mesh, convex::plate_pieces};
use crate::pattern::partition::{cut_half_width, strip_around};
use crate::pattern::{BendLine, BendSequence, FlatPattern, Partition};
use crate::sketch::Polygon2;
use nalgebra::{Isometry3, Matrix3, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};
use tracing::{debug, instrument, warn};

pub mod allowance;
pub mod state;

pub use allowance::{bend_allowance, bend_deduction, flat_length, outside_setback};
pub use state::{BendMotion, SimulatedState};

/// Sub-face topology shared by every state of one run.
#[derive(Clone, Debug)]
pub struct PartModel {
    partition: Partition,
    thickness: Real,
    /// Per face: its region with the bend zones removed.
    plates: Vec<Vec<Polygon2>>,
    /// Per face: convex prisms of its plates.
    plate_bvhs: Vec<Bvh>,
}

impl PartModel {
    /// Build plates for `partition` given the bend-zone half-widths (`BA/2`)
    /// of the sequenced bends.
    pub fn new(
        partition: Partition,
        bends: &[&BendLine],
        half_allowances: &[Real],
        thickness: Real,
        eps: Real,
    ) -> EngineResult<Self> {
        let extend = cut_half_width(eps) * 10.0;
        let zones = bends
            .iter()
            .zip(half_allowances)
            .filter(|(_, half)| **half > cut_half_width(eps))
            .map(|(bend, half)| strip_around(&bend.segment(), *half, extend))
            .collect::<EngineResult<Vec<_>>>()?;

        let min_area = (100.0 * eps) * (100.0 * eps);
        let plates: Vec<Vec<Polygon2>> = partition
            .faces()
            .iter()
            .map(|face| {
                face.region
                    .difference_all(&zones, eps)
                    .into_iter()
                    .filter(|p| p.area() > min_area)
                    .collect()
            })
            .collect();
        let plate_bvhs = plates
            .iter()
            .map(|regions| {
                Bvh::build(
                    regions
                        .iter()
                        .flat_map(|r| plate_pieces(r, thickness, eps))
                        .collect(),
                )
            })
            .collect();

        Ok(Self {
            partition,
            thickness,
            plates,
            plate_bvhs,
        })
    }

    #[inline]
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    #[inline]
    pub fn face_count(&self) -> usize {
        self.partition.faces().len()
    }

    #[inline]
    pub fn thickness(&self) -> Real {
        self.thickness
    }

    /// Plate regions of a face (its region minus bend zones), in flat coordinates.
    pub fn plate_regions(&self, face: usize) -> &[Polygon2] {
        self.plates.get(face).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn plate_bvh(&self, face: usize) -> Option<&Bvh> {
        self.plate_bvhs.get(face)
    }

    /// Closed plate mesh of a face in flat coordinates.
    pub fn plate_mesh(&self, face: usize) -> Mesh {
        let triangles = self
            .plate_regions(face)
            .iter()
            .flat_map(|r| Mesh::extrude_plate(r, self.thickness).triangles)
            .collect();
        Mesh::from_triangles(triangles)
    }

    /// Plate corner points of a face (bottom and top), in flat coordinates.
    pub fn plate_vertices(&self, face: usize) -> impl Iterator<Item = Point3<Real>> + '_ {
        let t = self.thickness;
        self.plate_regions(face)
            .iter()
            .flat_map(|r| r.rings().flat_map(|ring| ring.points().iter()))
            .flat_map(move |p| [Point3::new(p.x, p.y, 0.0), Point3::new(p.x, p.y, t)])
    }

    /// Every face at the flat (unbent) pose.
    pub fn flat_poses(&self) -> Vec<Isometry3<Real>> {
        vec![Isometry3::identity(); self.face_count()]
    }
}

/// Bend frame of `bend` in flat-pattern coordinates, with +Y pointing to
/// the left of `start -> end` when `toward_left`, to the right otherwise.
pub fn bend_frame(bend: &BendLine, toward_left: bool) -> EngineResult<Isometry3<Real>> {
    let seg = bend.segment();
    let normal = seg
        .normal()
        .ok_or_else(|| EngineError::degenerate_at(format!("bend line '{}' has zero length", bend.id), bend.start))?;
    let y2 = if toward_left { normal } else { -normal };
    let y = Vector3::new(y2.x, y2.y, 0.0);
    let z = Vector3::z();
    let x = y.cross(&z);
    let rotation = Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[x, y, z]));
    let mid = seg.midpoint();
    Ok(Isometry3::from_parts(
        Translation3::new(mid.x, mid.y, 0.0),
        UnitQuaternion::from_rotation_matrix(&rotation),
    ))
}

/// Result of simulating a sequence.
///
/// `aborted` is `Some(SimulationAborted)` when a bend could not be folded;
/// `states` then holds every step completed before it.
#[derive(Clone, Debug)]
pub struct SimulationOutcome {
    pub model: PartModel,
    pub states: Vec<SimulatedState>,
    pub aborted: Option<EngineError>,
}

impl SimulationOutcome {
    /// Poses before step `step` (the flat pose for step 0).
    pub fn poses_before(&self, step: usize) -> Vec<Isometry3<Real>> {
        match step.checked_sub(1).and_then(|prev| self.states.get(prev)) {
            Some(state) => state.poses.clone(),
            None => self.model.flat_poses(),
        }
    }
}

pub struct BendSimulator<'a> {
    pattern: &'a FlatPattern,
    params: &'a MaterialParams,
    config: &'a EngineConfig,
}

impl<'a> BendSimulator<'a> {
    pub const fn new(pattern: &'a FlatPattern, params: &'a MaterialParams, config: &'a EngineConfig) -> Self {
        Self {
            pattern,
            params,
            config,
        }
    }

    /// Effective radius and allowance of a bend.
    pub fn bend_geometry(&self, bend: &BendLine) -> (Real, Real) {
        let radius = self.params.effective_radius(bend.radius);
        let ba = bend_allowance(bend.angle_deg, radius, self.params.k_factor, self.params.thickness);
        (radius, ba)
    }

    /// Simulate `sequence` step by step.
    ///
    /// Sequence and geometry errors are returned as `Err`; a bend that cannot
    /// be folded stops the simulation and is reported in
    /// [`SimulationOutcome::aborted`].
    #[instrument(skip_all, fields(pattern = %self.pattern.id, steps = sequence.len()))]
    pub fn simulate(&self, sequence: &BendSequence, cancel: &CancellationToken) -> EngineResult<SimulationOutcome> {
        let eps = self.config.epsilon;
        let t = self.params.thickness;
        let bends = sequence.resolve(self.pattern)?;
        let geometry: Vec<(Real, Real)> = bends.iter().map(|b| self.bend_geometry(b)).collect();
        let half_allowances: Vec<Real> = geometry.iter().map(|(_, ba)| ba / 2.0).collect();

        let partition = Partition::build(self.pattern, &bends, eps)?;
        let model = PartModel::new(partition, &bends, &half_allowances, t, eps)?;
        debug!(faces = model.face_count(), reference = model.partition().reference(), "partitioned flat pattern");

        let mut poses = model.flat_poses();
        let mut states = Vec::with_capacity(bends.len());
        let mut aborted = None;

        for (step, bend) in bends.iter().enumerate() {
            cancel.check()?;
            let (fixed, moving) = match model.partition().split(step) {
                Ok(split) => split,
                Err(err) => {
                    let reason = match err {
                        EngineError::InvalidBendTopology { reason, .. } => reason,
                        other => other.to_string(),
                    };
                    warn!(step, bend = %bend.id, %reason, "simulation aborted");
                    aborted = Some(EngineError::SimulationAborted {
                        step,
                        bend_id: bend.id.clone(),
                        reason,
                    });
                    break;
                },
            };

            let link = &model.partition().links()[step];
            let toward_left = link.positive.first().is_some_and(|p| moving.contains(p));
            let (radius, allowance) = geometry[step];
            let arc_z = if bend.angle_deg >= 0.0 { t + radius } else { -radius };
            let motion = BendMotion {
                bend_id: bend.id.clone(),
                fixed_face: fixed,
                moving_faces: moving,
                frame: poses[fixed] * bend_frame(bend, toward_left)?,
                angle_deg: bend.angle_deg,
                radius,
                neutral_radius: allowance::neutral_radius(radius, self.params.k_factor, t),
                allowance,
                arc_centre: Point3::new(0.0, -allowance / 2.0, arc_z),
            };

            let world = motion.world_transform(1.0);
            for &face in &motion.moving_faces {
                poses[face] = world * poses[face];
            }
            debug!(step, bend = %bend.id, fixed, moving = ?motion.moving_faces, angle = bend.angle_deg, "bend step");
            states.push(SimulatedState {
                step,
                bend_id: bend.id.clone(),
                poses: poses.clone(),
                motion,
            });
        }

        Ok(SimulationOutcome {
            model,
            states,
            aborted,
        })
    }
}
