//! Per-step snapshots produced by the bend simulator.

use crate::bend::PartModel;
use crate::float_types::Real;
use crate::mesh::Mesh;
use nalgebra::{Isometry3, Point3, Vector3};

/// How one bend step moves the part.
///
/// All motion is expressed in the *bend frame*: origin at the bend line
/// midpoint on the bottom surface, +X along the bend line, +Y across the bend
/// toward the moving side, +Z along the sheet normal of the fixed side.
#[derive(Clone, Debug, PartialEq)]
pub struct BendMotion {
    pub bend_id: String,
    pub fixed_face: usize,
    /// Faces carried by this bend, ascending.
    pub moving_faces: Vec<usize>,
    /// Bend frame in world coordinates at the start of the step.
    pub frame: Isometry3<Real>,
    pub angle_deg: Real,
    /// Effective inside radius.
    pub radius: Real,
    /// `R + K*t`
    pub neutral_radius: Real,
    /// Flat length consumed by the bend.
    pub allowance: Real,
    /// Rotation axis point in bend-frame coordinates; the axis runs along +X.
    pub arc_centre: Point3<Real>,
}

impl BendMotion {
    /// Rigid motion of the moving side at progress `s` in `[0, 1]`, in bend-frame
    /// coordinates.
    ///
    /// The moving flange is pulled back across the bend by the partial
    /// allowance `|φ|(R + K t)` and rotated by `φ = s θ` about the arc centre,
    /// so its inner edge stays tangent to the partially formed arc.
    pub fn local_transform(&self, s: Real) -> Isometry3<Real> {
        let phi = self.angle_deg.to_radians() * s;
        let pulled_back = phi.abs() * self.neutral_radius;
        let c = self.arc_centre.coords;
        Isometry3::translation(c.x, c.y, c.z)
            * Isometry3::rotation(Vector3::x() * phi)
            * Isometry3::translation(-c.x, -c.y - pulled_back, -c.z)
    }

    /// World-space motion of the moving side at progress `s`.
    pub fn world_transform(&self, s: Real) -> Isometry3<Real> {
        self.frame * self.local_transform(s) * self.frame.inverse()
    }

    #[inline]
    pub fn is_noop(&self) -> bool {
        self.angle_deg == 0.0
    }
}

/// The part after one bend step: a pose per sub-face plus the motion that
/// produced it. Topology lives in the shared [`PartModel`].
#[derive(Clone, Debug, PartialEq)]
pub struct SimulatedState {
    pub step: usize,
    pub bend_id: String,
    /// Pose of every sub-face, indexed by sub-face id.
    pub poses: Vec<Isometry3<Real>>,
    pub motion: BendMotion,
}

impl SimulatedState {
    #[inline]
    pub fn pose(&self, face: usize) -> Option<&Isometry3<Real>> {
        self.poses.get(face)
    }

    /// Pose of a moving face at progress `s`, given the poses before this step.
    pub fn pose_at(&self, before: &[Isometry3<Real>], face: usize, s: Real) -> Isometry3<Real> {
        self.motion.world_transform(s) * before[face]
    }

    /// World-space plate mesh of a sub-face in this state, built on demand.
    pub fn face_mesh(&self, model: &PartModel, face: usize) -> Mesh {
        match self.poses.get(face) {
            Some(pose) => model.plate_mesh(face).transform(pose),
            None => Mesh::new(),
        }
    }
}
