use crate::float_types::Real;
use nalgebra::{Matrix3, Rotation2, Translation2, Vector2};

/// Rigid transformations in the sheet plane.
///
/// Every 2D entity of the engine (segments, rings, polygons, whole flat
/// patterns) implements [`PlanarOps::transform`]; the remaining methods are
/// built on top of it. The matrix is a homogeneous 3x3 affine transform and is
/// expected to be rigid, since winding and areas are assumed to be preserved.
pub trait PlanarOps: Sized + Clone {
    fn transform(&self, matrix: &Matrix3<Real>) -> Self;

    /// Returns a new Self translated by vector.
    fn translate_vector(&self, vector: Vector2<Real>) -> Self {
        self.transform(&Translation2::from(vector).to_homogeneous())
    }

    /// Returns a new Self translated by x and y.
    fn translate(&self, x: Real, y: Real) -> Self {
        self.translate_vector(Vector2::new(x, y))
    }

    /// Nest placement: rotate about the origin by `rotation_deg`, then move to `(x, y)`.
    fn place(&self, x: Real, y: Real, rotation_deg: Real) -> Self {
        self.transform(&placement_matrix(x, y, rotation_deg))
    }
}

/// Homogeneous matrix of [`PlanarOps::place`].
pub fn placement_matrix(x: Real, y: Real, rotation_deg: Real) -> Matrix3<Real> {
    Translation2::new(x, y).to_homogeneous() * Rotation2::new(rotation_deg.to_radians()).to_homogeneous()
}
