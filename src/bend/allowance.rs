//! **Mathematical Foundation: Bend Allowance**
//!
//! During bending the inner fibres compress and the outer fibres stretch; the
//! neutral layer, at `K * t` from the inside surface, keeps its length. Its
//! radius is `R + K*t`, so the flat length consumed by a bend of `θ` degrees is
//! ```text
//! BA = (π/180) · |θ| · (R + K·t)
//! ```
//! The outside setback measures from the tangent points to the virtual sharp
//! (mold-line intersection), and the bend deduction relates flange mold-line
//! dimensions to flat length:
//! ```text
//! OSSB = tan(|θ|/2) · (R + t)
//! BD   = 2 · OSSB − BA
//! ```

use crate::float_types::{PI, Real};

/// Neutral-axis radius `R + K*t`.
#[inline]
pub fn neutral_radius(radius: Real, k_factor: Real, thickness: Real) -> Real {
    radius + k_factor * thickness
}

/// Arc length of the neutral layer for a bend of `angle_deg`.
#[inline]
pub fn bend_allowance(angle_deg: Real, radius: Real, k_factor: Real, thickness: Real) -> Real {
    (PI / 180.0) * angle_deg.abs() * neutral_radius(radius, k_factor, thickness)
}

/// Distance from each tangent point to the virtual sharp along the outside mold line.
#[inline]
pub fn outside_setback(angle_deg: Real, radius: Real, thickness: Real) -> Real {
    (angle_deg.abs().to_radians() / 2.0).tan() * (radius + thickness)
}

#[inline]
pub fn bend_deduction(angle_deg: Real, radius: Real, k_factor: Real, thickness: Real) -> Real {
    2.0 * outside_setback(angle_deg, radius, thickness) - bend_allowance(angle_deg, radius, k_factor, thickness)
}

/// Flat blank length of a part given its outside mold-line flange dimensions
/// and the `(angle_deg, radius)` of each bend between consecutive flanges.
pub fn flat_length(flanges: &[Real], bends: &[(Real, Real)], k_factor: Real, thickness: Real) -> Real {
    flanges.iter().sum::<Real>()
        - bends
            .iter()
            .map(|&(angle, radius)| bend_deduction(angle, radius, k_factor, thickness))
            .sum::<Real>()
}

/// Straight-line distance between the ends of the neutral arc.
#[inline]
pub fn neutral_chord(angle_deg: Real, radius: Real, k_factor: Real, thickness: Real) -> Real {
    2.0 * neutral_radius(radius, k_factor, thickness) * (angle_deg.abs().to_radians() / 2.0).sin()
}

/// Recover the bend allowance from a measured neutral chord and the formed
/// angle (inverse of [`neutral_chord`]). `None` for a zero or straight angle
/// where the chord does not determine the arc.
pub fn allowance_from_chord(chord: Real, angle_deg: Real) -> Option<Real> {
    let half = angle_deg.abs().to_radians() / 2.0;
    let s = half.sin();
    if s <= Real::EPSILON || !chord.is_finite() || chord < 0.0 {
        return None;
    }
    let radius = chord / (2.0 * s);
    Some(radius * 2.0 * half)
}
