// Re-export parry for the f64 scalar used throughout the engine
pub use parry3d_f64 as parry3d;

// Our Real scalar type:
pub type Real = f64;

/// Default coincidence tolerance in millimetres.
///
/// This is only the *default* for [`crate::config::EngineConfig::epsilon`].
/// Every geometric decision in a validation run reads the configured value
/// from the run's config so one epsilon is shared by the whole engine.
pub const DEFAULT_EPSILON: Real = 1e-6;

// Pi
/// Archimedes' constant (π)
pub const PI: Real = core::f64::consts::PI;

// Tau
/// The full circle constant (τ)
pub const TAU: Real = core::f64::consts::TAU;

/// Total ordering helper for reals that sorts NaN last, used wherever the
/// engine needs a deterministic sort key.
#[inline]
pub fn cmp_real(a: Real, b: Real) -> core::cmp::Ordering {
    a.total_cmp(&b)
}
