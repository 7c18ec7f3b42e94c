//! Engine errors

use crate::float_types::Real;
use nalgebra::Point2;

/// Everything that stops a validation run from producing a report.
///
/// These are *input* problems: the design could not be evaluated at all.
/// A design that was evaluated and violates rules is reported through a
/// `fail` verdict instead, never through this type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// (DegenerateGeometry) Malformed polygon input, fix upstream
    #[error("(DegenerateGeometry) {reason}{}", fmt_at(.at))]
    DegenerateGeometry {
        reason: String,
        at: Option<Point2<Real>>,
    },
    /// (UnknownMaterial) The catalog has no entry for this material
    #[error("(UnknownMaterial) no catalog entry for material '{0}'")]
    UnknownMaterial(String),
    /// (UnsupportedThicknessRange) The material exists but not at this thickness
    #[error("(UnsupportedThicknessRange) material '{material}' has no data for thickness {thickness} mm")]
    UnsupportedThicknessRange { material: String, thickness: Real },
    /// (UnknownProcess) The catalog has no entry for this cutting process
    #[error("(UnknownProcess) no catalog entry for process '{0}'")]
    UnknownProcess(String),
    /// (MaterialMismatch) Resolved parameters do not describe the pattern being validated
    #[error("(MaterialMismatch) {0}")]
    MaterialMismatch(String),
    /// (InvalidBendTopology) A bend line is inconsistent with the pattern
    #[error("(InvalidBendTopology) bend '{bend_id}': {reason}")]
    InvalidBendTopology { bend_id: String, reason: String },
    /// (SimulationAborted) The simulator stopped at `step`
    #[error("(SimulationAborted) step {step} (bend '{bend_id}'): {reason}")]
    SimulationAborted {
        step: usize,
        bend_id: String,
        reason: String,
    },
    /// (InvalidConfig) A configuration value is out of range
    #[error("(InvalidConfig) {0}")]
    InvalidConfig(String),
    /// (Catalog) A catalog document could not be read
    #[error("(Catalog) {0}")]
    Catalog(String),
    /// (Serialization) Inputs or the report could not be encoded
    #[error("(Serialization) {0}")]
    Serialization(String),
    /// (Cancelled) The run was cancelled; no partial report exists
    #[error("(Cancelled) validation run was cancelled")]
    Cancelled,
}

fn fmt_at(at: &Option<Point2<Real>>) -> String {
    match at {
        Some(p) => format!(" at: ({}, {})", p.x, p.y),
        None => String::new(),
    }
}

impl EngineError {
    pub fn degenerate(reason: impl Into<String>) -> Self {
        EngineError::DegenerateGeometry {
            reason: reason.into(),
            at: None,
        }
    }

    pub fn degenerate_at(reason: impl Into<String>, at: Point2<Real>) -> Self {
        EngineError::DegenerateGeometry {
            reason: reason.into(),
            at: Some(at),
        }
    }

    pub fn topology(bend_id: impl Into<String>, reason: impl Into<String>) -> Self {
        EngineError::InvalidBendTopology {
            bend_id: bend_id.into(),
            reason: reason.into(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
