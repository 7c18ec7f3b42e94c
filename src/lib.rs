//! Design-for-manufacturability validation and collision detection for
//! **sheet-metal flat patterns**.
//!
//! Given a flat pattern (outer boundary, holes, bend lines), resolved
//! material/process parameters, a bend sequence, forming tool profiles and an
//! optional sheet nest, the engine produces a [`ValidationReport`] with a
//! `pass`/`warn`/`fail` verdict:
//! - the [bend simulator](bend) folds the pattern step by step,
//! - the [rule engine](rules) checks radii, flanges, reliefs, hole spacing,
//!   kerf limits, grain and tolerances,
//! - the [collision detectors](collision) sweep every bend against every tool
//!   and check the nest for overlaps.
//!
//! Identical inputs always give byte-identical reports.
//!
//! # Features
//! #### Default
//! - **parallel**: use rayon for rules, tool sweeps and nest pairs
//!
//! ```no_run
//! use sheetdfm::{BendLine, BendSequence, FlatPattern, MaterialCatalog, Ring};
//! use std::sync::Arc;
//! use nalgebra::Point2;
//!
//! let pattern = FlatPattern::new("bracket", Ring::rectangle(0.0, 0.0, 80.0, 60.0)?, "mild-steel", 1.5, "laser")
//!     .with_bend(BendLine::new("b1", Point2::new(0.0, 40.0), Point2::new(80.0, 40.0), 90.0));
//! let params = Arc::new(MaterialCatalog::builtin().lookup("mild-steel", 1.5, "laser")?);
//! let report = sheetdfm::validate(&pattern, &params, &BendSequence::all(&pattern), &[], None)?;
//! println!("{}", report.to_json_pretty()?);
//! # Ok::<(), sheetdfm::EngineError>(())
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod aabb;
pub mod bend;
pub mod collision;
pub mod config;
pub mod engine;
pub mod errors;
pub mod float_types;
pub mod material;
pub mod mesh;
pub mod pattern;
pub mod report;
pub mod rules;
pub mod sketch;
pub mod traits;

pub use bend::{BendSimulator, PartModel, SimulatedState, SimulationOutcome};
pub use collision::{NestPlacement, SheetNest, ToolKind, ToolMotion, ToolProfile};
pub use config::EngineConfig;
pub use engine::{CancellationToken, Engine, validate};
pub use errors::{EngineError, EngineResult};
pub use material::{FeatureKind, MaterialCatalog, MaterialParams};
pub use pattern::{BendLine, BendSequence, FlatPattern, Hole, ToleranceSpec};
pub use report::{
    CollisionResult, CollisionSubject, GeometryRef, RuleResult, Severity, ValidationReport, Verdict,
};
pub use rules::RuleKind;
pub use sketch::{Polygon2, Ring};
pub use traits::PlanarOps;
