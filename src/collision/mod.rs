//! Collision detection.
//!
//! Two independent checks share the [`CollisionResult`](crate::report::CollisionResult)
//! record type:
//! - [`sweep`]: forming tools against the part while each bend is swept,
//! - [`nest`]: parts against each other and against the sheet edge.

pub mod nest;
pub mod sweep;
pub mod tool;

pub use nest::{NestPlacement, SheetNest, check_nest};
pub use sweep::{PreparedTool, sweep_tooling};
pub use tool::{ToolKind, ToolMotion, ToolProfile};
