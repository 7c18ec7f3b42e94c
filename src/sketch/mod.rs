//! 2D geometry in the sheet plane: segments, rings, polygons with holes and offsets.
//!
//! All coordinates are millimetres in the flat-pattern frame. Every query takes
//! the run's epsilon explicitly so one tolerance governs the whole engine.

pub mod offset;
pub mod polygon;
pub mod ring;
pub mod segment;

pub use offset::Corner;
pub use polygon::Polygon2;
pub use ring::{Containment, Ring, SelfIntersection};
pub use segment::Segment2;
