//! Forming tools: rigid convex geometry in the bend frame plus a motion envelope.
//!
//! Tool geometry is given at the *end* of the stroke, in the bend frame of
//! the step it is used for (origin at the bend-line midpoint on the sheet's
//! bottom surface, +X along the bend, +Y toward the moving side, +Z up from
//! the fixed side). The same profile is reused for every step of a run.

use crate::errors::{EngineError, EngineResult};
use crate::float_types::Real;
use crate::mesh::{Bvh, ConvexPiece};
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    Punch,
    Die,
    Backgauge,
}

/// How a tool moves over one bend step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ToolMotion {
    Static,
    /// Moves `travel` along `direction` over the step, arriving at its
    /// modelled position at the end.
    Stroke { direction: Vector3<Real>, travel: Real },
}

impl ToolMotion {
    /// Offset from the end-of-stroke position at progress `s` in `[0, 1]`.
    pub fn offset(&self, s: Real) -> Vector3<Real> {
        match self {
            ToolMotion::Static => Vector3::zeros(),
            ToolMotion::Stroke { direction, travel } => match direction.try_normalize(0.0) {
                Some(dir) => -dir * (*travel * (1.0 - s)),
                None => Vector3::zeros(),
            },
        }
    }

    /// Total distance travelled over a step.
    pub fn travel(&self) -> Real {
        match self {
            ToolMotion::Static => 0.0,
            ToolMotion::Stroke { travel, .. } => *travel,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolProfile {
    pub id: String,
    pub kind: ToolKind,
    /// Convex pieces as point clouds; each is replaced by its convex hull.
    pub pieces: Vec<Vec<Point3<Real>>>,
    pub motion: ToolMotion,
}

impl ToolProfile {
    pub fn new(id: impl Into<String>, kind: ToolKind, motion: ToolMotion) -> Self {
        Self {
            id: id.into(),
            kind,
            pieces: Vec::new(),
            motion,
        }
    }

    pub fn with_piece(mut self, points: Vec<Point3<Real>>) -> Self {
        self.pieces.push(points);
        self
    }

    /// Axis-aligned box tool spanning `mins..maxs`.
    pub fn block(
        id: impl Into<String>,
        kind: ToolKind,
        mins: Point3<Real>,
        maxs: Point3<Real>,
        motion: ToolMotion,
    ) -> Self {
        Self::new(id, kind, motion).with_piece(box_corners(mins, maxs))
    }

    /// Straight punch of `length` along the bend: a wedge with its tip line at
    /// `(0, tip_y, tip_z)`, opening upward with `half_angle_deg` to `height`
    /// above the tip. It strokes straight down by `travel`.
    pub fn punch(
        id: impl Into<String>,
        length: Real,
        height: Real,
        half_angle_deg: Real,
        tip_y: Real,
        tip_z: Real,
        travel: Real,
    ) -> Self {
        let half_len = length / 2.0;
        let spread = height * half_angle_deg.to_radians().tan();
        let top = tip_z + height;
        let mut points = Vec::with_capacity(6);
        for x in [-half_len, half_len] {
            points.push(Point3::new(x, tip_y, tip_z));
            points.push(Point3::new(x, tip_y - spread, top));
            points.push(Point3::new(x, tip_y + spread, top));
        }
        Self::new(
            id,
            ToolKind::Punch,
            ToolMotion::Stroke {
                direction: -Vector3::z(),
                travel,
            },
        )
        .with_piece(points)
    }

    /// Static V-die of `length`: two shoulders `shoulder_width` wide either
    /// side of an `opening` centred under the bend, `depth` deep. The shoulder
    /// tops sit `standoff` below the sheet; with no standoff the flat sheet
    /// rests on them and reports zero clearance.
    pub fn die(
        id: impl Into<String>,
        length: Real,
        opening: Real,
        shoulder_width: Real,
        depth: Real,
        standoff: Real,
    ) -> Self {
        let half_len = length / 2.0;
        let inner = opening / 2.0;
        let outer = inner + shoulder_width;
        let top = -standoff;
        let bottom = top - depth;
        Self::new(id, ToolKind::Die, ToolMotion::Static)
            .with_piece(box_corners(
                Point3::new(-half_len, -outer, bottom),
                Point3::new(half_len, -inner, top),
            ))
            .with_piece(box_corners(
                Point3::new(-half_len, inner, bottom),
                Point3::new(half_len, outer, top),
            ))
    }

    /// Static backgauge finger: a block of `width` along the bend whose stop
    /// face sits at `y` (facing the bend), `depth` deep and `height` tall
    /// from the sheet's bottom surface.
    pub fn backgauge(id: impl Into<String>, y: Real, width: Real, depth: Real, height: Real) -> Self {
        let half = width / 2.0;
        let (y0, y1) = if y >= 0.0 { (y, y + depth) } else { (y - depth, y) };
        Self::block(
            id,
            ToolKind::Backgauge,
            Point3::new(-half, y0, 0.0),
            Point3::new(half, y1, height),
            ToolMotion::Static,
        )
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.id.is_empty() {
            return Err(EngineError::degenerate("tool id is empty"));
        }
        if self.pieces.is_empty() {
            return Err(EngineError::degenerate(format!("tool '{}' has no geometry", self.id)));
        }
        if let ToolMotion::Stroke { direction, travel } = &self.motion {
            if !(travel.is_finite() && *travel >= 0.0) {
                return Err(EngineError::degenerate(format!(
                    "tool '{}' has invalid stroke travel {travel}",
                    self.id
                )));
            }
            if !direction.iter().all(|c| c.is_finite()) || direction.norm() == 0.0 {
                return Err(EngineError::degenerate(format!(
                    "tool '{}' has a zero or non-finite stroke direction",
                    self.id
                )));
            }
        }
        Ok(())
    }

    /// Hierarchy over the tool's convex pieces, in the bend frame.
    pub fn bvh(&self) -> EngineResult<Bvh> {
        self.validate()?;
        let pieces = self
            .pieces
            .iter()
            .enumerate()
            .map(|(i, points)| {
                ConvexPiece::from_points(points).ok_or_else(|| {
                    EngineError::degenerate(format!("tool '{}' piece {i} is flat or degenerate", self.id))
                })
            })
            .collect::<EngineResult<Vec<_>>>()?;
        Ok(Bvh::build(pieces))
    }
}

fn box_corners(mins: Point3<Real>, maxs: Point3<Real>) -> Vec<Point3<Real>> {
    (0..8)
        .map(|i| {
            Point3::new(
                if i & 1 == 0 { mins.x } else { maxs.x },
                if i & 2 == 0 { mins.y } else { maxs.y },
                if i & 4 == 0 { mins.z } else { maxs.z },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stroke_offset() {
        let motion = ToolMotion::Stroke {
            direction: Vector3::new(0.0, 0.0, -2.0),
            travel: 10.0,
        };
        assert_eq!(motion.offset(0.0), Vector3::new(0.0, 0.0, 10.0));
        assert_eq!(motion.offset(1.0), Vector3::zeros());
        assert_eq!(ToolMotion::Static.offset(0.3), Vector3::zeros());
    }

    #[test]
    fn test_builders_produce_solid_pieces() {
        let punch = ToolProfile::punch("p", 100.0, 50.0, 15.0, 0.0, 2.0, 20.0);
        assert_eq!(punch.bvh().unwrap().pieces().len(), 1);
        let die = ToolProfile::die("d", 100.0, 12.0, 10.0, 20.0, 0.0);
        assert_eq!(die.bvh().unwrap().pieces().len(), 2);
        let gauge = ToolProfile::backgauge("g", -80.0, 20.0, 10.0, 30.0);
        let aabb = gauge.bvh().unwrap().local_aabb().unwrap();
        assert_eq!(aabb.maxs.y, -80.0);
    }

    #[test]
    fn test_flat_piece_rejected() {
        let tool = ToolProfile::block(
            "flat",
            ToolKind::Backgauge,
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            ToolMotion::Static,
        );
        assert!(matches!(tool.bvh(), Err(EngineError::DegenerateGeometry { .. })));
    }

    #[test]
    fn test_json_shape() {
        let tool = ToolProfile::backgauge("g", 50.0, 20.0, 10.0, 30.0);
        let json = serde_json::to_value(&tool).unwrap();
        assert_eq!(json["kind"], "backgauge");
        assert_eq!(json["motion"]["type"], "static");
    }
}
