//! The flat pattern: a 2D part before forming, with its bend lines, holes,
//! declared grain and tolerances, plus the bend sequence that forms it.

use crate::errors::{EngineError, EngineResult};
use crate::float_types::Real;
use crate::material::FeatureKind;
use crate::report::GeometryRef;
use crate::sketch::{Containment, Polygon2, Ring, Segment2};
use crate::traits::PlanarOps;
use hashbrown::HashSet;
use nalgebra::{Matrix3, Point2};
use serde::{Deserialize, Serialize};

pub mod partition;

pub use partition::{BendLink, Partition, SubFace};

/// A straight bend line on the flat pattern.
///
/// A positive angle bends the moving flange toward +Z. `radius` is the
/// inside bend radius; `None` means unassigned, in which case the material
/// minimum is used.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BendLine {
    pub id: String,
    pub start: Point2<Real>,
    pub end: Point2<Real>,
    pub angle_deg: Real,
    #[serde(default)]
    pub radius: Option<Real>,
}

impl BendLine {
    pub fn new(id: impl Into<String>, start: Point2<Real>, end: Point2<Real>, angle_deg: Real) -> Self {
        Self {
            id: id.into(),
            start,
            end,
            angle_deg,
            radius: None,
        }
    }

    pub fn with_radius(mut self, radius: Real) -> Self {
        self.radius = Some(radius);
        self
    }

    #[inline]
    pub fn segment(&self) -> Segment2 {
        Segment2::new(self.start, self.end)
    }

    #[inline]
    pub fn length(&self) -> Real {
        self.segment().length()
    }

    /// Direction of the line in degrees from +X, folded into `[0, 180)`.
    pub fn direction_deg(&self) -> Real {
        let d = self.end - self.start;
        d.y.atan2(d.x).to_degrees().rem_euclid(180.0)
    }
}

/// An interior cut-out (hole or slot) with a stable id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hole {
    pub id: String,
    pub ring: Ring,
}

impl Hole {
    pub fn new(id: impl Into<String>, ring: Ring) -> Self {
        Self { id: id.into(), ring }
    }
}

/// A declared symmetric tolerance on one feature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToleranceSpec {
    pub id: String,
    pub kind: FeatureKind,
    pub feature: GeometryRef,
    /// ± value, in mm or degrees depending on `kind`
    pub tolerance: Real,
}

/// The part before forming.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlatPattern {
    pub id: String,
    pub outer: Ring,
    #[serde(default)]
    pub holes: Vec<Hole>,
    pub material: String,
    pub thickness: Real,
    pub process: String,
    #[serde(default)]
    pub bend_lines: Vec<BendLine>,
    /// Rolling direction in degrees from +X, if declared.
    #[serde(default)]
    pub grain_direction_deg: Option<Real>,
    #[serde(default)]
    pub tolerances: Vec<ToleranceSpec>,
}

impl FlatPattern {
    pub fn new(
        id: impl Into<String>,
        outer: Ring,
        material: impl Into<String>,
        thickness: Real,
        process: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            outer,
            holes: Vec::new(),
            material: material.into(),
            thickness,
            process: process.into(),
            bend_lines: Vec::new(),
            grain_direction_deg: None,
            tolerances: Vec::new(),
        }
    }

    pub fn with_hole(mut self, hole: Hole) -> Self {
        self.holes.push(hole);
        self
    }

    pub fn with_bend(mut self, bend: BendLine) -> Self {
        self.bend_lines.push(bend);
        self
    }

    pub fn with_grain(mut self, direction_deg: Real) -> Self {
        self.grain_direction_deg = Some(direction_deg);
        self
    }

    pub fn with_tolerance(mut self, tolerance: ToleranceSpec) -> Self {
        self.tolerances.push(tolerance);
        self
    }

    /// Material region: outer ring with every hole removed.
    pub fn region(&self) -> Polygon2 {
        Polygon2::new(
            self.outer.clone(),
            self.holes.iter().map(|h| h.ring.clone()).collect(),
        )
    }

    pub fn bend(&self, id: &str) -> Option<&BendLine> {
        self.bend_lines.iter().find(|b| b.id == id)
    }

    /// Whether no boundary ring crosses itself.
    pub fn has_simple_rings(&self) -> bool {
        self.outer.self_intersections().is_empty()
            && self.holes.iter().all(|h| h.ring.self_intersections().is_empty())
    }

    pub fn hole(&self, id: &str) -> Option<&Hole> {
        self.holes.iter().find(|h| h.id == id)
    }

    /// Input checks that make a pattern impossible to evaluate.
    ///
    /// Self-intersecting rings are *not* rejected here: that is a DFM finding
    /// reported by the rule engine.
    pub fn validate(&self, eps: Real) -> EngineResult<()> {
        if self.id.is_empty() {
            return Err(EngineError::degenerate("pattern id is empty"));
        }
        if !(self.thickness.is_finite() && self.thickness > 0.0) {
            return Err(EngineError::degenerate(format!(
                "thickness must be positive and finite, got {}",
                self.thickness
            )));
        }
        self.outer.validate(eps)?;

        let mut hole_ids = HashSet::new();
        for hole in &self.holes {
            if !hole_ids.insert(hole.id.as_str()) {
                return Err(EngineError::degenerate(format!("duplicate hole id '{}'", hole.id)));
            }
            hole.ring.validate(eps)?;
            if let Some(p) = hole
                .ring
                .points()
                .iter()
                .find(|p| self.outer.contains(p, eps) == Containment::Outside)
            {
                return Err(EngineError::degenerate_at(
                    format!("hole '{}' extends outside the outer boundary", hole.id),
                    *p,
                ));
            }
        }

        let hull = Ring::new(self.outer.convex_hull())?;
        let mut bend_ids = HashSet::new();
        for bend in &self.bend_lines {
            if !bend_ids.insert(bend.id.as_str()) {
                return Err(EngineError::topology(&bend.id, "duplicate bend line id"));
            }
            if !(bend.start.coords.iter().chain(bend.end.coords.iter()).all(|c| c.is_finite())) {
                return Err(EngineError::degenerate_at("non-finite bend line endpoint", bend.start));
            }
            if bend.length() <= eps {
                return Err(EngineError::degenerate_at(
                    format!("bend line '{}' has zero length", bend.id),
                    bend.start,
                ));
            }
            for p in [bend.start, bend.end] {
                if hull.contains(&p, eps) == Containment::Outside {
                    return Err(EngineError::topology(
                        &bend.id,
                        format!("endpoint ({}, {}) lies outside the pattern's convex hull", p.x, p.y),
                    ));
                }
            }
            if !(bend.angle_deg.is_finite() && bend.angle_deg.abs() <= 180.0) {
                return Err(EngineError::topology(
                    &bend.id,
                    format!("bend angle must lie in [-180, 180], got {}", bend.angle_deg),
                ));
            }
            if let Some(r) = bend.radius {
                if !(r.is_finite() && r > 0.0) {
                    return Err(EngineError::topology(
                        &bend.id,
                        format!("assigned radius must be positive and finite, got {r}"),
                    ));
                }
            }
        }

        let mut tolerance_ids = HashSet::new();
        for tol in &self.tolerances {
            if !tolerance_ids.insert(tol.id.as_str()) {
                return Err(EngineError::degenerate(format!("duplicate tolerance id '{}'", tol.id)));
            }
            if !(tol.tolerance.is_finite() && tol.tolerance > 0.0) {
                return Err(EngineError::degenerate(format!(
                    "tolerance '{}' must be positive, got {}",
                    tol.id, tol.tolerance
                )));
            }
        }
        Ok(())
    }
}

impl PlanarOps for FlatPattern {
    fn transform(&self, matrix: &Matrix3<Real>) -> Self {
        let rotation_deg = matrix[(1, 0)].atan2(matrix[(0, 0)]).to_degrees();
        FlatPattern {
            id: self.id.clone(),
            outer: self.outer.transform(matrix),
            holes: self
                .holes
                .iter()
                .map(|h| Hole::new(h.id.clone(), h.ring.transform(matrix)))
                .collect(),
            material: self.material.clone(),
            thickness: self.thickness,
            process: self.process.clone(),
            bend_lines: self
                .bend_lines
                .iter()
                .map(|b| BendLine {
                    start: matrix.transform_point(&b.start),
                    end: matrix.transform_point(&b.end),
                    ..b.clone()
                })
                .collect(),
            grain_direction_deg: self.grain_direction_deg.map(|g| (g + rotation_deg).rem_euclid(360.0)),
            tolerances: self.tolerances.clone(),
        }
    }
}

/// Ordered bend-line ids; a permutation of (possibly a subset of) the
/// pattern's bend lines.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BendSequence {
    pub steps: Vec<String>,
}

impl BendSequence {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            steps: ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Every bend line of `pattern`, in declaration order.
    pub fn all(pattern: &FlatPattern) -> Self {
        Self::new(pattern.bend_lines.iter().map(|b| b.id.clone()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Resolve ids against `pattern`; unknown or repeated ids are topology errors.
    pub fn resolve<'a>(&self, pattern: &'a FlatPattern) -> EngineResult<Vec<&'a BendLine>> {
        let mut seen = HashSet::new();
        self.steps
            .iter()
            .map(|id| {
                if !seen.insert(id.as_str()) {
                    return Err(EngineError::topology(id, "appears more than once in the bend sequence"));
                }
                pattern
                    .bend(id)
                    .ok_or_else(|| EngineError::topology(id, "not found in the flat pattern"))
            })
            .collect()
    }
}
