//! 2D nest checks: part-to-part overlap and sheet bounds.
//!
//! The broad phase compares bounding boxes (grown by the required spacing).
//! Up to `nest_index_threshold` placements it tests every pair directly,
//! above that it queries an `rstar` R-tree. Surviving pairs go to the exact
//! `geo` intersection predicate, and overlapping pairs are measured by the
//! largest minimum width of their intersection.

use crate::aabb::Aabb2;
use crate::config::EngineConfig;
use crate::engine::CancellationToken;
use crate::errors::{EngineError, EngineResult};
use crate::float_types::Real;
use crate::pattern::FlatPattern;
use crate::report::{CollisionResult, CollisionSubject, GeometryRef, Severity};
use crate::sketch::Polygon2;
use crate::traits::PlanarOps;
use hashbrown::HashSet;
use rstar::{AABB, RTree, RTreeObject};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One part placed on the sheet: rotated about its own origin, then moved to `(x, y)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NestPlacement {
    pub part_id: String,
    pub pattern: FlatPattern,
    pub x: Real,
    pub y: Real,
    #[serde(default)]
    pub rotation_deg: Real,
}

impl NestPlacement {
    pub fn new(part_id: impl Into<String>, pattern: FlatPattern, x: Real, y: Real, rotation_deg: Real) -> Self {
        Self {
            part_id: part_id.into(),
            pattern,
            x,
            y,
            rotation_deg,
        }
    }

    /// Material region in sheet coordinates.
    pub fn region(&self) -> Polygon2 {
        self.pattern.region().place(self.x, self.y, self.rotation_deg)
    }
}

/// Placements on a rectangular sheet spanning `[0, width] x [0, height]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SheetNest {
    pub width: Real,
    pub height: Real,
    #[serde(default)]
    pub placements: Vec<NestPlacement>,
}

impl SheetNest {
    pub fn new(width: Real, height: Real) -> Self {
        Self {
            width,
            height,
            placements: Vec::new(),
        }
    }

    pub fn with_placement(mut self, placement: NestPlacement) -> Self {
        self.placements.push(placement);
        self
    }

    pub fn validate(&self, eps: Real) -> EngineResult<()> {
        if !(self.width.is_finite() && self.height.is_finite() && self.width > eps && self.height > eps) {
            return Err(EngineError::degenerate(format!(
                "sheet must have positive size, got {} x {}",
                self.width, self.height
            )));
        }
        let mut ids = HashSet::new();
        for placement in &self.placements {
            if !ids.insert(placement.part_id.as_str()) {
                return Err(EngineError::degenerate(format!(
                    "duplicate nest part id '{}'",
                    placement.part_id
                )));
            }
            if ![placement.x, placement.y, placement.rotation_deg].iter().all(|v| v.is_finite()) {
                return Err(EngineError::degenerate(format!(
                    "placement of '{}' is not finite",
                    placement.part_id
                )));
            }
            placement.pattern.region().validate(eps)?;
        }
        Ok(())
    }
}

/// Placement bounding box in the R-tree.
struct Placed {
    index: usize,
    envelope: AABB<[Real; 2]>,
}

impl RTreeObject for Placed {
    type Envelope = AABB<[Real; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Candidate pairs `(i, j)`, `i < j`, whose boxes come within `margin`, sorted.
pub fn candidate_pairs(boxes: &[Aabb2], margin: Real, threshold: usize) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    if boxes.len() <= threshold {
        for i in 0..boxes.len() {
            for j in (i + 1)..boxes.len() {
                if boxes[i].expanded(margin).intersects(&boxes[j]) {
                    pairs.push((i, j));
                }
            }
        }
        return pairs;
    }

    let tree = RTree::bulk_load(
        boxes
            .iter()
            .enumerate()
            .map(|(index, b)| {
                let (lo, hi) = b.corners();
                Placed {
                    index,
                    envelope: AABB::from_corners(lo, hi),
                }
            })
            .collect(),
    );
    for (i, b) in boxes.iter().enumerate() {
        let (lo, hi) = b.expanded(margin).corners();
        for neighbor in tree.locate_in_envelope_intersecting(&AABB::from_corners(lo, hi)) {
            if neighbor.index > i {
                pairs.push((i, neighbor.index));
            }
        }
    }
    pairs.sort_unstable();
    pairs
}

/// Narrow phase for one candidate pair; `None` when they are far enough apart.
fn check_pair(
    nest: &SheetNest,
    regions: &[Polygon2],
    (i, j): (usize, usize),
    config: &EngineConfig,
) -> Option<CollisionResult> {
    let eps = config.epsilon;
    let (a, b) = (&regions[i], &regions[j]);
    let (id_a, id_b) = (&nest.placements[i].part_id, &nest.placements[j].part_id);
    let subject = CollisionSubject::PartPair {
        part_a: id_a.clone(),
        part_b: id_b.clone(),
    };
    let parts = [
        GeometryRef::Part { id: id_a.clone() },
        GeometryRef::Part { id: id_b.clone() },
    ];

    if a.intersects(b) {
        let overlap = a
            .intersection(b, eps)
            .into_iter()
            .filter(|c| c.area() > eps * eps)
            .map(|c| (c.outer().min_width(), c.centroid()))
            .max_by(|x, y| x.0.total_cmp(&y.0));
        if let Some((depth, at)) = overlap.filter(|(depth, _)| *depth > eps) {
            return Some(CollisionResult {
                subject,
                collided: true,
                min_clearance: Some(-depth),
                severity: Severity::Error,
                message: format!("parts '{id_a}' and '{id_b}' overlap by {depth:.3} mm"),
                references: parts.into_iter().chain([GeometryRef::point(&at)]).collect(),
            });
        }
    }

    let (gap, at) = a.closest_approach(b);
    if gap < config.nest_min_spacing - eps {
        return Some(CollisionResult {
            subject,
            collided: false,
            min_clearance: Some(gap),
            severity: Severity::Warning,
            message: format!(
                "parts '{id_a}' and '{id_b}' are {gap:.3} mm apart, under the required spacing of {:.3} mm",
                config.nest_min_spacing
            ),
            references: parts.into_iter().chain([GeometryRef::point(&at)]).collect(),
        });
    }
    None
}

fn check_bounds(nest: &SheetNest, index: usize, bounds: &Aabb2, eps: Real) -> Option<CollisionResult> {
    let exceed = [
        -bounds.mins.x,
        -bounds.mins.y,
        bounds.maxs.x - nest.width,
        bounds.maxs.y - nest.height,
    ]
    .into_iter()
    .fold(0.0, Real::max);
    if exceed <= eps {
        return None;
    }
    let id = &nest.placements[index].part_id;
    let clamped = nalgebra::Point2::new(
        bounds.center().x.clamp(0.0, nest.width),
        bounds.center().y.clamp(0.0, nest.height),
    );
    Some(CollisionResult {
        subject: CollisionSubject::SheetBounds { part: id.clone() },
        collided: true,
        min_clearance: Some(-exceed),
        severity: Severity::Error,
        message: format!(
            "part '{id}' extends {exceed:.3} mm outside the {} x {} sheet",
            nest.width, nest.height
        ),
        references: vec![GeometryRef::Part { id: id.clone() }, GeometryRef::point(&clamped)],
    })
}

/// Check a nest: overlapping or too-close pairs (in pair order), then
/// placements leaving the sheet (in placement order).
///
/// Cancellation is checked before each candidate pair.
pub fn check_nest(
    nest: &SheetNest,
    config: &EngineConfig,
    cancel: &CancellationToken,
) -> EngineResult<Vec<CollisionResult>> {
    let eps = config.epsilon;
    nest.validate(eps)?;
    let regions: Vec<Polygon2> = nest.placements.iter().map(NestPlacement::region).collect();
    let boxes: Vec<Aabb2> = regions.iter().map(Polygon2::bounding_box).collect();
    let pairs = candidate_pairs(&boxes, config.nest_min_spacing, config.nest_index_threshold);
    debug!(placements = regions.len(), candidates = pairs.len(), "nest broad phase");

    #[cfg(feature = "parallel")]
    let pair_results = pairs
        .par_iter()
        .map(|pair| {
            cancel.check()?;
            Ok(check_pair(nest, &regions, *pair, config))
        })
        .collect::<EngineResult<Vec<_>>>()?;
    #[cfg(not(feature = "parallel"))]
    let pair_results = pairs
        .iter()
        .map(|pair| {
            cancel.check()?;
            Ok(check_pair(nest, &regions, *pair, config))
        })
        .collect::<EngineResult<Vec<_>>>()?;
    cancel.check()?;

    Ok(pair_results
        .into_iter()
        .flatten()
        .chain(
            boxes
                .iter()
                .enumerate()
                .filter_map(|(i, b)| check_bounds(nest, i, b, eps)),
        )
        .collect())
}
