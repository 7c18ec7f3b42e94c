//! Sub-face partition of a flat pattern and the bend adjacency graph.
//!
//! The pattern region is cut along every bend line of interest with a
//! narrow strip (half-width `10 * eps`, extended past both endpoints) using
//! `geo` boolean difference. The resulting components are the sub-faces,
//! numbered by ascending centroid x, then y, so ids are stable for identical
//! input. Each bend joins the faces found hugging its cut strip (extension
//! included) on either side.
//!
//! A bend is usable only when it has exactly one face on each side, does not
//! run through a hole, and is not on a cycle of the adjacency graph (a cycle
//! means the faces are also joined some other way and the bend cannot fold).
//! Problems are recorded per bend so the simulator can stop at the step that
//! first needs an unusable bend.

use crate::errors::{EngineError, EngineResult};
use crate::float_types::{Real, cmp_real};
use crate::pattern::{BendLine, FlatPattern};
use crate::sketch::{Containment, Polygon2, Ring, Segment2};
use nalgebra::Point2;
use std::collections::VecDeque;

/// One rigid flat region between bend lines.
#[derive(Clone, Debug, PartialEq)]
pub struct SubFace {
    pub index: usize,
    pub region: Polygon2,
    pub area: Real,
    pub centroid: Point2<Real>,
}

/// The faces one bend line joins.
///
/// `negative` and `positive` list the faces on the right and left of the
/// directed line `start -> end`. `problem` explains why the bend cannot be
/// folded, if it cannot.
#[derive(Clone, Debug, PartialEq)]
pub struct BendLink {
    pub bend_id: String,
    pub negative: Vec<usize>,
    pub positive: Vec<usize>,
    pub problem: Option<String>,
}

impl BendLink {
    /// `(negative, positive)` faces of a usable bend.
    pub fn sides(&self) -> EngineResult<(usize, usize)> {
        if let Some(reason) = &self.problem {
            return Err(EngineError::topology(&self.bend_id, reason.clone()));
        }
        match (self.negative.as_slice(), self.positive.as_slice()) {
            ([n], [p]) => Ok((*n, *p)),
            _ => Err(EngineError::topology(&self.bend_id, "bend does not join exactly one sub-face per side")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Partition {
    faces: Vec<SubFace>,
    links: Vec<BendLink>,
    /// (link index, face a, face b)
    edges: Vec<(usize, usize, usize)>,
    reference: usize,
}

/// Half-width of the cut strip laid along each bend.
#[inline]
pub fn cut_half_width(eps: Real) -> Real {
    eps * 10.0
}

/// Rectangle of half-width `half_width` around `segment`, extended by
/// `extend` past both ends.
pub fn strip_around(segment: &Segment2, half_width: Real, extend: Real) -> EngineResult<Polygon2> {
    let dir = segment
        .direction()
        .ok_or_else(|| EngineError::degenerate_at("zero-length strip axis", segment.a))?;
    let n = nalgebra::Vector2::new(-dir.y, dir.x) * half_width;
    let a = segment.a - dir * extend;
    let b = segment.b + dir * extend;
    Ok(Polygon2::from(Ring::new(vec![a - n, b - n, b + n, a + n])?))
}

/// Whether the open segment runs through the interior of `hole` somewhere
/// other than at its own ends (a bend may terminate in a relief hole).
fn crosses_hole(segment: &Segment2, hole: &Ring, eps: Real) -> bool {
    let len = segment.length();
    if len == 0.0 {
        return false;
    }
    let mut cuts = vec![0.0, len];
    for edge in hole.edges() {
        if let Some(p) = segment.intersection_point(&edge) {
            cuts.push(segment.along(&p).clamp(0.0, len));
        }
    }
    cuts.sort_by(|a, b| cmp_real(*a, *b));
    let dir = match segment.direction() {
        Some(d) => d,
        None => return false,
    };
    cuts.windows(2).any(|w| {
        let (lo, hi) = (w[0], w[1]);
        if hi - lo <= eps || lo <= eps || hi >= len - eps {
            return false;
        }
        let mid = segment.a + dir * ((lo + hi) * 0.5);
        hole.contains(&mid, eps) == Containment::Inside
    })
}

impl Partition {
    /// Partition `pattern` along `bends` (in the order given).
    ///
    /// Fails with `DegenerateGeometry` only if cutting leaves no material at
    /// all; every bend-level problem is recorded in its [`BendLink`].
    pub fn build(pattern: &FlatPattern, bends: &[&BendLine], eps: Real) -> EngineResult<Partition> {
        let region = pattern.region();
        let half = cut_half_width(eps);
        let extend = half * 10.0;
        let strips = bends
            .iter()
            .map(|b| strip_around(&b.segment(), half, extend))
            .collect::<EngineResult<Vec<_>>>()?;

        let min_area = (100.0 * eps) * (100.0 * eps);
        let mut regions: Vec<Polygon2> = region
            .difference_all(&strips, eps)
            .into_iter()
            .filter(|p| p.area() > min_area)
            .collect();
        if regions.is_empty() {
            return Err(EngineError::degenerate_at(
                "no material left after cutting along the bend lines",
                pattern.outer.points()[0],
            ));
        }
        regions.sort_by(|a, b| {
            let (ca, cb) = (a.centroid(), b.centroid());
            cmp_real(ca.x, cb.x).then(cmp_real(ca.y, cb.y))
        });
        let faces: Vec<SubFace> = regions
            .into_iter()
            .enumerate()
            .map(|(index, region)| SubFace {
                index,
                area: region.area(),
                centroid: region.centroid(),
                region,
            })
            .collect();

        // faces touching each cut, by side; the band follows the whole strip,
        // extension included, so a face notched by the strip end still counts
        let band = half * 4.0;
        let mut links: Vec<BendLink> = bends
            .iter()
            .map(|bend| {
                let seg = bend.segment();
                let axis = seg
                    .direction()
                    .map(|dir| Segment2::new(seg.a - dir * (extend + band), seg.b + dir * (extend + band)))
                    .unwrap_or(seg);
                let mut link = BendLink {
                    bend_id: bend.id.clone(),
                    negative: Vec::new(),
                    positive: Vec::new(),
                    problem: None,
                };
                for face in &faces {
                    let near: Vec<Real> = face
                        .region
                        .rings()
                        .flat_map(|r| r.points().iter())
                        .filter(|p| axis.distance_to_point(p) <= band)
                        .map(|p| axis.signed_distance(p))
                        .collect();
                    if near.is_empty() {
                        continue;
                    }
                    let mean = near.iter().sum::<Real>() / near.len() as Real;
                    if mean < 0.0 {
                        link.negative.push(face.index);
                    } else {
                        link.positive.push(face.index);
                    }
                }
                if let Some(hole) = pattern.holes.iter().find(|h| crosses_hole(&seg, &h.ring, eps)) {
                    link.problem = Some(format!("bend line crosses hole '{}'", hole.id));
                } else if link.negative.is_empty() || link.positive.is_empty() {
                    link.problem = Some("bend line does not separate the pattern".to_string());
                } else if link.negative.len() != 1 || link.positive.len() != 1 {
                    link.problem = Some(format!(
                        "bend line joins {} and {} sub-faces on its sides, expected exactly one each",
                        link.negative.len(),
                        link.positive.len()
                    ));
                }
                link
            })
            .collect();

        let mut edges = Vec::new();
        for (k, link) in links.iter().enumerate() {
            for &a in &link.negative {
                for &b in &link.positive {
                    edges.push((k, a, b));
                }
            }
        }

        let mut partition = Partition {
            faces,
            links: Vec::new(),
            edges,
            reference: 0,
        };
        for (k, link) in links.iter_mut().enumerate() {
            if link.problem.is_some() {
                continue;
            }
            let (a, b) = (link.negative[0], link.positive[0]);
            if partition.reachable(a, Some(k)).contains(&b) {
                link.problem = Some("bend line lies on a cycle of the sub-face adjacency graph".to_string());
            }
        }
        partition.links = links;
        partition.reference = partition.pick_reference(eps);
        Ok(partition)
    }

    /// Largest face; ties (within `eps`) go to the lowest centroid x, then y,
    /// which is the lowest index.
    fn pick_reference(&self, eps: Real) -> usize {
        let max_area = self.faces.iter().map(|f| f.area).fold(Real::NEG_INFINITY, Real::max);
        self.faces
            .iter()
            .find(|f| f.area >= max_area - eps)
            .map(|f| f.index)
            .unwrap_or(0)
    }

    #[inline]
    pub fn faces(&self) -> &[SubFace] {
        &self.faces
    }

    #[inline]
    pub fn links(&self) -> &[BendLink] {
        &self.links
    }

    #[inline]
    pub fn reference(&self) -> usize {
        self.reference
    }

    pub fn link(&self, bend_id: &str) -> Option<&BendLink> {
        self.links.iter().find(|l| l.bend_id == bend_id)
    }

    /// Faces reachable from `start`, optionally ignoring every edge of link `skip`.
    /// Sorted ascending.
    pub fn reachable(&self, start: usize, skip: Option<usize>) -> Vec<usize> {
        let mut seen = vec![false; self.faces.len()];
        let mut queue = VecDeque::from([start]);
        seen[start] = true;
        while let Some(face) = queue.pop_front() {
            for &(k, a, b) in &self.edges {
                if Some(k) == skip {
                    continue;
                }
                let next = if a == face {
                    b
                } else if b == face {
                    a
                } else {
                    continue;
                };
                if !seen[next] {
                    seen[next] = true;
                    queue.push_back(next);
                }
            }
        }
        seen.iter()
            .enumerate()
            .filter_map(|(i, s)| s.then_some(i))
            .collect()
    }

    /// `(fixed face, moving faces)` of link `k`: the moving side is the side
    /// not reachable from the reference face without crossing this bend.
    pub fn split(&self, k: usize) -> EngineResult<(usize, Vec<usize>)> {
        let (negative, positive) = self.links[k].sides()?;
        let from_reference = self.reachable(self.reference, Some(k));
        let (fixed, moving) = if from_reference.contains(&negative) {
            (negative, positive)
        } else if from_reference.contains(&positive) {
            (positive, negative)
        } else {
            // neither side is connected to the reference: the heavier side stays put
            let neg_area: Real = self.reachable(negative, Some(k)).iter().map(|&f| self.faces[f].area).sum();
            let pos_area: Real = self.reachable(positive, Some(k)).iter().map(|&f| self.faces[f].area).sum();
            if pos_area > neg_area {
                (positive, negative)
            } else {
                (negative, positive)
            }
        };
        Ok((fixed, self.reachable(moving, Some(k))))
    }

    /// Index of the face containing `p`, if any.
    pub fn face_at(&self, p: &Point2<Real>, eps: Real) -> Option<usize> {
        self.faces
            .iter()
            .find(|f| f.region.contains(p, eps) != Containment::Outside)
            .map(|f| f.index)
    }
}
