//! Bounding-volume hierarchy over convex pieces.
//!
//! Trees are built once per plate/tool in the owner's local frame. A query
//! places both trees with a rigid pose, transforms every node box into world
//! space and descends pairs of nodes, pruning a pair whose box gap is
//! positive and no better than the best exact distance found so far.

use crate::errors::{EngineError, EngineResult};
use crate::float_types::{
    Real,
    parry3d::{
        bounding_volume::{Aabb, BoundingVolume},
        query::{self, ClosestPoints},
    },
};
use crate::mesh::ConvexPiece;
use nalgebra::{Isometry3, Point3};

#[derive(Clone, Debug)]
enum BvhNode {
    Leaf { aabb: Aabb, piece: usize },
    Internal { aabb: Aabb, left: usize, right: usize },
}

impl BvhNode {
    #[inline]
    fn aabb(&self) -> &Aabb {
        match self {
            BvhNode::Leaf { aabb, .. } | BvhNode::Internal { aabb, .. } => aabb,
        }
    }
}

/// Closest approach of two placed trees.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Proximity {
    /// Signed distance; negative is penetration depth.
    pub distance: Real,
    /// World-space midpoint of the witness points.
    pub point: Point3<Real>,
}

#[derive(Clone, Debug, Default)]
pub struct Bvh {
    pieces: Vec<ConvexPiece>,
    nodes: Vec<BvhNode>,
    root: Option<usize>,
}

impl Bvh {
    /// Median split on the longest axis of the piece-centre bounds.
    pub fn build(pieces: Vec<ConvexPiece>) -> Bvh {
        let mut bvh = Bvh {
            pieces,
            nodes: Vec::new(),
            root: None,
        };
        if !bvh.pieces.is_empty() {
            let mut order: Vec<usize> = (0..bvh.pieces.len()).collect();
            let root = bvh.build_node(&mut order);
            bvh.root = Some(root);
        }
        bvh
    }

    fn build_node(&mut self, items: &mut [usize]) -> usize {
        if let [piece] = items {
            let piece = *piece;
            self.nodes.push(BvhNode::Leaf {
                aabb: self.pieces[piece].local_aabb,
                piece,
            });
            return self.nodes.len() - 1;
        }

        let centre = |i: usize| self.pieces[i].local_aabb.center();
        let mut mins = centre(items[0]);
        let mut maxs = mins;
        for &i in items.iter() {
            let c = centre(i);
            mins = mins.inf(&c);
            maxs = maxs.sup(&c);
        }
        let extent = maxs - mins;
        let axis = if extent.x >= extent.y && extent.x >= extent.z {
            0
        } else if extent.y >= extent.z {
            1
        } else {
            2
        };
        // stable sort keeps the build deterministic for equal centres
        items.sort_by(|&a, &b| centre(a)[axis].total_cmp(&centre(b)[axis]));

        let mid = items.len() / 2;
        let (lo, hi) = items.split_at_mut(mid);
        let left = self.build_node(lo);
        let right = self.build_node(hi);
        let aabb = self.nodes[left].aabb().merged(self.nodes[right].aabb());
        self.nodes.push(BvhNode::Internal { aabb, left, right });
        self.nodes.len() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    #[inline]
    pub fn pieces(&self) -> &[ConvexPiece] {
        &self.pieces
    }

    /// Local bounding box of the whole tree.
    pub fn local_aabb(&self) -> Option<Aabb> {
        self.root.map(|r| *self.nodes[r].aabb())
    }

    /// Smallest signed distance between this tree at `pose` and `other` at
    /// `other_pose`. `None` if either tree is empty.
    pub fn min_signed_distance(
        &self,
        pose: &Isometry3<Real>,
        other: &Bvh,
        other_pose: &Isometry3<Real>,
    ) -> EngineResult<Option<Proximity>> {
        let (Some(root_a), Some(root_b)) = (self.root, other.root) else {
            return Ok(None);
        };
        let world_a: Vec<Aabb> = self.nodes.iter().map(|n| n.aabb().transform_by(pose)).collect();
        let world_b: Vec<Aabb> = other.nodes.iter().map(|n| n.aabb().transform_by(other_pose)).collect();

        let mut best: Option<Proximity> = None;
        let mut stack = vec![(root_a, root_b)];

        while let Some((a, b)) = stack.pop() {
            let lower = aabb_gap(&world_a[a], &world_b[b]);
            if let Some(best) = &best {
                if lower > 0.0 && lower >= best.distance {
                    continue;
                }
            }
            match (&self.nodes[a], &other.nodes[b]) {
                (BvhNode::Leaf { piece: pa, .. }, BvhNode::Leaf { piece: pb, .. }) => {
                    let found = piece_signed_distance(&self.pieces[*pa], pose, &other.pieces[*pb], other_pose)?;
                    if best.is_none_or(|b| found.distance < b.distance) {
                        best = Some(found);
                    }
                },
                (BvhNode::Internal { left, right, .. }, BvhNode::Leaf { .. }) => {
                    stack.push((*right, b));
                    stack.push((*left, b));
                },
                (BvhNode::Leaf { .. }, BvhNode::Internal { left, right, .. }) => {
                    stack.push((a, *right));
                    stack.push((a, *left));
                },
                (
                    BvhNode::Internal { left: la, right: ra, .. },
                    BvhNode::Internal { left: lb, right: rb, .. },
                ) => {
                    // descend the larger box first
                    if world_a[a].volume() >= world_b[b].volume() {
                        stack.push((*ra, b));
                        stack.push((*la, b));
                    } else {
                        stack.push((a, *rb));
                        stack.push((a, *lb));
                    }
                },
            }
        }
        Ok(best)
    }
}

/// Euclidean gap between two boxes, 0 when they overlap.
pub fn aabb_gap(a: &Aabb, b: &Aabb) -> Real {
    let dx = (a.mins.x.max(b.mins.x) - a.maxs.x.min(b.maxs.x)).max(0.0);
    let dy = (a.mins.y.max(b.mins.y) - a.maxs.y.min(b.maxs.y)).max(0.0);
    let dz = (a.mins.z.max(b.mins.z) - a.maxs.z.min(b.maxs.z)).max(0.0);
    (dx * dx + dy * dy + dz * dz).sqrt()
}

/// Exact signed distance of two placed convex pieces: GJK distance when
/// separated, EPA penetration depth (negated) when overlapping.
pub fn piece_signed_distance(
    a: &ConvexPiece,
    pose_a: &Isometry3<Real>,
    b: &ConvexPiece,
    pose_b: &Isometry3<Real>,
) -> EngineResult<Proximity> {
    let unsupported = |_| EngineError::degenerate("unsupported convex shape pair in distance query");

    let distance = query::distance(pose_a, &a.shape, pose_b, &b.shape).map_err(unsupported)?;
    if distance > 0.0 {
        let point = match query::closest_points(pose_a, &a.shape, pose_b, &b.shape, distance * 2.0 + 1.0)
            .map_err(unsupported)?
        {
            ClosestPoints::WithinMargin(p1, p2) => nalgebra::center(&p1, &p2),
            _ => nalgebra::center(&a.world_aabb(pose_a).center(), &b.world_aabb(pose_b).center()),
        };
        return Ok(Proximity { distance, point });
    }

    match query::contact(pose_a, &a.shape, pose_b, &b.shape, 0.0).map_err(unsupported)? {
        Some(contact) => Ok(Proximity {
            distance: contact.dist.min(0.0),
            point: nalgebra::center(&contact.point1, &contact.point2),
        }),
        None => Ok(Proximity {
            distance: 0.0,
            point: nalgebra::center(&a.world_aabb(pose_a).center(), &b.world_aabb(pose_b).center()),
        }),
    }
}
