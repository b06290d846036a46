//! Edge geometry for rectangular blocks
//!
//! Edges are numbered clockwise in screen space (y grows downward):
//! 0 = top, 1 = right, 2 = bottom, 3 = left. Non-rectangular blocks use their
//! bounding rectangle.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::body::BlockBody;
use crate::rotate;

/// One of the four cardinal sides of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    Top = 0,
    Right = 1,
    Bottom = 2,
    Left = 3,
}

impl Edge {
    pub const ALL: [Edge; 4] = [Edge::Top, Edge::Right, Edge::Bottom, Edge::Left];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Edge {
        Self::ALL[index % 4]
    }

    pub fn opposite(self) -> Edge {
        Edge::from_index(self.index() + 2)
    }

    /// Top/bottom or left/right
    pub fn is_opposite(self, other: Edge) -> bool {
        self.opposite() == other
    }

    /// Edges that share a corner
    pub fn is_adjacent(self, other: Edge) -> bool {
        (self.index() + other.index()) % 2 == 1
    }

    /// Canonical angle of the edge in degrees (index × 90°)
    pub fn canonical_angle_deg(self) -> f32 {
        self.index() as f32 * 90.0
    }

    /// Outward normal of an unrotated block
    pub fn local_normal(self) -> Vec2 {
        match self {
            Edge::Top => Vec2::new(0.0, -1.0),
            Edge::Right => Vec2::new(1.0, 0.0),
            Edge::Bottom => Vec2::new(0.0, 1.0),
            Edge::Left => Vec2::new(-1.0, 0.0),
        }
    }

    /// Edge midpoint relative to the block center, before rotation
    pub fn local_midpoint(self, half_extents: Vec2) -> Vec2 {
        self.local_normal() * half_extents
    }
}

/// World-space midpoint of an edge
pub fn edge_midpoint(body: &BlockBody, edge: Edge) -> Vec2 {
    body.pos + rotate(edge.local_midpoint(body.half_extents), body.rotation)
}

/// Closest edge pair between two blocks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeInfo {
    pub edge_a: Edge,
    pub edge_b: Edge,
    /// Midpoint of `edge_a` in world space
    pub contact_a: Vec2,
    /// Midpoint of `edge_b` in world space
    pub contact_b: Vec2,
    pub distance: f32,
    /// Body rotations at measurement time (radians)
    pub rotation_a: f32,
    pub rotation_b: f32,
}

/// Pick the edge pair whose midpoints are closest (16 candidates).
/// Ties keep the first pair in (edge_a, edge_b) order.
pub fn find_closest_edges(a: &BlockBody, b: &BlockBody) -> EdgeInfo {
    let mids_a = Edge::ALL.map(|e| edge_midpoint(a, e));
    let mids_b = Edge::ALL.map(|e| edge_midpoint(b, e));

    let mut best = EdgeInfo {
        edge_a: Edge::Top,
        edge_b: Edge::Top,
        contact_a: mids_a[0],
        contact_b: mids_b[0],
        distance: mids_a[0].distance(mids_b[0]),
        rotation_a: a.rotation,
        rotation_b: b.rotation,
    };

    for edge_a in Edge::ALL {
        for edge_b in Edge::ALL {
            let pa = mids_a[edge_a.index()];
            let pb = mids_b[edge_b.index()];
            let distance = pa.distance(pb);
            if distance < best.distance {
                best.edge_a = edge_a;
                best.edge_b = edge_b;
                best.contact_a = pa;
                best.contact_b = pb;
                best.distance = distance;
            }
        }
    }

    best
}
