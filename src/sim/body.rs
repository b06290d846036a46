//! Block bodies as seen by the connection subsystem
//!
//! Bodies are owned by the physics collaborator. These are plain snapshots:
//! the connector reads them every tick and never keeps them across ticks.

use std::fmt;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::BLOCK_SIZE;

/// Stable identity of a physics body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyId(pub u32);

impl fmt::Display for BodyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Declared block type. Joints between different kinds are weaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlockKind {
    #[default]
    Square,
    Door,
    RightTriangle,
}

impl BlockKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockKind::Square => "block",
            BlockKind::Door => "door",
            BlockKind::RightTriangle => "triangle",
        }
    }
}

/// Collision shape of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Shape {
    #[default]
    Rect,
    /// Right angle at the top-left corner, hypotenuse from top-left to bottom-right
    RightTriangle,
}

impl Shape {
    /// Local-space vertex list for the given half-extents (y grows downward)
    pub fn local_vertices(&self, half: Vec2) -> Vec<Vec2> {
        match self {
            Shape::Rect => vec![
                Vec2::new(-half.x, -half.y),
                Vec2::new(half.x, -half.y),
                Vec2::new(half.x, half.y),
                Vec2::new(-half.x, half.y),
            ],
            Shape::RightTriangle => vec![
                Vec2::new(-half.x, half.y),
                Vec2::new(half.x, half.y),
                Vec2::new(-half.x, -half.y),
            ],
        }
    }
}

/// Snapshot of a block body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockBody {
    pub id: BodyId,
    /// Center of the body (world pixels)
    pub pos: Vec2,
    /// Rotation in radians
    pub rotation: f32,
    /// Half width / half height of the bounding rectangle
    pub half_extents: Vec2,
    pub shape: Shape,
    pub kind: BlockKind,
    /// Per-body joint strength multiplier (None = neutral)
    #[serde(default)]
    pub magnetism: Option<f32>,
    /// Static bodies are not integrated by the physics collaborator
    #[serde(default)]
    pub is_static: bool,
}

impl BlockBody {
    /// A standard 64x64 square block
    pub fn new(id: BodyId, pos: Vec2) -> Self {
        Self {
            id,
            pos,
            rotation: 0.0,
            half_extents: Vec2::splat(BLOCK_SIZE / 2.0),
            shape: Shape::Rect,
            kind: BlockKind::Square,
            magnetism: None,
            is_static: false,
        }
    }

    pub fn with_half_extents(mut self, half_extents: Vec2) -> Self {
        self.half_extents = half_extents;
        self
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_kind(mut self, kind: BlockKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_magnetism(mut self, magnetism: f32) -> Self {
        self.magnetism = Some(magnetism);
        self
    }

    /// Magnetism used for joint strength. Missing, zero, negative or
    /// non-finite values fall back to 1.
    pub fn effective_magnetism(&self) -> f32 {
        match self.magnetism {
            Some(m) if m.is_finite() && m > 0.0 => m,
            _ => 1.0,
        }
    }

    /// World-space vertices of the collision shape
    pub fn world_vertices(&self) -> Vec<Vec2> {
        self.shape
            .local_vertices(self.half_extents)
            .into_iter()
            .map(|v| self.pos + crate::rotate(v, self.rotation))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magnetism_defaults_to_one() {
        let body = BlockBody::new(BodyId(1), Vec2::ZERO);
        assert_eq!(body.effective_magnetism(), 1.0);
        assert_eq!(body.clone().with_magnetism(0.0).effective_magnetism(), 1.0);
        assert_eq!(body.clone().with_magnetism(f32::NAN).effective_magnetism(), 1.0);
        assert_eq!(body.with_magnetism(1.5).effective_magnetism(), 1.5);
    }

    #[test]
    fn test_triangle_vertices() {
        let body = BlockBody::new(BodyId(2), Vec2::new(100.0, 100.0)).with_shape(Shape::RightTriangle);
        let verts = body.world_vertices();
        assert_eq!(verts.len(), 3);
        assert_eq!(verts[0], Vec2::new(68.0, 132.0));
        assert_eq!(verts[2], Vec2::new(68.0, 68.0));
    }
}
