//! Block catalog and spawning

use glam::Vec2;
use rand::Rng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::sim::{BlockBody, BlockKind, BodyId, Shape};

/// Squares spawned per color
pub const SQUARES_PER_COLOR: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockColor {
    Yellow,
    Red,
    Green,
    Blue,
}

impl BlockColor {
    pub const ALL: [BlockColor; 4] = [BlockColor::Yellow, BlockColor::Red, BlockColor::Green, BlockColor::Blue];

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockColor::Yellow => "yellow",
            BlockColor::Red => "red",
            BlockColor::Green => "green",
            BlockColor::Blue => "blue",
        }
    }
}

/// Texture key for a color/kind combination, e.g. `"red-door"`
pub fn texture_key(color: BlockColor, kind: BlockKind) -> String {
    format!("{}-{}", color.as_str(), kind.as_str())
}

/// Material shared by all blocks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlockMaterial {
    pub friction: f32,
    pub mass: f32,
    pub bounce: f32,
}

impl Default for BlockMaterial {
    fn default() -> Self {
        Self {
            friction: BLOCK_FRICTION,
            mass: BLOCK_MASS,
            bounce: 0.0,
        }
    }
}

/// A block ready to be inserted into the physics world
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnedBlock {
    pub color: BlockColor,
    pub body: BlockBody,
    pub material: BlockMaterial,
}

impl SpawnedBlock {
    pub fn texture_key(&self) -> String {
        texture_key(self.color, self.body.kind)
    }
}

/// Half extents per kind. Doors are two squares tall; triangles use their
/// bounding square for edge tests.
pub fn half_extents(kind: BlockKind) -> Vec2 {
    let half = BLOCK_SIZE / 2.0;
    match kind {
        BlockKind::Door => Vec2::new(half, BLOCK_SIZE),
        BlockKind::Square | BlockKind::RightTriangle => Vec2::splat(half),
    }
}

/// Build one round's worth of blocks with consecutive ids from `first_id`.
///
/// Order: squares (blue, yellow, red, green), red and blue doors, then one
/// triangle per color. Squares land in x∈[500,700], the rest x∈[500,1100];
/// all y∈[200,400].
pub fn spawn_blocks(rng: &mut Pcg32, first_id: u32) -> Vec<SpawnedBlock> {
    const SQUARE_ORDER: [BlockColor; 4] = [BlockColor::Blue, BlockColor::Yellow, BlockColor::Red, BlockColor::Green];
    const DOOR_ORDER: [BlockColor; 2] = [BlockColor::Red, BlockColor::Blue];

    let mut plan = Vec::new();
    for color in SQUARE_ORDER {
        for _ in 0..SQUARES_PER_COLOR {
            plan.push((color, BlockKind::Square, 500..=700));
        }
    }
    for color in DOOR_ORDER {
        plan.push((color, BlockKind::Door, 500..=1100));
    }
    for color in SQUARE_ORDER {
        plan.push((color, BlockKind::RightTriangle, 500..=1100));
    }

    plan.into_iter()
        .enumerate()
        .map(|(i, (color, kind, x_range))| {
            let x = rng.random_range(x_range) as f32;
            let y = rng.random_range(200..=400) as f32;
            let shape = match kind {
                BlockKind::RightTriangle => Shape::RightTriangle,
                _ => Shape::Rect,
            };
            let body = BlockBody::new(BodyId(first_id + i as u32), Vec2::new(x, y))
                .with_kind(kind)
                .with_shape(shape)
                .with_half_extents(half_extents(kind));
            SpawnedBlock {
                color,
                body,
                material: BlockMaterial::default(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_catalog_counts() {
        let mut rng = Pcg32::seed_from_u64(7);
        let blocks = spawn_blocks(&mut rng, 1);
        assert_eq!(blocks.len(), 4 * SQUARES_PER_COLOR + 2 + 4);

        let count = |kind| blocks.iter().filter(|b| b.body.kind == kind).count();
        assert_eq!(count(BlockKind::Square), 12);
        assert_eq!(count(BlockKind::Door), 2);
        assert_eq!(count(BlockKind::RightTriangle), 4);

        let door_colors: Vec<_> = blocks
            .iter()
            .filter(|b| b.body.kind == BlockKind::Door)
            .map(|b| b.color)
            .collect();
        assert_eq!(door_colors, vec![BlockColor::Red, BlockColor::Blue]);
    }

    #[test]
    fn test_spawn_ranges_and_ids() {
        let mut rng = Pcg32::seed_from_u64(42);
        let blocks = spawn_blocks(&mut rng, 100);
        for (i, block) in blocks.iter().enumerate() {
            assert_eq!(block.body.id, BodyId(100 + i as u32));
            let p = block.body.pos;
            assert!((200.0..=400.0).contains(&p.y));
            match block.body.kind {
                BlockKind::Square => assert!((500.0..=700.0).contains(&p.x)),
                _ => assert!((500.0..=1100.0).contains(&p.x)),
            }
            assert_eq!(block.material.friction, 0.3);
            assert_eq!(block.material.mass, 1.0);
            assert!(!block.body.is_static);
        }
    }

    #[test]
    fn test_same_seed_same_layout() {
        let a = spawn_blocks(&mut Pcg32::seed_from_u64(3), 1);
        let b = spawn_blocks(&mut Pcg32::seed_from_u64(3), 1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_shapes_and_textures() {
        let blocks = spawn_blocks(&mut Pcg32::seed_from_u64(1), 1);
        let door = blocks.iter().find(|b| b.body.kind == BlockKind::Door).unwrap();
        assert_eq!(door.body.half_extents, Vec2::new(32.0, 64.0));
        assert_eq!(door.texture_key(), "red-door");

        let tri = blocks.iter().find(|b| b.body.kind == BlockKind::RightTriangle).unwrap();
        assert_eq!(tri.body.shape, Shape::RightTriangle);
        assert_eq!(tri.texture_key(), "blue-triangle");
        assert_eq!(blocks[0].texture_key(), "blue-block");
    }
}
