//! Joint stiffness and damping
//!
//! Base values depend on which faces mate; both blocks' magnetism scales the
//! stiffness and mixed kinds weaken it.

use serde::{Deserialize, Serialize};

use super::body::BlockBody;
use super::edges::Edge;

/// Stiffness/damping pair handed to the physics collaborator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointStrength {
    pub stiffness: f32,
    pub damping: f32,
}

impl JointStrength {
    /// Center-to-center joints
    pub const RIGID: JointStrength = JointStrength::new(1.0, 0.0);
    /// Top face against bottom face
    pub const STACKED: JointStrength = JointStrength::new(0.9, 0.1);
    /// Left face against right face
    pub const SIDE_BY_SIDE: JointStrength = JointStrength::new(0.85, 0.15);
    /// Adjacent or identical faces
    pub const CORNER: JointStrength = JointStrength::new(0.8, 0.2);

    pub const fn new(stiffness: f32, damping: f32) -> Self {
        Self { stiffness, damping }
    }
}

/// Base strength for a mating edge pair (None = center-to-center)
pub fn base_strength(edges: Option<(Edge, Edge)>) -> JointStrength {
    match edges {
        None => JointStrength::RIGID,
        Some((a, b)) if a.is_opposite(b) => match a {
            Edge::Top | Edge::Bottom => JointStrength::STACKED,
            Edge::Left | Edge::Right => JointStrength::SIDE_BY_SIDE,
        },
        Some(_) => JointStrength::CORNER,
    }
}

/// Final joint strength. Stiffness is clamped to [0, 1].
pub fn connection_strength(
    a: &BlockBody,
    b: &BlockBody,
    edges: Option<(Edge, Edge)>,
    kind_mismatch_factor: f32,
) -> JointStrength {
    let base = base_strength(edges);
    let mut stiffness = base.stiffness * a.effective_magnetism() * b.effective_magnetism();
    if a.kind != b.kind {
        stiffness *= kind_mismatch_factor;
    }
    JointStrength {
        stiffness: stiffness.clamp(0.0, 1.0),
        damping: base.damping,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::KIND_MISMATCH_FACTOR;
    use crate::sim::body::{BlockKind, BodyId};
    use glam::Vec2;
    use proptest::prelude::*;

    fn block(id: u32) -> BlockBody {
        BlockBody::new(BodyId(id), Vec2::ZERO)
    }

    #[test]
    fn test_base_is_order_independent() {
        assert_eq!(base_strength(Some((Edge::Top, Edge::Bottom))), JointStrength::STACKED);
        assert_eq!(base_strength(Some((Edge::Bottom, Edge::Top))), JointStrength::STACKED);
        assert_eq!(base_strength(Some((Edge::Left, Edge::Right))), JointStrength::SIDE_BY_SIDE);
        assert_eq!(base_strength(Some((Edge::Top, Edge::Left))), JointStrength::CORNER);
        assert_eq!(base_strength(Some((Edge::Top, Edge::Top))), JointStrength::CORNER);
        assert_eq!(base_strength(None), JointStrength::RIGID);
    }

    #[test]
    fn test_opposite_stronger_than_adjacent() {
        let a = block(1);
        let b = block(2);
        let opposite = connection_strength(&a, &b, Some((Edge::Right, Edge::Left)), 0.7);
        let adjacent = connection_strength(&a, &b, Some((Edge::Right, Edge::Top)), 0.7);
        assert!(opposite.stiffness > adjacent.stiffness);
    }

    #[test]
    fn test_kind_mismatch_discount() {
        let a = block(1);
        let b = block(2).with_kind(BlockKind::Door);
        let s = connection_strength(&a, &b, Some((Edge::Top, Edge::Bottom)), KIND_MISMATCH_FACTOR);
        assert!((s.stiffness - 0.9 * 0.7).abs() < 1e-6);
        assert!((s.damping - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_magnetism_scales_and_clamps() {
        let weak = block(1).with_magnetism(0.5);
        let strong = block(2).with_magnetism(2.0);
        let s = connection_strength(&weak, &weak.clone(), Some((Edge::Right, Edge::Left)), 0.7);
        assert!((s.stiffness - 0.85 * 0.25).abs() < 1e-6);
        let s = connection_strength(&strong, &strong.clone(), Some((Edge::Right, Edge::Left)), 0.7);
        assert_eq!(s.stiffness, 1.0);
    }

    fn any_edges() -> impl Strategy<Value = Option<(Edge, Edge)>> {
        prop::option::of((0usize..4, 0usize..4).prop_map(|(a, b)| (Edge::from_index(a), Edge::from_index(b))))
    }

    proptest! {
        #[test]
        fn prop_stiffness_in_unit_range(
            ma in 0.0f32..=2.0,
            mb in 0.0f32..=2.0,
            same_kind in any::<bool>(),
            edges in any_edges(),
        ) {
            let a = block(1).with_magnetism(ma);
            let mut b = block(2).with_magnetism(mb);
            if !same_kind {
                b.kind = BlockKind::RightTriangle;
            }
            let s = connection_strength(&a, &b, edges, KIND_MISMATCH_FACTOR);
            prop_assert!((0.0..=1.0).contains(&s.stiffness));
        }
    }
}
