//! Boundary with the physics collaborator
//!
//! The rigid-body engine owns bodies and constraints. The connector only
//! queries body snapshots and asks for a handful of mutations through
//! [`PhysicsWorld`]. [`SandboxWorld`] is an in-memory implementation with no
//! dynamics, used headless and in tests.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::body::{BlockBody, BodyId};

/// Opaque handle to a constraint created by the physics collaborator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct JointHandle(pub u32);

/// Parameters of a joint request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JointSpec {
    pub body_a: BodyId,
    pub body_b: BodyId,
    /// Attachment point on A, relative to A's center
    pub anchor_a: Vec2,
    /// Attachment point on B, relative to B's center
    pub anchor_b: Vec2,
    /// 0 = slack, 1 = rigid
    pub stiffness: f32,
    pub damping: f32,
    pub rest_length: f32,
}

/// Failures reported by the physics collaborator
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JointError {
    #[error("body {0} does not exist")]
    UnknownBody(BodyId),
    #[error("cannot join body {0} to itself")]
    SameBody(BodyId),
    #[error("constraint between {a} and {b} rejected: {reason}")]
    Rejected { a: BodyId, b: BodyId, reason: String },
}

/// What the connection subsystem needs from the rigid-body engine
pub trait PhysicsWorld {
    /// Current snapshot of a body, if it still exists
    fn body(&self, id: BodyId) -> Option<&BlockBody>;

    /// Add a body (round start)
    fn insert_body(&mut self, body: BlockBody);

    /// Destroy a body and every constraint attached to it (round end)
    fn remove_body(&mut self, id: BodyId);

    /// Toggle between static (not integrated) and dynamic
    fn set_static(&mut self, id: BodyId, is_static: bool);

    /// Teleport a body
    fn set_transform(&mut self, id: BodyId, pos: Vec2, rotation: f32);

    /// Create a constraint between two bodies
    fn create_joint(&mut self, spec: &JointSpec) -> Result<JointHandle, JointError>;
}

/// In-memory physics collaborator without dynamics
#[derive(Debug, Clone, Default)]
pub struct SandboxWorld {
    bodies: BTreeMap<BodyId, BlockBody>,
    joints: BTreeMap<JointHandle, JointSpec>,
    /// Pairs for which `create_joint` fails (fault injection)
    rejected: BTreeSet<(BodyId, BodyId)>,
    next_joint: u32,
}

impl SandboxWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// All bodies, sorted by id
    pub fn bodies(&self) -> impl Iterator<Item = &BlockBody> {
        self.bodies.values()
    }

    /// All live joints, sorted by handle
    pub fn joints(&self) -> impl Iterator<Item = (&JointHandle, &JointSpec)> {
        self.joints.iter()
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Number of joints linking `a` and `b` in either direction
    pub fn joints_between(&self, a: BodyId, b: BodyId) -> usize {
        self.joints
            .values()
            .filter(|j| (j.body_a == a && j.body_b == b) || (j.body_a == b && j.body_b == a))
            .count()
    }

    /// Make every future joint request between `a` and `b` fail
    pub fn reject_joints_between(&mut self, a: BodyId, b: BodyId) {
        self.rejected.insert(ordered(a, b));
    }
}

fn ordered(a: BodyId, b: BodyId) -> (BodyId, BodyId) {
    if a <= b { (a, b) } else { (b, a) }
}

impl PhysicsWorld for SandboxWorld {
    fn body(&self, id: BodyId) -> Option<&BlockBody> {
        self.bodies.get(&id)
    }

    fn insert_body(&mut self, body: BlockBody) {
        self.bodies.insert(body.id, body);
    }

    fn remove_body(&mut self, id: BodyId) {
        self.bodies.remove(&id);
        self.joints.retain(|_, j| j.body_a != id && j.body_b != id);
    }

    fn set_static(&mut self, id: BodyId, is_static: bool) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.is_static = is_static;
        }
    }

    fn set_transform(&mut self, id: BodyId, pos: Vec2, rotation: f32) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.pos = pos;
            body.rotation = rotation;
        }
    }

    fn create_joint(&mut self, spec: &JointSpec) -> Result<JointHandle, JointError> {
        if spec.body_a == spec.body_b {
            return Err(JointError::SameBody(spec.body_a));
        }
        for id in [spec.body_a, spec.body_b] {
            if !self.bodies.contains_key(&id) {
                return Err(JointError::UnknownBody(id));
            }
        }
        if self.rejected.contains(&ordered(spec.body_a, spec.body_b)) {
            return Err(JointError::Rejected {
                a: spec.body_a,
                b: spec.body_b,
                reason: "rejected by sandbox".to_string(),
            });
        }

        let handle = JointHandle(self.next_joint);
        self.next_joint += 1;
        self.joints.insert(handle, spec.clone());
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(a: u32, b: u32) -> JointSpec {
        JointSpec {
            body_a: BodyId(a),
            body_b: BodyId(b),
            anchor_a: Vec2::ZERO,
            anchor_b: Vec2::ZERO,
            stiffness: 1.0,
            damping: 0.0,
            rest_length: 0.0,
        }
    }

    #[test]
    fn test_create_joint_requires_bodies() {
        let mut world = SandboxWorld::new();
        world.insert_body(BlockBody::new(BodyId(1), Vec2::ZERO));
        assert_eq!(
            world.create_joint(&spec(1, 2)),
            Err(JointError::UnknownBody(BodyId(2)))
        );
        assert_eq!(world.create_joint(&spec(1, 1)), Err(JointError::SameBody(BodyId(1))));
    }

    #[test]
    fn test_remove_body_drops_its_joints() {
        let mut world = SandboxWorld::new();
        for id in 1..=3 {
            world.insert_body(BlockBody::new(BodyId(id), Vec2::ZERO));
        }
        world.create_joint(&spec(1, 2)).unwrap();
        world.create_joint(&spec(2, 3)).unwrap();
        assert_eq!(world.joint_count(), 2);

        world.remove_body(BodyId(3));
        assert_eq!(world.joint_count(), 1);
        assert_eq!(world.joints_between(BodyId(2), BodyId(1)), 1);
    }

    #[test]
    fn test_rejected_pair_fails_both_orders() {
        let mut world = SandboxWorld::new();
        world.insert_body(BlockBody::new(BodyId(1), Vec2::ZERO));
        world.insert_body(BlockBody::new(BodyId(2), Vec2::ZERO));
        world.reject_joints_between(BodyId(2), BodyId(1));
        assert!(matches!(
            world.create_joint(&spec(1, 2)),
            Err(JointError::Rejected { .. })
        ));
        assert_eq!(world.joint_count(), 0);
    }
}
