//! Block connector: proximity scan and joint forming
//!
//! Once per tick, every unordered pair of tracked blocks that is not yet
//! connected is measured. Pairs within the connection threshold are joined
//! (optionally after an alignment snap), pairs within the attraction threshold
//! show a preview. Joints are permanent for the rest of the round.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::body::{BlockBody, BodyId};
use super::edges::{Edge, EdgeInfo, edge_midpoint, find_closest_edges};
use super::graph::ConnectionGraph;
use super::snap::{SnapTween, calculate_alignment, should_snap_edges};
use super::strength::{JointStrength, connection_strength};
use super::world::{JointError, JointHandle, JointSpec, PhysicsWorld};
use crate::settings::{MagnetConfig, ScanMode};

/// Distance measurement between two blocks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proximity {
    pub contact_a: Vec2,
    pub contact_b: Vec2,
    pub distance: f32,
    /// Set when measured edge-to-edge
    pub edges: Option<EdgeInfo>,
}

/// Where a pair stands in the current round
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PairState {
    Unconnected,
    /// Between the two thresholds; `strength` is 1 at the connection threshold
    Previewing { strength: f32 },
    /// Alignment tween running, joint not created yet
    Snapping,
    Connected,
}

/// Side effects of a scan, consumed by feedback and rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConnectionEvent {
    SnapStarted {
        a: BodyId,
        b: BodyId,
    },
    Connected {
        a: BodyId,
        b: BodyId,
        joint: JointHandle,
        contact_a: Vec2,
        contact_b: Vec2,
        strength: JointStrength,
    },
    Preview {
        a: BodyId,
        b: BodyId,
        contact_a: Vec2,
        contact_b: Vec2,
        strength: f32,
    },
    PreviewCleared {
        a: BodyId,
        b: BodyId,
    },
    JointFailed {
        a: BodyId,
        b: BodyId,
    },
}

/// A live joint between two blocks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connection {
    pub a: BodyId,
    pub b: BodyId,
    pub joint: JointHandle,
    pub edges: Option<(Edge, Edge)>,
    pub strength: JointStrength,
    /// Attachment points relative to each body's center
    pub anchor_a: Vec2,
    pub anchor_b: Vec2,
}

#[derive(Debug, Clone)]
struct PendingSnap {
    a: BodyId,
    b: BodyId,
    edge_a: Edge,
    edge_b: Edge,
    tween: SnapTween,
    was_static_a: bool,
    was_static_b: bool,
}

#[inline]
fn pair_key(a: BodyId, b: BodyId) -> (BodyId, BodyId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Forms joints between magnetic blocks
#[derive(Debug, Clone)]
pub struct BlockConnector {
    config: MagnetConfig,
    /// Scan order is tracking order
    tracked: Vec<BodyId>,
    dragged: BTreeSet<BodyId>,
    graph: ConnectionGraph,
    connections: Vec<Connection>,
    previews: BTreeMap<(BodyId, BodyId), f32>,
    snaps: Vec<PendingSnap>,
    /// Pairs whose last joint request failed
    failed: BTreeSet<(BodyId, BodyId)>,
}

impl BlockConnector {
    pub fn new(config: MagnetConfig) -> Self {
        Self {
            config,
            tracked: Vec::new(),
            dragged: BTreeSet::new(),
            graph: ConnectionGraph::new(),
            connections: Vec::new(),
            previews: BTreeMap::new(),
            snaps: Vec::new(),
            failed: BTreeSet::new(),
        }
    }

    pub fn config(&self) -> &MagnetConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: MagnetConfig) {
        self.config = config;
    }

    /// Start scanning a body
    pub fn track(&mut self, id: BodyId) {
        if !self.tracked.contains(&id) {
            self.tracked.push(id);
        }
    }

    pub fn tracked(&self) -> &[BodyId] {
        &self.tracked
    }

    /// The player picked up a block; it is skipped until released
    pub fn begin_drag(&mut self, id: BodyId) {
        self.dragged.insert(id);
    }

    pub fn end_drag(&mut self, id: BodyId) {
        self.dragged.remove(&id);
    }

    pub fn end_all_drags(&mut self) {
        self.dragged.clear();
    }

    pub fn is_dragged(&self, id: BodyId) -> bool {
        self.dragged.contains(&id)
    }

    pub fn are_blocks_connected(&self, a: BodyId, b: BodyId) -> bool {
        self.graph.are_connected(a, b)
    }

    pub fn graph(&self) -> &ConnectionGraph {
        &self.graph
    }

    /// Live joints, in creation order
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn pair_state(&self, a: BodyId, b: BodyId) -> PairState {
        if self.graph.are_connected(a, b) {
            return PairState::Connected;
        }
        let key = pair_key(a, b);
        if self.snaps.iter().any(|s| pair_key(s.a, s.b) == key) {
            return PairState::Snapping;
        }
        match self.previews.get(&key) {
            Some(&strength) => PairState::Previewing { strength },
            None => PairState::Unconnected,
        }
    }

    /// Measure two blocks according to the configured scan mode
    pub fn measure(&self, a: &BlockBody, b: &BlockBody) -> Proximity {
        match self.config.scan_mode {
            ScanMode::Centers => Proximity {
                contact_a: a.pos,
                contact_b: b.pos,
                distance: a.pos.distance(b.pos),
                edges: None,
            },
            ScanMode::Edges => {
                let info = find_closest_edges(a, b);
                Proximity {
                    contact_a: info.contact_a,
                    contact_b: info.contact_b,
                    distance: info.distance,
                    edges: Some(info),
                }
            }
        }
    }

    /// Preview intensity: 1 at the connection threshold, 0 at the attraction threshold
    pub fn preview_strength(&self, distance: f32) -> f32 {
        let conn = self.config.connection_threshold;
        let range = (self.config.attraction_threshold - conn).max(f32::EPSILON);
        1.0 - ((distance - conn) / range).clamp(0.0, 1.0)
    }

    /// Join two blocks right away, whatever their distance.
    ///
    /// Returns `Ok(None)` if they are already connected.
    pub fn connect_blocks<W: PhysicsWorld>(
        &mut self,
        world: &mut W,
        a: BodyId,
        b: BodyId,
    ) -> Result<Option<JointHandle>, JointError> {
        if self.graph.are_connected(a, b) {
            return Ok(None);
        }
        let body_a = world.body(a).cloned().ok_or(JointError::UnknownBody(a))?;
        let body_b = world.body(b).cloned().ok_or(JointError::UnknownBody(b))?;
        let proximity = self.measure(&body_a, &body_b);
        self.commit(world, &body_a, &body_b, &proximity)
            .map(|(joint, _)| Some(joint))
    }

    /// Run one scan. `dt` advances any running alignment snaps.
    pub fn form_connections<W: PhysicsWorld>(&mut self, world: &mut W, dt: f32) -> Vec<ConnectionEvent> {
        let mut events = Vec::new();
        self.advance_snaps(world, dt, &mut events);

        let bodies: Vec<BlockBody> = self
            .tracked
            .iter()
            .filter_map(|id| world.body(*id).cloned())
            .collect();
        let mut busy: BTreeSet<BodyId> = self.snaps.iter().flat_map(|s| [s.a, s.b]).collect();
        let mut previews = BTreeMap::new();

        for (i, a) in bodies.iter().enumerate() {
            for b in &bodies[i + 1..] {
                if self.dragged.contains(&a.id) || self.dragged.contains(&b.id) {
                    continue;
                }
                if busy.contains(&a.id) || busy.contains(&b.id) {
                    continue;
                }
                if self.graph.are_connected(a.id, b.id) {
                    continue;
                }

                let proximity = self.measure(a, b);
                if proximity.distance <= self.config.connection_threshold {
                    let snap = proximity.edges.filter(|info| {
                        self.config.snap_enabled && should_snap_edges(info, self.config.snap_tolerance_deg)
                    });
                    if let Some(info) = snap {
                        self.start_snap(world, a, b, &info);
                        busy.insert(a.id);
                        busy.insert(b.id);
                        events.push(ConnectionEvent::SnapStarted { a: a.id, b: b.id });
                    } else {
                        self.connect_and_report(world, a, b, &proximity, &mut events);
                    }
                } else if proximity.distance <= self.config.attraction_threshold {
                    let strength = self.preview_strength(proximity.distance);
                    previews.insert(pair_key(a.id, b.id), strength);
                    events.push(ConnectionEvent::Preview {
                        a: a.id,
                        b: b.id,
                        contact_a: proximity.contact_a,
                        contact_b: proximity.contact_b,
                        strength,
                    });
                }
            }
        }

        for &(a, b) in self.previews.keys() {
            if !previews.contains_key(&(a, b)) {
                events.push(ConnectionEvent::PreviewCleared { a, b });
            }
        }
        self.previews = previews;

        events
    }

    /// Forget every body, joint and preview (round end)
    pub fn clear(&mut self) {
        self.tracked.clear();
        self.dragged.clear();
        self.graph.clear();
        self.connections.clear();
        self.previews.clear();
        self.snaps.clear();
        self.failed.clear();
    }

    fn start_snap<W: PhysicsWorld>(&mut self, world: &mut W, a: &BlockBody, b: &BlockBody, info: &EdgeInfo) {
        let target = calculate_alignment(a, b, info.edge_a, info.edge_b);
        world.set_static(a.id, true);
        world.set_static(b.id, true);
        log::debug!(
            "Snapping {} onto {} ({:?} -> {:?})",
            b.id,
            a.id,
            info.edge_b,
            info.edge_a
        );
        self.snaps.push(PendingSnap {
            a: a.id,
            b: b.id,
            edge_a: info.edge_a,
            edge_b: info.edge_b,
            tween: SnapTween::new(b.pos, b.rotation, target, self.config.snap_duration),
            was_static_a: a.is_static,
            was_static_b: b.is_static,
        });
    }

    fn advance_snaps<W: PhysicsWorld>(&mut self, world: &mut W, dt: f32, events: &mut Vec<ConnectionEvent>) {
        for mut snap in std::mem::take(&mut self.snaps) {
            let dragged_a = self.dragged.contains(&snap.a);
            let dragged_b = self.dragged.contains(&snap.b);
            if dragged_a || dragged_b {
                // A held block stays static until it is dropped
                if !dragged_a {
                    world.set_static(snap.a, snap.was_static_a);
                }
                if !dragged_b {
                    world.set_static(snap.b, snap.was_static_b);
                }
                log::debug!("Snap between {} and {} cancelled by drag", snap.a, snap.b);
                continue;
            }

            let step = snap.tween.advance(dt);
            world.set_transform(snap.b, step.pos, step.rotation);
            if !snap.tween.is_finished() {
                self.snaps.push(snap);
                continue;
            }

            world.set_static(snap.a, snap.was_static_a);
            world.set_static(snap.b, snap.was_static_b);
            if self.graph.are_connected(snap.a, snap.b) {
                continue;
            }

            let (Some(a), Some(b)) = (world.body(snap.a).cloned(), world.body(snap.b).cloned()) else {
                log::warn!("Snap between {} and {} lost a body", snap.a, snap.b);
                continue;
            };
            let info = EdgeInfo {
                edge_a: snap.edge_a,
                edge_b: snap.edge_b,
                contact_a: edge_midpoint(&a, snap.edge_a),
                contact_b: edge_midpoint(&b, snap.edge_b),
                distance: 0.0,
                rotation_a: a.rotation,
                rotation_b: b.rotation,
            };
            let proximity = Proximity {
                contact_a: info.contact_a,
                contact_b: info.contact_b,
                distance: info.contact_a.distance(info.contact_b),
                edges: Some(info),
            };
            self.connect_and_report(world, &a, &b, &proximity, events);
        }
    }

    fn connect_and_report<W: PhysicsWorld>(
        &mut self,
        world: &mut W,
        a: &BlockBody,
        b: &BlockBody,
        proximity: &Proximity,
        events: &mut Vec<ConnectionEvent>,
    ) {
        match self.commit(world, a, b, proximity) {
            Ok((joint, strength)) => {
                events.push(ConnectionEvent::Connected {
                    a: a.id,
                    b: b.id,
                    joint,
                    contact_a: proximity.contact_a,
                    contact_b: proximity.contact_b,
                    strength,
                });
            }
            Err(err) => {
                if self.failed.insert(pair_key(a.id, b.id)) {
                    log::warn!("Skipping connection {} - {}: {}", a.id, b.id, err);
                } else {
                    log::debug!("Joint {} - {} still failing: {}", a.id, b.id, err);
                }
                events.push(ConnectionEvent::JointFailed { a: a.id, b: b.id });
            }
        }
    }

    /// Ask the physics collaborator for a joint; record it only on success
    fn commit<W: PhysicsWorld>(
        &mut self,
        world: &mut W,
        a: &BlockBody,
        b: &BlockBody,
        proximity: &Proximity,
    ) -> Result<(JointHandle, JointStrength), JointError> {
        let edges = proximity.edges.map(|info| (info.edge_a, info.edge_b));
        let strength = connection_strength(a, b, edges, self.config.kind_mismatch_factor);
        let spec = JointSpec {
            body_a: a.id,
            body_b: b.id,
            anchor_a: proximity.contact_a - a.pos,
            anchor_b: proximity.contact_b - b.pos,
            stiffness: strength.stiffness,
            damping: strength.damping,
            rest_length: 0.0,
        };

        let joint = world.create_joint(&spec)?;
        self.graph.connect(a.id, b.id);
        self.previews.remove(&pair_key(a.id, b.id));
        self.failed.remove(&pair_key(a.id, b.id));
        self.connections.push(Connection {
            a: a.id,
            b: b.id,
            joint,
            edges,
            strength,
            anchor_a: spec.anchor_a,
            anchor_b: spec.anchor_b,
        });
        log::info!(
            "Connected {} and {} (stiffness {:.2}, damping {:.2})",
            a.id,
            b.id,
            strength.stiffness,
            strength.damping
        );
        Ok((joint, strength))
    }
}
