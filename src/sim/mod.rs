//! Block connection subsystem
//!
//! Everything that decides which blocks get joined and how. Pure and
//! deterministic:
//! - Time only advances through the `dt` passed in
//! - Pairs are scanned in tracking order
//! - No rendering or platform dependencies; the rigid-body engine is reached
//!   through [`PhysicsWorld`]

pub mod body;
pub mod connector;
pub mod edges;
pub mod graph;
pub mod snap;
pub mod strength;
pub mod world;

pub use body::{BlockBody, BlockKind, BodyId, Shape};
pub use connector::{BlockConnector, Connection, ConnectionEvent, PairState, Proximity};
pub use edges::{Edge, EdgeInfo, edge_midpoint, find_closest_edges};
pub use graph::ConnectionGraph;
pub use snap::{Alignment, SnapTween, calculate_alignment, edge_angle_difference, should_snap_edges};
pub use strength::{JointStrength, base_strength, connection_strength};
pub use world::{JointError, JointHandle, JointSpec, PhysicsWorld, SandboxWorld};
