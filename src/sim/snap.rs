//! Edge alignment snap
//!
//! When two nearly aligned edges come within the connection threshold, the
//! second block is tweened so both edges coincide before the joint is made.

use std::f32::consts::{FRAC_PI_2, PI};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::body::BlockBody;
use super::edges::{Edge, EdgeInfo, edge_midpoint};
use crate::{normalize_angle, rotate};

/// Misalignment between the two edges of `info`, in degrees within [0, 90].
///
/// Each edge angle is its canonical angle plus the body rotation. Opposite
/// and identical edges should be parallel (0), adjacent edges perpendicular,
/// so for those the folded difference is reflected about 90°.
pub fn edge_angle_difference(info: &EdgeInfo) -> f32 {
    let angle_a = info.edge_a.canonical_angle_deg() + info.rotation_a.to_degrees();
    let angle_b = info.edge_b.canonical_angle_deg() + info.rotation_b.to_degrees();

    let raw = (angle_a - angle_b).abs() % 360.0;
    let mut diff = if raw > 180.0 { 360.0 - raw } else { raw };
    if diff > 90.0 {
        diff = 180.0 - diff;
    }
    if info.edge_a.is_adjacent(info.edge_b) {
        diff = (90.0 - diff).abs();
    }
    diff
}

/// True if the edges are close enough to parallel/perpendicular to snap
pub fn should_snap_edges(info: &EdgeInfo, tolerance_deg: f32) -> bool {
    edge_angle_difference(info) < tolerance_deg
}

/// Target transform for the moving block
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    pub pos: Vec2,
    pub rotation: f32,
}

/// Transform that puts `b`'s `edge_b` flush against `a`'s `edge_a`, facing it
pub fn calculate_alignment(a: &BlockBody, b: &BlockBody, edge_a: Edge, edge_b: Edge) -> Alignment {
    let turns = edge_a.index() as f32 - edge_b.index() as f32;
    let rotation = normalize_angle(a.rotation + turns * FRAC_PI_2 + PI);

    let target = edge_midpoint(a, edge_a);
    let offset = rotate(edge_b.local_midpoint(b.half_extents), rotation);

    Alignment {
        pos: target - offset,
        rotation,
    }
}

/// Sine ease-out over [0, 1]
#[inline]
pub fn ease_out_sine(t: f32) -> f32 {
    (t.clamp(0.0, 1.0) * FRAC_PI_2).sin()
}

/// Interpolates a body from its current transform to an [`Alignment`]
#[derive(Debug, Clone)]
pub struct SnapTween {
    from_pos: Vec2,
    from_rotation: f32,
    target: Alignment,
    elapsed: f32,
    duration: f32,
}

impl SnapTween {
    pub fn new(from_pos: Vec2, from_rotation: f32, target: Alignment, duration: f32) -> Self {
        Self {
            from_pos,
            from_rotation,
            target,
            elapsed: 0.0,
            duration,
        }
    }

    fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.elapsed / self.duration).clamp(0.0, 1.0)
        }
    }

    /// Advance by `dt` seconds and return the interpolated transform
    pub fn advance(&mut self, dt: f32) -> Alignment {
        self.elapsed += dt.max(0.0);
        if self.is_finished() {
            return self.target;
        }
        let e = ease_out_sine(self.progress());
        let delta = normalize_angle(self.target.rotation - self.from_rotation);
        Alignment {
            pos: self.from_pos.lerp(self.target.pos, e),
            rotation: normalize_angle(self.from_rotation + delta * e),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.progress() >= 1.0
    }
}
