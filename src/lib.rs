//! Stack 'n Roll - magnetic block stacking against the clock
//!
//! Core modules:
//! - `sim`: Block connection subsystem (proximity scan, connection graph, joints, snapping)
//! - `game`: Round state machine, block catalog, input dispatch, composition root
//! - `audio`: Volume model and sound cues (Web Audio sink on wasm32)
//! - `feedback`: Turns connection events into cues, flashes and shakes
//! - `settings`: Player preferences and magnet tuning

pub mod audio;
pub mod feedback;
pub mod game;
pub mod settings;
pub mod sim;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use game::{Difficulty, Game};
pub use settings::{MagnetConfig, ScanMode, Settings};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// World bounds (pixels)
    pub const WORLD_WIDTH: f32 = 1200.0;
    pub const WORLD_HEIGHT: f32 = 800.0;

    /// Distance at which two blocks lock together
    pub const CONNECTION_THRESHOLD: f32 = 20.0;
    /// Distance at which a connection preview starts showing
    pub const ATTRACTION_THRESHOLD: f32 = 30.0;

    /// Edge alignment tolerance for the snap (degrees)
    pub const SNAP_TOLERANCE_DEG: f32 = 10.0;
    /// Snap tween duration (seconds)
    pub const SNAP_DURATION: f32 = 0.1;

    /// Stiffness multiplier applied when two blocks of different kinds connect
    pub const KIND_MISMATCH_FACTOR: f32 = 0.7;

    /// Round length (seconds)
    pub const ROUND_DURATION: f32 = 60.0;
    /// Truck engine starts when this many seconds remain
    pub const TRUCK_WARNING_AT: f32 = 5.0;
    /// How long the truck runs before the round is scored (seconds)
    pub const CRASH_DURATION: f32 = 3.0;

    /// Block defaults
    pub const BLOCK_SIZE: f32 = 64.0;
    pub const BLOCK_FRICTION: f32 = 0.3;
    pub const BLOCK_MASS: f32 = 1.0;
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    if !angle.is_finite() {
        return 0.0;
    }
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Rotate a vector by `angle` radians
#[inline]
pub fn rotate(v: Vec2, angle: f32) -> Vec2 {
    Vec2::from_angle(angle).rotate(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_normalize_angle_wraps() {
        assert!((normalize_angle(3.0 * PI).abs() - PI).abs() < 1e-5);
        assert!((normalize_angle(-FRAC_PI_2) + FRAC_PI_2).abs() < 1e-6);
        assert!((normalize_angle(2.5 * PI) - FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let v = rotate(Vec2::new(1.0, 0.0), FRAC_PI_2);
        assert!(v.x.abs() < 1e-6);
        assert!((v.y - 1.0).abs() < 1e-6);
    }
}
