//! Connection feedback
//!
//! Turns [`ConnectionEvent`]s into things a renderer and the audio sink can
//! consume: sound cues, a short camera shake, white flashes on the joined
//! blocks, spark bursts, preview lines and permanent connection lines.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::audio::SoundCue;
use crate::sim::{BodyId, ConnectionEvent};

/// How long joined blocks flash white (seconds)
pub const FLASH_DURATION: f32 = 0.1;
/// A preview line disappears if not refreshed within this time (seconds)
pub const PREVIEW_FADE: f32 = 0.1;
/// Connection camera shake
pub const SHAKE_DURATION: f32 = 0.05;
pub const SHAKE_INTENSITY: f32 = 0.002;
/// Spark burst at the joint
pub const SPARK_COUNT: u32 = 10;
pub const SPARK_LIFESPAN: f32 = 0.3;

/// Straight RGBA color, components in [0, 1]
pub type Rgba = [f32; 4];

const PREVIEW_COLOR: [f32; 3] = [0.0, 1.0, 1.0];

/// HSL → RGB, all components in [0, 1]
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> [f32; 3] {
    if s <= 0.0 {
        return [l, l, l];
    }
    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let channel = |mut t: f32| {
        t = t.rem_euclid(1.0);
        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        }
    };
    [channel(h + 1.0 / 3.0), channel(h), channel(h - 1.0 / 3.0)]
}

/// Connection line color: blue for loose joints through to red for rigid ones
pub fn connection_color(stiffness: f32) -> Rgba {
    let hue = 0.6 - stiffness.clamp(0.0, 1.0) * 0.6;
    let [r, g, b] = hsl_to_rgb(hue, 1.0, 0.5);
    [r, g, b, 0.8]
}

/// Alpha of the preview line and its glow
pub fn preview_alpha(strength: f32) -> (f32, f32) {
    let s = strength.clamp(0.0, 1.0);
    (s * 0.7, s * 0.3)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraShake {
    pub duration: f32,
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SparkBurst {
    pub at: Vec2,
    pub count: u32,
    pub lifespan: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    pub from: Vec2,
    pub to: Vec2,
    pub width: f32,
    pub color: Rgba,
}

/// One-shot effects produced by a batch of events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackFrame {
    pub cues: Vec<SoundCue>,
    pub shake: Option<CameraShake>,
    pub sparks: Vec<SparkBurst>,
    /// Blocks that started flashing this frame
    pub flashes: Vec<BodyId>,
}

#[derive(Debug, Clone)]
struct PreviewLine {
    from: Vec2,
    to: Vec2,
    strength: f32,
    ttl: f32,
}

/// Persistent feedback state between ticks
#[derive(Debug, Clone, Default)]
pub struct Feedback {
    previews: BTreeMap<(BodyId, BodyId), PreviewLine>,
    /// Connection lines with their marker at the midpoint
    joints: Vec<(LineSegment, Vec2)>,
    flashes: BTreeMap<BodyId, f32>,
}

impl Feedback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Age timers by `dt`, then apply `events`
    pub fn react(&mut self, events: &[ConnectionEvent], dt: f32) -> FeedbackFrame {
        self.age(dt);

        let mut frame = FeedbackFrame::default();
        for event in events {
            match *event {
                ConnectionEvent::Connected {
                    a,
                    b,
                    contact_a,
                    contact_b,
                    strength,
                    ..
                } => {
                    self.previews.remove(&(a, b));
                    self.previews.remove(&(b, a));

                    let color = connection_color(strength.stiffness);
                    let mid = (contact_a + contact_b) * 0.5;
                    self.joints.push((
                        LineSegment {
                            from: contact_a,
                            to: contact_b,
                            width: 3.0,
                            color,
                        },
                        mid,
                    ));

                    for id in [a, b] {
                        self.flashes.insert(id, FLASH_DURATION);
                        frame.flashes.push(id);
                    }
                    frame.sparks.push(SparkBurst {
                        at: mid,
                        count: SPARK_COUNT,
                        lifespan: SPARK_LIFESPAN,
                    });
                    frame.shake = Some(CameraShake {
                        duration: SHAKE_DURATION,
                        intensity: SHAKE_INTENSITY,
                    });
                    frame.cues.push(SoundCue::Magnet);
                }
                ConnectionEvent::Preview {
                    a,
                    b,
                    contact_a,
                    contact_b,
                    strength,
                } => {
                    self.previews.insert(
                        (a, b),
                        PreviewLine {
                            from: contact_a,
                            to: contact_b,
                            strength,
                            ttl: PREVIEW_FADE,
                        },
                    );
                }
                ConnectionEvent::PreviewCleared { a, b } => {
                    self.previews.remove(&(a, b));
                    self.previews.remove(&(b, a));
                }
                ConnectionEvent::SnapStarted { .. } | ConnectionEvent::JointFailed { .. } => {}
            }
        }
        frame
    }

    fn age(&mut self, dt: f32) {
        let dt = dt.max(0.0);
        self.previews.retain(|_, line| {
            line.ttl -= dt;
            line.ttl > 0.0
        });
        self.flashes.retain(|_, t| {
            *t -= dt;
            *t > 0.0
        });
    }

    /// Blocks still drawn white
    pub fn flashing(&self) -> Vec<BodyId> {
        self.flashes.keys().copied().collect()
    }

    /// Preview lines (two per pair: core and glow)
    pub fn preview_lines(&self) -> Vec<LineSegment> {
        let [r, g, b] = PREVIEW_COLOR;
        let mut lines = Vec::with_capacity(self.previews.len() * 2);
        for line in self.previews.values() {
            let (core, glow) = preview_alpha(line.strength);
            lines.push(LineSegment {
                from: line.from,
                to: line.to,
                width: 2.0,
                color: [r, g, b, core],
            });
            lines.push(LineSegment {
                from: line.from,
                to: line.to,
                width: 4.0,
                color: [r, g, b, glow],
            });
        }
        lines
    }

    /// Permanent connection lines and their midpoint markers
    pub fn connection_lines(&self) -> &[(LineSegment, Vec2)] {
        &self.joints
    }

    pub fn clear(&mut self) {
        self.previews.clear();
        self.joints.clear();
        self.flashes.clear();
    }
}
