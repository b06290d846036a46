//! Round state machine
//!
//! A round runs on a virtual clock: the host passes `dt` each frame, pausing
//! simply stops the countdown. When time is up the blocks lock, the truck is
//! released and ground contacts are counted for a few seconds before the
//! round is scored.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::sim::BodyId;

/// Level chosen on the menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum Difficulty {
    #[default]
    Easy,
    Normal,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard];

    /// Fallen blocks tolerated before the round is lost
    pub fn allowed_falls(self) -> u32 {
        match self {
            Difficulty::Easy => 7,
            Difficulty::Normal => 5,
            Difficulty::Hard => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Normal => "normal",
            Difficulty::Hard => "hard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Lose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    /// Level selection
    Idle,
    Running,
    Paused,
    /// Time is up; the truck is crashing into the tower
    Ending,
    Resolved(Outcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundEvent {
    Started(Difficulty),
    Paused,
    Resumed,
    /// Fired once when the truck engine starts
    TruckWarning,
    /// Countdown reached zero: blocks lock, truck released
    TimeUp,
    Resolved(Outcome),
    BackToMenu,
}

#[derive(Debug, Clone)]
pub struct Round {
    phase: RoundPhase,
    difficulty: Difficulty,
    remaining: f32,
    crash_left: f32,
    warned: bool,
    fallen: BTreeSet<BodyId>,
}

impl Default for Round {
    fn default() -> Self {
        Self::new()
    }
}

impl Round {
    pub fn new() -> Self {
        Self {
            phase: RoundPhase::Idle,
            difficulty: Difficulty::Easy,
            remaining: ROUND_DURATION,
            crash_left: CRASH_DURATION,
            warned: false,
            fallen: BTreeSet::new(),
        }
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    /// Start a new round from the menu. Ignored mid-round.
    pub fn start(&mut self, difficulty: Difficulty) -> Option<RoundEvent> {
        if self.phase != RoundPhase::Idle {
            return None;
        }
        *self = Self {
            phase: RoundPhase::Running,
            difficulty,
            ..Self::new()
        };
        log::info!("Round started ({})", difficulty.as_str());
        Some(RoundEvent::Started(difficulty))
    }

    pub fn pause(&mut self) -> Option<RoundEvent> {
        if self.phase != RoundPhase::Running {
            return None;
        }
        self.phase = RoundPhase::Paused;
        log::info!("Round paused with {:.1}s left", self.remaining);
        Some(RoundEvent::Paused)
    }

    pub fn resume(&mut self) -> Option<RoundEvent> {
        if self.phase != RoundPhase::Paused {
            return None;
        }
        self.phase = RoundPhase::Running;
        log::info!("Round resumed");
        Some(RoundEvent::Resumed)
    }

    /// Advance the clock. Large steps may cross several transitions.
    pub fn tick(&mut self, dt: f32) -> Vec<RoundEvent> {
        let mut events = Vec::new();
        let mut dt = dt.max(0.0);

        if self.phase == RoundPhase::Running {
            self.remaining -= dt;
            if !self.warned && self.remaining <= TRUCK_WARNING_AT {
                self.warned = true;
                events.push(RoundEvent::TruckWarning);
            }
            if self.remaining > 0.0 {
                return events;
            }
            dt = -self.remaining;
            self.remaining = 0.0;
            self.phase = RoundPhase::Ending;
            self.crash_left = CRASH_DURATION;
            log::info!("Time up, truck released");
            events.push(RoundEvent::TimeUp);
        }

        if self.phase == RoundPhase::Ending {
            self.crash_left -= dt;
            if self.crash_left <= 0.0 {
                let outcome = if self.fallen_count() > self.difficulty.allowed_falls() {
                    Outcome::Lose
                } else {
                    Outcome::Win
                };
                self.phase = RoundPhase::Resolved(outcome);
                log::info!(
                    "Round resolved: {:?} ({} fallen, {} allowed)",
                    outcome,
                    self.fallen_count(),
                    self.difficulty.allowed_falls()
                );
                events.push(RoundEvent::Resolved(outcome));
            }
        }

        events
    }

    /// A block touched the ground. Counts once per block, only while the truck runs.
    pub fn record_ground_contact(&mut self, id: BodyId) -> bool {
        if self.phase != RoundPhase::Ending {
            return false;
        }
        let counted = self.fallen.insert(id);
        if counted {
            log::debug!("Block {} fell ({} total)", id, self.fallen.len());
        }
        counted
    }

    /// Leave the result screen (or abandon a round) for level selection
    pub fn return_to_menu(&mut self) -> Option<RoundEvent> {
        if self.phase == RoundPhase::Idle {
            return None;
        }
        *self = Self {
            difficulty: self.difficulty,
            ..Self::new()
        };
        log::info!("Back to level selection");
        Some(RoundEvent::BackToMenu)
    }

    /// Whole seconds left on the countdown, as shown to the player
    pub fn remaining_seconds(&self) -> u32 {
        self.remaining.max(0.0).ceil() as u32
    }

    pub fn fallen_count(&self) -> u32 {
        self.fallen.len() as u32
    }

    /// Blocks accept drags, selection and rotation
    pub fn accepts_block_input(&self) -> bool {
        self.phase == RoundPhase::Running
    }

    /// Connections keep forming while the round is live or the truck runs
    pub fn forms_connections(&self) -> bool {
        matches!(self.phase, RoundPhase::Running | RoundPhase::Ending)
    }

    /// Truck engine should be audible
    pub fn truck_running(&self) -> bool {
        self.warned && matches!(self.phase, RoundPhase::Running | RoundPhase::Ending)
    }
}
