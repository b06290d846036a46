//! Browser bridge
//!
//! The page keeps its own rigid-body engine. Each frame it pushes body poses
//! in, forwards pointer/keyboard events, calls `tick` and applies the world
//! commands (static flags, teleports, joints) returned as JSON together with
//! the overlays to draw. Sound cues are played here through Web Audio.

use std::collections::BTreeMap;

use glam::Vec2;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::audio::WebAudioSink;
use crate::game::{Difficulty, EventKind, Game, GameEvent, KeyCode, ObjectId, RenderState};
use crate::settings::{ScanMode, Settings};
use crate::sim::{BlockBody, BodyId, JointError, JointHandle, JointSpec, PhysicsWorld};

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"Logger already initialised".into());
    }
    log::info!("Stack 'n Roll starting...");
}

/// Change the page must apply to its physics engine
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum WorldCommand {
    Spawn { body: BlockBody },
    Remove { id: BodyId },
    SetStatic { id: BodyId, is_static: bool },
    SetTransform { id: BodyId, x: f32, y: f32, rotation: f32 },
    Joint { handle: JointHandle, spec: JointSpec },
}

/// Mirror of the page's bodies plus a queue of pending commands
#[derive(Debug, Default)]
struct MirrorWorld {
    bodies: BTreeMap<BodyId, BlockBody>,
    commands: Vec<WorldCommand>,
    next_joint: u32,
}

impl PhysicsWorld for MirrorWorld {
    fn body(&self, id: BodyId) -> Option<&BlockBody> {
        self.bodies.get(&id)
    }

    fn insert_body(&mut self, body: BlockBody) {
        self.commands.push(WorldCommand::Spawn { body: body.clone() });
        self.bodies.insert(body.id, body);
    }

    fn remove_body(&mut self, id: BodyId) {
        self.bodies.remove(&id);
        self.commands.push(WorldCommand::Remove { id });
    }

    fn set_static(&mut self, id: BodyId, is_static: bool) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.is_static = is_static;
            self.commands.push(WorldCommand::SetStatic { id, is_static });
        }
    }

    fn set_transform(&mut self, id: BodyId, pos: Vec2, rotation: f32) {
        if let Some(body) = self.bodies.get_mut(&id) {
            body.pos = pos;
            body.rotation = rotation;
            self.commands.push(WorldCommand::SetTransform {
                id,
                x: pos.x,
                y: pos.y,
                rotation,
            });
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
        let handle = JointHandle(self.next_joint);
        self.next_joint += 1;
        self.commands.push(WorldCommand::Joint {
            handle,
            spec: spec.clone(),
        });
        Ok(handle)
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    events: &'a [GameEvent],
    commands: &'a [WorldCommand],
    render: RenderState,
}

#[wasm_bindgen]
pub struct WebGame {
    game: Game,
    world: MirrorWorld,
    audio: WebAudioSink,
}

#[wasm_bindgen]
impl WebGame {
    #[wasm_bindgen(constructor)]
    pub fn new(seed: u64) -> WebGame {
        let mut web = WebGame {
            game: Game::new(Settings::load(), seed),
            world: MirrorWorld::default(),
            audio: WebAudioSink::new(),
        };
        let music = web.game.background_music();
        web.play(&[music]);
        web
    }

    /// New game seeded from the page clock
    pub fn from_clock() -> WebGame {
        Self::new(js_sys::Date::now() as u64)
    }

    /// Resume audio after the first user gesture
    pub fn unlock_audio(&self) {
        self.audio.resume();
    }

    /// Latest pose of a body from the page's engine
    pub fn sync_body(&mut self, id: u32, x: f32, y: f32, rotation: f32) {
        if let Some(body) = self.world.bodies.get_mut(&BodyId(id)) {
            body.pos = Vec2::new(x, y);
            body.rotation = rotation;
        }
    }

    /// `kind`: pointerdown, pointerup, pointerover, pointerout, dragstart, dragend
    pub fn block_event(&mut self, id: u32, kind: &str) -> String {
        let kind = match kind {
            "pointerdown" => EventKind::PointerDown,
            "pointerup" => EventKind::PointerUp,
            "pointerover" => EventKind::PointerOver,
            "pointerout" => EventKind::PointerOut,
            "dragstart" => EventKind::DragStart,
            "dragend" => EventKind::DragEnd,
            other => {
                log::warn!("Unknown block event {}", other);
                return self.flush(Vec::new());
            }
        };
        let events = self.game.handle_input(&mut self.world, ObjectId::Block(BodyId(id)), kind);
        self.flush(events)
    }

    /// `name`: easy, normal, hard, pause, resume, volume, music, continue
    pub fn button(&mut self, name: &str) -> String {
        let target = match name {
            "easy" => ObjectId::LevelButton(Difficulty::Easy),
            "normal" | "medium" => ObjectId::LevelButton(Difficulty::Normal),
            "hard" => ObjectId::LevelButton(Difficulty::Hard),
            "pause" => ObjectId::PauseButton,
            "resume" => ObjectId::ResumeButton,
            "volume" => ObjectId::MainVolumeButton,
            "music" => ObjectId::BackgroundVolumeButton,
            "continue" => ObjectId::ContinueButton,
            other => {
                log::warn!("Unknown button {}", other);
                return self.flush(Vec::new());
            }
        };
        let events = self.game.handle_input(&mut self.world, target, EventKind::PointerUp);
        self.flush(events)
    }

    pub fn key_down(&mut self, key: &str) -> String {
        let events = match KeyCode::from_key(key) {
            Some(code) => self
                .game
                .handle_input(&mut self.world, ObjectId::Keyboard, EventKind::KeyDown(code)),
            None => Vec::new(),
        };
        self.flush(events)
    }

    pub fn drag(&mut self, id: u32, x: f32, y: f32) -> String {
        self.game.drag_block(&mut self.world, BodyId(id), Vec2::new(x, y));
        self.flush(Vec::new())
    }

    pub fn ground_contact(&mut self, id: u32) -> bool {
        self.game.record_ground_contact(BodyId(id))
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.game.round().remaining_seconds()
    }

    pub fn fallen_count(&self) -> u32 {
        self.game.round().fallen_count()
    }

    pub fn tick(&mut self, dt: f32) -> String {
        let events = self.game.tick(&mut self.world, dt);
        self.flush(events)
    }

    /// `mode`: edges or centers, e.g. from a `?scan=` query parameter
    pub fn set_scan_mode(&mut self, mode: &str) -> bool {
        match ScanMode::from_str(mode) {
            Some(mode) => {
                self.game.set_scan_mode(mode);
                true
            }
            None => {
                log::warn!("Unknown scan mode {}", mode);
                false
            }
        }
    }

    pub fn scan_mode(&self) -> String {
        self.game.settings().magnet.scan_mode.as_str().to_string()
    }

    pub fn save_settings(&self) {
        self.game.settings().save();
    }
}

impl WebGame {
    fn play(&mut self, events: &[GameEvent]) {
        for event in events {
            match *event {
                GameEvent::PlaySound { cue, volume } => self.audio.play(cue, volume),
                GameEvent::StopSound(cue) => self.audio.stop(cue),
                GameEvent::LoopVolume { cue, volume } => self.audio.set_loop_volume(cue, volume),
                _ => {}
            }
        }
    }

    /// Play sounds, then hand events, queued commands and overlays to the page
    fn flush(&mut self, events: Vec<GameEvent>) -> String {
        self.play(&events);
        let commands = std::mem::take(&mut self.world.commands);
        let output = FrameOutput {
            events: &events,
            commands: &commands,
            render: self.game.render_state(),
        };
        serde_json::to_string(&output).unwrap_or_else(|err| {
            log::warn!("Could not encode frame: {}", err);
            String::from("{\"events\":[],\"commands\":[]}")
        })
    }
}
