//! Game composition root
//!
//! `Game` owns every piece of round-scoped state and is driven by the host:
//! input events go through [`Game::handle_input`], physics contacts through
//! [`Game::record_ground_contact`] and time through [`Game::tick`]. Each call
//! returns the [`GameEvent`]s the host should render or play.

pub mod blocks;
pub mod input;
pub mod round;

pub use blocks::{BlockColor, BlockMaterial, SpawnedBlock, spawn_blocks, texture_key};
pub use input::{Action, EventKind, InputRouter, KeyCode, ObjectId};
pub use round::{Difficulty, Outcome, Round, RoundEvent, RoundPhase};

use std::f32::consts::FRAC_PI_2;

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::audio::{SoundCue, SoundMixer};
use crate::consts::{WORLD_HEIGHT, WORLD_WIDTH};
use crate::feedback::{CameraShake, Feedback, FeedbackFrame, LineSegment, SparkBurst};
use crate::normalize_angle;
use crate::settings::{ScanMode, Settings};
use crate::sim::{BlockConnector, BodyId, Connection, ConnectionEvent, PhysicsWorld};

/// Output of the game for the host to act on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    Round(RoundEvent),
    Connection(ConnectionEvent),
    /// Start a one-shot cue, or (re)start a loop
    PlaySound { cue: SoundCue, volume: f32 },
    StopSound(SoundCue),
    /// A running loop's volume changed
    LoopVolume { cue: SoundCue, volume: f32 },
    Shake(CameraShake),
    Sparks(SparkBurst),
    Flash(BodyId),
    Selected(Option<BodyId>),
    Hover { id: BodyId, over: bool },
}

/// Persistent overlays the host redraws every frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderState {
    /// Core and glow line per previewed pair
    pub previews: Vec<LineSegment>,
    /// Connection lines with their midpoint marker
    pub connections: Vec<(LineSegment, Vec2)>,
    pub joints: Vec<Connection>,
    pub flashing: Vec<BodyId>,
    /// The selected block and everything joined to it
    pub selected_group: Vec<BodyId>,
}

pub struct Game {
    settings: Settings,
    round: Round,
    connector: BlockConnector,
    feedback: Feedback,
    mixer: SoundMixer,
    router: InputRouter,
    rng: Pcg32,
    blocks: Vec<SpawnedBlock>,
    selected: Option<BodyId>,
    hovered: Option<BodyId>,
    next_body_id: u32,
}

impl Game {
    /// Block ids are allocated from 1 upward, fresh for every round
    pub fn new(settings: Settings, seed: u64) -> Self {
        Self {
            connector: BlockConnector::new(settings.magnet.clone()),
            mixer: SoundMixer::new(settings.main_volume, settings.background_volume),
            settings,
            round: Round::new(),
            feedback: Feedback::new(),
            router: InputRouter::with_defaults(),
            rng: Pcg32::seed_from_u64(seed),
            blocks: Vec::new(),
            selected: None,
            hovered: None,
            next_body_id: 1,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn round(&self) -> &Round {
        &self.round
    }

    pub fn connector(&self) -> &BlockConnector {
        &self.connector
    }

    pub fn render_state(&self) -> RenderState {
        let selected_group = self
            .selected
            .map(|id| self.connector.graph().component(id).into_iter().collect())
            .unwrap_or_default();
        RenderState {
            previews: self.feedback.preview_lines(),
            connections: self.feedback.connection_lines().to_vec(),
            joints: self.connector.connections().to_vec(),
            flashing: self.feedback.flashing(),
            selected_group,
        }
    }

    /// Switch how block distance is measured; existing joints are kept
    pub fn set_scan_mode(&mut self, mode: ScanMode) {
        if self.settings.magnet.scan_mode == mode {
            return;
        }
        log::info!("Scan mode: {}", mode.as_str());
        self.settings.magnet.scan_mode = mode;
        self.connector.set_config(self.settings.magnet.clone());
        self.settings.save();
    }

    pub fn mixer(&self) -> &SoundMixer {
        &self.mixer
    }

    /// Blocks of the current round as spawned (live poses are in the world)
    pub fn blocks(&self) -> &[SpawnedBlock] {
        &self.blocks
    }

    pub fn selected(&self) -> Option<BodyId> {
        self.selected
    }

    pub fn hovered(&self) -> Option<BodyId> {
        self.hovered
    }

    fn sound(&self, cue: SoundCue) -> GameEvent {
        GameEvent::PlaySound {
            cue,
            volume: self.mixer.cue_volume(cue),
        }
    }

    /// Music request for the host to issue once audio is unlocked
    pub fn background_music(&self) -> GameEvent {
        self.sound(SoundCue::Background)
    }

    fn is_block(&self, id: BodyId) -> bool {
        self.blocks.iter().any(|b| b.body.id == id)
    }

    /// Look up the action bound to `(target, kind)` and apply it
    pub fn handle_input<W: PhysicsWorld>(&mut self, world: &mut W, target: ObjectId, kind: EventKind) -> Vec<GameEvent> {
        match self.router.route(target, kind) {
            Some(action) => self.apply(world, action),
            None => {
                log::trace!("Unbound input {:?} on {:?}", kind, target);
                Vec::new()
            }
        }
    }

    pub fn apply<W: PhysicsWorld>(&mut self, world: &mut W, action: Action) -> Vec<GameEvent> {
        let live = self.round.accepts_block_input();
        let mut events = Vec::new();

        match action {
            Action::StartRound(difficulty) => return self.start_round(world, difficulty),
            Action::ReturnToMenu => return self.return_to_menu(world),
            Action::Pause => {
                let truck = self.round.truck_running();
                if let Some(ev) = self.round.pause() {
                    events.push(GameEvent::Round(ev));
                    if truck {
                        events.push(GameEvent::StopSound(SoundCue::Truck));
                    }
                }
            }
            Action::Resume => {
                if let Some(ev) = self.round.resume() {
                    events.push(GameEvent::Round(ev));
                    if self.round.truck_running() {
                        events.push(self.sound(SoundCue::Truck));
                    }
                }
            }
            Action::CycleMainVolume => {
                self.settings.main_volume = self.mixer.cycle_main();
                self.settings.save();
                self.push_loop_volumes(&mut events);
            }
            Action::CycleBackgroundVolume => {
                self.settings.background_volume = self.mixer.cycle_background();
                self.settings.save();
                self.push_loop_volumes(&mut events);
            }
            Action::SelectBlock(id) if live => {
                self.selected = Some(id);
                events.push(GameEvent::Selected(Some(id)));
                events.push(self.sound(SoundCue::Take));
            }
            Action::ReleaseBlock(_) if live => {
                if self.selected.is_some() {
                    events.push(self.sound(SoundCue::Pop));
                }
            }
            Action::HoverBlock(id, over) if live => {
                self.hovered = if over { Some(id) } else { None };
                events.push(GameEvent::Hover { id, over });
            }
            Action::BeginDrag(id) if live => {
                self.connector.begin_drag(id);
                world.set_static(id, true);
            }
            Action::EndDrag(id) => {
                if self.connector.is_dragged(id) {
                    self.connector.end_drag(id);
                    world.set_static(id, false);
                    events.push(self.sound(SoundCue::Pop));
                }
            }
            Action::RotateSelected if live => {
                self.rotate_selected(world, |rotation| normalize_angle(rotation + FRAC_PI_2));
            }
            Action::ResetSelectedRotation if live => {
                self.rotate_selected(world, |_| 0.0);
            }
            _ => log::debug!("Ignoring {:?} in {:?}", action, self.round.phase()),
        }
        events
    }

    fn rotate_selected<W: PhysicsWorld>(&mut self, world: &mut W, f: impl Fn(f32) -> f32) {
        let Some(id) = self.selected else { return };
        let Some((pos, rotation)) = world.body(id).map(|b| (b.pos, f(b.rotation))) else {
            return;
        };
        world.set_transform(id, pos, rotation);
    }

    fn push_loop_volumes(&self, events: &mut Vec<GameEvent>) {
        let mut loops = vec![SoundCue::Background];
        if self.round.truck_running() {
            loops.push(SoundCue::Truck);
        }
        for cue in loops {
            events.push(GameEvent::LoopVolume {
                cue,
                volume: self.mixer.cue_volume(cue),
            });
        }
    }

    /// Spawn the blocks and start the countdown. Ignored mid-round.
    pub fn start_round<W: PhysicsWorld>(&mut self, world: &mut W, difficulty: Difficulty) -> Vec<GameEvent> {
        let Some(started) = self.round.start(difficulty) else {
            return Vec::new();
        };

        self.settings.difficulty = difficulty;
        self.connector = BlockConnector::new(self.settings.magnet.clone());
        self.blocks = spawn_blocks(&mut self.rng, self.next_body_id);
        self.next_body_id += self.blocks.len() as u32;

        for block in &self.blocks {
            world.insert_body(block.body.clone());
            self.connector.track(block.body.id);
            self.router.bind_block(block.body.id);
        }
        log::info!("Spawned {} blocks", self.blocks.len());

        vec![self.sound(SoundCue::Pop), GameEvent::Round(started)]
    }

    /// Follow the pointer with a dragged block, kept inside the world bounds
    pub fn drag_block<W: PhysicsWorld>(&mut self, world: &mut W, id: BodyId, pos: Vec2) -> bool {
        if !self.round.accepts_block_input() || !self.connector.is_dragged(id) {
            return false;
        }
        let Some(rotation) = world.body(id).map(|b| b.rotation) else {
            return false;
        };
        let pos = pos.clamp(Vec2::ZERO, Vec2::new(WORLD_WIDTH, WORLD_HEIGHT));
        world.set_transform(id, pos, rotation);
        true
    }

    /// Physics reported a block touching the ground
    pub fn record_ground_contact(&mut self, id: BodyId) -> bool {
        self.is_block(id) && self.round.record_ground_contact(id)
    }

    /// Advance the game by `dt` seconds
    pub fn tick<W: PhysicsWorld>(&mut self, world: &mut W, dt: f32) -> Vec<GameEvent> {
        let mut events = Vec::new();

        let (connection_events, live_dt) = if self.round.forms_connections() {
            (self.connector.form_connections(world, dt), dt)
        } else {
            (Vec::new(), 0.0)
        };
        let frame = self.feedback.react(&connection_events, live_dt);
        events.extend(connection_events.into_iter().map(GameEvent::Connection));
        self.push_frame(frame, &mut events);

        for ev in self.round.tick(dt) {
            events.push(GameEvent::Round(ev));
            match ev {
                RoundEvent::TruckWarning => events.push(self.sound(SoundCue::Truck)),
                RoundEvent::TimeUp => self.lock_blocks(world),
                RoundEvent::Resolved(outcome) => {
                    events.push(GameEvent::StopSound(SoundCue::Truck));
                    events.push(GameEvent::StopSound(SoundCue::Background));
                    let cue = match outcome {
                        Outcome::Win => SoundCue::Win,
                        Outcome::Lose => SoundCue::Lose,
                    };
                    events.push(self.sound(cue));
                }
                _ => {}
            }
        }
        events
    }

    fn push_frame(&self, frame: FeedbackFrame, events: &mut Vec<GameEvent>) {
        for cue in frame.cues {
            events.push(self.sound(cue));
        }
        if let Some(shake) = frame.shake {
            events.push(GameEvent::Shake(shake));
        }
        events.extend(frame.sparks.into_iter().map(GameEvent::Sparks));
        events.extend(frame.flashes.into_iter().map(GameEvent::Flash));
    }

    /// Time is up: drop anything held and stop listening to blocks
    fn lock_blocks<W: PhysicsWorld>(&mut self, world: &mut W) {
        for block in &self.blocks {
            if self.connector.is_dragged(block.body.id) {
                world.set_static(block.body.id, false);
            }
        }
        self.connector.end_all_drags();
        self.router.unbind_blocks();
        self.selected = None;
        self.hovered = None;
    }

    /// Clear the round and go back to level selection
    pub fn return_to_menu<W: PhysicsWorld>(&mut self, world: &mut W) -> Vec<GameEvent> {
        let Some(ev) = self.round.return_to_menu() else {
            return Vec::new();
        };
        for block in self.blocks.drain(..) {
            world.remove_body(block.body.id);
        }
        self.connector.clear();
        self.feedback.clear();
        self.router.unbind_blocks();
        self.selected = None;
        self.hovered = None;

        vec![
            GameEvent::Round(ev),
            GameEvent::StopSound(SoundCue::Truck),
            self.background_music(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::VolumeLevel;
    use crate::sim::SandboxWorld;

    fn started(difficulty: Difficulty) -> (Game, SandboxWorld) {
        let mut game = Game::new(Settings::default(), 11);
        let mut world = SandboxWorld::new();
        game.start_round(&mut world, difficulty);
        spread(&game, &mut world);
        (game, world)
    }

    /// Move every block far from the others
    fn spread(game: &Game, world: &mut SandboxWorld) {
        for (i, block) in game.blocks().iter().enumerate() {
            world.set_transform(block.body.id, Vec2::new(i as f32 * 300.0, 5000.0), 0.0);
        }
    }

    fn ids(game: &Game) -> (BodyId, BodyId) {
        (game.blocks()[0].body.id, game.blocks()[1].body.id)
    }

    fn run(game: &mut Game, world: &mut SandboxWorld, frames: usize) -> Vec<GameEvent> {
        (0..frames).flat_map(|_| game.tick(world, 1.0 / 60.0)).collect()
    }

    #[test]
    fn test_start_round_spawns_and_tracks() {
        let mut game = Game::new(Settings::default(), 1);
        let mut world = SandboxWorld::new();
        let events = game.handle_input(
            &mut world,
            ObjectId::LevelButton(Difficulty::Normal),
            EventKind::PointerUp,
        );
        assert!(events.contains(&GameEvent::Round(RoundEvent::Started(Difficulty::Normal))));
        assert_eq!(game.blocks().len(), 18);
        assert_eq!(world.bodies().count(), 18);
        assert_eq!(game.connector().tracked().len(), 18);
        assert_eq!(game.settings().difficulty, Difficulty::Normal);

        // Second start is ignored mid-round
        assert!(game.start_round(&mut world, Difficulty::Hard).is_empty());
        assert_eq!(world.bodies().count(), 18);
    }

    #[test]
    fn test_drag_moves_and_restores_static() {
        let (mut game, mut world) = started(Difficulty::Easy);
        let (a, _) = ids(&game);
        let target = ObjectId::Block(a);

        game.handle_input(&mut world, target, EventKind::DragStart);
        assert!(world.body(a).unwrap().is_static);
        assert!(game.drag_block(&mut world, a, Vec2::new(10.0, 20.0)));
        assert_eq!(world.body(a).unwrap().pos, Vec2::new(10.0, 20.0));
        game.drag_block(&mut world, a, Vec2::new(-50.0, 9000.0));
        assert_eq!(world.body(a).unwrap().pos, Vec2::new(0.0, 800.0));

        let events = game.handle_input(&mut world, target, EventKind::DragEnd);
        assert!(!world.body(a).unwrap().is_static);
        assert!(matches!(events[0], GameEvent::PlaySound { cue: SoundCue::Pop, .. }));
        assert!(!game.drag_block(&mut world, a, Vec2::ZERO));
    }

    #[test]
    fn test_rotate_and_reset_selected() {
        let (mut game, mut world) = started(Difficulty::Easy);
        let (a, _) = ids(&game);
        let key = |k| EventKind::KeyDown(k);

        // Nothing selected yet
        game.handle_input(&mut world, ObjectId::Keyboard, key(KeyCode::E));
        assert_eq!(world.body(a).unwrap().rotation, 0.0);

        let events = game.handle_input(&mut world, ObjectId::Block(a), EventKind::PointerDown);
        assert_eq!(events[0], GameEvent::Selected(Some(a)));
        game.handle_input(&mut world, ObjectId::Keyboard, key(KeyCode::E));
        assert!((world.body(a).unwrap().rotation - FRAC_PI_2).abs() < 1e-6);

        game.handle_input(&mut world, ObjectId::Keyboard, key(KeyCode::R));
        assert_eq!(world.body(a).unwrap().rotation, 0.0);
    }

    #[test]
    fn test_adjacent_blocks_snap_then_connect() {
        let (mut game, mut world) = started(Difficulty::Easy);
        let (a, b) = ids(&game);
        world.set_transform(b, Vec2::new(69.0, 5000.0), 0.0);

        let first = game.tick(&mut world, 1.0 / 60.0);
        assert!(first.contains(&GameEvent::Connection(ConnectionEvent::SnapStarted { a, b })));

        let events = run(&mut game, &mut world, 10);
        assert!(game.connector().are_blocks_connected(a, b));
        assert_eq!(world.joint_count(), 1);
        assert!(events.iter().any(|e| matches!(e, GameEvent::PlaySound { cue: SoundCue::Magnet, .. })));
        assert!(events.iter().any(|e| matches!(e, GameEvent::Shake(_))));
        assert!(events.contains(&GameEvent::Flash(a)));
        assert!(events.contains(&GameEvent::Flash(b)));
        assert!((world.body(b).unwrap().pos - Vec2::new(64.0, 5000.0)).length() < 1e-3);
    }

    #[test]
    fn test_drag_during_snap_prevents_joint() {
        let (mut game, mut world) = started(Difficulty::Easy);
        let (a, b) = ids(&game);
        world.set_transform(b, Vec2::new(69.0, 5000.0), 0.0);

        let first = game.tick(&mut world, 1.0 / 60.0);
        assert!(first.contains(&GameEvent::Connection(ConnectionEvent::SnapStarted { a, b })));
        game.handle_input(&mut world, ObjectId::Block(a), EventKind::DragStart);

        run(&mut game, &mut world, 10);
        assert!(!game.connector().are_blocks_connected(a, b));
        assert_eq!(world.joint_count(), 0);
        assert!(world.body(a).unwrap().is_static);
        assert!(!world.body(b).unwrap().is_static);
    }

    #[test]
    fn test_render_state_tracks_feedback() {
        let (mut game, mut world) = started(Difficulty::Easy);
        let (a, b) = ids(&game);
        let c = game.blocks()[2].body.id;
        world.set_transform(b, Vec2::new(64.0, 5000.0), 0.0);
        world.set_transform(c, Vec2::new(153.0, 5000.0), 0.0);
        game.handle_input(&mut world, ObjectId::Block(a), EventKind::PointerDown);

        for _ in 0..20 {
            if game.connector().are_blocks_connected(a, b) {
                break;
            }
            game.tick(&mut world, 1.0 / 60.0);
        }
        let state = game.render_state();
        assert_eq!(state.joints.len(), 1);
        assert_eq!(state.connections.len(), 1);
        assert_eq!(
            state.connections[0].0.color,
            crate::feedback::connection_color(state.joints[0].strength.stiffness)
        );
        assert_eq!(state.flashing, vec![a, b]);
        assert_eq!(state.selected_group, vec![a, b]);
        // c sits 25px right of b
        assert_eq!(state.previews.len(), 2);

        run(&mut game, &mut world, 10);
        let state = game.render_state();
        assert!(state.flashing.is_empty());
        assert_eq!(state.connections.len(), 1);
    }

    #[test]
    fn test_scan_mode_switch_applies_to_connector() {
        let (mut game, mut world) = started(Difficulty::Easy);
        let (a, b) = ids(&game);
        game.set_scan_mode(ScanMode::Centers);
        assert_eq!(game.connector().config().scan_mode, ScanMode::Centers);
        assert_eq!(game.settings().magnet.scan_mode, ScanMode::Centers);

        // 69px apart: close edges, far centers
        world.set_transform(b, Vec2::new(69.0, 5000.0), 0.0);
        run(&mut game, &mut world, 3);
        assert!(!game.connector().are_blocks_connected(a, b));

        game.set_scan_mode(ScanMode::Edges);
        run(&mut game, &mut world, 10);
        assert!(game.connector().are_blocks_connected(a, b));
    }

    #[test]
    fn test_no_connections_while_paused() {
        let (mut game, mut world) = started(Difficulty::Easy);
        let (a, b) = ids(&game);
        game.handle_input(&mut world, ObjectId::PauseButton, EventKind::PointerUp);
        world.set_transform(b, Vec2::new(64.0, 5000.0), 0.0);

        let events = run(&mut game, &mut world, 30);
        assert!(events.is_empty());
        assert!(!game.connector().are_blocks_connected(a, b));
        assert_eq!(game.round().remaining_seconds(), 60);

        game.handle_input(&mut world, ObjectId::ResumeButton, EventKind::PointerUp);
        run(&mut game, &mut world, 10);
        assert!(game.connector().are_blocks_connected(a, b));
    }

    #[test]
    fn test_full_round_lost() {
        let (mut game, mut world) = started(Difficulty::Hard);
        let (a, _) = ids(&game);
        game.handle_input(&mut world, ObjectId::Block(a), EventKind::DragStart);

        let events = game.tick(&mut world, 60.0);
        assert!(events.contains(&GameEvent::Round(RoundEvent::TimeUp)));
        assert!(events.iter().any(|e| matches!(e, GameEvent::PlaySound { cue: SoundCue::Truck, .. })));
        // Held block was dropped and blocks no longer respond
        assert!(!world.body(a).unwrap().is_static);
        assert!(game.handle_input(&mut world, ObjectId::Block(a), EventKind::PointerDown).is_empty());

        let fallen: Vec<BodyId> = game.blocks().iter().take(4).map(|b| b.body.id).collect();
        for id in &fallen {
            assert!(game.record_ground_contact(*id));
        }
        assert!(!game.record_ground_contact(BodyId(999)));

        let events = game.tick(&mut world, 3.0);
        assert!(events.contains(&GameEvent::Round(RoundEvent::Resolved(Outcome::Lose))));
        assert!(events.iter().any(|e| matches!(e, GameEvent::PlaySound { cue: SoundCue::Lose, .. })));

        let events = game.handle_input(&mut world, ObjectId::ContinueButton, EventKind::PointerUp);
        assert_eq!(events[0], GameEvent::Round(RoundEvent::BackToMenu));
        assert_eq!(world.bodies().count(), 0);
        assert!(game.blocks().is_empty());
        assert_eq!(game.round().phase(), RoundPhase::Idle);
    }

    #[test]
    fn test_next_round_uses_fresh_ids() {
        let (mut game, mut world) = started(Difficulty::Easy);
        let first = game.blocks()[0].body.id;
        game.return_to_menu(&mut world);
        game.start_round(&mut world, Difficulty::Easy);
        assert!(game.blocks()[0].body.id > first);
        assert_eq!(world.bodies().count(), 18);
    }

    #[test]
    fn test_volume_buttons_cycle_and_report_loops() {
        let mut game = Game::new(Settings::default(), 1);
        let mut world = SandboxWorld::new();

        let events = game.handle_input(&mut world, ObjectId::BackgroundVolumeButton, EventKind::PointerUp);
        assert_eq!(game.mixer().background, VolumeLevel::Mute);
        assert_eq!(game.settings().background_volume, VolumeLevel::Mute);
        assert_eq!(
            events,
            vec![GameEvent::LoopVolume {
                cue: SoundCue::Background,
                volume: 0.0
            }]
        );

        game.handle_input(&mut world, ObjectId::MainVolumeButton, EventKind::PointerUp);
        assert_eq!(game.mixer().main, VolumeLevel::Mute);
        match game.background_music() {
            GameEvent::PlaySound { volume, .. } => assert_eq!(volume, 0.0),
            other => panic!("unexpected {:?}", other),
        }
    }
}
