//! Input dispatch table
//!
//! Pointer, drag and keyboard events arrive as `(target, kind)` pairs and are
//! looked up in a table to find the game action they trigger.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::round::Difficulty;
use crate::sim::BodyId;

/// Anything the player can interact with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ObjectId {
    Block(BodyId),
    /// Level buttons on the menu
    LevelButton(Difficulty),
    PauseButton,
    ResumeButton,
    MainVolumeButton,
    BackgroundVolumeButton,
    /// Result screen "continue"
    ContinueButton,
    /// Keys not aimed at any object
    Keyboard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KeyCode {
    /// Rotate selected block by a quarter turn
    E,
    /// Reset selected block rotation
    R,
}

impl KeyCode {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "e" | "E" => Some(KeyCode::E),
            "r" | "R" => Some(KeyCode::R),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    PointerDown,
    PointerUp,
    PointerOver,
    PointerOut,
    DragStart,
    DragEnd,
    KeyDown(KeyCode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    SelectBlock(BodyId),
    ReleaseBlock(BodyId),
    HoverBlock(BodyId, bool),
    BeginDrag(BodyId),
    EndDrag(BodyId),
    RotateSelected,
    ResetSelectedRotation,
    StartRound(Difficulty),
    Pause,
    Resume,
    CycleMainVolume,
    CycleBackgroundVolume,
    ReturnToMenu,
}

#[derive(Debug, Clone, Default)]
pub struct InputRouter {
    table: BTreeMap<(ObjectId, EventKind), Action>,
}

impl InputRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Router with every menu, HUD and keyboard binding registered
    pub fn with_defaults() -> Self {
        let mut router = Self::new();
        for difficulty in Difficulty::ALL {
            router.bind(
                ObjectId::LevelButton(difficulty),
                EventKind::PointerUp,
                Action::StartRound(difficulty),
            );
        }
        router.bind(ObjectId::PauseButton, EventKind::PointerUp, Action::Pause);
        router.bind(ObjectId::ResumeButton, EventKind::PointerUp, Action::Resume);
        router.bind(ObjectId::MainVolumeButton, EventKind::PointerUp, Action::CycleMainVolume);
        router.bind(
            ObjectId::BackgroundVolumeButton,
            EventKind::PointerUp,
            Action::CycleBackgroundVolume,
        );
        router.bind(ObjectId::ContinueButton, EventKind::PointerUp, Action::ReturnToMenu);
        router.bind(ObjectId::Keyboard, EventKind::KeyDown(KeyCode::E), Action::RotateSelected);
        router.bind(
            ObjectId::Keyboard,
            EventKind::KeyDown(KeyCode::R),
            Action::ResetSelectedRotation,
        );
        router
    }

    /// Bind (or rebind) one entry
    pub fn bind(&mut self, target: ObjectId, kind: EventKind, action: Action) {
        self.table.insert((target, kind), action);
    }

    /// Register the pointer and drag handlers of a block
    pub fn bind_block(&mut self, id: BodyId) {
        let target = ObjectId::Block(id);
        self.bind(target, EventKind::PointerDown, Action::SelectBlock(id));
        self.bind(target, EventKind::PointerUp, Action::ReleaseBlock(id));
        self.bind(target, EventKind::PointerOver, Action::HoverBlock(id, true));
        self.bind(target, EventKind::PointerOut, Action::HoverBlock(id, false));
        self.bind(target, EventKind::DragStart, Action::BeginDrag(id));
        self.bind(target, EventKind::DragEnd, Action::EndDrag(id));
    }

    /// Drop the bindings of every block
    pub fn unbind_blocks(&mut self) {
        self.table.retain(|(object, _), _| !matches!(object, ObjectId::Block(_)));
    }

    pub fn route(&self, target: ObjectId, kind: EventKind) -> Option<Action> {
        self.table.get(&(target, kind)).copied()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_route_menu_and_keys() {
        let router = InputRouter::with_defaults();
        assert_eq!(
            router.route(ObjectId::LevelButton(Difficulty::Hard), EventKind::PointerUp),
            Some(Action::StartRound(Difficulty::Hard))
        );
        assert_eq!(
            router.route(ObjectId::Keyboard, EventKind::KeyDown(KeyCode::E)),
            Some(Action::RotateSelected)
        );
        assert_eq!(
            router.route(ObjectId::Keyboard, EventKind::KeyDown(KeyCode::R)),
            Some(Action::ResetSelectedRotation)
        );
        assert_eq!(router.route(ObjectId::PauseButton, EventKind::PointerDown), None);
    }

    #[test]
    fn test_block_bindings() {
        let mut router = InputRouter::new();
        let id = BodyId(4);
        router.bind_block(id);
        assert_eq!(router.len(), 6);
        assert_eq!(
            router.route(ObjectId::Block(id), EventKind::PointerDown),
            Some(Action::SelectBlock(id))
        );
        assert_eq!(
            router.route(ObjectId::Block(id), EventKind::DragEnd),
            Some(Action::EndDrag(id))
        );
        assert_eq!(router.route(ObjectId::Block(BodyId(5)), EventKind::PointerDown), None);
    }

    #[test]
    fn test_unbind_blocks_keeps_hud() {
        let mut router = InputRouter::with_defaults();
        let hud = router.len();
        router.bind_block(BodyId(1));
        router.bind_block(BodyId(2));
        assert_eq!(router.len(), hud + 12);
        router.unbind_blocks();
        assert_eq!(router.len(), hud);
    }

    #[test]
    fn test_key_names() {
        assert_eq!(KeyCode::from_key("e"), Some(KeyCode::E));
        assert_eq!(KeyCode::from_key("R"), Some(KeyCode::R));
        assert_eq!(KeyCode::from_key("q"), None);
    }
}
