//! State broadcast to the companion screen

use retrodeck_catalog::GameRecord;
use retrodeck_controls::ControllerPositionMap;
use serde::{Deserialize, Serialize};

/// What the companion screen should show.
///
/// Replaced wholesale on every change, never patched in place.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum CompanionState {
    #[default]
    Idle,

    #[serde(rename_all = "camelCase")]
    GameActive {
        game: GameRecord,
        /// Executable of the emulator running the game
        emulator_process: String,
        /// Attached once resolution finishes
        #[serde(default)]
        controller_map: Option<ControllerPositionMap>,
    },

    Error {
        message: String,
    },
}

impl CompanionState {
    pub fn game_active(game: GameRecord, emulator_process: impl Into<String>) -> Self {
        CompanionState::GameActive {
            game,
            emulator_process: emulator_process.into(),
            controller_map: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        CompanionState::Error {
            message: message.into(),
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, CompanionState::Idle)
    }

    pub fn is_game_active(&self) -> bool {
        matches!(self, CompanionState::GameActive { .. })
    }

    pub fn game(&self) -> Option<&GameRecord> {
        match self {
            CompanionState::GameActive { game, .. } => Some(game),
            _ => None,
        }
    }

    pub fn emulator_process(&self) -> Option<&str> {
        match self {
            CompanionState::GameActive {
                emulator_process, ..
            } => Some(emulator_process),
            _ => None,
        }
    }

    pub fn controller_map(&self) -> Option<&ControllerPositionMap> {
        match self {
            CompanionState::GameActive { controller_map, .. } => controller_map.as_ref(),
            _ => None,
        }
    }

    /// Same state with a controller map attached; other variants unchanged
    pub fn with_controller_map(self, map: ControllerPositionMap) -> Self {
        match self {
            CompanionState::GameActive {
                game,
                emulator_process,
                ..
            } => CompanionState::GameActive {
                game,
                emulator_process,
                controller_map: Some(map),
            },
            other => other,
        }
    }
}
