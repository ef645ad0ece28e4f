//! Controller mapping for the RetroDeck companion
//!
//! Works out what each button on the reference controller does in the game
//! being played, from manual overrides, a versioned cache of generated maps,
//! live generation, the Dolphin GCPad profile or a static platform layout.

mod generator;
mod layouts;
mod position;
mod profile;
mod prompt;
mod resolver;
mod store;

pub use generator::{AnthropicGenerator, TextGenerator};
pub use layouts::{
    GAME_BOY_ADVANCE, GAMECUBE, GENESIS, NES, NINTENDO_64, PLAYSTATION, PLAYSTATION_2, SNES,
    platform_default, supported_platforms,
};
pub use position::{ControllerPositionMap, PositionKey};
pub use profile::{DolphinProfile, ProfileBinding};
pub use prompt::{MIN_GENERATED_KEYS, build_prompt, core_mapping_context, parse_response};
pub use resolver::{ControlResolver, MapSource, Resolved};
pub use store::{GeneratedCache, OverrideStore, read_api_key};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControlsError {
    #[error("Unknown position key: {0}")]
    UnknownPosition(String),

    #[error("No generation credential configured")]
    MissingCredentials,

    #[error("Generation service returned HTTP {0}")]
    Status(u16),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ControlsError {
    /// Worth retrying: rate limits, server errors, timeouts and dropped connections
    pub fn is_transient(&self) -> bool {
        match self {
            ControlsError::Status(status) => *status == 429 || *status >= 500,
            ControlsError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
