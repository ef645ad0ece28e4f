//! Running-game detection for the RetroDeck companion
//!
//! Polls for emulator processes, turns their command lines into a game,
//! and publishes a [`CompanionState`] whenever the running game changes.
//! Controller maps are resolved in the background and attached to the
//! state only if that game is still current when they arrive.

mod detector;
mod reconcile;
mod state;
mod watcher;

pub use detector::{Detection, Detector, PollOutcome};
pub use reconcile::GameResolver;
pub use state::CompanionState;
pub use watcher::GameWatcher;
