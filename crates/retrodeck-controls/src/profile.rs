//! Dolphin GameCube controller profile reader
//!
//! Profiles bind GameCube buttons to host gamepad inputs, e.g.
//! `Buttons/A = `Button S``. Host inputs use compass names for the face
//! buttons, which map onto our positions directly.

use crate::position::{ControllerPositionMap, PositionKey};
use std::path::Path;

/// Fewer bindings than this and the profile tells us nothing useful
pub const MIN_BINDINGS: usize = 3;

/// INI key to GameCube button name
const GC_INPUTS: &[(&str, &str)] = &[
    ("Buttons/A", "A"),
    ("Buttons/B", "B"),
    ("Buttons/X", "X"),
    ("Buttons/Y", "Y"),
    ("Buttons/Z", "Z"),
    ("Buttons/Start", "Start"),
    ("Triggers/L", "L"),
    ("Triggers/R", "R"),
];

/// Host gamepad input to position
const HOST_INPUTS: &[(&str, PositionKey)] = &[
    ("Button S", PositionKey::FaceBottom),
    ("Button W", PositionKey::FaceLeft),
    ("Button N", PositionKey::FaceTop),
    ("Button E", PositionKey::FaceRight),
    ("Shoulder L", PositionKey::ShoulderL),
    ("Shoulder R", PositionKey::ShoulderR),
    ("Trigger L", PositionKey::TriggerL),
    ("Trigger R", PositionKey::TriggerR),
    ("Start", PositionKey::Start),
    ("Back", PositionKey::Select),
    ("Thumb L", PositionKey::L3),
    ("Thumb R", PositionKey::R3),
];

/// Analog inputs Dolphin always binds the same way
const FIXED_BINDINGS: &[(&str, PositionKey)] = &[
    ("Stick", PositionKey::LeftStick),
    ("C-Stick", PositionKey::RightStick),
    ("D-Pad", PositionKey::Dpad),
];

/// One GameCube button bound to a position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileBinding {
    pub gc_button: &'static str,
    pub position: PositionKey,
}

/// Parsed GCPad profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DolphinProfile {
    pub file_name: String,
    pub bindings: Vec<ProfileBinding>,
}

impl DolphinProfile {
    /// Parse profile contents. `None` below [`MIN_BINDINGS`] button bindings.
    pub fn parse(file_name: &str, contents: &str) -> Option<Self> {
        let bindings: Vec<ProfileBinding> = contents
            .lines()
            .filter_map(|line| {
                let (key, value) = line.trim().split_once('=')?;
                let gc_button = GC_INPUTS
                    .iter()
                    .find(|(ini_key, _)| *ini_key == key.trim())
                    .map(|(_, name)| *name)?;

                let host = value.trim().trim_matches('`').trim();
                let position = HOST_INPUTS
                    .iter()
                    .find(|(name, _)| *name == host)
                    .map(|(_, position)| *position)?;

                Some(ProfileBinding {
                    gc_button,
                    position,
                })
            })
            .collect();

        if bindings.len() < MIN_BINDINGS {
            tracing::debug!(
                "Profile {} has {} usable bindings, ignoring",
                file_name,
                bindings.len()
            );
            return None;
        }

        Some(Self {
            file_name: file_name.to_string(),
            bindings,
        })
    }

    /// Read the first `*.ini` (by name) in a GCPad profile directory
    pub fn read_dir(dir: &Path) -> Option<Self> {
        let mut files: Vec<_> = std::fs::read_dir(dir)
            .map_err(|e| tracing::debug!("No Dolphin profiles at {}: {}", dir.display(), e))
            .ok()?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("ini"))
            })
            .collect();
        files.sort();

        let path = files.into_iter().next()?;
        let file_name = path.file_name()?.to_string_lossy().to_string();
        let contents = std::fs::read_to_string(&path)
            .map_err(|e| tracing::warn!("Could not read Dolphin profile {}: {}", path.display(), e))
            .ok()?;

        tracing::info!("Reading Dolphin GCPad profile: {}", file_name);
        Self::parse(&file_name, &contents)
    }

    /// Mapping lines for the generation prompt
    pub fn context(&self) -> String {
        let mut lines = vec![format!(
            "Dolphin controller mapping (read from {}):",
            self.file_name
        )];

        for binding in &self.bindings {
            lines.push(format!(
                "- GC {} → {}",
                binding.gc_button,
                binding.position.friendly_name()
            ));
        }
        for (gc_input, position) in FIXED_BINDINGS {
            lines.push(format!("- GC {} → {}", gc_input, position));
        }

        lines.join("\n")
    }

    /// Positions labelled with the GameCube button they trigger
    pub fn position_map(&self) -> ControllerPositionMap {
        self.bindings
            .iter()
            .map(|binding| (binding.position, binding.gc_button))
            .chain(
                FIXED_BINDINGS
                    .iter()
                    .map(|(gc_input, position)| (*position, *gc_input)),
            )
            .collect()
    }
}
