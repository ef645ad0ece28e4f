//! Static per-platform layouts
//!
//! Each position is labelled with the original console's button name, as
//! the emulator maps it. Shown when nothing game-specific is available.

use crate::position::{ControllerPositionMap, PositionKey};

pub const NINTENDO_64: &str = "Nintendo 64";
pub const PLAYSTATION: &str = "Sony Playstation";
pub const PLAYSTATION_2: &str = "Sony Playstation 2";
pub const GAMECUBE: &str = "Nintendo GameCube";
pub const SNES: &str = "Super Nintendo Entertainment System";
pub const NES: &str = "Nintendo Entertainment System";
pub const GENESIS: &str = "Sega Genesis";
pub const GAME_BOY_ADVANCE: &str = "Nintendo Game Boy Advance";

use PositionKey::*;

const LAYOUTS: &[(&str, &[(PositionKey, &str)])] = &[
    (
        NINTENDO_64,
        &[
            (FaceBottom, "A"),
            (FaceLeft, "B"),
            (TriggerL, "Z"),
            (ShoulderL, "L"),
            (ShoulderR, "R"),
            (Dpad, "D-Pad"),
            (LeftStick, "Stick"),
            (RightStick, "C"),
            (Start, "Start"),
        ],
    ),
    (
        PLAYSTATION_2,
        &[
            (FaceBottom, "×"),
            (FaceRight, "○"),
            (FaceLeft, "□"),
            (FaceTop, "△"),
            (ShoulderL, "L1"),
            (ShoulderR, "R1"),
            (TriggerL, "L2"),
            (TriggerR, "R2"),
            (L3, "L3"),
            (R3, "R3"),
            (Dpad, "D-Pad"),
            (LeftStick, "L Stick"),
            (RightStick, "R Stick"),
            (Start, "Start"),
            (Select, "Select"),
        ],
    ),
    (
        GAMECUBE,
        &[
            (FaceBottom, "A"),
            (FaceLeft, "B"),
            (FaceTop, "X"),
            (FaceRight, "Y"),
            (ShoulderR, "Z"),
            (TriggerL, "L"),
            (TriggerR, "R"),
            (Dpad, "D-Pad"),
            (LeftStick, "Stick"),
            (RightStick, "C-Stick"),
            (Start, "Start"),
        ],
    ),
    (
        SNES,
        &[
            (FaceRight, "A"),
            (FaceBottom, "B"),
            (FaceTop, "X"),
            (FaceLeft, "Y"),
            (ShoulderL, "L"),
            (ShoulderR, "R"),
            (Dpad, "D-Pad"),
            (Start, "Start"),
            (Select, "Select"),
        ],
    ),
    (
        NES,
        &[
            (FaceRight, "A"),
            (FaceBottom, "B"),
            (Dpad, "D-Pad"),
            (Start, "Start"),
            (Select, "Select"),
        ],
    ),
    (
        GENESIS,
        &[
            (FaceLeft, "A"),
            (FaceBottom, "B"),
            (FaceRight, "C"),
            (ShoulderL, "X"),
            (FaceTop, "Y"),
            (ShoulderR, "Z"),
            (Dpad, "D-Pad"),
            (Start, "Start"),
            (Select, "Mode"),
        ],
    ),
    (
        PLAYSTATION,
        &[
            (FaceBottom, "×"),
            (FaceRight, "○"),
            (FaceLeft, "□"),
            (FaceTop, "△"),
            (ShoulderL, "L1"),
            (ShoulderR, "R1"),
            (TriggerL, "L2"),
            (TriggerR, "R2"),
            (Dpad, "D-Pad"),
            (LeftStick, "L Stick"),
            (RightStick, "R Stick"),
            (Start, "Start"),
            (Select, "Select"),
        ],
    ),
    (
        GAME_BOY_ADVANCE,
        &[
            (FaceRight, "A"),
            (FaceBottom, "B"),
            (ShoulderL, "L"),
            (ShoulderR, "R"),
            (Dpad, "D-Pad"),
            (Start, "Start"),
            (Select, "Select"),
        ],
    ),
];

/// Default layout for a platform, matched by exact name
pub fn platform_default(platform: &str) -> Option<ControllerPositionMap> {
    LAYOUTS
        .iter()
        .find(|(name, _)| *name == platform)
        .map(|(_, positions)| positions.iter().copied().collect())
}

/// Platforms with a registered default layout
pub fn supported_platforms() -> impl Iterator<Item = &'static str> {
    LAYOUTS.iter().map(|(name, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_platform_has_a_layout() {
        assert_eq!(supported_platforms().count(), 8);
        for platform in supported_platforms() {
            let layout = platform_default(platform).unwrap();
            assert!(layout.len() >= 5, "{} layout too small", platform);
            assert!(layout.get(PositionKey::Start).is_some());
        }
    }

    #[test]
    fn test_n64_a_is_bottom_face() {
        let layout = platform_default(NINTENDO_64).unwrap();
        assert_eq!(layout.get(FaceBottom), Some("A"));
        assert_eq!(layout.get(FaceRight), None);
    }

    #[test]
    fn test_unknown_platform() {
        assert!(platform_default("Unknown").is_none());
        assert!(platform_default("nintendo 64").is_none());
    }
}
