//! Generation prompt and response parsing

use crate::layouts::{
    GAME_BOY_ADVANCE, GAMECUBE, GENESIS, NES, NINTENDO_64, PLAYSTATION, PLAYSTATION_2, SNES,
};
use crate::position::{ControllerPositionMap, PositionKey};
use serde_json::{Map, Value};

/// A usable response names at least this many positions
pub const MIN_GENERATED_KEYS: usize = 2;

/// How each platform's emulator maps the original buttons onto positions.
///
/// Naive name matching is wrong for several consoles (the N64 "A" button
/// sits on faceBottom, not faceRight), so the prompt spells this out.
pub fn core_mapping_context(platform: &str) -> Option<&'static str> {
    let context = match platform {
        NINTENDO_64 => {
            "RetroArch Mupen64Plus-Next core default mapping for N64:
- N64 A button → faceBottom (B on controller)
- N64 B button → faceLeft (Y on controller)
- N64 Z Trigger → triggerL (ZL on controller)
- N64 L shoulder → shoulderL (L on controller)
- N64 R shoulder → shoulderR (R on controller)
- N64 C-buttons → rightStick (right analog stick on controller)
- N64 Start → start
- N64 Control Stick → leftStick
- N64 D-Pad → dpad"
        }
        SNES => {
            "RetroArch SNES core maps 1:1 with RetroPad (SNES layout = RetroPad layout):
- SNES B → faceBottom (B on controller)
- SNES A → faceRight (A on controller)
- SNES Y → faceLeft (Y on controller)
- SNES X → faceTop (X on controller)
- SNES L → shoulderL (L on controller)
- SNES R → shoulderR (R on controller)
- SNES Start → start
- SNES Select → select
- SNES D-Pad → dpad"
        }
        NES => {
            "RetroArch NES core mapping:
- NES A → faceRight (A on controller)
- NES B → faceBottom (B on controller)
- NES Start → start
- NES Select → select
- NES D-Pad → dpad"
        }
        PLAYSTATION => {
            "RetroArch PS1 core mapping:
- PS1 Cross (X) → faceBottom (B on controller)
- PS1 Circle (O) → faceRight (A on controller)
- PS1 Square → faceLeft (Y on controller)
- PS1 Triangle → faceTop (X on controller)
- PS1 L1 → shoulderL
- PS1 R1 → shoulderR
- PS1 L2 → triggerL (ZL)
- PS1 R2 → triggerR (ZR)
- PS1 Start → start
- PS1 Select → select
- PS1 Left Stick → leftStick
- PS1 Right Stick → rightStick
- PS1 D-Pad → dpad"
        }
        PLAYSTATION_2 => {
            "RetroArch PS2 core mapping:
- PS2 Cross (X) → faceBottom (B on controller)
- PS2 Circle (O) → faceRight (A on controller)
- PS2 Square → faceLeft (Y on controller)
- PS2 Triangle → faceTop (X on controller)
- PS2 L1 → shoulderL
- PS2 R1 → shoulderR
- PS2 L2 → triggerL (ZL)
- PS2 R2 → triggerR (ZR)
- PS2 L3 → l3
- PS2 R3 → r3
- PS2 Start → start
- PS2 Select → select
- PS2 Left Stick → leftStick
- PS2 Right Stick → rightStick
- PS2 D-Pad → dpad"
        }
        GAMECUBE => {
            "Dolphin core default mapping (no profile found):
- GC A → faceBottom (B on controller)
- GC B → faceLeft (Y on controller)
- GC X → faceTop (X on controller)
- GC Y → faceRight (A on controller)
- GC Z → shoulderR (R on controller)
- GC L → triggerL (ZL on controller)
- GC R → triggerR (ZR on controller)
- GC Start/Pause → start
- GC Control Stick → leftStick
- GC C-Stick → rightStick
- GC D-Pad → dpad"
        }
        GENESIS => {
            "RetroArch Genesis Plus GX core mapping (6-button):
- Genesis A → faceLeft (Y on controller)
- Genesis B → faceBottom (B on controller)
- Genesis C → faceRight (A on controller)
- Genesis X → shoulderL (L on controller)
- Genesis Y → faceTop (X on controller)
- Genesis Z → shoulderR (R on controller)
- Genesis Start → start
- Genesis Mode → select
- Genesis D-Pad → dpad"
        }
        GAME_BOY_ADVANCE => {
            "RetroArch GBA core mapping:
- GBA A → faceRight (A on controller)
- GBA B → faceBottom (B on controller)
- GBA L → shoulderL (L on controller)
- GBA R → shoulderR (R on controller)
- GBA Start → start
- GBA Select → select
- GBA D-Pad → dpad"
        }
        _ => return None,
    };
    Some(context)
}

const EXAMPLES: &str = r#"Example for Super Mario 64 (N64):
{"faceBottom":"Jump","faceLeft":"Punch","triggerL":"Crouch","shoulderR":"Camera","leftStick":"Move","rightStick":"C-Buttons","start":"Pause"}

Example for Super Smash Bros. Melee (GameCube):
{"faceBottom":"Attack","faceRight":"Jump","faceLeft":"Special","faceTop":"Jump","shoulderR":"Grab","triggerL":"Shield","triggerR":"Shield","leftStick":"Move","rightStick":"Smash","dpad":"Taunt","start":"Pause"}"#;

/// Prompt asking for one game's in-game actions per position.
///
/// `mapping` explains how the source platform's buttons land on positions;
/// pass the emulator's own profile when one was read, else the static
/// context for the platform.
pub fn build_prompt(title: &str, platform: &str, mapping: Option<&str>) -> String {
    let positions = PositionKey::ALL
        .iter()
        .map(|key| format!("- {} = {}", key, key.description()))
        .collect::<Vec<_>>()
        .join("\n");

    let mapping_section = match mapping {
        Some(mapping) if !mapping.is_empty() => format!(
            "\n\nIMPORTANT: Use this core mapping to determine which position key each \
             original game button maps to. Do NOT map by button name (e.g. N64 \"A\" is NOT \
             faceRight \"A\", check the mapping below):\n{}",
            mapping
        ),
        _ => String::new(),
    };

    format!(
        "You are a retro gaming expert. For the game \"{title}\" on {platform}, provide the \
         in-game action for each controller button position.\n\n\
         The output position keys correspond to a modern controller (8BitDo Pro 3 / Switch layout):\n\
         {positions}{mapping_section}\n\n\
         CRITICAL: Each label must be the actual in-game ACTION for \"{title}\" (what happens \
         when you press the button), NOT the original console button name. Think carefully \
         about the DEFAULT control scheme for this specific game.\n\n\
         Multiple position keys CAN have the same action label if the game maps multiple \
         buttons to the same function. Do not force unique labels.\n\n\
         If you are unsure about a button's function in this specific game, OMIT it rather \
         than guessing. Accuracy matters more than completeness.\n\n\
         Respond with ONLY a JSON object mapping position keys to short action labels \
         (1-2 words max, like \"Jump\", \"Attack\", \"Move\", \"Menu\"). Only include positions \
         that the game actually uses. Keep labels very short and kid-friendly.\n\n\
         {EXAMPLES}"
    )
}

/// Pull a position map out of free-form response text.
///
/// Takes the span from the first `{` to the last `}` (tolerating prose or
/// markdown fences around it), keeps recognized keys with non-empty string
/// values, and rejects results with fewer than [`MIN_GENERATED_KEYS`].
pub fn parse_response(text: &str) -> Option<ControllerPositionMap> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }

    let object: Map<String, Value> = serde_json::from_str(&text[start..=end]).ok()?;
    let map = ControllerPositionMap::from_json_object(&object);

    (map.len() >= MIN_GENERATED_KEYS).then_some(map)
}
