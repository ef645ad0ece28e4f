//! ROM path extraction from emulator command lines

use regex::Regex;
use std::sync::LazyLock;

/// Extensions accepted as a ROM, disc image or compressed ROM
pub const ROM_EXTENSIONS: &[&str] = &[
    // Nintendo 64
    "z64", "n64", "v64", //
    // SNES
    "sfc", "smc", "fig", //
    // NES / Famicom
    "nes", "unf", "fds", //
    // Game Boy / GBA
    "gba", "gbc", "gb", "sgb", //
    // DS / 3DS
    "nds", "3ds", //
    // Disc images
    "iso", "bin", "cue", "img", "mdf", "chd", "pbp", "cso", "ecm", //
    // GameCube / Wii
    "gcm", "gcz", "wbfs", "wad", "rvz", "dol", "elf", //
    // Switch
    "nsp", "xci", //
    // Genesis / Mega Drive / 32X
    "gen", "md", "smd", "32x", //
    // Other Sega
    "gg", "sms", "sg", //
    // PC Engine, Neo Geo Pocket, WonderSwan
    "pce", "ngp", "ngc", "ws", "wsc", //
    // Atari
    "a26", "a78", "lnx", //
    // Vectrex, ColecoVision
    "vec", "col", //
    // Archives
    "zip", "7z",
];

static QUOTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]+)"|'([^']+)'"#).expect("quoted-string regex"));

// A quoted value runs to its closing quote; a bare one to the next space
static DOLPHIN_EXEC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)--exec=(?:"([^"]+)"|'([^']+)'|([^\s"']+))"#).expect("dolphin --exec regex")
});

// Everything after a standalone `--` is the game
static DASH_DASH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|\s)--\s+(?:"([^"]+)"|'([^']+)'|(.+?))\s*$"#).expect("-- separator regex")
});

pub fn is_rom_extension(ext: &str) -> bool {
    ROM_EXTENSIONS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(ext))
}

/// Trailing `.ext` of a path, if the extension is a plain word
fn extension(path: &str) -> Option<&str> {
    let (_, ext) = path.rsplit_once('.')?;
    if !ext.is_empty() && ext.chars().all(|c| c.is_alphanumeric() || c == '_') {
        Some(ext)
    } else {
        None
    }
}

fn strip_quotes(s: &str) -> String {
    s.trim().replace(['"', '\''], "")
}

/// Every quoted substring, followed by the last whitespace-separated token
pub fn candidate_paths(command_line: &str) -> Vec<String> {
    let mut paths: Vec<String> = QUOTED
        .captures_iter(command_line)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().to_string())
        .collect();

    // Unquoted paths without spaces
    if let Some(last) = command_line.split_whitespace().last() {
        let last = strip_quotes(last);
        if !last.is_empty() {
            paths.push(last);
        }
    }

    paths
}

/// First candidate carrying a ROM extension
pub fn find_rom_path(paths: &[String]) -> Option<String> {
    paths
        .iter()
        .find(|path| extension(path).is_some_and(is_rom_extension))
        .cloned()
}

/// Shared strategy: scan quoted and trailing arguments for a ROM extension.
///
/// BigBox launches RetroArch as `retroarch.exe -L "cores\core.dll" -f "rom"`,
/// so the core path is skipped by its extension.
pub fn extract_generic(command_line: &str) -> Option<String> {
    find_rom_path(&candidate_paths(command_line))
}

/// Value of whichever quoting alternative matched
fn flag_value(re: &Regex, command_line: &str) -> Option<String> {
    let caps = re.captures(command_line)?;
    let value = (1..caps.len()).find_map(|i| caps.get(i))?.as_str().trim();
    (!value.is_empty()).then(|| value.to_string())
}

/// `Dolphin.exe --exec="game.iso"`, else the shared strategy
pub fn extract_dolphin(command_line: &str) -> Option<String> {
    flag_value(&DOLPHIN_EXEC, command_line).or_else(|| extract_generic(command_line))
}

/// `pcsx2.exe -- "game.iso"`, else the shared strategy
pub fn extract_pcsx2(command_line: &str) -> Option<String> {
    flag_value(&DASH_DASH, command_line).or_else(|| extract_generic(command_line))
}
