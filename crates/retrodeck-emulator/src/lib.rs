//! Emulator detection for the RetroDeck companion
//!
//! Knows which emulator executables to look for, how to ask the OS for
//! their command lines, and how to pull the running ROM out of each
//! emulator's command-line format. Also carries RetroArch's network
//! command channel for the save/load state remote actions.

mod cmdline;
mod process;
mod retroarch;

pub use cmdline::{
    ROM_EXTENSIONS, candidate_paths, extract_dolphin, extract_generic, extract_pcsx2,
    find_rom_path, is_rom_extension,
};
pub use process::{
    DetectedProcess, ProcessQuery, SysinfoProcessQuery, WmicProcessQuery, default_process_query,
    parse_wmic_output, wmic_filter,
};
pub use retroarch::{RetroArchCommand, RetroArchRemote, ensure_network_cmd_enabled};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmulatorError {
    #[error("Process query failed: {0}")]
    QueryFailed(String),

    #[error("RetroArch config not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("Unknown RetroArch command: {0}")]
    UnknownCommand(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Emulators the companion knows how to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmulatorKind {
    RetroArch,
    Dolphin,
    Pcsx2,
}

impl EmulatorKind {
    /// Every registered emulator, in detection priority order
    pub const ALL: [EmulatorKind; 3] = [
        EmulatorKind::RetroArch,
        EmulatorKind::Dolphin,
        EmulatorKind::Pcsx2,
    ];

    /// Executable name as reported by the OS
    pub fn process_name(&self) -> &'static str {
        match self {
            EmulatorKind::RetroArch => "retroarch.exe",
            EmulatorKind::Dolphin => "Dolphin.exe",
            EmulatorKind::Pcsx2 => "pcsx2.exe",
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            EmulatorKind::RetroArch => "RetroArch",
            EmulatorKind::Dolphin => "Dolphin",
            EmulatorKind::Pcsx2 => "PCSX2",
        }
    }

    /// WMI `where` clause selecting this emulator's processes
    pub fn wmic_filter(&self) -> &'static str {
        match self {
            EmulatorKind::RetroArch => "name='retroarch.exe'",
            EmulatorKind::Dolphin => "name='Dolphin.exe'",
            // pcsx2-qt.exe, pcsx2-v1.7.exe, ...
            EmulatorKind::Pcsx2 => "name like 'pcsx2%'",
        }
    }

    /// Whether a running process belongs to this emulator.
    ///
    /// Case-insensitive; a missing `.exe` suffix is tolerated. PCSX2 also
    /// matches versioned executable names by prefix.
    pub fn matches_process(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        let stem = lower.strip_suffix(".exe").unwrap_or(&lower);
        let own = self.process_name().to_lowercase();
        let own_stem = own.strip_suffix(".exe").unwrap_or(&own);

        match self {
            EmulatorKind::Pcsx2 => stem.starts_with(own_stem),
            _ => stem == own_stem,
        }
    }

    /// Find the emulator a process name belongs to
    pub fn from_process_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.matches_process(name))
    }

    /// Pull the active ROM path out of a raw command line.
    ///
    /// `None` means nothing plausible was found, never an error.
    pub fn extract_rom_path(&self, command_line: &str) -> Option<String> {
        match self {
            EmulatorKind::RetroArch => extract_generic(command_line),
            EmulatorKind::Dolphin => extract_dolphin(command_line),
            EmulatorKind::Pcsx2 => extract_pcsx2(command_line),
        }
    }
}
