//! RetroArch network commands (save/load state from the companion screen)

use crate::EmulatorError;
use regex::Regex;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;
use tokio::net::UdpSocket;

static NETWORK_CMD_DISABLED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^(network_cmd_enable\s*=\s*)"false""#).expect("network_cmd regex")
});

/// Commands understood by RetroArch's UDP command interface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetroArchCommand {
    SaveState,
    LoadState,
}

impl RetroArchCommand {
    /// Wire form of the command
    pub fn as_str(&self) -> &'static str {
        match self {
            RetroArchCommand::SaveState => "SAVE_STATE",
            RetroArchCommand::LoadState => "LOAD_STATE",
        }
    }
}

impl fmt::Display for RetroArchCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RetroArchCommand {
    type Err = EmulatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "SAVE_STATE" => Ok(RetroArchCommand::SaveState),
            "LOAD_STATE" => Ok(RetroArchCommand::LoadState),
            _ => Err(EmulatorError::UnknownCommand(s.to_string())),
        }
    }
}

/// Sends commands to a running RetroArch over UDP
#[derive(Debug, Clone)]
pub struct RetroArchRemote {
    host: String,
    port: u16,
}

impl Default for RetroArchRemote {
    fn default() -> Self {
        Self::new("127.0.0.1", 55355)
    }
}

impl RetroArchRemote {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Fire-and-forget; RetroArch does not acknowledge these commands
    pub async fn send(&self, command: RetroArchCommand) -> Result<(), EmulatorError> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket
            .send_to(command.as_str().as_bytes(), (self.host.as_str(), self.port))
            .await?;
        tracing::info!("Sent {} to RetroArch at {}:{}", command, self.host, self.port);
        Ok(())
    }
}

/// Turn on `network_cmd_enable` in `retroarch.cfg`.
///
/// Returns `true` if the file was rewritten, `false` if the setting was
/// already enabled or absent.
pub fn ensure_network_cmd_enabled(cfg_path: &Path) -> Result<bool, EmulatorError> {
    if !cfg_path.exists() {
        return Err(EmulatorError::ConfigNotFound(cfg_path.to_path_buf()));
    }

    let cfg = std::fs::read_to_string(cfg_path)?;
    let updated = NETWORK_CMD_DISABLED.replace(&cfg, r#"${1}"true""#);

    if updated == cfg {
        tracing::debug!("network_cmd_enable already set (or not present)");
        return Ok(false);
    }

    std::fs::write(cfg_path, updated.as_ref())?;
    tracing::info!("Enabled network_cmd_enable in {}", cfg_path.display());
    Ok(true)
}
