//! Configuration management for the RetroDeck companion
//!
//! Handles the library location, watcher timings, controller-map generation
//! settings and the RetroArch remote-command endpoint. Every field carries a
//! serde default so a partial (or missing) TOML file still yields a usable
//! configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

/// Environment variable pointing at an explicit config file
pub const CONFIG_ENV: &str = "RETRODECK_CONFIG";

/// Config file looked up in the working directory
pub const CONFIG_FILE: &str = "retrodeck.toml";

/// Main companion configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompanionConfig {
    #[serde(default)]
    pub launchbox: LaunchBoxConfig,

    #[serde(default)]
    pub watcher: WatcherConfig,

    #[serde(default)]
    pub controls: ControlsConfig,

    #[serde(default)]
    pub retroarch: RetroArchConfig,
}

/// Location of the external game library
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchBoxConfig {
    /// Library root (contains `Data/`, `Images/`, `Emulators/`)
    #[serde(default = "default_launchbox_root")]
    pub root: PathBuf,
}

fn default_launchbox_root() -> PathBuf {
    PathBuf::from(r"C:\LaunchBox")
}

impl Default for LaunchBoxConfig {
    fn default() -> Self {
        Self {
            root: default_launchbox_root(),
        }
    }
}

/// Emulator detection timings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Delay between the end of one detection tick and the start of the next
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound on a single process query
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// Buffered state snapshots per subscriber
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

fn default_poll_interval_ms() -> u64 {
    2500
}

fn default_query_timeout_ms() -> u64 {
    5000
}

fn default_event_capacity() -> usize {
    16
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            query_timeout_ms: default_query_timeout_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

impl WatcherConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

/// Controller-map storage and generation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlsConfig {
    /// Directory holding the override store, generated cache and credentials.
    /// Defaults to a `RetroDeck` directory next to the library root.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    /// Schema tag of the generated cache; a mismatch discards the cache
    #[serde(default = "default_cache_version")]
    pub cache_version: u32,

    /// Generation model identifier
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base URL of the generation service
    #[serde(default = "default_api_base")]
    pub api_base: String,
}

fn default_cache_version() -> u32 {
    2
}

fn default_model() -> String {
    "claude-sonnet-4-5".to_string()
}

fn default_max_tokens() -> u32 {
    400
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_api_base() -> String {
    "https://api.anthropic.com".to_string()
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            cache_version: default_cache_version(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
            max_retries: default_max_retries(),
            api_base: default_api_base(),
        }
    }
}

/// RetroArch network command endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetroArchConfig {
    #[serde(default = "default_retroarch_host")]
    pub host: String,

    #[serde(default = "default_retroarch_port")]
    pub port: u16,

    /// `retroarch.cfg`; defaults to the copy bundled with the library
    #[serde(default)]
    pub config_path: Option<PathBuf>,
}

fn default_retroarch_host() -> String {
    "127.0.0.1".to_string()
}

fn default_retroarch_port() -> u16 {
    55355
}

impl Default for RetroArchConfig {
    fn default() -> Self {
        Self {
            host: default_retroarch_host(),
            port: default_retroarch_port(),
            config_path: None,
        }
    }
}

impl CompanionConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations
    pub fn load_default() -> Result<Self, ConfigError> {
        // Explicit path wins, then the working directory
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Self::load(Path::new(&path));
        }

        let local = Path::new(CONFIG_FILE);
        if local.exists() {
            return Self::load(local);
        }

        tracing::warn!("No configuration file found, using defaults");
        Ok(Self::default())
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, contents)?;
        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.watcher.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "watcher.poll_interval_ms must be greater than zero".into(),
            ));
        }
        if self.watcher.event_capacity == 0 {
            return Err(ConfigError::Invalid(
                "watcher.event_capacity must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Per-platform metadata files
    pub fn platforms_dir(&self) -> PathBuf {
        self.launchbox.root.join("Data").join("Platforms")
    }

    /// Root of the per-platform artwork folders
    pub fn images_dir(&self) -> PathBuf {
        self.launchbox.root.join("Images")
    }

    /// Dolphin GameCube controller profiles
    pub fn dolphin_profile_dir(&self) -> PathBuf {
        self.launchbox
            .root
            .join("Emulators")
            .join("Dolphin")
            .join("User")
            .join("Config")
            .join("Profiles")
            .join("GCPad")
    }

    /// Directory for companion-owned data files
    pub fn data_dir(&self) -> PathBuf {
        match &self.controls.data_dir {
            Some(dir) => dir.clone(),
            None => self
                .launchbox
                .root
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join("RetroDeck"),
        }
    }

    pub fn overrides_path(&self) -> PathBuf {
        self.data_dir().join("game-controls-overrides.json")
    }

    pub fn cache_path(&self) -> PathBuf {
        self.data_dir().join("game-controls.json")
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.data_dir().join("retrodeck-config.json")
    }

    pub fn retroarch_config_path(&self) -> PathBuf {
        match &self.retroarch.config_path {
            Some(path) => path.clone(),
            None => self
                .launchbox
                .root
                .join("Emulators")
                .join("RetroArch")
                .join("retroarch.cfg"),
        }
    }
}
