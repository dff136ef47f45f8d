//! Audio settings loading and config file resolution
//!
//! Settings are bootstrap-only: they are read once at startup and applied to
//! the channel manager and voice engine. A missing config file is not an
//! error; compiled defaults are used instead.
//!
//! # Config file resolution
//!
//! 1. Explicit path (command-line argument)
//! 2. `VOXMIX_CONFIG` environment variable
//! 3. Platform config directory (`<config_dir>/voxmix/config.toml`)
//! 4. Compiled defaults

use crate::channel::ChannelId;
use crate::volume::clamp_linear;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "VOXMIX_CONFIG";

/// Default linear volume for every channel
pub const DEFAULT_CHANNEL_VOLUME: f32 = 0.8;

/// Top-level audio configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Per-channel default volumes
    pub channels: ChannelDefaults,

    /// Voice engine settings
    pub voice: VoiceConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Default linear volume per channel
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChannelDefaults {
    pub music: f32,
    pub sfx: f32,
    pub voice: f32,
}

impl Default for ChannelDefaults {
    fn default() -> Self {
        Self {
            music: DEFAULT_CHANNEL_VOLUME,
            sfx: DEFAULT_CHANNEL_VOLUME,
            voice: DEFAULT_CHANNEL_VOLUME,
        }
    }
}

impl ChannelDefaults {
    /// Configured default volume for a channel, clamped to `[0, 1]`
    pub fn volume_for(&self, channel: ChannelId) -> f32 {
        let raw = match channel {
            ChannelId::Music => self.music,
            ChannelId::Sfx => self.sfx,
            ChannelId::Voice => self.voice,
        };
        clamp_linear(raw)
    }
}

/// Voice engine configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Fetch voice clips from `stream_base` instead of the local stores
    pub streaming: bool,

    /// Base path or URL for streamed clips
    pub stream_base: String,

    /// File extension appended to streamed clip locators (including the dot)
    pub stream_extension: String,

    /// Language code inserted into streamed locators (optional)
    pub locale: Option<String>,

    /// Upper bound on a single streaming fetch (none by default)
    pub fetch_timeout_ms: Option<u64>,

    /// Scheduling tick used while waiting on playback
    pub tick_interval_ms: u64,

    /// Default delay between queued clips, in seconds
    pub default_delay_secs: f32,

    /// Editable development store root (checked first)
    pub dev_store: Option<PathBuf>,

    /// Packaged asset store root
    pub packaged_store: Option<PathBuf>,

    /// Output gain applied by the voice output (0-1)
    pub global_volume: f32,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            streaming: false,
            stream_base: "streaming".to_string(),
            stream_extension: ".mp3".to_string(),
            locale: None,
            fetch_timeout_ms: None,
            tick_interval_ms: 16,
            default_delay_secs: 0.0,
            dev_store: None,
            packaged_store: None,
            global_volume: 1.0,
        }
    }
}

impl VoiceConfig {
    /// Tick interval as a Duration (never zero)
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// Fetch timeout as a Duration, if configured
    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_ms.map(Duration::from_millis)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AudioConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Resolve and load configuration, falling back to defaults
    ///
    /// Only an explicitly requested file that fails to load is an error.
    /// Files found through the environment or config directory that fail to
    /// parse produce a warning and defaults.
    pub fn resolve(cli_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = cli_path {
            info!("Loading config from {}", path.display());
            return Self::load_from_file(path);
        }

        if let Some(path) = resolve_config_path() {
            match Self::load_from_file(&path) {
                Ok(config) => {
                    info!("Loaded config from {}", path.display());
                    return Ok(config);
                }
                Err(e) => {
                    warn!("Failed to load config {}: {} - using defaults", path.display(), e);
                }
            }
        } else {
            info!("No config file found, using compiled defaults");
        }

        Ok(Self::default())
    }
}

/// Locate a config file from the environment or the platform config dir
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
        warn!("{} points to missing file {}", CONFIG_ENV_VAR, path.display());
    }

    dirs::config_dir()
        .map(|d| d.join("voxmix").join("config.toml"))
        .filter(|p| p.exists())
}
