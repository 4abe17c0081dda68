//! Configuration system for oxidized-rr

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    pub general: GeneralConfig,
    pub watchdog: WatchdogConfig,
    pub output: OutputConfig,
    pub gui: GuiConfig,
    pub debug: DebugConfig,
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Script loaded most recently by the runner
    pub last_script: Option<PathBuf>,
}

/// Runaway script protection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchdogConfig {
    pub enabled: bool,
    /// VM instructions between two watchdog checks
    pub instruction_interval: u32,
    /// Checks allowed between frame boundaries before the user is asked
    pub budget: u32,
    /// Checks allowed to a single memory watch callback
    pub callback_budget: u32,
}

/// Script text output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Upper bound on a single stringified value, in bytes
    pub max_print_len: usize,
}

/// Overlay settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GuiConfig {
    pub enabled: bool,
    /// Keep composited overlay visible until the script draws again
    pub persist_between_frames: bool,
    pub default_width: u32,
    pub default_height: u32,
}

/// Debug settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DebugConfig {
    pub log_level: LogLevel,
}

/// Logging level
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

// Default implementations

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            instruction_interval: 10_000,
            budget: 1000,
            callback_budget: 1000,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            max_print_len: 64 * 1024,
        }
    }
}

impl Default for GuiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            persist_between_frames: true,
            default_width: 320,
            default_height: 240,
        }
    }
}

impl Config {
    /// Load configuration from file, or create default if it doesn't exist
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path = Self::config_path();

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            Ok(toml::from_str(&content)?)
        } else {
            let config = Self::default();
            config.save()?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let path = Self::config_path();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("oxidized-rr")
            .join("config.toml")
    }
}
