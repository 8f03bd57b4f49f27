//! Configuration loading utilities.
//!
//! Handles paths and parsing for the supervisor config file
//! (`<config_dir>/adguard/config.toml`). A missing file yields defaults.

use crate::error::{AdguardError, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PROTOCOL: &str = "kakaoopen";
pub const DEFAULT_EXECUTABLE: &str = "KakaoTalk.exe";
pub const DEFAULT_SUFFIX: &str = ".exe";

pub const DEFAULT_STEP_INTERVAL_MS: u64 = 100;
pub const DEFAULT_LAUNCH_SETTLE_MS: u64 = 3_000;
pub const DEFAULT_BACKGROUND_DELAY_MS: u64 = 3_000;
pub const DEFAULT_STALL_INTERVAL_MS: u64 = 5_000;
pub const DEFAULT_CONFIRMATIONS_REQUIRED: u32 = 2;
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 10_000;

/// Which application to look for, and where.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TargetConfig {
    /// Protocol handler name under `HKEY_CLASSES_ROOT`.
    #[serde(default = "default_protocol")]
    pub protocol: String,
    /// Filename checked in the working directory when the registry has nothing.
    #[serde(default = "default_executable")]
    pub executable: String,
    #[serde(default = "default_suffix")]
    pub suffix: String,
}

impl TargetConfig {
    /// Registry subkey holding the protocol's open command.
    pub fn command_key(&self) -> String {
        format!(r"{}\shell\open\command", self.protocol)
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            protocol: default_protocol(),
            executable: default_executable(),
            suffix: default_suffix(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TimingConfig {
    #[serde(default = "default_step_interval_ms")]
    pub step_interval_ms: u64,
    #[serde(default = "default_launch_settle_ms")]
    pub launch_settle_ms: u64,
    #[serde(default = "default_background_delay_ms")]
    pub background_delay_ms: u64,
    #[serde(default = "default_stall_interval_ms")]
    pub stall_interval_ms: u64,
    #[serde(default = "default_confirmations_required")]
    pub confirmations_required: u32,
}

impl TimingConfig {
    pub fn step_interval(&self) -> Duration {
        Duration::from_millis(self.step_interval_ms)
    }

    pub fn launch_settle(&self) -> Duration {
        Duration::from_millis(self.launch_settle_ms)
    }

    pub fn background_delay(&self) -> Duration {
        Duration::from_millis(self.background_delay_ms)
    }

    pub fn stall_interval(&self) -> Duration {
        Duration::from_millis(self.stall_interval_ms)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            step_interval_ms: DEFAULT_STEP_INTERVAL_MS,
            launch_settle_ms: DEFAULT_LAUNCH_SETTLE_MS,
            background_delay_ms: DEFAULT_BACKGROUND_DELAY_MS,
            stall_interval_ms: DEFAULT_STALL_INTERVAL_MS,
            confirmations_required: DEFAULT_CONFIRMATIONS_REQUIRED,
        }
    }
}

/// External helper that performs the actual ad suppression.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ProbeConfig {
    #[serde(default)]
    pub program: Option<PathBuf>,
    /// Extra arguments placed before the window handle.
    #[serde(default)]
    pub args: Vec<String>,
    /// A helper still running after this long is killed and counted as failed.
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout_ms: u64,
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            timeout_ms: DEFAULT_PROBE_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct PresentationConfig {
    #[serde(default)]
    pub detach_console: bool,
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
pub struct AdguardConfig {
    #[serde(default)]
    pub target: TargetConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub presentation: PresentationConfig,
}

/// Returns the path to the adguard config directory.
pub fn get_adguard_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("adguard"))
}

/// Returns the default config file path.
pub fn default_config_path() -> Result<PathBuf> {
    get_adguard_config_dir()
        .map(|d| d.join("config.toml"))
        .ok_or(AdguardError::ConfigDirNotFound)
}

/// Loads the config from `path` (or the default location), returning defaults
/// if the file doesn't exist.
pub fn load_config(path: Option<&Path>) -> Result<AdguardConfig> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => default_config_path()?,
    };

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "Config file missing; using defaults");
        return Ok(AdguardConfig::default());
    }

    let content = fs_err::read_to_string(&config_path).map_err(|source| AdguardError::Io {
        context: format!("Failed to read config {}", config_path.display()),
        source,
    })?;
    toml::from_str::<AdguardConfig>(&content).map_err(|err| AdguardError::ConfigMalformed {
        path: config_path,
        details: err.to_string(),
    })
}

fn default_protocol() -> String {
    DEFAULT_PROTOCOL.to_string()
}

fn default_executable() -> String {
    DEFAULT_EXECUTABLE.to_string()
}

fn default_suffix() -> String {
    DEFAULT_SUFFIX.to_string()
}

fn default_step_interval_ms() -> u64 {
    DEFAULT_STEP_INTERVAL_MS
}

fn default_launch_settle_ms() -> u64 {
    DEFAULT_LAUNCH_SETTLE_MS
}

fn default_background_delay_ms() -> u64 {
    DEFAULT_BACKGROUND_DELAY_MS
}

fn default_stall_interval_ms() -> u64 {
    DEFAULT_STALL_INTERVAL_MS
}

fn default_confirmations_required() -> u32 {
    DEFAULT_CONFIRMATIONS_REQUIRED
}

fn default_probe_timeout_ms() -> u64 {
    DEFAULT_PROBE_TIMEOUT_MS
}
