//! Configuration for the logdeck TUI.
//!
//! Layered with figment: built-in defaults, then a TOML file (the
//! platform config dir or an explicit path), then `LOGDECK_*` environment
//! variables. [`Config::to_controller_config`] validates the result and
//! turns it into what `logdeck_core` runs on.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use logdeck_core::{
    ControllerConfig, DEFAULT_MAX_RECONNECT_ATTEMPTS, DEFAULT_RECONNECT_DELAY,
    DEFAULT_TYPING_SPEED, SessionConfig,
};

/// Prefix for environment overrides, e.g. `LOGDECK_SERVER`.
pub const ENV_PREFIX: &str = "LOGDECK_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Log server base URL. The stream endpoint uses the matching ws/wss scheme.
    #[serde(default = "default_server")]
    pub server: String,

    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Fixed wait before each automatic reconnect.
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,

    /// Per-line display delay. 0 shows lines as soon as they arrive.
    #[serde(default = "default_typing_speed_ms")]
    pub typing_speed_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: default_server(),
            timeout: default_timeout(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            typing_speed_ms: default_typing_speed_ms(),
        }
    }
}

fn default_server() -> String {
    "http://localhost:8080".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_max_reconnect_attempts() -> u32 {
    DEFAULT_MAX_RECONNECT_ATTEMPTS
}
fn default_reconnect_delay_ms() -> u64 {
    millis(DEFAULT_RECONNECT_DELAY)
}
fn default_typing_speed_ms() -> u64 {
    millis(DEFAULT_TYPING_SPEED)
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

impl Config {
    /// Validate and convert into the controller's runtime config.
    pub fn to_controller_config(&self) -> Result<ControllerConfig, ConfigError> {
        let server: Url = self.server.parse().map_err(|e| ConfigError::Validation {
            field: "server".into(),
            reason: format!("invalid URL '{}': {e}", self.server),
        })?;

        if !matches!(server.scheme(), "http" | "https") {
            return Err(ConfigError::Validation {
                field: "server".into(),
                reason: format!("expected an http or https URL, got '{}'", server.scheme()),
            });
        }

        if self.timeout == 0 {
            return Err(ConfigError::Validation {
                field: "timeout".into(),
                reason: "must be at least 1 second".into(),
            });
        }

        Ok(ControllerConfig {
            server,
            timeout: Duration::from_secs(self.timeout),
            session: SessionConfig {
                max_reconnect_attempts: self.max_reconnect_attempts,
                reconnect_delay: Duration::from_millis(self.reconnect_delay_ms),
                typing_speed: Duration::from_millis(self.typing_speed_ms),
            },
        })
    }
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "logdeck", "logdeck").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("logdeck");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load from the canonical path + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file just yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let config = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX))
        .extract()?;
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Write `cfg` to the canonical path. Returns where it went.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

/// Serialize `cfg` to TOML at `path`, creating parent directories.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}
