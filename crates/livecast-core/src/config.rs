//! Configuration system for livecast.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $LIVECAST_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/livecast/config.toml
//!   3. ~/.config/livecast/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LivecastConfig {
    pub http: HttpConfig,
    pub relay: RelaySettings,
    pub upstream: UpstreamSettings,
    pub limits: LimitSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Address the HTTP/WebSocket listener binds to.
    pub bind_addr: String,
    pub port: u16,
    /// Directory served for any path not matched by a route.
    pub static_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelaySettings {
    /// Minimum gap between two relayed chat lines of one session.
    pub throttle_interval_ms: u64,
    /// Outbound frames queued per viewer before it is considered stuck.
    pub downstream_buffer: usize,
    /// Upper bound on establishing an upstream feed. 0 = no bound.
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamSettings {
    /// Feed gateway URL; `{channel}` is replaced with the channel id.
    pub url_template: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitSettings {
    /// Bind attempts allowed per caller per window.
    pub connect_max_attempts: u32,
    pub connect_window_secs: u64,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0".to_string(),
            port: 3000,
            static_dir: PathBuf::from("public"),
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            throttle_interval_ms: 800,
            downstream_buffer: 64,
            connect_timeout_secs: 15,
        }
    }
}

impl Default for UpstreamSettings {
    fn default() -> Self {
        Self {
            url_template: "ws://127.0.0.1:9100/live/{channel}".to_string(),
        }
    }
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            connect_max_attempts: 5,
            connect_window_secs: 60,
        }
    }
}

impl RelaySettings {
    pub fn throttle_interval(&self) -> Duration {
        Duration::from_millis(self.throttle_interval_ms)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        (self.connect_timeout_secs > 0).then(|| Duration::from_secs(self.connect_timeout_secs))
    }
}

impl LimitSettings {
    pub fn connect_window(&self) -> Duration {
        Duration::from_secs(self.connect_window_secs)
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("livecast")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl LivecastConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            LivecastConfig::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("LIVECAST_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&LivecastConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply LIVECAST_* overrides. Unparseable numbers are ignored.
    fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("LIVECAST_HTTP__BIND_ADDR") {
            self.http.bind_addr = v;
        }
        if let Some(p) = var("LIVECAST_HTTP__PORT").and_then(|v| v.parse().ok()) {
            self.http.port = p;
        }
        if let Some(v) = var("LIVECAST_HTTP__STATIC_DIR") {
            self.http.static_dir = PathBuf::from(v);
        }
        if let Some(ms) = var("LIVECAST_RELAY__THROTTLE_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            self.relay.throttle_interval_ms = ms;
        }
        if let Some(n) = var("LIVECAST_RELAY__DOWNSTREAM_BUFFER").and_then(|v| v.parse().ok()) {
            self.relay.downstream_buffer = n;
        }
        if let Some(s) = var("LIVECAST_RELAY__CONNECT_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.relay.connect_timeout_secs = s;
        }
        if let Some(v) = var("LIVECAST_UPSTREAM__URL_TEMPLATE") {
            self.upstream.url_template = v;
        }
        if let Some(n) = var("LIVECAST_LIMITS__CONNECT_MAX_ATTEMPTS").and_then(|v| v.parse().ok()) {
            self.limits.connect_max_attempts = n;
        }
        if let Some(s) = var("LIVECAST_LIMITS__CONNECT_WINDOW_SECS").and_then(|v| v.parse().ok()) {
            self.limits.connect_window_secs = s;
        }
    }
}
