// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration.
//!
//! Configuration is read from `$TEND_CONFIG` or `<config dir>/tend/config.toml`.
//! Every field has a default, so a missing file or a missing section is
//! fine. The auth token is never read from the file; see [`crate::env`].

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::connectivity::ReachabilityProbe;
use crate::env;
use crate::error::{Error, Result};
use crate::realtime::{RealtimeConfig, ReconnectPolicy};
use crate::retry::{RetryOptions, DEFAULT_RETRYABLE_STATUS_CODES};
use crate::storage::{FileStore, KeyValueStore, SqliteStore};

const APP_DIR_NAME: &str = "tend";
const CONFIG_FILE_NAME: &str = "config.toml";
const QUEUE_DIR_NAME: &str = "queue";
const QUEUE_DB_NAME: &str = "queue.db";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub realtime: RealtimeSettings,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub connectivity: ConnectivityConfig,
}

/// `[api]`: the HTTP API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Endpoint listing notifications, fetched whenever the channel opens.
    #[serde(default = "default_notifications_endpoint")]
    pub notifications_endpoint: String,
}

/// `[realtime]`: the notification channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RealtimeSettings {
    #[serde(default = "default_realtime_url")]
    pub url: String,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

/// `[retry]`: policy for API mutations and queue replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_retryable_status_codes")]
    pub retryable_status_codes: Vec<u16>,
    /// Drop a queued request after this many failed replays. Unset keeps
    /// requests until they succeed or the queue is cleared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discard_after: Option<u32>,
}

/// Persistent storage backend for the offline queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// One JSON file per key in a directory.
    #[default]
    File,
    /// A SQLite key-value table.
    Sqlite,
}

/// `[storage]`: where the offline queue lives.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Directory (file backend) or database file (sqlite backend). Defaults
    /// to a location under the user data directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// `[connectivity]`: reachability probing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectivityConfig {
    /// `host:port` to probe. Defaults to the API host.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub probe_addr: Option<String>,
    #[serde(default = "default_probe_interval_ms")]
    pub probe_interval_ms: u64,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_notifications_endpoint() -> String {
    "/notifications/".to_string()
}

fn default_realtime_url() -> String {
    "ws://localhost:8000/ws/notifications/".to_string()
}

fn default_reconnect_delay_ms() -> u64 {
    3_000
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    30_000
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_retryable_status_codes() -> Vec<u16> {
    DEFAULT_RETRYABLE_STATUS_CODES.to_vec()
}

fn default_probe_interval_ms() -> u64 {
    15_000
}

fn default_probe_timeout_ms() -> u64 {
    3_000
}

impl Default for ApiConfig {
    fn default() -> Self {
        ApiConfig {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            notifications_endpoint: default_notifications_endpoint(),
        }
    }
}

impl Default for RealtimeSettings {
    fn default() -> Self {
        RealtimeSettings {
            url: default_realtime_url(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: default_max_attempts(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            retryable_status_codes: default_retryable_status_codes(),
            discard_after: None,
        }
    }
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        ConnectivityConfig {
            probe_addr: None,
            probe_interval_ms: default_probe_interval_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl RealtimeSettings {
    pub fn to_realtime_config(&self) -> RealtimeConfig {
        RealtimeConfig {
            url: self.url.clone(),
            reconnect: ReconnectPolicy {
                delay: Duration::from_millis(self.reconnect_delay_ms),
                max_attempts: self.max_reconnect_attempts,
            },
            connect_timeout: Duration::from_millis(self.connect_timeout_ms),
        }
    }
}

impl RetryConfig {
    pub fn to_options(&self) -> RetryOptions {
        RetryOptions::default()
            .with_max_attempts(self.max_attempts)
            .with_initial_delay(Duration::from_millis(self.initial_delay_ms))
            .with_max_delay(Duration::from_millis(self.max_delay_ms))
            .with_backoff_multiplier(self.backoff_multiplier)
            .with_retryable_status_codes(self.retryable_status_codes.iter().copied())
    }
}

impl From<&RetryConfig> for RetryOptions {
    fn from(config: &RetryConfig) -> Self {
        config.to_options()
    }
}

impl StorageConfig {
    /// The configured path, or the default for the backend.
    pub fn resolved_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        let base = dirs::data_dir().ok_or(Error::NoDataDir)?.join(APP_DIR_NAME);
        Ok(match self.backend {
            StorageBackend::File => base.join(QUEUE_DIR_NAME),
            StorageBackend::Sqlite => base.join(QUEUE_DB_NAME),
        })
    }

    /// Open the configured store, creating it if needed.
    pub fn open_store(&self) -> Result<Arc<dyn KeyValueStore>> {
        let path = self.resolved_path()?;
        tracing::debug!(backend = ?self.backend, path = %path.display(), "opening queue storage");
        Ok(match self.backend {
            StorageBackend::File => Arc::new(FileStore::open(&path)?),
            StorageBackend::Sqlite => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                Arc::new(SqliteStore::open(&path)?)
            }
        })
    }
}

impl ConnectivityConfig {
    /// Build a probe, deriving the address from `api_base_url` when no
    /// explicit `probe_addr` is set.
    pub fn probe(&self, api_base_url: &str) -> Result<ReachabilityProbe> {
        let addr = match &self.probe_addr {
            Some(addr) => addr.clone(),
            None => probe_addr_for(api_base_url)?,
        };
        Ok(ReachabilityProbe::new(
            addr,
            Duration::from_millis(self.probe_interval_ms),
            Duration::from_millis(self.probe_timeout_ms),
        ))
    }
}

/// `host:port` of a URL, using the scheme's default port if none is given.
pub fn probe_addr_for(url: &str) -> Result<String> {
    let parsed = reqwest::Url::parse(url)
        .map_err(|e| Error::InvalidConfig(format!("invalid URL '{}': {}", url, e)))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| Error::InvalidConfig(format!("URL '{}' has no host", url)))?;
    let port = parsed
        .port_or_known_default()
        .ok_or_else(|| Error::InvalidConfig(format!("URL '{}' has no port", url)))?;
    Ok(format!("{}:{}", host, port))
}

impl Config {
    /// Load configuration from `path`. A missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no config file, using defaults");
                return Ok(Config::default());
            }
            Err(source) => {
                return Err(Error::ConfigRead {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        Self::parse(&content).map_err(|e| match e {
            ParseFailure::Toml(source) => Error::ConfigParse {
                path: path.to_path_buf(),
                source,
            },
            ParseFailure::Invalid(msg) => Error::InvalidConfig(msg),
        })
    }

    /// Load configuration from the default location.
    pub fn load_default() -> Result<Self> {
        match default_config_path() {
            Some(path) => Self::load(&path),
            None => Ok(Config::default()),
        }
    }

    fn parse(content: &str) -> std::result::Result<Self, ParseFailure> {
        let config: Config = toml::from_str(content).map_err(ParseFailure::Toml)?;
        config.validate().map_err(ParseFailure::Invalid)?;
        Ok(config)
    }

    /// Check values serde cannot check. Returns a message on failure.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let url = &self.realtime.url;
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(format!(
                "realtime url '{}' must start with ws:// or wss://",
                url
            ));
        }
        let base = &self.api.base_url;
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(format!(
                "api base_url '{}' must start with http:// or https://",
                base
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err("retry max_attempts must be at least 1".to_string());
        }
        let multiplier = self.retry.backoff_multiplier;
        if multiplier.is_nan() || multiplier < 1.0 {
            return Err("retry backoff_multiplier must be at least 1.0".to_string());
        }
        Ok(())
    }

    /// Serialize to TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::InvalidConfig(e.to_string()))
    }
}

enum ParseFailure {
    Toml(toml::de::Error),
    Invalid(String),
}

/// `$TEND_CONFIG`, or `config.toml` under the user config directory.
pub fn default_config_path() -> Option<PathBuf> {
    env::config_path().or_else(|| {
        dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
