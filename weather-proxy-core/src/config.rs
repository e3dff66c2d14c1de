use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::provider::visualcrossing::DEFAULT_BASE_URL;

/// HTTP front-end settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

/// Weather provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Connection settings for the Redis cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub host: String,

    #[serde(default = "default_redis_port")]
    pub port: u16,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [server]
/// listen_addr = "0.0.0.0:3000"
///
/// [upstream]
/// api_key = "..."
///
/// [redis]
/// host = "localhost"
/// port = 6379
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Absent means the in-process cache is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redis: Option<RedisConfig>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_redis_port() -> u16 {
    6379
}

impl Config {
    /// Load config from the default location, then apply `.env` and process
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    /// Like [`Config::load`] but reading a specific file. A missing file is
    /// not an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut cfg = Self::load_file(path)?;

        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!(error = %e, "no .env file loaded");
        }
        cfg.apply_env(|name| std::env::var(name).ok())?;

        Ok(cfg)
    }

    /// Read `path` without environment overrides. A missing file yields defaults.
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Override file values from environment variables.
    ///
    /// `REDIS_HOST` enables the Redis cache even if the file has no `[redis]`
    /// table; `REDIS_PORT` and `REDIS_PASSWORD` only apply once a host is known.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(key) = lookup("WEATHER_API_KEY").filter(|v| !v.is_empty()) {
            self.upstream.api_key = Some(key);
        }

        if let Some(addr) = lookup("WEATHER_PROXY_LISTEN").filter(|v| !v.is_empty()) {
            self.server.listen_addr = addr;
        }

        if let Some(host) = lookup("REDIS_HOST").filter(|v| !v.is_empty()) {
            match self.redis.as_mut() {
                Some(redis) => redis.host = host,
                None => {
                    self.redis = Some(RedisConfig {
                        host,
                        port: default_redis_port(),
                        password: None,
                    })
                }
            }
        }

        if let Some(redis) = self.redis.as_mut() {
            if let Some(port) = lookup("REDIS_PORT").filter(|v| !v.is_empty()) {
                redis.port = port
                    .trim()
                    .parse()
                    .with_context(|| format!("REDIS_PORT must be a port number, got '{port}'"))?;
            }
            if let Some(password) = lookup("REDIS_PASSWORD").filter(|v| !v.is_empty()) {
                redis.password = Some(password);
            }
        }

        Ok(())
    }

    /// Save config to `path`, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-proxy", "weather-proxy")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Returns the upstream API key, or an error with a setup hint.
    pub fn api_key(&self) -> Result<&str> {
        self.upstream
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "No weather API key configured.\n\
                     Hint: set WEATHER_API_KEY or run `weather-proxy configure`."
                )
            })
    }
}
