// src/config.rs
//! Process configuration.
//!
//! Resolution order, later wins:
//! 1) built-in defaults
//! 2) TOML file at $FEEDWATCH_CONFIG_PATH, else `config/feedwatch.toml` if present
//! 3) FEEDWATCH_* environment variables

use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "config/feedwatch.toml";
pub const DEFAULT_TRIGGERS_PATH: &str = "triggers.txt";
pub const DEFAULT_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;
pub const DEFAULT_FEEDS: [&str; 2] = [
    "https://news.google.com/rss?hl=en-US&gl=US&ceid=US:en",
    "https://news.yahoo.com/rss/topstories",
];

pub const ENV_CONFIG_PATH: &str = "FEEDWATCH_CONFIG_PATH";
pub const ENV_INTERVAL_SECS: &str = "FEEDWATCH_INTERVAL_SECS";
pub const ENV_FEEDS: &str = "FEEDWATCH_FEEDS";
pub const ENV_TRIGGERS_PATH: &str = "FEEDWATCH_TRIGGERS_PATH";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "FEEDWATCH_FETCH_TIMEOUT_SECS";
pub const ENV_CHANNEL_CAPACITY: &str = "FEEDWATCH_CHANNEL_CAPACITY";
pub const ENV_METRICS_ADDR: &str = "FEEDWATCH_METRICS_ADDR";

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub interval: Duration,
    pub fetch_timeout: Duration,
    pub feeds: Vec<String>,
    pub triggers_path: PathBuf,
    pub channel_capacity: usize,
    pub metrics_addr: Option<SocketAddr>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            feeds: DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect(),
            triggers_path: PathBuf::from(DEFAULT_TRIGGERS_PATH),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            metrics_addr: None,
        }
    }
}

/// On-disk shape; every key optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    interval_secs: Option<u64>,
    fetch_timeout_secs: Option<u64>,
    feeds: Option<Vec<String>>,
    triggers_path: Option<PathBuf>,
    channel_capacity: Option<usize>,
    metrics_addr: Option<String>,
}

impl AppConfig {
    /// Defaults, then the config file, then env overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut cfg = Self::default();

        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            // An explicit path must exist.
            cfg.apply_file(Path::new(&p))?;
        } else {
            let default_path = Path::new(DEFAULT_CONFIG_PATH);
            if default_path.exists() {
                cfg.apply_file(default_path)?;
            }
        }

        cfg.apply_env(|key| std::env::var(key).ok())?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let mut cfg = Self::default();
        cfg.apply_file(path)?;
        Ok(cfg)
    }

    fn apply_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: FileConfig = toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;

        if let Some(v) = file.interval_secs {
            self.interval = secs("interval_secs", v)?;
        }
        if let Some(v) = file.fetch_timeout_secs {
            self.fetch_timeout = secs("fetch_timeout_secs", v)?;
        }
        if let Some(v) = file.feeds {
            self.feeds = clean_feeds(v);
        }
        if let Some(v) = file.triggers_path {
            self.triggers_path = v;
        }
        if let Some(v) = file.channel_capacity {
            self.channel_capacity = capacity("channel_capacity", v)?;
        }
        if let Some(v) = file.metrics_addr {
            self.metrics_addr = Some(addr("metrics_addr", &v)?);
        }
        Ok(())
    }

    /// Apply FEEDWATCH_* overrides read through `get` (injectable for tests).
    pub fn apply_env(
        &mut self,
        get: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let get = |key: &str| {
            get(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = get(ENV_INTERVAL_SECS) {
            self.interval = secs(ENV_INTERVAL_SECS, parse_num(ENV_INTERVAL_SECS, &v)?)?;
        }
        if let Some(v) = get(ENV_FETCH_TIMEOUT_SECS) {
            self.fetch_timeout = secs(
                ENV_FETCH_TIMEOUT_SECS,
                parse_num(ENV_FETCH_TIMEOUT_SECS, &v)?,
            )?;
        }
        if let Some(v) = get(ENV_FEEDS) {
            self.feeds = clean_feeds(v.split(',').map(str::to_string).collect());
        }
        if let Some(v) = get(ENV_TRIGGERS_PATH) {
            self.triggers_path = PathBuf::from(v);
        }
        if let Some(v) = get(ENV_CHANNEL_CAPACITY) {
            let n = parse_num(ENV_CHANNEL_CAPACITY, &v)?;
            self.channel_capacity = capacity(ENV_CHANNEL_CAPACITY, n)?;
        }
        if let Some(v) = get(ENV_METRICS_ADDR) {
            self.metrics_addr = Some(addr(ENV_METRICS_ADDR, &v)?);
        }
        Ok(())
    }
}

/// Parse into the target width directly; out-of-range values are rejected.
fn parse_num<T: std::str::FromStr>(key: &'static str, v: &str) -> Result<T, ConfigError> {
    v.parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: v.to_string(),
    })
}

fn secs(key: &'static str, v: u64) -> Result<Duration, ConfigError> {
    if v == 0 {
        return Err(ConfigError::InvalidValue {
            key,
            value: "0".into(),
        });
    }
    Ok(Duration::from_secs(v))
}

fn capacity(key: &'static str, v: usize) -> Result<usize, ConfigError> {
    if v == 0 {
        return Err(ConfigError::InvalidValue {
            key,
            value: "0".into(),
        });
    }
    Ok(v)
}

fn addr(key: &'static str, v: &str) -> Result<SocketAddr, ConfigError> {
    v.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key,
        value: v.to_string(),
    })
}

/// Trim, drop blanks and duplicates, keep first-seen order.
fn clean_feeds(items: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|f| f == t) {
            out.push(t.to_string());
        }
    }
    out
}
