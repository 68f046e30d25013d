//! Configuration file management for flightscan.
//!
//! Reads/writes `~/.flightscan/config.yaml` with provider endpoints,
//! timeouts, enrichment limits and the listen address. OpenSky credentials
//! may live in the file but are normally supplied through the environment
//! (`OPENSKY_USERNAME` / `OPENSKY_PASSWORD`), which wins over the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::{FlightScanError, Result};

pub const DEFAULT_OPENSKY_URL: &str = "https://opensky-network.org/api";
pub const DEFAULT_ADSBDB_URL: &str = "https://api.adsbdb.com/v0";

/// Full configuration structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub opensky: OpenSkyConfig,
    pub adsbdb: AdsbdbConfig,
    pub enrichment: EnrichmentConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenSkyConfig {
    pub base_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Per-attempt connect and read timeout.
    pub timeout_secs: u64,
    pub max_attempts: u32,
    /// First retry delay; doubles on every retry.
    pub backoff_ms: u64,
    /// Advertised in `Retry-After` when every attempt failed.
    pub retry_after_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdsbdbConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentConfig {
    /// Only the nearest `limit` aircraft are enriched.
    pub limit: usize,
    /// Wall-clock ceiling for the whole enrichment fan-out.
    pub ceiling_ms: u64,
    /// Launch delay step per aircraft, capped at 10 steps.
    pub stagger_ms: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            opensky: OpenSkyConfig {
                base_url: DEFAULT_OPENSKY_URL.into(),
                username: None,
                password: None,
                timeout_secs: 20,
                max_attempts: 3,
                backoff_ms: 1000,
                retry_after_secs: 30,
            },
            adsbdb: AdsbdbConfig {
                base_url: DEFAULT_ADSBDB_URL.into(),
                timeout_secs: 5,
            },
            enrichment: EnrichmentConfig {
                limit: 30,
                ceiling_ms: 5000,
                stagger_ms: 50,
            },
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 3000,
            },
        }
    }
}

impl OpenSkyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl AdsbdbConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl EnrichmentConfig {
    pub fn ceiling(&self) -> Duration {
        Duration::from_millis(self.ceiling_ms)
    }

    pub fn stagger(&self) -> Duration {
        Duration::from_millis(self.stagger_ms)
    }
}

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// OpenSky Basic Auth credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl Credentials {
    /// Both-or-neither: returns credentials only when username and password
    /// are both present and non-blank. Anything else means anonymous access.
    pub fn resolve(username: Option<&str>, password: Option<&str>) -> Option<Credentials> {
        let username = username.map(str::trim).filter(|u| !u.is_empty())?;
        let password = password.filter(|p| !p.is_empty())?;
        Some(Credentials {
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

impl Config {
    /// Credentials from the config file, if complete.
    pub fn credentials(&self) -> Option<Credentials> {
        Credentials::resolve(
            self.opensky.username.as_deref(),
            self.opensky.password.as_deref(),
        )
    }
}

// ---------------------------------------------------------------------------
// File I/O
// ---------------------------------------------------------------------------

/// Get the config directory path (`~/.flightscan/`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".flightscan")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.yaml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from an explicit path. A missing file yields defaults; an
/// unreadable one is an error.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let text = std::fs::read_to_string(path)?;
    Ok(parse_config(&text))
}

/// Save config to an explicit path, creating parent directories.
pub fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| FlightScanError::Config(e.to_string()))?;
    }
    std::fs::write(path, serialize_config(config))
        .map_err(|e| FlightScanError::Config(e.to_string()))
}

/// Parse simple YAML-like config text. Unknown keys are ignored.
fn parse_config(text: &str) -> Config {
    let mut config = Config::default();
    let mut current_section: Option<String> = None;

    for line in text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        let is_indented = line.starts_with("  ") || line.starts_with('\t');

        let Some((key, val)) = stripped.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let val = val.trim();

        if !is_indented {
            current_section = val.is_empty().then(|| key.to_string());
            continue;
        }

        let Some(section) = current_section.as_deref() else {
            continue;
        };

        match (section, key) {
            ("opensky", "base_url") => set_string(&mut config.opensky.base_url, val),
            ("opensky", "username") => config.opensky.username = parse_string_value(val),
            ("opensky", "password") => config.opensky.password = parse_string_value(val),
            ("opensky", "timeout_secs") => set_parsed(&mut config.opensky.timeout_secs, val),
            ("opensky", "max_attempts") => set_parsed(&mut config.opensky.max_attempts, val),
            ("opensky", "backoff_ms") => set_parsed(&mut config.opensky.backoff_ms, val),
            ("opensky", "retry_after_secs") => {
                set_parsed(&mut config.opensky.retry_after_secs, val)
            }
            ("adsbdb", "base_url") => set_string(&mut config.adsbdb.base_url, val),
            ("adsbdb", "timeout_secs") => set_parsed(&mut config.adsbdb.timeout_secs, val),
            ("enrichment", "limit") => set_parsed(&mut config.enrichment.limit, val),
            ("enrichment", "ceiling_ms") => set_parsed(&mut config.enrichment.ceiling_ms, val),
            ("enrichment", "stagger_ms") => set_parsed(&mut config.enrichment.stagger_ms, val),
            ("server", "host") => set_string(&mut config.server.host, val),
            ("server", "port") => set_parsed(&mut config.server.port, val),
            _ => {}
        }
    }

    config
}

fn set_string(slot: &mut String, val: &str) {
    if let Some(v) = parse_string_value(val) {
        *slot = v;
    }
}

fn set_parsed<T: std::str::FromStr>(slot: &mut T, val: &str) {
    if let Ok(v) = val.parse::<T>() {
        *slot = v;
    }
}

fn parse_string_value(val: &str) -> Option<String> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    // Strip quotes
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return Some(val[1..val.len() - 1].to_string());
    }
    Some(val.to_string())
}

fn optional_line(key: &str, val: &Option<String>) -> String {
    match val {
        Some(v) => format!("  {key}: \"{v}\""),
        None => format!("  {key}: null"),
    }
}

/// Serialize config to YAML-like text.
fn serialize_config(config: &Config) -> String {
    let o = &config.opensky;
    let lines = [
        "# flightscan configuration".to_string(),
        String::new(),
        "opensky:".into(),
        format!("  base_url: \"{}\"", o.base_url),
        optional_line("username", &o.username),
        optional_line("password", &o.password),
        format!("  timeout_secs: {}", o.timeout_secs),
        format!("  max_attempts: {}", o.max_attempts),
        format!("  backoff_ms: {}", o.backoff_ms),
        format!("  retry_after_secs: {}", o.retry_after_secs),
        String::new(),
        "adsbdb:".into(),
        format!("  base_url: \"{}\"", config.adsbdb.base_url),
        format!("  timeout_secs: {}", config.adsbdb.timeout_secs),
        String::new(),
        "enrichment:".into(),
        format!("  limit: {}", config.enrichment.limit),
        format!("  ceiling_ms: {}", config.enrichment.ceiling_ms),
        format!("  stagger_ms: {}", config.enrichment.stagger_ms),
        String::new(),
        "server:".into(),
        format!("  host: \"{}\"", config.server.host),
        format!("  port: {}", config.server.port),
    ];

    lines.join("\n") + "\n"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
