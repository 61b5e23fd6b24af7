//! Configuration loading and resolution
//!
//! Every setting is resolved with the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Environment variable naming an explicit TOML config file
pub const CONFIG_PATH_ENV: &str = "LYRSTAT_CONFIG";

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_BIND_HOST: &str = "127.0.0.1";
const DEFAULT_ALLOW_ORIGINS: &str = "*";
const DEFAULT_LYRICS_WORKERS: usize = 10;
const DEFAULT_MAX_TRACKS: usize = 500;
const DEFAULT_TASK_TTL_SECS: u64 = 3600;
const DEFAULT_MAX_TASKS: usize = 1000;

/// Logging section of the TOML file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Raw contents of the TOML config file; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    pub port: Option<u16>,
    pub bind_host: Option<String>,
    pub lastfm_api_key: Option<String>,
    pub genius_token: Option<String>,
    pub allow_origins: Option<String>,
    pub db_path: Option<PathBuf>,
    #[serde(default)]
    pub stopword_files: Vec<PathBuf>,
    pub lyrics_workers: Option<usize>,
    pub default_max_tracks: Option<usize>,
    pub task_ttl_secs: Option<u64>,
    pub max_tasks: Option<usize>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub lastfm_api_key: Option<String>,
    pub genius_token: Option<String>,
    pub db_path: Option<PathBuf>,
}

/// Fully resolved service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub bind_host: String,
    pub lastfm_api_key: String,
    /// Genius access token; the Genius lyrics source is disabled without it
    pub genius_token: Option<String>,
    pub allow_origins: String,
    pub db_path: PathBuf,
    pub stopword_files: Vec<PathBuf>,
    pub lyrics_workers: usize,
    pub default_max_tracks: usize,
    pub task_ttl_secs: u64,
    pub max_tasks: usize,
    pub log_level: String,
}

impl Config {
    /// Resolve the configuration from CLI overrides, environment and TOML file
    pub fn resolve(cli: &ConfigOverrides, toml_config: &TomlConfig) -> Result<Self> {
        let lastfm_api_key = pick_string(
            cli.lastfm_api_key.as_deref(),
            "LASTFM_API_KEY",
            toml_config.lastfm_api_key.as_deref(),
        )
        .ok_or_else(|| {
            Error::Config(
                "Last.fm API key not configured. Set one of:\n\
                 1. Command line: --lastfm-api-key <key>\n\
                 2. Environment: LASTFM_API_KEY=<key>\n\
                 3. TOML config: lastfm_api_key = \"<key>\""
                    .to_string(),
            )
        })?;

        let genius_token = pick_string(
            cli.genius_token.as_deref(),
            "GENIUS_TOKEN",
            toml_config.genius_token.as_deref(),
        );

        let port = match cli.port {
            Some(port) => port,
            None => pick_parsed("LYRSTAT_PORT", toml_config.port)?.unwrap_or(DEFAULT_PORT),
        };

        let db_path = match &cli.db_path {
            Some(path) => path.clone(),
            None => std::env::var("DB_PATH")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .or_else(|| toml_config.db_path.clone())
                .unwrap_or_else(default_db_path),
        };

        Ok(Self {
            port,
            bind_host: pick_string(None, "LYRSTAT_BIND_HOST", toml_config.bind_host.as_deref())
                .unwrap_or_else(|| DEFAULT_BIND_HOST.to_string()),
            lastfm_api_key,
            genius_token,
            allow_origins: pick_string(None, "ALLOW_ORIGINS", toml_config.allow_origins.as_deref())
                .unwrap_or_else(|| DEFAULT_ALLOW_ORIGINS.to_string()),
            db_path,
            stopword_files: toml_config.stopword_files.clone(),
            lyrics_workers: pick_parsed("LYRSTAT_LYRICS_WORKERS", toml_config.lyrics_workers)?
                .unwrap_or(DEFAULT_LYRICS_WORKERS)
                .max(1),
            default_max_tracks: toml_config.default_max_tracks.unwrap_or(DEFAULT_MAX_TRACKS),
            task_ttl_secs: toml_config.task_ttl_secs.unwrap_or(DEFAULT_TASK_TTL_SECS),
            max_tasks: toml_config.max_tasks.unwrap_or(DEFAULT_MAX_TASKS).max(1),
            log_level: toml_config.logging.level.clone(),
        })
    }
}

/// Validate a key-like string (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

fn pick_string(cli: Option<&str>, env_var: &str, toml_value: Option<&str>) -> Option<String> {
    if let Some(value) = cli.filter(|v| is_valid_key(v)) {
        return Some(value.trim().to_string());
    }
    if let Ok(value) = std::env::var(env_var) {
        if is_valid_key(&value) {
            return Some(value.trim().to_string());
        }
    }
    toml_value
        .filter(|v| is_valid_key(v))
        .map(|v| v.trim().to_string())
}

fn pick_parsed<T: FromStr>(env_var: &str, toml_value: Option<T>) -> Result<Option<T>> {
    match std::env::var(env_var) {
        Ok(raw) if is_valid_key(&raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| Error::Config(format!("Invalid value for {}: {}", env_var, raw))),
        _ => Ok(toml_value),
    }
}

/// Locate the TOML config file
///
/// Explicit path (CLI) → `LYRSTAT_CONFIG` → `<config dir>/lyrstat/config.toml` if it exists.
pub fn resolve_config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if is_valid_key(&path) {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join("lyrstat").join("config.toml"))
        .filter(|p| p.exists())
}

/// Load the TOML config file; a missing file yields the empty config
pub fn load_toml_config(path: Option<&Path>) -> Result<TomlConfig> {
    let Some(path) = path else {
        return Ok(TomlConfig::default());
    };

    if !path.exists() {
        tracing::warn!(path = %path.display(), "Config file not found, using defaults");
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    toml::from_str(&content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

/// OS-dependent default location of the lookup cache database
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("lyrstat"))
        .unwrap_or_else(|| PathBuf::from("./data"))
        .join("lyrics_cache.db")
}
