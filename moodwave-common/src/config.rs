//! Config file loading and root folder resolution for Moodwave
//!
//! Settings sources, highest priority first:
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)
//!
//! A missing or unreadable TOML file is never fatal: a warning is logged and
//! the built-in defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "MOODWAVE_CONFIG";

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV_VAR: &str = "MOODWAVE_ROOT_FOLDER";

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    /// Folder holding downloaded artifacts and logs
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub providers: ProviderEndpoints,

    #[serde(default)]
    pub api_keys: ApiKeys,

    #[serde(default)]
    pub location: LocationConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Size a log file is trimmed to on startup
    #[serde(default = "default_max_log_bytes")]
    pub max_file_bytes: u64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
            max_file_bytes: default_max_log_bytes(),
        }
    }
}

/// Generation pipeline tuning
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerationConfig {
    /// Song provider: "suno", "replicate" or "mureka"
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Force offline mock mode even when an API key is present
    #[serde(default)]
    pub mock: bool,

    /// Delay between provider status polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Status polls before a job is declared timed out
    #[serde(default = "default_max_poll_attempts")]
    pub max_poll_attempts: u32,

    /// Continuous listening time on an entry before the next one is generated
    #[serde(default = "default_listen_before_generate_ms")]
    pub listen_before_generate_ms: u64,

    /// Intermediate points between start and end mood
    #[serde(default = "default_trajectory_steps")]
    pub trajectory_steps: usize,

    /// Simulated latency of a mock job
    #[serde(default = "default_mock_song_delay_ms")]
    pub mock_song_delay_ms: u64,

    /// Delay between a mock job returning and its final artifact event
    #[serde(default = "default_mock_final_delay_ms")]
    pub mock_final_delay_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            mock: false,
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_attempts: default_max_poll_attempts(),
            listen_before_generate_ms: default_listen_before_generate_ms(),
            trajectory_steps: default_trajectory_steps(),
            mock_song_delay_ms: default_mock_song_delay_ms(),
            mock_final_delay_ms: default_mock_final_delay_ms(),
        }
    }
}

/// Base URLs and model identifiers of the remote backends
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderEndpoints {
    #[serde(default = "default_suno_base_url")]
    pub suno_base_url: String,
    #[serde(default = "default_suno_model")]
    pub suno_model: String,

    #[serde(default = "default_replicate_base_url")]
    pub replicate_base_url: String,
    /// Model version hash passed to the predictions endpoint
    #[serde(default)]
    pub replicate_version: String,

    #[serde(default = "default_mureka_base_url")]
    pub mureka_base_url: String,
    #[serde(default = "default_mureka_model")]
    pub mureka_model: String,

    /// OpenAI-compatible chat completions base URL for lyrics
    #[serde(default = "default_lyrics_base_url")]
    pub lyrics_base_url: String,
    #[serde(default = "default_lyrics_model")]
    pub lyrics_model: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            suno_base_url: default_suno_base_url(),
            suno_model: default_suno_model(),
            replicate_base_url: default_replicate_base_url(),
            replicate_version: String::new(),
            mureka_base_url: default_mureka_base_url(),
            mureka_model: default_mureka_model(),
            lyrics_base_url: default_lyrics_base_url(),
            lyrics_model: default_lyrics_model(),
        }
    }
}

/// API keys as written in the TOML file
///
/// Environment variables take precedence, see [`resolve_api_key`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ApiKeys {
    #[serde(default)]
    pub suno: Option<String>,
    #[serde(default)]
    pub replicate: Option<String>,
    #[serde(default)]
    pub mureka: Option<String>,
    #[serde(default)]
    pub lyrics: Option<String>,
    #[serde(default)]
    pub openweather: Option<String>,
    #[serde(default)]
    pub news: Option<String>,
}

/// Where the listener is, for weather and news context
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationConfig {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default = "default_news_country")]
    pub news_country: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            latitude: None,
            longitude: None,
            news_country: default_news_country(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_bytes() -> u64 {
    1024 * 1024
}

fn default_provider() -> String {
    "suno".to_string()
}

fn default_poll_interval_ms() -> u64 {
    5000
}

fn default_max_poll_attempts() -> u32 {
    60
}

fn default_listen_before_generate_ms() -> u64 {
    10_000
}

fn default_trajectory_steps() -> usize {
    5
}

fn default_mock_song_delay_ms() -> u64 {
    1500
}

fn default_mock_final_delay_ms() -> u64 {
    2000
}

fn default_suno_base_url() -> String {
    "https://api.sunoapi.org".to_string()
}

fn default_suno_model() -> String {
    "V4_5".to_string()
}

fn default_replicate_base_url() -> String {
    "https://api.replicate.com".to_string()
}

fn default_mureka_base_url() -> String {
    "https://api.mureka.ai".to_string()
}

fn default_mureka_model() -> String {
    "auto".to_string()
}

fn default_lyrics_base_url() -> String {
    "https://api.perplexity.ai".to_string()
}

fn default_lyrics_model() -> String {
    "sonar".to_string()
}

fn default_news_country() -> String {
    "us".to_string()
}

/// Locate the config file to use
///
/// Priority: CLI argument, then `MOODWAVE_CONFIG`, then the platform default
/// (`<config dir>/moodwave/moodwave.toml`) if it exists. Returns None when
/// nothing is configured and no default file is present.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path().filter(|p| p.exists())
}

/// Platform default config file path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("moodwave").join("moodwave.toml"))
}

/// Load and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config = toml::from_str(&content)?;
    Ok(config)
}

/// Load the resolved config file, falling back to defaults
///
/// Never fails: a missing or invalid file produces a warning and defaults.
pub fn load_or_default(cli_arg: Option<&Path>) -> TomlConfig {
    let Some(path) = resolve_config_path(cli_arg) else {
        info!("No config file found, using built-in defaults");
        return TomlConfig::default();
    };

    match load_toml_config(&path) {
        Ok(config) => {
            info!("Loaded configuration from {}", path.display());
            config
        }
        Err(e) => {
            warn!("Ignoring config file {}: {}", path.display(), e);
            TomlConfig::default()
        }
    }
}

/// Write a config file, creating parent directories as needed
///
/// Writes to a temporary sibling first and renames it into place.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Root folder resolution
///
/// Priority: CLI argument, `MOODWAVE_ROOT_FOLDER`, TOML `root_folder`, then the
/// OS-dependent default.
pub fn resolve_root_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    if let Ok(path) = std::env::var(ROOT_FOLDER_ENV_VAR) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Some(path) = &config.root_folder {
        return path.clone();
    }

    default_root_folder()
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("moodwave"))
        .unwrap_or_else(|| PathBuf::from("./moodwave_data"))
}

/// Resolve an API key, environment first, then TOML
///
/// Blank values count as absent.
pub fn resolve_api_key(env_var: &str, toml_value: Option<&str>) -> Option<String> {
    if let Ok(key) = std::env::var(env_var) {
        if is_valid_key(&key) {
            return Some(key.trim().to_string());
        }
    }

    toml_value
        .filter(|key| is_valid_key(key))
        .map(|key| key.trim().to_string())
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}
