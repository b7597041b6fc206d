// Configuration loading and parsing (movewatch.toml, credentials.toml).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::types::Color;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub monitor: MonitorConfig,
    pub evaluator: EvaluatorConfig,
    pub publisher: PublisherConfig,
    pub credentials: CredentialsConfig,
    pub ws_port: u16,
}

/// Settings the monitor loop runs with, derived from `[monitor]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    pub tick_interval: Duration,
    pub tick_count: u32,
    pub initial_color: Color,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        MonitorConfig::default().settings()
    }
}

impl Config {
    pub fn monitor_settings(&self) -> MonitorSettings {
        self.monitor.settings()
    }
}

// ---------------------------------------------------------------------------
// movewatch.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire movewatch.toml file.
#[derive(Debug, Clone, Deserialize)]
struct MovewatchFile {
    #[serde(default)]
    monitor: MonitorConfig,
    #[serde(default)]
    evaluator: EvaluatorConfig,
    #[serde(default)]
    websocket: WebsocketSection,
    #[serde(default)]
    publisher: PublisherConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_tick_interval_seconds")]
    pub tick_interval_seconds: u64,
    #[serde(default = "default_tick_count")]
    pub tick_count: u32,
    #[serde(default)]
    pub initial_color: Color,
}

impl MonitorConfig {
    pub fn settings(&self) -> MonitorSettings {
        MonitorSettings {
            tick_interval: Duration::from_secs(self.tick_interval_seconds),
            tick_count: self.tick_count,
            initial_color: self.initial_color,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            tick_interval_seconds: default_tick_interval_seconds(),
            tick_count: default_tick_count(),
            initial_color: Color::White,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EvaluatorConfig {
    /// Scheme and host of the cloud evaluator; `/api/cloud-eval` is appended.
    #[serde(default = "default_evaluator_base_url")]
    pub base_url: String,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        EvaluatorConfig {
            base_url: default_evaluator_base_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct WebsocketSection {
    #[serde(default = "default_ws_port")]
    port: u16,
}

impl Default for WebsocketSection {
    fn default() -> Self {
        WebsocketSection {
            port: default_ws_port(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublisherConfig {
    /// Scheme and host of the chat service; the webhook path is appended.
    #[serde(default = "default_publisher_api_base_url")]
    pub api_base_url: String,
    /// Caption sent with the session video.
    #[serde(default = "default_video_caption")]
    pub video_caption: String,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        PublisherConfig {
            api_base_url: default_publisher_api_base_url(),
            video_caption: default_video_caption(),
        }
    }
}

fn default_tick_interval_seconds() -> u64 {
    10
}

fn default_tick_count() -> u32 {
    3
}

fn default_evaluator_base_url() -> String {
    "https://lichess.org".to_string()
}

fn default_ws_port() -> u16 {
    9002
}

fn default_publisher_api_base_url() -> String {
    "https://discord.com".to_string()
}

fn default_video_caption() -> String {
    "Session recording".to_string()
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    /// Webhook path of the form `/api/webhooks/<id>/<token>`.
    pub webhook_path: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/movewatch.toml` and
/// (optionally) `config/credentials.toml`, relative to `base_dir`.
///
/// Does not copy defaults; `load_config()` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- movewatch.toml (required) ---
    let main_path = config_dir.join("movewatch.toml");
    let main_text = read_file(&main_path)?;
    let file: MovewatchFile = toml::from_str(&main_text).map_err(|e| ConfigError::ParseError {
        path: main_path.clone(),
        source: e,
    })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        monitor: file.monitor,
        evaluator: file.evaluator,
        publisher: file.publisher,
        credentials,
        ws_port: file.websocket.port,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| ConfigError::DefaultsCopyError {
                message: format!("failed to read defaults entry: {e}"),
            })?
            .path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }

        let target = config_dir.join(file_name);
        if copy_if_absent(&path, &target)? {
            copied.push(target);
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working directory.
/// Ensures default config files are copied before loading.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

/// Copy `src` to `target` unless `target` already exists. Returns whether a
/// copy happened.
fn copy_if_absent(src: &Path, target: &Path) -> Result<bool, ConfigError> {
    let mut dest = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
    {
        Ok(dest) => dest,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => {
            return Err(ConfigError::DefaultsCopyError {
                message: format!("failed to create {}: {e}", target.display()),
            })
        }
    };

    let content = std::fs::read(src).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read {}: {e}", src.display()),
    })?;
    std::io::Write::write_all(&mut dest, &content).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to write {}: {e}", target.display()),
    })?;
    Ok(true)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.monitor.tick_interval_seconds == 0 {
        return Err(ConfigError::ValidationError {
            field: "monitor.tick_interval_seconds".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.monitor.tick_count == 0 {
        return Err(ConfigError::ValidationError {
            field: "monitor.tick_count".into(),
            message: "must be greater than 0".into(),
        });
    }

    if config.ws_port == 0 {
        return Err(ConfigError::ValidationError {
            field: "websocket.port".into(),
            message: "must be a fixed port, got 0".into(),
        });
    }

    let urls: &[(&str, &str)] = &[
        ("evaluator.base_url", config.evaluator.base_url.as_str()),
        ("publisher.api_base_url", config.publisher.api_base_url.as_str()),
    ];
    for (name, url) in urls {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError {
                field: name.to_string(),
                message: format!("must be an http(s) URL, got {url:?}"),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
