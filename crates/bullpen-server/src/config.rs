// Configuration loading (config/bullpen.toml plus environment overrides).

use std::path::{Path, PathBuf};

use axum::http::HeaderValue;
use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

use crate::storage::allowed_file;

/// Location of the config file relative to the working directory.
pub const CONFIG_FILE: &str = "config/bullpen.toml";

/// Shipped defaults copied into `config/` on first run.
pub const DEFAULTS_FILE: &str = "defaults/bullpen.toml";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("invalid value for environment variable {var}: '{value}'")]
    InvalidEnv { var: &'static str, value: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub cors: CorsConfig,
    pub data: DataConfig,
    pub upload: UploadConfig,
    pub fatigue: FatigueConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed browser origin. `*` allows any origin.
    pub frontend_origin: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            frontend_origin: "http://localhost:5173".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Directory holding the game log. Relative paths resolve against the
    /// working directory the config was loaded from.
    pub dir: PathBuf,
    /// Fixed name the uploaded game log is stored under.
    pub csv_filename: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            csv_filename: "game_logs.csv".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FatigueConfig {
    /// Pin "today" for scoring. Quoted `YYYY-MM-DD`; unset means the local date.
    pub reference_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Write logs to this file instead of stdout.
    pub file: Option<PathBuf>,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Full path of the backing game log.
    pub fn csv_path(&self) -> PathBuf {
        self.data.dir.join(&self.data.csv_filename)
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/bullpen.toml` under
/// `base_dir`, falling back to built-in defaults when the file is absent.
/// `env` supplies environment overrides.
pub fn load_config_from<F>(base_dir: &Path, env: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let path = base_dir.join(CONFIG_FILE);
    let mut config = if path.exists() {
        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
            path: path.clone(),
            source: e,
        })?;
        toml::from_str(&text).map_err(|e| ConfigError::ParseError {
            path: path.clone(),
            source: e,
        })?
    } else {
        Config::default()
    };

    apply_env_overrides(&mut config, env)?;

    if config.data.dir.is_relative() {
        config.data.dir = base_dir.join(&config.data.dir);
    }
    if let Some(file) = &config.logging.file {
        if file.is_relative() {
            config.logging.file = Some(base_dir.join(file));
        }
    }

    validate(&config)?;
    Ok(config)
}

/// Copy `defaults/bullpen.toml` to `config/bullpen.toml` if the latter is
/// missing. Returns the path written, if any.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let defaults = base_dir.join(DEFAULTS_FILE);
    let target = base_dir.join(CONFIG_FILE);

    if !defaults.is_file() || target.exists() {
        return Ok(None);
    }

    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to create config directory: {e}"),
        })?;
    }

    match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&target)
    {
        Ok(mut dest) => {
            let content = std::fs::read(&defaults).map_err(|e| ConfigError::DefaultsCopyError {
                message: format!("failed to read {}: {e}", defaults.display()),
            })?;
            std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                ConfigError::DefaultsCopyError {
                    message: format!("failed to write {}: {e}", target.display()),
                }
            })?;
            Ok(Some(target))
        }
        // Another process created it between the check and the open.
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(None),
        Err(e) => Err(ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", target.display()),
        }),
    }
}

/// Convenience wrapper: loads config relative to the current working
/// directory using the process environment.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|e| ConfigError::ReadError {
        path: PathBuf::from("."),
        source: e,
    })?;
    ensure_config_file(&cwd)?;
    load_config_from(&cwd, |key| std::env::var(key).ok())
}

fn apply_env_overrides<F>(config: &mut Config, env: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = env("PORT").filter(|v| !v.is_empty()) {
        config.server.port = port.parse().map_err(|_| ConfigError::InvalidEnv {
            var: "PORT",
            value: port.clone(),
        })?;
    }
    if let Some(host) = env("BULLPEN_HOST").filter(|v| !v.is_empty()) {
        config.server.host = host;
    }
    if let Some(origin) = env("FRONTEND_ORIGIN").filter(|v| !v.is_empty()) {
        config.cors.frontend_origin = origin;
    }
    if let Some(dir) = env("BULLPEN_DATA_DIR").filter(|v| !v.is_empty()) {
        config.data.dir = PathBuf::from(dir);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(invalid("server.port", "must be greater than 0"));
    }
    if config.server.host.trim().is_empty() {
        return Err(invalid("server.host", "must not be empty"));
    }

    let origin = config.cors.frontend_origin.as_str();
    if origin != "*" && HeaderValue::from_str(origin).is_err() {
        return Err(invalid(
            "cors.frontend_origin",
            format!("'{origin}' is not a valid origin header value"),
        ));
    }

    let filename = config.data.csv_filename.as_str();
    if filename.is_empty() {
        return Err(invalid("data.csv_filename", "must not be empty"));
    }
    if filename.contains(['/', '\\']) {
        return Err(invalid("data.csv_filename", "must be a bare file name"));
    }
    if !allowed_file(filename) {
        return Err(invalid(
            "data.csv_filename",
            format!("'{filename}' must have a .csv extension"),
        ));
    }

    if config.upload.max_bytes == 0 {
        return Err(invalid("upload.max_bytes", "must be > 0"));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
