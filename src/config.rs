use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
    #[serde(default = "default_progress")]
    pub progress: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogConfig {
    #[serde(default)]
    pub directory: Option<PathBuf>,
    #[serde(default = "default_file_name")]
    pub file_name: String,
    #[serde(default = "default_column_width")]
    pub column_width: f64,
    #[serde(default = "default_duplicate_remark")]
    pub duplicate_remark: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SamplingConfig {
    #[serde(default = "default_cpu_window")]
    pub cpu_window: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log: LogConfig::default(),
            sampling: SamplingConfig::default(),
            progress: default_progress(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            directory: None,
            file_name: default_file_name(),
            column_width: default_column_width(),
            duplicate_remark: default_duplicate_remark(),
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            cpu_window: default_cpu_window(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse YAML in {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("invalid configuration: {0}")]
    Validation(String),
}

impl Config {
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        let path_display = path_ref.display().to_string();
        let text = fs::read_to_string(path_ref).map_err(|source| ConfigError::Read {
            path: path_display.clone(),
            source,
        })?;

        let cfg = Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
            path: path_display,
            source,
        })?;

        cfg.validate()?;
        Ok(cfg)
    }

    fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        // An empty document deserializes to unit, not to an empty mapping.
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_log(&self.log)?;
        self.sampling.cpu_window()?;
        Ok(())
    }

    pub fn example_yaml() -> &'static str {
        include_str!("../config.yaml.example")
    }

    pub fn log_path(&self) -> Result<PathBuf, ConfigError> {
        let directory = match &self.log.directory {
            Some(dir) => dir.clone(),
            None => desktop_dir().ok_or_else(|| {
                ConfigError::Validation(
                    "cannot resolve the desktop directory: neither HOME nor USERPROFILE is set"
                        .to_string(),
                )
            })?,
        };
        Ok(directory.join(&self.log.file_name))
    }
}

impl SamplingConfig {
    pub fn cpu_window(&self) -> Result<Duration, ConfigError> {
        let window = humantime::parse_duration(self.cpu_window.trim()).map_err(|err| {
            ConfigError::Validation(format!(
                "sampling.cpu_window '{}' is not a valid duration: {err}",
                self.cpu_window
            ))
        })?;
        if window.is_zero() {
            return Err(ConfigError::Validation(
                "sampling.cpu_window must be > 0".to_string(),
            ));
        }
        Ok(window)
    }
}

fn validate_log(cfg: &LogConfig) -> Result<(), ConfigError> {
    let name = cfg.file_name.trim();
    if name.is_empty() {
        return Err(ConfigError::Validation(
            "log.file_name must not be empty".to_string(),
        ));
    }
    check_xlsx_name("log.file_name", name)?;
    if name.contains(['/', '\\']) {
        return Err(ConfigError::Validation(format!(
            "log.file_name '{}' must be a bare file name, use log.directory for the folder",
            cfg.file_name
        )));
    }
    if !(1.0..=255.0).contains(&cfg.column_width) {
        return Err(ConfigError::Validation(
            "log.column_width must be in the range 1..255".to_string(),
        ));
    }
    if cfg.duplicate_remark.trim().is_empty() {
        return Err(ConfigError::Validation(
            "log.duplicate_remark must not be empty".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_log_path(path: &Path) -> Result<(), ConfigError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    if name.trim().is_empty() {
        return Err(ConfigError::Validation(format!(
            "log path '{}' must name a file",
            path.display()
        )));
    }
    check_xlsx_name("log path", name.trim())
}

fn check_xlsx_name(field: &str, name: &str) -> Result<(), ConfigError> {
    if !name.to_ascii_lowercase().ends_with(".xlsx") {
        return Err(ConfigError::Validation(format!(
            "{field} '{name}' must end with .xlsx"
        )));
    }
    Ok(())
}

fn desktop_dir() -> Option<PathBuf> {
    ["HOME", "USERPROFILE"]
        .iter()
        .filter_map(|name| env::var(name).ok())
        .find(|v| !v.trim().is_empty())
        .map(|home| PathBuf::from(home).join("Desktop"))
}

const fn default_progress() -> bool {
    true
}

fn default_file_name() -> String {
    "system_info.xlsx".to_string()
}

const fn default_column_width() -> f64 {
    20.0
}

fn default_duplicate_remark() -> String {
    "重複".to_string()
}

fn default_cpu_window() -> String {
    "1s".to_string()
}
