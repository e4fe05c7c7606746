use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use joule_core::{ComponentRequest, MonitorError, DEFAULT_SAMPLE_INTERVAL};
use serde::{Deserialize, Serialize};
use tracing::{warn, Level};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Off,
    Error,
    #[default]
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "off" => LogLevel::Off,
            "error" => LogLevel::Error,
            "info" => LogLevel::Info,
            "debug" => LogLevel::Debug,
            "trace" => LogLevel::Trace,
            _ => LogLevel::Warn,
        }
    }

    pub fn as_tracing_level(&self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn default_components() -> Vec<String> {
    vec!["cpu".to_string(), "memory".to_string()]
}

fn default_sample_interval() -> String {
    humantime::format_duration(DEFAULT_SAMPLE_INTERVAL).to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Components monitored when `--components` is not given.
    #[serde(default = "default_components")]
    pub components: Vec<String>,
    /// Time between samples, e.g. `"10s"` or `"500ms"`.
    #[serde(default = "default_sample_interval")]
    pub sample_interval: String,
    pub log_level: LogLevel,
    pub log_to_file: bool,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            components: default_components(),
            sample_interval: default_sample_interval(),
            log_level: LogLevel::Warn,
            log_to_file: false,
        }
    }
}

pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("~/.config"))
        .join("joule")
}

pub fn runtime_dir() -> PathBuf {
    dirs::runtime_dir()
        .or_else(dirs::cache_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join("joule")
}

pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

pub fn ensure_dirs() -> std::io::Result<()> {
    fs::create_dir_all(config_dir())
}

impl UserConfig {
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    /// Reads a config file, falling back to defaults when it is missing or
    /// malformed.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "invalid config, using defaults");
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> std::io::Result<()> {
        let _ = ensure_dirs();
        self.save_to(&config_path())
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        fs::write(path, content)
    }

    /// Parsed sample interval. An unparsable value falls back to the default.
    pub fn sample_interval(&self) -> Duration {
        humantime::parse_duration(self.sample_interval.trim()).unwrap_or_else(|e| {
            warn!(
                value = %self.sample_interval,
                error = %e,
                "invalid sample_interval, using default"
            );
            DEFAULT_SAMPLE_INTERVAL
        })
    }

    pub fn component_request(&self) -> Result<ComponentRequest, MonitorError> {
        ComponentRequest::from_flags(self.components.iter().map(|c| (c.as_str(), true)))
    }

    /// Applies command-line overrides on top of the file values.
    pub fn merge_with_args(&mut self, components: Option<&str>, interval: Option<Duration>) {
        if let Some(list) = components {
            self.components = list
                .split(',')
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
        }
        if let Some(interval) = interval {
            self.sample_interval = humantime::format_duration(interval).to_string();
        }
    }
}
