//! Configuration loading for the PDF voice reader.
//!
//! All user-tunable settings are centralized here and loaded from
//! `conf/config.toml` if present. Any missing or invalid entries fall back to
//! sensible defaults so the UI can still launch.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// High-level app configuration; deserializable from TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_speech_command")]
    pub speech_command: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_voices")]
    pub voices: Vec<String>,
    #[serde(default = "default_chunk_chars")]
    pub chunk_chars: usize,
    #[serde(default = "default_voice_test_timeout_secs")]
    pub voice_test_timeout_secs: u64,
    #[serde(default = "default_window_width")]
    pub window_width: f32,
    #[serde(default = "default_window_height")]
    pub window_height: f32,
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            speech_command: default_speech_command(),
            voice: default_voice(),
            voices: default_voices(),
            chunk_chars: default_chunk_chars(),
            voice_test_timeout_secs: default_voice_test_timeout_secs(),
            window_width: default_window_width(),
            window_height: default_window_height(),
            log_level: default_log_level(),
        }
    }
}

/// Log verbosity selectable from the config file.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_filter_str())
    }
}

fn default_speech_command() -> String {
    "/usr/bin/say".to_string()
}

fn default_voice() -> String {
    "Alex".to_string()
}

fn default_voices() -> Vec<String> {
    ["Alex", "Samantha", "Victoria", "Daniel"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_chunk_chars() -> usize {
    1000
}

fn default_voice_test_timeout_secs() -> u64 {
    5
}

fn default_window_width() -> f32 {
    600.0
}

fn default_window_height() -> f32 {
    500.0
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

/// Load the configuration, falling back to defaults when the file is missing
/// or malformed.
pub fn load_config(path: &Path) -> AppConfig {
    match fs::read_to_string(path) {
        Ok(raw) => match toml::from_str(&raw) {
            Ok(config) => {
                debug!(path = %path.display(), "Loaded configuration");
                config
            }
            Err(err) => {
                warn!(path = %path.display(), "Invalid config, using defaults: {err}");
                AppConfig::default()
            }
        },
        Err(err) => {
            info!(path = %path.display(), "No config file, using defaults: {err}");
            AppConfig::default()
        }
    }
}
