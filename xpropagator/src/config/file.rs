//! Config file loading and environment overrides.

use std::path::Path;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;
use tracing::{info, warn};

use super::settings::ConfigFile;

/// Environment variable naming the config file path.
pub const CONFIG_ENV_KEY: &str = "XPROP_CONFIG";

/// Default config file path, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/xpropagator.ini";

const STREAM_CHUNK_SIZE_ENV_KEY: &str = "XPROP_STREAM_CHUNK_SIZE";
const GATE_PERMITS_ENV_KEY: &str = "XPROP_GATE_PERMITS";
const MAX_LOADED_SATS_ENV_KEY: &str = "XPROP_MAX_LOADED_SATS";
const IDLE_TTL_ENV_KEY: &str = "XPROP_IDLE_TTL";
const SWEEP_INTERVAL_ENV_KEY: &str = "XPROP_SWEEP_INTERVAL";
const LOG_DIR_ENV_KEY: &str = "XPROP_LOG_DIR";
const LOG_FILE_ENV_KEY: &str = "XPROP_LOG_FILE";

/// Errors from config file loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file exists but cannot be parsed as INI.
    #[error("failed to parse config file: {0}")]
    Parse(String),
}

impl ConfigFile {
    /// Load configuration: defaults, then the config file (if present),
    /// then environment overrides.
    ///
    /// A missing file is not an error - defaults plus environment
    /// overrides apply. An unreadable or unparsable file is.
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var(CONFIG_ENV_KEY).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = if Path::new(&path).exists() {
            info!(path, "loading config file");
            Self::load_from(Path::new(&path))?
        } else {
            warn!(path, "config file not found, using defaults + env overrides");
            Self::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a config file, overlaying defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("service")) {
            if let Some(v) = section.get("stream_chunk_size") {
                set_usize("service.stream_chunk_size", v, &mut config.service.stream_chunk_size);
            }
        }

        if let Some(section) = ini.section(Some("gate")) {
            if let Some(v) = section.get("permits") {
                set_usize("gate.permits", v, &mut config.gate.permits);
            }
        }

        if let Some(section) = ini.section(Some("registry")) {
            if let Some(v) = section.get("max_loaded") {
                set_usize("registry.max_loaded", v, &mut config.registry.max_loaded);
            }
            if let Some(v) = section.get("idle_ttl") {
                set_duration("registry.idle_ttl", v, &mut config.registry.idle_ttl);
            }
            if let Some(v) = section.get("sweep_interval") {
                set_duration(
                    "registry.sweep_interval",
                    v,
                    &mut config.registry.sweep_interval,
                );
            }
        }

        if let Some(section) = ini.section(Some("logging")) {
            if let Some(v) = section.get("directory") {
                if !v.trim().is_empty() {
                    config.logging.directory = v.trim().to_string();
                }
            }
            if let Some(v) = section.get("file") {
                if !v.trim().is_empty() {
                    config.logging.file = v.trim().to_string();
                }
            }
        }

        Ok(config)
    }

    /// Apply environment overrides through a lookup function.
    ///
    /// Factored over `lookup` so tests can drive it without touching
    /// process environment.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup(STREAM_CHUNK_SIZE_ENV_KEY) {
            set_usize(STREAM_CHUNK_SIZE_ENV_KEY, &v, &mut self.service.stream_chunk_size);
        }
        if let Some(v) = lookup(GATE_PERMITS_ENV_KEY) {
            set_usize(GATE_PERMITS_ENV_KEY, &v, &mut self.gate.permits);
        }
        if let Some(v) = lookup(MAX_LOADED_SATS_ENV_KEY) {
            set_usize(MAX_LOADED_SATS_ENV_KEY, &v, &mut self.registry.max_loaded);
        }
        if let Some(v) = lookup(IDLE_TTL_ENV_KEY) {
            set_duration(IDLE_TTL_ENV_KEY, &v, &mut self.registry.idle_ttl);
        }
        if let Some(v) = lookup(SWEEP_INTERVAL_ENV_KEY) {
            set_duration(SWEEP_INTERVAL_ENV_KEY, &v, &mut self.registry.sweep_interval);
        }
        if let Some(v) = lookup(LOG_DIR_ENV_KEY) {
            if !v.trim().is_empty() {
                self.logging.directory = v.trim().to_string();
            }
        }
        if let Some(v) = lookup(LOG_FILE_ENV_KEY) {
            if !v.trim().is_empty() {
                self.logging.file = v.trim().to_string();
            }
        }
    }
}

/// Parse an integer setting; invalid or zero values warn and keep the
/// current value.
fn set_usize(key: &str, raw: &str, target: &mut usize) {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => *target = n,
        _ => warn!(key, raw, "invalid integer, ignoring override"),
    }
}

/// Parse a duration setting (`10m`, `90s`, `1h30m`); invalid or zero
/// values warn and keep the current value.
fn set_duration(key: &str, raw: &str, target: &mut Duration) {
    match humantime::parse_duration(raw.trim()) {
        Ok(d) if !d.is_zero() => *target = d,
        _ => warn!(key, raw, "invalid duration, ignoring override"),
    }
}
