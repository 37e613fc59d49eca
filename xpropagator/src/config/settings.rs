//! Settings structs for all configuration sections.
//!
//! Pure data types with defaults; parsing lives in `file.rs`.

use std::time::Duration;

use crate::registry::{
    RegistryConfig, DEFAULT_IDLE_TTL, DEFAULT_MAX_LOADED_SATS, DEFAULT_SWEEP_INTERVAL,
};

/// Default points per streamed ephemeris chunk.
pub const DEFAULT_STREAM_CHUNK_SIZE: usize = 100;

/// Complete application configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    /// Service settings.
    pub service: ServiceSettings,
    /// Engine gate settings.
    pub gate: GateSettings,
    /// Satellite registry settings.
    pub registry: RegistrySettings,
    /// Logging settings.
    pub logging: LoggingSettings,
}

/// `[service]` section.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Points per streamed ephemeris chunk.
    pub stream_chunk_size: usize,
}

/// `[gate]` section.
#[derive(Debug, Clone)]
pub struct GateSettings {
    /// Concurrent engine calls permitted. The default of 1 matches a
    /// non-reentrant engine; raise only for engines that are actually
    /// reentrant.
    pub permits: usize,
}

/// `[registry]` section.
#[derive(Debug, Clone)]
pub struct RegistrySettings {
    /// Satellites allowed loaded concurrently.
    pub max_loaded: usize,
    /// Minimum idle time before TTL eviction.
    pub idle_ttl: Duration,
    /// Period of the background sweep.
    pub sweep_interval: Duration,
}

/// `[logging]` section.
#[derive(Debug, Clone)]
pub struct LoggingSettings {
    /// Directory for log files.
    pub directory: String,
    /// Log file name.
    pub file: String,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            service: ServiceSettings {
                stream_chunk_size: DEFAULT_STREAM_CHUNK_SIZE,
            },
            gate: GateSettings { permits: 1 },
            registry: RegistrySettings {
                max_loaded: DEFAULT_MAX_LOADED_SATS,
                idle_ttl: DEFAULT_IDLE_TTL,
                sweep_interval: DEFAULT_SWEEP_INTERVAL,
            },
            logging: LoggingSettings {
                directory: "logs".to_string(),
                file: "xpropagator.log".to_string(),
            },
        }
    }
}

impl ConfigFile {
    /// The registry's view of this configuration.
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            max_loaded: self.registry.max_loaded,
            idle_ttl: self.registry.idle_ttl,
            sweep_interval: self.registry.sweep_interval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_positive() {
        let config = ConfigFile::default();
        assert_eq!(config.service.stream_chunk_size, 100);
        assert_eq!(config.gate.permits, 1);
        assert_eq!(config.registry.max_loaded, 500);
        assert_eq!(config.registry.idle_ttl, Duration::from_secs(600));
        assert_eq!(config.registry.sweep_interval, Duration::from_secs(300));
        assert_eq!(config.logging.directory, "logs");
    }

    #[test]
    fn registry_config_mirrors_settings() {
        let mut config = ConfigFile::default();
        config.registry.max_loaded = 7;
        config.registry.idle_ttl = Duration::from_secs(1);
        let rc = config.registry_config();
        assert_eq!(rc.max_loaded, 7);
        assert_eq!(rc.idle_ttl, Duration::from_secs(1));
    }
}
