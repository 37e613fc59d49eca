//! Service configuration.
//!
//! Settings load in three layers: built-in defaults, an INI config file
//! (path from `XPROP_CONFIG`, default `config/xpropagator.ini`), then
//! environment-variable overrides. Invalid values log a warning and
//! keep the previous layer's value; non-positive values fall back to
//! the defaults at the point of use.

mod file;
mod settings;

pub use file::{ConfigError, CONFIG_ENV_KEY, DEFAULT_CONFIG_PATH};
pub use settings::{
    ConfigFile, GateSettings, LoggingSettings, RegistrySettings, ServiceSettings,
    DEFAULT_STREAM_CHUNK_SIZE,
};
