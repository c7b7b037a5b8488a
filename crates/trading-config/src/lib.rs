//! Configuration management.

mod settings;

pub use settings::{AppConfig, AppSettings, DataSettings, LogFormat, LoggingConfig};

use config::{Config, ConfigError, Environment, File};
use std::path::Path;

/// Prefix of environment variables that override file values, e.g.
/// `HYPERTRADE__BACKTEST__WORKERS=8`.
pub const ENV_PREFIX: &str = "HYPERTRADE";

/// Load configuration from file and environment.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    config.try_deserialize()
}

/// Load `path` if it exists, otherwise fall back to defaults plus environment.
pub fn load_config_or_default(path: &Path) -> Result<AppConfig, ConfigError> {
    if path.exists() {
        return load_config(path);
    }

    Config::builder()
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}
