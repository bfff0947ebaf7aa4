use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use logging::init_tracing;
pub use settings::{ApiSettings, ClientConfig, LoggingSettings, StorageSettings};

/// Prefix of the environment variables that override file settings,
/// e.g. `BACKTEST_API__BASE_URL`.
pub const ENV_PREFIX: &str = "BACKTEST";

/// Loads the client configuration from `config.toml` (if present) and the environment.
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    load_config_from(Path::new("config.toml"))
}

/// Loads the client configuration from the given TOML file and the environment.
///
/// A missing file is not an error: every setting has a default, so the client
/// runs with nothing but an optional `BACKTEST_API__BASE_URL`.
pub fn load_config_from(path: &Path) -> Result<ClientConfig, ConfigError> {
    load_config_with(path, environment())
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

fn load_config_with(
    path: &Path,
    environment: config::Environment,
) -> Result<ClientConfig, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(environment)
        .build()?;

    let config = builder.try_deserialize::<ClientConfig>()?;

    // Fail at start-up rather than on the first request.
    config.api.resolve_base_url()?;

    Ok(config)
}
