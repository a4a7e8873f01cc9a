use rust_decimal::Decimal;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use settings::{Account, Backtest, Config, Logging, Rebalance};

/// The file read when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Prefix of environment variables that override file settings,
/// e.g. `REBALANCER_BACKTEST__STARTING_CASH=25000`.
pub const ENV_PREFIX: &str = "REBALANCER";

/// Loads the application configuration.
///
/// Sources are layered in this order, later ones winning:
/// 1. the defaults of the `Config` structs,
/// 2. the TOML file at `path` (required), or `config.toml` in the working directory (optional),
/// 3. `REBALANCER_*` environment variables, with `__` separating nested keys.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let (path, required) = match path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_CONFIG_FILE), false),
    };
    tracing::debug!(path = %path.display(), required, "Loading configuration");

    let builder = config::Config::builder()
        .add_source(
            config::File::from(path)
                .format(config::FileFormat::Toml)
                .required(required),
        )
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    validate(&config)?;

    Ok(config)
}

/// Rejects settings that would make every run fail or behave nonsensically.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.backtest.starting_cash <= Decimal::ZERO {
        return Err(ConfigError::ValidationError(format!(
            "backtest.starting_cash must be greater than 0, got {}",
            config.backtest.starting_cash
        )));
    }
    if let Some(min_return) = config.rebalance.min_return {
        if min_return < Decimal::ZERO {
            return Err(ConfigError::ValidationError(format!(
                "rebalance.min_return must not be negative, got {}",
                min_return
            )));
        }
    }
    if config.logging.level.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "logging.level must not be empty".to_string(),
        ));
    }
    Ok(())
}
