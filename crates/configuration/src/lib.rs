pub use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod logging;
pub mod settings;

#[cfg(feature = "clap")]
pub mod overrides;

// Re-export the core types to provide a clean public API.
pub use settings::{
    Config, DatabaseSettings, EngineSettings, LoggingSettings, MarketSettings, ServerSettings,
    StrategyParams, TelegramConfig,
};

#[cfg(feature = "clap")]
pub use overrides::ConfigOverrides;

/// Prefix of the environment variables that override file settings,
/// e.g. `SENTINEL__MARKET__SYMBOL=ETH/USDT`.
pub const ENV_PREFIX: &str = "SENTINEL";

/// Loads the application configuration from `config.toml` in the working directory.
///
/// The file is optional: every setting has a default, and `SENTINEL__`-prefixed
/// environment variables are layered on top.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(Path::new("config.toml"))
}

/// Loads configuration from an explicit file path (which may not exist) plus the environment,
/// then validates it.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    Ok(config)
}
