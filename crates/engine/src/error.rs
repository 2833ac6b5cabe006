use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] configuration::ConfigError),

    #[error("Strategy error: {0}")]
    Strategy(#[from] strategies::StrategyError),
}
