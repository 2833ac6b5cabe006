use chrono::FixedOffset;
use serde::Deserialize;

use crate::error::ConfigError;

/// The root configuration structure for the entire application.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub engine: EngineSettings,
    pub market: MarketSettings,
    pub strategy: StrategyParams,
    pub database: DatabaseSettings,
    pub telegram: TelegramConfig,
    pub server: ServerSettings,
    pub logging: LoggingSettings,
}

/// Timing of the polling loop and the activation controller.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Seconds between two active cycles.
    pub poll_interval_secs: u64,
    /// Seconds after boot before the engine starts on its own if nobody sent `/start`.
    pub activation_grace_secs: u64,
    /// Seconds between command drains while the engine is stopped.
    pub command_poll_interval_secs: u64,
    /// Offset from UTC, in minutes, used for the local time stamped on every signal.
    pub utc_offset_minutes: i32,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            poll_interval_secs: 300,
            activation_grace_secs: 30,
            command_poll_interval_secs: 5,
            // West Africa Time.
            utc_offset_minutes: 60,
        }
    }
}

impl EngineSettings {
    /// The fixed offset signals are stamped with.
    pub fn local_offset(&self) -> Result<FixedOffset, ConfigError> {
        FixedOffset::east_opt(self.utc_offset_minutes * 60).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "utc_offset_minutes {} is out of range",
                self.utc_offset_minutes
            ))
        })
    }
}

/// Which market is watched and where its prices come from.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MarketSettings {
    /// The symbol in `BASE/QUOTE` form (e.g., "BTC/USDT").
    pub symbol: String,
    /// The kline interval (e.g., "5m").
    pub timeframe: String,
    /// Base URL of the exchange REST API.
    pub base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for MarketSettings {
    fn default() -> Self {
        Self {
            symbol: "BTC/USDT".to_string(),
            timeframe: "5m".to_string(),
            base_url: "https://api.binance.com".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Parameters for the KDJ threshold strategy.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    /// Number of bars kept in the rolling history window.
    pub window_size: usize,
    pub rsi_period: usize,
    /// Look-back of the stochastic range.
    pub kdj_length: usize,
    /// Smoothing applied to %K and %D.
    pub kdj_signal: usize,
    /// `J` strictly below this value is a buy.
    pub buy_below: f64,
    /// `J` strictly above this value is a sell.
    pub sell_above: f64,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            window_size: 100,
            rsi_period: 14,
            kdj_length: 9,
            kdj_signal: 3,
            buy_below: -12.0,
            sell_above: 121.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// SQLite connection string, e.g. `sqlite://sentinel.db` or `sqlite::memory:`.
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://sentinel.db".to_string(),
            max_connections: 5,
        }
    }
}

/// Telegram bot credentials. Empty values disable both alerts and remote control.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub token: String,
    pub chat_id: String,
    pub api_base_url: String,
    /// Long-poll timeout handed to `getUpdates`.
    pub poll_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            chat_id: String::new(),
            api_base_url: "https://api.telegram.org".to_string(),
            poll_timeout_secs: 1,
            request_timeout_secs: 15,
        }
    }
}

impl TelegramConfig {
    pub fn is_configured(&self) -> bool {
        !self.token.is_empty() && !self.chat_id.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter when `RUST_LOG` is not set.
    pub level: String,
    /// Optional log file, written next to stdout output.
    pub file: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("sentinel.log".to_string()),
        }
    }
}

impl Config {
    /// Rejects settings the engine cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let engine = &self.engine;
        if engine.poll_interval_secs == 0 || engine.command_poll_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "engine intervals must be greater than zero".to_string(),
            ));
        }
        engine.local_offset()?;

        let strategy = &self.strategy;
        if strategy.rsi_period == 0 || strategy.kdj_length == 0 || strategy.kdj_signal == 0 {
            return Err(ConfigError::ValidationError(
                "indicator periods cannot be zero".to_string(),
            ));
        }
        let longest_lookback = strategy
            .rsi_period
            .max(strategy.kdj_length + 2 * (strategy.kdj_signal - 1));
        if strategy.window_size < longest_lookback {
            return Err(ConfigError::ValidationError(format!(
                "window_size {} is shorter than the longest indicator lookback {}",
                strategy.window_size, longest_lookback
            )));
        }
        if strategy.buy_below >= strategy.sell_above {
            return Err(ConfigError::ValidationError(format!(
                "buy_below ({}) must be lower than sell_above ({})",
                strategy.buy_below, strategy.sell_above
            )));
        }

        if self.market.symbol.trim().is_empty() || self.market.timeframe.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "market symbol and timeframe must be set".to_string(),
            ));
        }
        Ok(())
    }
}
