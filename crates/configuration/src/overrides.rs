use crate::settings::Config;
use clap::Args;
use std::path::PathBuf;

/// Command-line flags that take precedence over the file and the environment.
#[derive(Debug, Clone, Args)]
pub struct ConfigOverrides {
    /// Path of the TOML configuration file.
    #[arg(long, short, default_value = "config.toml")]
    pub config: PathBuf,

    /// Symbol to watch (e.g., "BTC/USDT").
    #[arg(long)]
    pub symbol: Option<String>,

    /// Kline interval (e.g., "5m").
    #[arg(long)]
    pub timeframe: Option<String>,

    /// SQLite connection string.
    #[arg(long)]
    pub database_url: Option<String>,

    /// Port of the query interface.
    #[arg(long)]
    pub port: Option<u16>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut Config) {
        if let Some(symbol) = &self.symbol {
            config.market.symbol = symbol.clone();
        }
        if let Some(timeframe) = &self.timeframe {
            config.market.timeframe = timeframe.clone();
        }
        if let Some(url) = &self.database_url {
            config.database.url = url.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
    }
}
