use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use configuration::MarketSettings;
use core_types::Bar;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;

pub mod error;
pub mod responses;

// --- Public API ---
pub use error::ApiError;
pub use responses::{ApiErrorResponse, RawKline};

/// The abstract interface for anything that can hand the engine its latest price bar.
/// This trait is the contract the engine uses, allowing the underlying
/// implementation (live or scripted) to be swapped out.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetches the most recent bar for `symbol` on `timeframe`.
    async fn fetch_latest_bar(&self, symbol: &str, timeframe: &str) -> Result<Bar, ApiError>;
}

/// A concrete implementation of `PriceSource` for Binance's public spot klines.
#[derive(Clone)]
pub struct BinanceClient {
    client: reqwest::Client,
    base_url: String,
}

impl BinanceClient {
    pub fn new(settings: &MarketSettings) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs.max(1)))
            .build()?;
        Ok(Self::with_client(settings.base_url.clone(), client))
    }

    /// Builds a client against an arbitrary base URL (used for tests and mirrors).
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

/// Turns `BTC/USDT` into Binance's `BTCUSDT`.
pub fn exchange_symbol(symbol: &str) -> String {
    symbol
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase()
}

fn parse_decimal(field: &str, value: &str) -> Result<Decimal, ApiError> {
    Decimal::from_str(value)
        .map_err(|e| ApiError::Deserialization(format!("{} '{}': {}", field, value, e)))
}

impl TryFrom<RawKline> for Bar {
    type Error = ApiError;

    fn try_from(raw: RawKline) -> Result<Self, Self::Error> {
        let open_time = Utc
            .timestamp_millis_opt(raw.0)
            .single()
            .ok_or_else(|| ApiError::InvalidData(format!("Invalid open_time: {}", raw.0)))?;
        Bar::new(
            open_time,
            parse_decimal("open", &raw.1)?,
            parse_decimal("high", &raw.2)?,
            parse_decimal("low", &raw.3)?,
            parse_decimal("close", &raw.4)?,
            parse_decimal("volume", &raw.5)?,
        )
        .map_err(|e| ApiError::InvalidData(e.to_string()))
    }
}

#[async_trait]
impl PriceSource for BinanceClient {
    async fn fetch_latest_bar(&self, symbol: &str, timeframe: &str) -> Result<Bar, ApiError> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let pair = exchange_symbol(symbol);

        let response = self
            .client
            .get(&url)
            .query(&[("symbol", pair.as_str()), ("interval", timeframe), ("limit", "1")])
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let api_error: ApiErrorResponse = serde_json::from_str(&text).map_err(|e| {
                ApiError::Deserialization(format!(
                    "Failed to deserialize error response: {}. Original text: {}",
                    e, text
                ))
            })?;
            return Err(ApiError::ExchangeError(api_error.code, api_error.msg));
        }

        let klines: Vec<RawKline> =
            serde_json::from_str(&text).map_err(|e| ApiError::Deserialization(e.to_string()))?;
        let raw = klines
            .into_iter()
            .last()
            .ok_or_else(|| ApiError::EmptyResponse(symbol.to_string()))?;
        let bar = Bar::try_from(raw)?;

        if bar.is_empty_sentinel() {
            return Err(ApiError::EmptyResponse(symbol.to_string()));
        }

        tracing::debug!(symbol, timeframe, close = %bar.close, "Fetched latest bar");
        Ok(bar)
    }
}
