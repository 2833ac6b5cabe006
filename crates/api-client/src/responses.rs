use serde::Deserialize;

/// One row of `GET /api/v3/klines`.
///
/// Binance sends klines as positional arrays:
/// `[open_time, open, high, low, close, volume, close_time, quote_volume,
///   trades, taker_base_volume, taker_quote_volume, ignore]`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawKline(
    pub i64,
    pub String,
    pub String,
    pub String,
    pub String,
    pub String,
    pub i64,
    pub String,
    pub i64,
    pub String,
    pub String,
    pub String,
);

/// Represents an error response from the Binance API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub code: i64,
    pub msg: String,
}
