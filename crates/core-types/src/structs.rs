use crate::enums::{Action, CommandKind};
use crate::error::CoreError;
use chrono::{DateTime, FixedOffset, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// The layout of a signal's local time when it is written to storage.
pub const SIGNAL_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One OHLCV price sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Bar {
    /// Builds a bar, rejecting a high below the low.
    pub fn new(
        open_time: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Result<Self, CoreError> {
        if high < low {
            return Err(CoreError::InvalidInput(
                "bar".to_string(),
                format!("high {} is below low {}", high, low),
            ));
        }
        Ok(Self { open_time, open, high, low, close, volume })
    }

    /// The close as `f64` for indicator math and signal prices.
    pub fn close_f64(&self) -> f64 {
        self.close.to_f64().unwrap_or(0.0)
    }

    pub fn high_f64(&self) -> f64 {
        self.high.to_f64().unwrap_or(0.0)
    }

    pub fn low_f64(&self) -> f64 {
        self.low.to_f64().unwrap_or(0.0)
    }

    /// Exchanges answer with a zero close when they have nothing for the pair.
    pub fn is_empty_sentinel(&self) -> bool {
        self.close.is_zero()
    }
}

/// A classified tick: the unit of output and persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    /// Local wall-clock time at which the signal was generated.
    pub time: DateTime<FixedOffset>,
    pub action: Action,
    pub symbol: String,
    pub price: f64,
    /// Human readable summary, e.g. `BUY BTC/USDT at 64250.10`.
    pub message: String,
    pub timeframe: String,
}

impl Signal {
    pub fn new(
        time: DateTime<FixedOffset>,
        action: Action,
        symbol: &str,
        price: f64,
        timeframe: &str,
    ) -> Self {
        let message = format!("{} {} at {:.2}", action.as_str().to_uppercase(), symbol, price);
        Self {
            time,
            action,
            symbol: symbol.to_string(),
            price,
            message,
            timeframe: timeframe.to_string(),
        }
    }

    /// The time column as written to storage.
    pub fn local_time_string(&self) -> String {
        self.time.format(SIGNAL_TIME_FORMAT).to_string()
    }
}

/// A control message received from an operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Monotonically increasing id assigned by the command source.
    pub id: i64,
    pub kind: CommandKind,
    /// Where replies for this command should go (a chat id for Telegram).
    pub origin: i64,
}
