//! # Alerter
//!
//! The operator-facing edge of the engine: outbound alerts for actionable signals and
//! inbound `/start`, `/stop` and `/status` commands, both over the Telegram Bot API.
//!
//! ## Public API
//!
//! - `Notifier`: delivers one `Signal` to the operator.
//! - `CommandSource`: yields operator commands after a cursor and replies to them.
//! - `TelegramAlerter`: the Telegram implementation of both traits.

use async_trait::async_trait;
use configuration::TelegramConfig;
use core_types::{Command, CommandKind, Signal};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub mod error;
pub mod responses;

pub use error::AlerterError;
use responses::{SendMessagePayload, TelegramResponse, Update};

/// Best-effort outbound delivery of a signal.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, signal: &Signal) -> Result<(), AlerterError>;
}

/// A queue of operator commands addressed by a monotonically increasing id.
#[async_trait]
pub trait CommandSource: Send + Sync {
    /// Returns every command with `id >= since`, oldest first.
    async fn poll(&self, since: i64) -> Result<Vec<Command>, AlerterError>;

    /// Sends `reply` back to wherever `command` came from.
    async fn acknowledge(&self, command: &Command, reply: &str) -> Result<(), AlerterError>;
}

/// Renders a signal the way operators read it in the chat.
pub fn format_signal(signal: &Signal) -> String {
    format!(
        "Time: {}\nAction: {}\nPrice: {:.2}\nMessage: {}",
        signal.local_time_string(),
        signal.action,
        signal.price,
        signal.message
    )
}

/// A client for the Telegram Bot API.
pub struct TelegramAlerter {
    client: Client,
    base_url: String,
    token: String,
    chat_id: String,
    poll_timeout_secs: u64,
}

impl TelegramAlerter {
    /// Creates a new `TelegramAlerter`.
    ///
    /// Fails with `NotConfigured` if the token or chat_id is missing, allowing the
    /// caller to run without alerting or remote control.
    pub fn new(config: &TelegramConfig) -> Result<Self, AlerterError> {
        if !config.is_configured() {
            return Err(AlerterError::NotConfigured);
        }
        // The long poll must finish well inside the request timeout.
        let timeout = config
            .request_timeout_secs
            .max(config.poll_timeout_secs + 5);
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            chat_id: config.chat_id.clone(),
            poll_timeout_secs: config.poll_timeout_secs,
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.token, method)
    }

    /// Sends a text message to `chat_id`.
    pub async fn send_message(&self, chat_id: &str, text: &str) -> Result<(), AlerterError> {
        let payload = SendMessagePayload {
            chat_id,
            text,
            parse_mode: None,
        };
        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to decode error response".to_string());
            return Err(AlerterError::ApiError(error_text));
        }
        Ok(())
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, AlerterError> {
        let status = response.status();
        let text = response.text().await?;
        let envelope: TelegramResponse<T> = serde_json::from_str(&text)
            .map_err(|e| AlerterError::Deserialization(format!("{}: {}", e, text)))?;
        if !status.is_success() || !envelope.ok {
            return Err(AlerterError::ApiError(
                envelope
                    .description
                    .unwrap_or_else(|| format!("HTTP {}", status)),
            ));
        }
        envelope
            .result
            .ok_or_else(|| AlerterError::Deserialization("missing result".to_string()))
    }
}

#[async_trait]
impl Notifier for TelegramAlerter {
    async fn send(&self, signal: &Signal) -> Result<(), AlerterError> {
        self.send_message(&self.chat_id, &format_signal(signal)).await
    }
}

#[async_trait]
impl CommandSource for TelegramAlerter {
    async fn poll(&self, since: i64) -> Result<Vec<Command>, AlerterError> {
        let response = self
            .client
            .get(self.method_url("getUpdates"))
            .query(&[
                ("offset", since.to_string()),
                ("timeout", self.poll_timeout_secs.to_string()),
            ])
            .send()
            .await?;
        let updates: Vec<Update> = Self::decode(response).await?;

        // Updates without a text message, or from any chat but the configured one,
        // still consume their id.
        let mut commands: Vec<Command> = updates
            .into_iter()
            .filter(|update| update.update_id >= since)
            .map(|update| {
                let (kind, origin) = match update.message {
                    Some(message) if message.chat.id.to_string() != self.chat_id => {
                        tracing::warn!(
                            update_id = update.update_id,
                            chat_id = message.chat.id,
                            "Ignoring a message from an unauthorized chat"
                        );
                        (CommandKind::Unrecognized, message.chat.id)
                    }
                    Some(message) => (
                        message
                            .text
                            .as_deref()
                            .map(CommandKind::parse)
                            .unwrap_or(CommandKind::Unrecognized),
                        message.chat.id,
                    ),
                    None => (CommandKind::Unrecognized, 0),
                };
                Command {
                    id: update.update_id,
                    kind,
                    origin,
                }
            })
            .collect();
        commands.sort_by_key(|command| command.id);
        tracing::debug!(since, count = commands.len(), "Polled Telegram updates");
        Ok(commands)
    }

    async fn acknowledge(&self, command: &Command, reply: &str) -> Result<(), AlerterError> {
        self.send_message(&command.origin.to_string(), reply).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use core_types::Action;

    #[test]
    fn signal_alert_lists_time_action_price_and_message() {
        let offset = FixedOffset::east_opt(3600).unwrap();
        let time = offset.with_ymd_and_hms(2024, 5, 1, 13, 5, 0).unwrap();
        let signal = Signal::new(time, Action::Sell, "BTC/USDT", 70000.5, "5m");

        assert_eq!(
            format_signal(&signal),
            "Time: 2024-05-01 13:05:00\nAction: sell\nPrice: 70000.50\nMessage: SELL BTC/USDT at 70000.50"
        );
    }

    #[test]
    fn missing_credentials_are_rejected() {
        let config = TelegramConfig::default();
        assert!(matches!(
            TelegramAlerter::new(&config),
            Err(AlerterError::NotConfigured)
        ));
    }
}
