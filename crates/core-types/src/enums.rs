use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The classification a single tick receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    /// The lowercase name used in storage and JSON.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "buy",
            Action::Sell => "sell",
            Action::Hold => "hold",
        }
    }

    /// Only buy and sell are worth telling anyone about.
    pub fn is_actionable(&self) -> bool {
        !matches!(self, Action::Hold)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "buy" => Ok(Action::Buy),
            "sell" => Ok(Action::Sell),
            "hold" => Ok(Action::Hold),
            other => Err(CoreError::UnknownAction(other.to_string())),
        }
    }
}

/// Whether the engine is currently allowed to classify, persist and notify.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationStatus {
    #[default]
    Stopped,
    Active,
}

impl ActivationStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, ActivationStatus::Active)
    }
}

impl fmt::Display for ActivationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivationStatus::Stopped => f.write_str("stopped"),
            ActivationStatus::Active => f.write_str("active"),
        }
    }
}

/// What an operator asked for over the remote control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandKind {
    Start,
    Stop,
    Status,
    /// Any other text. It still moves the cursor forward but is otherwise ignored.
    Unrecognized,
}

impl CommandKind {
    /// Parses chat text such as `/start` or `/stop@my_bot`.
    pub fn parse(text: &str) -> Self {
        let word = text.split_whitespace().next().unwrap_or_default();
        let word = word.split('@').next().unwrap_or_default();
        match word {
            "/start" => CommandKind::Start,
            "/stop" => CommandKind::Stop,
            "/status" => CommandKind::Status,
            _ => CommandKind::Unrecognized,
        }
    }
}
