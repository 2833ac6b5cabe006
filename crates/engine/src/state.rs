use crate::activation::{ActivationController, Transition};
use core_types::{ActivationStatus, CommandKind, Signal};
use database::{DbError, SignalStore};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Instant;

/// Everything the engine shares with readers. Guarded by one `RwLock`.
#[derive(Debug)]
pub struct EngineState {
    pub activation: ActivationController,
    pub latest_signal: Option<Signal>,
}

impl EngineState {
    pub fn new(activation: ActivationController) -> Self {
        Self {
            activation,
            latest_signal: None,
        }
    }

    /// Applies an operator command and returns the reply owed to its sender.
    ///
    /// A pending auto-start is settled first, so a command arriving after the
    /// deadline acts on the already-activated engine.
    pub fn apply_command(&mut self, kind: CommandKind, now: Instant) -> Option<String> {
        self.activation.poll_grace(now);
        match self.activation.apply(kind) {
            Transition::Started => Some("Bot started.".to_string()),
            Transition::Stopped => Some("Bot stopped.".to_string()),
            Transition::Unchanged(ActivationStatus::Active) => {
                Some("Bot is already running.".to_string())
            }
            Transition::Unchanged(ActivationStatus::Stopped) => {
                Some("Bot is already stopped.".to_string())
            }
            Transition::Ignored if kind == CommandKind::Status => Some(self.status_report()),
            Transition::Ignored => None,
        }
    }

    fn status_report(&self) -> String {
        let last = self
            .latest_signal
            .as_ref()
            .map(|signal| format!("{} ({})", signal.message, signal.local_time_string()))
            .unwrap_or_else(|| "none".to_string());
        format!("Status: {}\nLast signal: {}", self.activation.status(), last)
    }
}

/// A point-in-time view of the engine for the query interface.
#[derive(Debug, Clone, Serialize)]
pub struct EngineStatus {
    pub active: bool,
    pub status: ActivationStatus,
    pub symbol: String,
    pub timeframe: String,
    pub latest_signal: Option<Signal>,
}

/// Read-only access to a running engine.
#[derive(Clone)]
pub struct EngineHandle {
    state: Arc<RwLock<EngineState>>,
    store: Arc<dyn SignalStore>,
    symbol: String,
    timeframe: String,
}

impl EngineHandle {
    pub(crate) fn new(
        state: Arc<RwLock<EngineState>>,
        store: Arc<dyn SignalStore>,
        symbol: String,
        timeframe: String,
    ) -> Self {
        Self {
            state,
            store,
            symbol,
            timeframe,
        }
    }

    pub async fn status(&self) -> EngineStatus {
        let state = self.state.read().await;
        EngineStatus {
            active: state.activation.is_active(),
            status: state.activation.status(),
            symbol: self.symbol.clone(),
            timeframe: self.timeframe.clone(),
            latest_signal: state.latest_signal.clone(),
        }
    }

    /// The most recent persisted signals, newest first.
    pub async fn recent_signals(&self, limit: usize) -> Result<Vec<Signal>, DbError> {
        self.store.recent(limit).await
    }
}
