//! # Sentinel Engine
//!
//! The polling loop that ties the system together: it pulls the latest bar, runs the
//! strategy, publishes the resulting signal and obeys the operator's start/stop
//! commands.
//!
//! ## Architectural Principles
//!
//! - **Collaborators behind traits:** prices, commands, notifications and storage
//!   are all `Arc<dyn Trait>`, so the loop runs the same against fakes and the
//!   real exchange.
//! - **One lock, short holds:** status and the latest signal live in one
//!   `RwLock<EngineState>`. Network calls never happen while it is held, except
//!   the store append that must land together with the latest-signal update.
//! - **Fire-and-forget alerts:** notifications run on detached tasks and can never
//!   stall a cycle.
//!
//! ## Public API
//!
//! - `SignalEngine`: owns the strategy and drives cycles.
//! - `EngineHandle`: cheap, cloneable read access for the query interface.
//! - `ActivationController`: the start/stop gate with its one-shot auto-start.

use alerter::{CommandSource, Notifier};
use api_client::PriceSource;
use chrono::{FixedOffset, Utc};
use configuration::Config;
use core_types::Signal;
use database::SignalStore;
use std::sync::Arc;
use strategies::Strategy;
use tokio::sync::{RwLock, watch};
use tokio::time::{Duration, Instant};

pub mod activation;
pub mod error;
pub mod state;

pub use activation::{ActivationController, Transition};
pub use error::EngineError;
pub use state::{EngineHandle, EngineState, EngineStatus};

/// What a single cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The engine is stopped; nothing was fetched.
    Inactive,
    /// The price source failed. The history is untouched.
    FetchFailed,
    /// A signal was produced and published.
    Published(Signal),
}

/// The central orchestrator of the signal service.
pub struct SignalEngine {
    // --- Configuration ---
    symbol: String,
    timeframe: String,
    poll_interval: Duration,
    command_poll_interval: Duration,
    offset: FixedOffset,

    // --- Collaborators ---
    strategy: Box<dyn Strategy>,
    price_source: Arc<dyn PriceSource>,
    store: Arc<dyn SignalStore>,
    commands: Option<Arc<dyn CommandSource>>,
    notifier: Option<Arc<dyn Notifier>>,

    // --- Shared state ---
    state: Arc<RwLock<EngineState>>,
    /// The next command id to ask for.
    cursor: i64,
}

impl SignalEngine {
    /// Creates an engine in the `Stopped` state. The grace period starts now.
    pub fn new(
        config: &Config,
        strategy: Box<dyn Strategy>,
        price_source: Arc<dyn PriceSource>,
        store: Arc<dyn SignalStore>,
    ) -> Result<Self, EngineError> {
        let engine = &config.engine;
        let activation = ActivationController::new(
            Duration::from_secs(engine.activation_grace_secs),
            Instant::now(),
        );
        Ok(Self {
            symbol: config.market.symbol.clone(),
            timeframe: config.market.timeframe.clone(),
            poll_interval: Duration::from_secs(engine.poll_interval_secs),
            command_poll_interval: Duration::from_secs(engine.command_poll_interval_secs),
            offset: engine.local_offset()?,
            strategy,
            price_source,
            store,
            commands: None,
            notifier: None,
            state: Arc::new(RwLock::new(EngineState::new(activation))),
            cursor: 0,
        })
    }

    pub fn with_command_source(mut self, commands: Arc<dyn CommandSource>) -> Self {
        self.commands = Some(commands);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle::new(
            Arc::clone(&self.state),
            Arc::clone(&self.store),
            self.symbol.clone(),
            self.timeframe.clone(),
        )
    }

    /// Number of bars the strategy currently remembers.
    pub fn history_len(&self) -> usize {
        self.strategy.history_len()
    }

    /// Runs cycles until `shutdown` flips to `true` or its sender goes away.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            symbol = %self.symbol,
            timeframe = %self.timeframe,
            "Engine started. Waiting for /start or the activation grace period."
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let outcome = match self.run_cycle().await {
                Ok(outcome) => Some(outcome),
                Err(e) => {
                    tracing::error!(error = %e, "Engine cycle failed");
                    None
                }
            };
            let pause = self.next_pause(outcome.as_ref()).await;

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        tracing::info!("Engine stopped.");
    }

    /// One pass: drain commands, gate, fetch, classify, publish, drain again.
    pub async fn run_cycle(&mut self) -> Result<CycleOutcome, EngineError> {
        self.drain_commands().await;

        let active = {
            let mut state = self.state.write().await;
            if state.activation.poll_grace(Instant::now()) {
                tracing::info!("No operator command within the grace period. Engine activated.");
            }
            state.activation.is_active()
        };

        let outcome = if active {
            self.process_latest_bar().await
        } else {
            Ok(CycleOutcome::Inactive)
        };

        self.drain_commands().await;
        outcome
    }

    async fn process_latest_bar(&mut self) -> Result<CycleOutcome, EngineError> {
        let bar = match self
            .price_source
            .fetch_latest_bar(&self.symbol, &self.timeframe)
            .await
        {
            Ok(bar) => bar,
            Err(e) => {
                tracing::warn!(symbol = %self.symbol, error = %e, "Failed to fetch latest bar");
                return Ok(CycleOutcome::FetchFailed);
            }
        };

        let evaluation = self.strategy.evaluate(&bar)?;
        let signal = Signal::new(
            Utc::now().with_timezone(&self.offset),
            evaluation.action,
            &self.symbol,
            bar.close_f64(),
            &self.timeframe,
        );
        tracing::info!(
            action = %signal.action,
            price = signal.price,
            rsi = ?evaluation.snapshot.rsi,
            j = ?evaluation.snapshot.j(),
            "{}",
            signal.message
        );

        self.publish(&signal).await;
        Ok(CycleOutcome::Published(signal))
    }

    /// Persists the signal and makes it the latest, then alerts on buy/sell.
    async fn publish(&self, signal: &Signal) {
        {
            let mut state = self.state.write().await;
            if let Err(e) = self.store.append(signal).await {
                tracing::error!(error = %e, "Failed to persist signal");
            }
            state.latest_signal = Some(signal.clone());
        }

        if !signal.action.is_actionable() {
            return;
        }
        if let Some(notifier) = &self.notifier {
            let notifier = Arc::clone(notifier);
            let signal = signal.clone();
            tokio::spawn(async move {
                if let Err(e) = notifier.send(&signal).await {
                    tracing::error!(error = %e, "Failed to send signal alert");
                }
            });
        }
    }

    /// Applies every pending operator command in arrival order.
    async fn drain_commands(&mut self) {
        let Some(source) = self.commands.clone() else {
            return;
        };
        let commands = match source.poll(self.cursor).await {
            Ok(commands) => commands,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to poll operator commands");
                return;
            }
        };

        for command in commands {
            if command.id < self.cursor {
                continue;
            }
            self.cursor = command.id + 1;

            let reply = {
                let mut state = self.state.write().await;
                state.apply_command(command.kind, Instant::now())
            };
            tracing::info!(id = command.id, kind = ?command.kind, "Applied operator command");

            if let Some(reply) = reply {
                if let Err(e) = source.acknowledge(&command, &reply).await {
                    tracing::warn!(error = %e, "Failed to reply to operator command");
                }
            }
        }
    }

    /// Full period after an active cycle, a short poll while stopped.
    async fn next_pause(&self, outcome: Option<&CycleOutcome>) -> Duration {
        if !matches!(outcome, Some(CycleOutcome::Inactive)) {
            return self.poll_interval;
        }
        let state = self.state.read().await;
        match state.activation.remaining_grace(Instant::now()) {
            Some(remaining) => self.command_poll_interval.min(remaining),
            None => self.command_poll_interval,
        }
    }
}
