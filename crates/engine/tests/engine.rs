use alerter::{AlerterError, CommandSource, Notifier};
use api_client::{ApiError, PriceSource};
use async_trait::async_trait;
use chrono::Utc;
use configuration::{Config, StrategyParams};
use core_types::{Action, Bar, Command, CommandKind, Signal};
use database::{DbError, DbRepository, SignalStore};
use engine::{CycleOutcome, SignalEngine};
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use strategies::{Evaluation, IndicatorSnapshot, KdjThreshold, Strategy, StrategyError};
use tokio::sync::{mpsc, watch};
use tokio::time::Duration;

// --- Fakes ---

fn bar(close: i64) -> Bar {
    Bar::new(
        Utc::now(),
        Decimal::from(close),
        Decimal::from(close + 1),
        Decimal::from(close - 1),
        Decimal::from(close),
        Decimal::from(10),
    )
    .unwrap()
}

/// Hands out scripted bars; `None` entries fail, and an exhausted script repeats 100.
#[derive(Default)]
struct ScriptedPrices {
    script: Mutex<VecDeque<Option<Bar>>>,
    calls: Mutex<usize>,
}

impl ScriptedPrices {
    fn new(script: Vec<Option<Bar>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(0),
        }
    }

    fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl PriceSource for ScriptedPrices {
    async fn fetch_latest_bar(&self, symbol: &str, _timeframe: &str) -> Result<Bar, ApiError> {
        *self.calls.lock().unwrap() += 1;
        match self.script.lock().unwrap().pop_front() {
            Some(Some(bar)) => Ok(bar),
            Some(None) => Err(ApiError::EmptyResponse(symbol.to_string())),
            None => Ok(bar(100)),
        }
    }
}

/// Returns scripted actions regardless of the bar, holding once the script runs out.
struct ScriptedStrategy {
    actions: VecDeque<Action>,
    seen: usize,
}

impl ScriptedStrategy {
    fn new(actions: Vec<Action>) -> Self {
        Self {
            actions: actions.into(),
            seen: 0,
        }
    }
}

impl Strategy for ScriptedStrategy {
    fn evaluate(&mut self, _bar: &Bar) -> Result<Evaluation, StrategyError> {
        self.seen += 1;
        Ok(Evaluation {
            snapshot: IndicatorSnapshot::default(),
            action: self.actions.pop_front().unwrap_or(Action::Hold),
        })
    }

    fn history_len(&self) -> usize {
        self.seen
    }
}

/// Every command ever sent, with the replies the engine produced.
#[derive(Default)]
struct ScriptedCommands {
    commands: Mutex<Vec<Command>>,
    replies: Mutex<Vec<(i64, String)>>,
    failing: bool,
}

impl ScriptedCommands {
    fn new(commands: Vec<(i64, CommandKind)>) -> Self {
        let commands = commands
            .into_iter()
            .map(|(id, kind)| Command { id, kind, origin: 7 })
            .collect();
        Self {
            commands: Mutex::new(commands),
            ..Default::default()
        }
    }

    fn push(&self, id: i64, kind: CommandKind) {
        self.commands.lock().unwrap().push(Command { id, kind, origin: 7 });
    }

    fn replies(&self) -> Vec<String> {
        self.replies.lock().unwrap().iter().map(|(_, r)| r.clone()).collect()
    }
}

#[async_trait]
impl CommandSource for ScriptedCommands {
    async fn poll(&self, since: i64) -> Result<Vec<Command>, AlerterError> {
        if self.failing {
            return Err(AlerterError::ApiError("unreachable".to_string()));
        }
        Ok(self
            .commands
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.id >= since)
            .cloned()
            .collect())
    }

    async fn acknowledge(&self, command: &Command, reply: &str) -> Result<(), AlerterError> {
        self.replies.lock().unwrap().push((command.id, reply.to_string()));
        Ok(())
    }
}

struct ChannelNotifier(mpsc::UnboundedSender<Signal>);

#[async_trait]
impl Notifier for ChannelNotifier {
    async fn send(&self, signal: &Signal) -> Result<(), AlerterError> {
        let _ = self.0.send(signal.clone());
        Ok(())
    }
}

#[derive(Default)]
struct MemoryStore {
    rows: Mutex<Vec<Signal>>,
    failing: bool,
}

#[async_trait]
impl SignalStore for MemoryStore {
    async fn append(&self, signal: &Signal) -> Result<i64, DbError> {
        if self.failing {
            return Err(DbError::ConnectionConfigError("store offline".to_string()));
        }
        let mut rows = self.rows.lock().unwrap();
        rows.push(signal.clone());
        Ok(rows.len() as i64)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<Signal>, DbError> {
        Ok(self.rows.lock().unwrap().iter().rev().take(limit).cloned().collect())
    }
}

fn config() -> Config {
    let mut config = Config::default();
    config.engine.activation_grace_secs = 30;
    config.engine.poll_interval_secs = 300;
    config.engine.command_poll_interval_secs = 5;
    config
}

// --- Scenarios ---

#[tokio::test]
async fn buy_signal_is_persisted_published_and_alerted_once() {
    let pool = database::connect("sqlite::memory:", 1).await.unwrap();
    database::init_schema(&pool).await.unwrap();
    let config = config();
    let store = Arc::new(DbRepository::new(pool, config.engine.local_offset().unwrap()));
    let commands = Arc::new(ScriptedCommands::new(vec![(1, CommandKind::Start)]));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut engine = SignalEngine::new(
        &config,
        Box::new(ScriptedStrategy::new(vec![Action::Hold, Action::Hold, Action::Buy])),
        Arc::new(ScriptedPrices::new(vec![Some(bar(100)), Some(bar(99)), Some(bar(97))])),
        store.clone(),
    )
    .unwrap()
    .with_command_source(commands.clone())
    .with_notifier(Arc::new(ChannelNotifier(tx)));
    let handle = engine.handle();

    for _ in 0..3 {
        assert!(matches!(engine.run_cycle().await.unwrap(), CycleOutcome::Published(_)));
    }

    let alerted = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(alerted.action, Action::Buy);
    assert_eq!(alerted.message, "BUY BTC/USDT at 97.00");
    tokio::task::yield_now().await;
    assert!(rx.try_recv().is_err());

    let status = handle.status().await;
    assert!(status.active);
    assert_eq!(status.latest_signal.unwrap().action, Action::Buy);

    let recent = handle.recent_signals(10).await.unwrap();
    let actions: Vec<Action> = recent.iter().map(|s| s.action).collect();
    assert_eq!(actions, vec![Action::Buy, Action::Hold, Action::Hold]);
    assert_eq!(store.count().await.unwrap(), 3);
}

#[tokio::test]
async fn collapse_after_rally_raises_one_buy_through_kdj() {
    // A one-point bar range around each close.
    fn tight_bar(close: i64) -> Bar {
        let close = Decimal::from(close);
        let half = Decimal::new(5, 1);
        Bar::new(Utc::now(), close, close + half, close - half, close, Decimal::from(10)).unwrap()
    }

    let pool = database::connect("sqlite::memory:", 1).await.unwrap();
    database::init_schema(&pool).await.unwrap();
    let config = config();
    let store = Arc::new(DbRepository::new(pool, config.engine.local_offset().unwrap()));
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut closes: Vec<i64> = (0..20).map(|i| 100 + i).collect();
    closes.extend([100, 95, 90]);
    let script = closes.iter().map(|&close| Some(tight_bar(close))).collect();

    let mut engine = SignalEngine::new(
        &config,
        Box::new(KdjThreshold::new(&StrategyParams::default()).unwrap()),
        Arc::new(ScriptedPrices::new(script)),
        store.clone(),
    )
    .unwrap()
    .with_command_source(Arc::new(ScriptedCommands::new(vec![(1, CommandKind::Start)])))
    .with_notifier(Arc::new(ChannelNotifier(tx)));
    let handle = engine.handle();

    let mut actions = Vec::new();
    for _ in 0..closes.len() {
        match engine.run_cycle().await.unwrap() {
            CycleOutcome::Published(signal) => actions.push(signal.action),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
    // The rally holds J near 94; the last two drops push it to about -25.
    let (last, rally) = actions.split_last().unwrap();
    assert_eq!(*last, Action::Buy);
    assert!(rally.iter().all(|action| *action == Action::Hold));

    let alerted = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(alerted.message, "BUY BTC/USDT at 90.00");
    tokio::task::yield_now().await;
    assert!(rx.try_recv().is_err());

    let status = handle.status().await;
    assert_eq!(status.latest_signal.unwrap().action, Action::Buy);
    assert_eq!(store.count().await.unwrap(), 23);
    assert_eq!(handle.recent_signals(1).await.unwrap()[0].action, Action::Buy);
}

#[tokio::test]
async fn start_received_while_stopped_applies_to_the_same_cycle() {
    let commands = Arc::new(ScriptedCommands::new(vec![(5, CommandKind::Start)]));
    let prices = Arc::new(ScriptedPrices::default());
    let mut engine = SignalEngine::new(
        &config(),
        Box::new(ScriptedStrategy::new(vec![])),
        prices.clone(),
        Arc::new(MemoryStore::default()),
    )
    .unwrap()
    .with_command_source(commands.clone());

    let outcome = engine.run_cycle().await.unwrap();
    assert!(matches!(outcome, CycleOutcome::Published(ref s) if s.action == Action::Hold));
    assert_eq!(prices.calls(), 1);
    assert_eq!(commands.replies(), vec!["Bot started."]);
}

#[tokio::test]
async fn stopped_engine_neither_fetches_nor_publishes() {
    let prices = Arc::new(ScriptedPrices::default());
    let store = Arc::new(MemoryStore::default());
    let mut engine = SignalEngine::new(
        &config(),
        Box::new(ScriptedStrategy::new(vec![])),
        prices.clone(),
        store.clone(),
    )
    .unwrap();

    assert_eq!(engine.run_cycle().await.unwrap(), CycleOutcome::Inactive);
    assert_eq!(prices.calls(), 0);
    assert!(store.recent(10).await.unwrap().is_empty());
    assert!(engine.handle().status().await.latest_signal.is_none());
}

#[tokio::test]
async fn fetch_failure_leaves_history_untouched() {
    let commands = Arc::new(ScriptedCommands::new(vec![(1, CommandKind::Start)]));
    let store = Arc::new(MemoryStore::default());
    let mut engine = SignalEngine::new(
        &config(),
        Box::new(KdjThreshold::new(&StrategyParams::default()).unwrap()),
        Arc::new(ScriptedPrices::new(vec![Some(bar(100)), None, Some(bar(101))])),
        store.clone(),
    )
    .unwrap()
    .with_command_source(commands);

    assert!(matches!(engine.run_cycle().await.unwrap(), CycleOutcome::Published(_)));
    assert_eq!(engine.history_len(), 1);

    assert_eq!(engine.run_cycle().await.unwrap(), CycleOutcome::FetchFailed);
    assert_eq!(engine.history_len(), 1);
    assert_eq!(store.recent(10).await.unwrap().len(), 1);

    assert!(matches!(engine.run_cycle().await.unwrap(), CycleOutcome::Published(_)));
    assert_eq!(engine.history_len(), 2);
    assert_eq!(store.recent(10).await.unwrap().len(), 2);
}

#[tokio::test]
async fn store_failure_still_updates_latest_signal() {
    let commands = Arc::new(ScriptedCommands::new(vec![(1, CommandKind::Start)]));
    let mut engine = SignalEngine::new(
        &config(),
        Box::new(ScriptedStrategy::new(vec![Action::Sell])),
        Arc::new(ScriptedPrices::default()),
        Arc::new(MemoryStore { failing: true, ..Default::default() }),
    )
    .unwrap()
    .with_command_source(commands);

    assert!(matches!(engine.run_cycle().await.unwrap(), CycleOutcome::Published(_)));
    let status = engine.handle().status().await;
    assert_eq!(status.latest_signal.unwrap().action, Action::Sell);
    assert!(engine.handle().recent_signals(5).await.unwrap().is_empty());
}

#[tokio::test]
async fn repeated_commands_are_idempotent_and_consumed_once() {
    let commands = Arc::new(ScriptedCommands::new(vec![
        (1, CommandKind::Start),
        (2, CommandKind::Start),
        (3, CommandKind::Stop),
        (4, CommandKind::Stop),
        (5, CommandKind::Unrecognized),
    ]));
    let mut engine = SignalEngine::new(
        &config(),
        Box::new(ScriptedStrategy::new(vec![])),
        Arc::new(ScriptedPrices::default()),
        Arc::new(MemoryStore::default()),
    )
    .unwrap()
    .with_command_source(commands.clone());

    assert_eq!(engine.run_cycle().await.unwrap(), CycleOutcome::Inactive);
    assert_eq!(
        commands.replies(),
        vec!["Bot started.", "Bot is already running.", "Bot stopped.", "Bot is already stopped."]
    );

    assert_eq!(engine.run_cycle().await.unwrap(), CycleOutcome::Inactive);
    assert_eq!(commands.replies().len(), 4);

    commands.push(6, CommandKind::Status);
    engine.run_cycle().await.unwrap();
    assert_eq!(commands.replies().last().unwrap(), "Status: stopped\nLast signal: none");
}

#[tokio::test]
async fn failing_command_source_does_not_block_the_cycle() {
    let commands = Arc::new(ScriptedCommands { failing: true, ..Default::default() });
    let mut engine = SignalEngine::new(
        &config(),
        Box::new(ScriptedStrategy::new(vec![])),
        Arc::new(ScriptedPrices::default()),
        Arc::new(MemoryStore::default()),
    )
    .unwrap()
    .with_command_source(commands);

    assert_eq!(engine.run_cycle().await.unwrap(), CycleOutcome::Inactive);
}

#[tokio::test(start_paused = true)]
async fn grace_period_activates_exactly_once() {
    let commands = Arc::new(ScriptedCommands::default());
    let mut engine = SignalEngine::new(
        &config(),
        Box::new(ScriptedStrategy::new(vec![])),
        Arc::new(ScriptedPrices::default()),
        Arc::new(MemoryStore::default()),
    )
    .unwrap()
    .with_command_source(commands.clone());

    tokio::time::advance(Duration::from_secs(29)).await;
    assert_eq!(engine.run_cycle().await.unwrap(), CycleOutcome::Inactive);

    tokio::time::advance(Duration::from_secs(1)).await;
    assert!(matches!(engine.run_cycle().await.unwrap(), CycleOutcome::Published(_)));

    commands.push(1, CommandKind::Stop);
    assert_eq!(engine.run_cycle().await.unwrap(), CycleOutcome::Inactive);

    tokio::time::advance(Duration::from_secs(3600)).await;
    assert_eq!(engine.run_cycle().await.unwrap(), CycleOutcome::Inactive);
    assert!(!engine.handle().status().await.active);
}

#[tokio::test(start_paused = true)]
async fn early_stop_does_not_cancel_the_auto_start() {
    let commands = Arc::new(ScriptedCommands::new(vec![(1, CommandKind::Stop)]));
    let mut engine = SignalEngine::new(
        &config(),
        Box::new(ScriptedStrategy::new(vec![])),
        Arc::new(ScriptedPrices::default()),
        Arc::new(MemoryStore::default()),
    )
    .unwrap()
    .with_command_source(commands.clone());

    assert_eq!(engine.run_cycle().await.unwrap(), CycleOutcome::Inactive);
    assert_eq!(commands.replies(), vec!["Bot is already stopped."]);

    tokio::time::advance(Duration::from_secs(30)).await;
    assert!(matches!(engine.run_cycle().await.unwrap(), CycleOutcome::Published(_)));
    assert!(engine.handle().status().await.active);
}

#[tokio::test(start_paused = true)]
async fn stop_after_an_early_start_stays_stopped() {
    let commands = Arc::new(ScriptedCommands::new(vec![
        (1, CommandKind::Start),
        (2, CommandKind::Stop),
    ]));
    let mut engine = SignalEngine::new(
        &config(),
        Box::new(ScriptedStrategy::new(vec![])),
        Arc::new(ScriptedPrices::default()),
        Arc::new(MemoryStore::default()),
    )
    .unwrap()
    .with_command_source(commands);

    assert_eq!(engine.run_cycle().await.unwrap(), CycleOutcome::Inactive);
    tokio::time::advance(Duration::from_secs(60)).await;
    assert_eq!(engine.run_cycle().await.unwrap(), CycleOutcome::Inactive);
}

#[tokio::test(start_paused = true)]
async fn run_loop_auto_starts_and_honours_shutdown() {
    let store = Arc::new(MemoryStore::default());
    let engine = SignalEngine::new(
        &config(),
        Box::new(ScriptedStrategy::new(vec![])),
        Arc::new(ScriptedPrices::default()),
        store.clone(),
    )
    .unwrap();
    let handle = engine.handle();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(engine.run(shutdown_rx));

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(!handle.status().await.active);

    // Grace ends at 30s; the first active cycle then waits a full period.
    tokio::time::sleep(Duration::from_secs(25)).await;
    assert!(handle.status().await.active);
    assert_eq!(store.recent(10).await.unwrap().len(), 1);

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(store.recent(10).await.unwrap().len(), 2);

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .unwrap()
        .unwrap();
}
