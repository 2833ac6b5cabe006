use alerter::{AlerterError, TelegramAlerter};
use anyhow::Context;
use api_client::BinanceClient;
use clap::{Parser, Subcommand};
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use configuration::{Config, ConfigOverrides};
use database::{DbRepository, SignalStore};
use engine::SignalEngine;
use std::net::SocketAddr;
use std::sync::Arc;
use strategies::KdjThreshold;
use tokio::sync::watch;

/// The main entry point for the Sentinel signal service.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Secrets may live in a .env file; its absence is not an error.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load(&cli.overrides)?;

    match cli.command {
        Commands::Run => handle_run(config).await,
        Commands::Signals(args) => handle_signals(config, args).await,
        Commands::InitDb => handle_init_db(config).await,
    }
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// A KDJ signal service for crypto markets.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    overrides: ConfigOverrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the polling engine and the web server until Ctrl-C.
    Run,
    /// Print the most recent persisted signals.
    Signals(SignalsArgs),
    /// Create the signal table if it does not exist.
    InitDb,
}

#[derive(Parser)]
struct SignalsArgs {
    /// How many signals to show, newest first.
    #[arg(long, default_value_t = 20)]
    limit: usize,
}

fn load(overrides: &ConfigOverrides) -> anyhow::Result<Config> {
    let mut config = configuration::load_config_from(&overrides.config)
        .with_context(|| format!("Failed to load {}", overrides.config.display()))?;
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

async fn open_repository(config: &Config) -> anyhow::Result<DbRepository> {
    let pool = database::connect(&config.database.url, config.database.max_connections)
        .await
        .with_context(|| format!("Failed to open database at {}", config.database.url))?;
    database::init_schema(&pool)
        .await
        .context("Failed to create the signals table")?;
    Ok(DbRepository::new(pool, config.engine.local_offset()?))
}

// ==============================================================================
// Command Logic
// ==============================================================================

async fn handle_run(config: Config) -> anyhow::Result<()> {
    let _log_guard = configuration::logging::init(&config.logging)?;

    // A store that cannot be opened is fatal before anything starts.
    let repository = Arc::new(open_repository(&config).await?);
    let strategy = KdjThreshold::new(&config.strategy)?;
    let prices = Arc::new(BinanceClient::new(&config.market)?);

    let mut engine = SignalEngine::new(&config, Box::new(strategy), prices, repository.clone())?;
    match TelegramAlerter::new(&config.telegram) {
        Ok(telegram) => {
            let telegram = Arc::new(telegram);
            engine = engine
                .with_notifier(telegram.clone())
                .with_command_source(telegram);
        }
        Err(AlerterError::NotConfigured) => {
            tracing::warn!("Telegram is not configured. Alerts and remote control are disabled.");
        }
        Err(e) => return Err(e.into()),
    }
    let handle = engine.handle();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let engine_task = tokio::spawn(engine.run(shutdown_rx.clone()));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.server.host, config.server.port))?;
    let mut server_task = tokio::spawn(web_server::run_server(addr, handle, shutdown_rx));

    let server_result = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("Shutdown requested.");
            let _ = shutdown_tx.send(true);
            server_task.await?
        }
        // The server only ends on its own when it failed to bind or serve.
        finished = &mut server_task => {
            let _ = shutdown_tx.send(true);
            finished?
        }
    };

    engine_task.await?;
    repository.close().await;
    server_result
}

async fn handle_signals(config: Config, args: SignalsArgs) -> anyhow::Result<()> {
    let repository = open_repository(&config).await?;
    let signals = repository.recent(args.limit).await?;
    let total = repository.count().await?;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Time", "Action", "Symbol", "Price", "Timeframe", "Message"]);
    for signal in &signals {
        table.add_row(vec![
            Cell::new(signal.local_time_string()),
            Cell::new(signal.action),
            Cell::new(&signal.symbol),
            Cell::new(format!("{:.2}", signal.price)),
            Cell::new(&signal.timeframe),
            Cell::new(&signal.message),
        ]);
    }
    println!("{table}");
    println!("Showing {} of {} signals.", signals.len(), total);

    repository.close().await;
    Ok(())
}

async fn handle_init_db(config: Config) -> anyhow::Result<()> {
    let repository = open_repository(&config).await?;
    println!(
        "Signal table ready at {} ({} rows).",
        config.database.url,
        repository.count().await?
    );
    repository.close().await;
    Ok(())
}
