use anyhow::Result;
use chrono::Utc;
use clap::Parser;
use tracing::{error, info, warn};

use liquidity_canary::alerter::AlertManager;
use liquidity_canary::canary::Canary;
use liquidity_canary::collector;
use liquidity_canary::config::Config;
use liquidity_canary::storage::{RunLock, StateStore};

#[derive(Parser, Debug)]
#[command(name = "liquidity-canary", about = "Macro liquidity signal engine, one evaluation per invocation")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "/etc/liquidity-canary/config.toml")]
    config: String,

    /// Validate config and exit
    #[arg(long)]
    check: bool,

    /// Render and print the message without advancing state or dispatching
    #[arg(long)]
    dry_run: bool,

    /// Print version and exit
    #[arg(short, long)]
    version: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.version {
        println!("liquidity-canary {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Load configuration
    let config = Config::load(&cli.config)?;

    if cli.check {
        AlertManager::check(&config.alerting, &config.agent.hostname)?;
        println!("Configuration is valid.");
        return Ok(());
    }

    init_logging(&config)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        hostname = %config.agent.hostname,
        dry_run = cli.dry_run,
        "Starting Liquidity Canary run"
    );

    if let Err(e) = run(config, cli.dry_run).await {
        error!(error = %e, "Run terminated with error");
        return Err(e);
    }

    Ok(())
}

fn init_logging(config: &Config) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| {
            tracing_subscriber::EnvFilter::new(&config.agent.log_level)
        });

    // stdout carries the rendered message in dry-run and fallback mode
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    Ok(())
}

async fn run(config: Config, dry_run: bool) -> Result<()> {
    let lock_path = config.storage.lock_path();
    let mut lock = match RunLock::open(&lock_path) {
        Ok(lock) => Some(lock),
        Err(e) => {
            warn!(path = %lock_path.display(), error = %e, "Cannot open run lock, continuing unlocked");
            None
        }
    };
    let _guard = match lock.as_mut() {
        Some(lock) => match lock.acquire() {
            Ok(guard) => Some(guard),
            Err(e) => {
                warn!(path = %lock_path.display(), error = %e, "Cannot take run lock, continuing unlocked");
                None
            }
        },
        None => None,
    };

    let store = StateStore::open(&config.storage);
    let mut store = if dry_run { store.into_read_only() } else { store };

    let mut collectors = collector::create_collectors(&config)?;
    let snapshot = collector::collect_snapshot(&mut collectors).await;

    let canary = Canary::new(&config);

    if dry_run {
        let report = canary.run(&mut store, &snapshot, Utc::now(), false);
        println!("{}", report.message);
        return Ok(());
    }

    // channels exist before the dedup hash moves
    let alerter = AlertManager::new(&config.alerting, &config.agent.hostname);
    let report = canary.run(&mut store, &snapshot, Utc::now(), true);

    if !report.should_send {
        info!(regime = report.regime, "Nothing new to report");
        return Ok(());
    }

    let delivered = alerter.dispatch(&report.message).await;
    if delivered == 0 {
        warn!("No channel accepted the alert");
    }

    Ok(())
}
