mod condition;
mod config;
mod error;
mod market;
mod model;
mod notifier;
mod scheduler;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use derive_more::{Display, Error};
use error_stack::{Report, ResultExt};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use condition::Condition;
use config::AppConfig;
use market::MarketData;
use market::yahoo::YahooMarketData;
use notifier::Notifier;
use notifier::ntfy::NtfyNotifier;
use scheduler::AlertScheduler;

#[derive(Debug, Display, Error)]
pub enum AppError {
    #[display("configuration error")]
    Config,
    #[display("runtime error")]
    Runtime,
}

#[derive(Parser)]
#[command(name = "fx-alerter", about = "One-shot forex trade alert monitor")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() {
    if let Err(report) = run().await {
        eprintln!("{report:?}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Report<AppError>> {
    let cli = Cli::parse();
    let config = config::load(Path::new(&cli.config)).change_context(AppError::Config)?;

    init_tracing(&config);

    info!(
        symbol = %config.breakout.symbol,
        threshold = config.breakout.threshold,
        "monitoring price breakout"
    );
    info!(
        event = %config.event.name,
        target = %config.event.target_utc,
        lead_minutes = config.event.lead_minutes,
        "monitoring scheduled event"
    );
    info!(topic = %config.notify.topic, "alerts will be pushed via ntfy");

    let conditions = Condition::from_config(&config);
    let market: Arc<dyn MarketData> = Arc::new(YahooMarketData::new());
    let notifier: Arc<dyn Notifier> =
        Arc::new(NtfyNotifier::new(&config.notify.base_url, &config.notify.topic));
    let alert_scheduler = AlertScheduler::new(
        Duration::from_secs(config.general.tick_interval_secs),
        Duration::from_secs(config.general.error_cooldown_secs),
    );

    let cancel = CancellationToken::new();
    let mut monitor = tokio::spawn({
        let cancel = cancel.clone();
        async move { alert_scheduler.run(conditions, market, notifier, cancel).await }
    });

    tokio::select! {
        result = &mut monitor => {
            result.change_context(AppError::Runtime)?;
        }
        result = tokio::signal::ctrl_c() => {
            result.change_context(AppError::Runtime)?;
            info!("ctrl+c received, shutting down");
            cancel.cancel();
            let _ = tokio::time::timeout(Duration::from_secs(5), &mut monitor).await;
        }
    }

    info!("shutdown complete");
    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::new(&config.general.log_level);
    match config.general.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        _ => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
}
