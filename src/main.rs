//! Widget Relay - interactive demo
//!
//! Plays the UI side with a REPL and prints every envelope the throttled
//! dispatcher lets through.

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use widget_relay::config::{OutputFormat, RelayConfig};
use widget_relay::dispatch::{MonotonicClock, SendCallback, TokioScheduler};
use widget_relay::{cli, BackMsg, WidgetStateManager};

/// Widget Relay - throttled widget state relay
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "relay.yaml")]
    config: String,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Override the throttle window in milliseconds
    #[arg(long)]
    throttle_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let mut config = RelayConfig::load_or_default(&args.config).await?;
    if let Some(throttle_ms) = args.throttle_ms {
        config.throttle_ms = throttle_ms;
        config.validate()?;
    }

    let level = config.log_level.clone().unwrap_or(args.log_level);
    init_logging(&level)?;

    info!("Starting Widget Relay...");
    info!(
        "Configuration: {} (throttle: {}ms)",
        args.config, config.throttle_ms
    );

    // Transport: hand envelopes to the printer task without blocking the caller
    let (envelope_tx, envelope_rx) = mpsc::unbounded_channel::<BackMsg>();
    let send: SendCallback<BackMsg> = Arc::new(move |msg| {
        if envelope_tx.send(msg).is_err() {
            warn!("Envelope printer gone, dropping envelope");
        }
    });

    let printer = tokio::spawn(print_envelopes(envelope_rx, config.output.format));

    let mut manager = WidgetStateManager::with_capabilities(
        config.throttle_window(),
        send,
        Arc::new(MonotonicClock::new()),
        Arc::new(TokioScheduler::current()?),
    );

    let manager = tokio::task::spawn_blocking(move || {
        let result = cli::run_repl(&mut manager);
        manager.dispose();
        result.map(|_| manager)
    })
    .await
    .context("REPL task panicked")??;

    info!(
        "Widget Relay shutdown complete ({} envelopes sent)",
        manager.dispatcher().send_count()
    );

    // Dropping the manager drops the last sender and ends the printer
    drop(manager);
    printer.await.context("Envelope printer panicked")?;
    Ok(())
}

async fn print_envelopes(mut rx: mpsc::UnboundedReceiver<BackMsg>, format: OutputFormat) {
    let mut count: u64 = 0;
    while let Some(msg) = rx.recv().await {
        count += 1;
        let rendered = match format {
            OutputFormat::Json => serde_json::to_string(&msg),
            OutputFormat::Pretty => serde_json::to_string_pretty(&msg),
        };
        match rendered {
            Ok(json) => println!("{} {}", format!("[send #{}]", count).green(), json),
            Err(e) => warn!("Failed to serialize envelope: {}", e),
        }
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}
