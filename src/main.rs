// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use std::path::PathBuf;
use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{Router, routing::get};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::aggregator::ReadingAggregator;
use crate::application::display::{DisplaySink, WatermarkText, format_timestamp};
use crate::application::poll_controller::PollController;
use crate::application::reading_repository::ReadingRepository;
use crate::domain::snapshot::Snapshot;
use crate::infrastructure::config::{MonitorConfig, load_monitor_config};
use crate::infrastructure::display_state::DisplayState;
use crate::infrastructure::influx_repository::InfluxRepository;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{health_check, list_zones, zone_view};

/// Upper bound for `once --days`, about a century.
const MAX_DAYS: u64 = 36_500;
const SECONDS_PER_DAY: u64 = 86_400;

#[derive(Parser, Debug)]
#[command(name = "cellar-monitor")]
#[command(about = "Polls temperature/humidity readings and serves charts with high/low watermarks")]
struct Args {
    /// Config file (defaults to config/monitor.* when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll every zone on a timer and serve the results over HTTP
    Serve,
    /// Run a single poll cycle for every zone, print a summary and exit
    Once {
        /// Look back this many days instead of the configured window
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..=MAX_DAYS))]
        days: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Load configuration
    let config = load_monitor_config(args.config.as_deref()).context("Failed to load configuration")?;

    // Create repository (infrastructure layer)
    let repository: Arc<dyn ReadingRepository> =
        Arc::new(InfluxRepository::new(config.store.clone()));

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, repository).await,
        Command::Once { days } => once(config, repository, days).await,
    }
}

async fn serve(config: MonitorConfig, repository: Arc<dyn ReadingRepository>) -> anyhow::Result<()> {
    let display = DisplayState::new();
    let sink: Arc<dyn DisplaySink> = Arc::new(display.clone());

    // One controller per zone (application layer)
    let handles: Vec<_> = config
        .zones
        .iter()
        .map(|zone| {
            let aggregator = ReadingAggregator::new(
                zone.id.clone(),
                config.aggregator_config(zone),
                repository.clone(),
            );
            let controller = PollController::new(aggregator, sink.clone(), config.display.temperature_unit);
            tracing::info!(
                zone = %zone.id,
                interval_ms = config.polling.poll_interval_ms,
                "Starting poll task"
            );
            controller.start()
        })
        .collect();

    let state = Arc::new(AppState {
        zones: config.zones(),
        display,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/zones", get(list_zones))
        .route("/zones/:id", get(zone_view))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind))?;
    tracing::info!("Starting cellar-monitor on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    for handle in handles {
        let _ = handle.stop().await;
    }

    Ok(())
}

async fn once(
    config: MonitorConfig,
    repository: Arc<dyn ReadingRepository>,
    days: Option<u64>,
) -> anyhow::Result<()> {
    let now = Utc::now();

    for (zone_config, zone) in config.zones.iter().zip(config.zones()) {
        let mut aggregator_config = config.aggregator_config(zone_config);
        if let Some(days) = days {
            aggregator_config.window_size_seconds = days
                .checked_mul(SECONDS_PER_DAY)
                .with_context(|| format!("--days {} is out of range", days))?;
        }

        let aggregator = ReadingAggregator::new(zone.id.clone(), aggregator_config, repository.clone());
        let window_start = aggregator.window_start(now);

        match aggregator.refresh(window_start).await {
            Ok(snapshot) => print_summary(&zone.name, &snapshot, &config),
            Err(e) => tracing::error!(zone = %zone.id, error = %e, "Query failed"),
        }
    }

    Ok(())
}

fn print_summary(name: &str, snapshot: &Snapshot, config: &MonitorConfig) {
    let stats = &snapshot.stats;
    let text = WatermarkText::from_snapshot(snapshot, config.display.temperature_unit);

    println!("== {} (since {})", name, format_timestamp(snapshot.window_start));
    println!("{} items", stats.total_rows);
    if stats.skipped_rows > 0 {
        println!("{} malformed items skipped", stats.skipped_rows);
    }
    if snapshot.series.is_empty() {
        println!("No readings in window");
    }
    if let Some(percent) = stats.unique_percent() {
        println!("{} unique messages ({:.2}%)", stats.unique_rows, percent);
    }
    if let Some(delay) = stats.delay {
        println!(
            "Delay - Mean: {:.1} ms, Std: {:.1} ms, Min: {:.1} ms, Max: {:.1} ms",
            delay.mean_ms, delay.std_ms, delay.min_ms, delay.max_ms
        );
    }
    println!("Temperature high: {}", text.temperature_high);
    println!("Temperature low:  {}", text.temperature_low);
    println!("Humidity high:    {}", text.humidity_high);
    println!("Humidity low:     {}", text.humidity_low);
}
