//! Stream Window Binary
//!
//! Bootstraps per-symbol windows from history, replays a live feed through
//! the session gate, and serves the windows over HTTP.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin stream-window
//! ```
//!
//! # Environment Variables
//!
//! - `STREAM_WINDOW_MAX_POINTS`: Window capacity per symbol (default: 600)
//! - `STREAM_WINDOW_HTTP_PORT`: Query/health/metrics port (default: 8083)
//! - `STREAM_WINDOW_STATS_INTERVAL_SECS`: Stats log interval (default: 10)
//! - `SESSION_TIMEZONE`: Exchange timezone (default: America/New_York)
//! - `SESSION_PRE_MARKET_START`, `SESSION_MARKET_OPEN`, `SESSION_MARKET_CLOSE`,
//!   `SESSION_AFTER_HOURS_END`: Session boundaries as `HH:MM`
//! - `SESSION_HOLIDAYS`: Comma-separated `YYYY-MM-DD` closures
//! - `FEED_NAIVE_TIMEZONE`: Zone for feed timestamps without one (default: UTC)
//! - `FEED_REPLAY_PATH`: JSON-lines capture to replay as the live feed
//! - `FEED_REPLAY_PACE_MS`: Delay between replayed records (default: 0)
//! - `STREAM_SYMBOLS`: Comma-separated symbols to bootstrap
//! - `HISTORY_DIR`: Directory of `<SYMBOL>.json` history files
//! - `HISTORY_FILTER`: regular | trading_days | none (default: regular)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: true)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: cream-stream-window)
//! - `RUST_LOG`: Log filter (default: stream_window=info)

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use stream_window::infrastructure::telemetry;
use stream_window::{
    AppConfig, JsonHistorySource, JsonLinesFeed, QueryServer, QueryState, StreamDataManager,
    bootstrap_history, init_metrics, run_ingestion, run_stats_reporter,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let _telemetry_guard = telemetry::init().context("failed to initialize telemetry")?;

    tracing::info!("Starting Stream Window");

    let _metrics_handle = init_metrics().context("failed to install metrics recorder")?;

    let config = AppConfig::from_env().context("invalid configuration")?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    let manager = StreamDataManager::shared(&config.window, config.session.clone());
    let query_state = Arc::new(QueryState::new(
        env!("CARGO_PKG_VERSION"),
        Arc::clone(&manager),
    ));

    // Serve probes while bootstrapping so /readyz reflects progress.
    let query_server = QueryServer::new(
        config.server.http_port,
        Arc::clone(&query_state),
        shutdown_token.clone(),
    );
    let server_handle = tokio::spawn(async move {
        if let Err(e) = query_server.run().await {
            tracing::error!(error = %e, "Query server error");
        }
    });

    if let Some(dir) = &config.history.dir {
        let source = JsonHistorySource::new(dir);
        bootstrap_history(
            &source,
            &manager,
            &config.feed.symbols,
            config.history.filter,
        )
        .await;
    } else {
        tracing::info!("HISTORY_DIR not set, skipping history bootstrap");
    }
    query_state.mark_ready();

    let reporter_handle = tokio::spawn(run_stats_reporter(
        Arc::clone(&manager),
        config.server.stats_interval,
        shutdown_token.clone(),
    ));

    let ingestion_handle = if let Some(path) = &config.feed.replay_path {
        let mut feed = JsonLinesFeed::open(path, config.feed.replay_pace)
            .await
            .with_context(|| format!("failed to open replay feed {}", path.display()))?;

        let ingest_manager = Arc::clone(&manager);
        let ingest_shutdown = shutdown_token.clone();
        let feed_guard = query_state.feed_active_guard();

        Some(tokio::spawn(async move {
            let _feed_guard = feed_guard;
            run_ingestion(&mut feed, &ingest_manager, ingest_shutdown).await
        }))
    } else {
        tracing::warn!("FEED_REPLAY_PATH not set, serving preloaded history only");
        None
    };

    tracing::info!("Stream window ready");

    await_shutdown(shutdown_token).await;

    let drain = async {
        if let Some(handle) = ingestion_handle
            && let Err(e) = handle.await
        {
            tracing::error!(error = %e, "Ingestion task failed");
        }
        let _ = reporter_handle.await;
        let _ = server_handle.await;
    };
    if tokio::time::timeout(SHUTDOWN_TIMEOUT, drain).await.is_err() {
        tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "Tasks did not stop in time"
        );
    }

    manager.clear_all();
    tracing::info!("Stream window stopped");
    Ok(())
}

/// Log the parsed configuration.
fn log_config(config: &AppConfig) {
    tracing::info!(
        max_points = config.window.max_points.get(),
        http_port = config.server.http_port,
        timezone = %config.session.timezone(),
        market_open = %config.session.market_open(),
        market_close = %config.session.market_close(),
        symbols = ?config.feed.symbols,
        history_filter = config.history.filter.as_str(),
        "Configuration loaded"
    );
    tracing::debug!(
        replay_path = ?config.feed.replay_path,
        history_dir = ?config.history.dir,
        naive_timezone = %config.window.naive_timezone,
        holidays = config.session.holidays().count(),
        "Data sources"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT), then cancel `shutdown_token`.
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
