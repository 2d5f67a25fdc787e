//! Query, Health, and Metrics Endpoint
//!
//! Read-only HTTP surface for polling consumers (dashboards, charts) plus
//! the usual probes and Prometheus metrics.
//!
//! # Endpoints
//!
//! - `GET /health` - JSON health status
//! - `GET /healthz` - Liveness probe (simple OK)
//! - `GET /readyz` - Readiness probe (history bootstrap finished)
//! - `GET /metrics` - Prometheus metrics in text format
//! - `GET /v1/market` - Current market session and next open/close
//! - `GET /v1/stats` - Aggregate window statistics
//! - `GET /v1/symbols` - Known symbols
//! - `GET /v1/symbols/{symbol}/window?limit=N` - Window contents, oldest first
//! - `GET /v1/symbols/{symbol}/latest` - Most recent point
//! - `GET /v1/symbols/{symbol}/status` - Buffer fill level
//!
//! Unknown symbols are not errors: they answer `200` with empty bodies.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::services::SharedStreamDataManager;
use crate::domain::session::{MarketSession, MarketStatus};
use crate::domain::streaming::{Point, Symbol, normalize_symbol};
use crate::domain::window::{BufferStatus, StreamStats};
use crate::infrastructure::metrics::get_metrics_handle;

// =============================================================================
// Response Types
// =============================================================================

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Ready and the live feed is running.
    Healthy,
    /// Ready, but the live feed has stopped; windows are frozen.
    Degraded,
    /// Still bootstrapping.
    Unhealthy,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: HealthStatus,
    /// Service version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Whether history bootstrap has finished.
    pub ready: bool,
    /// Whether the live feed is running.
    pub feed_active: bool,
    /// Current market session.
    pub session: MarketSession,
    /// Symbols with a window.
    pub active_symbols: usize,
    /// Live points stored.
    pub total_messages: u64,
}

/// Body of `/v1/symbols`.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolsResponse {
    /// Known symbols, sorted.
    pub symbols: Vec<Symbol>,
}

/// Body of `/v1/symbols/{symbol}/window`.
#[derive(Debug, Clone, Serialize)]
pub struct WindowResponse {
    /// Requested symbol.
    pub symbol: Symbol,
    /// Number of points returned.
    pub count: usize,
    /// Points, oldest first.
    pub points: Vec<Point>,
}

/// Body of `/v1/symbols/{symbol}/latest`.
#[derive(Debug, Clone, Serialize)]
pub struct LatestResponse {
    /// Requested symbol.
    pub symbol: Symbol,
    /// Most recent point, if any.
    pub point: Option<Point>,
}

/// Body of `/v1/symbols/{symbol}/status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    /// Requested symbol.
    pub symbol: Symbol,
    /// Fill level and provenance mix.
    #[serde(flatten)]
    pub status: BufferStatus,
}

/// Query parameters for the window endpoint.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct WindowQuery {
    /// Return only the newest `limit` points.
    pub limit: Option<usize>,
}

// =============================================================================
// Server State
// =============================================================================

/// Shared state for the query server.
#[derive(Debug)]
pub struct QueryState {
    version: String,
    started_at: Instant,
    manager: SharedStreamDataManager,
    ready: AtomicBool,
    feed_active: AtomicBool,
}

impl QueryState {
    /// Create state for a manager. Starts not ready, feed inactive.
    #[must_use]
    pub fn new(version: impl Into<String>, manager: SharedStreamDataManager) -> Self {
        Self {
            version: version.into(),
            started_at: Instant::now(),
            manager,
            ready: AtomicBool::new(false),
            feed_active: AtomicBool::new(false),
        }
    }

    /// Mark history bootstrap as finished.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Record whether the live feed is running.
    pub fn set_feed_active(&self, active: bool) {
        self.feed_active.store(active, Ordering::Release);
    }

    /// Mark the feed active until the returned guard is dropped.
    #[must_use]
    pub fn feed_active_guard(self: &Arc<Self>) -> FeedActiveGuard {
        self.set_feed_active(true);
        FeedActiveGuard {
            state: Arc::clone(self),
        }
    }

    /// Whether history bootstrap has finished.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// Whether the live feed is running.
    #[must_use]
    pub fn is_feed_active(&self) -> bool {
        self.feed_active.load(Ordering::Acquire)
    }

    /// The manager being served.
    #[must_use]
    pub const fn manager(&self) -> &SharedStreamDataManager {
        &self.manager
    }
}

/// Clears the feed flag when dropped, including while a panicking
/// ingestion task unwinds.
#[derive(Debug)]
pub struct FeedActiveGuard {
    state: Arc<QueryState>,
}

impl Drop for FeedActiveGuard {
    fn drop(&mut self) {
        self.state.set_feed_active(false);
    }
}

// =============================================================================
// Query Server
// =============================================================================

/// Build the HTTP router.
#[must_use]
pub fn router(state: Arc<QueryState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/readyz", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .route("/v1/market", get(market_handler))
        .route("/v1/stats", get(stats_handler))
        .route("/v1/symbols", get(symbols_handler))
        .route("/v1/symbols/{symbol}/window", get(window_handler))
        .route("/v1/symbols/{symbol}/latest", get(latest_handler))
        .route("/v1/symbols/{symbol}/status", get(status_handler))
        .with_state(state)
}

/// Query HTTP server.
pub struct QueryServer {
    port: u16,
    state: Arc<QueryState>,
    cancel: CancellationToken,
}

impl QueryServer {
    /// Create a new query server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<QueryState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `QueryServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), QueryServerError> {
        let app = router(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| QueryServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "Query server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| QueryServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Query server stopped");
        Ok(())
    }
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn health_handler(State(state): State<Arc<QueryState>>) -> impl IntoResponse {
    let response = build_health_response(&state);
    let status_code = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<QueryState>>) -> impl IntoResponse {
    if state.is_ready() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                handle.render(),
            )
        },
    )
}

async fn market_handler(State(state): State<Arc<QueryState>>) -> Json<MarketStatus> {
    Json(state.manager.market_status(&Utc::now()))
}

async fn stats_handler(State(state): State<Arc<QueryState>>) -> Json<StreamStats> {
    Json(state.manager.stats())
}

async fn symbols_handler(State(state): State<Arc<QueryState>>) -> Json<SymbolsResponse> {
    Json(SymbolsResponse {
        symbols: state.manager.symbols(),
    })
}

async fn window_handler(
    State(state): State<Arc<QueryState>>,
    Path(symbol): Path<Symbol>,
    Query(query): Query<WindowQuery>,
) -> Json<WindowResponse> {
    let symbol = normalize_symbol(&symbol);
    let mut points = state.manager.snapshot(&symbol);
    if let Some(limit) = query.limit {
        let skip = points.len().saturating_sub(limit);
        points.drain(..skip);
    }

    Json(WindowResponse {
        count: points.len(),
        symbol,
        points,
    })
}

async fn latest_handler(
    State(state): State<Arc<QueryState>>,
    Path(symbol): Path<Symbol>,
) -> Json<LatestResponse> {
    let symbol = normalize_symbol(&symbol);
    Json(LatestResponse {
        point: state.manager.latest(&symbol),
        symbol,
    })
}

async fn status_handler(
    State(state): State<Arc<QueryState>>,
    Path(symbol): Path<Symbol>,
) -> Json<StatusResponse> {
    let symbol = normalize_symbol(&symbol);
    Json(StatusResponse {
        status: state.manager.buffer_status(&symbol),
        symbol,
    })
}

fn build_health_response(state: &QueryState) -> HealthResponse {
    let now = Utc::now();
    let ready = state.is_ready();
    let feed_active = state.is_feed_active();
    let stats = state.manager.stats();

    HealthResponse {
        status: determine_health_status(ready, feed_active),
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: now,
        ready,
        feed_active,
        session: state.manager.clock().classify(&now),
        active_symbols: stats.active_symbols,
        total_messages: stats.total_messages,
    }
}

const fn determine_health_status(ready: bool, feed_active: bool) -> HealthStatus {
    match (ready, feed_active) {
        (true, true) => HealthStatus::Healthy,
        (true, false) => HealthStatus::Degraded,
        (false, _) => HealthStatus::Unhealthy,
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Query server errors.
#[derive(Debug, thiserror::Error)]
pub enum QueryServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================
