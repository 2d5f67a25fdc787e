#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::cast_possible_wrap,
        clippy::cast_precision_loss,
        clippy::items_after_statements
    )
)]

//! Stream Window - Session-Gated Rolling Market Data Buffer
//!
//! Keeps the most recent N OHLCV observations per symbol, merging a
//! one-time historical preload with a live feed, admitting live points only
//! during the regular trading session, and serving consistent snapshots to
//! concurrent readers.
//!
//! # Layers (inside to outside)
//!
//! - **Domain**: Pure market-data logic
//!   - `session`: Exchange calendar and session classification
//!   - `streaming`: Raw and stored points, timestamp normalization, gate
//!   - `window`: Ring buffers and the thread-safe window store
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: `PointFeed`, `HistorySource`
//!   - `services`: Stream data manager, ingestion, bootstrap, stats reporter
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `replay`: Channel feed, JSON-lines replay, on-disk history
//!   - `http`: Query, health, and metrics endpoint
//!   - `config`: Environment configuration
//!   - `metrics`, `telemetry`: Prometheus and OpenTelemetry
//!
//! # Data Flow
//!
//! ```text
//! History files --bootstrap--> preload --+
//!                                        v
//! Live feed --> decode --> gate --> RollingWindowStore --> HTTP readers
//!                           |
//!                           +--> dropped (pre-market, after-hours, closed)
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Session calendar, point types, rolling windows.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::session::{
    CalendarError, ClosedReason, MarketSession, MarketStatus, SessionCalendar, SessionClock,
};
pub use domain::streaming::{
    IngestError, Point, RawPoint, RawTimestamp, SessionGate, Symbol, normalize_symbol,
};
pub use domain::window::{BufferStatus, RollingWindowStore, StreamStats};

// Application
pub use application::ports::{FeedError, HistorySource, PointFeed};
pub use application::services::{
    BootstrapReport, HistoryFilter, IngestOutcome, IngestionSummary, SharedStreamDataManager,
    StreamDataManager, bootstrap_history, run_ingestion, run_stats_reporter,
};

// Infrastructure config
pub use infrastructure::config::{
    AppConfig, ConfigError, FeedSettings, HistorySettings, ServerSettings, WindowSettings,
};

// HTTP surface
pub use infrastructure::http::{
    FeedActiveGuard, QueryServer, QueryServerError, QueryState, router,
};

// Adapters
pub use infrastructure::replay::{ChannelFeed, JsonHistorySource, JsonLinesFeed};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
