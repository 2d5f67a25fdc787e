//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer, plus configuration, telemetry, and
//! the HTTP surface.

/// Configuration loading.
pub mod config;

/// Query, health, and metrics HTTP endpoint.
pub mod http;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Channel, JSON-lines, and on-disk history adapters.
pub mod replay;

/// OpenTelemetry tracing integration.
pub mod telemetry;
