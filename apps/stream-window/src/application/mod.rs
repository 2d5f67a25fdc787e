//! Application Layer - Use cases and port definitions.
//!
//! This layer wires the domain into running workers: the stream data
//! manager, the ingestion loop, history bootstrap, and the stats reporter.
//! Feeds and history loaders are reached through ports.

/// Port interfaces for point feeds and history sources.
pub mod ports;

/// Stream data manager and the workers that drive it.
pub mod services;
