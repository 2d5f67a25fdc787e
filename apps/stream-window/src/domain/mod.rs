//! Domain Layer - Session calendar, point types, and rolling windows.
//!
//! This layer holds the pure market-data logic: deciding which session an
//! instant belongs to, normalizing inbound records, and keeping bounded
//! per-symbol windows. Nothing here performs I/O.

/// Exchange calendar and session classification.
pub mod session;

/// Inbound records, stored points, and the session gate.
pub mod streaming;

/// Bounded per-symbol rolling windows.
pub mod window;
