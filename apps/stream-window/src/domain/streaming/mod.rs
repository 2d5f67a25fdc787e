//! Market Data Streaming Types
//!
//! Inbound records, the canonical stored point, and the session gate that
//! normalizes timestamps and admits live points.

mod gate;
mod point;

pub use gate::SessionGate;
pub use point::{IngestError, Point, RawPoint, RawTimestamp, Symbol, normalize_symbol};
