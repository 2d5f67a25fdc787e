//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `StreamDataManager`: Shared owner of the windows and the session gate
//! - `run_ingestion`: Single-writer loop from a `PointFeed`
//! - `bootstrap_history`: Preloads filtered history from a `HistorySource`
//! - `run_stats_reporter`: Periodic stats logging

mod bootstrap;
mod ingestion;
mod manager;
mod reporter;

pub use bootstrap::{BootstrapReport, HistoryFilter, bootstrap_history};
pub use ingestion::{IngestionSummary, run_ingestion};
pub use manager::{IngestOutcome, SharedStreamDataManager, StreamDataManager};
pub use reporter::run_stats_reporter;
