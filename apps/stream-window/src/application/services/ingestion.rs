//! Ingestion Worker
//!
//! The single writer: pulls records from a feed and offers them to the
//! manager until the feed ends, fails, or shutdown is requested.

use tokio_util::sync::CancellationToken;

use super::manager::{IngestOutcome, StreamDataManager};
use crate::application::ports::PointFeed;

/// Counters for one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestionSummary {
    /// Records pulled from the feed (including undecodable ones).
    pub received: u64,
    /// Records appended to a window.
    pub stored: u64,
    /// Records outside the regular session.
    pub rejected: u64,
    /// Records that could not be decoded or normalized.
    pub invalid: u64,
}

/// Drive `feed` into `manager` until it ends or `shutdown` fires.
///
/// Bad records are logged and skipped. A fatal feed error stops the run.
pub async fn run_ingestion<F>(
    feed: &mut F,
    manager: &StreamDataManager,
    shutdown: CancellationToken,
) -> IngestionSummary
where
    F: PointFeed + ?Sized,
{
    let mut summary = IngestionSummary::default();
    tracing::info!("Ingestion started");

    loop {
        let next = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                tracing::info!("Ingestion shutdown requested");
                break;
            }
            next = feed.next_point() => next,
        };

        match next {
            Ok(Some(raw)) => {
                summary.received += 1;
                match manager.ingest(raw) {
                    Ok(IngestOutcome::Stored) => summary.stored += 1,
                    Ok(IngestOutcome::Rejected(_)) => summary.rejected += 1,
                    Err(e) => {
                        summary.invalid += 1;
                        tracing::warn!(error = %e, "Dropped invalid record");
                    }
                }
            }
            Ok(None) => {
                tracing::info!("Feed ended");
                break;
            }
            Err(e) if e.is_recoverable() => {
                summary.received += 1;
                summary.invalid += 1;
                tracing::warn!(error = %e, "Skipped undecodable record");
            }
            Err(e) => {
                tracing::error!(error = %e, "Feed failed");
                break;
            }
        }
    }

    tracing::info!(
        received = summary.received,
        stored = summary.stored,
        rejected = summary.rejected,
        invalid = summary.invalid,
        "Ingestion stopped"
    );
    summary
}
