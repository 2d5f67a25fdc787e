//! Stats Reporter
//!
//! Independent reader that periodically logs window statistics.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::manager::SharedStreamDataManager;

/// Log manager stats every `interval` until `shutdown` fires.
///
/// Returns the number of reports emitted.
pub async fn run_stats_reporter(
    manager: SharedStreamDataManager,
    interval: Duration,
    shutdown: CancellationToken,
) -> u64 {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // First tick completes immediately.
    ticker.tick().await;

    let mut reports = 0;
    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let stats = manager.stats();
        let status = manager.market_status(&chrono::Utc::now());
        tracing::info!(
            total_messages = stats.total_messages,
            active_symbols = stats.active_symbols,
            preloaded_symbols = ?stats.preloaded_symbols,
            buffer_sizes = ?stats.buffer_sizes,
            session = status.session.as_str(),
            "Stream stats"
        );
        reports += 1;
    }

    tracing::debug!(reports, "Stats reporter stopped");
    reports
}
