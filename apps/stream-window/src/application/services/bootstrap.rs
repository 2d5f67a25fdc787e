//! History Bootstrap
//!
//! Loads historical bars per symbol, normalizes them, applies the chosen
//! session filter, and preloads the survivors. Runs before live ingestion.

use std::collections::BTreeMap;

use super::manager::StreamDataManager;
use crate::application::ports::HistorySource;
use crate::domain::streaming::Symbol;

/// Which historical bars are kept before preloading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistoryFilter {
    /// Only bars inside the regular session (intraday bars).
    #[default]
    RegularHours,
    /// Only bars on trading days, any time of day (daily bars).
    TradingDays,
    /// Every bar.
    None,
}

impl HistoryFilter {
    /// Parse a filter name. Unknown names select `RegularHours`.
    #[must_use]
    pub fn from_str_case_insensitive(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "trading_days" | "trading-days" | "daily" => Self::TradingDays,
            "none" | "off" | "all" => Self::None,
            _ => Self::RegularHours,
        }
    }

    /// Filter name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RegularHours => "regular",
            Self::TradingDays => "trading_days",
            Self::None => "none",
        }
    }
}

/// What a bootstrap run did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Points preloaded per symbol.
    pub preloaded: BTreeMap<Symbol, usize>,
    /// Bars dropped because they could not be normalized.
    pub invalid: usize,
    /// Bars removed by the session filter.
    pub filtered: usize,
    /// Symbols whose history could not be loaded.
    pub failed: Vec<Symbol>,
}

impl BootstrapReport {
    /// Total points preloaded across all symbols.
    #[must_use]
    pub fn total_preloaded(&self) -> usize {
        self.preloaded.values().sum()
    }
}

/// Preload history for `symbols`.
///
/// A symbol whose history cannot be loaded is logged and listed in
/// [`BootstrapReport::failed`]; the remaining symbols still load. Symbols
/// with no history are not preloaded.
pub async fn bootstrap_history<S>(
    source: &S,
    manager: &StreamDataManager,
    symbols: &[Symbol],
    filter: HistoryFilter,
) -> BootstrapReport
where
    S: HistorySource + ?Sized,
{
    let mut report = BootstrapReport::default();

    for symbol in symbols {
        let raw_bars = match source.load(symbol).await {
            Ok(bars) => bars,
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "Failed to load history");
                report.failed.push(symbol.clone());
                continue;
            }
        };

        if raw_bars.is_empty() {
            tracing::debug!(symbol = %symbol, "No history available");
            continue;
        }

        let mut bars = Vec::with_capacity(raw_bars.len());
        for raw in raw_bars {
            match manager.decode(raw) {
                Ok(bar) => bars.push(bar),
                Err(e) => {
                    report.invalid += 1;
                    tracing::warn!(symbol = %symbol, error = %e, "Dropped invalid bar");
                }
            }
        }

        let decoded = bars.len();
        let bars = match filter {
            HistoryFilter::RegularHours => manager.gate().filter_regular_hours(bars),
            HistoryFilter::TradingDays => manager.gate().filter_trading_days(bars),
            HistoryFilter::None => bars,
        };
        report.filtered += decoded - bars.len();

        if bars.is_empty() {
            tracing::debug!(symbol = %symbol, filter = filter.as_str(), "History filtered out");
            continue;
        }

        let count = manager.preload_history(symbol, bars);
        report.preloaded.insert(symbol.clone(), count);
    }

    tracing::info!(
        symbols = report.preloaded.len(),
        points = report.total_preloaded(),
        invalid = report.invalid,
        filtered = report.filtered,
        failed = report.failed.len(),
        "History bootstrap complete"
    );
    report
}
