//! Stream Data Manager
//!
//! Façade that owns one rolling window store and one session gate, shared
//! between the ingestion worker (single writer) and any number of readers.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, TimeZone};

use crate::domain::session::{MarketSession, MarketStatus, SessionCalendar, SessionClock};
use crate::domain::streaming::{
    IngestError, Point, RawPoint, SessionGate, Symbol, normalize_symbol,
};
use crate::domain::window::{BufferStatus, RollingWindowStore, StreamStats};
use crate::infrastructure::config::WindowSettings;
use crate::infrastructure::metrics::{self, IngestLabel};

/// Result of offering one live record to the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Admitted and appended.
    Stored,
    /// Outside the regular session; carries the session it fell in.
    Rejected(MarketSession),
}

impl IngestOutcome {
    /// Whether the point was appended.
    #[must_use]
    pub const fn is_stored(self) -> bool {
        matches!(self, Self::Stored)
    }
}

/// Shared handle to a manager.
pub type SharedStreamDataManager = Arc<StreamDataManager>;

/// Rolling windows plus the gate that feeds them.
#[derive(Debug)]
pub struct StreamDataManager {
    store: RollingWindowStore,
    gate: SessionGate,
}

impl Default for StreamDataManager {
    fn default() -> Self {
        Self::new(&WindowSettings::default(), SessionCalendar::us_equities())
    }
}

impl StreamDataManager {
    /// Create a manager with empty windows.
    #[must_use]
    pub fn new(settings: &WindowSettings, calendar: SessionCalendar) -> Self {
        let clock = SessionClock::new(calendar);
        Self {
            store: RollingWindowStore::new(settings.max_points),
            gate: SessionGate::new(clock, settings.naive_timezone),
        }
    }

    /// Create a shared manager.
    #[must_use]
    pub fn shared(settings: &WindowSettings, calendar: SessionCalendar) -> SharedStreamDataManager {
        Arc::new(Self::new(settings, calendar))
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Normalize, gate, and store one live record.
    ///
    /// # Errors
    ///
    /// Returns `IngestError` if the record has no symbol or its timestamp
    /// cannot be resolved. Nothing is stored in that case.
    pub fn ingest(&self, raw: RawPoint) -> Result<IngestOutcome, IngestError> {
        let started = Instant::now();

        let point = match self.gate.decode(raw) {
            Ok(point) => point,
            Err(e) => {
                metrics::record_ingest(IngestLabel::Invalid, started.elapsed());
                return Err(e);
            }
        };

        let outcome = self.admit_and_store(point);
        let label = if outcome.is_stored() {
            IngestLabel::Stored
        } else {
            IngestLabel::Rejected
        };
        metrics::record_ingest(label, started.elapsed());
        Ok(outcome)
    }

    /// Gate and store a point that was already decoded.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::InvalidTimestamp` if the point's instant is
    /// outside the supported range.
    pub fn ingest_point(&self, point: Point) -> Result<IngestOutcome, IngestError> {
        let started = Instant::now();
        if let Err(e) = SessionGate::check_instant(&point.symbol, point.timestamp) {
            metrics::record_ingest(IngestLabel::Invalid, started.elapsed());
            return Err(e);
        }

        let outcome = self.admit_and_store(point);
        let label = if outcome.is_stored() {
            IngestLabel::Stored
        } else {
            IngestLabel::Rejected
        };
        metrics::record_ingest(label, started.elapsed());
        Ok(outcome)
    }

    fn admit_and_store(&self, mut point: Point) -> IngestOutcome {
        let session = self.gate.annotate(&mut point);
        if session != MarketSession::Regular {
            tracing::debug!(
                symbol = %point.symbol,
                timestamp = %point.timestamp,
                session = session.as_str(),
                "Point outside regular session, dropped"
            );
            return IngestOutcome::Rejected(session);
        }

        let symbol = point.symbol.clone();
        if self.store.append(&symbol, point) {
            tracing::info!(symbol = %symbol, "Started window");
            metrics::set_active_symbols(self.store.symbols().len());
        }
        IngestOutcome::Stored
    }

    /// Preload historical bars for a symbol, bypassing the gate.
    ///
    /// Callers filter bars upstream. Bars tagged with another symbol or
    /// with an out-of-range instant are dropped. Bars without a local
    /// timestamp are annotated with exchange local time. Returns the number
    /// preloaded; nothing is recorded when no bar survives.
    pub fn preload_history(&self, symbol: &str, bars: Vec<Point>) -> usize {
        let symbol = normalize_symbol(symbol);
        let clock = self.gate.clock();
        let offered = bars.len();

        let bars: Vec<Point> = bars
            .into_iter()
            .filter(|bar| {
                normalize_symbol(&bar.symbol) == symbol
                    && SessionGate::check_instant(&symbol, bar.timestamp).is_ok()
            })
            .map(|mut bar| {
                bar.symbol.clone_from(&symbol);
                if bar.timestamp_local.is_none() {
                    bar.timestamp_local = Some(clock.to_local(&bar.timestamp).fixed_offset());
                }
                bar
            })
            .collect();

        if bars.len() < offered {
            tracing::warn!(
                symbol = %symbol,
                dropped = offered - bars.len(),
                "Dropped history bars for another symbol or out of range"
            );
        }
        if bars.is_empty() {
            return 0;
        }

        let count = self.store.preload(&symbol, bars);
        metrics::record_preloaded(count);
        metrics::set_active_symbols(self.store.symbols().len());
        tracing::info!(symbol = %symbol, count, "Preloaded history");
        count
    }

    /// Normalize a raw record without gating or storing it.
    ///
    /// # Errors
    ///
    /// Same as [`SessionGate::decode`].
    pub fn decode(&self, raw: RawPoint) -> Result<Point, IngestError> {
        self.gate.decode(raw)
    }

    /// Empty one symbol's window and forget its preload.
    pub fn clear_symbol(&self, symbol: &str) {
        self.store.clear(symbol);
        tracing::info!(symbol = %symbol, "Cleared window");
    }

    /// Drop all windows and counters.
    pub fn clear_all(&self) {
        self.store.clear_all();
        metrics::set_active_symbols(0);
        tracing::info!("Cleared all windows");
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Copy of a symbol's window, oldest first.
    #[must_use]
    pub fn snapshot(&self, symbol: &str) -> Vec<Point> {
        self.store.snapshot(symbol)
    }

    /// Most recent point for a symbol.
    #[must_use]
    pub fn latest(&self, symbol: &str) -> Option<Point> {
        self.store.latest(symbol)
    }

    /// Number of points stored for a symbol.
    #[must_use]
    pub fn size(&self, symbol: &str) -> usize {
        self.store.size(symbol)
    }

    /// Whether a symbol's window is at capacity.
    #[must_use]
    pub fn is_full(&self, symbol: &str) -> bool {
        self.store.is_full(symbol)
    }

    /// Window capacity.
    #[must_use]
    pub const fn max_points(&self) -> usize {
        self.store.max_points()
    }

    /// Fill level and provenance mix for a symbol.
    #[must_use]
    pub fn buffer_status(&self, symbol: &str) -> BufferStatus {
        self.store.buffer_status(symbol)
    }

    /// Aggregate statistics.
    #[must_use]
    pub fn stats(&self) -> StreamStats {
        self.store.stats()
    }

    /// Known symbols, sorted.
    #[must_use]
    pub fn symbols(&self) -> Vec<Symbol> {
        self.store.symbols()
    }

    /// Market status at `now`.
    #[must_use]
    pub fn market_status<Z: TimeZone>(&self, now: &DateTime<Z>) -> MarketStatus {
        self.gate.clock().market_status(now)
    }

    /// The session clock.
    #[must_use]
    pub const fn clock(&self) -> &SessionClock {
        self.gate.clock()
    }

    /// The session gate.
    #[must_use]
    pub const fn gate(&self) -> &SessionGate {
        &self.gate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;

    use chrono::{Duration, Utc};
    use chrono_tz::America::New_York;
    use chrono_tz::Tz;

    use crate::domain::streaming::RawTimestamp;

    fn manager(max_points: usize) -> StreamDataManager {
        let settings = WindowSettings {
            max_points: NonZeroUsize::new(max_points).unwrap(),
            naive_timezone: Tz::UTC,
        };
        StreamDataManager::new(&settings, SessionCalendar::us_equities())
    }

    fn et(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        New_York
            .with_ymd_and_hms(2026, 1, day, hour, minute, 0)
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn ingest_regular_tick_is_stored() {
        let m = manager(10);
        let raw = RawPoint::new("AAPL", et(30, 10, 0)).with_ohlc(1.0, 2.0, 0.5, 1.5);

        assert_eq!(m.ingest(raw).unwrap(), IngestOutcome::Stored);
        let latest = m.latest("AAPL").unwrap();
        assert!(!latest.is_preloaded);
        assert_eq!(
            latest.timestamp_local.unwrap(),
            New_York.with_ymd_and_hms(2026, 1, 30, 10, 0, 0).unwrap().fixed_offset()
        );
        assert_eq!(m.stats().total_messages, 1);
    }

    #[test]
    fn ingest_after_hours_tick_is_rejected() {
        let m = manager(10);
        let raw = RawPoint::new("AAPL", et(30, 17, 0));

        assert_eq!(
            m.ingest(raw).unwrap(),
            IngestOutcome::Rejected(MarketSession::AfterHours)
        );
        assert_eq!(m.size("AAPL"), 0);
        assert_eq!(m.stats().total_messages, 0);
    }

    #[test]
    fn ingest_trading_day_night_tick_is_rejected_as_closed() {
        let m = manager(10);
        m.ingest(RawPoint::new("AAPL", et(30, 10, 0))).unwrap();

        let outcome = m.ingest(RawPoint::new("AAPL", et(30, 22, 0))).unwrap();

        assert_eq!(outcome, IngestOutcome::Rejected(MarketSession::Closed));
        assert_eq!(m.size("AAPL"), 1);
        assert_eq!(m.stats().total_messages, 1);
    }

    #[test]
    fn ingest_extreme_timestamps_is_error_not_panic() {
        let m = manager(10);
        for raw in [
            RawPoint::new("AAPL", RawTimestamp::Naive(chrono::NaiveDateTime::MIN)),
            RawPoint::new("AAPL", RawTimestamp::Naive(chrono::NaiveDateTime::MAX)),
            serde_json::from_str(r#"{"symbol":"AAPL","timestamp":"-262143-01-01T00:00:00"}"#)
                .unwrap(),
        ] {
            assert!(matches!(
                m.ingest(raw),
                Err(IngestError::InvalidTimestamp { .. })
            ));
        }
        assert!(m.ingest_point(Point::new("AAPL", DateTime::<Utc>::MIN_UTC)).is_err());
        assert_eq!(m.size("AAPL"), 0);
    }

    #[test]
    fn ingest_lowercase_symbol_shares_window() {
        let m = manager(10);
        m.preload_history("AAPL", vec![Point::new("AAPL", et(29, 10, 0))]);
        m.ingest(RawPoint::new("aapl", et(30, 10, 0))).unwrap();

        assert_eq!(m.symbols(), vec!["AAPL".to_string()]);
        assert_eq!(m.size("AAPL"), 2);
    }

    #[test]
    fn preload_drops_bars_for_other_symbols() {
        let m = manager(10);
        let bars = vec![
            Point::new("AAPL", et(29, 10, 0)),
            Point::new("MSFT", et(29, 10, 1)),
            Point::new("aapl", et(29, 10, 2)),
            Point::new("AAPL", DateTime::<Utc>::MIN_UTC),
        ];

        assert_eq!(m.preload_history("AAPL", bars), 2);
        assert!(m.snapshot("AAPL").iter().all(|p| p.symbol == "AAPL"));
        assert_eq!(m.size("MSFT"), 0);
    }

    #[test]
    fn preload_with_no_surviving_bars_records_nothing() {
        let m = manager(10);
        assert_eq!(m.preload_history("AAPL", vec![Point::new("MSFT", et(29, 10, 0))]), 0);
        assert!(m.symbols().is_empty());
        assert!(!m.buffer_status("AAPL").is_preloaded);
    }

    #[test]
    fn ingest_epoch_millis() {
        let m = manager(10);
        let millis = et(30, 10, 0).timestamp_millis();
        let outcome = m.ingest(RawPoint::new("AAPL", RawTimestamp::EpochMillis(millis)));
        assert_eq!(outcome.unwrap(), IngestOutcome::Stored);
        assert_eq!(m.latest("AAPL").unwrap().timestamp, et(30, 10, 0));
    }

    #[test]
    fn ingest_invalid_timestamp_is_error() {
        let m = manager(10);
        let raw = RawPoint::new("AAPL", RawTimestamp::Text("not a time".to_string()));

        assert!(matches!(
            m.ingest(raw),
            Err(IngestError::InvalidTimestamp { .. })
        ));
        assert_eq!(m.size("AAPL"), 0);
    }

    #[test]
    fn ingest_missing_symbol_is_error() {
        let m = manager(10);
        let raw = RawPoint::new("  ", et(30, 10, 0));
        assert_eq!(m.ingest(raw), Err(IngestError::MissingSymbol));
    }

    #[test]
    fn ingest_point_uses_same_gate() {
        let m = manager(10);
        assert!(m.ingest_point(Point::new("AAPL", et(30, 10, 0))).unwrap().is_stored());
        assert_eq!(
            m.ingest_point(Point::new("AAPL", et(31, 10, 0))).unwrap(),
            IngestOutcome::Rejected(MarketSession::Closed)
        );
    }

    #[test]
    fn preload_bypasses_gate_and_annotates() {
        let m = manager(10);
        let saturday = et(31, 12, 0);
        let count = m.preload_history("AAPL", vec![Point::new("AAPL", saturday)]);

        assert_eq!(count, 1);
        let bar = m.latest("AAPL").unwrap();
        assert!(bar.is_preloaded);
        assert!(bar.timestamp_local.is_some());
        assert!(m.buffer_status("AAPL").is_preloaded);
    }

    #[test]
    fn preload_then_live_mix() {
        let m = manager(4);
        let bars = (0..4)
            .map(|i| Point::new("AAPL", et(29, 10, 0) + Duration::minutes(i)))
            .collect();
        m.preload_history("AAPL", bars);
        m.ingest(RawPoint::new("AAPL", et(30, 10, 0))).unwrap();

        let status = m.buffer_status("AAPL");
        assert_eq!(status.size, 4);
        assert_eq!(status.live_count, 1);
        assert_eq!(status.preloaded_count, 3);
        assert!(m.is_full("AAPL"));
        assert_eq!(m.max_points(), 4);
    }

    #[test]
    fn clear_symbol_and_all() {
        let m = manager(10);
        m.ingest(RawPoint::new("AAPL", et(30, 10, 0))).unwrap();
        m.ingest(RawPoint::new("MSFT", et(30, 10, 0))).unwrap();

        m.clear_symbol("AAPL");
        assert_eq!(m.size("AAPL"), 0);
        assert_eq!(m.size("MSFT"), 1);
        assert_eq!(m.symbols(), vec!["AAPL".to_string(), "MSFT".to_string()]);

        m.clear_all();
        assert!(m.symbols().is_empty());
        assert_eq!(m.stats(), StreamStats::default());
    }

    #[test]
    fn market_status_delegates_to_clock() {
        let m = manager(10);
        let status = m.market_status(&et(30, 10, 0));
        assert!(status.is_open);
        assert_eq!(status.session, MarketSession::Regular);
    }

    #[test]
    fn unknown_symbol_reads_are_empty() {
        let m = StreamDataManager::default();
        assert!(m.snapshot("ZZZZ").is_empty());
        assert!(m.latest("ZZZZ").is_none());
        assert_eq!(m.size("ZZZZ"), 0);
        assert_eq!(m.buffer_status("ZZZZ").max, 600);
    }
}
