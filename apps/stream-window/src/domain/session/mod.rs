//! Trading Session Classification
//!
//! Decides which trading session an instant falls into and where the
//! next session boundaries are.
//!
//! # Sessions (exchange local time)
//!
//! ```text
//! 00:00 ─ Closed ─ 04:00 ─ PreMarket ─ 09:30 ─ Regular ─ 16:00 ─ AfterHours ─ 20:00 ─ Closed ─ 24:00
//! ```
//!
//! Every interval is half-open: the boundary instant belongs to the session
//! it starts. Weekends and holidays are `Closed` all day.
//!
//! Conversion to local time goes through the tz database, so the same UTC
//! instant can land in different sessions on either side of a DST change.

mod calendar;

use std::sync::Arc;

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveTime, TimeZone, Weekday};
use chrono_tz::Tz;
use serde::Serialize;

pub use calendar::{
    CalendarError, SessionCalendar, parse_clock_time, parse_holiday_list, parse_timezone,
};

/// Maximum number of days `next_open` scans forward.
pub const MAX_SCAN_DAYS: u64 = 10;

// =============================================================================
// Types
// =============================================================================

/// Trading session an instant falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MarketSession {
    /// Extended session before the open.
    PreMarket,
    /// Primary continuous trading session.
    Regular,
    /// Extended session after the close.
    AfterHours,
    /// No trading.
    Closed,
}

impl MarketSession {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PreMarket => "pre_market",
            Self::Regular => "regular",
            Self::AfterHours => "after_hours",
            Self::Closed => "closed",
        }
    }
}

/// Why the market is closed on a given day or time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosedReason {
    /// Saturday or Sunday.
    Weekend,
    /// Listed holiday.
    Holiday,
    /// Trading day, but outside every session.
    OutsideHours,
}

/// Point-in-time market status for status displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarketStatus {
    /// Current session.
    pub session: MarketSession,
    /// Whether the regular session is open.
    pub is_open: bool,
    /// Exchange local time the status was computed for.
    pub local_time: DateTime<FixedOffset>,
    /// Next regular open, when not currently regular.
    pub next_open: Option<DateTime<FixedOffset>>,
    /// Today's close, when currently regular.
    pub next_close: Option<DateTime<FixedOffset>>,
    /// Reason for a `Closed` session.
    pub closed_reason: Option<ClosedReason>,
    /// Human-readable status line.
    pub message: String,
}

impl MarketStatus {
    /// One-line summary with the local clock, e.g. `Market open (regular hours) | 10:15 AM -05:00`.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} | {}",
            self.message,
            self.local_time.format("%I:%M %p %:z")
        )
    }
}

// =============================================================================
// Session Clock
// =============================================================================

/// Pure session classifier over an immutable [`SessionCalendar`].
///
/// Cheap to clone; clones share the calendar.
///
/// # Example
///
/// ```rust
/// use chrono::TimeZone;
/// use stream_window::domain::session::{MarketSession, SessionCalendar, SessionClock};
///
/// let clock = SessionClock::new(SessionCalendar::us_equities());
/// let friday_ten = chrono_tz::America::New_York
///     .with_ymd_and_hms(2026, 1, 30, 10, 0, 0)
///     .unwrap();
///
/// assert_eq!(clock.classify(&friday_ten), MarketSession::Regular);
/// ```
#[derive(Debug, Clone)]
pub struct SessionClock {
    calendar: Arc<SessionCalendar>,
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new(SessionCalendar::default())
    }
}

impl SessionClock {
    /// Create a clock over the given calendar.
    #[must_use]
    pub fn new(calendar: SessionCalendar) -> Self {
        Self {
            calendar: Arc::new(calendar),
        }
    }

    /// The underlying calendar.
    #[must_use]
    pub fn calendar(&self) -> &SessionCalendar {
        &self.calendar
    }

    /// Convert any instant to exchange local time.
    #[must_use]
    pub fn to_local<Z: TimeZone>(&self, instant: &DateTime<Z>) -> DateTime<Tz> {
        instant.with_timezone(&self.calendar.timezone())
    }

    /// Classify an instant into a trading session.
    #[must_use]
    pub fn classify<Z: TimeZone>(&self, instant: &DateTime<Z>) -> MarketSession {
        self.classify_local(&self.to_local(instant))
    }

    /// Whether the regular session is open at `instant`.
    #[must_use]
    pub fn is_open<Z: TimeZone>(&self, instant: &DateTime<Z>) -> bool {
        self.classify(instant) == MarketSession::Regular
    }

    /// Saturday or Sunday.
    #[must_use]
    pub fn is_weekend(date: NaiveDate) -> bool {
        matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Whether `date` is a listed holiday.
    #[must_use]
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.calendar.is_holiday(date)
    }

    /// Neither a weekend nor a holiday.
    #[must_use]
    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !Self::is_weekend(date) && !self.is_holiday(date)
    }

    /// Next regular-session open at or after `from`.
    ///
    /// Returns today's open when `from` is before it on a trading day;
    /// otherwise scans up to [`MAX_SCAN_DAYS`] ahead. `None` means no
    /// trading day was found in range and the caller should retry later.
    #[must_use]
    pub fn next_open<Z: TimeZone>(&self, from: &DateTime<Z>) -> Option<DateTime<Tz>> {
        let local = self.to_local(from);
        let today = local.date_naive();
        let open = self.calendar.market_open();

        if self.is_trading_day(today) && local.time() < open {
            return self.at_local(today, open);
        }

        let next = (1..=MAX_SCAN_DAYS)
            .filter_map(|offset| today.checked_add_days(Days::new(offset)))
            .find(|date| self.is_trading_day(*date))
            .and_then(|date| self.at_local(date, open));

        if next.is_none() {
            tracing::warn!(
                from = %local,
                scan_days = MAX_SCAN_DAYS,
                "No trading day found within scan bound"
            );
        }

        next
    }

    /// Today's regular close, only while the regular session is open.
    #[must_use]
    pub fn next_close<Z: TimeZone>(&self, from: &DateTime<Z>) -> Option<DateTime<Tz>> {
        let local = self.to_local(from);
        if self.classify_local(&local) != MarketSession::Regular {
            return None;
        }
        self.at_local(local.date_naive(), self.calendar.market_close())
    }

    /// Full market status at `now`.
    #[must_use]
    pub fn market_status<Z: TimeZone>(&self, now: &DateTime<Z>) -> MarketStatus {
        let local = self.to_local(now);
        let session = self.classify_local(&local);
        let date = local.date_naive();

        let closed_reason = (session == MarketSession::Closed).then(|| {
            if Self::is_weekend(date) {
                ClosedReason::Weekend
            } else if self.is_holiday(date) {
                ClosedReason::Holiday
            } else {
                ClosedReason::OutsideHours
            }
        });

        let (next_open, next_close) = if session == MarketSession::Regular {
            (None, self.next_close(&local))
        } else {
            (self.next_open(&local), None)
        };

        MarketStatus {
            session,
            is_open: session == MarketSession::Regular,
            local_time: local.fixed_offset(),
            next_open: next_open.map(|t| t.fixed_offset()),
            next_close: next_close.map(|t| t.fixed_offset()),
            closed_reason,
            message: self.status_message(session, closed_reason),
        }
    }

    fn classify_local(&self, local: &DateTime<Tz>) -> MarketSession {
        if !self.is_trading_day(local.date_naive()) {
            return MarketSession::Closed;
        }

        let time = local.time();
        let cal = &self.calendar;

        if cal.pre_market_start() <= time && time < cal.market_open() {
            MarketSession::PreMarket
        } else if cal.market_open() <= time && time < cal.market_close() {
            MarketSession::Regular
        } else if cal.market_close() <= time && time < cal.after_hours_end() {
            MarketSession::AfterHours
        } else {
            MarketSession::Closed
        }
    }

    /// Resolve a local civil time; DST folds take the earlier instant.
    fn at_local(&self, date: NaiveDate, time: NaiveTime) -> Option<DateTime<Tz>> {
        self.calendar
            .timezone()
            .from_local_datetime(&date.and_time(time))
            .earliest()
    }

    fn status_message(&self, session: MarketSession, reason: Option<ClosedReason>) -> String {
        let cal = &self.calendar;
        let zone = cal.timezone().name();
        match (session, reason) {
            (MarketSession::Regular, _) => "Market open (regular hours)".to_string(),
            (MarketSession::PreMarket, _) => format!(
                "Pre-market (regular session opens at {} {zone})",
                cal.market_open().format("%H:%M")
            ),
            (MarketSession::AfterHours, _) => format!(
                "After-hours (regular session closed at {} {zone})",
                cal.market_close().format("%H:%M")
            ),
            (MarketSession::Closed, Some(ClosedReason::Weekend)) => {
                "Market closed (weekend)".to_string()
            }
            (MarketSession::Closed, Some(ClosedReason::Holiday)) => {
                "Market closed (holiday)".to_string()
            }
            (MarketSession::Closed, _) => "Market closed".to_string(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use chrono_tz::America::New_York;
    use test_case::test_case;

    fn et(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Tz> {
        New_York.with_ymd_and_hms(y, mo, d, h, mi, 0).single().unwrap()
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).single().unwrap()
    }

    fn clock() -> SessionClock {
        SessionClock::new(SessionCalendar::us_equities())
    }

    #[test_case(et(2026, 1, 30, 8, 0), MarketSession::PreMarket ; "friday pre-market")]
    #[test_case(et(2026, 1, 30, 10, 0), MarketSession::Regular ; "friday regular")]
    #[test_case(et(2026, 1, 30, 17, 0), MarketSession::AfterHours ; "friday after-hours")]
    #[test_case(et(2026, 1, 30, 22, 0), MarketSession::Closed ; "friday night")]
    #[test_case(et(2026, 1, 30, 3, 59), MarketSession::Closed ; "friday before pre-market")]
    #[test_case(et(2026, 2, 1, 12, 0), MarketSession::Closed ; "sunday noon")]
    #[test_case(et(2026, 1, 31, 10, 0), MarketSession::Closed ; "saturday morning")]
    #[test_case(et(2026, 1, 1, 12, 0), MarketSession::Closed ; "new years day")]
    fn classify_table(instant: DateTime<Tz>, expected: MarketSession) {
        assert_eq!(clock().classify(&instant), expected);
    }

    #[test_case(et(2026, 1, 30, 9, 30), MarketSession::Regular ; "open boundary")]
    #[test_case(et(2026, 1, 30, 16, 0), MarketSession::AfterHours ; "close boundary")]
    #[test_case(et(2026, 1, 30, 4, 0), MarketSession::PreMarket ; "pre-market boundary")]
    #[test_case(et(2026, 1, 30, 20, 0), MarketSession::Closed ; "after-hours end boundary")]
    fn boundaries_belong_to_the_session_they_start(instant: DateTime<Tz>, expected: MarketSession) {
        assert_eq!(clock().classify(&instant), expected);
    }

    #[test]
    fn one_tick_before_open_is_pre_market() {
        let open = et(2026, 1, 30, 9, 30);
        let before = open - chrono::Duration::milliseconds(1);
        assert_eq!(clock().classify(&before), MarketSession::PreMarket);
        assert_eq!(clock().classify(&open), MarketSession::Regular);
    }

    #[test]
    fn utc_input_is_converted_not_offset() {
        // Friday 2026-03-06 is EST (UTC-5); Monday 2026-03-09 is EDT (UTC-4).
        assert_eq!(
            clock().classify(&utc(2026, 3, 6, 13, 30)),
            MarketSession::PreMarket
        );
        assert_eq!(
            clock().classify(&utc(2026, 3, 6, 14, 30)),
            MarketSession::Regular
        );
        assert_eq!(
            clock().classify(&utc(2026, 3, 9, 13, 30)),
            MarketSession::Regular
        );
    }

    #[test]
    fn is_open_matches_regular_only() {
        let clock = clock();
        assert!(clock.is_open(&et(2026, 1, 30, 10, 0)));
        assert!(!clock.is_open(&et(2026, 1, 30, 8, 0)));
        assert!(!clock.is_open(&et(2026, 1, 30, 17, 0)));
    }

    #[test]
    fn weekend_and_holiday_checks() {
        let clock = clock();
        let sunday = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let new_year = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let friday = NaiveDate::from_ymd_opt(2026, 1, 30).unwrap();

        assert!(SessionClock::is_weekend(sunday));
        assert!(clock.is_holiday(new_year));
        assert!(!clock.is_trading_day(sunday));
        assert!(!clock.is_trading_day(new_year));
        assert!(clock.is_trading_day(friday));
    }

    #[test]
    fn next_open_same_day_when_before_open() {
        let next = clock().next_open(&et(2026, 1, 30, 8, 0)).unwrap();
        assert_eq!(next, et(2026, 1, 30, 9, 30));
    }

    #[test]
    fn next_open_skips_weekend() {
        let next = clock().next_open(&et(2026, 1, 30, 10, 0)).unwrap();
        assert_eq!(next, et(2026, 2, 2, 9, 30));
    }

    #[test]
    fn next_open_skips_holiday_monday() {
        // Monday 2026-01-19 is MLK day.
        let next = clock().next_open(&et(2026, 1, 16, 17, 0)).unwrap();
        assert_eq!(next, et(2026, 1, 20, 9, 30));
    }

    #[test]
    fn next_open_from_holiday_morning_moves_to_next_day() {
        let next = clock().next_open(&et(2026, 1, 1, 8, 0)).unwrap();
        assert_eq!(next, et(2026, 1, 2, 9, 30));
    }

    #[test]
    fn next_open_gives_up_past_scan_bound() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let holidays = (0..21).filter_map(|i| start.checked_add_days(Days::new(i)));
        let base = SessionCalendar::us_equities();
        let calendar = SessionCalendar::new(
            base.timezone(),
            base.pre_market_start(),
            base.market_open(),
            base.market_close(),
            base.after_hours_end(),
            holidays,
        )
        .unwrap();

        let clock = SessionClock::new(calendar);
        assert!(clock.next_open(&et(2026, 3, 2, 8, 0)).is_none());
    }

    #[test]
    fn next_close_only_during_regular() {
        let clock = clock();
        assert_eq!(
            clock.next_close(&et(2026, 1, 30, 10, 0)),
            Some(et(2026, 1, 30, 16, 0))
        );
        assert_eq!(clock.next_close(&et(2026, 1, 30, 8, 0)), None);
        assert_eq!(clock.next_close(&et(2026, 1, 31, 12, 0)), None);
    }

    #[test]
    fn market_status_regular() {
        let status = clock().market_status(&et(2026, 1, 30, 10, 0));
        assert!(status.is_open);
        assert_eq!(status.session, MarketSession::Regular);
        assert_eq!(
            status.next_close,
            Some(et(2026, 1, 30, 16, 0).fixed_offset())
        );
        assert!(status.next_open.is_none());
        assert!(status.closed_reason.is_none());
    }

    #[test_case(et(2026, 2, 1, 12, 0), ClosedReason::Weekend ; "weekend")]
    #[test_case(et(2026, 1, 1, 12, 0), ClosedReason::Holiday ; "holiday")]
    #[test_case(et(2026, 1, 30, 22, 0), ClosedReason::OutsideHours ; "night")]
    fn market_status_closed_reasons(instant: DateTime<Tz>, reason: ClosedReason) {
        let status = clock().market_status(&instant);
        assert_eq!(status.session, MarketSession::Closed);
        assert_eq!(status.closed_reason, Some(reason));
        assert!(status.next_open.is_some());
        assert!(status.message.starts_with("Market closed"));
    }

    #[test]
    fn market_status_summary_includes_clock() {
        let status = clock().market_status(&et(2026, 1, 30, 8, 0));
        assert!(status.message.starts_with("Pre-market"));
        assert!(status.summary().contains("08:00 AM"));
    }

    #[test]
    fn session_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&MarketSession::AfterHours).unwrap(),
            "\"after_hours\""
        );
        assert_eq!(MarketSession::PreMarket.as_str(), "pre_market");
    }
}
