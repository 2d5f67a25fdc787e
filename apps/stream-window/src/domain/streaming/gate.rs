//! Session Gate
//!
//! Single entry point that turns upstream timestamps into canonical
//! instants and decides whether a live point may enter a window.
//!
//! Only `Regular` session points are admitted. Historical bars bypass the
//! gate entirely; callers filter them upstream (see
//! [`SessionGate::filter_regular_hours`]).

use chrono::{DateTime, Datelike, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use super::point::{IngestError, Point, RawPoint, RawTimestamp, normalize_symbol};
use crate::domain::session::{MarketSession, SessionClock};

/// Lenient civil-time formats accepted for textual timestamps.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Accepted calendar years (UTC). Instants outside cannot be shifted to
/// every exchange zone without overflowing.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1970..=9999;

/// Lenient zoned formats tried after RFC 3339.
const ZONED_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Admission control for live points.
#[derive(Debug, Clone)]
pub struct SessionGate {
    clock: SessionClock,
    naive_zone: Tz,
}

impl SessionGate {
    /// Create a gate. Naive timestamps are interpreted in `naive_zone`.
    #[must_use]
    pub const fn new(clock: SessionClock, naive_zone: Tz) -> Self {
        Self { clock, naive_zone }
    }

    /// The session clock used for classification.
    #[must_use]
    pub const fn clock(&self) -> &SessionClock {
        &self.clock
    }

    /// Zone assumed for timestamps without zone information.
    #[must_use]
    pub const fn naive_zone(&self) -> Tz {
        self.naive_zone
    }

    /// Resolve any upstream timestamp to a canonical instant.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::InvalidTimestamp` for non-positive or
    /// out-of-range epoch values, unparseable text, naive times that do not
    /// exist in the naive zone (DST gaps), and instants outside years
    /// 1970..=9999.
    pub fn resolve(&self, symbol: &str, raw: &RawTimestamp) -> Result<DateTime<Utc>, IngestError> {
        let instant = match raw {
            RawTimestamp::EpochMillis(millis) if *millis <= 0 => Err(invalid(
                symbol,
                format!("non-positive epoch milliseconds: {millis}"),
            )),
            RawTimestamp::EpochMillis(millis) => DateTime::from_timestamp_millis(*millis)
                .ok_or_else(|| invalid(symbol, format!("epoch milliseconds out of range: {millis}"))),
            RawTimestamp::Zoned(instant) => Ok(instant.with_timezone(&Utc)),
            RawTimestamp::Naive(naive) => self.localize_naive(symbol, naive),
            RawTimestamp::Text(text) => self.parse_text(symbol, text),
        }?;
        Self::check_instant(symbol, instant)
    }

    /// Reject instants outside the supported year range.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::InvalidTimestamp` if the UTC year of `instant`
    /// is outside 1970..=9999.
    pub fn check_instant(
        symbol: &str,
        instant: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, IngestError> {
        if YEAR_RANGE.contains(&instant.year()) {
            Ok(instant)
        } else {
            Err(invalid(symbol, format!("instant out of range: {instant}")))
        }
    }

    /// Validate a raw record and resolve its timestamp.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::MissingSymbol` for a blank symbol and
    /// `IngestError::InvalidTimestamp` for a missing or bad timestamp.
    /// Symbols are trimmed and uppercased.
    pub fn decode(&self, raw: RawPoint) -> Result<Point, IngestError> {
        let symbol = normalize_symbol(&raw.symbol);
        if symbol.is_empty() {
            return Err(IngestError::MissingSymbol);
        }

        let Some(raw_timestamp) = raw.timestamp.as_ref() else {
            return Err(invalid(&symbol, "missing timestamp".to_string()));
        };
        let timestamp = self.resolve(&symbol, raw_timestamp)?;

        Ok(Point::from_raw(raw, symbol, timestamp))
    }

    /// Annotate the point with its exchange local time and return its session.
    pub fn annotate(&self, point: &mut Point) -> MarketSession {
        let local = self.clock.to_local(&point.timestamp);
        point.timestamp_local = Some(local.fixed_offset());
        self.clock.classify(&local)
    }

    /// Annotate the point and admit it iff it falls in the regular session.
    pub fn admit(&self, point: &mut Point) -> bool {
        self.annotate(point) == MarketSession::Regular
    }

    /// Keep only regular-session points, annotated with local time.
    pub fn filter_regular_hours(&self, points: impl IntoIterator<Item = Point>) -> Vec<Point> {
        points
            .into_iter()
            .filter_map(|mut point| self.admit(&mut point).then_some(point))
            .collect()
    }

    /// Keep points on trading days regardless of time of day (daily bars).
    pub fn filter_trading_days(&self, points: impl IntoIterator<Item = Point>) -> Vec<Point> {
        points
            .into_iter()
            .filter_map(|mut point| {
                self.annotate(&mut point);
                let local = self.clock.to_local(&point.timestamp);
                self.clock
                    .is_trading_day(local.date_naive())
                    .then_some(point)
            })
            .collect()
    }

    fn localize_naive(&self, symbol: &str, naive: &NaiveDateTime) -> Result<DateTime<Utc>, IngestError> {
        if !YEAR_RANGE.contains(&naive.year()) {
            return Err(invalid(symbol, format!("{naive} out of range")));
        }
        self.naive_zone
            .from_local_datetime(naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(|| {
                invalid(
                    symbol,
                    format!("{naive} does not exist in {}", self.naive_zone.name()),
                )
            })
    }

    fn parse_text(&self, symbol: &str, text: &str) -> Result<DateTime<Utc>, IngestError> {
        let text = text.trim();

        if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
            return Ok(instant.with_timezone(&Utc));
        }

        if let Some(instant) = ZONED_FORMATS
            .iter()
            .find_map(|fmt| DateTime::parse_from_str(text, fmt).ok())
        {
            return Ok(instant.with_timezone(&Utc));
        }

        if let Some(naive) = NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        {
            return self.localize_naive(symbol, &naive);
        }

        Err(invalid(symbol, format!("unparseable timestamp: {text:?}")))
    }
}

fn invalid(symbol: &str, reason: String) -> IngestError {
    IngestError::InvalidTimestamp {
        symbol: symbol.to_string(),
        reason,
    }
}
