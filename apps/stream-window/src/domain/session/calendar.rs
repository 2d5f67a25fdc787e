//! Exchange Session Calendar
//!
//! Immutable description of an exchange's trading day: the timezone the
//! exchange keeps its clock in, the four session boundaries, and the list
//! of full-day holidays. Read-only after construction.

use std::collections::BTreeSet;

use chrono::{NaiveDate, NaiveTime};
use chrono_tz::Tz;

/// US equity market holidays for 2026 (full-day closures).
const US_EQUITY_HOLIDAYS_2026: &[(i32, u32, u32)] = &[
    (2026, 1, 1),   // New Year's Day
    (2026, 1, 19),  // Martin Luther King Jr. Day
    (2026, 2, 16),  // Presidents' Day
    (2026, 4, 3),   // Good Friday
    (2026, 5, 25),  // Memorial Day
    (2026, 7, 3),   // Independence Day (observed)
    (2026, 9, 7),   // Labor Day
    (2026, 11, 26), // Thanksgiving
    (2026, 12, 25), // Christmas
];

/// Parse a `HH:MM` (or `HH:MM:SS`) clock time.
///
/// # Errors
///
/// Returns `CalendarError::InvalidTime` if the text is not a valid clock time.
pub fn parse_clock_time(text: &str) -> Result<NaiveTime, CalendarError> {
    let text = text.trim();
    NaiveTime::parse_from_str(text, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(text, "%H:%M:%S"))
        .map_err(|_| CalendarError::InvalidTime(text.to_string()))
}

/// Parse a comma-separated list of `YYYY-MM-DD` dates.
///
/// Empty entries are ignored, so a trailing comma is harmless.
///
/// # Errors
///
/// Returns `CalendarError::InvalidHoliday` for the first malformed entry.
pub fn parse_holiday_list(text: &str) -> Result<Vec<NaiveDate>, CalendarError> {
    text.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            NaiveDate::parse_from_str(entry, "%Y-%m-%d")
                .map_err(|_| CalendarError::InvalidHoliday(entry.to_string()))
        })
        .collect()
}

/// Parse an IANA timezone name such as `America/New_York`.
///
/// # Errors
///
/// Returns `CalendarError::UnknownTimezone` if the name is not in the tz database.
pub fn parse_timezone(name: &str) -> Result<Tz, CalendarError> {
    name.trim()
        .parse::<Tz>()
        .map_err(|_| CalendarError::UnknownTimezone(name.trim().to_string()))
}

/// Trading session calendar for a single exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCalendar {
    timezone: Tz,
    pre_market_start: NaiveTime,
    market_open: NaiveTime,
    market_close: NaiveTime,
    after_hours_end: NaiveTime,
    holidays: BTreeSet<NaiveDate>,
}

impl SessionCalendar {
    /// Create a calendar from explicit boundaries.
    ///
    /// # Errors
    ///
    /// Returns `CalendarError::BoundaryOrder` unless
    /// `pre_market_start <= market_open < market_close <= after_hours_end`.
    pub fn new(
        timezone: Tz,
        pre_market_start: NaiveTime,
        market_open: NaiveTime,
        market_close: NaiveTime,
        after_hours_end: NaiveTime,
        holidays: impl IntoIterator<Item = NaiveDate>,
    ) -> Result<Self, CalendarError> {
        let ordered = pre_market_start <= market_open
            && market_open < market_close
            && market_close <= after_hours_end;

        if !ordered {
            return Err(CalendarError::BoundaryOrder {
                pre_market_start,
                market_open,
                market_close,
                after_hours_end,
            });
        }

        Ok(Self {
            timezone,
            pre_market_start,
            market_open,
            market_close,
            after_hours_end,
            holidays: holidays.into_iter().collect(),
        })
    }

    /// US equities: 04:00 / 09:30 / 16:00 / 20:00 Eastern with the 2026 holidays.
    #[must_use]
    pub fn us_equities() -> Self {
        Self {
            timezone: chrono_tz::America::New_York,
            pre_market_start: hm(4, 0),
            market_open: hm(9, 30),
            market_close: hm(16, 0),
            after_hours_end: hm(20, 0),
            holidays: Self::default_holidays().into_iter().collect(),
        }
    }

    /// The built-in holiday list used by [`SessionCalendar::us_equities`].
    #[must_use]
    pub fn default_holidays() -> Vec<NaiveDate> {
        US_EQUITY_HOLIDAYS_2026
            .iter()
            .filter_map(|&(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
            .collect()
    }

    /// Exchange timezone.
    #[must_use]
    pub const fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Start of pre-market trading (local time).
    #[must_use]
    pub const fn pre_market_start(&self) -> NaiveTime {
        self.pre_market_start
    }

    /// Regular session open (local time).
    #[must_use]
    pub const fn market_open(&self) -> NaiveTime {
        self.market_open
    }

    /// Regular session close (local time).
    #[must_use]
    pub const fn market_close(&self) -> NaiveTime {
        self.market_close
    }

    /// End of after-hours trading (local time).
    #[must_use]
    pub const fn after_hours_end(&self) -> NaiveTime {
        self.after_hours_end
    }

    /// Whether `date` is a listed holiday.
    #[must_use]
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays.contains(&date)
    }

    /// Holidays in ascending order.
    pub fn holidays(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.holidays.iter().copied()
    }
}

impl Default for SessionCalendar {
    fn default() -> Self {
        Self::us_equities()
    }
}

fn hm(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or_default()
}

/// Calendar construction errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CalendarError {
    /// Session boundaries are out of order.
    #[error(
        "session boundaries out of order: pre-market {pre_market_start}, open {market_open}, \
         close {market_close}, after-hours end {after_hours_end}"
    )]
    BoundaryOrder {
        /// Pre-market start.
        pre_market_start: NaiveTime,
        /// Market open.
        market_open: NaiveTime,
        /// Market close.
        market_close: NaiveTime,
        /// After-hours end.
        after_hours_end: NaiveTime,
    },
    /// Timezone name not found in the tz database.
    #[error("unknown timezone: {0}")]
    UnknownTimezone(String),
    /// Clock time could not be parsed.
    #[error("invalid clock time (expected HH:MM): {0}")]
    InvalidTime(String),
    /// Holiday date could not be parsed.
    #[error("invalid holiday date (expected YYYY-MM-DD): {0}")]
    InvalidHoliday(String),
}
