//! Service Configuration Settings
//!
//! Configuration types for the stream window service, loaded from
//! environment variables.

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;

use crate::application::services::HistoryFilter;
use crate::domain::session::{
    CalendarError, SessionCalendar, parse_clock_time, parse_holiday_list, parse_timezone,
};
use crate::domain::streaming::{Symbol, normalize_symbol};
use crate::domain::window::DEFAULT_MAX_POINTS;

/// Rolling window settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSettings {
    /// Capacity of every per-symbol window.
    pub max_points: NonZeroUsize,
    /// Zone assumed for feed timestamps that carry no zone.
    pub naive_timezone: Tz,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            max_points: DEFAULT_MAX_POINTS,
            naive_timezone: Tz::UTC,
        }
    }
}

/// Live feed settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedSettings {
    /// JSON-lines file to replay as the live feed.
    pub replay_path: Option<PathBuf>,
    /// Delay between replayed records (zero = as fast as possible).
    pub replay_pace: Duration,
    /// Symbols to bootstrap from history.
    pub symbols: Vec<Symbol>,
}

/// History bootstrap settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistorySettings {
    /// Directory holding `<SYMBOL>.json` bar arrays.
    pub dir: Option<PathBuf>,
    /// Filter applied to loaded bars before preloading.
    pub filter: HistoryFilter,
}

/// Server settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSettings {
    /// Query/health/metrics HTTP port.
    pub http_port: u16,
    /// Interval between stats log lines.
    pub stats_interval: Duration,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            http_port: 8083,
            stats_interval: Duration::from_secs(10),
        }
    }
}

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Rolling window settings.
    pub window: WindowSettings,
    /// Exchange session calendar.
    pub session: SessionCalendar,
    /// Live feed settings.
    pub feed: FeedSettings,
    /// History bootstrap settings.
    pub history: HistorySettings,
    /// Server settings.
    pub server: ServerSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            window: WindowSettings::default(),
            session: SessionCalendar::us_equities(),
            feed: FeedSettings::default(),
            history: HistorySettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl AppConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a calendar variable cannot be parsed or the
    /// window capacity is zero.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`AppConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_points = parse_env_usize(
            &lookup,
            "STREAM_WINDOW_MAX_POINTS",
            defaults.window.max_points.get(),
        );
        let max_points = NonZeroUsize::new(max_points).ok_or_else(|| ConfigError::InvalidValue {
            key: "STREAM_WINDOW_MAX_POINTS".to_string(),
            value: max_points.to_string(),
        })?;

        let window = WindowSettings {
            max_points,
            naive_timezone: parse_env_with(
                &lookup,
                "FEED_NAIVE_TIMEZONE",
                parse_timezone,
                defaults.window.naive_timezone,
            )?,
        };

        let session = load_calendar(&lookup, &defaults.session)?;

        let feed = FeedSettings {
            replay_path: parse_env_path(&lookup, "FEED_REPLAY_PATH"),
            replay_pace: parse_env_duration_millis(
                &lookup,
                "FEED_REPLAY_PACE_MS",
                defaults.feed.replay_pace,
            ),
            symbols: parse_env_list(&lookup, "STREAM_SYMBOLS"),
        };

        let history = HistorySettings {
            dir: parse_env_path(&lookup, "HISTORY_DIR"),
            filter: lookup("HISTORY_FILTER")
                .map(|s| HistoryFilter::from_str_case_insensitive(&s))
                .unwrap_or_default(),
        };

        let server = ServerSettings {
            http_port: parse_env_u16(&lookup, "STREAM_WINDOW_HTTP_PORT", defaults.server.http_port),
            stats_interval: parse_env_duration_secs(
                &lookup,
                "STREAM_WINDOW_STATS_INTERVAL_SECS",
                defaults.server.stats_interval,
            ),
        };

        Ok(Self {
            window,
            session,
            feed,
            history,
            server,
        })
    }
}

fn load_calendar(
    lookup: &impl Fn(&str) -> Option<String>,
    defaults: &SessionCalendar,
) -> Result<SessionCalendar, ConfigError> {
    let timezone = parse_env_with(lookup, "SESSION_TIMEZONE", parse_timezone, defaults.timezone())?;
    let pre_market_start = parse_env_with(
        lookup,
        "SESSION_PRE_MARKET_START",
        parse_clock_time,
        defaults.pre_market_start(),
    )?;
    let market_open = parse_env_with(
        lookup,
        "SESSION_MARKET_OPEN",
        parse_clock_time,
        defaults.market_open(),
    )?;
    let market_close = parse_env_with(
        lookup,
        "SESSION_MARKET_CLOSE",
        parse_clock_time,
        defaults.market_close(),
    )?;
    let after_hours_end = parse_env_with(
        lookup,
        "SESSION_AFTER_HOURS_END",
        parse_clock_time,
        defaults.after_hours_end(),
    )?;
    let holidays = parse_env_with(
        lookup,
        "SESSION_HOLIDAYS",
        parse_holiday_list,
        SessionCalendar::default_holidays(),
    )?;

    SessionCalendar::new(
        timezone,
        pre_market_start,
        market_open,
        market_close,
        after_hours_end,
        holidays,
    )
    .map_err(|source| ConfigError::Calendar {
        key: "SESSION_*".to_string(),
        source,
    })
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A session calendar variable is malformed or inconsistent.
    #[error("invalid calendar setting {key}: {source}")]
    Calendar {
        /// Offending variable.
        key: String,
        /// Parse or validation failure.
        #[source]
        source: CalendarError,
    },
    /// Environment variable has a value the service cannot run with.
    #[error("invalid value for {key}: {value}")]
    InvalidValue {
        /// Offending variable.
        key: String,
        /// Its value.
        value: String,
    },
}

fn parse_env_with<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    parse: impl Fn(&str) -> Result<T, CalendarError>,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => {
            parse(value.trim()).map_err(|source| ConfigError::Calendar {
                key: key.to_string(),
                source,
            })
        }
        _ => Ok(default),
    }
}

fn parse_env_u16(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u16) -> u16 {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_env_usize(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: usize) -> usize {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Duration {
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: Duration,
) -> Duration {
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}

fn parse_env_path(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<PathBuf> {
    lookup(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn parse_env_list(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Vec<Symbol> {
    lookup(key)
        .map(|v| {
            v.split(',')
                .map(normalize_symbol)
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
