//! Point Types
//!
//! `RawPoint` is the decoded record handed over by a feed decoder or a
//! history loader; `Point` is the canonical stored observation.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A symbol string (stock ticker).
pub type Symbol = String;

/// Canonical form of a ticker: trimmed and ASCII-uppercased.
#[must_use]
pub fn normalize_symbol(symbol: &str) -> Symbol {
    symbol.trim().to_ascii_uppercase()
}

/// Timestamp as received from upstream, before normalization.
///
/// Deserializes untagged from JSON: numbers are epoch milliseconds, strings
/// are tried as RFC 3339, then as a naive ISO datetime, then kept as text
/// for lenient parsing at the gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawTimestamp {
    /// Milliseconds since the Unix epoch.
    EpochMillis(i64),
    /// Civil time with an explicit UTC offset.
    Zoned(DateTime<FixedOffset>),
    /// Civil time without zone information.
    Naive(NaiveDateTime),
    /// Any other textual form.
    Text(String),
}

impl From<i64> for RawTimestamp {
    fn from(millis: i64) -> Self {
        Self::EpochMillis(millis)
    }
}

impl From<DateTime<Utc>> for RawTimestamp {
    fn from(instant: DateTime<Utc>) -> Self {
        Self::Zoned(instant.fixed_offset())
    }
}

impl From<DateTime<FixedOffset>> for RawTimestamp {
    fn from(instant: DateTime<FixedOffset>) -> Self {
        Self::Zoned(instant)
    }
}

impl From<NaiveDateTime> for RawTimestamp {
    fn from(naive: NaiveDateTime) -> Self {
        Self::Naive(naive)
    }
}

/// Decoded upstream record. OHLCV fields may be absent on malformed ticks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    /// Ticker symbol. History files may leave it blank.
    #[serde(default, alias = "sym")]
    pub symbol: Symbol,
    /// Event timestamp (start of the aggregate window for bars).
    #[serde(default, alias = "s", alias = "t")]
    pub timestamp: Option<RawTimestamp>,
    /// Open price.
    #[serde(default, alias = "o")]
    pub open: Option<f64>,
    /// High price.
    #[serde(default, alias = "h")]
    pub high: Option<f64>,
    /// Low price.
    #[serde(default, alias = "l")]
    pub low: Option<f64>,
    /// Close price.
    #[serde(default, alias = "c")]
    pub close: Option<f64>,
    /// Volume (shares).
    #[serde(default, alias = "v")]
    pub volume: Option<u64>,
    /// Volume-weighted average price.
    #[serde(default, alias = "vw")]
    pub vwap: Option<f64>,
    /// Number of transactions in the aggregate.
    #[serde(default, alias = "n")]
    pub transactions: Option<u64>,
}

impl RawPoint {
    /// Record with a symbol and timestamp and no prices.
    #[must_use]
    pub fn new(symbol: impl Into<Symbol>, timestamp: impl Into<RawTimestamp>) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp: Some(timestamp.into()),
            ..Self::default()
        }
    }

    /// Set open/high/low/close.
    #[must_use]
    pub const fn with_ohlc(mut self, open: f64, high: f64, low: f64, close: f64) -> Self {
        self.open = Some(open);
        self.high = Some(high);
        self.low = Some(low);
        self.close = Some(close);
        self
    }

    /// Set volume.
    #[must_use]
    pub const fn with_volume(mut self, volume: u64) -> Self {
        self.volume = Some(volume);
        self
    }
}

/// One stored OHLCV observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Ticker symbol.
    pub symbol: Symbol,
    /// Canonical event instant.
    pub timestamp: DateTime<Utc>,
    /// Event time in exchange local time, set once the point passes the gate
    /// or is preloaded.
    #[serde(default)]
    pub timestamp_local: Option<DateTime<FixedOffset>>,
    /// Open price.
    pub open: Option<f64>,
    /// High price.
    pub high: Option<f64>,
    /// Low price.
    pub low: Option<f64>,
    /// Close price.
    pub close: Option<f64>,
    /// Volume (shares).
    pub volume: Option<u64>,
    /// Volume-weighted average price.
    pub vwap: Option<f64>,
    /// Number of transactions.
    pub transactions: Option<u64>,
    /// Bootstrap history (`true`) or live tick (`false`).
    #[serde(default)]
    pub is_preloaded: bool,
}

impl Point {
    /// Point with a symbol and instant and no prices.
    #[must_use]
    pub fn new(symbol: impl Into<Symbol>, timestamp: DateTime<Utc>) -> Self {
        Self {
            symbol: symbol.into(),
            timestamp,
            timestamp_local: None,
            open: None,
            high: None,
            low: None,
            close: None,
            volume: None,
            vwap: None,
            transactions: None,
            is_preloaded: false,
        }
    }

    /// Set open/high/low/close.
    #[must_use]
    pub const fn with_ohlc(mut self, open: f64, high: f64, low: f64, close: f64) -> Self {
        self.open = Some(open);
        self.high = Some(high);
        self.low = Some(low);
        self.close = Some(close);
        self
    }

    /// Set volume.
    #[must_use]
    pub const fn with_volume(mut self, volume: u64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Build from a raw record whose timestamp has already been resolved.
    #[must_use]
    pub(crate) fn from_raw(raw: RawPoint, symbol: Symbol, timestamp: DateTime<Utc>) -> Self {
        Self {
            symbol,
            timestamp,
            timestamp_local: None,
            open: raw.open,
            high: raw.high,
            low: raw.low,
            close: raw.close,
            volume: raw.volume,
            vwap: raw.vwap,
            transactions: raw.transactions,
            is_preloaded: false,
        }
    }
}

/// Errors raised while normalizing an inbound record.
///
/// Unknown symbols are never an error; absent windows read as empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    /// Timestamp is missing, unparseable, or nonsensical.
    #[error("invalid timestamp for {symbol}: {reason}")]
    InvalidTimestamp {
        /// Symbol of the offending record.
        symbol: Symbol,
        /// What was wrong with it.
        reason: String,
    },
    /// Record carries no symbol.
    #[error("record has no symbol")]
    MissingSymbol,
}
