//! Port Interfaces
//!
//! Contracts the infrastructure adapters implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `PointFeed`: Live records, one at a time, from a decoder upstream
//! - `HistorySource`: Historical bars for bootstrap preloading

use async_trait::async_trait;

use crate::domain::streaming::{RawPoint, Symbol};

/// Errors raised by feeds and history sources.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Underlying I/O failed.
    #[error("feed I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record could not be decoded.
    #[error("failed to decode record at line {line}: {source}")]
    Decode {
        /// 1-based line (or array index + 1) of the bad record.
        line: usize,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// The upstream went away.
    #[error("feed closed")]
    Closed,
}

impl FeedError {
    /// Whether the feed can keep producing after this error.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}

/// Source of live records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PointFeed: Send {
    /// Next record, or `None` when the feed has ended.
    ///
    /// # Errors
    ///
    /// `FeedError::Decode` for a single bad record (the feed stays usable);
    /// any other variant is fatal.
    async fn next_point(&mut self) -> Result<Option<RawPoint>, FeedError>;
}

/// Source of historical bars, oldest first.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Load the history for a symbol. Unknown symbols yield an empty list.
    ///
    /// # Errors
    ///
    /// Returns `FeedError` when the backing store cannot be read.
    async fn load(&self, symbol: &Symbol) -> Result<Vec<RawPoint>, FeedError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_errors_are_recoverable() {
        let source = serde_json::from_str::<RawPoint>("{").unwrap_err();
        assert!(FeedError::Decode { line: 3, source }.is_recoverable());
        assert!(!FeedError::Closed.is_recoverable());
        assert!(!FeedError::Io(std::io::Error::other("boom")).is_recoverable());
    }

    #[test]
    fn decode_error_names_line() {
        let source = serde_json::from_str::<RawPoint>("{").unwrap_err();
        let err = FeedError::Decode { line: 7, source };
        assert!(err.to_string().starts_with("failed to decode record at line 7"));
    }
}
