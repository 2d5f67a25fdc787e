//! Feed and History Adapters
//!
//! Implementations of the ingestion ports:
//!
//! - `ChannelFeed`: records pushed in-process by an upstream decoder
//! - `JsonLinesFeed`: replays a JSON-lines capture, optionally paced
//! - `JsonHistorySource`: reads `<dir>/<SYMBOL>.json` bar arrays

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;

use crate::application::ports::{FeedError, HistorySource, PointFeed};
use crate::domain::streaming::{RawPoint, Symbol};

// =============================================================================
// Channel Feed
// =============================================================================

/// Feed backed by an mpsc channel.
#[derive(Debug)]
pub struct ChannelFeed {
    rx: mpsc::Receiver<RawPoint>,
}

impl ChannelFeed {
    /// Wrap an existing receiver.
    #[must_use]
    pub const fn new(rx: mpsc::Receiver<RawPoint>) -> Self {
        Self { rx }
    }

    /// Create a feed and the sender that drives it.
    #[must_use]
    pub fn channel(capacity: usize) -> (mpsc::Sender<RawPoint>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl PointFeed for ChannelFeed {
    async fn next_point(&mut self) -> Result<Option<RawPoint>, FeedError> {
        // All senders dropped means the upstream finished.
        Ok(self.rx.recv().await)
    }
}

// =============================================================================
// JSON Lines Feed
// =============================================================================

/// Feed replaying one JSON record per line.
///
/// Blank lines are skipped. A malformed line yields a recoverable
/// `FeedError::Decode`; the next call continues with the following line.
#[derive(Debug)]
pub struct JsonLinesFeed {
    lines: Lines<BufReader<File>>,
    line: usize,
    pace: Duration,
}

impl JsonLinesFeed {
    /// Open a capture file.
    ///
    /// # Errors
    ///
    /// Returns `FeedError::Io` if the file cannot be opened.
    pub async fn open(path: impl AsRef<Path>, pace: Duration) -> Result<Self, FeedError> {
        let file = File::open(path.as_ref()).await?;
        tracing::info!(path = %path.as_ref().display(), pace = ?pace, "Opened replay feed");
        Ok(Self {
            lines: BufReader::new(file).lines(),
            line: 0,
            pace,
        })
    }
}

#[async_trait]
impl PointFeed for JsonLinesFeed {
    async fn next_point(&mut self) -> Result<Option<RawPoint>, FeedError> {
        loop {
            let Some(text) = self.lines.next_line().await? else {
                return Ok(None);
            };
            self.line += 1;

            if text.trim().is_empty() {
                continue;
            }

            if !self.pace.is_zero() {
                tokio::time::sleep(self.pace).await;
            }

            return serde_json::from_str(&text)
                .map(Some)
                .map_err(|source| FeedError::Decode {
                    line: self.line,
                    source,
                });
        }
    }
}

// =============================================================================
// JSON History Source
// =============================================================================

/// History loaded from per-symbol JSON arrays on disk.
#[derive(Debug, Clone)]
pub struct JsonHistorySource {
    dir: PathBuf,
}

impl JsonHistorySource {
    /// Source reading from `dir`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// File that holds a symbol's history.
    #[must_use]
    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{symbol}.json"))
    }
}

#[async_trait]
impl HistorySource for JsonHistorySource {
    async fn load(&self, symbol: &Symbol) -> Result<Vec<RawPoint>, FeedError> {
        let path = self.path_for(symbol);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No history file");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };

        let mut bars: Vec<RawPoint> =
            serde_json::from_slice(&bytes).map_err(|source| FeedError::Decode {
                line: source.line(),
                source,
            })?;

        // Files may omit the symbol on each bar.
        for bar in &mut bars {
            if bar.symbol.trim().is_empty() {
                bar.symbol.clone_from(symbol);
            }
        }
        Ok(bars)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use crate::domain::streaming::RawTimestamp;

    #[tokio::test]
    async fn channel_feed_ends_when_senders_drop() {
        let (tx, mut feed) = ChannelFeed::channel(4);
        tx.send(RawPoint::new("AAPL", 1_769_785_200_000_i64)).await.unwrap();
        drop(tx);

        let first = feed.next_point().await.unwrap().unwrap();
        assert_eq!(first.symbol, "AAPL");
        assert!(feed.next_point().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn json_lines_feed_skips_blank_and_reports_bad_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{"symbol":"AAPL","timestamp":1769785200000,"close":1.5}}"#).unwrap();
        writeln!(file).unwrap();
        writeln!(file, "not json").unwrap();
        writeln!(file, r#"{{"sym":"MSFT","t":"2026-01-30T10:00:00-05:00"}}"#).unwrap();
        file.flush().unwrap();

        let mut feed = JsonLinesFeed::open(file.path(), Duration::ZERO).await.unwrap();

        let first = feed.next_point().await.unwrap().unwrap();
        assert_eq!(first.close, Some(1.5));

        match feed.next_point().await {
            Err(FeedError::Decode { line, .. }) => assert_eq!(line, 3),
            other => panic!("expected decode error, got {other:?}"),
        }

        let third = feed.next_point().await.unwrap().unwrap();
        assert_eq!(third.symbol, "MSFT");
        assert!(matches!(third.timestamp, Some(RawTimestamp::Zoned(_))));

        assert!(feed.next_point().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn json_lines_feed_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = JsonLinesFeed::open(dir.path().join("missing.jsonl"), Duration::ZERO).await;
        assert!(matches!(result, Err(FeedError::Io(_))));
    }

    #[tokio::test]
    async fn history_source_reads_and_fills_symbol() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("AAPL.json"),
            r#"[{"t":1769785200000,"o":1,"h":2,"l":0.5,"c":1.5,"v":100},
                {"symbol":"AAPL","timestamp":"2026-01-30T10:01:00-05:00"}]"#,
        )
        .unwrap();

        let source = JsonHistorySource::new(dir.path());
        let bars = source.load(&"AAPL".to_string()).await.unwrap();

        assert_eq!(bars.len(), 2);
        assert!(bars.iter().all(|b| b.symbol == "AAPL"));
        assert_eq!(bars[0].volume, Some(100));
    }

    #[tokio::test]
    async fn history_source_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let source = JsonHistorySource::new(dir.path());
        assert!(source.load(&"MSFT".to_string()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn history_source_bad_json_is_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("NVDA.json"), "{ nope").unwrap();

        let source = JsonHistorySource::new(dir.path());
        let result = source.load(&"NVDA".to_string()).await;
        assert!(matches!(result, Err(FeedError::Decode { .. })));
    }
}
