//! End-to-End Integration Tests
//!
//! History bootstrap from disk followed by a live feed through the gate.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::num::NonZeroUsize;
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use chrono_tz::America::New_York;
use chrono_tz::Tz;
use tokio_util::sync::CancellationToken;

use stream_window::{
    ChannelFeed, HistoryFilter, IngestionSummary, JsonHistorySource, JsonLinesFeed,
    MarketSession, RawPoint, SessionCalendar, StreamDataManager, WindowSettings,
    bootstrap_history, run_ingestion,
};

fn et(month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    New_York
        .with_ymd_and_hms(2026, month, day, hour, minute, 0)
        .unwrap()
        .with_timezone(&Utc)
}

fn manager(max_points: usize) -> Arc<StreamDataManager> {
    let settings = WindowSettings {
        max_points: NonZeroUsize::new(max_points).unwrap(),
        naive_timezone: Tz::UTC,
    };
    StreamDataManager::shared(&settings, SessionCalendar::us_equities())
}

fn write_history(dir: &std::path::Path, symbol: &str, bars: &[RawPoint]) {
    std::fs::write(
        dir.join(format!("{symbol}.json")),
        serde_json::to_vec(bars).unwrap(),
    )
    .unwrap();
}

#[tokio::test]
async fn aapl_preload_then_live_session() {
    let dir = tempfile::tempdir().unwrap();
    let history: Vec<RawPoint> = (0..600)
        .map(|i| {
            let price = 230.0 + f64::from(i) * 0.01;
            RawPoint::new("AAPL", et(1, 28, 9, 30) + Duration::minutes(i64::from(i)))
                .with_ohlc(price, price + 0.05, price - 0.05, price)
                .with_volume(1_000)
        })
        .collect();
    write_history(dir.path(), "AAPL", &history);

    let manager = manager(600);
    let source = JsonHistorySource::new(dir.path());
    let report = bootstrap_history(
        &source,
        &manager,
        &["AAPL".to_string()],
        HistoryFilter::None,
    )
    .await;

    assert_eq!(report.preloaded["AAPL"], 600);
    assert!(manager.is_full("AAPL"));
    assert_eq!(manager.buffer_status("AAPL").preloaded_count, 600);

    // Friday 2026-01-30: five regular ticks, then three after-hours ticks.
    let (tx, mut feed) = ChannelFeed::channel(16);
    for minute in 0..5 {
        tx.send(RawPoint::new("AAPL", et(1, 30, 10, minute)).with_ohlc(240.0, 240.5, 239.5, 240.25))
            .await
            .unwrap();
    }
    for minute in 0..3 {
        tx.send(RawPoint::new("AAPL", et(1, 30, 17, minute)).with_ohlc(241.0, 241.0, 241.0, 241.0))
            .await
            .unwrap();
    }
    drop(tx);

    let summary = run_ingestion(&mut feed, &manager, CancellationToken::new()).await;
    assert_eq!(
        summary,
        IngestionSummary {
            received: 8,
            stored: 5,
            rejected: 3,
            invalid: 0,
        }
    );

    let status = manager.buffer_status("AAPL");
    assert_eq!(status.size, 600);
    assert_eq!(status.live_count, 5);
    assert_eq!(status.preloaded_count, 595);
    assert_eq!(status.percentage, 100);
    assert!(status.is_preloaded);

    let latest = manager.latest("AAPL").unwrap();
    assert_eq!(latest.timestamp, et(1, 30, 10, 4));
    assert!(!latest.is_preloaded);

    let snapshot = manager.snapshot("AAPL");
    assert_eq!(snapshot.first().unwrap().timestamp, et(1, 28, 9, 35));
    assert!(snapshot.windows(2).all(|w| w[0].timestamp < w[1].timestamp));

    let stats = manager.stats();
    assert_eq!(stats.total_messages, 5);
    assert_eq!(stats.messages_per_symbol["AAPL"], 5);
    assert_eq!(stats.preloaded_symbols, vec!["AAPL".to_string()]);
}

#[tokio::test]
async fn regular_hours_bootstrap_drops_extended_bars() {
    let dir = tempfile::tempdir().unwrap();
    let bars = vec![
        RawPoint::new("MSFT", et(1, 29, 8, 0)),
        RawPoint::new("MSFT", et(1, 29, 9, 30)),
        RawPoint::new("MSFT", et(1, 29, 15, 59)),
        RawPoint::new("MSFT", et(1, 29, 16, 0)),
        RawPoint::new("MSFT", et(1, 1, 12, 0)),
    ];
    write_history(dir.path(), "MSFT", &bars);

    let manager = manager(100);
    let report = bootstrap_history(
        &JsonHistorySource::new(dir.path()),
        &manager,
        &["MSFT".to_string(), "NVDA".to_string()],
        HistoryFilter::RegularHours,
    )
    .await;

    assert_eq!(report.preloaded.len(), 1);
    assert_eq!(report.preloaded["MSFT"], 2);
    assert_eq!(report.filtered, 3);
    assert!(report.failed.is_empty());
    assert_eq!(manager.size("NVDA"), 0);
}

#[tokio::test]
async fn replayed_capture_with_mixed_timestamp_forms() {
    let dir = tempfile::tempdir().unwrap();
    let capture = dir.path().join("ticks.jsonl");
    let lines = [
        format!(
            r#"{{"sym":"AAPL","s":{},"c":1.0}}"#,
            et(1, 30, 10, 0).timestamp_millis()
        ),
        r#"{"symbol":"AAPL","timestamp":"2026-01-30T10:01:00-05:00","close":2.0}"#.to_string(),
        r#"{"symbol":"AAPL","timestamp":"2026-01-30 15:02:00","close":3.0}"#.to_string(),
        r#"{"symbol":"AAPL","timestamp":"2026-01-30T21:30:00Z","close":4.0}"#.to_string(),
        "{broken".to_string(),
        r#"{"symbol":"AAPL","timestamp":0}"#.to_string(),
    ];
    std::fs::write(&capture, lines.join("\n")).unwrap();

    let manager = manager(10);
    let mut feed = JsonLinesFeed::open(&capture, std::time::Duration::ZERO)
        .await
        .unwrap();
    let summary = run_ingestion(&mut feed, &manager, CancellationToken::new()).await;

    // Naive text is read as UTC: 15:02Z is 10:02 New York.
    assert_eq!(summary.stored, 3);
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.invalid, 2);

    let closes: Vec<_> = manager
        .snapshot("AAPL")
        .iter()
        .map(|p| p.close.unwrap())
        .collect();
    assert_eq!(closes, vec![1.0, 2.0, 3.0]);
}

#[test]
fn market_status_over_a_weekend() {
    let manager = manager(10);
    let saturday = et(1, 31, 12, 0);

    let status = manager.market_status(&saturday);
    assert_eq!(status.session, MarketSession::Closed);
    assert!(!status.is_open);
    assert_eq!(
        status.next_open.unwrap().with_timezone(&Utc),
        et(2, 2, 9, 30)
    );
}
