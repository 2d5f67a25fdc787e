//! Rolling Window Storage
//!
//! Bounded, insertion-ordered, per-symbol windows of recent points.
//!
//! # Design
//!
//! The store tracks:
//! - One ring buffer per symbol, all with the same capacity
//! - Live-message counters per symbol and in total
//! - Which symbols have received a preload
//!
//! Everything lives behind a single lock. Each operation holds it for its
//! whole duration, so readers never see a half-applied append or preload,
//! and aggregate reads (status, stats) are consistent with the window
//! contents they describe.

mod ring;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::num::NonZeroUsize;

use parking_lot::RwLock;
use serde::Serialize;

pub use ring::RingBuffer;

use crate::domain::streaming::{Point, Symbol};

/// Default window capacity.
pub const DEFAULT_MAX_POINTS: NonZeroUsize = match NonZeroUsize::new(600) {
    Some(n) => n,
    None => NonZeroUsize::MIN,
};

// =============================================================================
// Status Types
// =============================================================================

/// Fill level and provenance mix of one symbol's window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BufferStatus {
    /// Points currently stored.
    pub size: usize,
    /// Window capacity.
    pub max: usize,
    /// `size * 100 / max`, rounded down.
    pub percentage: u8,
    /// Whether the window is at capacity.
    pub is_full: bool,
    /// Whether the symbol has received a preload.
    pub is_preloaded: bool,
    /// Stored points that came from a preload.
    pub preloaded_count: usize,
    /// Stored points that came from the live feed.
    pub live_count: usize,
}

impl BufferStatus {
    fn empty(max: usize) -> Self {
        Self {
            size: 0,
            max,
            percentage: 0,
            is_full: false,
            is_preloaded: false,
            preloaded_count: 0,
            live_count: 0,
        }
    }
}

/// Aggregate usage statistics across all symbols.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    /// Live points stored since the last `clear_all`.
    pub total_messages: u64,
    /// Symbols with a window (possibly empty).
    pub active_symbols: usize,
    /// Live points stored per symbol.
    pub messages_per_symbol: BTreeMap<Symbol, u64>,
    /// Current window size per symbol.
    pub buffer_sizes: BTreeMap<Symbol, usize>,
    /// Symbols that have received a preload.
    pub preloaded_symbols: Vec<Symbol>,
}

// =============================================================================
// Store State
// =============================================================================

#[derive(Debug, Default)]
struct StoreState {
    windows: HashMap<Symbol, RingBuffer<Point>>,
    message_counts: HashMap<Symbol, u64>,
    total_messages: u64,
    preloaded: BTreeSet<Symbol>,
}

impl StoreState {
    fn window_mut(&mut self, symbol: &str, capacity: NonZeroUsize) -> &mut RingBuffer<Point> {
        if !self.message_counts.contains_key(symbol) {
            self.message_counts.insert(symbol.to_string(), 0);
        }
        self.windows
            .entry(symbol.to_string())
            .or_insert_with(|| RingBuffer::new(capacity))
    }
}

// =============================================================================
// Rolling Window Store
// =============================================================================

/// Thread-safe per-symbol rolling windows.
///
/// # Example
///
/// ```rust
/// use chrono::Utc;
/// use std::num::NonZeroUsize;
/// use stream_window::domain::streaming::Point;
/// use stream_window::domain::window::RollingWindowStore;
///
/// let store = RollingWindowStore::new(NonZeroUsize::new(2).unwrap());
///
/// store.append("AAPL", Point::new("AAPL", Utc::now()));
/// store.append("AAPL", Point::new("AAPL", Utc::now()));
/// store.append("AAPL", Point::new("AAPL", Utc::now()));
///
/// assert_eq!(store.size("AAPL"), 2);
/// assert!(store.is_full("AAPL"));
/// assert!(store.snapshot("MSFT").is_empty());
/// ```
#[derive(Debug)]
pub struct RollingWindowStore {
    max_points: NonZeroUsize,
    state: RwLock<StoreState>,
}

impl Default for RollingWindowStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_POINTS)
    }
}

impl RollingWindowStore {
    /// Create an empty store with the given window capacity.
    #[must_use]
    pub fn new(max_points: NonZeroUsize) -> Self {
        Self {
            max_points,
            state: RwLock::new(StoreState::default()),
        }
    }

    /// Window capacity shared by every symbol.
    #[must_use]
    pub const fn max_points(&self) -> usize {
        self.max_points.get()
    }

    /// Bulk-load historical points, oldest first.
    ///
    /// Every point is tagged as preloaded and pushed in input order,
    /// evicting as needed. Calling this twice for the same symbol appends
    /// twice; clear the symbol first to reload. Live counters are not
    /// touched. Returns the number of points pushed.
    pub fn preload(&self, symbol: &str, points: impl IntoIterator<Item = Point>) -> usize {
        let mut state = self.state.write();
        let window = state.window_mut(symbol, self.max_points);

        let mut pushed = 0;
        for mut point in points {
            point.is_preloaded = true;
            window.push(point);
            pushed += 1;
        }

        state.preloaded.insert(symbol.to_string());
        pushed
    }

    /// Append one live point, evicting the oldest at capacity.
    ///
    /// Returns `true` if this call created the symbol's window.
    pub fn append(&self, symbol: &str, mut point: Point) -> bool {
        point.is_preloaded = false;

        let mut state = self.state.write();
        let created = !state.windows.contains_key(symbol);
        state.window_mut(symbol, self.max_points).push(point);

        if let Some(count) = state.message_counts.get_mut(symbol) {
            *count += 1;
        }
        state.total_messages += 1;
        created
    }

    /// Copy of the window, oldest first. Empty for unknown symbols.
    #[must_use]
    pub fn snapshot(&self, symbol: &str) -> Vec<Point> {
        self.state
            .read()
            .windows
            .get(symbol)
            .map(RingBuffer::to_vec)
            .unwrap_or_default()
    }

    /// Most recently stored point.
    #[must_use]
    pub fn latest(&self, symbol: &str) -> Option<Point> {
        self.state
            .read()
            .windows
            .get(symbol)
            .and_then(|window| window.last().cloned())
    }

    /// Number of stored points.
    #[must_use]
    pub fn size(&self, symbol: &str) -> usize {
        self.state
            .read()
            .windows
            .get(symbol)
            .map_or(0, RingBuffer::len)
    }

    /// Whether the window is at capacity.
    #[must_use]
    pub fn is_full(&self, symbol: &str) -> bool {
        self.size(symbol) == self.max_points()
    }

    /// Fill level and provenance mix, computed under one lock acquisition.
    #[must_use]
    pub fn buffer_status(&self, symbol: &str) -> BufferStatus {
        let max = self.max_points();
        let state = self.state.read();

        let Some(window) = state.windows.get(symbol) else {
            return BufferStatus::empty(max);
        };

        let size = window.len();
        let preloaded_count = window.iter().filter(|p| p.is_preloaded).count();

        BufferStatus {
            size,
            max,
            percentage: percentage(size, max),
            is_full: size == max,
            is_preloaded: state.preloaded.contains(symbol),
            preloaded_count,
            live_count: size - preloaded_count,
        }
    }

    /// Empty one symbol's window and forget its preload. Counters are kept.
    pub fn clear(&self, symbol: &str) {
        let mut state = self.state.write();
        if let Some(window) = state.windows.get_mut(symbol) {
            window.clear();
        }
        state.preloaded.remove(symbol);
    }

    /// Drop every window, counter, and preload record.
    pub fn clear_all(&self) {
        let mut state = self.state.write();
        state.windows.clear();
        state.message_counts.clear();
        state.preloaded.clear();
        state.total_messages = 0;
    }

    /// Known symbols in ascending order.
    #[must_use]
    pub fn symbols(&self) -> Vec<Symbol> {
        let state = self.state.read();
        let mut symbols: Vec<_> = state.windows.keys().cloned().collect();
        symbols.sort_unstable();
        symbols
    }

    /// Aggregate statistics, computed under one lock acquisition.
    #[must_use]
    pub fn stats(&self) -> StreamStats {
        let state = self.state.read();
        StreamStats {
            total_messages: state.total_messages,
            active_symbols: state.windows.len(),
            messages_per_symbol: state
                .message_counts
                .iter()
                .map(|(symbol, count)| (symbol.clone(), *count))
                .collect(),
            buffer_sizes: state
                .windows
                .iter()
                .map(|(symbol, window)| (symbol.clone(), window.len()))
                .collect(),
            preloaded_symbols: state.preloaded.iter().cloned().collect(),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn percentage(size: usize, max: usize) -> u8 {
    // size <= max, so the quotient is at most 100.
    (size.saturating_mul(100) / max.max(1)).min(100) as u8
}

// =============================================================================
// Tests
// =============================================================================
