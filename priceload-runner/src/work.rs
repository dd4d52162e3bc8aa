//! Work items and fan-out expansion.
//!
//! The scope of a run is `tickers × windows`. Expansion flattens it into an
//! explicit sequence: tickers in input order, and for each ticker the windows
//! in chronological order. That sequence is the execution order and the order
//! of the run's result.

use priceload_core::TimeWindow;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// One (ticker, window) unit of fetch + load work.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct WorkItem {
    pub ticker: String,
    pub window: TimeWindow,
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ticker, self.window)
    }
}

/// Trim, drop blanks, and dedupe tickers, preserving first-seen order.
///
/// Applied where ticker lists enter a run (caller input, the stored list),
/// never inside [`expand`].
pub fn normalize_tickers<S: AsRef<str>>(tickers: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    tickers
        .iter()
        .map(|t| t.as_ref().trim())
        .filter(|t| !t.is_empty() && seen.insert(t.to_string()))
        .map(String::from)
        .collect()
}

/// Windows in chronological order (by start, then end). Stable, and nothing
/// is dropped: two windows with the same label are two work items writing
/// the same key, the later write winning.
pub fn sort_windows(windows: &[TimeWindow]) -> Vec<TimeWindow> {
    let mut sorted = windows.to_vec();
    sorted.sort_by_key(|w| (w.start(), w.end()));
    sorted
}

/// Cartesian product of tickers and windows, ticker-major.
///
/// Tickers are taken as given, so a blank or malformed ticker becomes work
/// items that fail validation. `expand(t, w).len() == t.len() * w.len()`.
pub fn expand<S: AsRef<str>>(tickers: &[S], windows: &[TimeWindow]) -> Vec<WorkItem> {
    let windows = sort_windows(windows);

    tickers
        .iter()
        .flat_map(|ticker| {
            windows.iter().map(move |window| WorkItem {
                ticker: ticker.as_ref().to_string(),
                window: *window,
            })
        })
        .collect()
}
