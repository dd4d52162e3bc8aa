//! Partition keys and time windows.
//!
//! Layout: `{namespace}/load_type={daily|retro}/{date=YYYY-MM-DD|year=YYYY}/{TICKER}.json`
//!
//! Keys are a pure function of (namespace, load type, ticker, partition label).
//! Re-running a load for the same ticker and window overwrites the same object,
//! which is what makes a pipeline re-run idempotent. Downstream readers depend
//! on this layout; changing it needs a migration.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Years accepted in a partition label (four digits, no leading zero), for
/// both `year=YYYY` and `date=YYYY-MM-DD`.
pub const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1000..=9999;

/// Validation errors from key and window construction. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("invalid partition label '{label}' for load type '{load_type}'")]
    InvalidPartitionLabel { load_type: LoadType, label: String },

    #[error("invalid ticker '{ticker}': {reason}")]
    InvalidTicker { ticker: String, reason: &'static str },

    #[error("invalid time window: {0}")]
    InvalidWindow(String),
}

/// Output partition classification. Decides which partition dimension a key uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadType {
    /// Incremental daily load, partitioned by run date.
    Daily,
    /// Historical backfill, partitioned by calendar year.
    Retro,
}

impl LoadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadType::Daily => "daily",
            LoadType::Retro => "retro",
        }
    }

    /// Name of the partition field under this load type (`date` or `year`).
    pub fn partition_field(&self) -> &'static str {
        match self {
            LoadType::Daily => "date",
            LoadType::Retro => "year",
        }
    }
}

impl fmt::Display for LoadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The value substituted into the partition segment of a key.
///
/// Serializes as a date string or a bare year integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartitionLabel {
    Date(NaiveDate),
    Year(i32),
}

impl PartitionLabel {
    /// The load type this label kind belongs to.
    pub fn load_type(&self) -> LoadType {
        match self {
            PartitionLabel::Date(_) => LoadType::Daily,
            PartitionLabel::Year(_) => LoadType::Retro,
        }
    }

    /// Parse a label from text: `YYYY-MM-DD` for daily, `YYYY` for retro.
    pub fn parse(load_type: LoadType, text: &str) -> Result<Self, KeyError> {
        let invalid = || KeyError::InvalidPartitionLabel {
            load_type,
            label: text.to_string(),
        };

        match load_type {
            LoadType::Daily => {
                let shape_ok = text.len() == 10
                    && text.bytes().enumerate().all(|(i, b)| match i {
                        4 | 7 => b == b'-',
                        _ => b.is_ascii_digit(),
                    });
                if !shape_ok {
                    return Err(invalid());
                }
                let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| invalid())?;
                if !YEAR_RANGE.contains(&date.year()) {
                    return Err(invalid());
                }
                Ok(PartitionLabel::Date(date))
            }
            LoadType::Retro => {
                if text.len() != 4 || !text.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                let year: i32 = text.parse().map_err(|_| invalid())?;
                if !YEAR_RANGE.contains(&year) {
                    return Err(invalid());
                }
                Ok(PartitionLabel::Year(year))
            }
        }
    }

    /// Check the label against a load type and render its key segment.
    fn segment(&self, load_type: LoadType) -> Result<String, KeyError> {
        match (load_type, self) {
            (LoadType::Daily, PartitionLabel::Date(d)) if YEAR_RANGE.contains(&d.year()) => {
                Ok(format!("date={}", d.format("%Y-%m-%d")))
            }
            (LoadType::Retro, PartitionLabel::Year(y)) if YEAR_RANGE.contains(y) => {
                Ok(format!("year={y}"))
            }
            _ => Err(KeyError::InvalidPartitionLabel {
                load_type,
                label: self.to_string(),
            }),
        }
    }
}

impl fmt::Display for PartitionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartitionLabel::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            PartitionLabel::Year(y) => write!(f, "{y}"),
        }
    }
}

/// A time range to fetch, plus the label it is stored under.
///
/// Invariant: `start <= end`, and the label lies inside the range
/// (a year label's range stays within that year).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TimeWindow {
    start: NaiveDate,
    end: NaiveDate,
    label: PartitionLabel,
}

impl TimeWindow {
    pub fn new(start: NaiveDate, end: NaiveDate, label: PartitionLabel) -> Result<Self, KeyError> {
        if start > end {
            return Err(KeyError::InvalidWindow(format!(
                "start {start} is after end {end}"
            )));
        }
        match label {
            PartitionLabel::Date(d) if d < start || d > end => {
                return Err(KeyError::InvalidWindow(format!(
                    "label {d} is outside {start}..{end}"
                )));
            }
            PartitionLabel::Year(y) if start.year() != y || end.year() != y => {
                return Err(KeyError::InvalidWindow(format!(
                    "{start}..{end} is not contained in year {y}"
                )));
            }
            _ => {}
        }
        Ok(Self { start, end, label })
    }

    /// A single calendar day.
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
            label: PartitionLabel::Date(date),
        }
    }

    /// `lookback_days` before `date` through `date`, stored under `date`.
    pub fn trailing(date: NaiveDate, lookback_days: u32) -> Result<Self, KeyError> {
        let start = date
            .checked_sub_signed(Duration::days(i64::from(lookback_days)))
            .ok_or_else(|| {
                KeyError::InvalidWindow(format!("{lookback_days} days before {date} is out of range"))
            })?;
        Ok(Self {
            start,
            end: date,
            label: PartitionLabel::Date(date),
        })
    }

    /// January 1st through December 31st of `year`, stored under `year`.
    pub fn year(year: i32) -> Result<Self, KeyError> {
        let invalid = || KeyError::InvalidPartitionLabel {
            load_type: LoadType::Retro,
            label: year.to_string(),
        };
        if !YEAR_RANGE.contains(&year) {
            return Err(invalid());
        }
        let start = NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(invalid)?;
        let end = NaiveDate::from_ymd_opt(year, 12, 31).ok_or_else(invalid)?;
        Ok(Self {
            start,
            end,
            label: PartitionLabel::Year(year),
        })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn label(&self) -> PartitionLabel {
        self.label
    }

    /// Number of calendar days covered, inclusive.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label {
            PartitionLabel::Year(y) => write!(f, "{y}"),
            PartitionLabel::Date(_) if self.start == self.end => write!(f, "{}", self.start),
            PartitionLabel::Date(_) => write!(f, "{}..{}", self.start, self.end),
        }
    }
}

/// Inclusive range of year windows for a backfill.
pub fn years(start_year: i32, end_year: i32) -> Result<Vec<TimeWindow>, KeyError> {
    if start_year > end_year {
        return Err(KeyError::InvalidWindow(format!(
            "start year {start_year} is after end year {end_year}"
        )));
    }
    (start_year..=end_year).map(TimeWindow::year).collect()
}

/// Reject tickers that would break the key layout or the request path.
///
/// Allowed: ASCII letters and digits plus `.`, `-`, `_`, `^`, `=`
/// (covers `BRK.B`, `BRK-B`, `^GSPC`, `EURUSD=X`).
pub fn validate_ticker(ticker: &str) -> Result<(), KeyError> {
    let reject = |reason| KeyError::InvalidTicker {
        ticker: ticker.to_string(),
        reason,
    };

    if ticker.is_empty() {
        return Err(reject("empty"));
    }
    if ticker.contains(['/', '\\']) {
        return Err(reject("contains a path separator"));
    }
    if ticker.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(reject("contains whitespace or control characters"));
    }
    if !ticker
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '^' | '='))
    {
        return Err(reject("contains a reserved character"));
    }
    if ticker.chars().all(|c| c == '.') {
        return Err(reject("is a relative path component"));
    }
    Ok(())
}

/// A deterministic object key locating one ticker's output for one window.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageKey(String);

impl StorageKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Builds storage keys under a fixed namespace (e.g. `tiingo/json`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBuilder {
    namespace: String,
}

impl KeyBuilder {
    pub fn new(namespace: impl Into<String>) -> Self {
        let namespace: String = namespace.into();
        Self {
            namespace: namespace.trim_matches('/').to_string(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Prefix shared by every key of one load type: `{namespace}/load_type={type}/`.
    pub fn load_type_prefix(&self, load_type: LoadType) -> String {
        if self.namespace.is_empty() {
            format!("load_type={load_type}/")
        } else {
            format!("{}/load_type={load_type}/", self.namespace)
        }
    }

    /// Map (load type, ticker, label) to its storage key.
    pub fn build_key(
        &self,
        load_type: LoadType,
        ticker: &str,
        label: PartitionLabel,
    ) -> Result<StorageKey, KeyError> {
        validate_ticker(ticker)?;
        let segment = label.segment(load_type)?;
        Ok(StorageKey(format!(
            "{}{segment}/{ticker}.json",
            self.load_type_prefix(load_type)
        )))
    }
}

impl Default for KeyBuilder {
    fn default() -> Self {
        Self::new("tiingo/json")
    }
}
