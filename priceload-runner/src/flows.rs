//! The two canonical runs: the incremental daily load and the yearly backfill.
//!
//! A flow acquires credentials, resolves the ticker list (given, or read from
//! the store), builds the time windows for its scope, and hands everything to
//! the [`FanOutScheduler`].

use crate::config::PipelineConfig;
use crate::progress::{LogProgress, RunProgress};
use crate::result::PipelineResult;
use crate::scheduler::FanOutScheduler;
use crate::work::{expand, normalize_tickers, sort_windows, WorkItem};
use chrono::NaiveDate;
use priceload_core::data::{load_tickers, TickerListError};
use priceload_core::partition::years;
use priceload_core::{
    KeyError, LoadType, ObjectStore, PriceProvider, SecretError, SecretProvider, StorageKey,
    TimeWindow,
};
use serde::Serialize;
use std::sync::atomic::AtomicBool;
use thiserror::Error;
use tracing::info;

/// Run-level failures: nothing could be scheduled.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("credentials unavailable: {0}")]
    Secret(#[from] SecretError),

    #[error(transparent)]
    Tickers(#[from] TickerListError),

    #[error("no tickers to process")]
    NoTickers,

    #[error(transparent)]
    Window(#[from] KeyError),
}

/// What a run covers in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scope {
    /// Trailing window ending on `date`, stored under `date`.
    Daily { date: NaiveDate },
    /// One window per year, inclusive on both ends.
    Backfill { start_year: i32, end_year: i32 },
}

impl Scope {
    pub fn load_type(&self) -> LoadType {
        match self {
            Scope::Daily { .. } => LoadType::Daily,
            Scope::Backfill { .. } => LoadType::Retro,
        }
    }

    pub fn windows(&self, config: &PipelineConfig) -> Result<Vec<TimeWindow>, KeyError> {
        match *self {
            Scope::Daily { date } => Ok(vec![TimeWindow::trailing(date, config.daily.lookback_days)?]),
            Scope::Backfill {
                start_year,
                end_year,
            } => years(start_year, end_year),
        }
    }
}

/// One planned work item and the key it would be written to.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedItem {
    pub item: WorkItem,
    pub key: Option<StorageKey>,
    /// Set when the key cannot be built; the item would fail validation.
    pub error: Option<String>,
}

/// The expansion of a scope, without any fetch or write.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    pub scope: Scope,
    pub load_type: LoadType,
    pub tickers: Vec<String>,
    pub windows: Vec<TimeWindow>,
    pub items: Vec<PlannedItem>,
}

impl Plan {
    pub fn total(&self) -> usize {
        self.items.len()
    }
}

pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    provider: &'a dyn PriceProvider,
    store: &'a dyn ObjectStore,
    secrets: &'a dyn SecretProvider,
    progress: &'a dyn RunProgress,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        provider: &'a dyn PriceProvider,
        store: &'a dyn ObjectStore,
        secrets: &'a dyn SecretProvider,
    ) -> Self {
        Self {
            config,
            provider,
            store,
            secrets,
            progress: &LogProgress,
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn RunProgress) -> Self {
        self.progress = progress;
        self
    }

    /// Incremental daily load for `date`.
    pub fn daily(
        &self,
        date: NaiveDate,
        tickers: Option<Vec<String>>,
    ) -> Result<PipelineResult, FlowError> {
        self.run(Scope::Daily { date }, tickers, None)
    }

    /// Year-partitioned backfill over `start_year..=end_year`.
    pub fn backfill(
        &self,
        start_year: i32,
        end_year: i32,
        tickers: Option<Vec<String>>,
    ) -> Result<PipelineResult, FlowError> {
        self.run(
            Scope::Backfill {
                start_year,
                end_year,
            },
            tickers,
            None,
        )
    }

    /// Run a scope. Per-item failures are in the returned result; only
    /// failures that prevent scheduling anything are errors.
    pub fn run(
        &self,
        scope: Scope,
        tickers: Option<Vec<String>>,
        cancel: Option<&AtomicBool>,
    ) -> Result<PipelineResult, FlowError> {
        let load_type = scope.load_type();
        info!("{}", "=".repeat(60));
        match scope {
            Scope::Daily { date } => info!("Starting daily price load for {date}"),
            Scope::Backfill {
                start_year,
                end_year,
            } => info!("Starting historical backfill: years {start_year} to {end_year}"),
        }
        info!("{}", "=".repeat(60));

        // Validate the scope before touching credentials or the network.
        let windows = scope.windows(self.config)?;

        info!("Loading API token...");
        let token = self.secrets.api_token()?;

        let tickers = self.resolve_tickers(tickers)?;
        info!(
            "Fan-out plan: {} tickers x {} windows = {} work items",
            tickers.len(),
            windows.len(),
            tickers.len() * windows.len()
        );

        let scheduler = FanOutScheduler::new(
            self.provider,
            self.store,
            self.config.key_builder(),
            self.config.fetch_policy(),
            self.config.store_policy(),
        )
        .with_workers(self.config.scheduler.workers)
        .with_progress(self.progress);

        let result = scheduler.run_with_cancel(&tickers, &windows, load_type, &token, cancel);

        info!("{}", "=".repeat(60));
        info!(
            "Uploaded {} of {} files ({} failed)",
            result.succeeded.len(),
            result.total(),
            result.failed.len()
        );
        info!("Tickers processed: {}", tickers.join(", "));
        info!(
            "Data location: {}/{}",
            self.store.location(),
            scheduler.keys().load_type_prefix(load_type)
        );
        info!("{}", "=".repeat(60));

        Ok(result)
    }

    /// Expand a scope into work items and keys without fetching or writing.
    /// Reads the ticker list from the store when none is given.
    pub fn plan(&self, scope: Scope, tickers: Option<Vec<String>>) -> Result<Plan, FlowError> {
        let windows = scope.windows(self.config)?;
        let tickers = self.resolve_tickers(tickers)?;
        let keys = self.config.key_builder();
        let load_type = scope.load_type();

        let items = expand(&tickers, &windows)
            .into_iter()
            .map(|item| match keys.build_key(load_type, &item.ticker, item.window.label()) {
                Ok(key) => PlannedItem {
                    item,
                    key: Some(key),
                    error: None,
                },
                Err(e) => PlannedItem {
                    item,
                    key: None,
                    error: Some(e.to_string()),
                },
            })
            .collect();

        Ok(Plan {
            scope,
            load_type,
            tickers,
            windows: sort_windows(&windows),
            items,
        })
    }

    /// Caller-supplied tickers win; otherwise read the list from the store.
    fn resolve_tickers(&self, tickers: Option<Vec<String>>) -> Result<Vec<String>, FlowError> {
        let tickers = match tickers {
            Some(given) => {
                let given = normalize_tickers(&given);
                info!("Using provided tickers: {}", given.join(", "));
                given
            }
            None => {
                info!("No tickers provided, reading the ticker list...");
                load_tickers(
                    self.store,
                    &self.config.store.tickers_key,
                    &self.config.store_policy(),
                )?
            }
        };

        if tickers.is_empty() {
            return Err(FlowError::NoTickers);
        }
        Ok(tickers)
    }
}
