//! Fan-out scheduler: expands a scope into work items and runs each one
//! through fetch → load.
//!
//! Failures are contained at the work-item boundary: an item that fails is
//! recorded and the run moves on. Every item is attempted exactly once;
//! retries happen only inside a single item's remote calls.
//!
//! With `workers > 1` items run on a private, bounded rayon pool. Each item's
//! fetch and load stay on one worker, and outcomes are collected by index, so
//! the result order is the same as a sequential run.

use crate::fetch::{FetchFailed, FetchTask};
use crate::load::{LoadError, LoadTask};
use crate::progress::{LogProgress, RunProgress};
use crate::result::{FailureStage, PipelineResult};
use crate::work::{expand, WorkItem};
use priceload_core::{
    ApiToken, KeyBuilder, KeyError, LoadType, ObjectStore, PriceProvider, RetryPolicy, StorageKey,
    TimeWindow,
};
use rayon::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::warn;

/// Why a single work item failed.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error(transparent)]
    InvalidKey(#[from] KeyError),

    #[error(transparent)]
    Fetch(#[from] FetchFailed),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("run cancelled before this item started")]
    Cancelled,
}

impl ItemError {
    pub fn stage(&self) -> FailureStage {
        match self {
            ItemError::InvalidKey(_) | ItemError::Load(LoadError::InvalidKey(_)) => {
                FailureStage::Validate
            }
            ItemError::Fetch(_) => FailureStage::Fetch,
            ItemError::Load(LoadError::LoadFailed { .. }) => FailureStage::Load,
            ItemError::Cancelled => FailureStage::Cancelled,
        }
    }
}

pub struct FanOutScheduler<'a> {
    fetch: FetchTask<'a>,
    load: LoadTask<'a>,
    workers: usize,
    progress: &'a dyn RunProgress,
}

impl<'a> FanOutScheduler<'a> {
    pub fn new(
        provider: &'a dyn PriceProvider,
        store: &'a dyn ObjectStore,
        keys: KeyBuilder,
        fetch_policy: RetryPolicy,
        store_policy: RetryPolicy,
    ) -> Self {
        Self {
            fetch: FetchTask::new(provider, fetch_policy),
            load: LoadTask::new(store, keys, store_policy),
            workers: 1,
            progress: &LogProgress,
        }
    }

    /// Maximum number of work items in flight. Values below 1 mean 1.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_progress(mut self, progress: &'a dyn RunProgress) -> Self {
        self.progress = progress;
        self
    }

    pub fn keys(&self) -> &KeyBuilder {
        self.load.keys()
    }

    /// Run every (ticker, window) pair. Always returns a result; inspect
    /// `failed` for partial success.
    pub fn run<S: AsRef<str>>(
        &self,
        tickers: &[S],
        windows: &[TimeWindow],
        load_type: LoadType,
        token: &ApiToken,
    ) -> PipelineResult {
        self.run_with_cancel(tickers, windows, load_type, token, None)
    }

    /// Like [`run`](Self::run), but once `cancel` is set no new item starts.
    /// Unstarted items are recorded as cancelled.
    pub fn run_with_cancel<S: AsRef<str>>(
        &self,
        tickers: &[S],
        windows: &[TimeWindow],
        load_type: LoadType,
        token: &ApiToken,
        cancel: Option<&AtomicBool>,
    ) -> PipelineResult {
        let items = expand(tickers, windows);
        let total = items.len();

        let outcomes: Vec<Result<StorageKey, ItemError>> = if self.workers <= 1 || total <= 1 {
            self.run_sequential(&items, load_type, token, cancel)
        } else {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(self.workers)
                .thread_name(|i| format!("priceload-worker-{i}"))
                .build()
            {
                Ok(pool) => pool.install(|| {
                    items
                        .par_iter()
                        .enumerate()
                        .map(|(i, item)| self.attempt(i, total, item, load_type, token, cancel))
                        .collect()
                }),
                Err(e) => {
                    warn!("failed to build worker pool ({e}), running sequentially");
                    self.run_sequential(&items, load_type, token, cancel)
                }
            }
        };

        let mut result = PipelineResult::default();
        for (item, outcome) in items.into_iter().zip(outcomes) {
            match outcome {
                Ok(key) => result.push_success(key),
                Err(e) => {
                    let stage = e.stage();
                    result.push_failure(item, stage, e.to_string());
                }
            }
        }

        let cancelled = result.failed_at(FailureStage::Cancelled).count();
        if cancelled > 0 {
            warn!("Run cancelled: {cancelled} work item(s) were not started");
        }

        self.progress.on_run_complete(&result);
        result
    }

    fn run_sequential(
        &self,
        items: &[WorkItem],
        load_type: LoadType,
        token: &ApiToken,
        cancel: Option<&AtomicBool>,
    ) -> Vec<Result<StorageKey, ItemError>> {
        let total = items.len();
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.attempt(i, total, item, load_type, token, cancel))
            .collect()
    }

    fn attempt(
        &self,
        index: usize,
        total: usize,
        item: &WorkItem,
        load_type: LoadType,
        token: &ApiToken,
        cancel: Option<&AtomicBool>,
    ) -> Result<StorageKey, ItemError> {
        if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
            return Err(ItemError::Cancelled);
        }

        self.progress.on_start(item, index, total);
        let outcome = self.run_item(item, load_type, token);
        self.progress.on_complete(item, index, total, &outcome);
        outcome
    }

    /// Validate → fetch → load for one item.
    fn run_item(
        &self,
        item: &WorkItem,
        load_type: LoadType,
        token: &ApiToken,
    ) -> Result<StorageKey, ItemError> {
        // Reject bad tickers and labels before spending a remote call.
        self.load.key_for(load_type, &item.ticker, &item.window)?;

        let payload = self.fetch.fetch(&item.ticker, &item.window, token)?;
        Ok(self.load.load(&item.ticker, &item.window, payload, load_type)?)
    }
}
