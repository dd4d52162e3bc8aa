//! Progress callbacks for a fan-out run.
//!
//! Callbacks may arrive from several worker threads at once, so
//! implementations must be `Sync`.

use crate::result::PipelineResult;
use crate::scheduler::ItemError;
use crate::work::WorkItem;
use priceload_core::StorageKey;
use tracing::{info, warn};

pub trait RunProgress: Send + Sync {
    /// Called when a work item starts.
    fn on_start(&self, item: &WorkItem, index: usize, total: usize);

    /// Called when a work item finishes, successfully or not.
    fn on_complete(
        &self,
        item: &WorkItem,
        index: usize,
        total: usize,
        outcome: &Result<StorageKey, ItemError>,
    );

    /// Called once after every work item has been accounted for.
    fn on_run_complete(&self, result: &PipelineResult);
}

/// Emits progress as tracing events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogProgress;

impl RunProgress for LogProgress {
    fn on_start(&self, item: &WorkItem, index: usize, total: usize) {
        info!("[{}/{}] {item}", index + 1, total);
    }

    fn on_complete(
        &self,
        item: &WorkItem,
        index: usize,
        total: usize,
        outcome: &Result<StorageKey, ItemError>,
    ) {
        match outcome {
            Ok(key) => info!("[{}/{}] OK: {item} -> {key}", index + 1, total),
            Err(e) => warn!("[{}/{}] FAIL: {item}: {e}", index + 1, total),
        }
    }

    fn on_run_complete(&self, result: &PipelineResult) {
        info!(
            "Run complete: {}/{} succeeded, {} failed",
            result.succeeded.len(),
            result.total(),
            result.failed.len()
        );
    }
}

/// Discards all progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl RunProgress for NoProgress {
    fn on_start(&self, _item: &WorkItem, _index: usize, _total: usize) {}

    fn on_complete(
        &self,
        _item: &WorkItem,
        _index: usize,
        _total: usize,
        _outcome: &Result<StorageKey, ItemError>,
    ) {
    }

    fn on_run_complete(&self, _result: &PipelineResult) {}
}
