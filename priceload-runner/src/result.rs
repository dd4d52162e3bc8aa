//! Aggregate outcome of one pipeline run.

use crate::work::WorkItem;
use priceload_core::StorageKey;
use serde::Serialize;

/// Where a work item stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// Key validation rejected the ticker or label; nothing was fetched.
    Validate,
    Fetch,
    Load,
    /// The run was aborted before this item started.
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedItem {
    pub item: WorkItem,
    pub stage: FailureStage,
    pub reason: String,
}

/// Overall classification of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Success,
    PartialSuccess,
    TotalFailure,
    /// No work items were scheduled.
    Empty,
}

/// Succeeded keys and failed items, both in execution order.
///
/// `succeeded.len() + failed.len()` equals the number of work items.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineResult {
    pub succeeded: Vec<StorageKey>,
    pub failed: Vec<FailedItem>,
}

impl PipelineResult {
    pub fn push_success(&mut self, key: StorageKey) {
        self.succeeded.push(key);
    }

    pub fn push_failure(&mut self, item: WorkItem, stage: FailureStage, reason: impl Into<String>) {
        self.failed.push(FailedItem {
            item,
            stage,
            reason: reason.into(),
        });
    }

    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn outcome(&self) -> RunOutcome {
        match (self.succeeded.is_empty(), self.failed.is_empty()) {
            (true, true) => RunOutcome::Empty,
            (false, true) => RunOutcome::Success,
            (true, false) => RunOutcome::TotalFailure,
            (false, false) => RunOutcome::PartialSuccess,
        }
    }

    /// Failures at a given stage.
    pub fn failed_at(&self, stage: FailureStage) -> impl Iterator<Item = &FailedItem> {
        self.failed.iter().filter(move |f| f.stage == stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use priceload_core::{KeyBuilder, LoadType, TimeWindow};

    fn item(ticker: &str) -> WorkItem {
        WorkItem {
            ticker: ticker.into(),
            window: TimeWindow::year(2024).unwrap(),
        }
    }

    fn key(ticker: &str) -> StorageKey {
        KeyBuilder::default()
            .build_key(LoadType::Retro, ticker, item(ticker).window.label())
            .unwrap()
    }

    #[test]
    fn outcome_classification() {
        let mut r = PipelineResult::default();
        assert_eq!(r.outcome(), RunOutcome::Empty);

        r.push_failure(item("A"), FailureStage::Fetch, "HTTP 500");
        assert_eq!(r.outcome(), RunOutcome::TotalFailure);

        r.push_success(key("B"));
        assert_eq!(r.outcome(), RunOutcome::PartialSuccess);
        assert_eq!(r.total(), 2);
        assert!(!r.all_succeeded());

        let mut ok = PipelineResult::default();
        ok.push_success(key("C"));
        assert_eq!(ok.outcome(), RunOutcome::Success);
    }

    #[test]
    fn report_json_shape() {
        let mut r = PipelineResult::default();
        r.push_success(key("AAPL"));
        r.push_failure(item("TSLA"), FailureStage::Load, "disk full");

        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(
            json["succeeded"][0],
            "tiingo/json/load_type=retro/year=2024/AAPL.json"
        );
        assert_eq!(json["failed"][0]["item"]["ticker"], "TSLA");
        assert_eq!(json["failed"][0]["item"]["window"]["label"], 2024);
        assert_eq!(json["failed"][0]["stage"], "load");
        assert_eq!(json["failed"][0]["reason"], "disk full");
    }

    #[test]
    fn failed_at_filters_by_stage() {
        let mut r = PipelineResult::default();
        r.push_failure(item("A"), FailureStage::Fetch, "x");
        r.push_failure(item("B"), FailureStage::Cancelled, "y");
        r.push_failure(item("C"), FailureStage::Fetch, "z");
        let fetch: Vec<_> = r.failed_at(FailureStage::Fetch).map(|f| f.item.ticker.as_str()).collect();
        assert_eq!(fetch, vec!["A", "C"]);
    }
}
