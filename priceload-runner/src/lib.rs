//! priceload runner: partitioned fan-out ingestion.
//!
//! This crate builds on `priceload-core` to provide:
//! - Pipeline configuration (TOML)
//! - Work-item expansion (tickers × windows)
//! - Fetch and load tasks with independent retry policies
//! - The fan-out scheduler with failure isolation and an optional worker pool
//! - Daily and backfill flows

pub mod config;
pub mod fetch;
pub mod flows;
pub mod load;
pub mod progress;
pub mod result;
pub mod scheduler;
pub mod work;

pub use config::{ConfigError, PipelineConfig};
pub use fetch::{FetchFailed, FetchTask};
pub use flows::{FlowError, Pipeline, Plan, PlannedItem, Scope};
pub use load::{LoadError, LoadTask};
pub use progress::{LogProgress, NoProgress, RunProgress};
pub use result::{FailedItem, FailureStage, PipelineResult, RunOutcome};
pub use scheduler::{FanOutScheduler, ItemError};
pub use work::{expand, WorkItem};
