//! priceload CLI: daily and backfill price loads into the partitioned store.
//!
//! Commands:
//! - `daily`: fetch the trailing window for every ticker, store under `date=YYYY-MM-DD`
//! - `backfill`: fetch whole years for every ticker, store under `year=YYYY`
//!
//! Both accept `--plan` to print the work items and keys without fetching.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use priceload_core::secrets::EnvSecretProvider;
use priceload_core::store::FsObjectStore;
use priceload_core::TiingoProvider;
use priceload_runner::{Pipeline, PipelineConfig, PipelineResult, Plan, RunOutcome, Scope};
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "priceload",
    version,
    about = "Partitioned fan-out ingestion of daily price data"
)]
struct Cli {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Incremental daily load, partitioned by run date.
    Daily {
        /// Run date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<String>,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Historical backfill, one file per ticker per year.
    Backfill {
        /// First year to load (inclusive).
        #[arg(long)]
        start_year: i32,

        /// Last year to load (inclusive).
        #[arg(long)]
        end_year: i32,

        #[command(flatten)]
        common: CommonArgs,
    },
    /// Print the effective configuration as TOML.
    PrintConfig,
}

#[derive(Args)]
struct CommonArgs {
    /// Tickers to load (e.g. AAPL TSLA). Defaults to the ticker list in the store.
    #[arg(long, num_args = 1.., value_delimiter = ',')]
    tickers: Option<Vec<String>>,

    /// Store root directory (overrides config).
    #[arg(long)]
    root: Option<PathBuf>,

    /// Work items in flight at once (overrides config).
    #[arg(long)]
    workers: Option<usize>,

    /// Write the run result as JSON to this path.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Print the planned work items and keys, then exit without fetching.
    #[arg(long, default_value_t = false)]
    plan: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };

    match cli.command {
        Commands::Daily { date, common } => {
            let date = date
                .as_deref()
                .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
                .transpose()
                .context("--date must be YYYY-MM-DD")?
                .unwrap_or_else(|| chrono::Local::now().date_naive());
            run_scope(&mut config, Scope::Daily { date }, common)
        }
        Commands::Backfill {
            start_year,
            end_year,
            common,
        } => run_scope(
            &mut config,
            Scope::Backfill {
                start_year,
                end_year,
            },
            common,
        ),
        Commands::PrintConfig => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn run_scope(config: &mut PipelineConfig, scope: Scope, common: CommonArgs) -> Result<()> {
    if let Some(root) = common.root {
        config.store.root = root;
    }
    if let Some(workers) = common.workers {
        config.scheduler.workers = workers;
    }
    config.validate()?;
    debug!(?config, "effective config");

    let provider = TiingoProvider::new(&config.api.base_url, config.http_timeout())?;
    let store = FsObjectStore::new(&config.store.root, &config.store.bucket);
    let secrets = EnvSecretProvider::new(&config.api.token_env);
    let pipeline = Pipeline::new(config, &provider, &store, &secrets);

    if common.plan {
        let plan = pipeline.plan(scope, common.tickers)?;
        print_plan(&plan);
        if let Some(path) = &common.report {
            write_json(path, &plan)?;
        }
        return Ok(());
    }

    let result = pipeline.run(scope, common.tickers, None)?;
    print_summary(&result);

    if let Some(path) = &common.report {
        write_json(path, &result)?;
        println!("Report written to {}", path.display());
    }

    if !result.all_succeeded() {
        std::process::exit(1);
    }
    Ok(())
}

fn print_plan(plan: &Plan) {
    println!(
        "Plan ({}): {} tickers x {} windows = {} work items",
        plan.load_type,
        plan.tickers.len(),
        plan.windows.len(),
        plan.total()
    );
    for planned in &plan.items {
        match (&planned.key, &planned.error) {
            (Some(key), _) => println!("  {:<24} {key}", planned.item.to_string()),
            (None, Some(err)) => println!("  {:<24} INVALID: {err}", planned.item.to_string()),
            (None, None) => println!("  {}", planned.item),
        }
    }
}

fn print_summary(result: &PipelineResult) {
    let label = match result.outcome() {
        RunOutcome::Success => "success",
        RunOutcome::PartialSuccess => "partial success",
        RunOutcome::TotalFailure => "total failure",
        RunOutcome::Empty => "nothing to do",
    };
    println!(
        "\n{label}: {}/{} succeeded, {} failed",
        result.succeeded.len(),
        result.total(),
        result.failed.len()
    );
    for failed in &result.failed {
        eprintln!("  FAIL [{:?}] {}: {}", failed.stage, failed.item, failed.reason);
    }
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}
