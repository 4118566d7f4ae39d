//! Barwalk CLI: run, sweep, and summarize commands.
//!
//! Commands:
//! - `run`: execute one run from a TOML config file and/or flags
//! - `sweep`: run a parameter grid over one base config in parallel
//! - `summarize`: rank the recorded runs into `summary.csv`
//!
//! Logging goes through `tracing`; set `RUST_LOG` (e.g. `RUST_LOG=debug`) to
//! see per-fill events.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use barwalk_core::StrategyParams;
use barwalk_runner::config::{CostSection, DataSection, RunSection, StrategySection};
use barwalk_runner::summarize::DEFAULT_TOP;
use barwalk_runner::{
    run_batch, run_from_config, summarize, ArtifactSink, FsSink, ParamGrid, RunConfig, SortKey,
};

#[derive(Parser)]
#[command(
    name = "barwalk",
    about = "Barwalk CLI: walk-forward bar simulator for single-instrument strategies"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute one run and record its artifacts.
    Run(RunArgs),
    /// Run every point of a parameter grid in parallel.
    Sweep {
        #[command(flatten)]
        run: RunArgs,

        /// Grid axis as key=v1,v2,... (repeatable).
        #[arg(long = "grid", required = true)]
        grid: Vec<String>,
    },
    /// Rank recorded runs by a metric and write summary.csv.
    Summarize {
        /// Artifact root holding summary.jsonl.
        #[arg(long, default_value = "reports")]
        root: PathBuf,

        /// Ranking metric: sharpe, pnl, mdd, trades, run_ts.
        #[arg(long, default_value = "sharpe")]
        sort_by: String,

        /// Number of rows kept.
        #[arg(long, default_value_t = DEFAULT_TOP)]
        top: usize,
    },
}

/// Inputs of a run. Flags override the config file when both are given.
#[derive(Args)]
struct RunArgs {
    /// Path to a TOML run config.
    #[arg(long)]
    config: Option<PathBuf>,

    /// CSV bar file (timestamp,open,high,low,close,volume).
    #[arg(long, conflicts_with = "synthetic")]
    bars: Option<PathBuf>,

    /// Generate this many synthetic bars instead of reading a file.
    #[arg(long)]
    synthetic: Option<usize>,

    /// Seed for synthetic bars.
    #[arg(long)]
    seed: Option<u64>,

    /// Strategy name: buy_and_hold, sma_cross, align_macd, bucketed_allocation,
    /// sma_macd_atr.
    #[arg(long)]
    strategy: Option<String>,

    /// Strategy parameter as key=value (repeatable). Values parse as bool,
    /// integer, float, else string.
    #[arg(long = "param")]
    params: Vec<String>,

    /// Instrument symbol.
    #[arg(long)]
    symbol: Option<String>,

    /// Bar resolution: 1m, 5m, 15m, 30m, 1h, 4h, 1d.
    #[arg(long)]
    resolution: Option<String>,

    /// Window start (YYYY-MM-DD, inclusive).
    #[arg(long)]
    start: Option<String>,

    /// Window end (YYYY-MM-DD, exclusive).
    #[arg(long)]
    end: Option<String>,

    /// Initial cash.
    #[arg(long)]
    start_cash: Option<f64>,

    /// Fee in basis points of notional.
    #[arg(long)]
    fee_bps: Option<f64>,

    /// Slippage in basis points of the fill price.
    #[arg(long)]
    slip_bps: Option<f64>,

    /// Maximum long weight in (0, 1].
    #[arg(long)]
    weight_cap: Option<f64>,

    /// Keep an open position at the end instead of selling at the last close.
    #[arg(long, default_value_t = false)]
    no_liquidate: bool,

    /// Experiment directory for run artifacts and summary.jsonl.
    #[arg(long, default_value = "reports")]
    artifact_root: PathBuf,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => run_cmd(args),
        Commands::Sweep { run, grid } => sweep_cmd(run, grid),
        Commands::Summarize {
            root,
            sort_by,
            top,
        } => summarize_cmd(root, &sort_by, top),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Err(e) = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init()
    {
        eprintln!("failed to install log subscriber: {e}");
    }
}

fn run_cmd(args: RunArgs) -> Result<()> {
    let sink = FsSink::new(&args.artifact_root);
    let config = build_config(&args)?;

    let outcome = run_from_config(&config)?;
    println!("{}", outcome.one_line());

    if let Some(dir) = sink.record(&config, &outcome)? {
        println!("Artifacts saved to: {}", dir.display());
    }
    Ok(())
}

fn sweep_cmd(args: RunArgs, axes: Vec<String>) -> Result<()> {
    let base = build_config(&args)?;
    let mut grid = ParamGrid::new();
    for axis in &axes {
        let (key, values) = ParamGrid::parse_axis(axis)?;
        grid = grid.axis(key, values);
    }
    let configs = grid.generate_configs(&base);
    info!(points = configs.len(), "starting sweep");

    let sink = FsSink::new(&args.artifact_root);
    let items = run_batch(&configs, &sink);

    let mut failed = 0;
    for item in &items {
        match &item.outcome {
            Ok(outcome) => println!("{}", outcome.one_line()),
            Err(e) => {
                failed += 1;
                eprintln!("[run_id={}] failed: {e}", item.run_id);
            }
        }
    }
    println!(
        "{} runs, {} failed. Index: {}",
        items.len(),
        failed,
        sink.index_path().display()
    );
    if failed == items.len() {
        bail!("every run in the sweep failed");
    }
    Ok(())
}

fn summarize_cmd(root: PathBuf, sort_by: &str, top: usize) -> Result<()> {
    let key: SortKey = sort_by.parse()?;
    match summarize(&root, key, top)? {
        Some(report) => println!("wrote: {} (rows={})", report.output.display(), report.rows),
        None => warn!(root = %root.display(), "nothing to summarize"),
    }
    Ok(())
}

/// Merge the config file (if any) with command-line overrides.
fn build_config(args: &RunArgs) -> Result<RunConfig> {
    let mut config = match &args.config {
        Some(path) => RunConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => {
            let Some(strategy) = args.strategy.as_deref() else {
                bail!("--strategy is required without --config");
            };
            if args.bars.is_none() && args.synthetic.is_none() {
                bail!("one of --bars or --synthetic is required without --config");
            }
            RunConfig {
                run: RunSection::default(),
                costs: CostSection::default(),
                strategy: StrategySection {
                    name: strategy.to_string(),
                    params: StrategyParams::new(),
                },
                data: DataSection::default(),
            }
        }
    };

    if let Some(strategy) = &args.strategy {
        config.strategy.name = strategy.clone();
    }
    if let Some(bars) = &args.bars {
        config.data.bars = Some(bars.clone());
        config.data.synthetic = None;
    }
    if let Some(n) = args.synthetic {
        config.data.synthetic = Some(n);
        config.data.bars = None;
    }
    if let Some(seed) = args.seed {
        config.data.seed = seed;
    }
    if !args.params.is_empty() {
        let overrides = StrategyParams::from_pairs(&args.params)?;
        config.strategy.params = config.strategy.params.clone().merged(&overrides);
    }
    if let Some(symbol) = &args.symbol {
        config.run.symbol = symbol.clone();
    }
    if let Some(resolution) = &args.resolution {
        config.run.resolution = resolution.clone();
    }
    if let Some(start) = &args.start {
        config.run.start = Some(parse_date(start)?);
    }
    if let Some(end) = &args.end {
        config.run.end = Some(parse_date(end)?);
    }
    if let Some(cash) = args.start_cash {
        config.run.initial_cash = cash;
    }
    if let Some(fee) = args.fee_bps {
        config.costs.fee_bps = fee;
    }
    if let Some(slip) = args.slip_bps {
        config.costs.slippage_bps = slip;
    }
    if let Some(cap) = args.weight_cap {
        config.run.weight_cap = cap;
    }
    if args.no_liquidate {
        config.run.liquidate_on_end = false;
    }

    config.validate()?;
    Ok(config)
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}', expected YYYY-MM-DD"))
}
