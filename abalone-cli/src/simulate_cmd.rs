//! Simulate command - play every configured matchup concurrently
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: build_config(), write_report(), print_summary()
//! - Level 3: load_strategies()
//! - Level 4: formatting utilities

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::Args;

use abalone_core::{Heuristics, Layout, SearchConfig};
use abalone_tournament::{
    run_simulation, writable_report_path, SimulationConfig, SimulationReport, DEFAULT_TABLE_DIR,
    DEFAULT_TIME_LIMIT_MS, DEFAULT_TURN_LIMIT,
};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct SimulateArgs {
    /// Starting layouts (standard, belgian-daisy, german-daisy)
    #[arg(long, value_delimiter = ',', default_values_t = Layout::ALL.to_vec())]
    pub layouts: Vec<Layout>,

    /// Turns each side may take
    #[arg(long, value_delimiter = ',', default_values_t = vec![DEFAULT_TURN_LIMIT])]
    pub turn_limits: Vec<u32>,

    /// Thinking time per move in milliseconds
    #[arg(long, value_delimiter = ',', default_values_t = vec![DEFAULT_TIME_LIMIT_MS])]
    pub time_limits: Vec<u64>,

    /// Stock strategies to use (material, centrist, phalanx, pusher); all when omitted
    #[arg(long, value_delimiter = ',')]
    pub strategies: Vec<String>,

    /// Strategy JSON files, added after the named strategies
    #[arg(long, value_name = "FILE", value_delimiter = ',')]
    pub strategy_files: Vec<PathBuf>,

    /// Directory for transposition table files
    #[arg(long, value_name = "DIR", default_value = DEFAULT_TABLE_DIR)]
    pub tt_dir: PathBuf,

    /// Maximum entries kept per table (unbounded when omitted)
    #[arg(long)]
    pub table_capacity: Option<usize>,

    /// Worker threads (one per core when omitted)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Deepest search iteration in plies
    #[arg(long, default_value = "64")]
    pub max_depth: u32,

    /// Tab-separated results file; a numbered name is used if it is not writable
    #[arg(long, value_name = "FILE", default_value = "game_results.tsv")]
    pub output: PathBuf,

    /// Also write the report as JSON
    #[arg(long, value_name = "FILE")]
    pub json: Option<PathBuf>,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run simulate command
///
/// 1. Build the configuration product
/// 2. Play every game on the worker pool
/// 3. Write the report and print standings
pub fn run(args: SimulateArgs) -> Result<()> {
    let config = build_config(&args)?;

    tracing::info!(
        "Simulating {} games: {} layouts, {} strategies, turn limits {:?}, time limits {:?} ms",
        config.matchups().len(),
        config.layouts.len(),
        config.strategies.len(),
        config.turn_limits,
        config.time_limits_ms
    );

    let report = run_simulation(&config)?;

    write_report(&report, &args)?;
    print_summary(&report);

    if !report.failures.is_empty() {
        bail!("{} of {} games failed", report.failures.len(), report.failures.len() + report.records.len());
    }
    Ok(())
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn build_config(args: &SimulateArgs) -> Result<SimulationConfig> {
    let strategies = load_strategies(&args.strategies, &args.strategy_files)?;
    if strategies.len() < 2 {
        bail!("need at least two strategies, got {}", strategies.len());
    }
    if args.layouts.is_empty() || args.turn_limits.is_empty() || args.time_limits.is_empty() {
        bail!("layouts, turn limits and time limits must each have at least one value");
    }

    let mut config = SimulationConfig::default()
        .with_layouts(args.layouts.clone())
        .with_turn_limits(args.turn_limits.clone())
        .with_time_limits(args.time_limits.clone())
        .with_strategies(strategies)
        .with_table_dir(&args.tt_dir)
        .with_search(SearchConfig::default().with_max_depth(args.max_depth));
    if let Some(capacity) = args.table_capacity {
        config = config.with_table_capacity(capacity);
    }
    if let Some(workers) = args.workers {
        config = config.with_workers(workers);
    }
    config.validate()?;
    Ok(config)
}

fn write_report(report: &SimulationReport, args: &SimulateArgs) -> Result<()> {
    let path = writable_report_path(&args.output);
    report.write_table(&path)?;
    tracing::info!("Results written to {}", path.display());

    if let Some(json) = &args.json {
        let path = writable_report_path(json);
        report.write_json(&path)?;
        tracing::info!("JSON report written to {}", path.display());
    }
    Ok(())
}

fn print_summary(report: &SimulationReport) {
    println!("\n=== Simulation Results ===");
    println!(
        "Games: {} finished, {} failed in {:.1}s",
        report.records.len(),
        report.failures.len(),
        report.elapsed.as_secs_f64()
    );

    println!("\nStandings:");
    for (rank, s) in report.standings().iter().enumerate() {
        println!(
            "  {}. {:<12} {:>5.1} pts  ({}W {}L {}T)",
            rank + 1,
            s.name,
            s.score(),
            s.wins,
            s.losses,
            s.ties
        );
    }

    for failure in &report.failures {
        println!("  FAILED: {}", failure);
    }
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Resolve preset names and strategy files; every preset when both are empty
pub fn load_strategies(names: &[String], files: &[PathBuf]) -> Result<Vec<Heuristics>> {
    if names.is_empty() && files.is_empty() {
        return Ok(Heuristics::presets());
    }

    let mut strategies = names
        .iter()
        .map(|name| Heuristics::preset(name).ok_or_else(|| anyhow!("unknown strategy '{}'", name)))
        .collect::<Result<Vec<_>>>()?;

    for path in files {
        strategies.push(load_strategy_file(path)?);
    }
    Ok(strategies)
}

fn load_strategy_file(path: &Path) -> Result<Heuristics> {
    Heuristics::load(path).with_context(|| format!("Failed to load strategy: {}", path.display()))
}

// ============================================================================
// TESTS
// ============================================================================
