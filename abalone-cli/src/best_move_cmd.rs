//! Best-move command - search a single position
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: load_inputs(), report_result()

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use abalone_core::{parse_position, AlphaBetaAI, Board, Color, Heuristics, SearchConfig, SearchResult, TranspositionTable};

use crate::simulate_cmd::load_strategies;

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct BestMoveArgs {
    /// Position file (side to move, then the marble list)
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Stock strategy (material, centrist, phalanx, pusher)
    #[arg(long, default_value = "material", conflicts_with = "strategy_file")]
    pub strategy: String,

    /// Strategy JSON file
    #[arg(long, value_name = "FILE")]
    pub strategy_file: Option<PathBuf>,

    /// Thinking time in milliseconds
    #[arg(long, default_value = "5000")]
    pub time_limit: u64,

    /// Turns the side to move has left
    #[arg(long, default_value = "30")]
    pub turns: u32,

    /// Deepest search iteration in plies
    #[arg(long, default_value = "64")]
    pub max_depth: u32,

    /// Transposition table file to reuse and update
    #[arg(long, value_name = "FILE")]
    pub tt: Option<PathBuf>,

    /// Output the result as JSON
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

pub fn run(args: BestMoveArgs) -> Result<()> {
    let (board, side, strategy) = load_inputs(&args)?;

    let mut table = match &args.tt {
        Some(path) => TranspositionTable::load(path),
        None => TranspositionTable::new(),
    };

    let ai = AlphaBetaAI::new(SearchConfig::default().with_max_depth(args.max_depth));
    let result = ai.search(&board, side, args.time_limit, args.turns, &mut table, &strategy, false);

    if let Some(path) = &args.tt {
        if let Err(e) = table.save(path) {
            tracing::warn!("Transposition table not saved: {}", e);
        }
    }

    report_result(&result, side, &strategy, args.json)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn load_inputs(args: &BestMoveArgs) -> Result<(Board, Color, Heuristics)> {
    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read position: {}", args.input.display()))?;
    let (board, side) =
        parse_position(&text).with_context(|| format!("Malformed position in {}", args.input.display()))?;

    let strategy = match &args.strategy_file {
        Some(path) => load_strategies(&[], std::slice::from_ref(path))?,
        None => load_strategies(std::slice::from_ref(&args.strategy), &[])?,
    };
    let Some(strategy) = strategy.into_iter().next() else {
        bail!("no strategy selected");
    };

    Ok((board, side, strategy))
}

fn report_result(result: &SearchResult, side: Color, strategy: &Heuristics, json: bool) -> Result<()> {
    if json {
        let output = serde_json::json!({
            "side": side.symbol().to_string(),
            "strategy": strategy.name,
            "move": result.best_move.map(|mv| mv.to_string()),
            "score": result.score,
            "depth": result.depth,
            "nodes": result.nodes,
            "elapsed_ms": result.elapsed.as_millis() as u64,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match result.best_move {
        Some(mv) => println!(
            "{} ({}): {}  score={} depth={} nodes={} time={:.2}s",
            side,
            strategy.name,
            mv,
            result.score,
            result.depth,
            result.nodes,
            result.elapsed.as_secs_f64()
        ),
        None => println!("{} has no legal move", side),
    }
    Ok(())
}
