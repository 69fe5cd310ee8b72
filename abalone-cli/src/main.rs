//! Abalone CLI - Command-line interface
//!
//! Commands:
//! - simulate: Play every configured matchup and write a results report
//! - moves: List legal moves and resulting boards for a position file
//! - best-move: Search a position file and print the chosen move

mod best_move_cmd;
mod moves_cmd;
mod simulate_cmd;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "abalone")]
#[command(about = "Abalone move generator, search engine and simulation harness")]
#[command(version)]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulation harness
    Simulate(simulate_cmd::SimulateArgs),
    /// Write legal moves and resulting boards for a position
    Moves(moves_cmd::MovesArgs),
    /// Search a position and print the best move
    BestMove(best_move_cmd::BestMoveArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so command output stays clean
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&cli.log))?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Simulate(args) => simulate_cmd::run(args),
        Commands::Moves(args) => moves_cmd::run(args),
        Commands::BestMove(args) => best_move_cmd::run(args),
    }
}
