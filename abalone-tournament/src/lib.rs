//! Abalone Tournament - Multi-game simulation harness
//!
//! This crate drives many independent games between evaluation strategies:
//! - Configuration product of layouts, turn limits, time limits and strategy pairs
//! - Game sessions with per-side persistent transposition tables
//! - A worker pool with a result channel
//! - Result records, standings and report export
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run_simulation (orchestration)
//! - Level 2: run_session (load tables, play, save)
//! - Level 3: play_game (steps of one game)
//! - Level 4: utilities, configuration, reporting

mod config;
mod game_runner;
mod report;
mod tournament;

pub use config::{Matchup, SimulationConfig, DEFAULT_TABLE_DIR, DEFAULT_TIME_LIMIT_MS, DEFAULT_TURN_LIMIT};
pub use game_runner::{play_game, run_session, GameOutcome, SessionError};
pub use report::{writable_report_path, GameRecord, SimulationReport, Standing, TIE_NAME};
pub use tournament::run_simulation;
