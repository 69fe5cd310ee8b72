//! Abalone Core - Game engine and AI
//!
//! This crate provides the core game logic for Abalone:
//! - Board geometry (61-cell hex field, `column*10+row` coordinates)
//! - Stock starting layouts
//! - Group enumeration and inline/broadside move generation with sumito pushes
//! - Position evaluation behind the `Evaluator` capability
//! - Persistent transposition table
//! - Time-bounded iterative-deepening alpha-beta AI
//! - Board text notation

pub mod board;
pub mod layout;
pub mod game;
pub mod eval;
pub mod tt;
pub mod ai;
pub mod notation;

// Re-exports for convenient access
pub use board::{Board, BoardError, Color, Coord, Direction, BOARD_RADIUS, CELLS, CELL_COUNT};
pub use layout::{Layout, STARTING_MARBLES};
pub use game::{
    game_over, has_legal_move, has_lost, legal_moves, outcome, successors, Group, Move, MoveKind, Winner,
    LOSS_THRESHOLD,
};
pub use eval::{Evaluator, Heuristics, Score, WIN_VALUE};
pub use tt::{Bound, TranspositionTable, TtEntry, TtError};
pub use ai::{AlphaBetaAI, SearchConfig, SearchResult, EVAL_LIMIT};
pub use notation::{format_board, format_position, parse_board, parse_position, NotationError};
