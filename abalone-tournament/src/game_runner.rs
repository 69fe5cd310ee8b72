//! Game runner - plays one game session
//!
//! Level 2 - Sessions and Level 3 - Steps

use std::path::PathBuf;

use thiserror::Error;

use abalone_core::{
    game_over, legal_moves, outcome, AlphaBetaAI, Board, Color, Move, TranspositionTable, Winner,
};

use crate::config::{Matchup, SimulationConfig};
use crate::report::{GameRecord, TIE_NAME};

/// A session that ended without a result record
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{matchup}: invalid game state: {reason}")]
    InvalidState { matchup: String, reason: String },

    #[error("{matchup}: session panicked: {message}")]
    Panicked { matchup: String, message: String },
}

impl SessionError {
    /// Label of the failed matchup
    pub fn matchup(&self) -> &str {
        match self {
            SessionError::InvalidState { matchup, .. } | SessionError::Panicked { matchup, .. } => matchup,
        }
    }
}

/// Final position of a played game
#[derive(Clone, Debug)]
pub struct GameOutcome {
    pub board: Board,
    pub winner: Winner,
    /// Black's opening move, if Black could move
    pub first_move: Option<Move>,
    pub turns_played: u32,
}

// ============================================================================
// Level 2 - Sessions
// ============================================================================

/// Load both sides' tables, play the game, save the tables back
pub fn run_session(matchup: &Matchup, config: &SimulationConfig) -> Result<GameRecord, SessionError> {
    let label = matchup.label();
    tracing::info!("Starting {}", label);

    let paths: [PathBuf; 2] = Color::BOTH.map(|color| matchup.table_path(&config.table_dir, color));
    let mut tables = paths.clone().map(|path| {
        let mut table = TranspositionTable::load(&path);
        table.set_capacity_limit(config.table_capacity);
        table
    });

    let ai = AlphaBetaAI::new(config.search.clone());
    let result = play_game(matchup, &ai, &mut tables).map(|outcome| to_record(matchup, &outcome));

    match &result {
        Ok(record) => {
            for (table, path) in tables.iter().zip(&paths) {
                if let Err(e) = table.save(path) {
                    tracing::warn!("{}: keeping table in memory only: {}", label, e);
                }
            }
            tracing::info!(
                "Finished {}: {} wins ({} black, {} white marbles)",
                label,
                record.winner_color,
                record.black_remaining,
                record.white_remaining
            );
        }
        Err(e) => tracing::error!("{}", e),
    }

    result
}

// ============================================================================
// Level 3 - Steps
// ============================================================================

/// Play one game from the matchup's layout, Black moving first
///
/// `tables` are indexed by color and updated in place.
pub fn play_game(
    matchup: &Matchup,
    ai: &AlphaBetaAI,
    tables: &mut [TranspositionTable; 2],
) -> Result<GameOutcome, SessionError> {
    let mut board = matchup.layout.board();
    let mut side = Color::Black;
    let mut turns = [matchup.turn_limit; 2];
    let mut first_move = None;
    let mut turns_played = 0u32;

    while !game_over(&board, turns[side.index()], side) {
        let result = ai.search(
            &board,
            side,
            matchup.time_limit_ms,
            turns[side.index()],
            &mut tables[side.index()],
            matchup.strategy(side),
            turns_played == 0,
        );

        let Some(mv) = result.best_move else {
            break;
        };
        tracing::debug!(
            "{} turn {}: {} {} (depth {}, score {})",
            matchup.label(),
            turns_played + 1,
            side,
            mv,
            result.depth,
            result.score
        );

        let next = checked_apply(matchup, &board, side, &mv)?;
        board = next;
        turns[side.index()] -= 1;
        turns_played += 1;
        first_move.get_or_insert(mv);
        side = side.opponent();
    }

    Ok(GameOutcome {
        board,
        winner: outcome(&board),
        first_move,
        turns_played,
    })
}

/// Apply a searched move, rejecting illegal moves and marbles that appear
fn checked_apply(matchup: &Matchup, board: &Board, side: Color, mv: &Move) -> Result<Board, SessionError> {
    let invalid = |reason: String| SessionError::InvalidState {
        matchup: matchup.label(),
        reason,
    };

    if !legal_moves(board, side).contains(mv) {
        return Err(invalid(format!("{} played illegal move {}", side, mv)));
    }

    let next = board.apply_move(mv);
    if next.count(side) != board.count(side) {
        return Err(invalid(format!("{} lost its own marble playing {}", side, mv)));
    }
    let opponent = side.opponent();
    if next.count(opponent) > board.count(opponent) {
        return Err(invalid(format!("marbles appeared after {}", mv)));
    }
    Ok(next)
}

fn to_record(matchup: &Matchup, outcome: &GameOutcome) -> GameRecord {
    let winner_name = match outcome.winner.color() {
        Some(color) => matchup.strategy(color).name.clone(),
        None => TIE_NAME.to_string(),
    };

    GameRecord {
        black_player: matchup.black.name.clone(),
        white_player: matchup.white.name.clone(),
        layout: matchup.layout.name().to_string(),
        first_move: outcome.first_move.map(|mv| mv.to_string()).unwrap_or_default(),
        time_limit_ms: matchup.time_limit_ms,
        turn_limit: matchup.turn_limit,
        black_remaining: outcome.board.count(Color::Black),
        white_remaining: outcome.board.count(Color::White),
        winner_color: outcome.winner,
        winner_name,
        turns_played: outcome.turns_played,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abalone_core::{Heuristics, Layout, SearchConfig, STARTING_MARBLES};

    fn quick_matchup(layout: Layout, turn_limit: u32) -> Matchup {
        Matchup {
            black: Heuristics::pusher(),
            white: Heuristics::centrist(),
            layout,
            turn_limit,
            time_limit_ms: 50,
        }
    }

    fn quick_ai() -> AlphaBetaAI {
        AlphaBetaAI::new(SearchConfig::default().with_max_depth(1))
    }

    #[test]
    fn test_play_short_game() {
        let matchup = quick_matchup(Layout::Standard, 3);
        let mut tables = [TranspositionTable::new(), TranspositionTable::new()];
        let outcome = play_game(&matchup, &quick_ai(), &mut tables).unwrap();

        assert_eq!(outcome.turns_played, 6);
        assert!(outcome.first_move.is_some());
        assert!(outcome.board.count(Color::Black) <= STARTING_MARBLES);
        assert!(outcome.board.count(Color::White) <= STARTING_MARBLES);
        // Turns after the opening fill both tables
        assert!(!tables[0].is_empty());
        assert!(!tables[1].is_empty());
    }

    #[test]
    fn test_zero_turn_limit() {
        let matchup = quick_matchup(Layout::GermanDaisy, 0);
        let mut tables = [TranspositionTable::new(), TranspositionTable::new()];
        let outcome = play_game(&matchup, &quick_ai(), &mut tables).unwrap();

        assert_eq!(outcome.turns_played, 0);
        assert_eq!(outcome.winner, Winner::Tie);
        let record = to_record(&matchup, &outcome);
        assert_eq!(record.first_move, "");
        assert_eq!(record.winner_name, TIE_NAME);
    }

    #[test]
    fn test_record_fields() {
        let matchup = quick_matchup(Layout::BelgianDaisy, 2);
        let mut tables = [TranspositionTable::new(), TranspositionTable::new()];
        let outcome = play_game(&matchup, &quick_ai(), &mut tables).unwrap();
        let record = to_record(&matchup, &outcome);

        assert_eq!(record.black_player, "pusher");
        assert_eq!(record.white_player, "centrist");
        assert_eq!(record.layout, "belgian daisy");
        assert_eq!(record.turn_limit, 2);
        assert_eq!(record.time_limit_ms, 50);
        assert_eq!(record.first_move, outcome.first_move.unwrap().to_string());
        match record.winner_color {
            Winner::Black => assert_eq!(record.winner_name, "pusher"),
            Winner::White => assert_eq!(record.winner_name, "centrist"),
            Winner::Tie => assert_eq!(record.black_remaining, record.white_remaining),
        }
    }

    #[test]
    fn test_run_session_saves_tables() {
        let dir = tempfile::tempdir().unwrap();
        let config = SimulationConfig::default()
            .with_table_dir(dir.path())
            .with_search(SearchConfig::default().with_max_depth(1));
        let matchup = quick_matchup(Layout::Standard, 2);

        let record = run_session(&matchup, &config).unwrap();
        assert_eq!(record.turns_played, 4);

        for color in Color::BOTH {
            let path = matchup.table_path(dir.path(), color);
            assert!(path.exists(), "{} missing", path.display());
            assert!(!TranspositionTable::load(&path).is_empty());
        }
    }

    #[test]
    fn test_unwritable_table_dir_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let config = SimulationConfig::default()
            .with_table_dir(dir.path().join("missing").join("nested"))
            .with_search(SearchConfig::default().with_max_depth(1));
        let record = run_session(&quick_matchup(Layout::Standard, 1), &config).unwrap();
        assert_eq!(record.turns_played, 2);
    }

    #[test]
    fn test_illegal_move_is_rejected() {
        let matchup = quick_matchup(Layout::Standard, 1);
        let board = Layout::Standard.board();
        let white_move = legal_moves(&board, Color::White)[0];
        let err = checked_apply(&matchup, &board, Color::Black, &white_move).unwrap_err();
        assert!(matches!(err, SessionError::InvalidState { .. }));
        assert!(err.matchup().starts_with("pusher (black) vs centrist (white)"));
    }
}
