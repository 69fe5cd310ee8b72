//! Moves command - enumerate the state space one ply out
//!
//! Reads a position in board text format and writes two files side by side:
//! `<out>.moves` with one move per line and `<out>.board` with the board each
//! move produces, line for line.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use abalone_core::{format_board, parse_position, successors, Board, Color};

#[derive(Args)]
pub struct MovesArgs {
    /// Position file (side to move, then the marble list)
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Output path prefix (defaults to the input path without its extension)
    #[arg(long, value_name = "PREFIX")]
    pub out: Option<PathBuf>,
}

pub fn run(args: MovesArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read position: {}", args.input.display()))?;
    let (board, side) =
        parse_position(&text).with_context(|| format!("Malformed position in {}", args.input.display()))?;

    let (moves, boards) = expand(&board, side);

    let prefix = args.out.unwrap_or_else(|| args.input.with_extension(""));
    let moves_path = with_suffix(&prefix, ".moves");
    let boards_path = with_suffix(&prefix, ".board");

    std::fs::write(&moves_path, &moves).with_context(|| format!("Failed to write {}", moves_path.display()))?;
    std::fs::write(&boards_path, &boards).with_context(|| format!("Failed to write {}", boards_path.display()))?;

    let count = moves.lines().count();
    tracing::info!("{} to move: {} legal moves", side, count);
    println!("{} moves written to {} and {}", count, moves_path.display(), boards_path.display());
    Ok(())
}

/// Move list and resulting boards, one per line in generation order
fn expand(board: &Board, side: Color) -> (String, String) {
    let mut moves = String::new();
    let mut boards = String::new();
    for (mv, next) in successors(board, side) {
        moves.push_str(&mv.to_string());
        moves.push('\n');
        boards.push_str(&format_board(&next));
        boards.push('\n');
    }
    (moves, boards)
}

fn with_suffix(prefix: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(prefix.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use abalone_core::{legal_moves, parse_board, Layout};

    #[test]
    fn test_expand_lines_match() {
        let board = Layout::Standard.board();
        let (moves, boards) = expand(&board, Color::Black);
        assert_eq!(moves.lines().count(), legal_moves(&board, Color::Black).len());
        assert_eq!(moves.lines().count(), boards.lines().count());

        for line in boards.lines() {
            let next = parse_board(line).unwrap();
            assert_eq!(next.count(Color::Black), 14);
        }
    }

    #[test]
    fn test_expand_no_marbles() {
        let (board, _) = parse_position("b\nE5w").unwrap();
        let (moves, boards) = expand(&board, Color::Black);
        assert!(moves.is_empty());
        assert!(boards.is_empty());
    }

    #[test]
    fn test_run_writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("test1.input");
        std::fs::write(&input, "w\nC5b,E5w,E6w\n").unwrap();

        run(MovesArgs {
            input: input.clone(),
            out: None,
        })
        .unwrap();

        let moves = std::fs::read_to_string(dir.path().join("test1.moves")).unwrap();
        let boards = std::fs::read_to_string(dir.path().join("test1.board")).unwrap();
        assert!(moves.lines().any(|l| l == "E5,E6-NW"));
        assert_eq!(moves.lines().count(), boards.lines().count());
    }

    #[test]
    fn test_suffix_keeps_dots() {
        assert_eq!(
            with_suffix(Path::new("out/test1.out"), ".moves"),
            PathBuf::from("out/test1.out.moves")
        );
    }
}
