//! Board text format
//!
//! A position is two lines: the side to move (`b` or `w`), then the occupied
//! cells as comma-separated tokens `<column><row><colour>`, e.g.
//!
//! ```text
//! b
//! C5b,C6b,D6w
//! ```
//!
//! Columns run `A..I` (1..9), rows `1..9`.

use thiserror::Error;

use crate::board::{Board, BoardError, Color, Coord};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotationError {
    #[error("missing side-to-move line")]
    MissingSide,

    #[error("side to move must be 'b' or 'w', got '{0}'")]
    InvalidSide(String),

    #[error("malformed marble token '{0}' (expected e.g. C5b)")]
    InvalidToken(String),

    #[error("marble token '{0}' is outside the playing field")]
    OffField(String),

    #[error(transparent)]
    Board(#[from] BoardError),
}

/// Parse a position from board text
pub fn parse_position(text: &str) -> Result<(Board, Color), NotationError> {
    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());

    let side_line = lines.next().ok_or(NotationError::MissingSide)?;
    let side = parse_side(side_line)?;

    let board = match lines.next() {
        Some(marbles) => parse_board(marbles)?,
        None => Board::empty(),
    };

    Ok((board, side))
}

/// Parse the comma-separated marble list on its own
pub fn parse_board(line: &str) -> Result<Board, NotationError> {
    let marbles = line
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(parse_token)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Board::from_marbles(marbles)?)
}

fn parse_side(line: &str) -> Result<Color, NotationError> {
    let mut chars = line.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Color::from_symbol(c.to_ascii_lowercase())
            .ok_or_else(|| NotationError::InvalidSide(line.to_string())),
        _ => Err(NotationError::InvalidSide(line.to_string())),
    }
}

fn parse_token(token: &str) -> Result<(Coord, Color), NotationError> {
    let invalid = || NotationError::InvalidToken(token.to_string());

    let bytes = token.as_bytes();
    if bytes.len() != 3 {
        return Err(invalid());
    }

    let column = bytes[0].to_ascii_uppercase();
    if !(b'A'..=b'I').contains(&column) {
        return Err(invalid());
    }
    if !(b'1'..=b'9').contains(&bytes[1]) {
        return Err(invalid());
    }
    let color = Color::from_symbol(bytes[2].to_ascii_lowercase() as char).ok_or_else(invalid)?;

    let col = (column - b'A' + 1) as i8;
    let row = (bytes[1] - b'0') as i8;
    let coord = Coord::new(col, row).ok_or_else(|| NotationError::OffField(token.to_string()))?;

    Ok((coord, color))
}

/// Marble list in ascending cell order
pub fn format_board(board: &Board) -> String {
    board
        .iter()
        .map(|(coord, color)| format!("{}{}", coord, color.symbol()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Full two-line position text
pub fn format_position(board: &Board, side: Color) -> String {
    format!("{}\n{}\n", side.symbol(), format_board(board))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Layout;

    #[test]
    fn test_parse_simple_position() {
        let (board, side) = parse_position("b\nC5b,C6b,C7w\n").unwrap();
        assert_eq!(side, Color::Black);
        assert_eq!(board.get(Coord::from_raw(35).unwrap()), Some(Color::Black));
        assert_eq!(board.get(Coord::from_raw(36).unwrap()), Some(Color::Black));
        assert_eq!(board.get(Coord::from_raw(37).unwrap()), Some(Color::White));
        assert_eq!(board.total(), 3);
    }

    #[test]
    fn test_parse_tolerates_spacing() {
        let (board, side) = parse_position("  w \r\nA1b, I9w ,\n").unwrap();
        assert_eq!(side, Color::White);
        assert_eq!(board.total(), 2);
    }

    #[test]
    fn test_side_only_is_empty_board() {
        let (board, side) = parse_position("w\n").unwrap();
        assert_eq!(side, Color::White);
        assert_eq!(board.total(), 0);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_position(""), Err(NotationError::MissingSide));
        assert_eq!(
            parse_position("x\nC5b"),
            Err(NotationError::InvalidSide("x".to_string()))
        );
        assert_eq!(
            parse_position("b\nC5x"),
            Err(NotationError::InvalidToken("C5x".to_string()))
        );
        assert_eq!(
            parse_position("b\nJ5b"),
            Err(NotationError::InvalidToken("J5b".to_string()))
        );
        assert_eq!(
            parse_position("b\nC55b"),
            Err(NotationError::InvalidToken("C55b".to_string()))
        );
        assert_eq!(
            parse_position("b\nA9b"),
            Err(NotationError::OffField("A9b".to_string()))
        );
        assert!(matches!(
            parse_position("b\nC5b,C5w"),
            Err(NotationError::Board(BoardError::DuplicateCell(_)))
        ));
    }

    #[test]
    fn test_format_round_trip() {
        let board = Layout::BelgianDaisy.board();
        let text = format_position(&board, Color::White);
        assert!(text.starts_with("w\n"));
        assert_eq!(parse_position(&text).unwrap(), (board, Color::White));
    }

    #[test]
    fn test_format_is_ascending() {
        let (board, _) = parse_position("b\nI9w,A1b,E5b").unwrap();
        assert_eq!(format_board(&board), "A1b,E5b,I9w");
    }
}
