//! Hex board geometry and marble occupancy
//!
//! Cells are addressed as `column * 10 + row` with column and row in `1..=9`.
//! Only the 61 cells with `|column - row| <= 4` belong to the playing field.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of cells on the playing field
pub const CELL_COUNT: usize = 61;

/// Most marbles a legal board can hold (14 per side)
pub const MAX_MARBLES: usize = 28;

/// Distance from the centre cell to the rim
pub const BOARD_RADIUS: i8 = 4;

/// First cell index of each column (columns 1..=9)
const COLUMN_OFFSETS: [usize; 9] = [0, 5, 11, 18, 26, 35, 43, 50, 56];

const fn is_field_cell(col: i8, row: i8) -> bool {
    col >= 1 && col <= 9 && row >= 1 && row <= 9 && col - row <= BOARD_RADIUS && row - col <= BOARD_RADIUS
}

const fn build_cells() -> [Coord; CELL_COUNT] {
    let mut cells = [Coord(0); CELL_COUNT];
    let mut i = 0;
    let mut col = 1;
    while col <= 9 {
        let mut row = 1;
        while row <= 9 {
            if is_field_cell(col, row) {
                cells[i] = Coord((col * 10 + row) as u8);
                i += 1;
            }
            row += 1;
        }
        col += 1;
    }
    cells
}

/// Every field cell in ascending coordinate order
pub const CELLS: [Coord; CELL_COUNT] = build_cells();

// ============================================================================
// COORDINATES
// ============================================================================

/// A field cell encoded as `column * 10 + row`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Coord(u8);

impl Coord {
    /// Build a coordinate from column and row, `None` when off the field
    pub fn new(col: i8, row: i8) -> Option<Self> {
        if is_field_cell(col, row) {
            Some(Coord((col * 10 + row) as u8))
        } else {
            None
        }
    }

    /// Interpret a raw `column * 10 + row` value
    pub fn from_raw(raw: u8) -> Option<Self> {
        Self::new((raw / 10) as i8, (raw % 10) as i8)
    }

    pub fn raw(self) -> u8 {
        self.0
    }

    pub fn col(self) -> i8 {
        (self.0 / 10) as i8
    }

    pub fn row(self) -> i8 {
        (self.0 % 10) as i8
    }

    /// Dense index in `0..CELL_COUNT`, ascending with the raw value
    pub fn index(self) -> usize {
        let col = self.col();
        let row_start = (col - BOARD_RADIUS).max(1);
        COLUMN_OFFSETS[(col - 1) as usize] + (self.row() - row_start) as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        CELLS.get(index).copied()
    }

    /// Neighbouring cell in `direction`, `None` past the rim
    pub fn step(self, direction: Direction) -> Option<Coord> {
        let (dc, dr) = direction.offsets();
        Self::new(self.col() + dc, self.row() + dr)
    }

    /// Hex distance from the centre cell (E5)
    pub fn distance_to_center(self) -> i8 {
        let dc = self.col() - 5;
        let dr = self.row() - 5;
        dc.abs().max(dr.abs()).max((dc - dr).abs())
    }

    /// Column letter `A..=I`
    pub fn column_letter(self) -> char {
        (b'A' + self.0 / 10 - 1) as char
    }
}

impl TryFrom<u8> for Coord {
    type Error = BoardError;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Coord::from_raw(raw).ok_or(BoardError::InvalidCoord(raw))
    }
}

impl From<Coord> for u8 {
    fn from(coord: Coord) -> u8 {
        coord.0
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.column_letter(), self.row())
    }
}

// ============================================================================
// DIRECTIONS
// ============================================================================

/// The six axial directions of travel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    NE,
    E,
    SE,
    SW,
    W,
    NW,
}

impl Direction {
    /// Enumeration order used by move generation
    pub const ALL: [Direction; 6] = [
        Direction::NE,
        Direction::E,
        Direction::SE,
        Direction::SW,
        Direction::W,
        Direction::NW,
    ];

    /// One direction per axis, each with a positive coordinate delta
    pub const AXES: [Direction; 3] = [Direction::E, Direction::NW, Direction::NE];

    /// (column, row) change
    pub const fn offsets(self) -> (i8, i8) {
        match self {
            Direction::NE => (1, 1),
            Direction::E => (0, 1),
            Direction::SE => (-1, 0),
            Direction::SW => (-1, -1),
            Direction::W => (0, -1),
            Direction::NW => (1, 0),
        }
    }

    /// Signed offset added to a `column * 10 + row` coordinate
    pub const fn delta(self) -> i8 {
        let (dc, dr) = self.offsets();
        dc * 10 + dr
    }

    pub const fn opposite(self) -> Direction {
        match self {
            Direction::NE => Direction::SW,
            Direction::E => Direction::W,
            Direction::SE => Direction::NW,
            Direction::SW => Direction::NE,
            Direction::W => Direction::E,
            Direction::NW => Direction::SE,
        }
    }

    /// The axis this direction travels along, as its positive-delta member
    pub fn axis(self) -> Direction {
        if self.delta() > 0 {
            self
        } else {
            self.opposite()
        }
    }

    pub fn index(self) -> u8 {
        match self {
            Direction::NE => 0,
            Direction::E => 1,
            Direction::SE => 2,
            Direction::SW => 3,
            Direction::W => 4,
            Direction::NW => 5,
        }
    }

    pub fn from_index(index: u8) -> Option<Direction> {
        Direction::ALL.get(index as usize).copied()
    }

    pub fn label(self) -> &'static str {
        match self {
            Direction::NE => "NE",
            Direction::E => "E",
            Direction::SE => "SE",
            Direction::SW => "SW",
            Direction::W => "W",
            Direction::NW => "NW",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// COLORS
// ============================================================================

/// Marble color
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Color {
    Black = 0,
    White = 1,
}

impl Color {
    pub const BOTH: [Color; 2] = [Color::Black, Color::White];

    pub fn opponent(self) -> Self {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }

    /// Single-letter marker used by the board text format
    pub fn symbol(self) -> char {
        match self {
            Color::Black => 'b',
            Color::White => 'w',
        }
    }

    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            'b' => Some(Color::Black),
            'w' => Some(Color::White),
            _ => None,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Black => f.write_str("Black"),
            Color::White => f.write_str("White"),
        }
    }
}

// ============================================================================
// BOARD
// ============================================================================

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BoardError {
    #[error("coordinate {0} is outside the playing field")]
    InvalidCoord(u8),

    #[error("cell {0} is occupied more than once")]
    DuplicateCell(Coord),

    #[error("board holds {0} marbles, more than the 28 allowed")]
    TooManyMarbles(usize),
}

/// Marble occupancy, one bit per field cell and color
///
/// Equality and hashing are exact structural matches of the occupied cells.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Board {
    black: u64,
    white: u64,
}

impl Board {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a board from (cell, color) pairs, rejecting duplicates and overfull boards
    pub fn from_marbles<I>(marbles: I) -> Result<Self, BoardError>
    where
        I: IntoIterator<Item = (Coord, Color)>,
    {
        let mut board = Board::empty();
        for (coord, color) in marbles {
            if board.get(coord).is_some() {
                return Err(BoardError::DuplicateCell(coord));
            }
            board.place(coord, color);
        }
        let total = board.total();
        if total > MAX_MARBLES {
            return Err(BoardError::TooManyMarbles(total));
        }
        Ok(board)
    }

    /// Rebuild from raw occupancy masks, `None` if they overlap or use non-field bits
    pub fn from_masks(black: u64, white: u64) -> Option<Self> {
        let field = (1u64 << CELL_COUNT) - 1;
        if black & white != 0 || (black | white) & !field != 0 {
            return None;
        }
        Some(Self { black, white })
    }

    /// Raw (black, white) occupancy masks
    pub fn masks(&self) -> (u64, u64) {
        (self.black, self.white)
    }

    pub fn get(&self, coord: Coord) -> Option<Color> {
        let bit = 1u64 << coord.index();
        if self.black & bit != 0 {
            Some(Color::Black)
        } else if self.white & bit != 0 {
            Some(Color::White)
        } else {
            None
        }
    }

    pub fn is_empty_cell(&self, coord: Coord) -> bool {
        (self.black | self.white) & (1u64 << coord.index()) == 0
    }

    /// Put a marble on `coord`, replacing whatever was there
    pub fn place(&mut self, coord: Coord, color: Color) {
        let bit = 1u64 << coord.index();
        match color {
            Color::Black => {
                self.black |= bit;
                self.white &= !bit;
            }
            Color::White => {
                self.white |= bit;
                self.black &= !bit;
            }
        }
    }

    pub fn remove(&mut self, coord: Coord) -> Option<Color> {
        let previous = self.get(coord);
        let bit = 1u64 << coord.index();
        self.black &= !bit;
        self.white &= !bit;
        previous
    }

    pub fn count(&self, color: Color) -> usize {
        self.mask(color).count_ones() as usize
    }

    pub fn total(&self) -> usize {
        (self.black | self.white).count_ones() as usize
    }

    /// Cells owned by `color` in ascending order
    pub fn marbles(&self, color: Color) -> Vec<Coord> {
        mask_cells(self.mask(color)).collect()
    }

    /// All occupied cells in ascending order
    pub fn iter(&self) -> impl Iterator<Item = (Coord, Color)> + '_ {
        mask_cells(self.black | self.white).filter_map(move |coord| self.get(coord).map(|color| (coord, color)))
    }

    fn mask(&self, color: Color) -> u64 {
        match color {
            Color::Black => self.black,
            Color::White => self.white,
        }
    }
}

fn mask_cells(mut mask: u64) -> impl Iterator<Item = Coord> {
    std::iter::from_fn(move || {
        if mask == 0 {
            return None;
        }
        let index = mask.trailing_zeros() as usize;
        mask &= mask - 1;
        Coord::from_index(index)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(raw: u8) -> Coord {
        Coord::from_raw(raw).unwrap()
    }

    #[test]
    fn test_field_shape() {
        assert_eq!(CELLS.len(), 61);
        assert!(Coord::from_raw(11).is_some());
        assert!(Coord::from_raw(15).is_some());
        assert!(Coord::from_raw(16).is_none());
        assert!(Coord::from_raw(51).is_some());
        assert!(Coord::from_raw(95).is_some());
        assert!(Coord::from_raw(94).is_none());
        assert!(Coord::from_raw(20).is_none());
        assert!(Coord::from_raw(100).is_none());
    }

    #[test]
    fn test_index_is_dense_and_ordered() {
        for (i, cell) in CELLS.iter().enumerate() {
            assert_eq!(cell.index(), i);
            assert_eq!(Coord::from_index(i), Some(*cell));
        }
        assert!(CELLS.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_direction_opposites_round_trip() {
        for &dir in &Direction::ALL {
            assert_eq!(dir.opposite().opposite(), dir);
            assert_eq!(dir.delta(), -dir.opposite().delta());
            for &cell in &CELLS {
                if let Some(next) = cell.step(dir) {
                    assert_eq!(next.step(dir.opposite()), Some(cell));
                    assert_eq!(next.raw() as i16 - cell.raw() as i16, dir.delta() as i16);
                }
            }
        }
    }

    #[test]
    fn test_step_off_rim() {
        assert_eq!(coord(15).step(Direction::E), None);
        assert_eq!(coord(11).step(Direction::SW), None);
        assert_eq!(coord(55).step(Direction::NE), Some(coord(66)));
        assert_eq!(coord(55).step(Direction::NW), Some(coord(65)));
        assert_eq!(coord(55).step(Direction::SE), Some(coord(45)));
    }

    #[test]
    fn test_distance_to_center() {
        assert_eq!(coord(55).distance_to_center(), 0);
        assert_eq!(coord(66).distance_to_center(), 1);
        assert_eq!(coord(11).distance_to_center(), 4);
        assert_eq!(coord(15).distance_to_center(), 4);
        assert_eq!(coord(59).distance_to_center(), 4);
    }

    #[test]
    fn test_display() {
        assert_eq!(coord(35).to_string(), "C5");
        assert_eq!(coord(99).to_string(), "I9");
    }

    #[test]
    fn test_board_place_and_remove() {
        let mut board = Board::empty();
        board.place(coord(35), Color::Black);
        board.place(coord(36), Color::White);
        assert_eq!(board.get(coord(35)), Some(Color::Black));
        assert_eq!(board.get(coord(36)), Some(Color::White));
        assert_eq!(board.total(), 2);

        board.place(coord(35), Color::White);
        assert_eq!(board.count(Color::Black), 0);
        assert_eq!(board.remove(coord(35)), Some(Color::White));
        assert!(board.is_empty_cell(coord(35)));
    }

    #[test]
    fn test_from_marbles_rejects_duplicates() {
        let err = Board::from_marbles(vec![(coord(35), Color::Black), (coord(35), Color::White)]).unwrap_err();
        assert_eq!(err, BoardError::DuplicateCell(coord(35)));
    }

    #[test]
    fn test_from_marbles_rejects_overfull() {
        let marbles = CELLS.iter().take(29).map(|&c| (c, Color::Black));
        assert_eq!(Board::from_marbles(marbles).unwrap_err(), BoardError::TooManyMarbles(29));
    }

    #[test]
    fn test_masks_round_trip() {
        let board = Board::from_marbles(vec![(coord(11), Color::Black), (coord(99), Color::White)]).unwrap();
        let (black, white) = board.masks();
        assert_eq!(Board::from_masks(black, white), Some(board));
        assert_eq!(Board::from_masks(1, 1), None);
        assert_eq!(Board::from_masks(1 << 62, 0), None);
    }

    #[test]
    fn test_iter_ascending() {
        let board = Board::from_marbles(vec![(coord(99), Color::White), (coord(11), Color::Black)]).unwrap();
        let cells: Vec<_> = board.iter().collect();
        assert_eq!(cells, vec![(coord(11), Color::Black), (coord(99), Color::White)]);
    }
}
