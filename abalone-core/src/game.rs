//! Marble groups, move generation and terminal detection

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::board::{Board, Color, Coord, Direction};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Largest group that may move together
pub const MAX_GROUP: usize = 3;

/// A side holding this many marbles or fewer has lost (six pushed off)
pub const LOSS_THRESHOLD: usize = 8;

// ============================================================================
// CORE TYPES
// ============================================================================

/// One to three same-colored marbles in a gapless line, sorted along their axis
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Group {
    cells: [Coord; MAX_GROUP],
    len: u8,
}

impl Group {
    pub fn single(coord: Coord) -> Self {
        Self {
            cells: [coord; MAX_GROUP],
            len: 1,
        }
    }

    /// Validate 1-3 cells as a group, in whatever order they are given
    ///
    /// Two cells must be neighbours; three must sit consecutively on one axis.
    pub fn from_coords(coords: &[Coord]) -> Option<Self> {
        if coords.is_empty() || coords.len() > MAX_GROUP {
            return None;
        }

        let mut sorted = [coords[0]; MAX_GROUP];
        sorted[..coords.len()].copy_from_slice(coords);
        sorted[..coords.len()].sort_unstable();

        if coords.len() == 1 {
            return Some(Group::single(sorted[0]));
        }

        // Positive-delta axes keep ascending order equal to order along the axis
        let collinear = Direction::AXES.iter().any(|&axis| {
            sorted[..coords.len()]
                .windows(2)
                .all(|pair| pair[0].step(axis) == Some(pair[1]))
        });

        collinear.then(|| Group {
            cells: sorted,
            len: coords.len() as u8,
        })
    }

    pub fn coords(&self) -> &[Coord] {
        &self.cells[..self.len as usize]
    }

    pub fn len(&self) -> usize {
        self.len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Positive-delta direction the marbles line up along, `None` for a single marble
    pub fn axis(&self) -> Option<Direction> {
        if self.len < 2 {
            return None;
        }
        Direction::AXES
            .into_iter()
            .find(|&axis| self.cells[0].step(axis) == Some(self.cells[1]))
    }

    /// Marble at the front when travelling in `direction` along the axis
    fn leading(&self, direction: Direction) -> Coord {
        if direction.delta() > 0 {
            self.cells[self.len as usize - 1]
        } else {
            self.cells[0]
        }
    }
}

/// How a group travels relative to its axis
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MoveKind {
    /// Along the axis; may push a shorter opposing run
    Inline,
    /// Sideways (or a single marble); every destination must be empty
    Broadside,
}

/// A group moving one step in a direction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub group: Group,
    pub direction: Direction,
    pub kind: MoveKind,
    /// Opposing marbles displaced by an inline push
    pub pushed: u8,
}

impl Move {
    /// Assemble a move, deriving its kind from the group axis
    pub fn from_parts(group: Group, direction: Direction, pushed: u8) -> Self {
        Self {
            group,
            direction,
            kind: classify(&group, direction),
            pushed,
        }
    }

    pub fn is_push(&self) -> bool {
        self.pushed > 0
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, coord) in self.group.coords().iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", coord)?;
        }
        write!(f, "-{}", self.direction)
    }
}

/// Game outcome by marbles remaining
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Winner {
    Black,
    White,
    Tie,
}

impl Winner {
    pub fn color(self) -> Option<Color> {
        match self {
            Winner::Black => Some(Color::Black),
            Winner::White => Some(Color::White),
            Winner::Tie => None,
        }
    }
}

impl fmt::Display for Winner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Winner::Black => f.write_str("Black"),
            Winner::White => f.write_str("White"),
            Winner::Tie => f.write_str("Tie"),
        }
    }
}

// ============================================================================
// MOVE GENERATION
// ============================================================================

fn classify(group: &Group, direction: Direction) -> MoveKind {
    match group.axis() {
        Some(axis) if direction.axis() == axis => MoveKind::Inline,
        _ => MoveKind::Broadside,
    }
}

/// Every valid group of `color`, singles first, then pairs, then triples
pub fn groups(board: &Board, color: Color) -> Vec<Group> {
    let marbles = board.marbles(color);
    let n = marbles.len();
    let mut groups: Vec<Group> = marbles.iter().map(|&c| Group::single(c)).collect();

    for i in 0..n {
        for j in (i + 1)..n {
            if let Some(group) = Group::from_coords(&[marbles[i], marbles[j]]) {
                groups.push(group);
            }
        }
    }

    for i in 0..n {
        for j in (i + 1)..n {
            for k in (j + 1)..n {
                if let Some(group) = Group::from_coords(&[marbles[i], marbles[j], marbles[k]]) {
                    groups.push(group);
                }
            }
        }
    }

    groups
}

/// Check a group moving in `direction` and return the move if it is legal
pub fn try_move(board: &Board, color: Color, group: &Group, direction: Direction) -> Option<Move> {
    match classify(group, direction) {
        MoveKind::Broadside => {
            let clear = group
                .coords()
                .iter()
                .all(|&c| c.step(direction).map_or(false, |dest| board.is_empty_cell(dest)));
            clear.then(|| Move {
                group: *group,
                direction,
                kind: MoveKind::Broadside,
                pushed: 0,
            })
        }
        MoveKind::Inline => {
            let pushed = inline_push(board, color, group, direction)?;
            Some(Move {
                group: *group,
                direction,
                kind: MoveKind::Inline,
                pushed,
            })
        }
    }
}

/// Count the opposing run an inline move would push, `None` if the move is blocked
fn inline_push(board: &Board, color: Color, group: &Group, direction: Direction) -> Option<u8> {
    let mut cell = group.leading(direction).step(direction)?;
    let mut run = 0usize;

    loop {
        match board.get(cell) {
            None => break,
            Some(c) if c == color => return None,
            Some(_) => {
                run += 1;
                if run >= group.len() {
                    return None;
                }
                match cell.step(direction) {
                    Some(next) => cell = next,
                    // Pushed off the rim
                    None => break,
                }
            }
        }
    }

    Some(run as u8)
}

/// All legal moves for `color` in enumeration order
pub fn legal_moves(board: &Board, color: Color) -> Vec<Move> {
    let mut moves = Vec::new();
    for group in groups(board, color) {
        for direction in Direction::ALL {
            if let Some(mv) = try_move(board, color, &group, direction) {
                moves.push(mv);
            }
        }
    }
    moves
}

/// All legal moves for `color` paired with the board each one produces
pub fn successors(board: &Board, color: Color) -> Vec<(Move, Board)> {
    legal_moves(board, color)
        .into_iter()
        .map(|mv| {
            let next = board.apply_move(&mv);
            (mv, next)
        })
        .collect()
}

/// Whether `color` has at least one legal move
pub fn has_legal_move(board: &Board, color: Color) -> bool {
    // A free neighbour settles it without building the group list
    let single_step = board.marbles(color).into_iter().any(|c| {
        Direction::ALL
            .iter()
            .any(|&d| c.step(d).map_or(false, |dest| board.is_empty_cell(dest)))
    });
    single_step
        || groups(board, color)
            .iter()
            .any(|group| Direction::ALL.iter().any(|&d| try_move(board, color, group, d).is_some()))
}

impl Board {
    /// Board after `mv`; marbles pushed past the rim are removed
    pub fn apply_move(&self, mv: &Move) -> Board {
        let mut next = *self;
        let Some(color) = self.get(mv.group.coords()[0]) else {
            return next;
        };

        let mut moving: Vec<(Coord, Color)> = mv.group.coords().iter().map(|&c| (c, color)).collect();
        if mv.kind == MoveKind::Inline && mv.pushed > 0 {
            let mut cell = mv.group.leading(mv.direction);
            for _ in 0..mv.pushed {
                match cell.step(mv.direction) {
                    Some(next_cell) => {
                        cell = next_cell;
                        moving.push((cell, color.opponent()));
                    }
                    None => break,
                }
            }
        }

        for &(coord, _) in &moving {
            next.remove(coord);
        }
        for (coord, c) in moving {
            if let Some(dest) = coord.step(mv.direction) {
                next.place(dest, c);
            }
        }
        next
    }
}

// ============================================================================
// TERMINAL DETECTION
// ============================================================================

/// Whether `color` has lost six marbles (or otherwise dropped to the threshold)
pub fn has_lost(board: &Board, color: Color) -> bool {
    board.count(color) <= LOSS_THRESHOLD
}

/// The game ends when either side is down to the loss threshold, the side to
/// move has used its turn budget, or the side to move cannot move
pub fn game_over(board: &Board, turns_remaining: u32, side: Color) -> bool {
    has_lost(board, Color::Black)
        || has_lost(board, Color::White)
        || turns_remaining == 0
        || !has_legal_move(board, side)
}

/// Winner by marbles remaining
pub fn outcome(board: &Board) -> Winner {
    let black = board.count(Color::Black);
    let white = board.count(Color::White);
    match black.cmp(&white) {
        std::cmp::Ordering::Greater => Winner::Black,
        std::cmp::Ordering::Less => Winner::White,
        std::cmp::Ordering::Equal => Winner::Tie,
    }
}

// ============================================================================
// TESTS
// ============================================================================
