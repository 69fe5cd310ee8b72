//! Persistent transposition table
//!
//! Entries are keyed by the exact board occupancy plus the side to move. The
//! table lives in memory for a whole game and can be written to disk between
//! games in a small versioned binary format:
//!
//! ```text
//! header:  b"ABTT" | version u16 | entry_count u64
//! record:  record_len u16 |
//!          black_mask u64 | white_mask u64 | side u8 |
//!          score i32 | depth u8 | bound u8 |
//!          has_move u8 | [group_len u8 | coord u8 x3 | direction u8 | pushed u8]
//! ```
//!
//! All integers are little-endian. Unused group coordinates are written as 0.

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::board::{Board, Color, Coord, Direction};
use crate::eval::Score;
use crate::game::{Group, Move, MAX_GROUP};

const MAGIC: &[u8; 4] = b"ABTT";

/// Current on-disk format version
pub const FORMAT_VERSION: u16 = 1;

const RECORD_BASE_LEN: usize = 8 + 8 + 1 + 4 + 1 + 1 + 1;
const RECORD_MOVE_LEN: usize = 1 + MAX_GROUP + 1 + 1;

// ============================================================================
// ENTRIES
// ============================================================================

/// How the stored score relates to the true value
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Bound {
    /// True value found inside the window
    Exact,
    /// Beta cutoff: true value is at least the score
    Lower,
    /// Failed low: true value is at most the score
    Upper,
}

impl Bound {
    fn code(self) -> u8 {
        match self {
            Bound::Exact => 0,
            Bound::Lower => 1,
            Bound::Upper => 2,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Bound::Exact),
            1 => Some(Bound::Lower),
            2 => Some(Bound::Upper),
            _ => None,
        }
    }
}

/// Result of searching one position
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TtEntry {
    pub best_move: Option<Move>,
    pub score: Score,
    /// Plies searched below this position
    pub depth: u8,
    pub bound: Bound,
}

/// Exact position key: both occupancy masks plus the side to move
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TtKey {
    black: u64,
    white: u64,
    side: Color,
}

impl TtKey {
    pub fn new(board: &Board, side: Color) -> Self {
        let (black, white) = board.masks();
        Self { black, white, side }
    }
}

#[derive(Debug, Error)]
pub enum TtError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("not a transposition table file (bad magic)")]
    BadMagic,

    #[error("unsupported table format version {0}")]
    UnsupportedVersion(u16),

    #[error("table data ends early")]
    Truncated,

    #[error("invalid record {index}: {reason}")]
    InvalidRecord { index: u64, reason: &'static str },
}

// ============================================================================
// TABLE
// ============================================================================

#[derive(Clone, Debug)]
struct Slot {
    entry: TtEntry,
    stamp: u64,
}

/// Position cache, unbounded unless a capacity is set
#[derive(Clone, Debug, Default)]
pub struct TranspositionTable {
    entries: FxHashMap<TtKey, Slot>,
    /// Evict the least recently stored entry beyond this size
    capacity: Option<usize>,
    /// Store order for eviction; stale stamps are skipped lazily
    order: VecDeque<(TtKey, u64)>,
    next_stamp: u64,
}

impl TranspositionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Table that evicts the least recently stored entry once `capacity` is reached
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            capacity: Some(capacity.max(1)),
            ..Self::default()
        }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Change the capacity of a populated table, evicting oldest entries first
    pub fn set_capacity_limit(&mut self, capacity: Option<usize>) {
        self.capacity = capacity.map(|c| c.max(1));
        self.order.clear();

        let Some(capacity) = self.capacity else {
            return;
        };
        let mut stamps: Vec<(TtKey, u64)> = self.entries.iter().map(|(key, slot)| (*key, slot.stamp)).collect();
        stamps.sort_by_key(|&(_, stamp)| stamp);
        self.order.extend(stamps);

        while self.entries.len() > capacity {
            let Some((key, _)) = self.order.pop_front() else {
                break;
            };
            self.entries.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn lookup(&self, board: &Board, side: Color) -> Option<&TtEntry> {
        self.entries.get(&TtKey::new(board, side)).map(|slot| &slot.entry)
    }

    /// Insert or overwrite the entry for (board, side)
    pub fn store(&mut self, board: &Board, side: Color, entry: TtEntry) {
        self.insert(TtKey::new(board, side), entry);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TtKey, &TtEntry)> {
        self.entries.iter().map(|(key, slot)| (key, &slot.entry))
    }

    fn insert(&mut self, key: TtKey, entry: TtEntry) {
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        self.entries.insert(key, Slot { entry, stamp });

        let Some(capacity) = self.capacity else {
            return;
        };
        self.order.push_back((key, stamp));
        while self.entries.len() > capacity {
            let Some((old_key, old_stamp)) = self.order.pop_front() else {
                break;
            };
            if self.entries.get(&old_key).map(|slot| slot.stamp) == Some(old_stamp) {
                self.entries.remove(&old_key);
            }
        }
        // Keep the stale backlog bounded
        if self.order.len() > capacity * 2 {
            let entries = &self.entries;
            self.order
                .retain(|(k, s)| entries.get(k).map(|slot| slot.stamp) == Some(*s));
        }
    }

    // ========================================================================
    // PERSISTENCE
    // ========================================================================

    /// Read a table from `path`
    ///
    /// A missing or unreadable file yields an empty table; the problem is
    /// logged, never returned.
    pub fn load(path: &Path) -> Self {
        match std::fs::read(path) {
            Ok(bytes) => match Self::from_bytes(&bytes) {
                Ok(table) => {
                    tracing::debug!("Loaded {} table entries from {}", table.len(), path.display());
                    table
                }
                Err(e) => {
                    tracing::warn!("Ignoring corrupt transposition table {}: {}", path.display(), e);
                    Self::new()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No transposition table at {}, starting empty", path.display());
                Self::new()
            }
            Err(e) => {
                tracing::warn!("Could not read transposition table {}: {}", path.display(), e);
                Self::new()
            }
        }
    }

    /// Write the whole table to `path`, replacing its contents
    pub fn save(&self, path: &Path) -> Result<(), TtError> {
        std::fs::write(path, self.to_bytes()).map_err(|source| TtError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!("Saved {} table entries to {}", self.len(), path.display());
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(14 + self.len() * (2 + RECORD_BASE_LEN + RECORD_MOVE_LEN));
        out.extend_from_slice(MAGIC);
        out.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        out.extend_from_slice(&(self.len() as u64).to_le_bytes());

        // Oldest first so a capped table reloads with the same eviction order
        let mut slots: Vec<_> = self.entries.iter().collect();
        slots.sort_by_key(|(_, slot)| slot.stamp);

        for (key, slot) in slots {
            encode_record(&mut out, key, &slot.entry);
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TtError> {
        let mut reader = Reader::new(bytes);
        if reader.take(4)? != MAGIC {
            return Err(TtError::BadMagic);
        }
        let version = reader.u16()?;
        if version != FORMAT_VERSION {
            return Err(TtError::UnsupportedVersion(version));
        }

        let count = reader.u64()?;
        let mut table = Self::new();
        for index in 0..count {
            let len = reader.u16()? as usize;
            let record = reader.take(len)?;
            let (key, entry) = decode_record(record, index)?;
            table.insert(key, entry);
        }
        Ok(table)
    }
}

impl PartialEq for TranspositionTable {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .entries
                .iter()
                .all(|(key, slot)| other.entries.get(key).map(|s| &s.entry) == Some(&slot.entry))
    }
}

// ============================================================================
// RECORD CODEC
// ============================================================================

fn encode_record(out: &mut Vec<u8>, key: &TtKey, entry: &TtEntry) {
    let len = RECORD_BASE_LEN + if entry.best_move.is_some() { RECORD_MOVE_LEN } else { 0 };
    out.extend_from_slice(&(len as u16).to_le_bytes());
    out.extend_from_slice(&key.black.to_le_bytes());
    out.extend_from_slice(&key.white.to_le_bytes());
    out.push(key.side as u8);
    out.extend_from_slice(&entry.score.to_le_bytes());
    out.push(entry.depth);
    out.push(entry.bound.code());

    match &entry.best_move {
        Some(mv) => {
            out.push(1);
            let coords = mv.group.coords();
            out.push(coords.len() as u8);
            for i in 0..MAX_GROUP {
                out.push(coords.get(i).map_or(0, |c| c.raw()));
            }
            out.push(mv.direction.index());
            out.push(mv.pushed);
        }
        None => out.push(0),
    }
}

fn decode_record(record: &[u8], index: u64) -> Result<(TtKey, TtEntry), TtError> {
    let invalid = |reason| TtError::InvalidRecord { index, reason };
    let mut r = Reader::new(record);

    let black = r.u64()?;
    let white = r.u64()?;
    if Board::from_masks(black, white).is_none() {
        return Err(invalid("overlapping or off-field occupancy"));
    }
    let side = match r.u8()? {
        0 => Color::Black,
        1 => Color::White,
        _ => return Err(invalid("bad side to move")),
    };
    let score = r.i32()?;
    let depth = r.u8()?;
    let bound = Bound::from_code(r.u8()?).ok_or_else(|| invalid("bad bound type"))?;

    let best_move = match r.u8()? {
        0 => None,
        1 => {
            let len = r.u8()? as usize;
            let raw = r.take(MAX_GROUP)?;
            if len == 0 || len > MAX_GROUP {
                return Err(invalid("bad group size"));
            }
            let coords = raw[..len]
                .iter()
                .map(|&c| Coord::from_raw(c))
                .collect::<Option<Vec<_>>>()
                .ok_or_else(|| invalid("off-field group cell"))?;
            let group = Group::from_coords(&coords).ok_or_else(|| invalid("cells do not form a group"))?;
            let direction = Direction::from_index(r.u8()?).ok_or_else(|| invalid("bad direction"))?;
            let pushed = r.u8()?;
            if pushed as usize >= len {
                return Err(invalid("push larger than group"));
            }
            Some(Move::from_parts(group, direction, pushed))
        }
        _ => return Err(invalid("bad move flag")),
    };

    Ok((
        TtKey { black, white, side },
        TtEntry {
            best_move,
            score,
            depth,
            bound,
        },
    ))
}

/// Little-endian cursor over a byte slice
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], TtError> {
        let end = self.pos.checked_add(n).ok_or(TtError::Truncated)?;
        let slice = self.bytes.get(self.pos..end).ok_or(TtError::Truncated)?;
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], TtError> {
        let mut buf = [0u8; N];
        buf.copy_from_slice(self.take(N)?);
        Ok(buf)
    }

    fn u8(&mut self) -> Result<u8, TtError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, TtError> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    fn i32(&mut self) -> Result<i32, TtError> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64, TtError> {
        Ok(u64::from_le_bytes(self.array()?))
    }
}
