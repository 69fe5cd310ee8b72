//! Stock starting layouts

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::board::{Board, Color, Coord};

/// Marbles per side in every stock layout
pub const STARTING_MARBLES: usize = 14;

const STANDARD_BLACK: [u8; 14] = [11, 12, 13, 14, 15, 21, 22, 23, 24, 25, 26, 33, 34, 35];
const STANDARD_WHITE: [u8; 14] = [99, 98, 97, 96, 95, 89, 88, 87, 86, 85, 84, 77, 76, 75];

const BELGIAN_BLACK: [u8; 14] = [11, 12, 21, 22, 23, 32, 33, 99, 98, 89, 88, 87, 78, 77];
const BELGIAN_WHITE: [u8; 14] = [14, 15, 24, 25, 26, 35, 36, 95, 96, 84, 85, 86, 74, 75];

const GERMAN_BLACK: [u8; 14] = [21, 22, 31, 32, 33, 42, 43, 67, 68, 77, 78, 79, 88, 89];
const GERMAN_WHITE: [u8; 14] = [25, 26, 35, 36, 37, 46, 47, 63, 64, 73, 74, 75, 84, 85];

/// Starting position
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Layout {
    Standard,
    BelgianDaisy,
    GermanDaisy,
}

impl Layout {
    pub const ALL: [Layout; 3] = [Layout::Standard, Layout::BelgianDaisy, Layout::GermanDaisy];

    /// Human-readable name used in reports
    pub fn name(self) -> &'static str {
        match self {
            Layout::Standard => "standard",
            Layout::BelgianDaisy => "belgian daisy",
            Layout::GermanDaisy => "german daisy",
        }
    }

    /// File-name-safe form of the name
    pub fn slug(self) -> &'static str {
        match self {
            Layout::Standard => "standard",
            Layout::BelgianDaisy => "belgian-daisy",
            Layout::GermanDaisy => "german-daisy",
        }
    }

    pub fn board(self) -> Board {
        let (black, white) = match self {
            Layout::Standard => (&STANDARD_BLACK, &STANDARD_WHITE),
            Layout::BelgianDaisy => (&BELGIAN_BLACK, &BELGIAN_WHITE),
            Layout::GermanDaisy => (&GERMAN_BLACK, &GERMAN_WHITE),
        };

        let mut board = Board::empty();
        for (cells, color) in [(black, Color::Black), (white, Color::White)] {
            for coord in cells.iter().filter_map(|&raw| Coord::from_raw(raw)) {
                board.place(coord, color);
            }
        }
        board
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Layout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', ' '], "-");
        Layout::ALL
            .into_iter()
            .find(|layout| layout.slug() == normalized)
            .ok_or_else(|| format!("unknown layout '{}' (expected standard, belgian-daisy or german-daisy)", s))
    }
}
