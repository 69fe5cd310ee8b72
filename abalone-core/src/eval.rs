//! Position evaluation
//!
//! The search only ever sees the [`Evaluator`] capability. [`Heuristics`] is
//! the stock weighted strategy; other strategies plug in by implementing the
//! trait.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::board::{Board, Color, Direction, BOARD_RADIUS};

/// Search score, larger is better for the side being scored
pub type Score = i32;

/// Decisive score magnitude (effectively infinite)
pub const WIN_VALUE: Score = 1_000_000;

/// Scoring capability used at search leaves
///
/// Implementations must be pure: the same board and side always give the
/// same score. The search clamps scores to `-EVAL_LIMIT..=EVAL_LIMIT`
/// (see [`crate::ai::EVAL_LIMIT`]); larger magnitudes are reserved for won
/// and lost positions.
pub trait Evaluator: Send + Sync {
    /// Strategy name, used in reports and table file names
    fn name(&self) -> &str;

    /// Score `board` from `side`'s point of view
    fn score(&self, board: &Board, side: Color) -> Score;
}

/// Weighted positional features
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Heuristics {
    pub name: String,
    /// Per marble on the board
    pub material_weight: Score,
    /// Per ring closer to the centre than the rim
    pub center_weight: Score,
    /// Per friendly neighbour of each marble
    pub cohesion_weight: Score,
    /// Per marble sitting on the rim
    pub edge_penalty: Score,
}

impl Default for Heuristics {
    fn default() -> Self {
        Self::material()
    }
}

impl Heuristics {
    /// Marble count dominates, mild pull to the centre
    pub fn material() -> Self {
        Self {
            name: "material".to_string(),
            material_weight: 1000,
            center_weight: 10,
            cohesion_weight: 0,
            edge_penalty: 0,
        }
    }

    /// Fights for the middle of the board
    pub fn centrist() -> Self {
        Self {
            name: "centrist".to_string(),
            material_weight: 1000,
            center_weight: 60,
            cohesion_weight: 5,
            edge_penalty: 20,
        }
    }

    /// Keeps marbles packed together
    pub fn phalanx() -> Self {
        Self {
            name: "phalanx".to_string(),
            material_weight: 1000,
            center_weight: 20,
            cohesion_weight: 30,
            edge_penalty: 10,
        }
    }

    /// Values captures above all and avoids the rim
    pub fn pusher() -> Self {
        Self {
            name: "pusher".to_string(),
            material_weight: 2000,
            center_weight: 15,
            cohesion_weight: 10,
            edge_penalty: 60,
        }
    }

    /// The stock strategies in a fixed order
    pub fn presets() -> Vec<Heuristics> {
        vec![Self::material(), Self::centrist(), Self::phalanx(), Self::pusher()]
    }

    pub fn preset(name: &str) -> Option<Heuristics> {
        Self::presets().into_iter().find(|h| h.name.eq_ignore_ascii_case(name))
    }

    /// Load from JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let heuristics: Heuristics = serde_json::from_str(&content)?;
        anyhow::ensure!(
            !heuristics.name.trim().is_empty() && !heuristics.name.chars().any(char::is_control),
            "invalid strategy name {:?}",
            heuristics.name
        );
        Ok(heuristics)
    }

    /// Save to JSON file
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn side_value(&self, board: &Board, color: Color) -> Score {
        let mut value = 0;
        for coord in board.marbles(color) {
            value += self.material_weight;

            let distance = coord.distance_to_center();
            value += self.center_weight * (BOARD_RADIUS - distance) as Score;
            if distance == BOARD_RADIUS {
                value -= self.edge_penalty;
            }

            if self.cohesion_weight != 0 {
                let friends = Direction::ALL
                    .iter()
                    .filter_map(|&d| coord.step(d))
                    .filter(|&n| board.get(n) == Some(color))
                    .count();
                value += self.cohesion_weight * friends as Score;
            }
        }
        value
    }
}

impl Evaluator for Heuristics {
    fn name(&self) -> &str {
        &self.name
    }

    fn score(&self, board: &Board, side: Color) -> Score {
        self.side_value(board, side) - self.side_value(board, side.opponent())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Coord;
    use crate::layout::Layout;

    #[test]
    fn test_evaluate_symmetric() {
        let board = Layout::Standard.board();
        for h in Heuristics::presets() {
            assert_eq!(h.score(&board, Color::Black), 0, "{} should be even", h.name);
            assert_eq!(h.score(&board, Color::White), 0);
        }
    }

    #[test]
    fn test_score_is_antisymmetric() {
        let mut board = Layout::BelgianDaisy.board();
        board.remove(Coord::from_raw(11).unwrap());
        let h = Heuristics::phalanx();
        let black = h.score(&board, Color::Black);
        assert!(black < 0);
        assert_eq!(black, -h.score(&board, Color::White));
    }

    #[test]
    fn test_material_dominates() {
        let mut board = Layout::Standard.board();
        board.remove(Coord::from_raw(99).unwrap());
        for h in Heuristics::presets() {
            assert!(h.score(&board, Color::Black) > 0, "{}", h.name);
        }
    }

    #[test]
    fn test_preset_lookup() {
        assert_eq!(Heuristics::preset("Centrist"), Some(Heuristics::centrist()));
        assert!(Heuristics::preset("nobody").is_none());
        let names: Vec<_> = Heuristics::presets().into_iter().map(|h| h.name).collect();
        assert_eq!(names, vec!["material", "centrist", "phalanx", "pusher"]);
    }

    #[test]
    fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pusher.json");
        Heuristics::pusher().save(&path).unwrap();
        assert_eq!(Heuristics::load(&path).unwrap(), Heuristics::pusher());
    }

    #[test]
    fn test_load_rejects_unprintable_names() {
        let dir = tempfile::tempdir().unwrap();
        for (file, name) in [("tab.json", "left\tright"), ("newline.json", "one\ntwo"), ("blank.json", " ")] {
            let path = dir.path().join(file);
            let mut h = Heuristics::phalanx();
            h.name = name.to_string();
            h.save(&path).unwrap();
            assert!(Heuristics::load(&path).is_err(), "{:?}", name);
        }
    }
}
