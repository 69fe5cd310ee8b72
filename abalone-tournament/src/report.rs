//! Game records and the aggregated simulation report
//!
//! Level 4 - Utilities and configuration

use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use abalone_core::Winner;

/// Name recorded as the winner of a tied game
pub const TIE_NAME: &str = "N/A";

/// Result of one finished game
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    #[serde(rename = "Black Player")]
    pub black_player: String,
    #[serde(rename = "White Player")]
    pub white_player: String,
    #[serde(rename = "Starting Board Layout")]
    pub layout: String,
    /// Empty when Black could not move at all
    #[serde(rename = "First Move")]
    pub first_move: String,
    #[serde(rename = "Time Limit Per Move (ms)")]
    pub time_limit_ms: u64,
    #[serde(rename = "Turn Limit Per Player")]
    pub turn_limit: u32,
    #[serde(rename = "Black Marbles Remaining")]
    pub black_remaining: usize,
    #[serde(rename = "White Marbles Remaining")]
    pub white_remaining: usize,
    #[serde(rename = "Winner Color")]
    pub winner_color: Winner,
    #[serde(rename = "Winner Name")]
    pub winner_name: String,
    #[serde(rename = "Turns Played")]
    pub turns_played: u32,
}

impl GameRecord {
    /// Column headers of the tabular export
    pub const COLUMNS: [&'static str; 11] = [
        "Black Player",
        "White Player",
        "Starting Board Layout",
        "First Move",
        "Time Limit Per Move (ms)",
        "Turn Limit Per Player",
        "Black Marbles Remaining",
        "White Marbles Remaining",
        "Winner Color",
        "Winner Name",
        "Turns Played",
    ];

    fn row(&self) -> [String; 11] {
        [
            self.black_player.clone(),
            self.white_player.clone(),
            self.layout.clone(),
            self.first_move.clone(),
            self.time_limit_ms.to_string(),
            self.turn_limit.to_string(),
            self.black_remaining.to_string(),
            self.white_remaining.to_string(),
            self.winner_color.to_string(),
            self.winner_name.clone(),
            self.turns_played.to_string(),
        ]
    }
}

/// Win/loss/tie tally for one strategy
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Standing {
    pub name: String,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
}

impl Standing {
    pub fn games_played(&self) -> u32 {
        self.wins + self.losses + self.ties
    }

    /// Wins plus half the ties
    pub fn score(&self) -> f32 {
        self.wins as f32 + 0.5 * self.ties as f32
    }
}

/// Everything a simulation run produced
#[derive(Clone, Debug, Default, Serialize)]
pub struct SimulationReport {
    /// Finished games, sorted by configuration
    pub records: Vec<GameRecord>,
    /// Descriptions of sessions that failed and produced no record
    pub failures: Vec<String>,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl SimulationReport {
    /// Tab-separated table, one header row then one row per game
    pub fn to_table(&self) -> String {
        let mut out = GameRecord::COLUMNS.join("\t");
        out.push('\n');
        for record in &self.records {
            out.push_str(&record.row().join("\t"));
            out.push('\n');
        }
        out
    }

    /// Per-strategy tallies, best score first
    pub fn standings(&self) -> Vec<Standing> {
        let mut by_name: BTreeMap<&str, Standing> = BTreeMap::new();
        for record in &self.records {
            for name in [&record.black_player, &record.white_player] {
                by_name.entry(name).or_insert_with(|| Standing {
                    name: name.clone(),
                    ..Standing::default()
                });
            }

            let (winner, loser) = match record.winner_color {
                Winner::Black => (&record.black_player, &record.white_player),
                Winner::White => (&record.white_player, &record.black_player),
                Winner::Tie => {
                    for name in [&record.black_player, &record.white_player] {
                        if let Some(s) = by_name.get_mut(name.as_str()) {
                            s.ties += 1;
                        }
                    }
                    continue;
                }
            };
            if let Some(s) = by_name.get_mut(winner.as_str()) {
                s.wins += 1;
            }
            if let Some(s) = by_name.get_mut(loser.as_str()) {
                s.losses += 1;
            }
        }

        let mut standings: Vec<Standing> = by_name.into_values().collect();
        standings.sort_by(|a, b| b.score().total_cmp(&a.score()).then_with(|| a.name.cmp(&b.name)));
        standings
    }

    /// Write the report as pretty JSON
    pub fn write_json(&self, path: &Path) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self).context("Failed to serialize report")?;
        std::fs::write(path, content).with_context(|| format!("Failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Write the tab-separated table
    pub fn write_table(&self, path: &Path) -> anyhow::Result<()> {
        std::fs::write(path, self.to_table()).with_context(|| format!("Failed to write table to {}", path.display()))?;
        Ok(())
    }
}

/// `base` if it is absent or writable, otherwise the first writable `<stem>_<n>.<ext>`
pub fn writable_report_path(base: &Path) -> PathBuf {
    let mut candidate = base.to_path_buf();
    let mut index = 1u32;
    while !is_writable(&candidate) {
        candidate = numbered(base, index);
        index += 1;
    }
    candidate
}

fn is_writable(path: &Path) -> bool {
    !path.exists() || OpenOptions::new().append(true).open(path).is_ok()
}

fn numbered(base: &Path, index: u32) -> PathBuf {
    let stem = base.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    let name = match base.extension() {
        Some(ext) => format!("{}_{}.{}", stem, index, ext.to_string_lossy()),
        None => format!("{}_{}", stem, index),
    };
    base.with_file_name(name)
}
