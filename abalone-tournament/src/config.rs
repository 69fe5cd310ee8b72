//! Configuration types for simulation runs
//!
//! Level 4 - Utilities and configuration

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::bail;

use abalone_core::{Color, Heuristics, Layout, SearchConfig};

/// Turns each side may take in the stock run
pub const DEFAULT_TURN_LIMIT: u32 = 30;

/// Thinking time per move in the stock run
pub const DEFAULT_TIME_LIMIT_MS: u64 = 5000;

/// Default directory for transposition table files
pub const DEFAULT_TABLE_DIR: &str = "tables";

/// Simulation configuration
///
/// One game is played per element of
/// layouts × turn limits × time limits × ordered strategy pairs,
/// skipping a strategy paired with itself.
#[derive(Clone, Debug)]
pub struct SimulationConfig {
    pub layouts: Vec<Layout>,
    pub turn_limits: Vec<u32>,
    pub time_limits_ms: Vec<u64>,
    /// Competing evaluation strategies
    pub strategies: Vec<Heuristics>,
    /// Where transposition tables are loaded from and saved to
    pub table_dir: PathBuf,
    /// Entry cap per table (None = unbounded)
    pub table_capacity: Option<usize>,
    /// Worker threads (None = one per core)
    pub workers: Option<usize>,
    /// Search settings shared by every game
    pub search: SearchConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            layouts: Layout::ALL.to_vec(),
            turn_limits: vec![DEFAULT_TURN_LIMIT],
            time_limits_ms: vec![DEFAULT_TIME_LIMIT_MS],
            strategies: Heuristics::presets(),
            table_dir: PathBuf::from(DEFAULT_TABLE_DIR),
            table_capacity: None,
            workers: None,
            search: SearchConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn with_layouts(mut self, layouts: Vec<Layout>) -> Self {
        self.layouts = layouts;
        self
    }

    pub fn with_turn_limits(mut self, turn_limits: Vec<u32>) -> Self {
        self.turn_limits = turn_limits;
        self
    }

    pub fn with_time_limits(mut self, time_limits_ms: Vec<u64>) -> Self {
        self.time_limits_ms = time_limits_ms;
        self
    }

    pub fn with_strategies(mut self, strategies: Vec<Heuristics>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn with_table_dir(mut self, table_dir: impl Into<PathBuf>) -> Self {
        self.table_dir = table_dir.into();
        self
    }

    pub fn with_table_capacity(mut self, capacity: usize) -> Self {
        self.table_capacity = Some(capacity);
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers.max(1));
        self
    }

    pub fn with_search(mut self, search: SearchConfig) -> Self {
        self.search = search;
        self
    }

    /// Reject strategy sets whose table files or report rows would collide
    ///
    /// Each strategy must reduce to a distinct file-safe name, and names may
    /// not be empty or contain control characters.
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut seen: HashMap<String, &str> = HashMap::new();
        for strategy in &self.strategies {
            let name = strategy.name.as_str();
            if name.trim().is_empty() {
                bail!("strategy name is empty");
            }
            if name.chars().any(char::is_control) {
                bail!("strategy name {:?} contains control characters", name);
            }
            if let Some(other) = seen.insert(file_safe(name), name) {
                bail!("strategies '{}' and '{}' would share table files", other, name);
            }
        }
        Ok(())
    }

    /// Every game of the run, in configuration order
    pub fn matchups(&self) -> Vec<Matchup> {
        let mut matchups = Vec::new();
        for &layout in &self.layouts {
            for &turn_limit in &self.turn_limits {
                for &time_limit_ms in &self.time_limits_ms {
                    for (i, black) in self.strategies.iter().enumerate() {
                        for (j, white) in self.strategies.iter().enumerate() {
                            if i == j {
                                continue;
                            }
                            matchups.push(Matchup {
                                black: black.clone(),
                                white: white.clone(),
                                layout,
                                turn_limit,
                                time_limit_ms,
                            });
                        }
                    }
                }
            }
        }
        matchups
    }
}

/// One game's settings
#[derive(Clone, Debug, PartialEq)]
pub struct Matchup {
    pub black: Heuristics,
    pub white: Heuristics,
    pub layout: Layout,
    pub turn_limit: u32,
    pub time_limit_ms: u64,
}

impl Matchup {
    pub fn strategy(&self, color: Color) -> &Heuristics {
        match color {
            Color::Black => &self.black,
            Color::White => &self.white,
        }
    }

    /// Short description for logs and errors
    pub fn label(&self) -> String {
        format!(
            "{} (black) vs {} (white), {}, {} turns, {} ms",
            self.black.name, self.white.name, self.layout, self.turn_limit, self.time_limit_ms
        )
    }

    /// Table file used by `color`: `<own>_vs_<opponent>_<layout>_<time>ms.tt`
    pub fn table_file(&self, color: Color) -> String {
        let own = self.strategy(color);
        let opponent = self.strategy(color.opponent());
        format!(
            "{}_vs_{}_{}_{}ms.tt",
            file_safe(&own.name),
            file_safe(&opponent.name),
            self.layout.slug(),
            self.time_limit_ms
        )
    }

    pub fn table_path(&self, dir: &Path, color: Color) -> PathBuf {
        dir.join(self.table_file(color))
    }

    /// Games with equal keys read and write the same two table files
    pub fn table_group(&self) -> (String, String, Layout, u64) {
        let mut names = [file_safe(&self.black.name), file_safe(&self.white.name)];
        names.sort();
        let [first, second] = names;
        (first, second, self.layout, self.time_limit_ms)
    }
}

/// Strategy names reduced to characters safe in file names
fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '-' })
        .collect()
}
