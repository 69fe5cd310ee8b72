//! Time-bounded iterative-deepening alpha-beta search

use std::time::{Duration, Instant};

use crate::board::{Board, Color};
use crate::eval::{Evaluator, Score, WIN_VALUE};
use crate::game::{has_lost, successors, Move};
use crate::tt::{Bound, TranspositionTable, TtEntry};

// ============================================================================
// CONSTANTS
// ============================================================================

/// Hard ply cap when the clock allows more
const DEFAULT_MAX_DEPTH: u32 = 64;

/// Share of the time limit (percent) that must remain before another depth starts
const DEFAULT_SAFETY_MARGIN_PERCENT: u32 = 10;

/// Nodes between clock checks
const NODE_CHECK_INTERVAL: u64 = 256;

const INFINITY: Score = WIN_VALUE * 2;

/// Scores at least this large are forced wins or losses
const DECISIVE: Score = WIN_VALUE - 1_000;

/// Evaluator output is clamped to this magnitude so it never reads as decisive
pub const EVAL_LIMIT: Score = DECISIVE - 1;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchConfig {
    /// Deepest iteration attempted, in plies
    pub max_depth: u32,
    pub safety_margin_percent: u32,
    /// Fixed depth for the first move of a game
    pub opening_depth: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            safety_margin_percent: DEFAULT_SAFETY_MARGIN_PERCENT,
            opening_depth: 1,
        }
    }
}

impl SearchConfig {
    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    pub fn with_opening_depth(mut self, opening_depth: u32) -> Self {
        self.opening_depth = opening_depth.max(1);
        self
    }

    pub fn with_safety_margin_percent(mut self, percent: u32) -> Self {
        self.safety_margin_percent = percent.min(100);
        self
    }
}

/// Outcome of one search call
#[derive(Clone, Debug, PartialEq)]
pub struct SearchResult {
    /// `None` when the side to move has no legal move
    pub best_move: Option<Move>,
    pub score: Score,
    /// Deepest fully completed iteration
    pub depth: u32,
    pub nodes: u64,
    pub elapsed: Duration,
}

impl SearchResult {
    fn no_move(elapsed: Duration) -> Self {
        Self {
            best_move: None,
            score: -WIN_VALUE,
            depth: 0,
            nodes: 0,
            elapsed,
        }
    }
}

// ============================================================================
// ALPHA-BETA AI
// ============================================================================

/// Alpha-beta searcher; holds configuration only, all per-game state is passed in
#[derive(Clone, Debug, Default)]
pub struct AlphaBetaAI {
    pub config: SearchConfig,
}

impl AlphaBetaAI {
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    /// Choose a move for `side`
    ///
    /// Iterative deepening runs until `time_limit_ms` is spent, the depth cap
    /// or turn horizon is reached, or the game is decided. Only fully
    /// completed depths count; an iteration cut off by the clock is thrown
    /// away. Depth 1 always runs to completion so a legal move is returned
    /// whenever one exists.
    ///
    /// With `is_first_move` a shallow fixed-depth opening search runs against
    /// a scratch table and `table` is left untouched.
    #[allow(clippy::too_many_arguments)]
    pub fn search(
        &self,
        board: &Board,
        side: Color,
        time_limit_ms: u64,
        turns_remaining: u32,
        table: &mut TranspositionTable,
        evaluator: &dyn Evaluator,
        is_first_move: bool,
    ) -> SearchResult {
        let start = Instant::now();
        let root: Vec<RootChild> = successors(board, side)
            .into_iter()
            .enumerate()
            .map(|(order, (mv, child))| RootChild { order, mv, child })
            .collect();

        if root.is_empty() {
            tracing::debug!("{} has no legal move", side);
            return SearchResult::no_move(start.elapsed());
        }

        let turns = [turns_remaining; 2];

        if is_first_move {
            let mut scratch = TranspositionTable::new();
            let mut searcher = Searcher::new(&mut scratch, evaluator);
            let depth = self.config.opening_depth.max(1);
            return match searcher.search_root(board, side, depth, &root, turns) {
                Ok(Some(best)) => SearchResult {
                    best_move: Some(best.mv),
                    score: best.score,
                    depth,
                    nodes: searcher.nodes,
                    elapsed: start.elapsed(),
                },
                _ => SearchResult::no_move(start.elapsed()),
            };
        }

        let budget = Duration::from_millis(time_limit_ms);
        let margin = budget * self.config.safety_margin_percent / 100;
        let deadline = start + budget;
        // Past this many plies every line ends on the turn budget
        let horizon = turns_remaining.saturating_mul(2).max(1);

        let mut ordered = root;
        let mut searcher = Searcher::new(table, evaluator);
        let mut completed: Option<SearchResult> = None;

        for depth in 1..=self.config.max_depth.max(1) {
            if completed.is_some() {
                if start.elapsed() + margin >= budget {
                    break;
                }
                searcher.deadline = Some(deadline);
            }

            match searcher.search_root(board, side, depth, &ordered, turns) {
                Ok(Some(best)) => {
                    tracing::debug!(
                        "{} depth {} complete: {} score={} nodes={} elapsed={:?}",
                        side,
                        depth,
                        best.mv,
                        best.score,
                        searcher.nodes,
                        start.elapsed()
                    );

                    // Search the previous best first next time round
                    if let Some(pos) = ordered.iter().position(|c| c.order == best.order) {
                        let first = ordered.remove(pos);
                        ordered.insert(0, first);
                    }

                    completed = Some(SearchResult {
                        best_move: Some(best.mv),
                        score: best.score,
                        depth,
                        nodes: searcher.nodes,
                        elapsed: start.elapsed(),
                    });

                    if best.score.abs() >= DECISIVE || depth >= horizon {
                        break;
                    }
                }
                Ok(None) => break,
                Err(Aborted) => {
                    tracing::debug!("{} depth {} abandoned at the time limit", side, depth);
                    break;
                }
            }
        }

        match completed {
            Some(mut result) => {
                result.nodes = searcher.nodes;
                result.elapsed = start.elapsed();
                result
            }
            None => SearchResult::no_move(start.elapsed()),
        }
    }
}

// ============================================================================
// NEGAMAX WITH ALPHA-BETA
// ============================================================================

/// The clock ran out inside an iteration
struct Aborted;

struct RootChild {
    /// Position in move enumeration order, used for tie-breaks
    order: usize,
    mv: Move,
    child: Board,
}

struct RootBest {
    order: usize,
    mv: Move,
    score: Score,
}

struct Searcher<'a> {
    table: &'a mut TranspositionTable,
    evaluator: &'a dyn Evaluator,
    deadline: Option<Instant>,
    nodes: u64,
}

impl<'a> Searcher<'a> {
    fn new(table: &'a mut TranspositionTable, evaluator: &'a dyn Evaluator) -> Self {
        Self {
            table,
            evaluator,
            deadline: None,
            nodes: 0,
        }
    }

    fn out_of_time(&self) -> bool {
        self.nodes % NODE_CHECK_INTERVAL == 0 && self.past_deadline()
    }

    fn past_deadline(&self) -> bool {
        self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }

    fn evaluate(&self, board: &Board, side: Color) -> Score {
        self.evaluator.score(board, side).clamp(-EVAL_LIMIT, EVAL_LIMIT)
    }

    /// Full-width root pass; ties go to the earliest move in enumeration order
    fn search_root(
        &mut self,
        board: &Board,
        side: Color,
        depth: u32,
        children: &[RootChild],
        turns: [u32; 2],
    ) -> Result<Option<RootBest>, Aborted> {
        self.nodes += 1;
        let mut next_turns = turns;
        next_turns[side.index()] = next_turns[side.index()].saturating_sub(1);

        let mut best: Option<RootBest> = None;
        for c in children {
            if self.past_deadline() {
                return Err(Aborted);
            }

            // A move earlier in enumeration order wins ties, so it needs an
            // exact answer for a score equal to the current best
            let floor = match &best {
                None => -INFINITY,
                Some(b) if c.order < b.order => b.score - 1,
                Some(b) => b.score,
            };

            let score = -self.negamax(&c.child, side.opponent(), depth - 1, -INFINITY, -floor, 1, next_turns)?;

            let better = match &best {
                None => true,
                Some(b) => score > b.score || (score == b.score && c.order < b.order),
            };
            if better {
                best = Some(RootBest {
                    order: c.order,
                    mv: c.mv,
                    score,
                });
            }
        }

        if let Some(b) = &best {
            self.table.store(
                board,
                side,
                TtEntry {
                    best_move: Some(b.mv),
                    score: b.score,
                    depth: clamp_depth(depth),
                    bound: Bound::Exact,
                },
            );
        }
        Ok(best)
    }

    #[allow(clippy::too_many_arguments)]
    fn negamax(
        &mut self,
        board: &Board,
        side: Color,
        depth: u32,
        mut alpha: Score,
        mut beta: Score,
        ply: u32,
        turns: [u32; 2],
    ) -> Result<Score, Aborted> {
        self.nodes += 1;
        if self.out_of_time() {
            return Err(Aborted);
        }

        // Decided games, sooner wins preferred
        match (has_lost(board, side), has_lost(board, side.opponent())) {
            (true, false) => return Ok(-WIN_VALUE + ply as Score),
            (false, true) => return Ok(WIN_VALUE - ply as Score),
            (true, true) => return Ok(self.evaluate(board, side)),
            (false, false) => {}
        }

        if depth == 0 || turns[side.index()] == 0 {
            return Ok(self.evaluate(board, side));
        }

        let alpha_orig = alpha;
        let mut tt_move = None;
        if let Some(entry) = self.table.lookup(board, side) {
            tt_move = entry.best_move;
            if entry.depth as u32 >= depth {
                let score = score_from_table(entry.score, ply);
                match entry.bound {
                    Bound::Exact => return Ok(score),
                    Bound::Lower => alpha = alpha.max(score),
                    Bound::Upper => beta = beta.min(score),
                }
                if alpha >= beta {
                    return Ok(score);
                }
            }
        }

        let mut children = successors(board, side);
        if children.is_empty() {
            return Ok(-WIN_VALUE + ply as Score);
        }

        // Table move first
        if let Some(tt_move) = tt_move {
            if let Some(pos) = children.iter().position(|(mv, _)| *mv == tt_move) {
                children.swap(0, pos);
            }
        }

        let mut next_turns = turns;
        next_turns[side.index()] -= 1;

        let mut best_score = -INFINITY;
        let mut best_move = None;
        for (mv, child) in &children {
            let score = -self.negamax(child, side.opponent(), depth - 1, -beta, -alpha, ply + 1, next_turns)?;
            if score > best_score {
                best_score = score;
                best_move = Some(*mv);
            }
            alpha = alpha.max(score);
            if alpha >= beta {
                break;
            }
        }

        let bound = if best_score <= alpha_orig {
            Bound::Upper
        } else if best_score >= beta {
            Bound::Lower
        } else {
            Bound::Exact
        };
        self.table.store(
            board,
            side,
            TtEntry {
                best_move,
                score: score_to_table(best_score, ply),
                depth: clamp_depth(depth),
                bound,
            },
        );

        Ok(best_score)
    }
}

fn clamp_depth(depth: u32) -> u8 {
    depth.min(u8::MAX as u32) as u8
}

/// Decisive scores are stored as distance from the stored node, not the root
fn score_to_table(score: Score, ply: u32) -> Score {
    if score >= DECISIVE {
        score + ply as Score
    } else if score <= -DECISIVE {
        score - ply as Score
    } else {
        score
    }
}

fn score_from_table(score: Score, ply: u32) -> Score {
    if score >= DECISIVE {
        score - ply as Score
    } else if score <= -DECISIVE {
        score + ply as Score
    } else {
        score
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Coord;
    use crate::eval::Heuristics;
    use crate::game::legal_moves;
    use crate::layout::Layout;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Flat;

    impl Evaluator for Flat {
        fn name(&self) -> &str {
            "flat"
        }

        fn score(&self, _board: &Board, _side: Color) -> Score {
            0
        }
    }

    struct Constant(Score);

    impl Evaluator for Constant {
        fn name(&self) -> &str {
            "constant"
        }

        fn score(&self, _board: &Board, _side: Color) -> Score {
            self.0
        }
    }

    /// Material scoring that sleeps on every call after the first `fast_calls`
    struct SlowAfter {
        fast_calls: usize,
        calls: AtomicUsize,
        delay: Duration,
    }

    impl Evaluator for SlowAfter {
        fn name(&self) -> &str {
            "slow"
        }

        fn score(&self, board: &Board, side: Color) -> Score {
            if self.calls.fetch_add(1, Ordering::Relaxed) >= self.fast_calls {
                std::thread::sleep(self.delay);
            }
            Heuristics::material().score(board, side)
        }
    }

    const PUSH_WIN_BLACK: [u8; 10] = [11, 12, 13, 14, 15, 21, 22, 23, 57, 58];
    const PUSH_WIN_WHITE: [u8; 9] = [59, 99, 98, 97, 96, 95, 89, 88, 87];

    fn board_of(black: &[u8], white: &[u8]) -> Board {
        Board::from_marbles(
            black
                .iter()
                .map(|&r| (Coord::from_raw(r).unwrap(), Color::Black))
                .chain(white.iter().map(|&r| (Coord::from_raw(r).unwrap(), Color::White))),
        )
        .unwrap()
    }

    fn engine(max_depth: u32) -> AlphaBetaAI {
        AlphaBetaAI::new(SearchConfig::default().with_max_depth(max_depth))
    }

    #[test]
    fn test_no_move_signal() {
        let board = board_of(&[], &[55, 56]);
        let mut tt = TranspositionTable::new();
        let result = engine(3).search(&board, Color::Black, 1000, 10, &mut tt, &Heuristics::material(), false);
        assert!(result.best_move.is_none());
    }

    #[test]
    fn test_returns_legal_move() {
        let board = Layout::Standard.board();
        let mut tt = TranspositionTable::new();
        let result = engine(2).search(&board, Color::Black, 10_000, 30, &mut tt, &Heuristics::centrist(), false);
        let mv = result.best_move.unwrap();
        assert!(legal_moves(&board, Color::Black).contains(&mv));
        assert_eq!(result.depth, 2);
    }

    #[test]
    fn test_search_is_deterministic() {
        let board = Layout::BelgianDaisy.board();
        let h = Heuristics::phalanx();
        let mut first_tt = TranspositionTable::new();
        let mut second_tt = TranspositionTable::new();
        let a = engine(2).search(&board, Color::White, 60_000, 30, &mut first_tt, &h, false);
        let b = engine(2).search(&board, Color::White, 60_000, 30, &mut second_tt, &h, false);
        assert_eq!(a.best_move, b.best_move);
        assert_eq!(a.score, b.score);
        assert_eq!(a.depth, b.depth);
    }

    #[test]
    fn test_ties_go_to_first_enumerated_move() {
        let board = Layout::Standard.board();
        let first = legal_moves(&board, Color::Black)[0];
        for depth in 1..=2 {
            let mut tt = TranspositionTable::new();
            let result = engine(depth).search(&board, Color::Black, 60_000, 30, &mut tt, &Flat, false);
            assert_eq!(result.best_move, Some(first), "depth {}", depth);
        }
    }

    #[test]
    fn test_finds_winning_push() {
        let board = board_of(&PUSH_WIN_BLACK, &PUSH_WIN_WHITE);
        let mut tt = TranspositionTable::new();
        let result = engine(4).search(&board, Color::Black, 60_000, 30, &mut tt, &Heuristics::material(), false);

        let mv = result.best_move.unwrap();
        assert_eq!(mv.to_string(), "E7,E8-E");
        assert!(result.score >= DECISIVE);
        // Decided at the first iteration
        assert_eq!(result.depth, 1);
    }

    #[test]
    fn test_prefers_material_gain() {
        let black = [11, 12, 13, 14, 15, 21, 22, 23, 24, 57, 58];
        let white = [59, 99, 98, 97, 96, 95, 89, 88, 87, 86];
        let board = board_of(&black, &white);
        let mut tt = TranspositionTable::new();
        let result = engine(1).search(&board, Color::Black, 60_000, 30, &mut tt, &Heuristics::material(), false);
        assert_eq!(result.best_move.unwrap().to_string(), "E7,E8-E");
    }

    #[test]
    fn test_zero_time_still_completes_depth_one() {
        let board = Layout::GermanDaisy.board();
        let mut tt = TranspositionTable::new();
        let result = AlphaBetaAI::default().search(&board, Color::Black, 0, 30, &mut tt, &Heuristics::material(), false);
        assert!(result.best_move.is_some());
        assert_eq!(result.depth, 1);
    }

    #[test]
    fn test_time_limit_is_respected() {
        let board = Layout::Standard.board();
        let mut tt = TranspositionTable::new();
        let result = AlphaBetaAI::default().search(&board, Color::Black, 200, 30, &mut tt, &Heuristics::pusher(), false);
        assert!(result.best_move.is_some());
        assert!(result.depth >= 1);
        // Depth 1 is unbounded but cheap; deeper iterations stop at the deadline
        assert!(result.elapsed < Duration::from_secs(5), "took {:?}", result.elapsed);
    }

    #[test]
    fn test_table_records_root() {
        let board = Layout::Standard.board();
        let mut tt = TranspositionTable::new();
        let result = engine(2).search(&board, Color::Black, 60_000, 30, &mut tt, &Heuristics::material(), false);
        let entry = tt.lookup(&board, Color::Black).unwrap();
        assert_eq!(entry.best_move, result.best_move);
        assert_eq!(entry.bound, Bound::Exact);
        assert_eq!(entry.depth, 2);
        assert!(tt.len() > 1);
    }

    #[test]
    fn test_warm_table_agrees_with_cold() {
        let board = Layout::Standard.board();
        let h = Heuristics::centrist();
        let mut warm = TranspositionTable::new();
        let cold = engine(2).search(&board, Color::Black, 60_000, 30, &mut warm, &h, false);
        let again = engine(2).search(&board, Color::Black, 60_000, 30, &mut warm, &h, false);
        assert_eq!(cold.best_move, again.best_move);
        assert_eq!(cold.score, again.score);
        assert!(again.nodes < cold.nodes);
    }

    #[test]
    fn test_first_move_leaves_table_alone() {
        let board = Layout::Standard.board();
        let mut tt = TranspositionTable::new();
        let result = engine(4).search(&board, Color::Black, 60_000, 30, &mut tt, &Heuristics::material(), true);
        assert!(result.best_move.is_some());
        assert_eq!(result.depth, 1);
        assert!(tt.is_empty());
    }

    #[test]
    fn test_turn_budget_caps_depth() {
        let board = Layout::Standard.board();
        let mut tt = TranspositionTable::new();
        let result = engine(10).search(&board, Color::Black, 60_000, 1, &mut tt, &Heuristics::material(), false);
        // One move each is a two-ply horizon
        assert!(result.depth <= 2);
        assert!(result.best_move.is_some());
    }

    #[test]
    fn test_aborted_depth_is_discarded() {
        let board = Layout::Standard.board();
        // Depth 1 scores each root move once; everything after that is slow
        let slow = SlowAfter {
            fast_calls: legal_moves(&board, Color::Black).len(),
            calls: AtomicUsize::new(0),
            delay: Duration::from_millis(10),
        };
        let mut tt = TranspositionTable::new();
        let result = engine(4).search(&board, Color::Black, 100, 30, &mut tt, &slow, false);

        let mut plain_tt = TranspositionTable::new();
        let plain = engine(1).search(&board, Color::Black, 60_000, 30, &mut plain_tt, &Heuristics::material(), false);

        assert_eq!(result.depth, 1);
        assert_eq!(result.best_move, plain.best_move);
        assert_eq!(result.score, plain.score);
    }

    #[test]
    fn test_extreme_evaluator_scores_are_clamped() {
        let board = Layout::Standard.board();

        let mut tt = TranspositionTable::new();
        let result = engine(2).search(&board, Color::Black, 60_000, 30, &mut tt, &Constant(Score::MIN), false);
        assert!(result.best_move.is_some());
        assert_eq!(result.depth, 2);
        assert_eq!(result.score, -EVAL_LIMIT);

        // Huge evaluator scores must not end deepening as if the game were won
        let mut tt = TranspositionTable::new();
        let result = engine(3).search(&board, Color::Black, 60_000, 30, &mut tt, &Constant(5_000_000), false);
        assert_eq!(result.depth, 3);
        assert!(result.score.abs() < DECISIVE);
    }

    fn seeded(board: &Board, score: Score, bound: Bound) -> TranspositionTable {
        let mut tt = TranspositionTable::new();
        tt.store(
            board,
            Color::Black,
            TtEntry {
                best_move: None,
                score,
                depth: 8,
                bound,
            },
        );
        tt
    }

    #[test]
    fn test_table_bounds_cut_off() {
        let board = Layout::Standard.board();
        let turns = [30, 30];

        let mut tt = seeded(&board, 500, Bound::Lower);
        let mut searcher = Searcher::new(&mut tt, &Flat);
        let score = searcher.negamax(&board, Color::Black, 2, -INFINITY, 100, 1, turns).ok();
        assert_eq!(score, Some(500));
        assert_eq!(searcher.nodes, 1);

        let mut tt = seeded(&board, -500, Bound::Upper);
        let mut searcher = Searcher::new(&mut tt, &Flat);
        let score = searcher.negamax(&board, Color::Black, 2, -100, INFINITY, 1, turns).ok();
        assert_eq!(score, Some(-500));
        assert_eq!(searcher.nodes, 1);

        // A bound that does not close the window only narrows it
        let mut tt = seeded(&board, 50, Bound::Lower);
        let mut searcher = Searcher::new(&mut tt, &Flat);
        let score = searcher.negamax(&board, Color::Black, 2, -INFINITY, 100, 1, turns).ok();
        assert_eq!(score, Some(0));
        assert!(searcher.nodes > 1);
    }

    #[test]
    fn test_table_move_searched_first() {
        let board = Layout::Standard.board();
        let last = *legal_moves(&board, Color::Black).last().unwrap();
        let mut tt = TranspositionTable::new();
        tt.store(
            &board,
            Color::Black,
            TtEntry {
                best_move: Some(last),
                score: 0,
                depth: 0,
                bound: Bound::Exact,
            },
        );

        let mut searcher = Searcher::new(&mut tt, &Flat);
        assert_eq!(searcher.negamax(&board, Color::Black, 1, -INFINITY, INFINITY, 1, [30, 30]).ok(), Some(0));

        // Every move ties under Flat, so the one searched first is kept
        assert_eq!(tt.lookup(&board, Color::Black).unwrap().best_move, Some(last));
    }

    #[test]
    fn test_decisive_scores_stored_relative_to_node() {
        let board = board_of(&PUSH_WIN_BLACK, &PUSH_WIN_WHITE);
        let h = Heuristics::material();
        let mut tt = TranspositionTable::new();

        let mut searcher = Searcher::new(&mut tt, &h);
        let score = searcher.negamax(&board, Color::Black, 1, -INFINITY, INFINITY, 2, [30, 30]).ok();
        assert_eq!(score, Some(WIN_VALUE - 3));
        assert_eq!(tt.lookup(&board, Color::Black).unwrap().score, WIN_VALUE - 1);

        // Reached again deeper in another search: the win is just as far from here
        let mut searcher = Searcher::new(&mut tt, &h);
        let score = searcher.negamax(&board, Color::Black, 1, -INFINITY, INFINITY, 5, [30, 30]).ok();
        assert_eq!(score, Some(WIN_VALUE - 6));
        assert_eq!(searcher.nodes, 1);
    }

    #[test]
    fn test_table_score_conversion() {
        assert_eq!(score_to_table(WIN_VALUE - 7, 4), WIN_VALUE - 3);
        assert_eq!(score_to_table(-WIN_VALUE + 7, 4), -WIN_VALUE + 3);
        assert_eq!(score_to_table(1234, 4), 1234);
        for score in [WIN_VALUE - 9, -WIN_VALUE + 9, -EVAL_LIMIT, 0] {
            assert_eq!(score_from_table(score_to_table(score, 6), 6), score);
        }
    }
}
