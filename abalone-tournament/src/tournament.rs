//! Simulation execution - many games on a worker pool
//!
//! Level 1 - Orchestration

use std::any::Any;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;
use std::time::Instant;

use anyhow::Context;
use rayon::ThreadPoolBuilder;

use crate::config::{Matchup, SimulationConfig};
use crate::game_runner::{run_session, SessionError};
use crate::report::{GameRecord, SimulationReport};

/// Sessions that share table files, with their position in configuration order
type SessionGroup = Vec<(usize, Matchup)>;

// ============================================================================
// Level 1 - Orchestration
// ============================================================================

/// Run every game of the configuration and collect the results
///
/// Games that touch the same table files run one after another inside a
/// single job so tables carry over between them; unrelated jobs run in
/// parallel. A failing or panicking game is logged and listed in
/// `failures` without affecting the others. A configuration whose
/// strategies would share table files is rejected before any game starts.
pub fn run_simulation(config: &SimulationConfig) -> anyhow::Result<SimulationReport> {
    config.validate()?;
    let start = Instant::now();
    let groups = group_by_tables(config.matchups());
    let total: usize = groups.iter().map(Vec::len).sum();

    if let Err(e) = std::fs::create_dir_all(&config.table_dir) {
        tracing::warn!(
            "Cannot create table directory {}: {} (tables will not persist)",
            config.table_dir.display(),
            e
        );
    }

    let mut builder = ThreadPoolBuilder::new().thread_name(|i| format!("abalone-session-{}", i));
    if let Some(workers) = config.workers {
        builder = builder.num_threads(workers);
    }
    let pool = builder.build().context("Failed to build session thread pool")?;

    tracing::info!(
        "Running {} games in {} jobs on {} threads",
        total,
        groups.len(),
        pool.current_num_threads()
    );

    let (tx, rx) = mpsc::channel::<(usize, Result<GameRecord, SessionError>)>();
    pool.scope(|scope| {
        for group in &groups {
            let tx = tx.clone();
            scope.spawn(move |_| {
                for (index, matchup) in group {
                    let result = guarded_session(matchup, config);
                    if tx.send((*index, result)).is_err() {
                        tracing::warn!("Result channel closed, dropping {}", matchup.label());
                    }
                }
            });
        }
    });
    drop(tx);

    let mut results: Vec<_> = rx.into_iter().collect();
    results.sort_by_key(|(index, _)| *index);

    let mut report = SimulationReport::default();
    for (_, result) in results {
        match result {
            Ok(record) => report.records.push(record),
            Err(e) => report.failures.push(e.to_string()),
        }
    }
    report.elapsed = start.elapsed();

    tracing::info!(
        "Simulation finished: {} games, {} failed, {:.1}s",
        report.records.len(),
        report.failures.len(),
        report.elapsed.as_secs_f64()
    );
    Ok(report)
}

// ============================================================================
// Level 4 - Utilities
// ============================================================================

/// Split matchups into jobs; sessions sharing table files stay in one job, in order
fn group_by_tables(matchups: Vec<Matchup>) -> Vec<SessionGroup> {
    let mut groups: BTreeMap<_, SessionGroup> = BTreeMap::new();
    for (index, matchup) in matchups.into_iter().enumerate() {
        groups.entry(matchup.table_group()).or_default().push((index, matchup));
    }
    groups.into_values().collect()
}

/// Run a session, turning a panic into a session error
fn guarded_session(matchup: &Matchup, config: &SimulationConfig) -> Result<GameRecord, SessionError> {
    catch_unwind(AssertUnwindSafe(|| run_session(matchup, config))).unwrap_or_else(|payload| {
        let err = SessionError::Panicked {
            matchup: matchup.label(),
            message: panic_message(payload.as_ref()),
        };
        tracing::error!("{}", err);
        Err(err)
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
