// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

mod common;

use common::{record_of, solve, Mixed, MIXED_EXPECTED};
use std::sync::Arc;
use test_log::test;
use tier_solver::api::Regular;
use tier_solver::db::CheckpointMeta;
use tier_solver::{Config, LoopySolver, SolveOptions, TierManager, TierResult};

/// A finished solve leaves no stale checkpoint behind.
#[test]
fn checkpoint_is_removed_after_flush() -> tier_solver::Result<()> {
    let folder = tempfile::tempdir()?;

    let (db, _) = solve(
        Arc::new(Regular::new(Mixed)),
        folder.path(),
        LoopySolver::ValueIteration,
    )?;

    assert!(!db.checkpoint_exists(0));

    Ok(())
}

/// A value-iteration solve picks up where a checkpoint left off.
#[test]
fn solve_resumes_from_a_checkpoint() -> tier_solver::Result<()> {
    let folder = tempfile::tempdir()?;

    // First, a reference solve to obtain a late-stage record snapshot
    let (mut db, _) = solve(
        Arc::new(Regular::new(Mixed)),
        folder.path(),
        LoopySolver::ValueIteration,
    )?;

    db.load_tier(0, 14)?;
    let snapshot = db.loaded_records(0).unwrap();

    // Plant it as a checkpoint sitting in the tie-iteration step
    db.checkpoint_save(
        0,
        CheckpointMeta {
            step: 3,
            remoteness: 1,
        },
        &snapshot,
    )?;
    db.unload_tier(0);
    assert!(db.checkpoint_exists(0));
    drop(db);

    // Force a re-solve; it must consume the checkpoint and converge to
    // the same records
    let db = Config::new(folder.path(), "fixture", 0)
        .block_size(1_024)
        .loopy_solver(LoopySolver::ValueIteration)
        .open()?;

    let mut manager = TierManager::new(db, Arc::new(Regular::new(Mixed)));

    let result = manager.solve_tier(
        0,
        SolveOptions {
            force: true,
            ..SolveOptions::default()
        },
    )?;

    assert_eq!(TierResult::Solved, result);

    let db = manager.into_database();
    assert!(!db.checkpoint_exists(0));

    for (position, expected) in MIXED_EXPECTED.iter().enumerate() {
        assert_eq!(*expected, record_of(&db, position as u64)?, "position {position}");
    }

    Ok(())
}
