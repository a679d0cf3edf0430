// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

mod common;

use common::{WideImmediate, WIDE_IMMEDIATE_EXPECTED};
use std::sync::Arc;
use test_log::test;
use tier_solver::{Config, Remoteness, SolveOptions, TierManager, TierPosition, Value};

fn solve_with_budget(budget: Option<u64>) -> tier_solver::Result<Vec<(Value, Remoteness)>> {
    let folder = tempfile::tempdir()?;

    let mut config = Config::new(folder.path(), "fixture", 0).block_size(1_024);

    if let Some(bytes) = budget {
        config = config.memory_budget(bytes);
    }

    let db = config.open()?;
    let mut manager = TierManager::new(db, Arc::new(WideImmediate));
    manager.solve_all(SolveOptions::default())?;

    let db = manager.into_database();
    let mut probe = db.probe_init();

    (0..5)
        .map(|position| {
            let tp = TierPosition::new(3, position);

            Ok((
                db.probe_value(&mut probe, tp)?,
                db.probe_remoteness(&mut probe, tp)?,
            ))
        })
        .collect()
}

/// The child tiers weigh 96, 64 and 32 bytes of records; squeezing the
/// memory budget splits their loading into rounds, and the result must
/// not depend on how many rounds it took.
#[test]
fn budgeted_rounds_match_the_single_round_solve() -> tier_solver::Result<()> {
    // Default budget: all three children load in one round
    let unbounded = solve_with_budget(None)?;
    assert_eq!(WIDE_IMMEDIATE_EXPECTED.to_vec(), unbounded);

    // 100 bytes: the largest child loads alone, the other two share a
    // second round
    assert_eq!(unbounded, solve_with_budget(Some(100))?);

    // 50 bytes: below every single child; the first two rounds each
    // fall back to loading one over-budget tier
    assert_eq!(unbounded, solve_with_budget(Some(50))?);

    Ok(())
}
