// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

mod common;

use common::{solve, ttt_encode, TicTacToe};
use std::sync::Arc;
use test_log::test;
use tier_solver::api::{is_canonical_legal, TierGame};
use tier_solver::{
    Config, LoopySolver, SolveOptions, TierManager, TierPosition, TierResult, Value,
};

#[test]
fn tictactoe_solves_to_the_known_result() -> tier_solver::Result<()> {
    let folder = tempfile::tempdir()?;

    let (db, results) = solve(
        Arc::new(TicTacToe {
            with_parents: false,
        }),
        folder.path(),
        LoopySolver::BackwardInduction,
    )?;

    assert_eq!(10, results.len());
    assert!(results.iter().all(|(_, r)| *r == TierResult::Solved));

    let mut probe = db.probe_init();

    // The empty board is a tie in 9 plies
    assert_eq!(
        Value::Tie,
        db.probe_value(&mut probe, TierPosition::new(0, 0))?,
    );
    assert_eq!(9, db.probe_remoteness(&mut probe, TierPosition::new(0, 0))?);

    // X completed the top row; the player to move has lost
    let terminal = TierPosition::new(5, ttt_encode([1, 1, 1, 2, 2, 0, 0, 0, 0]));
    assert_eq!(Value::Lose, db.probe_value(&mut probe, terminal)?);
    assert_eq!(0, db.probe_remoteness(&mut probe, terminal)?);

    // A full board without a line is a tie at remoteness 0
    let full = TierPosition::new(9, ttt_encode([1, 2, 1, 1, 2, 2, 2, 1, 1]));
    assert_eq!(Value::Tie, db.probe_value(&mut probe, full)?);
    assert_eq!(0, db.probe_remoteness(&mut probe, full)?);

    // Tier files carry the game's naming callback
    assert!(db.tier_path(3).ends_with("records/3-pieces.tier"));
    assert!(db.tier_path(3).exists());

    Ok(())
}

/// Every canonical legal position satisfies the closure invariant:
/// a Win has a Lose child one ply nearer, a Lose has only Win children
/// with the deepest at one ply nearer, a Tie has no Lose child and a
/// Tie child one ply nearer.
#[test]
fn tictactoe_closure_invariant() -> tier_solver::Result<()> {
    let folder = tempfile::tempdir()?;
    let game = TicTacToe {
        with_parents: false,
    };

    let (mut db, _) = solve(
        Arc::new(TicTacToe {
            with_parents: false,
        }),
        folder.path(),
        LoopySolver::BackwardInduction,
    )?;

    for tier in 0..=9 {
        db.load_tier(tier, game.tier_size(tier))?;
    }

    for tier in 0..=9u64 {
        // A deterministic scatter over the tier
        for position in (0..game.tier_size(tier)).step_by(97) {
            let tp = TierPosition::new(tier, position);

            if !is_canonical_legal(&game, tp) || game.primitive(tp).is_decided() {
                continue;
            }

            let record = db.get_record_from_loaded(tp)?;

            let children: Vec<_> = game
                .canonical_child_positions(tp)
                .into_iter()
                .map(|child| db.get_record_from_loaded(child))
                .collect::<tier_solver::Result<_>>()?;

            match record.value {
                Value::Win => {
                    assert!(
                        children.iter().any(|c| {
                            c.value == Value::Lose && c.remoteness == record.remoteness - 1
                        }),
                        "{tp} is {record} without a matching Lose child",
                    );
                }
                Value::Lose => {
                    assert!(
                        children.iter().all(|c| c.value == Value::Win),
                        "{tp} is {record} with a non-Win child",
                    );
                    assert_eq!(
                        record.remoteness - 1,
                        children.iter().map(|c| c.remoteness).max().unwrap(),
                        "{tp} is {record} but its deepest Win child disagrees",
                    );
                }
                Value::Tie => {
                    assert!(
                        children.iter().all(|c| c.value != Value::Lose),
                        "{tp} is {record} with a Lose child",
                    );
                    assert!(
                        children.iter().any(|c| {
                            c.value == Value::Tie && c.remoteness == record.remoteness - 1
                        }),
                        "{tp} is {record} without a matching Tie child",
                    );
                }
                value => panic!("{tp} solved to {value} in tic-tac-toe"),
            }
        }
    }

    Ok(())
}

#[test]
fn tictactoe_resolve_is_idempotent() -> tier_solver::Result<()> {
    let folder = tempfile::tempdir()?;
    let game = || {
        Arc::new(TicTacToe {
            with_parents: false,
        })
    };

    let (db, _) = solve(game(), folder.path(), LoopySolver::BackwardInduction)?;
    let stored = std::fs::read(db.tier_path(0))?;
    drop(db);

    // Second run: nothing to do, files untouched
    let db = Config::new(folder.path(), "fixture", 0).open()?;
    let mut manager = TierManager::new(db, game());
    let results = manager.solve_all(SolveOptions::default())?;

    assert!(results.iter().all(|(_, r)| *r == TierResult::Loaded));
    assert_eq!(stored, std::fs::read(manager.database().tier_path(0))?);

    // Compare mode: re-solve in memory and check against the files
    let results = manager.solve_all(SolveOptions {
        compare: true,
        ..SolveOptions::default()
    })?;

    assert!(results.iter().all(|(_, r)| *r == TierResult::Compared));
    assert_eq!(stored, std::fs::read(manager.database().tier_path(0))?);

    Ok(())
}
