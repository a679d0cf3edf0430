// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

mod common;

use common::Mixed;
use std::sync::Arc;
use test_log::test;
use tier_solver::analysis::stats;
use tier_solver::api::Regular;
use tier_solver::{Config, SolveOptions, TierManager, Value};

#[test]
fn analysis_is_persisted_and_reloadable() -> tier_solver::Result<()> {
    let folder = tempfile::tempdir()?;

    let db = Config::new(folder.path(), "fixture", 0).block_size(1_024).open()?;
    let mut manager = TierManager::new(db, Arc::new(Regular::new(Mixed)));

    manager.solve_all(SolveOptions {
        analyze: true,
        ..SolveOptions::default()
    })?;

    let analysis = stats::load_analysis(manager.database(), 0)?;

    assert_eq!(0, analysis.tier);
    assert_eq!(14, analysis.tier_size);
    assert_eq!(14, analysis.legal_count);

    // 0, 6, 8, 13 win; 2, 7, 10 lose; 1, 3, 9, 11 tie; 4, 5, 12 draw
    assert_eq!(4, analysis.canonical.count(Value::Win));
    assert_eq!(3, analysis.canonical.count(Value::Lose));
    assert_eq!(4, analysis.canonical.count(Value::Tie));
    assert_eq!(3, analysis.canonical.count(Value::Draw));

    assert_eq!(Some(3), analysis.canonical.max_remoteness(Value::Win));
    assert_eq!(Some(2), analysis.canonical.max_remoteness(Value::Lose));

    // Positions 8 and 13 are the two wins at remoteness 3
    assert_eq!(2, analysis.canonical.count_at(Value::Win, 3));
    assert_eq!(Some(8), analysis.canonical.example(Value::Win, 3));

    assert!(analysis.branching_factor() > 0.0);
    assert!((analysis.hash_efficiency() - 1.0).abs() < f64::EPSILON);

    Ok(())
}

#[test]
fn discovery_maps_mark_the_reachable_part() -> tier_solver::Result<()> {
    let folder = tempfile::tempdir()?;

    let db = Config::new(folder.path(), "fixture", 0).block_size(1_024).open()?;
    let mut manager = TierManager::new(db, Arc::new(Regular::new(Mixed)));

    manager.solve_all(SolveOptions::default())?;
    manager.discover()?;

    let map = stats::load_map(manager.database(), 0)?;

    // Only 0 and its two terminal children are reachable from 0
    assert_eq!(14, map.len());
    assert_eq!(3, map.count_ones());
    assert!(map.get(0));
    assert!(map.get(1));
    assert!(map.get(2));
    assert!(!map.get(8));

    Ok(())
}
