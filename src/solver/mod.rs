// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The per-tier solving algorithms and the tier manager that drives
//! them.
//!
//! Each algorithm implements [`TierWorker`]; the manager picks one per
//! tier based on the tier's declared internal structure and the
//! configured loopy solver.

/// Tracks discovered positions and their remoteness at the frontier of a tier solve.
pub mod frontier;
/// Solver for tiers whose canonical positions have no child tiers.
pub mod immediate;
/// Backward-induction solver driven by reference counts on child positions.
pub mod induction;
/// Iterative solver for loopy tiers, repeating passes until fixpoint.
pub mod iteration;
/// The tier manager that drives the solving algorithms.
pub mod manager;
pub mod remote;
/// The reverse dependency graph between positions of adjacent tiers.
pub mod reverse_graph;

pub use manager::TierManager;

use crate::api::TierGame;
use crate::fail_signal::FailSignal;
use crate::{Database, Tier};
use enum_dispatch::enum_dispatch;
use rustc_hash::FxHashSet;

use immediate::ImmediateSolver;
use induction::InductionSolver;
use iteration::IterationSolver;

/// Per-run solve options.
#[derive(Copy, Clone, Debug, Default)]
pub struct SolveOptions {
    /// Re-solve tiers whose tier files already validate
    pub force: bool,

    /// Re-solve already-solved tiers in memory and check every record
    /// against the stored file, failing on any discrepancy
    pub compare: bool,

    /// Walk each solved tier and persist its analysis
    pub analyze: bool,

    /// 0 = warnings only, 1 = per-tier progress, 2 = per-phase detail
    pub verbosity: u8,
}

/// What happened to one tier.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TierResult {
    /// The tier was solved (or re-solved) in this run
    Solved,

    /// A valid tier file already existed; nothing was done
    Loaded,

    /// The stored tier file matched the re-solve (compare mode)
    Compared,
}

/// Everything a per-tier worker needs.
///
/// Workers load and unload child tiers through the database on the
/// control thread; record arrays cross into worker threads only as
/// [`std::sync::Arc`]s.
pub struct SolveContext<'a> {
    /// The game being solved
    pub game: &'a dyn TierGame,

    /// The database holding the solving tier and loaded children
    pub db: &'a mut Database,

    /// The tier under solve
    pub tier: Tier,

    /// Its position count
    pub size: u64,

    /// Fail-fast flag shared by worker threads
    pub fail: FailSignal,
}

/// One per-tier solving algorithm.
#[enum_dispatch]
pub trait TierWorker {
    /// Populates the solving tier's record array.
    ///
    /// The solving tier is already created; flushing is the manager's
    /// job.
    fn solve_tier(&self, cx: &mut SolveContext<'_>) -> crate::Result<()>;
}

/// The algorithm chosen for one tier.
#[enum_dispatch(TierWorker)]
pub enum AnyWorker {
    /// Acyclic tiers whose moves all exit
    ImmediateSolver,

    /// Frontier-based backward induction
    InductionSolver,

    /// Fixed-point value iteration
    IterationSolver,
}

/// Canonical child tiers of `tier`, deduplicated, excluding `tier`
/// itself, in first-seen order.
#[must_use]
pub fn canonical_child_tiers(game: &dyn TierGame, tier: Tier) -> Vec<Tier> {
    let mut seen = FxHashSet::default();
    let mut out = Vec::new();

    for child in game.child_tiers(tier) {
        let child = game.canonical_tier(child);

        if child != tier && seen.insert(child) {
            out.push(child);
        }
    }

    out
}

/// Loads every canonical child tier of the solve.
///
/// Children are bounded by the database's loaded-tier cap; tiers the
/// backward-induction and value-iteration solvers work on keep all
/// children resident for the whole solve.
pub fn load_all_children(cx: &mut SolveContext<'_>) -> crate::Result<Vec<Tier>> {
    let children = canonical_child_tiers(cx.game, cx.tier);

    for &child in &children {
        cx.db.load_tier(child, cx.game.tier_size(child))?;
    }

    Ok(children)
}
