// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::{
    canonical_child_tiers, immediate::ImmediateSolver, induction::InductionSolver,
    iteration::IterationSolver, AnyWorker, SolveContext, SolveOptions, TierResult, TierWorker,
};
use crate::api::TierGame;
use crate::config::LoopySolver;
use crate::db::TierStatus;
use crate::fail_signal::FailSignal;
use crate::{Database, Tier, TierType};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::sync::Arc;

/// How many compare-mode discrepancies are reported before giving up.
const MAX_REPORTED_DISCREPANCIES: usize = 10;

/// Forward-BFSes the canonical tier graph from the initial tier, then
/// Kahn-orders it children-first.
///
/// Returns the order and the child adjacency used to build it.
pub(crate) fn discover_tier_graph(
    game: &dyn TierGame,
) -> crate::Result<(Vec<Tier>, FxHashMap<Tier, Vec<Tier>>)> {
    let initial = game.canonical_tier(game.initial_tier());

    let mut discovered: FxHashSet<Tier> = FxHashSet::default();
    let mut children_of: FxHashMap<Tier, Vec<Tier>> = FxHashMap::default();
    let mut queue = VecDeque::from([initial]);
    discovered.insert(initial);

    while let Some(tier) = queue.pop_front() {
        let children = canonical_child_tiers(game, tier);

        for &child in &children {
            if discovered.insert(child) {
                queue.push_back(child);
            }
        }

        children_of.insert(tier, children);
    }

    // Kahn, counting unsolved children; a tier is ready once all its
    // children are ordered
    let mut blockers: FxHashMap<Tier, usize> = children_of
        .iter()
        .map(|(&tier, children)| (tier, children.len()))
        .collect();

    let mut parents_of: FxHashMap<Tier, Vec<Tier>> = FxHashMap::default();

    for (&tier, children) in &children_of {
        for &child in children {
            parents_of.entry(child).or_default().push(tier);
        }
    }

    let mut ready: VecDeque<Tier> = blockers
        .iter()
        .filter(|(_, &count)| count == 0)
        .map(|(&tier, _)| tier)
        .collect();

    let mut order = Vec::with_capacity(discovered.len());

    while let Some(tier) = ready.pop_front() {
        order.push(tier);

        for &parent in parents_of.get(&tier).map_or(&[][..], Vec::as_slice) {
            #[allow(clippy::expect_used)]
            let count = blockers.get_mut(&parent).expect("parent was discovered");
            *count -= 1;

            if *count == 0 {
                ready.push_back(parent);
            }
        }
    }

    if order.len() != discovered.len() {
        #[allow(clippy::expect_used)]
        let stuck = blockers
            .iter()
            .find(|(_, &count)| count > 0)
            .map(|(&tier, _)| tier)
            .expect("some tier must be stuck");

        return Err(crate::Error::Runtime(format!(
            "tier graph has a cycle through tier {stuck}",
        )));
    }

    Ok((order, children_of))
}

/// Drives a whole solve: discovers the reachable tier graph, orders it
/// children-first, and dispatches each tier to the right algorithm.
pub struct TierManager {
    db: Database,
    game: Arc<dyn TierGame>,
}

impl TierManager {
    /// Couples a database with a game.
    ///
    /// Installs the game's tier naming callback into the database.
    #[must_use]
    pub fn new(mut db: Database, game: Arc<dyn TierGame>) -> Self {
        let namer_game = Arc::clone(&game);

        db.set_namer(Box::new(move |tier| {
            namer_game
                .tier_name(tier)
                .unwrap_or_else(|| tier.to_string())
        }));

        Self { db, game }
    }

    /// The underlying database, for probe-time queries.
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Mutable access to the underlying database.
    pub fn database_mut(&mut self) -> &mut Database {
        &mut self.db
    }

    /// Tears down the manager, handing the database back.
    #[must_use]
    pub fn into_database(self) -> Database {
        self.db
    }

    /// All canonical tiers reachable from the initial tier, in a
    /// children-first topological order.
    ///
    /// A cycle among tiers is a contract violation and fails the solve.
    pub fn solve_order(&self) -> crate::Result<Vec<Tier>> {
        let (order, _) = discover_tier_graph(&*self.game)?;
        Ok(order)
    }

    /// Solves every reachable tier, children first.
    ///
    /// Returns what happened per tier, in solve order.
    pub fn solve_all(&mut self, options: SolveOptions) -> crate::Result<Vec<(Tier, TierResult)>> {
        let order = self.solve_order()?;

        if options.verbosity >= 1 {
            log::info!(
                "solving {} tier(s) with {} thread(s)",
                order.len(),
                self.db.config().thread_count,
            );
        }

        let mut results = Vec::with_capacity(order.len());

        for &tier in &order {
            let result = self.solve_tier(tier, options)?;
            results.push((tier, result));
        }

        Ok(results)
    }

    /// Runs the seed-driven game-API consistency checks over the
    /// reachable tiers.
    pub fn check_api(&self, seed: u64, samples_per_tier: u64) -> crate::Result<()> {
        let order = self.solve_order()?;
        crate::api::consistency::check(&*self.game, &order, seed, samples_per_tier)
    }

    /// Runs the forward discovery pass, persisting one discovery map
    /// per reachable tier.
    pub fn discover(&self) -> crate::Result<()> {
        let order = self.solve_order()?;
        crate::analysis::discovery::run(&self.db, &*self.game, &order)
    }

    /// Solves one tier, assuming its children are already solved.
    pub fn solve_tier(&mut self, tier: Tier, options: SolveOptions) -> crate::Result<TierResult> {
        let size = self.game.tier_size(tier);
        let status = self.db.tier_status(tier, size);

        if status == TierStatus::Solved && !options.force && !options.compare {
            if options.verbosity >= 1 {
                log::info!("tier {tier} is already solved");
            }
            return Ok(TierResult::Loaded);
        }

        let tier_type = self.game.tier_type(tier);

        if options.verbosity >= 1 {
            log::info!("solving tier {tier} ({size} positions, {tier_type})");
        }

        let worker = self.select_worker(tier_type);
        let game = Arc::clone(&self.game);
        let pool = crate::parallel::pool(self.db.config().thread_count)?;

        self.db.create_solving_tier(tier, size)?;

        let mut cx = SolveContext {
            game: &*game,
            db: &mut self.db,
            tier,
            size,
            fail: FailSignal::default(),
        };

        let solved = pool.install(|| worker.solve_tier(&mut cx));

        if let Err(e) = solved {
            log::error!("tier {tier} failed: {e}");
            self.db.free_solving_tier();
            self.db.unload_all();
            return Err(e);
        }

        let finished = if options.compare && status == TierStatus::Solved {
            self.compare_with_stored(tier, size).map(|()| {
                if options.verbosity >= 1 {
                    log::info!("tier {tier}: stored records match the re-solve");
                }
                TierResult::Compared
            })
        } else {
            self.db.flush_solving_tier().map(|()| TierResult::Solved)
        };

        let result = match finished {
            Ok(result) => result,
            Err(e) => {
                self.db.free_solving_tier();
                self.db.unload_all();
                return Err(e);
            }
        };

        if options.analyze {
            let records = self.db.solving_records()?;
            let analysis = crate::analysis::analyze(&*game, tier, &records);
            crate::analysis::stats::save_analysis(&self.db, tier, &analysis)?;

            if options.verbosity >= 2 {
                log::debug!("tier {tier}: {analysis}");
            }
        }

        self.db.free_solving_tier();
        self.db.unload_all();

        Ok(result)
    }

    fn select_worker(&self, tier_type: TierType) -> AnyWorker {
        match tier_type {
            TierType::ImmediateTransition => ImmediateSolver.into(),
            TierType::LoopFree => InductionSolver.into(),
            TierType::Loopy => match self.db.config().loopy_solver {
                LoopySolver::BackwardInduction => InductionSolver.into(),
                LoopySolver::ValueIteration => IterationSolver.into(),
            },
        }
    }

    /// Byte-compares the in-memory re-solve against the stored tier
    /// file, reporting the first discrepancies.
    fn compare_with_stored(&self, tier: Tier, size: u64) -> crate::Result<()> {
        let fresh = self.db.solving_records()?;

        let stored = crate::RecordArray::new(size)?;
        crate::block::TierFile::open(self.db.tier_path(tier))?.read_into(&stored)?;

        let mut discrepancies = 0usize;

        for position in 0..size {
            if fresh.get(position) != stored.get(position) {
                discrepancies += 1;

                log::error!(
                    "tier {tier} position {position}: stored {} but re-solved {}",
                    stored.get(position),
                    fresh.get(position),
                );

                if discrepancies >= MAX_REPORTED_DISCREPANCIES {
                    log::error!("tier {tier}: giving up after {discrepancies} discrepancies");
                    break;
                }
            }
        }

        if discrepancies > 0 {
            return Err(crate::Error::Runtime(format!(
                "tier {tier} comparison found {discrepancies} discrepancies",
            )));
        }

        Ok(())
    }
}
