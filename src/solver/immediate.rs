// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::{canonical_child_tiers, SolveContext, TierWorker};
use crate::api::is_canonical_legal;
use crate::record::{Record, RECORD_WIDTH};
use crate::{RecordArray, Tier, TierPosition, Value};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Raw sentinel for "no child outcome folded in yet".
///
/// Never a valid packed record (the upper bits of a record are zero).
const NO_OUTCOME: u64 = u64::MAX;

/// Solver for tiers whose legal moves all exit into child tiers.
///
/// With no internal edges, every position's record is the negation of
/// the minimum child outcome, and all children are already on disk; a
/// single parallel scan per position suffices.
///
/// Child tiers are loaded largest-first under the memory budget. When
/// they do not all fit, the scan runs in rounds: each round loads a
/// maximal subset, folds its children into a running per-position
/// minimum, and finalizes exactly the positions whose child tiers have
/// all been seen. The fold is monotone, so early finalization is safe.
pub struct ImmediateSolver;

impl TierWorker for ImmediateSolver {
    fn solve_tier(&self, cx: &mut SolveContext<'_>) -> crate::Result<()> {
        let records = cx.db.solving_records()?;

        let mut pending = canonical_child_tiers(cx.game, cx.tier);
        pending.sort_unstable_by_key(|t| std::cmp::Reverse(cx.game.tier_size(*t)));

        // Running minimum child outcome per position, child perspective
        let best: Vec<AtomicU64> = (0..cx.size).map(|_| AtomicU64::new(NO_OUTCOME)).collect();

        let mut processed: FxHashSet<Tier> = FxHashSet::default();
        let budget = cx.db.config().memory_budget;

        let mut round = 0u32;

        while round == 0 || !pending.is_empty() {
            let wave = take_wave(&mut pending, budget, cx);

            log::debug!(
                "tier {}: round {round} loads {} child tier(s), {} pending",
                cx.tier,
                wave.len(),
                pending.len(),
            );

            let mut loaded: FxHashMap<Tier, Arc<RecordArray>> = FxHashMap::default();

            for &child in &wave {
                cx.db.load_tier(child, cx.game.tier_size(child))?;

                #[allow(clippy::expect_used)]
                loaded.insert(
                    child,
                    cx.db.loaded_records(child).expect("tier was just loaded"),
                );

                processed.insert(child);
            }

            scan_round(cx, &records, &best, &loaded, &processed);

            for child in wave {
                cx.db.unload_tier(child);
            }

            if cx.fail.is_failed() {
                return Err(cx.fail.clone().into_error());
            }

            round += 1;
        }

        Ok(())
    }
}

/// Pops the largest-first prefix of `pending` that fits the budget.
///
/// Always takes at least one tier so the solve makes progress, warning
/// when that single tier alone exceeds the budget.
fn take_wave(pending: &mut Vec<Tier>, budget: u64, cx: &SolveContext<'_>) -> Vec<Tier> {
    let mut wave = Vec::new();
    let mut used = 0u64;
    let mut i = 0;

    while i < pending.len() {
        #[allow(clippy::indexing_slicing)]
        let tier = pending[i];
        let bytes = cx.game.tier_size(tier) * RECORD_WIDTH as u64;

        if wave.is_empty() && bytes > budget {
            log::warn!(
                "child tier {tier} alone ({bytes} bytes) exceeds the memory budget ({budget})",
            );
        } else if used + bytes > budget {
            i += 1;
            continue;
        }

        used += bytes;
        wave.push(tier);
        pending.remove(i);
    }

    wave
}

/// One parallel pass over all positions, folding the loaded children
/// into the running minimum and finalizing what can be finalized.
fn scan_round(
    cx: &SolveContext<'_>,
    records: &RecordArray,
    best: &[AtomicU64],
    loaded: &FxHashMap<Tier, Arc<RecordArray>>,
    processed: &FxHashSet<Tier>,
) {
    let game = cx.game;
    let tier = cx.tier;
    let fail = &cx.fail;

    crate::parallel::for_each_chunk(cx.size, crate::parallel::DEFAULT_CHUNK, |range| {
        if fail.is_failed() {
            return;
        }

        'positions: for position in range {
            if records.get_value(position).is_decided() {
                continue;
            }

            let tp = TierPosition::new(tier, position);

            if !is_canonical_legal(game, tp) {
                continue;
            }

            let primitive = game.primitive(tp);
            if primitive.is_decided() {
                records.set(position, Record::new(primitive, 0));
                continue;
            }

            #[allow(clippy::indexing_slicing)]
            let cell = &best[position as usize];
            let mut finalizable = true;

            for child in game.canonical_child_positions(tp) {
                if child.tier == tier {
                    fail.fail(crate::Error::Runtime(format!(
                        "internal move at {tp} in an immediate-transition tier",
                    )));
                    return;
                }

                if let Some(child_records) = loaded.get(&child.tier) {
                    let outcome = child_records.get(child.position);

                    if outcome.value == Value::Undecided {
                        fail.fail(crate::Error::Runtime(format!(
                            "undecided child record at {child}, reached from {tp}",
                        )));
                        return;
                    }

                    // Distinct threads own distinct positions, so the
                    // cell is private here
                    let current = cell.load(Ordering::Relaxed);

                    #[allow(clippy::expect_used)]
                    if current == NO_OUTCOME
                        || outcome.cmp_for_mover(
                            &Record::try_from_raw(current).expect("cell holds an encoded record"),
                        ) == std::cmp::Ordering::Less
                    {
                        cell.store(outcome.to_raw(), Ordering::Relaxed);
                    }
                } else if !processed.contains(&child.tier) {
                    // Folded in a later round
                    finalizable = false;
                }
            }

            if finalizable {
                let raw = cell.load(Ordering::Relaxed);

                if raw == NO_OUTCOME {
                    // Non-primitive without children; unreachable under
                    // a well-formed game, left undecided
                    log::trace!("no child outcome for {tp}");
                    continue 'positions;
                }

                #[allow(clippy::expect_used)]
                let outcome = Record::try_from_raw(raw).expect("cell holds an encoded record");

                match outcome.to_parent() {
                    Some(parent) => records.set(position, parent),
                    None => {
                        fail.fail(crate::Error::Runtime(format!(
                            "remoteness overflow at {tp}",
                        )));
                        return;
                    }
                }
            }
        }
    });
}
