// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::{load_all_children, SolveContext, TierWorker};
use crate::api::is_canonical_legal;
use crate::db::CheckpointMeta;
use crate::record::{Record, Remoteness};
use crate::{RecordArray, Tier, TierPosition, Value};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const STEP_SCAN: u8 = 1;
const STEP_WIN_LOSE: u8 = 2;
const STEP_TIE: u8 = 3;

/// Solver for loopy tiers in low-memory environments.
///
/// Runs entirely on the record array: no frontier, no reverse graph,
/// no counters. Fixed-point sweeps decide `Win`/`Lose` in increasing
/// remoteness, then `Tie`, then mark the rest `Draw`. Deterministic
/// and restartable, so long solves periodically checkpoint the array.
pub struct IterationSolver;

impl TierWorker for IterationSolver {
    fn solve_tier(&self, cx: &mut SolveContext<'_>) -> crate::Result<()> {
        let records = cx.db.solving_records()?;
        let children = load_all_children(cx)?;

        let loaded: FxHashMap<Tier, Arc<RecordArray>> = children
            .iter()
            .map(|&child| {
                #[allow(clippy::expect_used)]
                let records = cx.db.loaded_records(child).expect("child was just loaded");
                (child, records)
            })
            .collect();

        let (mut step, mut resume_r) = restore_checkpoint(cx, &records);
        let mut checkpointer = Checkpointer::new(cx.db.config().checkpointing);

        if step <= STEP_SCAN {
            scan(cx, &records);
            step = STEP_WIN_LOSE;
            resume_r = 1;
        }

        if cx.fail.is_failed() {
            return Err(cx.fail.clone().into_error());
        }

        if step == STEP_WIN_LOSE {
            sweep_to_fixed_point(cx, &records, &loaded, resume_r, false, &mut checkpointer)?;
            step = STEP_TIE;
            resume_r = 1;
        }

        if step == STEP_TIE {
            sweep_to_fixed_point(cx, &records, &loaded, resume_r, true, &mut checkpointer)?;
        }

        if cx.fail.is_failed() {
            return Err(cx.fail.clone().into_error());
        }

        finalize(cx, &records);

        cx.db.unload_all();

        Ok(())
    }
}

/// Loads a prior checkpoint into the solving array, if one exists.
///
/// Returns the step and remoteness to resume at.
fn restore_checkpoint(cx: &SolveContext<'_>, records: &RecordArray) -> (u8, Remoteness) {
    if !cx.db.config().checkpointing || !cx.db.checkpoint_exists(cx.tier) {
        return (STEP_SCAN, 1);
    }

    match cx.db.checkpoint_load(cx.tier, cx.size) {
        Ok((meta, snapshot)) => {
            log::info!(
                "tier {}: resuming at step {} remoteness {}",
                cx.tier,
                meta.step,
                meta.remoteness,
            );

            crate::parallel::for_each_chunk(cx.size, crate::parallel::DEFAULT_CHUNK, |range| {
                for position in range {
                    records.set(position, snapshot.get(position));
                }
            });

            (meta.step, meta.remoteness)
        }
        Err(e) => {
            log::warn!("tier {}: discarding unreadable checkpoint: {e}", cx.tier);
            (STEP_SCAN, 1)
        }
    }
}

/// Step 1: sentinel illegal and non-canonical positions as `Draw`, and
/// write primitives at remoteness 0.
fn scan(cx: &SolveContext<'_>, records: &RecordArray) {
    let game = cx.game;
    let tier = cx.tier;

    crate::parallel::for_each_chunk(cx.size, crate::parallel::DEFAULT_CHUNK, |range| {
        for position in range {
            let tp = TierPosition::new(tier, position);

            if !is_canonical_legal(game, tp) {
                // Sentinel: keeps later sweeps from visiting the
                // position; restored to undecided at the end
                records.set(position, Record::new(Value::Draw, 0));
                continue;
            }

            let primitive = game.primitive(tp);

            if primitive.is_decided() {
                records.set(position, Record::new(primitive, 0));
            }
        }
    });
}

/// Steps 2 and 3: sweep all undecided positions at r = 1, 2, ... until
/// a pass makes no updates and r exceeds the deepest relevant child.
fn sweep_to_fixed_point(
    cx: &SolveContext<'_>,
    records: &RecordArray,
    loaded: &FxHashMap<Tier, Arc<RecordArray>>,
    resume_r: Remoteness,
    ties: bool,
    checkpointer: &mut Checkpointer,
) -> crate::Result<()> {
    let step = if ties { STEP_TIE } else { STEP_WIN_LOSE };

    // The deepest decided child visible at the start bounds how far
    // sweeps must keep running without updates
    let mut bound = child_depth_bound(cx, records, loaded, ties);
    let mut r = resume_r;

    loop {
        let updates = if ties {
            sweep_tie(cx, records, loaded, r)
        } else {
            sweep_win_lose(cx, records, loaded, r)
        };

        if cx.fail.is_failed() {
            return Err(cx.fail.clone().into_error());
        }

        if updates > 0 {
            bound = bound.max(r);
        }

        log::trace!("tier {}: step {step} sweep r={r}: {updates} update(s)", cx.tier);

        if updates == 0 && r > bound {
            return Ok(());
        }

        r += 1;

        checkpointer.maybe_save(cx, records, CheckpointMeta { step, remoteness: r })?;
    }
}

/// Deepest `Win`/`Lose` (or `Tie`) remoteness among the solving tier's
/// current records and all loaded children.
fn child_depth_bound(
    cx: &SolveContext<'_>,
    records: &RecordArray,
    loaded: &FxHashMap<Tier, Arc<RecordArray>>,
    ties: bool,
) -> Remoteness {
    let depth_of = |array: &RecordArray| -> Remoteness {
        crate::parallel::fold_chunks(
            array.len(),
            crate::parallel::DEFAULT_CHUNK,
            || 0,
            |acc: Remoteness, range| {
                let mut acc = acc;
                for position in range {
                    let record = array.get(position);

                    let relevant = if ties {
                        record.value == Value::Tie
                    } else {
                        matches!(record.value, Value::Win | Value::Lose)
                    };

                    if relevant {
                        acc = acc.max(record.remoteness);
                    }
                }
                acc
            },
            Remoteness::max,
        )
    };

    let mut bound = depth_of(records);

    for child_records in loaded.values() {
        bound = bound.max(depth_of(child_records));
    }

    bound
}

fn child_record(
    tier: Tier,
    records: &RecordArray,
    loaded: &FxHashMap<Tier, Arc<RecordArray>>,
    child: TierPosition,
) -> Option<Record> {
    if child.tier == tier {
        Some(records.get(child.position))
    } else {
        loaded.get(&child.tier).map(|array| array.get(child.position))
    }
}

/// One Win/Lose sweep at remoteness `r`; returns the update count.
fn sweep_win_lose(
    cx: &SolveContext<'_>,
    records: &RecordArray,
    loaded: &FxHashMap<Tier, Arc<RecordArray>>,
    r: Remoteness,
) -> u64 {
    let game = cx.game;
    let tier = cx.tier;
    let fail = &cx.fail;
    let updates = AtomicU64::new(0);

    crate::parallel::for_each_chunk(cx.size, crate::parallel::DEFAULT_CHUNK, |range| {
        if fail.is_failed() {
            return;
        }

        for position in range {
            if records.get_value(position).is_decided() {
                continue;
            }

            let tp = TierPosition::new(tier, position);

            let mut all_win = true;
            let mut any_children = false;
            let mut won = false;
            let mut deepest_win: Remoteness = 0;

            for child in game.canonical_child_positions(tp) {
                any_children = true;

                let Some(outcome) = child_record(tier, records, loaded, child) else {
                    fail.fail(crate::Error::Runtime(format!(
                        "child {child} of {tp} lies in an unloaded tier",
                    )));
                    return;
                };

                match outcome.value {
                    Value::Lose if outcome.remoteness == r - 1 => {
                        won = true;
                        break;
                    }
                    Value::Win => deepest_win = deepest_win.max(outcome.remoteness),
                    _ => all_win = false,
                }
            }

            if won {
                records.set(position, Record::new(Value::Win, r));
                updates.fetch_add(1, Ordering::Relaxed);
            } else if any_children && all_win && deepest_win == r - 1 {
                records.set(position, Record::new(Value::Lose, r));
                updates.fetch_add(1, Ordering::Relaxed);
            }
        }
    });

    updates.into_inner()
}

/// One Tie sweep at remoteness `r`; returns the update count.
fn sweep_tie(
    cx: &SolveContext<'_>,
    records: &RecordArray,
    loaded: &FxHashMap<Tier, Arc<RecordArray>>,
    r: Remoteness,
) -> u64 {
    let game = cx.game;
    let tier = cx.tier;
    let updates = AtomicU64::new(0);

    crate::parallel::for_each_chunk(cx.size, crate::parallel::DEFAULT_CHUNK, |range| {
        for position in range {
            if records.get_value(position).is_decided() {
                continue;
            }

            let tp = TierPosition::new(tier, position);

            let tied = game.canonical_child_positions(tp).into_iter().any(|child| {
                child_record(tier, records, loaded, child)
                    .is_some_and(|outcome| {
                        outcome.value == Value::Tie && outcome.remoteness == r - 1
                    })
            });

            if tied {
                records.set(position, Record::new(Value::Tie, r));
                updates.fetch_add(1, Ordering::Relaxed);
            }
        }
    });

    updates.into_inner()
}

/// Step 4: remaining undecided positions are draws; the sentinels on
/// illegal and non-canonical positions go back to undecided.
fn finalize(cx: &SolveContext<'_>, records: &RecordArray) {
    let game = cx.game;
    let tier = cx.tier;

    crate::parallel::for_each_chunk(cx.size, crate::parallel::DEFAULT_CHUNK, |range| {
        for position in range {
            let tp = TierPosition::new(tier, position);

            if !is_canonical_legal(game, tp) {
                records.set(position, Record::UNDECIDED);
            } else if records.get_value(position) == Value::Undecided {
                records.set(position, Record::new(Value::Draw, 0));
            }
        }
    });
}

/// Writes a checkpoint whenever the time since the last one exceeds
/// twice the measured cost of saving, so crash recovery never costs
/// more time than it saves.
struct Checkpointer {
    enabled: bool,
    last: Instant,
    cost: Duration,
}

impl Checkpointer {
    fn new(enabled: bool) -> Self {
        Self {
            enabled,
            last: Instant::now(),
            cost: Duration::ZERO,
        }
    }

    fn maybe_save(
        &mut self,
        cx: &SolveContext<'_>,
        records: &RecordArray,
        meta: CheckpointMeta,
    ) -> crate::Result<()> {
        if !self.enabled || self.last.elapsed() <= self.cost * 2 {
            return Ok(());
        }

        let started = Instant::now();
        cx.db.checkpoint_save(cx.tier, meta, records)?;
        self.cost = started.elapsed();
        self.last = Instant::now();

        log::debug!(
            "tier {}: checkpoint at step {} remoteness {} took {:?}",
            cx.tier,
            meta.step,
            meta.remoteness,
            self.cost,
        );

        Ok(())
    }
}
