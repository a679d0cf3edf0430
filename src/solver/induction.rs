// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::frontier::Frontier;
use super::reverse_graph::ReverseGraph;
use super::{load_all_children, SolveContext, TierWorker};
use crate::api::{is_canonical_legal, TierGame};
use crate::record::{Record, Remoteness};
use crate::{Position, RecordArray, Tier, TierPosition, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Solver for tiers with internal edges, including cycles.
///
/// Classic frontier propagation: decided positions push their parents
/// layer by layer of increasing remoteness. A parent with a `Lose`
/// child is a `Win`; a parent whose children all turn out `Win` is a
/// `Lose` (tracked by a per-position counter); a parent with no `Lose`
/// child but a `Tie` child is a `Tie`; whatever survives is a `Draw`.
pub struct InductionSolver;

/// How parent positions are looked up during propagation.
enum Parents<'a> {
    /// The game implements `canonical_parent_positions`
    Api(&'a dyn TierGame, Tier),

    /// Fall back to the reverse graph built during initialization
    Graph(ReverseGraph),
}

impl Parents<'_> {
    fn for_each(&self, child: TierPosition, mut f: impl FnMut(Position)) {
        match self {
            Parents::Api(game, tier) => {
                for parent in game.canonical_parent_positions(child, *tier) {
                    f(parent);
                }
            }
            Parents::Graph(graph) => {
                for &parent in graph.parents(child) {
                    f(parent);
                }
            }
        }
    }
}

impl TierWorker for InductionSolver {
    fn solve_tier(&self, cx: &mut SolveContext<'_>) -> crate::Result<()> {
        let records = cx.db.solving_records()?;
        let children = load_all_children(cx)?;

        let loaded: Vec<Arc<RecordArray>> = children
            .iter()
            .map(|&child| {
                #[allow(clippy::expect_used)]
                let records = cx.db.loaded_records(child).expect("child was just loaded");
                records
            })
            .collect();

        let parents = if cx.game.capabilities().canonical_parents {
            Parents::Api(cx.game, cx.tier)
        } else {
            log::debug!("tier {}: building reverse-parent graph", cx.tier);
            Parents::Graph(ReverseGraph::build(cx.game, cx.tier, &children, &cx.fail)?)
        };

        let sources = children.len() + 1;
        let win = Frontier::new(sources);
        let lose = Frontier::new(sources);
        let tie = Frontier::new(sources);

        #[allow(clippy::cast_possible_truncation)]
        let counters: Vec<AtomicU32> = (0..cx.size).map(|_| AtomicU32::new(0)).collect();

        #[allow(clippy::cast_possible_truncation)]
        let max_win: Vec<AtomicU32> = (0..cx.size).map(|_| AtomicU32::new(0)).collect();

        seed_solving_tier(cx, &records, &counters, &win, &lose, &tie);
        absorb_children(cx, &children, &loaded, &win, &lose, &tie);

        if cx.fail.is_failed() {
            return Err(cx.fail.clone().into_error());
        }

        propagate(
            cx, &records, &parents, &children, &counters, &max_win, &win, &lose, &tie,
        );

        if cx.fail.is_failed() {
            return Err(cx.fail.clone().into_error());
        }

        finalize_draws(cx, &records);

        cx.db.unload_all();

        Ok(())
    }
}

/// Seeds primitives into the remoteness-0 layer and initializes the
/// child counters of everything else.
fn seed_solving_tier(
    cx: &SolveContext<'_>,
    records: &RecordArray,
    counters: &[AtomicU32],
    win: &Frontier,
    lose: &Frontier,
    tie: &Frontier,
) {
    let game = cx.game;
    let tier = cx.tier;
    let fail = &cx.fail;

    crate::parallel::for_each_chunk(cx.size, crate::parallel::DEFAULT_CHUNK, |range| {
        if fail.is_failed() {
            return;
        }

        for position in range {
            let tp = TierPosition::new(tier, position);

            if !is_canonical_legal(game, tp) {
                continue;
            }

            let primitive = game.primitive(tp);

            if primitive.is_decided() {
                records.set(position, Record::new(primitive, 0));

                match primitive {
                    Value::Win => win.push(0, 0, position),
                    Value::Lose => lose.push(0, 0, position),
                    Value::Tie => tie.push(0, 0, position),
                    // Draws do not propagate
                    _ => {}
                }

                continue;
            }

            let count = game.number_of_canonical_child_positions(tp);

            let Ok(count) = u32::try_from(count) else {
                fail.fail(crate::Error::Runtime(format!(
                    "child count overflow at {tp}",
                )));
                return;
            };

            #[allow(clippy::indexing_slicing)]
            counters[position as usize].store(count, Ordering::Release);
        }
    });
}

/// Pushes every decided child-tier position into the frontiers, under
/// its source slot, at its stored remoteness.
fn absorb_children(
    cx: &SolveContext<'_>,
    children: &[Tier],
    loaded: &[Arc<RecordArray>],
    win: &Frontier,
    lose: &Frontier,
    tie: &Frontier,
) {
    for (i, child_records) in loaded.iter().enumerate() {
        let source = i + 1;

        #[allow(clippy::indexing_slicing)]
        let child_tier = children[i];

        log::trace!("tier {}: absorbing child tier {child_tier}", cx.tier);

        crate::parallel::for_each_chunk(
            child_records.len(),
            crate::parallel::DEFAULT_CHUNK,
            |range| {
                for position in range {
                    let record = child_records.get(position);

                    match record.value {
                        Value::Win => win.push(record.remoteness, source, position),
                        Value::Lose => lose.push(record.remoteness, source, position),
                        Value::Tie => tie.push(record.remoteness, source, position),
                        // Draws and undecided slots do not propagate
                        _ => {}
                    }
                }
            },
        );
    }
}

/// Drains the three frontiers layer by layer of increasing remoteness.
#[allow(clippy::too_many_arguments)]
fn propagate(
    cx: &SolveContext<'_>,
    records: &RecordArray,
    parents: &Parents<'_>,
    children: &[Tier],
    counters: &[AtomicU32],
    max_win: &[AtomicU32],
    win: &Frontier,
    lose: &Frontier,
    tie: &Frontier,
) {
    let tier = cx.tier;
    let fail = &cx.fail;

    #[allow(clippy::indexing_slicing)]
    let source_tier = |slot: usize| -> Tier {
        if slot == 0 {
            tier
        } else {
            children[slot - 1]
        }
    };

    // Win/Lose propagation must drain completely before ties are
    // considered: a Tie child never outweighs a Lose child at any
    // remoteness, so deciding ties early would steal wins
    let mut r: Remoteness = 0;

    loop {
        let deepest = win.max_remoteness().max(lose.max_remoteness());

        if r > deepest || fail.is_failed() {
            break;
        }

        // Lose children make undecided parents Win at r + 1
        let layer = flatten(lose.drain(r), &source_tier);

        crate::parallel::map_items(layer, |child| {
            parents.for_each(child, |parent| {
                if records.try_decide(parent, Record::new(Value::Win, r + 1)) {
                    win.push(r + 1, 0, parent);
                }
            });
        });

        // Win children burn down their parents' counters; the parent
        // that runs out is itself a Lose, one ply past its slowest
        // Win child
        let layer = flatten(win.drain(r), &source_tier);

        crate::parallel::map_items(layer, |child| {
            parents.for_each(child, |parent| {
                if records.get_value(parent).is_decided() {
                    return;
                }

                #[allow(clippy::indexing_slicing)]
                max_win[parent as usize].fetch_max(r, Ordering::AcqRel);

                #[allow(clippy::indexing_slicing)]
                let remaining = counters[parent as usize].fetch_sub(1, Ordering::AcqRel);

                if remaining == 1 {
                    #[allow(clippy::indexing_slicing)]
                    let remoteness = max_win[parent as usize].load(Ordering::Acquire) + 1;

                    if records.try_decide(parent, Record::new(Value::Lose, remoteness)) {
                        lose.push(remoteness, 0, parent);
                    }
                }
            });
        });

        r += 1;
    }

    // What survives has no Lose child and is not all-Win; a Tie child
    // now decides it
    let mut r: Remoteness = 0;

    loop {
        if r > tie.max_remoteness() || fail.is_failed() {
            break;
        }

        let layer = flatten(tie.drain(r), &source_tier);

        crate::parallel::map_items(layer, |child| {
            parents.for_each(child, |parent| {
                if records.try_decide(parent, Record::new(Value::Tie, r + 1)) {
                    tie.push(r + 1, 0, parent);
                }
            });
        });

        r += 1;
    }
}

/// Flattens one drained layer into `(source tier, position)` pairs.
fn flatten(layer: Vec<Vec<Position>>, source_tier: &impl Fn(usize) -> Tier) -> Vec<TierPosition> {
    let mut out = Vec::with_capacity(layer.iter().map(Vec::len).sum());

    for (slot, positions) in layer.into_iter().enumerate() {
        let tier = source_tier(slot);
        out.extend(positions.into_iter().map(|p| TierPosition::new(tier, p)));
    }

    out
}

/// Whatever survived propagation is a draw; illegal and non-canonical
/// positions stay untouched.
fn finalize_draws(cx: &SolveContext<'_>, records: &RecordArray) {
    let game = cx.game;
    let tier = cx.tier;

    crate::parallel::for_each_chunk(cx.size, crate::parallel::DEFAULT_CHUNK, |range| {
        for position in range {
            if records.get_value(position).is_decided() {
                continue;
            }

            if is_canonical_legal(game, TierPosition::new(tier, position)) {
                records.try_decide(position, Record::new(Value::Draw, 0));
            }
        }
    });
}
