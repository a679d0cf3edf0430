// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Forward discovery: which positions are actually reachable from the
//! initial position.
//!
//! Solving covers the whole dense hash space; discovery maps let
//! analysis distinguish the reachable part. The pass walks tiers
//! parents-first (the reverse of solve order), marks the initial
//! position, closes each tier under internal moves, and spills
//! cross-tier children into the child tiers' maps before those are
//! walked.

use super::stats::save_map;
use crate::api::{is_canonical_legal, TierGame};
use crate::bitset::ConcurrentBitset;
use crate::{Database, Tier, TierPosition, Value};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;

/// Runs the discovery pass over `solve_order` (children-first, as
/// returned by the tier manager) and persists one `.map` file per
/// tier.
pub fn run(db: &Database, game: &dyn TierGame, solve_order: &[Tier]) -> crate::Result<()> {
    let mut maps: FxHashMap<Tier, ConcurrentBitset> = solve_order
        .iter()
        .map(|&tier| (tier, ConcurrentBitset::new(game.tier_size(tier))))
        .collect();

    // Seed the canonical initial position
    let initial_tier = game.canonical_tier(game.initial_tier());
    let initial = TierPosition::new(initial_tier, game.initial_position());
    let initial = TierPosition::new(initial_tier, game.canonical_position(initial));

    if let Some(map) = maps.get(&initial_tier) {
        map.set(initial.position);
    }

    // Parents first
    for &tier in solve_order.iter().rev() {
        #[allow(clippy::expect_used)]
        let map = maps.get(&tier).expect("map was allocated for every tier");

        let mut queue: VecDeque<u64> = (0..map.len()).filter(|&p| map.get(p)).collect();

        while let Some(position) = queue.pop_front() {
            let tp = TierPosition::new(tier, position);

            if !is_canonical_legal(game, tp) || game.primitive(tp) != Value::Undecided {
                continue;
            }

            for child in game.canonical_child_positions(tp) {
                if child.tier == tier {
                    if !map.set(child.position) {
                        queue.push_back(child.position);
                    }
                } else if let Some(child_map) = maps.get(&child.tier) {
                    child_map.set(child.position);
                }
            }
        }

        log::debug!(
            "tier {tier}: discovered {} of {} positions",
            map.count_ones(),
            map.len(),
        );
    }

    for (tier, map) in &maps {
        save_map(db, *tier, map)?;
    }

    Ok(())
}
