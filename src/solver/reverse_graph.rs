// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::api::{is_canonical_legal, TierGame};
use crate::{Position, Tier, TierPosition, Value};
use rustc_hash::FxHashMap;
use std::sync::Mutex;

/// On-demand index from child positions to their canonical parents in
/// the tier under solve.
///
/// Built when the game does not implement `canonical_parent_positions`:
/// one parallel pass over the tier's canonical legal non-primitive
/// positions, appending each as a parent into its children's buckets.
///
/// Buckets for all source tiers share one arena, addressed by a
/// two-level table: source tier -> base offset, then child position.
pub struct ReverseGraph {
    slots: FxHashMap<Tier, usize>,
    offsets: Vec<u64>,
    buckets: Vec<Vec<Position>>,
}

impl ReverseGraph {
    /// Builds the index for `tier` over the given source tiers
    /// (`tier` itself plus its loaded canonical child tiers).
    pub fn build(
        game: &dyn TierGame,
        tier: Tier,
        children: &[Tier],
        fail: &crate::fail_signal::FailSignal,
    ) -> crate::Result<Self> {
        let mut slots = FxHashMap::default();
        let mut offsets = Vec::with_capacity(children.len() + 1);
        let mut total = 0u64;

        for (slot, &source) in std::iter::once(&tier).chain(children).enumerate() {
            slots.insert(source, slot);
            offsets.push(total);
            total += game.tier_size(source);
        }

        let cells: Vec<Mutex<Vec<Position>>> = (0..total).map(|_| Mutex::new(Vec::new())).collect();

        let size = game.tier_size(tier);

        crate::parallel::for_each_chunk(size, crate::parallel::DEFAULT_CHUNK, |range| {
            if fail.is_failed() {
                return;
            }

            for position in range {
                let tp = TierPosition::new(tier, position);

                if !is_canonical_legal(game, tp) || game.primitive(tp) != Value::Undecided {
                    continue;
                }

                for child in game.canonical_child_positions(tp) {
                    let Some(&slot) = slots.get(&child.tier) else {
                        fail.fail(crate::Error::Runtime(format!(
                            "child {child} of {tp} lies outside the solve's tier set",
                        )));
                        return;
                    };

                    #[allow(clippy::indexing_slicing, clippy::expect_used)]
                    cells[(offsets[slot] + child.position) as usize]
                        .lock()
                        .expect("lock is poisoned")
                        .push(position);
                }
            }
        });

        if fail.is_failed() {
            return Err(fail.clone().into_error());
        }

        // Freeze the arena for lock-free reads during propagation
        let buckets = cells
            .into_iter()
            .map(|cell| cell.into_inner().unwrap_or_default())
            .collect();

        Ok(Self {
            slots,
            offsets,
            buckets,
        })
    }

    /// Canonical parents (in the tier under solve) of a child position.
    ///
    /// Empty for positions nothing points at.
    #[must_use]
    pub fn parents(&self, child: TierPosition) -> &[Position] {
        let Some(&slot) = self.slots.get(&child.tier) else {
            return &[];
        };

        #[allow(clippy::indexing_slicing)]
        let idx = (self.offsets[slot] + child.position) as usize;

        self.buckets.get(idx).map_or(&[], Vec::as_slice)
    }

    /// Total number of parent entries across all buckets.
    #[must_use]
    pub fn edge_count(&self) -> u64 {
        self.buckets.iter().map(|b| b.len() as u64).sum()
    }
}
