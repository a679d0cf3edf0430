// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::record::Remoteness;
use crate::Position;
use std::sync::{Arc, Mutex, RwLock};

/// Remoteness-indexed worklist for backward induction.
///
/// One frontier exists per propagating value (`Win`, `Lose`, `Tie`).
/// Each remoteness layer partitions its positions by *source*: slot 0
/// is the tier under solve, slot `i + 1` the i-th loaded child tier.
/// The per-slot vectors handed out by [`Frontier::drain`] are the
/// partitioning mechanism (slot boundaries stand in for cumulative
/// dividers); the propagation step walks them slot by slot to look up
/// parents restricted to one source tier.
///
/// Appends take a per-layer lock; draining a layer happens on the
/// control thread between parallel passes.
pub struct Frontier {
    sources: usize,
    layers: RwLock<Vec<Arc<Mutex<Vec<Vec<Position>>>>>>,
}

impl Frontier {
    /// Creates a frontier partitioned into `sources` source slots.
    #[must_use]
    pub fn new(sources: usize) -> Self {
        debug_assert!(sources > 0);

        Self {
            sources,
            layers: RwLock::new(Vec::new()),
        }
    }

    #[allow(clippy::expect_used, clippy::indexing_slicing)]
    fn layer(&self, remoteness: Remoteness) -> Arc<Mutex<Vec<Vec<Position>>>> {
        let idx = remoteness as usize;

        {
            let layers = self.layers.read().expect("lock is poisoned");

            if let Some(layer) = layers.get(idx) {
                return Arc::clone(layer);
            }
        }

        let mut layers = self.layers.write().expect("lock is poisoned");

        while layers.len() <= idx {
            layers.push(Arc::new(Mutex::new(vec![Vec::new(); self.sources])));
        }

        Arc::clone(&layers[idx])
    }

    /// Appends `position` to the layer at `remoteness` under `source`.
    #[allow(clippy::expect_used)]
    pub fn push(&self, remoteness: Remoteness, source: usize, position: Position) {
        debug_assert!(source < self.sources);

        let layer = self.layer(remoteness);
        let mut buckets = layer.lock().expect("lock is poisoned");

        #[allow(clippy::indexing_slicing)]
        buckets[source].push(position);
    }

    /// Takes the whole layer at `remoteness`, leaving it empty.
    ///
    /// Returns one position list per source slot.
    #[allow(clippy::expect_used)]
    #[must_use]
    pub fn drain(&self, remoteness: Remoteness) -> Vec<Vec<Position>> {
        let layer = self.layer(remoteness);
        let mut buckets = layer.lock().expect("lock is poisoned");

        std::mem::replace(&mut *buckets, vec![Vec::new(); self.sources])
    }

    /// Highest remoteness any layer has been touched at.
    #[allow(clippy::expect_used)]
    #[must_use]
    pub fn max_remoteness(&self) -> Remoteness {
        let layers = self.layers.read().expect("lock is poisoned");

        layers.len().saturating_sub(1) as Remoteness
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn frontier_partitions_by_source() {
        let frontier = Frontier::new(3);

        frontier.push(0, 0, 10);
        frontier.push(0, 2, 20);
        frontier.push(0, 2, 21);
        frontier.push(4, 1, 30);

        let layer = frontier.drain(0);
        assert_eq!(vec![vec![10], vec![], vec![20, 21]], layer);

        // Draining leaves the layer empty
        let layer = frontier.drain(0);
        assert_eq!(vec![Vec::<u64>::new(), Vec::new(), Vec::new()], layer);

        let layer = frontier.drain(4);
        assert_eq!(vec![vec![], vec![30], vec![]], layer);

        assert_eq!(4, frontier.max_remoteness());
    }

    #[test]
    fn frontier_concurrent_pushes() {
        let frontier = Frontier::new(1);

        crate::parallel::for_each_chunk(10_000, 64, |range| {
            for i in range {
                #[allow(clippy::cast_possible_truncation)]
                frontier.push((i % 13) as Remoteness, 0, i);
            }
        });

        let total: usize = (0..13)
            .map(|r| frontier.drain(r).into_iter().map(|v| v.len()).sum::<usize>())
            .sum();

        assert_eq!(10_000, total);
    }
}
