// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Seed-driven sampling checks of a game's API implementation.
//!
//! The solver trusts the optional callbacks blindly; a game that
//! implements `canonical_parent_positions` inconsistently with its own
//! `do_move` produces a silently wrong database. This module samples
//! random positions per tier and cross-validates the callback pairs,
//! so a game author can fail fast instead.

use super::{is_canonical_legal, reference_child_positions, TierGame};
use crate::error::ApiMismatchKind;
use crate::{Tier, TierPosition, Value};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rustc_hash::{FxHashMap, FxHashSet};

fn mismatch(kind: ApiMismatchKind, at: TierPosition) -> crate::Error {
    crate::Error::ApiMismatch { kind, at }
}

/// Cross-validates the game API over `tiers`, sampling up to
/// `samples_per_tier` random positions per tier with a deterministic
/// RNG seeded by `seed`.
///
/// Returns the first violation found.
pub fn check(game: &dyn TierGame, tiers: &[Tier], seed: u64, samples_per_tier: u64) -> crate::Result<()> {
    let mut rng = SmallRng::seed_from_u64(seed);

    // Parenthood as implied by the forward graph, used to direct
    // parent->child matching
    let tier_set: FxHashSet<Tier> = tiers.iter().copied().collect();
    let mut parents_of: FxHashMap<Tier, Vec<Tier>> = FxHashMap::default();

    for &tier in tiers {
        for child in game.child_tiers(tier) {
            let child = game.canonical_tier(child);

            if child != tier && tier_set.contains(&child) {
                parents_of.entry(child).or_default().push(tier);
            }
        }
    }

    for &tier in tiers {
        let size = game.tier_size(tier);

        if size == 0 {
            continue;
        }

        let child_tiers: FxHashSet<Tier> = game
            .child_tiers(tier)
            .iter()
            .map(|t| game.canonical_tier(*t))
            .collect();

        for _ in 0..samples_per_tier {
            let tp = TierPosition::new(tier, rng.random_range(0..size));

            if !is_canonical_legal(game, tp) {
                continue;
            }

            check_tier_symmetry(game, tp)?;

            if game.primitive(tp).is_decided() {
                continue;
            }

            let children = game.canonical_child_positions(tp);

            // Child-tier membership
            for child in &children {
                if child.tier != tier && !child_tiers.contains(&child.tier) {
                    return Err(mismatch(ApiMismatchKind::ChildTierMembership, *child));
                }
            }

            // Custom child enumeration must agree with the derived one
            if game.capabilities().canonical_children {
                let reference: FxHashSet<TierPosition> =
                    reference_child_positions(game, tp).into_iter().collect();
                let custom: FxHashSet<TierPosition> = children.iter().copied().collect();

                if reference != custom {
                    return Err(mismatch(ApiMismatchKind::CanonicalChildren, tp));
                }
            }

            if game.capabilities().canonical_parents {
                // Child -> parent matching
                for child in &children {
                    if !game
                        .canonical_parent_positions(*child, tier)
                        .contains(&tp.position)
                    {
                        return Err(mismatch(ApiMismatchKind::ChildParent, *child));
                    }
                }

                // Parent -> child matching, against every implied
                // parent tier plus the tier itself
                let mut parent_tiers: Vec<Tier> =
                    parents_of.get(&tier).cloned().unwrap_or_default();
                parent_tiers.push(tier);

                for parent_tier in parent_tiers {
                    for parent in game.canonical_parent_positions(tp, parent_tier) {
                        let q = TierPosition::new(parent_tier, parent);

                        if game.primitive(q) != Value::Undecided {
                            return Err(mismatch(ApiMismatchKind::ParentChild, q));
                        }

                        if !game.canonical_child_positions(q).contains(&tp) {
                            return Err(mismatch(ApiMismatchKind::ParentChild, q));
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

/// Self-mapping and involution checks for tier symmetry.
fn check_tier_symmetry(game: &dyn TierGame, tp: TierPosition) -> crate::Result<()> {
    if !game.capabilities().tier_symmetry {
        return Ok(());
    }

    // Mapping into one's own tier must be the identity
    if game.position_in_symmetric_tier(tp, tp.tier) != tp.position {
        return Err(mismatch(ApiMismatchKind::TierSymmetry, tp));
    }

    // Mapping into a symmetric tier and back must be the identity
    for raw in game.child_tiers(tp.tier) {
        let canonical = game.canonical_tier(raw);

        if canonical == raw {
            continue;
        }

        for mv in game.generate_moves(tp) {
            let child = game.do_move(tp, mv);

            if child.tier != raw {
                continue;
            }

            let mapped = TierPosition::new(
                canonical,
                game.position_in_symmetric_tier(child, canonical),
            );

            if game.position_in_symmetric_tier(mapped, raw) != child.position {
                return Err(mismatch(ApiMismatchKind::TierSymmetry, child));
            }
        }
    }

    Ok(())
}
