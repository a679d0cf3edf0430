// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The game contract: one vocabulary for regular and tiered games.
//!
//! Solvers hold a `&dyn TierGame` and never interpret game rules
//! themselves. Optional callbacks are capability-gated instead of
//! null-checked: implementors declare what they support through
//! [`Capabilities`] and the solvers branch on that.

pub mod consistency;
mod regular;

pub use regular::{Game, Regular};

use crate::{Move, Position, Tier, TierPosition, TierType, Value};
use rustc_hash::FxHashSet;

/// Which optional callbacks a game implements itself.
///
/// A raised flag promises the corresponding trait method is a real
/// implementation, not the derived default; solvers then prefer it and
/// the consistency checker cross-validates it.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Capabilities {
    /// `canonical_parent_positions` is implemented; backward induction
    /// can skip building the reverse-parent graph
    pub canonical_parents: bool,

    /// `canonical_child_positions` is a hand-rolled optimization
    pub canonical_children: bool,

    /// `number_of_canonical_child_positions` is a hand-rolled
    /// optimization
    pub child_counts: bool,

    /// `position_in_symmetric_tier` maps across symmetric tiers
    pub tier_symmetry: bool,

    /// `canonical_position` reduces by position-level symmetry
    pub position_symmetry: bool,
}

/// A finite, two-person, perfect-information game partitioned into
/// tiers.
///
/// The partition must be monotone with respect to tier-leaving moves:
/// a move either stays inside its tier or descends into a child tier,
/// and the tier graph is acyclic. All callbacks must be deterministic
/// pure functions of their inputs.
pub trait TierGame: Send + Sync {
    /// Tier holding the initial position.
    fn initial_tier(&self) -> Tier;

    /// The initial position, within [`TierGame::initial_tier`].
    fn initial_position(&self) -> Position;

    /// Number of positions in `tier`; dense, not necessarily all legal.
    fn tier_size(&self, tier: Tier) -> u64;

    /// Legal moves at `tp`. Empty iff the position is primitive.
    fn generate_moves(&self, tp: TierPosition) -> Vec<Move>;

    /// Terminal value of `tp`, or `Undecided` for non-terminals.
    fn primitive(&self, tp: TierPosition) -> Value;

    /// Applies a move. The result lies in `tp.tier` or a child tier.
    fn do_move(&self, tp: TierPosition, mv: Move) -> TierPosition;

    /// Whether `tp` encodes a reachable, rules-respecting state.
    fn is_legal_position(&self, tp: TierPosition) -> bool {
        let _ = tp;
        true
    }

    /// Smallest-hash representative of `tp`'s symmetry class, within
    /// the same tier.
    fn canonical_position(&self, tp: TierPosition) -> Position {
        tp.position
    }

    /// Deduplicated canonical children of `tp`, across all tiers.
    ///
    /// The default derives them from [`TierGame::generate_moves`] and
    /// [`TierGame::do_move`]; raise [`Capabilities::canonical_children`]
    /// when overriding with something faster.
    fn canonical_child_positions(&self, tp: TierPosition) -> Vec<TierPosition> {
        reference_child_positions(self, tp)
    }

    /// Number of canonical children of `tp`.
    fn number_of_canonical_child_positions(&self, tp: TierPosition) -> u64 {
        self.canonical_child_positions(tp).len() as u64
    }

    /// Canonical parents of `tp` that live in `parent_tier`.
    ///
    /// Required by backward induction unless the solver is allowed to
    /// build a reverse-parent graph; gate with
    /// [`Capabilities::canonical_parents`].
    fn canonical_parent_positions(&self, tp: TierPosition, parent_tier: Tier) -> Vec<Position> {
        let _ = (tp, parent_tier);
        Vec::new()
    }

    /// Maps `tp` into the symmetric tier `target`.
    ///
    /// Must be a self-mapping for `target == tp.tier` and an involution
    /// across tiers; gate with [`Capabilities::tier_symmetry`].
    fn position_in_symmetric_tier(&self, tp: TierPosition, target: Tier) -> Position {
        let _ = target;
        tp.position
    }

    /// Tiers reachable from `tier` by a single tier-leaving move.
    ///
    /// May contain non-canonical tiers; callers deduplicate through
    /// [`TierGame::canonical_tier`].
    fn child_tiers(&self, tier: Tier) -> Vec<Tier>;

    /// Declared parent tiers of `tier`, if the game tracks them.
    ///
    /// The tier manager derives parenthood from
    /// [`TierGame::child_tiers`] when this returns nothing.
    fn parent_tiers(&self, tier: Tier) -> Vec<Tier> {
        let _ = tier;
        Vec::new()
    }

    /// Smallest-identifier representative among tiers symmetric to
    /// `tier`.
    fn canonical_tier(&self, tier: Tier) -> Tier {
        tier
    }

    /// Internal structure of `tier`; selects the solving algorithm.
    fn tier_type(&self, tier: Tier) -> TierType {
        let _ = tier;
        TierType::Loopy
    }

    /// Display name of `tier`, used in file names.
    ///
    /// `None` falls back to the decimal tier identifier.
    fn tier_name(&self, tier: Tier) -> Option<String> {
        let _ = tier;
        None
    }

    /// Which optional callbacks are real implementations.
    fn capabilities(&self) -> Capabilities {
        Capabilities::default()
    }
}

/// Reference implementation of canonical child enumeration: apply every
/// move, map the result into its canonical tier and onto its canonical
/// position, deduplicate preserving first-seen order.
///
/// Games overriding [`TierGame::canonical_child_positions`] must agree
/// with this, and the consistency checker verifies they do.
pub fn reference_child_positions<G: TierGame + ?Sized>(
    game: &G,
    tp: TierPosition,
) -> Vec<TierPosition> {
    let mut seen = FxHashSet::default();
    let mut out = Vec::new();

    for mv in game.generate_moves(tp) {
        let child = game.do_move(tp, mv);

        let canonical_tier = game.canonical_tier(child.tier);
        let child = if canonical_tier == child.tier {
            child
        } else {
            TierPosition::new(
                canonical_tier,
                game.position_in_symmetric_tier(child, canonical_tier),
            )
        };

        let child = TierPosition::new(child.tier, game.canonical_position(child));

        if seen.insert(child) {
            out.push(child);
        }
    }

    out
}

/// Whether `tp` should be visited by a solver: legal and its own
/// canonical representative.
pub fn is_canonical_legal<G: TierGame + ?Sized>(game: &G, tp: TierPosition) -> bool {
    game.is_legal_position(tp) && game.canonical_position(tp) == tp.position
}
