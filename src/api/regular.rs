// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::{Capabilities, TierGame};
use crate::{Move, Position, Tier, TierPosition, TierType, Value};

/// A game without a tier decomposition.
pub trait Game: Send + Sync {
    /// Number of positions, dense, not necessarily all legal.
    fn size(&self) -> u64;

    /// The initial position.
    fn initial_position(&self) -> Position;

    /// Legal moves at `position`. Empty iff the position is primitive.
    fn generate_moves(&self, position: Position) -> Vec<Move>;

    /// Terminal value of `position`, or `Undecided` for non-terminals.
    fn primitive(&self, position: Position) -> Value;

    /// Applies a move.
    fn do_move(&self, position: Position, mv: Move) -> Position;

    /// Whether `position` encodes a rules-respecting state.
    fn is_legal_position(&self, position: Position) -> bool {
        let _ = position;
        true
    }

    /// Smallest-hash representative of `position`'s symmetry class.
    fn canonical_position(&self, position: Position) -> Position {
        position
    }

    /// Whether positions can repeat during play.
    fn game_type(&self) -> TierType {
        TierType::Loopy
    }

    /// Whether `canonical_position` is a real symmetry reduction.
    fn has_position_symmetry(&self) -> bool {
        false
    }
}

/// Adapts a [`Game`] into the tiered vocabulary: a single tier `0`
/// with every move internal and no child or parent tiers.
pub struct Regular<G>(G);

impl<G: Game> Regular<G> {
    /// Wraps a regular game.
    pub fn new(game: G) -> Self {
        Self(game)
    }

    /// The wrapped game.
    pub fn inner(&self) -> &G {
        &self.0
    }
}

impl<G: Game> TierGame for Regular<G> {
    fn initial_tier(&self) -> Tier {
        0
    }

    fn initial_position(&self) -> Position {
        self.0.initial_position()
    }

    fn tier_size(&self, _tier: Tier) -> u64 {
        self.0.size()
    }

    fn generate_moves(&self, tp: TierPosition) -> Vec<Move> {
        self.0.generate_moves(tp.position)
    }

    fn primitive(&self, tp: TierPosition) -> Value {
        self.0.primitive(tp.position)
    }

    fn do_move(&self, tp: TierPosition, mv: Move) -> TierPosition {
        TierPosition::new(tp.tier, self.0.do_move(tp.position, mv))
    }

    fn is_legal_position(&self, tp: TierPosition) -> bool {
        self.0.is_legal_position(tp.position)
    }

    fn canonical_position(&self, tp: TierPosition) -> Position {
        self.0.canonical_position(tp.position)
    }

    fn child_tiers(&self, _tier: Tier) -> Vec<Tier> {
        Vec::new()
    }

    fn tier_type(&self, _tier: Tier) -> TierType {
        self.0.game_type()
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            position_symmetry: self.0.has_position_symmetry(),
            ..Capabilities::default()
        }
    }
}
