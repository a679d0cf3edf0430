// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

mod common;

use common::{TicTacToe, TieredLoopy};
use test_log::test;
use tier_solver::api::{consistency, Capabilities, TierGame};
use tier_solver::{ApiMismatchKind, Error, Move, Position, Tier, TierPosition};

#[test]
fn tictactoe_api_is_consistent() -> tier_solver::Result<()> {
    let game = TicTacToe { with_parents: true };
    let tiers: Vec<Tier> = (0..=9).collect();

    consistency::check(&game, &tiers, 42, 200)
}

#[test]
fn tiered_loopy_api_is_consistent() -> tier_solver::Result<()> {
    let game = TieredLoopy { with_parents: true };

    consistency::check(&game, &[1, 0], 7, 50)
}

/// Claims the parent callback but returns nothing, which the
/// child-parent matching check must catch.
struct BrokenParents(TicTacToe);

impl TierGame for BrokenParents {
    fn initial_tier(&self) -> Tier {
        self.0.initial_tier()
    }

    fn initial_position(&self) -> Position {
        self.0.initial_position()
    }

    fn tier_size(&self, tier: Tier) -> u64 {
        self.0.tier_size(tier)
    }

    fn generate_moves(&self, tp: TierPosition) -> Vec<Move> {
        self.0.generate_moves(tp)
    }

    fn primitive(&self, tp: TierPosition) -> tier_solver::Value {
        self.0.primitive(tp)
    }

    fn do_move(&self, tp: TierPosition, mv: Move) -> TierPosition {
        self.0.do_move(tp, mv)
    }

    fn is_legal_position(&self, tp: TierPosition) -> bool {
        self.0.is_legal_position(tp)
    }

    fn canonical_parent_positions(&self, _tp: TierPosition, _parent_tier: Tier) -> Vec<Position> {
        Vec::new()
    }

    fn child_tiers(&self, tier: Tier) -> Vec<Tier> {
        self.0.child_tiers(tier)
    }

    fn tier_type(&self, tier: Tier) -> tier_solver::TierType {
        self.0.tier_type(tier)
    }

    fn capabilities(&self) -> Capabilities {
        self.0.capabilities()
    }
}

#[test]
fn broken_parent_callback_is_caught() {
    let game = BrokenParents(TicTacToe { with_parents: true });

    // Mid-game tiers have plenty of legal positions to sample
    match consistency::check(&game, &[4, 5], 42, 2_000) {
        Err(Error::ApiMismatch { kind, .. }) => {
            assert_eq!(ApiMismatchKind::ChildParent, kind);
        }
        other => panic!("expected a child-parent mismatch, got {other:?}"),
    }
}
