// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// Identifier of one partition block of the position space.
///
/// The unit of solving and persistence.
pub type Tier = u64;

/// Identifier of a game state within a tier, in `0..tier_size(tier)`.
///
/// Dense, but not necessarily all legal.
pub type Position = u64;

/// Game-defined move encoding.
pub type Move = u64;

/// The canonical addressing unit: a position qualified by its tier.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct TierPosition {
    /// The tier the position lives in
    pub tier: Tier,

    /// The position within the tier
    pub position: Position,
}

impl TierPosition {
    /// Pairs a tier with a position.
    #[must_use]
    pub fn new(tier: Tier, position: Position) -> Self {
        Self { tier, position }
    }
}

impl std::fmt::Display for TierPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.tier, self.position)
    }
}

/// Internal structure of a tier, as declared by the game.
///
/// Decides which solving algorithm the tier manager dispatches.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TierType {
    /// Every legal move leaves the tier; the tier is acyclic internally
    ImmediateTransition,

    /// Positions form a DAG internally; self-transitions allowed, cycles not
    LoopFree,

    /// Cycles within the tier are possible
    Loopy,
}

impl std::fmt::Display for TierType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::ImmediateTransition => "immediate-transition",
                Self::LoopFree => "loop-free",
                Self::Loopy => "loopy",
            }
        )
    }
}
