// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::coding::DecodeError;

/// Game-theoretic value of a position, from the perspective of the player
/// to move.
///
/// The discriminant order realizes `Lose < Draw < Tie < Win`, so the
/// derived `Ord` compares outcomes correctly. `Undecided` is transient
/// during solving, and is what illegal and non-canonical positions hold
/// at rest.
#[derive(Copy, Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[repr(u8)]
pub enum Value {
    /// Not (yet) determined
    #[default]
    Undecided = 0,

    /// The player to move loses under optimal play
    Lose = 1,

    /// Play never terminates under optimal play
    Draw = 2,

    /// The game ends in a tie under optimal play
    Tie = 3,

    /// The player to move wins under optimal play
    Win = 4,
}

impl Value {
    /// Whether this is a playable outcome (not `Undecided`).
    #[must_use]
    pub fn is_decided(self) -> bool {
        self != Self::Undecided
    }

    /// The value seen by the parent of a position holding this value.
    ///
    /// `Win` and `Lose` flip; `Tie`, `Draw` and `Undecided` are fixed
    /// points.
    #[must_use]
    pub fn negated(self) -> Self {
        match self {
            Self::Win => Self::Lose,
            Self::Lose => Self::Win,
            v => v,
        }
    }
}

impl From<Value> for u8 {
    fn from(value: Value) -> Self {
        value as Self
    }
}

impl TryFrom<u8> for Value {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Undecided),
            1 => Ok(Self::Lose),
            2 => Ok(Self::Draw),
            3 => Ok(Self::Tie),
            4 => Ok(Self::Win),
            tag => Err(DecodeError::InvalidTag(("Value", tag))),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Undecided => "undecided",
                Self::Lose => "lose",
                Self::Draw => "draw",
                Self::Tie => "tie",
                Self::Win => "win",
            }
        )
    }
}
