// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{
    coding::{DecodeError, EncodeError},
    Checksum, CompressionType, TierPosition,
};

/// Which pair of game-API callbacks disagreed
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ApiMismatchKind {
    /// A child did not report the sampled position among its parents
    ChildParent,

    /// A reported parent did not list the sampled position among its children
    ParentChild,

    /// `canonical_child_positions` disagrees with the derived reference
    CanonicalChildren,

    /// A child landed in a tier that is not a canonical child tier
    ChildTierMembership,

    /// Tier symmetry is not a self-mapping or not an involution
    TierSymmetry,
}

/// Represents errors that can occur in the solver
#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(std::io::Error),

    /// Serialization failed
    Encode(EncodeError),

    /// Deserialization failed
    Decode(DecodeError),

    /// Decompression failed
    Decompress(CompressionType),

    /// Invalid checksum value (got, expected)
    ChecksumMismatch {
        /// Checksum computed over the read payload
        got: Checksum,

        /// Checksum stored in the block header
        expected: Checksum,
    },

    /// Invalid user or game input (bad tier id, out-of-range position, ...)
    IllegalArgument(String),

    /// Internal invariant violated; the current solve must be aborted
    Runtime(String),

    /// Two game-API callbacks returned inconsistent results
    ApiMismatch {
        /// Which callback pair disagreed
        kind: ApiMismatchKind,

        /// The sampled position that exposed the disagreement
        at: TierPosition,
    },
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TierSolverError: {self:?}")
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<EncodeError> for Error {
    fn from(value: EncodeError) -> Self {
        Self::Encode(value)
    }
}

impl From<DecodeError> for Error {
    fn from(value: DecodeError) -> Self {
        Self::Decode(value)
    }
}

/// Solver result
pub type Result<T> = std::result::Result<T, Error>;
