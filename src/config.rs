// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::CompressionType;
use std::path::{Path, PathBuf};

/// Which algorithm to run on tiers with internal cycles.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum LoopySolver {
    /// Frontier-based backward induction (the default)
    #[default]
    BackwardInduction,

    /// Fixed-point sweeps over the record array; slower, but needs no
    /// frontier or reverse graph, for low-memory environments
    ValueIteration,
}

/// Solver and database configuration builder
#[derive(Clone, Debug)]
pub struct Config {
    /// Data root folder; tier files live below it
    pub path: PathBuf,

    /// Game name, first path component under the data root
    pub game: String,

    /// Variant index, second path component
    pub variant: u32,

    /// Uncompressed block size of tier files
    pub block_size: u32,

    /// What type of compression is used
    pub compression: CompressionType,

    /// Memory budget in bytes for simultaneously loaded child tiers
    pub memory_budget: u64,

    /// Worker thread count, constant per tier solve
    pub thread_count: usize,

    /// Decompressed blocks cached per probe handle
    pub probe_cache_blocks: usize,

    /// Algorithm for loopy tiers
    pub loopy_solver: LoopySolver,

    /// Whether the value-iteration solver writes crash checkpoints
    pub checkpointing: bool,
}

impl Config {
    /// Initializes a new config for one game variant under `path`.
    pub fn new<P: AsRef<Path>>(path: P, game: &str, variant: u32) -> Self {
        Self {
            path: path.as_ref().into(),
            game: game.into(),
            variant,
            block_size: /* 1 MiB */ 1_024 * 1_024,
            compression: CompressionType::Lz4,
            memory_budget: /* 4 GiB */ 4 * 1_024 * 1_024 * 1_024,
            thread_count: crate::parallel::thread_count(),
            probe_cache_blocks: 8,
            loopy_solver: LoopySolver::default(),
            checkpointing: true,
        }
    }

    /// Sets the uncompressed block size of tier files.
    #[must_use]
    pub fn block_size(mut self, bytes: u32) -> Self {
        assert!(bytes >= 1_024, "block size must be >= 1 KiB");
        assert!(bytes <= 4 * 1_024 * 1_024, "block size must be <= 4 MiB");

        self.block_size = bytes;
        self
    }

    /// Sets the compression type of tier files.
    #[must_use]
    pub fn compression(mut self, compression: CompressionType) -> Self {
        self.compression = compression;
        self
    }

    /// Sets the memory budget for simultaneously loaded child tiers.
    #[must_use]
    pub fn memory_budget(mut self, bytes: u64) -> Self {
        self.memory_budget = bytes;
        self
    }

    /// Sets the algorithm used on loopy tiers.
    #[must_use]
    pub fn loopy_solver(mut self, solver: LoopySolver) -> Self {
        self.loopy_solver = solver;
        self
    }

    /// Enables or disables value-iteration checkpointing.
    #[must_use]
    pub fn checkpointing(mut self, enabled: bool) -> Self {
        self.checkpointing = enabled;
        self
    }

    /// Opens the database for this configuration.
    pub fn open(self) -> crate::Result<crate::Database> {
        crate::Database::open(self)
    }
}
