// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! A K.I.S.S. strong solver for finite two-player perfect-information
//! games.
//!
//! ##### About
//!
//! Given a game described through the [`api::TierGame`] contract (move
//! generation, primitive outcomes, a tier decomposition of the position
//! space), the solver computes, for every reachable legal position, its
//! game-theoretic value (win / lose / tie / draw) and *remoteness* (the
//! distance in plies to the determining terminal under optimal play).
//!
//! Results are persisted tier by tier as append-only, block-compressed
//! record files that support both bulk loads (during solving, when a
//! tier's children must be resident) and random-access probing (during
//! later gameplay and analysis).
//!
//! Tiers are solved children-first. Three per-tier algorithms exist:
//!
//! - *immediate-transition* for tiers whose moves all exit the tier,
//! - *backward induction* for tiers with internal cycles, driven by a
//!   remoteness-indexed frontier,
//! - *value iteration* as a low-memory alternative, with crash
//!   checkpointing.
//!
//! # Example usage
//!
//! ```
//! use tier_solver::api::{Game, Regular};
//! use tier_solver::{Config, Move, Position, SolveOptions, TierManager, Value};
//! use std::sync::Arc;
//! #
//! # let folder = tempfile::tempdir()?;
//!
//! // Three positions: 0 moves to 1, 1 moves to 2, 2 is a lost terminal
//! struct Chain;
//!
//! impl Game for Chain {
//!     fn size(&self) -> u64 {
//!         3
//!     }
//!
//!     fn initial_position(&self) -> Position {
//!         0
//!     }
//!
//!     fn generate_moves(&self, position: Position) -> Vec<Move> {
//!         if position < 2 { vec![0] } else { vec![] }
//!     }
//!
//!     fn primitive(&self, position: Position) -> Value {
//!         if position == 2 { Value::Lose } else { Value::Undecided }
//!     }
//!
//!     fn do_move(&self, position: Position, _mv: Move) -> Position {
//!         position + 1
//!     }
//! }
//!
//! let db = Config::new(folder.path(), "chain", 0).open()?;
//! let mut manager = TierManager::new(db, Arc::new(Regular::new(Chain)));
//!
//! manager.solve_all(SolveOptions::default())?;
//!
//! // The initial position is a win in two plies
//! let db = manager.into_database();
//! let mut probe = db.probe_init();
//! let tp = tier_solver::TierPosition::new(0, 0);
//!
//! assert_eq!(Value::Win, db.probe_value(&mut probe, tp)?);
//! assert_eq!(2, db.probe_remoteness(&mut probe, tp)?);
//! #
//! # Ok::<(), tier_solver::Error>(())
//! ```

#![deny(unsafe_code)]
#![deny(clippy::all, missing_docs, clippy::cargo)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::indexing_slicing)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]
#![warn(clippy::multiple_crate_versions)]
#![allow(clippy::option_if_let_else)]

pub mod analysis;

pub mod api;

#[doc(hidden)]
pub mod bitset;

pub mod block;

mod checksum;

#[doc(hidden)]
pub mod coding;

mod compression;

mod config;

pub mod db;

mod error;

#[doc(hidden)]
pub mod fail_signal;

#[doc(hidden)]
pub mod file;

#[doc(hidden)]
pub mod parallel;

mod record;

mod record_array;

pub mod solver;

mod tier;

mod value;

mod version;

pub use {
    checksum::Checksum,
    compression::CompressionType,
    config::{Config, LoopySolver},
    db::{Database, DbProbe, TierStatus},
    error::{ApiMismatchKind, Error, Result},
    record::{Record, Remoteness, RECORD_WIDTH},
    record_array::RecordArray,
    solver::{SolveOptions, TierManager, TierResult},
    tier::{Move, Position, Tier, TierPosition, TierType},
    value::Value,
};
