// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Coarse-grained tier distribution over a request/response transport.
//!
//! One process acts as the scheduler; any number of workers solve one
//! tier at a time. Workers only ever talk to the scheduler, and every
//! worker message gets exactly one response. No transport is mandated:
//! the [`Scheduler`] is a plain state machine, and the messages encode
//! to bytes for whatever carrier (MPI, sockets) the deployment uses.

use crate::api::TierGame;
use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use crate::Tier;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;
use std::io::{Read, Write};

/// Worker-to-scheduler message.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WorkerRequest {
    /// Idle, asking for work
    Check,

    /// Finished solving the tier
    Solved(Tier),

    /// Found the tier already solved on disk; no work was done
    Loaded(Tier),

    /// Failed on the tier with an error code
    Error(Tier, u32),
}

/// Scheduler-to-worker message.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ManagerResponse {
    /// Solve this tier (skip if already solved on disk)
    Solve(Tier),

    /// Re-solve this tier even if already solved
    ForceSolve(Tier),

    /// Nothing is dispatchable right now; ask again later
    Sleep,

    /// All work is done (or the run failed); shut down
    Terminate,
}

impl Encode for WorkerRequest {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        match self {
            Self::Check => writer.write_u8(0)?,
            Self::Solved(tier) => {
                writer.write_u8(1)?;
                writer.write_u64::<LittleEndian>(*tier)?;
            }
            Self::Loaded(tier) => {
                writer.write_u8(2)?;
                writer.write_u64::<LittleEndian>(*tier)?;
            }
            Self::Error(tier, code) => {
                writer.write_u8(3)?;
                writer.write_u64::<LittleEndian>(*tier)?;
                writer.write_u32::<LittleEndian>(*code)?;
            }
        }

        Ok(())
    }
}

impl Decode for WorkerRequest {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let tag = reader.read_u8()?;

        match tag {
            0 => Ok(Self::Check),
            1 => Ok(Self::Solved(reader.read_u64::<LittleEndian>()?)),
            2 => Ok(Self::Loaded(reader.read_u64::<LittleEndian>()?)),
            3 => Ok(Self::Error(
                reader.read_u64::<LittleEndian>()?,
                reader.read_u32::<LittleEndian>()?,
            )),
            tag => Err(DecodeError::InvalidTag(("WorkerRequest", tag))),
        }
    }
}

impl Encode for ManagerResponse {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        match self {
            Self::Solve(tier) => {
                writer.write_u8(0)?;
                writer.write_u64::<LittleEndian>(*tier)?;
            }
            Self::ForceSolve(tier) => {
                writer.write_u8(1)?;
                writer.write_u64::<LittleEndian>(*tier)?;
            }
            Self::Sleep => writer.write_u8(2)?,
            Self::Terminate => writer.write_u8(3)?,
        }

        Ok(())
    }
}

impl Decode for ManagerResponse {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let tag = reader.read_u8()?;

        match tag {
            0 => Ok(Self::Solve(reader.read_u64::<LittleEndian>()?)),
            1 => Ok(Self::ForceSolve(reader.read_u64::<LittleEndian>()?)),
            2 => Ok(Self::Sleep),
            3 => Ok(Self::Terminate),
            tag => Err(DecodeError::InvalidTag(("ManagerResponse", tag))),
        }
    }
}

/// The scheduler's dispatch state.
///
/// A tier becomes dispatchable once all its canonical children are
/// solved; a worker error fails the whole run and every subsequent
/// message is answered with [`ManagerResponse::Terminate`].
pub struct Scheduler {
    force: bool,
    blockers: FxHashMap<Tier, usize>,
    parents_of: FxHashMap<Tier, Vec<Tier>>,
    ready: VecDeque<Tier>,
    dispatched: FxHashSet<Tier>,
    solved: FxHashSet<Tier>,
    remaining: usize,
    failed: bool,
}

impl Scheduler {
    /// Builds the dispatch state from the game's tier graph.
    pub fn new(game: &dyn TierGame, force: bool) -> crate::Result<Self> {
        let (order, children_of) = super::manager::discover_tier_graph(game)?;

        let blockers: FxHashMap<Tier, usize> = children_of
            .iter()
            .map(|(&tier, children)| (tier, children.len()))
            .collect();

        let mut parents_of: FxHashMap<Tier, Vec<Tier>> = FxHashMap::default();

        for (&tier, children) in &children_of {
            for &child in children {
                parents_of.entry(child).or_default().push(tier);
            }
        }

        let ready: VecDeque<Tier> = order
            .iter()
            .filter(|tier| blockers.get(tier) == Some(&0))
            .copied()
            .collect();

        Ok(Self {
            force,
            blockers,
            parents_of,
            ready,
            dispatched: FxHashSet::default(),
            solved: FxHashSet::default(),
            remaining: order.len(),
            failed: false,
        })
    }

    /// Whether every tier has been solved.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.remaining == 0
    }

    /// Whether a worker reported a fatal error.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Answers one worker message.
    pub fn handle(&mut self, request: WorkerRequest) -> ManagerResponse {
        match request {
            WorkerRequest::Check => {}
            WorkerRequest::Solved(tier) | WorkerRequest::Loaded(tier) => self.mark_solved(tier),
            WorkerRequest::Error(tier, code) => {
                log::error!("worker failed on tier {tier} with code {code}");
                self.failed = true;
            }
        }

        if self.failed || self.is_done() {
            return ManagerResponse::Terminate;
        }

        match self.ready.pop_front() {
            Some(tier) => {
                self.dispatched.insert(tier);

                if self.force {
                    ManagerResponse::ForceSolve(tier)
                } else {
                    ManagerResponse::Solve(tier)
                }
            }
            None => ManagerResponse::Sleep,
        }
    }

    fn mark_solved(&mut self, tier: Tier) {
        if !self.solved.insert(tier) {
            log::warn!("tier {tier} was reported solved twice");
            return;
        }

        self.dispatched.remove(&tier);
        self.remaining -= 1;

        for &parent in self.parents_of.get(&tier).map_or(&[][..], Vec::as_slice) {
            #[allow(clippy::expect_used)]
            let count = self
                .blockers
                .get_mut(&parent)
                .expect("parent was discovered");
            *count -= 1;

            if *count == 0 {
                self.ready.push_back(parent);
            }
        }
    }
}
