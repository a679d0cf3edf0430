// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::handle::{BlockHandle, BlockOffset};
use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use std::io::{Read, Write};
use varint_rs::{VarintReader, VarintWriter};

/// One data block as seen by the index: where it is on disk and how
/// large it decompresses to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BlockEntry {
    /// Location and on-disk size of the block
    pub handle: BlockHandle,

    /// Uncompressed payload size
    pub uncompressed_length: u32,
}

/// Maps block numbers to compressed offsets, and logical (uncompressed)
/// stream offsets to block numbers.
#[derive(Debug, Default)]
pub struct BlockIndex {
    entries: Vec<BlockEntry>,

    /// Logical stream offset at which each block starts; one extra
    /// trailing element holding the total uncompressed length.
    starts: Vec<u64>,
}

impl BlockIndex {
    /// Builds an index from entries in file order.
    #[must_use]
    pub fn new(entries: Vec<BlockEntry>) -> Self {
        let mut starts = Vec::with_capacity(entries.len() + 1);
        let mut acc = 0u64;

        for entry in &entries {
            starts.push(acc);
            acc += u64::from(entry.uncompressed_length);
        }
        starts.push(acc);

        Self { entries, starts }
    }

    /// Number of data blocks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the stream has no data blocks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in file order.
    #[must_use]
    pub fn entries(&self) -> &[BlockEntry] {
        &self.entries
    }

    /// Total uncompressed stream length.
    #[must_use]
    pub fn uncompressed_length(&self) -> u64 {
        self.starts.last().copied().unwrap_or(0)
    }

    /// Logical stream offset at which block `idx` starts.
    #[must_use]
    #[allow(clippy::indexing_slicing)]
    pub fn start_of(&self, idx: usize) -> u64 {
        debug_assert!(idx < self.entries.len());

        self.starts[idx]
    }

    /// The block containing logical stream offset `pos`, or `None` past
    /// the end of the stream.
    #[must_use]
    pub fn block_containing(&self, pos: u64) -> Option<usize> {
        if pos >= self.uncompressed_length() {
            return None;
        }

        // partition_point: first block starting after pos, minus one
        let idx = self.starts.partition_point(|start| *start <= pos) - 1;
        Some(idx)
    }
}

impl Encode for BlockIndex {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        writer.write_u64_varint(self.entries.len() as u64)?;

        for entry in &self.entries {
            writer.write_u64_varint(*entry.handle.offset())?;
            writer.write_u32_varint(entry.handle.size())?;
            writer.write_u32_varint(entry.uncompressed_length)?;
        }

        Ok(())
    }
}

impl Decode for BlockIndex {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let count = reader.read_u64_varint()?;

        let mut entries = Vec::with_capacity(count as usize);

        for _ in 0..count {
            let offset = reader.read_u64_varint()?;
            let size = reader.read_u32_varint()?;
            let uncompressed_length = reader.read_u32_varint()?;

            entries.push(BlockEntry {
                handle: BlockHandle::new(BlockOffset(offset), size),
                uncompressed_length,
            });
        }

        Ok(Self::new(entries))
    }
}
