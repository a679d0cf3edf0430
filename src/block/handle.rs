// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// An offset into a tier file
#[derive(Copy, Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct BlockOffset(pub u64);

impl std::ops::Deref for BlockOffset {
    type Target = u64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::ops::AddAssign<u64> for BlockOffset {
    fn add_assign(&mut self, rhs: u64) {
        *self = Self(self.0 + rhs);
    }
}

impl std::fmt::Display for BlockOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Points to a block on disk: file offset plus on-disk payload size.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct BlockHandle {
    offset: BlockOffset,
    size: u32,
}

impl BlockHandle {
    /// Pairs an offset with an on-disk size.
    #[must_use]
    pub fn new(offset: BlockOffset, size: u32) -> Self {
        Self { offset, size }
    }

    /// File offset of the block header.
    #[must_use]
    pub fn offset(&self) -> BlockOffset {
        self.offset
    }

    /// On-disk payload size in bytes (excluding the block header).
    #[must_use]
    pub fn size(&self) -> u32 {
        self.size
    }
}

impl Encode for BlockHandle {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        writer.write_u64::<LittleEndian>(*self.offset)?;
        writer.write_u32::<LittleEndian>(self.size)?;
        Ok(())
    }
}

impl Decode for BlockHandle {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let offset = reader.read_u64::<LittleEndian>()?;
        let size = reader.read_u32::<LittleEndian>()?;

        Ok(Self {
            offset: BlockOffset(offset),
            size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use test_log::test;

    #[test]
    fn block_handle_roundtrip() -> crate::Result<()> {
        let before = BlockHandle::new(BlockOffset(1234), 56);

        let buf = before.encode_into_vec();
        assert_eq!(12, buf.len());

        let after = BlockHandle::decode_from(&mut Cursor::new(buf))?;
        assert_eq!(before, after);

        Ok(())
    }
}
