// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use crate::file::MAGIC_BYTES;
use crate::Checksum;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Header of a disk-based block
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct BlockHeader {
    /// Checksum over the uncompressed payload
    pub checksum: Checksum,

    /// On-disk size of the payload
    pub data_length: u32,

    /// Uncompressed size of the payload
    pub uncompressed_length: u32,
}

impl BlockHeader {
    /// On-disk header size in bytes.
    #[must_use]
    pub const fn serialized_len() -> usize {
        MAGIC_BYTES.len()
            // Checksum
            + std::mem::size_of::<u128>()
            // On-disk size
            + std::mem::size_of::<u32>()
            // Uncompressed data length
            + std::mem::size_of::<u32>()
    }
}

impl Encode for BlockHeader {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        writer.write_all(&MAGIC_BYTES)?;
        writer.write_u128::<LittleEndian>(self.checksum.into_u128())?;
        writer.write_u32::<LittleEndian>(self.data_length)?;
        writer.write_u32::<LittleEndian>(self.uncompressed_length)?;
        Ok(())
    }
}

impl Decode for BlockHeader {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let mut magic = [0u8; MAGIC_BYTES.len()];
        reader.read_exact(&mut magic)?;

        if magic != MAGIC_BYTES {
            return Err(DecodeError::InvalidHeader("Block"));
        }

        let checksum = reader.read_u128::<LittleEndian>()?;
        let data_length = reader.read_u32::<LittleEndian>()?;
        let uncompressed_length = reader.read_u32::<LittleEndian>()?;

        Ok(Self {
            checksum: Checksum::from_raw(checksum),
            data_length,
            uncompressed_length,
        })
    }
}
