// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::handle::BlockHandle;
use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use crate::file::MAGIC_BYTES;
use crate::version::FormatVersion;
use crate::CompressionType;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{Read, Write};

const TRAILER_SIZE: usize = 64;

/// The fixed-size footer of a block-compressed stream.
///
/// Lives in the last [`TRAILER_SIZE`] bytes of the file, so a reader
/// can bootstrap from EOF: parse the trailer, fetch the index block it
/// points to, then address any data block.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Trailer {
    /// Disk format version
    pub version: FormatVersion,

    /// Compression applied to data blocks
    pub compression: CompressionType,

    /// Width of one record in bytes (0 for raw byte payloads)
    pub record_width: u8,

    /// Number of records in the stream (or payload bytes if raw)
    pub record_count: u64,

    /// Uncompressed block size the stream was partitioned with
    pub block_size: u32,

    /// Location of the index block
    pub index: BlockHandle,
}

impl Trailer {
    /// Writes the trailer, zero-padded to its fixed size.
    pub fn write_into<W: Write>(&self, writer: &mut W) -> crate::Result<()> {
        let mut v = Vec::with_capacity(TRAILER_SIZE);

        v.write_all(&MAGIC_BYTES)?;
        self.encode_into(&mut v)?;

        // Pad with remaining bytes
        v.resize(TRAILER_SIZE, 0);

        assert_eq!(v.len(), TRAILER_SIZE, "tier file trailer has invalid size");

        writer.write_all(&v)?;

        Ok(())
    }

    /// Reads the trailer from the end of `file`.
    pub fn from_file(file: &File) -> crate::Result<Self> {
        let len = file.metadata()?.len();

        if len < TRAILER_SIZE as u64 {
            return Err(crate::Error::Decode(DecodeError::InvalidTrailer));
        }

        let buf = crate::file::read_exact_at(file, len - TRAILER_SIZE as u64, TRAILER_SIZE)?;
        let mut reader = &buf[..];

        let mut magic = [0u8; MAGIC_BYTES.len()];
        reader.read_exact(&mut magic)?;

        if magic != MAGIC_BYTES {
            return Err(crate::Error::Decode(DecodeError::InvalidTrailer));
        }

        Self::decode_from(&mut reader).map_err(crate::Error::Decode)
    }
}

impl Encode for Trailer {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        writer.write_u8(u8::from(self.version))?;
        self.compression.encode_into(writer)?;
        writer.write_u8(self.record_width)?;
        writer.write_u64::<LittleEndian>(self.record_count)?;
        writer.write_u32::<LittleEndian>(self.block_size)?;
        self.index.encode_into(writer)?;
        Ok(())
    }
}

impl Decode for Trailer {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let version = reader.read_u8()?;
        let version =
            FormatVersion::try_from(version).map_err(|()| DecodeError::InvalidTrailer)?;

        let compression = CompressionType::decode_from(reader)?;
        let record_width = reader.read_u8()?;
        let record_count = reader.read_u64::<LittleEndian>()?;
        let block_size = reader.read_u32::<LittleEndian>()?;
        let index = BlockHandle::decode_from(reader)?;

        Ok(Self {
            version,
            compression,
            record_width,
            record_count,
            block_size,
            index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::handle::BlockOffset;
    use test_log::test;

    #[test]
    fn trailer_roundtrip() -> crate::Result<()> {
        let before = Trailer {
            version: FormatVersion::V0,
            compression: CompressionType::Lz4,
            record_width: 8,
            record_count: 1_000_000,
            block_size: 1 << 20,
            index: BlockHandle::new(BlockOffset(987_654), 321),
        };

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("trailer");

        {
            let mut file = File::create(&path)?;
            // Simulate preceding stream bytes
            file.write_all(&[0xAB; 100])?;
            before.write_into(&mut file)?;
            file.sync_all()?;
        }

        let file = File::open(&path)?;
        let after = Trailer::from_file(&file)?;
        assert_eq!(before, after);

        Ok(())
    }

    #[test]
    fn trailer_rejects_short_file() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("short");
        std::fs::write(&path, b"tiny")?;

        let file = File::open(&path)?;
        assert!(Trailer::from_file(&file).is_err());

        Ok(())
    }
}
