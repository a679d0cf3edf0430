// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The on-disk tier file: a sequence of independently decompressible
//! blocks, a block index, and a fixed-size trailer at EOF.
//!
//! ```text
//! [block 0][block 1]...[block n-1][index block][trailer]
//! ```
//!
//! Every block carries a checksum over its uncompressed payload, so a
//! tier file can be both bulk-loaded (decompress all blocks, in
//! parallel) and probed (seek into the logical uncompressed stream,
//! decompressing only the touched block).

mod handle;
mod header;
mod index;
mod probe;
mod reader;
mod trailer;
mod writer;

pub use handle::{BlockHandle, BlockOffset};
pub use header::BlockHeader;
pub use index::{BlockEntry, BlockIndex};
pub use probe::Probe;
pub use reader::TierFile;
pub use trailer::Trailer;
pub use writer::{write_stream, write_to_path, BlockSource};

use crate::CompressionType;
use std::fs::File;

/// A block read back from disk, uncompressed and checksum-verified.
pub struct Block {
    /// The header as stored on disk
    pub header: BlockHeader,

    /// Uncompressed payload
    pub data: Vec<u8>,
}

impl Block {
    /// Returns the uncompressed block size in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Loads a block from `file`, decompressing and verifying it.
    pub fn from_file(
        file: &File,
        entry: &BlockEntry,
        compression: CompressionType,
    ) -> crate::Result<Self> {
        let buf = crate::file::read_exact_at(
            file,
            *entry.handle.offset(),
            BlockHeader::serialized_len() + entry.handle.size() as usize,
        )?;

        let mut reader = &buf[..];
        let header = <BlockHeader as crate::coding::Decode>::decode_from(&mut reader)?;

        if header.data_length != entry.handle.size() {
            return Err(crate::Error::Decode(crate::coding::DecodeError::InvalidHeader(
                "BlockEntry",
            )));
        }

        let data = compression.decompress(reader, header.uncompressed_length as usize)?;

        crate::Checksum::over(&data).check(header.checksum)?;

        Ok(Self { header, data })
    }
}
