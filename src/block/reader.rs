// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::index::{BlockEntry, BlockIndex};
use super::trailer::Trailer;
use super::Block;
use crate::record::RECORD_WIDTH;
use crate::RecordArray;
use std::fs::File;
use std::path::Path;

/// A block-compressed stream opened for reading.
///
/// Bootstraps from the trailer at EOF, then serves bulk loads. For
/// random access, see [`super::Probe`].
pub struct TierFile {
    pub(crate) file: File,
    pub(crate) trailer: Trailer,
    pub(crate) index: BlockIndex,
}

impl TierFile {
    /// Opens the stream at `path`, reading trailer and block index.
    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let file = File::open(path)?;
        Self::from_file(file)
    }

    /// Bootstraps from an already-open file.
    pub fn from_file(file: File) -> crate::Result<Self> {
        let trailer = Trailer::from_file(&file)?;

        // The index block is never compressed
        let index_block = Block::from_file(
            &file,
            &BlockEntry {
                handle: trailer.index,
                uncompressed_length: trailer.index.size(),
            },
            crate::CompressionType::None,
        )?;

        let index =
            <BlockIndex as crate::coding::Decode>::decode_from(&mut &*index_block.data)?;

        Ok(Self {
            file,
            trailer,
            index,
        })
    }

    /// The parsed trailer.
    #[must_use]
    pub fn trailer(&self) -> &Trailer {
        &self.trailer
    }

    /// Number of records (bytes, for raw streams).
    #[must_use]
    pub fn record_count(&self) -> u64 {
        self.trailer.record_count
    }

    /// Total uncompressed stream length in bytes.
    #[must_use]
    pub fn uncompressed_length(&self) -> u64 {
        self.index.uncompressed_length()
    }

    /// Fully decompresses the stream into `records`, in parallel.
    ///
    /// The array must be sized to the stream's record count.
    pub fn read_into(&self, records: &RecordArray) -> crate::Result<()> {
        if self.trailer.record_width as usize != RECORD_WIDTH {
            return Err(crate::Error::IllegalArgument(format!(
                "stream holds records of width {}, expected {RECORD_WIDTH}",
                self.trailer.record_width,
            )));
        }

        if self.record_count() != records.len() {
            return Err(crate::Error::IllegalArgument(format!(
                "stream holds {} records, array expects {}",
                self.record_count(),
                records.len(),
            )));
        }

        let results = crate::parallel::map_items(
            (0..self.index.len()).collect(),
            |i| -> crate::Result<()> {
                #[allow(clippy::indexing_slicing)]
                let entry = &self.index.entries()[i];

                let block = Block::from_file(&self.file, entry, self.trailer.compression)?;
                let first = self.index.start_of(i) / RECORD_WIDTH as u64;

                records.fill_from_bytes(first, &block.data)
            },
        );

        results.into_iter().collect()
    }

    /// Fully decompresses the stream into one buffer, in parallel.
    pub fn read_to_vec(&self) -> crate::Result<Vec<u8>> {
        let chunks = crate::parallel::map_items(
            (0..self.index.len()).collect(),
            |i| -> crate::Result<Vec<u8>> {
                #[allow(clippy::indexing_slicing)]
                let entry = &self.index.entries()[i];

                Ok(Block::from_file(&self.file, entry, self.trailer.compression)?.data)
            },
        );

        let mut out = Vec::with_capacity(self.uncompressed_length() as usize);

        for chunk in chunks {
            out.extend_from_slice(&chunk?);
        }

        Ok(out)
    }
}
