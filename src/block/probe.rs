// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::reader::TierFile;
use super::Block;
use crate::record::{Record, RECORD_WIDTH};
use quick_cache::{sync::Cache as QuickCache, UnitWeighter};
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

/// Default number of decompressed blocks a probe keeps around.
const DEFAULT_CACHED_BLOCKS: usize = 8;

/// Random access into a block-compressed stream.
///
/// Reads operate logically on the uncompressed stream; only the touched
/// block(s) are decompressed, and recently touched blocks are cached.
/// Also implements [`std::io::Read`] + [`std::io::Seek`] over the
/// logical stream.
pub struct Probe {
    stream: TierFile,
    cache: QuickCache<usize, Arc<Vec<u8>>, UnitWeighter, rustc_hash::FxBuildHasher>,
    pos: u64,
}

impl Probe {
    /// Opens the stream at `path` for probing.
    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        Ok(Self::new(TierFile::open(path)?, DEFAULT_CACHED_BLOCKS))
    }

    /// Wraps an open stream, caching up to `cached_blocks` decompressed
    /// blocks.
    #[must_use]
    pub fn new(stream: TierFile, cached_blocks: usize) -> Self {
        use quick_cache::sync::DefaultLifecycle;

        #[allow(clippy::default_trait_access)]
        let cache = QuickCache::with(
            cached_blocks,
            cached_blocks as u64,
            UnitWeighter,
            Default::default(),
            DefaultLifecycle::default(),
        );

        Self {
            stream,
            cache,
            pos: 0,
        }
    }

    /// Total uncompressed stream length in bytes.
    #[must_use]
    pub fn stream_len(&self) -> u64 {
        self.stream.uncompressed_length()
    }

    /// Number of records in the stream.
    #[must_use]
    pub fn record_count(&self) -> u64 {
        self.stream.record_count()
    }

    fn block(&self, idx: usize) -> crate::Result<Arc<Vec<u8>>> {
        if let Some(block) = self.cache.get(&idx) {
            // Cache hit: serve the decompressed block
            return Ok(block);
        }

        // Cache miss: load from disk
        #[allow(clippy::indexing_slicing)]
        let entry = &self.stream.index.entries()[idx];

        let block = Block::from_file(&self.stream.file, entry, self.stream.trailer.compression)?;
        let block = Arc::new(block.data);

        self.cache.insert(idx, Arc::clone(&block));

        Ok(block)
    }

    /// Reads up to `buf.len()` bytes at logical stream offset `offset`.
    ///
    /// Returns the number of bytes read; 0 at end of stream.
    pub fn read_logical(&self, mut offset: u64, buf: &mut [u8]) -> crate::Result<usize> {
        let mut written = 0usize;

        while written < buf.len() {
            let Some(idx) = self.stream.index.block_containing(offset) else {
                break;
            };

            let block = self.block(idx)?;
            let within = (offset - self.stream.index.start_of(idx)) as usize;

            #[allow(clippy::indexing_slicing)]
            let available = &block[within..];
            let n = available.len().min(buf.len() - written);

            #[allow(clippy::indexing_slicing)]
            buf[written..written + n].copy_from_slice(&available[..n]);

            written += n;
            offset += n as u64;
        }

        Ok(written)
    }

    /// Fetches the record at `position`.
    ///
    /// Only valid on record streams (trailer width 8).
    pub fn record(&self, position: u64) -> crate::Result<Record> {
        if self.stream.trailer.record_width as usize != RECORD_WIDTH {
            return Err(crate::Error::IllegalArgument(format!(
                "cannot probe records in a stream of width {}",
                self.stream.trailer.record_width,
            )));
        }

        if position >= self.record_count() {
            return Err(crate::Error::IllegalArgument(format!(
                "position {position} out of range, stream holds {} records",
                self.record_count(),
            )));
        }

        let mut buf = [0u8; RECORD_WIDTH];
        let n = self.read_logical(position * RECORD_WIDTH as u64, &mut buf)?;

        if n != RECORD_WIDTH {
            return Err(crate::Error::Decode(crate::coding::DecodeError::Io(
                std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short record read"),
            )));
        }

        Record::try_from_raw(u64::from_le_bytes(buf)).map_err(crate::Error::Decode)
    }
}

impl Read for Probe {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self
            .read_logical(self.pos, buf)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;

        self.pos += n as u64;
        Ok(n)
    }
}

impl Seek for Probe {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let len = self.stream_len() as i64;

        let target = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::Current(delta) => self.pos as i64 + delta,
            SeekFrom::End(delta) => len + delta,
        };

        if target < 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "seek before start of stream",
            ));
        }

        self.pos = target as u64;
        Ok(self.pos)
    }
}
