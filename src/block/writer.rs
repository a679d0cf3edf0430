// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use super::handle::{BlockHandle, BlockOffset};
use super::header::BlockHeader;
use super::index::{BlockEntry, BlockIndex};
use super::trailer::Trailer;
use crate::coding::Encode;
use crate::record::RECORD_WIDTH;
use crate::version::FormatVersion;
use crate::{Checksum, CompressionType, RecordArray};
use std::io::{Seek, Write};
use std::ops::Range;

/// A byte stream that can be cut into blocks and compressed.
///
/// Implemented by [`RecordArray`] (8-byte records) and by plain byte
/// slices (bitstreams, checkpoint payloads).
pub trait BlockSource: Sync {
    /// Total uncompressed stream length in bytes.
    fn stream_len(&self) -> u64;

    /// Record width noted in the trailer; 0 for raw byte streams.
    fn record_width(&self) -> u8;

    /// Record count noted in the trailer; byte count for raw streams.
    fn record_count(&self) -> u64;

    /// Copies the byte range onto `out`.
    ///
    /// `range` is always aligned to `record_width` (if non-zero).
    fn fill(&self, range: Range<u64>, out: &mut Vec<u8>);
}

impl BlockSource for RecordArray {
    fn stream_len(&self) -> u64 {
        self.len() * RECORD_WIDTH as u64
    }

    fn record_width(&self) -> u8 {
        RECORD_WIDTH as u8
    }

    fn record_count(&self) -> u64 {
        self.len()
    }

    fn fill(&self, range: Range<u64>, out: &mut Vec<u8>) {
        debug_assert_eq!(0, range.start % RECORD_WIDTH as u64);
        debug_assert_eq!(0, range.end % RECORD_WIDTH as u64);

        self.write_range_into(
            (range.start / RECORD_WIDTH as u64)..(range.end / RECORD_WIDTH as u64),
            out,
        );
    }
}

impl BlockSource for [u8] {
    fn stream_len(&self) -> u64 {
        self.len() as u64
    }

    fn record_width(&self) -> u8 {
        0
    }

    fn record_count(&self) -> u64 {
        self.len() as u64
    }

    fn fill(&self, range: Range<u64>, out: &mut Vec<u8>) {
        #[allow(clippy::indexing_slicing)]
        out.extend_from_slice(&self[range.start as usize..range.end as usize]);
    }
}

/// Rounds `block_size` up to the source's record alignment.
fn aligned_block_size(block_size: u32, width: u8) -> u64 {
    let block_size = u64::from(block_size.max(1));

    match width {
        0 => block_size,
        width => block_size.next_multiple_of(u64::from(width)),
    }
}

/// Cuts `source` into blocks, compresses them in bounded parallel
/// waves, and writes blocks + index + trailer onto `writer`.
///
/// The stream is self-contained as long as it is the last thing in the
/// file: readers bootstrap from the trailer at EOF. Callers may write
/// arbitrary prefix bytes (bit counts, checkpoint metadata) before the
/// stream.
pub fn write_stream<W: Write + Seek, S: BlockSource + ?Sized>(
    writer: &mut W,
    source: &S,
    block_size: u32,
    compression: CompressionType,
) -> crate::Result<Trailer> {
    let stream_len = source.stream_len();
    let block_size_bytes = aligned_block_size(block_size, source.record_width());
    let block_count = stream_len.div_ceil(block_size_bytes);

    log::trace!(
        "writing {stream_len} byte stream as {block_count} blocks of {block_size_bytes} ({compression})",
    );

    let mut entries = Vec::with_capacity(block_count as usize);

    // NOTE: Compress a wave of blocks in parallel, then drain it to
    // disk in file order; peak memory stays bounded by the wave
    let wave_len = (rayon::current_num_threads() * 2).max(1) as u64;
    let mut next_block = 0u64;

    while next_block < block_count {
        let wave: Vec<u64> = (next_block..(next_block + wave_len).min(block_count)).collect();
        next_block += wave.len() as u64;

        let compressed = crate::parallel::map_items(wave, |block| {
            let start = block * block_size_bytes;
            let end = (start + block_size_bytes).min(stream_len);

            let mut payload = Vec::new();
            source.fill(start..end, &mut payload);

            let checksum = Checksum::over(&payload);
            let uncompressed_length = payload.len() as u32;
            let payload = compression.compress(&payload);

            (
                BlockHeader {
                    checksum,
                    data_length: payload.len() as u32,
                    uncompressed_length,
                },
                payload,
            )
        });

        for (header, payload) in compressed {
            let offset = BlockOffset(writer.stream_position()?);

            header.encode_into(writer)?;
            writer.write_all(&payload)?;

            entries.push(BlockEntry {
                handle: BlockHandle::new(offset, header.data_length),
                uncompressed_length: header.uncompressed_length,
            });
        }
    }

    // NOTE: The index block is never compressed; bootstrap cannot
    // depend on the codec
    let index = BlockIndex::new(entries);
    let index_payload = index.encode_into_vec();

    let index_offset = BlockOffset(writer.stream_position()?);

    BlockHeader {
        checksum: Checksum::over(&index_payload),
        data_length: index_payload.len() as u32,
        uncompressed_length: index_payload.len() as u32,
    }
    .encode_into(writer)?;

    writer.write_all(&index_payload)?;

    let trailer = Trailer {
        version: FormatVersion::V0,
        compression,
        record_width: source.record_width(),
        record_count: source.record_count(),
        block_size: block_size_bytes as u32,
        index: BlockHandle::new(index_offset, index_payload.len() as u32),
    };

    trailer.write_into(writer)?;
    writer.flush()?;

    Ok(trailer)
}

/// Atomically writes `source` as a self-contained block stream at `path`.
pub fn write_to_path<S: BlockSource + ?Sized>(
    path: &std::path::Path,
    source: &S,
    block_size: u32,
    compression: CompressionType,
) -> crate::Result<()> {
    #[allow(clippy::expect_used)]
    let folder = path.parent().expect("should have a parent");

    let mut temp_file = tempfile::NamedTempFile::new_in(folder)?;

    write_stream(temp_file.as_file_mut(), source, block_size, compression)?;

    temp_file.as_file_mut().sync_all()?;
    temp_file
        .persist(path)
        .map_err(|e| crate::Error::Io(e.error))?;

    crate::file::fsync_directory(folder)?;

    Ok(())
}
