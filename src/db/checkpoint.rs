// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::block::{write_stream, TierFile};
use crate::file::MAGIC_BYTES;
use crate::record::Remoteness;
use crate::{CompressionType, RecordArray};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Where a long-running solve was when it last checkpointed.
///
/// `step` is solver-defined (the value-iteration phase); `remoteness`
/// is the sweep depth to resume at.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CheckpointMeta {
    /// Solver-defined phase counter
    pub step: u8,

    /// Sweep depth to resume at
    pub remoteness: Remoteness,
}

/// Atomically writes a checkpoint: the metadata prefix, then a
/// block-compressed snapshot of the record array.
pub fn save(
    path: &Path,
    meta: CheckpointMeta,
    records: &RecordArray,
    block_size: u32,
    compression: CompressionType,
) -> crate::Result<()> {
    #[allow(clippy::expect_used)]
    let folder = path.parent().expect("should have a parent");

    let mut temp_file = tempfile::NamedTempFile::new_in(folder)?;

    {
        let file = temp_file.as_file_mut();
        file.write_all(&MAGIC_BYTES)?;
        file.write_u8(meta.step)?;
        file.write_u32::<LittleEndian>(meta.remoteness)?;

        write_stream(file, records, block_size, compression)?;
        file.sync_all()?;
    }

    temp_file
        .persist(path)
        .map_err(|e| crate::Error::Io(e.error))?;

    crate::file::fsync_directory(folder)?;

    Ok(())
}

/// Loads a checkpoint back into memory.
///
/// The snapshot must hold exactly `expected_records` records.
pub fn load(path: &Path, expected_records: u64) -> crate::Result<(CheckpointMeta, RecordArray)> {
    let mut file = File::open(path)?;

    let mut magic = [0u8; MAGIC_BYTES.len()];
    std::io::Read::read_exact(&mut file, &mut magic)?;

    if magic != MAGIC_BYTES {
        return Err(crate::Error::Decode(crate::coding::DecodeError::InvalidHeader(
            "Checkpoint",
        )));
    }

    let step = file.read_u8()?;
    let remoteness = file.read_u32::<LittleEndian>()?;

    let stream = TierFile::from_file(file)?;
    let records = RecordArray::new(expected_records)?;
    stream.read_into(&records)?;

    Ok((CheckpointMeta { step, remoteness }, records))
}
