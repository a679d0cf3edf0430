// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Persistence of per-tier analyses (`.stat`) and discovery maps
//! (`.map`) under `<data>/<game>/<variant>/analysis/`.

use super::Analysis;
use crate::bitset::ConcurrentBitset;
use crate::block::{write_stream, write_to_path, TierFile};
use crate::coding::{Decode, Encode};
use crate::{Database, Tier};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;

/// Writes a tier's analysis to its `.stat` file, atomically.
pub fn save_analysis(db: &Database, tier: Tier, analysis: &Analysis) -> crate::Result<()> {
    let encoded = analysis.encode_into_vec();

    write_to_path(
        &db.stat_path(tier),
        encoded.as_slice(),
        db.config().block_size,
        db.config().compression,
    )
}

/// Reads a tier's analysis back from its `.stat` file.
pub fn load_analysis(db: &Database, tier: Tier) -> crate::Result<Analysis> {
    let bytes = TierFile::open(db.stat_path(tier))?.read_to_vec()?;

    Analysis::decode_from(&mut &*bytes).map_err(crate::Error::Decode)
}

/// Writes a tier's discovery map to its `.map` file, atomically.
///
/// Layout: 8-byte little-endian bit count, then the block-compressed
/// bitstream.
pub fn save_map(db: &Database, tier: Tier, map: &ConcurrentBitset) -> crate::Result<()> {
    let path = db.map_path(tier);

    #[allow(clippy::expect_used)]
    let folder = path.parent().expect("should have a parent");

    let mut temp_file = tempfile::NamedTempFile::new_in(folder)?;

    {
        let file = temp_file.as_file_mut();
        file.write_u64::<LittleEndian>(map.len())?;

        let bytes = map.to_bytes();
        write_stream(
            file,
            bytes.as_slice(),
            db.config().block_size,
            db.config().compression,
        )?;

        file.sync_all()?;
    }

    temp_file
        .persist(&path)
        .map_err(|e| crate::Error::Io(e.error))?;

    crate::file::fsync_directory(folder)?;

    Ok(())
}

/// Reads a tier's discovery map back from its `.map` file.
pub fn load_map(db: &Database, tier: Tier) -> crate::Result<ConcurrentBitset> {
    let mut file = File::open(db.map_path(tier))?;

    let bits = file.read_u64::<LittleEndian>()?;

    let bytes = TierFile::from_file(file)?.read_to_vec()?;

    ConcurrentBitset::from_bytes(bits, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Config, Value};
    use test_log::test;

    fn test_db(dir: &tempfile::TempDir) -> crate::Result<Database> {
        Config::new(dir.path(), "stats", 0).block_size(1_024).open()
    }

    #[test]
    fn stat_file_roundtrip() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let db = test_db(&dir)?;

        let mut analysis = Analysis {
            tier: 4,
            tier_size: 1_000,
            legal_count: 700,
            total_moves: 2_100,
            ..Analysis::default()
        };
        analysis.canonical.record(Value::Win, 5, 123);

        save_analysis(&db, 4, &analysis)?;
        assert_eq!(analysis, load_analysis(&db, 4)?);

        Ok(())
    }

    #[test]
    fn map_file_roundtrip() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let db = test_db(&dir)?;

        let map = ConcurrentBitset::new(10_001);
        for i in (0..10_001).step_by(3) {
            map.set(i);
        }

        save_map(&db, 2, &map)?;

        let restored = load_map(&db, 2)?;
        assert_eq!(10_001, restored.len());
        assert_eq!(map.count_ones(), restored.count_ones());
        assert!(restored.get(9999));
        assert!(!restored.get(10_000));

        Ok(())
    }

    #[test]
    fn missing_stat_file_is_an_error() -> crate::Result<()> {
        let dir = tempfile::tempdir()?;
        let db = test_db(&dir)?;

        assert!(load_analysis(&db, 99).is_err());

        Ok(())
    }
}
