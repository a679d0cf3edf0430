// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The database manager: lifecycle of the solving-tier buffer, the
//! loaded child-tier buffers, and probe handles for random access.

/// Checkpoint metadata persisted alongside an in-progress solving tier.
pub mod checkpoint;

pub use checkpoint::CheckpointMeta;

use crate::block::{write_to_path, Probe, TierFile};
use crate::file::{
    ANALYSIS_FOLDER, CHECKPOINT_FILE_EXT, MAP_FILE_EXT, RECORDS_FOLDER, STAT_FILE_EXT,
    TIER_FILE_EXT,
};
use crate::record::{Record, Remoteness};
use crate::{Config, Position, RecordArray, Tier, TierPosition, Value};
use rustc_hash::FxHashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Upper bound on simultaneously loaded child tiers.
const MAX_LOADED_TIERS: usize = 256;

/// Whether a tier's results are already on disk.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TierStatus {
    /// No tier file exists
    Missing,

    /// A well-formed tier file of the expected size exists
    Solved,

    /// A file exists but could not be validated; treated as unsolved
    CheckError,
}

struct SolvingTier {
    tier: Tier,
    records: Arc<RecordArray>,
}

type Namer = Box<dyn Fn(Tier) -> String + Send + Sync>;

/// Process-wide database state for one game variant.
///
/// Holds at most one *solving* tier (the record array being written),
/// a bounded set of read-only *loaded* tiers (children of the solve),
/// and hands out probe handles for query-time random access.
///
/// Mutating operations run on the single control thread between tier
/// solves; worker threads only ever touch the record arrays themselves
/// through [`Arc`]s obtained up front.
pub struct Database {
    config: Config,
    namer: Namer,
    solving: Option<SolvingTier>,
    loaded: FxHashMap<Tier, Arc<RecordArray>>,
}

impl Database {
    /// Opens the database, creating its folder structure.
    pub fn open(config: Config) -> crate::Result<Self> {
        let this = Self {
            config,
            namer: Box::new(|tier| tier.to_string()),
            solving: None,
            loaded: FxHashMap::default(),
        };

        std::fs::create_dir_all(this.records_dir())?;
        std::fs::create_dir_all(this.analysis_dir())?;

        log::debug!(
            "opened database for {}/{} at {}",
            this.config.game,
            this.config.variant,
            this.config.path.display(),
        );

        Ok(this)
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Installs the game's tier naming callback.
    ///
    /// Without one, tiers are named by their decimal identifier.
    pub fn set_namer(&mut self, namer: Namer) {
        self.namer = namer;
    }

    fn variant_dir(&self) -> PathBuf {
        self.config
            .path
            .join(&self.config.game)
            .join(self.config.variant.to_string())
    }

    /// Folder holding tier files.
    #[must_use]
    pub fn records_dir(&self) -> PathBuf {
        self.variant_dir().join(RECORDS_FOLDER)
    }

    /// Folder holding stat and discovery-map files.
    #[must_use]
    pub fn analysis_dir(&self) -> PathBuf {
        self.variant_dir().join(ANALYSIS_FOLDER)
    }

    /// Path of a tier's record file.
    #[must_use]
    pub fn tier_path(&self, tier: Tier) -> PathBuf {
        self.records_dir()
            .join(format!("{}.{TIER_FILE_EXT}", (self.namer)(tier)))
    }

    /// Path of a tier's checkpoint file.
    #[must_use]
    pub fn checkpoint_path(&self, tier: Tier) -> PathBuf {
        self.records_dir()
            .join(format!("{}.{CHECKPOINT_FILE_EXT}", (self.namer)(tier)))
    }

    /// Path of a tier's analysis file.
    #[must_use]
    pub fn stat_path(&self, tier: Tier) -> PathBuf {
        self.analysis_dir()
            .join(format!("{}.{STAT_FILE_EXT}", (self.namer)(tier)))
    }

    /// Path of a tier's discovery map file.
    #[must_use]
    pub fn map_path(&self, tier: Tier) -> PathBuf {
        self.analysis_dir()
            .join(format!("{}.{MAP_FILE_EXT}", (self.namer)(tier)))
    }

    // --- solving tier ---------------------------------------------------

    /// Allocates the record array for `tier` and marks it solving.
    pub fn create_solving_tier(&mut self, tier: Tier, size: u64) -> crate::Result<()> {
        if let Some(solving) = &self.solving {
            return Err(crate::Error::Runtime(format!(
                "tier {} is still marked solving",
                solving.tier,
            )));
        }

        self.solving = Some(SolvingTier {
            tier,
            records: Arc::new(RecordArray::new(size)?),
        });

        Ok(())
    }

    fn solving(&self) -> crate::Result<&SolvingTier> {
        self.solving
            .as_ref()
            .ok_or_else(|| crate::Error::Runtime("no tier is marked solving".into()))
    }

    /// The record array of the solving tier, shared with workers.
    pub fn solving_records(&self) -> crate::Result<Arc<RecordArray>> {
        Ok(Arc::clone(&self.solving()?.records))
    }

    /// Reads a value from the solving tier.
    pub fn get_value(&self, position: Position) -> crate::Result<Value> {
        Ok(self.solving()?.records.get_value(position))
    }

    /// Writes a value into the solving tier.
    pub fn set_value(&self, position: Position, value: Value) -> crate::Result<()> {
        self.solving()?.records.set_value(position, value);
        Ok(())
    }

    /// Reads a remoteness from the solving tier.
    pub fn get_remoteness(&self, position: Position) -> crate::Result<Remoteness> {
        Ok(self.solving()?.records.get_remoteness(position))
    }

    /// Writes a remoteness into the solving tier.
    pub fn set_remoteness(&self, position: Position, remoteness: Remoteness) -> crate::Result<()> {
        self.solving()?.records.set_remoteness(position, remoteness);
        Ok(())
    }

    /// Flushes the solving tier to its tier file, atomically.
    ///
    /// On success any stale checkpoint is removed. The solving buffer
    /// stays allocated until [`Database::free_solving_tier`].
    pub fn flush_solving_tier(&mut self) -> crate::Result<()> {
        let solving = self.solving()?;
        let path = self.tier_path(solving.tier);

        log::debug!("flushing tier {} to {}", solving.tier, path.display());

        write_to_path(
            &path,
            &*solving.records,
            self.config.block_size,
            self.config.compression,
        )?;

        let checkpoint = self.checkpoint_path(solving.tier);
        if checkpoint.exists() {
            std::fs::remove_file(checkpoint)?;
        }

        Ok(())
    }

    /// Drops the solving-tier buffer.
    pub fn free_solving_tier(&mut self) {
        self.solving = None;
    }

    // --- loaded child tiers ---------------------------------------------

    /// Decompresses `tier`'s file into memory for child reads.
    pub fn load_tier(&mut self, tier: Tier, size: u64) -> crate::Result<()> {
        if self.loaded.contains_key(&tier) {
            return Ok(());
        }

        if self.loaded.len() >= MAX_LOADED_TIERS {
            return Err(crate::Error::IllegalArgument(format!(
                "cannot load tier {tier}: {MAX_LOADED_TIERS} tiers are already loaded",
            )));
        }

        let stream = TierFile::open(self.tier_path(tier))?;
        let records = RecordArray::new(size)?;
        stream.read_into(&records)?;

        log::debug!("loaded tier {tier} ({size} records)");

        self.loaded.insert(tier, Arc::new(records));
        Ok(())
    }

    /// Unloads a loaded tier.
    pub fn unload_tier(&mut self, tier: Tier) {
        self.loaded.remove(&tier);
    }

    /// Unloads every loaded tier.
    pub fn unload_all(&mut self) {
        self.loaded.clear();
    }

    /// Whether `tier` is currently loaded.
    #[must_use]
    pub fn is_tier_loaded(&self, tier: Tier) -> bool {
        self.loaded.contains_key(&tier)
    }

    /// The read-only record array of a loaded tier.
    #[must_use]
    pub fn loaded_records(&self, tier: Tier) -> Option<Arc<RecordArray>> {
        self.loaded.get(&tier).map(Arc::clone)
    }

    /// Reads a record from a loaded tier.
    pub fn get_record_from_loaded(&self, tp: TierPosition) -> crate::Result<Record> {
        let records = self.loaded.get(&tp.tier).ok_or_else(|| {
            crate::Error::IllegalArgument(format!("tier {} is not loaded", tp.tier))
        })?;

        Ok(records.get(tp.position))
    }

    /// Reads a value from a loaded tier.
    pub fn get_value_from_loaded(&self, tp: TierPosition) -> crate::Result<Value> {
        Ok(self.get_record_from_loaded(tp)?.value)
    }

    // --- status ---------------------------------------------------------

    /// Whether `tier` (of `size` positions) is already solved on disk.
    ///
    /// A present but unvalidatable file reports
    /// [`TierStatus::CheckError`]; callers treat that as unsolved.
    #[must_use]
    pub fn tier_status(&self, tier: Tier, size: u64) -> TierStatus {
        let path = self.tier_path(tier);

        if !path.exists() {
            return TierStatus::Missing;
        }

        match TierFile::open(&path) {
            Ok(stream) if stream.record_count() == size => TierStatus::Solved,
            Ok(stream) => {
                log::warn!(
                    "tier file {} holds {} records, expected {size}",
                    path.display(),
                    stream.record_count(),
                );
                TierStatus::CheckError
            }
            Err(e) => {
                log::warn!("cannot validate tier file {}: {e}", path.display());
                TierStatus::CheckError
            }
        }
    }

    // --- checkpoints ----------------------------------------------------

    /// Writes a solve checkpoint for `tier`.
    pub fn checkpoint_save(
        &self,
        tier: Tier,
        meta: CheckpointMeta,
        records: &RecordArray,
    ) -> crate::Result<()> {
        checkpoint::save(
            &self.checkpoint_path(tier),
            meta,
            records,
            self.config.block_size,
            self.config.compression,
        )
    }

    /// Loads the checkpoint for `tier`, if any.
    pub fn checkpoint_load(
        &self,
        tier: Tier,
        size: u64,
    ) -> crate::Result<(CheckpointMeta, RecordArray)> {
        checkpoint::load(&self.checkpoint_path(tier), size)
    }

    /// Whether a checkpoint exists for `tier`.
    #[must_use]
    pub fn checkpoint_exists(&self, tier: Tier) -> bool {
        self.checkpoint_path(tier).exists()
    }

    /// Removes the checkpoint for `tier`, if any.
    pub fn checkpoint_remove(&self, tier: Tier) -> crate::Result<()> {
        let path = self.checkpoint_path(tier);

        if path.exists() {
            std::fs::remove_file(path)?;
        }

        Ok(())
    }

    // --- probes ---------------------------------------------------------

    /// Creates a probe handle for query-time random access.
    ///
    /// Dropping the handle closes its tier files.
    #[must_use]
    pub fn probe_init(&self) -> DbProbe {
        DbProbe {
            streams: FxHashMap::default(),
        }
    }

    /// Fetches the record at `tp` through a probe.
    pub fn probe_record(&self, probe: &mut DbProbe, tp: TierPosition) -> crate::Result<Record> {
        if !probe.streams.contains_key(&tp.tier) {
            let stream = TierFile::open(self.tier_path(tp.tier))?;
            probe
                .streams
                .insert(tp.tier, Probe::new(stream, self.config.probe_cache_blocks));
        }

        #[allow(clippy::expect_used)]
        let stream = probe.streams.get(&tp.tier).expect("stream was just inserted");

        stream.record(tp.position)
    }

    /// Fetches the value at `tp` through a probe.
    pub fn probe_value(&self, probe: &mut DbProbe, tp: TierPosition) -> crate::Result<Value> {
        Ok(self.probe_record(probe, tp)?.value)
    }

    /// Fetches the remoteness at `tp` through a probe.
    pub fn probe_remoteness(
        &self,
        probe: &mut DbProbe,
        tp: TierPosition,
    ) -> crate::Result<Remoteness> {
        Ok(self.probe_record(probe, tp)?.remoteness)
    }
}

/// A query-time probe: one lazily opened [`Probe`] per touched tier.
pub struct DbProbe {
    streams: FxHashMap<Tier, Probe>,
}

impl DbProbe {
    /// Number of tier files this probe has opened.
    #[must_use]
    pub fn open_tiers(&self) -> usize {
        self.streams.len()
    }
}
