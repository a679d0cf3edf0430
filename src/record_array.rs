// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::record::{Record, Remoteness, RECORD_WIDTH};
use crate::{Position, Value};
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

/// Dense table of records indexed by position, sized to one tier.
///
/// Thread-safe under the discipline that distinct threads write distinct
/// positions; the one cross-thread transition (`Undecided` -> decided)
/// goes through [`RecordArray::try_decide`], a CAS with first-writer-wins
/// semantics.
pub struct RecordArray {
    cells: Vec<AtomicU64>,
}

impl RecordArray {
    /// Allocates a zeroed array (every position `Undecided`).
    ///
    /// Allocation failure is surfaced as a [`crate::Error::Runtime`]
    /// instead of aborting, so the tier manager can abort just the
    /// current solve.
    pub fn new(size: u64) -> crate::Result<Self> {
        #[allow(clippy::cast_possible_truncation)]
        let size = size as usize;

        let mut cells = Vec::new();
        cells.try_reserve_exact(size).map_err(|e| {
            crate::Error::Runtime(format!("cannot allocate record array of {size} records: {e}"))
        })?;
        cells.resize_with(size, || AtomicU64::new(0));

        Ok(Self { cells })
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.cells.len() as u64
    }

    /// Whether the array holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    #[allow(clippy::indexing_slicing)]
    fn cell(&self, pos: Position) -> &AtomicU64 {
        debug_assert!(pos < self.len(), "position {pos} out of range");
        &self.cells[pos as usize]
    }

    #[allow(clippy::expect_used)]
    fn unpack(raw: u64) -> Record {
        // Cells only ever hold records packed by this module
        Record::try_from_raw(raw).expect("cell holds an encoded record")
    }

    /// Reads the record at `pos`.
    #[must_use]
    pub fn get(&self, pos: Position) -> Record {
        Self::unpack(self.cell(pos).load(Ordering::Acquire))
    }

    /// Overwrites the record at `pos`.
    pub fn set(&self, pos: Position, record: Record) {
        self.cell(pos).store(record.to_raw(), Ordering::Release);
    }

    /// Reads just the value at `pos`.
    #[must_use]
    pub fn get_value(&self, pos: Position) -> Value {
        self.get(pos).value
    }

    /// Reads just the remoteness at `pos`.
    #[must_use]
    pub fn get_remoteness(&self, pos: Position) -> Remoteness {
        self.get(pos).remoteness
    }

    /// Sets the value at `pos`, preserving the remoteness.
    pub fn set_value(&self, pos: Position, value: Value) {
        let _ = self.cell(pos).fetch_update(
            Ordering::AcqRel,
            Ordering::Acquire,
            |raw| {
                let mut record = Self::unpack(raw);
                record.value = value;
                Some(record.to_raw())
            },
        );
    }

    /// Sets the remoteness at `pos`, preserving the value.
    pub fn set_remoteness(&self, pos: Position, remoteness: Remoteness) {
        let _ = self.cell(pos).fetch_update(
            Ordering::AcqRel,
            Ordering::Acquire,
            |raw| {
                let mut record = Self::unpack(raw);
                record.remoteness = remoteness;
                Some(record.to_raw())
            },
        );
    }

    /// Atomically transitions `pos` from `Undecided` to `record`.
    ///
    /// Returns whether this caller won the transition; a position that
    /// is already decided is never overwritten.
    pub fn try_decide(&self, pos: Position, record: Record) -> bool {
        debug_assert!(record.value.is_decided());

        self.cell(pos)
            .compare_exchange(
                Record::UNDECIDED.to_raw(),
                record.to_raw(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// Serializes the records in `range` onto `out` in on-disk order.
    pub fn write_range_into(&self, range: Range<u64>, out: &mut Vec<u8>) {
        debug_assert!(range.end <= self.len());

        out.reserve((range.end - range.start) as usize * RECORD_WIDTH);

        for pos in range {
            out.extend_from_slice(&self.cell(pos).load(Ordering::Acquire).to_le_bytes());
        }
    }

    /// Deserializes records from `bytes`, writing them at consecutive
    /// positions starting at `first`.
    ///
    /// Validates every record; used for bulk loads from disk.
    pub fn fill_from_bytes(&self, first: Position, bytes: &[u8]) -> crate::Result<()> {
        if bytes.len() % RECORD_WIDTH != 0 {
            return Err(crate::Error::IllegalArgument(format!(
                "byte run of length {} is not a whole number of records",
                bytes.len(),
            )));
        }

        let count = (bytes.len() / RECORD_WIDTH) as u64;

        if first + count > self.len() {
            return Err(crate::Error::IllegalArgument(format!(
                "byte run of {count} records at {first} exceeds array of {}",
                self.len(),
            )));
        }

        for (i, chunk) in bytes.chunks_exact(RECORD_WIDTH).enumerate() {
            let mut raw = [0u8; RECORD_WIDTH];
            raw.copy_from_slice(chunk);
            let raw = u64::from_le_bytes(raw);

            // Validate before the cell ever holds it
            Record::try_from_raw(raw)?;

            self.cell(first + i as u64).store(raw, Ordering::Release);
        }

        Ok(())
    }

    /// Serializes the whole array.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.write_range_into(0..self.len(), &mut out);
        out
    }
}

impl std::fmt::Debug for RecordArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecordArray({} records)", self.len())
    }
}
