// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use crate::Value;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::cmp::Ordering;
use std::io::{Read, Write};

/// Distance in plies to the determining terminal under optimal play.
///
/// For `Win`/`Tie` smaller is better, for `Lose` larger is better;
/// `Draw` has no finite remoteness and stores 0.
pub type Remoteness = u32;

/// A solved position: `(value, remoteness)`, 8 bytes on disk.
///
/// Packed into a `u64` as `value | remoteness << 8`; the upper 24 bits
/// are zero. The packed form doubles as the in-memory atomic cell and
/// the little-endian on-disk record, so bulk reads equal per-field
/// reads.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct Record {
    /// Game-theoretic value
    pub value: Value,

    /// Distance to the determining terminal
    pub remoteness: Remoteness,
}

/// On-disk width of one record in bytes, uniform across a tier.
pub const RECORD_WIDTH: usize = 8;

impl Record {
    /// The all-zeroes record every array cell starts out as.
    pub const UNDECIDED: Self = Self {
        value: Value::Undecided,
        remoteness: 0,
    };

    /// Pairs a value with a remoteness.
    #[must_use]
    pub fn new(value: Value, remoteness: Remoteness) -> Self {
        Self { value, remoteness }
    }

    /// The packed 40-bit representation.
    #[must_use]
    pub fn to_raw(self) -> u64 {
        u64::from(u8::from(self.value)) | (u64::from(self.remoteness) << 8)
    }

    /// Unpacks a raw cell, validating the value tag and the zero padding.
    #[allow(clippy::cast_possible_truncation)]
    pub fn try_from_raw(raw: u64) -> Result<Self, DecodeError> {
        if raw >> 40 != 0 {
            return Err(DecodeError::InvalidHeader("Record"));
        }

        Ok(Self {
            value: Value::try_from((raw & 0xff) as u8)?,
            remoteness: ((raw >> 8) & 0xffff_ffff) as Remoteness,
        })
    }

    /// Total order from the perspective of the player to move at the
    /// position holding the record.
    ///
    /// Values compare `Lose < Draw < Tie < Win`; among equal values,
    /// larger remoteness is better when losing (stalling defeat) and
    /// smaller remoteness is better otherwise. A parent picks the
    /// *minimum* of its children under this order and negates it.
    #[must_use]
    pub fn cmp_for_mover(&self, other: &Self) -> Ordering {
        match self.value.cmp(&other.value) {
            Ordering::Equal => match self.value {
                Value::Lose => self.remoteness.cmp(&other.remoteness),
                _ => other.remoteness.cmp(&self.remoteness),
            },
            ord => ord,
        }
    }

    /// The record a parent holds when this is its best-for-the-parent
    /// child: value negated, remoteness incremented (`Draw` stays at 0).
    ///
    /// `None` on remoteness overflow.
    #[must_use]
    pub fn to_parent(self) -> Option<Self> {
        let value = self.value.negated();

        let remoteness = match value {
            Value::Draw | Value::Undecided => 0,
            _ => self.remoteness.checked_add(1)?,
        };

        Some(Self { value, remoteness })
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.value, self.remoteness)
    }
}

impl Encode for Record {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        writer.write_u64::<LittleEndian>(self.to_raw())?;
        Ok(())
    }
}

impl Decode for Record {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let raw = reader.read_u64::<LittleEndian>()?;
        Self::try_from_raw(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn record_raw_roundtrip() {
        for (value, remoteness) in [
            (Value::Undecided, 0),
            (Value::Lose, 17),
            (Value::Draw, 0),
            (Value::Tie, 9),
            (Value::Win, Remoteness::MAX),
        ] {
            let record = Record::new(value, remoteness);
            assert_eq!(record, Record::try_from_raw(record.to_raw()).unwrap());
        }
    }

    #[test]
    fn record_rejects_garbage() {
        assert!(Record::try_from_raw(5).is_err()); // invalid value tag
        assert!(Record::try_from_raw(1u64 << 40).is_err()); // dirty padding
    }

    #[test]
    fn mover_prefers_winning_fast() {
        let fast = Record::new(Value::Win, 2);
        let slow = Record::new(Value::Win, 8);

        assert_eq!(Ordering::Greater, fast.cmp_for_mover(&slow));
    }

    #[test]
    fn mover_prefers_losing_slow() {
        let fast = Record::new(Value::Lose, 2);
        let slow = Record::new(Value::Lose, 8);

        assert_eq!(Ordering::Greater, slow.cmp_for_mover(&fast));
    }

    #[test]
    fn mover_prefers_value_over_remoteness() {
        let win = Record::new(Value::Win, 100);
        let tie = Record::new(Value::Tie, 1);

        assert_eq!(Ordering::Greater, win.cmp_for_mover(&tie));
        assert!(Record::new(Value::Draw, 0).cmp_for_mover(&Record::new(Value::Lose, 50)).is_gt());
    }

    #[test]
    fn parent_negation() {
        assert_eq!(
            Record::new(Value::Win, 1),
            Record::new(Value::Lose, 0).to_parent().unwrap(),
        );
        assert_eq!(
            Record::new(Value::Lose, 4),
            Record::new(Value::Win, 3).to_parent().unwrap(),
        );
        assert_eq!(
            Record::new(Value::Tie, 1),
            Record::new(Value::Tie, 0).to_parent().unwrap(),
        );
        assert_eq!(
            Record::new(Value::Draw, 0),
            Record::new(Value::Draw, 0).to_parent().unwrap(),
        );
        assert!(Record::new(Value::Win, Remoteness::MAX).to_parent().is_none());
    }

    #[test]
    fn record_coding_is_little_endian() {
        use crate::coding::Encode;

        let bytes = Record::new(Value::Win, 1).encode_into_vec();
        assert_eq!(vec![4, 1, 0, 0, 0, 0, 0, 0], bytes);
    }
}
