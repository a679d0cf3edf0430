// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! Post-solve statistics: one walk over a tier's record array yields
//! value counts, remoteness histograms, example positions, branching
//! factor and hash-space efficiency, in an all-positions view and a
//! canonical-only view.

pub mod discovery;
pub mod stats;

use crate::api::{is_canonical_legal, TierGame};
use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use crate::record::Remoteness;
use crate::{Position, RecordArray, Tier, TierPosition, Value};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};
use varint_rs::{VarintReader, VarintWriter};

const VALUES: [Value; 5] = [
    Value::Undecided,
    Value::Lose,
    Value::Draw,
    Value::Tie,
    Value::Win,
];

/// Counts and histograms over one set of positions.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct View {
    /// Position count per value, indexed by value discriminant
    counts: [u64; 5],

    /// Per-value histogram over remoteness, indexed by discriminant
    /// then remoteness
    histograms: [Vec<u64>; 5],

    /// One example position per (value, remoteness), first seen
    examples: Vec<(Value, Remoteness, Position)>,
}

impl View {
    fn record(&mut self, value: Value, remoteness: Remoteness, position: Position) {
        let idx = u8::from(value) as usize;

        #[allow(clippy::indexing_slicing)]
        {
            self.counts[idx] += 1;

            let histogram = &mut self.histograms[idx];

            if histogram.len() <= remoteness as usize {
                histogram.resize(remoteness as usize + 1, 0);
            }

            if histogram[remoteness as usize] == 0 {
                self.examples.push((value, remoteness, position));
            }

            histogram[remoteness as usize] += 1;
        }
    }

    fn merge(&mut self, other: Self) {
        for (idx, count) in other.counts.into_iter().enumerate() {
            #[allow(clippy::indexing_slicing)]
            {
                self.counts[idx] += count;
            }
        }

        for (idx, histogram) in other.histograms.into_iter().enumerate() {
            #[allow(clippy::indexing_slicing)]
            let own = &mut self.histograms[idx];

            if own.len() < histogram.len() {
                own.resize(histogram.len(), 0);
            }

            for (r, count) in histogram.into_iter().enumerate() {
                #[allow(clippy::indexing_slicing)]
                {
                    own[r] += count;
                }
            }
        }

        // Keep the example with the smaller position per slot
        for (value, remoteness, position) in other.examples {
            match self
                .examples
                .iter_mut()
                .find(|(v, r, _)| *v == value && *r == remoteness)
            {
                Some((_, _, existing)) => *existing = (*existing).min(position),
                None => self.examples.push((value, remoteness, position)),
            }
        }
    }

    /// Number of positions holding `value`.
    #[must_use]
    #[allow(clippy::indexing_slicing)]
    pub fn count(&self, value: Value) -> u64 {
        self.counts[u8::from(value) as usize]
    }

    /// Number of positions holding `(value, remoteness)`.
    #[must_use]
    #[allow(clippy::indexing_slicing)]
    pub fn count_at(&self, value: Value, remoteness: Remoteness) -> u64 {
        self.histograms[u8::from(value) as usize]
            .get(remoteness as usize)
            .copied()
            .unwrap_or(0)
    }

    /// Largest remoteness any position holds `value` at.
    #[must_use]
    pub fn max_remoteness(&self, value: Value) -> Option<Remoteness> {
        #[allow(clippy::indexing_slicing)]
        let histogram = &self.histograms[u8::from(value) as usize];

        histogram
            .iter()
            .rposition(|count| *count > 0)
            .map(|r| r as Remoteness)
    }

    /// An example position holding `(value, remoteness)`.
    #[must_use]
    pub fn example(&self, value: Value, remoteness: Remoteness) -> Option<Position> {
        self.examples
            .iter()
            .find(|(v, r, _)| *v == value && *r == remoteness)
            .map(|(_, _, p)| *p)
    }
}

/// The per-tier analysis structure.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Analysis {
    /// The analyzed tier
    pub tier: Tier,

    /// Position count of the tier
    pub tier_size: u64,

    /// Canonical legal position count
    pub legal_count: u64,

    /// Total legal moves over canonical legal positions
    pub total_moves: u64,

    /// Every position, legal or not
    pub all: View,

    /// Canonical legal positions only
    pub canonical: View,
}

impl Analysis {
    /// Average legal moves per canonical legal position.
    #[must_use]
    pub fn branching_factor(&self) -> f64 {
        if self.legal_count == 0 {
            return 0.0;
        }

        #[allow(clippy::cast_precision_loss)]
        {
            self.total_moves as f64 / self.legal_count as f64
        }
    }

    /// Fraction of the hash space holding canonical legal positions.
    #[must_use]
    pub fn hash_efficiency(&self) -> f64 {
        if self.tier_size == 0 {
            return 0.0;
        }

        #[allow(clippy::cast_precision_loss)]
        {
            self.legal_count as f64 / self.tier_size as f64
        }
    }
}

impl std::fmt::Display for Analysis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "tier {}: {} positions, {} legal ({:.1}%), b = {:.2}, w/l/t/d = {}/{}/{}/{}",
            self.tier,
            self.tier_size,
            self.legal_count,
            self.hash_efficiency() * 100.0,
            self.branching_factor(),
            self.canonical.count(Value::Win),
            self.canonical.count(Value::Lose),
            self.canonical.count(Value::Tie),
            self.canonical.count(Value::Draw),
        )
    }
}

/// Walks a solved tier's record array once, in parallel, producing its
/// analysis.
#[must_use]
pub fn analyze(game: &dyn TierGame, tier: Tier, records: &RecordArray) -> Analysis {
    let folded = crate::parallel::fold_chunks(
        records.len(),
        crate::parallel::DEFAULT_CHUNK,
        Analysis::default,
        |mut acc, range| {
            for position in range {
                let record = records.get(position);
                acc.all.record(record.value, record.remoteness, position);

                let tp = TierPosition::new(tier, position);

                if is_canonical_legal(game, tp) {
                    acc.legal_count += 1;
                    acc.total_moves += game.generate_moves(tp).len() as u64;
                    acc.canonical.record(record.value, record.remoteness, position);
                }
            }
            acc
        },
        |mut a, b| {
            a.legal_count += b.legal_count;
            a.total_moves += b.total_moves;
            a.all.merge(b.all);
            a.canonical.merge(b.canonical);
            a
        },
    );

    Analysis {
        tier,
        tier_size: records.len(),
        ..folded
    }
}

impl Encode for View {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        for idx in 0..VALUES.len() {
            #[allow(clippy::indexing_slicing)]
            writer.write_u64_varint(self.counts[idx])?;

            #[allow(clippy::indexing_slicing)]
            let histogram = &self.histograms[idx];

            writer.write_u64_varint(histogram.len() as u64)?;

            for count in histogram {
                writer.write_u64_varint(*count)?;
            }
        }

        writer.write_u64_varint(self.examples.len() as u64)?;

        for (value, remoteness, position) in &self.examples {
            writer.write_u8(u8::from(*value))?;
            writer.write_u32_varint(*remoteness)?;
            writer.write_u64_varint(*position)?;
        }

        Ok(())
    }
}

impl Decode for View {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let mut view = Self::default();

        for idx in 0..VALUES.len() {
            #[allow(clippy::indexing_slicing)]
            {
                view.counts[idx] = reader.read_u64_varint()?;
            }

            let len = reader.read_u64_varint()? as usize;
            let mut histogram = Vec::with_capacity(len);

            for _ in 0..len {
                histogram.push(reader.read_u64_varint()?);
            }

            #[allow(clippy::indexing_slicing)]
            {
                view.histograms[idx] = histogram;
            }
        }

        let examples = reader.read_u64_varint()? as usize;

        for _ in 0..examples {
            let value = Value::try_from(reader.read_u8()?)?;
            let remoteness = reader.read_u32_varint()?;
            let position = reader.read_u64_varint()?;

            view.examples.push((value, remoteness, position));
        }

        Ok(view)
    }
}

impl Encode for Analysis {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        writer.write_u64_varint(self.tier)?;
        writer.write_u64_varint(self.tier_size)?;
        writer.write_u64_varint(self.legal_count)?;
        writer.write_u64_varint(self.total_moves)?;
        self.all.encode_into(writer)?;
        self.canonical.encode_into(writer)?;
        Ok(())
    }
}

impl Decode for Analysis {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        Ok(Self {
            tier: reader.read_u64_varint()?,
            tier_size: reader.read_u64_varint()?,
            legal_count: reader.read_u64_varint()?,
            total_moves: reader.read_u64_varint()?,
            all: View::decode_from(reader)?,
            canonical: View::decode_from(reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use test_log::test;

    #[test]
    fn view_counts_and_examples() {
        let mut view = View::default();

        view.record(Value::Win, 3, 10);
        view.record(Value::Win, 3, 11);
        view.record(Value::Win, 1, 12);
        view.record(Value::Lose, 0, 13);

        assert_eq!(3, view.count(Value::Win));
        assert_eq!(2, view.count_at(Value::Win, 3));
        assert_eq!(Some(3), view.max_remoteness(Value::Win));
        assert_eq!(None, view.max_remoteness(Value::Tie));
        assert_eq!(Some(10), view.example(Value::Win, 3));
        assert_eq!(Some(13), view.example(Value::Lose, 0));
    }

    #[test]
    fn view_merge_matches_sequential() {
        let mut a = View::default();
        a.record(Value::Win, 2, 0);
        a.record(Value::Draw, 0, 1);

        let mut b = View::default();
        b.record(Value::Win, 2, 5);
        b.record(Value::Win, 4, 6);

        a.merge(b);

        assert_eq!(3, a.count(Value::Win));
        assert_eq!(2, a.count_at(Value::Win, 2));
        assert_eq!(Some(4), a.max_remoteness(Value::Win));
        // Smaller example position wins the slot
        assert_eq!(Some(0), a.example(Value::Win, 2));
    }

    #[test]
    fn analysis_roundtrip() -> crate::Result<()> {
        let mut analysis = Analysis {
            tier: 9,
            tier_size: 100,
            legal_count: 60,
            total_moves: 180,
            ..Analysis::default()
        };

        analysis.all.record(Value::Win, 1, 2);
        analysis.all.record(Value::Draw, 0, 3);
        analysis.canonical.record(Value::Win, 1, 2);

        let buf = analysis.encode_into_vec();
        let restored = Analysis::decode_from(&mut Cursor::new(buf))?;

        assert_eq!(analysis, restored);

        Ok(())
    }
}
