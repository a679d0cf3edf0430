// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::sync::atomic::{AtomicU64, Ordering};

const WORD_BITS: u64 = u64::BITS as u64;

/// Fixed-size concurrent bit array.
///
/// Bit i lives in word i / 64, bit i % 64 (LSB first), so the
/// little-endian byte image equals the on-disk bitstream layout
/// (bit i of the stream = byte i / 8, bit i % 8).
#[derive(Debug, Default)]
pub struct ConcurrentBitset {
    words: Vec<AtomicU64>,
    bits: u64,
}

impl ConcurrentBitset {
    /// Allocates a zeroed bitset of `bits` bits.
    #[must_use]
    pub fn new(bits: u64) -> Self {
        let words = bits.div_ceil(WORD_BITS) as usize;
        Self {
            words: (0..words).map(|_| AtomicU64::new(0)).collect(),
            bits,
        }
    }

    /// Number of bits.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.bits
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Sets bit `idx`, returning whether it was already set.
    pub fn set(&self, idx: u64) -> bool {
        debug_assert!(idx < self.bits);

        let mask = 1u64 << (idx % WORD_BITS);

        #[allow(clippy::indexing_slicing)]
        let prev = self.words[(idx / WORD_BITS) as usize].fetch_or(mask, Ordering::AcqRel);

        prev & mask != 0
    }

    /// Gets bit `idx`.
    #[must_use]
    pub fn get(&self, idx: u64) -> bool {
        debug_assert!(idx < self.bits);

        let mask = 1u64 << (idx % WORD_BITS);

        #[allow(clippy::indexing_slicing)]
        let word = self.words[(idx / WORD_BITS) as usize].load(Ordering::Acquire);

        word & mask != 0
    }

    /// Clears all bits.
    pub fn clear(&self) {
        for word in &self.words {
            word.store(0, Ordering::Release);
        }
    }

    /// Number of set bits.
    #[must_use]
    pub fn count_ones(&self) -> u64 {
        self.words
            .iter()
            .map(|w| u64::from(w.load(Ordering::Acquire).count_ones()))
            .sum()
    }

    /// The little-endian byte image, truncated to ceil(bits / 8) bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let n_bytes = self.bits.div_ceil(8) as usize;
        let mut out = Vec::with_capacity(n_bytes);

        for word in &self.words {
            out.extend_from_slice(&word.load(Ordering::Acquire).to_le_bytes());
        }

        out.truncate(n_bytes);
        out
    }

    /// Rebuilds a bitset of `bits` bits from its byte image.
    pub fn from_bytes(bits: u64, bytes: &[u8]) -> crate::Result<Self> {
        if bytes.len() as u64 != bits.div_ceil(8) {
            return Err(crate::Error::IllegalArgument(format!(
                "bitset of {bits} bits cannot be built from {} bytes",
                bytes.len(),
            )));
        }

        let this = Self::new(bits);

        for (i, chunk) in bytes.chunks(8).enumerate() {
            let mut word = [0u8; 8];

            #[allow(clippy::indexing_slicing)]
            word[..chunk.len()].copy_from_slice(chunk);

            #[allow(clippy::indexing_slicing)]
            this.words[i].store(u64::from_le_bytes(word), Ordering::Release);
        }

        Ok(this)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn bitset_set_get() {
        let set = ConcurrentBitset::new(130);

        assert!(!set.set(0));
        assert!(set.set(0));
        assert!(!set.set(129));

        assert!(set.get(0));
        assert!(!set.get(1));
        assert!(set.get(129));
        assert_eq!(2, set.count_ones());
    }

    #[test]
    fn bitset_byte_image_layout() {
        let set = ConcurrentBitset::new(12);
        set.set(0);
        set.set(9);

        // bit 0 -> byte 0 bit 0; bit 9 -> byte 1 bit 1
        assert_eq!(vec![0b0000_0001, 0b0000_0010], set.to_bytes());
    }

    #[test]
    fn bitset_roundtrip() -> crate::Result<()> {
        let set = ConcurrentBitset::new(1000);
        for i in (0..1000).step_by(7) {
            set.set(i);
        }

        let restored = ConcurrentBitset::from_bytes(1000, &set.to_bytes())?;
        assert_eq!(set.count_ones(), restored.count_ones());

        for i in 0..1000 {
            assert_eq!(set.get(i), restored.get(i));
        }

        Ok(())
    }

    #[test]
    fn bitset_rejects_wrong_length() {
        assert!(ConcurrentBitset::from_bytes(64, &[0u8; 4]).is_err());
    }
}
