// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// An 128-bit checksum
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Checksum(u128);

impl std::ops::Deref for Checksum {
    type Target = u128;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for Checksum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Checksum {
    /// Wraps a checksum value.
    #[must_use]
    pub fn from_raw(value: u128) -> Self {
        Self(value)
    }

    /// Returns the raw 128-bit integer.
    #[must_use]
    pub fn into_u128(self) -> u128 {
        self.0
    }

    /// Hashes a byte slice.
    #[must_use]
    pub fn over(bytes: &[u8]) -> Self {
        Self(xxhash_rust::xxh3::xxh3_128(bytes))
    }

    pub(crate) fn check(&self, expected: Self) -> crate::Result<()> {
        if self.0 == expected.0 {
            Ok(())
        } else {
            Err(crate::Error::ChecksumMismatch {
                expected,
                got: *self,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn checksum_is_stable() {
        let payload = b"the quick brown fox";

        assert_eq!(Checksum::over(payload), Checksum::over(payload));
        assert_ne!(Checksum::over(payload), Checksum::over(b"other"));
    }

    #[test]
    fn checksum_check() {
        let a = Checksum::over(b"a");
        let b = Checksum::over(b"b");

        assert!(a.check(a).is_ok());
        assert!(a.check(b).is_err());
    }
}
