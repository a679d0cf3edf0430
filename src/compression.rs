// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::coding::{Decode, DecodeError, Encode, EncodeError};
use byteorder::{ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Compression algorithm to use
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[allow(clippy::module_name_repetitions)]
pub enum CompressionType {
    /// No compression
    ///
    /// Not recommended.
    None,

    /// LZ4 compression
    ///
    /// Recommended for use cases with a focus
    /// on speed over compression ratio.
    Lz4,
}

impl CompressionType {
    /// Compresses a buffer, returning the compressed bytes.
    #[must_use]
    pub fn compress(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::None => data.to_vec(),
            Self::Lz4 => lz4_flex::compress(data),
        }
    }

    /// Decompresses a buffer of known uncompressed size.
    pub fn decompress(&self, data: &[u8], uncompressed_len: usize) -> crate::Result<Vec<u8>> {
        match self {
            Self::None => {
                if data.len() != uncompressed_len {
                    return Err(crate::Error::Decompress(*self));
                }
                Ok(data.to_vec())
            }
            Self::Lz4 => {
                let out = lz4_flex::decompress(data, uncompressed_len)
                    .map_err(|_| crate::Error::Decompress(*self))?;

                if out.len() != uncompressed_len {
                    return Err(crate::Error::Decompress(*self));
                }
                Ok(out)
            }
        }
    }
}

impl Encode for CompressionType {
    fn encode_into<W: Write>(&self, writer: &mut W) -> Result<(), EncodeError> {
        match self {
            Self::None => writer.write_u8(0)?,
            Self::Lz4 => writer.write_u8(1)?,
        }

        Ok(())
    }
}

impl Decode for CompressionType {
    fn decode_from<R: Read>(reader: &mut R) -> Result<Self, DecodeError> {
        let tag = reader.read_u8()?;

        match tag {
            0 => Ok(Self::None),
            1 => Ok(Self::Lz4),
            tag => Err(DecodeError::InvalidTag(("CompressionType", tag))),
        }
    }
}

impl std::fmt::Display for CompressionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::None => "no compression",
                Self::Lz4 => "lz4",
            }
        )
    }
}
