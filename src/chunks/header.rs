// Copyright 2025
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The self-hashed fixed-size header of every chunk.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Result, StrataError};
use crate::hash::highway_hash;

/// Wire size of a chunk header:
/// - `header_hash` (8 bytes) — hash of the rest of the header
/// - `data_size` (8 bytes) — size of data, excluding intervening block headers
/// - `data_hash` (8 bytes) — hash of data
/// - `chunk_type` (1 byte) — how to interpret data
/// - `num_records` (7 bytes) — number of records after decoding
/// - `decoded_data_size` (8 bytes) — sum of record sizes after decoding
pub const CHUNK_HEADER_SIZE: usize = 40;

/// Largest `num_records` representable in the 7-byte wire field.
pub const MAX_NUM_RECORDS: u64 = (1 << 56) - 1;

/// How a chunk's data is to be interpreted.
///
/// Unrecognized bytes are preserved as [`ChunkType::Unknown`] so the framing
/// layer forwards them exactly; only the decoder cares whether it can parse
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkType {
    /// File signature chunk (`0x73`, 's'); mandatory first chunk of a file.
    FileSignature,
    /// Simple chunk with concatenated records (`0x72`, 'r').
    Simple,
    /// Transposed (columnar) message chunk (`0x74`, 't').
    Transposed,
    /// Padding chunk (`0x70`, 'p').
    Padding,
    /// Any other value, preserved verbatim.
    Unknown(u8),
}

impl ChunkType {
    pub fn as_byte(&self) -> u8 {
        match self {
            ChunkType::FileSignature => 0x73,
            ChunkType::Simple => 0x72,
            ChunkType::Transposed => 0x74,
            ChunkType::Padding => 0x70,
            ChunkType::Unknown(byte) => *byte,
        }
    }

    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0x73 => ChunkType::FileSignature,
            0x72 => ChunkType::Simple,
            0x74 => ChunkType::Transposed,
            0x70 => ChunkType::Padding,
            other => ChunkType::Unknown(other),
        }
    }
}

/// A chunk header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkHeader {
    /// Size of chunk data in bytes, excluding intervening block headers.
    pub data_size: u64,
    /// Hash of the chunk data.
    pub data_hash: u64,
    pub chunk_type: ChunkType,
    /// Number of records the data decodes to.
    pub num_records: u64,
    /// Sum of record sizes after decoding.
    pub decoded_data_size: u64,
}

impl ChunkHeader {
    pub fn new(
        data_size: u64,
        data_hash: u64,
        chunk_type: ChunkType,
        num_records: u64,
        decoded_data_size: u64,
    ) -> Self {
        ChunkHeader {
            data_size,
            data_hash,
            chunk_type,
            num_records,
            decoded_data_size,
        }
    }

    /// Serializes to the 40-byte wire form, computing the stored header hash.
    pub fn encode(&self) -> Result<Bytes> {
        if self.num_records > MAX_NUM_RECORDS {
            return Err(StrataError::Overflow("num_records field"));
        }
        let mut content = BytesMut::with_capacity(CHUNK_HEADER_SIZE - 8);
        content.put_u64_le(self.data_size);
        content.put_u64_le(self.data_hash);
        content.put_u8(self.chunk_type.as_byte());
        // num_records as the low 7 bytes, little-endian.
        for i in 0..7 {
            content.put_u8((self.num_records >> (i * 8)) as u8);
        }
        content.put_u64_le(self.decoded_data_size);

        let mut out = BytesMut::with_capacity(CHUNK_HEADER_SIZE);
        out.put_u64_le(highway_hash(&content));
        out.extend_from_slice(&content);
        Ok(out.freeze())
    }

    /// Parses the wire form, validating the stored header hash. `pos` is the
    /// chunk's position, used for error context only.
    pub fn parse(bytes: &[u8; CHUNK_HEADER_SIZE], pos: u64) -> Result<Self> {
        let stored = read_u64_le(&bytes[0..8]);
        let computed = highway_hash(&bytes[8..CHUNK_HEADER_SIZE]);
        if computed != stored {
            return Err(StrataError::ChunkHeaderHashMismatch {
                computed,
                stored,
                pos,
            });
        }
        let mut num_records: u64 = 0;
        for i in 0..7 {
            num_records |= u64::from(bytes[25 + i]) << (i * 8);
        }
        Ok(ChunkHeader {
            data_size: read_u64_le(&bytes[8..16]),
            data_hash: read_u64_le(&bytes[16..24]),
            chunk_type: ChunkType::from_byte(bytes[24]),
            num_records,
            decoded_data_size: read_u64_le(&bytes[32..40]),
        })
    }

    /// Whether the header satisfies the file-signature constraints: signature
    /// type and all length and count fields zero.
    pub fn is_valid_signature(&self) -> bool {
        self.chunk_type == ChunkType::FileSignature
            && self.data_size == 0
            && self.num_records == 0
            && self.decoded_data_size == 0
    }
}

fn read_u64_le(bytes: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    u64::from_le_bytes(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_array(bytes: &Bytes) -> [u8; CHUNK_HEADER_SIZE] {
        let mut raw = [0u8; CHUNK_HEADER_SIZE];
        raw.copy_from_slice(bytes);
        raw
    }

    #[test]
    fn encodes_to_wire_size() {
        let header = ChunkHeader::new(123, 456, ChunkType::Simple, 789, 1011);
        assert_eq!(header.encode().unwrap().len(), CHUNK_HEADER_SIZE);
    }

    #[test]
    fn round_trips() {
        let header = ChunkHeader::new(1234567890, 9876543210, ChunkType::Simple, 42, 987654321);
        let encoded = header.encode().unwrap();
        assert_eq!(
            ChunkHeader::parse(&as_array(&encoded), 0).unwrap(),
            header
        );
    }

    #[test]
    fn wire_field_offsets() {
        let header = ChunkHeader::new(100, 200, ChunkType::Simple, 5, 300);
        let encoded = header.encode().unwrap();
        assert_eq!(read_u64_le(&encoded[8..16]), 100);
        assert_eq!(read_u64_le(&encoded[16..24]), 200);
        assert_eq!(encoded[24], b'r');
        assert_eq!(encoded[25], 5);
        assert!(encoded[26..32].iter().all(|b| *b == 0));
        assert_eq!(read_u64_le(&encoded[32..40]), 300);
        // Stored hash covers everything after itself.
        assert_eq!(read_u64_le(&encoded[0..8]), highway_hash(&encoded[8..]));
    }

    #[test]
    fn seven_byte_num_records_round_trips() {
        let header = ChunkHeader::new(0, 0, ChunkType::Simple, MAX_NUM_RECORDS, 0);
        let encoded = header.encode().unwrap();
        let parsed = ChunkHeader::parse(&as_array(&encoded), 0).unwrap();
        assert_eq!(parsed.num_records, MAX_NUM_RECORDS);
    }

    #[test]
    fn num_records_beyond_seven_bytes_overflows() {
        let header = ChunkHeader::new(0, 0, ChunkType::Simple, MAX_NUM_RECORDS + 1, 0);
        assert!(matches!(
            header.encode(),
            Err(StrataError::Overflow(_))
        ));
    }

    #[test]
    fn detects_header_corruption() {
        let header = ChunkHeader::new(100, 200, ChunkType::Simple, 5, 300);
        let encoded = header.encode().unwrap();
        let mut corrupted = as_array(&encoded);
        corrupted[9] ^= 0x01;
        assert!(matches!(
            ChunkHeader::parse(&corrupted, 64),
            Err(StrataError::ChunkHeaderHashMismatch { pos: 64, .. })
        ));
    }

    #[test]
    fn unknown_chunk_types_are_preserved() {
        let header = ChunkHeader::new(1, 2, ChunkType::Unknown(0x5a), 0, 4);
        let encoded = header.encode().unwrap();
        let parsed = ChunkHeader::parse(&as_array(&encoded), 0).unwrap();
        assert_eq!(parsed.chunk_type, ChunkType::Unknown(0x5a));
        assert_eq!(parsed.chunk_type.as_byte(), 0x5a);
    }
}
