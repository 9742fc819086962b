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

//! The chunk model: a header plus exactly `data_size` bytes of payload.

use bytes::Bytes;

use crate::chunks::header::{ChunkHeader, ChunkType};
use crate::error::Result;
use crate::hash::highway_hash;

/// The serialized file-signature chunk header (40 bytes).
///
/// A valid file begins with this chunk right after the first block header.
/// The bytes are a wire-format constant; `Chunk::signature().header.encode()`
/// reproduces them.
pub const FILE_SIGNATURE_HEADER: [u8; 40] = [
    0x91, 0xba, 0xc2, 0x3c, 0x92, 0x87, 0xe1, 0xa9, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xe1, 0x9f, 0x13, 0xc0, 0xe9, 0xb1, 0xc3, 0x72, 0x73, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// A chunk: header plus payload.
///
/// Invariant: `data.len() == header.data_size` and
/// `highway_hash(&data) == header.data_hash`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub header: ChunkHeader,
    pub data: Bytes,
}

impl Chunk {
    /// Builds a chunk over `data`, computing the size and hash fields.
    pub fn new(
        chunk_type: ChunkType,
        num_records: u64,
        decoded_data_size: u64,
        data: Bytes,
    ) -> Result<Self> {
        let header = ChunkHeader::new(
            data.len() as u64,
            highway_hash(&data),
            chunk_type,
            num_records,
            decoded_data_size,
        );
        // Catch an unencodable num_records at construction time.
        header.encode()?;
        Ok(Chunk { header, data })
    }

    /// The mandatory first chunk of every file.
    pub fn signature() -> Self {
        Chunk {
            header: ChunkHeader::new(0, highway_hash(&[]), ChunkType::FileSignature, 0, 0),
            data: Bytes::new(),
        }
    }
}
