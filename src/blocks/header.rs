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

//! The self-hashed header at the start of every block.

use crate::blocks::layout::BLOCK_HEADER_SIZE;
use crate::error::{Result, StrataError};
use crate::hash::highway_hash;

/// Wire size of a block header.
pub const BLOCK_HEADER_WIRE: usize = BLOCK_HEADER_SIZE as usize;

/// A block header anchors the chunk layout at a block boundary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockHeader {
    /// Distance from the block start back to the start of the chunk in
    /// progress when the block began; 0 if a chunk boundary coincides with
    /// the block boundary.
    pub previous_chunk: u64,

    /// Distance from the block start forward to the start of the next chunk
    /// beginning at or after this block.
    pub next_chunk: u64,
}

impl BlockHeader {
    /// Serializes to the wire form:
    /// `stored_header_hash (u64 LE) || previous_chunk (u64 LE) || next_chunk (u64 LE)`.
    pub fn encode(&self) -> [u8; BLOCK_HEADER_WIRE] {
        let mut content = [0u8; 16];
        content[0..8].copy_from_slice(&self.previous_chunk.to_le_bytes());
        content[8..16].copy_from_slice(&self.next_chunk.to_le_bytes());
        let mut out = [0u8; BLOCK_HEADER_WIRE];
        out[0..8].copy_from_slice(&highway_hash(&content).to_le_bytes());
        out[8..24].copy_from_slice(&content);
        out
    }

    /// Parses the wire form, validating the stored hash. `block_begin` is
    /// only used for error context.
    pub fn parse(bytes: &[u8; BLOCK_HEADER_WIRE], block_begin: u64) -> Result<Self> {
        let stored = read_u64_le(bytes, 0);
        let computed = highway_hash(&bytes[8..24]);
        if computed != stored {
            return Err(StrataError::BlockHeaderHashMismatch {
                computed,
                stored,
                block_begin,
            });
        }
        Ok(Self {
            previous_chunk: read_u64_le(bytes, 8),
            next_chunk: read_u64_le(bytes, 16),
        })
    }
}

fn read_u64_le(bytes: &[u8; BLOCK_HEADER_WIRE], offset: usize) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(&bytes[offset..offset + 8]);
    u64::from_le_bytes(raw)
}
