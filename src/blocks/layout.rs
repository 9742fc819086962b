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

//! Block geometry predicates shared by the chunk reader and writer.

use crate::constants::MAX_POSITION;
use crate::error::{Result, StrataError};

/// Size of a block in bytes.
pub const BLOCK_SIZE: u64 = 1 << 16;

/// Size of a block header in bytes: 8 for the header hash, 8 for
/// `previous_chunk`, 8 for `next_chunk`.
pub const BLOCK_HEADER_SIZE: u64 = 24;

/// Bytes of chunk payload a block can carry.
pub const USABLE_BLOCK_SIZE: u64 = BLOCK_SIZE - BLOCK_HEADER_SIZE;

/// Whether `pos` falls on a block boundary. Position 0 counts: files always
/// start with a block header.
#[inline]
pub fn is_block_boundary(pos: u64) -> bool {
    pos % BLOCK_SIZE == 0
}

/// Start of the block containing `pos`.
#[inline]
pub fn block_begin(pos: u64) -> u64 {
    pos - pos % BLOCK_SIZE
}

/// Bytes until the next block boundary.
#[inline]
pub fn remaining_in_block(pos: u64) -> u64 {
    BLOCK_SIZE - pos % BLOCK_SIZE
}

/// Bytes of block header still ahead of `pos`, zero when `pos` is past the
/// header of its block.
#[inline]
pub fn remaining_in_block_header(pos: u64) -> u64 {
    BLOCK_HEADER_SIZE.saturating_sub(pos % BLOCK_SIZE)
}

/// Whether a chunk can begin at `pos`. Positions strictly inside a block
/// header cannot hold a chunk boundary.
#[inline]
pub fn is_possible_chunk_boundary(pos: u64) -> bool {
    let offset = pos % BLOCK_SIZE;
    offset == 0 || offset >= BLOCK_HEADER_SIZE
}

/// Number of chunk payload bytes in `[begin, end)`, excluding the block
/// headers in that interval. `begin` must be a possible chunk boundary; the
/// block header of a block-aligned `begin` counts as overhead.
pub fn distance_without_overhead(begin: u64, end: u64) -> u64 {
    debug_assert!(begin <= end);
    debug_assert!(is_possible_chunk_boundary(begin));
    let mut overhead = 0;
    let mut boundary = block_begin(begin);
    if boundary < begin {
        boundary += BLOCK_SIZE;
    }
    while boundary < end {
        overhead += BLOCK_HEADER_SIZE.min(end - boundary);
        boundary += BLOCK_SIZE;
    }
    (end - begin) - overhead
}

/// Physical position just past a chunk of `chunk_size` payload-and-header
/// bytes beginning at `chunk_begin`, accounting for the block headers the
/// chunk crosses.
pub fn chunk_end(chunk_begin: u64, chunk_size: u64) -> Result<u64> {
    debug_assert!(is_possible_chunk_boundary(chunk_begin));
    let offset = chunk_begin
        .checked_add(USABLE_BLOCK_SIZE - 1)
        .ok_or(StrataError::Overflow("chunk end"))?
        % BLOCK_SIZE;
    let overhead_blocks = chunk_size
        .checked_add(offset)
        .ok_or(StrataError::Overflow("chunk end"))?
        / USABLE_BLOCK_SIZE;
    chunk_begin
        .checked_add(chunk_size)
        .and_then(|end| end.checked_add(overhead_blocks * BLOCK_HEADER_SIZE))
        .filter(|end| *end <= MAX_POSITION)
        .ok_or(StrataError::Overflow("chunk end"))
}
