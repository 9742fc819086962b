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

//! Error types for the strata container format.

use std::io;
use thiserror::Error;

/// The main error type for strata operations.
///
/// Hash mismatches, boundary violations and truncation are recoverable at the
/// chunk-reader level (see `ChunkReader::recover`); I/O errors and overflow
/// are not.
#[derive(Debug, Error)]
pub enum StrataError {
    /// An I/O error from the byte backend.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Position or size arithmetic overflowed.
    #[error("position arithmetic overflow in {0}")]
    Overflow(&'static str),

    /// A position is not a valid chunk boundary.
    #[error("invalid chunk boundary: {pos}")]
    InvalidBoundary { pos: u64 },

    /// A block header failed its self-hash.
    #[error(
        "block header hash mismatch (computed 0x{computed:016x}, stored 0x{stored:016x}), \
         block at {block_begin}"
    )]
    BlockHeaderHashMismatch {
        computed: u64,
        stored: u64,
        block_begin: u64,
    },

    /// A chunk header failed its self-hash.
    #[error(
        "chunk header hash mismatch (computed 0x{computed:016x}, stored 0x{stored:016x}), \
         chunk at {pos}"
    )]
    ChunkHeaderHashMismatch { computed: u64, stored: u64, pos: u64 },

    /// Chunk data does not match the hash stored in its header.
    #[error(
        "chunk data hash mismatch (computed 0x{computed:016x}, stored 0x{stored:016x}), \
         chunk at {pos} with length {len}"
    )]
    DataHashMismatch {
        computed: u64,
        stored: u64,
        pos: u64,
        len: u64,
    },

    /// A block header's `previous_chunk` contradicts the tracked chunk start.
    #[error(
        "chunk boundary is {chunk_begin} but block header at {block_begin} implies a \
         previous chunk boundary {implied} bytes back"
    )]
    BlockHeaderDisagrees {
        chunk_begin: u64,
        block_begin: u64,
        implied: u64,
    },

    /// The file ended in the middle of a chunk.
    #[error("truncated file, incomplete chunk at {pos} with length {len}")]
    Truncated { pos: u64, len: u64 },

    /// The first chunk is not a valid file-signature chunk.
    #[error("missing file signature")]
    InvalidSignature,

    /// The chunk payload could not be parsed into records.
    #[error("invalid chunk payload: {0}")]
    InvalidChunkPayload(String),

    /// A record did not satisfy the consumer's parse function.
    #[error("record {index} failed to parse: {reason}")]
    RecordParse { index: u64, reason: String },

    /// Unsupported compression type byte.
    #[error("unsupported compression type: {0}")]
    UnsupportedCompression(u8),

    /// The data is corrupt in a way not covered by a more specific kind.
    #[error("corrupted data: {0}")]
    Corruption(String),

    /// Operation on an object already in the failed or closed state.
    #[error("operation on failed object: {0}")]
    Failed(String),
}

/// A specialized Result type for strata operations.
pub type Result<T> = std::result::Result<T, StrataError>;
