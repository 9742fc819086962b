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

//! Decoding records out of a validated chunk.

use bytes::Bytes;

use crate::chunks::chunk::Chunk;
use crate::chunks::header::ChunkType;
use crate::chunks::simple::{DecodedRecords, RecordParser, SimpleCodec};
use crate::error::{Result, StrataError};

/// Exposes the records of one decoded chunk, by index.
///
/// Invariants while healthy: `limits` is non-decreasing,
/// `limits.last() == values.len()`, and `index <= num_records`.
pub struct ChunkDecoder {
    limits: Vec<usize>,
    values: Bytes,
    index: u64,
    /// Whether [`recover`](ChunkDecoder::recover) applies: set only when a
    /// record failed the consumer's parse, never for container-level
    /// failures.
    recoverable: bool,
    failure: Option<String>,
}

impl Default for ChunkDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkDecoder {
    /// Creates a decoder over an empty chunk.
    pub fn new() -> Self {
        Self {
            limits: Vec::new(),
            values: Bytes::new(),
            index: 0,
            recoverable: false,
            failure: None,
        }
    }

    /// Resets the decoder to an empty chunk.
    pub fn reset(&mut self) {
        self.limits.clear();
        self.values = Bytes::new();
        self.index = 0;
        self.recoverable = false;
        self.failure = None;
    }

    /// Resets the decoder and parses `chunk`.
    ///
    /// Signature and padding chunks decode to zero records; unknown chunk
    /// types fail with `InvalidChunkPayload`. A failure here is not
    /// recoverable by the decoder, though a chunk reader can still advance
    /// past the chunk.
    pub fn reset_with(&mut self, chunk: &Chunk) -> Result<()> {
        self.reset();
        let result = self.parse(chunk);
        if let Err(e) = &result {
            self.failure = Some(e.to_string());
        }
        result
    }

    fn parse(&mut self, chunk: &Chunk) -> Result<()> {
        let decoded = match chunk.header.chunk_type {
            ChunkType::FileSignature | ChunkType::Padding => DecodedRecords::default(),
            ChunkType::Simple => SimpleCodec.parse(&chunk.header, chunk.data.clone())?,
            other => {
                return Err(StrataError::InvalidChunkPayload(format!(
                    "cannot decode records from chunk type 0x{:02x}",
                    other.as_byte()
                )))
            }
        };
        if decoded.limits.len() as u64 != chunk.header.num_records {
            return Err(StrataError::InvalidChunkPayload(format!(
                "decoded {} records, header claims {}",
                decoded.limits.len(),
                chunk.header.num_records
            )));
        }
        let decoded_size = decoded.limits.last().copied().unwrap_or(0);
        if decoded_size != decoded.values.len()
            || decoded.values.len() as u64 != chunk.header.decoded_data_size
        {
            return Err(StrataError::InvalidChunkPayload(format!(
                "decoded {} value bytes with last limit {}, header claims {}",
                decoded.values.len(),
                decoded_size,
                chunk.header.decoded_data_size
            )));
        }
        self.limits = decoded.limits;
        self.values = decoded.values;
        Ok(())
    }

    /// Reads the next record, or `None` when the chunk ends or the decoder
    /// has failed. The returned bytes share the decoder's value buffer.
    pub fn read_record(&mut self) -> Option<Bytes> {
        if !self.healthy() || self.index == self.num_records() {
            return None;
        }
        let index = self.index as usize;
        let start = if index == 0 { 0 } else { self.limits[index - 1] };
        let limit = self.limits[index];
        debug_assert!(start <= limit, "record end positions not sorted");
        self.index += 1;
        Some(self.values.slice(start..limit))
    }

    /// Reads the next record through the consumer's parse function.
    ///
    /// A parse failure puts the decoder into a failed-but-recoverable state;
    /// [`recover`](ChunkDecoder::recover) then skips the record (the index
    /// has already advanced past it).
    pub fn read_record_with<T, E, F>(&mut self, parse: F) -> Result<Option<T>>
    where
        E: std::fmt::Display,
        F: FnOnce(Bytes) -> std::result::Result<T, E>,
    {
        if let Some(failure) = &self.failure {
            return Err(StrataError::Failed(failure.clone()));
        }
        let Some(raw) = self.read_record() else {
            return Ok(None);
        };
        match parse(raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                let err = StrataError::RecordParse {
                    index: self.index - 1,
                    reason: e.to_string(),
                };
                self.failure = Some(err.to_string());
                self.recoverable = true;
                Err(err)
            }
        }
    }

    /// If the failure was an unparsable record, clears it, leaving the
    /// decoder past the failing record, and returns true. Container-level
    /// failures are not decoder-recoverable and return false.
    pub fn recover(&mut self) -> bool {
        if !self.recoverable {
            return false;
        }
        self.recoverable = false;
        self.failure = None;
        true
    }

    /// The current record index. Preserved by `read_record` failures.
    pub fn index(&self) -> u64 {
        self.index
    }

    /// Repositions to record `index`, clamped to `num_records`.
    ///
    /// Precondition: the decoder is healthy.
    pub fn set_index(&mut self, index: u64) {
        debug_assert!(self.healthy());
        self.index = index.min(self.num_records());
    }

    pub fn num_records(&self) -> u64 {
        self.limits.len() as u64
    }

    pub fn healthy(&self) -> bool {
        self.failure.is_none()
    }

    pub fn message(&self) -> Option<&str> {
        self.failure.as_deref()
    }
}
