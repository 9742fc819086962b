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

//! Reading chunks by position, with hash verification and corruption
//! recovery.

use bytes::BytesMut;
use log::{debug, warn};

use crate::blocks::header::{BlockHeader, BLOCK_HEADER_WIRE};
use crate::blocks::layout;
use crate::chunks::chunk::Chunk;
use crate::chunks::header::{ChunkHeader, CHUNK_HEADER_SIZE};
use crate::error::{Result, StrataError};
use crate::hash::highway_hash;
use crate::io::ByteReader;

/// Which recovery applies after a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Recoverable {
    /// Recovery not applicable.
    No,
    /// Scan forward from the next block boundary for a chunk boundary.
    FindChunk,
    /// The chunk data was bad but its header was valid, so the next chunk is
    /// believed to be present right after it.
    HaveChunk,
    /// The reader was closed holding a truncated chunk tail; recovery only
    /// reports the skipped byte count.
    ReportSkippedBytes,
}

/// How the seek-to-chunk scan should proceed after consulting a block
/// header.
enum Locate {
    Scan { skip_seek: bool },
    Eof,
}

/// Reads chunks from a byte reader, validating header and data hashes and
/// interleaving block-header reads transparently.
///
/// Specific corruption failures arm a recovery descriptor;
/// [`recover`](ChunkReader::recover) re-enters a healthy state at a plausible
/// next chunk boundary and accumulates the skipped byte count. I/O errors are
/// not recoverable.
pub struct ChunkReader<R: ByteReader> {
    byte_reader: R,
    /// Current chunk boundary.
    pos: u64,
    /// The chunk being assembled: header bytes, then parsed header, then
    /// growing data.
    header_buf: [u8; CHUNK_HEADER_SIZE],
    header: Option<ChunkHeader>,
    data: BytesMut,
    /// Most recently read block header; partially read bytes persist here
    /// across refills.
    block_buf: [u8; BLOCK_HEADER_WIRE],
    block_header: BlockHeader,
    current_chunk_is_incomplete: bool,
    recoverable: Recoverable,
    recoverable_pos: u64,
    failure: Option<String>,
    closed: bool,
}

impl<R: ByteReader> ChunkReader<R> {
    /// Creates a reader at the byte reader's current position.
    ///
    /// If that position cannot be a chunk boundary the reader starts out
    /// failed with `FindChunk` recovery armed.
    pub fn new(byte_reader: R) -> Self {
        let pos = byte_reader.pos();
        let mut reader = Self {
            byte_reader,
            pos,
            header_buf: [0; CHUNK_HEADER_SIZE],
            header: None,
            data: BytesMut::new(),
            block_buf: [0; BLOCK_HEADER_WIRE],
            block_header: BlockHeader::default(),
            current_chunk_is_incomplete: false,
            recoverable: Recoverable::No,
            recoverable_pos: 0,
            failure: None,
            closed: false,
        };
        if !layout::is_possible_chunk_boundary(pos) {
            reader.recoverable = Recoverable::FindChunk;
            reader.recoverable_pos = pos;
            reader.failure = Some(StrataError::InvalidBoundary { pos }.to_string());
        }
        reader
    }

    /// The current chunk boundary.
    pub fn pos(&self) -> u64 {
        self.pos
    }

    pub fn healthy(&self) -> bool {
        self.failure.is_none()
    }

    /// Description of the failure, if any.
    pub fn message(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// Whether the last read stopped inside a chunk at EOF.
    pub fn current_chunk_is_incomplete(&self) -> bool {
        self.current_chunk_is_incomplete
    }

    /// Returns the underlying byte reader.
    pub fn into_inner(self) -> R {
        self.byte_reader
    }

    /// Ensures the chunk header at the current position can be read and, at
    /// position 0, that it is a valid file-signature chunk. Returns
    /// `Ok(false)` at EOF.
    pub fn check_file_format(&mut self) -> Result<bool> {
        self.ensure_healthy()?;
        let result = self.pull_chunk_header();
        self.track_failure(result)
    }

    /// Reads the chunk at the current position, advancing past it.
    ///
    /// Returns `Ok(None)` at EOF: on a chunk boundary that is not an error;
    /// in the middle of a chunk it marks the current chunk incomplete, which
    /// [`close`](ChunkReader::close) reports as `Truncated`.
    pub fn read_chunk(&mut self) -> Result<Option<Chunk>> {
        self.ensure_healthy()?;
        let result = self.read_chunk_impl();
        self.track_failure(result)
    }

    fn read_chunk_impl(&mut self) -> Result<Option<Chunk>> {
        if !self.pull_chunk_header()? {
            return Ok(None);
        }
        let header = match self.header.clone() {
            Some(header) => header,
            None => return Ok(None),
        };

        while (self.data.len() as u64) < header.data_size {
            let pos_before = self.byte_reader.pos();
            if !self.read_block_header()? {
                return Ok(None);
            }
            self.check_block_header_agrees(pos_before)?;
            let len = (header.data_size - self.data.len() as u64)
                .min(layout::remaining_in_block(self.byte_reader.pos()))
                as usize;
            if !self.byte_reader.read_to(&mut self.data, len)? {
                self.note_incomplete();
                return Ok(None);
            }
        }

        let chunk_end = self.chunk_end_of(&header)?;
        let computed = highway_hash(&self.data);
        if computed != header.data_hash {
            // HaveChunk, not FindChunk: the chunk header had a correct hash,
            // so the next chunk is believed to be present after this chunk.
            let err = StrataError::DataHashMismatch {
                computed,
                stored: header.data_hash,
                pos: self.pos,
                len: chunk_end - self.pos,
            };
            warn!("chunk data failed verification: {err}");
            return Err(self.corrupt(Recoverable::HaveChunk, chunk_end, err));
        }

        let chunk = Chunk {
            header,
            data: self.data.split().freeze(),
        };
        self.pos = chunk_end;
        self.reset_chunk();
        Ok(Some(chunk))
    }

    /// Repositions the reader at `new_pos`, which must be a possible chunk
    /// boundary; otherwise the reader fails with `FindChunk` recovery armed.
    pub fn seek(&mut self, new_pos: u64) -> Result<()> {
        self.ensure_healthy()?;
        self.pos = new_pos;
        self.reset_chunk();
        self.current_chunk_is_incomplete = false;
        let result = self.seek_impl(new_pos);
        self.track_failure(result)
    }

    fn seek_impl(&mut self, new_pos: u64) -> Result<()> {
        self.byte_reader.seek(new_pos)?;
        if !layout::is_possible_chunk_boundary(new_pos) {
            return Err(self.corrupt(
                Recoverable::FindChunk,
                new_pos,
                StrataError::InvalidBoundary { pos: new_pos },
            ));
        }
        Ok(())
    }

    /// Positions the reader at the chunk whose numeric record range contains
    /// `new_pos`: the chunk at boundary `c` covers `[c, c + num_records)`.
    ///
    /// Returns `Ok(false)` without failure when the scan reaches EOF first,
    /// leaving the reader at the end-of-file chunk boundary.
    pub fn seek_to_chunk_containing(&mut self, new_pos: u64) -> Result<bool> {
        self.ensure_healthy()?;
        let result = self.seek_to_chunk(new_pos, true);
        self.track_failure(result)
    }

    /// Positions the reader at the first chunk beginning at or after
    /// `new_pos`, with the same EOF contract as
    /// [`seek_to_chunk_containing`](ChunkReader::seek_to_chunk_containing).
    pub fn seek_to_chunk_after(&mut self, new_pos: u64) -> Result<bool> {
        self.ensure_healthy()?;
        let result = self.seek_to_chunk(new_pos, false);
        self.track_failure(result)
    }

    fn seek_to_chunk(&mut self, new_pos: u64, containing: bool) -> Result<bool> {
        self.reset_chunk();
        self.current_chunk_is_incomplete = false;
        let mut block_begin = layout::block_begin(new_pos);
        if block_begin > 0 {
            // Clamp to the last block actually present in the file.
            if let Ok(size) = self.byte_reader.size() {
                let max_block_begin = size.saturating_sub(layout::BLOCK_HEADER_SIZE);
                block_begin = block_begin.min(layout::block_begin(max_block_begin));
            }
        }

        let mut skip_seek = false;
        if self.pos <= new_pos {
            // The current chunk begins at or before new_pos. If it also ends
            // at or after block_begin it is better to continue from here than
            // to seek back to block_begin.
            if self.pos == new_pos {
                return Ok(true);
            }
            if !self.pull_chunk_header()? {
                return Ok(false);
            }
            let header = match self.header.clone() {
                Some(header) => header,
                None => return Ok(false),
            };
            let chunk_end = self.chunk_end_of(&header)?;
            if chunk_end < block_begin {
                match self.locate_from_block_header(block_begin, new_pos, containing)? {
                    Locate::Scan { skip_seek: skip } => skip_seek = skip,
                    Locate::Eof => return Ok(false),
                }
            } else {
                if containing && self.record_range_end(&header)? > new_pos {
                    return Ok(true);
                }
                self.pos = chunk_end;
                self.reset_chunk();
            }
        } else {
            match self.locate_from_block_header(block_begin, new_pos, containing)? {
                Locate::Scan { skip_seek: skip } => skip_seek = skip,
                Locate::Eof => return Ok(false),
            }
        }

        loop {
            if !skip_seek {
                self.byte_reader.seek(self.pos)?;
            }
            skip_seek = false;
            if self.pos >= new_pos {
                return Ok(true);
            }
            if !self.read_chunk_header()? {
                return Ok(false);
            }
            let header = match self.header.clone() {
                Some(header) => header,
                None => return Ok(false),
            };
            if containing && self.record_range_end(&header)? > new_pos {
                return Ok(true);
            }
            self.pos = self.chunk_end_of(&header)?;
            self.reset_chunk();
        }
    }

    /// Reads the block header at `block_begin` and derives the chunk
    /// boundary to scan from.
    fn locate_from_block_header(
        &mut self,
        block_begin: u64,
        new_pos: u64,
        containing: bool,
    ) -> Result<Locate> {
        self.pos = block_begin;
        self.reset_chunk();
        self.byte_reader.seek(self.pos)?;
        if !self.read_block_header()? {
            return Ok(Locate::Eof);
        }
        if self.block_header.previous_chunk == 0 {
            // A chunk boundary coincides with the block boundary and the
            // reader is already past the block header: start scanning from
            // this chunk without seeking back.
            return Ok(Locate::Scan { skip_seek: true });
        }
        self.pos = block_begin
            .checked_add(self.block_header.next_chunk)
            .ok_or(StrataError::Overflow("next chunk boundary"))?;
        if containing && self.pos > new_pos {
            // new_pos is inside the chunk covering this block boundary, so
            // the search starts from that chunk instead of the next one.
            if self.block_header.previous_chunk > block_begin {
                let at = self.byte_reader.pos();
                let err = StrataError::Corruption(format!(
                    "block header at {block_begin} implies a negative previous chunk \
                     boundary: -{}",
                    self.block_header.previous_chunk - block_begin
                ));
                return Err(self.corrupt(Recoverable::FindChunk, at, err));
            }
            self.pos = block_begin - self.block_header.previous_chunk;
        }
        if !layout::is_possible_chunk_boundary(self.pos) {
            let at = self.byte_reader.pos();
            let err = StrataError::InvalidBoundary { pos: self.pos };
            return Err(self.corrupt(Recoverable::FindChunk, at, err));
        }
        Ok(Locate::Scan { skip_seek: false })
    }

    /// Re-enters a healthy state after a recoverable failure, advancing to a
    /// plausible next chunk boundary and adding the skipped byte counts to
    /// `skipped_bytes`.
    ///
    /// Returns `Ok(false)` when recovery is not applicable.
    pub fn recover(&mut self, skipped_bytes: &mut u64) -> Result<bool> {
        if self.recoverable == Recoverable::No {
            return Ok(false);
        }
        let result = self.recover_impl(skipped_bytes);
        self.track_failure(result)
    }

    fn recover_impl(&mut self, skipped_bytes: &mut u64) -> Result<bool> {
        'again: loop {
            debug_assert!(self.failure.is_some());
            let recoverable = std::mem::replace(&mut self.recoverable, Recoverable::No);
            let mut recoverable_pos = std::mem::take(&mut self.recoverable_pos);
            if recoverable == Recoverable::FindChunk {
                recoverable_pos = recoverable_pos
                    .checked_add(layout::remaining_in_block(recoverable_pos))
                    .ok_or(StrataError::Overflow("recovery position"))?;
            }
            *skipped_bytes = skipped_bytes.saturating_add(recoverable_pos.saturating_sub(self.pos));
            self.failure = None;
            if recoverable == Recoverable::ReportSkippedBytes {
                debug_assert!(self.closed);
                return Ok(true);
            }
            debug!("recovering at {recoverable_pos}, resuming as {recoverable:?}");
            self.pos = recoverable_pos;
            self.reset_chunk();
            if recoverable == Recoverable::HaveChunk {
                return Ok(true);
            }

            // Scan block boundaries until one leads to a plausible chunk
            // boundary.
            loop {
                self.byte_reader.seek(self.pos)?;
                match self.read_block_header() {
                    Ok(true) => {}
                    Ok(false) => {
                        // EOF; the next read will report it.
                        return Ok(true);
                    }
                    Err(e) => {
                        if self.recoverable != Recoverable::No {
                            // This block header is corrupt too; rerun
                            // recovery from it.
                            warn!("block header corrupt during recovery: {e}");
                            self.failure = Some(e.to_string());
                            continue 'again;
                        }
                        self.failure = Some(e.to_string());
                        return Err(e);
                    }
                }
                if self.block_header.previous_chunk == 0 {
                    // A chunk boundary coincides with the block boundary.
                    return Ok(true);
                }
                let next_chunk = if self.block_header.next_chunk == 0 {
                    layout::BLOCK_SIZE
                } else {
                    self.block_header.next_chunk
                };
                *skipped_bytes = skipped_bytes.saturating_add(next_chunk);
                self.pos = self
                    .pos
                    .checked_add(next_chunk)
                    .ok_or(StrataError::Overflow("recovery position"))?;
                if self.block_header.next_chunk == 0
                    || !layout::is_possible_chunk_boundary(self.pos)
                {
                    continue;
                }
                return Ok(true);
            }
        }
    }

    /// Closes the reader. A truncated chunk tail held at close time becomes
    /// a `Truncated` failure whose byte count `recover` will report.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.recoverable = Recoverable::No;
        self.recoverable_pos = 0;
        let mut result = Ok(());
        if self.failure.is_none() && self.current_chunk_is_incomplete {
            let len = self.byte_reader.pos().saturating_sub(self.pos);
            let err = StrataError::Truncated { pos: self.pos, len };
            self.failure = Some(err.to_string());
            self.recoverable = Recoverable::ReportSkippedBytes;
            self.recoverable_pos = len;
            result = Err(err);
        }
        self.pos = 0;
        self.reset_chunk();
        self.current_chunk_is_incomplete = false;
        self.closed = true;
        result
    }

    fn ensure_healthy(&self) -> Result<()> {
        if self.closed {
            return Err(StrataError::Failed("chunk reader is closed".to_string()));
        }
        if let Some(failure) = &self.failure {
            return Err(StrataError::Failed(failure.clone()));
        }
        Ok(())
    }

    /// Records the error message of a failed operation so later operations
    /// report it.
    fn track_failure<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if self.failure.is_none() {
                self.failure = Some(e.to_string());
            }
        }
        result
    }

    /// Arms a recovery descriptor; the caller returns the error.
    fn corrupt(&mut self, kind: Recoverable, at: u64, err: StrataError) -> StrataError {
        self.recoverable = kind;
        self.recoverable_pos = at;
        err
    }

    fn reset_chunk(&mut self) {
        self.header = None;
        self.data.clear();
    }

    /// Called when a read hit EOF: if any of the current chunk was consumed,
    /// the chunk is incomplete.
    fn note_incomplete(&mut self) {
        if self.byte_reader.pos() > self.pos {
            self.current_chunk_is_incomplete = true;
        }
    }

    fn chunk_end_of(&self, header: &ChunkHeader) -> Result<u64> {
        let chunk_size = (CHUNK_HEADER_SIZE as u64)
            .checked_add(header.data_size)
            .ok_or(StrataError::Overflow("chunk size"))?;
        layout::chunk_end(self.pos, chunk_size)
    }

    /// End of the numeric record range of the chunk at the current boundary.
    fn record_range_end(&self, header: &ChunkHeader) -> Result<u64> {
        self.pos
            .checked_add(header.num_records)
            .ok_or(StrataError::Overflow("record range"))
    }

    /// Seeks back to the chunk boundary if needed (only after recovery) and
    /// reads the chunk header unless already present. Returns `Ok(false)` at
    /// EOF.
    fn pull_chunk_header(&mut self) -> Result<bool> {
        self.current_chunk_is_incomplete = false;
        if self.byte_reader.pos() < self.pos {
            self.byte_reader.seek(self.pos)?;
        }
        if self.header.is_some() {
            return Ok(true);
        }
        self.read_chunk_header()
    }

    /// Assembles and validates the chunk header at `pos`, reading the block
    /// headers it crosses. Progress survives EOF and resumes on retry.
    fn read_chunk_header(&mut self) -> Result<bool> {
        loop {
            let pos_before = self.byte_reader.pos();
            if !self.read_block_header()? {
                return Ok(false);
            }
            self.check_block_header_agrees(pos_before)?;
            let header_read =
                layout::distance_without_overhead(self.pos, self.byte_reader.pos()) as usize;
            if header_read >= CHUNK_HEADER_SIZE {
                break;
            }
            let remaining = CHUNK_HEADER_SIZE - header_read;
            let len = remaining.min(layout::remaining_in_block(self.byte_reader.pos()) as usize);
            if !self
                .byte_reader
                .read(&mut self.header_buf[header_read..header_read + len])?
            {
                self.note_incomplete();
                return Ok(false);
            }
            if len >= remaining {
                break;
            }
        }

        let header = match ChunkHeader::parse(&self.header_buf, self.pos) {
            Ok(header) => header,
            Err(e) => {
                let at = self.byte_reader.pos();
                warn!("chunk header failed verification: {e}");
                return Err(self.corrupt(Recoverable::FindChunk, at, e));
            }
        };
        if self.pos == 0 && !header.is_valid_signature() {
            let at = self.byte_reader.pos();
            return Err(self.corrupt(Recoverable::FindChunk, at, StrataError::InvalidSignature));
        }
        self.header = Some(header);
        Ok(true)
    }

    /// Reads the block header under the current position, if any. Partially
    /// read header bytes persist across calls.
    fn read_block_header(&mut self) -> Result<bool> {
        let remaining = layout::remaining_in_block_header(self.byte_reader.pos()) as usize;
        if remaining == 0 {
            return Ok(true);
        }
        let offset = BLOCK_HEADER_WIRE - remaining;
        let block_begin = layout::block_begin(self.byte_reader.pos());
        if !self.byte_reader.read(&mut self.block_buf[offset..])? {
            self.note_incomplete();
            return Ok(false);
        }
        match BlockHeader::parse(&self.block_buf, block_begin) {
            Ok(header) => {
                self.block_header = header;
                Ok(true)
            }
            Err(e) => {
                let at = self.byte_reader.pos();
                warn!("block header failed verification: {e}");
                Err(self.corrupt(Recoverable::FindChunk, at, e))
            }
        }
    }

    /// When `pos_before` was a block boundary, the block header just read
    /// must agree about where the current chunk began.
    fn check_block_header_agrees(&mut self, pos_before: u64) -> Result<()> {
        if layout::is_block_boundary(pos_before)
            && self.block_header.previous_chunk != pos_before - self.pos
        {
            let at = self.byte_reader.pos();
            let err = StrataError::BlockHeaderDisagrees {
                chunk_begin: self.pos,
                block_begin: pos_before,
                implied: self.block_header.previous_chunk,
            };
            warn!("chunk layout disagreement: {err}");
            return Err(self.corrupt(Recoverable::FindChunk, at, err));
        }
        Ok(())
    }
}
