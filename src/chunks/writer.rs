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

//! Writing chunks to a byte stream, interleaving block headers.

use crate::blocks::header::BlockHeader;
use crate::blocks::layout;
use crate::chunks::chunk::Chunk;
use crate::chunks::header::CHUNK_HEADER_SIZE;
use crate::error::{Result, StrataError};
use crate::io::{ByteWriter, FlushType};

/// Writes chunks at block-aware positions.
///
/// A block header is emitted the moment a block boundary is crossed, with
/// `previous_chunk` and `next_chunk` computed from the chunk boundaries known
/// at that moment. Nothing is ever pending at a chunk boundary, so after any
/// successful `flush(FromProcess)` a fresh reader started from offset 0 can
/// recover all previously written chunks.
pub struct ChunkWriter<W: ByteWriter> {
    byte_writer: W,
    /// Current chunk boundary; equals the byte writer position between
    /// chunks.
    pos: u64,
}

impl<W: ByteWriter> ChunkWriter<W> {
    /// Creates a writer at the byte writer's current position, which must be
    /// a possible chunk boundary.
    pub fn new(byte_writer: W) -> Result<Self> {
        let pos = byte_writer.pos();
        if !layout::is_possible_chunk_boundary(pos) {
            return Err(StrataError::InvalidBoundary { pos });
        }
        Ok(Self { byte_writer, pos })
    }

    /// The current chunk boundary.
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Writes the mandatory file-signature chunk. Call first on an empty
    /// file.
    pub fn write_signature(&mut self) -> Result<()> {
        self.write_chunk(&Chunk::signature())
    }

    /// Writes one chunk at the current boundary.
    pub fn write_chunk(&mut self, chunk: &Chunk) -> Result<()> {
        if chunk.data.len() as u64 != chunk.header.data_size {
            return Err(StrataError::Corruption(format!(
                "chunk data is {} bytes, header claims {}",
                chunk.data.len(),
                chunk.header.data_size
            )));
        }
        let header_bytes = chunk.header.encode()?;
        let chunk_begin = self.pos;
        let chunk_size = (CHUNK_HEADER_SIZE as u64)
            .checked_add(chunk.header.data_size)
            .ok_or(StrataError::Overflow("chunk size"))?;
        let chunk_end = layout::chunk_end(chunk_begin, chunk_size)?;
        self.write_split(&header_bytes, chunk_begin, chunk_end)?;
        self.write_split(&chunk.data, chunk_begin, chunk_end)?;
        debug_assert_eq!(self.pos, chunk_end);
        Ok(())
    }

    /// Writes `src`, pausing at every block boundary to emit the block
    /// header for the chunk spanning `[chunk_begin, chunk_end)`.
    fn write_split(&mut self, mut src: &[u8], chunk_begin: u64, chunk_end: u64) -> Result<()> {
        while !src.is_empty() {
            if layout::is_block_boundary(self.pos) {
                let block_header = BlockHeader {
                    previous_chunk: self.pos - chunk_begin,
                    next_chunk: chunk_end - self.pos,
                };
                self.byte_writer.write(&block_header.encode())?;
                self.pos = self
                    .pos
                    .checked_add(layout::BLOCK_HEADER_SIZE)
                    .ok_or(StrataError::Overflow("block header position"))?;
            }
            let len = layout::remaining_in_block(self.pos).min(src.len() as u64) as usize;
            self.byte_writer.write(&src[..len])?;
            self.pos = self
                .pos
                .checked_add(len as u64)
                .ok_or(StrataError::Overflow("chunk write position"))?;
            src = &src[len..];
        }
        Ok(())
    }

    /// Flushes the byte writer at the requested level.
    pub fn flush(&mut self, flush_type: FlushType) -> Result<()> {
        self.byte_writer.flush(flush_type)
    }

    /// Flushes and returns the underlying byte writer.
    pub fn close(mut self) -> Result<W> {
        self.byte_writer.flush(FlushType::FromObject)?;
        Ok(self.byte_writer)
    }
}
