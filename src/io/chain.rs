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

//! In-memory byte chains.
//!
//! A [`Chain`] is an ordered sequence of immutable, reference-counted byte
//! blocks. [`ChainReader`] gives random access over a chain; [`ChainWriter`]
//! appends to one and also implements `std::io::Write` so compression
//! encoders can stack on it.

use std::io;

use bytes::{Bytes, BytesMut};

use crate::error::Result;
use crate::io::reader::ByteReader;
use crate::io::writer::{ByteWriter, FlushType};

/// Granularity at which `ChainWriter` freezes pending bytes into a block.
const CHAIN_BLOCK_SIZE: usize = 1 << 16;

/// An ordered sequence of immutable byte blocks.
#[derive(Debug, Default, Clone)]
pub struct Chain {
    blocks: Vec<Bytes>,
    len: u64,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// A chain holding `data` as its single block.
    pub fn from_bytes(data: Bytes) -> Self {
        let mut chain = Self::new();
        chain.push(data);
        chain
    }

    /// Appends a block; empty blocks are dropped.
    pub fn push(&mut self, block: Bytes) {
        if block.is_empty() {
            return;
        }
        self.len += block.len() as u64;
        self.blocks.push(block);
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn blocks(&self) -> &[Bytes] {
        &self.blocks
    }

    /// Flattens the chain into contiguous bytes. A single-block chain is
    /// returned without copying.
    pub fn into_bytes(self) -> Bytes {
        if self.blocks.len() == 1 {
            return self.blocks.into_iter().next().unwrap_or_default();
        }
        let mut out = BytesMut::with_capacity(self.len as usize);
        for block in &self.blocks {
            out.extend_from_slice(block);
        }
        out.freeze()
    }
}

/// Random-access [`ByteReader`] over a [`Chain`].
pub struct ChainReader {
    blocks: Vec<Bytes>,
    /// Stream position at which each block starts.
    starts: Vec<u64>,
    len: u64,
    pos: u64,
}

impl ChainReader {
    pub fn new(chain: Chain) -> Self {
        let mut starts = Vec::with_capacity(chain.blocks.len());
        let mut start = 0;
        for block in &chain.blocks {
            starts.push(start);
            start += block.len() as u64;
        }
        Self {
            blocks: chain.blocks,
            starts,
            len: chain.len,
            pos: 0,
        }
    }

    /// Index of the block containing `pos`, if any.
    fn locate(&self, pos: u64) -> Option<usize> {
        if pos >= self.len {
            return None;
        }
        let index = self.starts.partition_point(|start| *start <= pos);
        Some(index - 1)
    }

    /// Merges all blocks from `index` on into one, so a contiguous view can
    /// span what used to be a block boundary. Positions are unaffected.
    fn coalesce_from(&mut self, index: usize) {
        let mut merged = BytesMut::new();
        for block in &self.blocks[index..] {
            merged.extend_from_slice(block);
        }
        let start = self.starts[index];
        self.blocks.truncate(index);
        self.starts.truncate(index);
        self.blocks.push(merged.freeze());
        self.starts.push(start);
    }
}

impl ByteReader for ChainReader {
    fn pull(&mut self, min_len: usize) -> Result<bool> {
        let remaining = self.len.saturating_sub(self.pos);
        if remaining < min_len as u64 {
            return Ok(false);
        }
        if self.available().len() < min_len {
            let index = match self.locate(self.pos) {
                Some(index) => index,
                None => return Ok(false),
            };
            self.coalesce_from(index);
        }
        Ok(true)
    }

    fn available(&self) -> &[u8] {
        match self.locate(self.pos) {
            Some(index) => {
                let offset = (self.pos - self.starts[index]) as usize;
                &self.blocks[index][offset..]
            }
            None => &[],
        }
    }

    fn consume(&mut self, len: usize) {
        debug_assert!(len <= self.available().len());
        self.pos += len as u64;
    }

    fn pos(&self) -> u64 {
        self.pos
    }

    fn seek(&mut self, pos: u64) -> Result<bool> {
        self.pos = pos;
        Ok(true)
    }

    fn size(&mut self) -> Result<u64> {
        Ok(self.len)
    }
}

/// [`ByteWriter`] appending to a [`Chain`].
#[derive(Debug, Default)]
pub struct ChainWriter {
    chain: Chain,
    pending: BytesMut,
}

impl ChainWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Freezes pending bytes and returns the accumulated chain.
    pub fn into_chain(mut self) -> Chain {
        self.seal();
        self.chain
    }

    fn seal(&mut self) {
        if !self.pending.is_empty() {
            self.chain.push(self.pending.split().freeze());
        }
    }
}

impl ByteWriter for ChainWriter {
    fn pos(&self) -> u64 {
        self.chain.len() + self.pending.len() as u64
    }

    fn write(&mut self, src: &[u8]) -> Result<()> {
        self.pending.extend_from_slice(src);
        if self.pending.len() >= CHAIN_BLOCK_SIZE {
            self.seal();
        }
        Ok(())
    }

    fn flush(&mut self, _flush_type: FlushType) -> Result<()> {
        self.seal();
        Ok(())
    }
}

impl io::Write for ChainWriter {
    fn write(&mut self, src: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(src);
        if self.pending.len() >= CHAIN_BLOCK_SIZE {
            self.seal();
        }
        Ok(src.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.seal();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(parts: &[&[u8]]) -> Chain {
        let mut chain = Chain::new();
        for part in parts {
            chain.push(Bytes::copy_from_slice(part));
        }
        chain
    }

    #[test]
    fn reader_crosses_blocks() {
        let mut r = ChainReader::new(chain(&[b"abc", b"", b"defg"]));
        assert_eq!(r.size().unwrap(), 7);
        let mut dest = [0u8; 7];
        assert!(r.read(&mut dest).unwrap());
        assert_eq!(&dest, b"abcdefg");
        assert!(!r.pull(1).unwrap());
    }

    #[test]
    fn pull_coalesces_across_a_block_boundary() {
        let mut r = ChainReader::new(chain(&[b"ab", b"cd"]));
        r.consume(1);
        assert!(r.pull(3).unwrap());
        assert_eq!(r.available(), b"bcd");
        assert_eq!(r.pos(), 1);
    }

    #[test]
    fn seek_is_random_access() {
        let mut r = ChainReader::new(chain(&[b"0123", b"4567"]));
        assert!(r.seek(6).unwrap());
        assert_eq!(r.read_all().unwrap().as_ref(), b"67");
        assert!(r.seek(2).unwrap());
        assert_eq!(r.read_byte().unwrap(), Some(b'2'));
        // Past the end: no failure, just EOF.
        assert!(r.seek(100).unwrap());
        assert!(!r.pull(1).unwrap());
    }

    #[test]
    fn writer_accumulates_and_positions() {
        let mut w = ChainWriter::new();
        ByteWriter::write(&mut w, b"hello ").unwrap();
        ByteWriter::write(&mut w, b"chain").unwrap();
        assert_eq!(ByteWriter::pos(&w), 11);
        let chain = w.into_chain();
        assert_eq!(chain.len(), 11);
        assert_eq!(chain.into_bytes().as_ref(), b"hello chain");
    }

    #[test]
    fn writer_seals_large_pending_into_blocks() {
        let mut w = ChainWriter::new();
        let big = vec![7u8; CHAIN_BLOCK_SIZE + 10];
        ByteWriter::write(&mut w, &big).unwrap();
        ByteWriter::write(&mut w, b"tail").unwrap();
        let chain = w.into_chain();
        assert!(chain.blocks().len() >= 2);
        assert_eq!(chain.len(), big.len() as u64 + 4);
    }
}
