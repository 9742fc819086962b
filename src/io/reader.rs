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

//! The byte reader contract and its buffered implementation over `std::io`.

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use bytes::{Bytes, BytesMut};

use crate::error::Result;

/// Default size of the buffered view, one block.
pub(crate) const DEFAULT_BUFFER_SIZE: usize = 1 << 16;

/// A positioned byte source exposing a contiguous view with a cursor.
///
/// `available()` is the view between the cursor and the view limit; `pull`
/// refills it, `consume` advances the cursor through it. `pos()` is the
/// absolute stream position of the cursor and never decreases except through
/// `seek`.
pub trait ByteReader {
    /// Ensures at least `min_len` bytes are available in the view.
    ///
    /// Returns `Ok(false)` if the source ends before `min_len` bytes are
    /// available.
    fn pull(&mut self, min_len: usize) -> Result<bool>;

    /// The bytes between the cursor and the view limit.
    fn available(&self) -> &[u8];

    /// Advances the cursor by `len` bytes; `len` must not exceed
    /// `available().len()`.
    fn consume(&mut self, len: usize);

    /// Absolute stream position of the cursor.
    fn pos(&self) -> u64;

    /// Repositions the stream. After success the view is empty and the next
    /// `pull` loads from `pos`. Returns `Ok(false)` if the target cannot be
    /// reached (for example past a limit).
    fn seek(&mut self, pos: u64) -> Result<bool>;

    /// Total size of the source in bytes.
    fn size(&mut self) -> Result<u64>;

    /// Copies exactly `dest.len()` bytes. Partial success counts as failure
    /// (`Ok(false)`) and leaves the stream at the furthest successfully read
    /// position.
    fn read(&mut self, dest: &mut [u8]) -> Result<bool> {
        let mut copied = 0;
        while copied < dest.len() {
            if self.available().is_empty() && !self.pull(1)? {
                return Ok(false);
            }
            let available = self.available();
            let len = available.len().min(dest.len() - copied);
            dest[copied..copied + len].copy_from_slice(&available[..len]);
            self.consume(len);
            copied += len;
        }
        Ok(true)
    }

    /// Appends exactly `len` bytes to `dest`, with the same partial-failure
    /// contract as [`read`](ByteReader::read).
    fn read_to(&mut self, dest: &mut BytesMut, len: usize) -> Result<bool> {
        let mut remaining = len;
        while remaining > 0 {
            if self.available().is_empty() && !self.pull(1)? {
                return Ok(false);
            }
            let available = self.available();
            let n = available.len().min(remaining);
            dest.extend_from_slice(&available[..n]);
            self.consume(n);
            remaining -= n;
        }
        Ok(true)
    }

    /// Reads exactly `len` bytes, or `Ok(None)` at EOF before `len`.
    fn read_bytes(&mut self, len: usize) -> Result<Option<Bytes>> {
        let mut buf = BytesMut::with_capacity(len);
        if !self.read_to(&mut buf, len)? {
            return Ok(None);
        }
        Ok(Some(buf.freeze()))
    }

    /// Reads a single byte, or `Ok(None)` at EOF.
    fn read_byte(&mut self) -> Result<Option<u8>> {
        if self.available().is_empty() && !self.pull(1)? {
            return Ok(None);
        }
        let byte = self.available()[0];
        self.consume(1);
        Ok(Some(byte))
    }

    /// Reads everything up to EOF (or the reader's limit).
    fn read_all(&mut self) -> Result<Bytes> {
        let mut buf = BytesMut::new();
        loop {
            if self.available().is_empty() && !self.pull(1)? {
                break;
            }
            let available = self.available();
            buf.extend_from_slice(available);
            let n = available.len();
            self.consume(n);
        }
        Ok(buf.freeze())
    }
}

impl<R: ByteReader + ?Sized> ByteReader for &mut R {
    fn pull(&mut self, min_len: usize) -> Result<bool> {
        (**self).pull(min_len)
    }

    fn available(&self) -> &[u8] {
        (**self).available()
    }

    fn consume(&mut self, len: usize) {
        (**self).consume(len)
    }

    fn pos(&self) -> u64 {
        (**self).pos()
    }

    fn seek(&mut self, pos: u64) -> Result<bool> {
        (**self).seek(pos)
    }

    fn size(&mut self) -> Result<u64> {
        (**self).size()
    }
}

/// Buffered [`ByteReader`] over any `Read + Seek` source.
///
/// Covers file and in-memory sources alike; positional and streaming file
/// descriptor access both reduce to this through `std::io`. The source
/// position is tracked so that `pos()` needs no system call.
pub struct BufferedReader<Source: Read + Seek> {
    source: Source,
    /// The view `[start, limit)`; `cursor` indexes into it.
    buf: BytesMut,
    cursor: usize,
    /// Stream position of the view limit.
    limit_pos: u64,
}

impl<Source: Read + Seek> BufferedReader<Source> {
    /// Creates a reader starting at the source's current position.
    pub fn new(mut source: Source) -> Result<Self> {
        let limit_pos = source.stream_position()?;
        Ok(Self {
            source,
            buf: BytesMut::new(),
            cursor: 0,
            limit_pos,
        })
    }

    /// Returns the underlying source, consuming self.
    pub fn into_inner(self) -> Source {
        self.source
    }

    fn start_pos(&self) -> u64 {
        self.limit_pos - self.buf.len() as u64
    }

    /// Drops the consumed prefix and reads until at least `min_len` bytes are
    /// buffered. `EINTR` is retried transparently.
    fn refill(&mut self, min_len: usize) -> Result<bool> {
        if self.cursor > 0 {
            let _ = self.buf.split_to(self.cursor);
            self.cursor = 0;
        }
        while self.buf.len() < min_len {
            let old_len = self.buf.len();
            let target = old_len + DEFAULT_BUFFER_SIZE.max(min_len - old_len);
            self.buf.resize(target, 0);
            let read = loop {
                match self.source.read(&mut self.buf[old_len..]) {
                    Ok(n) => break n,
                    Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                    Err(e) => {
                        self.buf.truncate(old_len);
                        return Err(e.into());
                    }
                }
            };
            self.buf.truncate(old_len + read);
            self.limit_pos += read as u64;
            if read == 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl<Source: Read + Seek> ByteReader for BufferedReader<Source> {
    fn pull(&mut self, min_len: usize) -> Result<bool> {
        if self.buf.len() - self.cursor >= min_len {
            return Ok(true);
        }
        self.refill(min_len)
    }

    fn available(&self) -> &[u8] {
        &self.buf[self.cursor..]
    }

    fn consume(&mut self, len: usize) {
        debug_assert!(self.cursor + len <= self.buf.len());
        self.cursor += len;
    }

    fn pos(&self) -> u64 {
        self.limit_pos - (self.buf.len() - self.cursor) as u64
    }

    fn seek(&mut self, pos: u64) -> Result<bool> {
        // A target inside the current view only moves the cursor.
        if pos >= self.start_pos() && pos <= self.limit_pos {
            self.cursor = (pos - self.start_pos()) as usize;
            return Ok(true);
        }
        self.buf.clear();
        self.cursor = 0;
        self.source.seek(SeekFrom::Start(pos))?;
        self.limit_pos = pos;
        Ok(true)
    }

    fn size(&mut self) -> Result<u64> {
        let size = self.source.seek(SeekFrom::End(0))?;
        self.source.seek(SeekFrom::Start(self.limit_pos))?;
        Ok(size)
    }
}
