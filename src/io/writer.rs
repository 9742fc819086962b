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

//! The byte writer contract and its buffered implementation over `std::io`.

use std::fs::File;
use std::io::{self, Cursor, Seek, Write};

use bytes::BytesMut;

use crate::constants::MAX_POSITION;
use crate::error::{Result, StrataError};

use super::reader::DEFAULT_BUFFER_SIZE;

/// How far a flush must propagate.
///
/// Levels form a total order: data flushed `FromObject` is visible to readers
/// of the same object, `FromProcess` to other processes, `FromMachine`
/// survives machine crashes. A writer honours the strongest level its backend
/// supports and never downgrades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FlushType {
    FromObject,
    FromProcess,
    FromMachine,
}

/// A positioned byte sink.
pub trait ByteWriter {
    /// Absolute stream position of the next byte written.
    fn pos(&self) -> u64;

    /// Appends `src` at the current position.
    fn write(&mut self, src: &[u8]) -> Result<()>;

    /// Pushes buffered data at least as far as `flush_type` requires.
    fn flush(&mut self, flush_type: FlushType) -> Result<()>;
}

impl<W: ByteWriter + ?Sized> ByteWriter for &mut W {
    fn pos(&self) -> u64 {
        (**self).pos()
    }

    fn write(&mut self, src: &[u8]) -> Result<()> {
        (**self).write(src)
    }

    fn flush(&mut self, flush_type: FlushType) -> Result<()> {
        (**self).flush(flush_type)
    }
}

/// Destination of a [`BufferedWriter`].
///
/// `sync` pushes OS buffers to durable storage where the backend supports it;
/// the default is a no-op so in-memory sinks satisfy `FromMachine` trivially.
pub trait WriteSink: Write + Seek {
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl WriteSink for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

impl WriteSink for &File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

impl WriteSink for Cursor<Vec<u8>> {}

impl WriteSink for Cursor<&mut Vec<u8>> {}

impl<S: WriteSink + ?Sized> WriteSink for &mut S {
    fn sync(&mut self) -> io::Result<()> {
        (**self).sync()
    }
}

/// Buffered [`ByteWriter`] over any [`WriteSink`].
pub struct BufferedWriter<Sink: WriteSink> {
    sink: Sink,
    buf: BytesMut,
    /// Stream position of the first buffered byte.
    start_pos: u64,
}

impl<Sink: WriteSink> BufferedWriter<Sink> {
    /// Creates a writer starting at the sink's current position.
    pub fn new(mut sink: Sink) -> Result<Self> {
        let start_pos = sink.stream_position()?;
        Ok(Self {
            sink,
            buf: BytesMut::with_capacity(DEFAULT_BUFFER_SIZE),
            start_pos,
        })
    }

    /// Drains the buffer and returns the underlying sink.
    pub fn into_inner(mut self) -> Result<Sink> {
        self.drain()?;
        Ok(self.sink)
    }

    fn drain(&mut self) -> Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        self.sink.write_all(&self.buf)?;
        self.start_pos += self.buf.len() as u64;
        self.buf.clear();
        Ok(())
    }
}

impl<Sink: WriteSink> ByteWriter for BufferedWriter<Sink> {
    fn pos(&self) -> u64 {
        self.start_pos + self.buf.len() as u64
    }

    fn write(&mut self, src: &[u8]) -> Result<()> {
        self.pos()
            .checked_add(src.len() as u64)
            .filter(|end| *end <= MAX_POSITION)
            .ok_or(StrataError::Overflow("byte writer position"))?;
        self.buf.extend_from_slice(src);
        if self.buf.len() >= DEFAULT_BUFFER_SIZE {
            self.drain()?;
        }
        Ok(())
    }

    fn flush(&mut self, flush_type: FlushType) -> Result<()> {
        self.drain()?;
        if flush_type >= FlushType::FromProcess {
            self.sink.flush()?;
        }
        if flush_type == FlushType::FromMachine {
            self.sink.sync()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_tracks_position_and_drains_on_flush() {
        let mut sink = Vec::new();
        {
            let mut w = BufferedWriter::new(Cursor::new(&mut sink)).unwrap();
            assert_eq!(w.pos(), 0);
            w.write(b"hello ").unwrap();
            w.write(b"world").unwrap();
            assert_eq!(w.pos(), 11);
            w.flush(FlushType::FromProcess).unwrap();
        }
        assert_eq!(sink, b"hello world");
    }

    #[test]
    fn into_inner_drains() {
        let mut w = BufferedWriter::new(Cursor::new(Vec::new())).unwrap();
        w.write(b"abc").unwrap();
        let sink = w.into_inner().unwrap();
        assert_eq!(sink.into_inner(), b"abc");
    }

    #[test]
    fn write_past_max_position_overflows() {
        let mut w = BufferedWriter::new(Cursor::new(Vec::new())).unwrap();
        w.start_pos = MAX_POSITION - 1;
        let err = w.write(b"ab").unwrap_err();
        assert!(matches!(err, StrataError::Overflow(_)));
    }

    #[test]
    fn machine_flush_on_in_memory_sink_is_a_no_op() {
        let mut w = BufferedWriter::new(Cursor::new(Vec::new())).unwrap();
        w.write(b"x").unwrap();
        w.flush(FlushType::FromMachine).unwrap();
    }
}
