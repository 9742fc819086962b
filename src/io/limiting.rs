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

//! A reader wrapper that enforces a maximum absolute position.

use crate::error::Result;
use crate::io::reader::ByteReader;

/// Caps an inner reader at `max_pos`; the wrapped stream appears to end
/// there.
///
/// Wrapping a `LimitingReader` again collapses into a single wrapper with the
/// intersected limit via [`with_limit`](LimitingReader::with_limit), so
/// stacking never deepens.
pub struct LimitingReader<R: ByteReader> {
    inner: R,
    max_pos: u64,
}

impl<R: ByteReader> LimitingReader<R> {
    /// Wraps `inner`, capping it at `max_pos`. The inner position must not
    /// already be past the limit.
    pub fn new(inner: R, max_pos: u64) -> Self {
        debug_assert!(inner.pos() <= max_pos);
        Self { inner, max_pos }
    }

    /// Restricts the limit further, collapsing instead of stacking.
    pub fn with_limit(self, max_pos: u64) -> Self {
        Self {
            inner: self.inner,
            max_pos: self.max_pos.min(max_pos),
        }
    }

    pub fn max_pos(&self) -> u64 {
        self.max_pos
    }

    pub fn into_inner(self) -> R {
        self.inner
    }

    fn remaining(&self) -> u64 {
        self.max_pos.saturating_sub(self.inner.pos())
    }
}

impl<R: ByteReader> ByteReader for LimitingReader<R> {
    fn pull(&mut self, min_len: usize) -> Result<bool> {
        let remaining = self.remaining();
        if remaining < min_len as u64 {
            // Fill what the limit allows, then report EOF.
            if remaining > 0 {
                self.inner.pull(remaining as usize)?;
            }
            return Ok(false);
        }
        self.inner.pull(min_len)
    }

    fn available(&self) -> &[u8] {
        let available = self.inner.available();
        let cap = self.remaining().min(available.len() as u64) as usize;
        &available[..cap]
    }

    fn consume(&mut self, len: usize) {
        debug_assert!(len <= self.available().len());
        self.inner.consume(len);
    }

    fn pos(&self) -> u64 {
        self.inner.pos()
    }

    fn seek(&mut self, pos: u64) -> Result<bool> {
        if pos > self.max_pos {
            self.inner.seek(self.max_pos)?;
            return Ok(false);
        }
        self.inner.seek(pos)
    }

    fn size(&mut self) -> Result<u64> {
        Ok(self.inner.size()?.min(self.max_pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::chain::{Chain, ChainReader};
    use bytes::Bytes;

    fn reader(data: &[u8]) -> ChainReader {
        ChainReader::new(Chain::from_bytes(Bytes::copy_from_slice(data)))
    }

    #[test]
    fn caps_reads_at_the_limit() {
        let mut r = LimitingReader::new(reader(b"0123456789"), 4);
        assert_eq!(r.read_all().unwrap().as_ref(), b"0123");
        assert_eq!(r.pos(), 4);
        assert!(!r.pull(1).unwrap());
    }

    #[test]
    fn inner_position_is_shared() {
        let mut inner = reader(b"0123456789");
        {
            let mut limited = LimitingReader::new(&mut inner, 3);
            assert_eq!(limited.read_all().unwrap().as_ref(), b"012");
        }
        // The inner reader continues where the limited view ended.
        assert_eq!(inner.read_all().unwrap().as_ref(), b"3456789");
    }

    #[test]
    fn stacking_collapses() {
        let limited = LimitingReader::new(reader(b"0123456789"), 8).with_limit(5);
        assert_eq!(limited.max_pos(), 5);
        let widened = LimitingReader::new(reader(b"0123456789"), 5).with_limit(8);
        assert_eq!(widened.max_pos(), 5);
    }

    #[test]
    fn seek_beyond_limit_stops_at_limit() {
        let mut r = LimitingReader::new(reader(b"0123456789"), 4);
        assert!(!r.seek(9).unwrap());
        assert_eq!(r.pos(), 4);
        assert!(r.seek(2).unwrap());
        assert_eq!(r.read_all().unwrap().as_ref(), b"23");
    }

    #[test]
    fn size_respects_limit() {
        let mut r = LimitingReader::new(reader(b"0123456789"), 6);
        assert_eq!(r.size().unwrap(), 6);
    }
}
