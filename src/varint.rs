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

//! Unsigned little-endian base-128 varints.
//!
//! The decoder is strict: it rejects values whose last byte sets bits outside
//! the representable range, overlong encodings (a terminating zero byte
//! anywhere but the first position), and inputs that run past the maximum
//! length without terminating.

use crate::error::{Result, StrataError};
use crate::io::ByteReader;
use bytes::{Buf, BufMut, BytesMut};

/// Maximum encoded length of a u32 varint.
pub const MAX_LEN_U32: usize = 5;

/// Maximum encoded length of a u64 varint.
pub const MAX_LEN_U64: usize = 10;

/// Writes `value` as a varint to `dest`.
#[inline]
pub fn write_u64(value: u64, dest: &mut BytesMut) {
    let mut val = value;
    while val >= 0x80 {
        dest.put_u8((val as u8 & 0x7f) | 0x80);
        val >>= 7;
    }
    dest.put_u8(val as u8);
}

/// Number of bytes `write_u64` produces for `value`.
#[inline]
pub fn length_u64(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    (bits + 6) / 7
}

/// Reads a varint-encoded u64 from `buf`, advancing it past the encoding.
pub fn read_u64<B: Buf>(buf: &mut B) -> Result<u64> {
    let mut acc: u64 = 0;
    for i in 0..MAX_LEN_U64 {
        if !buf.has_remaining() {
            return Err(StrataError::Corruption("truncated varint".to_string()));
        }
        let byte = buf.get_u8();
        if i == MAX_LEN_U64 - 1 && byte >= 2 {
            // Bits set outside the representable range, or a continuation
            // bit on the last possible byte.
            return Err(StrataError::Corruption("varint out of range".to_string()));
        }
        acc |= u64::from(byte & 0x7f) << (7 * i as u32);
        if byte < 0x80 {
            if byte == 0 && i > 0 {
                return Err(StrataError::Corruption("overlong varint".to_string()));
            }
            return Ok(acc);
        }
    }
    Err(StrataError::Corruption("varint too long".to_string()))
}

/// Reads a varint-encoded u32 from `buf`, advancing it past the encoding.
pub fn read_u32<B: Buf>(buf: &mut B) -> Result<u32> {
    let mut acc: u32 = 0;
    for i in 0..MAX_LEN_U32 {
        if !buf.has_remaining() {
            return Err(StrataError::Corruption("truncated varint".to_string()));
        }
        let byte = buf.get_u8();
        if i == MAX_LEN_U32 - 1 && byte >= 0x10 {
            return Err(StrataError::Corruption("varint out of range".to_string()));
        }
        acc |= u32::from(byte & 0x7f) << (7 * i as u32);
        if byte < 0x80 {
            if byte == 0 && i > 0 {
                return Err(StrataError::Corruption("overlong varint".to_string()));
            }
            return Ok(acc);
        }
    }
    Err(StrataError::Corruption("varint too long".to_string()))
}

/// Reads a varint-encoded u64 from a byte reader.
///
/// The single-byte case is resolved against the current view; longer
/// encodings take the slow path which pulls across view refills.
#[inline]
pub fn read_u64_from<R: ByteReader + ?Sized>(src: &mut R) -> Result<u64> {
    let available = src.available();
    if let Some(&byte) = available.first() {
        if byte < 0x80 {
            src.consume(1);
            return Ok(u64::from(byte));
        }
    }
    read_u64_from_slow(src)
}

fn read_u64_from_slow<R: ByteReader + ?Sized>(src: &mut R) -> Result<u64> {
    let mut acc: u64 = 0;
    for i in 0..MAX_LEN_U64 {
        if !src.pull(1)? {
            return Err(StrataError::Corruption("truncated varint".to_string()));
        }
        let byte = src.available()[0];
        src.consume(1);
        if i == MAX_LEN_U64 - 1 && byte >= 2 {
            return Err(StrataError::Corruption("varint out of range".to_string()));
        }
        acc |= u64::from(byte & 0x7f) << (7 * i as u32);
        if byte < 0x80 {
            if byte == 0 && i > 0 {
                return Err(StrataError::Corruption("overlong varint".to_string()));
            }
            return Ok(acc);
        }
    }
    Err(StrataError::Corruption("varint too long".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn encode(value: u64) -> Bytes {
        let mut buf = BytesMut::new();
        write_u64(value, &mut buf);
        buf.freeze()
    }

    #[test]
    fn round_trips() {
        for value in [0, 1, 0x7f, 0x80, 300, 1787569, u32::MAX as u64, u64::MAX] {
            let mut buf = encode(value);
            assert_eq!(buf.len(), length_u64(value));
            assert_eq!(read_u64(&mut buf).unwrap(), value);
            assert!(buf.is_empty());
        }
    }

    #[test]
    fn single_byte_values_encode_as_one_byte() {
        assert_eq!(encode(0x7f).as_ref(), &[0x7f]);
        assert_eq!(encode(0x80).as_ref(), &[0x80, 0x01]);
    }

    #[test]
    fn rejects_truncated() {
        let mut buf = Bytes::from_static(&[0x80, 0x80]);
        assert!(read_u64(&mut buf).is_err());
    }

    #[test]
    fn rejects_overlong_zero_byte() {
        // 127 padded out to two bytes.
        let mut buf = Bytes::from_static(&[0xff, 0x00]);
        assert!(read_u64(&mut buf).is_err());
        // Plain zero is fine.
        let mut buf = Bytes::from_static(&[0x00]);
        assert_eq!(read_u64(&mut buf).unwrap(), 0);
    }

    #[test]
    fn rejects_bits_beyond_64() {
        // Ten bytes with the tenth carrying more than the top bit.
        let mut buf = Bytes::from_static(&[
            0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x02,
        ]);
        assert!(read_u64(&mut buf).is_err());
        // u64::MAX itself decodes.
        let mut buf = encode(u64::MAX);
        assert_eq!(read_u64(&mut buf).unwrap(), u64::MAX);
    }

    #[test]
    fn rejects_unterminated_max_length() {
        let mut buf = Bytes::from_static(&[
            0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80, 0x80,
        ]);
        assert!(read_u64(&mut buf).is_err());
    }

    #[test]
    fn rejects_u32_bits_beyond_32() {
        let mut buf = Bytes::from_static(&[0xff, 0xff, 0xff, 0xff, 0x10]);
        assert!(read_u32(&mut buf).is_err());
        let mut buf = Bytes::from_static(&[0xff, 0xff, 0xff, 0xff, 0x0f]);
        assert_eq!(read_u32(&mut buf).unwrap(), u32::MAX);
    }
}
