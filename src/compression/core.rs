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

use bytes::{Bytes, BytesMut};

use crate::error::{Result, StrataError};
use crate::io::{ByteWriter, ChainWriter, FlushType};
use crate::varint;

/// Compression applied to a chunk payload stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    None,
    Brotli,
    Zstd,
}

impl CompressionType {
    pub fn as_byte(&self) -> u8 {
        match self {
            CompressionType::None => 0,
            CompressionType::Brotli => b'b',
            CompressionType::Zstd => b'z',
        }
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0 => Some(CompressionType::None),
            b'b' => Some(CompressionType::Brotli),
            b'z' => Some(CompressionType::Zstd),
            _ => None,
        }
    }
}

/// Tuning forwarded to the codec. Out-of-range tuning values are ignored by
/// the codec rather than failing the stream.
#[derive(Debug, Clone, Copy)]
pub struct CompressorOptions {
    pub compression: CompressionType,
    /// Codec compression level.
    pub level: i32,
    /// Log2 of the codec window size, if overridden.
    pub window_log: Option<u32>,
    /// Expected uncompressed size, for codec tuning.
    pub size_hint: Option<u64>,
}

impl CompressorOptions {
    pub fn new(compression: CompressionType) -> Self {
        let level = match compression {
            CompressionType::None => 0,
            CompressionType::Brotli => 9,
            CompressionType::Zstd => 9,
        };
        Self {
            compression,
            level,
            window_log: None,
            size_hint: None,
        }
    }

    pub fn with_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    pub fn with_window_log(mut self, window_log: u32) -> Self {
        self.window_log = Some(window_log);
        self
    }

    pub fn with_size_hint(mut self, size_hint: u64) -> Self {
        self.size_hint = Some(size_hint);
        self
    }
}

impl Default for CompressorOptions {
    fn default() -> Self {
        Self::new(CompressionType::None)
    }
}

/// Writer that stages an uncompressed stream and emits its framed form.
///
/// Bytes written through the compressor accumulate in a chain; on
/// [`encode_and_close`](Compressor::encode_and_close) the codec's finish
/// frame is produced and the stream is appended to `dest` as
/// `varint(uncompressed_size) || compressed_payload` (or raw when
/// compression is none).
pub struct Compressor {
    options: CompressorOptions,
    staged: ChainWriter,
}

impl Compressor {
    pub fn new(options: CompressorOptions) -> Result<Self> {
        match options.compression {
            CompressionType::None => {}
            #[cfg(feature = "brotli")]
            CompressionType::Brotli => {}
            #[cfg(feature = "zstd")]
            CompressionType::Zstd => {}
            #[allow(unreachable_patterns)]
            other => return Err(StrataError::UnsupportedCompression(other.as_byte())),
        }
        Ok(Self {
            options,
            staged: ChainWriter::new(),
        })
    }

    /// Uncompressed bytes staged so far.
    pub fn uncompressed_size(&self) -> u64 {
        self.staged.pos()
    }

    pub fn write(&mut self, src: &[u8]) -> Result<()> {
        self.staged.write(src)
    }

    /// Finishes the stream and appends its framed form to `dest`.
    pub fn encode_and_close(mut self, dest: &mut BytesMut) -> Result<()> {
        self.staged.flush(FlushType::FromObject)?;
        let uncompressed_size = self.staged.pos();
        let raw = self.staged.into_chain().into_bytes();
        match self.options.compression {
            CompressionType::None => {
                dest.extend_from_slice(&raw);
                Ok(())
            }
            #[cfg(feature = "brotli")]
            CompressionType::Brotli => {
                varint::write_u64(uncompressed_size, dest);
                let compressed = super::brotli::compress(&raw, &self.options)?;
                dest.extend_from_slice(&compressed);
                Ok(())
            }
            #[cfg(feature = "zstd")]
            CompressionType::Zstd => {
                varint::write_u64(uncompressed_size, dest);
                let compressed = super::zstd::compress(&raw, &self.options)?;
                dest.extend_from_slice(&compressed);
                Ok(())
            }
            #[allow(unreachable_patterns)]
            other => Err(StrataError::UnsupportedCompression(other.as_byte())),
        }
    }
}

/// Decodes a framed stream produced by [`Compressor`].
pub fn decompress(compression: CompressionType, mut data: Bytes) -> Result<Bytes> {
    match compression {
        CompressionType::None => Ok(data),
        #[cfg(feature = "brotli")]
        CompressionType::Brotli => {
            let uncompressed_size = decoded_size(&mut data)?;
            super::brotli::decompress(&data, uncompressed_size)
        }
        #[cfg(feature = "zstd")]
        CompressionType::Zstd => {
            let uncompressed_size = decoded_size(&mut data)?;
            super::zstd::decompress(&data, uncompressed_size)
        }
        #[allow(unreachable_patterns)]
        other => Err(StrataError::UnsupportedCompression(other.as_byte())),
    }
}

#[cfg(any(feature = "brotli", feature = "zstd"))]
fn decoded_size(data: &mut Bytes) -> Result<usize> {
    let size = varint::read_u64(data)?;
    usize::try_from(size).map_err(|_| StrataError::Overflow("decompressed size"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(compression: CompressionType, payload: &[u8]) {
        let mut compressor = Compressor::new(CompressorOptions::new(compression)).unwrap();
        compressor.write(payload).unwrap();
        assert_eq!(compressor.uncompressed_size(), payload.len() as u64);
        let mut framed = BytesMut::new();
        compressor.encode_and_close(&mut framed).unwrap();
        let decoded = decompress(compression, framed.freeze()).unwrap();
        assert_eq!(decoded.as_ref(), payload);
    }

    #[test]
    fn identity_is_raw() {
        let mut compressor = Compressor::new(CompressorOptions::default()).unwrap();
        compressor.write(b"raw payload").unwrap();
        let mut framed = BytesMut::new();
        compressor.encode_and_close(&mut framed).unwrap();
        // No size prefix when compression is none.
        assert_eq!(framed.as_ref(), b"raw payload");
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn zstd_round_trips_with_size_prefix() {
        let payload = vec![42u8; 10_000];
        round_trip(CompressionType::Zstd, &payload);

        let mut compressor =
            Compressor::new(CompressorOptions::new(CompressionType::Zstd)).unwrap();
        compressor.write(&payload).unwrap();
        let mut framed = BytesMut::new();
        compressor.encode_and_close(&mut framed).unwrap();
        let mut framed = framed.freeze();
        assert_eq!(varint::read_u64(&mut framed).unwrap(), 10_000);
        assert!(framed.len() < 10_000);
    }

    #[cfg(feature = "brotli")]
    #[test]
    fn brotli_round_trips() {
        round_trip(CompressionType::Brotli, b"");
        round_trip(CompressionType::Brotli, &vec![7u8; 10_000]);
    }

    #[cfg(feature = "zstd")]
    #[test]
    fn zstd_rejects_wrong_decoded_size() {
        let mut compressor =
            Compressor::new(CompressorOptions::new(CompressionType::Zstd)).unwrap();
        compressor.write(b"some payload bytes").unwrap();
        let mut framed = BytesMut::new();
        compressor.encode_and_close(&mut framed).unwrap();
        // Shrink the claimed uncompressed size.
        let mut tampered = BytesMut::new();
        varint::write_u64(3, &mut tampered);
        tampered.extend_from_slice(&framed[varint::length_u64(18)..]);
        assert!(decompress(CompressionType::Zstd, tampered.freeze()).is_err());
    }

    #[test]
    fn compression_type_bytes() {
        for compression in [
            CompressionType::None,
            CompressionType::Brotli,
            CompressionType::Zstd,
        ] {
            assert_eq!(
                CompressionType::from_byte(compression.as_byte()),
                Some(compression)
            );
        }
        assert_eq!(CompressionType::from_byte(b'q'), None);
    }
}
