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

//! The simple record codec.
//!
//! Simple chunk data is laid out as:
//!
//! 1. `compression_type` (1 byte)
//! 2. size of the compressed record-sizes stream (varint)
//! 3. compressed record sizes (varints of each record length)
//! 4. compressed record values (the rest of the data)
//!
//! Each compressed stream is framed as `varint(uncompressed_size) ||
//! payload`; with compression disabled the streams are raw.

use bytes::{Bytes, BytesMut};

use crate::chunks::chunk::Chunk;
use crate::chunks::header::{ChunkHeader, ChunkType};
use crate::compression::{decompress, CompressionType, Compressor, CompressorOptions};
use crate::error::{Result, StrataError};
use crate::io::{ByteReader, Chain, ChainReader, LimitingReader};
use crate::varint;

/// A chunk's decoded records: `values[limits[i-1]..limits[i]]` is record `i`,
/// with `limits[-1]` taken as 0.
///
/// Invariants: `limits` is non-decreasing and its last element (if any)
/// equals `values.len()`.
#[derive(Debug, Default)]
pub struct DecodedRecords {
    pub limits: Vec<usize>,
    pub values: Bytes,
}

/// What the chunk decoder consumes from a payload codec.
pub trait RecordParser {
    /// Parses chunk data into record end offsets and the flat value buffer.
    fn parse(&mut self, header: &ChunkHeader, data: Bytes) -> Result<DecodedRecords>;
}

/// Parser for [`ChunkType::Simple`] chunk data.
#[derive(Debug, Default)]
pub struct SimpleCodec;

impl RecordParser for SimpleCodec {
    fn parse(&mut self, header: &ChunkHeader, data: Bytes) -> Result<DecodedRecords> {
        let mut src = ChainReader::new(Chain::from_bytes(data));
        let compression_byte = src.read_byte()?.ok_or_else(|| {
            StrataError::InvalidChunkPayload("missing compression type".to_string())
        })?;
        let compression = CompressionType::from_byte(compression_byte)
            .ok_or(StrataError::UnsupportedCompression(compression_byte))?;

        let sizes_len = varint::read_u64_from(&mut src)?;
        let sizes_end = src
            .pos()
            .checked_add(sizes_len)
            .ok_or(StrataError::Overflow("sizes stream length"))?;
        if sizes_end > src.size()? {
            return Err(StrataError::InvalidChunkPayload(format!(
                "sizes stream of {sizes_len} bytes exceeds chunk data"
            )));
        }
        let compressed_sizes = {
            let mut sizes_src = LimitingReader::new(&mut src, sizes_end);
            sizes_src.read_all()?
        };
        let compressed_values = src.read_all()?;

        let mut sizes = decompress(compression, compressed_sizes)?;
        let values = decompress(compression, compressed_values)?;

        let mut limits = Vec::with_capacity(usize::try_from(header.num_records).unwrap_or(0));
        let mut limit: usize = 0;
        for _ in 0..header.num_records {
            let size = varint::read_u64(&mut sizes)?;
            let size = usize::try_from(size)
                .ok()
                .filter(|size| *size <= values.len() - limit)
                .ok_or_else(|| {
                    StrataError::InvalidChunkPayload(format!(
                        "record of {size} bytes exceeds remaining values"
                    ))
                })?;
            limit += size;
            limits.push(limit);
        }
        if !sizes.is_empty() {
            return Err(StrataError::InvalidChunkPayload(format!(
                "{} trailing bytes in record sizes stream",
                sizes.len()
            )));
        }
        Ok(DecodedRecords { limits, values })
    }
}

/// Builds simple chunks record by record.
///
/// Records accumulate until [`encode_chunk`](SimpleEncoder::encode_chunk),
/// which produces a [`Chunk`] and resets the encoder for the next one.
/// `add_record` reports the decoded size so far so callers can target a
/// chunk size.
pub struct SimpleEncoder {
    options: CompressorOptions,
    /// Varints of each record length, in order.
    sizes: BytesMut,
    /// Concatenated record values.
    values: BytesMut,
    num_records: u64,
}

impl SimpleEncoder {
    pub fn new(options: CompressorOptions) -> Self {
        Self {
            options,
            sizes: BytesMut::new(),
            values: BytesMut::new(),
            num_records: 0,
        }
    }

    /// Appends a record; returns the total decoded size buffered so far.
    pub fn add_record(&mut self, record: &[u8]) -> Result<u64> {
        varint::write_u64(record.len() as u64, &mut self.sizes);
        self.values.extend_from_slice(record);
        self.num_records += 1;
        Ok(self.values.len() as u64)
    }

    pub fn num_records(&self) -> u64 {
        self.num_records
    }

    pub fn decoded_size(&self) -> u64 {
        self.values.len() as u64
    }

    /// Encodes the buffered records into a chunk and resets the encoder.
    pub fn encode_chunk(&mut self) -> Result<Chunk> {
        let mut data = BytesMut::new();
        data.extend_from_slice(&[self.options.compression.as_byte()]);

        let mut compressed_sizes = BytesMut::new();
        let mut sizes_compressor = Compressor::new(self.options)?;
        sizes_compressor.write(&self.sizes)?;
        sizes_compressor.encode_and_close(&mut compressed_sizes)?;
        varint::write_u64(compressed_sizes.len() as u64, &mut data);
        data.extend_from_slice(&compressed_sizes);

        let mut values_compressor = Compressor::new(self.options)?;
        values_compressor.write(&self.values)?;
        values_compressor.encode_and_close(&mut data)?;

        let chunk = Chunk::new(
            ChunkType::Simple,
            self.num_records,
            self.values.len() as u64,
            data.freeze(),
        )?;
        self.sizes.clear();
        self.values.clear();
        self.num_records = 0;
        Ok(chunk)
    }
}
