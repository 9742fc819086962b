//! Scenario tests for the chunk reader and writer over in-memory files.

mod writer_tests;

use std::io::Cursor;

use crate::blocks::layout;
use crate::chunks::chunk::Chunk;
use crate::chunks::header::CHUNK_HEADER_SIZE;
use crate::chunks::reader::ChunkReader;
use crate::chunks::simple::SimpleEncoder;
use crate::chunks::writer::ChunkWriter;
use crate::compression::{CompressionType, CompressorOptions};
use crate::io::{BufferedReader, BufferedWriter};

/// Builds an uncompressed simple chunk holding `records`.
pub(crate) fn simple_chunk(records: &[&[u8]]) -> Chunk {
    let mut encoder = SimpleEncoder::new(CompressorOptions::new(CompressionType::None));
    for record in records {
        encoder.add_record(record).unwrap();
    }
    encoder.encode_chunk().unwrap()
}

/// Writes a file: signature chunk followed by `chunks`.
pub(crate) fn write_file(chunks: &[Chunk]) -> Vec<u8> {
    let writer = BufferedWriter::new(Cursor::new(Vec::new())).unwrap();
    let mut chunk_writer = ChunkWriter::new(writer).unwrap();
    chunk_writer.write_signature().unwrap();
    for chunk in chunks {
        chunk_writer.write_chunk(chunk).unwrap();
    }
    chunk_writer
        .close()
        .unwrap()
        .into_inner()
        .unwrap()
        .into_inner()
}

/// Chunk boundaries of a file written by `write_file`: one entry per content
/// chunk, plus the end-of-file boundary.
pub(crate) fn boundaries(chunks: &[Chunk]) -> Vec<u64> {
    let mut pos = layout::chunk_end(0, CHUNK_HEADER_SIZE as u64).unwrap();
    let mut out = Vec::new();
    for chunk in chunks {
        out.push(pos);
        pos = layout::chunk_end(pos, CHUNK_HEADER_SIZE as u64 + chunk.header.data_size).unwrap();
    }
    out.push(pos);
    out
}

pub(crate) fn reader_for(data: Vec<u8>) -> ChunkReader<BufferedReader<Cursor<Vec<u8>>>> {
    ChunkReader::new(BufferedReader::new(Cursor::new(data)).unwrap())
}
