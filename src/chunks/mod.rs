//! Chunk framing: the chunk model, reader, writer and decoder.

pub mod chunk;
pub mod decoder;
pub mod header;
pub mod reader;
pub mod simple;
pub mod writer;

#[cfg(test)]
mod tests;

pub use chunk::{Chunk, FILE_SIGNATURE_HEADER};
pub use decoder::ChunkDecoder;
pub use header::{ChunkHeader, ChunkType, CHUNK_HEADER_SIZE};
pub use reader::ChunkReader;
pub use simple::{DecodedRecords, RecordParser, SimpleCodec, SimpleEncoder};
pub use writer::ChunkWriter;
