use super::{boundaries, reader_for, simple_chunk, write_file};
use crate::blocks::header::{BlockHeader, BLOCK_HEADER_WIRE};
use crate::blocks::layout::{BLOCK_HEADER_SIZE, BLOCK_SIZE};
use crate::chunks::chunk::FILE_SIGNATURE_HEADER;
use crate::chunks::decoder::ChunkDecoder;
use crate::chunks::header::CHUNK_HEADER_SIZE;

fn block_header_at(data: &[u8], offset: usize) -> BlockHeader {
    let mut raw = [0u8; BLOCK_HEADER_WIRE];
    raw.copy_from_slice(&data[offset..offset + BLOCK_HEADER_WIRE]);
    BlockHeader::parse(&raw, offset as u64).unwrap()
}

#[test]
fn file_starts_with_block_header_then_signature() {
    let data = write_file(&[]);
    assert_eq!(data.len(), 64);
    let block_header = block_header_at(&data, 0);
    assert_eq!(block_header.previous_chunk, 0);
    assert_eq!(block_header.next_chunk, 64);
    assert_eq!(&data[24..64], &FILE_SIGNATURE_HEADER);
}

#[test]
fn chunk_straddling_a_block_boundary() {
    // One record of a full block's length guarantees the chunk payload
    // crosses the boundary at BLOCK_SIZE.
    let record = vec![0xabu8; BLOCK_SIZE as usize];
    let chunk = simple_chunk(&[&record]);
    let chunk_begin = 64u64;
    let data = write_file(std::slice::from_ref(&chunk));
    let ends = boundaries(std::slice::from_ref(&chunk));
    let chunk_end = ends[1];
    assert_eq!(data.len() as u64, chunk_end);

    // The block header at BLOCK_SIZE points back to the chunk's start and
    // forward to the next chunk boundary.
    let block_header = block_header_at(&data, BLOCK_SIZE as usize);
    assert_eq!(block_header.previous_chunk, BLOCK_SIZE - chunk_begin);
    assert_eq!(block_header.next_chunk, chunk_end - BLOCK_SIZE);

    // The reader reassembles the same record across the boundary.
    let mut reader = reader_for(data);
    reader.read_chunk().unwrap();
    let read_back = reader.read_chunk().unwrap().unwrap();
    assert_eq!(read_back, chunk);
    let mut decoder = ChunkDecoder::new();
    decoder.reset_with(&read_back).unwrap();
    assert_eq!(decoder.read_record().unwrap().as_ref(), &record[..]);
}

#[test]
fn chunk_ending_exactly_on_a_boundary() {
    // Size the first chunk so its end lands exactly on BLOCK_SIZE: from
    // position 64 that leaves BLOCK_SIZE - 64 bytes, of which 40 are header
    // and 5 are simple-codec framing.
    let values_len = (BLOCK_SIZE - 64) as usize - CHUNK_HEADER_SIZE - 5;
    let record = vec![0x11u8; values_len];
    let first = simple_chunk(&[&record]);
    let second = simple_chunk(&[b"after the boundary"]);
    let ends = boundaries(&[first.clone(), second.clone()]);
    assert_eq!(ends[1], BLOCK_SIZE);

    let data = write_file(&[first.clone(), second.clone()]);
    // A chunk boundary coincides with the block boundary.
    let block_header = block_header_at(&data, BLOCK_SIZE as usize);
    assert_eq!(block_header.previous_chunk, 0);
    let second_end = ends[2];
    assert_eq!(block_header.next_chunk, second_end - BLOCK_SIZE);

    let mut reader = reader_for(data);
    reader.read_chunk().unwrap();
    assert_eq!(reader.read_chunk().unwrap().unwrap(), first);
    assert_eq!(reader.pos(), BLOCK_SIZE);
    assert_eq!(reader.read_chunk().unwrap().unwrap(), second);
}

#[test]
fn chunk_header_itself_can_straddle_a_boundary() {
    // End the first chunk a few bytes short of the boundary so the second
    // chunk's 40-byte header is split by the block header.
    let values_len = (BLOCK_SIZE - 64) as usize - CHUNK_HEADER_SIZE - 5 - 10;
    let record = vec![0x22u8; values_len];
    let first = simple_chunk(&[&record]);
    let second = simple_chunk(&[b"header split across blocks"]);
    let ends = boundaries(&[first.clone(), second.clone()]);
    assert_eq!(ends[1], BLOCK_SIZE - 10);

    let mut reader = reader_for(write_file(&[first, second.clone()]));
    reader.read_chunk().unwrap();
    reader.read_chunk().unwrap();
    assert_eq!(reader.read_chunk().unwrap().unwrap(), second);
}

#[test]
fn flushed_prefix_is_independently_readable() {
    use crate::chunks::writer::ChunkWriter;
    use crate::io::{BufferedWriter, FlushType};
    use std::io::Cursor;

    let mut sink = Vec::new();
    let mut chunk_writer =
        ChunkWriter::new(BufferedWriter::new(Cursor::new(&mut sink)).unwrap()).unwrap();
    chunk_writer.write_signature().unwrap();
    let chunk = simple_chunk(&[b"flushed", b"records"]);
    chunk_writer.write_chunk(&chunk).unwrap();
    chunk_writer.flush(FlushType::FromProcess).unwrap();
    drop(chunk_writer);

    // A fresh reader over the flushed bytes recovers everything written.
    let mut reader = reader_for(sink.clone());
    assert!(reader.read_chunk().unwrap().is_some());
    assert_eq!(reader.read_chunk().unwrap().unwrap(), chunk);
    assert!(reader.read_chunk().unwrap().is_none());
}

#[test]
fn positions_advance_by_chunk_end() {
    use crate::blocks::layout;

    let chunks = vec![
        simple_chunk(&[b"one"]),
        simple_chunk(&[vec![0u8; 70_000].as_slice()]),
        simple_chunk(&[b"three"]),
    ];
    let ends = boundaries(&chunks);
    let data = write_file(&chunks);
    assert_eq!(data.len() as u64, *ends.last().unwrap());
    // Every boundary is a possible chunk boundary.
    for end in &ends {
        assert!(layout::is_possible_chunk_boundary(*end));
    }
    // The big chunk accounted for an extra block header.
    let second_size = CHUNK_HEADER_SIZE as u64 + chunks[1].header.data_size;
    assert_eq!(ends[2] - ends[1], second_size + BLOCK_HEADER_SIZE);
}
