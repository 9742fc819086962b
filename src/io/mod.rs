//! Buffered byte readers and writers that the framing layer composes over.
//!
//! `ByteReader` and `ByteWriter` are the contracts the container consumes
//! from I/O backends. `BufferedReader` and `BufferedWriter` adapt any
//! `std::io` source or sink; `Chain` is the in-memory backend; a
//! `LimitingReader` caps any reader at a maximum position.

pub mod chain;
pub mod limiting;
pub mod reader;
pub mod writer;

pub use chain::{Chain, ChainReader, ChainWriter};
pub use limiting::LimitingReader;
pub use reader::{BufferedReader, ByteReader};
pub use writer::{BufferedWriter, ByteWriter, FlushType, WriteSink};
