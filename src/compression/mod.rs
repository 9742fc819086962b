//! Compression adapters for chunk payload streams.
//!
//! A compressed stream is framed as `varint(uncompressed_size) || payload`;
//! an uncompressed stream is the raw payload with no prefix. The size prefix
//! lets the decoder preallocate exactly and validate the decoded size.

pub mod core;

#[cfg(feature = "brotli")]
pub(crate) mod brotli;
#[cfg(feature = "zstd")]
pub(crate) mod zstd;

pub use self::core::{decompress, CompressionType, Compressor, CompressorOptions};
