//! The fixed 64 KiB block layout of the byte stream.
//!
//! Chunks are laid out contiguously ignoring block headers; the first
//! [`layout::BLOCK_HEADER_SIZE`] bytes of every block are a self-hashed
//! [`BlockHeader`] that anchors the chunk layout for seeking and recovery.

pub mod header;
pub mod layout;

pub use header::BlockHeader;
pub use layout::{BLOCK_HEADER_SIZE, BLOCK_SIZE, USABLE_BLOCK_SIZE};
