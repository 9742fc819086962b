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

//! Strata is a container file format for sequences of records (arbitrary
//! byte strings, often serialized messages).
//!
//! The byte stream is partitioned into aligned 64 KiB blocks, each starting
//! with a small self-hashed block header. Records are grouped into chunks: a
//! self-hashed fixed-size header followed by an optionally compressed
//! payload. Chunks are laid out contiguously across block boundaries, and the
//! block headers anchor the chunk layout so a reader can seek to the chunk
//! containing a position and resynchronize after corruption.
//!
//! This crate is the container core: buffered byte I/O, the block layout,
//! chunk framing with hash verification and recovery, and the chunk decoder
//! that exposes records from a decoded chunk.

pub mod blocks;
pub mod chunks;
pub mod compression;
pub mod constants;
pub mod error;
pub mod hash;
pub mod io;
pub(crate) mod varint;

pub use error::{Result, StrataError};
