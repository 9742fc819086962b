//! Hashing for block headers, chunk headers and chunk data.

use crate::constants::HIGHWAY_HASH_KEY;
use highway::{HighwayHash, HighwayHasher, Key};

/// Calculates the 64-bit HighwayHash of `data` with the wire-format key.
pub fn highway_hash(data: &[u8]) -> u64 {
    let mut hasher = HighwayHasher::new(Key(HIGHWAY_HASH_KEY));
    hasher.append(data);
    hasher.finalize64()
}
